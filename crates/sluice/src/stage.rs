//! Stage lifecycle: spawning, state tracking and reporting.
//!
//! Every stage runs as its own tokio task and moves through
//! `Idle → Running → {Completed, Cancelled, Faulted}`. Terminal states are
//! final: only the first transition out of `Running` takes effect.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sluice_core::emit;
use sluice_core::metrics::events::StageTerminated;

use crate::context::PipelineContext;
use crate::error::PipelineError;

/// Lifecycle state of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StageState {
    /// Spawned but not yet polled.
    Idle = 0,
    Running = 1,
    /// Input exhausted (or source supply ended) normally.
    Completed = 2,
    /// Stopped by the cancellation signal or because nobody reads its output.
    Cancelled = 3,
    /// Panicked.
    Faulted = 4,
}

impl StageState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StageState::Completed | StageState::Cancelled | StageState::Faulted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageState::Idle => "idle",
            StageState::Running => "running",
            StageState::Completed => "completed",
            StageState::Cancelled => "cancelled",
            StageState::Faulted => "faulted",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => StageState::Idle,
            1 => StageState::Running,
            2 => StageState::Completed,
            3 => StageState::Cancelled,
            _ => StageState::Faulted,
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a stage body finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageExit {
    Completed,
    Cancelled,
}

impl From<StageExit> for StageState {
    fn from(exit: StageExit) -> Self {
        match exit {
            StageExit::Completed => StageState::Completed,
            StageExit::Cancelled => StageState::Cancelled,
        }
    }
}

/// Atomic holder for a stage's state, shared between the task and its handle.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(StageState::Idle as u8))
    }

    pub(crate) fn load(&self) -> StageState {
        StageState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// `Idle → Running`. Returns false if the stage already left `Idle`.
    pub(crate) fn start(&self) -> bool {
        self.transition(StageState::Idle, StageState::Running)
    }

    /// `Running → terminal`. Repeated calls are no-ops returning false.
    pub(crate) fn finish(&self, terminal: StageState) -> bool {
        debug_assert!(terminal.is_terminal());
        self.transition(StageState::Running, terminal)
    }

    fn transition(&self, from: StageState, to: StageState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Records the terminal state when the stage task ends, including by panic.
struct ExitGuard {
    state: Arc<StateCell>,
    pipeline: String,
    stage: String,
}

impl ExitGuard {
    fn record(&self, terminal: StageState) {
        if self.state.finish(terminal) {
            debug!(pipeline = %self.pipeline, stage = %self.stage, state = %terminal, "Stage finished");
            emit!(StageTerminated {
                state: terminal.as_str(),
                pipeline: self.pipeline.clone(),
                stage: self.stage.clone(),
            });
        }
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        // Still running here means the body never returned: it either
        // panicked or the runtime dropped the task.
        let terminal = if std::thread::panicking() {
            StageState::Faulted
        } else {
            StageState::Cancelled
        };
        self.record(terminal);
    }
}

/// Handle to a spawned stage task.
pub struct StageHandle {
    name: String,
    state: Arc<StateCell>,
    handle: JoinHandle<StageExit>,
}

impl StageHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StageState {
        self.state.load()
    }

    /// Wait for the stage task and summarize how it ended.
    pub async fn join(self) -> StageReport {
        let (state, fault) = match self.handle.await {
            Ok(exit) => (exit.into(), None),
            Err(e) if e.is_panic() => (StageState::Faulted, Some(panic_message(e.into_panic()))),
            Err(_) => (StageState::Cancelled, None),
        };

        StageReport {
            name: self.name,
            state,
            fault,
        }
    }
}

impl fmt::Debug for StageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageHandle")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Spawn `body` as a stage task under `ctx`.
///
/// Must be called from within a Tokio runtime.
pub(crate) fn spawn_stage<F>(ctx: &PipelineContext, name: impl Into<String>, body: F) -> StageHandle
where
    F: Future<Output = StageExit> + Send + 'static,
{
    let name = name.into();
    let state = Arc::new(StateCell::new());
    let guard = ExitGuard {
        state: state.clone(),
        pipeline: ctx.name().to_string(),
        stage: name.clone(),
    };

    let handle = tokio::spawn(async move {
        let guard = guard;
        guard.state.start();
        let exit = body.await;
        guard.record(exit.into());
        exit
    });

    StageHandle {
        name,
        state,
        handle,
    }
}

/// Terminal summary of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub name: String,
    pub state: StageState,
    /// Panic message, for faulted stages.
    pub fault: Option<String>,
}

/// Terminal summary of every stage that fed a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// Number of stages that ended in `state`.
    pub fn count(&self, state: StageState) -> usize {
        self.stages.iter().filter(|s| s.state == state).count()
    }

    pub fn faults(&self) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().filter(|s| s.state == StageState::Faulted)
    }

    /// Convert the first faulted stage, if any, into an error.
    pub fn check(&self) -> Result<(), PipelineError> {
        match self.faults().next() {
            Some(report) => {
                warn!(stage = %report.name, "Pipeline stage faulted");
                Err(PipelineError::StageFaulted {
                    stage: report.name.clone(),
                    message: report.fault.clone().unwrap_or_default(),
                })
            }
            None => Ok(()),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "stage panicked".to_string()
    }
}
