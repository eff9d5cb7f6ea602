//! Fan-out: replicate an expensive, order-independent stage across workers.
//!
//! All workers compete for values from one shared input, so each value is
//! processed by exactly one worker. Output order across workers is undefined.
//! Per-item work runs on tokio's blocking pool; fanning out a cheap or
//! order-dependent stage only adds overhead.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use sluice_core::emit;
use sluice_core::metrics::events::ActiveWorkers;

use crate::context::PipelineContext;
use crate::error::{NoWorkersSnafu, PipelineError};
use crate::pipe::{Inlet, Outlet, Pipe, channel};
use crate::stage::{StageExit, spawn_stage};

/// How many workers a pool should run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkerCount {
    /// One worker per unit of available parallelism.
    #[default]
    Auto,
    /// Exactly this many, capped at available parallelism.
    Fixed(usize),
}

impl WorkerCount {
    /// Resolve to a concrete worker count.
    ///
    /// `Fixed(0)` is a setup fault. Counts above the machine's parallelism
    /// are capped.
    pub fn resolve(self) -> Result<usize, PipelineError> {
        let available = available_parallelism();
        match self {
            WorkerCount::Auto => Ok(available),
            WorkerCount::Fixed(0) => NoWorkersSnafu.fail(),
            WorkerCount::Fixed(requested) if requested > available => {
                warn!(requested, available, "Capping worker count at available parallelism");
                Ok(available)
            }
            WorkerCount::Fixed(requested) => Ok(requested),
        }
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Start a pool of workers over `input`, returning one output stream per worker.
///
/// `work` returning `None` drops the value, so a filter can run inside the pool.
/// A panic in `work` faults only the worker that hit it. Fails synchronously,
/// before any worker starts, if the pool would have no workers.
pub fn fan_out<T, U, F>(
    ctx: &PipelineContext,
    input: Pipe<T>,
    workers: WorkerCount,
    work: F,
) -> Result<Vec<Pipe<U>>, PipelineError>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> Option<U> + Send + Sync + 'static,
{
    let count = workers.resolve()?;
    let (rx, mut upstream) = input.into_parts();
    let shared = Arc::new(Mutex::new(Inlet::new(rx, ctx)));
    let work = Arc::new(work);
    let active = Arc::new(AtomicUsize::new(0));

    debug!(pipeline = %ctx.name(), workers = count, "Starting worker pool");

    let mut outputs = Vec::with_capacity(count);
    for index in 0..count {
        let name = format!("fan_out[{index}]");
        let (outlet, out_rx) = channel(ctx, &name);
        let slot = WorkerSlot::enter(active.clone(), ctx.name());
        let worker = run_worker(
            shared.clone(),
            outlet,
            work.clone(),
            ctx.shutdown().clone(),
            slot,
        );
        let stage = spawn_stage(ctx, name, worker);

        // Upstream stages travel with the first worker's stream so they are
        // joined exactly once after fan-in.
        let mut stages = if index == 0 {
            std::mem::take(&mut upstream)
        } else {
            Vec::new()
        };
        stages.push(stage);
        outputs.push(Pipe::new(ctx, out_rx, stages));
    }

    Ok(outputs)
}

async fn run_worker<T, U, F>(
    shared: Arc<Mutex<Inlet<T>>>,
    mut outlet: Outlet<U>,
    work: Arc<F>,
    shutdown: CancellationToken,
    _slot: WorkerSlot,
) -> StageExit
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> Option<U> + Send + Sync + 'static,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(StageExit::Cancelled),
            _ = outlet.abandoned() => Err(StageExit::Cancelled),
            mut inlet = shared.lock() => inlet.next(&outlet).await,
        };
        let item = match next {
            Ok(Some(item)) => item,
            Ok(None) => return StageExit::Completed,
            Err(exit) => return exit,
        };

        if outlet.is_abandoned() {
            return StageExit::Cancelled;
        }

        let work = work.clone();
        let output = match tokio::task::spawn_blocking(move || (*work)(item)).await {
            Ok(output) => output,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => return StageExit::Cancelled,
        };

        if let Some(value) = output
            && let Err(exit) = outlet.send(value).await
        {
            return exit;
        }
    }
}

/// Keeps the active-worker gauge in step with running workers.
struct WorkerSlot {
    active: Arc<AtomicUsize>,
    pipeline: String,
}

impl WorkerSlot {
    fn enter(active: Arc<AtomicUsize>, pipeline: &str) -> Self {
        let count = active.fetch_add(1, Ordering::AcqRel) + 1;
        emit!(ActiveWorkers {
            count,
            pipeline: pipeline.to_string(),
        });
        Self {
            active,
            pipeline: pipeline.to_string(),
        }
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        let count = self.active.fetch_sub(1, Ordering::AcqRel) - 1;
        emit!(ActiveWorkers {
            count,
            pipeline: std::mem::take(&mut self.pipeline),
        });
    }
}
