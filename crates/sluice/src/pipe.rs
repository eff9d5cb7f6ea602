//! Streams between stages.
//!
//! A [`Pipe`] is the read end of a bounded channel together with the handles
//! of every stage upstream of it. Stage bodies talk to their channels through
//! [`Inlet`] and [`Outlet`], which race each suspension point against the
//! pipeline's cancellation signal.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use sluice_core::emit;
use sluice_core::metrics::events::{ItemsEmitted, PipelineFinished};

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::stage::{PipelineReport, StageExit, StageHandle};

/// Read end of a stream, plus ownership of the stages feeding it.
///
/// Only stage constructors produce a `Pipe`, so every stream is fully wired
/// before anyone can read from it. Dropping a `Pipe` abandons the stream:
/// upstream stages notice while waiting to read or write and shut down.
pub struct Pipe<T> {
    rx: mpsc::Receiver<T>,
    stages: Vec<StageHandle>,
    pipeline: String,
    started: Instant,
}

impl<T> Pipe<T> {
    pub(crate) fn new(ctx: &PipelineContext, rx: mpsc::Receiver<T>, stages: Vec<StageHandle>) -> Self {
        Self {
            rx,
            stages,
            pipeline: ctx.name().to_string(),
            started: Instant::now(),
        }
    }

    pub(crate) fn into_parts(self) -> (mpsc::Receiver<T>, Vec<StageHandle>) {
        (self.rx, self.stages)
    }

    /// Receive the next value, or `None` once the stream is closed.
    ///
    /// Never hangs on a cancelled pipeline: cancellation makes every upstream
    /// stage close its output, so buffered values drain and then `None` follows.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Receive every remaining value until the stream closes.
    pub async fn collect_all(&mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.rx.recv().await {
            items.push(item);
        }
        items
    }

    /// Handles of all stages upstream of this stream, sources first.
    pub fn stages(&self) -> &[StageHandle] {
        &self.stages
    }

    /// Abandon the stream, wait for every upstream stage to terminate, and
    /// report how each one ended.
    ///
    /// Returns [`PipelineError::StageFaulted`] if any stage faulted.
    pub async fn finish(self) -> Result<PipelineReport, PipelineError> {
        let Pipe {
            rx,
            stages,
            pipeline,
            started,
        } = self;
        drop(rx);

        let mut report = PipelineReport::default();
        for stage in stages {
            report.stages.push(stage.join().await);
        }

        debug!(pipeline = %pipeline, stages = report.stages.len(), "All stages joined");
        emit!(PipelineFinished {
            duration: started.elapsed(),
            pipeline,
        });

        report.check()?;
        Ok(report)
    }
}

impl<T> Stream for Pipe<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> std::fmt::Debug for Pipe<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipe")
            .field("pipeline", &self.pipeline)
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

/// Input side of a stage body.
pub(crate) struct Inlet<T> {
    rx: mpsc::Receiver<T>,
    shutdown: CancellationToken,
}

impl<T> Inlet<T> {
    pub(crate) fn new(rx: mpsc::Receiver<T>, ctx: &PipelineContext) -> Self {
        Self {
            rx,
            shutdown: ctx.shutdown().clone(),
        }
    }

    /// Next input value for a stage writing to `outlet`; `Ok(None)` when the
    /// input closed normally.
    ///
    /// Gives up when the pipeline is cancelled or when nobody reads `outlet`
    /// any more, so a stage that has stopped emitting still notices that its
    /// reader is gone.
    pub(crate) async fn next<U>(&mut self, outlet: &Outlet<U>) -> Result<Option<T>, StageExit> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(StageExit::Cancelled),
            _ = outlet.abandoned() => Err(StageExit::Cancelled),
            item = self.rx.recv() => Ok(item),
        }
    }
}

/// Output side of a stage body. Counts delivered items and reports the total
/// when dropped.
pub(crate) struct Outlet<T> {
    tx: mpsc::Sender<T>,
    shutdown: CancellationToken,
    emitted: u64,
    pipeline: String,
    stage: String,
}

impl<T> Outlet<T> {
    pub(crate) fn new(tx: mpsc::Sender<T>, ctx: &PipelineContext, stage: impl Into<String>) -> Self {
        Self {
            tx,
            shutdown: ctx.shutdown().clone(),
            emitted: 0,
            pipeline: ctx.name().to_string(),
            stage: stage.into(),
        }
    }

    /// Deliver `value`, unless the pipeline is cancelled or the reader is gone.
    pub(crate) async fn send(&mut self, value: T) -> Result<(), StageExit> {
        let sent = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(StageExit::Cancelled),
            sent = self.tx.send(value) => sent,
        };

        match sent {
            Ok(()) => {
                self.emitted += 1;
                Ok(())
            }
            Err(_) => {
                debug!(pipeline = %self.pipeline, stage = %self.stage, "Reader gone, stopping");
                Err(StageExit::Cancelled)
            }
        }
    }

    /// True once nobody can read this outlet's stream any more.
    pub(crate) fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once nobody can read this outlet's stream any more.
    pub(crate) async fn abandoned(&self) {
        self.tx.closed().await;
        debug!(pipeline = %self.pipeline, stage = %self.stage, "Reader gone while waiting for input");
    }
}

impl<T> Drop for Outlet<T> {
    fn drop(&mut self) {
        emit!(ItemsEmitted {
            count: self.emitted,
            pipeline: std::mem::take(&mut self.pipeline),
            stage: std::mem::take(&mut self.stage),
        });
    }
}

/// Create a fresh stream for `stage`: its outlet and the raw read end.
pub(crate) fn channel<T>(ctx: &PipelineContext, stage: &str) -> (Outlet<T>, mpsc::Receiver<T>) {
    let (tx, rx) = mpsc::channel(ctx.capacity().get());
    (Outlet::new(tx, ctx, stage), rx)
}

/// Move values from `inlet` to `outlet` in order, passing each through `f`.
/// Values mapped to `None` are dropped.
pub(crate) async fn pump<T, U, F>(mut inlet: Inlet<T>, mut outlet: Outlet<U>, mut f: F) -> StageExit
where
    F: FnMut(T) -> Option<U>,
{
    loop {
        let item = match inlet.next(&outlet).await {
            Ok(Some(item)) => item,
            Ok(None) => return StageExit::Completed,
            Err(exit) => return exit,
        };

        if let Some(value) = f(item)
            && let Err(exit) = outlet.send(value).await
        {
            return exit;
        }
    }
}
