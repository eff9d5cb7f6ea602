//! Internal events for pipeline metrics emission.
//!
//! Every event carries a `pipeline` label so several pipelines sharing one
//! process stay distinguishable.

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Items a stage delivered to its output over its lifetime.
pub struct ItemsEmitted {
    pub count: u64,
    pub pipeline: String,
    pub stage: String,
}

impl InternalEvent for ItemsEmitted {
    fn emit(self) {
        trace!(count = self.count, pipeline = %self.pipeline, stage = %self.stage, "Items emitted");
        counter!(
            "sluice_items_emitted_total",
            "pipeline" => self.pipeline,
            "stage" => self.stage
        )
        .increment(self.count);
    }
}

/// A stage reached a terminal state.
pub struct StageTerminated {
    pub state: &'static str,
    pub pipeline: String,
    pub stage: String,
}

impl InternalEvent for StageTerminated {
    fn emit(self) {
        trace!(state = self.state, pipeline = %self.pipeline, stage = %self.stage, "Stage terminated");
        counter!(
            "sluice_stage_terminated_total",
            "state" => self.state,
            "pipeline" => self.pipeline,
            "stage" => self.stage
        )
        .increment(1);
    }
}

/// Number of fan-out workers currently running.
pub struct ActiveWorkers {
    pub count: usize,
    pub pipeline: String,
}

impl InternalEvent for ActiveWorkers {
    fn emit(self) {
        trace!(count = self.count, pipeline = %self.pipeline, "Active workers");
        gauge!("sluice_active_workers", "pipeline" => self.pipeline).set(self.count as f64);
    }
}

/// Wall-clock time from pipeline construction until its report was collected.
pub struct PipelineFinished {
    pub duration: Duration,
    pub pipeline: String,
}

impl InternalEvent for PipelineFinished {
    fn emit(self) {
        trace!(duration_ms = self.duration.as_millis() as u64, pipeline = %self.pipeline, "Pipeline finished");
        histogram!("sluice_pipeline_duration_seconds", "pipeline" => self.pipeline)
            .record(self.duration.as_secs_f64());
    }
}
