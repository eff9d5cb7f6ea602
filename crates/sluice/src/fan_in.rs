//! Fan-in: merge several streams into one.
//!
//! One forwarding stage per input copies values into the merged stream. Each
//! forwarder owns a sender of the merged channel, and the channel closes when
//! the last sender is dropped, so the merged stream cannot close while any
//! input could still produce.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tracing::debug;

use crate::context::PipelineContext;
use crate::pipe::{Inlet, Outlet, Pipe, pump};
use crate::stage::spawn_stage;

/// Merge `inputs` into a single stream. Values from different inputs may
/// interleave in any order. With no inputs the merged stream is closed.
pub fn fan_in<T>(ctx: &PipelineContext, inputs: Vec<Pipe<T>>) -> Pipe<T>
where
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel(ctx.capacity().get());
    let remaining = Arc::new(AtomicUsize::new(inputs.len()));
    let mut stages = Vec::new();

    for (index, input) in inputs.into_iter().enumerate() {
        let (input_rx, upstream) = input.into_parts();
        stages.extend(upstream);

        let name = format!("fan_in[{index}]");
        let inlet = Inlet::new(input_rx, ctx);
        let outlet = Outlet::new(tx.clone(), ctx, name.as_str());
        let remaining = remaining.clone();
        let pipeline = ctx.name().to_string();

        stages.push(spawn_stage(ctx, name, async move {
            let exit = pump(inlet, outlet, Some).await;
            // pump consumed the outlet, so this forwarder's sender is gone.
            if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                debug!(pipeline = %pipeline, "All fan-in inputs finished, merged stream closed");
            }
            exit
        }));
    }
    drop(tx);

    Pipe::new(ctx, rx, stages)
}
