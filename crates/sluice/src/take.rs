//! Bounded consumer: pass through at most `n` values, then release upstream.

use tracing::debug;

use crate::context::PipelineContext;
use crate::pipe::{Inlet, Pipe, channel};
use crate::stage::{StageExit, spawn_stage};

/// Emit at most `n` values from `input`, then close.
///
/// Once the limit is reached the stage drops its input. Every upstream stage
/// then sees its reader gone, whether it is writing or still waiting for
/// input, and shuts down. This is what turns an
/// infinite pipeline into a finite one without touching the shared signal.
pub fn take<T>(ctx: &PipelineContext, input: Pipe<T>, n: usize) -> Pipe<T>
where
    T: Send + 'static,
{
    let (rx, mut stages) = input.into_parts();
    let (mut outlet, out_rx) = channel(ctx, "take");
    let mut inlet = Inlet::new(rx, ctx);
    let pipeline = ctx.name().to_string();

    stages.push(spawn_stage(ctx, "take", async move {
        for _ in 0..n {
            let item = match inlet.next(&outlet).await {
                Ok(Some(item)) => item,
                Ok(None) => return StageExit::Completed,
                Err(exit) => return exit,
            };
            if let Err(exit) = outlet.send(item).await {
                return exit;
            }
        }

        drop(inlet);
        debug!(pipeline = %pipeline, limit = n, "Take limit reached, released upstream");
        StageExit::Completed
    }));

    Pipe::new(ctx, out_rx, stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Capacity;
    use crate::source::{from_iter, repeat_with};
    use crate::stage::StageState;
    use crate::transform::{filter, map};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> PipelineContext {
        PipelineContext::new("test", CancellationToken::new(), Capacity::new(2).unwrap())
    }

    #[tokio::test]
    async fn test_takes_exactly_n() {
        let ctx = ctx();
        let mut first = take(&ctx, from_iter(&ctx, 1..=10), 3);
        assert_eq!(first.collect_all().await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_n_larger_than_supply() {
        let ctx = ctx();
        let mut all = take(&ctx, from_iter(&ctx, vec![1, 2]), 10);

        let values = tokio::time::timeout(Duration::from_secs(1), all.collect_all())
            .await
            .expect("take should close when its input closes");
        assert_eq!(values, vec![1, 2]);

        let report = all.finish().await.unwrap();
        assert_eq!(report.count(StageState::Completed), 2);
    }

    #[tokio::test]
    async fn test_take_zero() {
        let ctx = ctx();
        let mut none = take(&ctx, from_iter(&ctx, 1..=3), 0);
        assert_eq!(none.recv().await, None);
    }

    #[tokio::test]
    async fn test_releases_infinite_upstream_without_cancel() {
        let ctx = ctx();
        let source = repeat_with(&ctx, || 7u8);
        let doubled = map(&ctx, source, |n| n * 2);
        let mut limited = take(&ctx, doubled, 5);

        assert_eq!(limited.collect_all().await, vec![14; 5]);

        let report = tokio::time::timeout(Duration::from_secs(1), limited.finish())
            .await
            .expect("upstream should terminate after take releases it")
            .unwrap();

        assert!(!ctx.is_cancelled(), "take must not activate the shared signal");
        assert_eq!(report.stages.last().map(|s| s.state), Some(StageState::Completed));
        assert_eq!(report.count(StageState::Cancelled), 2);
    }

    #[tokio::test]
    async fn test_releases_upstream_that_stopped_emitting() {
        let ctx = ctx();
        let mut counter = 0u64;
        let source = repeat_with(&ctx, move || {
            counter += 1;
            counter
        });
        let small = filter(&ctx, source, |v| *v <= 3);
        let mut limited = take(&ctx, small, 3);

        assert_eq!(limited.collect_all().await, vec![1, 2, 3]);

        // The filter never emits again, so it must notice the missing reader
        // while waiting for input.
        let report = tokio::time::timeout(Duration::from_secs(3), limited.finish())
            .await
            .expect("silent filter should be released after take reaches its limit")
            .unwrap();

        assert!(!ctx.is_cancelled());
        assert_eq!(report.stages.last().map(|s| s.state), Some(StageState::Completed));
        assert_eq!(report.count(StageState::Cancelled), 2);
    }
}
