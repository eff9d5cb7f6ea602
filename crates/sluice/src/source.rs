//! Generator stages: streams with no input.

use crate::context::PipelineContext;
use crate::pipe::{Pipe, channel};
use crate::stage::{StageExit, spawn_stage};

/// Emit every value of `values` in order, then close.
pub fn from_iter<I>(ctx: &PipelineContext, values: I) -> Pipe<I::Item>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    let (mut outlet, rx) = channel(ctx, "source");
    let values = values.into_iter();

    let stage = spawn_stage(ctx, "source", async move {
        for value in values {
            if let Err(exit) = outlet.send(value).await {
                return exit;
            }
        }
        StageExit::Completed
    });

    Pipe::new(ctx, rx, vec![stage])
}

/// Cycle through `values` forever. An empty `values` closes immediately.
pub fn repeat<T>(ctx: &PipelineContext, values: Vec<T>) -> Pipe<T>
where
    T: Clone + Send + Sync + 'static,
{
    let (mut outlet, rx) = channel(ctx, "repeat");

    let stage = spawn_stage(ctx, "repeat", async move {
        if values.is_empty() {
            return StageExit::Completed;
        }
        for value in values.iter().cycle() {
            if let Err(exit) = outlet.send(value.clone()).await {
                return exit;
            }
        }
        StageExit::Completed
    });

    Pipe::new(ctx, rx, vec![stage])
}

/// Emit the result of calling `produce` repeatedly, until cancelled or abandoned.
pub fn repeat_with<T, F>(ctx: &PipelineContext, mut produce: F) -> Pipe<T>
where
    T: Send + 'static,
    F: FnMut() -> T + Send + 'static,
{
    let (mut outlet, rx) = channel(ctx, "repeat_with");

    let stage = spawn_stage(ctx, "repeat_with", async move {
        loop {
            if let Err(exit) = outlet.send(produce()).await {
                return exit;
            }
        }
    });

    Pipe::new(ctx, rx, vec![stage])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Capacity;
    use crate::stage::StageState;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> PipelineContext {
        PipelineContext::new("test", CancellationToken::new(), Capacity::new(4).unwrap())
    }

    #[tokio::test]
    async fn test_from_iter_emits_in_order_then_closes() {
        let mut pipe = from_iter(&ctx(), vec![3, 1, 2]);
        assert_eq!(pipe.collect_all().await, vec![3, 1, 2]);

        let report = pipe.finish().await.unwrap();
        assert_eq!(report.stages[0].state, StageState::Completed);
    }

    #[tokio::test]
    async fn test_from_iter_empty() {
        let mut pipe = from_iter(&ctx(), Vec::<u8>::new());
        assert!(pipe.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_repeat_cycles_seeds() {
        let mut pipe = repeat(&ctx(), vec!['a', 'b']);
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(pipe.recv().await.unwrap());
        }
        assert_eq!(seen, vec!['a', 'b', 'a', 'b', 'a']);

        let report = pipe.finish().await.unwrap();
        assert_eq!(report.stages[0].state, StageState::Cancelled);
    }

    #[tokio::test]
    async fn test_repeat_empty_closes() {
        let mut pipe = repeat(&ctx(), Vec::<u8>::new());
        assert!(pipe.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_repeat_with_stops_on_cancel() {
        let ctx = ctx();
        let mut counter = 0u64;
        let mut pipe = repeat_with(&ctx, move || {
            counter += 1;
            counter
        });

        assert_eq!(pipe.recv().await, Some(1));
        assert_eq!(pipe.recv().await, Some(2));

        ctx.cancel();

        // Whatever was buffered drains, then the stream closes.
        let rest = tokio::time::timeout(Duration::from_secs(1), pipe.collect_all())
            .await
            .expect("generator should stop after cancellation");
        assert!(rest.len() <= ctx.capacity().get());

        let report = pipe.finish().await.unwrap();
        assert_eq!(report.stages[0].state, StageState::Cancelled);
    }
}
