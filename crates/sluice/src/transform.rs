//! Linear, order-preserving stages.

use crate::context::PipelineContext;
use crate::pipe::{Inlet, Pipe, channel, pump};
use crate::stage::spawn_stage;

/// Apply `f` to each value.
pub fn map<T, U, F>(ctx: &PipelineContext, input: Pipe<T>, f: F) -> Pipe<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> U + Send + 'static,
{
    linear(ctx, "map", input, move |item| Some(f(item)))
}

/// Keep only the values matching `predicate`.
pub fn filter<T, F>(ctx: &PipelineContext, input: Pipe<T>, predicate: F) -> Pipe<T>
where
    T: Send + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    linear(ctx, "filter", input, move |item| predicate(&item).then_some(item))
}

/// Apply a fallible `f` to each value, forwarding the tagged result.
///
/// A failing item does not stop the stage: the error travels downstream as
/// data and the consumer decides whether to skip, abort, or log it.
pub fn try_map<T, U, E, F>(ctx: &PipelineContext, input: Pipe<T>, f: F) -> Pipe<Result<U, E>>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Result<U, E> + Send + 'static,
{
    linear(ctx, "try_map", input, move |item| Some(f(item)))
}

fn linear<T, U, F>(ctx: &PipelineContext, kind: &str, input: Pipe<T>, f: F) -> Pipe<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> Option<U> + Send + 'static,
{
    let (rx, mut stages) = input.into_parts();
    let name = format!("{kind}[{}]", stages.len());
    let (outlet, out_rx) = channel(ctx, &name);
    let inlet = Inlet::new(rx, ctx);

    stages.push(spawn_stage(ctx, name, pump(inlet, outlet, f)));
    Pipe::new(ctx, out_rx, stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Capacity;
    use crate::source::{from_iter, repeat_with};
    use crate::stage::StageState;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> PipelineContext {
        PipelineContext::new("test", CancellationToken::new(), Capacity::HANDOFF)
    }

    #[tokio::test]
    async fn test_map_doubles_in_order() {
        let ctx = ctx();
        let mut doubled = map(&ctx, from_iter(&ctx, vec![1, 2, 3, 4]), |n| n * 2);

        assert_eq!(doubled.collect_all().await, vec![2, 4, 6, 8]);

        let report = doubled.finish().await.unwrap();
        assert_eq!(report.stages.len(), 2);
        assert_eq!(report.count(StageState::Completed), 2);
    }

    #[tokio::test]
    async fn test_chained_stages_preserve_order_and_count() {
        let ctx = ctx();
        let input: Vec<i64> = (0..200).collect();
        let source = from_iter(&ctx, input.clone());
        let added = map(&ctx, source, |n| n + 1);
        let mut multiplied = map(&ctx, added, |n| n * 3);

        let output = multiplied.collect_all().await;
        let expected: Vec<i64> = input.iter().map(|n| (n + 1) * 3).collect();
        assert_eq!(output, expected);
    }

    #[tokio::test]
    async fn test_filter_keeps_matching() {
        let ctx = ctx();
        let mut evens = filter(&ctx, from_iter(&ctx, 1..=10), |n| n % 2 == 0);
        assert_eq!(evens.collect_all().await, vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test]
    async fn test_try_map_tags_failures_without_stopping() {
        let ctx = ctx();
        let raw = from_iter(&ctx, vec!["1", "x", "3"]);
        let mut parsed = try_map(&ctx, raw, |s| s.parse::<u32>());

        let results = parsed.collect_all().await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().ok(), Some(&1));
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().ok(), Some(&3));

        let report = parsed.finish().await.unwrap();
        assert_eq!(report.count(StageState::Completed), 2);
    }

    #[tokio::test]
    async fn test_stage_names_are_positional() {
        let ctx = ctx();
        let pipe = map(&ctx, map(&ctx, from_iter(&ctx, 0..1), |n| n), |n| n);
        let names: Vec<&str> = pipe.stages().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["source", "map[1]", "map[2]"]);
    }

    #[tokio::test]
    async fn test_cancel_stops_infinite_chain() {
        let ctx = ctx();
        let source = repeat_with(&ctx, || 1u64);
        let mut chain = map(&ctx, map(&ctx, source, |n| n + 1), |n| n * 2);

        assert_eq!(chain.recv().await, Some(4));
        ctx.cancel();

        tokio::time::timeout(Duration::from_secs(1), chain.collect_all())
            .await
            .expect("chain should close after cancellation");

        let report = chain.finish().await.unwrap();
        assert!(report.stages.iter().all(|s| s.state.is_terminal()));
        assert_eq!(report.count(StageState::Cancelled), 3);
    }
}
