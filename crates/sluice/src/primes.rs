//! Prime finder: the canonical fan-out/fan-in pipeline.
//!
//! ```text
//! numbers ─┬─ fan_out[0] ─┐
//!          ├─ fan_out[1] ─┼─ fan_in ── take(n)
//!          └─ fan_out[k] ─┘
//! ```
//!
//! Primality testing is order-independent and expensive per item, which is
//! exactly the kind of stage worth fanning out.

use rand::Rng;

use crate::context::PipelineContext;
use crate::error::{EmptySearchRangeSnafu, PipelineError};
use crate::fan_in::fan_in;
use crate::fan_out::{WorkerCount, fan_out};
use crate::pipe::Pipe;
use crate::source::{from_iter, repeat_with};
use crate::take::take;

/// Parameters of a random prime search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimeSearch {
    /// Exclusive upper bound of the random candidates.
    pub max: u64,
    pub workers: WorkerCount,
    /// How many primes to find before stopping.
    pub take: usize,
}

/// Trial division over odd divisors up to `√n`.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut divisor = 3u64;
    while divisor <= n / divisor {
        if n % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}

/// Find `search.take` primes among random candidates in `0..search.max`.
pub fn find_primes(ctx: &PipelineContext, search: PrimeSearch) -> Result<Pipe<u64>, PipelineError> {
    ensure_range(search.max)?;
    let max = search.max;
    let candidates = repeat_with(ctx, move || rand::rng().random_range(0..max));
    primes_from(ctx, candidates, search.workers, search.take)
}

/// Find up to `n` primes among a fixed candidate sequence.
pub fn find_primes_in<I>(
    ctx: &PipelineContext,
    candidates: I,
    workers: WorkerCount,
    n: usize,
) -> Result<Pipe<u64>, PipelineError>
where
    I: IntoIterator<Item = u64>,
    I::IntoIter: Send + 'static,
{
    primes_from(ctx, from_iter(ctx, candidates), workers, n)
}

fn primes_from(
    ctx: &PipelineContext,
    candidates: Pipe<u64>,
    workers: WorkerCount,
    n: usize,
) -> Result<Pipe<u64>, PipelineError> {
    let finders = fan_out(ctx, candidates, workers, |candidate| {
        is_prime(candidate).then_some(candidate)
    })?;
    Ok(take(ctx, fan_in(ctx, finders), n))
}

fn ensure_range(max: u64) -> Result<(), PipelineError> {
    snafu::ensure!(max > 0, EmptySearchRangeSnafu);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Capacity;
    use crate::stage::StageState;
    use std::collections::BTreeSet;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> PipelineContext {
        PipelineContext::new("primes", CancellationToken::new(), Capacity::new(4).unwrap())
    }

    #[test]
    fn test_is_prime_small_values() {
        let primes: Vec<u64> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn test_is_prime_squares_and_large() {
        assert!(!is_prime(49));
        assert!(!is_prime(7919 * 7919));
        assert!(is_prime(1_000_000_007));
        assert!(is_prime(u64::from(u32::MAX) - 4));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_three_workers_take_five() {
        let ctx = ctx();
        let mut primes = find_primes_in(&ctx, 2..=11, WorkerCount::Fixed(3), 5).unwrap();

        let found: BTreeSet<u64> = primes.collect_all().await.into_iter().collect();
        assert_eq!(found, BTreeSet::from([2, 3, 5, 7, 11]));

        primes.finish().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_random_search_finishes_with_take() {
        let ctx = ctx();
        let search = PrimeSearch {
            max: 50_000_000,
            workers: WorkerCount::Auto,
            take: 10,
        };
        let mut primes = find_primes(&ctx, search).unwrap();

        let found = tokio::time::timeout(Duration::from_secs(10), primes.collect_all())
            .await
            .expect("search should finish");
        assert_eq!(found.len(), 10);
        assert!(found.iter().all(|&n| is_prime(n) && n < 50_000_000));

        let report = tokio::time::timeout(Duration::from_secs(10), primes.finish())
            .await
            .expect("infinite generator should be released by take")
            .unwrap();
        assert!(report.stages.iter().all(|s| s.state.is_terminal()));
        assert_eq!(report.stages.last().map(|s| s.state), Some(StageState::Completed));
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_empty_range_rejected() {
        let search = PrimeSearch {
            max: 0,
            workers: WorkerCount::Auto,
            take: 1,
        };
        assert!(matches!(
            find_primes(&ctx(), search),
            Err(PipelineError::EmptySearchRange)
        ));
    }
}
