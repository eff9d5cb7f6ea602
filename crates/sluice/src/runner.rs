//! Drives a prime search from configuration to a final report.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sluice_core::{init_metrics, shutdown_signal};
use sluice_core::metrics::parse_address;

use crate::config::Config;
use crate::context::{Capacity, PipelineContext};
use crate::error::PipelineError;
use crate::primes::find_primes;
use crate::signal::cancel_after;
use crate::stage::{PipelineReport, StageState};

/// Run the prime finder described by `config`, handing each prime to `on_prime`.
///
/// SIGINT/SIGTERM and the optional timeout cancel the shared signal; the
/// primes found before that are still delivered and the run reports normally.
/// `on_prime` returning [`ControlFlow::Break`] stops reading and releases the
/// pipeline early.
pub async fn run_prime_finder<F>(config: &Config, mut on_prime: F) -> Result<PipelineReport, PipelineError>
where
    F: FnMut(u64) -> ControlFlow<()>,
{
    if let Some(address) = &config.metrics.address {
        init_metrics(parse_address(address)?)?;
    }

    let settings = &config.pipeline;
    let capacity = Capacity::new(settings.capacity)?;
    let shutdown = CancellationToken::new();
    let ctx = PipelineContext::new(settings.name.clone(), shutdown.clone(), capacity);

    let signal_handler = tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => shutdown.cancel(),
            Err(e) => warn!(error = %e, "Failed to install signal handlers"),
        }
    });
    let deadline = settings
        .timeout_secs
        .map(|secs| cancel_after(ctx.shutdown(), Duration::from_secs(secs)));

    info!(
        pipeline = %ctx.name(),
        capacity = capacity.get(),
        take = settings.take,
        max = settings.max,
        "Starting prime finder"
    );

    let result = search(&ctx, config, &mut on_prime).await;

    signal_handler.abort();
    if let Some(deadline) = deadline {
        deadline.abort();
    }
    result
}

async fn search<F>(ctx: &PipelineContext, config: &Config, on_prime: &mut F) -> Result<PipelineReport, PipelineError>
where
    F: FnMut(u64) -> ControlFlow<()>,
{
    let mut primes = find_primes(ctx, config.pipeline.search())?;

    let mut found = 0usize;
    while let Some(prime) = primes.recv().await {
        found += 1;
        if on_prime(prime).is_break() {
            info!(pipeline = %ctx.name(), found, "Consumer stopped early, releasing pipeline");
            break;
        }
    }

    let report = primes.finish().await?;
    info!(
        pipeline = %ctx.name(),
        found,
        cancelled = ctx.is_cancelled(),
        completed_stages = report.count(StageState::Completed),
        cancelled_stages = report.count(StageState::Cancelled),
        "Prime finder finished"
    );
    Ok(report)
}
