//! Composing cancellation signals.
//!
//! The pipeline's signal is a [`CancellationToken`]: creating one is
//! `CancellationToken::new()`, activating it is `cancel()`. Both are
//! idempotent and activation is permanent.

use std::time::Duration;

use futures::future::select_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A token that activates as soon as any of `signals` activates.
///
/// A single watcher task waits on all inputs at once. With no inputs the
/// returned token only activates when cancelled directly.
///
/// Must be called from within a Tokio runtime.
pub fn any_of<I>(signals: I) -> CancellationToken
where
    I: IntoIterator<Item = CancellationToken>,
{
    let merged = CancellationToken::new();
    let signals: Vec<CancellationToken> = signals.into_iter().collect();

    if signals.is_empty() {
        return merged;
    }
    if signals.iter().any(CancellationToken::is_cancelled) {
        merged.cancel();
        return merged;
    }

    let trigger = merged.clone();
    let participants = signals.len();
    tokio::spawn(async move {
        let waits = signals
            .into_iter()
            .map(|signal| Box::pin(signal.cancelled_owned()));

        tokio::select! {
            (_, index, _) = select_all(waits) => {
                debug!(index, participants, "Input signal fired, cancelling merged signal");
                trigger.cancel();
            }
            // Cancelled directly: nothing left to watch for.
            _ = trigger.cancelled() => {}
        }
    });

    merged
}

/// Activate `token` once `after` has elapsed, unless it is cancelled first.
///
/// Must be called from within a Tokio runtime.
pub fn cancel_after(token: &CancellationToken, after: Duration) -> JoinHandle<()> {
    let token = token.clone();
    tokio::spawn(async move {
        if token
            .run_until_cancelled(tokio::time::sleep(after))
            .await
            .is_some()
        {
            info!(after_ms = after.as_millis() as u64, "Deadline reached, cancelling");
            token.cancel();
        }
    })
}
