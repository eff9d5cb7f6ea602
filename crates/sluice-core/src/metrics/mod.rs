//! Metrics and observability infrastructure.
//!
//! - `events`: internal event types and the `InternalEvent` trait
//! - `server`: Prometheus recorder and HTTP listener setup

pub mod events;
pub mod server;

pub use server::{init, parse_address};

/// Emit an internal metrics event.
///
/// Calls `InternalEvent::emit()` on the given event, which records the
/// matching Prometheus metric. Without an installed recorder this is a no-op.
///
/// ```ignore
/// use sluice_core::emit;
/// use sluice_core::metrics::events::ActiveWorkers;
///
/// emit!(ActiveWorkers { count: 4, pipeline: "primes".to_string() });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

pub use emit;
