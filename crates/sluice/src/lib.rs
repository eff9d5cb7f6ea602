//! Sluice: cancelable streaming pipelines over tokio channels.
//!
//! This crate handles:
//! - Generators that turn values into bounded streams
//! - Linear transform stages (`map`, `filter`, `try_map`)
//! - Fan-out worker pools and fan-in merges
//! - Bounded consumption with `take`, releasing upstream stages on exit
//! - A shared cancellation signal that every stage observes
//! - Per-stage lifecycle tracking and a final pipeline report
//!
//! ```ignore
//! let ctx = PipelineContext::new("doubles", CancellationToken::new(), Capacity::new(4)?);
//! let numbers = source::from_iter(&ctx, 1..=4);
//! let mut doubled = transform::map(&ctx, numbers, |n| n * 2);
//! assert_eq!(doubled.collect_all().await, vec![2, 4, 6, 8]);
//! doubled.finish().await?;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod fan_in;
pub mod fan_out;
pub mod pipe;
pub mod primes;
pub mod runner;
pub mod signal;
pub mod source;
pub mod stage;
pub mod take;
pub mod transform;

// Re-export commonly used items
pub use config::{CliArgs, Config, PipelineConfig, WorkersSetting};
pub use context::{Capacity, PipelineContext};
pub use error::PipelineError;
pub use fan_in::fan_in;
pub use fan_out::{WorkerCount, fan_out};
pub use pipe::Pipe;
pub use primes::{PrimeSearch, find_primes, find_primes_in, is_prime};
pub use runner::run_prime_finder;
pub use signal::{any_of, cancel_after};
pub use stage::{PipelineReport, StageExit, StageHandle, StageReport, StageState};
pub use take::take;
pub use tokio_util::sync::CancellationToken;

// Re-export from sluice-core
pub use sluice_core::{init_tracing, shutdown_signal};
