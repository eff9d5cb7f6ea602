//! Shared construction parameters for pipeline stages.

use std::num::NonZeroUsize;

use snafu::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, ZeroCapacitySnafu};

/// Buffer depth of every stream created under a [`PipelineContext`].
///
/// Tokio bounded channels cannot have depth zero, so [`Capacity::HANDOFF`]
/// (depth 1) is the strictest producer/consumer coupling available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capacity(NonZeroUsize);

impl Capacity {
    /// Depth 1: a producer can run at most one item ahead of its reader.
    pub const HANDOFF: Capacity = Capacity(NonZeroUsize::MIN);

    /// Create a capacity, rejecting zero.
    pub fn new(depth: usize) -> Result<Self, PipelineError> {
        NonZeroUsize::new(depth).map(Self).context(ZeroCapacitySnafu)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// Everything a stage needs besides its own input and function.
///
/// Cloning is cheap and clones share the same cancellation signal.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    name: String,
    shutdown: CancellationToken,
    capacity: Capacity,
}

impl PipelineContext {
    /// Create a context. `name` labels logs and metrics of every stage.
    pub fn new(name: impl Into<String>, shutdown: CancellationToken, capacity: Capacity) -> Self {
        Self {
            name: name.into(),
            shutdown,
            capacity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared cancellation signal.
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Activate the shared cancellation signal. Idempotent.
    pub fn cancel(&self) {
        self.shutdown.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
