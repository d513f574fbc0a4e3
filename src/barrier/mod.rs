//! Barriers: observers that run before a command is forwarded.
//!
//! # Data Flow
//! ```text
//! WebDriverCommand
//!     → BarrierChain::run
//!         → barrier[0].on_command ─ await ─┐
//!         → barrier[1].on_command ─ await ─┤  strictly in registration order
//!         → ...                            │
//!     → Ok(())  → forward upstream         │
//!     → Err(e)  → 500 to caller, nothing forwarded
//! ```
//!
//! # Design Decisions
//! - Barriers are registered before serving and never removed
//! - The chain is an `Arc<[_]>`, cloned into every request without locking
//! - A barrier that wants to see the response registers a listener on the
//!   command instead of blocking the chain

pub mod stability;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::command::WebDriverCommand;
use crate::observability::metrics;

pub use stability::StabilityBarrier;

/// Error returned by a barrier to stop a command from being forwarded.
///
/// The message is sent verbatim to the client as the body of a 500.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct BarrierError {
    message: String,
}

impl BarrierError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for BarrierError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for BarrierError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// An observer the proxy waits on before forwarding each command.
#[async_trait]
pub trait Barrier: Send + Sync {
    /// Called once per command, including unclassified ones. The command is
    /// not forwarded until the returned future resolves.
    async fn on_command(&self, command: &Arc<WebDriverCommand>) -> Result<(), BarrierError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The ordered, frozen list of barriers.
#[derive(Clone, Default)]
pub struct BarrierChain {
    barriers: Arc<[Arc<dyn Barrier>]>,
}

impl BarrierChain {
    pub fn new(barriers: Vec<Arc<dyn Barrier>>) -> Self {
        Self {
            barriers: barriers.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.barriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.barriers.is_empty()
    }

    /// Run every barrier in order, stopping at the first failure.
    pub async fn run(&self, command: &Arc<WebDriverCommand>) -> Result<(), BarrierError> {
        for barrier in self.barriers.iter() {
            if let Err(e) = barrier.on_command(command).await {
                tracing::warn!(
                    command_id = %command.id(),
                    kind = %command.kind(),
                    barrier = barrier.name(),
                    error = %e,
                    "Barrier rejected command"
                );
                metrics::record_barrier_failure(command.kind());
                return Err(e);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for BarrierChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.barriers.iter().map(|b| b.name()))
            .finish()
    }
}
