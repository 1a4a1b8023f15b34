//! Error types for process-group operations.

use thiserror::Error;

/// Errors raised while building or operating on a process group.
#[derive(Debug, Error)]
pub enum GroupError {
    /// A caller-supplied argument was out of its documented domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying transport failed to complete a send, receive, or wait.
    #[error("transport error: {0}")]
    Transport(String),
}
