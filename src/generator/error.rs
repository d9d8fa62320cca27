//! Generator error types.

use std::io;
use thiserror::Error;

/// Result type for generator operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Errors from the external SQL generator.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// No generator command configured.
    #[error("no generator configured: set [generator] command in sqlmend.toml")]
    NotConfigured,

    /// Failed to spawn the worker process.
    #[error("failed to spawn generator worker: {0}")]
    SpawnFailed(#[source] io::Error),

    /// Failed to write to worker stdin.
    #[error("failed to write to generator worker: {0}")]
    WriteFailed(#[source] io::Error),

    /// Failed to read from worker stdout.
    #[error("failed to read from generator worker: {0}")]
    ReadFailed(#[source] io::Error),

    #[error("failed to serialize request: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    #[error("failed to deserialize response: {0}")]
    DeserializeFailed(#[source] serde_json::Error),

    /// Request timed out waiting for response.
    #[error("generation timed out after {0} seconds")]
    Timeout(u64),

    /// Worker process exited unexpectedly.
    #[error("generator worker exited unexpectedly")]
    WorkerExited,

    /// Worker returned an error response.
    #[error("generator error: {message} (code: {code})")]
    Remote { code: String, message: String },

    /// The generator answered with nothing usable.
    #[error("generator returned empty output")]
    EmptyOutput,
}

impl GenerationError {
    /// Create a remote error from an error response.
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for GenerationError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::WorkerExited
    }
}
