//! Error types for the scheduler crate.

use thiserror::Error;

/// Errors that can occur when creating a scheduler.
///
/// Misuse of a running scheduler (resuming while idle, cancelling twice)
/// is never an error; those calls are no-ops.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The worker thread could not be started.
    #[error("failed to spawn flush worker `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;
