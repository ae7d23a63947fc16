use hudtext_schedule::ScheduleError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the [`Coordinator`](crate::Coordinator) and config loading.
#[derive(Debug, Error)]
pub enum HudError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A recipient's scheduler could not be started.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
