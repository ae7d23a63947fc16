//! Configuration for the compiler, the schedulers and the external-display hook.
//!
//! Every section and every field is optional; anything left out takes its
//! default value.
//!
//! ```yaml
//! layout:
//!   default_size: 34.7
//!   display_width: 1200
//! schedule:
//!   min_interval_ms: 525
//! hook:
//!   max_delay_ms: 3000
//!   priority: 10
//! ```

use std::path::Path;
use std::time::Duration;

use hudtext_markup::LayoutMetrics;
use hudtext_schedule::{Priority, SchedulerConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a [`HudConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid YAML or has fields of the wrong type.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A field has a value the compiler or scheduler cannot work with.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// How the host reacts when something outside this crate shows content on
/// a recipient's display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Upper bound on how long to wait before repainting over foreign content.
    pub max_delay_ms: u64,
    /// Priority of the repaint request.
    pub priority: Priority,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            max_delay_ms: 3000,
            priority: Priority::NORMAL,
        }
    }
}

impl HookConfig {
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HudConfig {
    pub layout: LayoutMetrics,
    pub schedule: SchedulerConfig,
    pub hook: HookConfig,
}

impl HudConfig {
    /// Parses and validates a YAML document.
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: HudConfig = if yaml.trim().is_empty() {
            HudConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Checks that every layout measurement is a positive, finite number.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        positive("layout.default_size", layout.default_size)?;
        positive("layout.default_line_height", layout.default_line_height)?;
        positive("layout.ems_to_pixels", layout.ems_to_pixels)?;
        positive("layout.display_width", layout.display_width)?;
        positive("layout.smallcaps_ratio", layout.smallcaps_ratio)?;
        if layout.smallcaps_ratio > 1.0 {
            return Err(ConfigError::Invalid {
                field: "layout.smallcaps_ratio",
                reason: format!("must not exceed 1, got {}", layout.smallcaps_ratio),
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be a positive number, got {value}"),
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn positive_widths_validate(width in 1.0f32..10_000.0, size in 1.0f32..200.0) {
            let config = HudConfig {
                layout: LayoutMetrics {
                    display_width: width,
                    default_size: size,
                    ..LayoutMetrics::default()
                },
                ..HudConfig::default()
            };
            prop_assert!(config.validate().is_ok());
        }

        #[test]
        fn non_positive_widths_are_rejected(width in -10_000.0f32..=0.0) {
            let config = HudConfig {
                layout: LayoutMetrics {
                    display_width: width,
                    ..LayoutMetrics::default()
                },
                ..HudConfig::default()
            };
            prop_assert!(config.validate().is_err());
        }
    }
}
