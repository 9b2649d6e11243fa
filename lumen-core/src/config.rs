//! Light engine tunables.

use serde::Deserialize;
use thiserror::Error;

/// The config shipped with the crate, equal to [`LightingConfig::default`].
pub const DEFAULT_CONFIG: &str = include_str!("../../package-content/lumen_config.json5");

/// Errors raised while reading a [`LightingConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The text is not a valid config document.
    #[error("failed to parse lighting config: {0}")]
    Parse(#[from] serde_json5::Error),
    /// The document parsed but a value is out of range.
    #[error("invalid lighting config: {0}")]
    Invalid(&'static str),
}

/// Construction-time settings of a [`LightingEngine`](crate::light_engine::LightingEngine).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Queued raw updates per channel that force an immediate processing pass.
    pub max_scheduled_updates: usize,
    /// Whether a busy engine reached from a foreign thread logs a warning.
    pub warn_on_foreign_access: bool,
    /// Queue segments allocated up front.
    pub preallocated_segments: usize,
}

impl LightingConfig {
    /// Parses and validates a json5 config document.
    pub fn from_json5(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json5::from_str(text)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_scheduled_updates == 0 {
            return Err("max_scheduled_updates must be at least 1");
        }
        if self.preallocated_segments > 4096 {
            return Err("preallocated_segments must be at most 4096");
        }
        Ok(())
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            max_scheduled_updates: 1 << 22,
            warn_on_foreign_access: true,
            preallocated_segments: 0,
        }
    }
}
