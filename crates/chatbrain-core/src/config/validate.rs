//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_items == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_items must be > 0".into(),
            ));
        }
        if self.limits.max_total_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_total_bytes must be > 0".into(),
            ));
        }
        if self.limits.max_image_height == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_height must be > 0".into(),
            ));
        }
        if self.progress.tick_ms == 0 {
            return Err(ConfigError::ValidationError(
                "progress.tick_ms must be > 0".into(),
            ));
        }
        if self.progress.structural.ceiling > 100 {
            return Err(ConfigError::ValidationError(
                "progress.structural.ceiling must be between 0 and 100".into(),
            ));
        }
        if self.progress.semantic.ceiling > 100 {
            return Err(ConfigError::ValidationError(
                "progress.semantic.ceiling must be between 0 and 100".into(),
            ));
        }
        if self.progress.structural.base_ms == 0 {
            return Err(ConfigError::ValidationError(
                "progress.structural.base_ms must be > 0".into(),
            ));
        }
        if self.progress.semantic.duration_ms == 0 {
            return Err(ConfigError::ValidationError(
                "progress.semantic.duration_ms must be > 0".into(),
            ));
        }
        if self.pipeline.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.event_buffer must be > 0".into(),
            ));
        }
        if self.remote.endpoint.is_empty() {
            return Err(ConfigError::ValidationError(
                "remote.endpoint must not be empty".into(),
            ));
        }
        if self.remote.timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "remote.timeout_ms must be > 0 when set".into(),
            ));
        }
        Ok(())
    }
}
