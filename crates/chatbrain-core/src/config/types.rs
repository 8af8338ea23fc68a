//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits applied to a submitted input set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum number of items per submission
    pub max_items: usize,

    /// Maximum combined size of all items, in bytes
    pub max_total_bytes: u64,

    /// Images taller than this are downscaled to it
    pub max_image_height: u32,

    /// Transcripts with more words than this skip the semantic stage
    pub semantic_word_ceiling: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_items: 10,
            max_total_bytes: 10 * 1024 * 1024,
            max_image_height: 1000,
            semantic_word_ceiling: 1000,
        }
    }
}

/// Progress estimation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Interval between progress recomputations in milliseconds
    pub tick_ms: u64,

    /// Structural stage curve
    pub structural: StructuralProgressConfig,

    /// Semantic stage curve
    pub semantic: SemanticProgressConfig,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            structural: StructuralProgressConfig::default(),
            semantic: SemanticProgressConfig::default(),
        }
    }
}

impl ProgressConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Structural curve: nominal duration grows with the number of items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralProgressConfig {
    /// Highest percent shown before the stage actually completes
    pub ceiling: u8,

    /// Fixed part of the nominal duration in milliseconds
    pub base_ms: u64,

    /// Added to the nominal duration for each submitted item
    pub per_item_ms: u64,
}

impl Default for StructuralProgressConfig {
    fn default() -> Self {
        Self {
            ceiling: 96,
            base_ms: 3000,
            per_item_ms: 1500,
        }
    }
}

impl StructuralProgressConfig {
    /// Nominal duration for an input set of `item_count` items.
    pub fn nominal_duration(&self, item_count: usize) -> Duration {
        let per_item = self.per_item_ms.saturating_mul(item_count as u64);
        Duration::from_millis(self.base_ms.saturating_add(per_item))
    }
}

/// Semantic curve: constant nominal duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticProgressConfig {
    /// Highest percent shown before the stage actually completes
    pub ceiling: u8,

    /// Nominal duration in milliseconds
    pub duration_ms: u64,
}

impl Default for SemanticProgressConfig {
    fn default() -> Self {
        Self {
            ceiling: 99,
            duration_ms: 15_000,
        }
    }
}

/// Controller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How many semantic failures per generation fall back to a structural
    /// refresh before the generation fails
    pub semantic_fallbacks: u32,

    /// Capacity of the pipeline event channel
    pub event_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            semantic_fallbacks: 1,
            event_buffer: 64,
        }
    }
}

/// Remote analysis service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the analysis service
    pub endpoint: String,

    /// Path of the structural stage
    pub structural_path: String,

    /// Path of the semantic stage
    pub semantic_path: String,

    /// Bearer token (supports ${ENV_VAR} syntax); empty disables the header
    pub api_key: String,

    /// Per-request timeout in milliseconds; unset waits indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000".to_string(),
            structural_path: "/metadata".to_string(),
            semantic_path: "/llm".to_string(),
            api_key: String::new(),
            timeout_ms: None,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
