//! Pipeline states and the events emitted when one is entered.

use serde::Serialize;
use std::fmt;

use crate::types::{Generation, Stage};

/// Where the current generation is in the two-stage pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Structural,
    Semantic,
    Complete,
    Failed(String),
}

impl PipelineState {
    /// The remote stage this state waits on, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineState::Structural => Some(Stage::Structural),
            PipelineState::Semantic => Some(Stage::Semantic),
            _ => None,
        }
    }

    /// True when no remote call is expected to move the state further.
    pub fn is_settled(&self) -> bool {
        self.stage().is_none()
    }

    /// Status line shown while in this state.
    pub fn status_text(&self) -> &'static str {
        match self {
            PipelineState::Idle => "",
            PipelineState::Structural => "Analyzing metadata...",
            PipelineState::Semantic => "Running semantic analysis...",
            PipelineState::Complete => "Analysis complete!",
            PipelineState::Failed(_) => "Analysis failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Structural => write!(f, "structural"),
            PipelineState::Semantic => write!(f, "semantic"),
            PipelineState::Complete => write!(f, "complete"),
            PipelineState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Emitted by the controller every time it enters a state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineEvent {
    /// Generation the state belongs to
    pub generation: Generation,

    /// Sequence number of this transition, strictly increasing per controller
    pub transition: u64,

    /// The state just entered
    #[serde(flatten)]
    pub state: PipelineState,

    /// Number of items in the generation's input set
    pub item_count: usize,

    /// Non-error notice (degraded input, nothing to analyze)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}
