//! Two-stage analysis pipeline.
//!
//! - **state**: pipeline states and the events emitted on each transition
//! - **controller**: the state machine owning guards, generations and results
//! - **progress**: eased progress estimate driven by controller events
//! - **aggregate**: immutable view model for the current generation

pub mod aggregate;
pub mod controller;
pub mod progress;
pub mod state;

pub use aggregate::{AnalysisView, ItemView, ParticipantView, ResultAggregator};
pub use controller::PipelineController;
pub use progress::{ProgressCurve, ProgressEstimator, ProgressHandle, ProgressSnapshot};
pub use state::{PipelineEvent, PipelineState};
