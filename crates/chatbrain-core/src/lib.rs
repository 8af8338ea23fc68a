//! Chatbrain Core - chat conversation analysis pipeline.
//!
//! Chatbrain takes a conversation (screenshots, an audio recording, or pasted
//! text), sends it through a remote structural stage that extracts the
//! participants and transcript, then through a semantic stage that scores the
//! conversation and produces narrative insights.
//!
//! # Architecture
//!
//! ```text
//! Items → Validate → Normalize → Structural → Semantic → AnalysisView
//!                                     ↑____________|  (one fallback refresh)
//! ```
//!
//! Every submission gets a new [`Generation`]; completions belonging to an
//! older generation are dropped. Progress is an eased estimate driven by the
//! controller's [`PipelineEvent`] stream.
//!
//! # Usage
//!
//! ```rust,ignore
//! use chatbrain_core::{Analyzer, Config};
//!
//! #[tokio::main]
//! async fn main() -> chatbrain_core::Result<()> {
//!     let config = Config::load()?;
//!     let mut analyzer = Analyzer::with_http(&config)?;
//!
//!     analyzer.submit_text("alice: hi\nbob: hello").await?;
//!     let state = analyzer.run_until_settled().await;
//!     println!("{state}: {:?}", analyzer.current_view().insights);
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod remote;
pub mod types;

pub use analyzer::Analyzer;
pub use config::Config;
pub use error::{
    AggregateError, ChatbrainError, ConfigError, NormalizeError, RemoteError, Result,
    ValidationError,
};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{
    AnalysisView, PipelineController, PipelineEvent, PipelineState, ProgressSnapshot,
};
pub use remote::{HttpStageClient, RemoteStageClient};
pub use types::{Generation, InputItem, InputKind, InputSet, Stage};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
