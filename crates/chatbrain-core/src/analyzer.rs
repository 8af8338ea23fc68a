//! Entry point tying input handling, the pipeline controller and the
//! progress estimator together.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::config::Config;
use crate::error::Result;
use crate::input::{Normalizer, Validator};
use crate::pipeline::{
    AnalysisView, PipelineController, PipelineEvent, PipelineState, ProgressEstimator,
    ProgressHandle, ProgressSnapshot,
};
use crate::remote::{HttpStageClient, RemoteStageClient};
use crate::types::{Generation, InputItem, InputSet};

/// Chat analyzer: validates and normalizes submissions, then runs them
/// through the structural and semantic stages.
///
/// Must be created inside a tokio runtime; the progress estimator runs on
/// its own task.
pub struct Analyzer {
    validator: Validator,
    normalizer: Normalizer,
    controller: PipelineController,
    progress: ProgressHandle,
}

impl Analyzer {
    pub fn new(config: &Config, client: Arc<dyn RemoteStageClient>) -> Self {
        let controller = PipelineController::new(config, client);
        let progress = ProgressEstimator::new(config.progress.clone()).spawn(controller.subscribe());
        tracing::debug!("Initializing Chatbrain analyzer v{}", crate::VERSION);
        Self {
            validator: Validator::new(config.limits.clone()),
            normalizer: Normalizer::new(&config.limits),
            controller,
            progress,
        }
    }

    /// Analyzer backed by the HTTP analysis service from `config.remote`.
    pub fn with_http(config: &Config) -> Result<Self> {
        let client = HttpStageClient::new(&config.remote)?;
        tracing::debug!("Analysis service at {}", config.remote.endpoint);
        Ok(Self::new(config, Arc::new(client)))
    }

    /// Validate, normalize and submit raw items as a new generation.
    ///
    /// Validation and normalization failures are returned here and leave the
    /// pipeline untouched.
    pub async fn submit(&mut self, items: Vec<InputItem>) -> Result<Generation> {
        let generation = self.controller.mint_generation();
        self.validator.validate(&items)?;
        let items = self.normalizer.normalize(items).await?;

        // Validation guarantees a non-empty, single-kind list
        let Some(input) = InputSet::new(generation, items) else {
            return Err(crate::error::ValidationError::Empty.into());
        };
        self.controller.submit(input);
        Ok(generation)
    }

    /// Submit typed or pasted text.
    pub async fn submit_text(&mut self, text: &str) -> Result<Generation> {
        self.submit(vec![InputItem::from_text(text)]).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.controller.subscribe()
    }

    pub fn progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.subscribe()
    }

    pub fn progress_snapshot(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    pub fn view(&self) -> watch::Receiver<Arc<AnalysisView>> {
        self.controller.view()
    }

    pub fn current_view(&self) -> Arc<AnalysisView> {
        self.controller.current_view()
    }

    pub fn state(&self) -> &PipelineState {
        self.controller.state()
    }

    pub async fn run_until_settled(&mut self) -> &PipelineState {
        self.controller.run_until_settled().await
    }
}
