//! The two-stage pipeline state machine.
//!
//! A single owned [`PipelineController`] holds the pipeline state, the
//! per-stage dispatch guards and the current generation's results. Remote
//! calls run on spawned tasks and report back over an mpsc channel; the
//! controller applies those completions one at a time, discarding any that
//! belong to a superseded generation.

use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::aggregate::{AnalysisView, ResultAggregator};
use super::state::{PipelineEvent, PipelineState};
use crate::config::Config;
use crate::error::RemoteError;
use crate::remote::RemoteStageClient;
use crate::types::{Generation, InputSet, SemanticRequest, SemanticResult, Stage, StructuralResult};

/// One-shot dispatch latch for a single stage of the current generation.
#[derive(Default)]
struct StageGuard {
    /// Set on the first successful response
    latched: bool,
    /// Allows one more dispatch after the latch is set
    refresh: bool,
    in_flight: Option<JoinHandle<()>>,
}

impl StageGuard {
    fn may_dispatch(&self) -> bool {
        self.in_flight.is_none() && (!self.latched || self.refresh)
    }

    fn reset(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.latched = false;
        self.refresh = false;
    }
}

#[derive(Default)]
struct Guards {
    generation: Generation,
    structural: StageGuard,
    semantic: StageGuard,
    semantic_failures: u32,
}

/// What a remote stage task reports back.
#[derive(Debug)]
pub(crate) enum StageOutcome {
    Structural(Result<StructuralResult, RemoteError>),
    Semantic(Result<SemanticResult, RemoteError>),
}

impl StageOutcome {
    fn stage(&self) -> Stage {
        match self {
            StageOutcome::Structural(_) => Stage::Structural,
            StageOutcome::Semantic(_) => Stage::Semantic,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StageCompletion {
    pub generation: Generation,
    pub outcome: StageOutcome,
}

/// Run a client call, reporting a panic as a failed request for `stage`.
async fn guarded<T>(
    stage: Stage,
    call: impl Future<Output = Result<T, RemoteError>>,
) -> Result<T, RemoteError> {
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("{stage} client panicked");
            Err(RemoteError::Request {
                stage,
                message: "client panicked".to_string(),
            })
        }
    }
}

/// Owns pipeline state and drives the structural and semantic stages.
pub struct PipelineController {
    client: Arc<dyn RemoteStageClient>,
    word_ceiling: usize,
    semantic_fallbacks: u32,

    state: PipelineState,
    latest_minted: Generation,
    guards: Guards,
    transition: u64,

    input: Option<Arc<InputSet>>,
    structural: Option<Arc<StructuralResult>>,
    semantic: Option<Arc<SemanticResult>>,
    aggregator: ResultAggregator,

    events: broadcast::Sender<PipelineEvent>,
    completions_tx: mpsc::UnboundedSender<StageCompletion>,
    completions_rx: mpsc::UnboundedReceiver<StageCompletion>,
}

impl PipelineController {
    pub fn new(config: &Config, client: Arc<dyn RemoteStageClient>) -> Self {
        let (events, _) = broadcast::channel(config.pipeline.event_buffer.max(1));
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            client,
            word_ceiling: config.limits.semantic_word_ceiling,
            semantic_fallbacks: config.pipeline.semantic_fallbacks,
            state: PipelineState::Idle,
            latest_minted: Generation::default(),
            guards: Guards::default(),
            transition: 0,
            input: None,
            structural: None,
            semantic: None,
            aggregator: ResultAggregator::new(),
            events,
            completions_tx,
            completions_rx,
        }
    }

    /// Stream of state entries, one event per transition.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Watch the aggregated view model of the current generation.
    pub fn view(&self) -> watch::Receiver<Arc<AnalysisView>> {
        self.aggregator.subscribe()
    }

    pub fn current_view(&self) -> Arc<AnalysisView> {
        self.aggregator.view()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Generation currently owning the pipeline.
    pub fn generation(&self) -> Generation {
        self.guards.generation
    }

    pub fn structural_result(&self) -> Option<&StructuralResult> {
        self.structural.as_deref()
    }

    pub fn semantic_result(&self) -> Option<&SemanticResult> {
        self.semantic.as_deref()
    }

    /// Reserve the generation id for a new submission.
    pub fn mint_generation(&mut self) -> Generation {
        self.latest_minted = self.latest_minted.next();
        self.latest_minted
    }

    /// Replace the current input set and start the structural stage.
    ///
    /// Allowed from any state. Returns `false` if `input` was superseded by a
    /// newer submission before it got here.
    pub fn submit(&mut self, input: InputSet) -> bool {
        let generation = input.generation();
        if generation < self.latest_minted || generation <= self.guards.generation {
            tracing::debug!(
                "Ignoring superseded input set {generation} (latest {})",
                self.latest_minted
            );
            return false;
        }
        self.latest_minted = generation;

        self.guards.structural.reset();
        self.guards.semantic.reset();
        self.guards = Guards {
            generation,
            ..Guards::default()
        };
        self.structural = None;
        self.semantic = None;

        let input = Arc::new(input);
        if let Err(e) = self.aggregator.begin(input.clone()) {
            tracing::warn!("{e}");
        }
        tracing::info!(
            "Submitted {} {} item(s) as generation {generation}",
            input.len(),
            input.kind()
        );
        self.input = Some(input);

        self.enter(PipelineState::Structural, None);
        self.dispatch();
        true
    }

    /// Start the remote call for the current stage.
    ///
    /// A no-op returning `false` when a call for the stage is already
    /// outstanding, the stage is latched, or the state has no stage.
    pub fn dispatch(&mut self) -> bool {
        let Some(input) = self.input.clone() else {
            return false;
        };
        let generation = self.guards.generation;
        let client = self.client.clone();
        let tx = self.completions_tx.clone();

        match self.state {
            PipelineState::Structural => {
                let guard = &mut self.guards.structural;
                if !guard.may_dispatch() {
                    tracing::debug!("Structural call for {generation} already dispatched");
                    return false;
                }
                guard.refresh = false;
                tracing::debug!("Dispatching structural call for {generation} via {}", client.name());
                guard.in_flight = Some(tokio::spawn(async move {
                    let outcome = StageOutcome::Structural(
                        guarded(Stage::Structural, client.run_structural(&input)).await,
                    );
                    let _ = tx.send(StageCompletion {
                        generation,
                        outcome,
                    });
                }));
                true
            }
            PipelineState::Semantic => {
                if !self.guards.structural.latched {
                    return false;
                }
                let Some(structural) = self.structural.as_deref() else {
                    return false;
                };
                let request = SemanticRequest::from(structural);
                let guard = &mut self.guards.semantic;
                if !guard.may_dispatch() {
                    tracing::debug!("Semantic call for {generation} already dispatched");
                    return false;
                }
                guard.refresh = false;
                tracing::debug!("Dispatching semantic call for {generation} via {}", client.name());
                guard.in_flight = Some(tokio::spawn(async move {
                    let outcome = StageOutcome::Semantic(
                        guarded(Stage::Semantic, client.run_semantic(&request)).await,
                    );
                    let _ = tx.send(StageCompletion {
                        generation,
                        outcome,
                    });
                }));
                true
            }
            _ => false,
        }
    }

    /// Wait for the next remote completion and apply it.
    ///
    /// Returns `false` if the completion was discarded.
    pub async fn next_completion(&mut self) -> bool {
        match self.completions_rx.recv().await {
            Some(completion) => self.apply(completion),
            None => false,
        }
    }

    /// Apply completions until the pipeline reaches Idle, Complete or Failed.
    pub async fn run_until_settled(&mut self) -> &PipelineState {
        while !self.state.is_settled() {
            self.next_completion().await;
        }
        &self.state
    }

    pub(crate) fn apply(&mut self, completion: StageCompletion) -> bool {
        let StageCompletion {
            generation,
            outcome,
        } = completion;
        let stage = outcome.stage();

        if generation != self.guards.generation {
            tracing::warn!(
                "Discarding stale {stage} completion for {generation} (current {})",
                self.guards.generation
            );
            return false;
        }
        if self.state.stage() != Some(stage) {
            tracing::warn!(
                "Discarding {stage} completion for {generation} while {}",
                self.state
            );
            return false;
        }

        match outcome {
            StageOutcome::Structural(result) => {
                self.guards.structural.in_flight = None;
                self.apply_structural(generation, result);
            }
            StageOutcome::Semantic(result) => {
                self.guards.semantic.in_flight = None;
                self.apply_semantic(generation, result);
            }
        }
        true
    }

    fn apply_structural(
        &mut self,
        generation: Generation,
        result: Result<StructuralResult, RemoteError>,
    ) {
        let result = match result {
            Ok(result) => Arc::new(result),
            Err(e) => {
                tracing::error!("Structural stage failed for {generation}: {e}");
                self.enter(PipelineState::Failed(e.to_string()), None);
                return;
            }
        };

        self.guards.structural.latched = true;
        self.structural = Some(result.clone());
        if let Err(e) = self.aggregator.set_structural(generation, result.clone()) {
            tracing::warn!("{e}");
        }

        if result.participants.is_empty() {
            self.enter(
                PipelineState::Idle,
                Some("No participants detected in the submitted conversation".to_string()),
            );
            return;
        }

        self.enter(PipelineState::Semantic, None);

        let words = result.word_count();
        if words > self.word_ceiling {
            tracing::info!(
                "Skipping semantic stage for {generation}: {words} words over the {} limit",
                self.word_ceiling
            );
            self.enter(
                PipelineState::Complete,
                Some(format!(
                    "Transcript has {words} words, more than the {} supported by semantic analysis; showing structural results only",
                    self.word_ceiling
                )),
            );
            return;
        }

        self.dispatch();
    }

    fn apply_semantic(&mut self, generation: Generation, result: Result<SemanticResult, RemoteError>) {
        match result {
            Ok(result) => {
                let result = Arc::new(result);
                self.guards.semantic.latched = true;
                self.semantic = Some(result.clone());
                if let Err(e) = self.aggregator.set_semantic(generation, result) {
                    tracing::warn!("{e}");
                }
                self.enter(PipelineState::Complete, None);
            }
            Err(e) => {
                self.guards.semantic_failures += 1;
                if self.guards.semantic_failures > self.semantic_fallbacks {
                    tracing::error!("Semantic stage failed for {generation}: {e}");
                    self.enter(PipelineState::Failed(e.to_string()), None);
                    return;
                }
                tracing::warn!(
                    "Semantic stage failed for {generation} ({e}), refreshing structural results"
                );
                self.guards.structural.refresh = true;
                self.enter(PipelineState::Structural, None);
                self.dispatch();
            }
        }
    }

    fn enter(&mut self, state: PipelineState, notice: Option<String>) {
        self.transition += 1;
        let generation = self.guards.generation;
        tracing::debug!("Pipeline {generation}: {} -> {state}", self.state);

        if notice.is_some() {
            if let Err(e) = self.aggregator.set_notice(generation, notice.clone()) {
                tracing::warn!("{e}");
            }
        }

        self.state = state.clone();
        let event = PipelineEvent {
            generation,
            transition: self.transition,
            state,
            item_count: self.input.as_ref().map_or(0, |input| input.len()),
            notice,
        };
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.guards.structural.reset();
        self.guards.semantic.reset();
    }
}
