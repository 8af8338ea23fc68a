//! Combines the current generation's input and stage results into one
//! immutable view model for presentation.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::AggregateError;
use crate::types::{
    ConversationScores, Generation, InputKind, InputSet, ItemDetections, ParticipantScores,
    SemanticResult, StructuralResult,
};

/// Everything the presentation layer renders for one generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisView {
    pub generation: Generation,
    pub items: Vec<ItemView>,
    pub transcript: String,
    pub total_messages: u64,
    pub total_characters: u64,
    pub participants: Vec<ParticipantView>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_scores: Option<ConversationScores>,

    pub insights: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// One submitted item, with its detections when the structural stage
/// returned any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub name: String,
    pub kind: InputKind,
    pub size: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detections: Option<ItemDetections>,
}

/// One participant's counts and, once the semantic stage ran, scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantView {
    pub id: String,
    pub messages: u64,
    pub characters: u64,
    /// Percent of all messages sent by this participant
    pub message_share: f64,
    /// Percent of all characters typed by this participant
    pub character_share: f64,
    pub average_message_length: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<ParticipantScores>,
}

impl AnalysisView {
    fn build(
        generation: Generation,
        input: Option<&InputSet>,
        structural: Option<&StructuralResult>,
        semantic: Option<&SemanticResult>,
        notice: Option<&str>,
    ) -> Self {
        let detections = structural.and_then(|s| s.per_item_detections.as_deref());
        let items = input
            .map(|input| {
                if let Some(d) = detections {
                    if d.len() != input.len() {
                        tracing::warn!(
                            "Structural stage returned {} detection set(s) for {} item(s)",
                            d.len(),
                            input.len()
                        );
                    }
                }
                input
                    .items()
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| ItemView {
                        name: item.name.clone(),
                        kind: input.kind(),
                        size: item.size(),
                        detections: detections.and_then(|d| d.get(idx)).cloned(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut view = AnalysisView {
            generation,
            items,
            notice: notice.map(str::to_string),
            ..Default::default()
        };

        if let Some(structural) = structural {
            let stats = &structural.stats;
            view.transcript = structural.transcript.clone();
            view.total_messages = stats.total_messages;
            view.total_characters = stats.total_characters;
            view.participants = structural
                .participants
                .iter()
                .map(|id| {
                    let counts = stats.per_participant.get(id).copied().unwrap_or_default();
                    ParticipantView {
                        id: id.clone(),
                        messages: counts.messages,
                        characters: counts.characters,
                        message_share: percent(counts.messages, stats.total_messages),
                        character_share: percent(counts.characters, stats.total_characters),
                        average_message_length: ratio(counts.characters, counts.messages),
                        scores: semantic
                            .and_then(|s| s.per_participant_scores.get(id))
                            .copied(),
                    }
                })
                .collect();
        }

        if let Some(semantic) = semantic {
            view.conversation_scores = Some(semantic.conversation_scores);
            view.insights = semantic.insights.clone();
        }

        view
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    ratio(part, whole) * 100.0
}

/// Holds the latest data for one generation and republishes the view on
/// every accepted change.
pub struct ResultAggregator {
    generation: Generation,
    input: Option<Arc<InputSet>>,
    structural: Option<Arc<StructuralResult>>,
    semantic: Option<Arc<SemanticResult>>,
    notice: Option<String>,
    view: watch::Sender<Arc<AnalysisView>>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    pub fn new() -> Self {
        let (view, _) = watch::channel(Arc::new(AnalysisView::default()));
        Self {
            generation: Generation::default(),
            input: None,
            structural: None,
            semantic: None,
            notice: None,
            view,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AnalysisView>> {
        self.view.subscribe()
    }

    pub fn view(&self) -> Arc<AnalysisView> {
        self.view.borrow().clone()
    }

    /// Start a new generation, dropping everything from the previous one.
    pub fn begin(&mut self, input: Arc<InputSet>) -> Result<(), AggregateError> {
        let generation = input.generation();
        if generation < self.generation {
            return Err(AggregateError::StaleGeneration {
                what: "input set",
                got: generation,
                current: self.generation,
            });
        }
        self.generation = generation;
        self.input = Some(input);
        self.structural = None;
        self.semantic = None;
        self.notice = None;
        self.publish();
        Ok(())
    }

    pub fn set_structural(
        &mut self,
        generation: Generation,
        result: Arc<StructuralResult>,
    ) -> Result<(), AggregateError> {
        self.check("structural result", generation)?;
        self.structural = Some(result);
        self.publish();
        Ok(())
    }

    pub fn set_semantic(
        &mut self,
        generation: Generation,
        result: Arc<SemanticResult>,
    ) -> Result<(), AggregateError> {
        self.check("semantic result", generation)?;
        self.semantic = Some(result);
        self.publish();
        Ok(())
    }

    pub fn set_notice(
        &mut self,
        generation: Generation,
        notice: Option<String>,
    ) -> Result<(), AggregateError> {
        self.check("notice", generation)?;
        self.notice = notice;
        self.publish();
        Ok(())
    }

    fn check(&self, what: &'static str, generation: Generation) -> Result<(), AggregateError> {
        if generation != self.generation {
            return Err(AggregateError::StaleGeneration {
                what,
                got: generation,
                current: self.generation,
            });
        }
        Ok(())
    }

    fn publish(&mut self) {
        let view = AnalysisView::build(
            self.generation,
            self.input.as_deref(),
            self.structural.as_deref(),
            self.semantic.as_deref(),
            self.notice.as_deref(),
        );
        self.view.send_replace(Arc::new(view));
    }
}
