//! Scripted in-process backend for controller and analyzer tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::client::RemoteStageClient;
use crate::error::RemoteError;
use crate::types::{
    ConversationScores, ConversationStats, InputSet, MessageStats, ParticipantScores,
    SemanticRequest, SemanticResult, Stage, StructuralResult,
};

type StructuralFn = Box<dyn Fn(u32) -> Result<StructuralResult, RemoteError> + Send + Sync>;
type SemanticFn = Box<dyn Fn(u32) -> Result<SemanticResult, RemoteError> + Send + Sync>;

pub(crate) struct MockClient {
    /// Produces the structural answer for each call index.
    structural_fn: StructuralFn,
    /// Produces the semantic answer for each call index.
    semantic_fn: SemanticFn,
    pub structural_calls: Arc<AtomicU32>,
    pub semantic_calls: Arc<AtomicU32>,
    /// When set, every call waits for a permit before answering.
    gate: Option<Arc<Semaphore>>,
}

impl MockClient {
    /// Both stages succeed with `conversation(..)` and `scores(..)`.
    pub fn success(transcript: &str, participants: &[&str]) -> Self {
        let structural = conversation(transcript, participants);
        let semantic = scores(participants);
        Self::scripted(
            move |_| Ok(structural.clone()),
            move |_| Ok(semantic.clone()),
        )
    }

    pub fn scripted(
        structural: impl Fn(u32) -> Result<StructuralResult, RemoteError> + Send + Sync + 'static,
        semantic: impl Fn(u32) -> Result<SemanticResult, RemoteError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            structural_fn: Box::new(structural),
            semantic_fn: Box::new(semantic),
            structural_calls: Arc::new(AtomicU32::new(0)),
            semantic_calls: Arc::new(AtomicU32::new(0)),
            gate: None,
        }
    }

    /// Hold every call until the returned semaphore is given permits.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    async fn wait(&self) {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }
}

#[async_trait]
impl RemoteStageClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run_structural(&self, _input: &InputSet) -> Result<StructuralResult, RemoteError> {
        let idx = self.structural_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        (self.structural_fn)(idx)
    }

    async fn run_semantic(
        &self,
        _request: &SemanticRequest,
    ) -> Result<SemanticResult, RemoteError> {
        let idx = self.semantic_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        (self.semantic_fn)(idx)
    }
}

/// Structural answer with one message per participant.
pub(crate) fn conversation(transcript: &str, participants: &[&str]) -> StructuralResult {
    let per_participant: BTreeMap<String, MessageStats> = participants
        .iter()
        .map(|p| {
            (
                p.to_string(),
                MessageStats {
                    messages: 1,
                    characters: 10,
                },
            )
        })
        .collect();
    StructuralResult {
        participants: participants.iter().map(|p| p.to_string()).collect(),
        transcript: transcript.to_string(),
        stats: ConversationStats {
            total_messages: participants.len() as u64,
            total_characters: participants.len() as u64 * 10,
            per_participant,
        },
        per_item_detections: None,
    }
}

pub(crate) fn scores(participants: &[&str]) -> SemanticResult {
    SemanticResult {
        conversation_scores: ConversationScores {
            linguistic_synchrony_score: 70.0,
            trust_asymmetry_score: 15.0,
            temporal_engagement_score: 80.0,
        },
        per_participant_scores: participants
            .iter()
            .map(|p| {
                (
                    p.to_string(),
                    ParticipantScores {
                        trust: 60.0,
                        ..Default::default()
                    },
                )
            })
            .collect(),
        insights: vec!["Both sides engage evenly.".to_string()],
    }
}

pub(crate) fn http_error(stage: Stage, status: u16) -> RemoteError {
    RemoteError::Http {
        stage,
        status,
        body: "upstream error".to_string(),
    }
}
