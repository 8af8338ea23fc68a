//! Core data types for the Chatbrain analysis pipeline.
//!
//! These types describe what a user submits (input items grouped into a
//! generation-tagged [`InputSet`]) and what the two remote stages return.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of one submitted input set's lifecycle.
///
/// Minted on every submission; results tagged with an older generation are
/// discarded.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    /// The generation that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One phase of the two-phase remote pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Structural,
    Semantic,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Structural => write!(f, "structural"),
            Stage::Semantic => write!(f, "semantic"),
        }
    }
}

/// Kind of a submitted content item, derived from its mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Image,
    Audio,
}

impl InputKind {
    /// Classify a mime type by its top-level type.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        match mime_type.split('/').next()? {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Text => write!(f, "text"),
            InputKind::Image => write!(f, "image"),
            InputKind::Audio => write!(f, "audio"),
        }
    }
}

/// A single submitted content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
    /// Display name, including the file extension
    pub name: String,

    /// MIME type as reported by the submitter (e.g. "image/png")
    pub mime_type: String,

    /// Raw content bytes
    pub content: Vec<u8>,
}

impl InputItem {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content,
        }
    }

    /// Wrap typed or pasted text as a single text item.
    pub fn from_text(text: &str) -> Self {
        Self::new("input.txt", "text/plain", text.as_bytes().to_vec())
    }

    /// Kind derived from the mime type, `None` if unsupported.
    pub fn kind(&self) -> Option<InputKind> {
        InputKind::from_mime(&self.mime_type)
    }

    /// File extension (text after the last `.`), if the name has one.
    pub fn extension(&self) -> Option<&str> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }

    /// Content size in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// A validated, normalized input set tagged with its generation.
///
/// Items are sorted by name so per-item results line up by index.
#[derive(Debug, Clone)]
pub struct InputSet {
    generation: Generation,
    kind: InputKind,
    items: Vec<InputItem>,
}

impl InputSet {
    /// Build an input set from items that already passed validation.
    ///
    /// Re-sorts by name ascending. Returns `None` for an empty list or an
    /// item without a supported kind.
    pub fn new(generation: Generation, mut items: Vec<InputItem>) -> Option<Self> {
        let kind = items.first()?.kind()?;
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Some(Self {
            generation,
            kind,
            items,
        })
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    pub fn items(&self) -> &[InputItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(InputItem::size).sum()
    }
}

/// Message and character counts for one participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStats {
    pub messages: u64,
    pub characters: u64,
}

/// Conversation-wide counts returned by the structural stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total_messages: u64,
    pub total_characters: u64,
    pub per_participant: BTreeMap<String, MessageStats>,
}

/// A detected message box in a screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Normalized `[x_center, y_center, width, height]`
    pub bbox: [f32; 4],

    /// Detector confidence from 0.0 to 1.0
    pub confidence: f32,

    /// Detector class id
    pub class: u32,

    /// Which side of the conversation the box sits on
    pub position_class: u32,

    /// Text recognized inside the box
    pub text: String,
}

/// All detections for one image item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDetections {
    pub boxes: Vec<Detection>,

    /// True when every box sits on the same side (only one speaker visible)
    pub one_sided: bool,
}

/// Output of the structural stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralResult {
    /// Participant identifiers, ordered and unique
    pub participants: Vec<String>,

    /// Aggregated conversation transcript
    pub transcript: String,

    /// Message counts by participant
    pub stats: ConversationStats,

    /// Per-item detections aligned by index with the input set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_item_detections: Option<Vec<ItemDetections>>,
}

impl StructuralResult {
    /// Number of whitespace-separated words in the transcript.
    pub fn word_count(&self) -> usize {
        self.transcript.split_whitespace().count()
    }
}

/// Conversation-level semantic metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationScores {
    pub linguistic_synchrony_score: f64,
    pub trust_asymmetry_score: f64,
    pub temporal_engagement_score: f64,
}

/// Per-participant semantic metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantScores {
    pub emotional_complexity: f64,
    pub social_perception: f64,
    pub cognitive_dissonance: f64,
    pub vulnerability_activation: f64,
    pub temporal_consistency: f64,
    pub trust: f64,
    pub conceptual_proficiency: f64,
}

/// Output of the semantic stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticResult {
    pub conversation_scores: ConversationScores,
    pub per_participant_scores: BTreeMap<String, ParticipantScores>,
    pub insights: Vec<String>,
}

/// Payload of the semantic call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticRequest {
    pub transcript: String,
    pub participants: Vec<String>,
}

impl From<&StructuralResult> for SemanticRequest {
    fn from(result: &StructuralResult) -> Self {
        Self {
            transcript: result.transcript.clone(),
            participants: result.participants.clone(),
        }
    }
}
