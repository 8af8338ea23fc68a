//! JSON wire records exchanged with the analysis service.

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{
    ConversationScores, ConversationStats, Detection, ItemDetections, MessageStats,
    ParticipantScores, SemanticRequest, SemanticResult, StructuralResult,
};

// --- Structural response ---

#[derive(Debug, Deserialize)]
pub(crate) struct StructuralResponse {
    metadata: MetadataWire,
    #[serde(default)]
    conversation: String,
    #[serde(default)]
    images: Option<Vec<ImageWire>>,
}

/// Totals plus one entry per participant keyed by name.
///
/// Participants keep the order the service listed them in.
#[derive(Debug, Default)]
struct MetadataWire {
    total_messages: u64,
    total_characters: u64,
    participants: Vec<(String, ParticipantStatsWire)>,
}

impl<'de> Deserialize<'de> for MetadataWire {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MetadataVisitor;

        impl<'de> Visitor<'de> for MetadataVisitor {
            type Value = MetadataWire;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a metadata object with totals and per-participant stats")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<MetadataWire, A::Error> {
                let mut metadata = MetadataWire::default();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "total_messages" => metadata.total_messages = map.next_value()?,
                        "total_characters" => metadata.total_characters = map.next_value()?,
                        _ => {
                            if metadata.participants.iter().any(|(name, _)| *name == key) {
                                return Err(de::Error::custom(format!(
                                    "duplicate participant `{key}`"
                                )));
                            }
                            let stats = map.next_value()?;
                            metadata.participants.push((key, stats));
                        }
                    }
                }
                Ok(metadata)
            }
        }

        deserializer.deserialize_map(MetadataVisitor)
    }
}

#[derive(Debug, Deserialize)]
struct ParticipantStatsWire {
    #[serde(alias = "messages", default)]
    number_messages: u64,
    #[serde(alias = "characters", default)]
    number_characters: u64,
}

#[derive(Debug, Deserialize)]
struct ImageWire {
    #[serde(default)]
    boxes: Vec<BoxWire>,
    #[serde(rename = "oneSided", default)]
    one_sided: bool,
}

#[derive(Debug, Deserialize)]
struct BoxWire {
    xywhn: [f32; 4],
    conf: f32,
    cls: u32,
    #[serde(rename = "posClass")]
    pos_class: u32,
    #[serde(default)]
    text: String,
}

impl From<StructuralResponse> for StructuralResult {
    fn from(resp: StructuralResponse) -> Self {
        let participants: Vec<String> = resp
            .metadata
            .participants
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        let per_participant: BTreeMap<String, MessageStats> = resp
            .metadata
            .participants
            .into_iter()
            .map(|(name, stats)| {
                (
                    name,
                    MessageStats {
                        messages: stats.number_messages,
                        characters: stats.number_characters,
                    },
                )
            })
            .collect();

        let per_item_detections = resp.images.map(|images| {
            images
                .into_iter()
                .map(|image| ItemDetections {
                    boxes: image
                        .boxes
                        .into_iter()
                        .map(|b| Detection {
                            bbox: b.xywhn,
                            confidence: b.conf,
                            class: b.cls,
                            position_class: b.pos_class,
                            text: b.text,
                        })
                        .collect(),
                    one_sided: image.one_sided,
                })
                .collect()
        });

        StructuralResult {
            participants,
            transcript: resp.conversation,
            stats: ConversationStats {
                total_messages: resp.metadata.total_messages,
                total_characters: resp.metadata.total_characters,
                per_participant,
            },
            per_item_detections,
        }
    }
}

// --- Semantic request/response ---

#[derive(Debug, Serialize)]
pub(crate) struct SemanticRequestWire<'a> {
    conversation: &'a str,
    users: &'a [String],
}

impl<'a> From<&'a SemanticRequest> for SemanticRequestWire<'a> {
    fn from(request: &'a SemanticRequest) -> Self {
        Self {
            conversation: &request.transcript,
            users: &request.participants,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SemanticResponse {
    conversation_metrics: ConversationMetricsWire,
    #[serde(default)]
    users: BTreeMap<String, ParticipantScores>,
    #[serde(default)]
    insights: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationMetricsWire {
    linguistic_synchrony_score: f64,
    // The service spells it "asymetry"
    #[serde(alias = "trust_asymetry_score")]
    trust_asymmetry_score: f64,
    temporal_engagement_score: f64,
}

impl From<SemanticResponse> for SemanticResult {
    fn from(resp: SemanticResponse) -> Self {
        SemanticResult {
            conversation_scores: ConversationScores {
                linguistic_synchrony_score: resp.conversation_metrics.linguistic_synchrony_score,
                trust_asymmetry_score: resp.conversation_metrics.trust_asymmetry_score,
                temporal_engagement_score: resp.conversation_metrics.temporal_engagement_score,
            },
            per_participant_scores: resp.users,
            insights: resp.insights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_response_text() {
        let json = r#"{
            "metadata": {
                "total_messages": 3,
                "total_characters": 42,
                "alice": {"number_messages": 2, "number_characters": 30},
                "bob": {"number_messages": 1, "number_characters": 12}
            },
            "conversation": "alice: hey\nbob: hi there\nalice: how are you"
        }"#;
        let resp: StructuralResponse = serde_json::from_str(json).unwrap();
        let result = StructuralResult::from(resp);

        assert_eq!(result.participants, ["alice", "bob"]);
        assert_eq!(result.stats.total_messages, 3);
        assert_eq!(result.stats.per_participant["alice"].characters, 30);
        assert!(result.per_item_detections.is_none());
        assert_eq!(result.word_count(), 9);
    }

    #[test]
    fn test_participants_keep_service_order() {
        let json = r#"{
            "metadata": {
                "zoe": {"number_messages": 2, "number_characters": 20},
                "total_messages": 3,
                "adam": {"number_messages": 1, "number_characters": 5},
                "total_characters": 25
            },
            "conversation": "zoe: hey there\nadam: hi\nzoe: ok"
        }"#;
        let result = StructuralResult::from(serde_json::from_str::<StructuralResponse>(json).unwrap());

        assert_eq!(result.participants, ["zoe", "adam"]);
        assert_eq!(result.stats.total_messages, 3);
        assert_eq!(result.stats.total_characters, 25);
        assert_eq!(result.stats.per_participant["adam"].characters, 5);

        let request = SemanticRequest::from(&result);
        let wire = serde_json::to_value(SemanticRequestWire::from(&request)).unwrap();
        assert_eq!(wire["users"], serde_json::json!(["zoe", "adam"]));
    }

    #[test]
    fn test_duplicate_participant_is_rejected() {
        let json = r#"{
            "metadata": {
                "zoe": {"number_messages": 1, "number_characters": 2},
                "zoe": {"number_messages": 3, "number_characters": 4}
            },
            "conversation": ""
        }"#;
        assert!(serde_json::from_str::<StructuralResponse>(json).is_err());
    }

    #[test]
    fn test_structural_response_accepts_short_stat_names() {
        let json = r#"{
            "metadata": {"total_messages": 1, "total_characters": 5,
                         "unidentifiable": {"messages": 1, "characters": 5}},
            "conversation": "hello"
        }"#;
        let result = StructuralResult::from(serde_json::from_str::<StructuralResponse>(json).unwrap());
        assert_eq!(result.stats.per_participant["unidentifiable"].messages, 1);
    }

    #[test]
    fn test_structural_response_with_images() {
        let json = r#"{
            "metadata": {"total_messages": 0, "total_characters": 0},
            "conversation": "",
            "images": [
                {"boxes": [{"xywhn": [0.5, 0.1, 0.4, 0.05], "conf": 0.91, "cls": 0, "posClass": 1, "text": "hi"}],
                 "oneSided": true},
                {"boxes": [], "oneSided": false}
            ]
        }"#;
        let result = StructuralResult::from(serde_json::from_str::<StructuralResponse>(json).unwrap());

        assert!(result.participants.is_empty());
        let detections = result.per_item_detections.unwrap();
        assert_eq!(detections.len(), 2);
        assert!(detections[0].one_sided);
        assert_eq!(detections[0].boxes[0].position_class, 1);
        assert_eq!(detections[0].boxes[0].text, "hi");
    }

    #[test]
    fn test_semantic_request_wire_shape() {
        let request = SemanticRequest {
            transcript: "alice: hi".to_string(),
            participants: vec!["alice".to_string()],
        };
        let json = serde_json::to_value(SemanticRequestWire::from(&request)).unwrap();
        assert_eq!(json["conversation"], "alice: hi");
        assert_eq!(json["users"][0], "alice");
    }

    #[test]
    fn test_semantic_response() {
        let json = r#"{
            "conversation_metrics": {
                "linguistic_synchrony_score": 71,
                "trust_asymetry_score": 12.5,
                "temporal_engagement_score": 88
            },
            "users": {
                "alice": {
                    "emotional_complexity": 60, "social_perception": 70,
                    "cognitive_dissonance": 10, "vulnerability_activation": 35,
                    "temporal_consistency": 80, "trust": 65, "conceptual_proficiency": 75
                }
            },
            "insights": ["Alice leads most exchanges."]
        }"#;
        let result = SemanticResult::from(serde_json::from_str::<SemanticResponse>(json).unwrap());

        assert_eq!(result.conversation_scores.trust_asymmetry_score, 12.5);
        assert_eq!(result.per_participant_scores["alice"].trust, 65.0);
        assert_eq!(result.insights.len(), 1);
    }

    #[test]
    fn test_semantic_response_missing_metrics_fails() {
        let json = r#"{"users": {}, "insights": []}"#;
        assert!(serde_json::from_str::<SemanticResponse>(json).is_err());
    }
}
