//! Typed views of signal payloads.
//!
//! Payloads travel as `serde_json::Value`; these structs are the agreed
//! shapes. Field names are camelCase to match the external service bodies.

use crate::state::{SelfState, StateShift};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Encode a payload, degrading to `null` if serialization fails.
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or_else(|e| {
        tracing::warn!("Failed to encode payload: {}", e);
        Value::Null
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInput {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perception {
    pub modality: String,
    pub content: String,
    pub salience: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionFocus {
    pub content: String,
    pub modality: String,
    pub salience: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionDetection {
    pub emotions: Vec<String>,
    pub valence: f32,
    pub arousal: f32,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmpathicState {
    pub response: String,
    pub intensity: f32,
    pub their_emotions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonStateUpdate {
    pub person_id: String,
    /// Attachment strength in [0, 1].
    pub attachment: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveUpdate {
    pub they_think_of_me: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryQuery {
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryResult {
    pub items: Vec<String>,
}

/// Theory-of-mind guess about the other party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TomInference {
    pub they_feel: String,
    pub they_want: String,
    pub they_believe: String,
}

/// "I want to think": the payload of a `thought` signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtRequest {
    pub content: String,
    #[serde(default)]
    pub context: Vec<String>,
    pub self_state: SelfState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empathic_state: Option<EmpathicState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tom_inference: Option<TomInference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_memories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_emotions: Option<EmotionDetection>,
}

/// Result of a reasoning round trip, re-injected by the thought bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningResult {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_shift: Option<StateShift>,
    /// Set when this is the fallback produced by a failed request.
    #[serde(default)]
    pub degraded: bool,
    #[serde(default)]
    pub request_seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mood {
    pub valence: f32,
    pub arousal: f32,
    pub energy: f32,
}

impl From<&SelfState> for Mood {
    fn from(s: &SelfState) -> Self {
        Self {
            valence: s.valence,
            arousal: s.arousal,
            energy: s.energy,
        }
    }
}

/// Ask the reflection service for an inner thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectRequest {
    /// At most five recent memories.
    pub memories: Vec<String>,
    pub mood: Mood,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_stream: Option<String>,
}

/// `thought` is `None` when the service failed or answered with nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionResult {
    pub thought: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerThought {
    pub thought: String,
    pub category: String,
    #[serde(default)]
    pub continuation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthInsight {
    pub interaction_count: u64,
    pub failed_responses: u64,
    pub emotion_accuracy: f32,
    pub response_quality: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speech {
    pub text: String,
}
