//! Signal vocabulary shared by every engine.
//!
//! A signal is the only way engines talk to each other. It is built as a
//! draft by the emitter, then stamped (timestamp + sequence) and frozen behind
//! an `Arc` by the bus, so every subscriber sees the same immutable value.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Identifier of a logical engine role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineId(String);

impl EngineId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EngineId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EngineId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for EngineId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Well-known engine identifiers.
pub mod ids {
    pub const TEXT_INPUT: &str = "text-input";
    pub const EMOTION_INFERENCE: &str = "emotion-inference";
    pub const EMPATHIC_COUPLING: &str = "empathic-coupling";
    pub const MEMORY: &str = "memory";
    pub const DEFAULT_MODE: &str = "default-mode";
    pub const GROWTH: &str = "growth";
    pub const ARBITER: &str = "arbiter";
    pub const THOUGHT_BRIDGE: &str = "thought-bridge";
    pub const REFLECTION_BRIDGE: &str = "reflection-bridge";
    /// Source used for stimuli that come from outside the mind.
    pub const WORLD: &str = "world";
}

/// Enumerated signal tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalType {
    TextInput,
    PerceptionResult,
    AttentionFocus,
    EmotionDetected,
    EmpathicState,
    PersonStateUpdate,
    PerspectiveUpdate,
    MemoryQuery,
    MemoryResult,
    /// "I want to think": picked up by the thought bridge.
    Thought,
    ReasoningResponse,
    DefaultModeThought,
    ReflectRequest,
    ReflectionResult,
    GrowthInsight,
    Speech,
}

impl SignalType {
    pub const ALL: [SignalType; 16] = [
        SignalType::TextInput,
        SignalType::PerceptionResult,
        SignalType::AttentionFocus,
        SignalType::EmotionDetected,
        SignalType::EmpathicState,
        SignalType::PersonStateUpdate,
        SignalType::PerspectiveUpdate,
        SignalType::MemoryQuery,
        SignalType::MemoryResult,
        SignalType::Thought,
        SignalType::ReasoningResponse,
        SignalType::DefaultModeThought,
        SignalType::ReflectRequest,
        SignalType::ReflectionResult,
        SignalType::GrowthInsight,
        SignalType::Speech,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::TextInput => "text-input",
            SignalType::PerceptionResult => "perception-result",
            SignalType::AttentionFocus => "attention-focus",
            SignalType::EmotionDetected => "emotion-detected",
            SignalType::EmpathicState => "empathic-state",
            SignalType::PersonStateUpdate => "person-state-update",
            SignalType::PerspectiveUpdate => "perspective-update",
            SignalType::MemoryQuery => "memory-query",
            SignalType::MemoryResult => "memory-result",
            SignalType::Thought => "thought",
            SignalType::ReasoningResponse => "reasoning-response",
            SignalType::DefaultModeThought => "default-mode-thought",
            SignalType::ReflectRequest => "reflect-request",
            SignalType::ReflectionResult => "reflection-result",
            SignalType::GrowthInsight => "growth-insight",
            SignalType::Speech => "speech",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal priority tier. Carried as metadata; it never reorders a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Idle,
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A typed, optionally targeted message between engines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub kind: SignalType,
    pub source: EngineId,
    /// `None` means broadcast to every subscriber of `kind`.
    pub target: Option<Vec<EngineId>>,
    pub payload: Value,
    pub priority: Priority,
    /// Monotonic time since the scheduler started, stamped at emission.
    pub timestamp: Duration,
    /// Bus-wide emission sequence, stamped at emission.
    pub seq: u64,
}

impl Signal {
    /// Start a broadcast draft with medium priority.
    pub fn new(kind: SignalType, source: impl Into<EngineId>, payload: Value) -> Self {
        Self {
            kind,
            source: source.into(),
            target: None,
            payload,
            priority: Priority::default(),
            timestamp: Duration::ZERO,
            seq: 0,
        }
    }

    /// Restrict delivery to the given engines.
    pub fn to<I, E>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EngineId>,
    {
        self.target = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Whether this signal is addressed to `engine` (broadcasts address everyone).
    pub fn is_for(&self, engine: &EngineId) -> bool {
        match &self.target {
            None => true,
            Some(targets) => targets.contains(engine),
        }
    }

    /// Decode the payload into a typed view.
    ///
    /// A malformed payload is logged and yields `None`; callers skip the signal.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<T> {
        match serde_json::from_value(self.payload.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(
                    "Malformed {} payload from {}: {}",
                    self.kind,
                    self.source,
                    e
                );
                None
            }
        }
    }

    pub(crate) fn stamp(mut self, timestamp: Duration, seq: u64) -> Self {
        self.timestamp = timestamp;
        self.seq = seq;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signal_type_tags_match_serde() {
        for kind in SignalType::ALL {
            let tag = serde_json::to_value(kind).unwrap();
            assert_eq!(tag, json!(kind.as_str()));
        }
    }

    #[test]
    fn test_broadcast_is_for_everyone() {
        let s = Signal::new(SignalType::TextInput, ids::WORLD, json!({"text": "hi"}));
        assert!(s.is_for(&EngineId::from("anyone")));
    }

    #[test]
    fn test_targeted_only_for_members() {
        let s = Signal::new(SignalType::Thought, ids::ARBITER, Value::Null)
            .to([ids::THOUGHT_BRIDGE, ids::GROWTH]);
        assert!(s.is_for(&EngineId::from(ids::GROWTH)));
        assert!(!s.is_for(&EngineId::from(ids::MEMORY)));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::Idle < Priority::Low);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_payload_as_malformed_is_none() {
        #[derive(Deserialize)]
        struct Text {
            #[allow(dead_code)]
            text: String,
        }
        let s = Signal::new(SignalType::TextInput, ids::WORLD, json!({"nope": 1}));
        assert!(s.payload_as::<Text>().is_none());
    }
}
