//! The request/response boundary to the reasoning service.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wybe_core::payload::{ReflectRequest, ThoughtRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// What we sent.
    User,
    /// What came back.
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

/// Body of a think call: the thought plus the conversation so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkRequest {
    #[serde(flatten)]
    pub thought: ThoughtRequest,
    #[serde(default)]
    pub conversation_history: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkResponse {
    pub text: String,
    /// Left raw; parsed leniently by the bridge.
    #[serde(default)]
    pub emotion_shift: Option<Value>,
}

impl ThinkResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emotion_shift: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflectResponse {
    #[serde(default)]
    pub thought: Option<String>,
}

/// An asynchronous path to the reasoning service.
///
/// Any `Err` is a bridge failure; callers degrade rather than propagate.
#[async_trait]
pub trait ReasoningChannel: Send + Sync {
    async fn think(&self, request: ThinkRequest) -> Result<ThinkResponse>;

    async fn reflect(&self, request: ReflectRequest) -> Result<ReflectResponse>;

    fn name(&self) -> &str;
}
