//! Scripted channel for tests and offline runs.
//!
//! Replies are served from a script in order; once it runs dry `think`
//! echoes the content and `reflect` returns nothing. An optional gate holds
//! every `think` call until a permit is released, which makes "request still
//! pending" deterministic in tests.

use crate::channel::{ReasoningChannel, ReflectResponse, ThinkRequest, ThinkResponse};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use wybe_core::payload::ReflectRequest;

#[derive(Debug, Clone)]
pub enum MockReply {
    Think(ThinkResponse),
    Fail(String),
}

#[derive(Debug, Default)]
pub struct MockChannel {
    think_script: Mutex<VecDeque<MockReply>>,
    reflect_script: Mutex<VecDeque<Result<Option<String>, String>>>,
    requests: Mutex<Vec<ThinkRequest>>,
    think_calls: AtomicUsize,
    reflect_calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    latency: Option<Duration>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold each `think` until the returned semaphore gets a permit.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                gate: Some(Arc::clone(&gate)),
                ..Self::default()
            },
            gate,
        )
    }

    /// Delay every `think` reply by `latency`, after the gate.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push_reply(&self, reply: MockReply) {
        self.think_script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    pub fn push_text(&self, text: &str) {
        self.push_reply(MockReply::Think(ThinkResponse::text(text)));
    }

    pub fn push_failure(&self, error: &str) {
        self.push_reply(MockReply::Fail(error.to_string()));
    }

    pub fn push_reflection(&self, reply: Result<Option<String>, String>) {
        self.reflect_script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    pub fn think_calls(&self) -> usize {
        self.think_calls.load(Ordering::SeqCst)
    }

    pub fn reflect_calls(&self) -> usize {
        self.reflect_calls.load(Ordering::SeqCst)
    }

    /// Every think request received so far.
    pub fn requests(&self) -> Vec<ThinkRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ReasoningChannel for MockChannel {
    async fn think(&self, request: ThinkRequest) -> Result<ThinkResponse> {
        self.think_calls.fetch_add(1, Ordering::SeqCst);
        let content = request.thought.content.clone();
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self
            .think_script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(MockReply::Think(response)) => Ok(response),
            Some(MockReply::Fail(error)) => anyhow::bail!("mock failure: {}", error),
            None => Ok(ThinkResponse::text(format!("(offline) I heard: {}", content))),
        }
    }

    async fn reflect(&self, _request: ReflectRequest) -> Result<ReflectResponse> {
        self.reflect_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .reflect_script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(Ok(thought)) => Ok(ReflectResponse { thought }),
            Some(Err(error)) => anyhow::bail!("mock failure: {}", error),
            None => Ok(ReflectResponse::default()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
