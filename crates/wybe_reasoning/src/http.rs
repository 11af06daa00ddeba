//! HTTP channel: JSON `POST`s to the think and reflect endpoints.

use crate::channel::{ReasoningChannel, ReflectResponse, ThinkRequest, ThinkResponse};
use crate::retry::{send_with_backoff, RetryConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use wybe_core::payload::ReflectRequest;
use wybe_core::BridgeConfig;

#[derive(Debug, Clone)]
pub struct HttpChannel {
    client: Client,
    think_url: String,
    reflect_url: String,
    retry: RetryConfig,
}

impl HttpChannel {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs.max(1)))
                .build()
                .context("Failed to build HTTP client")?,
            think_url: format!("{}{}", base, config.think_path),
            reflect_url: format!("{}{}", base, config.reflect_path),
            retry: RetryConfig::with_attempts(config.max_attempts),
        })
    }

    pub fn think_url(&self) -> &str {
        &self.think_url
    }

    pub fn reflect_url(&self) -> &str {
        &self.reflect_url
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = send_with_backoff(&self.retry, url, || {
            let request = self.client.post(url).json(body);
            async move { request.send().await.map_err(anyhow::Error::from) }
        })
        .await?;

        response
            .json::<R>()
            .await
            .with_context(|| format!("Malformed response body from {}", url))
    }
}

#[async_trait]
impl ReasoningChannel for HttpChannel {
    async fn think(&self, request: ThinkRequest) -> Result<ThinkResponse> {
        tracing::debug!(
            "POST {} ({} history entries)",
            self.think_url,
            request.conversation_history.len()
        );
        self.post(&self.think_url, &request).await
    }

    async fn reflect(&self, request: ReflectRequest) -> Result<ReflectResponse> {
        tracing::debug!("POST {} ({} memories)", self.reflect_url, request.memories.len());
        self.post(&self.reflect_url, &request).await
    }

    fn name(&self) -> &str {
        "http"
    }
}
