//! Backoff for calls to the reasoning service.
//!
//! Throttling (429), request timeouts (408), server faults (5xx) and dropped
//! connections get another try after a growing pause. Any other status is
//! the service saying no, and fails straight away.

use anyhow::{anyhow, Result};
use rand::Rng;
use reqwest::{Response, StatusCode};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total tries, the first one included.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl RetryConfig {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Pauses between consecutive tries, before jitter.
    fn pauses(&self) -> impl Iterator<Item = Duration> + '_ {
        std::iter::successors(Some(self.initial_delay), move |prev| {
            Some(Duration::from_secs_f64(
                (prev.as_secs_f64() * self.backoff_factor).min(self.max_delay.as_secs_f64()),
            ))
        })
        .take(self.max_attempts.saturating_sub(1) as usize)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
        }
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

enum Outcome {
    Done(Response),
    Refused(anyhow::Error),
    Transient(String),
}

async fn classify(url: &str, sent: Result<Response>) -> Outcome {
    let response = match sent {
        Ok(response) => response,
        Err(e) => return Outcome::Transient(format!("{:#}", e)),
    };
    let status = response.status();
    if status.is_success() {
        return Outcome::Done(response);
    }
    let body: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(200)
        .collect();
    if is_retryable_status(status) {
        Outcome::Transient(format!("{} {}", status, body))
    } else {
        Outcome::Refused(anyhow!("{} refused the request ({}): {}", url, status, body))
    }
}

/// Send via `send` until a 2xx comes back, the service refuses, or the
/// configured attempts run out.
pub async fn send_with_backoff<F, Fut>(config: &RetryConfig, url: &str, send: F) -> Result<Response>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    let mut pauses = config.pauses();
    let mut attempt = 1;
    loop {
        let reason = match classify(url, send().await).await {
            Outcome::Done(response) => {
                if attempt > 1 {
                    tracing::info!("{} answered on attempt {}", url, attempt);
                }
                return Ok(response);
            }
            Outcome::Refused(e) => return Err(e),
            Outcome::Transient(reason) => reason,
        };

        let Some(pause) = pauses.next() else {
            return Err(anyhow!(
                "{} unavailable after {} attempts: {}",
                url,
                attempt,
                reason
            ));
        };
        tracing::warn!(
            "{} attempt {}/{} failed ({}), retrying",
            url,
            attempt,
            config.max_attempts,
            reason
        );
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));
        tokio::time::sleep(pause + jitter).await;
        attempt += 1;
    }
}
