//! # Wybe Reasoning
//!
//! Bridges between the tick loop and a slow, out-of-process reasoning
//! service. The loop never awaits a call: bridges spawn the request and feed
//! the answer back through an [`wybe_core::Injector`].

pub mod bridge;
pub mod channel;
pub mod history;
pub mod http;
pub mod latch;
pub mod mock;
pub mod reflection;
pub mod retry;
pub mod shift;

pub use bridge::{fallback_result, BridgeHandle, ThoughtBridge, FALLBACK_TEXT};
pub use channel::{
    HistoryMessage, ReasoningChannel, ReflectResponse, Role, ThinkRequest, ThinkResponse,
};
pub use history::ConversationHistory;
pub use http::HttpChannel;
pub use mock::{MockChannel, MockReply};
pub use reflection::ReflectionBridge;

use anyhow::Result;
use std::sync::Arc;
use wybe_core::BridgeConfig;

/// The HTTP channel, or the offline mock when `offline` is set.
pub fn channel_from_config(config: &BridgeConfig, offline: bool) -> Result<Arc<dyn ReasoningChannel>> {
    if offline {
        tracing::info!("Reasoning offline: using mock channel");
        return Ok(Arc::new(MockChannel::new()));
    }
    let channel = HttpChannel::new(config)?;
    tracing::info!("Reasoning via {}", channel.think_url());
    Ok(Arc::new(channel))
}
