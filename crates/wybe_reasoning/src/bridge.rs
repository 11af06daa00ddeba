//! Thought bridge: the only way a `thought` leaves the process.
//!
//! On a trigger the bridge takes the in-flight latch, records the request in
//! history, and spawns the call onto the tokio runtime. The tick loop never
//! waits for it. The outcome comes back through the [`Injector`] as a
//! `reasoning-response` on some later tick. Triggers that arrive while a call
//! is out are dropped; the arbiter asks again later.
//!
//! Failures never escape: they become a degraded fallback reply.

use crate::channel::{ReasoningChannel, ThinkRequest};
use crate::history::ConversationHistory;
use crate::latch::{InFlight, InFlightGuard};
use crate::shift::extract_shift;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use wybe_core::payload::{encode, ReasoningResult, ThoughtRequest};
use wybe_core::{
    ids, Dimension, Engine, EngineContext, EngineId, Injector, Priority, Signal, SignalType,
    StateShift,
};

pub const FALLBACK_TEXT: &str =
    "I... lost my train of thought for a moment. Could you say that again?";

/// The reply used whenever the service could not be reached or made no sense.
pub fn fallback_result(request_seq: u64) -> ReasoningResult {
    ReasoningResult {
        text: FALLBACK_TEXT.to_string(),
        emotion_shift: Some(
            StateShift::new()
                .with(Dimension::Confidence, -0.1)
                .with(Dimension::Energy, -0.05),
        ),
        degraded: true,
        request_seq,
    }
}

fn lock(history: &Mutex<ConversationHistory>) -> MutexGuard<'_, ConversationHistory> {
    history.lock().unwrap_or_else(|e| e.into_inner())
}

/// Read-only view of a bridge that has been handed to the scheduler.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    latch: InFlight,
    history: Arc<Mutex<ConversationHistory>>,
    dropped: Arc<AtomicU64>,
}

impl BridgeHandle {
    /// Whether a call is outstanding. Engine status does not track this.
    pub fn is_in_flight(&self) -> bool {
        self.latch.is_busy()
    }

    pub fn history_len(&self) -> usize {
        lock(&self.history).len()
    }

    /// Triggers dropped because a call was already out.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct ThoughtBridge {
    id: EngineId,
    channel: Arc<dyn ReasoningChannel>,
    injector: Injector,
    latch: InFlight,
    history: Arc<Mutex<ConversationHistory>>,
    dropped: Arc<AtomicU64>,
    sent: u64,
    debug: String,
}

impl ThoughtBridge {
    pub fn new(channel: Arc<dyn ReasoningChannel>, injector: Injector, history_cap: usize) -> Self {
        Self {
            id: ids::THOUGHT_BRIDGE.into(),
            channel,
            injector,
            latch: InFlight::new(),
            history: Arc::new(Mutex::new(ConversationHistory::new(history_cap))),
            dropped: Arc::new(AtomicU64::new(0)),
            sent: 0,
            debug: String::new(),
        }
    }

    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle {
            latch: self.latch.clone(),
            history: Arc::clone(&self.history),
            dropped: Arc::clone(&self.dropped),
        }
    }

    fn trigger(&mut self, thought: ThoughtRequest, signal_seq: u64) {
        let Some(guard) = self.latch.try_acquire() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Thought bridge busy, dropping trigger #{}", signal_seq);
            return;
        };

        let (history_seq, conversation_history) = {
            let mut history = lock(&self.history);
            let seq = history.push_outbound(thought.content.clone());
            (seq, history.messages_except(seq))
        };
        let request = ThinkRequest {
            thought,
            conversation_history,
        };

        self.sent += 1;
        self.debug = format!("Asked {} (#{})", self.channel.name(), self.sent);

        let call = Call {
            channel: Arc::clone(&self.channel),
            history: Arc::clone(&self.history),
            injector: self.injector.clone(),
            history_seq,
            signal_seq,
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(call.run(request, guard));
            }
            Err(_) => {
                tracing::warn!("No async runtime; answering with fallback");
                drop(guard);
                call.deliver(fallback_result(signal_seq));
            }
        }
    }
}

/// Everything the spawned task needs, detached from the engine.
struct Call {
    channel: Arc<dyn ReasoningChannel>,
    history: Arc<Mutex<ConversationHistory>>,
    injector: Injector,
    history_seq: u64,
    signal_seq: u64,
}

impl Call {
    async fn run(self, request: ThinkRequest, guard: InFlightGuard) {
        let result = match self.channel.think(request).await {
            Ok(response) => {
                let (text, emotion_shift) =
                    extract_shift(&response.text, response.emotion_shift.as_ref());
                if text.is_empty() {
                    tracing::warn!("{} returned an empty reply", self.channel.name());
                    fallback_result(self.signal_seq)
                } else {
                    lock(&self.history).push_inbound(self.history_seq, text.clone());
                    ReasoningResult {
                        text,
                        emotion_shift,
                        degraded: false,
                        request_seq: self.signal_seq,
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Reasoning via {} failed: {:#}", self.channel.name(), e);
                fallback_result(self.signal_seq)
            }
        };

        // Free the latch before the reply can prompt another trigger.
        drop(guard);
        self.deliver(result);
    }

    fn deliver(&self, result: ReasoningResult) {
        let signal = Signal::new(SignalType::ReasoningResponse, ids::THOUGHT_BRIDGE, encode(&result))
            .to([ids::ARBITER, ids::GROWTH])
            .with_priority(Priority::High);
        if !self.injector.inject(signal) {
            tracing::debug!("Tick loop gone; discarding reasoning result");
        }
    }
}

impl Engine for ThoughtBridge {
    fn id(&self) -> &EngineId {
        &self.id
    }

    fn subscribes_to(&self) -> Vec<SignalType> {
        vec![SignalType::Thought]
    }

    fn process(&mut self, batch: &[Arc<Signal>], _ctx: &mut EngineContext<'_>) {
        for signal in batch {
            match signal.payload_as::<ThoughtRequest>() {
                Some(thought) => self.trigger(thought, signal.seq),
                None => tracing::warn!("Ignoring malformed thought #{}", signal.seq),
            }
        }
    }

    fn debug_info(&self) -> String {
        let busy = if self.latch.is_busy() { ", waiting" } else { "" };
        format!(
            "{}{} ({} dropped)",
            self.debug,
            busy,
            self.dropped.load(Ordering::Relaxed)
        )
    }
}
