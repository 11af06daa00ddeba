//! The arbiter decides when to think and what to say.
//!
//! A perception becomes an `attention-focus` right away. After a short
//! deliberation window (so emotion, empathy and memory can weigh in) the
//! arbiter asks the thought bridge to reason about it. The bridge drops
//! triggers while busy, so an unanswered request is re-sent after
//! `retry_after_ticks`. The answer's shift is applied and its text spoken.

use std::collections::VecDeque;
use std::sync::Arc;
use wybe_core::payload::{
    AttentionFocus, EmotionDetection, EmpathicState, MemoryResult, Perception, ReasoningResult,
    Speech, ThoughtRequest,
};
use wybe_core::{ids, Engine, EngineContext, EngineId, Priority, Signal, SignalType};

const CONTEXT_CAP: usize = 5;
const DELIBERATION_TICKS: u64 = 3;
const RETRY_AFTER_TICKS: u64 = 600;

#[derive(Debug, Clone)]
struct Pending {
    content: String,
    due_tick: u64,
    sent_at: Option<u64>,
}

pub struct ArbiterEngine {
    id: EngineId,
    deliberation_ticks: u64,
    retry_after_ticks: u64,
    context: VecDeque<String>,
    pending: Option<Pending>,
    /// Heard while a request was already out; becomes the next pending.
    queued: Option<String>,
    emotions: Option<EmotionDetection>,
    empathy: Option<EmpathicState>,
    memories: Vec<String>,
    spoken: u64,
    debug: String,
}

fn merge(existing: Option<String>, next: String) -> String {
    match existing {
        Some(prev) => format!("{}\n{}", prev, next),
        None => next,
    }
}

impl ArbiterEngine {
    pub fn new() -> Self {
        Self::with_timing(DELIBERATION_TICKS, RETRY_AFTER_TICKS)
    }

    pub fn with_timing(deliberation_ticks: u64, retry_after_ticks: u64) -> Self {
        Self {
            id: ids::ARBITER.into(),
            deliberation_ticks,
            retry_after_ticks: retry_after_ticks.max(1),
            context: VecDeque::new(),
            pending: None,
            queued: None,
            emotions: None,
            empathy: None,
            memories: Vec::new(),
            spoken: 0,
            debug: String::new(),
        }
    }

    /// Whether a thought request is out and unanswered.
    pub fn is_awaiting(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| p.sent_at.is_some())
    }

    fn on_perception(&mut self, perception: Perception, ctx: &mut EngineContext<'_>) {
        let focus = AttentionFocus {
            content: perception.content.clone(),
            modality: perception.modality,
            salience: perception.salience,
        };
        let out = ctx
            .signal(SignalType::AttentionFocus, &focus)
            .to([ids::MEMORY, ids::DEFAULT_MODE])
            .with_priority(Priority::Medium);
        ctx.emit(out);

        self.context.push_back(perception.content.clone());
        while self.context.len() > CONTEXT_CAP {
            self.context.pop_front();
        }

        let due_tick = ctx.tick() + self.deliberation_ticks;
        match self.pending.take() {
            Some(p) if p.sent_at.is_some() => {
                self.queued = Some(merge(self.queued.take(), perception.content));
                self.pending = Some(p);
            }
            Some(p) => {
                self.pending = Some(Pending {
                    content: merge(Some(p.content), perception.content),
                    due_tick,
                    sent_at: None,
                });
            }
            None => {
                self.pending = Some(Pending {
                    content: perception.content,
                    due_tick,
                    sent_at: None,
                });
            }
        }
    }

    fn on_response(&mut self, result: ReasoningResult, ctx: &mut EngineContext<'_>) {
        if let Some(shift) = &result.emotion_shift {
            ctx.apply_shift(shift);
        }
        if result.degraded {
            tracing::warn!("Speaking degraded reply");
        }

        let speech = Speech {
            text: result.text.clone(),
        };
        let out = ctx
            .signal(SignalType::Speech, &speech)
            .with_priority(Priority::High);
        ctx.emit(out);
        self.spoken += 1;
        self.debug = format!("Said: \"{}\"", result.text.chars().take(40).collect::<String>());

        self.pending = self.queued.take().map(|content| Pending {
            content,
            due_tick: ctx.tick() + self.deliberation_ticks,
            sent_at: None,
        });
    }

    fn try_think(&mut self, ctx: &mut EngineContext<'_>) {
        let tick = ctx.tick();
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        if tick < pending.due_tick {
            return;
        }
        if let Some(sent) = pending.sent_at {
            if tick.saturating_sub(sent) < self.retry_after_ticks {
                return;
            }
            tracing::debug!("No reply after {} ticks, asking again", tick - sent);
        }
        pending.sent_at = Some(tick);
        let content = pending.content.clone();

        // Everything heard before this message.
        let earlier = self.context.len().saturating_sub(1);
        let request = ThoughtRequest {
            content,
            context: self.context.iter().take(earlier).cloned().collect(),
            self_state: *ctx.state(),
            empathic_state: self.empathy.clone(),
            tom_inference: None,
            recent_memories: (!self.memories.is_empty()).then(|| self.memories.clone()),
            detected_emotions: self.emotions.clone(),
        };
        let out = ctx
            .signal(SignalType::Thought, &request)
            .to([ids::THOUGHT_BRIDGE])
            .with_priority(Priority::High);
        ctx.emit(out);
        self.debug = "Thinking...".to_string();
    }
}

impl Default for ArbiterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for ArbiterEngine {
    fn id(&self) -> &EngineId {
        &self.id
    }

    fn subscribes_to(&self) -> Vec<SignalType> {
        vec![
            SignalType::PerceptionResult,
            SignalType::EmotionDetected,
            SignalType::EmpathicState,
            SignalType::MemoryResult,
            SignalType::ReasoningResponse,
        ]
    }

    fn process(&mut self, batch: &[Arc<Signal>], ctx: &mut EngineContext<'_>) {
        for signal in batch {
            match signal.kind {
                SignalType::PerceptionResult => {
                    if let Some(p) = signal.payload_as::<Perception>() {
                        self.on_perception(p, ctx);
                    }
                }
                SignalType::EmotionDetected => {
                    self.emotions = signal.payload_as();
                }
                SignalType::EmpathicState => {
                    self.empathy = signal.payload_as();
                }
                SignalType::MemoryResult => {
                    if let Some(result) = signal.payload_as::<MemoryResult>() {
                        self.memories = result.items;
                    }
                }
                SignalType::ReasoningResponse => {
                    if let Some(result) = signal.payload_as::<ReasoningResult>() {
                        self.on_response(result, ctx);
                    }
                }
                _ => {}
            }
        }
        self.try_think(ctx);
    }

    fn on_idle(&mut self, ctx: &mut EngineContext<'_>) {
        self.try_think(ctx);
    }

    fn debug_info(&self) -> String {
        format!("{} ({} spoken)", self.debug, self.spoken)
    }
}
