//! Default mode: what the mind does when nobody is talking to it.
//!
//! After enough consecutive idle ticks, and once a cooldown has passed since
//! the last spontaneous output, the engine produces an inner thought. The
//! cooldown shrinks under high arousal and grows when calm, and is recomputed
//! on every idle tick from the live Self-State.
//!
//! If recent memories exist and reflection is enabled, the engine first asks
//! the reflection bridge. A failed or empty reflection falls back to local
//! generation on the next idle tick.

use crate::thoughts::{dominant_category, RandomThoughts, ThoughtCategory, ThoughtSource};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use wybe_core::payload::{InnerThought, MemoryResult, Mood, ReflectRequest, ReflectionResult};
use wybe_core::{
    ids, AutonomyConfig, Dimension, Engine, EngineContext, EngineId, Priority, Signal, SignalType,
};

const MAX_MEMORIES: usize = 5;
const STREAM_CAP: usize = 10;
/// A fresh thought is continued at most this many times in a row.
const MAX_CONTINUATIONS: u32 = 2;
/// Give up on an unanswered reflection request after this long.
const REFLECTION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct StreamEntry {
    pub thought: String,
    pub category: ThoughtCategory,
    pub at: Duration,
}

pub struct DefaultModeEngine {
    id: EngineId,
    config: AutonomyConfig,
    source: Box<dyn ThoughtSource>,
    idle_ticks: u64,
    last_output: Option<Duration>,
    stream: VecDeque<StreamEntry>,
    continuation_run: u32,
    recent_memories: VecDeque<String>,
    awaiting_reflection: Option<Duration>,
    fallback_due: bool,
    debug: String,
}

impl DefaultModeEngine {
    pub fn new(config: AutonomyConfig) -> Self {
        Self::with_source(config, RandomThoughts::new())
    }

    pub fn with_source(config: AutonomyConfig, source: impl ThoughtSource + 'static) -> Self {
        Self {
            id: ids::DEFAULT_MODE.into(),
            config,
            source: Box::new(source),
            idle_ticks: 0,
            last_output: None,
            stream: VecDeque::new(),
            continuation_run: 0,
            recent_memories: VecDeque::new(),
            awaiting_reflection: None,
            fallback_due: false,
            debug: String::new(),
        }
    }

    /// Consecutive idle ticks since the last outside stimulus.
    pub fn idle_ticks(&self) -> u64 {
        self.idle_ticks
    }

    pub fn stream(&self) -> &VecDeque<StreamEntry> {
        &self.stream
    }

    pub fn is_awaiting_reflection(&self) -> bool {
        self.awaiting_reflection.is_some()
    }

    /// Cooldown at the given arousal: `base * (1.5 - arousal)`.
    pub fn cooldown(&self, arousal: f32) -> Duration {
        let factor = (1.5 - arousal.clamp(0.0, 1.0)) as f64;
        Duration::from_millis(self.config.base_cooldown_ms).mul_f64(factor)
    }

    fn cooled_down(&self, now: Duration, arousal: f32) -> bool {
        match self.last_output {
            Some(last) => now.saturating_sub(last) >= self.cooldown(arousal),
            None => true,
        }
    }

    fn remember(&mut self, items: Vec<String>) {
        for item in items {
            if self.recent_memories.contains(&item) {
                continue;
            }
            self.recent_memories.push_back(item);
            while self.recent_memories.len() > MAX_MEMORIES {
                self.recent_memories.pop_front();
            }
        }
    }

    fn request_reflection(&mut self, ctx: &mut EngineContext<'_>) {
        let state = ctx.state();
        let request = ReflectRequest {
            memories: self.recent_memories.iter().cloned().collect(),
            mood: Mood::from(&*state),
            recent_stream: self.stream.back().map(|e| e.thought.clone()),
        };
        let out = ctx
            .signal(SignalType::ReflectRequest, &request)
            .to([ids::REFLECTION_BRIDGE])
            .with_priority(Priority::Idle);
        ctx.emit(out);

        self.awaiting_reflection = Some(ctx.now());
        self.last_output = Some(ctx.now());
        self.debug = "Reflecting...".to_string();
    }

    fn on_reflection(&mut self, result: ReflectionResult, ctx: &mut EngineContext<'_>) {
        if self.awaiting_reflection.take().is_none() {
            tracing::debug!("Ignoring late reflection");
            return;
        }
        match result.thought.filter(|t| !t.trim().is_empty()) {
            Some(thought) => {
                self.continuation_run = 0;
                self.express(thought, ThoughtCategory::Reflective, false, ctx);
            }
            None => {
                tracing::debug!("Reflection came back empty, falling back next idle tick");
                self.fallback_due = true;
            }
        }
    }

    /// Produce a thought locally, continuing the last one if it is still fresh.
    fn generate(&mut self, ctx: &mut EngineContext<'_>) {
        let now = ctx.now();
        let window = Duration::from_millis(self.config.recency_window_ms);
        let fresh = self
            .stream
            .back()
            .filter(|last| now.saturating_sub(last.at) <= window)
            .map(|last| last.category);

        match fresh {
            Some(category) if self.continuation_run < MAX_CONTINUATIONS => {
                self.continuation_run += 1;
                let text = format!(
                    "{} {}",
                    self.source.connector(),
                    self.source.thought(category)
                );
                self.express(text, category, true, ctx);
            }
            _ => {
                self.continuation_run = 0;
                let category = dominant_category(&ctx.state());
                let text = self.source.thought(category);
                self.express(text, category, false, ctx);
            }
        }
    }

    fn express(
        &mut self,
        thought: String,
        category: ThoughtCategory,
        continuation: bool,
        ctx: &mut EngineContext<'_>,
    ) {
        let now = ctx.now();
        let payload = InnerThought {
            thought: thought.clone(),
            category: category.to_string(),
            continuation,
        };
        let out = ctx
            .signal(SignalType::DefaultModeThought, &payload)
            .with_priority(Priority::Idle);
        ctx.emit(out);

        // Mind-wandering settles and opens us up a little.
        ctx.nudge(Dimension::Arousal, -0.01);
        ctx.nudge(Dimension::Curiosity, 0.02);
        ctx.nudge(Dimension::Valence, 0.01);

        tracing::debug!("Default mode ({}): {}", category, thought);
        self.debug = format!("[{}] {}", category, thought);
        self.stream.push_back(StreamEntry {
            thought,
            category,
            at: now,
        });
        while self.stream.len() > STREAM_CAP {
            self.stream.pop_front();
        }
        self.last_output = Some(now);
    }
}

impl Engine for DefaultModeEngine {
    fn id(&self) -> &EngineId {
        &self.id
    }

    fn subscribes_to(&self) -> Vec<SignalType> {
        vec![
            SignalType::AttentionFocus,
            SignalType::MemoryResult,
            SignalType::ReflectionResult,
        ]
    }

    fn process(&mut self, batch: &[Arc<Signal>], ctx: &mut EngineContext<'_>) {
        for signal in batch {
            match signal.kind {
                SignalType::AttentionFocus => self.idle_ticks = 0,
                SignalType::MemoryResult => {
                    self.idle_ticks = 0;
                    if let Some(result) = signal.payload_as::<MemoryResult>() {
                        self.remember(result.items);
                    }
                }
                SignalType::ReflectionResult => {
                    if let Some(result) = signal.payload_as::<ReflectionResult>() {
                        self.on_reflection(result, ctx);
                    }
                }
                _ => {}
            }
        }
    }

    fn on_idle(&mut self, ctx: &mut EngineContext<'_>) {
        self.idle_ticks += 1;
        let now = ctx.now();

        if let Some(asked_at) = self.awaiting_reflection {
            if now.saturating_sub(asked_at) < REFLECTION_TIMEOUT {
                return;
            }
            tracing::warn!("Reflection timed out, falling back to local thought");
            self.awaiting_reflection = None;
            self.fallback_due = true;
        }

        if self.fallback_due {
            self.fallback_due = false;
            self.generate(ctx);
            return;
        }

        if self.idle_ticks < self.config.idle_threshold_ticks {
            return;
        }
        let arousal = ctx.current(Dimension::Arousal);
        if !self.cooled_down(now, arousal) {
            return;
        }

        if self.config.reflection && !self.recent_memories.is_empty() {
            self.request_reflection(ctx);
        } else {
            self.generate(ctx);
        }
    }

    fn debug_info(&self) -> String {
        format!("{} (idle {} ticks)", self.debug, self.idle_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use crate::thoughts::CyclingThoughts;
    use serde_json::json;

    fn config(reflection: bool) -> AutonomyConfig {
        AutonomyConfig {
            idle_threshold_ticks: 3,
            base_cooldown_ms: 1_000,
            recency_window_ms: 5_000,
            reflection,
        }
    }

    fn engine(reflection: bool) -> DefaultModeEngine {
        DefaultModeEngine::with_source(config(reflection), CyclingThoughts::new())
    }

    fn thoughts(h: &mut Harness) -> Vec<InnerThought> {
        h.emitted_to("observer")
            .iter()
            .filter_map(|s| s.payload_as())
            .collect()
    }

    fn harness() -> Harness {
        let mut h = Harness::new();
        h.listen("observer", &[SignalType::DefaultModeThought]);
        h.listen(ids::REFLECTION_BRIDGE, &[SignalType::ReflectRequest]);
        h
    }

    #[test]
    fn test_cooldown_scales_with_arousal() {
        let e = engine(false);
        assert_eq!(e.cooldown(0.5), Duration::from_millis(1_000));
        assert!(e.cooldown(1.0) < e.cooldown(0.0));
    }

    #[test]
    fn test_waits_for_idle_threshold() {
        let mut h = harness();
        let mut e = engine(false);
        h.idle(&mut e);
        h.idle(&mut e);
        assert!(thoughts(&mut h).is_empty());
        h.idle(&mut e);
        assert_eq!(thoughts(&mut h).len(), 1);
    }

    #[test]
    fn test_respects_cooldown_then_continues() {
        let mut h = harness();
        let mut e = engine(false);
        for _ in 0..3 {
            h.idle(&mut e);
        }
        let first = thoughts(&mut h);
        assert_eq!(first[0].category, "contemplative");
        assert!(!first[0].continuation);

        // Inside the cooldown nothing happens.
        h.advance(Duration::from_millis(500));
        h.idle(&mut e);
        assert!(thoughts(&mut h).is_empty());

        // Past the cooldown, still within the recency window: a continuation.
        h.advance(Duration::from_millis(1_500));
        h.idle(&mut e);
        let second = thoughts(&mut h);
        assert!(second[0].continuation);
        assert!(second[0].thought.starts_with("And yet..."));
        assert_eq!(second[0].category, "contemplative");
    }

    #[test]
    fn test_stale_stream_draws_fresh_category() {
        let mut h = harness();
        let mut e = engine(false);
        for _ in 0..3 {
            h.idle(&mut e);
        }
        thoughts(&mut h);

        h.advance(Duration::from_secs(10));
        h.state.restore(wybe_core::SelfState {
            curiosity: 0.9,
            ..Default::default()
        })
        .unwrap();
        h.idle(&mut e);
        let out = thoughts(&mut h);
        assert!(!out[0].continuation);
        assert_eq!(out[0].category, "curious");
    }

    #[test]
    fn test_external_focus_resets_idle_counter() {
        let mut h = harness();
        let mut e = engine(false);
        h.idle(&mut e);
        h.idle(&mut e);
        h.process(
            &mut e,
            vec![Signal::new(
                SignalType::AttentionFocus,
                ids::ARBITER,
                json!({"content": "hi", "modality": "text", "salience": 0.8}),
            )],
        );
        assert_eq!(e.idle_ticks(), 0);
        h.idle(&mut e);
        assert!(thoughts(&mut h).is_empty());
    }

    #[test]
    fn test_reflection_requested_with_memories() {
        let mut h = harness();
        let mut e = engine(true);
        h.process(
            &mut e,
            vec![Signal::new(
                SignalType::MemoryResult,
                ids::MEMORY,
                json!({"items": ["They said: the sea was cold"]}),
            )],
        );
        for _ in 0..3 {
            h.idle(&mut e);
        }
        let requests = h.emitted_to(ids::REFLECTION_BRIDGE);
        assert_eq!(requests.len(), 1);
        let req: ReflectRequest = requests[0].payload_as().unwrap();
        assert_eq!(req.memories, vec!["They said: the sea was cold"]);
        assert!(e.is_awaiting_reflection());

        let reply = Signal::new(
            SignalType::ReflectionResult,
            ids::REFLECTION_BRIDGE,
            json!({"thought": "The sea keeps coming back to me."}),
        );
        h.process(&mut e, vec![reply]);
        let out = thoughts(&mut h);
        assert_eq!(out[0].category, "reflective");
        assert_eq!(out[0].thought, "The sea keeps coming back to me.");
    }

    #[test]
    fn test_empty_reflection_falls_back_next_idle() {
        let mut h = harness();
        let mut e = engine(true);
        h.process(
            &mut e,
            vec![Signal::new(
                SignalType::MemoryResult,
                ids::MEMORY,
                json!({"items": ["a memory"]}),
            )],
        );
        for _ in 0..3 {
            h.idle(&mut e);
        }
        h.process(
            &mut e,
            vec![Signal::new(
                SignalType::ReflectionResult,
                ids::REFLECTION_BRIDGE,
                json!({"thought": null}),
            )],
        );
        assert!(thoughts(&mut h).is_empty());

        h.idle(&mut e);
        let out = thoughts(&mut h);
        assert_eq!(out.len(), 1);
        assert_ne!(out[0].category, "reflective");
    }
}
