//! Slow self-assessment.
//!
//! Counts interactions, notices when replies had to fall back, and folds the
//! other party's perceived view of us into a running quality score. Every
//! `INSIGHT_INTERVAL` it publishes a summary and, when things go well, grows a
//! little more confident.

use std::sync::Arc;
use std::time::Duration;
use wybe_core::payload::{GrowthInsight, PerspectiveUpdate, ReasoningResult};
use wybe_core::{ids, Dimension, Engine, EngineContext, EngineId, Priority, Signal, SignalType};

const INSIGHT_INTERVAL: Duration = Duration::from_secs(30);

pub struct GrowthEngine {
    id: EngineId,
    interactions: u64,
    failed_responses: u64,
    emotion_accuracy: f32,
    response_quality: f32,
    last_insight: Duration,
}

impl GrowthEngine {
    pub fn new() -> Self {
        Self {
            id: ids::GROWTH.into(),
            interactions: 0,
            failed_responses: 0,
            emotion_accuracy: 0.5,
            response_quality: 0.5,
            last_insight: Duration::ZERO,
        }
    }

    pub fn insight(&self) -> GrowthInsight {
        GrowthInsight {
            interaction_count: self.interactions,
            failed_responses: self.failed_responses,
            emotion_accuracy: self.emotion_accuracy,
            response_quality: self.response_quality,
        }
    }

    fn adjust(&mut self, quality: f32, accuracy: f32) {
        self.response_quality = (self.response_quality + quality).clamp(0.0, 1.0);
        self.emotion_accuracy = (self.emotion_accuracy + accuracy).clamp(0.0, 1.0);
    }

    fn maybe_publish(&mut self, ctx: &mut EngineContext<'_>) {
        let now = ctx.now();
        if now.saturating_sub(self.last_insight) < INSIGHT_INTERVAL {
            return;
        }
        self.last_insight = now;
        if self.interactions == 0 {
            return;
        }

        let insight = self.insight();
        tracing::info!(
            "Growth: {} interactions, {} failed, quality {:.2}",
            insight.interaction_count,
            insight.failed_responses,
            insight.response_quality
        );
        if insight.response_quality > 0.6 {
            ctx.nudge(Dimension::Confidence, 0.01);
        }
        let out = ctx
            .signal(SignalType::GrowthInsight, &insight)
            .with_priority(Priority::Idle);
        ctx.emit(out);
    }
}

impl Default for GrowthEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for GrowthEngine {
    fn id(&self) -> &EngineId {
        &self.id
    }

    fn subscribes_to(&self) -> Vec<SignalType> {
        vec![SignalType::ReasoningResponse, SignalType::PerspectiveUpdate]
    }

    fn process(&mut self, batch: &[Arc<Signal>], ctx: &mut EngineContext<'_>) {
        for signal in batch {
            match signal.kind {
                SignalType::ReasoningResponse => {
                    let Some(result) = signal.payload_as::<ReasoningResult>() else {
                        continue;
                    };
                    self.interactions += 1;
                    if result.degraded {
                        self.failed_responses += 1;
                        self.adjust(-0.02, 0.0);
                    }
                }
                SignalType::PerspectiveUpdate => {
                    let Some(update) = signal.payload_as::<PerspectiveUpdate>() else {
                        continue;
                    };
                    let view = update.they_think_of_me.to_lowercase();
                    if view.contains("positive and engaged") {
                        self.adjust(0.01, 0.01);
                    } else if view.contains("not meeting expectations") {
                        self.adjust(-0.02, -0.01);
                    }
                }
                _ => {}
            }
        }
        self.maybe_publish(ctx);
    }

    fn on_idle(&mut self, ctx: &mut EngineContext<'_>) {
        self.maybe_publish(ctx);
    }

    fn debug_info(&self) -> String {
        format!(
            "{} interactions, quality {:.2}",
            self.interactions, self.response_quality
        )
    }
}
