//! Empathic coupling: letting the other party's feelings move ours.
//!
//! How strongly we are moved depends on attachment. A `person-state-update`
//! re-derives the coupling strength; detected emotions are then blended into
//! the Self-State in proportion to it and to the detection confidence.

use std::sync::Arc;
use wybe_core::payload::{EmotionDetection, EmpathicState, PersonStateUpdate};
use wybe_core::{ids, Dimension, Engine, EngineContext, EngineId, Priority, Signal, SignalType};

const DEFAULT_COUPLING: f32 = 0.3;
/// Detections below this confidence are ignored.
const MIN_CONFIDENCE: f32 = 0.2;

pub struct EmpathicCouplingEngine {
    id: EngineId,
    coupling_strength: f32,
    last_person: Option<String>,
    debug: String,
}

impl EmpathicCouplingEngine {
    pub fn new() -> Self {
        Self {
            id: ids::EMPATHIC_COUPLING.into(),
            coupling_strength: DEFAULT_COUPLING,
            last_person: None,
            debug: String::new(),
        }
    }

    pub fn coupling_strength(&self) -> f32 {
        self.coupling_strength
    }

    fn on_person(&mut self, update: PersonStateUpdate) {
        let attachment = update.attachment.clamp(0.0, 1.0);
        self.coupling_strength = 0.2 + attachment * 0.3;
        self.debug = format!(
            "Coupling with {} at {:.2}",
            update.person_id, self.coupling_strength
        );
        self.last_person = Some(update.person_id);
    }

    fn couple(&mut self, detection: &EmotionDetection, ctx: &mut EngineContext<'_>) {
        if detection.confidence < MIN_CONFIDENCE {
            return;
        }
        let strength = self.coupling_strength * detection.confidence;

        ctx.nudge(Dimension::Valence, detection.valence * strength * 0.5);
        ctx.nudge(Dimension::Arousal, detection.arousal * strength * 0.3);
        ctx.nudge(Dimension::Social, 0.03 * strength);

        let felt = |name: &str| detection.emotions.iter().any(|e| e == name);

        if felt("sadness") {
            ctx.nudge(Dimension::Valence, -0.05 * strength);
            let state = EmpathicState {
                response: "compassion".to_string(),
                intensity: strength,
                their_emotions: detection.emotions.clone(),
            };
            let out = ctx
                .signal(SignalType::EmpathicState, &state)
                .to([ids::ARBITER])
                .with_priority(Priority::Medium);
            ctx.emit(out);
        }
        if felt("joy") {
            ctx.nudge(Dimension::Valence, 0.08 * strength);
            ctx.nudge(Dimension::Energy, 0.02);
        }
        if felt("fear") || felt("anger") {
            ctx.nudge(Dimension::Arousal, 0.05 * strength);
            ctx.nudge(Dimension::Confidence, -0.02);
        }

        self.debug = format!(
            "Feeling with them: {} (strength {:.2})",
            detection.emotions.join(", "),
            strength
        );
    }
}

impl Default for EmpathicCouplingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for EmpathicCouplingEngine {
    fn id(&self) -> &EngineId {
        &self.id
    }

    fn subscribes_to(&self) -> Vec<SignalType> {
        vec![SignalType::EmotionDetected, SignalType::PersonStateUpdate]
    }

    fn process(&mut self, batch: &[Arc<Signal>], ctx: &mut EngineContext<'_>) {
        for signal in batch {
            match signal.kind {
                SignalType::PersonStateUpdate => {
                    if let Some(update) = signal.payload_as::<PersonStateUpdate>() {
                        self.on_person(update);
                    }
                }
                SignalType::EmotionDetected => {
                    if let Some(detection) = signal.payload_as::<EmotionDetection>() {
                        self.couple(&detection, ctx);
                    }
                }
                _ => {}
            }
        }
    }

    fn debug_info(&self) -> String {
        match &self.last_person {
            Some(person) => format!("{} [{}]", self.debug, person),
            None => self.debug.clone(),
        }
    }
}
