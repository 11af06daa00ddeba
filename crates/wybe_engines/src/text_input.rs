//! Outer sense for typed text.

use std::sync::Arc;
use wybe_core::payload::{Perception, TextInput};
use wybe_core::{ids, Dimension, Engine, EngineContext, EngineId, Priority, Signal, SignalType};

pub struct TextInputEngine {
    id: EngineId,
    received: u64,
    debug: String,
}

impl TextInputEngine {
    pub fn new() -> Self {
        Self {
            id: ids::TEXT_INPUT.into(),
            received: 0,
            debug: String::new(),
        }
    }
}

impl Default for TextInputEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for TextInputEngine {
    fn id(&self) -> &EngineId {
        &self.id
    }

    fn subscribes_to(&self) -> Vec<SignalType> {
        vec![SignalType::TextInput]
    }

    fn process(&mut self, batch: &[Arc<Signal>], ctx: &mut EngineContext<'_>) {
        for signal in batch {
            let Some(input) = signal.payload_as::<TextInput>() else {
                continue;
            };
            let text = input.text.trim();
            if text.is_empty() {
                continue;
            }

            // Being spoken to is mildly activating and social.
            ctx.nudge(Dimension::Social, 0.05);
            ctx.nudge(Dimension::Arousal, 0.03);

            let perception = Perception {
                modality: "text".to_string(),
                content: text.to_string(),
                salience: 0.8,
            };
            let out = ctx
                .signal(SignalType::PerceptionResult, &perception)
                .with_priority(Priority::High);
            ctx.emit(out);

            self.received += 1;
            self.debug = format!("Received: \"{}\"", text.chars().take(40).collect::<String>());
        }
    }

    fn debug_info(&self) -> String {
        format!("{} ({} total)", self.debug, self.received)
    }
}
