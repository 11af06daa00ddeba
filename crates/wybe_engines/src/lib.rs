//! # Wybe Engines
//!
//! Reference engines for the Wybe mind. Each one owns a single role and talks
//! to the rest only through signals and the shared Self-State.
//!
//! ```text
//! text-input ─▶ perception-result ─┬─▶ emotion-inference ─▶ emotion-detected ─▶ empathic-coupling
//!                                  └─▶ arbiter ─▶ attention-focus ─▶ memory / default-mode
//!                                        │
//!                                        └─▶ thought ─▶ (bridge) ─▶ reasoning-response ─▶ arbiter ─▶ speech
//! ```

pub mod arbiter;
pub mod default_mode;
pub mod emotion;
pub mod empathy;
pub mod growth;
pub mod memory;
pub mod text_input;
pub mod thoughts;

#[cfg(test)]
mod testing;

pub use arbiter::ArbiterEngine;
pub use default_mode::{DefaultModeEngine, StreamEntry};
pub use emotion::EmotionInferenceEngine;
pub use empathy::EmpathicCouplingEngine;
pub use growth::GrowthEngine;
pub use memory::{InMemoryStore, MemoryEngine, MemoryStore};
pub use text_input::TextInputEngine;
pub use thoughts::{dominant_category, CyclingThoughts, RandomThoughts, ThoughtCategory, ThoughtSource};

use wybe_core::{AutonomyConfig, Engine};

/// The full local cast, in registration order. Bridges live elsewhere.
pub fn standard_engines(autonomy: AutonomyConfig) -> Vec<Box<dyn Engine>> {
    vec![
        Box::new(TextInputEngine::new()),
        Box::new(EmotionInferenceEngine::new()),
        Box::new(EmpathicCouplingEngine::new()),
        Box::new(MemoryEngine::default()),
        Box::new(DefaultModeEngine::new(autonomy)),
        Box::new(GrowthEngine::new()),
        Box::new(ArbiterEngine::new()),
    ]
}
