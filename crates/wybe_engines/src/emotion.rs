//! Fast keyword-based emotion inference over perceived text.
//!
//! Runs locally, no service call. Each cue carries a valence/arousal
//! contribution; the detection averages over the cues that matched.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use wybe_core::payload::{EmotionDetection, Perception};
use wybe_core::{ids, Engine, EngineContext, EngineId, Priority, Signal, SignalType};

const LEXICON: &[(&str, &str, f32, f32)] = &[
    (r"\b(happy|joy|glad|wonderful|great|amazing|love|excited)\b", "joy", 0.4, 0.3),
    (r"\b(sad|unhappy|depressed|down|miserable|cry|crying)\b", "sadness", -0.4, -0.2),
    (r"\b(angry|furious|mad|hate|rage|pissed)\b", "anger", -0.3, 0.5),
    (r"\b(afraid|scared|fear|terrified|anxious|worried|nervous)\b", "fear", -0.3, 0.4),
    (r"\b(surprised|shock|wow|whoa|unexpected)\b", "surprise", 0.1, 0.4),
    (r"\b(disgusted|gross|eww|nasty|awful)\b", "disgust", -0.3, 0.2),
    (r"\b(grateful|thank|thanks|appreciate|blessed)\b", "gratitude", 0.5, 0.1),
    (r"\b(lonely|alone|isolated|abandoned)\b", "loneliness", -0.4, -0.1),
    (r"\b(curious|wonder|interesting|fascinated)\b", "curiosity", 0.2, 0.2),
    (r"\b(calm|peaceful|serene|relaxed|chill)\b", "calm", 0.3, -0.3),
    (r"\b(confused|lost|don't understand)\b", "confusion", -0.1, 0.1),
    (r"\b(hope|hopeful|optimistic|looking forward)\b", "hope", 0.3, 0.1),
];

struct Cue {
    pattern: Regex,
    emotion: &'static str,
    valence: f32,
    arousal: f32,
}

static CUES: LazyLock<Vec<Cue>> = LazyLock::new(|| {
    LEXICON
        .iter()
        .map(|&(pattern, emotion, valence, arousal)| Cue {
            pattern: Regex::new(&format!("(?i){pattern}")).unwrap(),
            emotion,
            valence,
            arousal,
        })
        .collect()
});

pub struct EmotionInferenceEngine {
    id: EngineId,
    debug: String,
}

impl EmotionInferenceEngine {
    pub fn new() -> Self {
        Self {
            id: ids::EMOTION_INFERENCE.into(),
            debug: String::new(),
        }
    }

    pub fn detect(&self, text: &str) -> EmotionDetection {
        let mut emotions = Vec::new();
        let mut valence = 0.0;
        let mut arousal = 0.0;

        for cue in CUES.iter() {
            if cue.pattern.is_match(text) {
                emotions.push(cue.emotion.to_string());
                valence += cue.valence;
                arousal += cue.arousal;
            }
        }

        let count = emotions.len().max(1) as f32;
        EmotionDetection {
            confidence: (emotions.len() as f32 * 0.3).min(1.0),
            emotions,
            valence: valence / count,
            arousal: arousal / count,
        }
    }
}

impl Default for EmotionInferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for EmotionInferenceEngine {
    fn id(&self) -> &EngineId {
        &self.id
    }

    fn subscribes_to(&self) -> Vec<SignalType> {
        vec![SignalType::PerceptionResult]
    }

    fn process(&mut self, batch: &[Arc<Signal>], ctx: &mut EngineContext<'_>) {
        for signal in batch {
            let Some(perception) = signal.payload_as::<Perception>() else {
                continue;
            };
            if perception.modality != "text" {
                continue;
            }

            let detection = self.detect(&perception.content);
            if detection.emotions.is_empty() {
                self.debug = "No strong emotion detected".to_string();
                continue;
            }

            self.debug = format!(
                "Detected: {} (v:{:.2})",
                detection.emotions.join(", "),
                detection.valence
            );
            let out = ctx
                .signal(SignalType::EmotionDetected, &detection)
                .to([ids::EMPATHIC_COUPLING, ids::ARBITER])
                .with_priority(Priority::Medium);
            ctx.emit(out);
        }
    }

    fn debug_info(&self) -> String {
        self.debug.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicon_compiles() {
        assert_eq!(CUES.len(), LEXICON.len());
    }

    #[test]
    fn test_detects_sadness() {
        let engine = EmotionInferenceEngine::new();
        let d = engine.detect("I'm so sad today");
        assert_eq!(d.emotions, vec!["sadness"]);
        assert!(d.valence < 0.0);
        assert!((d.confidence - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_mixed_emotions_average() {
        let engine = EmotionInferenceEngine::new();
        let d = engine.detect("Wow, I'm HAPPY but also nervous");
        assert_eq!(d.emotions.len(), 3);
        assert!((d.confidence - 0.9).abs() < 1e-6);
        let expected = (0.4 + 0.1 - 0.3) / 3.0;
        assert!((d.valence - expected).abs() < 1e-6);
    }

    #[test]
    fn test_word_boundaries() {
        let engine = EmotionInferenceEngine::new();
        // "madness" must not match the whole-word cue "mad".
        let d = engine.detect("the madness of the crowd");
        assert!(d.emotions.is_empty());
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn test_neutral_text() {
        let engine = EmotionInferenceEngine::new();
        let d = engine.detect("the train leaves at nine");
        assert!(d.emotions.is_empty());
        assert_eq!(d.valence, 0.0);
    }
}
