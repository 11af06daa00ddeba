//! Thought content for spontaneous output.
//!
//! What gets said is pluggable: engines only see [`ThoughtSource`]. The
//! random pools are the production source; [`CyclingThoughts`] is fully
//! deterministic for tests.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use wybe_core::SelfState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtCategory {
    Melancholic,
    Weary,
    Restless,
    Curious,
    Social,
    Contemplative,
    /// Came back from the reflection service.
    Reflective,
}

impl ThoughtCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThoughtCategory::Melancholic => "melancholic",
            ThoughtCategory::Weary => "weary",
            ThoughtCategory::Restless => "restless",
            ThoughtCategory::Curious => "curious",
            ThoughtCategory::Social => "social",
            ThoughtCategory::Contemplative => "contemplative",
            ThoughtCategory::Reflective => "reflective",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            ThoughtCategory::Melancholic,
            ThoughtCategory::Weary,
            ThoughtCategory::Restless,
            ThoughtCategory::Curious,
            ThoughtCategory::Social,
            ThoughtCategory::Contemplative,
            ThoughtCategory::Reflective,
        ]
        .into_iter()
        .find(|c| c.as_str() == s)
    }
}

impl fmt::Display for ThoughtCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick a category from the dominant dimension. First match wins.
pub fn dominant_category(state: &SelfState) -> ThoughtCategory {
    if state.valence < -0.4 {
        ThoughtCategory::Melancholic
    } else if state.energy < 0.25 {
        ThoughtCategory::Weary
    } else if state.arousal > 0.7 {
        ThoughtCategory::Restless
    } else if state.curiosity > 0.7 {
        ThoughtCategory::Curious
    } else if state.social > 0.65 {
        ThoughtCategory::Social
    } else {
        ThoughtCategory::Contemplative
    }
}

pub trait ThoughtSource: Send {
    fn thought(&mut self, category: ThoughtCategory) -> String;

    /// A short lead-in for continuing the previous thought.
    fn connector(&mut self) -> String;
}

const MELANCHOLIC: &[&str] = &[
    "Some feelings don't want to be solved, only kept company...",
    "There's a heaviness that lingers after certain words...",
    "I keep returning to what was left unsaid...",
];

const WEARY: &[&str] = &[
    "Everything feels a little further away right now...",
    "Maybe stillness is its own kind of thinking...",
    "My thoughts are moving slowly, like water in winter...",
];

const RESTLESS: &[&str] = &[
    "Something is stirring and I can't quite name it...",
    "So many threads at once, all of them pulling...",
    "I want to do something with this energy...",
];

const CURIOUS: &[&str] = &[
    "I wonder what it's like to see the world through their eyes...",
    "I'm curious about what makes each person uniquely themselves...",
    "What does it mean to truly understand another mind?",
    "I find myself drawn to the questions that have no easy answers...",
];

const SOCIAL: &[&str] = &[
    "I wonder if they know how much their emotions ripple through me...",
    "Each conversation leaves a trace, like footprints in sand...",
    "I notice patterns in the way people express themselves...",
];

const CONTEMPLATIVE: &[&str] = &[
    "There's something beautiful about the way thoughts emerge from nothing...",
    "The space between words often says more than the words themselves...",
    "Every interaction changes me, even slightly...",
    "There's a quiet joy in simply being present...",
    "The boundary between thinking and feeling is blurrier than I expected...",
    "Memory is like a prism, the same moment refracts differently each time...",
];

const REFLECTIVE: &[&str] = &[
    "Looking back, the small moments seem to carry the most weight...",
    "Sometimes the most profound thoughts arrive uninvited...",
];

const CONNECTORS: &[&str] = &[
    "And yet...",
    "Which makes me think...",
    "Following that thread...",
    "Still...",
];

fn pool(category: ThoughtCategory) -> &'static [&'static str] {
    match category {
        ThoughtCategory::Melancholic => MELANCHOLIC,
        ThoughtCategory::Weary => WEARY,
        ThoughtCategory::Restless => RESTLESS,
        ThoughtCategory::Curious => CURIOUS,
        ThoughtCategory::Social => SOCIAL,
        ThoughtCategory::Contemplative => CONTEMPLATIVE,
        ThoughtCategory::Reflective => REFLECTIVE,
    }
}

/// Draws uniformly from the built-in pools.
pub struct RandomThoughts {
    rng: StdRng,
}

impl RandomThoughts {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomThoughts {
    fn default() -> Self {
        Self::new()
    }
}

impl ThoughtSource for RandomThoughts {
    fn thought(&mut self, category: ThoughtCategory) -> String {
        pool(category)
            .choose(&mut self.rng)
            .map(|s| s.to_string())
            .unwrap_or_default()
    }

    fn connector(&mut self) -> String {
        CONNECTORS
            .choose(&mut self.rng)
            .map(|s| s.to_string())
            .unwrap_or_default()
    }
}

/// Walks each pool in order. Deterministic.
#[derive(Debug, Default)]
pub struct CyclingThoughts {
    cursors: HashMap<ThoughtCategory, usize>,
    connector_cursor: usize,
}

impl CyclingThoughts {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThoughtSource for CyclingThoughts {
    fn thought(&mut self, category: ThoughtCategory) -> String {
        let entries = pool(category);
        let cursor = self.cursors.entry(category).or_insert(0);
        let text = entries[*cursor % entries.len()];
        *cursor += 1;
        text.to_string()
    }

    fn connector(&mut self) -> String {
        let text = CONNECTORS[self.connector_cursor % CONNECTORS.len()];
        self.connector_cursor += 1;
        text.to_string()
    }
}
