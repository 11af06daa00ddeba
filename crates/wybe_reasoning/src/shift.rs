//! Extracting the emotion shift that rides along with a reply.
//!
//! Services either send a structured `emotionShift` object or append a line
//! like `SHIFT: {"valence": 0.1}` to the text. Both are read leniently: unknown
//! dimensions and non-numeric values are skipped, and anything unparseable
//! means no shift. The text is always kept.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use wybe_core::{Dimension, StateShift};

static RE_SHIFT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"SHIFT:\s*(\{[^}]*\})").unwrap());

/// Best-effort `{"dimension": delta}` reading.
pub fn lenient_shift(value: &Value) -> Option<StateShift> {
    let Some(obj) = value.as_object() else {
        tracing::warn!("Ignoring non-object emotion shift: {}", value);
        return None;
    };

    let mut shift = StateShift::new();
    for (key, raw) in obj {
        let Ok(dim) = key.parse::<Dimension>() else {
            tracing::debug!("Skipping unknown shift dimension '{}'", key);
            continue;
        };
        match raw.as_f64().map(|v| v as f32) {
            Some(delta) if delta.is_finite() => shift = shift.with(dim, delta),
            _ => tracing::debug!("Skipping non-numeric shift for {}", dim),
        }
    }
    (!shift.is_empty()).then_some(shift)
}

/// Split a reply into spoken text and shift.
pub fn extract_shift(text: &str, structured: Option<&Value>) -> (String, Option<StateShift>) {
    if let Some(value) = structured {
        return (text.trim().to_string(), lenient_shift(value));
    }

    let Some(caps) = RE_SHIFT.captures(text) else {
        return (text.trim().to_string(), None);
    };

    let shift = match serde_json::from_str::<Value>(&caps[1]) {
        Ok(value) => lenient_shift(&value),
        Err(e) => {
            tracing::warn!("Malformed SHIFT block: {}", e);
            None
        }
    };
    let stripped = RE_SHIFT.replace(text, "");
    (stripped.trim().to_string(), shift)
}
