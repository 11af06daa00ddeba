//! Session persistence for the Self-State.

use crate::state::{SelfState, StateError};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub state: SelfState,
    pub saved_at: DateTime<Utc>,
}

impl PersistedState {
    pub fn now(state: SelfState) -> Self {
        Self {
            state,
            saved_at: Utc::now(),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write state file: {}", path.as_ref().display()))
    }

    /// Read a snapshot file. The embedded state is range-checked; a file that
    /// parses but fails validation is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read state file: {}", path.as_ref().display()))?;
        let raw: Value = serde_json::from_str(&content).context("State file is not JSON")?;

        let state = SelfState::from_snapshot(raw.get("state").unwrap_or(&Value::Null))?;
        let saved_at = match raw.get("saved_at") {
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|e| StateError::MalformedSnapshot(e.to_string()))?,
            None => Utc::now(),
        };
        Ok(Self { state, saved_at })
    }
}
