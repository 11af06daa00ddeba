use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WybeConfig {
    pub dynamics: DynamicsConfig,
    pub scheduler: SchedulerConfig,
    pub autonomy: AutonomyConfig,
    pub bridge: BridgeConfig,
}

impl WybeConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: WybeConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.dynamics = config.dynamics.sanitized();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("WYBE_BRIDGE_URL") {
            self.bridge.base_url = v;
        }
        if let Ok(v) = std::env::var("WYBE_TICK_MS") {
            if let Ok(n) = v.parse() {
                self.scheduler.tick_interval_ms = n;
            }
        }
        if let Ok(v) = std::env::var("WYBE_HISTORY_CAP") {
            if let Ok(n) = v.parse() {
                self.bridge.history_cap = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

/// Damping and attractor constants for the Self-State Store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    /// Fraction of the remaining distance covered per tick, in (0, 1).
    pub damping: f32,
    /// Minimum visible change before a new snapshot is published.
    pub epsilon: f32,
    pub arousal_baseline: f32,
    pub arousal_drift: f32,
    pub social_baseline: f32,
    pub social_drift: f32,
    /// Energy target lost per tick.
    pub energy_decay: f32,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            damping: 0.1,
            epsilon: 0.001,
            arousal_baseline: 0.3,
            arousal_drift: 0.001,
            social_baseline: 0.4,
            social_drift: 0.001,
            energy_decay: 0.0001,
        }
    }
}

impl DynamicsConfig {
    /// Replace out-of-range constants with their defaults.
    ///
    /// Damping must lie strictly inside (0, 1) or the current value either
    /// never moves or overshoots its target. Rates live in [0, 1] and
    /// baselines in the `[0, 1]` range of their dimension.
    pub fn sanitized(self) -> Self {
        let fallback = Self::default();
        let damping = checked("damping", self.damping, fallback.damping, |v| {
            v > 0.0 && v < 1.0
        });
        let epsilon = checked("epsilon", self.epsilon, fallback.epsilon, |v| v >= 0.0);
        let unit = |v: f32| (0.0..=1.0).contains(&v);
        Self {
            damping,
            epsilon,
            arousal_baseline: checked(
                "arousal_baseline",
                self.arousal_baseline,
                fallback.arousal_baseline,
                unit,
            ),
            arousal_drift: checked("arousal_drift", self.arousal_drift, fallback.arousal_drift, unit),
            social_baseline: checked(
                "social_baseline",
                self.social_baseline,
                fallback.social_baseline,
                unit,
            ),
            social_drift: checked("social_drift", self.social_drift, fallback.social_drift, unit),
            energy_decay: checked("energy_decay", self.energy_decay, fallback.energy_decay, unit),
        }
    }
}

fn checked(name: &str, value: f32, fallback: f32, valid: impl Fn(f32) -> bool) -> f32 {
    if value.is_finite() && valid(value) {
        value
    } else {
        tracing::warn!(
            "dynamics.{} = {} is out of range, using {}",
            name,
            value,
            fallback
        );
        fallback
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16, // ~60 Hz
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Timing of idle-driven, spontaneous behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutonomyConfig {
    /// Consecutive idle ticks before an engine may act on its own.
    pub idle_threshold_ticks: u64,
    /// Cooldown between spontaneous outputs at neutral arousal.
    pub base_cooldown_ms: u64,
    /// How long the last output counts as "fresh" for continuations.
    pub recency_window_ms: u64,
    /// Ask the reflection service before falling back to local thoughts.
    pub reflection: bool,
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            idle_threshold_ticks: 300, // ~5s at 60 Hz
            base_cooldown_ms: 8_000,
            recency_window_ms: 20_000,
            reflection: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub base_url: String,
    pub think_path: String,
    pub reflect_path: String,
    /// Maximum number of history entries kept (both roles).
    pub history_cap: usize,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            think_path: "/api/mind/think".to_string(),
            reflect_path: "/api/mind/reflect".to_string(),
            history_cap: 40, // 20 exchanges
            timeout_secs: 30,
            max_attempts: 2,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
