//! Self-State: the shared, continuously damped affective state.
//!
//! Every dimension holds a `current` value that is shown to readers and a
//! `target` value that engines push around. Once per tick `current` lerps
//! toward `target`; a few targets also drift toward fixed attractors on
//! their own. Readers get an immutable `Arc<SelfState>` snapshot that is only
//! replaced when something visibly moved, so `Arc::ptr_eq` is a cheap change
//! check.

use crate::config::DynamicsConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("unknown self-state dimension '{0}'")]
    UnknownDimension(String),
    #[error("{dimension} value {value} outside [{min}, {max}]")]
    OutOfRange {
        dimension: Dimension,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("non-finite value for {0}")]
    NonFinite(Dimension),
    #[error("malformed self-state snapshot: {0}")]
    MalformedSnapshot(String),
}

/// The fixed set of named dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Valence,
    Arousal,
    Confidence,
    Energy,
    Social,
    Curiosity,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Valence,
        Dimension::Arousal,
        Dimension::Confidence,
        Dimension::Energy,
        Dimension::Social,
        Dimension::Curiosity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Valence => "valence",
            Dimension::Arousal => "arousal",
            Dimension::Confidence => "confidence",
            Dimension::Energy => "energy",
            Dimension::Social => "social",
            Dimension::Curiosity => "curiosity",
        }
    }

    /// Inclusive range: valence is bipolar, everything else is `[0, 1]`.
    pub fn range(&self) -> (f32, f32) {
        match self {
            Dimension::Valence => (-1.0, 1.0),
            _ => (0.0, 1.0),
        }
    }

    pub fn clamp_value(&self, value: f32) -> f32 {
        let (min, max) = self.range();
        value.clamp(min, max)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dimension {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.name() == s)
            .ok_or_else(|| StateError::UnknownDimension(s.to_string()))
    }
}

/// A full set of dimension values.
///
/// Deserialization requires every dimension, which is what rehydration
/// relies on to reject partial snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelfState {
    pub valence: f32,
    pub arousal: f32,
    pub confidence: f32,
    pub energy: f32,
    pub social: f32,
    pub curiosity: f32,
}

impl Default for SelfState {
    fn default() -> Self {
        Self {
            valence: 0.0,
            arousal: 0.3,
            confidence: 0.5,
            energy: 0.7,
            social: 0.4,
            curiosity: 0.6,
        }
    }
}

impl SelfState {
    pub fn get(&self, dim: Dimension) -> f32 {
        match dim {
            Dimension::Valence => self.valence,
            Dimension::Arousal => self.arousal,
            Dimension::Confidence => self.confidence,
            Dimension::Energy => self.energy,
            Dimension::Social => self.social,
            Dimension::Curiosity => self.curiosity,
        }
    }

    fn slot(&mut self, dim: Dimension) -> &mut f32 {
        match dim {
            Dimension::Valence => &mut self.valence,
            Dimension::Arousal => &mut self.arousal,
            Dimension::Confidence => &mut self.confidence,
            Dimension::Energy => &mut self.energy,
            Dimension::Social => &mut self.social,
            Dimension::Curiosity => &mut self.curiosity,
        }
    }

    fn set_clamped(&mut self, dim: Dimension, value: f32) {
        *self.slot(dim) = dim.clamp_value(value);
    }

    /// Check every value is finite and inside its dimension's range.
    pub fn validate(&self) -> Result<(), StateError> {
        for dim in Dimension::ALL {
            let value = self.get(dim);
            if !value.is_finite() {
                return Err(StateError::NonFinite(dim));
            }
            let (min, max) = dim.range();
            if value < min || value > max {
                return Err(StateError::OutOfRange {
                    dimension: dim,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Parse and validate an externally supplied snapshot.
    pub fn from_snapshot(value: &Value) -> Result<Self, StateError> {
        let state: SelfState = serde_json::from_value(value.clone())
            .map_err(|e| StateError::MalformedSnapshot(e.to_string()))?;
        state.validate()?;
        Ok(state)
    }

    /// Short natural-language rendering, e.g. "feeling positive, highly alert".
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();

        if self.valence > 0.3 {
            parts.push("feeling positive");
        } else if self.valence < -0.3 {
            parts.push("feeling negative");
        } else {
            parts.push("emotionally neutral");
        }

        if self.arousal > 0.6 {
            parts.push("highly alert");
        } else if self.arousal < 0.2 {
            parts.push("very calm");
        }

        if self.confidence > 0.7 {
            parts.push("confident");
        } else if self.confidence < 0.3 {
            parts.push("uncertain");
        }

        if self.energy > 0.7 {
            parts.push("energetic");
        } else if self.energy < 0.3 {
            parts.push("low energy");
        }

        if self.social > 0.6 {
            parts.push("socially engaged");
        } else if self.social < 0.3 {
            parts.push("withdrawn");
        }

        if self.curiosity > 0.7 {
            parts.push("very curious");
        } else if self.curiosity < 0.3 {
            parts.push("disinterested");
        }

        parts.join(", ")
    }
}

/// A partial mapping of dimension to additive delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateShift(BTreeMap<Dimension, f32>);

impl StateShift {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, dim: Dimension, delta: f32) -> Self {
        self.0.insert(dim, delta);
        self
    }

    pub fn get(&self, dim: Dimension) -> Option<f32> {
        self.0.get(&dim).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f32)> + '_ {
        self.0.iter().map(|(d, v)| (*d, *v))
    }

    /// Parse a wire-level `{"valence": -0.3, ...}` object.
    ///
    /// Any unknown key or non-numeric value rejects the whole shift.
    pub fn from_value(value: &Value) -> Result<Self, StateError> {
        let obj = value
            .as_object()
            .ok_or_else(|| StateError::MalformedSnapshot(format!("expected object, got {value}")))?;
        let mut shift = StateShift::new();
        for (key, raw) in obj {
            let dim: Dimension = key.parse()?;
            let delta = raw
                .as_f64()
                .ok_or_else(|| StateError::MalformedSnapshot(format!("{key} is not a number")))?
                as f32;
            if !delta.is_finite() {
                return Err(StateError::NonFinite(dim));
            }
            shift.0.insert(dim, delta);
        }
        Ok(shift)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Owner of the current/target pair and the published snapshot.
pub struct SelfStateStore {
    current: SelfState,
    target: SelfState,
    dynamics: DynamicsConfig,
    snapshot: Arc<SelfState>,
    watch_tx: watch::Sender<Arc<SelfState>>,
}

impl SelfStateStore {
    pub fn new(dynamics: DynamicsConfig) -> Self {
        Self::with_initial(SelfState::default(), dynamics)
    }

    /// Start from `initial`, clamped into range. Invalid dynamics constants
    /// are replaced by their defaults.
    pub fn with_initial(initial: SelfState, dynamics: DynamicsConfig) -> Self {
        let dynamics = dynamics.sanitized();
        let mut current = SelfState::default();
        for dim in Dimension::ALL {
            let value = initial.get(dim);
            if value.is_finite() {
                current.set_clamped(dim, value);
            }
        }
        let snapshot = Arc::new(current);
        let (watch_tx, _) = watch::channel(Arc::clone(&snapshot));
        Self {
            current,
            target: current,
            dynamics,
            snapshot,
            watch_tx,
        }
    }

    /// The latest published snapshot. Same `Arc` until something changes.
    pub fn get(&self) -> Arc<SelfState> {
        Arc::clone(&self.snapshot)
    }

    pub fn current(&self, dim: Dimension) -> f32 {
        self.current.get(dim)
    }

    pub fn target(&self, dim: Dimension) -> f32 {
        self.target.get(dim)
    }

    pub fn targets(&self) -> SelfState {
        self.target
    }

    pub fn dynamics(&self) -> &DynamicsConfig {
        &self.dynamics
    }

    /// Receive every newly published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SelfState>> {
        self.watch_tx.subscribe()
    }

    /// Add `delta` to the target of `dim`. `current` is untouched until `update`.
    pub fn nudge(&mut self, dim: Dimension, delta: f32) {
        if !delta.is_finite() {
            tracing::warn!("Ignoring non-finite nudge for {}: {}", dim, delta);
            return;
        }
        let next = self.target.get(dim) + delta;
        self.target.set_clamped(dim, next);
    }

    pub fn set_target(&mut self, dim: Dimension, value: f32) {
        if !value.is_finite() {
            tracing::warn!("Ignoring non-finite target for {}: {}", dim, value);
            return;
        }
        self.target.set_clamped(dim, value);
    }

    pub fn apply_shift(&mut self, shift: &StateShift) {
        for (dim, delta) in shift.iter() {
            self.nudge(dim, delta);
        }
    }

    pub fn nudge_named(&mut self, name: &str, delta: f32) -> Result<(), StateError> {
        let dim: Dimension = name.parse()?;
        self.nudge(dim, delta);
        Ok(())
    }

    pub fn set_target_named(&mut self, name: &str, value: f32) -> Result<(), StateError> {
        let dim: Dimension = name.parse()?;
        if !value.is_finite() {
            return Err(StateError::NonFinite(dim));
        }
        self.set_target(dim, value);
        Ok(())
    }

    /// Apply a name-keyed shift. Every name is resolved before anything is
    /// applied, so an unknown name leaves the state untouched.
    pub fn apply_shift_named<'a, I>(&mut self, entries: I) -> Result<(), StateError>
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        let mut resolved = Vec::new();
        for (name, delta) in entries {
            resolved.push((name.parse::<Dimension>()?, delta));
        }
        for (dim, delta) in resolved {
            self.nudge(dim, delta);
        }
        Ok(())
    }

    /// Advance one tick. Returns whether a new snapshot was published.
    pub fn update(&mut self) -> bool {
        let d = self.dynamics.damping;
        for dim in Dimension::ALL {
            let current = self.current.get(dim);
            let diff = self.target.get(dim) - current;
            self.current.set_clamped(dim, current + diff * d);
        }

        // Attractor drift on targets, independent of engine input.
        let dy = &self.dynamics;
        let arousal = self.target.arousal;
        self.target.set_clamped(
            Dimension::Arousal,
            arousal + (dy.arousal_baseline - arousal) * dy.arousal_drift,
        );
        let social = self.target.social;
        self.target.set_clamped(
            Dimension::Social,
            social + (dy.social_baseline - social) * dy.social_drift,
        );
        let energy = self.target.energy;
        self.target
            .set_clamped(Dimension::Energy, energy - dy.energy_decay);

        let moved = Dimension::ALL.iter().any(|&dim| {
            (self.current.get(dim) - self.snapshot.get(dim)).abs() > self.dynamics.epsilon
        });
        if moved {
            self.publish();
        }
        moved
    }

    /// Force `current = target = state` and publish immediately.
    pub fn restore(&mut self, state: SelfState) -> Result<(), StateError> {
        if let Err(e) = state.validate() {
            tracing::warn!("Rejected self-state restore: {}", e);
            return Err(e);
        }
        self.current = state;
        self.target = state;
        self.publish();
        tracing::info!("Self-state restored: {}", state.describe());
        Ok(())
    }

    /// Validate and restore from a raw JSON snapshot.
    pub fn rehydrate(&mut self, value: &Value) -> Result<(), StateError> {
        match SelfState::from_snapshot(value) {
            Ok(state) => self.restore(state),
            Err(e) => {
                tracing::warn!("Rejected self-state snapshot: {}", e);
                Err(e)
            }
        }
    }

    fn publish(&mut self) {
        self.snapshot = Arc::new(self.current);
        self.watch_tx.send_replace(Arc::clone(&self.snapshot));
    }
}

impl Default for SelfStateStore {
    fn default() -> Self {
        Self::new(DynamicsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_at(valence: f32) -> SelfStateStore {
        let initial = SelfState {
            valence,
            ..SelfState::default()
        };
        SelfStateStore::with_initial(
            initial,
            DynamicsConfig {
                damping: 0.1,
                ..DynamicsConfig::default()
            },
        )
    }

    #[test]
    fn test_nudge_moves_target_only() {
        let mut store = store_at(0.0);
        store.nudge(Dimension::Valence, 0.5);
        assert_eq!(store.target(Dimension::Valence), 0.5);
        assert_eq!(store.current(Dimension::Valence), 0.0);
    }

    #[test]
    fn test_nudge_clamps() {
        let mut store = store_at(0.0);
        store.nudge(Dimension::Valence, -5.0);
        assert_eq!(store.target(Dimension::Valence), -1.0);
        store.nudge(Dimension::Energy, 5.0);
        assert_eq!(store.target(Dimension::Energy), 1.0);
        store.set_target(Dimension::Curiosity, -0.2);
        assert_eq!(store.target(Dimension::Curiosity), 0.0);
    }

    #[test]
    fn test_damping_scenario() {
        let mut store = store_at(0.0);
        store.nudge(Dimension::Valence, 0.5);

        store.update();
        assert!((store.current(Dimension::Valence) - 0.05).abs() < 1e-4);

        for _ in 0..9 {
            store.update();
        }
        let expected = 0.5 * (1.0 - 0.9f32.powi(10));
        assert!((store.current(Dimension::Valence) - expected).abs() < 1e-3);
        assert!((store.current(Dimension::Valence) - 0.326).abs() < 1e-3);
    }

    #[test]
    fn test_clamp_value_uses_dimension_range() {
        assert_eq!(Dimension::Valence.clamp_value(-3.0), -1.0);
        assert_eq!(Dimension::Valence.clamp_value(-0.4), -0.4);
        assert_eq!(Dimension::Social.clamp_value(-0.4), 0.0);
        assert_eq!(Dimension::Energy.clamp_value(1.2), 1.0);
    }

    #[test]
    fn test_overshooting_damping_is_replaced() {
        for damping in [1.8, 0.0] {
            let mut store = SelfStateStore::new(DynamicsConfig {
                damping,
                ..DynamicsConfig::default()
            });
            assert_eq!(store.dynamics().damping, 0.1);

            store.set_target(Dimension::Valence, 0.5);
            let mut gap = 0.5f32;
            for _ in 0..20 {
                store.update();
                let next = store.target(Dimension::Valence) - store.current(Dimension::Valence);
                assert!(next > 0.0 && next < gap, "gap {next} after {gap}");
                gap = next;
            }
        }
    }

    #[test]
    fn test_snapshot_identity_stable_without_change() {
        let mut store = store_at(0.0);
        // Settle the drifting dimensions first.
        let before = store.get();
        store.update();
        let after = store.get();
        assert!(Arc::ptr_eq(&before, &after), "tiny drift must not republish");

        store.nudge(Dimension::Valence, 0.5);
        store.update();
        assert!(!Arc::ptr_eq(&after, &store.get()));
    }

    #[test]
    fn test_watch_receives_new_snapshot() {
        let mut store = store_at(0.0);
        let mut rx = store.subscribe();
        store.nudge(Dimension::Curiosity, 0.3);
        assert!(store.update());
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert!(Arc::ptr_eq(&seen, &store.get()));
    }

    #[test]
    fn test_energy_decays_and_floors() {
        let mut store = SelfStateStore::with_initial(
            SelfState {
                energy: 0.00005,
                ..SelfState::default()
            },
            DynamicsConfig::default(),
        );
        store.update();
        assert_eq!(store.target(Dimension::Energy), 0.0);
        store.update();
        assert_eq!(store.target(Dimension::Energy), 0.0);
    }

    #[test]
    fn test_arousal_drifts_toward_baseline() {
        let mut store = SelfStateStore::default();
        store.set_target(Dimension::Arousal, 0.9);
        let before = store.target(Dimension::Arousal);
        store.update();
        let after = store.target(Dimension::Arousal);
        assert!(after < before);
        assert!(after > 0.3);
    }

    #[test]
    fn test_unknown_dimension_rejected() {
        let mut store = store_at(0.0);
        let before = store.targets();
        let err = store.nudge_named("happiness", 0.5).unwrap_err();
        assert_eq!(err, StateError::UnknownDimension("happiness".into()));
        assert_eq!(store.targets(), before);
    }

    #[test]
    fn test_named_shift_is_atomic() {
        let mut store = store_at(0.0);
        let before = store.targets();
        let result = store.apply_shift_named([("valence", 0.3), ("mood", 0.1)]);
        assert!(result.is_err());
        assert_eq!(store.targets(), before);

        store
            .apply_shift_named([("valence", 0.3), ("social", 0.1)])
            .unwrap();
        assert!((store.target(Dimension::Valence) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_ignored() {
        let mut store = store_at(0.2);
        store.nudge(Dimension::Valence, f32::NAN);
        store.set_target(Dimension::Valence, f32::INFINITY);
        assert_eq!(store.target(Dimension::Valence), 0.2);
        assert!(store.set_target_named("valence", f32::NAN).is_err());
    }

    #[test]
    fn test_restore_sets_both_and_publishes() {
        let mut store = store_at(0.0);
        let old = store.get();
        let state = SelfState {
            valence: -0.5,
            arousal: 0.8,
            confidence: 0.2,
            energy: 0.1,
            social: 0.9,
            curiosity: 0.4,
        };
        store.restore(state).unwrap();
        assert_eq!(*store.get(), state);
        assert_eq!(store.targets(), state);
        assert!(!Arc::ptr_eq(&old, &store.get()));
    }

    #[test]
    fn test_rehydrate_rejects_missing_dimension() {
        let mut store = store_at(0.1);
        let before = store.get();
        let err = store
            .rehydrate(&json!({"valence": 0.2, "arousal": 0.3}))
            .unwrap_err();
        assert!(matches!(err, StateError::MalformedSnapshot(_)));
        assert!(Arc::ptr_eq(&before, &store.get()));
    }

    #[test]
    fn test_rehydrate_rejects_out_of_range() {
        let mut store = store_at(0.1);
        let err = store
            .rehydrate(&json!({
                "valence": -1.5, "arousal": 0.3, "confidence": 0.5,
                "energy": 0.5, "social": 0.5, "curiosity": 0.5
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            StateError::OutOfRange {
                dimension: Dimension::Valence,
                ..
            }
        ));
        assert_eq!(store.current(Dimension::Valence), 0.1);
    }

    #[test]
    fn test_shift_from_value() {
        let shift = StateShift::from_value(&json!({"valence": -0.3, "social": 0.15})).unwrap();
        assert_eq!(shift.get(Dimension::Valence), Some(-0.3));
        assert_eq!(shift.get(Dimension::Social), Some(0.15));
        assert!(StateShift::from_value(&json!({"joy": 0.1})).is_err());
        assert!(StateShift::from_value(&json!({"valence": "lots"})).is_err());
        assert!(StateShift::from_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_describe() {
        let s = SelfState {
            valence: 0.6,
            arousal: 0.8,
            confidence: 0.5,
            energy: 0.2,
            social: 0.5,
            curiosity: 0.9,
        };
        let d = s.describe();
        assert!(d.contains("feeling positive"));
        assert!(d.contains("highly alert"));
        assert!(d.contains("low energy"));
        assert!(d.contains("very curious"));
    }
}
