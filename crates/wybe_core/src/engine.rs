//! Engine contract.
//!
//! An engine is one logical role of the mind. Each tick the scheduler calls
//! exactly one of [`Engine::process`] (non-empty batch) or
//! [`Engine::on_idle`] (empty batch). Engines own their private working state;
//! everything shared goes through the [`EngineContext`].

use crate::bus::SignalBus;
use crate::signal::{EngineId, Signal, SignalType};
use crate::state::{Dimension, SelfState, SelfStateStore, StateShift};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    #[default]
    Idle,
    Processing,
}

pub trait Engine: Send {
    fn id(&self) -> &EngineId;

    /// Signal types this engine listens to. Read once at registration.
    fn subscribes_to(&self) -> Vec<SignalType>;

    /// Handle this tick's batch, in emission order.
    fn process(&mut self, batch: &[Arc<Signal>], ctx: &mut EngineContext<'_>);

    /// Called on ticks where nothing arrived.
    fn on_idle(&mut self, _ctx: &mut EngineContext<'_>) {}

    /// Free-form observability line.
    fn debug_info(&self) -> String {
        String::new()
    }
}

/// What an engine may touch during one invocation.
///
/// Emissions land in next tick's batches; state nudges become visible after
/// next tick's `update`.
pub struct EngineContext<'a> {
    id: &'a EngineId,
    bus: &'a mut SignalBus,
    state: &'a mut SelfStateStore,
    tick: u64,
    now: Duration,
}

impl<'a> EngineContext<'a> {
    pub fn new(
        id: &'a EngineId,
        bus: &'a mut SignalBus,
        state: &'a mut SelfStateStore,
        tick: u64,
        now: Duration,
    ) -> Self {
        Self {
            id,
            bus,
            state,
            tick,
            now,
        }
    }

    pub fn id(&self) -> &EngineId {
        self.id
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Monotonic time of the current tick.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Latest published Self-State snapshot.
    pub fn state(&self) -> Arc<SelfState> {
        self.state.get()
    }

    pub fn current(&self, dim: Dimension) -> f32 {
        self.state.current(dim)
    }

    pub fn nudge(&mut self, dim: Dimension, delta: f32) {
        self.state.nudge(dim, delta);
    }

    pub fn set_target(&mut self, dim: Dimension, value: f32) {
        self.state.set_target(dim, value);
    }

    pub fn apply_shift(&mut self, shift: &StateShift) {
        self.state.apply_shift(shift);
    }

    /// Draft a broadcast signal sourced from this engine.
    pub fn signal<T: Serialize + ?Sized>(&self, kind: SignalType, payload: &T) -> Signal {
        Signal::new(kind, self.id.clone(), crate::payload::encode(payload))
    }

    pub fn emit(&mut self, signal: Signal) -> usize {
        self.bus.emit(signal)
    }
}
