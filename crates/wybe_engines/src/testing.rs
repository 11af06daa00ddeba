//! Drives a single engine outside the scheduler for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wybe_core::{Delivery, Engine, EngineContext, EngineId, SelfStateStore, Signal, SignalBus, SignalType};

pub struct Harness {
    pub bus: SignalBus,
    pub state: SelfStateStore,
    pub tick: u64,
    pub now: Duration,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            bus: SignalBus::new(),
            state: SelfStateStore::default(),
            tick: 0,
            now: Duration::ZERO,
        }
    }

    /// Give `listener` a mailbox for `types` so emissions can be inspected.
    pub fn listen(&mut self, listener: &str, types: &[SignalType]) {
        self.bus
            .subscribe(listener, types.iter().copied(), Delivery::Mailbox)
            .unwrap();
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    pub fn process(&mut self, engine: &mut dyn Engine, signals: Vec<Signal>) {
        self.tick += 1;
        let batch: Vec<_> = signals.into_iter().map(Arc::new).collect();
        let id = engine.id().clone();
        let mut ctx = EngineContext::new(&id, &mut self.bus, &mut self.state, self.tick, self.now);
        engine.process(&batch, &mut ctx);
    }

    pub fn idle(&mut self, engine: &mut dyn Engine) {
        self.tick += 1;
        let id = engine.id().clone();
        let mut ctx = EngineContext::new(&id, &mut self.bus, &mut self.state, self.tick, self.now);
        engine.on_idle(&mut ctx);
    }

    pub fn emitted(&mut self) -> HashMap<EngineId, Vec<Arc<Signal>>> {
        self.bus.take_pending()
    }

    /// Everything queued for `listener`, draining it.
    pub fn emitted_to(&mut self, listener: &str) -> Vec<Arc<Signal>> {
        self.emitted()
            .remove(&EngineId::from(listener))
            .unwrap_or_default()
    }
}
