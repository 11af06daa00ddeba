//! The tick loop.
//!
//! One tick = drain injected signals, advance the Self-State, then hand
//! every registered engine either its pending batch or an idle call. All of
//! it runs on one task, so nothing in here needs a lock.

use crate::bus::{Delivery, Injector, Observer, SignalBus, SubscriptionId};
use crate::clock::{Clock, MonotonicClock};
use crate::engine::{Engine, EngineContext, EngineStatus};
use crate::signal::{EngineId, Signal, SignalType};
use crate::state::SelfStateStore;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("engine '{0}' is already registered")]
    DuplicateEngine(EngineId),
    #[error(transparent)]
    Bus(#[from] crate::bus::BusError),
}

/// Per-engine observability record.
#[derive(Debug, Clone, Serialize)]
pub struct EngineReport {
    pub id: EngineId,
    pub status: EngineStatus,
    pub debug: String,
    pub processed_ticks: u64,
    pub idle_ticks: u64,
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Signals handed to engines this tick.
    pub delivered: usize,
    /// Engines that got `on_idle`.
    pub idle: usize,
    pub state_published: bool,
}

struct EngineSlot {
    id: EngineId,
    engine: Box<dyn Engine>,
    status: EngineStatus,
    processed_ticks: u64,
    idle_ticks: u64,
}

pub struct Scheduler {
    bus: SignalBus,
    state: SelfStateStore,
    engines: Vec<EngineSlot>,
    index: HashMap<EngineId, usize>,
    clock: Box<dyn Clock>,
    tick: u64,
    now: Duration,
}

impl Scheduler {
    pub fn new(state: SelfStateStore) -> Self {
        Self::with_clock(state, MonotonicClock::new())
    }

    pub fn with_clock(state: SelfStateStore, clock: impl Clock + 'static) -> Self {
        Self {
            bus: SignalBus::new(),
            state,
            engines: Vec::new(),
            index: HashMap::new(),
            clock: Box::new(clock),
            tick: 0,
            now: Duration::ZERO,
        }
    }

    /// Register an engine and subscribe it to its declared signal types.
    ///
    /// Engines run in registration order each tick.
    pub fn register<E: Engine + 'static>(&mut self, engine: E) -> Result<(), SchedulerError> {
        self.register_boxed(Box::new(engine))
    }

    pub fn register_boxed(&mut self, engine: Box<dyn Engine>) -> Result<(), SchedulerError> {
        let id = engine.id().clone();
        if self.index.contains_key(&id) {
            return Err(SchedulerError::DuplicateEngine(id));
        }
        self.bus
            .subscribe(id.clone(), engine.subscribes_to(), Delivery::Mailbox)?;

        tracing::info!("Registered engine {}", id);
        self.index.insert(id.clone(), self.engines.len());
        self.engines.push(EngineSlot {
            id,
            engine,
            status: EngineStatus::Idle,
            processed_ticks: 0,
            idle_ticks: 0,
        });
        Ok(())
    }

    /// Attach an observer callback for `types` (printing, recording).
    pub fn observe<I>(
        &mut self,
        name: &str,
        types: I,
        observer: Observer,
    ) -> Result<SubscriptionId, SchedulerError>
    where
        I: IntoIterator<Item = SignalType>,
    {
        Ok(self
            .bus
            .subscribe(name, types, Delivery::Observer(observer))?)
    }

    /// Emit from outside the engines; delivered on the next tick.
    pub fn emit(&mut self, signal: Signal) -> usize {
        self.bus.emit(signal)
    }

    pub fn injector(&self) -> Injector {
        self.bus.injector()
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SignalBus {
        &mut self.bus
    }

    pub fn state(&self) -> &SelfStateStore {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SelfStateStore {
        &mut self.state
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn status(&self, id: &EngineId) -> Option<EngineStatus> {
        self.index.get(id).map(|&i| self.engines[i].status)
    }

    pub fn reports(&self) -> Vec<EngineReport> {
        self.engines
            .iter()
            .map(|slot| EngineReport {
                id: slot.id.clone(),
                status: slot.status,
                debug: slot.engine.debug_info(),
                processed_ticks: slot.processed_ticks,
                idle_ticks: slot.idle_ticks,
            })
            .collect()
    }

    /// Run one discrete simulation step.
    pub fn tick(&mut self) -> TickReport {
        self.now = self.clock.advance();
        self.tick += 1;
        self.bus.set_now(self.now);

        let injected = self.bus.drain_injected();
        let state_published = self.state.update();

        let mut batches = self.bus.take_pending();
        let mut report = TickReport {
            tick: self.tick,
            state_published,
            ..TickReport::default()
        };

        for slot in self.engines.iter_mut() {
            let batch = batches.remove(&slot.id).unwrap_or_default();
            slot.status = EngineStatus::Processing;

            let mut ctx = EngineContext::new(
                &slot.id,
                &mut self.bus,
                &mut self.state,
                self.tick,
                self.now,
            );
            if batch.is_empty() {
                slot.engine.on_idle(&mut ctx);
                slot.idle_ticks += 1;
                report.idle += 1;
            } else {
                tracing::trace!("{} processing {} signals", slot.id, batch.len());
                slot.engine.process(&batch, &mut ctx);
                slot.processed_ticks += 1;
                report.delivered += batch.len();
            }

            slot.status = EngineStatus::Idle;
        }

        for (id, orphaned) in batches {
            tracing::trace!("Dropping {} signals for unregistered {}", orphaned.len(), id);
        }
        if injected > 0 {
            tracing::debug!("Tick {}: {} injected signals", self.tick, injected);
        }
        report
    }

    /// Tick at `interval` until `shutdown` resolves or `max_ticks` is reached.
    ///
    /// The loop yields between ticks, which is where out-of-band bridge
    /// tasks make progress.
    pub async fn run<F>(&mut self, interval: Duration, max_ticks: Option<u64>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(
            "Tick loop started: {} engines, interval {:?}",
            self.engines.len(),
            interval
        );
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested at tick {}", self.tick);
                    break;
                }
                _ = ticker.tick() => {
                    self.tick();
                    if max_ticks.is_some_and(|max| self.tick >= max) {
                        tracing::info!("Tick limit {} reached", self.tick);
                        break;
                    }
                }
            }
        }
    }
}
