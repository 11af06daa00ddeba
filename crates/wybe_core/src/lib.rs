//! # Wybe Core
//!
//! The coordination substrate of the mind:
//!
//! - [`SignalBus`]: typed, prioritized, optionally targeted pub/sub
//! - [`SelfStateStore`]: the shared damped affective state
//! - [`Engine`]: the contract every engine implements
//! - [`Scheduler`]: the single-task tick loop driving all of the above
//!
//! Signals emitted during tick N are delivered on tick N+1. Out-of-band work
//! (network calls) re-enters only through an [`Injector`].

pub mod bus;
pub mod clock;
pub mod config;
pub mod engine;
pub mod payload;
pub mod persist;
pub mod scheduler;
pub mod signal;
pub mod state;

pub use bus::{BusError, Delivery, Injector, Observer, SignalBus, SubscriptionId};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{AutonomyConfig, BridgeConfig, DynamicsConfig, SchedulerConfig, WybeConfig};
pub use engine::{Engine, EngineContext, EngineStatus};
pub use persist::PersistedState;
pub use scheduler::{EngineReport, Scheduler, SchedulerError, TickReport};
pub use signal::{ids, EngineId, Priority, Signal, SignalType};
pub use state::{Dimension, SelfState, SelfStateStore, StateError, StateShift};
