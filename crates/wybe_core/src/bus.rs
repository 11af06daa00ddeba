//! Signal Bus: typed publish/subscribe routing.
//!
//! Emission never runs engine code. Matching signals are appended to the
//! subscriber's pending batch and handed over by the scheduler on the next
//! tick. Observer subscriptions are the one exception: their callback runs at
//! emission time, and they have no way to emit in turn. Targets apply to
//! observers the same as to mailboxes.

use crate::signal::{EngineId, Signal, SignalType};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Callback invoked synchronously for every matching emission.
pub type Observer = Box<dyn Fn(&Arc<Signal>) + Send + Sync>;

/// How a subscription receives its signals.
pub enum Delivery {
    /// Queue into the engine's pending batch for the next tick.
    Mailbox,
    /// Call back immediately (logging, UI, tests).
    Observer(Observer),
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delivery::Mailbox => f.write_str("Mailbox"),
            Delivery::Observer(_) => f.write_str("Observer(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BusError {
    #[error("subscription for {0} must name at least one signal type")]
    EmptySubscription(EngineId),
}

#[derive(Debug)]
struct Subscription {
    id: SubscriptionId,
    engine: EngineId,
    types: HashSet<SignalType>,
    delivery: Delivery,
}

/// Handle for feeding signals in from outside the tick loop.
///
/// Out-of-band tasks (bridge requests, stdin readers) never touch the bus
/// directly; they push here and the scheduler emits on its next tick.
#[derive(Debug, Clone)]
pub struct Injector {
    tx: mpsc::UnboundedSender<Signal>,
}

impl Injector {
    /// Queue a signal. Returns `false` if the bus has been dropped.
    pub fn inject(&self, signal: Signal) -> bool {
        self.tx.send(signal).is_ok()
    }
}

pub struct SignalBus {
    subscriptions: Vec<Subscription>,
    next_subscription: u64,
    next_seq: u64,
    now: Duration,
    pending: HashMap<EngineId, Vec<Arc<Signal>>>,
    injector_tx: mpsc::UnboundedSender<Signal>,
    injector_rx: mpsc::UnboundedReceiver<Signal>,
}

impl SignalBus {
    pub fn new() -> Self {
        let (injector_tx, injector_rx) = mpsc::unbounded_channel();
        Self {
            subscriptions: Vec::new(),
            next_subscription: 1,
            next_seq: 1,
            now: Duration::ZERO,
            pending: HashMap::new(),
            injector_tx,
            injector_rx,
        }
    }

    /// Register interest of `engine` in `types`.
    ///
    /// Subscribing again creates a second, independent subscription.
    pub fn subscribe<I>(
        &mut self,
        engine: impl Into<EngineId>,
        types: I,
        delivery: Delivery,
    ) -> Result<SubscriptionId, BusError>
    where
        I: IntoIterator<Item = SignalType>,
    {
        let engine = engine.into();
        let types: HashSet<SignalType> = types.into_iter().collect();
        if types.is_empty() {
            return Err(BusError::EmptySubscription(engine));
        }

        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        tracing::debug!("Subscribed {} to {:?} ({:?})", engine, types, delivery);
        self.subscriptions.push(Subscription {
            id,
            engine,
            types,
            delivery,
        });
        Ok(id)
    }

    /// Remove a subscription. Unknown or already removed ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscriptions.retain(|s| s.id != id);
    }

    /// Route a signal to every live matching subscription.
    ///
    /// Returns the number of deliveries made. Targets that match no
    /// subscription are dropped silently.
    pub fn emit(&mut self, signal: Signal) -> usize {
        let signal = Arc::new(signal.stamp(self.now, self.next_seq));
        self.next_seq += 1;

        let mut delivered = 0;
        for sub in &self.subscriptions {
            if !sub.types.contains(&signal.kind) || !signal.is_for(&sub.engine) {
                continue;
            }
            match &sub.delivery {
                Delivery::Mailbox => {
                    self.pending
                        .entry(sub.engine.clone())
                        .or_default()
                        .push(Arc::clone(&signal));
                }
                Delivery::Observer(callback) => callback(&signal),
            }
            delivered += 1;
        }

        tracing::trace!(
            "Emitted {} #{} from {} -> {} deliveries",
            signal.kind,
            signal.seq,
            signal.source,
            delivered
        );
        delivered
    }

    pub fn injector(&self) -> Injector {
        Injector {
            tx: self.injector_tx.clone(),
        }
    }

    /// Emit everything queued through an [`Injector`] since the last drain.
    pub fn drain_injected(&mut self) -> usize {
        let mut count = 0;
        while let Ok(signal) = self.injector_rx.try_recv() {
            self.emit(signal);
            count += 1;
        }
        count
    }

    /// Hand over every pending batch, leaving fresh empty mailboxes behind.
    ///
    /// Anything emitted after this call lands in the next tick's batches.
    pub fn take_pending(&mut self) -> HashMap<EngineId, Vec<Arc<Signal>>> {
        std::mem::take(&mut self.pending)
    }

    /// Number of signals waiting for `engine`.
    pub fn pending_for(&self, engine: &EngineId) -> usize {
        self.pending.get(engine).map_or(0, Vec::len)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub(crate) fn set_now(&mut self, now: Duration) {
        self.now = now;
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::ids;
    use serde_json::json;
    use std::sync::Mutex;

    fn text(n: u64) -> Signal {
        Signal::new(SignalType::TextInput, ids::WORLD, json!({ "n": n }))
    }

    #[test]
    fn test_empty_types_rejected() {
        let mut bus = SignalBus::new();
        let err = bus
            .subscribe("a", Vec::<SignalType>::new(), Delivery::Mailbox)
            .unwrap_err();
        assert_eq!(err, BusError::EmptySubscription(EngineId::from("a")));
    }

    #[test]
    fn test_targeted_delivery() {
        let mut bus = SignalBus::new();
        for id in ["a", "b", "c"] {
            bus.subscribe(id, [SignalType::Thought], Delivery::Mailbox)
                .unwrap();
        }

        let delivered = bus.emit(
            Signal::new(SignalType::Thought, "x", json!(null)).to(["a", "b"]),
        );
        assert_eq!(delivered, 2);
        assert_eq!(bus.pending_for(&"a".into()), 1);
        assert_eq!(bus.pending_for(&"b".into()), 1);
        assert_eq!(bus.pending_for(&"c".into()), 0);
    }

    #[test]
    fn test_broadcast_reaches_all_subscribers_of_type() {
        let mut bus = SignalBus::new();
        bus.subscribe("a", [SignalType::TextInput], Delivery::Mailbox)
            .unwrap();
        bus.subscribe("b", [SignalType::TextInput], Delivery::Mailbox)
            .unwrap();
        bus.subscribe("c", [SignalType::Speech], Delivery::Mailbox)
            .unwrap();

        assert_eq!(bus.emit(text(1)), 2);
        assert_eq!(bus.pending_for(&"c".into()), 0);
    }

    #[test]
    fn test_unknown_target_is_silently_dropped() {
        let mut bus = SignalBus::new();
        bus.subscribe("a", [SignalType::Thought], Delivery::Mailbox)
            .unwrap();
        let delivered =
            bus.emit(Signal::new(SignalType::Thought, "x", json!(null)).to(["ghost"]));
        assert_eq!(delivered, 0);
        assert!(bus.take_pending().is_empty());
    }

    #[test]
    fn test_batch_preserves_emission_order() {
        let mut bus = SignalBus::new();
        bus.subscribe("a", [SignalType::TextInput], Delivery::Mailbox)
            .unwrap();
        for n in 0..5 {
            bus.emit(text(n));
        }
        let batch = bus.take_pending().remove(&EngineId::from("a")).unwrap();
        let order: Vec<u64> = batch.iter().map(|s| s.payload["n"].as_u64().unwrap()).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert!(batch.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let mut bus = SignalBus::new();
        let id = bus
            .subscribe("a", [SignalType::TextInput], Delivery::Mailbox)
            .unwrap();
        bus.unsubscribe(id);
        bus.unsubscribe(id);
        assert_eq!(bus.emit(text(1)), 0);
    }

    #[test]
    fn test_resubscription_is_independent() {
        let mut bus = SignalBus::new();
        let first = bus
            .subscribe("a", [SignalType::TextInput], Delivery::Mailbox)
            .unwrap();
        let second = bus
            .subscribe("a", [SignalType::TextInput], Delivery::Mailbox)
            .unwrap();
        assert_ne!(first, second);
        bus.unsubscribe(first);
        assert_eq!(bus.emit(text(1)), 1);
    }

    #[test]
    fn test_observer_called_at_emission() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut bus = SignalBus::new();
        bus.subscribe(
            "ui",
            [SignalType::Speech],
            Delivery::Observer(Box::new(move |s| sink.lock().unwrap().push(s.seq))),
        )
        .unwrap();

        bus.emit(Signal::new(SignalType::Speech, "arbiter", json!({"text": "hello"})));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(bus.take_pending().is_empty());
    }

    #[test]
    fn test_observer_honours_targets() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = SignalBus::new();
        for id in ["arbiter", "ui"] {
            let sink = Arc::clone(&seen);
            bus.subscribe(
                id,
                [SignalType::ReasoningResponse],
                Delivery::Observer(Box::new(move |_| sink.lock().unwrap().push(id))),
            )
            .unwrap();
        }

        bus.emit(
            Signal::new(SignalType::ReasoningResponse, "bridge", json!(null)).to(["arbiter"]),
        );
        assert_eq!(*seen.lock().unwrap(), vec!["arbiter"]);
    }

    #[test]
    fn test_injected_signals_emitted_on_drain() {
        let mut bus = SignalBus::new();
        bus.subscribe("a", [SignalType::TextInput], Delivery::Mailbox)
            .unwrap();
        let injector = bus.injector();
        assert!(injector.inject(text(7)));
        assert_eq!(bus.pending_for(&"a".into()), 0);
        assert_eq!(bus.drain_injected(), 1);
        assert_eq!(bus.pending_for(&"a".into()), 1);
    }

    #[test]
    fn test_inject_after_bus_dropped_reports_false() {
        let bus = SignalBus::new();
        let injector = bus.injector();
        drop(bus);
        assert!(!injector.inject(text(1)));
    }
}
