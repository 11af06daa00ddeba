//! Reflection bridge: asks the service for an inner thought while idle.
//!
//! Same shape as the thought bridge with its own latch. Every outcome,
//! including a busy drop, answers the default-mode engine with a
//! `reflection-result`; `thought: None` tells it to think for itself.

use crate::channel::ReasoningChannel;
use crate::latch::InFlight;
use std::sync::Arc;
use wybe_core::payload::{encode, ReflectRequest, ReflectionResult};
use wybe_core::{ids, Engine, EngineContext, EngineId, Injector, Priority, Signal, SignalType};

fn reflection_signal(result: &ReflectionResult) -> Signal {
    Signal::new(SignalType::ReflectionResult, ids::REFLECTION_BRIDGE, encode(result))
        .to([ids::DEFAULT_MODE])
        .with_priority(Priority::Idle)
}

pub struct ReflectionBridge {
    id: EngineId,
    channel: Arc<dyn ReasoningChannel>,
    injector: Injector,
    latch: InFlight,
    asked: u64,
}

impl ReflectionBridge {
    pub fn new(channel: Arc<dyn ReasoningChannel>, injector: Injector) -> Self {
        Self {
            id: ids::REFLECTION_BRIDGE.into(),
            channel,
            injector,
            latch: InFlight::new(),
            asked: 0,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.latch.is_busy()
    }

    fn trigger(&mut self, request: ReflectRequest, ctx: &mut EngineContext<'_>) {
        let Some(guard) = self.latch.try_acquire() else {
            tracing::debug!("Reflection already pending, answering with nothing");
            ctx.emit(reflection_signal(&ReflectionResult { thought: None }));
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            ctx.emit(reflection_signal(&ReflectionResult { thought: None }));
            return;
        };

        self.asked += 1;
        let channel = Arc::clone(&self.channel);
        let injector = self.injector.clone();
        runtime.spawn(async move {
            let thought = match channel.reflect(request).await {
                Ok(response) => response
                    .thought
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty()),
                Err(e) => {
                    tracing::warn!("Reflection via {} failed: {:#}", channel.name(), e);
                    None
                }
            };
            drop(guard);
            if !injector.inject(reflection_signal(&ReflectionResult { thought })) {
                tracing::debug!("Tick loop gone; discarding reflection result");
            }
        });
    }
}

impl Engine for ReflectionBridge {
    fn id(&self) -> &EngineId {
        &self.id
    }

    fn subscribes_to(&self) -> Vec<SignalType> {
        vec![SignalType::ReflectRequest]
    }

    fn process(&mut self, batch: &[Arc<Signal>], ctx: &mut EngineContext<'_>) {
        for signal in batch {
            if let Some(request) = signal.payload_as::<ReflectRequest>() {
                self.trigger(request, ctx);
            }
        }
    }

    fn debug_info(&self) -> String {
        format!("{} reflections requested", self.asked)
    }
}
