//! Episodic memory behind a swappable store.
//!
//! The engine only recalls and remembers; where memories live is up to the
//! [`MemoryStore`]. The bundled [`InMemoryStore`] ranks by keyword overlap and
//! forgets the oldest entries past its capacity.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use wybe_core::payload::{AttentionFocus, MemoryQuery, MemoryResult, Speech};
use wybe_core::{ids, Engine, EngineContext, EngineId, Priority, Signal, SignalType};

const RECALL_LIMIT: usize = 3;

pub trait MemoryStore: Send {
    fn remember(&mut self, content: &str);

    /// Best matches for `query`, most relevant first.
    fn recall(&self, query: &str, limit: usize) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded keyword-overlap store.
#[derive(Debug)]
pub struct InMemoryStore {
    entries: VecDeque<String>,
    capacity: usize,
}

impl InMemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(500)
    }
}

/// Lowercased words of at least three letters.
fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

impl MemoryStore for InMemoryStore {
    fn remember(&mut self, content: &str) {
        let content = content.trim();
        if content.is_empty() {
            return;
        }
        self.entries.push_back(content.to_string());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    fn recall(&self, query: &str, limit: usize) -> Vec<String> {
        let wanted = keywords(query);
        if wanted.is_empty() {
            return Vec::new();
        }

        // Newest first so ties favour recent memories.
        let mut scored: Vec<(usize, usize, &String)> = self
            .entries
            .iter()
            .rev()
            .enumerate()
            .filter_map(|(age, entry)| {
                let overlap = keywords(entry).intersection(&wanted).count();
                (overlap > 0).then_some((overlap, age, entry))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, _, entry)| entry.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct MemoryEngine {
    id: EngineId,
    store: Box<dyn MemoryStore>,
    debug: String,
}

impl MemoryEngine {
    pub fn new(store: impl MemoryStore + 'static) -> Self {
        Self {
            id: ids::MEMORY.into(),
            store: Box::new(store),
            debug: String::new(),
        }
    }

    pub fn store(&self) -> &dyn MemoryStore {
        self.store.as_ref()
    }

    fn recall_and_share(&mut self, query: &str, ctx: &mut EngineContext<'_>) {
        let items = self.store.recall(query, RECALL_LIMIT);
        self.debug = format!("Recalled {} for \"{}\"", items.len(), query);
        if items.is_empty() {
            return;
        }
        tracing::debug!("Memory recalled {} item(s)", items.len());
        let out = ctx
            .signal(SignalType::MemoryResult, &MemoryResult { items })
            .to([ids::ARBITER, ids::DEFAULT_MODE])
            .with_priority(Priority::Low);
        ctx.emit(out);
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new(InMemoryStore::default())
    }
}

impl Engine for MemoryEngine {
    fn id(&self) -> &EngineId {
        &self.id
    }

    fn subscribes_to(&self) -> Vec<SignalType> {
        vec![
            SignalType::AttentionFocus,
            SignalType::MemoryQuery,
            SignalType::Speech,
        ]
    }

    fn process(&mut self, batch: &[Arc<Signal>], ctx: &mut EngineContext<'_>) {
        for signal in batch {
            match signal.kind {
                SignalType::AttentionFocus => {
                    if let Some(focus) = signal.payload_as::<AttentionFocus>() {
                        // Recall before storing, or the focus would find itself.
                        self.recall_and_share(&focus.content, ctx);
                        self.store.remember(&format!("They said: {}", focus.content));
                    }
                }
                SignalType::MemoryQuery => {
                    if let Some(query) = signal.payload_as::<MemoryQuery>() {
                        self.recall_and_share(&query.query, ctx);
                    }
                }
                SignalType::Speech => {
                    if let Some(speech) = signal.payload_as::<Speech>() {
                        self.store.remember(&format!("I said: {}", speech.text));
                    }
                }
                _ => {}
            }
        }
    }

    fn debug_info(&self) -> String {
        format!("{} ({} stored)", self.debug, self.store.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use serde_json::json;

    #[test]
    fn test_recall_ranks_by_overlap() {
        let mut store = InMemoryStore::default();
        store.remember("the garden was full of roses");
        store.remember("we talked about the ocean and roses");
        store.remember("nothing relevant here");
        let hits = store.recall("ocean roses", 2);
        assert_eq!(hits[0], "we talked about the ocean and roses");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut store = InMemoryStore::new(2);
        store.remember("first apple");
        store.remember("second apple");
        store.remember("third apple");
        assert_eq!(store.len(), 2);
        assert!(!store.recall("apple", 5).contains(&"first apple".to_string()));
    }

    #[test]
    fn test_focus_recalls_then_remembers() {
        let mut h = Harness::new();
        h.listen(ids::ARBITER, &[SignalType::MemoryResult]);
        let mut engine = MemoryEngine::default();
        let focus = |text: &str| {
            Signal::new(
                SignalType::AttentionFocus,
                ids::ARBITER,
                json!({"content": text, "modality": "text", "salience": 0.8}),
            )
        };

        h.process(&mut engine, vec![focus("my cat is sick")]);
        assert!(h.emitted_to(ids::ARBITER).is_empty());
        assert_eq!(engine.store().len(), 1);

        h.process(&mut engine, vec![focus("the cat seems better")]);
        let out = h.emitted_to(ids::ARBITER);
        let result: MemoryResult = out[0].payload_as().unwrap();
        assert_eq!(result.items, vec!["They said: my cat is sick"]);
    }

    #[test]
    fn test_speech_is_remembered() {
        let mut h = Harness::new();
        let mut engine = MemoryEngine::default();
        h.process(
            &mut engine,
            vec![Signal::new(SignalType::Speech, ids::ARBITER, json!({"text": "hello there"}))],
        );
        assert_eq!(engine.store().recall("hello", 1), vec!["I said: hello there"]);
    }

    proptest::proptest! {
        #[test]
        fn test_store_stays_bounded(
            cap in 1usize..20,
            entries in proptest::collection::vec("[a-z ]{0,30}", 0..60),
            query in "[a-z ]{0,20}",
            limit in 0usize..6,
        ) {
            let mut store = InMemoryStore::new(cap);
            for entry in &entries {
                store.remember(entry);
            }
            proptest::prop_assert!(store.len() <= cap);
            proptest::prop_assert!(store.recall(&query, limit).len() <= limit);
        }
    }
}
