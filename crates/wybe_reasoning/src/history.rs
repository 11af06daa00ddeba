//! Bounded conversation history.
//!
//! Each outbound entry gets a sequence number; the matching reply is inserted
//! right after the last entry with the same or an earlier sequence, so a reply
//! that arrives late still lands next to its request.

use crate::channel::{HistoryMessage, Role};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub seq: u64,
}

#[derive(Debug)]
pub struct ConversationHistory {
    entries: VecDeque<HistoryEntry>,
    cap: usize,
    next_seq: u64,
}

impl ConversationHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cap,
            next_seq: 1,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Record a request. Returns the sequence marker for its reply.
    pub fn push_outbound(&mut self, content: impl Into<String>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(HistoryEntry {
            role: Role::User,
            content: content.into(),
            seq,
        });
        self.trim();
        seq
    }

    /// Record the reply to request `seq`.
    pub fn push_inbound(&mut self, seq: u64, content: impl Into<String>) {
        let at = self
            .entries
            .iter()
            .rposition(|e| e.seq <= seq)
            .map_or(0, |i| i + 1);
        self.entries.insert(
            at,
            HistoryEntry {
                role: Role::Assistant,
                content: content.into(),
                seq,
            },
        );
        self.trim();
    }

    /// Wire view of the history, leaving out request `seq` itself.
    pub fn messages_except(&self, seq: u64) -> Vec<HistoryMessage> {
        self.entries
            .iter()
            .filter(|e| !(e.seq == seq && e.role == Role::User))
            .map(|e| HistoryMessage {
                role: e.role,
                content: e.content.clone(),
            })
            .collect()
    }

    fn trim(&mut self) {
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }
}
