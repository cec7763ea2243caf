//! Per-match delivery queues.
//!
//! The queues live in the memory of the process that created them and are
//! not replicated. A consumer connected to one instance never sees envelopes
//! pushed by a different instance while that one held the lock.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::Stream;

use crate::envelope::Envelope;

/// Unbounded FIFO of pending envelopes, one per match.
#[derive(Default)]
pub struct DeliveryQueue {
    queues: DashMap<String, VecDeque<Envelope>>,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail of `match_id`'s queue, creating it if absent.
    pub fn push(&self, match_id: &str, envelope: Envelope) {
        self.queues
            .entry(match_id.to_string())
            .or_default()
            .push_back(envelope);
    }

    /// Remove and return the head of `match_id`'s queue.
    pub fn pop(&self, match_id: &str) -> Option<Envelope> {
        self.queues.get_mut(match_id)?.pop_front()
    }

    /// Number of envelopes waiting for `match_id`.
    pub fn len(&self, match_id: &str) -> usize {
        self.queues.get(match_id).map_or(0, |q| q.len())
    }

    /// True when no match has pending envelopes.
    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(|q| q.is_empty())
    }

    /// Total envelopes waiting across all matches.
    pub fn total_len(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }

    /// Drain `match_id`'s queue as a stream, checking every `every` while it
    /// is empty. The stream never ends; drop it to stop consuming.
    pub fn poll_stream(
        self: &Arc<Self>,
        match_id: impl Into<String>,
        every: Duration,
    ) -> impl Stream<Item = Envelope> + Send + 'static {
        let queue = Arc::clone(self);
        futures::stream::unfold(
            (queue, match_id.into()),
            move |(queue, match_id)| async move {
                loop {
                    if let Some(envelope) = queue.pop(&match_id) {
                        return Some((envelope, (queue, match_id)));
                    }
                    tokio::time::sleep(every).await;
                }
            },
        )
    }
}
