//! Request queue shared by the list retrieval paths.
//!
//! Tracks queued keys, keys in flight toward a peer with the time they were sent,
//! retry counts and the largest amount of outstanding work seen since the queue was
//! last drained, which is what progress is reported against.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::Duration;

use crate::types::PeerId;

#[derive(Debug, Clone)]
pub(crate) struct DownloadConfig {
    max_concurrent: usize,
    timeout: Duration,
    max_retries: u32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            timeout: Duration::from_secs(20),
            max_retries: 3,
        }
    }
}

impl DownloadConfig {
    pub(crate) fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    peer: PeerId,
    /// Position in send order.
    sequence: u64,
}

/// Queue of keys to download, generic over the key identifying an item.
#[derive(Debug)]
pub(crate) struct DownloadCoordinator<K: Hash + Eq + Clone> {
    pending: VecDeque<K>,
    in_flight: HashMap<K, InFlight>,
    retry_counts: HashMap<K, u32>,
    config: DownloadConfig,
    /// Largest `remaining()` since the queue was last empty.
    max_amount: usize,
    /// Requests that timed out, over the coordinator's lifetime.
    timed_out_attempts: u32,
    sent: u64,
}

impl<K: Hash + Eq + Clone> Default for DownloadCoordinator<K> {
    fn default() -> Self {
        Self::new(DownloadConfig::default())
    }
}

impl<K: Hash + Eq + Clone> DownloadCoordinator<K> {
    pub(crate) fn new(config: DownloadConfig) -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            retry_counts: HashMap::new(),
            config,
            max_amount: 0,
            timed_out_attempts: 0,
            sent: 0,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.in_flight.clear();
        self.retry_counts.clear();
        self.max_amount = 0;
    }

    /// Whether `key` is queued or in flight.
    pub(crate) fn contains(&self, key: &K) -> bool {
        self.in_flight.contains_key(key) || self.pending.contains(key)
    }

    /// Queues keys at the back, skipping those already tracked.
    pub(crate) fn enqueue(&mut self, items: impl IntoIterator<Item = K>) {
        for item in items {
            if !self.contains(&item) {
                self.pending.push_back(item);
            }
        }
        self.update_max_amount();
    }

    /// Queues keys at the front, keeping their order. A key already queued moves to
    /// the front; a key in flight is left alone.
    pub(crate) fn enqueue_front(&mut self, items: impl IntoIterator<Item = K>) {
        let items: Vec<K> = items.into_iter().filter(|item| !self.in_flight.contains_key(item)).collect();
        self.pending.retain(|queued| !items.contains(queued));
        for item in items.into_iter().rev() {
            self.pending.push_front(item);
        }
        self.update_max_amount();
    }

    /// Queues a failed key for retry at the front.
    ///
    /// Returns false if it exceeded the retry limit, in which case it is dropped.
    pub(crate) fn enqueue_retry(&mut self, item: K) -> bool {
        let count = self.retry_counts.entry(item.clone()).or_insert(0);
        if *count >= self.config.max_retries {
            tracing::warn!("Max retries ({}) exceeded, giving up", self.config.max_retries);
            self.retry_counts.remove(&item);
            return false;
        }
        *count += 1;
        self.enqueue_front([item]);
        true
    }

    pub(crate) fn available_to_send(&self) -> usize {
        self.config.max_concurrent.saturating_sub(self.in_flight.len()).min(self.pending.len())
    }

    /// Removes the next key from the queue without marking it in flight.
    pub(crate) fn take_next(&mut self) -> Option<K> {
        if self.available_to_send() == 0 {
            return None;
        }
        self.pending.pop_front()
    }

    pub(crate) fn mark_sent(&mut self, item: K, peer: PeerId) {
        self.sent += 1;
        self.in_flight.insert(
            item,
            InFlight {
                peer,
                sequence: self.sent,
            },
        );
    }

    /// Handles a response. Returns true if the key was in flight.
    ///
    /// Retry counts survive until the key is [`remove`](Self::remove)d.
    pub(crate) fn receive(&mut self, key: &K) -> bool {
        if self.in_flight.remove(key).is_some() {
            if self.is_empty() {
                self.max_amount = 0;
            }
            true
        } else {
            false
        }
    }

    pub(crate) fn is_in_flight(&self, key: &K) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Moves every key in flight toward `peer` back to the front of the queue in the
    /// order they were sent, without counting it as a retry. Returns the moved keys.
    pub(crate) fn requeue_peer(&mut self, peer: PeerId) -> Vec<K> {
        let mut moved: Vec<(K, u64)> = self
            .in_flight
            .iter()
            .filter(|(_, in_flight)| in_flight.peer == peer)
            .map(|(key, in_flight)| (key.clone(), in_flight.sequence))
            .collect();
        moved.sort_by_key(|(_, sequence)| *sequence);
        let moved: Vec<K> = moved.into_iter().map(|(key, _)| key).collect();
        for key in &moved {
            self.in_flight.remove(key);
        }
        self.enqueue_front(moved.clone());
        moved
    }

    /// Counts `count` requests the caller saw time out.
    pub(crate) fn record_timeouts(&mut self, count: usize) {
        if count > 0 {
            tracing::debug!("{} requests timed out after {:?}", count, self.config.timeout);
            self.timed_out_attempts = self.timed_out_attempts.saturating_add(count as u32);
        }
    }

    /// Forgets a key wherever it is tracked.
    pub(crate) fn remove(&mut self, key: &K) {
        self.pending.retain(|queued| queued != key);
        self.in_flight.remove(key);
        self.retry_counts.remove(key);
        if self.is_empty() {
            self.max_amount = 0;
        }
    }

    fn update_max_amount(&mut self) {
        self.max_amount = self.max_amount.max(self.remaining());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }

    pub(crate) fn pending(&self) -> impl Iterator<Item = &K> {
        self.pending.iter()
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.in_flight.len()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.pending.len() + self.in_flight.len()
    }

    pub(crate) fn max_amount(&self) -> usize {
        self.max_amount
    }

    pub(crate) fn timed_out_attempts(&self) -> u32 {
        self.timed_out_attempts
    }
}
