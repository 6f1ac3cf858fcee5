// ABOUTME: Keyed FIFO correlation of outbound requests with their asynchronous replies
// ABOUTME: Replies that beat their waiter are buffered so no acknowledgement is ever lost

use crate::client::error::{SsmiError, SsmiResult};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Waiters and early replies for a single correlation key
#[derive(Debug)]
pub struct CorrelationEntry<V> {
    waiters: VecDeque<oneshot::Sender<V>>,
    buffered: VecDeque<V>,
}

impl<V> Default for CorrelationEntry<V> {
    fn default() -> Self {
        Self {
            waiters: VecDeque::new(),
            buffered: VecDeque::new(),
        }
    }
}

impl<V> CorrelationEntry<V> {
    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }

    pub fn buffered(&self) -> usize {
        self.buffered.len()
    }

    fn is_idle(&self) -> bool {
        self.waiters.is_empty() && self.buffered.is_empty()
    }
}

/// Correlation map from a business key (msisdn, sequence number) to a FIFO
/// of waiters.
///
/// Each registered waiter consumes exactly one reply, oldest waiter first.
/// A reply arriving before anyone waits is buffered for the next `wait` on
/// that key.
#[derive(Debug)]
pub struct CorrelationMap<V> {
    name: &'static str,
    entries: HashMap<String, CorrelationEntry<V>>,
}

impl<V> CorrelationMap<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
        }
    }

    /// Entry for `key`, created empty if absent
    pub fn get_or_create(&mut self, key: &str) -> &mut CorrelationEntry<V> {
        self.entries.entry(key.to_owned()).or_default()
    }

    pub fn get(&self, key: &str) -> Option<&CorrelationEntry<V>> {
        self.entries.get(key)
    }

    /// Register interest in the next reply for `key`.
    pub fn wait(&mut self, key: &str) -> PendingReply<V> {
        let (sender, receiver) = oneshot::channel();
        let entry = self.get_or_create(key);

        match entry.buffered.pop_front() {
            Some(reply) => {
                // Receiver is alive, this cannot fail
                let _ = sender.send(reply);
            }
            None => entry.waiters.push_back(sender),
        }

        self.prune(key);
        PendingReply::new(key, receiver)
    }

    /// Deliver a reply to the oldest waiter for `key`, or buffer it.
    pub fn resolve(&mut self, key: &str, reply: V) {
        let name = self.name;
        let entry = self.get_or_create(key);

        match entry.waiters.pop_front() {
            Some(waiter) => {
                if waiter.send(reply).is_err() {
                    warn!("{name}: waiter for {key} was abandoned, reply discarded");
                }
            }
            None => {
                debug!("{name}: no waiter for {key}, buffering reply");
                entry.buffered.push_back(reply);
            }
        }

        self.prune(key);
    }

    /// Drop every waiter and buffered reply for `key`.
    ///
    /// Pending handles for the key resolve with `ConnectionClosed`. Returns
    /// how many waiters were removed.
    pub fn remove(&mut self, key: &str) -> usize {
        self.entries
            .remove(key)
            .map(|entry| entry.waiters.len())
            .unwrap_or(0)
    }

    /// Drop everything; used when the connection goes away
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Total registered waiters across all keys
    pub fn waiting(&self) -> usize {
        self.entries.values().map(CorrelationEntry::waiting).sum()
    }

    /// Total buffered replies across all keys
    pub fn buffered(&self) -> usize {
        self.entries.values().map(CorrelationEntry::buffered).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&mut self, key: &str) {
        if self.entries.get(key).is_some_and(CorrelationEntry::is_idle) {
            self.entries.remove(key);
        }
    }
}

/// Handle resolving to the reply correlated with an outbound request.
///
/// Dropping the handle abandons interest; the next matching reply is then
/// consumed silently. Resolves to `ConnectionClosed` if the connection goes
/// away or the key is removed first.
#[derive(Debug)]
pub struct PendingReply<V> {
    key: String,
    receiver: oneshot::Receiver<V>,
}

impl<V> PendingReply<V> {
    pub(crate) fn new(key: &str, receiver: oneshot::Receiver<V>) -> Self {
        Self {
            key: key.to_owned(),
            receiver,
        }
    }

    /// Correlation key this handle waits on
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Non-blocking check; `None` while the reply is outstanding
    pub fn try_take(&mut self) -> Option<SsmiResult<V>> {
        match self.receiver.try_recv() {
            Ok(reply) => Some(Ok(reply)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(SsmiError::ConnectionClosed)),
        }
    }
}

impl<V> Future for PendingReply<V> {
    type Output = SsmiResult<V>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| SsmiError::ConnectionClosed))
    }
}
