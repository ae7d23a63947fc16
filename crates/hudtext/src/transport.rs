//! Delivery of compiled text to a recipient's display.

use std::fmt::Display;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// Sends compiled text to one recipient.
///
/// Called from a scheduler's worker thread, at most once per minimum
/// interval per recipient.
pub trait Transport<K>: Send + Sync {
    fn send(&self, recipient: &K, text: &str);
}

/// Writes every delivery to stdout as `[recipient] text`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutTransport;

impl<K: Display> Transport<K> for StdoutTransport {
    fn send(&self, recipient: &K, text: &str) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        if let Err(e) = writeln!(out, "[{recipient}] {text}") {
            log::warn!("failed to write delivery for {recipient}: {e}");
        }
    }
}

/// Keeps every delivery in memory, in order.
///
/// Clones share the same log, so one clone can be handed to a
/// [`Coordinator`](crate::Coordinator) and another inspected afterwards.
#[derive(Debug)]
pub struct MemoryTransport<K> {
    sent: Arc<Mutex<Vec<(K, String)>>>,
}

impl<K> MemoryTransport<K> {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of deliveries so far.
    pub fn len(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Clone> MemoryTransport<K> {
    /// A copy of every delivery so far.
    pub fn sent(&self) -> Vec<(K, String)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<K> Default for MemoryTransport<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for MemoryTransport<K> {
    fn clone(&self) -> Self {
        Self {
            sent: Arc::clone(&self.sent),
        }
    }
}

impl<K: Clone + Send> Transport<K> for MemoryTransport<K> {
    fn send(&self, recipient: &K, text: &str) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((recipient.clone(), text.to_string()));
    }
}
