//! Transient "new" highlight set with per-id expiry timers

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::trace;

/// Fired when a highlight's dwell time elapsed. Sent back to the owner of
/// the set, which applies it with [`HighlightSet::expire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightExpired {
    pub id: String,
    generation: u64,
}

struct Entry {
    generation: u64,
    timer: AbortHandle,
}

/// Ids flagged "new", each with one pending removal timer.
///
/// Re-marking an id cancels its timer and starts a fresh dwell window;
/// generations make a timer that fired before cancellation harmless.
/// Dropping the set aborts every pending timer.
pub struct HighlightSet {
    dwell: Duration,
    entries: HashMap<String, Entry>,
    next_generation: u64,
    expired_tx: mpsc::UnboundedSender<HighlightExpired>,
}

impl HighlightSet {
    /// New empty set and the receiver its timers report to
    pub fn new(dwell: Duration) -> (Self, mpsc::UnboundedReceiver<HighlightExpired>) {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        let set = Self {
            dwell,
            entries: HashMap::new(),
            next_generation: 0,
            expired_tx,
        };
        (set, expired_rx)
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> HashSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Highlight `id` for one dwell window. Returns `true` if the id was
    /// not highlighted before.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn mark(&mut self, id: &str) -> bool {
        self.next_generation += 1;
        let generation = self.next_generation;

        let expired = HighlightExpired {
            id: id.to_string(),
            generation,
        };
        let tx = self.expired_tx.clone();
        let deadline = Instant::now() + self.dwell;
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(expired);
        })
        .abort_handle();

        match self.entries.insert(id.to_string(), Entry { generation, timer }) {
            Some(previous) => {
                previous.timer.abort();
                false
            }
            None => true,
        }
    }

    /// Apply a fired timer. Stale generations are ignored.
    /// Returns `true` if the id was removed.
    pub fn expire(&mut self, expired: &HighlightExpired) -> bool {
        let current = matches!(
            self.entries.get(&expired.id),
            Some(entry) if entry.generation == expired.generation
        );
        if current {
            self.entries.remove(&expired.id);
            trace!(id = %expired.id, "highlight expired");
        }
        current
    }

    /// Abort every pending timer and clear the set
    pub fn cancel_all(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.timer.abort();
        }
    }
}

impl Drop for HighlightSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl std::fmt::Debug for HighlightSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightSet")
            .field("dwell", &self.dwell)
            .field("ids", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
