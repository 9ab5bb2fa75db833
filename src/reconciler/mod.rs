//! Incident Reconciler - the authoritative in-memory incident store
//!
//! Merges the one-shot snapshot, push-channel bootstraps, polled batches
//! and single live incidents into one collection:
//!
//! - newest-first by timestamp, arrival order on ties
//! - unique by id, first occurrence wins
//! - batches are union-merged, never blind replaces
//! - live incidents are highlighted for a fixed dwell time
//!
//! The reconciler is owned and mutated by a single task. Highlight timers
//! report back through the receiver returned by [`IncidentReconciler::new`]
//! and are applied with [`IncidentReconciler::expire`].
//!
//! Highlight timers are Tokio tasks, so [`IncidentReconciler::apply_incident`]
//! must run inside a Tokio runtime. The batch operations and
//! [`IncidentReconciler::current_state`] have no such requirement.

mod collection;
mod highlight;

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::types::{Incident, IncidentView};

pub use collection::IncidentCollection;
pub use highlight::{HighlightExpired, HighlightSet};

/// Owner of the incident collection and the highlight set
#[derive(Debug)]
pub struct IncidentReconciler {
    collection: IncidentCollection,
    highlights: HighlightSet,
    snapshot_applied: bool,
}

impl IncidentReconciler {
    /// Empty reconciler and the channel its highlight timers report to.
    ///
    /// Construction needs no runtime; highlighting does, see
    /// [`apply_incident`](Self::apply_incident).
    pub fn new(dwell: Duration) -> (Self, mpsc::UnboundedReceiver<HighlightExpired>) {
        let (highlights, expired_rx) = HighlightSet::new(dwell);
        let reconciler = Self {
            collection: IncidentCollection::new(),
            highlights,
            snapshot_applied: false,
        };
        (reconciler, expired_rx)
    }

    /// Install the one-shot snapshot. Union-merges with anything the live
    /// channel already delivered. Only the first call has an effect.
    /// Returns the number of incidents added.
    pub fn apply_snapshot(&mut self, incidents: Vec<Incident>) -> usize {
        if self.snapshot_applied {
            warn!("snapshot already applied, ignoring repeated snapshot");
            return 0;
        }
        self.snapshot_applied = true;

        let received = incidents.len();
        let added = self.collection.merge(incidents);
        info!(received, added, total = self.collection.len(), "snapshot applied");
        added
    }

    /// Union-merge a push-channel bootstrap batch. May happen any number
    /// of times.
    pub fn apply_bootstrap(&mut self, incidents: Vec<Incident>) -> usize {
        let received = incidents.len();
        let added = self.collection.merge(incidents);
        info!(received, added, total = self.collection.len(), "bootstrap merged");
        added
    }

    /// Union-merge a batch from the status poller
    pub fn apply_poll(&mut self, incidents: Vec<Incident>) -> usize {
        let added = self.collection.merge(incidents);
        if added > 0 {
            debug!(added, total = self.collection.len(), "poll merged new incidents");
        }
        added
    }

    /// Add one live incident and highlight it.
    ///
    /// A replayed id leaves the collection untouched; if that id is still
    /// highlighted its dwell window restarts. Returns `true` if the
    /// incident was new.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, since the highlight
    /// timer is spawned on the current runtime.
    pub fn apply_incident(&mut self, incident: Incident) -> bool {
        let id = incident.id.clone();

        if !self.collection.insert(incident) {
            if self.highlights.contains(&id) {
                self.highlights.mark(&id);
            }
            debug!(id = %id, "duplicate incident delivery ignored");
            return false;
        }

        self.highlights.mark(&id);
        debug!(id = %id, total = self.collection.len(), "incident added");
        true
    }

    /// Apply a fired highlight timer. Returns `true` if the set changed.
    pub fn expire(&mut self, expired: &HighlightExpired) -> bool {
        self.highlights.expire(expired)
    }

    /// Point-in-time copy for presentation
    pub fn current_state(&self) -> IncidentView {
        IncidentView {
            incidents: self.collection.as_slice().to_vec(),
            highlighted: self.highlights.ids(),
        }
    }

    pub fn collection(&self) -> &IncidentCollection {
        &self.collection
    }

    pub fn highlights(&self) -> &HighlightSet {
        &self.highlights
    }

    pub fn snapshot_applied(&self) -> bool {
        self.snapshot_applied
    }

    /// Abort all pending highlight timers (session teardown)
    pub fn cancel_highlights(&mut self) {
        self.highlights.cancel_all();
    }
}
