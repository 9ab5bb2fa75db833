//! Ordered, deduplicated incident collection

use std::collections::HashSet;

use crate::types::Incident;

/// Incidents newest-first by timestamp, unique by id.
///
/// Equal timestamps keep arrival order.
#[derive(Debug, Clone, Default)]
pub struct IncidentCollection {
    items: Vec<Incident>,
    ids: HashSet<String>,
}

impl IncidentCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&Incident> {
        if !self.contains(id) {
            return None;
        }
        self.items.iter().find(|i| i.id == id)
    }

    pub fn as_slice(&self) -> &[Incident] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Incident> {
        self.items.iter()
    }

    /// Union-merge a batch by id.
    ///
    /// Already stored incidents win over duplicates, and within the batch
    /// the first occurrence wins. Returns how many incidents were added.
    pub fn merge(&mut self, batch: Vec<Incident>) -> usize {
        let before = self.items.len();

        for incident in batch {
            if self.ids.insert(incident.id.clone()) {
                self.items.push(incident);
            }
        }

        let added = self.items.len() - before;
        if added > 0 {
            // Stored items precede the new ones, so a stable sort keeps
            // arrival order among equal timestamps
            self.items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        }
        added
    }

    /// Insert one incident at its ordered position, normally the front.
    /// Returns `false` if the id is already present.
    pub fn insert(&mut self, incident: Incident) -> bool {
        if self.contains(&incident.id) {
            return false;
        }

        let pos = self
            .items
            .partition_point(|existing| existing.timestamp >= incident.timestamp);
        self.ids.insert(incident.id.clone());
        self.items.insert(pos, incident);
        true
    }
}
