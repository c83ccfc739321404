//! Tracks which requested identifiers an inventory query has answered.
//!
//! The set is seeded from the request, records are matched against it, and
//! whatever is left at the end becomes a placeholder asset, so every
//! requested identifier produces exactly one output.

use std::collections::HashSet;

/// Requested identifiers (serials or IPs) not yet matched by a record.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationSet {
    /// Request order, deduplicated
    requested: Vec<String>,
    pending: HashSet<String>,
}

impl ReconciliationSet {
    /// Seed the set from requested identifiers. Duplicates count once.
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for id in identifiers {
            let id = id.into();
            if set.pending.insert(id.clone()) {
                set.requested.push(id);
            }
        }
        set
    }

    /// Mark an identifier as answered. Returns `false` if it was not pending.
    pub fn mark_found(&mut self, identifier: &str) -> bool {
        self.pending.remove(identifier)
    }

    /// Whether an identifier is still waiting for a record.
    pub fn is_pending(&self, identifier: &str) -> bool {
        self.pending.contains(identifier)
    }

    /// Number of distinct identifiers requested.
    pub fn requested_len(&self) -> usize {
        self.requested.len()
    }

    /// Requested identifiers in request order.
    pub fn requested(&self) -> &[String] {
        &self.requested
    }

    /// Consume the set, yielding unmatched identifiers in request order.
    pub fn into_missing(self) -> Vec<String> {
        let Self {
            requested,
            mut pending,
        } = self;
        requested
            .into_iter()
            .filter(|id| pending.remove(id))
            .collect()
    }
}
