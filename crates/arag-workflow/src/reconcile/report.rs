//! Outcome of a reconciliation pass.

use jiff::Timestamp;
use serde::Serialize;

/// Counters describing what one pass did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Roots created on the store.
    pub added: usize,
    /// Roots replaced on the store.
    pub updated: usize,
    /// Agents removed from the store.
    pub deleted: usize,
    /// Saves or deletions that failed and stay queued.
    pub failed: usize,
    /// Work skipped because an earlier pass is still submitting it.
    pub skipped_in_flight: usize,
    /// When the pass started.
    pub started_at: Timestamp,
    /// When the pass finished.
    pub finished_at: Timestamp,
}

impl ReconcileReport {
    pub(crate) fn start() -> Self {
        let now = Timestamp::now();
        Self {
            added: 0,
            updated: 0,
            deleted: 0,
            failed: 0,
            skipped_in_flight: 0,
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Timestamp::now();
        self
    }

    /// Returns `true` if the pass submitted nothing.
    pub fn is_idle(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.deleted == 0 && self.failed == 0
    }
}
