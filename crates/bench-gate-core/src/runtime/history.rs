// crates/bench-gate-core/src/runtime/history.rs
// ============================================================================
// Module: Bench Gate In-Memory History Store
// Description: Mutex-guarded submission history for tests and single hosts.
// Purpose: Provide a reference store with atomic admission semantics.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The in-memory store keeps accepted submissions and leaderboard standings
//! behind one mutex so the uniqueness checks and the insert in `admit` are a
//! single critical section. Durable deployments use the SQLite store, which
//! enforces the same constraints with unique indexes inside a transaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use crate::core::HistoryRecord;
use crate::core::LeaderboardEntry;
use crate::interfaces::AdmitOutcome;
use crate::interfaces::HistoryStoreError;
use crate::interfaces::SubmissionHistoryStore;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Guarded store contents.
#[derive(Debug, Default)]
struct StoreInner {
    /// Accepted submissions in admission order.
    records: Vec<HistoryRecord>,
    /// Current leaderboard standings, best first.
    leaderboard: Vec<LeaderboardEntry>,
}

/// Mutex-guarded in-memory submission history store.
///
/// # Invariants
/// - All reads and writes take the same lock; `admit` is atomic with respect
///   to concurrent admissions.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    /// Store contents behind one lock.
    inner: Mutex<StoreInner>,
}

impl InMemoryHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with history and leaderboard state.
    #[must_use]
    pub fn with_state(records: Vec<HistoryRecord>, leaderboard: Vec<LeaderboardEntry>) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                records,
                leaderboard,
            }),
        }
    }

    /// Replaces the leaderboard standings.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryStoreError::Store`] when the lock is poisoned.
    pub fn set_leaderboard(
        &self,
        leaderboard: Vec<LeaderboardEntry>,
    ) -> Result<(), HistoryStoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| HistoryStoreError::Store("history lock poisoned".to_owned()))?;
        inner.leaderboard = leaderboard;
        Ok(())
    }
}

impl SubmissionHistoryStore for InMemoryHistoryStore {
    fn snapshot(&self) -> Result<Vec<HistoryRecord>, HistoryStoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| HistoryStoreError::Store("history lock poisoned".to_owned()))?;
        Ok(inner.records.clone())
    }

    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, HistoryStoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| HistoryStoreError::Store("history lock poisoned".to_owned()))?;
        Ok(inner.leaderboard.clone())
    }

    fn admit(&self, record: &HistoryRecord) -> Result<AdmitOutcome, HistoryStoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| HistoryStoreError::Store("history lock poisoned".to_owned()))?;
        if inner.records.iter().any(|prior| prior.manifest_hash == record.manifest_hash) {
            return Ok(AdmitOutcome::DuplicateManifest);
        }
        if inner.records.iter().any(|prior| prior.run_id == record.run_id) {
            return Ok(AdmitOutcome::DuplicateRunId);
        }
        inner.records.push(record.clone());
        Ok(AdmitOutcome::Admitted)
    }
}
