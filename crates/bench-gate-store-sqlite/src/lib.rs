// crates/bench-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Bench Gate SQLite Store
// Description: Durable submission history backed by SQLite.
// Purpose: Persist accepted submissions and leaderboard standings.
// Dependencies: bench-gate-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! `SQLite`-backed implementation of the submission history store. Admission
//! is a single immediate transaction so a replayed manifest or reused run id
//! can never race a concurrent duplicate into history.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod store;

pub use store::SqliteHistoryConfig;
pub use store::SqliteHistoryError;
pub use store::SqliteHistoryStore;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
