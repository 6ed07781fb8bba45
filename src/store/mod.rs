// Match persistence components
//
// Every accepted delivery is appended here on a worker queue, off the
// scoring path. Undone balls are voided in place rather than deleted, so
// the stored log doubles as an audit trail.

// Public API - what other modules can use
pub use models::{BallRow, InningsSnapshotRow};
pub use repository::{InMemoryMatchStore, MatchStore, PostgresMatchStore};

// Internal modules
mod models;
mod repository;
