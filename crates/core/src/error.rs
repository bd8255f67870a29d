//! Error types for the Arbor domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type.

use thiserror::Error;

// --- Bounded context errors ---

/// Failures of the external fragment or diagram store.
///
/// Every variant aborts the remainder of an assembly run; work committed
/// earlier in the same run is kept.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Payload serialization failed: {0}")]
    Serialization(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// A fragment record that cannot be turned into a [`crate::Fragment`].
///
/// The offending fragment is skipped; the rest of the batch continues.
#[derive(Debug, Clone, Error)]
pub enum FragmentError {
    #[error("Malformed fragment {fragment_id}: {reason}")]
    Malformed { fragment_id: String, reason: String },
}

impl FragmentError {
    pub fn malformed(fragment_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            fragment_id: fragment_id.into(),
            reason: reason.into(),
        }
    }
}
