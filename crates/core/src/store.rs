//! Store traits: the engine's only view of persistence.
//!
//! The assembly engine reads fragments through [`FragmentStore`] and writes
//! diagrams, assignments, and relationships through [`DiagramStore`].
//! Idempotent upserts in the store are the engine's sole coordination
//! primitive; implementations must honour the uniqueness keys documented on
//! each method.
//!
//! Implementations: SQLite, in-memory (for testing).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::assignment::{Assignment, Relationship};
use crate::diagram::{DiagramPayload, DiagramRecord, DiagramSummary, DiagramType, NewDiagram};
use crate::error::StoreError;
use crate::fragment::{FragmentRecord, PartialFragment};

/// Which client's data a query operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub client_id: i64,
}

impl Scope {
    pub fn client(client_id: i64) -> Self {
        Self { client_id }
    }
}

/// A recency window: rows created after `since`, newest first, at most `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub since: DateTime<Utc>,
    pub limit: usize,
}

impl Window {
    /// The window covering `span` back from `now`. A span reaching past the
    /// earliest representable instant covers everything.
    pub fn trailing(now: DateTime<Utc>, span: Duration, limit: usize) -> Self {
        Self {
            since: now.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC),
            limit,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at > self.since
    }
}

/// Upstream fragment store (consumed).
#[async_trait]
pub trait FragmentStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Fragments in `scope` created inside `window` that have no assignment at all.
    async fn fetch_unassigned(
        &self,
        scope: Scope,
        window: Window,
    ) -> std::result::Result<Vec<FragmentRecord>, StoreError>;

    /// Fragments in `scope` created inside `window` with at least one
    /// assignment whose confidence is below `threshold`, together with every
    /// diagram type they are already assigned to.
    async fn fetch_partially_assigned(
        &self,
        scope: Scope,
        window: Window,
        threshold: f64,
    ) -> std::result::Result<Vec<PartialFragment>, StoreError>;

    /// Insert or replace a fragment (used by the extractor and importers).
    async fn insert_fragment(&self, record: FragmentRecord) -> std::result::Result<String, StoreError>;
}

/// Downstream diagram store (produced).
#[async_trait]
pub trait DiagramStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Persist a new, active diagram and return its id.
    async fn create_diagram(&self, diagram: NewDiagram) -> std::result::Result<String, StoreError>;

    /// Replace the payload of an existing diagram. Its type never changes.
    async fn update_diagram_payload(
        &self,
        diagram_id: &str,
        payload: &DiagramPayload,
    ) -> std::result::Result<(), StoreError>;

    async fn get_diagram(&self, diagram_id: &str) -> std::result::Result<Option<DiagramRecord>, StoreError>;

    /// Newest active diagram of `diagram_type` for this scope and session
    /// created after `since`.
    async fn find_open_diagram(
        &self,
        scope: Scope,
        session_id: &str,
        diagram_type: DiagramType,
        since: DateTime<Utc>,
    ) -> std::result::Result<Option<DiagramRecord>, StoreError>;

    /// Diagrams in `scope` created inside `window`, newest first.
    async fn fetch_recent_diagrams(
        &self,
        scope: Scope,
        window: Window,
    ) -> std::result::Result<Vec<DiagramSummary>, StoreError>;

    /// Insert or update keyed by `(fragment_id, diagram_id)`.
    async fn upsert_assignment(&self, assignment: Assignment) -> std::result::Result<(), StoreError>;

    /// Every assignment held by a fragment.
    async fn assignments_for_fragment(
        &self,
        fragment_id: &str,
    ) -> std::result::Result<Vec<Assignment>, StoreError>;

    /// Insert unless `(from, to, type)` already exists. Returns `true` when
    /// a new row was written.
    async fn create_relationship(&self, relationship: Relationship) -> std::result::Result<bool, StoreError>;

    /// Relationships touching a diagram, in either direction.
    async fn relationships_for(
        &self,
        diagram_id: &str,
    ) -> std::result::Result<Vec<Relationship>, StoreError>;
}
