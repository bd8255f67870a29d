//! In-memory store: useful for testing and ephemeral runs.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use arbor_core::assignment::{Assignment, Relationship};
use arbor_core::diagram::{DiagramPayload, DiagramRecord, DiagramSummary, DiagramType, NewDiagram};
use arbor_core::error::StoreError;
use arbor_core::fragment::{FragmentRecord, PartialFragment};
use arbor_core::store::{DiagramStore, FragmentStore, Scope, Window};

#[derive(Default)]
struct State {
    fragments: Vec<FragmentRecord>,
    diagrams: Vec<DiagramRecord>,
    assignments: Vec<Assignment>,
    relationships: Vec<Relationship>,
}

impl State {
    fn diagram_type_of(&self, diagram_id: &str) -> Option<DiagramType> {
        self.diagrams
            .iter()
            .find(|d| d.id == diagram_id)
            .map(|d| d.diagram_type)
    }
}

/// Keeps fragments, diagrams, assignments and relationships in Vecs.
/// Implements both store traits with the same uniqueness rules as SQLite.
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Snapshot of every stored diagram, oldest first.
    pub async fn diagrams(&self) -> Vec<DiagramRecord> {
        self.state.read().await.diagrams.clone()
    }

    /// Snapshot of every stored assignment.
    pub async fn assignments(&self) -> Vec<Assignment> {
        self.state.read().await.assignments.clone()
    }

    /// Snapshot of every stored relationship.
    pub async fn relationships(&self) -> Vec<Relationship> {
        self.state.read().await.relationships.clone()
    }

    /// Mark a diagram closed so it is no longer extended.
    pub async fn close_diagram(&self, diagram_id: &str) -> bool {
        let mut state = self.state.write().await;
        match state.diagrams.iter_mut().find(|d| d.id == diagram_id) {
            Some(d) => {
                d.is_active = false;
                true
            }
            None => false,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first<T>(items: &mut Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>, limit: usize) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items.truncate(limit);
}

#[async_trait]
impl FragmentStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn fetch_unassigned(&self, scope: Scope, window: Window) -> Result<Vec<FragmentRecord>, StoreError> {
        let state = self.state.read().await;
        let mut results: Vec<FragmentRecord> = state
            .fragments
            .iter()
            .filter(|f| f.client_id == scope.client_id && window.contains(f.created_at))
            .filter(|f| !state.assignments.iter().any(|a| a.fragment_id == f.id))
            .cloned()
            .collect();
        newest_first(&mut results, |f| f.created_at, window.limit);
        Ok(results)
    }

    async fn fetch_partially_assigned(
        &self,
        scope: Scope,
        window: Window,
        threshold: f64,
    ) -> Result<Vec<PartialFragment>, StoreError> {
        let state = self.state.read().await;
        let mut results: Vec<PartialFragment> = state
            .fragments
            .iter()
            .filter(|f| f.client_id == scope.client_id && window.contains(f.created_at))
            .filter_map(|f| {
                let held: Vec<&Assignment> = state
                    .assignments
                    .iter()
                    .filter(|a| a.fragment_id == f.id)
                    .collect();
                if !held.iter().any(|a| a.confidence < threshold) {
                    return None;
                }
                let assigned_types: BTreeSet<DiagramType> = held
                    .iter()
                    .filter_map(|a| state.diagram_type_of(&a.diagram_id))
                    .collect();
                Some(PartialFragment {
                    record: f.clone(),
                    assigned_types: assigned_types.into_iter().collect(),
                })
            })
            .collect();
        newest_first(&mut results, |p| p.record.created_at, window.limit);
        Ok(results)
    }

    async fn insert_fragment(&self, mut record: FragmentRecord) -> Result<String, StoreError> {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let id = record.id.clone();
        let mut state = self.state.write().await;
        match state.fragments.iter_mut().find(|f| f.id == id) {
            Some(existing) => *existing = record,
            None => state.fragments.push(record),
        }
        Ok(id)
    }
}

#[async_trait]
impl DiagramStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn create_diagram(&self, diagram: NewDiagram) -> Result<String, StoreError> {
        let mut state = self.state.write().await;
        let id = diagram.id().to_string();
        if state.diagrams.iter().any(|d| d.id == id) {
            return Err(StoreError::QueryFailed(format!("diagram {id} already exists")));
        }
        state.diagrams.push(DiagramRecord {
            id: id.clone(),
            diagram_type: diagram.diagram_type(),
            title: diagram.payload.title.clone(),
            client_id: diagram.client_id,
            session_id: diagram.session_id,
            is_active: true,
            created_at: diagram.created_at,
            payload: diagram.payload,
        });
        Ok(id)
    }

    async fn update_diagram_payload(&self, diagram_id: &str, payload: &DiagramPayload) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let record = state
            .diagrams
            .iter_mut()
            .find(|d| d.id == diagram_id)
            .ok_or_else(|| StoreError::NotFound(format!("diagram {diagram_id}")))?;
        if record.diagram_type != payload.diagram_type {
            return Err(StoreError::QueryFailed(format!(
                "diagram {diagram_id} is a {}, refusing to store a {} payload",
                record.diagram_type, payload.diagram_type
            )));
        }
        record.title = payload.title.clone();
        record.payload = payload.clone();
        Ok(())
    }

    async fn get_diagram(&self, diagram_id: &str) -> Result<Option<DiagramRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.diagrams.iter().find(|d| d.id == diagram_id).cloned())
    }

    async fn find_open_diagram(
        &self,
        scope: Scope,
        session_id: &str,
        diagram_type: DiagramType,
        since: DateTime<Utc>,
    ) -> Result<Option<DiagramRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .diagrams
            .iter()
            .filter(|d| {
                d.client_id == scope.client_id
                    && d.session_id == session_id
                    && d.diagram_type == diagram_type
                    && d.is_active
                    && d.created_at > since
            })
            .max_by_key(|d| d.created_at)
            .cloned())
    }

    async fn fetch_recent_diagrams(&self, scope: Scope, window: Window) -> Result<Vec<DiagramSummary>, StoreError> {
        let state = self.state.read().await;
        let mut results: Vec<DiagramSummary> = state
            .diagrams
            .iter()
            .filter(|d| d.client_id == scope.client_id && window.contains(d.created_at))
            .map(DiagramSummary::from)
            .collect();
        newest_first(&mut results, |d| d.created_at, window.limit);
        Ok(results)
    }

    async fn upsert_assignment(&self, assignment: Assignment) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        match state
            .assignments
            .iter_mut()
            .find(|a| a.key() == assignment.key())
        {
            Some(existing) => *existing = assignment,
            None => state.assignments.push(assignment),
        }
        Ok(())
    }

    async fn assignments_for_fragment(&self, fragment_id: &str) -> Result<Vec<Assignment>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.fragment_id == fragment_id)
            .cloned()
            .collect())
    }

    async fn create_relationship(&self, relationship: Relationship) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.relationships.contains(&relationship) {
            return Ok(false);
        }
        state.relationships.push(relationship);
        Ok(true)
    }

    async fn relationships_for(&self, diagram_id: &str) -> Result<Vec<Relationship>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .relationships
            .iter()
            .filter(|r| r.from_diagram_id == diagram_id || r.to_diagram_id == diagram_id)
            .cloned()
            .collect())
    }
}
