//! Assembly events: decoupled notification of what a run changed.
//!
//! The orchestrator publishes an event whenever it creates or extends a
//! diagram, records an assignment or relationship, skips a fragment, or
//! aborts. Subscribers (telemetry, UI refreshers) react without coupling to
//! the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::diagram::DiagramType;

/// All events emitted by an assembly run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssemblyEvent {
    DiagramCreated {
        session_id: String,
        diagram_id: String,
        diagram_type: DiagramType,
        node_count: usize,
        timestamp: DateTime<Utc>,
    },

    DiagramExtended {
        diagram_id: String,
        added_nodes: usize,
        timestamp: DateTime<Utc>,
    },

    FragmentAssigned {
        fragment_id: String,
        diagram_id: String,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },

    RelationshipRecorded {
        from_diagram_id: String,
        to_diagram_id: String,
        relationship_type: String,
        timestamp: DateTime<Utc>,
    },

    FragmentSkipped {
        fragment_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    RunFailed {
        session_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for assembly events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<AssemblyEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: AssemblyEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AssemblyEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
