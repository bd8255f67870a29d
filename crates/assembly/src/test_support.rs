//! Shared fixtures for unit tests.

use chrono::Utc;

use arbor_core::fragment::{Fragment, SemanticType};

/// A valid fragment with no explicit confidence.
pub fn fragment(id: &str, semantic_type: SemanticType, label: &str) -> Fragment {
    Fragment {
        id: id.into(),
        semantic_type,
        label: label.into(),
        description: String::new(),
        confidence: None,
        created_at: Utc::now(),
        client_id: 6,
        session_id: Some("session-1".into()),
    }
}
