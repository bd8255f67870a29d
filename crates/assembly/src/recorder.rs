//! Assignment recorder.
//!
//! Writes one idempotent `(fragment, diagram)` membership per fragment.
//! Recording the same pair again overwrites node, confidence and reason
//! instead of adding a row.

use chrono::{DateTime, Utc};
use tracing::debug;

use arbor_core::assignment::Assignment;
use arbor_core::error::StoreError;
use arbor_core::event::AssemblyEvent;
use arbor_core::fragment::{effective_confidence, Fragment};

use crate::builder::node_id;
use crate::context::AssemblyContext;

/// The assignment a fragment gets in a diagram.
pub fn assignment_for(
    fragment: &Fragment,
    diagram_id: &str,
    reason: &str,
    default_confidence: f64,
    now: DateTime<Utc>,
) -> Assignment {
    Assignment {
        fragment_id: fragment.id.clone(),
        diagram_id: diagram_id.to_string(),
        node_id: node_id(&fragment.id),
        confidence: effective_confidence(fragment.confidence, default_confidence),
        reason: reason.to_string(),
        assigned_at: now,
    }
}

/// Record every fragment of a group as a member of `diagram_id`.
///
/// Stops at the first store failure; earlier upserts stay committed.
pub async fn record_group(
    ctx: &AssemblyContext,
    diagram_id: &str,
    fragments: &[Fragment],
    reason: &str,
    now: DateTime<Utc>,
) -> std::result::Result<usize, StoreError> {
    for fragment in fragments {
        let assignment = assignment_for(fragment, diagram_id, reason, ctx.settings.default_confidence, now);
        let confidence = assignment.confidence;
        ctx.diagrams.upsert_assignment(assignment).await?;

        debug!(fragment_id = %fragment.id, diagram_id, confidence, "Fragment assigned");
        ctx.publish(AssemblyEvent::FragmentAssigned {
            fragment_id: fragment.id.clone(),
            diagram_id: diagram_id.to_string(),
            confidence,
            timestamp: now,
        });
    }
    Ok(fragments.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fragment;
    use arbor_core::fragment::SemanticType;

    #[test]
    fn missing_confidence_uses_default() {
        let f = fragment("f1", SemanticType::Want, "Ship fast");
        let a = assignment_for(&f, "d1", "evaporating_cloud rule", 0.7, Utc::now());
        assert_eq!(a.confidence, 0.7);
        assert_eq!(a.node_id, "node_f1");
        assert_eq!(a.key(), ("f1", "d1"));
    }

    #[test]
    fn confidence_is_clamped() {
        let mut f = fragment("f1", SemanticType::Want, "Ship fast");
        f.confidence = Some(1.4);
        assert_eq!(assignment_for(&f, "d1", "r", 0.7, Utc::now()).confidence, 1.0);
        f.confidence = Some(-0.2);
        assert_eq!(assignment_for(&f, "d1", "r", 0.7, Utc::now()).confidence, 0.0);
        f.confidence = Some(0.35);
        assert_eq!(assignment_for(&f, "d1", "r", 0.7, Utc::now()).confidence, 0.35);
    }
}
