//! Relationship detector.
//!
//! Pairs recent diagrams by type only. Every current reality tree is linked
//! to every future reality tree with `evolved_from`; the heuristic never
//! looks at what the diagrams are about.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use arbor_core::assignment::{Relationship, RelationshipType};
use arbor_core::diagram::{DiagramSummary, DiagramType};
use arbor_core::error::StoreError;
use arbor_core::event::AssemblyEvent;

use crate::context::AssemblyContext;
use crate::report::AssemblyReport;

/// Diagrams of type `from` relate to diagrams of type `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipRule {
    pub from: DiagramType,
    pub to: DiagramType,
    pub relationship_type: RelationshipType,
}

pub const RELATIONSHIP_RULES: &[RelationshipRule] = &[RelationshipRule {
    from: DiagramType::CurrentRealityTree,
    to: DiagramType::FutureRealityTree,
    relationship_type: RelationshipType::EvolvedFrom,
}];

/// Every relationship the rules imply over `diagrams`. Pure.
pub fn candidate_relationships(diagrams: &[DiagramSummary]) -> Vec<Relationship> {
    let mut out = Vec::new();
    for rule in RELATIONSHIP_RULES {
        for from in diagrams.iter().filter(|d| d.diagram_type == rule.from) {
            for to in diagrams.iter().filter(|d| d.diagram_type == rule.to) {
                if from.id == to.id {
                    continue;
                }
                out.push(Relationship {
                    from_diagram_id: from.id.clone(),
                    to_diagram_id: to.id.clone(),
                    relationship_type: rule.relationship_type,
                });
            }
        }
    }
    out
}

/// Insert any missing relationships among the recent diagrams.
pub async fn detect(
    ctx: &AssemblyContext,
    now: DateTime<Utc>,
    report: &mut AssemblyReport,
) -> std::result::Result<(), StoreError> {
    let recent = ctx.diagrams.fetch_recent_diagrams(ctx.scope, ctx.diagram_window(now)).await?;
    let candidates = candidate_relationships(&recent);
    debug!(diagrams = recent.len(), candidates = candidates.len(), "Relationship detection");

    for relationship in candidates {
        if !ctx.diagrams.create_relationship(relationship.clone()).await? {
            continue;
        }
        report.relationships_created += 1;
        report.log(format!(
            "Linked {} -[{}]-> {}",
            relationship.from_diagram_id, relationship.relationship_type, relationship.to_diagram_id
        ));
        info!(
            from = %relationship.from_diagram_id,
            to = %relationship.to_diagram_id,
            "Relationship recorded"
        );
        ctx.publish(AssemblyEvent::RelationshipRecorded {
            from_diagram_id: relationship.from_diagram_id,
            to_diagram_id: relationship.to_diagram_id,
            relationship_type: relationship.relationship_type.to_string(),
            timestamp: now,
        });
    }
    Ok(())
}
