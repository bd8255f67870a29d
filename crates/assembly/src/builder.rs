//! Tree builder: turns a resolved bucket into a persisted diagram.
//!
//! Nodes are laid out on a fixed grid in fragment order, so the same input
//! always yields the same layout. Extension appends at the next free grid
//! slot and never moves existing nodes.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use arbor_core::diagram::{DiagramPayload, DiagramRecord, DiagramType, NewDiagram, Node};
use arbor_core::error::StoreError;
use arbor_core::event::AssemblyEvent;
use arbor_core::fragment::{Fragment, SemanticType};

use crate::context::AssemblyContext;
use crate::links::LinkRegistry;

const GRID_COLUMNS: usize = 3;
const GRID_ORIGIN: (f64, f64) = (150.0, 100.0);
const GRID_SPACING: (f64, f64) = (250.0, 150.0);

/// Node id for a fragment. Stable, so a fragment appears at most once per diagram.
pub fn node_id(fragment_id: &str) -> String {
    format!("node_{fragment_id}")
}

/// Grid position of the `index`-th node.
pub fn grid_position(index: usize) -> (f64, f64) {
    let col = (index % GRID_COLUMNS) as f64;
    let row = (index / GRID_COLUMNS) as f64;
    (GRID_ORIGIN.0 + col * GRID_SPACING.0, GRID_ORIGIN.1 + row * GRID_SPACING.1)
}

/// Semantic types whose label may title a diagram, most preferred first.
pub fn title_sources(diagram_type: DiagramType) -> &'static [SemanticType] {
    use SemanticType::*;

    match diagram_type {
        DiagramType::EvaporatingCloud => &[Conflict],
        DiagramType::PrerequisiteTree => &[Objective, Obstacle],
        DiagramType::CurrentRealityTree => &[UndesirableEffect, RootCause],
        DiagramType::FutureRealityTree => &[DesiredEffect, Solution, Injection],
    }
}

/// Title from the representative fragment, else `"{type} – {date}"`.
pub fn title_for(diagram_type: DiagramType, fragments: &[Fragment], now: DateTime<Utc>) -> String {
    let representative = title_sources(diagram_type)
        .iter()
        .find_map(|t| fragments.iter().find(|f| f.semantic_type == *t));

    match representative {
        Some(fragment) => format!("{}: {}", diagram_type.display_name(), fragment.label.trim()),
        None => format!("{} – {}", diagram_type.display_name(), now.format("%Y-%m-%d")),
    }
}

/// Nodes sorted row by row, left to right.
pub fn grid_ordered(payload: &DiagramPayload) -> Vec<&Node> {
    let mut nodes = payload.node_list();
    nodes.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
    nodes
}

fn make_node(fragment: &Fragment, index: usize) -> Node {
    let (x, y) = grid_position(index);
    Node {
        id: node_id(&fragment.id),
        label: fragment.label.clone(),
        semantic_type: fragment.semantic_type,
        x,
        y,
    }
}

/// Build the payload for a new diagram. Pure; nothing is persisted.
pub fn build_payload(
    diagram_id: &str,
    diagram_type: DiagramType,
    fragments: &[Fragment],
    links: &LinkRegistry,
    now: DateTime<Utc>,
) -> DiagramPayload {
    let mut payload = DiagramPayload {
        diagram_id: diagram_id.to_string(),
        diagram_type,
        title: title_for(diagram_type, fragments, now),
        nodes: Default::default(),
        links: Vec::new(),
    };
    extend_payload(&mut payload, fragments, links);
    payload
}

/// Append nodes for fragments not yet present and union in newly inferred
/// links. Returns the number of nodes added.
pub fn extend_payload(payload: &mut DiagramPayload, fragments: &[Fragment], links: &LinkRegistry) -> usize {
    let mut added = 0;
    for fragment in fragments {
        let id = node_id(&fragment.id);
        if payload.nodes.contains_key(&id) {
            continue;
        }
        let node = make_node(fragment, payload.nodes.len());
        payload.nodes.insert(id, node);
        added += 1;
    }

    let inferred = links.infer(payload.diagram_type, &grid_ordered(payload));
    for link in inferred {
        if !payload.has_link(&link) {
            payload.links.push(link);
        }
    }
    added
}

/// Allocate an id, lay out the diagram, and persist it once.
pub async fn build_diagram(
    ctx: &AssemblyContext,
    session_id: &str,
    diagram_type: DiagramType,
    fragments: &[Fragment],
    now: DateTime<Utc>,
) -> std::result::Result<DiagramPayload, StoreError> {
    let diagram_id = Uuid::new_v4().to_string();
    let payload = build_payload(&diagram_id, diagram_type, fragments, &ctx.links, now);
    let node_count = payload.nodes.len();

    ctx.diagrams
        .create_diagram(NewDiagram {
            client_id: ctx.scope.client_id,
            session_id: session_id.to_string(),
            payload: payload.clone(),
            created_at: now,
        })
        .await?;

    debug!(
        session_id,
        diagram_id = %diagram_id,
        diagram_type = %diagram_type,
        nodes = node_count,
        links = payload.links.len(),
        "Diagram created"
    );
    ctx.publish(AssemblyEvent::DiagramCreated {
        session_id: session_id.to_string(),
        diagram_id,
        diagram_type,
        node_count,
        timestamp: now,
    });
    Ok(payload)
}

/// Add fragments to an open diagram and persist the grown payload.
///
/// Returns the updated payload and how many nodes were added. Nothing is
/// written when every fragment is already present.
pub async fn extend_diagram(
    ctx: &AssemblyContext,
    record: DiagramRecord,
    fragments: &[Fragment],
    now: DateTime<Utc>,
) -> std::result::Result<(DiagramPayload, usize), StoreError> {
    let mut payload = record.payload;
    let added = extend_payload(&mut payload, fragments, &ctx.links);
    if added == 0 {
        return Ok((payload, 0));
    }

    ctx.diagrams.update_diagram_payload(&record.id, &payload).await?;
    debug!(diagram_id = %record.id, added, "Diagram extended");
    ctx.publish(AssemblyEvent::DiagramExtended {
        diagram_id: record.id,
        added_nodes: added,
        timestamp: now,
    });
    Ok((payload, added))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fragment;
    use arbor_core::diagram::Link;
    use chrono::TimeZone;

    #[test]
    fn grid_is_three_columns_wide() {
        assert_eq!(grid_position(0), (150.0, 100.0));
        assert_eq!(grid_position(2), (650.0, 100.0));
        assert_eq!(grid_position(3), (150.0, 250.0));
        assert_eq!(grid_position(7), (400.0, 400.0));
    }

    #[test]
    fn scenario_a_payload() {
        let fragments = vec![
            fragment("c", SemanticType::Conflict, "Speed vs Quality"),
            fragment("w", SemanticType::Want, "Ship fast"),
            fragment("n", SemanticType::Need, "Ship correct"),
        ];
        let payload = build_payload(
            "d1",
            DiagramType::EvaporatingCloud,
            &fragments,
            &LinkRegistry::with_defaults(),
            Utc::now(),
        );

        assert_eq!(payload.title, "Evaporating Cloud: Speed vs Quality");
        assert_eq!(payload.nodes.len(), 3);
        assert_eq!(payload.links, vec![Link::new("node_w", "node_c"), Link::new("node_n", "node_c")]);
        assert_eq!(payload.nodes["node_w"].x, 400.0);
    }

    #[test]
    fn title_falls_back_to_date() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap();
        let fragments = vec![fragment("i", SemanticType::Injection, "Grant")];
        assert_eq!(
            title_for(DiagramType::PrerequisiteTree, &fragments, now),
            "Prerequisite Tree – 2026-03-04"
        );
        assert_eq!(
            title_for(DiagramType::FutureRealityTree, &fragments, now),
            "Future Reality Tree: Grant"
        );
    }

    #[test]
    fn title_prefers_objective_over_obstacle() {
        let fragments = vec![
            fragment("o", SemanticType::Obstacle, "No budget"),
            fragment("g", SemanticType::Objective, "Launch v2"),
        ];
        assert_eq!(
            title_for(DiagramType::PrerequisiteTree, &fragments, Utc::now()),
            "Prerequisite Tree: Launch v2"
        );
    }

    #[test]
    fn extension_skips_present_fragments_and_adds_links() {
        let registry = LinkRegistry::with_defaults();
        let mut payload = build_payload(
            "d1",
            DiagramType::EvaporatingCloud,
            &[fragment("w", SemanticType::Want, "Ship fast")],
            &registry,
            Utc::now(),
        );
        assert!(payload.links.is_empty());

        let added = extend_payload(
            &mut payload,
            &[
                fragment("w", SemanticType::Want, "Ship fast"),
                fragment("c", SemanticType::Conflict, "Speed vs Quality"),
            ],
            &registry,
        );
        assert_eq!(added, 1);
        assert_eq!(payload.nodes.len(), 2);
        assert_eq!(payload.nodes["node_c"].x, 400.0);
        assert_eq!(payload.links, vec![Link::new("node_w", "node_c")]);

        let again = extend_payload(&mut payload, &[fragment("c", SemanticType::Conflict, "x")], &registry);
        assert_eq!(again, 0);
        assert_eq!(payload.links.len(), 1);
    }
}
