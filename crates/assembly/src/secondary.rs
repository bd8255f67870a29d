//! Secondary-assignment pass.
//!
//! Revisits fragments that already belong to a diagram but were assigned
//! below the confidence threshold. Each candidate diagram type the fragment
//! is not yet part of either grows the session's newest open diagram of
//! that type (when it is young enough) or gets a fresh single-fragment
//! diagram.

use std::slice;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use arbor_core::diagram::DiagramType;
use arbor_core::error::StoreError;
use arbor_core::fragment::Fragment;

use crate::builder::{build_diagram, extend_diagram};
use crate::context::AssemblyContext;
use crate::orchestrator::admit;
use crate::pattern::candidate_types;
use crate::recorder::record_group;
use crate::report::AssemblyReport;

pub async fn run(
    ctx: &AssemblyContext,
    session_id: &str,
    now: DateTime<Utc>,
    report: &mut AssemblyReport,
) -> std::result::Result<(), StoreError> {
    let partials = ctx
        .fragments
        .fetch_partially_assigned(ctx.scope, ctx.partial_window(now), ctx.settings.partial_confidence_threshold)
        .await?;
    report.log(format!("Secondary pass: {} partially assigned fragments", partials.len()));
    debug!(session_id, count = partials.len(), "Secondary pass started");

    for partial in partials {
        let assigned = partial.assigned_types;
        let Some(fragment) = admit(ctx, partial.record, now, report) else {
            continue;
        };

        for diagram_type in candidate_types(fragment.semantic_type) {
            if assigned.contains(&diagram_type) {
                continue;
            }
            place(ctx, session_id, &fragment, diagram_type, now, report).await?;
        }
    }
    Ok(())
}

async fn place(
    ctx: &AssemblyContext,
    session_id: &str,
    fragment: &Fragment,
    diagram_type: DiagramType,
    now: DateTime<Utc>,
    report: &mut AssemblyReport,
) -> std::result::Result<(), StoreError> {
    let members = slice::from_ref(fragment);
    let open = ctx
        .diagrams
        .find_open_diagram(ctx.scope, session_id, diagram_type, ctx.extend_since(now))
        .await?;

    let (diagram_id, reason) = match open {
        Some(record) => {
            let diagram_id = record.id.clone();
            let (_, added) = extend_diagram(ctx, record, members, now).await?;
            if added == 0 {
                report.log(format!(
                    "Fragment {} already present in open {diagram_type} diagram {diagram_id}",
                    fragment.id
                ));
                debug!(session_id, fragment_id = %fragment.id, diagram_id = %diagram_id, %diagram_type, "Fragment already in open diagram");
                (diagram_id, format!("secondary: already in open {diagram_type}"))
            } else {
                report.diagrams_extended += 1;
                report.log(format!(
                    "Extended open {diagram_type} diagram {diagram_id} with fragment {}",
                    fragment.id
                ));
                info!(session_id, fragment_id = %fragment.id, diagram_id = %diagram_id, %diagram_type, "Extended open diagram");
                (diagram_id, format!("secondary: extended open {diagram_type}"))
            }
        }
        None => {
            let payload = build_diagram(ctx, session_id, diagram_type, members, now).await?;
            report.diagrams_created += 1;
            report.log(format!(
                "Created {diagram_type} diagram {} '{}' from fragment {}",
                payload.diagram_id, payload.title, fragment.id
            ));
            info!(session_id, fragment_id = %fragment.id, diagram_id = %payload.diagram_id, %diagram_type, "Created diagram from single fragment");
            (payload.diagram_id, format!("secondary: new {diagram_type}"))
        }
    };

    report.assignments_recorded += record_group(ctx, &diagram_id, members, &reason, now).await?;
    Ok(())
}
