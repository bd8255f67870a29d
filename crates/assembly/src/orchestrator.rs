//! Orchestrator: one assembly run, start to finish.
//!
//! The primary pass groups unassigned fragments, resolves each bucket,
//! builds and records the diagrams it yields. The secondary pass and the
//! relationship detector follow. A store failure ends the run where it
//! happened; whatever was already written stays written. Nothing escapes
//! to the caller: errors and panics become lines in the returned log.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use arbor_core::error::StoreError;
use arbor_core::event::AssemblyEvent;
use arbor_core::fragment::{Fragment, FragmentRecord};

use crate::builder::build_diagram;
use crate::context::AssemblyContext;
use crate::grouper::group_by_pattern;
use crate::recorder::record_group;
use crate::relationships;
use crate::report::AssemblyReport;
use crate::resolver::resolve;
use crate::secondary;

/// Validate a raw record. Malformed records are logged, counted and dropped.
pub(crate) fn admit(
    ctx: &AssemblyContext,
    record: FragmentRecord,
    now: DateTime<Utc>,
    report: &mut AssemblyReport,
) -> Option<Fragment> {
    let fragment_id = record.id.clone();
    match Fragment::try_from(record) {
        Ok(fragment) => Some(fragment),
        Err(e) => {
            warn!(fragment_id = %fragment_id, error = %e, "Skipping malformed fragment");
            report.fragments_skipped += 1;
            report.log(format!("Skipped fragment: {e}"));
            ctx.publish(AssemblyEvent::FragmentSkipped {
                fragment_id,
                reason: e.to_string(),
                timestamp: now,
            });
            None
        }
    }
}

/// Assembles diagrams from the fragments a session has produced.
pub struct TreeAssembler {
    ctx: AssemblyContext,
}

impl TreeAssembler {
    pub fn new(ctx: AssemblyContext) -> Self {
        Self { ctx }
    }

    /// Run once for `session_id` and return the decision log. Never fails.
    pub async fn assemble_trees_on_startup(&self, session_id: &str) -> Vec<String> {
        self.assemble_at(session_id, Utc::now()).await.lines
    }

    /// Run as of `now` and return the full report.
    pub async fn assemble_at(&self, session_id: &str, now: DateTime<Utc>) -> AssemblyReport {
        let mut report = AssemblyReport::new(session_id);
        report.log(format!("Assembling trees for session {session_id}"));
        info!(session_id, client_id = self.ctx.scope.client_id, "Assembly run started");

        let outcome = AssertUnwindSafe(self.run(session_id, now, &mut report))
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("Run aborted: {e}")),
            Err(panic) => Some(format!("Run aborted, assembly panicked: {}", panic_message(panic.as_ref()))),
        };

        match failure {
            None => {
                let summary = report.summary();
                report.log(format!("Done: {summary}"));
                info!(session_id, summary = %summary, "Assembly run finished");
            }
            Some(message) => {
                error!(session_id, error = %message, "Assembly run failed");
                report.log(message.clone());
                self.ctx.publish(AssemblyEvent::RunFailed {
                    session_id: session_id.to_string(),
                    error_message: message.clone(),
                    timestamp: now,
                });
                report.error = Some(message);
            }
        }
        report
    }

    async fn run(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        report: &mut AssemblyReport,
    ) -> std::result::Result<(), StoreError> {
        let ctx = &self.ctx;
        let records = ctx.fragments.fetch_unassigned(ctx.scope, ctx.unassigned_window(now)).await?;
        report.log(format!("Found {} unassigned fragments", records.len()));

        let fragments: Vec<Fragment> = records
            .into_iter()
            .filter_map(|record| admit(ctx, record, now, report))
            .collect();

        for (diagram_type, members) in group_by_pattern(&fragments) {
            let Some(rule) = resolve(diagram_type, &members) else {
                report.log(format!(
                    "{diagram_type}: {} candidate fragments, no rule matched",
                    members.len()
                ));
                debug!(session_id, %diagram_type, candidates = members.len(), "No rule matched");
                continue;
            };

            let payload = build_diagram(ctx, session_id, diagram_type, &members, now).await?;
            report.diagrams_created += 1;
            report.log(format!(
                "Created {diagram_type} diagram {} '{}' with {} nodes and {} links",
                payload.diagram_id,
                payload.title,
                payload.nodes.len(),
                payload.links.len()
            ));
            info!(session_id, diagram_id = %payload.diagram_id, %diagram_type, "Created diagram");

            let recorded = record_group(ctx, &payload.diagram_id, &members, &rule.describe(), now).await?;
            report.assignments_recorded += recorded;
            report.log(format!("Assigned {recorded} fragments to {}", payload.diagram_id));
        }

        secondary::run(ctx, session_id, now, report).await?;
        relationships::detect(ctx, now, report).await?;
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
