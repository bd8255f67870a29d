//! The outcome of one assembly run.

use serde::Serialize;

/// Ordered decision log plus counters for one run.
///
/// A run that aborted still carries every line and count up to the
/// failure, with `error` set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssemblyReport {
    pub session_id: String,
    pub lines: Vec<String>,
    pub diagrams_created: usize,
    pub diagrams_extended: usize,
    pub assignments_recorded: usize,
    pub relationships_created: usize,
    pub fragments_skipped: usize,
    pub error: Option<String>,
}

impl AssemblyReport {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    /// Append a line to the decision log.
    pub fn log(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// One-line tally of what the run changed.
    pub fn summary(&self) -> String {
        format!(
            "{} created, {} extended, {} assignments, {} relationships, {} skipped",
            self.diagrams_created,
            self.diagrams_extended,
            self.assignments_recorded,
            self.relationships_created,
            self.fragments_skipped,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_report_is_empty_and_successful() {
        let report = AssemblyReport::new("s1");
        assert_eq!(report.session_id, "s1");
        assert!(report.lines.is_empty());
        assert!(report.succeeded());
        assert_eq!(report.summary(), "0 created, 0 extended, 0 assignments, 0 relationships, 0 skipped");
    }

    #[test]
    fn log_keeps_order() {
        let mut report = AssemblyReport::new("s1");
        report.log("first");
        report.log(String::from("second"));
        assert_eq!(report.lines, vec!["first", "second"]);
    }
}
