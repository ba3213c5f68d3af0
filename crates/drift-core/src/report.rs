//! Per-project reports and the run-level accumulator
//!
//! Reports are built during a single pass and discarded once emitted.

use serde::{Deserialize, Serialize};

use crate::model::ProjectHandle;

/// Fixed leading report columns
pub const PROJECT_COLUMN: &str = "project";
pub const DEFAULT_BRANCH_COLUMN: &str = "default_branch";
pub const PROTECTED_BRANCHES_COLUMN: &str = "protected branches";

/// Approvers added to and removed from a rule's user set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl MembershipDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// One detected discrepancy between live and expected state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub field: String,
    pub previous: String,
    pub expected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<MembershipDelta>,
    /// True only once fix mode has written the value
    pub applied: bool,
}

impl ChangeRecord {
    pub fn new(
        field: impl Into<String>,
        previous: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            previous: previous.into(),
            expected: expected.into(),
            delta: None,
            applied: false,
        }
    }

    /// Attach an approver delta (builder pattern)
    pub fn with_delta(mut self, delta: MembershipDelta) -> Self {
        self.delta = Some(delta);
        self
    }
}

/// A single report cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCell {
    pub column: String,
    pub value: String,
    pub changed: bool,
}

impl ReportCell {
    pub fn new(column: impl Into<String>, value: impl Into<String>, changed: bool) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
            changed,
        }
    }
}

/// Outcome of reconciling one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub project: ProjectHandle,
    /// Profile the expected values came from
    pub profile: String,
    /// Display cells in column order
    pub cells: Vec<ReportCell>,
    pub changes: Vec<ChangeRecord>,
    /// OR over all change records
    pub project_changed: bool,
}

impl ProjectReport {
    pub fn new(
        project: ProjectHandle,
        profile: impl Into<String>,
        cells: Vec<ReportCell>,
        changes: Vec<ChangeRecord>,
    ) -> Self {
        let project_changed = !changes.is_empty();
        Self {
            project,
            profile: profile.into(),
            cells,
            changes,
            project_changed,
        }
    }

    pub fn cell(&self, column: &str) -> Option<&ReportCell> {
        self.cells.iter().find(|c| c.column == column)
    }

    /// Change records for one field
    pub fn changes_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ChangeRecord> {
        self.changes.iter().filter(move |c| c.field == field)
    }
}

/// A project that could not be reconciled and is absent from the report rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFailure {
    pub project: String,
    pub message: String,
}

/// Ordered reports of one run plus the changed tally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub reports: Vec<ProjectReport>,
    pub changed_count: usize,
    #[serde(default)]
    pub failures: Vec<ProjectFailure>,
}

impl ReconciliationResult {
    /// Number of projects that produced a report row
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    /// Union of report columns in first-seen order
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for cell in self.reports.iter().flat_map(|r| r.cells.iter()) {
            if !columns.contains(&cell.column.as_str()) {
                columns.push(&cell.column);
            }
        }
        columns
    }
}

/// Append-only collector of project reports, write-once per run
#[derive(Debug, Default)]
pub struct Accumulator {
    result: ReconciliationResult,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: ProjectReport) {
        if report.project_changed {
            self.result.changed_count += 1;
        }
        self.result.reports.push(report);
    }

    pub fn record_failure(&mut self, project: impl Into<String>, message: impl Into<String>) {
        self.result.failures.push(ProjectFailure {
            project: project.into(),
            message: message.into(),
        });
    }

    pub fn finish(self) -> ReconciliationResult {
        self.result
    }
}

/// Fold a sequence of reports into a result, preserving input order
pub fn accumulate(reports: impl IntoIterator<Item = ProjectReport>) -> ReconciliationResult {
    let mut accumulator = Accumulator::new();
    for report in reports {
        accumulator.push(report);
    }
    accumulator.finish()
}
