//! Report rendering
//!
//! The table shows live values; yellow marks drift found in a dry run and
//! green marks drift that was fixed. A change log with the expected values
//! follows the table.

use std::io::Write;

use colored::{ColoredString, Colorize};
use drift_core::{ChangeRecord, PROJECT_COLUMN, ProjectReport, ReconciliationResult};

use crate::error::Result;

/// How the report is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Table }
    }
}

/// Print a reconciliation result in the requested format
pub fn render(
    out: &mut dyn Write,
    result: &ReconciliationResult,
    fix: bool,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(result)?)?;
        }
        OutputFormat::Table => {
            render_table(out, result, fix)?;
            render_changes(out, result, fix)?;
            render_failures(out, result)?;
        }
    }
    Ok(())
}

fn cell_text(report: &ProjectReport, column: &str) -> (String, bool) {
    let Some(cell) = report.cell(column) else {
        return (String::new(), false);
    };
    let text = if column == PROJECT_COLUMN {
        format!("{}{}", "  ".repeat(report.project.depth), cell.value)
    } else {
        cell.value.clone()
    };
    (text, cell.changed)
}

fn paint(text: String, changed: bool, fix: bool) -> ColoredString {
    match (changed, fix) {
        (true, true) => text.green(),
        (true, false) => text.yellow(),
        (false, _) => text.normal(),
    }
}

fn render_table(out: &mut dyn Write, result: &ReconciliationResult, fix: bool) -> Result<()> {
    let columns = result.columns();
    let rows: Vec<Vec<(String, bool)>> = result
        .reports
        .iter()
        .map(|report| columns.iter().map(|c| cell_text(report, c)).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            rows.iter()
                .map(|row| row[i].0.chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    if !columns.is_empty() {
        let header: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| format!("{:<width$}", column, width = width).bold().to_string())
            .collect();
        writeln!(out, "{}", header.join("  ").trim_end())?;

        for row in &rows {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|((text, changed), width)| {
                    paint(format!("{:<width$}", text, width = width), *changed, fix).to_string()
                })
                .collect();
            writeln!(out, "{}", line.join("  ").trim_end())?;
        }
        writeln!(out)?;
    }

    writeln!(out, "Changed: {}/{}", result.changed_count, result.total())?;
    Ok(())
}

fn describe(change: &ChangeRecord) -> String {
    let mut line = format!("{}: {} -> {}", change.field, change.previous, change.expected);
    if let Some(delta) = &change.delta {
        let mut parts: Vec<String> = delta.added.iter().map(|u| format!("+{}", u)).collect();
        parts.extend(delta.removed.iter().map(|u| format!("-{}", u)));
        line.push_str(&format!(" ({})", parts.join(" ")));
    }
    line
}

fn render_changes(out: &mut dyn Write, result: &ReconciliationResult, fix: bool) -> Result<()> {
    let changed: Vec<&ProjectReport> =
        result.reports.iter().filter(|r| r.project_changed).collect();
    if changed.is_empty() {
        return Ok(());
    }

    writeln!(out)?;
    if fix {
        writeln!(out, "{}", "Applied changes:".bold())?;
    } else {
        writeln!(out, "{} (run with {} to apply)", "Pending changes:".bold(), "--fix".cyan())?;
    }
    for report in changed {
        writeln!(out, "  {} ({})", report.project.path, report.profile)?;
        for change in &report.changes {
            writeln!(out, "    {}", paint(describe(change), true, change.applied))?;
        }
    }
    Ok(())
}

fn render_failures(out: &mut dyn Write, result: &ReconciliationResult) -> Result<()> {
    if result.failures.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{}", "Skipped projects:".red().bold())?;
    for failure in &result.failures {
        writeln!(out, "  {} {}: {}", "!".red(), failure.project, failure.message)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::{MembershipDelta, ProjectHandle, ReportCell, accumulate};
    use pretty_assertions::assert_eq;

    fn rendered(result: &ReconciliationResult, fix: bool) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        render(&mut out, result, fix, OutputFormat::Table).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn report(
        id: u64,
        name: &str,
        depth: usize,
        squash: &str,
        changes: Vec<ChangeRecord>,
    ) -> ProjectReport {
        let mut handle = ProjectHandle::new(id, name, format!("acme/{name}"));
        handle.depth = depth;
        let changed = !changes.is_empty();
        ProjectReport::new(
            handle,
            "default",
            vec![
                ReportCell::new("project", name, false),
                ReportCell::new("squash_option", squash, changed),
            ],
            changes,
        )
    }

    #[test]
    fn table_is_aligned_with_summary() {
        let result = accumulate(vec![
            report(1, "api", 0, "never", vec![]),
            report(
                2,
                "web",
                1,
                "always",
                vec![ChangeRecord::new("squash_option", "always", "never")],
            ),
        ]);

        let text = rendered(&result, false);

        assert_eq!(
            text,
            "project  squash_option\n\
             api      never\n  \
             web    always\n\
             \n\
             Changed: 1/2\n\
             \n\
             Pending changes: (run with --fix to apply)\n  \
             acme/web (default)\n    \
             squash_option: always -> never\n"
        );
    }

    #[test]
    fn approver_delta_is_listed() {
        let delta = MembershipDelta {
            added: vec!["carol".to_string()],
            removed: vec!["alice".to_string()],
        };
        let change = ChangeRecord::new("approval_rule:Owners", "a", "b").with_delta(delta);
        assert_eq!(describe(&change), "approval_rule:Owners: a -> b (+carol -alice)");
    }

    #[test]
    fn empty_result_prints_only_summary() {
        assert_eq!(rendered(&ReconciliationResult::default(), true), "Changed: 0/0\n");
    }

    #[test]
    fn json_output_is_the_serialised_result() {
        let result = accumulate(vec![report(1, "api", 0, "never", vec![])]);
        let mut out = Vec::new();
        render(&mut out, &result, false, OutputFormat::Json).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["changed_count"], 0);
        assert_eq!(parsed["reports"][0]["project"]["path"], "acme/api");
    }
}
