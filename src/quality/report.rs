use std::path::Path;

use super::{QualityReport, TableCheck, TableOutcome};
use crate::Result;

/// Render a deterministic markdown report, tables in check order.
pub fn render_markdown(report: &QualityReport) -> String {
    let mut lines = Vec::new();

    lines.push("# Data Quality Report".to_string());
    lines.push(String::new());
    lines.push(format!("- database: {}", report.database));
    lines.push(String::new());

    lines.push("## Summary".to_string());
    lines.push("| table | rows | duplicates | missing | anomalies | orphans |".to_string());
    lines.push("| --- | --- | --- | --- | --- | --- |".to_string());
    for outcome in &report.tables {
        match outcome {
            TableOutcome::Checked(check) => lines.push(format!(
                "| {} | {} | {} | {} | {} | {} |",
                check.table,
                check.rows,
                check.duplicate_count,
                check.total_missing(),
                check.total_anomalies(),
                check.total_orphans()
            )),
            TableOutcome::Failed { table, .. } => {
                lines.push(format!("| {} | - | - | - | - | - |", table))
            }
        }
    }
    lines.push(String::new());

    for outcome in &report.tables {
        match outcome {
            TableOutcome::Checked(check) => push_table_section(&mut lines, check),
            TableOutcome::Failed { table, error } => {
                lines.push(format!("## {}", table));
                lines.push(format!("- not checked: {}", error));
                lines.push(String::new());
            }
        }
    }

    if report.is_clean() {
        lines.push("No duplicate rows, missing values or anomalies found.".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}

fn push_table_section(lines: &mut Vec<String>, check: &TableCheck) {
    lines.push(format!("## {}", check.table));
    lines.push(format!("**Total Rows:** {}", check.rows));
    lines.push(format!("**Columns:** {}", check.columns.join(", ")));
    lines.push(String::new());

    lines.push("### Duplicates".to_string());
    lines.push(format!(
        "- {} duplicate rows in {} groups{}",
        check.duplicate_count,
        check.duplicate_groups,
        samples_suffix(&check.duplicate_samples)
    ));
    lines.push(String::new());

    lines.push("### Missing Values".to_string());
    let missing: Vec<_> = check.missing.iter().filter(|m| m.count > 0).collect();
    if missing.is_empty() {
        lines.push("- none in required columns".to_string());
    }
    for m in missing {
        lines.push(format!("- {}: {}{}", m.column, m.count, samples_suffix(&m.samples)));
    }
    lines.push(String::new());

    let anomalies: Vec<_> = check.anomalies.iter().filter(|a| a.count > 0).collect();
    let orphans: Vec<_> = check.orphans.iter().filter(|o| o.count > 0).collect();
    if !anomalies.is_empty() || !orphans.is_empty() {
        lines.push("### Anomalies".to_string());
        for a in anomalies {
            lines.push(format!(
                "- {} not {}: {}{}",
                a.column,
                a.rule,
                a.count,
                samples_suffix(&a.samples)
            ));
        }
        for o in orphans {
            lines.push(format!(
                "- {} without matching {}: {}{}",
                o.column,
                o.parent,
                o.count,
                samples_suffix(&o.samples)
            ));
        }
        lines.push(String::new());
    }
}

fn samples_suffix(samples: &[String]) -> String {
    if samples.is_empty() {
        String::new()
    } else {
        format!(" (e.g. {})", samples.join(", "))
    }
}

/// Write the rendered report, creating parent directories as needed.
pub fn write_report(path: &Path, report: &QualityReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, render_markdown(report))?;
    tracing::info!("quality report written to {}", path.display());
    Ok(())
}
