use std::path::Path;
use std::time::Instant;

use engagement_etl::config::{self, EtlConfig};
use engagement_etl::export::{self, ExportOutcome};
use engagement_etl::output::{OutputMode, emit_success};
use engagement_etl::quality::{self, CheckOptions, QualityReport, TableOutcome};
use engagement_etl::schema;
use engagement_etl::ui::{self, Icons, Spinner, TableBuilder};
use engagement_etl::{Store, generate, inspect};

const PREVIEW_FILE: &str = "sample_data_preview.csv";

pub fn run_init(path: &Path, force: bool, output_mode: OutputMode) -> anyhow::Result<()> {
    let config = EtlConfig::default();
    config::write_config(path, &config, force)?;

    if output_mode.is_human() {
        ui::success(&format!("Wrote {}", path.display()));
        ui::status(Icons::DATABASE, "Database", &config.database.display().to_string());
    } else {
        emit_success(output_mode, "init", serde_json::json!({ "path": path }))?;
    }
    Ok(())
}

pub fn run_generate(config: &EtlConfig, output_mode: OutputMode) -> anyhow::Result<()> {
    config.generator.validate()?;
    config::ensure_parent_dir(&config.database)?;
    let store = Store::open(&config.database)?;

    if output_mode.is_human() {
        ui::header("Generating synthetic engagement data");
        ui::status(Icons::DATABASE, "Database", &config.database.display().to_string());
        ui::status(Icons::SEED, "Seed", &config.generator.seed.to_string());
    }

    let started = Instant::now();
    let spinner = Spinner::new(&format!("Generating {} students", config.generator.students));
    let summary = generate::generate(&store, &config.generator)?;
    spinner.finish_and_clear();
    store.close()?;

    if output_mode.is_human() {
        let mut table = TableBuilder::new();
        for count in &summary.tables {
            table.add_row(&count.table, &count.rows.to_string());
        }
        ui::block(&table.build());
        ui::timing(started.elapsed());
        ui::success("Generation complete");
    } else {
        emit_success(output_mode, "generate", &summary)?;
    }
    Ok(())
}

pub fn run_export(
    config: &EtlConfig,
    table: Option<&str>,
    with_queries: bool,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let store = Store::open_existing(&config.database)?;
    let dir = config.export_dir.as_path();

    let tables = match table {
        Some(table) => vec![table.to_string()],
        None => store.table_names()?,
    };

    let mut written: Vec<ExportOutcome> = Vec::new();
    let mut failed: Vec<(String, String)> = Vec::new();
    for (table, outcome) in export::export_all(&store, &tables, dir) {
        match outcome {
            Ok(outcome) => written.push(outcome),
            Err(err) => failed.push((table, err.to_string())),
        }
    }

    if table.is_none() && with_queries && store.table_exists(schema::ANALYTIC_STUDENT_TERM)? {
        for query in export::analytic_queries() {
            written.push(export::export_query(&store, query, dir)?);
        }
        written.push(export::export_preview(
            &store,
            schema::ANALYTIC_STUDENT_TERM,
            config.preview_rows,
            &dir.join(PREVIEW_FILE),
        )?);
    }
    store.close()?;

    if output_mode.is_human() {
        ui::header(&format!("Exported to {}", dir.display()));
        for outcome in &written {
            ui::status(
                Icons::FILE,
                &outcome.name,
                &format!("{} rows, {}", outcome.rows, ui::human_bytes(outcome.bytes)),
            );
        }
        for (table, err) in &failed {
            ui::warn(&format!("{}: {}", table, err));
        }
    } else {
        emit_success(
            output_mode,
            "export",
            serde_json::json!({
                "files": written,
                "failed": failed
                    .iter()
                    .map(|(table, error)| serde_json::json!({ "table": table, "error": error }))
                    .collect::<Vec<_>>(),
            }),
        )?;
    }

    if !failed.is_empty() {
        anyhow::bail!("{} of {} tables failed to export", failed.len(), tables.len());
    }
    Ok(())
}

pub fn run_check(
    config: &EtlConfig,
    table: Option<&str>,
    required: &[String],
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    if table.is_none() && !required.is_empty() {
        anyhow::bail!("--required needs --table");
    }
    let store = Store::open_existing(&config.database)?;

    let report = match table {
        None => quality::check_catalog(&store, &schema::catalog(), config.sample_limit)?,
        Some(table) => {
            let check = match (schema::table(table), required.is_empty()) {
                (Some(descriptor), true) => quality::check_schema(&store, &descriptor, config.sample_limit)?,
                (descriptor, _) => {
                    let required: Vec<&str> = required.iter().map(String::as_str).collect();
                    let options = CheckOptions {
                        identifier: descriptor.map(|d| d.identifier.to_string()),
                        sample_limit: config.sample_limit,
                        ..CheckOptions::default()
                    };
                    quality::check_table_with(&store, table, &required, &options)?
                }
            };
            QualityReport {
                database: config.database.display().to_string(),
                tables: vec![TableOutcome::Checked(check)],
            }
        }
    };
    store.close()?;

    quality::write_report(&config.report_path, &report)?;

    if output_mode.is_human() {
        ui::header("Data quality");
        ui::block(&ui::check_summary(&report));
        ui::status(Icons::REPORT, "Report", &config.report_path.display().to_string());
        if report.is_clean() {
            ui::success("No duplicate rows, missing values or anomalies found");
        } else if !report.has_failures() {
            ui::warn("Data defects found; see the report for sample rows");
        }
    } else {
        emit_success(output_mode, "check", &report)?;
    }

    if report.has_failures() {
        let failed: Vec<&str> = report.failures().map(|(table, _)| table).collect();
        anyhow::bail!("could not check {}", failed.join(", "));
    }
    Ok(())
}

pub fn run_probe(config: &EtlConfig, output_mode: OutputMode) -> anyhow::Result<()> {
    let probe = inspect::probe(&config.database)?;

    if output_mode.is_human() {
        ui::success("Database reachable");
        ui::status(Icons::DATABASE, "Path", &probe.path.display().to_string());
        ui::summary_row("SQLite", &probe.sqlite_version);
        ui::summary_row("Tables", &probe.tables.to_string());
    } else {
        emit_success(output_mode, "probe", &probe)?;
    }
    Ok(())
}

pub fn run_tables(
    config: &EtlConfig,
    sample: Option<&str>,
    limit: usize,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let store = Store::open_existing(&config.database)?;
    let tables = inspect::list_tables(&store)?;
    let rows = sample
        .map(|table| inspect::sample_rows(&store, table, limit))
        .transpose()?;
    store.close()?;

    if output_mode.is_human() {
        ui::section(&format!("{} Tables", Icons::TABLE));
        if tables.is_empty() {
            ui::warn("No tables found");
        }
        ui::block(&ui::table_list(&tables));
        if let (Some(table), Some(rows)) = (sample, &rows) {
            ui::section(&format!("{} {} (first {})", Icons::MAG, table, limit));
            ui::block(&ui::row_set(rows));
        }
    } else {
        emit_success(
            output_mode,
            "tables",
            serde_json::json!({
                "tables": tables,
                "sample": rows.map(|set| serde_json::json!({ "columns": set.columns, "rows": set.rows })),
            }),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engagement_etl::Error;

    fn config_in(dir: &Path) -> EtlConfig {
        EtlConfig {
            database: dir.join("engagement.db"),
            export_dir: dir.join("exports"),
            report_path: dir.join("report.md"),
            ..EtlConfig::default()
        }
    }

    fn store_with_scores(config: &EtlConfig) {
        let store = Store::open(&config.database).unwrap();
        store
            .execute_sql("CREATE TABLE scores (id INTEGER, score REAL); INSERT INTO scores VALUES (1, NULL);")
            .unwrap();
    }

    #[test]
    fn test_check_missing_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        store_with_scores(&config);

        let err = run_check(&config, Some("ghost"), &[], OutputMode::Json).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::TableNotFound(t)) if t == "ghost"));
    }

    #[test]
    fn test_check_defects_succeed_but_unchecked_tables_fail() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        store_with_scores(&config);

        run_check(&config, Some("scores"), &["score".to_string()], OutputMode::Json).unwrap();
        assert!(config.report_path.exists());

        // none of the catalog tables exist in this store
        assert!(run_check(&config, None, &[], OutputMode::Json).is_err());
        assert!(std::fs::read_to_string(&config.report_path).unwrap().contains("not checked"));
    }

    #[test]
    fn test_check_required_without_table_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        store_with_scores(&config);
        assert!(run_check(&config, None, &["score".to_string()], OutputMode::Json).is_err());
    }

    #[test]
    fn test_export_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        store_with_scores(&config);

        run_export(&config, Some("scores"), true, OutputMode::Json).unwrap();
        assert!(config.export_dir.join("scores.csv").exists());
        assert!(run_export(&config, Some("ghost"), true, OutputMode::Json).is_err());
    }
}
