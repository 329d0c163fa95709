//! Local dataset commands: init-db, profile, schema, analysis-types.

use std::fs;
use std::path::PathBuf;

use serde_json::json;

use peoplesay_config::Settings;
use peoplesay_engine::prompts::SCHEMA_DESCRIPTION;
use peoplesay_engine::AnalysisType;
use peoplesay_store::{init_from_csv, profile, ColumnProfile, PopulateOutcome, StoreError};

use crate::exit_codes::{EXIT_DB_MISSING, EXIT_DB_POPULATE, EXIT_SUCCESS};
use crate::{database_path, CliError};

pub fn cmd_init_db(csv: PathBuf, db: Option<PathBuf>, force: bool) -> Result<u8, CliError> {
    let settings = Settings::load();
    let db_path = database_path(db, &settings);

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            CliError::new(EXIT_DB_POPULATE, format!("cannot create {}: {}", parent.display(), e))
        })?;
    }

    match init_from_csv(&csv, &db_path, force) {
        Ok(PopulateOutcome::Skipped) => {
            println!("Database already exists: {}", db_path.display());
            println!("Nothing to do (use --force to rebuild).");
            Ok(EXIT_SUCCESS)
        }
        Ok(PopulateOutcome::Created { excerpts, aux_rows }) => {
            println!("Created {}", db_path.display());
            println!("  excerpts:  {excerpts}");
            println!("  tag rows:  {aux_rows}");
            Ok(EXIT_SUCCESS)
        }
        Err(StoreError::CsvNotFound(path)) => {
            Err(CliError::usage(format!("CSV file not found: {}", path.display())))
        }
        Err(e @ StoreError::MissingHeader(_)) => Err(CliError::new(EXIT_DB_POPULATE, e.to_string())
            .with_hint("expected the People Say export with `[web]` column headers")),
        Err(e) => Err(CliError::new(EXIT_DB_POPULATE, e.to_string())),
    }
}

pub fn cmd_profile(db: Option<PathBuf>, json: bool) -> Result<u8, CliError> {
    let settings = Settings::load();
    let db_path = database_path(db, &settings);

    let columns = profile(&db_path).map_err(|e| match e {
        StoreError::DatabaseNotFound(path) => {
            CliError::new(EXIT_DB_MISSING, format!("database not found: {}", path.display()))
                .with_hint("build it with `peoplesay init-db --csv <export.csv>`")
        }
        other => CliError::new(EXIT_DB_MISSING, other.to_string()),
    })?;

    if json {
        let value = json!({
            "schema_version": 1,
            "database": db_path.display().to_string(),
            "columns": columns,
        });
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| CliError::general(format!("JSON serialization failed: {e}")))?;
        println!("{text}");
    } else {
        print!("{}", render_profile(&columns));
    }
    Ok(EXIT_SUCCESS)
}

fn render_profile(columns: &[ColumnProfile]) -> String {
    let mut out = String::new();
    for column in columns {
        out.push_str(&format!("{} ({} distinct)\n", column.column, column.values.len()));
        let width = column.values.iter().map(|v| v.value.chars().count()).max().unwrap_or(0);
        for value in &column.values {
            out.push_str(&format!("  {:<width$}  {:>5}\n", value.value, value.count, width = width));
        }
        out.push('\n');
    }
    out
}

pub fn cmd_schema() -> Result<u8, CliError> {
    println!("{}", SCHEMA_DESCRIPTION.trim_end());
    Ok(EXIT_SUCCESS)
}

pub fn cmd_analysis_types(json: bool) -> Result<u8, CliError> {
    if json {
        let types: Vec<_> = AnalysisType::ALL
            .iter()
            .map(|t| json!({ "name": t.as_str(), "label": t.label(), "description": t.description() }))
            .collect();
        let text = serde_json::to_string_pretty(&types)
            .map_err(|e| CliError::general(format!("JSON serialization failed: {e}")))?;
        println!("{text}");
    } else {
        for t in AnalysisType::ALL {
            println!("{:<12} {}", t.as_str(), t.label());
            println!("{:<12} {}", "", t.description());
        }
    }
    Ok(EXIT_SUCCESS)
}
