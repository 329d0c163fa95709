//! One-time population of peoplesay.db from the People Say CSV export.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use crate::error::StoreError;
use crate::schema::{AuxTable, AUX_TABLES, MAIN_COLUMNS, MAIN_TABLE, SCHEMA};

/// The export quotes this subtopic, which would otherwise split on its commas.
const DENTAL_QUOTED: &str = "\"Dental, Vision, and Hearing Care [5]\"";
const DENTAL_NORMALIZED: &str = "Dental Vision and Hearing Care [5]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopulateOutcome {
    /// Database already existed and `force` was off.
    Skipped,
    Created { excerpts: usize, aux_rows: usize },
}

/// Build the database at `db_path` from `csv_path`.
///
/// An existing non-empty database is left alone unless `force` is set.
/// All tables are replaced inside one transaction.
pub fn init_from_csv(csv_path: &Path, db_path: &Path, force: bool) -> Result<PopulateOutcome, StoreError> {
    if !force && is_populated(db_path) {
        log::info!("database {} already exists, skipping initialization", db_path.display());
        return Ok(PopulateOutcome::Skipped);
    }
    if !csv_path.is_file() {
        return Err(StoreError::CsvNotFound(csv_path.to_path_buf()));
    }

    log::info!("initializing {} from {}", db_path.display(), csv_path.display());
    let file = File::open(csv_path)?;
    let mut conn = Connection::open(db_path)?;
    let outcome = populate(&mut conn, file)?;
    if let PopulateOutcome::Created { excerpts, aux_rows } = &outcome {
        log::info!("wrote {excerpts} excerpts and {aux_rows} tag rows");
    }
    Ok(outcome)
}

fn is_populated(db_path: &Path) -> bool {
    std::fs::metadata(db_path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Load CSV content from `reader` into `conn`, replacing existing tables.
pub fn populate<R: Read>(conn: &mut Connection, reader: R) -> Result<PopulateOutcome, StoreError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let find = |name: &str| headers.iter().position(|h| h.trim() == name);

    let main_idx: Vec<Option<usize>> = MAIN_COLUMNS.iter().map(|(_, header)| find(header)).collect();
    if main_idx[0].is_none() {
        return Err(StoreError::MissingHeader(MAIN_COLUMNS[0].1.to_string()));
    }
    let aux_idx: Vec<(&AuxTable, Option<usize>)> =
        AUX_TABLES.iter().map(|aux| (aux, find(aux.header))).collect();
    for (aux, idx) in &aux_idx {
        if idx.is_none() {
            log::warn!("CSV has no '{}' column; {} stays empty", aux.header, aux.table);
        }
    }

    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)?;

    let insert_main = format!(
        "INSERT INTO {MAIN_TABLE} (entry_id, {}) VALUES (?1, {})",
        MAIN_COLUMNS.iter().map(|(col, _)| *col).collect::<Vec<_>>().join(", "),
        (2..=MAIN_COLUMNS.len() + 1).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", "),
    );

    let mut excerpts = 0usize;
    let mut aux_rows = 0usize;
    {
        let mut main_stmt = tx.prepare(&insert_main)?;
        let mut aux_stmts = Vec::with_capacity(aux_idx.len());
        for (aux, idx) in &aux_idx {
            let sql = format!("INSERT INTO {} (entry_id, {}) VALUES (?1, ?2)", aux.table, aux.column);
            aux_stmts.push((tx.prepare(&sql)?, *idx));
        }

        for record in csv_reader.records() {
            let record = record?;
            excerpts += 1;
            let entry_id = excerpts as i64;
            let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::trim);

            let mut values: Vec<Value> = Vec::with_capacity(MAIN_COLUMNS.len() + 1);
            values.push(Value::Integer(entry_id));
            for ((col, _), idx) in MAIN_COLUMNS.iter().zip(&main_idx) {
                values.push(column_value(col, cell(*idx)));
            }
            main_stmt.execute(params_from_iter(values))?;

            for (stmt, idx) in aux_stmts.iter_mut() {
                for tag in smart_split(cell(*idx).unwrap_or("")) {
                    stmt.execute(params![entry_id, tag])?;
                    aux_rows += 1;
                }
            }
        }
    }
    tx.commit()?;

    Ok(PopulateOutcome::Created { excerpts, aux_rows })
}

fn column_value(column: &str, raw: Option<&str>) -> Value {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Value::Null;
    };
    if column == "year_conducted_research" {
        // pandas exports years as 2023.0 when the column has gaps
        let trimmed = raw.strip_suffix(".0").unwrap_or(raw);
        if let Ok(year) = trimmed.parse::<i64>() {
            return Value::Integer(year);
        }
    }
    Value::Text(raw.to_string())
}

/// Split a multi-valued cell on commas, trimming and dropping empties.
pub fn smart_split(text: &str) -> Vec<String> {
    text.replace(DENTAL_QUOTED, DENTAL_NORMALIZED)
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
