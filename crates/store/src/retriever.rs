//! Retrieval executor: generated SQL → excerpts, read-only.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use peoplesay_engine::model::{Excerpt, ID_COLUMN, TEXT_COLUMN};
use peoplesay_engine::{GeneratedQuery, ResultSet, RetrievalError, Retriever};

use crate::guard::validate_read_only_sql;

/// Opens the database per query. Nothing is cached between runs.
#[derive(Debug, Clone)]
pub struct SqliteRetriever {
    db_path: PathBuf,
}

impl SqliteRetriever {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self { db_path: db_path.into() }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl Retriever for SqliteRetriever {
    fn retrieve(&self, query: &GeneratedQuery) -> Result<ResultSet, RetrievalError> {
        // Guard before the file is even opened
        validate_read_only_sql(&query.sql)?;
        let conn = open_read_only(&self.db_path)?;
        let started = Instant::now();
        let rows = execute(&conn, &query.sql)?;
        log::info!(
            "query returned {} rows in {} ms",
            rows.len(),
            started.elapsed().as_millis()
        );
        Ok(rows)
    }
}

/// Open `path` with `SQLITE_OPEN_READ_ONLY` and `query_only` set.
pub fn open_read_only(path: &Path) -> Result<Connection, RetrievalError> {
    if !path.is_file() {
        return Err(RetrievalError::Unavailable(format!(
            "database file not found: {}",
            path.display()
        )));
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| RetrievalError::Unavailable(format!("{}: {e}", path.display())))?;
    conn.execute_batch("PRAGMA query_only = ON;")
        .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;
    log::debug!("opened {} read-only", path.display());
    Ok(conn)
}

/// Run one guarded statement and map every row to an [`Excerpt`].
///
/// Rows keep SQLite's order. Zero rows is [`RetrievalError::NoMatches`].
pub fn execute(conn: &Connection, sql: &str) -> Result<ResultSet, RetrievalError> {
    validate_read_only_sql(sql)?;

    let mut stmt = conn.prepare(sql).map_err(|e| RetrievalError::Syntax(e.to_string()))?;
    if !stmt.readonly() {
        return Err(RetrievalError::Rejected {
            reason: "statement would write to the database".into(),
            keyword: None,
        });
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    for required in [ID_COLUMN, TEXT_COLUMN] {
        if !columns.iter().any(|c| c.eq_ignore_ascii_case(required)) {
            return Err(RetrievalError::MissingColumn(required.to_string()));
        }
    }

    let mut rows = stmt.query([]).map_err(|e| RetrievalError::Execution(e.to_string()))?;
    let mut excerpts = Vec::new();
    while let Some(row) = rows.next().map_err(|e| RetrievalError::Execution(e.to_string()))? {
        let mut values = Vec::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            let value = row.get_ref(idx).map_err(|e| RetrievalError::Execution(e.to_string()))?;
            values.push((name.clone(), value_to_string(value)));
        }
        let excerpt = Excerpt::from_columns(values).map_err(RetrievalError::MissingColumn)?;
        excerpts.push(excerpt);
    }

    if excerpts.is_empty() {
        return Err(RetrievalError::NoMatches);
    }
    Ok(ResultSet::new(columns, excerpts))
}

fn value_to_string(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scratch_db() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("peoplesay.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(crate::schema::SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO peoplesay (entry_id, data_unit, age, state) VALUES
                (1, 'The clinic is two hours away.', '71-75', 'Iowa'),
                (2, 'My daughter drives me.', '65-70', NULL);",
        )
        .unwrap();
        (dir, path)
    }

    #[test]
    fn returns_rows_in_sqlite_order() {
        let (_dir, path) = scratch_db();
        let conn = open_read_only(&path).unwrap();
        let rows = execute(
            &conn,
            "SELECT entry_id, data_unit, age, state FROM peoplesay ORDER BY entry_id DESC",
        )
        .unwrap();
        assert_eq!(rows.ids(), vec![2, 1]);
        assert_eq!(rows.columns, vec!["entry_id", "data_unit", "age", "state"]);
        assert_eq!(rows.get(1).unwrap().state.as_deref(), Some("Iowa"));
        assert_eq!(rows.get(2).unwrap().state, None);
    }

    #[test]
    fn zero_rows_is_no_matches() {
        let (_dir, path) = scratch_db();
        let conn = open_read_only(&path).unwrap();
        let err = execute(&conn, "SELECT entry_id, data_unit FROM peoplesay WHERE age = 'Under 65'")
            .unwrap_err();
        assert_eq!(err, RetrievalError::NoMatches);
    }

    #[test]
    fn missing_required_column() {
        let (_dir, path) = scratch_db();
        let conn = open_read_only(&path).unwrap();
        let err = execute(&conn, "SELECT entry_id, age FROM peoplesay").unwrap_err();
        assert_eq!(err, RetrievalError::MissingColumn("data_unit".into()));
    }

    #[test]
    fn left_join_with_null_duplicate_id_keeps_every_row() {
        let (_dir, path) = scratch_db();
        Connection::open(&path)
            .unwrap()
            .execute("INSERT INTO data_type_table (entry_id, data_type) VALUES (1, 'Direct Quote')", [])
            .unwrap();

        let conn = open_read_only(&path).unwrap();
        let rows = execute(
            &conn,
            "SELECT * FROM peoplesay p LEFT JOIN data_type_table dt ON p.entry_id = dt.entry_id \
             ORDER BY p.entry_id",
        )
        .unwrap();
        assert_eq!(rows.ids(), vec![1, 2]);
        assert_eq!(rows.get(1).unwrap().extra.get("data_type").map(String::as_str), Some("Direct Quote"));
        assert_eq!(rows.get(2).unwrap().text, "My daughter drives me.");
        assert!(rows.get(2).unwrap().extra.get("data_type").is_none());
    }

    #[test]
    fn replace_function_is_readable() {
        let (_dir, path) = scratch_db();
        let conn = open_read_only(&path).unwrap();
        let rows = execute(
            &conn,
            "SELECT entry_id, REPLACE(data_unit, 'two', 'three') AS data_unit FROM peoplesay WHERE entry_id = 1",
        )
        .unwrap();
        assert_eq!(rows.get(1).unwrap().text, "The clinic is three hours away.");
    }

    #[test]
    fn malformed_sql_is_a_syntax_error() {
        let (_dir, path) = scratch_db();
        let conn = open_read_only(&path).unwrap();
        let err = execute(&conn, "SELECT entry_id, data_unit FROM nowhere").unwrap_err();
        assert!(matches!(err, RetrievalError::Syntax(_)), "{err:?}");
    }

    #[test]
    fn connection_refuses_writes_even_without_guard() {
        let (_dir, path) = scratch_db();
        let conn = open_read_only(&path).unwrap();
        assert!(conn.execute("DELETE FROM peoplesay", []).is_err());
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM peoplesay", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let retriever = SqliteRetriever::new(dir.path().join("absent.db"));
        let err = retriever.retrieve(&GeneratedQuery::new("SELECT entry_id, data_unit FROM peoplesay"));
        assert!(matches!(err, Err(RetrievalError::Unavailable(_))));
        assert!(!dir.path().join("absent.db").exists());
    }
}
