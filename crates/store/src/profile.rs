//! Distinct values and counts per categorical column.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use serde::Serialize;

use crate::error::StoreError;
use crate::schema::{AUX_TABLES, CATEGORICAL_COLUMNS, MAIN_TABLE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnProfile {
    /// `table.column`
    pub column: String,
    pub values: Vec<ValueCount>,
}

/// Profile every categorical column and tag table in `db_path`.
pub fn profile(db_path: &Path) -> Result<Vec<ColumnProfile>, StoreError> {
    if !db_path.is_file() {
        return Err(StoreError::DatabaseNotFound(db_path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    profile_connection(&conn)
}

pub fn profile_connection(conn: &Connection) -> Result<Vec<ColumnProfile>, StoreError> {
    let mut out = Vec::new();
    for column in CATEGORICAL_COLUMNS {
        out.push(distinct_values(conn, MAIN_TABLE, column)?);
    }
    for aux in AUX_TABLES {
        out.push(distinct_values(conn, aux.table, aux.column)?);
    }
    Ok(out)
}

fn distinct_values(conn: &Connection, table: &str, column: &str) -> Result<ColumnProfile, StoreError> {
    // table and column names come from the schema constants only
    let sql = format!(
        "SELECT CAST({column} AS TEXT), COUNT(*) FROM {table} \
         WHERE {column} IS NOT NULL AND TRIM({column}) != '' \
         GROUP BY 1 ORDER BY 1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let values = stmt
        .query_map([], |row| Ok(ValueCount { value: row.get(0)?, count: row.get(1)? }))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ColumnProfile { column: format!("{table}.{column}"), values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populate::populate;

    #[test]
    fn counts_distinct_values() {
        let csv = "Data Unit [web],Gender [web],Insurance [web]\n\
                   a,Woman,\"Medigap, Traditional Medicare\"\n\
                   b,Woman,Medigap\n\
                   c,Man,\n";
        let mut conn = Connection::open_in_memory().unwrap();
        populate(&mut conn, csv.as_bytes()).unwrap();

        let profiles = profile_connection(&conn).unwrap();
        let gender = profiles.iter().find(|p| p.column == "peoplesay.gender").unwrap();
        assert_eq!(
            gender.values,
            vec![
                ValueCount { value: "Man".into(), count: 1 },
                ValueCount { value: "Woman".into(), count: 2 },
            ]
        );
        let insurance = profiles.iter().find(|p| p.column == "insurance_table.insurance").unwrap();
        assert_eq!(insurance.values[0], ValueCount { value: "Medigap".into(), count: 2 });
        let state = profiles.iter().find(|p| p.column == "peoplesay.state").unwrap();
        assert!(state.values.is_empty());
    }
}
