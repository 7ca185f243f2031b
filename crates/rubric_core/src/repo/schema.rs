//! Connection readiness checks run when a repository is constructed.

use crate::db::{latest_version, schema_version};
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::Connection;

/// One table and the columns a repository reads or writes.
pub(crate) struct RequiredTable {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

pub(crate) const COMPONENTS_TABLE: RequiredTable = RequiredTable {
    name: "rubric_components",
    columns: &[
        "component_uuid",
        "owner_uuid",
        "parent_uuid",
        "kind",
        "order_index",
        "name",
        "description",
        "min_value",
        "max_value",
        "step",
        "value",
    ],
};

pub(crate) const ACTIONS_TABLE: RequiredTable = RequiredTable {
    name: "rubric_actions",
    columns: &["owner_uuid", "parent_uuid", "operator_index", "operator"],
};

/// Fails unless `conn` is migrated and every required table/column exists.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&RequiredTable],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables {
        if !table_exists(conn, table.name)? {
            return Err(RepoError::MissingRequiredTable(table.name));
        }
        let present = table_columns(conn, table.name)?;
        for column in table.columns {
            if !present.iter().any(|name| name.as_str() == *column) {
                return Err(RepoError::MissingRequiredColumn {
                    table: table.name,
                    column: *column,
                });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(1)?);
    }
    Ok(columns)
}
