//! Rubric schema migrations.
//!
//! # Invariants
//! - Versions start at 1 and increase by one per migration.
//! - The version of the last applied migration is written to
//!   `PRAGMA user_version` in the same transaction as its SQL.
//! - Pending migrations apply all-or-nothing.

use crate::db::{DbError, DbResult};
use log::{debug, error};
use rusqlite::{Connection, Transaction};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "rubric_templates",
        sql: include_str!("0001_rubric_templates.sql"),
    },
    Migration {
        version: 2,
        name: "rubric_instances",
        sql: include_str!("0002_rubric_instances.sql"),
    },
];

/// Schema versions before and after [`apply_migrations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
}

impl MigrationReport {
    /// Number of migrations run; versions are contiguous.
    pub fn applied(&self) -> u32 {
        self.to_version - self.from_version
    }
}

/// Latest rubric schema version known by this build.
pub fn latest_version() -> u32 {
    last_version(MIGRATIONS)
}

/// Reads the rubric schema version recorded on `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Applies every pending rubric migration.
///
/// # Errors
/// - `SchemaTooNew` when the file is ahead of this build.
/// - `MigrationFailed` naming the first migration that did not apply.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<MigrationReport> {
    apply_from(conn, MIGRATIONS)
}

fn apply_from(conn: &mut Connection, migrations: &[Migration]) -> DbResult<MigrationReport> {
    let from_version = schema_version(conn)?;
    let supported = last_version(migrations);
    if from_version > supported {
        return Err(DbError::SchemaTooNew {
            found: from_version,
            supported,
        });
    }

    let pending: Vec<&Migration> = migrations
        .iter()
        .filter(|migration| migration.version > from_version)
        .collect();
    if pending.is_empty() {
        return Ok(MigrationReport {
            from_version,
            to_version: from_version,
        });
    }

    let tx = conn.transaction()?;
    for migration in pending {
        run_migration(&tx, migration).map_err(|source| {
            error!(
                "event=db_migrate module=db status=error version={} name={} error={source}",
                migration.version, migration.name
            );
            DbError::MigrationFailed {
                version: migration.version,
                name: migration.name,
                source,
            }
        })?;
        debug!(
            "event=db_migrate module=db status=step version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    Ok(MigrationReport {
        from_version,
        to_version: supported,
    })
}

fn run_migration(tx: &Transaction<'_>, migration: &Migration) -> rusqlite::Result<()> {
    tx.execute_batch(migration.sql)?;
    tx.pragma_update(None, "user_version", migration.version)
}

fn last_version(migrations: &[Migration]) -> u32 {
    migrations.last().map_or(0, |migration| migration.version)
}

#[cfg(test)]
mod tests {
    use super::{apply_from, schema_version, Migration, MIGRATIONS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn versions_are_contiguous_from_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1, "{}", migration.name);
        }
    }

    #[test]
    fn failed_migration_rolls_back_whole_batch() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrations = [
            Migration {
                version: 1,
                name: "scores",
                sql: "CREATE TABLE scores (value REAL NOT NULL);",
            },
            Migration {
                version: 2,
                name: "broken",
                sql: "ALTER TABLE missing ADD COLUMN weight REAL;",
            },
        ];

        let err = apply_from(&mut conn, &migrations).unwrap_err();
        assert!(matches!(
            err,
            DbError::MigrationFailed {
                version: 2,
                name: "broken",
                ..
            }
        ));
        assert_eq!(schema_version(&conn).unwrap(), 0);
        let scores_tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'scores';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(scores_tables, 0);
    }
}
