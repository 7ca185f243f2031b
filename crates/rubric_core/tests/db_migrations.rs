use rubric_core::db::migrations::apply_migrations;
use rubric_core::db::{latest_version, open_db, open_db_in_memory, schema_version, DbError};
use rubric_core::{RepoError, SqliteInstanceRepository, SqliteTemplateRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "rubric_templates");
    assert_table_exists(&conn, "rubric_components");
    assert_table_exists(&conn, "rubric_actions");
    assert_table_exists(&conn, "rubric_instances");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rubrics.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first).unwrap(), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second).unwrap(), latest_version());
    assert_table_exists(&conn_second, "rubric_components");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn templates_only_database_gains_instance_tables() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_rubric_templates.sql"))
        .unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();

    let report = apply_migrations(&mut conn).unwrap();
    assert_eq!(report.from_version, 1);
    assert_eq!(report.to_version, latest_version());
    assert_eq!(report.applied(), latest_version() - 1);
    assert_table_exists(&conn, "rubric_instances");

    let again = apply_migrations(&mut conn).unwrap();
    assert_eq!(again.applied(), 0);
}

#[test]
fn repositories_reject_unmigrated_connections() {
    let conn = Connection::open_in_memory().unwrap();

    let template_err = SqliteTemplateRepository::try_new(&conn)
        .err()
        .expect("template repo should reject raw connection");
    assert!(matches!(
        template_err,
        RepoError::UninitializedConnection { .. }
    ));

    let instance_err = SqliteInstanceRepository::try_new(&conn)
        .err()
        .expect("instance repo should reject raw connection");
    assert!(matches!(
        instance_err,
        RepoError::UninitializedConnection { .. }
    ));
}

#[test]
fn template_state_column_rejects_unknown_values() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO rubric_templates
             (template_uuid, name, creator_id, is_public, state, is_deleted)
         VALUES ('00000000-0000-4000-8000-000000000001', 'n', 'c', 0, 'draft', 0);",
        [],
    );
    assert!(result.is_err());
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
