//! Storage of flattened record sets keyed by owner id.
//!
//! # Responsibility
//! - Write, read and delete the component/action rows of one tree.
//!
//! # Invariants
//! - Callers run `replace_tree` inside a transaction so readers never see a
//!   half-written tree.
//! - Reads return rows in `(parent, order_index)` order but do not validate
//!   tree shape; that is `codec::reconstruct`'s job.

use crate::codec::{ActionRecord, ComponentRecord, FlatTree};
use crate::model::node::NodeKind;
use crate::model::operator::Operator;
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// Inserts every row of `tree` under `owner`.
pub(crate) fn insert_tree(conn: &Connection, owner: Uuid, tree: &FlatTree) -> RepoResult<()> {
    let owner_text = owner.to_string();
    let mut component_stmt = conn.prepare(
        "INSERT INTO rubric_components (
            component_uuid,
            owner_uuid,
            parent_uuid,
            kind,
            order_index,
            name,
            description,
            min_value,
            max_value,
            step,
            value
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
    )?;
    for record in &tree.components {
        component_stmt.execute(params![
            record.component_id.to_string(),
            owner_text,
            record.parent_id.map(|value| value.to_string()),
            record.kind.as_str(),
            i64::from(record.order_index),
            record.name.as_str(),
            record.description.as_deref(),
            record.min,
            record.max,
            record.step,
            record.value,
        ])?;
    }

    let mut action_stmt = conn.prepare(
        "INSERT INTO rubric_actions (
            owner_uuid,
            parent_uuid,
            operator_index,
            operator
        ) VALUES (?1, ?2, ?3, ?4);",
    )?;
    for action in &tree.actions {
        action_stmt.execute(params![
            owner_text,
            action.parent_id.to_string(),
            i64::from(action.operator_index),
            action.operator.as_str(),
        ])?;
    }
    Ok(())
}

/// Deletes every row under `owner`.
pub(crate) fn delete_tree(conn: &Connection, owner: Uuid) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM rubric_actions WHERE owner_uuid = ?1;",
        [owner.to_string()],
    )?;
    conn.execute(
        "DELETE FROM rubric_components WHERE owner_uuid = ?1;",
        [owner.to_string()],
    )?;
    Ok(())
}

/// Swaps the rows under `owner` for `tree`.
pub(crate) fn replace_tree(conn: &Connection, owner: Uuid, tree: &FlatTree) -> RepoResult<()> {
    delete_tree(conn, owner)?;
    insert_tree(conn, owner, tree)
}

/// Loads every row under `owner`.
pub(crate) fn load_tree(conn: &Connection, owner: Uuid) -> RepoResult<FlatTree> {
    let mut stmt = conn.prepare(
        "SELECT
            component_uuid,
            parent_uuid,
            kind,
            order_index,
            name,
            description,
            min_value,
            max_value,
            step,
            value
         FROM rubric_components
         WHERE owner_uuid = ?1
         ORDER BY parent_uuid ASC, order_index ASC, component_uuid ASC;",
    )?;
    let mut rows = stmt.query([owner.to_string()])?;
    let mut components = Vec::new();
    while let Some(row) = rows.next()? {
        components.push(parse_component_row(row)?);
    }

    let mut stmt = conn.prepare(
        "SELECT parent_uuid, operator_index, operator
         FROM rubric_actions
         WHERE owner_uuid = ?1
         ORDER BY parent_uuid ASC, operator_index ASC;",
    )?;
    let mut rows = stmt.query([owner.to_string()])?;
    let mut actions = Vec::new();
    while let Some(row) = rows.next()? {
        actions.push(parse_action_row(row)?);
    }

    Ok(FlatTree {
        components,
        actions,
    })
}

fn parse_component_row(row: &Row<'_>) -> RepoResult<ComponentRecord> {
    let component_text: String = row.get("component_uuid")?;
    let component_id = parse_uuid(&component_text, "rubric_components.component_uuid")?;
    let parent_id = row
        .get::<_, Option<String>>("parent_uuid")?
        .map(|value| parse_uuid(&value, "rubric_components.parent_uuid"))
        .transpose()?;

    let kind_text: String = row.get("kind")?;
    let kind = NodeKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid component kind `{kind_text}` in rubric_components.kind"
        ))
    })?;

    Ok(ComponentRecord {
        component_id,
        parent_id,
        kind,
        order_index: parse_index(row.get("order_index")?, "rubric_components.order_index")?,
        name: row.get("name")?,
        description: row.get("description")?,
        min: row.get("min_value")?,
        max: row.get("max_value")?,
        step: row.get("step")?,
        value: row.get("value")?,
    })
}

fn parse_action_row(row: &Row<'_>) -> RepoResult<ActionRecord> {
    let parent_text: String = row.get("parent_uuid")?;
    let operator_text: String = row.get("operator")?;
    let operator = Operator::parse(&operator_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid operator `{operator_text}` in rubric_actions.operator"
        ))
    })?;

    Ok(ActionRecord {
        parent_id: parse_uuid(&parent_text, "rubric_actions.parent_uuid")?,
        operator_index: parse_index(row.get("operator_index")?, "rubric_actions.operator_index")?,
        operator,
    })
}

fn parse_index(value: i64, column: &'static str) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid index `{value}` in {column}")))
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}
