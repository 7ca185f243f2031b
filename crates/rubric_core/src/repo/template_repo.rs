//! Rubric template repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist template headers and their flattened definition trees.
//! - Keep SQL details and ordering behavior inside repository boundary.
//!
//! # Invariants
//! - Tombstoned (`is_deleted=1`) templates are invisible unless requested.
//! - Header and tree writes for one template commit in one transaction.
//! - Listing is deterministic: `created_at DESC, template_uuid ASC`.

use crate::codec::FlatTree;
use crate::model::template::{TemplateId, TemplateState};
use crate::repo::component_store::{insert_tree, load_tree, parse_uuid, replace_tree};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::schema::{ensure_connection_ready, RequiredTable, ACTIONS_TABLE, COMPONENTS_TABLE};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const TEMPLATE_SELECT_SQL: &str = "SELECT
    template_uuid,
    name,
    creator_id,
    is_public,
    state,
    is_deleted,
    created_at,
    updated_at
FROM rubric_templates";

const TEMPLATES_TABLE: RequiredTable = RequiredTable {
    name: "rubric_templates",
    columns: &[
        "template_uuid",
        "name",
        "creator_id",
        "is_public",
        "state",
        "is_deleted",
        "created_at",
        "updated_at",
    ],
};

/// Template header read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateHeader {
    pub template_id: TemplateId,
    pub name: String,
    pub creator_id: String,
    pub is_public: bool,
    /// `Deleted` when tombstoned, otherwise the stored lifecycle state.
    pub state: TemplateState,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

/// New template header fields.
#[derive(Debug, Clone, Copy)]
pub struct NewTemplate<'a> {
    pub template_id: TemplateId,
    pub name: &'a str,
    pub creator_id: &'a str,
    pub is_public: bool,
}

/// Repository interface for rubric templates.
pub trait TemplateRepository {
    /// Inserts header and tree as `published`.
    fn insert_template(&self, template: NewTemplate<'_>, tree: &FlatTree)
        -> RepoResult<TemplateHeader>;
    /// Replaces the tree of an active template and marks it `updated`.
    fn replace_tree(&self, template_id: TemplateId, tree: &FlatTree) -> RepoResult<TemplateHeader>;
    /// Loads one header by id.
    fn get_header(
        &self,
        template_id: TemplateId,
        include_deleted: bool,
    ) -> RepoResult<Option<TemplateHeader>>;
    /// Loads the stored rows of one template.
    fn load_tree(&self, template_id: TemplateId) -> RepoResult<FlatTree>;
    /// Sets the visibility flag of an active template.
    fn set_visibility(&self, template_id: TemplateId, is_public: bool) -> RepoResult<()>;
    /// Tombstones an active template.
    fn soft_delete(&self, template_id: TemplateId) -> RepoResult<()>;
    /// Lists active templates that are public or owned by `viewer`.
    fn list_visible(&self, viewer: &str) -> RepoResult<Vec<TemplateHeader>>;
}

/// SQLite-backed template repository.
pub struct SqliteTemplateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTemplateRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[&TEMPLATES_TABLE, &COMPONENTS_TABLE, &ACTIONS_TABLE])?;
        Ok(Self { conn })
    }
}

impl TemplateRepository for SqliteTemplateRepository<'_> {
    fn insert_template(
        &self,
        template: NewTemplate<'_>,
        tree: &FlatTree,
    ) -> RepoResult<TemplateHeader> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO rubric_templates (
                template_uuid,
                name,
                creator_id,
                is_public,
                state,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0);",
            params![
                template.template_id.to_string(),
                template.name,
                template.creator_id,
                bool_to_int(template.is_public),
                TemplateState::Published.as_str(),
            ],
        )?;
        insert_tree(&tx, template.template_id, tree)?;
        tx.commit()?;

        load_required_header(self.conn, template.template_id)
    }

    fn replace_tree(&self, template_id: TemplateId, tree: &FlatTree) -> RepoResult<TemplateHeader> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE rubric_templates
             SET state = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE template_uuid = ?1
               AND is_deleted = 0;",
            params![template_id.to_string(), TemplateState::Updated.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(template_id));
        }
        replace_tree(&tx, template_id, tree)?;
        tx.commit()?;

        load_required_header(self.conn, template_id)
    }

    fn get_header(
        &self,
        template_id: TemplateId,
        include_deleted: bool,
    ) -> RepoResult<Option<TemplateHeader>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TEMPLATE_SELECT_SQL}
             WHERE template_uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![
            template_id.to_string(),
            bool_to_int(include_deleted)
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_header_row(row)?));
        }
        Ok(None)
    }

    fn load_tree(&self, template_id: TemplateId) -> RepoResult<FlatTree> {
        load_tree(self.conn, template_id)
    }

    fn set_visibility(&self, template_id: TemplateId, is_public: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE rubric_templates
             SET is_public = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE template_uuid = ?1
               AND is_deleted = 0;",
            params![template_id.to_string(), bool_to_int(is_public)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(template_id));
        }
        Ok(())
    }

    fn soft_delete(&self, template_id: TemplateId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE rubric_templates
             SET is_deleted = 1,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE template_uuid = ?1
               AND is_deleted = 0;",
            [template_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(template_id));
        }
        Ok(())
    }

    fn list_visible(&self, viewer: &str) -> RepoResult<Vec<TemplateHeader>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TEMPLATE_SELECT_SQL}
             WHERE is_deleted = 0
               AND (is_public = 1 OR creator_id = ?1)
             ORDER BY created_at DESC, template_uuid ASC;"
        ))?;
        let mut rows = stmt.query([viewer])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_header_row(row)?);
        }
        Ok(items)
    }
}

fn load_required_header(conn: &Connection, template_id: TemplateId) -> RepoResult<TemplateHeader> {
    let mut stmt = conn.prepare(&format!(
        "{TEMPLATE_SELECT_SQL}
         WHERE template_uuid = ?1
           AND is_deleted = 0;"
    ))?;
    let mut rows = stmt.query([template_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_header_row(row);
    }
    Err(RepoError::NotFound(template_id))
}

fn parse_header_row(row: &Row<'_>) -> RepoResult<TemplateHeader> {
    let id_text: String = row.get("template_uuid")?;
    let template_id = parse_uuid(&id_text, "rubric_templates.template_uuid")?;

    let state_text: String = row.get("state")?;
    let stored_state = match TemplateState::parse(&state_text) {
        Some(state @ (TemplateState::Published | TemplateState::Updated)) => state,
        _ => {
            return Err(RepoError::InvalidData(format!(
                "invalid template state `{state_text}` in rubric_templates.state"
            )));
        }
    };
    let is_deleted = parse_flag(row.get("is_deleted")?, "rubric_templates.is_deleted")?;

    Ok(TemplateHeader {
        template_id,
        name: row.get("name")?,
        creator_id: row.get("creator_id")?,
        is_public: parse_flag(row.get("is_public")?, "rubric_templates.is_public")?,
        state: if is_deleted {
            TemplateState::Deleted
        } else {
            stored_state
        },
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_flag(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
