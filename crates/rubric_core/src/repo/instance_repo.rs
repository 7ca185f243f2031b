//! Rubric instance repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the one filled rubric owned by a rating.
//!
//! # Invariants
//! - At most one instance per rating (`rating_uuid` is unique).
//! - Instances are hard-deleted with their rating; rows are never shared.

use crate::codec::FlatTree;
use crate::model::instance::{InstanceId, RatingId};
use crate::model::template::TemplateId;
use crate::repo::component_store::{delete_tree, insert_tree, load_tree, parse_uuid};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::schema::{ensure_connection_ready, RequiredTable, ACTIONS_TABLE, COMPONENTS_TABLE};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const INSTANCES_TABLE: RequiredTable = RequiredTable {
    name: "rubric_instances",
    columns: &["instance_uuid", "rating_uuid", "template_uuid", "created_at"],
};

/// Instance header read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceHeader {
    pub instance_id: InstanceId,
    pub rating_id: RatingId,
    pub template_id: Option<TemplateId>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
}

/// New instance header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewInstance {
    pub instance_id: InstanceId,
    pub rating_id: RatingId,
    pub template_id: Option<TemplateId>,
}

/// Repository interface for rating-owned instances.
pub trait InstanceRepository {
    /// Inserts the first instance of a rating.
    fn insert_instance(&self, instance: NewInstance, tree: &FlatTree)
        -> RepoResult<InstanceHeader>;
    /// Swaps a rating's instance for a new one.
    fn replace_instance(&self, instance: NewInstance, tree: &FlatTree)
        -> RepoResult<InstanceHeader>;
    /// Loads the header of a rating's instance.
    fn get_for_rating(&self, rating_id: RatingId) -> RepoResult<Option<InstanceHeader>>;
    /// Loads the stored rows of one instance.
    fn load_tree(&self, instance_id: InstanceId) -> RepoResult<FlatTree>;
    /// Removes a rating's instance and its rows.
    fn delete_for_rating(&self, rating_id: RatingId) -> RepoResult<()>;
}

/// SQLite-backed instance repository.
pub struct SqliteInstanceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInstanceRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[&INSTANCES_TABLE, &COMPONENTS_TABLE, &ACTIONS_TABLE])?;
        Ok(Self { conn })
    }
}

impl InstanceRepository for SqliteInstanceRepository<'_> {
    fn insert_instance(
        &self,
        instance: NewInstance,
        tree: &FlatTree,
    ) -> RepoResult<InstanceHeader> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if existing_instance_id(&tx, instance.rating_id)?.is_some() {
            return Err(RepoError::RatingAlreadyGraded(instance.rating_id));
        }
        insert_header(&tx, instance)?;
        insert_tree(&tx, instance.instance_id, tree)?;
        tx.commit()?;

        load_required_header(self.conn, instance.rating_id)
    }

    fn replace_instance(
        &self,
        instance: NewInstance,
        tree: &FlatTree,
    ) -> RepoResult<InstanceHeader> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let previous = existing_instance_id(&tx, instance.rating_id)?
            .ok_or(RepoError::NotFound(instance.rating_id))?;
        delete_tree(&tx, previous)?;
        tx.execute(
            "DELETE FROM rubric_instances WHERE instance_uuid = ?1;",
            [previous.to_string()],
        )?;
        insert_header(&tx, instance)?;
        insert_tree(&tx, instance.instance_id, tree)?;
        tx.commit()?;

        load_required_header(self.conn, instance.rating_id)
    }

    fn get_for_rating(&self, rating_id: RatingId) -> RepoResult<Option<InstanceHeader>> {
        find_header(self.conn, rating_id)
    }

    fn load_tree(&self, instance_id: InstanceId) -> RepoResult<FlatTree> {
        load_tree(self.conn, instance_id)
    }

    fn delete_for_rating(&self, rating_id: RatingId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let instance_id =
            existing_instance_id(&tx, rating_id)?.ok_or(RepoError::NotFound(rating_id))?;
        delete_tree(&tx, instance_id)?;
        tx.execute(
            "DELETE FROM rubric_instances WHERE instance_uuid = ?1;",
            [instance_id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn insert_header(conn: &Connection, instance: NewInstance) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO rubric_instances (
            instance_uuid,
            rating_uuid,
            template_uuid
        ) VALUES (?1, ?2, ?3);",
        params![
            instance.instance_id.to_string(),
            instance.rating_id.to_string(),
            instance.template_id.map(|value| value.to_string()),
        ],
    )?;
    Ok(())
}

fn existing_instance_id(conn: &Connection, rating_id: RatingId) -> RepoResult<Option<InstanceId>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT instance_uuid FROM rubric_instances WHERE rating_uuid = ?1;",
            [rating_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    value
        .map(|text| parse_uuid(&text, "rubric_instances.instance_uuid"))
        .transpose()
}

fn find_header(conn: &Connection, rating_id: RatingId) -> RepoResult<Option<InstanceHeader>> {
    let mut stmt = conn.prepare(
        "SELECT instance_uuid, rating_uuid, template_uuid, created_at
         FROM rubric_instances
         WHERE rating_uuid = ?1;",
    )?;
    let mut rows = stmt.query([rating_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_header_row(row)?));
    }
    Ok(None)
}

fn load_required_header(conn: &Connection, rating_id: RatingId) -> RepoResult<InstanceHeader> {
    find_header(conn, rating_id)?.ok_or(RepoError::NotFound(rating_id))
}

fn parse_header_row(row: &Row<'_>) -> RepoResult<InstanceHeader> {
    let instance_text: String = row.get("instance_uuid")?;
    let rating_text: String = row.get("rating_uuid")?;
    let template_id = row
        .get::<_, Option<String>>("template_uuid")?
        .map(|value| parse_uuid(&value, "rubric_instances.template_uuid"))
        .transpose()?;

    Ok(InstanceHeader {
        instance_id: parse_uuid(&instance_text, "rubric_instances.instance_uuid")?,
        rating_id: parse_uuid(&rating_text, "rubric_instances.rating_uuid")?,
        template_id,
        created_at: row.get("created_at")?,
    })
}
