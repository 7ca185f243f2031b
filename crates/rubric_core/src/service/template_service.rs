//! Rubric template use-case service.
//!
//! # Responsibility
//! - Validate definition trees before they reach storage.
//! - Flatten on write and reconstruct on read.
//! - Drive the template lifecycle (publish, update, delete).
//!
//! # Invariants
//! - Nothing is written for a tree that fails validation.
//! - Tombstoned templates behave as not found for every operation.
//! - A stored tree that cannot be reconstructed surfaces as
//!   `MalformedTree`; no partial tree is returned.

use crate::codec::{flatten_block, reconstruct_block, MalformedTreeError};
use crate::model::block::BlockNode;
use crate::model::error::ValidationError;
use crate::model::template::{RubricTemplate, TemplateAction, TemplateId, TemplateState};
use crate::repo::template_repo::{NewTemplate, TemplateHeader, TemplateRepository};
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from template service operations.
#[derive(Debug)]
pub enum TemplateServiceError {
    /// Name, owner or tree failed validation.
    Validation(ValidationError),
    /// Template does not exist or is tombstoned.
    NotFound(TemplateId),
    /// Stored rows no longer form a valid tree.
    MalformedTree {
        template_id: TemplateId,
        source: MalformedTreeError,
    },
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for TemplateServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "rubric template not found: {id}"),
            Self::MalformedTree {
                template_id,
                source,
            } => write!(f, "template {template_id}: {source}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TemplateServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::MalformedTree { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<ValidationError> for TemplateServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for TemplateServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Rubric template service facade.
pub struct TemplateService<R: TemplateRepository> {
    repo: R,
}

impl<R: TemplateRepository> TemplateService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates, flattens and persists a new template.
    ///
    /// The stored template starts `published`.
    pub fn create_template(
        &self,
        name: impl Into<String>,
        creator_id: impl Into<String>,
        is_public: bool,
        root: BlockNode,
    ) -> Result<TemplateId, TemplateServiceError> {
        let started_at = Instant::now();
        let draft = RubricTemplate::draft(name, creator_id, is_public, root)?;
        let tree = flatten_block(&draft.root);
        let header = self.repo.insert_template(
            NewTemplate {
                template_id: draft.id,
                name: draft.name.as_str(),
                creator_id: draft.creator_id.as_str(),
                is_public: draft.is_public,
            },
            &tree,
        )?;

        info!(
            "event=template_create module=service status=ok template_id={} components={} duration_ms={}",
            header.template_id,
            tree.components.len(),
            started_at.elapsed().as_millis()
        );
        Ok(header.template_id)
    }

    /// Replaces the whole definition tree of an active template.
    pub fn update_template(
        &self,
        template_id: TemplateId,
        root: BlockNode,
    ) -> Result<TemplateHeader, TemplateServiceError> {
        let started_at = Instant::now();
        root.validate()?;
        let header = self.require_header(template_id)?;
        if header.state.apply(TemplateAction::Update).is_none() {
            return Err(TemplateServiceError::NotFound(template_id));
        }

        let tree = flatten_block(&root);
        let header = self.repo.replace_tree(template_id, &tree)?;
        info!(
            "event=template_update module=service status=ok template_id={} components={} duration_ms={}",
            template_id,
            tree.components.len(),
            started_at.elapsed().as_millis()
        );
        Ok(header)
    }

    /// Tombstones an active template.
    ///
    /// Instances already derived from it are unaffected.
    pub fn delete_template(&self, template_id: TemplateId) -> Result<(), TemplateServiceError> {
        self.repo.soft_delete(template_id)?;
        info!("event=template_delete module=service status=ok template_id={template_id}");
        Ok(())
    }

    /// Sets the visibility flag of an active template.
    pub fn set_visibility(
        &self,
        template_id: TemplateId,
        is_public: bool,
    ) -> Result<(), TemplateServiceError> {
        self.repo.set_visibility(template_id, is_public)?;
        info!(
            "event=template_visibility module=service status=ok template_id={template_id} is_public={is_public}"
        );
        Ok(())
    }

    /// Reconstructs the definition tree of an active template.
    pub fn load_template(
        &self,
        template_id: TemplateId,
    ) -> Result<BlockNode, TemplateServiceError> {
        self.require_header(template_id)?;
        self.load_root(template_id)
    }

    /// Loads header and tree of an active template.
    pub fn get_template(
        &self,
        template_id: TemplateId,
    ) -> Result<RubricTemplate, TemplateServiceError> {
        let header = self.require_header(template_id)?;
        let root = self.load_root(template_id)?;
        Ok(RubricTemplate {
            id: header.template_id,
            name: header.name,
            creator_id: header.creator_id,
            is_public: header.is_public,
            state: header.state,
            created_at: header.created_at,
            updated_at: header.updated_at,
            root,
        })
    }

    /// Lists active templates that are public or owned by `viewer`.
    pub fn list_templates(
        &self,
        viewer: &str,
    ) -> Result<Vec<TemplateHeader>, TemplateServiceError> {
        self.repo.list_visible(viewer).map_err(Into::into)
    }

    fn require_header(
        &self,
        template_id: TemplateId,
    ) -> Result<TemplateHeader, TemplateServiceError> {
        match self.repo.get_header(template_id, false)? {
            Some(header) if header.state != TemplateState::Deleted => Ok(header),
            _ => Err(TemplateServiceError::NotFound(template_id)),
        }
    }

    fn load_root(&self, template_id: TemplateId) -> Result<BlockNode, TemplateServiceError> {
        let tree = self.repo.load_tree(template_id)?;
        reconstruct_block(&tree.components, &tree.actions).map_err(|source| {
            warn!(
                "event=tree_reconstruct module=service status=error template_id={} error={}",
                template_id, source
            );
            TemplateServiceError::MalformedTree {
                template_id,
                source,
            }
        })
    }
}
