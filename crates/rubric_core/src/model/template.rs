//! Reusable rubric definition ("grading method").
//!
//! # Responsibility
//! - Hold the header (owner, visibility, lifecycle) and the definition tree.
//! - Encode legal lifecycle transitions.
//!
//! # Invariants
//! - `name` and `creator_id` are non-blank after trim.
//! - `root` passes [`BlockNode::validate`].
//! - `Deleted` is terminal.

use crate::model::block::BlockNode;
use crate::model::error::{GradingResult, ValidationError, ValidationResult};
use crate::model::evaluation::{evaluate_block, Evaluation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable rubric template identifier.
pub type TemplateId = Uuid;

/// Lifecycle state of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateState {
    /// Assembled in memory, never persisted.
    Draft,
    /// Persisted; the definition has not been replaced since.
    Published,
    /// Persisted; the definition has been replaced at least once.
    Updated,
    /// Tombstoned.
    Deleted,
}

/// Caller-driven lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateAction {
    Publish,
    Update,
    Delete,
}

impl TemplateState {
    /// Returns the next state, or `None` when `action` is illegal here.
    pub fn apply(self, action: TemplateAction) -> Option<TemplateState> {
        match (self, action) {
            (Self::Draft, TemplateAction::Publish) => Some(Self::Published),
            (Self::Published | Self::Updated, TemplateAction::Update) => Some(Self::Updated),
            (Self::Published | Self::Updated, TemplateAction::Delete) => Some(Self::Deleted),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Named, owned, reusable rubric definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricTemplate {
    pub id: TemplateId,
    pub name: String,
    /// Authenticated identity supplied by the host.
    pub creator_id: String,
    pub is_public: bool,
    pub state: TemplateState,
    /// Epoch ms; `0` until persisted.
    pub created_at: i64,
    /// Epoch ms; `0` until persisted.
    pub updated_at: i64,
    pub root: BlockNode,
}

impl RubricTemplate {
    /// Creates a draft with a fresh id after checking name, owner and tree.
    pub fn draft(
        name: impl Into<String>,
        creator_id: impl Into<String>,
        is_public: bool,
        root: BlockNode,
    ) -> ValidationResult<Self> {
        let name = normalize_name(name.into())?;
        let creator_id = normalize_name(creator_id.into())?;
        root.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            creator_id,
            is_public,
            state: TemplateState::Draft,
            created_at: 0,
            updated_at: 0,
            root,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.state == TemplateState::Deleted
    }

    /// Whether `viewer` may read this template.
    pub fn is_visible_to(&self, viewer: &str) -> bool {
        !self.is_deleted() && (self.is_public || self.creator_id == viewer)
    }

    /// Evaluates the definition tree as it stands.
    pub fn evaluate(&self) -> GradingResult<Evaluation> {
        evaluate_block(&self.root)
    }
}

/// Trims `value` and rejects blank results.
pub fn normalize_name(value: String) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankName);
    }
    Ok(trimmed.to_string())
}
