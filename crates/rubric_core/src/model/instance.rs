//! Rating-owned, value-filled rubric copies.
//!
//! # Responsibility
//! - Produce an instance from a template (deep copy) or a bare leaf.
//! - Apply caller-supplied leaf values through the quantizing setter.
//!
//! # Invariants
//! - An instance never aliases its template's nodes.
//! - Filling starts from a value-cleared copy; leaves without a supplied
//!   value stay unset.
//! - Filling is all-or-nothing: on error the partially filled copy is dropped.

use crate::model::error::{GradingError, GradingResult, ValidationError};
use crate::model::evaluation::{evaluate, Evaluation};
use crate::model::grade::GradeNode;
use crate::model::node::Node;
use crate::model::template::{RubricTemplate, TemplateId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable instance identifier.
pub type InstanceId = Uuid;
/// Identifier of the rating that owns an instance, assigned by the host.
pub type RatingId = Uuid;

/// What an instance is copied from.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceSource {
    /// Deep copy of a stored template.
    Template(TemplateId),
    /// A single leaf for simple ratings.
    Bare(GradeNode),
}

/// Caller-supplied leaf values.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafValues {
    /// One entry per leaf in pre-order; `None` leaves the leaf unset.
    Ordered(Vec<Option<f64>>),
    /// Values keyed by leaf name; each name must match exactly one leaf.
    Named(BTreeMap<String, f64>),
}

impl LeafValues {
    /// Single value for a bare-leaf instance.
    pub fn single(value: f64) -> Self {
        Self::Ordered(vec![Some(value)])
    }

    /// Builds a named map from `(name, value)` pairs.
    pub fn named<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::Named(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }
}

/// Failure while filling leaf values.
///
/// Displays as the wrapped error and shares its source.
#[derive(Debug, Clone, PartialEq)]
pub enum FillError {
    /// Value map does not fit the tree.
    Validation(ValidationError),
    /// A value falls outside its leaf's range.
    Grading(GradingError),
}

impl Display for FillError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Grading(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FillError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => err.source(),
            Self::Grading(err) => err.source(),
        }
    }
}

impl From<ValidationError> for FillError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<GradingError> for FillError {
    fn from(value: GradingError) -> Self {
        Self::Grading(value)
    }
}

/// Concrete, filled-in rubric attached to one rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricInstance {
    pub id: InstanceId,
    pub rating_id: RatingId,
    /// Source template; `None` for bare-leaf instances.
    pub template_id: Option<TemplateId>,
    /// Epoch ms; `0` until persisted.
    pub created_at: i64,
    pub root: Node,
}

impl RubricInstance {
    /// Deep-copies `template`'s tree and fills it.
    pub fn from_template(
        rating_id: RatingId,
        template: &RubricTemplate,
        values: &LeafValues,
    ) -> Result<Self, FillError> {
        let root = Node::Block(template.root.clone());
        Self::filled(rating_id, Some(template.id), root, values)
    }

    /// Wraps a single leaf and fills it.
    pub fn bare(
        rating_id: RatingId,
        grade: GradeNode,
        values: &LeafValues,
    ) -> Result<Self, FillError> {
        Self::filled(rating_id, None, Node::Grade(grade), values)
    }

    pub fn evaluate(&self) -> GradingResult<Evaluation> {
        evaluate(&self.root)
    }

    fn filled(
        rating_id: RatingId,
        template_id: Option<TemplateId>,
        mut root: Node,
        values: &LeafValues,
    ) -> Result<Self, FillError> {
        root.clear_values();
        apply_leaf_values(&mut root, values)?;
        Ok(Self {
            id: Uuid::new_v4(),
            rating_id,
            template_id,
            created_at: 0,
            root,
        })
    }
}

/// Writes `values` into the leaves of `root` via [`GradeNode::set_value`].
pub fn apply_leaf_values(root: &mut Node, values: &LeafValues) -> Result<(), FillError> {
    let mut leaves = root.leaves_mut();
    match values {
        LeafValues::Ordered(list) => {
            if list.len() != leaves.len() {
                return Err(ValidationError::LeafCountMismatch {
                    expected: leaves.len(),
                    actual: list.len(),
                }
                .into());
            }
            for (leaf, value) in leaves.iter_mut().zip(list) {
                if let Some(value) = value {
                    leaf.set_value(*value)?;
                }
            }
        }
        LeafValues::Named(map) => {
            for (name, value) in map {
                let mut matches = leaves.iter_mut().filter(|leaf| leaf.name() == name);
                let leaf = matches
                    .next()
                    .ok_or_else(|| ValidationError::UnknownLeaf(name.clone()))?;
                if matches.next().is_some() {
                    return Err(ValidationError::AmbiguousLeaf(name.clone()).into());
                }
                leaf.set_value(*value)?;
            }
        }
    }
    Ok(())
}
