//! Gradable component: either a leaf grade or a composite block.
//!
//! # Responsibility
//! - Dispatch evaluation (`grade`, `min`, `max`, `normalized_grade`) by variant.
//! - Provide pre-order leaf traversal used by instance filling.
//!
//! # Invariants
//! - Pre-order leaf order is the order in which leaves appear in documents
//!   and in flattened records.

use crate::model::block::BlockNode;
use crate::model::error::{GradingResult, ValidationResult};
use crate::model::grade::GradeNode;
use serde::{Deserialize, Serialize};

/// Deepest nesting a tree may have, counting the root as level 1.
pub const MAX_TREE_DEPTH: usize = 64;

/// Record discriminator for the two component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Grade,
    Block,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grade => "grade",
            Self::Block => "block",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "grade" => Some(Self::Grade),
            "block" => Some(Self::Block),
            _ => None,
        }
    }
}

/// One component of a rubric tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Grade(GradeNode),
    Block(BlockNode),
}

impl From<GradeNode> for Node {
    fn from(value: GradeNode) -> Self {
        Self::Grade(value)
    }
}

impl From<BlockNode> for Node {
    fn from(value: BlockNode) -> Self {
        Self::Block(value)
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Grade(_) => NodeKind::Grade,
            Self::Block(_) => NodeKind::Block,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Grade(grade) => grade.name(),
            Self::Block(block) => block.name(),
        }
    }

    /// Current value; leaves report their own value, blocks fold children.
    pub fn grade(&self) -> GradingResult<Option<f64>> {
        match self {
            Self::Grade(grade) => Ok(grade.grade()),
            Self::Block(block) => block.grade(),
        }
    }

    pub fn min(&self) -> GradingResult<f64> {
        match self {
            Self::Grade(grade) => Ok(grade.min()),
            Self::Block(block) => block.min(),
        }
    }

    pub fn max(&self) -> GradingResult<f64> {
        match self {
            Self::Grade(grade) => Ok(grade.max()),
            Self::Block(block) => block.max(),
        }
    }

    pub fn normalized_grade(&self) -> GradingResult<Option<f64>> {
        match self {
            Self::Grade(grade) => grade.normalized_grade(),
            Self::Block(block) => block.normalized_grade(),
        }
    }

    /// Checks block operator counts and nesting depth throughout the tree.
    pub fn validate(&self) -> ValidationResult<()> {
        match self {
            Self::Grade(_) => Ok(()),
            Self::Block(block) => block.validate(),
        }
    }

    /// Leaves in pre-order.
    pub fn leaves(&self) -> Vec<&GradeNode> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    /// Mutable leaves in pre-order.
    pub fn leaves_mut(&mut self) -> Vec<&mut GradeNode> {
        let mut out = Vec::new();
        collect_leaves_mut(self, &mut out);
        out
    }

    /// Unsets every leaf value.
    pub fn clear_values(&mut self) {
        for leaf in self.leaves_mut() {
            leaf.clear_value();
        }
    }

    /// Number of nodes in the tree, root included.
    pub fn node_count(&self) -> usize {
        match self {
            Self::Grade(_) => 1,
            Self::Block(block) => 1 + block.children().iter().map(Node::node_count).sum::<usize>(),
        }
    }
}

fn collect_leaves<'a>(node: &'a Node, out: &mut Vec<&'a GradeNode>) {
    match node {
        Node::Grade(grade) => out.push(grade),
        Node::Block(block) => {
            for child in block.children() {
                collect_leaves(child, out);
            }
        }
    }
}

fn collect_leaves_mut<'a>(node: &'a mut Node, out: &mut Vec<&'a mut GradeNode>) {
    match node {
        Node::Grade(grade) => out.push(grade),
        Node::Block(block) => {
            for child in block.children_mut() {
                collect_leaves_mut(child, out);
            }
        }
    }
}
