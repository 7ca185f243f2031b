//! One-shot evaluation summary of a rubric tree.

use crate::model::block::BlockNode;
use crate::model::error::GradingResult;
use crate::model::grade::normalize;
use crate::model::node::Node;
use serde::{Deserialize, Serialize};

/// Aggregate view of a tree: folded grade, reachable bounds, normalized grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// `None` while no leaf contributing to the fold has a value.
    pub grade: Option<f64>,
    pub min: f64,
    pub max: f64,
    /// `grade` on the `1..=10` scale.
    pub normalized: Option<f64>,
}

/// Evaluates `node` once, reusing the computed bounds for normalization.
///
/// # Errors
/// - `EmptyBlock` when any block on the evaluated path has no components.
/// - `DegenerateRange` when a grade is present and `min == max`.
pub fn evaluate(node: &Node) -> GradingResult<Evaluation> {
    summarize(node.grade()?, node.min()?, node.max()?)
}

/// [`evaluate`] for a block held outside a [`Node`].
pub fn evaluate_block(block: &BlockNode) -> GradingResult<Evaluation> {
    summarize(block.grade()?, block.min()?, block.max()?)
}

fn summarize(grade: Option<f64>, min: f64, max: f64) -> GradingResult<Evaluation> {
    let normalized = grade.map(|value| normalize(value, min, max)).transpose()?;
    Ok(Evaluation {
        grade,
        min,
        max,
        normalized,
    })
}
