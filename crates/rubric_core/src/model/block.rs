//! Composite evaluator combining ordered components through ordered operators.
//!
//! # Responsibility
//! - Fold child grades left-to-right with per-edge operators.
//! - Propagate the reachable minimum and maximum through the same folds.
//!
//! # Invariants
//! - A valid block has `operators.len() == max(children.len() - 1, 0)`.
//! - `operators[i]` joins the fold so far with `children[i + 1]`.
//! - `add_child`/`add_operator` do not check counts; [`BlockNode::validate`]
//!   does, and every persisted or deserialized block passes through it.
//!
//! # Open question
//! - `grade()` skips an unset child together with the operator in front of
//!   it instead of re-pairing operators with the remaining children. This is
//!   kept as-is pending product confirmation.
//! - When the first child is unset there is no left operand, so the first
//!   set child seeds the fold and its own operator is not applied. A block
//!   whose children are all unset grades to `None`.

use crate::model::error::{GradingError, GradingResult, ValidationError, ValidationResult};
use crate::model::grade::normalize;
use crate::model::node::{Node, MAX_TREE_DEPTH};
use crate::model::operator::Operator;
use serde::{Deserialize, Serialize};

/// Named group of components joined by binary operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BlockNodeFields")]
pub struct BlockNode {
    name: String,
    children: Vec<Node>,
    operators: Vec<Operator>,
}

#[derive(Deserialize)]
struct BlockNodeFields {
    name: String,
    #[serde(default)]
    children: Vec<Node>,
    #[serde(default)]
    operators: Vec<Operator>,
}

impl TryFrom<BlockNodeFields> for BlockNode {
    type Error = ValidationError;

    fn try_from(fields: BlockNodeFields) -> Result<Self, Self::Error> {
        BlockNode::new(fields.name, fields.children, fields.operators)
    }
}

impl BlockNode {
    /// Creates a block and checks the operator count of this level.
    ///
    /// Children are assumed valid; nested blocks built through this
    /// constructor or serde already are.
    pub fn new(
        name: impl Into<String>,
        children: Vec<Node>,
        operators: Vec<Operator>,
    ) -> ValidationResult<Self> {
        let block = Self {
            name: name.into(),
            children,
            operators,
        };
        block.check_operator_count()?;
        Ok(block)
    }

    /// Creates a block with no components.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            operators: Vec::new(),
        }
    }

    /// Appends one component. Structural builder; counts are not checked.
    pub fn add_child(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    /// Appends one operator. Structural builder; counts are not checked.
    pub fn add_operator(&mut self, operator: Operator) {
        self.operators.push(operator);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Node] {
        &mut self.children
    }

    /// Checks operator counts on this block and every nested block, and
    /// that no component sits deeper than [`MAX_TREE_DEPTH`] with this block
    /// as level 1.
    pub fn validate(&self) -> ValidationResult<()> {
        self.validate_at(1)
    }

    fn validate_at(&self, depth: usize) -> ValidationResult<()> {
        self.check_operator_count()?;
        if self.children.is_empty() {
            return Ok(());
        }
        if depth >= MAX_TREE_DEPTH {
            return Err(ValidationError::TooDeep {
                limit: MAX_TREE_DEPTH,
            });
        }
        for child in &self.children {
            if let Node::Block(block) = child {
                block.validate_at(depth + 1)?;
            }
        }
        Ok(())
    }

    /// Folded grade of the components.
    ///
    /// An unset child is skipped and the operator in front of it is dropped
    /// with it. Division by zero leaves the fold unchanged. When the first
    /// child is unset, the first set child seeds the fold.
    ///
    /// # Errors
    /// - `EmptyBlock` when this block or a nested one has no components.
    pub fn grade(&self) -> GradingResult<Option<f64>> {
        let (first, rest) = self.split_children()?;
        let mut result = first.grade()?;
        for (child, operator) in rest.iter().zip(&self.operators) {
            let Some(operand) = child.grade()? else {
                continue;
            };
            result = Some(match result {
                Some(acc) => operator.apply(acc, operand),
                None => operand,
            });
        }
        Ok(result)
    }

    /// Largest value the fold can reach.
    pub fn max(&self) -> GradingResult<f64> {
        let (first, rest) = self.split_children()?;
        let mut result = first.max()?;
        for (child, operator) in rest.iter().zip(&self.operators) {
            result = match operator {
                Operator::Add => result + child.max()?,
                Operator::Subtract => result - child.min()?,
                Operator::Multiply => result * child.max()?,
                Operator::Divide => {
                    let divisor = child.min()?;
                    if divisor > 0.0 {
                        result / divisor
                    } else {
                        result
                    }
                }
            };
        }
        Ok(result)
    }

    /// Smallest value the fold can reach.
    pub fn min(&self) -> GradingResult<f64> {
        let (first, rest) = self.split_children()?;
        let mut result = first.min()?;
        for (child, operator) in rest.iter().zip(&self.operators) {
            result = match operator {
                Operator::Add => result + child.min()?,
                Operator::Subtract => result - child.max()?,
                Operator::Multiply => result * child.min()?,
                Operator::Divide => {
                    let divisor = child.max()?;
                    if divisor != 0.0 {
                        result / divisor
                    } else {
                        result
                    }
                }
            };
        }
        Ok(result)
    }

    /// Folded grade mapped onto `1..=10` using this block's own bounds.
    pub fn normalized_grade(&self) -> GradingResult<Option<f64>> {
        match self.grade()? {
            Some(value) => normalize(value, self.min()?, self.max()?).map(Some),
            None => Ok(None),
        }
    }

    fn split_children(&self) -> GradingResult<(&Node, &[Node])> {
        self.children
            .split_first()
            .ok_or_else(|| GradingError::EmptyBlock {
                name: self.name.clone(),
            })
    }

    fn check_operator_count(&self) -> ValidationResult<()> {
        let expected = self.children.len().saturating_sub(1);
        if self.operators.len() != expected {
            return Err(ValidationError::OperatorCountMismatch {
                block: self.name.clone(),
                children: self.children.len(),
                operators: self.operators.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::BlockNode;
    use crate::model::error::{GradingError, ValidationError};
    use crate::model::grade::GradeNode;
    use crate::model::node::{Node, MAX_TREE_DEPTH};
    use crate::model::operator::Operator;

    fn leaf(name: &str, min: f64, max: f64, value: Option<f64>) -> Node {
        let mut grade = GradeNode::new(name, min, max, 1.0).unwrap();
        if let Some(value) = value {
            grade.set_value(value).unwrap();
        }
        Node::Grade(grade)
    }

    #[test]
    fn single_child_passes_through() {
        let block = BlockNode::new("solo", vec![leaf("a", 2.0, 9.0, Some(4.0))], vec![]).unwrap();
        assert_eq!(block.grade().unwrap(), Some(4.0));
        assert_eq!(block.min().unwrap(), 2.0);
        assert_eq!(block.max().unwrap(), 9.0);
    }

    #[test]
    fn divide_by_zero_grade_is_skipped() {
        let block = BlockNode::new(
            "ratio",
            vec![leaf("a", 0.0, 10.0, Some(10.0)), leaf("b", 0.0, 10.0, Some(0.0))],
            vec![Operator::Divide],
        )
        .unwrap();
        assert_eq!(block.grade().unwrap(), Some(10.0));
    }

    #[test]
    fn unset_child_drops_its_operator() {
        let block = BlockNode::new(
            "partial",
            vec![
                leaf("a", 0.0, 10.0, Some(5.0)),
                leaf("b", 0.0, 10.0, None),
                leaf("c", 0.0, 10.0, Some(3.0)),
            ],
            vec![Operator::Add, Operator::Subtract],
        )
        .unwrap();
        assert_eq!(block.grade().unwrap(), Some(2.0));
    }

    #[test]
    fn unset_first_child_is_seeded_by_next_value() {
        let block = BlockNode::new(
            "late",
            vec![leaf("a", 0.0, 10.0, None), leaf("b", 0.0, 10.0, Some(6.0))],
            vec![Operator::Subtract],
        )
        .unwrap();
        assert_eq!(block.grade().unwrap(), Some(6.0));
    }

    #[test]
    fn all_children_unset_yields_none() {
        let block = BlockNode::new(
            "blank",
            vec![leaf("a", 0.0, 10.0, None), leaf("b", 0.0, 10.0, None)],
            vec![Operator::Add],
        )
        .unwrap();
        assert_eq!(block.grade().unwrap(), None);
        assert_eq!(block.normalized_grade().unwrap(), None);
    }

    #[test]
    fn bounds_pick_the_extreme_operand_per_operator() {
        let children = || vec![leaf("a", 1.0, 10.0, None), leaf("b", 2.0, 5.0, None)];

        let sub = BlockNode::new("sub", children(), vec![Operator::Subtract]).unwrap();
        assert_eq!(sub.max().unwrap(), 8.0);
        assert_eq!(sub.min().unwrap(), -4.0);

        let mul = BlockNode::new("mul", children(), vec![Operator::Multiply]).unwrap();
        assert_eq!(mul.max().unwrap(), 50.0);
        assert_eq!(mul.min().unwrap(), 2.0);

        let div = BlockNode::new("div", children(), vec![Operator::Divide]).unwrap();
        assert_eq!(div.max().unwrap(), 5.0);
        assert_eq!(div.min().unwrap(), 0.2);
    }

    #[test]
    fn divide_bounds_guard_non_positive_divisors() {
        let block = BlockNode::new(
            "guarded",
            vec![leaf("a", 1.0, 10.0, None), leaf("b", 0.0, 4.0, None)],
            vec![Operator::Divide],
        )
        .unwrap();
        assert_eq!(block.max().unwrap(), 10.0);
        assert_eq!(block.min().unwrap(), 0.25);

        let zero_top = BlockNode::new(
            "zero_top",
            vec![leaf("a", 1.0, 10.0, None), leaf("b", -4.0, 0.0, None)],
            vec![Operator::Divide],
        )
        .unwrap();
        assert_eq!(zero_top.min().unwrap(), 1.0);
        assert_eq!(zero_top.max().unwrap(), 10.0);
    }

    #[test]
    fn empty_block_reports_error() {
        let block = BlockNode::empty("todo");
        let expected = GradingError::EmptyBlock {
            name: "todo".to_string(),
        };
        assert_eq!(block.grade().unwrap_err(), expected);
        assert_eq!(block.min().unwrap_err(), expected);
        assert_eq!(block.max().unwrap_err(), expected);
    }

    #[test]
    fn nested_empty_block_propagates() {
        let block = BlockNode::new(
            "outer",
            vec![leaf("a", 0.0, 10.0, Some(1.0)), Node::Block(BlockNode::empty("inner"))],
            vec![Operator::Add],
        )
        .unwrap();
        assert!(matches!(
            block.grade(),
            Err(GradingError::EmptyBlock { name }) if name == "inner"
        ));
    }

    #[test]
    fn new_rejects_operator_count_mismatch() {
        let err = BlockNode::new(
            "short",
            vec![
                leaf("a", 0.0, 10.0, None),
                leaf("b", 0.0, 10.0, None),
                leaf("c", 0.0, 10.0, None),
            ],
            vec![Operator::Add],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::OperatorCountMismatch {
                block: "short".to_string(),
                children: 3,
                operators: 1,
            }
        );
    }

    #[test]
    fn validate_descends_into_nested_blocks() {
        let mut inner = BlockNode::empty("inner");
        inner.add_child(leaf("a", 0.0, 10.0, None));
        inner.add_child(leaf("b", 0.0, 10.0, None));

        let mut outer = BlockNode::empty("outer");
        outer.add_child(inner);
        assert!(matches!(
            outer.validate(),
            Err(ValidationError::OperatorCountMismatch { block, .. }) if block == "inner"
        ));
    }

    fn chain(levels: usize, innermost: Node) -> BlockNode {
        let mut block = BlockNode::new("level", vec![innermost], vec![]).unwrap();
        for _ in 1..levels {
            block = BlockNode::new("level", vec![block.into()], vec![]).unwrap();
        }
        block
    }

    #[test]
    fn validate_counts_root_as_first_level() {
        let deepest_leaf = chain(MAX_TREE_DEPTH - 1, leaf("a", 0.0, 10.0, Some(3.0)));
        assert_eq!(deepest_leaf.validate(), Ok(()));
        assert_eq!(deepest_leaf.grade().unwrap(), Some(3.0));

        let deepest_empty = chain(MAX_TREE_DEPTH - 1, BlockNode::empty("tail").into());
        assert_eq!(deepest_empty.validate(), Ok(()));

        let too_deep = chain(MAX_TREE_DEPTH, leaf("a", 0.0, 10.0, None));
        assert_eq!(
            too_deep.validate(),
            Err(ValidationError::TooDeep {
                limit: MAX_TREE_DEPTH
            })
        );
    }
}
