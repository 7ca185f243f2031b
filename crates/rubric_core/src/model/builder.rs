//! Arena-backed rubric builder.
//!
//! # Responsibility
//! - Let callers assemble a tree by id instead of holding nested `&mut`.
//! - Validate operator counts once, when the owned tree is produced.
//!
//! # Invariants
//! - Slot `0` is always the root block.
//! - Slots are only appended; a `NodeId` stays valid for the builder lifetime.

use crate::model::block::BlockNode;
use crate::model::error::{ValidationError, ValidationResult};
use crate::model::grade::GradeNode;
use crate::model::node::Node;
use crate::model::operator::Operator;

/// Index of one slot in a [`TreeBuilder`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
enum Slot {
    Grade(GradeNode),
    Block {
        name: String,
        children: Vec<NodeId>,
        operators: Vec<Operator>,
    },
}

/// Builder owning every node of a tree under construction.
#[derive(Debug)]
pub struct TreeBuilder {
    slots: Vec<Slot>,
}

impl TreeBuilder {
    /// Starts a tree whose root is an empty block.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            slots: vec![Slot::Block {
                name: root_name.into(),
                children: Vec::new(),
                operators: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Appends a leaf under `parent`.
    pub fn add_grade(&mut self, parent: NodeId, grade: GradeNode) -> ValidationResult<NodeId> {
        self.attach(parent, Slot::Grade(grade))
    }

    /// Appends an empty block under `parent`.
    pub fn add_block(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
    ) -> ValidationResult<NodeId> {
        self.attach(
            parent,
            Slot::Block {
                name: name.into(),
                children: Vec::new(),
                operators: Vec::new(),
            },
        )
    }

    /// Appends an operator to `block`.
    pub fn add_operator(&mut self, block: NodeId, operator: Operator) -> ValidationResult<()> {
        let (_, operators) = self.block_lists_mut(block)?;
        operators.push(operator);
        Ok(())
    }

    /// Appends `operator` then `grade`, or only `grade` when `parent` is empty.
    pub fn push(
        &mut self,
        parent: NodeId,
        operator: Operator,
        grade: GradeNode,
    ) -> ValidationResult<NodeId> {
        let (children, _) = self.block_lists_mut(parent)?;
        if !children.is_empty() {
            self.add_operator(parent, operator)?;
        }
        self.add_grade(parent, grade)
    }

    /// Produces the owned tree after checking operator counts and depth.
    pub fn build(self) -> ValidationResult<BlockNode> {
        let mut slots: Vec<Option<Slot>> = self.slots.into_iter().map(Some).collect();
        match assemble(&mut slots, NodeId(0))? {
            Node::Block(block) => {
                block.validate()?;
                Ok(block)
            }
            Node::Grade(_) => Err(ValidationError::NotABlock(0)),
        }
    }

    fn attach(&mut self, parent: NodeId, slot: Slot) -> ValidationResult<NodeId> {
        let id = NodeId(self.slots.len());
        let (children, _) = self.block_lists_mut(parent)?;
        children.push(id);
        self.slots.push(slot);
        Ok(id)
    }

    fn block_lists_mut(
        &mut self,
        id: NodeId,
    ) -> ValidationResult<(&mut Vec<NodeId>, &mut Vec<Operator>)> {
        match self.slots.get_mut(id.0) {
            Some(Slot::Block {
                children,
                operators,
                ..
            }) => Ok((children, operators)),
            Some(Slot::Grade(_)) => Err(ValidationError::NotABlock(id.0)),
            None => Err(ValidationError::UnknownNode(id.0)),
        }
    }
}

fn assemble(slots: &mut [Option<Slot>], id: NodeId) -> ValidationResult<Node> {
    let slot = slots
        .get_mut(id.0)
        .and_then(Option::take)
        .ok_or(ValidationError::UnknownNode(id.0))?;
    match slot {
        Slot::Grade(grade) => Ok(Node::Grade(grade)),
        Slot::Block {
            name,
            children,
            operators,
        } => {
            let children = children
                .into_iter()
                .map(|child| assemble(slots, child))
                .collect::<ValidationResult<Vec<_>>>()?;
            Ok(Node::Block(BlockNode::new(name, children, operators)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TreeBuilder;
    use crate::model::error::ValidationError;
    use crate::model::grade::GradeNode;
    use crate::model::operator::Operator;

    fn grade(name: &str) -> GradeNode {
        GradeNode::new(name, 1.0, 10.0, 1.0).unwrap()
    }

    #[test]
    fn builds_nested_tree_in_insertion_order() {
        let mut builder = TreeBuilder::new("Album");
        let root = builder.root();
        builder.add_grade(root, grade("Lyrics")).unwrap();
        builder.add_operator(root, Operator::Add).unwrap();
        let sound = builder.add_block(root, "Sound").unwrap();
        builder.push(sound, Operator::Add, grade("Mix")).unwrap();
        builder.push(sound, Operator::Multiply, grade("Master")).unwrap();

        let tree = builder.build().unwrap();
        assert_eq!(tree.name(), "Album");
        assert_eq!(tree.operators(), &[Operator::Add]);
        assert_eq!(tree.children()[1].name(), "Sound");
        match &tree.children()[1] {
            crate::model::node::Node::Block(sound) => {
                assert_eq!(sound.operators(), &[Operator::Multiply]);
                assert_eq!(sound.children().len(), 2);
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn build_rejects_missing_operator() {
        let mut builder = TreeBuilder::new("Album");
        let root = builder.root();
        builder.add_grade(root, grade("a")).unwrap();
        builder.add_grade(root, grade("b")).unwrap();

        assert!(matches!(
            builder.build(),
            Err(ValidationError::OperatorCountMismatch { children: 2, operators: 0, .. })
        ));
    }

    #[test]
    fn attaching_to_leaf_or_unknown_slot_fails() {
        let mut builder = TreeBuilder::new("Album");
        let root = builder.root();
        let leaf = builder.add_grade(root, grade("a")).unwrap();

        assert_eq!(
            builder.add_grade(leaf, grade("b")).unwrap_err(),
            ValidationError::NotABlock(leaf.index())
        );
        assert_eq!(
            builder.add_operator(super::NodeId(42), Operator::Add).unwrap_err(),
            ValidationError::UnknownNode(42)
        );
    }
}
