//! Tree <-> record set mapping.
//!
//! # Responsibility
//! - `flatten`: pre-order walk emitting one component row per node and one
//!   action row per operator.
//! - `reconstruct`: rebuild the tree, checking ordering invariants at every
//!   level.
//!
//! # Invariants
//! - Sibling `order_index` values form `0..n` with no gaps or duplicates.
//! - Operator rows under a block form `0..n-1` for `n` children.
//! - Reconstruction is all-or-nothing; no partial tree is returned.

use crate::codec::records::{ActionRecord, ComponentId, ComponentRecord, FlatTree};
use crate::model::block::BlockNode;
use crate::model::error::ValidationError;
use crate::model::grade::GradeNode;
use crate::model::node::{Node, NodeKind};
use crate::model::operator::Operator;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub use crate::model::node::MAX_TREE_DEPTH;

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, MalformedTreeError>;

/// Record set that cannot be turned back into a valid tree.
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedTreeError {
    /// No record without a parent.
    MissingRoot,
    /// More than one record without a parent.
    MultipleRoots { count: usize },
    /// Root record expected to be a block.
    RootNotBlock(ComponentId),
    /// Two records share one id.
    DuplicateComponent(ComponentId),
    /// Record points at a parent that is not in the set.
    UnknownParent {
        component: ComponentId,
        parent: ComponentId,
    },
    /// Record points at a leaf as parent.
    ParentNotBlock {
        component: ComponentId,
        parent: ComponentId,
    },
    /// Sibling order skips a position.
    OrderGap {
        parent: Option<ComponentId>,
        expected: u32,
        found: u32,
    },
    /// Two siblings share a position.
    DuplicateOrder {
        parent: Option<ComponentId>,
        order_index: u32,
    },
    /// Operator rows do not number `children - 1`.
    OperatorCountMismatch {
        parent: ComponentId,
        children: usize,
        operators: usize,
    },
    /// Operator rows are not numbered `0..n-1`.
    OperatorIndexMismatch {
        parent: ComponentId,
        expected: u32,
        found: u32,
    },
    /// Operator rows reference a missing or leaf parent.
    OrphanAction { parent: ComponentId },
    /// Records not connected to the root (e.g. a parent cycle).
    Unreachable { count: usize },
    /// Leaf row lacks `min`, `max` or `step`.
    MissingLeafParameter(ComponentId),
    /// Leaf row violates leaf parameter or stored value rules.
    InvalidLeaf {
        component: ComponentId,
        source: ValidationError,
    },
    /// Nesting exceeds [`MAX_TREE_DEPTH`].
    TooDeep { limit: usize },
}

impl Display for MalformedTreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed rubric tree: ")?;
        match self {
            Self::MissingRoot => write!(f, "no root component"),
            Self::MultipleRoots { count } => write!(f, "{count} root components"),
            Self::RootNotBlock(id) => write!(f, "root component {id} is not a block"),
            Self::DuplicateComponent(id) => write!(f, "duplicate component {id}"),
            Self::UnknownParent { component, parent } => {
                write!(f, "component {component} references unknown parent {parent}")
            }
            Self::ParentNotBlock { component, parent } => {
                write!(f, "component {component} is attached to leaf {parent}")
            }
            Self::OrderGap {
                parent,
                expected,
                found,
            } => write!(
                f,
                "order under {} expected {expected}, found {found}",
                display_parent(parent)
            ),
            Self::DuplicateOrder {
                parent,
                order_index,
            } => write!(
                f,
                "order {order_index} repeated under {}",
                display_parent(parent)
            ),
            Self::OperatorCountMismatch {
                parent,
                children,
                operators,
            } => write!(
                f,
                "block {parent} has {children} components but {operators} operators"
            ),
            Self::OperatorIndexMismatch {
                parent,
                expected,
                found,
            } => write!(
                f,
                "operator index under {parent} expected {expected}, found {found}"
            ),
            Self::OrphanAction { parent } => {
                write!(f, "operators reference missing or leaf component {parent}")
            }
            Self::Unreachable { count } => {
                write!(f, "{count} components are not connected to the root")
            }
            Self::MissingLeafParameter(id) => {
                write!(f, "grade component {id} is missing min/max/step")
            }
            Self::InvalidLeaf { component, source } => {
                write!(f, "grade component {component}: {source}")
            }
            Self::TooDeep { limit } => write!(f, "nesting deeper than {limit}"),
        }
    }
}

impl Error for MalformedTreeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidLeaf { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn display_parent(parent: &Option<ComponentId>) -> String {
    parent.map_or_else(|| "root".to_string(), |id| id.to_string())
}

/// Flattens `root` into component and action rows.
///
/// Component ids are fresh v4 uuids; row order and indices are deterministic.
pub fn flatten(root: &Node) -> FlatTree {
    let mut out = FlatTree::default();
    flatten_into(root, None, 0, &mut out);
    out
}

/// [`flatten`] for a block held outside a [`Node`].
pub fn flatten_block(root: &BlockNode) -> FlatTree {
    let mut out = FlatTree::default();
    flatten_block_into(root, None, 0, &mut out);
    out
}

fn flatten_into(node: &Node, parent_id: Option<ComponentId>, order_index: u32, out: &mut FlatTree) {
    match node {
        Node::Grade(grade) => out.components.push(ComponentRecord {
            component_id: Uuid::new_v4(),
            parent_id,
            kind: NodeKind::Grade,
            order_index,
            name: grade.name().to_string(),
            description: grade.description().map(str::to_string),
            min: Some(grade.min()),
            max: Some(grade.max()),
            step: Some(grade.step()),
            value: grade.grade(),
        }),
        Node::Block(block) => flatten_block_into(block, parent_id, order_index, out),
    }
}

fn flatten_block_into(
    block: &BlockNode,
    parent_id: Option<ComponentId>,
    order_index: u32,
    out: &mut FlatTree,
) {
    let component_id = Uuid::new_v4();
    out.components.push(ComponentRecord {
        component_id,
        parent_id,
        kind: NodeKind::Block,
        order_index,
        name: block.name().to_string(),
        description: None,
        min: None,
        max: None,
        step: None,
        value: None,
    });
    for (index, operator) in block.operators().iter().enumerate() {
        out.actions.push(ActionRecord {
            parent_id: component_id,
            operator_index: index as u32,
            operator: *operator,
        });
    }
    for (index, child) in block.children().iter().enumerate() {
        flatten_into(child, Some(component_id), index as u32, out);
    }
}

/// Rebuilds a tree from its records.
///
/// # Errors
/// - Any [`MalformedTreeError`]; the first violation found is reported.
pub fn reconstruct(
    components: &[ComponentRecord],
    actions: &[ActionRecord],
) -> CodecResult<Node> {
    let mut by_id: HashMap<ComponentId, &ComponentRecord> =
        HashMap::with_capacity(components.len());
    for record in components {
        if by_id.insert(record.component_id, record).is_some() {
            return Err(MalformedTreeError::DuplicateComponent(record.component_id));
        }
    }

    let mut roots = Vec::new();
    let mut children: HashMap<ComponentId, Vec<&ComponentRecord>> = HashMap::new();
    for record in components {
        let Some(parent) = record.parent_id else {
            roots.push(record);
            continue;
        };
        match by_id.get(&parent) {
            None => {
                return Err(MalformedTreeError::UnknownParent {
                    component: record.component_id,
                    parent,
                })
            }
            Some(parent_record) if parent_record.kind != NodeKind::Block => {
                return Err(MalformedTreeError::ParentNotBlock {
                    component: record.component_id,
                    parent,
                })
            }
            Some(_) => children.entry(parent).or_default().push(record),
        }
    }

    let root = match roots.as_slice() {
        [] => return Err(MalformedTreeError::MissingRoot),
        [root] => *root,
        many => return Err(MalformedTreeError::MultipleRoots { count: many.len() }),
    };
    if root.order_index != 0 {
        return Err(MalformedTreeError::OrderGap {
            parent: None,
            expected: 0,
            found: root.order_index,
        });
    }

    let mut operators: HashMap<ComponentId, Vec<&ActionRecord>> = HashMap::new();
    for action in actions {
        match by_id.get(&action.parent_id) {
            Some(parent) if parent.kind == NodeKind::Block => {
                operators.entry(action.parent_id).or_default().push(action)
            }
            _ => {
                return Err(MalformedTreeError::OrphanAction {
                    parent: action.parent_id,
                })
            }
        }
    }

    let mut context = Context {
        children,
        operators,
        built: 0,
    };
    let tree = context.build(root, 1)?;
    if context.built != components.len() {
        return Err(MalformedTreeError::Unreachable {
            count: components.len() - context.built,
        });
    }
    Ok(tree)
}

/// [`reconstruct`] for trees whose root must be a block.
pub fn reconstruct_block(
    components: &[ComponentRecord],
    actions: &[ActionRecord],
) -> CodecResult<BlockNode> {
    let root_id = components
        .iter()
        .find(|record| record.parent_id.is_none())
        .map(|record| record.component_id);
    match reconstruct(components, actions)? {
        Node::Block(block) => Ok(block),
        Node::Grade(_) => Err(MalformedTreeError::RootNotBlock(
            root_id.unwrap_or_else(Uuid::nil),
        )),
    }
}

struct Context<'a> {
    children: HashMap<ComponentId, Vec<&'a ComponentRecord>>,
    operators: HashMap<ComponentId, Vec<&'a ActionRecord>>,
    built: usize,
}

impl<'a> Context<'a> {
    fn build(&mut self, record: &'a ComponentRecord, depth: usize) -> CodecResult<Node> {
        if depth > MAX_TREE_DEPTH {
            return Err(MalformedTreeError::TooDeep {
                limit: MAX_TREE_DEPTH,
            });
        }
        self.built += 1;

        match record.kind {
            NodeKind::Grade => build_leaf(record).map(Node::Grade),
            NodeKind::Block => {
                let parent = record.component_id;
                let mut kids = self.children.remove(&parent).unwrap_or_default();
                kids.sort_by_key(|child| child.order_index);
                check_contiguous(Some(parent), &kids)?;

                let operators = ordered_operators(
                    parent,
                    kids.len(),
                    self.operators.remove(&parent).unwrap_or_default(),
                )?;

                let mut nodes = Vec::with_capacity(kids.len());
                for kid in kids {
                    nodes.push(self.build(kid, depth + 1)?);
                }

                let (child_count, operator_count) = (nodes.len(), operators.len());
                let block = BlockNode::new(record.name.clone(), nodes, operators).map_err(|_| {
                    MalformedTreeError::OperatorCountMismatch {
                        parent,
                        children: child_count,
                        operators: operator_count,
                    }
                })?;
                Ok(Node::Block(block))
            }
        }
    }
}

fn check_contiguous(parent: Option<ComponentId>, sorted: &[&ComponentRecord]) -> CodecResult<()> {
    let mut previous: Option<u32> = None;
    for (expected, record) in sorted.iter().enumerate() {
        let found = record.order_index;
        if previous == Some(found) {
            return Err(MalformedTreeError::DuplicateOrder {
                parent,
                order_index: found,
            });
        }
        if found != expected as u32 {
            return Err(MalformedTreeError::OrderGap {
                parent,
                expected: expected as u32,
                found,
            });
        }
        previous = Some(found);
    }
    Ok(())
}

fn ordered_operators(
    parent: ComponentId,
    child_count: usize,
    mut actions: Vec<&ActionRecord>,
) -> CodecResult<Vec<Operator>> {
    let expected_count = child_count.saturating_sub(1);
    if actions.len() != expected_count {
        return Err(MalformedTreeError::OperatorCountMismatch {
            parent,
            children: child_count,
            operators: actions.len(),
        });
    }

    actions.sort_by_key(|action| action.operator_index);
    actions
        .iter()
        .enumerate()
        .map(|(expected, action)| {
            if action.operator_index != expected as u32 {
                return Err(MalformedTreeError::OperatorIndexMismatch {
                    parent,
                    expected: expected as u32,
                    found: action.operator_index,
                });
            }
            Ok(action.operator)
        })
        .collect()
}

fn build_leaf(record: &ComponentRecord) -> CodecResult<GradeNode> {
    let (Some(min), Some(max), Some(step)) = (record.min, record.max, record.step) else {
        return Err(MalformedTreeError::MissingLeafParameter(record.component_id));
    };
    let grade = GradeNode::restore(record.name.clone(), min, max, step, record.value).map_err(
        |source| MalformedTreeError::InvalidLeaf {
            component: record.component_id,
            source,
        },
    )?;
    Ok(match &record.description {
        Some(description) => grade.with_description(description.clone()),
        None => grade,
    })
}
