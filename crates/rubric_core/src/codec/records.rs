//! Flattened record shapes for one rubric tree.

use crate::model::node::NodeKind;
use crate::model::operator::Operator;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Synthetic identifier of one flattened component.
pub type ComponentId = Uuid;

/// One component row.
///
/// Leaf parameters are set only for `kind == NodeKind::Grade`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub component_id: ComponentId,
    /// `None` for the tree root.
    pub parent_id: Option<ComponentId>,
    pub kind: NodeKind,
    /// Position among siblings, `0..n` without gaps.
    pub order_index: u32,
    pub name: String,
    pub description: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub value: Option<f64>,
}

/// One operator row; `operator_index = k` joins children `k` and `k + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub parent_id: ComponentId,
    pub operator_index: u32,
    pub operator: Operator,
}

/// Complete record set of one tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatTree {
    pub components: Vec<ComponentRecord>,
    pub actions: Vec<ActionRecord>,
}
