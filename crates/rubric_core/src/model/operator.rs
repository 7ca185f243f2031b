//! Binary operators joining sibling components inside a block.
//!
//! # Invariants
//! - Operator at index `i` combines the running fold with child `i + 1`.
//! - Storage and wire names are stable lowercase words.

use serde::{Deserialize, Serialize};

/// Arithmetic operator applied between a fold accumulator and the next sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    /// All operators in declaration order.
    pub const ALL: [Operator; 4] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    /// Stable storage name used by `rubric_actions.operator`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }

    /// Parses a storage name back into an operator.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "add" => Some(Self::Add),
            "subtract" => Some(Self::Subtract),
            "multiply" => Some(Self::Multiply),
            "divide" => Some(Self::Divide),
            _ => None,
        }
    }

    /// Applies the operator to a running value.
    ///
    /// Division by zero leaves `acc` unchanged; callers rely on this instead
    /// of producing `inf`/`NaN`.
    pub fn apply(self, acc: f64, operand: f64) -> f64 {
        match self {
            Self::Add => acc + operand,
            Self::Subtract => acc - operand,
            Self::Multiply => acc * operand,
            Self::Divide => {
                if operand == 0.0 {
                    acc
                } else {
                    acc / operand
                }
            }
        }
    }
}
