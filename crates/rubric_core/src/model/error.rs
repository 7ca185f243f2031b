//! Error taxonomy for evaluation and rubric definition checks.
//!
//! # Responsibility
//! - `GradingError`: expected failures while evaluating or filling a tree.
//! - `ValidationError`: malformed rubric definitions and value maps.
//!
//! # Invariants
//! - Both are returned to the caller as values; nothing in the model panics.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result alias for evaluation operations.
pub type GradingResult<T> = Result<T, GradingError>;

/// Result alias for definition checks.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Failures raised while evaluating or filling a rubric tree.
#[derive(Debug, Clone, PartialEq)]
pub enum GradingError {
    /// Leaf value falls outside `[min, max]` after step rounding.
    OutOfRange {
        attempted: f64,
        min: f64,
        max: f64,
        step: f64,
    },
    /// Normalization requested on a node whose range collapses to a point.
    DegenerateRange { min: f64, max: f64 },
    /// Grade/min/max requested on a block with no children.
    EmptyBlock { name: String },
}

impl Display for GradingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange {
                attempted,
                min,
                max,
                step,
            } => write!(
                f,
                "value {attempted} is outside [{min}, {max}] with step {step}"
            ),
            Self::DegenerateRange { min, max } => {
                write!(f, "cannot normalize over degenerate range [{min}, {max}]")
            }
            Self::EmptyBlock { name } => write!(f, "block `{name}` has no components"),
        }
    }
}

impl Error for GradingError {}

/// Malformed rubric definition or leaf value map.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Template or component name is blank after trim.
    BlankName,
    /// Leaf parameter is NaN or infinite.
    NonFiniteParameter { leaf: String },
    /// Leaf step is zero or negative.
    NonPositiveStep { leaf: String, step: f64 },
    /// Leaf `min >= max`.
    InvertedRange { leaf: String, min: f64, max: f64 },
    /// Block operator list does not have `children - 1` entries.
    OperatorCountMismatch {
        block: String,
        children: usize,
        operators: usize,
    },
    /// Stored leaf value violates range or step quantization.
    InvalidStoredValue { leaf: String, value: f64 },
    /// Named value does not match any leaf.
    UnknownLeaf(String),
    /// Named value matches more than one leaf.
    AmbiguousLeaf(String),
    /// Ordered value list length differs from leaf count.
    LeafCountMismatch { expected: usize, actual: usize },
    /// Builder referenced a slot that does not exist.
    UnknownNode(usize),
    /// Builder tried to attach children or operators to a leaf.
    NotABlock(usize),
    /// Tree nests deeper than the storable limit.
    TooDeep { limit: usize },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "name must not be blank"),
            Self::NonFiniteParameter { leaf } => {
                write!(f, "grade `{leaf}` has a non-finite parameter")
            }
            Self::NonPositiveStep { leaf, step } => {
                write!(f, "grade `{leaf}` step must be > 0, got {step}")
            }
            Self::InvertedRange { leaf, min, max } => {
                write!(f, "grade `{leaf}` requires min < max, got [{min}, {max}]")
            }
            Self::OperatorCountMismatch {
                block,
                children,
                operators,
            } => write!(
                f,
                "block `{block}` has {children} components but {operators} operators"
            ),
            Self::InvalidStoredValue { leaf, value } => {
                write!(f, "grade `{leaf}` holds unreachable value {value}")
            }
            Self::UnknownLeaf(name) => write!(f, "no grade named `{name}`"),
            Self::AmbiguousLeaf(name) => write!(f, "more than one grade named `{name}`"),
            Self::LeafCountMismatch { expected, actual } => {
                write!(f, "expected {expected} grade values, got {actual}")
            }
            Self::UnknownNode(id) => write!(f, "builder node {id} does not exist"),
            Self::NotABlock(id) => write!(f, "builder node {id} is not a block"),
            Self::TooDeep { limit } => write!(f, "rubric nests deeper than {limit} levels"),
        }
    }
}

impl Error for ValidationError {}
