//! Rubric domain model.
//!
//! # Responsibility
//! - Define leaf/composite components and their evaluation folds.
//! - Define template and instance value types built on the same tree.
//!
//! # Invariants
//! - Components are a tagged union dispatched by `match`.
//! - Every live tree satisfies the operator-count and leaf-parameter rules;
//!   constructors, serde and the codec all enforce them.

pub mod block;
pub mod builder;
pub mod error;
pub mod evaluation;
pub mod grade;
pub mod instance;
pub mod node;
pub mod operator;
pub mod template;
