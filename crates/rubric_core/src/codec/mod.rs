//! Relational mapping for rubric trees.
//!
//! # Responsibility
//! - Flatten a tree into component/operator rows keyed by synthetic ids.
//! - Rebuild the exact tree (sibling order, operator order, leaf values)
//!   from those rows.
//!
//! # Invariants
//! - `reconstruct(flatten(t)) == t` for every valid tree `t`.
//! - Codec logic is pure; storage is the repository layer's concern.

pub mod records;
pub mod tree_codec;

pub use records::{ActionRecord, ComponentId, ComponentRecord, FlatTree};
pub use tree_codec::{
    flatten, flatten_block, reconstruct, reconstruct_block, CodecResult, MalformedTreeError,
    MAX_TREE_DEPTH,
};
