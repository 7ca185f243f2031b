//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Store template/instance headers and their flattened record sets.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Replace-all writes run in one immediate transaction.
//! - Repositories never interpret tree shape; the codec does.

mod component_store;
pub mod error;
pub mod instance_repo;
mod schema;
pub mod template_repo;

pub use error::{RepoError, RepoResult};
