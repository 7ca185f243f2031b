//! Rubric storage bootstrap.
//!
//! # Responsibility
//! - Open rubric databases with foreign keys and a busy timeout.
//! - Bring the rubric schema up to the version this build understands.
//!
//! # Invariants
//! - The rubric schema version lives in `PRAGMA user_version`.
//! - Repositories refuse connections whose schema is not current.

mod error;
pub mod migrations;
mod open;

pub use error::{DbError, DbResult};
pub use migrations::{latest_version, schema_version, MigrationReport};
pub use open::{open_db, open_db_in_memory};
