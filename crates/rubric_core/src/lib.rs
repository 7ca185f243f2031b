//! Composable grading rubrics.
//! Trees of bounded, stepped grades combined by arithmetic operators, with
//! normalization, relational persistence and per-rating instances.

pub mod codec;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use codec::{
    flatten, flatten_block, reconstruct, reconstruct_block, FlatTree, MalformedTreeError,
};
pub use config::{ConfigError, CoreConfig, LoggingConfig, StorageConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::block::BlockNode;
pub use model::builder::{NodeId, TreeBuilder};
pub use model::error::{GradingError, GradingResult, ValidationError, ValidationResult};
pub use model::evaluation::{evaluate, evaluate_block, Evaluation};
pub use model::grade::{normalize, GradeNode};
pub use model::instance::{
    apply_leaf_values, FillError, InstanceId, InstanceSource, LeafValues, RatingId, RubricInstance,
};
pub use model::node::{Node, NodeKind, MAX_TREE_DEPTH};
pub use model::operator::Operator;
pub use model::template::{RubricTemplate, TemplateAction, TemplateId, TemplateState};
pub use repo::instance_repo::{InstanceHeader, InstanceRepository, SqliteInstanceRepository};
pub use repo::template_repo::{SqliteTemplateRepository, TemplateHeader, TemplateRepository};
pub use repo::{RepoError, RepoResult};
pub use service::rating_service::{RatingService, RatingServiceError};
pub use service::template_service::{TemplateService, TemplateServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
