//! Rating-owned instance use-case service.
//!
//! # Responsibility
//! - Instantiate a template (or a single bare leaf) for a rating.
//! - Persist, reload, replace and delete the instance of a rating.
//! - Evaluate a rating's stored instance.
//!
//! # Invariants
//! - A rating owns at most one instance.
//! - Instances are deep copies; later template edits never reach them.
//! - Leaf values are validated before anything is written.

use crate::codec::{flatten, reconstruct, MalformedTreeError};
use crate::model::error::{GradingError, ValidationError};
use crate::model::evaluation::Evaluation;
use crate::model::instance::{FillError, InstanceSource, LeafValues, RatingId, RubricInstance};
use crate::model::node::Node;
use crate::model::template::TemplateId;
use crate::repo::instance_repo::{InstanceHeader, InstanceRepository, NewInstance};
use crate::repo::template_repo::TemplateRepository;
use crate::repo::RepoError;
use crate::service::template_service::{TemplateService, TemplateServiceError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from rating instance operations.
#[derive(Debug)]
pub enum RatingServiceError {
    /// Leaf values or tree do not fit.
    Validation(ValidationError),
    /// A leaf value or the evaluation itself is out of bounds.
    Grading(GradingError),
    /// Source template does not exist or is tombstoned.
    TemplateNotFound(TemplateId),
    /// Rating has no instance.
    RatingNotFound(RatingId),
    /// Rating already owns an instance.
    RatingAlreadyGraded(RatingId),
    /// Stored rows no longer form a valid tree.
    MalformedTree(MalformedTreeError),
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for RatingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Grading(err) => write!(f, "{err}"),
            Self::TemplateNotFound(id) => write!(f, "rubric template not found: {id}"),
            Self::RatingNotFound(id) => write!(f, "no rubric instance for rating {id}"),
            Self::RatingAlreadyGraded(id) => {
                write!(f, "rating {id} already has a rubric instance")
            }
            Self::MalformedTree(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RatingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Grading(err) => Some(err),
            Self::MalformedTree(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FillError> for RatingServiceError {
    fn from(value: FillError) -> Self {
        match value {
            FillError::Validation(err) => Self::Validation(err),
            FillError::Grading(err) => Self::Grading(err),
        }
    }
}

impl From<GradingError> for RatingServiceError {
    fn from(value: GradingError) -> Self {
        Self::Grading(value)
    }
}

impl From<RepoError> for RatingServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::RatingNotFound(id),
            RepoError::RatingAlreadyGraded(id) => Self::RatingAlreadyGraded(id),
            other => Self::Repo(other),
        }
    }
}

impl From<TemplateServiceError> for RatingServiceError {
    fn from(value: TemplateServiceError) -> Self {
        match value {
            TemplateServiceError::Validation(err) => Self::Validation(err),
            TemplateServiceError::NotFound(id) => Self::TemplateNotFound(id),
            TemplateServiceError::MalformedTree { source, .. } => Self::MalformedTree(source),
            TemplateServiceError::Repo(err) => Self::Repo(err),
        }
    }
}

/// Rating instance service facade.
pub struct RatingService<T: TemplateRepository, I: InstanceRepository> {
    templates: TemplateService<T>,
    instances: I,
}

impl<T: TemplateRepository, I: InstanceRepository> RatingService<T, I> {
    /// Creates service from repository implementations.
    pub fn new(template_repo: T, instance_repo: I) -> Self {
        Self {
            templates: TemplateService::new(template_repo),
            instances: instance_repo,
        }
    }

    /// Builds, fills and stores the first instance of `rating_id`.
    pub fn instantiate_for_rating(
        &self,
        rating_id: RatingId,
        source: InstanceSource,
        values: &LeafValues,
    ) -> Result<RubricInstance, RatingServiceError> {
        let started_at = Instant::now();
        if self.instances.get_for_rating(rating_id)?.is_some() {
            return Err(RatingServiceError::RatingAlreadyGraded(rating_id));
        }
        let mut instance = self.build_instance(rating_id, source, values)?;
        let tree = flatten(&instance.root);
        let header = self
            .instances
            .insert_instance(new_instance(&instance), &tree)?;
        instance.created_at = header.created_at;

        info!(
            "event=instance_create module=service status=ok rating_id={} instance_id={} components={} duration_ms={}",
            rating_id,
            header.instance_id,
            tree.components.len(),
            started_at.elapsed().as_millis()
        );
        Ok(instance)
    }

    /// Swaps the instance of `rating_id` for a freshly built one.
    pub fn replace_instance(
        &self,
        rating_id: RatingId,
        source: InstanceSource,
        values: &LeafValues,
    ) -> Result<RubricInstance, RatingServiceError> {
        let mut instance = self.build_instance(rating_id, source, values)?;
        let tree = flatten(&instance.root);
        let header = self
            .instances
            .replace_instance(new_instance(&instance), &tree)?;
        instance.created_at = header.created_at;

        info!(
            "event=instance_replace module=service status=ok rating_id={} instance_id={}",
            rating_id, header.instance_id
        );
        Ok(instance)
    }

    /// Reloads the stored instance of `rating_id`.
    pub fn load_instance(&self, rating_id: RatingId) -> Result<RubricInstance, RatingServiceError> {
        let header = self
            .instances
            .get_for_rating(rating_id)?
            .ok_or(RatingServiceError::RatingNotFound(rating_id))?;
        let tree = self.instances.load_tree(header.instance_id)?;
        let root = reconstruct(&tree.components, &tree.actions).map_err(|err| {
            warn!(
                "event=tree_reconstruct module=service status=error rating_id={} instance_id={} error={}",
                rating_id, header.instance_id, err
            );
            RatingServiceError::MalformedTree(err)
        })?;
        Ok(into_instance(header, root))
    }

    /// Deletes the instance of `rating_id` with its rows.
    pub fn delete_for_rating(&self, rating_id: RatingId) -> Result<(), RatingServiceError> {
        self.instances.delete_for_rating(rating_id)?;
        info!("event=instance_delete module=service status=ok rating_id={rating_id}");
        Ok(())
    }

    /// Evaluates the stored instance of `rating_id`.
    pub fn evaluate_rating(&self, rating_id: RatingId) -> Result<Evaluation, RatingServiceError> {
        let instance = self.load_instance(rating_id)?;
        instance.evaluate().map_err(Into::into)
    }

    fn build_instance(
        &self,
        rating_id: RatingId,
        source: InstanceSource,
        values: &LeafValues,
    ) -> Result<RubricInstance, RatingServiceError> {
        let instance = match source {
            InstanceSource::Template(template_id) => {
                let template = self.templates.get_template(template_id)?;
                RubricInstance::from_template(rating_id, &template, values)?
            }
            InstanceSource::Bare(grade) => RubricInstance::bare(rating_id, grade, values)?,
        };
        Ok(instance)
    }
}

fn new_instance(instance: &RubricInstance) -> NewInstance {
    NewInstance {
        instance_id: instance.id,
        rating_id: instance.rating_id,
        template_id: instance.template_id,
    }
}

fn into_instance(header: InstanceHeader, root: Node) -> RubricInstance {
    RubricInstance {
        id: header.instance_id,
        rating_id: header.rating_id,
        template_id: header.template_id,
        created_at: header.created_at,
        root,
    }
}
