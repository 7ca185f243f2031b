//! Leaf grading parameter.
//!
//! # Responsibility
//! - Hold one bounded, step-quantized numeric value.
//! - Map the value onto the fixed `1..=10` normalized scale.
//!
//! # Invariants
//! - `step > 0` and `min < max`, all parameters finite.
//! - When present, `value` lies in `[min, max]` and sits on `min + k * step`.
//! - `value` changes only through [`GradeNode::set_value`].

use crate::model::error::{GradingError, GradingResult, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

/// Tolerance for inclusive bound checks after step rounding.
pub const VALUE_EPSILON: f64 = 1e-9;
/// Tolerance for deciding whether a stored value sits on the step grid.
const STEP_TOLERANCE: f64 = 1e-6;

/// Lowest point of the normalized scale.
pub const NORMALIZED_MIN: f64 = 1.0;
/// Highest point of the normalized scale.
pub const NORMALIZED_MAX: f64 = 10.0;

/// Leaf evaluator: one bounded, step-quantized parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GradeNodeFields")]
pub struct GradeNode {
    name: String,
    min: f64,
    max: f64,
    step: f64,
    value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// Unchecked wire shape; converted through [`GradeNode::restore`].
#[derive(Deserialize)]
struct GradeNodeFields {
    name: String,
    min: f64,
    max: f64,
    step: f64,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<GradeNodeFields> for GradeNode {
    type Error = ValidationError;

    fn try_from(fields: GradeNodeFields) -> Result<Self, Self::Error> {
        let mut node = GradeNode::restore(
            fields.name,
            fields.min,
            fields.max,
            fields.step,
            fields.value,
        )?;
        node.description = fields.description;
        Ok(node)
    }
}

impl GradeNode {
    /// Creates an unset leaf after checking its parameters.
    pub fn new(name: impl Into<String>, min: f64, max: f64, step: f64) -> ValidationResult<Self> {
        let name = name.into();
        validate_parameters(&name, min, max, step)?;
        Ok(Self {
            name,
            min,
            max,
            step,
            value: None,
            description: None,
        })
    }

    /// Rebuilds a leaf from persisted parameters and a stored value.
    ///
    /// Unlike [`GradeNode::set_value`], the stored value is not rounded: it
    /// must already be reachable, otherwise the record is rejected.
    pub fn restore(
        name: impl Into<String>,
        min: f64,
        max: f64,
        step: f64,
        value: Option<f64>,
    ) -> ValidationResult<Self> {
        let mut node = Self::new(name, min, max, step)?;
        if let Some(value) = value {
            if !node.is_reachable(value) {
                return Err(ValidationError::InvalidStoredValue {
                    leaf: node.name,
                    value,
                });
            }
            node.value = Some(value);
        }
        Ok(node)
    }

    /// Attaches a free-form description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Configured lower bound.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Configured upper bound.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Current value, `None` until set.
    pub fn grade(&self) -> Option<f64> {
        self.value
    }

    /// Rounds `value` onto the step grid and stores it.
    ///
    /// # Errors
    /// - `OutOfRange` when the rounded value leaves `[min, max]` or the input
    ///   is not finite. The previous value is kept on error.
    pub fn set_value(&mut self, value: f64) -> GradingResult<()> {
        let out_of_range = || GradingError::OutOfRange {
            attempted: value,
            min: self.min,
            max: self.max,
            step: self.step,
        };
        if !value.is_finite() {
            return Err(out_of_range());
        }

        let steps = ((value - self.min) / self.step).round();
        let rounded = steps * self.step + self.min;
        if rounded < self.min - VALUE_EPSILON || rounded > self.max + VALUE_EPSILON {
            return Err(out_of_range());
        }

        self.value = Some(rounded.clamp(self.min, self.max));
        Ok(())
    }

    /// Drops the current value.
    pub fn clear_value(&mut self) {
        self.value = None;
    }

    /// Value mapped onto `1..=10`, `None` while unset.
    pub fn normalized_grade(&self) -> GradingResult<Option<f64>> {
        self.value
            .map(|value| normalize(value, self.min, self.max))
            .transpose()
    }

    fn is_reachable(&self, value: f64) -> bool {
        if !value.is_finite()
            || value < self.min - VALUE_EPSILON
            || value > self.max + VALUE_EPSILON
        {
            return false;
        }
        let steps = (value - self.min) / self.step;
        (steps - steps.round()).abs() <= STEP_TOLERANCE
    }
}

/// Maps `value` from `[min, max]` onto the integer scale `1..=10`.
///
/// # Errors
/// - `DegenerateRange` when `min == max` (within [`VALUE_EPSILON`]).
pub fn normalize(value: f64, min: f64, max: f64) -> GradingResult<f64> {
    let span = max - min;
    if span.abs() <= VALUE_EPSILON {
        return Err(GradingError::DegenerateRange { min, max });
    }
    let scaled = NORMALIZED_MIN + (NORMALIZED_MAX - NORMALIZED_MIN) * (value - min) / span;
    Ok(scaled.round().clamp(NORMALIZED_MIN, NORMALIZED_MAX))
}

fn validate_parameters(name: &str, min: f64, max: f64, step: f64) -> ValidationResult<()> {
    if !(min.is_finite() && max.is_finite() && step.is_finite()) {
        return Err(ValidationError::NonFiniteParameter {
            leaf: name.to_string(),
        });
    }
    if step <= 0.0 {
        return Err(ValidationError::NonPositiveStep {
            leaf: name.to_string(),
            step,
        });
    }
    if min >= max {
        return Err(ValidationError::InvertedRange {
            leaf: name.to_string(),
            min,
            max,
        });
    }
    Ok(())
}
