//! Constraint library for assignment generation.
//!
//! Constraints are named, weighted scoring/validity functions evaluated
//! over one candidate placement (person, group) against the run's context.
//! Two classes exist:
//!
//! - **Hard** constraints must pass or the placement is invalid.
//! - **Soft** constraints contribute a signed score, multiplied by the
//!   configured weight, used to rank otherwise-valid placements.
//!
//! Constraint names form a closed set. Declarative [`ConstraintSpec`]s are
//! resolved against it at configuration-load time, so an unknown name or a
//! non-positive weight fails before any step executes.

mod context;
pub mod library;

pub use context::{PlacementContext, PlacementState};

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{Activity, Person};

/// Constraint class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Must pass or the candidate placement is invalid.
    Hard,
    /// Contributes a weighted signed score.
    Soft,
}

/// Result of evaluating one constraint against one candidate placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintOutcome {
    /// Hard constraint holds.
    Pass,
    /// Hard constraint violated; the placement is invalid.
    Reject,
    /// Soft constraint score (unweighted; higher is better).
    Score(f64),
}

/// A named scoring/validity function over candidate placements.
///
/// Implementations must be pure given their inputs: no hidden state, so
/// the generator can evaluate many candidate placements cheaply and two
/// identical runs rank placements identically.
pub trait AssignmentConstraint: Send + Sync + Debug {
    /// Constraint name as referenced from step configs.
    fn name(&self) -> &'static str;

    /// Whether this constraint is hard or soft.
    fn kind(&self) -> ConstraintKind;

    /// Evaluates one candidate placement.
    fn evaluate(&self, person: &Person, group: &Activity, ctx: &PlacementContext<'_>)
        -> ConstraintOutcome;

    /// Human-readable description.
    fn description(&self) -> &'static str {
        self.name()
    }
}

/// Declarative reference to a constraint: name, weight, options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintSpec {
    /// Name into the constraint library.
    pub constraint: String,
    /// Positive weight applied to soft scores.
    pub weight: f64,
    /// Constraint-specific options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

impl ConstraintSpec {
    /// Creates a spec.
    pub fn new(constraint: impl Into<String>, weight: f64) -> Self {
        Self {
            constraint: constraint.into(),
            weight,
            options: None,
        }
    }

    /// Sets constraint options.
    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = Some(options);
        self
    }
}

/// A resolved constraint with its weight.
#[derive(Debug)]
pub struct WeightedConstraint {
    /// The resolved constraint.
    pub constraint: Box<dyn AssignmentConstraint>,
    /// Weight applied to soft scores.
    pub weight: f64,
}

impl WeightedConstraint {
    /// Whether the underlying constraint is hard.
    pub fn is_hard(&self) -> bool {
        self.constraint.kind() == ConstraintKind::Hard
    }
}

/// Resolves constraint specs against the closed library, fail-fast.
///
/// Checks that every referenced name exists and every weight is positive
/// and finite before returning; the first problem aborts with
/// `InvalidStepConfig`.
pub fn resolve_constraints(
    specs: &[ConstraintSpec],
) -> Result<Vec<WeightedConstraint>, EngineError> {
    specs
        .iter()
        .map(|spec| {
            if !(spec.weight.is_finite() && spec.weight > 0.0) {
                return Err(EngineError::InvalidStepConfig(format!(
                    "constraint `{}` weight must be positive, got {}",
                    spec.constraint, spec.weight
                )));
            }
            let constraint = library::resolve(&spec.constraint)?;
            Ok(WeightedConstraint {
                constraint,
                weight: spec.weight,
            })
        })
        .collect()
}
