//! Engine error taxonomy.
//!
//! Fatal errors abort the current step before any assignment output is
//! produced. Per-person placement failures are not errors: they travel as
//! [`UnplacedPerson`](crate::generator::UnplacedPerson) diagnostics next to
//! whatever valid assignments a step produced.

use thiserror::Error;

use crate::models::ActivityId;

/// A fatal engine error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A cluster definition references a filter key the engine does not know.
    /// Aborts the step before any filtering happens.
    #[error("unknown filter `{0}`")]
    UnknownFilter(String),

    /// A referenced activity id does not exist in the competition graph.
    #[error("activity {0} does not exist in the competition graph")]
    UnresolvedActivity(ActivityId),

    /// A step configuration is malformed: unknown constraint or generator
    /// name, non-positive weight, bad filter value, bad activity code.
    /// Surfaced before the step mutates anything.
    #[error("invalid step config: {0}")]
    InvalidStepConfig(String),
}
