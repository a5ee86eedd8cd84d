//! Heuristic assignment generation.
//!
//! The generator consumes a cluster of persons, a set of candidate group
//! activities, and a weighted constraint set, and produces a person-to-group
//! assignment that approximately maximizes aggregate soft-constraint
//! satisfaction while respecting every hard constraint.
//!
//! Generation never partially commits into the live roster: it returns a
//! complete candidate assignment list plus an explicit list of unplaceable
//! persons, and the caller applies the valid subset atomically.
//!
//! The process is deterministic for a fixed input ordering and constraint
//! set; there is no randomness anywhere.

mod assign;
mod report;

pub use assign::assign_everyone;
pub use report::GroupDistribution;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{ActivityId, RegistrantId};

/// Generator strategy, selected by name from step configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GeneratorKind {
    /// Place every member of the cluster into exactly one candidate group.
    AssignEveryone,
}

/// Resolves a generator name from a step config.
pub fn resolve_generator(name: &str) -> Result<GeneratorKind, EngineError> {
    match name {
        "assignEveryone" => Ok(GeneratorKind::AssignEveryone),
        unknown => Err(EngineError::InvalidStepConfig(format!(
            "unknown generator `{unknown}`"
        ))),
    }
}

/// Placement mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentMode {
    /// Round-robin across groups in cluster order; soft scores only break
    /// ties between equally-occupied valid groups.
    #[serde(rename = "symmetric")]
    Symmetric,
    /// Repeatedly place the valid (person, group) pair with the maximum
    /// weighted soft score. The default.
    #[default]
    #[serde(rename = "balanced2")]
    Balanced,
}

/// Generator options carried by an assignments step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorOptions {
    /// Placement mode.
    pub mode: AssignmentMode,
    /// Number stations within each group (1-based, in placement order).
    pub assign_stations: bool,
}

/// One generated assignment, ready to upsert into the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAssignment {
    /// The person being assigned.
    pub registrant_id: RegistrantId,
    /// The target group activity.
    pub activity_id: ActivityId,
    /// Role code for the assignment.
    pub assignment_code: String,
    /// Station number, when the step assigns stations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_number: Option<u32>,
}

/// A person the generator could not place, with the hard constraint that
/// rejected every candidate group (or a structural reason).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnplacedPerson {
    /// The person left unassigned.
    pub registrant_id: RegistrantId,
    /// Why: a hard constraint name, or a structural reason.
    pub reason: String,
}

/// Complete outcome of one generator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Valid assignments, in cluster order.
    pub assignments: Vec<GeneratedAssignment>,
    /// Persons that could not be placed, in cluster order.
    pub unplaced: Vec<UnplacedPerson>,
}

impl GenerationResult {
    /// Whether every cluster member was placed.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }
}
