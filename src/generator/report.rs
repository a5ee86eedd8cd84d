//! Group distribution metrics.
//!
//! Summarizes how a generation outcome distributes people over a round's
//! groups: per-group sizes (pre-existing same-code members plus newly
//! generated ones), the max-min spread, and the unplaced count. Callers
//! surface these next to the diagnostics list.

use std::collections::BTreeMap;

use crate::models::{Activity, ActivityId, Person};

use super::GenerationResult;

/// Distribution summary for one generation outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDistribution {
    /// Members per group (same assignment code), keyed by activity id.
    pub sizes: BTreeMap<ActivityId, usize>,
    /// Assignments produced by the run.
    pub generated: usize,
    /// Persons the run could not place.
    pub unplaced: usize,
}

impl GroupDistribution {
    /// Computes the distribution for a run's groups and outcome.
    pub fn calculate(
        groups: &[&Activity],
        roster: &[Person],
        assignment_code: &str,
        result: &GenerationResult,
    ) -> Self {
        let mut sizes: BTreeMap<ActivityId, usize> =
            groups.iter().map(|g| (g.id, 0)).collect();

        for person in roster {
            for assignment in &person.assignments {
                if assignment.assignment_code == assignment_code {
                    if let Some(count) = sizes.get_mut(&assignment.activity_id) {
                        *count += 1;
                    }
                }
            }
        }
        for assignment in &result.assignments {
            if let Some(count) = sizes.get_mut(&assignment.activity_id) {
                *count += 1;
            }
        }

        Self {
            sizes,
            generated: result.assignments.len(),
            unplaced: result.unplaced.len(),
        }
    }

    /// Smallest group size (0 when there are no groups).
    pub fn min_size(&self) -> usize {
        self.sizes.values().copied().min().unwrap_or(0)
    }

    /// Largest group size (0 when there are no groups).
    pub fn max_size(&self) -> usize {
        self.sizes.values().copied().max().unwrap_or(0)
    }

    /// Max-min group size spread.
    pub fn spread(&self) -> usize {
        self.max_size() - self.min_size()
    }

    /// Total members across all groups.
    pub fn total_members(&self) -> usize {
        self.sizes.values().sum()
    }
}
