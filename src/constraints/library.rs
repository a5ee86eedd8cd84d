//! Built-in constraints.
//!
//! # Names
//!
//! - **Hard**: `uniqueAssignment`, `mustNotHaveOtherAssignments`,
//!   `shouldFollowCompetitorAssignment`
//! - **Soft**: `balancedGroupSize`, `balancedSpeed` (alias
//!   `balancedGroupNumberSize`), `sameStageAsOtherAssignments`,
//!   `maximizeBreaks`, `assignmentsNextToEachother`,
//!   `avoidConflictingNames`
//!
//! # Score Convention
//!
//! Soft scores are signed and unweighted; higher is better. The generator
//! multiplies each score by its configured weight and sums.

use super::{AssignmentConstraint, ConstraintKind, ConstraintOutcome, PlacementContext};
use crate::error::EngineError;
use crate::models::{Activity, Person, CODE_COMPETITOR, STAFF_PREFIX};

/// Resolves a constraint name against the closed library.
pub fn resolve(name: &str) -> Result<Box<dyn AssignmentConstraint>, EngineError> {
    match name {
        "uniqueAssignment" => Ok(Box::new(UniqueAssignment)),
        "mustNotHaveOtherAssignments" => Ok(Box::new(MustNotHaveOtherAssignments)),
        "shouldFollowCompetitorAssignment" => Ok(Box::new(ShouldFollowCompetitorAssignment)),
        "balancedGroupSize" => Ok(Box::new(BalancedGroupSize)),
        "balancedSpeed" | "balancedGroupNumberSize" => Ok(Box::new(BalancedSpeed)),
        "sameStageAsOtherAssignments" => Ok(Box::new(SameStageAsOtherAssignments)),
        "maximizeBreaks" => Ok(Box::new(MaximizeBreaks)),
        "assignmentsNextToEachother" => Ok(Box::new(AssignmentsNextToEachother)),
        "avoidConflictingNames" => Ok(Box::new(AvoidConflictingNames)),
        unknown => Err(EngineError::InvalidStepConfig(format!(
            "unknown constraint `{unknown}`"
        ))),
    }
}

// ======================== Hard constraints ========================

/// The person must not already hold an assignment for this exact activity.
#[derive(Debug, Clone, Copy)]
pub struct UniqueAssignment;

impl AssignmentConstraint for UniqueAssignment {
    fn name(&self) -> &'static str {
        "uniqueAssignment"
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Hard
    }

    fn evaluate(
        &self,
        person: &Person,
        group: &Activity,
        ctx: &PlacementContext<'_>,
    ) -> ConstraintOutcome {
        if person.assignment_for(group.id).is_some() {
            return ConstraintOutcome::Reject;
        }
        if ctx.state.staged_group(person.registrant_id) == Some(group.id) {
            return ConstraintOutcome::Reject;
        }
        ConstraintOutcome::Pass
    }

    fn description(&self) -> &'static str {
        "No duplicate assignment for the same activity"
    }
}

/// The person must have no other assignment overlapping this group's time
/// slot, across any room. Prevents double-booking a period.
#[derive(Debug, Clone, Copy)]
pub struct MustNotHaveOtherAssignments;

impl AssignmentConstraint for MustNotHaveOtherAssignments {
    fn name(&self) -> &'static str {
        "mustNotHaveOtherAssignments"
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Hard
    }

    fn evaluate(
        &self,
        person: &Person,
        group: &Activity,
        ctx: &PlacementContext<'_>,
    ) -> ConstraintOutcome {
        let Some(slot) = ctx.index.get(group.id) else {
            return ConstraintOutcome::Pass;
        };
        for (activity_id, _) in ctx.person_commitments(person) {
            if activity_id == group.id {
                continue;
            }
            if let Some(other) = ctx.index.get(activity_id) {
                if other.overlaps(slot) {
                    return ConstraintOutcome::Reject;
                }
            }
        }
        ConstraintOutcome::Pass
    }

    fn description(&self) -> &'static str {
        "No other assignment in the same time slot"
    }
}

/// For staff steps: the target group must be adjacent (group number
/// distance 1 within the round) to the group the person competes in.
/// Persons not competing in the round pass unconditionally.
#[derive(Debug, Clone, Copy)]
pub struct ShouldFollowCompetitorAssignment;

impl AssignmentConstraint for ShouldFollowCompetitorAssignment {
    fn name(&self) -> &'static str {
        "shouldFollowCompetitorAssignment"
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Hard
    }

    fn evaluate(
        &self,
        person: &Person,
        group: &Activity,
        ctx: &PlacementContext<'_>,
    ) -> ConstraintOutcome {
        let Some(candidate_number) = group.activity_code.group_number else {
            return ConstraintOutcome::Reject;
        };

        let mut competes_in_round = false;
        for assignment in &person.assignments {
            if assignment.assignment_code != CODE_COMPETITOR {
                continue;
            }
            let Some(entry) = ctx.index.get(assignment.activity_id) else {
                continue;
            };
            if !entry.code.same_round(&group.activity_code) {
                continue;
            }
            let Some(own_number) = entry.code.group_number else {
                continue;
            };
            competes_in_round = true;
            if candidate_number.abs_diff(own_number) == 1 {
                return ConstraintOutcome::Pass;
            }
        }

        if competes_in_round {
            ConstraintOutcome::Reject
        } else {
            ConstraintOutcome::Pass
        }
    }

    fn description(&self) -> &'static str {
        "Staff group adjacent to own competing group"
    }
}

// ======================== Soft constraints ========================

/// Penalizes placements that widen the max-min group size spread.
/// Score is the negated spread after the hypothetical placement.
#[derive(Debug, Clone, Copy)]
pub struct BalancedGroupSize;

impl AssignmentConstraint for BalancedGroupSize {
    fn name(&self) -> &'static str {
        "balancedGroupSize"
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Soft
    }

    fn evaluate(
        &self,
        _person: &Person,
        group: &Activity,
        ctx: &PlacementContext<'_>,
    ) -> ConstraintOutcome {
        let mut min = usize::MAX;
        let mut max = 0usize;
        for g in ctx.groups {
            let mut occ = ctx.state.occupancy(g.id);
            if g.id == group.id {
                occ += 1;
            }
            min = min.min(occ);
            max = max.max(occ);
        }
        if min == usize::MAX {
            return ConstraintOutcome::Score(0.0);
        }
        ConstraintOutcome::Score(-((max - min) as f64))
    }

    fn description(&self) -> &'static str {
        "Keep group sizes balanced"
    }
}

/// Distributes by seeded speed ranking so groups end up with comparable
/// skill levels. Score is the negated distance between the group's mean
/// rank (candidate included) and the cluster-wide mean rank.
#[derive(Debug, Clone, Copy)]
pub struct BalancedSpeed;

impl AssignmentConstraint for BalancedSpeed {
    fn name(&self) -> &'static str {
        "balancedSpeed"
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Soft
    }

    fn evaluate(
        &self,
        person: &Person,
        group: &Activity,
        ctx: &PlacementContext<'_>,
    ) -> ConstraintOutcome {
        let Some(&own_rank) = ctx.speed_ranks.get(&person.registrant_id) else {
            return ConstraintOutcome::Score(0.0);
        };

        let mut sum = own_rank as f64;
        let mut count = 1usize;
        for member in ctx.group_members(group.id) {
            if member.registrant_id == person.registrant_id {
                continue;
            }
            if let Some(&rank) = ctx.speed_ranks.get(&member.registrant_id) {
                sum += rank as f64;
                count += 1;
            }
        }

        let group_mean = sum / count as f64;
        ConstraintOutcome::Score(-(group_mean - ctx.cluster_mean_rank()).abs())
    }

    fn description(&self) -> &'static str {
        "Balance seeded speed across groups"
    }
}

/// Rewards keeping a person's staff assignments in the same room across
/// the round, to minimize walking between stages. Score is the number of
/// the person's staff commitments in the candidate's room and round.
#[derive(Debug, Clone, Copy)]
pub struct SameStageAsOtherAssignments;

impl AssignmentConstraint for SameStageAsOtherAssignments {
    fn name(&self) -> &'static str {
        "sameStageAsOtherAssignments"
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Soft
    }

    fn evaluate(
        &self,
        person: &Person,
        group: &Activity,
        ctx: &PlacementContext<'_>,
    ) -> ConstraintOutcome {
        let Some(slot) = ctx.index.get(group.id) else {
            return ConstraintOutcome::Score(0.0);
        };
        let mut same_room = 0usize;
        for (activity_id, code) in ctx.person_commitments(person) {
            if activity_id == group.id || !code.starts_with(STAFF_PREFIX) {
                continue;
            }
            if let Some(other) = ctx.index.get(activity_id) {
                if other.room_id == slot.room_id && other.code.same_round(&slot.code) {
                    same_room += 1;
                }
            }
        }
        ConstraintOutcome::Score(same_room as f64)
    }

    fn description(&self) -> &'static str {
        "Keep staff assignments on one stage"
    }
}

/// Rewards spacing a person's assignments apart in time. Score is the
/// smallest gap (minutes) to any existing commitment; no commitments
/// score zero.
#[derive(Debug, Clone, Copy)]
pub struct MaximizeBreaks;

impl AssignmentConstraint for MaximizeBreaks {
    fn name(&self) -> &'static str {
        "maximizeBreaks"
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Soft
    }

    fn evaluate(
        &self,
        person: &Person,
        group: &Activity,
        ctx: &PlacementContext<'_>,
    ) -> ConstraintOutcome {
        match ctx.min_gap_ms(person, group) {
            Some(gap) => ConstraintOutcome::Score(gap as f64 / 60_000.0),
            None => ConstraintOutcome::Score(0.0),
        }
    }

    fn description(&self) -> &'static str {
        "Space assignments apart in time"
    }
}

/// The inverse of `maximizeBreaks`: rewards back-to-back assignments.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentsNextToEachother;

impl AssignmentConstraint for AssignmentsNextToEachother {
    fn name(&self) -> &'static str {
        "assignmentsNextToEachother"
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Soft
    }

    fn evaluate(
        &self,
        person: &Person,
        group: &Activity,
        ctx: &PlacementContext<'_>,
    ) -> ConstraintOutcome {
        match ctx.min_gap_ms(person, group) {
            Some(gap) => ConstraintOutcome::Score(-(gap as f64) / 60_000.0),
            None => ConstraintOutcome::Score(0.0),
        }
    }

    fn description(&self) -> &'static str {
        "Reward adjacent assignments"
    }
}

/// Penalizes placing people with matching surnames in one group, to avoid
/// scorecard mix-ups. A matching surname scores -1; a matching surname
/// plus matching first initial scores -2.
#[derive(Debug, Clone, Copy)]
pub struct AvoidConflictingNames;

impl AssignmentConstraint for AvoidConflictingNames {
    fn name(&self) -> &'static str {
        "avoidConflictingNames"
    }

    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Soft
    }

    fn evaluate(
        &self,
        person: &Person,
        group: &Activity,
        ctx: &PlacementContext<'_>,
    ) -> ConstraintOutcome {
        let surname = person.surname().to_lowercase();
        if surname.is_empty() {
            return ConstraintOutcome::Score(0.0);
        }
        let initial = person.first_initial();

        let mut score = 0.0;
        for member in ctx.group_members(group.id) {
            if member.registrant_id == person.registrant_id {
                continue;
            }
            if member.surname().to_lowercase() == surname {
                score -= 1.0;
                if initial.is_some() && member.first_initial() == initial {
                    score -= 1.0;
                }
            }
        }
        ConstraintOutcome::Score(score)
    }

    fn description(&self) -> &'static str {
        "Avoid duplicate surnames in a group"
    }
}
