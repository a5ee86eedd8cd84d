//! The `assignEveryone` strategy.
//!
//! # Algorithm
//!
//! 1. Rank the cluster by personal best for the target round's event
//!    (seeded speed ranking, consumed by `balancedSpeed`).
//! 2. Precompute, per person, the set of hard-constraint-valid groups.
//!    Hard validity in the built-in library does not depend on placement
//!    order, so persons with no valid group are known up front and become
//!    `UnplacedPerson` diagnostics (with the rejecting constraint's name).
//! 3. Place persons one at a time, recomputing soft scores incrementally
//!    against the working state:
//!    - `balanced2`: pick the valid (person, group) pair with the maximum
//!      weighted soft score; ties break to the lowest current occupancy,
//!      then cluster input order, then group declaration order.
//!    - `symmetric`: walk the cluster in order; person `i` prefers group
//!      `i mod n` and ties (same score, same occupancy) break by cyclic
//!      distance from that seat, keeping the distribution round-robin.
//!
//! No randomness: identical inputs produce byte-identical output.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 4: Priority Dispatching

use std::collections::HashMap;

use crate::constraints::{ConstraintOutcome, PlacementContext, PlacementState, WeightedConstraint};
use crate::models::{higher_is_better, Activity, ActivityId, GraphIndex, Person, RegistrantId};

use super::{AssignmentMode, GeneratedAssignment, GenerationResult, GeneratorOptions, UnplacedPerson};

const EPSILON: f64 = 1e-9;

/// Reason reported when a step has no target groups to place into.
const NO_TARGET_GROUPS: &str = "noTargetGroups";

/// Attempts to place every member of `cluster` into exactly one of
/// `groups`, under the given weighted constraints.
///
/// Returns the complete candidate assignment list (cluster order) plus the
/// persons that could not be placed; nothing is written to the roster.
pub fn assign_everyone(
    cluster: &[Person],
    groups: &[&Activity],
    assignment_code: &str,
    constraints: &[WeightedConstraint],
    options: &GeneratorOptions,
    roster: &[Person],
    index: &GraphIndex,
) -> GenerationResult {
    if groups.is_empty() {
        return GenerationResult {
            assignments: Vec::new(),
            unplaced: cluster
                .iter()
                .map(|p| UnplacedPerson {
                    registrant_id: p.registrant_id,
                    reason: NO_TARGET_GROUPS.to_string(),
                })
                .collect(),
        };
    }

    let hard: Vec<&WeightedConstraint> = constraints.iter().filter(|c| c.is_hard()).collect();
    let soft: Vec<&WeightedConstraint> = constraints.iter().filter(|c| !c.is_hard()).collect();

    let event_id = &groups[0].activity_code.event_id;
    let speed_ranks = speed_ranks(cluster, event_id);

    let mut state = PlacementState::seeded(groups, roster, assignment_code);

    // Hard validity per person (placement-order independent for the
    // built-in library), plus the first rejecting constraint for reporting.
    let mut valid: Vec<Vec<usize>> = vec![Vec::new(); cluster.len()];
    let mut first_reason: Vec<Option<&'static str>> = vec![None; cluster.len()];
    {
        let ctx = context(cluster, groups, assignment_code, roster, index, &speed_ranks, &state);
        for (ci, person) in cluster.iter().enumerate() {
            for (gi, group) in groups.iter().enumerate() {
                match first_hard_failure(person, group, &ctx, &hard) {
                    None => valid[ci].push(gi),
                    Some(name) => {
                        if first_reason[ci].is_none() {
                            first_reason[ci] = Some(name);
                        }
                    }
                }
            }
        }
    }

    let mut unplaced = Vec::new();
    let mut placeable: Vec<usize> = Vec::new();
    for (ci, person) in cluster.iter().enumerate() {
        if valid[ci].is_empty() {
            unplaced.push(UnplacedPerson {
                registrant_id: person.registrant_id,
                reason: first_reason[ci].unwrap_or(NO_TARGET_GROUPS).to_string(),
            });
        } else {
            placeable.push(ci);
        }
    }

    let mut placed: Vec<Option<(ActivityId, Option<u32>)>> = vec![None; cluster.len()];

    match options.mode {
        AssignmentMode::Balanced => {
            let mut remaining = placeable;
            while !remaining.is_empty() {
                let mut best: Option<(f64, usize, usize, usize)> = None;
                {
                    let ctx = context(
                        cluster, groups, assignment_code, roster, index, &speed_ranks, &state,
                    );
                    for (pos, &ci) in remaining.iter().enumerate() {
                        let person = &cluster[ci];
                        for &gi in &valid[ci] {
                            let group = groups[gi];
                            let score = soft_score(person, group, &ctx, &soft);
                            let occupancy = state.occupancy(group.id);
                            let improves = match best {
                                None => true,
                                Some((bs, bo, _, _)) => {
                                    score > bs + EPSILON
                                        || ((score - bs).abs() <= EPSILON && occupancy < bo)
                                }
                            };
                            if improves {
                                best = Some((score, occupancy, pos, gi));
                            }
                        }
                    }
                }
                // Placeable persons always retain at least one valid group
                let Some((_, occupancy, pos, gi)) = best else {
                    break;
                };
                let ci = remaining.remove(pos);
                commit(&mut state, &mut placed, cluster, ci, groups[gi], occupancy, options);
            }
        }
        AssignmentMode::Symmetric => {
            for &ci in &placeable {
                let person = &cluster[ci];
                let preferred = ci % groups.len();
                let mut best: Option<(f64, usize, usize, usize)> = None;
                {
                    let ctx = context(
                        cluster, groups, assignment_code, roster, index, &speed_ranks, &state,
                    );
                    for &gi in &valid[ci] {
                        let group = groups[gi];
                        let score = soft_score(person, group, &ctx, &soft);
                        let occupancy = state.occupancy(group.id);
                        let distance = (gi + groups.len() - preferred) % groups.len();
                        let improves = match best {
                            None => true,
                            Some((bs, bo, bd, _)) => {
                                score > bs + EPSILON
                                    || ((score - bs).abs() <= EPSILON
                                        && (occupancy < bo || (occupancy == bo && distance < bd)))
                            }
                        };
                        if improves {
                            best = Some((score, occupancy, distance, gi));
                        }
                    }
                }
                if let Some((_, occupancy, _, gi)) = best {
                    commit(&mut state, &mut placed, cluster, ci, groups[gi], occupancy, options);
                }
            }
        }
    }

    let assignments: Vec<GeneratedAssignment> = cluster
        .iter()
        .enumerate()
        .filter_map(|(ci, person)| {
            placed[ci].map(|(activity_id, station_number)| GeneratedAssignment {
                registrant_id: person.registrant_id,
                activity_id,
                assignment_code: assignment_code.to_string(),
                station_number,
            })
        })
        .collect();

    tracing::debug!(
        code = assignment_code,
        placed = assignments.len(),
        unplaced = unplaced.len(),
        "assignment generation finished"
    );

    GenerationResult { assignments, unplaced }
}

fn commit(
    state: &mut PlacementState,
    placed: &mut [Option<(ActivityId, Option<u32>)>],
    cluster: &[Person],
    ci: usize,
    group: &Activity,
    occupancy_before: usize,
    options: &GeneratorOptions,
) {
    let station = options
        .assign_stations
        .then_some(occupancy_before as u32 + 1);
    state.place(cluster[ci].registrant_id, group.id);
    placed[ci] = Some((group.id, station));
}

#[allow(clippy::too_many_arguments)]
fn context<'a>(
    cluster: &'a [Person],
    groups: &'a [&'a Activity],
    assignment_code: &'a str,
    roster: &'a [Person],
    index: &'a GraphIndex,
    speed_ranks: &'a HashMap<RegistrantId, usize>,
    state: &'a PlacementState,
) -> PlacementContext<'a> {
    PlacementContext {
        assignment_code,
        cluster,
        roster,
        groups,
        index,
        speed_ranks,
        state,
    }
}

fn first_hard_failure(
    person: &Person,
    group: &Activity,
    ctx: &PlacementContext<'_>,
    hard: &[&WeightedConstraint],
) -> Option<&'static str> {
    for wc in hard {
        if let ConstraintOutcome::Reject = wc.constraint.evaluate(person, group, ctx) {
            return Some(wc.constraint.name());
        }
    }
    None
}

fn soft_score(
    person: &Person,
    group: &Activity,
    ctx: &PlacementContext<'_>,
    soft: &[&WeightedConstraint],
) -> f64 {
    soft.iter()
        .map(|wc| match wc.constraint.evaluate(person, group, ctx) {
            ConstraintOutcome::Score(s) => wc.weight * s,
            _ => 0.0,
        })
        .sum()
}

/// Ranks cluster members by personal best for the event (0 = best seed).
/// Persons without a recorded best rank last; ties keep cluster order.
fn speed_ranks(cluster: &[Person], event_id: &str) -> HashMap<RegistrantId, usize> {
    let mut order: Vec<usize> = (0..cluster.len()).collect();
    let invert = higher_is_better(event_id);
    order.sort_by_key(|&i| {
        match cluster[i].personal_bests.get(event_id) {
            Some(&best) => {
                if invert {
                    -best
                } else {
                    best
                }
            }
            None => i64::MAX,
        }
    });
    order
        .into_iter()
        .enumerate()
        .map(|(rank, i)| (cluster[i].registrant_id, rank))
        .collect()
}
