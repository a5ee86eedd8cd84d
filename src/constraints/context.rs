//! Placement context and generator working state.
//!
//! `PlacementState` is the explicit mutable state of one generator run:
//! per-group occupancy counts and the person-to-group placements staged so
//! far. `PlacementContext` bundles an immutable view of everything a
//! constraint may consult: the cluster, the step's candidate groups, the
//! roster snapshot, the graph index, the speed ranking, and the current
//! state. Constraints are pure functions of this view, which is what makes
//! evaluating many candidate placements cheap and deterministic.

use std::collections::HashMap;

use crate::models::{Activity, ActivityId, GraphIndex, Person, RegistrantId};

/// Mutable working state of a single generator run.
///
/// Occupancy is seeded from assignments already present in the roster that
/// target the run's groups with the run's assignment code; staged
/// placements from the run itself are layered on top.
#[derive(Debug, Clone, Default)]
pub struct PlacementState {
    occupancy: HashMap<ActivityId, usize>,
    staged: Vec<(RegistrantId, ActivityId)>,
    staged_by_person: HashMap<RegistrantId, ActivityId>,
}

impl PlacementState {
    /// Creates a state seeded from pre-existing same-code assignments.
    pub fn seeded(groups: &[&Activity], roster: &[Person], assignment_code: &str) -> Self {
        let mut occupancy: HashMap<ActivityId, usize> =
            groups.iter().map(|g| (g.id, 0)).collect();
        for person in roster {
            for assignment in &person.assignments {
                if assignment.assignment_code == assignment_code {
                    if let Some(count) = occupancy.get_mut(&assignment.activity_id) {
                        *count += 1;
                    }
                }
            }
        }
        Self {
            occupancy,
            staged: Vec::new(),
            staged_by_person: HashMap::new(),
        }
    }

    /// Current occupancy of a group (seeded plus staged).
    pub fn occupancy(&self, group_id: ActivityId) -> usize {
        self.occupancy.get(&group_id).copied().unwrap_or(0)
    }

    /// Stages a placement and bumps the group's occupancy.
    pub fn place(&mut self, registrant_id: RegistrantId, group_id: ActivityId) {
        *self.occupancy.entry(group_id).or_insert(0) += 1;
        self.staged.push((registrant_id, group_id));
        self.staged_by_person.insert(registrant_id, group_id);
    }

    /// The group a person has been staged into during this run, if any.
    pub fn staged_group(&self, registrant_id: RegistrantId) -> Option<ActivityId> {
        self.staged_by_person.get(&registrant_id).copied()
    }

    /// Staged placements in placement order.
    pub fn staged(&self) -> &[(RegistrantId, ActivityId)] {
        &self.staged
    }

    /// Number of staged placements.
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }
}

/// Everything a constraint may consult when scoring one candidate placement.
#[derive(Debug)]
pub struct PlacementContext<'a> {
    /// The assignment code being generated this run.
    pub assignment_code: &'a str,
    /// The cluster being assigned, in cluster order.
    pub cluster: &'a [Person],
    /// The full roster snapshot (current assignment state).
    pub roster: &'a [Person],
    /// The run's candidate groups, in declaration order.
    pub groups: &'a [&'a Activity],
    /// Id-keyed lookup over the whole graph (times, rooms, codes).
    pub index: &'a GraphIndex,
    /// Speed ranking of cluster members (0 = fastest); see the generator.
    pub speed_ranks: &'a HashMap<RegistrantId, usize>,
    /// The run's in-progress placement state.
    pub state: &'a PlacementState,
}

impl<'a> PlacementContext<'a> {
    /// Looks a person up by registrant id, preferring the roster snapshot.
    pub fn person_by_id(&self, registrant_id: RegistrantId) -> Option<&'a Person> {
        self.roster
            .iter()
            .find(|p| p.registrant_id == registrant_id)
            .or_else(|| self.cluster.iter().find(|p| p.registrant_id == registrant_id))
    }

    /// Persons currently in a group under this run's assignment code:
    /// pre-existing same-code members plus staged placements.
    pub fn group_members(&self, group_id: ActivityId) -> Vec<&'a Person> {
        let mut members: Vec<&Person> = self
            .roster
            .iter()
            .filter(|p| {
                p.assignments
                    .iter()
                    .any(|a| a.activity_id == group_id && a.assignment_code == self.assignment_code)
            })
            .collect();
        for &(rid, gid) in self.state.staged() {
            if gid == group_id {
                if let Some(p) = self.person_by_id(rid) {
                    if !members.iter().any(|m| m.registrant_id == rid) {
                        members.push(p);
                    }
                }
            }
        }
        members
    }

    /// A person's commitments: existing assignments plus any placement
    /// staged for them this run (with this run's assignment code).
    pub fn person_commitments<'b>(&'b self, person: &'b Person) -> Vec<(ActivityId, &'b str)> {
        let mut out: Vec<(ActivityId, &str)> = person
            .assignments
            .iter()
            .map(|a| (a.activity_id, a.assignment_code.as_str()))
            .collect();
        if let Some(gid) = self.state.staged_group(person.registrant_id) {
            out.push((gid, self.assignment_code));
        }
        out
    }

    /// Smallest time gap (ms) between a candidate group's slot and any of
    /// the person's commitments. Overlapping slots count as a zero gap.
    /// `None` when the person has no commitments with known times.
    pub fn min_gap_ms(&self, person: &Person, group: &Activity) -> Option<i64> {
        let mut min_gap: Option<i64> = None;
        for (aid, _) in self.person_commitments(person) {
            if aid == group.id {
                continue;
            }
            let Some(other) = self.index.get(aid) else {
                continue;
            };
            let gap = if other.end_ms <= group.start_ms {
                group.start_ms - other.end_ms
            } else if group.end_ms <= other.start_ms {
                other.start_ms - group.end_ms
            } else {
                0
            };
            min_gap = Some(min_gap.map_or(gap, |m| m.min(gap)));
        }
        min_gap
    }

    /// Mean speed rank across the whole cluster.
    pub fn cluster_mean_rank(&self) -> f64 {
        if self.speed_ranks.is_empty() {
            return 0.0;
        }
        let sum: usize = self.speed_ranks.values().sum();
        sum as f64 / self.speed_ranks.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityCode, Assignment, CompetitionGraph, Room, Venue};

    fn groups() -> Vec<Activity> {
        vec![
            Activity::new(11, ActivityCode::group("333", 1, 1), 0, 1000),
            Activity::new(12, ActivityCode::group("333", 1, 2), 1000, 2000),
        ]
    }

    #[test]
    fn test_state_seeded_from_same_code_assignments() {
        let groups = groups();
        let group_refs: Vec<&Activity> = groups.iter().collect();
        let roster = vec![
            Person::new(1, "A B").with_assignment(Assignment::new(11, "competitor")),
            Person::new(2, "C D").with_assignment(Assignment::new(11, "staff-judge")),
            Person::new(3, "E F").with_assignment(Assignment::new(12, "competitor")),
        ];

        let state = PlacementState::seeded(&group_refs, &roster, "competitor");
        assert_eq!(state.occupancy(11), 1); // staff-judge not counted
        assert_eq!(state.occupancy(12), 1);
        assert_eq!(state.occupancy(999), 0);
    }

    #[test]
    fn test_state_place_and_stage() {
        let groups = groups();
        let group_refs: Vec<&Activity> = groups.iter().collect();
        let mut state = PlacementState::seeded(&group_refs, &[], "competitor");

        state.place(7, 11);
        state.place(8, 11);
        assert_eq!(state.occupancy(11), 2);
        assert_eq!(state.staged_group(7), Some(11));
        assert_eq!(state.staged_group(9), None);
        assert_eq!(state.staged_count(), 2);
    }

    #[test]
    fn test_context_group_members_and_gaps() {
        let groups = groups();
        let group_refs: Vec<&Activity> = groups.iter().collect();
        let roster = vec![
            Person::new(1, "A B").with_assignment(Assignment::new(11, "competitor")),
            Person::new(2, "C D"),
        ];
        let graph = CompetitionGraph::new().with_venue(
            Venue::new(1, "V").with_room(
                Room::new(1, "R").with_activity(
                    Activity::new(10, ActivityCode::round("333", 1), 0, 2000)
                        .with_child(groups[0].clone())
                        .with_child(groups[1].clone()),
                ),
            ),
        );
        let index = GraphIndex::build(&graph);
        let ranks = HashMap::new();
        let mut state = PlacementState::seeded(&group_refs, &roster, "competitor");
        state.place(2, 12);

        let ctx = PlacementContext {
            assignment_code: "competitor",
            cluster: &roster,
            roster: &roster,
            groups: &group_refs,
            index: &index,
            speed_ranks: &ranks,
            state: &state,
        };

        let m11: Vec<u32> = ctx.group_members(11).iter().map(|p| p.registrant_id).collect();
        assert_eq!(m11, vec![1]);
        let m12: Vec<u32> = ctx.group_members(12).iter().map(|p| p.registrant_id).collect();
        assert_eq!(m12, vec![2]);

        // Person 1 committed to group 11 (0..1000); gap to group 12 is 0 (adjacent)
        assert_eq!(ctx.min_gap_ms(&roster[0], group_refs[1]), Some(0));
        // Staged commitment counts too: person 2 staged into 12, gap to 11 is 0
        assert_eq!(ctx.min_gap_ms(&roster[1], group_refs[0]), Some(0));
        assert_eq!(
            ctx.person_commitments(&roster[1]),
            vec![(12, "competitor")]
        );
    }
}
