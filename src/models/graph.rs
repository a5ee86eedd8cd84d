//! Competition activity graph.
//!
//! Represents the competition schedule as a tree: venues own rooms, rooms
//! own an ordered sequence of round activities, and each round's children
//! are its leaf group activities. A room's activities belong exclusively to
//! it; there is no cross-room sharing.
//!
//! Traversal is depth-first in declaration order (venue, then room, then
//! round, then group), which makes every query deterministic for a fixed
//! graph.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::activity::{Activity, ActivityCode, ActivityId};
use crate::error::EngineError;

/// Unique room identifier.
pub type RoomId = u32;

/// A physical room (stage) holding an ordered timetable of round activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Unique room identifier.
    pub id: RoomId,
    /// Display name (e.g. "Red Stage").
    pub name: String,
    /// Display color (hex string, e.g. "#cc0000").
    #[serde(default)]
    pub color: String,
    /// Top-level round activities, in timetable order.
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl Room {
    /// Creates an empty room.
    pub fn new(id: RoomId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: String::new(),
            activities: Vec::new(),
        }
    }

    /// Sets the display color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Adds a round activity to the timetable.
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }
}

/// A competition venue owning one or more rooms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    /// Unique venue identifier.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Rooms, in declaration order.
    #[serde(default)]
    pub rooms: Vec<Room>,
}

impl Venue {
    /// Creates an empty venue.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            rooms: Vec::new(),
        }
    }

    /// Adds a room.
    pub fn with_room(mut self, room: Room) -> Self {
        self.rooms.push(room);
        self
    }
}

/// The competition's full schedule tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionGraph {
    /// Venues, in declaration order.
    #[serde(default)]
    pub venues: Vec<Venue>,
    /// Competition-level namespaced opaque config, same channel as
    /// [`Activity::extensions`](super::activity::Activity).
    #[serde(default)]
    pub extensions: std::collections::BTreeMap<String, serde_json::Value>,
}

impl CompetitionGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a venue.
    pub fn with_venue(mut self, venue: Venue) -> Self {
        self.venues.push(venue);
        self
    }

    /// Attaches a competition-level extension value.
    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Looks up a competition-level extension by its namespaced key.
    pub fn extension(&self, key: &str) -> Option<&serde_json::Value> {
        self.extensions.get(key)
    }

    /// Returns every activity at every depth, depth-first, preserving
    /// venue/room/round declaration order.
    pub fn all_activities(&self) -> Vec<&Activity> {
        let mut out = Vec::new();
        for venue in &self.venues {
            for room in &venue.rooms {
                for activity in &room.activities {
                    collect_depth_first(activity, &mut out);
                }
            }
        }
        out
    }

    /// Finds an activity by id at any depth.
    pub fn find_activity(&self, id: ActivityId) -> Option<&Activity> {
        self.all_activities().into_iter().find(|a| a.id == id)
    }

    /// Returns the leaf groups under the given round, in ascending group
    /// number order.
    ///
    /// Fails with `UnresolvedActivity` if the round id does not exist.
    pub fn group_activities_by_round(
        &self,
        round_id: ActivityId,
    ) -> Result<Vec<&Activity>, EngineError> {
        let round = self
            .find_activity(round_id)
            .ok_or(EngineError::UnresolvedActivity(round_id))?;

        let mut groups: Vec<&Activity> = round.child_activities.iter().collect();
        groups.sort_by_key(|g| g.activity_code.group_number.unwrap_or(u32::MAX));
        Ok(groups)
    }

    /// Resolves the room owning the given activity (at any depth).
    ///
    /// Fails with `UnresolvedActivity` if the activity id does not exist.
    pub fn room_by_activity(&self, activity_id: ActivityId) -> Result<&Room, EngineError> {
        for venue in &self.venues {
            for room in &venue.rooms {
                for activity in &room.activities {
                    if subtree_contains(activity, activity_id) {
                        return Ok(room);
                    }
                }
            }
        }
        Err(EngineError::UnresolvedActivity(activity_id))
    }

    /// The largest activity id currently in the graph (0 if empty).
    pub fn max_activity_id(&self) -> ActivityId {
        self.all_activities().iter().map(|a| a.id).max().unwrap_or(0)
    }

    /// Replaces a round's children wholesale.
    ///
    /// The update is atomic from the caller's perspective: on any error the
    /// graph is untouched.
    pub fn update_round_children(
        &mut self,
        round_id: ActivityId,
        children: Vec<Activity>,
    ) -> Result<(), EngineError> {
        let round = self
            .find_round_mut(round_id)
            .ok_or(EngineError::UnresolvedActivity(round_id))?;
        round.child_activities = children;
        Ok(())
    }

    /// Regenerates a round's groups: destroys existing children and creates
    /// `count` fresh leaf groups with codes `<round>-g1..-gN`, splitting the
    /// round's time span evenly. Fresh ids are allocated past the current
    /// maximum, so resetting and regenerating the same count reproduces the
    /// same activity-code set while ids may differ.
    ///
    /// Returns the new group ids in group-number order.
    pub fn update_group_count(
        &mut self,
        round_id: ActivityId,
        count: u32,
    ) -> Result<Vec<ActivityId>, EngineError> {
        if count == 0 {
            return Err(EngineError::InvalidStepConfig(
                "group count must be at least 1".into(),
            ));
        }

        let next_id = self.max_activity_id() + 1;
        let round = self
            .find_round_mut(round_id)
            .ok_or(EngineError::UnresolvedActivity(round_id))?;

        let span = round.end_ms - round.start_ms;
        let round_start = round.start_ms;
        let round_name = round.name.clone();
        let round_code = round.activity_code.round_code();

        let mut ids = Vec::with_capacity(count as usize);
        let mut children = Vec::with_capacity(count as usize);
        for n in 0..count {
            let id = next_id + n;
            let start = round_start + span * i64::from(n) / i64::from(count);
            let end = round_start + span * i64::from(n + 1) / i64::from(count);
            let code = round_code.with_group(n + 1);
            let name = if round_name.is_empty() {
                format!("Group {}", n + 1)
            } else {
                format!("{}, Group {}", round_name, n + 1)
            };
            children.push(Activity::new(id, code, start, end).with_name(name));
            ids.push(id);
        }

        round.child_activities = children;
        Ok(ids)
    }

    fn find_round_mut(&mut self, round_id: ActivityId) -> Option<&mut Activity> {
        self.venues
            .iter_mut()
            .flat_map(|v| v.rooms.iter_mut())
            .flat_map(|r| r.activities.iter_mut())
            .find(|a| a.id == round_id)
    }
}

fn collect_depth_first<'a>(activity: &'a Activity, out: &mut Vec<&'a Activity>) {
    out.push(activity);
    for child in &activity.child_activities {
        collect_depth_first(child, out);
    }
}

fn subtree_contains(activity: &Activity, id: ActivityId) -> bool {
    activity.id == id || activity.child_activities.iter().any(|c| subtree_contains(c, id))
}

/// Flat per-activity facts needed in the generator's hot path.
#[derive(Debug, Clone)]
pub struct IndexedActivity {
    /// Start time (epoch ms).
    pub start_ms: i64,
    /// End time (epoch ms).
    pub end_ms: i64,
    /// Owning room.
    pub room_id: RoomId,
    /// The activity's code.
    pub code: ActivityCode,
}

impl IndexedActivity {
    /// Half-open time-range overlap with another indexed activity.
    pub fn overlaps(&self, other: &IndexedActivity) -> bool {
        self.start_ms < other.end_ms && other.start_ms < self.end_ms
    }
}

/// An id-keyed lookup over every activity in a graph.
///
/// Built once per generator run so constraint evaluation never walks the
/// tree. The graph must not be mutated while an index over it is in use.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    entries: HashMap<ActivityId, IndexedActivity>,
}

impl GraphIndex {
    /// Builds an index over every activity in the graph.
    pub fn build(graph: &CompetitionGraph) -> Self {
        let mut entries = HashMap::new();
        for venue in &graph.venues {
            for room in &venue.rooms {
                for activity in &room.activities {
                    index_subtree(activity, room.id, &mut entries);
                }
            }
        }
        Self { entries }
    }

    /// Looks up an activity's indexed facts.
    pub fn get(&self, id: ActivityId) -> Option<&IndexedActivity> {
        self.entries.get(&id)
    }

    /// Number of indexed activities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn index_subtree(
    activity: &Activity,
    room_id: RoomId,
    entries: &mut HashMap<ActivityId, IndexedActivity>,
) {
    entries.insert(
        activity.id,
        IndexedActivity {
            start_ms: activity.start_ms,
            end_ms: activity.end_ms,
            room_id,
            code: activity.activity_code.clone(),
        },
    );
    for child in &activity.child_activities {
        index_subtree(child, room_id, entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample_graph() -> CompetitionGraph {
        // Venue 1: main room with 333-r1 (2 groups) and 222-r1 (no groups yet),
        // side room with 333-r2.
        let round_333 = Activity::new(10, ActivityCode::round("333", 1), 0, 3_600_000)
            .with_name("3x3x3 Cube, Round 1")
            .with_child(
                Activity::new(12, ActivityCode::group("333", 1, 2), 1_800_000, 3_600_000)
                    .with_name("3x3x3 Cube, Round 1, Group 2"),
            )
            .with_child(
                Activity::new(11, ActivityCode::group("333", 1, 1), 0, 1_800_000)
                    .with_name("3x3x3 Cube, Round 1, Group 1"),
            );
        let round_222 = Activity::new(20, ActivityCode::round("222", 1), 3_600_000, 5_400_000)
            .with_name("2x2x2 Cube, Round 1");
        let round_333_r2 =
            Activity::new(30, ActivityCode::round("333", 2), 5_400_000, 7_200_000);

        CompetitionGraph::new().with_venue(
            Venue::new(1, "Main Venue")
                .with_room(
                    Room::new(1, "Red Stage")
                        .with_color("#cc0000")
                        .with_activity(round_333)
                        .with_activity(round_222),
                )
                .with_room(Room::new(2, "Blue Stage").with_activity(round_333_r2)),
        )
    }

    #[test]
    fn test_all_activities_depth_first_order() {
        let graph = sample_graph();
        let ids: Vec<ActivityId> = graph.all_activities().iter().map(|a| a.id).collect();
        // Round 10 precedes its children (declaration order: 12 then 11),
        // then the rest of room 1, then room 2.
        assert_eq!(ids, vec![10, 12, 11, 20, 30]);
    }

    #[test]
    fn test_find_activity() {
        let graph = sample_graph();
        assert_eq!(graph.find_activity(11).unwrap().activity_code.to_string(), "333-r1-g1");
        assert!(graph.find_activity(999).is_none());
    }

    #[test]
    fn test_groups_by_round_sorted_by_group_number() {
        let graph = sample_graph();
        let groups = graph.group_activities_by_round(10).unwrap();
        // Declared 12 (g2) before 11 (g1); query sorts ascending by number.
        let numbers: Vec<u32> = groups
            .iter()
            .map(|g| g.activity_code.group_number.unwrap())
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_groups_by_round_unknown_round() {
        let graph = sample_graph();
        assert_eq!(
            graph.group_activities_by_round(999),
            Err(EngineError::UnresolvedActivity(999))
        );
    }

    #[test]
    fn test_room_by_activity_resolves_upward() {
        let graph = sample_graph();
        assert_eq!(graph.room_by_activity(11).unwrap().name, "Red Stage");
        assert_eq!(graph.room_by_activity(30).unwrap().name, "Blue Stage");
        assert_eq!(
            graph.room_by_activity(999).unwrap_err(),
            EngineError::UnresolvedActivity(999)
        );
    }

    #[test]
    fn test_update_round_children_wholesale() {
        let mut graph = sample_graph();
        graph
            .update_round_children(
                20,
                vec![Activity::new(40, ActivityCode::group("222", 1, 1), 3_600_000, 5_400_000)],
            )
            .unwrap();
        let groups = graph.group_activities_by_round(20).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, 40);
    }

    #[test]
    fn test_update_group_count_even_split() {
        let mut graph = sample_graph();
        let ids = graph.update_group_count(20, 3).unwrap();
        assert_eq!(ids.len(), 3);

        let groups = graph.group_activities_by_round(20).unwrap();
        assert_eq!(groups[0].start_ms, 3_600_000);
        assert_eq!(groups[2].end_ms, 5_400_000);
        // Consecutive groups tile the round exactly
        assert_eq!(groups[0].end_ms, groups[1].start_ms);
        assert_eq!(groups[1].end_ms, groups[2].start_ms);
        assert_eq!(groups[1].name, "2x2x2 Cube, Round 1, Group 2");
    }

    #[test]
    fn test_reset_idempotence_on_codes() {
        let mut graph = sample_graph();
        graph.update_group_count(10, 4).unwrap();
        let codes_before: BTreeSet<String> = graph
            .group_activities_by_round(10)
            .unwrap()
            .iter()
            .map(|g| g.activity_code.to_string())
            .collect();
        let ids_before: BTreeSet<ActivityId> = graph
            .group_activities_by_round(10)
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();

        // Reset and regenerate the same count in one call
        graph.update_group_count(10, 4).unwrap();

        let codes_after: BTreeSet<String> = graph
            .group_activities_by_round(10)
            .unwrap()
            .iter()
            .map(|g| g.activity_code.to_string())
            .collect();
        let ids_after: BTreeSet<ActivityId> = graph
            .group_activities_by_round(10)
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();

        assert_eq!(codes_before, codes_after);
        // Fresh ids are allocated past the still-present old groups
        assert_ne!(ids_before, ids_after);
    }

    #[test]
    fn test_update_group_count_zero_rejected() {
        let mut graph = sample_graph();
        assert!(matches!(
            graph.update_group_count(20, 0),
            Err(EngineError::InvalidStepConfig(_))
        ));
    }

    #[test]
    fn test_competition_extensions() {
        let graph = CompetitionGraph::new().with_extension(
            "org.example.groups.CompetitionConfig",
            serde_json::json!({"localNamesFirst": true}),
        );
        assert!(graph.extension("org.example.groups.CompetitionConfig").is_some());
        assert!(graph.extension("org.example.missing").is_none());
    }

    #[test]
    fn test_graph_index() {
        let graph = sample_graph();
        let index = GraphIndex::build(&graph);
        assert_eq!(index.len(), 5);

        let g1 = index.get(11).unwrap();
        assert_eq!(g1.room_id, 1);
        assert_eq!(g1.code.to_string(), "333-r1-g1");

        let g2 = index.get(12).unwrap();
        assert!(!g1.overlaps(g2));

        let r2 = index.get(30).unwrap();
        assert_eq!(r2.room_id, 2);
        assert!(index.get(999).is_none());
    }
}
