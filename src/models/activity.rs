//! Activity model.
//!
//! An activity is a scheduled time block in the competition: either a round
//! (top-level entry in a room's timetable) or a group, one shift of
//! competitors/staff within a round. Groups are leaves; a round's children
//! are exactly its groups.
//!
//! # Activity Codes
//!
//! Every activity carries a composable code of the form `event-rN[-gM]`,
//! e.g. `333-r1` for a round and `333-r1-g2` for its second group. The code
//! is the stable key used for group ordering, adjacency checks, and reset
//! idempotence: regenerating a round's groups reproduces the same code set
//! even though fresh ids are allocated.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EngineError;

/// Unique activity identifier within a competition.
pub type ActivityId = u32;

/// A parsed activity code: `event-rN` for rounds, `event-rN-gM` for groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActivityCode {
    /// Event identifier (e.g. "333", "222", "333mbf").
    pub event_id: String,
    /// 1-based round number.
    pub round_number: u32,
    /// 1-based group number. `None` for round-level codes.
    pub group_number: Option<u32>,
}

impl ActivityCode {
    /// Creates a round-level code.
    pub fn round(event_id: impl Into<String>, round_number: u32) -> Self {
        Self {
            event_id: event_id.into(),
            round_number,
            group_number: None,
        }
    }

    /// Creates a group-level code.
    pub fn group(event_id: impl Into<String>, round_number: u32, group_number: u32) -> Self {
        Self {
            event_id: event_id.into(),
            round_number,
            group_number: Some(group_number),
        }
    }

    /// Whether this is a round-level code (no group suffix).
    pub fn is_round(&self) -> bool {
        self.group_number.is_none()
    }

    /// Whether this is a group-level code.
    pub fn is_group(&self) -> bool {
        self.group_number.is_some()
    }

    /// The round-level code this code belongs to (drops any group suffix).
    pub fn round_code(&self) -> ActivityCode {
        ActivityCode::round(self.event_id.clone(), self.round_number)
    }

    /// Derives the code of group `n` under this round.
    pub fn with_group(&self, n: u32) -> ActivityCode {
        ActivityCode::group(self.event_id.clone(), self.round_number, n)
    }

    /// Whether two codes address the same round (ignoring group suffixes).
    pub fn same_round(&self, other: &ActivityCode) -> bool {
        self.event_id == other.event_id && self.round_number == other.round_number
    }
}

impl fmt::Display for ActivityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-r{}", self.event_id, self.round_number)?;
        if let Some(g) = self.group_number {
            write!(f, "-g{g}")?;
        }
        Ok(())
    }
}

impl FromStr for ActivityCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || EngineError::InvalidStepConfig(format!("malformed activity code `{s}`"));

        let mut parts = s.split('-');
        let event_id = parts.next().filter(|p| !p.is_empty()).ok_or_else(malformed)?;

        let round_part = parts.next().ok_or_else(malformed)?;
        let round_number = round_part
            .strip_prefix('r')
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|&n| n >= 1)
            .ok_or_else(malformed)?;

        let group_number = match parts.next() {
            None => None,
            Some(group_part) => Some(
                group_part
                    .strip_prefix('g')
                    .and_then(|n| n.parse::<u32>().ok())
                    .filter(|&n| n >= 1)
                    .ok_or_else(malformed)?,
            ),
        };

        if parts.next().is_some() {
            return Err(malformed());
        }

        Ok(ActivityCode {
            event_id: event_id.to_string(),
            round_number,
            group_number,
        })
    }
}

impl Serialize for ActivityCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ActivityCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|e: EngineError| D::Error::custom(e.to_string()))
    }
}

/// A scheduled time block: a round activity or one of its leaf groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Unique activity identifier within the competition.
    pub id: ActivityId,
    /// Composable key encoding event, round and group number.
    pub activity_code: ActivityCode,
    /// Human-readable name (e.g. "3x3x3 Cube, Round 1, Group 2").
    pub name: String,
    /// Start time (epoch ms).
    pub start_ms: i64,
    /// End time (epoch ms).
    pub end_ms: i64,
    /// Child activities. Empty for leaf groups; a round's children are
    /// exactly its groups.
    #[serde(default)]
    pub child_activities: Vec<Activity>,
    /// Namespaced opaque config (key: reverse-DNS namespace + name).
    /// Persisted by collaborators; the engine only reads the
    /// `groupCount` / `expectedRegistrations` hints when present.
    #[serde(default)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl Activity {
    /// Creates a new activity.
    pub fn new(id: ActivityId, code: ActivityCode, start_ms: i64, end_ms: i64) -> Self {
        Self {
            id,
            activity_code: code,
            name: String::new(),
            start_ms,
            end_ms,
            child_activities: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a child activity.
    pub fn with_child(mut self, child: Activity) -> Self {
        self.child_activities.push(child);
        self
    }

    /// Attaches a namespaced extension value.
    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Duration in milliseconds.
    #[inline]
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Whether this activity's time range overlaps another's.
    /// Ranges are half-open: touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Activity) -> bool {
        self.start_ms < other.end_ms && other.start_ms < self.end_ms
    }

    /// Whether this is a leaf group activity.
    pub fn is_group(&self) -> bool {
        self.activity_code.is_group()
    }

    /// Looks up an extension value by its namespaced key.
    pub fn extension(&self, key: &str) -> Option<&serde_json::Value> {
        self.extensions.get(key)
    }

    /// The recommended group count hint, scanning extension objects for a
    /// `groupCount` field. Advisory only; never required by the generator.
    pub fn group_count_hint(&self) -> Option<u32> {
        self.extension_field_u32("groupCount")
    }

    /// The expected registration count hint (`expectedRegistrations` field).
    pub fn expected_registrations_hint(&self) -> Option<u32> {
        self.extension_field_u32("expectedRegistrations")
    }

    fn extension_field_u32(&self, field: &str) -> Option<u32> {
        self.extensions
            .values()
            .find_map(|v| v.get(field))
            .and_then(|v| v.as_u64())
            .and_then(|n| u32::try_from(n).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_code_parse_round() {
        let code: ActivityCode = "333-r1".parse().unwrap();
        assert_eq!(code.event_id, "333");
        assert_eq!(code.round_number, 1);
        assert_eq!(code.group_number, None);
        assert!(code.is_round());
        assert!(!code.is_group());
    }

    #[test]
    fn test_code_parse_group() {
        let code: ActivityCode = "333mbf-r2-g13".parse().unwrap();
        assert_eq!(code.event_id, "333mbf");
        assert_eq!(code.round_number, 2);
        assert_eq!(code.group_number, Some(13));
        assert!(code.is_group());
    }

    #[test]
    fn test_code_parse_malformed() {
        for bad in ["", "333", "333-g1", "333-r0", "333-r1-gx", "333-r1-g2-x"] {
            assert!(bad.parse::<ActivityCode>().is_err(), "accepted `{bad}`");
        }
    }

    #[test]
    fn test_code_display_roundtrip() {
        for s in ["222-r1", "333-r3-g7"] {
            let code: ActivityCode = s.parse().unwrap();
            assert_eq!(code.to_string(), s);
        }
    }

    #[test]
    fn test_code_round_and_group_derivation() {
        let group: ActivityCode = "333-r1-g2".parse().unwrap();
        let round = group.round_code();
        assert_eq!(round.to_string(), "333-r1");
        assert_eq!(round.with_group(5).to_string(), "333-r1-g5");
        assert!(group.same_round(&round.with_group(9)));
        assert!(!group.same_round(&ActivityCode::round("333", 2)));
    }

    #[test]
    fn test_code_serde_as_string() {
        let code = ActivityCode::group("444", 1, 3);
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"444-r1-g3\"");
        let back: ActivityCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn test_activity_overlap() {
        let a = Activity::new(1, ActivityCode::group("333", 1, 1), 0, 1000);
        let b = Activity::new(2, ActivityCode::group("333", 1, 2), 500, 1500);
        let c = Activity::new(3, ActivityCode::group("333", 1, 3), 1000, 2000);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // Touching endpoints do not overlap
        assert!(!a.overlaps(&c));
        assert_eq!(a.duration_ms(), 1000);
    }

    #[test]
    fn test_extension_hints() {
        let act = Activity::new(1, ActivityCode::round("333", 1), 0, 3_600_000)
            .with_name("3x3x3 Cube, Round 1")
            .with_extension(
                "org.example.groups.RoundConfig",
                json!({"groupCount": 4, "expectedRegistrations": 60}),
            );

        assert_eq!(act.group_count_hint(), Some(4));
        assert_eq!(act.expected_registrations_hint(), Some(60));
        assert!(act.extension("org.example.groups.RoundConfig").is_some());
        assert!(act.extension("org.example.other").is_none());
    }

    #[test]
    fn test_extension_hint_absent() {
        let act = Activity::new(1, ActivityCode::round("333", 1), 0, 100);
        assert_eq!(act.group_count_hint(), None);
        assert_eq!(act.expected_registrations_hint(), None);
    }

    #[test]
    fn test_activity_serde_camel_case() {
        let act = Activity::new(9, ActivityCode::group("333", 1, 1), 10, 20).with_name("G1");
        let v = serde_json::to_value(&act).unwrap();
        assert_eq!(v["activityCode"], "333-r1-g1");
        assert_eq!(v["startMs"], 10);
        assert!(v["childActivities"].as_array().unwrap().is_empty());
    }
}
