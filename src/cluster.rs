//! Cluster resolution.
//!
//! A cluster is the subset of people a scheduling step operates on. It is
//! described declaratively by a [`ClusterDefinition`]: a base population
//! plus an ordered chain of named filters. Definitions are data; resolving
//! one recomputes the cluster against the current roster snapshot.
//!
//! Filter names form a closed set. Every name is resolved before any
//! filtering happens, so an unknown key aborts the step with
//! `UnknownFilter` and no partial cluster escapes. Filters only narrow the
//! candidate sequence and never resort it: cluster order is the base
//! population's insertion order.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{
    accepted_registrations, ActivityId, CompetitionGraph, Person, Round,
};

/// The base population a cluster starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClusterBase {
    /// Persons eligible for the step's round (registration + advancement).
    PersonsInRound,
    /// Every accepted registration.
    All,
}

/// One named filter with its configuration value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Filter name (key into the closed filter set).
    pub key: String,
    /// Filter-specific configuration value.
    #[serde(default)]
    pub value: serde_json::Value,
}

impl FilterSpec {
    /// Creates a filter spec.
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// A declarative cluster: base population plus an ordered filter chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDefinition {
    /// Base population.
    pub base: ClusterBase,
    /// Filters applied in order; each only narrows.
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

impl ClusterDefinition {
    /// A cluster of everyone eligible for the round.
    pub fn persons_in_round() -> Self {
        Self {
            base: ClusterBase::PersonsInRound,
            filters: Vec::new(),
        }
    }

    /// A cluster of the full accepted roster.
    pub fn all() -> Self {
        Self {
            base: ClusterBase::All,
            filters: Vec::new(),
        }
    }

    /// Appends a filter.
    pub fn with_filter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.filters.push(FilterSpec::new(key, value));
        self
    }
}

/// A resolved filter: one variant per name in the closed set.
#[derive(Debug, Clone)]
pub enum PersonFilter {
    /// Keeps persons holding an assignment in the round matching the code
    /// pattern (`*` suffix wildcard).
    HasAssignmentInRound {
        /// Assignment-code pattern.
        pattern: String,
    },
    /// Inverse of `HasAssignmentInRound`.
    DoesNotHaveAssignmentInRound {
        /// Assignment-code pattern.
        pattern: String,
    },
    /// Keeps persons with a role tag matching any of the patterns
    /// (logical OR).
    HasRole {
        /// Compiled role patterns.
        patterns: Vec<Regex>,
    },
    /// Keeps first-timers (`true`) or returning competitors (`false`).
    IsFirstTimer {
        /// Expected first-timer flag.
        expected: bool,
    },
}

impl PersonFilter {
    /// Resolves a filter spec against the closed filter set.
    ///
    /// Unknown keys fail with `UnknownFilter`; malformed values fail with
    /// `InvalidStepConfig`. Either way the whole step aborts.
    pub fn resolve(spec: &FilterSpec) -> Result<Self, EngineError> {
        match spec.key.as_str() {
            "hasAssignmentInRound" => Ok(Self::HasAssignmentInRound {
                pattern: code_pattern(spec)?,
            }),
            "doesNotHaveAssignmentInRound" => Ok(Self::DoesNotHaveAssignmentInRound {
                pattern: code_pattern(spec)?,
            }),
            "hasRole" => Ok(Self::HasRole {
                patterns: role_patterns(spec)?,
            }),
            "isFirstTimer" => {
                let expected = match &spec.value {
                    serde_json::Value::Null => true,
                    serde_json::Value::Bool(b) => *b,
                    other => {
                        return Err(EngineError::InvalidStepConfig(format!(
                            "isFirstTimer expects a boolean, got {other}"
                        )))
                    }
                };
                Ok(Self::IsFirstTimer { expected })
            }
            unknown => Err(EngineError::UnknownFilter(unknown.to_string())),
        }
    }

    /// Whether a person passes this filter.
    pub fn accepts(&self, person: &Person, round_group_ids: &HashSet<ActivityId>) -> bool {
        match self {
            Self::HasAssignmentInRound { pattern } => {
                person.has_assignment_matching(round_group_ids, pattern)
            }
            Self::DoesNotHaveAssignmentInRound { pattern } => {
                !person.has_assignment_matching(round_group_ids, pattern)
            }
            Self::HasRole { patterns } => patterns
                .iter()
                .any(|re| person.roles.iter().any(|role| re.is_match(role))),
            Self::IsFirstTimer { expected } => person.is_first_timer() == *expected,
        }
    }
}

fn code_pattern(spec: &FilterSpec) -> Result<String, EngineError> {
    spec.value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            EngineError::InvalidStepConfig(format!(
                "filter `{}` expects an assignment-code string",
                spec.key
            ))
        })
}

fn role_patterns(spec: &FilterSpec) -> Result<Vec<Regex>, EngineError> {
    let raw: Vec<&str> = match &spec.value {
        serde_json::Value::String(s) => vec![s.as_str()],
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_str().ok_or_else(|| {
                    EngineError::InvalidStepConfig("hasRole expects strings".into())
                })
            })
            .collect::<Result<_, _>>()?,
        other => {
            return Err(EngineError::InvalidStepConfig(format!(
                "hasRole expects a pattern or list of patterns, got {other}"
            )))
        }
    };

    raw.into_iter()
        .map(|p| {
            Regex::new(p).map_err(|e| {
                EngineError::InvalidStepConfig(format!("invalid role pattern `{p}`: {e}"))
            })
        })
        .collect()
}

/// Resolves every filter of a definition, fail-fast.
pub fn resolve_filters(specs: &[FilterSpec]) -> Result<Vec<PersonFilter>, EngineError> {
    specs.iter().map(PersonFilter::resolve).collect()
}

/// Applies a resolved base + filter chain against a roster snapshot.
///
/// Returns owned person snapshots in base-population order.
pub fn resolve_cluster(
    graph: &CompetitionGraph,
    roster: &[Person],
    base: ClusterBase,
    filters: &[PersonFilter],
    round_id: ActivityId,
) -> Result<Vec<Person>, EngineError> {
    let round_activity = graph
        .find_activity(round_id)
        .ok_or(EngineError::UnresolvedActivity(round_id))?;
    let round = Round::from_activity(round_activity);

    let round_group_ids: HashSet<ActivityId> = graph
        .group_activities_by_round(round_id)?
        .iter()
        .map(|g| g.id)
        .collect();

    let mut candidates: Vec<&Person> = match base {
        ClusterBase::PersonsInRound => round.eligible_persons(roster),
        ClusterBase::All => accepted_registrations(roster),
    };

    for filter in filters {
        candidates.retain(|p| filter.accepts(p, &round_group_ids));
    }

    Ok(candidates.into_iter().cloned().collect())
}

/// Computes the cluster for a declarative definition.
///
/// Resolves all filter names first (fail-fast), then applies the chain.
pub fn get_cluster(
    graph: &CompetitionGraph,
    roster: &[Person],
    definition: &ClusterDefinition,
    round_id: ActivityId,
) -> Result<Vec<Person>, EngineError> {
    let filters = resolve_filters(&definition.filters)?;
    resolve_cluster(graph, roster, definition.base, &filters, round_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Activity, ActivityCode, Assignment, Registration, Room, Venue, CODE_COMPETITOR,
    };
    use serde_json::json;

    fn graph_with_round() -> CompetitionGraph {
        let round = Activity::new(10, ActivityCode::round("333", 1), 0, 3_600_000)
            .with_child(Activity::new(11, ActivityCode::group("333", 1, 1), 0, 1_800_000))
            .with_child(Activity::new(
                12,
                ActivityCode::group("333", 1, 2),
                1_800_000,
                3_600_000,
            ));
        CompetitionGraph::new()
            .with_venue(Venue::new(1, "V").with_room(Room::new(1, "R").with_activity(round)))
    }

    fn roster() -> Vec<Person> {
        vec![
            Person::new(1, "Ann Alpha")
                .with_wca_id("2010ALPH01")
                .with_registration(Registration::accepted(["333"]))
                .with_role("delegate")
                .with_assignment(Assignment::new(11, CODE_COMPETITOR)),
            Person::new(2, "Bob Beta")
                .with_registration(Registration::accepted(["333"]))
                .with_assignment(Assignment::new(11, "staff-judge")),
            Person::new(3, "Cid Gamma")
                .with_wca_id("2015GAMM01")
                .with_registration(Registration::accepted(["333"])),
            Person::new(4, "Dee Delta").with_registration(Registration::accepted(["222"])),
        ]
    }

    #[test]
    fn test_base_persons_in_round() {
        let cluster = get_cluster(
            &graph_with_round(),
            &roster(),
            &ClusterDefinition::persons_in_round(),
            10,
        )
        .unwrap();
        // Person 4 is registered for another event
        let ids: Vec<u32> = cluster.iter().map(|p| p.registrant_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_base_all() {
        let cluster =
            get_cluster(&graph_with_round(), &roster(), &ClusterDefinition::all(), 10).unwrap();
        assert_eq!(cluster.len(), 4);
    }

    #[test]
    fn test_has_assignment_in_round_wildcard() {
        let def = ClusterDefinition::persons_in_round()
            .with_filter("hasAssignmentInRound", json!("staff-*"));
        let cluster = get_cluster(&graph_with_round(), &roster(), &def, 10).unwrap();
        let ids: Vec<u32> = cluster.iter().map(|p| p.registrant_id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_does_not_have_assignment_in_round() {
        let def = ClusterDefinition::persons_in_round()
            .with_filter("doesNotHaveAssignmentInRound", json!("competitor"));
        let cluster = get_cluster(&graph_with_round(), &roster(), &def, 10).unwrap();
        let ids: Vec<u32> = cluster.iter().map(|p| p.registrant_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_has_role_multiple_patterns_or() {
        let def = ClusterDefinition::all()
            .with_filter("hasRole", json!(["delegate", "organizer"]));
        let cluster = get_cluster(&graph_with_round(), &roster(), &def, 10).unwrap();
        let ids: Vec<u32> = cluster.iter().map(|p| p.registrant_id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_has_role_regex() {
        let persons = vec![
            Person::new(1, "A B").with_role("staff-dataentry"),
            Person::new(2, "C D").with_role("staff-catering"),
            Person::new(3, "E F"),
        ];
        let def = ClusterDefinition::all().with_filter("hasRole", json!("^staff-"));
        let cluster = get_cluster(&graph_with_round(), &persons, &def, 10).unwrap();
        assert_eq!(cluster.len(), 2);
    }

    #[test]
    fn test_is_first_timer() {
        let def = ClusterDefinition::persons_in_round().with_filter("isFirstTimer", json!(true));
        let cluster = get_cluster(&graph_with_round(), &roster(), &def, 10).unwrap();
        let ids: Vec<u32> = cluster.iter().map(|p| p.registrant_id).collect();
        assert_eq!(ids, vec![2]);

        let def =
            ClusterDefinition::persons_in_round().with_filter("isFirstTimer", json!(false));
        let cluster = get_cluster(&graph_with_round(), &roster(), &def, 10).unwrap();
        let ids: Vec<u32> = cluster.iter().map(|p| p.registrant_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_unknown_filter_aborts() {
        let def = ClusterDefinition::all().with_filter("hasHat", json!(true));
        let err = get_cluster(&graph_with_round(), &roster(), &def, 10).unwrap_err();
        assert_eq!(err, EngineError::UnknownFilter("hasHat".into()));
    }

    #[test]
    fn test_unknown_filter_checked_before_filtering() {
        // A valid filter followed by an unknown one: nothing is applied.
        let def = ClusterDefinition::all()
            .with_filter("isFirstTimer", json!(true))
            .with_filter("bogus", json!(null));
        assert!(matches!(
            get_cluster(&graph_with_round(), &roster(), &def, 10),
            Err(EngineError::UnknownFilter(_))
        ));
    }

    #[test]
    fn test_bad_filter_value() {
        let def = ClusterDefinition::all().with_filter("hasAssignmentInRound", json!(7));
        assert!(matches!(
            get_cluster(&graph_with_round(), &roster(), &def, 10),
            Err(EngineError::InvalidStepConfig(_))
        ));

        let def = ClusterDefinition::all().with_filter("hasRole", json!("["));
        assert!(matches!(
            get_cluster(&graph_with_round(), &roster(), &def, 10),
            Err(EngineError::InvalidStepConfig(_))
        ));
    }

    #[test]
    fn test_unknown_round_id() {
        let def = ClusterDefinition::all();
        assert_eq!(
            get_cluster(&graph_with_round(), &roster(), &def, 999).unwrap_err(),
            EngineError::UnresolvedActivity(999)
        );
    }

    #[test]
    fn test_filters_only_narrow() {
        // Property: each added filter never grows the cluster.
        let graph = graph_with_round();
        let persons = roster();
        let mut def = ClusterDefinition::persons_in_round();
        let mut last = get_cluster(&graph, &persons, &def, 10).unwrap().len();
        for (key, value) in [
            ("doesNotHaveAssignmentInRound", json!("staff-*")),
            ("isFirstTimer", json!(false)),
            ("hasRole", json!("delegate")),
        ] {
            def = def.with_filter(key, value);
            let size = get_cluster(&graph, &persons, &def, 10).unwrap().len();
            assert!(size <= last, "filter `{key}` widened the cluster");
            last = size;
        }
    }

    #[test]
    fn test_definition_serde() {
        let def = ClusterDefinition::persons_in_round()
            .with_filter("hasAssignmentInRound", json!("staff-*"));
        let v = serde_json::to_value(&def).unwrap();
        assert_eq!(v["base"], "personsInRound");
        assert_eq!(v["filters"][0]["key"], "hasAssignmentInRound");

        let back: ClusterDefinition = serde_json::from_value(v).unwrap();
        assert_eq!(back.base, ClusterBase::PersonsInRound);
        assert_eq!(back.filters.len(), 1);
    }
}
