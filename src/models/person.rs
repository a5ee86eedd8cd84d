//! Person and roster model.
//!
//! A person is a competitor or staff member with a registration, role tags,
//! personal records, and the ordered list of assignments the engine manages.
//! A roster is a plain sequence of persons; recipe execution treats it as an
//! immutable snapshot and produces updated copies.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::activity::ActivityId;

/// Unique registrant identifier within a competition.
pub type RegistrantId = u32;

/// Assignment code for competing in a group.
pub const CODE_COMPETITOR: &str = "competitor";
/// Prefix shared by every staff assignment code.
pub const STAFF_PREFIX: &str = "staff-";

/// Registration status of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    /// Registration accepted; the person participates.
    Accepted,
    /// Registration pending review.
    Pending,
    /// Registration deleted/cancelled.
    Deleted,
}

/// A person's registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Registration status.
    pub status: RegistrationStatus,
    /// Event ids the person registered for.
    #[serde(default)]
    pub event_ids: BTreeSet<String>,
}

impl Registration {
    /// Creates an accepted registration for the given events.
    pub fn accepted<I, S>(event_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status: RegistrationStatus::Accepted,
            event_ids: event_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Sets the status.
    pub fn with_status(mut self, status: RegistrationStatus) -> Self {
        self.status = status;
        self
    }
}

/// A (person, activity, role-code) tuple: what a person does during one
/// group's time slot. Owned by exactly one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// The group activity this assignment references.
    pub activity_id: ActivityId,
    /// Role code: `"competitor"`, `"staff-judge"`, `"staff-scrambler"`, ...
    pub assignment_code: String,
    /// Station number within the group, when stations are assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_number: Option<u32>,
}

impl Assignment {
    /// Creates an assignment without a station number.
    pub fn new(activity_id: ActivityId, assignment_code: impl Into<String>) -> Self {
        Self {
            activity_id,
            assignment_code: assignment_code.into(),
            station_number: None,
        }
    }

    /// Sets the station number.
    pub fn with_station(mut self, station: u32) -> Self {
        self.station_number = Some(station);
        self
    }

    /// Whether this is a staff assignment (`staff-*` code).
    pub fn is_staff(&self) -> bool {
        self.assignment_code.starts_with(STAFF_PREFIX)
    }
}

/// Matches an assignment code against a pattern. A trailing `*` makes the
/// pattern a prefix match (`"staff-*"` matches every staff code); otherwise
/// the match is exact.
pub fn code_matches(pattern: &str, code: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => code.starts_with(prefix),
        None => code == pattern,
    }
}

/// A competitor or staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Unique registrant identifier.
    pub registrant_id: RegistrantId,
    /// Full name ("Given Surname").
    pub name: String,
    /// External federation identifier. Absent for first-time competitors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wca_id: Option<String>,
    /// Role tags ("delegate", "organizer", "staff-dataentry", ...).
    #[serde(default)]
    pub roles: Vec<String>,
    /// Registration state.
    pub registration: Registration,
    /// Personal bests per event, in centiseconds (event-specific scoring
    /// for "multi" events is handled by the round model).
    #[serde(default)]
    pub personal_bests: HashMap<String, i64>,
    /// Assignments, in the order they were created.
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

impl Person {
    /// Creates a person with an accepted, event-less registration.
    pub fn new(registrant_id: RegistrantId, name: impl Into<String>) -> Self {
        Self {
            registrant_id,
            name: name.into(),
            wca_id: None,
            roles: Vec::new(),
            registration: Registration::accepted(Vec::<String>::new()),
            personal_bests: HashMap::new(),
            assignments: Vec::new(),
        }
    }

    /// Sets the external federation id.
    pub fn with_wca_id(mut self, wca_id: impl Into<String>) -> Self {
        self.wca_id = Some(wca_id.into());
        self
    }

    /// Adds a role tag.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Replaces the registration.
    pub fn with_registration(mut self, registration: Registration) -> Self {
        self.registration = registration;
        self
    }

    /// Records a personal best for an event (centiseconds).
    pub fn with_personal_best(mut self, event_id: impl Into<String>, result: i64) -> Self {
        self.personal_bests.insert(event_id.into(), result);
        self
    }

    /// Adds an assignment (builder form; does not deduplicate).
    pub fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    /// Whether this person has never competed before (no federation id).
    pub fn is_first_timer(&self) -> bool {
        self.wca_id.is_none()
    }

    /// The person's surname: the last whitespace-separated name token.
    pub fn surname(&self) -> &str {
        self.name.split_whitespace().last().unwrap_or("")
    }

    /// The first initial of the given name, lowercased.
    pub fn first_initial(&self) -> Option<char> {
        self.name
            .split_whitespace()
            .next()
            .and_then(|t| t.chars().next())
            .map(|c| c.to_ascii_lowercase())
    }

    /// The assignment for an exact activity, if any.
    pub fn assignment_for(&self, activity_id: ActivityId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.activity_id == activity_id)
    }

    /// Whether any assignment within `activity_ids` matches the code
    /// pattern (`*` suffix wildcard, see [`code_matches`]).
    pub fn has_assignment_matching(
        &self,
        activity_ids: &std::collections::HashSet<ActivityId>,
        pattern: &str,
    ) -> bool {
        self.assignments
            .iter()
            .any(|a| activity_ids.contains(&a.activity_id) && code_matches(pattern, &a.assignment_code))
    }

    /// Inserts or replaces the assignment for its activity id, keeping the
    /// at-most-one-assignment-per-activity invariant.
    pub fn upsert_assignment(&mut self, assignment: Assignment) {
        match self
            .assignments
            .iter_mut()
            .find(|a| a.activity_id == assignment.activity_id)
        {
            Some(existing) => *existing = assignment,
            None => self.assignments.push(assignment),
        }
    }

    /// Removes the assignment for an activity, if present.
    pub fn remove_assignment(&mut self, activity_id: ActivityId) {
        self.assignments.retain(|a| a.activity_id != activity_id);
    }
}

/// Filters a roster to accepted registrations, preserving order.
pub fn accepted_registrations(persons: &[Person]) -> Vec<&Person> {
    persons
        .iter()
        .filter(|p| p.registration.status == RegistrationStatus::Accepted)
        .collect()
}
