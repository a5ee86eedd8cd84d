//! Competition domain models.
//!
//! Provides the data types the engine operates on: the activity graph
//! (venues, rooms, rounds, groups), persons with registrations and
//! assignments, and the round view backing eligibility checks.
//!
//! All model types are serde-serializable with camelCase field names,
//! matching the interchange format rosters and schedules arrive in.

mod activity;
mod graph;
mod person;
mod round;

pub use activity::{Activity, ActivityCode, ActivityId};
pub use graph::{CompetitionGraph, GraphIndex, IndexedActivity, Room, RoomId, Venue};
pub use person::{
    accepted_registrations, code_matches, Assignment, Person, Registration, RegistrantId,
    RegistrationStatus, CODE_COMPETITOR, STAFF_PREFIX,
};
pub use round::{higher_is_better, Round, MULTI_EVENTS};
