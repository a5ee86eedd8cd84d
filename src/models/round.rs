//! Round view and eligibility rules.
//!
//! A `Round` is a lightweight view over a round activity: the event, the
//! round number, and the optional cutoff / time-limit thresholds used by
//! the eligibility helpers. Thresholds are centiseconds; lower is better
//! for every event except the fixed "multi" set, where higher is better.

use serde::{Deserialize, Serialize};

use super::activity::{Activity, ActivityId};
use super::person::Person;

/// Event ids scored higher-is-better.
pub const MULTI_EVENTS: [&str; 2] = ["333mbf", "333mbo"];

/// Whether an event's results are scored higher-is-better.
pub fn higher_is_better(event_id: &str) -> bool {
    MULTI_EVENTS.contains(&event_id)
}

/// A round of an event, as seen by the eligibility helpers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// The round activity this view was built from.
    pub activity_id: ActivityId,
    /// Event identifier.
    pub event_id: String,
    /// 1-based round number.
    pub number: u32,
    /// Cutoff threshold (centiseconds), when the round has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_centis: Option<i64>,
    /// Time-limit threshold (centiseconds), when the round has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_centis: Option<i64>,
}

impl Round {
    /// Builds a round view from a round activity. Group-level codes are
    /// accepted and reduced to their round.
    pub fn from_activity(activity: &Activity) -> Self {
        let code = activity.activity_code.round_code();
        Self {
            activity_id: activity.id,
            event_id: code.event_id,
            number: code.round_number,
            cutoff_centis: None,
            time_limit_centis: None,
        }
    }

    /// Sets the cutoff threshold.
    pub fn with_cutoff(mut self, centis: i64) -> Self {
        self.cutoff_centis = Some(centis);
        self
    }

    /// Sets the time-limit threshold.
    pub fn with_time_limit(mut self, centis: i64) -> Self {
        self.time_limit_centis = Some(centis);
        self
    }

    /// Whether the person's personal best clears the cutoff.
    ///
    /// No recorded personal best never clears a configured cutoff; a round
    /// without a cutoff is cleared by everyone.
    pub fn may_make_cutoff(&self, person: &Person) -> bool {
        self.clears_threshold(person, self.cutoff_centis)
    }

    /// Whether the person's personal best fits inside the time limit.
    pub fn may_make_time_limit(&self, person: &Person) -> bool {
        self.clears_threshold(person, self.time_limit_centis)
    }

    /// Round-eligibility: accepted registration for this round's event, and
    /// either this is the first round or the person clears the advancement
    /// threshold. Advancement uses the round's cutoff when configured, and
    /// otherwise requires any recorded personal best for the event.
    pub fn person_should_be_in(&self, person: &Person) -> bool {
        use super::person::RegistrationStatus;

        if person.registration.status != RegistrationStatus::Accepted {
            return false;
        }
        if !person.registration.event_ids.contains(&self.event_id) {
            return false;
        }
        if self.number <= 1 {
            return true;
        }
        match self.cutoff_centis {
            Some(_) => self.may_make_cutoff(person),
            None => person.personal_bests.contains_key(&self.event_id),
        }
    }

    /// Filters a roster to the persons eligible for this round, preserving
    /// roster order.
    pub fn eligible_persons<'a>(&self, persons: &'a [Person]) -> Vec<&'a Person> {
        persons.iter().filter(|p| self.person_should_be_in(p)).collect()
    }

    fn clears_threshold(&self, person: &Person, threshold: Option<i64>) -> bool {
        let Some(threshold) = threshold else {
            return true;
        };
        let Some(&best) = person.personal_bests.get(&self.event_id) else {
            return false;
        };
        if higher_is_better(&self.event_id) {
            best > threshold
        } else {
            best < threshold
        }
    }
}
