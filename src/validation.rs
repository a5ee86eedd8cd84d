//! Input validation for scheduling runs.
//!
//! Checks structural integrity of a competition graph and roster before
//! any recipe executes. Detects:
//! - Duplicate activity ids
//! - Duplicate registrant ids
//! - Assignments referencing unknown activities
//! - Duplicate per-person assignments for one activity
//! - Group activities nested below depth two
//! - Group codes that do not belong to their parent round

use std::collections::HashSet;

use crate::models::{ActivityId, CompetitionGraph, Person, RegistrantId};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two activities share the same id.
    DuplicateActivityId,
    /// Two persons share the same registrant id.
    DuplicateRegistrantId,
    /// An assignment references an activity that doesn't exist.
    UnknownAssignmentActivity,
    /// A person holds two assignments for the same activity.
    DuplicateAssignment,
    /// A leaf group has child activities of its own.
    NestedGroup,
    /// A round's child carries a code from a different round.
    MismatchedGroupCode,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a graph and roster before scheduling.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with every detected issue.
pub fn validate_input(graph: &CompetitionGraph, roster: &[Person]) -> ValidationResult {
    let mut errors = Vec::new();

    // Activity id uniqueness, group nesting, code consistency
    let mut activity_ids: HashSet<ActivityId> = HashSet::new();
    for activity in graph.all_activities() {
        if !activity_ids.insert(activity.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateActivityId,
                format!("duplicate activity id {}", activity.id),
            ));
        }
    }
    for venue in &graph.venues {
        for room in &venue.rooms {
            for round in &room.activities {
                for group in &round.child_activities {
                    if !group.child_activities.is_empty() {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::NestedGroup,
                            format!("group activity {} has children of its own", group.id),
                        ));
                    }
                    let code = &group.activity_code;
                    if !code.is_group() || !code.same_round(&round.activity_code) {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::MismatchedGroupCode,
                            format!(
                                "activity {} carries code `{}` under round `{}`",
                                group.id, code, round.activity_code
                            ),
                        ));
                    }
                }
            }
        }
    }

    // Registrant id uniqueness and assignment integrity
    let mut registrant_ids: HashSet<RegistrantId> = HashSet::new();
    for person in roster {
        if !registrant_ids.insert(person.registrant_id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateRegistrantId,
                format!("duplicate registrant id {}", person.registrant_id),
            ));
        }

        let mut assigned: HashSet<ActivityId> = HashSet::new();
        for assignment in &person.assignments {
            if !activity_ids.contains(&assignment.activity_id) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownAssignmentActivity,
                    format!(
                        "person {} assigned to unknown activity {}",
                        person.registrant_id, assignment.activity_id
                    ),
                ));
            }
            if !assigned.insert(assignment.activity_id) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateAssignment,
                    format!(
                        "person {} has two assignments for activity {}",
                        person.registrant_id, assignment.activity_id
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Activity, ActivityCode, Assignment, Room, Venue, CODE_COMPETITOR};

    fn sample_graph() -> CompetitionGraph {
        let round = Activity::new(10, ActivityCode::round("333", 1), 0, 2000)
            .with_child(Activity::new(11, ActivityCode::group("333", 1, 1), 0, 1000))
            .with_child(Activity::new(12, ActivityCode::group("333", 1, 2), 1000, 2000));
        CompetitionGraph::new()
            .with_venue(Venue::new(1, "V").with_room(Room::new(1, "R").with_activity(round)))
    }

    #[test]
    fn test_valid_input() {
        let roster = vec![
            Person::new(1, "A B").with_assignment(Assignment::new(11, CODE_COMPETITOR)),
            Person::new(2, "C D"),
        ];
        assert!(validate_input(&sample_graph(), &roster).is_ok());
    }

    #[test]
    fn test_duplicate_activity_id() {
        let round = Activity::new(10, ActivityCode::round("333", 1), 0, 2000)
            .with_child(Activity::new(11, ActivityCode::group("333", 1, 1), 0, 1000))
            .with_child(Activity::new(11, ActivityCode::group("333", 1, 2), 1000, 2000));
        let graph = CompetitionGraph::new()
            .with_venue(Venue::new(1, "V").with_room(Room::new(1, "R").with_activity(round)));

        let errors = validate_input(&graph, &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateActivityId));
    }

    #[test]
    fn test_duplicate_registrant_id() {
        let roster = vec![Person::new(1, "A B"), Person::new(1, "C D")];
        let errors = validate_input(&sample_graph(), &roster).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateRegistrantId));
    }

    #[test]
    fn test_unknown_assignment_activity() {
        let roster = vec![Person::new(1, "A B").with_assignment(Assignment::new(999, CODE_COMPETITOR))];
        let errors = validate_input(&sample_graph(), &roster).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownAssignmentActivity));
    }

    #[test]
    fn test_duplicate_assignment() {
        let roster = vec![Person::new(1, "A B")
            .with_assignment(Assignment::new(11, CODE_COMPETITOR))
            .with_assignment(Assignment::new(11, "staff-judge"))];
        let errors = validate_input(&sample_graph(), &roster).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateAssignment));
    }

    #[test]
    fn test_nested_group() {
        let round = Activity::new(10, ActivityCode::round("333", 1), 0, 2000).with_child(
            Activity::new(11, ActivityCode::group("333", 1, 1), 0, 1000).with_child(Activity::new(
                13,
                ActivityCode::group("333", 1, 3),
                0,
                500,
            )),
        );
        let graph = CompetitionGraph::new()
            .with_venue(Venue::new(1, "V").with_room(Room::new(1, "R").with_activity(round)));

        let errors = validate_input(&graph, &[]).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::NestedGroup));
    }

    #[test]
    fn test_mismatched_group_code() {
        let round = Activity::new(10, ActivityCode::round("333", 1), 0, 2000)
            .with_child(Activity::new(11, ActivityCode::group("222", 1, 1), 0, 1000));
        let graph = CompetitionGraph::new()
            .with_venue(Venue::new(1, "V").with_room(Room::new(1, "R").with_activity(round)));

        let errors = validate_input(&graph, &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::MismatchedGroupCode));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let roster = vec![
            Person::new(1, "A B").with_assignment(Assignment::new(999, CODE_COMPETITOR)),
            Person::new(1, "C D"),
        ];
        let errors = validate_input(&sample_graph(), &roster).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
