//! Step and recipe pipeline.
//!
//! A recipe is a named, ordered sequence of steps encoding a reusable
//! scheduling policy ("assign staff first, then first-timers, then
//! everyone else, then judges"). Steps are pure configuration: executing a
//! recipe folds them left to right over immutable snapshots,
//! `roster_{i+1} = apply(roster_i, step_i)`, with the graph threading
//! through the same way.
//!
//! Hydration is late-bound: each step's cluster and target activities
//! resolve against the snapshot produced by the previous step, so a judges
//! step sees the competitor assignments an earlier step created.
//!
//! Every generator, filter, and constraint name in every step is resolved
//! before the first step runs; a bad name aborts the whole recipe with no
//! mutation. Unplaceable persons never halt a recipe: they accumulate into
//! the outcome's diagnostics list.

use serde::{Deserialize, Serialize};

use crate::cluster::{resolve_cluster, resolve_filters, ClusterBase, ClusterDefinition, PersonFilter};
use crate::constraints::{resolve_constraints, ConstraintSpec, WeightedConstraint};
use crate::error::EngineError;
use crate::generator::{
    assign_everyone, resolve_generator, GeneratedAssignment, GeneratorKind, GeneratorOptions,
    UnplacedPerson,
};
use crate::models::{
    Activity, ActivityId, Assignment, CompetitionGraph, GraphIndex, Person,
};

/// Declares how many groups a round should have; executing it regenerates
/// the round's children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupsStep {
    /// Number of groups to create.
    pub count: u32,
}

/// Selects the group activities an assignments step targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivitiesDefinition {
    /// Every group of the step's round. The default.
    #[default]
    AllGroupsInRound,
    /// Groups with the listed group numbers.
    GroupNumbers(Vec<u32>),
    /// Explicit activity ids.
    ActivityIds(Vec<ActivityId>),
}

/// Runs a generator over a cluster and a set of target groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentsStep {
    /// Generator strategy name.
    pub generator: String,
    /// Assignment code to generate.
    pub assignment_code: String,
    /// Who to assign.
    pub cluster: ClusterDefinition,
    /// Which groups to assign into.
    #[serde(default)]
    pub activities: ActivitiesDefinition,
    /// Weighted constraint set.
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
    /// Generator options.
    #[serde(default)]
    pub options: GeneratorOptions,
}

/// One step of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Step {
    /// Regenerate the round's groups.
    Groups(GroupsStep),
    /// Generate assignments.
    Assignments(AssignmentsStep),
}

/// A named, versionable scheduling policy: an ordered step list.
///
/// Recipes are data, not code; they round-trip through JSON so they can be
/// stored and edited without redeploying the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeConfig {
    /// Stable recipe identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the recipe is for.
    #[serde(default)]
    pub description: String,
    /// Steps, executed left to right.
    pub steps: Vec<Step>,
}

enum ResolvedStep {
    Groups {
        count: u32,
    },
    Assignments {
        generator: GeneratorKind,
        assignment_code: String,
        base: ClusterBase,
        filters: Vec<PersonFilter>,
        activities: ActivitiesDefinition,
        constraints: Vec<WeightedConstraint>,
        options: GeneratorOptions,
    },
}

/// A recipe with every name resolved against the closed libraries.
pub struct ResolvedRecipe {
    steps: Vec<ResolvedStep>,
}

impl ResolvedRecipe {
    /// Resolves every step of a recipe, fail-fast: the first unknown
    /// generator/filter/constraint name or malformed value aborts before
    /// anything executes.
    pub fn resolve(recipe: &RecipeConfig) -> Result<Self, EngineError> {
        let steps = recipe
            .steps
            .iter()
            .map(|step| match step {
                Step::Groups(g) => {
                    if g.count == 0 {
                        return Err(EngineError::InvalidStepConfig(
                            "groups step count must be at least 1".into(),
                        ));
                    }
                    Ok(ResolvedStep::Groups { count: g.count })
                }
                Step::Assignments(a) => Ok(ResolvedStep::Assignments {
                    generator: resolve_generator(&a.generator)?,
                    assignment_code: a.assignment_code.clone(),
                    base: a.cluster.base,
                    filters: resolve_filters(&a.cluster.filters)?,
                    activities: a.activities.clone(),
                    constraints: resolve_constraints(&a.constraints)?,
                    options: a.options,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }

    /// Executes the recipe against snapshots of the graph and roster.
    ///
    /// The inputs are never mutated; the outcome carries the final graph
    /// and roster snapshots, every generated assignment, and the
    /// accumulated per-step diagnostics.
    pub fn execute(
        &self,
        graph: &CompetitionGraph,
        roster: &[Person],
        round_id: ActivityId,
    ) -> Result<RecipeOutcome, EngineError> {
        let mut graph = graph.clone();
        let mut roster: Vec<Person> = roster.to_vec();
        let mut assignments: Vec<GeneratedAssignment> = Vec::new();
        let mut diagnostics: Vec<StepDiagnostic> = Vec::new();

        for (step_index, step) in self.steps.iter().enumerate() {
            match step {
                ResolvedStep::Groups { count } => {
                    let ids = graph.update_group_count(round_id, *count)?;
                    tracing::debug!(step_index, count, groups = ids.len(), "regenerated groups");
                }
                ResolvedStep::Assignments {
                    generator: GeneratorKind::AssignEveryone,
                    assignment_code,
                    base,
                    filters,
                    activities,
                    constraints,
                    options,
                } => {
                    let cluster = resolve_cluster(&graph, &roster, *base, filters, round_id)?;
                    let groups = select_groups(&graph, activities, round_id)?;
                    let index = GraphIndex::build(&graph);

                    let result = assign_everyone(
                        &cluster,
                        &groups,
                        assignment_code,
                        constraints,
                        options,
                        &roster,
                        &index,
                    );

                    tracing::debug!(
                        step_index,
                        code = assignment_code.as_str(),
                        cluster = cluster.len(),
                        placed = result.assignments.len(),
                        unplaced = result.unplaced.len(),
                        "assignments step finished"
                    );

                    apply_assignments(&mut roster, &result.assignments);
                    assignments.extend(result.assignments);
                    if !result.unplaced.is_empty() {
                        diagnostics.push(StepDiagnostic {
                            step_index,
                            unplaced: result.unplaced,
                        });
                    }
                }
            }
        }

        Ok(RecipeOutcome {
            graph,
            roster,
            assignments,
            diagnostics,
        })
    }
}

/// Unplaced-person diagnostics for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDiagnostic {
    /// Index of the step within the recipe.
    pub step_index: usize,
    /// Persons the step could not place.
    pub unplaced: Vec<UnplacedPerson>,
}

/// Final state and outputs of a recipe run.
#[derive(Debug, Clone)]
pub struct RecipeOutcome {
    /// Graph snapshot after all groups steps.
    pub graph: CompetitionGraph,
    /// Roster snapshot with all generated assignments applied.
    pub roster: Vec<Person>,
    /// Every assignment generated across all steps, in step order.
    pub assignments: Vec<GeneratedAssignment>,
    /// Per-step unplaced-person diagnostics.
    pub diagnostics: Vec<StepDiagnostic>,
}

/// Resolves and executes a recipe in one call.
pub fn execute_recipe(
    graph: &CompetitionGraph,
    roster: &[Person],
    recipe: &RecipeConfig,
    round_id: ActivityId,
) -> Result<RecipeOutcome, EngineError> {
    ResolvedRecipe::resolve(recipe)?.execute(graph, roster, round_id)
}

fn select_groups<'a>(
    graph: &'a CompetitionGraph,
    activities: &ActivitiesDefinition,
    round_id: ActivityId,
) -> Result<Vec<&'a Activity>, EngineError> {
    match activities {
        ActivitiesDefinition::AllGroupsInRound => graph.group_activities_by_round(round_id),
        ActivitiesDefinition::GroupNumbers(numbers) => {
            let groups = graph.group_activities_by_round(round_id)?;
            numbers
                .iter()
                .map(|&n| {
                    groups
                        .iter()
                        .find(|g| g.activity_code.group_number == Some(n))
                        .copied()
                        .ok_or_else(|| {
                            EngineError::InvalidStepConfig(format!(
                                "round {round_id} has no group {n}"
                            ))
                        })
                })
                .collect()
        }
        ActivitiesDefinition::ActivityIds(ids) => ids
            .iter()
            .map(|&id| {
                graph
                    .find_activity(id)
                    .ok_or(EngineError::UnresolvedActivity(id))
            })
            .collect(),
    }
}

/// Applies a generation result to the roster snapshot, all or nothing.
fn apply_assignments(roster: &mut [Person], assignments: &[GeneratedAssignment]) {
    for generated in assignments {
        if let Some(person) = roster
            .iter_mut()
            .find(|p| p.registrant_id == generated.registrant_id)
        {
            let mut assignment =
                Assignment::new(generated.activity_id, generated.assignment_code.clone());
            if let Some(station) = generated.station_number {
                assignment = assignment.with_station(station);
            }
            person.upsert_assignment(assignment);
        }
    }
}
