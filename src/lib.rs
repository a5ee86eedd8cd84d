//! Group scheduling engine for sporting competitions.
//!
//! Given a roster of people, a tree of time-sliced group activities, and a
//! pipeline of configurable steps, the engine assigns each person to at
//! most one group per time slot while satisfying a weighted set of hard
//! and soft constraints (no double-booking, balanced group sizes, staff
//! adjacency, avoiding duplicate surnames in a group).
//!
//! # Modules
//!
//! - **`models`**: Domain types - `CompetitionGraph`, `Activity`, `Room`,
//!   `Person`, `Assignment`, `Round`
//! - **`cluster`**: Declarative person filtering (`ClusterDefinition`)
//! - **`constraints`**: Named, weighted hard/soft placement constraints
//! - **`generator`**: Heuristic assignment generation (`assignEveryone`)
//! - **`pipeline`**: Step/recipe execution as a fold over snapshots
//! - **`validation`**: Input integrity checks (duplicate ids, dangling refs)
//!
//! # Architecture
//!
//! The engine is synchronous and single-threaded: scheduling runs are
//! short-lived, CPU-bound computations over in-memory data with no I/O in
//! the hot path. It holds no locks and assumes exclusive roster access for
//! the duration of a recipe run. Everything declarative (clusters,
//! constraint specs, steps, recipes) is serde data, resolved against
//! closed libraries before execution; generation itself is deterministic,
//! so identical inputs always produce identical assignments.

pub mod cluster;
pub mod constraints;
pub mod error;
pub mod generator;
pub mod models;
pub mod pipeline;
pub mod validation;
