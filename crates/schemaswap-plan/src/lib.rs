//! Dependency graph building and migration planning.
//!
//! Consumes a frozen [`schemaswap_registry::RoleRegistry`], orders roles by
//! their relation dependencies ([`graph`]), and emits a deterministic
//! [`planner::ConstructionPlan`] for an external schema executor. Plans can
//! be persisted and diffed via [`storage`].

pub mod graph;
pub mod planner;
pub mod storage;

pub use graph::{DependencyGraph, GraphError, RelationEdge, build_graph};
pub use planner::{ConstructionPlan, MigrationPlanner, Operation, PlanError};
