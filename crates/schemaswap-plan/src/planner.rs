//! Migration planning: turn an ordered role set into construction operations.
//!
//! A [`ConstructionPlan`] is the artifact handed to an external schema
//! executor. It is pure data, carries no timestamps, and regenerates
//! byte-identically from identical registry state so applied plans stay
//! diffable against regenerated ones.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use schemaswap_core::model::FieldDef;
use schemaswap_registry::RoleRegistry;

use crate::graph::{DependencyGraph, GraphError, RelationEdge, build_graph};

/// Schema version of the plan format, for forward compatibility.
pub const PLAN_VERSION: &str = "1.0.0";

/// A single schema-construction operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Operation {
    /// Create the physical entity for a role.
    CreateEntity {
        role: String,
        entity: String,
        fields: Vec<FieldDef>,
    },
    /// Add a relation constraint between two already-created entities.
    AddRelation {
        source: String,
        target: String,
        relation: RelationEdge,
    },
}

/// The ordered sequence of operations an executor must apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionPlan {
    /// Plan format version.
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<Operation>,
}

impl ConstructionPlan {
    pub fn create_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::CreateEntity { .. }))
            .count()
    }

    pub fn relation_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::AddRelation { .. }))
            .count()
    }

    /// Short content hash identifying this plan revision.
    ///
    /// Computed over the compact JSON encoding, so structurally identical
    /// plans always share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        // Serialization of a plain data tree cannot fail.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hasher.update(&bytes);
        let result = hasher.finalize();
        format!("{result:x}")[..12].to_string()
    }
}

/// Errors raised while planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// One or more declared roles have no resolved type. All missing roles
    /// are listed in one report, in declaration order.
    #[error("unresolved roles: {}", .roles.join(", "))]
    Unresolved { roles: Vec<String> },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Compute a construction plan from a fully-resolved registry.
///
/// Creates every entity in dependency order, then adds immediate relation
/// constraints, then deferred ones, each group in declaration order.
pub fn compute_plan(registry: &RoleRegistry) -> Result<ConstructionPlan, PlanError> {
    let unresolved = registry.unbound_roles();
    if !unresolved.is_empty() {
        return Err(PlanError::Unresolved { roles: unresolved });
    }

    let graph = build_graph(registry)?;
    let mut operations = Vec::with_capacity(graph.order.len() + graph.edge_count());

    for role in &graph.order {
        let model = registry.resolve(role).ok_or_else(|| PlanError::Unresolved {
            roles: vec![role.clone()],
        })?;
        operations.push(Operation::CreateEntity {
            role: role.clone(),
            entity: model.entity_name.clone(),
            fields: model.fields.clone(),
        });
    }
    for edge in graph.immediate.iter().chain(&graph.deferred) {
        operations.push(Operation::AddRelation {
            source: edge.source.clone(),
            target: edge.target.clone(),
            relation: edge.clone(),
        });
    }

    let plan = ConstructionPlan {
        version: PLAN_VERSION.to_string(),
        operations,
    };
    tracing::info!(
        entities = plan.create_count(),
        relations = plan.relation_count(),
        fingerprint = %plan.fingerprint(),
        "construction plan computed"
    );
    Ok(plan)
}

/// Plans against a frozen registry, caching the result for the process
/// lifetime. [`MigrationPlanner::rebuild`] forces recomputation (e.g. a new
/// migration run).
#[derive(Debug)]
pub struct MigrationPlanner<'a> {
    registry: &'a RoleRegistry,
    cached: Option<ConstructionPlan>,
}

impl<'a> MigrationPlanner<'a> {
    #[must_use]
    pub fn new(registry: &'a RoleRegistry) -> Self {
        Self {
            registry,
            cached: None,
        }
    }

    /// The construction plan, computed on first call and cached after.
    pub fn plan(&mut self) -> Result<&ConstructionPlan, PlanError> {
        let plan = match self.cached.take() {
            Some(plan) => plan,
            None => compute_plan(self.registry)?,
        };
        Ok(self.cached.insert(plan))
    }

    /// The dependency graph backing the plan. Not cached; graph building is
    /// cheap relative to the one-shot migration flow.
    pub fn graph(&self) -> Result<DependencyGraph, PlanError> {
        Ok(build_graph(self.registry)?)
    }

    /// Drop the cached plan so the next [`MigrationPlanner::plan`] call
    /// recomputes from current registry state.
    pub fn rebuild(&mut self) {
        self.cached = None;
    }
}

/// Format a construction plan as a human-readable markdown string.
pub fn format_plan(plan: &ConstructionPlan) -> String {
    let mut out = format!("## Construction Plan (rev {})\n\n", plan.fingerprint());

    out.push_str("### Create Entities\n\n");
    let mut step = 0usize;
    for op in &plan.operations {
        if let Operation::CreateEntity { role, entity, fields } = op {
            step += 1;
            out.push_str(&format!(
                "{}. `{}` for role `{}` ({} field{})\n",
                step,
                entity,
                role,
                fields.len(),
                if fields.len() == 1 { "" } else { "s" },
            ));
        }
    }

    let immediate: Vec<&Operation> = plan
        .operations
        .iter()
        .filter(|op| matches!(op, Operation::AddRelation { relation, .. } if !relation.deferred))
        .collect();
    let deferred: Vec<&Operation> = plan
        .operations
        .iter()
        .filter(|op| matches!(op, Operation::AddRelation { relation, .. } if relation.deferred))
        .collect();

    for (title, ops) in [
        ("### Immediate Relations", immediate),
        ("### Deferred Relations", deferred),
    ] {
        if ops.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{title}\n\n"));
        for op in ops {
            if let Operation::AddRelation { source, target, relation } = op {
                out.push_str(&format!(
                    "- `{}`.`{}` -> `{}` ({}{})\n",
                    source,
                    relation.name,
                    target,
                    relation.cardinality,
                    if relation.nullable { ", nullable" } else { "" },
                ));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaswap_core::contract::{ContractLibrary, RoleContract};
    use schemaswap_core::model::{FieldDef, FieldKind, ModelDef, RelationDecl};

    fn model(ident: &str, entity: &str, relations: Vec<RelationDecl>) -> ModelDef {
        let mut m = ModelDef::new(ident, entity)
            .with_field(FieldDef::new("id", FieldKind::BigInt).unique());
        for rel in relations {
            m = m.with_relation(rel);
        }
        m
    }

    fn two_role_library(defaults_for: &[&str]) -> ContractLibrary {
        let mut library = ContractLibrary::new();
        let a = RoleContract::new("a");
        let a = if defaults_for.contains(&"a") {
            a.with_default(model("lib::A", "a", vec![RelationDecl::new("b_ref", "b")]))
        } else {
            a
        };
        library.declare(a);
        let b = RoleContract::new("b");
        let b = if defaults_for.contains(&"b") {
            b.with_default(model("lib::B", "b", vec![]))
        } else {
            b
        };
        library.declare(b);
        library
    }

    #[test]
    fn test_unresolved_roles_all_listed() {
        let mut registry = RoleRegistry::new(two_role_library(&[]));
        registry.finalize();
        let err = compute_plan(&registry).unwrap_err();
        match err {
            PlanError::Unresolved { roles } => {
                assert_eq!(roles, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected Unresolved, got {other}"),
        }
    }

    #[test]
    fn test_missing_default_then_registered() {
        // {A, B} with immediate edge A->B and no type for B.
        let mut registry = RoleRegistry::new(two_role_library(&["a"]));
        registry.finalize();
        let err = compute_plan(&registry).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Unresolved { ref roles } if roles == &["b".to_string()]
        ));

        // Binding B makes planning succeed with order [B, A].
        let mut registry = RoleRegistry::new(two_role_library(&["a"]));
        registry.register("b", model("app::B", "b", vec![])).unwrap();
        registry.finalize();
        let plan = compute_plan(&registry).unwrap();

        let roles: Vec<&str> = plan
            .operations
            .iter()
            .filter_map(|op| match op {
                Operation::CreateEntity { role, .. } => Some(role.as_str()),
                Operation::AddRelation { .. } => None,
            })
            .collect();
        assert_eq!(roles, vec!["b", "a"]);
        assert!(matches!(
            plan.operations.last().unwrap(),
            Operation::AddRelation { source, target, .. } if source == "a" && target == "b"
        ));
    }

    #[test]
    fn test_creates_precede_relations() {
        let registry = {
            let mut r = RoleRegistry::new(two_role_library(&["a", "b"]));
            r.finalize();
            r
        };
        let plan = compute_plan(&registry).unwrap();
        let first_relation = plan
            .operations
            .iter()
            .position(|op| matches!(op, Operation::AddRelation { .. }))
            .unwrap();
        let last_create = plan
            .operations
            .iter()
            .rposition(|op| matches!(op, Operation::CreateEntity { .. }))
            .unwrap();
        assert!(last_create < first_relation);
    }

    #[test]
    fn test_immediate_relations_precede_deferred() {
        let mut library = ContractLibrary::new();
        library.declare(RoleContract::new("a").with_default(model(
            "lib::A",
            "a",
            vec![RelationDecl::new("b_ref", "b")],
        )));
        library.declare(RoleContract::new("b").with_default(model(
            "lib::B",
            "b",
            vec![RelationDecl::new("a_ref", "a").deferred()],
        )));
        let mut registry = RoleRegistry::new(library);
        registry.finalize();

        let plan = compute_plan(&registry).unwrap();
        let ops: Vec<String> = plan
            .operations
            .iter()
            .map(|op| match op {
                Operation::CreateEntity { role, .. } => format!("create:{role}"),
                Operation::AddRelation { source, target, relation } => {
                    let kind = if relation.deferred { "deferred" } else { "immediate" };
                    format!("{kind}:{source}->{target}")
                }
            })
            .collect();
        assert_eq!(
            ops,
            vec!["create:b", "create:a", "immediate:a->b", "deferred:b->a"]
        );
    }

    #[test]
    fn test_plan_is_idempotent() {
        let mut registry = RoleRegistry::new(two_role_library(&["a", "b"]));
        registry.finalize();

        let mut planner = MigrationPlanner::new(&registry);
        let first = planner.plan().unwrap().clone();
        let second = planner.plan().unwrap().clone();
        assert_eq!(first, second);

        planner.rebuild();
        let third = planner.plan().unwrap().clone();
        assert_eq!(first, third);
        assert_eq!(first.fingerprint(), third.fingerprint());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let mut registry = RoleRegistry::new(two_role_library(&["a", "b"]));
        registry.finalize();
        let base = compute_plan(&registry).unwrap();

        let mut registry2 = RoleRegistry::new(two_role_library(&["a"]));
        registry2
            .register(
                "b",
                model("app::B", "b", vec![])
                    .with_field(FieldDef::new("note", FieldKind::Text { max_length: None })),
            )
            .unwrap();
        registry2.finalize();
        let changed = compute_plan(&registry2).unwrap();

        assert_ne!(base.fingerprint(), changed.fingerprint());
    }

    #[test]
    fn test_cycle_propagates_as_graph_error() {
        let mut library = ContractLibrary::new();
        library.declare(RoleContract::new("a").with_default(model(
            "lib::A",
            "a",
            vec![RelationDecl::new("b_ref", "b")],
        )));
        library.declare(RoleContract::new("b").with_default(model(
            "lib::B",
            "b",
            vec![RelationDecl::new("a_ref", "a")],
        )));
        let mut registry = RoleRegistry::new(library);
        registry.finalize();

        let err = compute_plan(&registry).unwrap_err();
        assert!(matches!(err, PlanError::Graph(GraphError::Cycle { .. })));
    }

    #[test]
    fn test_unfinalized_registry_reports_unbound_roles() {
        let registry = RoleRegistry::new(two_role_library(&["a", "b"]));
        // No finalize: defaults are not bound yet.
        let err = compute_plan(&registry).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Unresolved { ref roles } if roles.len() == 2
        ));
    }

    #[test]
    fn test_format_plan_sections() {
        let mut registry = RoleRegistry::new(two_role_library(&["a", "b"]));
        registry.finalize();
        let plan = compute_plan(&registry).unwrap();
        let text = format_plan(&plan);
        assert!(text.contains("## Construction Plan"));
        assert!(text.contains("### Create Entities"));
        assert!(text.contains("### Immediate Relations"));
        assert!(text.contains("`a`.`b_ref` -> `b` (many-to-one)"));
    }
}
