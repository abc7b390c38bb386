//! End-to-end planning over the built-in RADIUS contract library:
//! substitutions -> finalize -> graph -> plan -> persistence.

use std::collections::BTreeMap;

use schemaswap_core::defaults;
use schemaswap_core::model::{FieldDef, FieldKind, ModelDef, RelationDecl};
use schemaswap_plan::planner::{self, MigrationPlanner, Operation};
use schemaswap_plan::{build_graph, storage};
use schemaswap_registry::RoleRegistry;

fn text(n: usize) -> FieldKind {
    FieldKind::Text {
        max_length: Some(n),
    }
}

/// An application substitute for radius-group adding a tenant column.
fn tenant_group() -> ModelDef {
    ModelDef::new("app::models::TenantGroup", "tenant_group")
        .with_field(FieldDef::new("name", text(64)).unique())
        .with_field(FieldDef::new("priority", FieldKind::Integer))
        .with_field(FieldDef::new("tenant", text(36)))
}

fn default_registry() -> RoleRegistry {
    let mut registry = RoleRegistry::new(defaults::builtin_library());
    registry.finalize();
    registry
}

#[test]
fn test_default_stack_plans_cleanly() {
    let registry = default_registry();
    let plan = planner::compute_plan(&registry).unwrap();

    assert_eq!(plan.create_count(), 7);
    // user-group, check, reply -> group; accounting -> nas (deferred).
    assert_eq!(plan.relation_count(), 4);
}

#[test]
fn test_group_created_before_memberships() {
    let registry = default_registry();
    let graph = build_graph(&registry).unwrap();

    let pos = |role: &str| graph.order.iter().position(|r| r == role).unwrap();
    assert!(pos(defaults::RADIUS_GROUP) < pos(defaults::RADIUS_USER_GROUP));
    assert!(pos(defaults::RADIUS_GROUP) < pos(defaults::RADIUS_CHECK));
    assert!(pos(defaults::RADIUS_GROUP) < pos(defaults::RADIUS_REPLY));
}

#[test]
fn test_deferred_nas_relation_is_last() {
    let registry = default_registry();
    let plan = planner::compute_plan(&registry).unwrap();

    match plan.operations.last().unwrap() {
        Operation::AddRelation { source, target, relation } => {
            assert_eq!(source, defaults::RADIUS_ACCOUNTING);
            assert_eq!(target, defaults::NAS);
            assert!(relation.deferred);
        }
        other => panic!("expected trailing deferred AddRelation, got {other:?}"),
    }
}

#[test]
fn test_substituted_model_flows_into_plan() {
    let mut registry = RoleRegistry::new(defaults::builtin_library());
    let mut catalog = defaults::builtin_catalog();
    catalog.add(tenant_group());

    let mut subs = BTreeMap::new();
    subs.insert(
        defaults::RADIUS_GROUP.to_string(),
        "app::models::TenantGroup".to_string(),
    );
    registry.apply_substitutions(&subs, &catalog).unwrap();
    registry.finalize();

    let plan = planner::compute_plan(&registry).unwrap();
    let group_create = plan
        .operations
        .iter()
        .find_map(|op| match op {
            Operation::CreateEntity { role, entity, fields } if role == defaults::RADIUS_GROUP => {
                Some((entity.clone(), fields.clone()))
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(group_create.0, "tenant_group");
    assert!(group_create.1.iter().any(|f| f.name == "tenant"));

    // Referential integrity holds: memberships still point at the group role.
    assert!(plan.operations.iter().any(|op| matches!(
        op,
        Operation::AddRelation { source, target, .. }
            if source == defaults::RADIUS_USER_GROUP && target == defaults::RADIUS_GROUP
    )));
}

#[test]
fn test_substitution_can_introduce_deferred_edge() {
    // A substitute may add a relation the default never had, closing a
    // cycle that only a deferred edge makes plannable.
    let mut registry = RoleRegistry::new(defaults::builtin_library());
    let group_with_backref = ModelDef::new("app::models::GroupWithOwner", "group_owner")
        .with_field(FieldDef::new("name", text(64)).unique())
        .with_field(FieldDef::new("priority", FieldKind::Integer))
        .with_relation(
            RelationDecl::new("created_from", defaults::RADIUS_USER_GROUP)
                .nullable()
                .deferred(),
        );
    registry
        .register(defaults::RADIUS_GROUP, group_with_backref)
        .unwrap();
    registry.finalize();

    let graph = build_graph(&registry).unwrap();
    assert_eq!(graph.deferred.len(), 2);
    let plan = planner::compute_plan(&registry).unwrap();
    assert_eq!(plan.relation_count(), 5);
}

#[test]
fn test_regenerated_plan_matches_persisted_plan() {
    let tmp = tempfile::tempdir().unwrap();

    let registry = default_registry();
    let mut planner = MigrationPlanner::new(&registry);
    let plan = planner.plan().unwrap().clone();
    storage::save(tmp.path(), &plan, true).unwrap();

    // A later run from identical registry state regenerates an identical,
    // byte-diffable plan.
    let registry2 = default_registry();
    let regenerated = planner::compute_plan(&registry2).unwrap();
    let persisted = storage::load(tmp.path()).unwrap();
    assert_eq!(regenerated, persisted);
    assert_eq!(regenerated.fingerprint(), persisted.fingerprint());
}

#[test]
fn test_substitution_changes_fingerprint() {
    let base = planner::compute_plan(&default_registry()).unwrap();

    let mut registry = RoleRegistry::new(defaults::builtin_library());
    registry
        .register(defaults::RADIUS_GROUP, tenant_group())
        .unwrap();
    registry.finalize();
    let substituted = planner::compute_plan(&registry).unwrap();

    assert_ne!(base.fingerprint(), substituted.fingerprint());
}
