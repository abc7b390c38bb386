//! Base contracts: the required shape a role's concrete type must satisfy.
//!
//! A [`ContractLibrary`] is the fixed set of roles a library ships. It is
//! pure data, established at library-load time and never mutated afterwards.
//! Declaration order matters: it is the tie-break for topological ordering,
//! so the same role set always plans in the same order.

use serde::{Deserialize, Serialize};

use crate::model::{FieldKind, ModelDef};

/// A field a concrete model must provide, with an exactly matching kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRequirement {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldRequirement {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A relation a concrete model must declare, pointing at a specific role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRequirement {
    /// Name of the referencing field on the source entity.
    pub name: String,
    /// Role the relation must target.
    pub target_role: String,
}

impl RelationRequirement {
    #[must_use]
    pub fn new(name: impl Into<String>, target_role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_role: target_role.into(),
        }
    }
}

/// One named extension point: required shape plus an optional default type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleContract {
    /// Unique role name, e.g. `"radius-group"`.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<FieldRequirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_relations: Vec<RelationRequirement>,
    /// Library-supplied concrete type used when no substitution is
    /// registered. Roles without a default must be bound explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<ModelDef>,
}

impl RoleContract {
    #[must_use]
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            description: None,
            required_fields: Vec::new(),
            required_relations: Vec::new(),
            default_model: None,
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn require_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.required_fields.push(FieldRequirement::new(name, kind));
        self
    }

    #[must_use]
    pub fn require_relation(
        mut self,
        name: impl Into<String>,
        target_role: impl Into<String>,
    ) -> Self {
        self.required_relations
            .push(RelationRequirement::new(name, target_role));
        self
    }

    #[must_use]
    pub fn with_default(mut self, model: ModelDef) -> Self {
        self.default_model = Some(model);
        self
    }

    /// Structurally check a model against this contract.
    ///
    /// Returns every violation found, not just the first: a substitute
    /// author should see the full gap in one pass.
    pub fn check(&self, model: &ModelDef) -> Vec<String> {
        let mut violations = Vec::new();

        for req in &self.required_fields {
            match model.field(&req.name) {
                None => violations.push(format!("missing required field '{}'", req.name)),
                Some(field) if field.kind != req.kind => violations.push(format!(
                    "field '{}' has kind {} but the contract requires {}",
                    req.name, field.kind, req.kind
                )),
                Some(_) => {}
            }
        }

        for req in &self.required_relations {
            match model.relation(&req.name) {
                None => violations.push(format!("missing required relation '{}'", req.name)),
                Some(rel) if rel.target_role != req.target_role => violations.push(format!(
                    "relation '{}' targets role '{}' but the contract requires '{}'",
                    req.name, rel.target_role, req.target_role
                )),
                Some(_) => {}
            }
        }

        violations
    }

    /// Check whether a model satisfies this contract.
    pub fn is_satisfied_by(&self, model: &ModelDef) -> bool {
        self.check(model).is_empty()
    }
}

/// The ordered set of role contracts a library ships.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractLibrary {
    /// Contracts in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    contracts: Vec<RoleContract>,
}

impl ContractLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a role. Redeclaring a name replaces the earlier contract but
    /// keeps its declaration position, so ordering stays stable.
    pub fn declare(&mut self, contract: RoleContract) {
        if let Some(existing) = self
            .contracts
            .iter_mut()
            .find(|c| c.role == contract.role)
        {
            *existing = contract;
        } else {
            self.contracts.push(contract);
        }
    }

    pub fn get(&self, role: &str) -> Option<&RoleContract> {
        self.contracts.iter().find(|c| c.role == role)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.get(role).is_some()
    }

    /// Position of a role in declaration order.
    pub fn declaration_index(&self, role: &str) -> Option<usize> {
        self.contracts.iter().position(|c| c.role == role)
    }

    /// Iterate contracts in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &RoleContract> {
        self.contracts.iter()
    }

    /// Role names in declaration order.
    pub fn role_names(&self) -> Vec<&str> {
        self.contracts.iter().map(|c| c.role.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
