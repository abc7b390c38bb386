//! Process-wide mapping from role name to a resolved concrete type.
//!
//! The registry has two phases. During startup it is mutated sequentially:
//! explicit registrations and configuration substitutions land first, then
//! [`RoleRegistry::finalize`] binds library defaults for whatever is still
//! unbound and freezes the registry. After the freeze every accessor takes
//! `&self` and no further mutation is possible, so resolution is safe for
//! unsynchronized concurrent use without locking.

use std::collections::BTreeMap;

use schemaswap_core::contract::ContractLibrary;
use schemaswap_core::model::{ModelCatalog, ModelDef};

/// One invalid entry found while applying configuration substitutions.
#[derive(Debug, Clone)]
pub struct SubstitutionIssue {
    pub role: String,
    pub identifier: String,
    pub reason: String,
}

impl std::fmt::Display for SubstitutionIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "role '{}' -> '{}': {}",
            self.role, self.identifier, self.reason
        )
    }
}

fn format_issues(issues: &[SubstitutionIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised during the registry's startup phase.
///
/// All of these are fatal misconfiguration: the process should fail to start
/// rather than serve with a role bound to the wrong shape.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("role '{role}' is not declared in the contract library")]
    UnknownRole { role: String },

    #[error("role '{role}' is already bound to '{existing}' (attempted to bind '{attempted}')")]
    DuplicateRole {
        role: String,
        existing: String,
        attempted: String,
    },

    #[error("model '{model}' does not satisfy the contract for role '{role}': {}", .violations.join("; "))]
    ContractViolation {
        role: String,
        model: String,
        violations: Vec<String>,
    },

    #[error("registry is frozen: cannot bind role '{role}' after finalize")]
    Frozen { role: String },

    #[error("malformed substitutions: {}", format_issues(.issues))]
    MalformedSubstitution { issues: Vec<SubstitutionIssue> },
}

/// Mapping from role name to resolved concrete type.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    library: ContractLibrary,
    bindings: BTreeMap<String, ModelDef>,
    frozen: bool,
}

impl RoleRegistry {
    /// Create an empty registry over a contract library.
    #[must_use]
    pub fn new(library: ContractLibrary) -> Self {
        Self {
            library,
            bindings: BTreeMap::new(),
            frozen: false,
        }
    }

    pub fn library(&self) -> &ContractLibrary {
        &self.library
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Bind a concrete model to a role.
    ///
    /// Re-registering a structurally identical model is a no-op; a different
    /// model for an already-bound role is a conflict. Contract checking
    /// reports every violation at once.
    pub fn register(&mut self, role: &str, model: ModelDef) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::Frozen {
                role: role.to_string(),
            });
        }
        let Some(contract) = self.library.get(role) else {
            return Err(RegistryError::UnknownRole {
                role: role.to_string(),
            });
        };

        if let Some(existing) = self.bindings.get(role) {
            if *existing == model {
                return Ok(());
            }
            return Err(RegistryError::DuplicateRole {
                role: role.to_string(),
                existing: existing.identifier.clone(),
                attempted: model.identifier,
            });
        }

        let violations = contract.check(&model);
        if !violations.is_empty() {
            return Err(RegistryError::ContractViolation {
                role: role.to_string(),
                model: model.identifier,
                violations,
            });
        }

        tracing::debug!(role, model = %model.identifier, "registered substitution");
        self.bindings.insert(role.to_string(), model);
        Ok(())
    }

    /// Apply a configuration substitution table in one validated pass.
    ///
    /// Every entry is checked — unknown role, unresolvable identifier,
    /// conflicting binding, contract violations — and nothing is committed
    /// unless the whole table is clean. A role absent from the table silently
    /// takes its default later; a role present here must resolve.
    pub fn apply_substitutions(
        &mut self,
        substitutions: &BTreeMap<String, String>,
        catalog: &ModelCatalog,
    ) -> Result<(), RegistryError> {
        if self.frozen
            && let Some(role) = substitutions.keys().next()
        {
            return Err(RegistryError::Frozen { role: role.clone() });
        }

        let mut issues = Vec::new();
        let mut resolved: Vec<(&str, &ModelDef)> = Vec::new();

        for (role, identifier) in substitutions {
            let issue = |reason: String| SubstitutionIssue {
                role: role.clone(),
                identifier: identifier.clone(),
                reason,
            };

            let Some(contract) = self.library.get(role) else {
                issues.push(issue("role is not declared in the contract library".into()));
                continue;
            };
            let Some(model) = catalog.get(identifier) else {
                issues.push(issue("identifier does not name a known concrete type".into()));
                continue;
            };
            if let Some(existing) = self.bindings.get(role)
                && *existing != *model
            {
                issues.push(issue(format!(
                    "role is already bound to '{}'",
                    existing.identifier
                )));
                continue;
            }
            let violations = contract.check(model);
            if !violations.is_empty() {
                issues.push(issue(format!(
                    "model violates the role contract: {}",
                    violations.join("; ")
                )));
                continue;
            }
            resolved.push((role, model));
        }

        if !issues.is_empty() {
            return Err(RegistryError::MalformedSubstitution { issues });
        }

        for (role, model) in resolved {
            tracing::debug!(role, model = %model.identifier, "applying substitution");
            self.bindings.insert(role.to_string(), model.clone());
        }
        Ok(())
    }

    /// End the mutation phase: bind library defaults for every still-unbound
    /// role that has one, then freeze. Idempotent.
    ///
    /// Roles with neither a substitution nor a default stay unbound; the
    /// planner reports them. A default that violates its own contract is a
    /// library-authoring defect, not a runtime condition, so defaults are
    /// bound without re-checking.
    pub fn finalize(&mut self) {
        if self.frozen {
            return;
        }
        let mut defaulted = 0usize;
        for contract in self.library.iter() {
            if self.bindings.contains_key(&contract.role) {
                continue;
            }
            if let Some(default) = &contract.default_model {
                tracing::debug!(
                    role = %contract.role,
                    model = %default.identifier,
                    "binding library default"
                );
                self.bindings
                    .insert(contract.role.clone(), default.clone());
                defaulted += 1;
            }
        }
        self.frozen = true;
        tracing::info!(
            roles = self.library.len(),
            bound = self.bindings.len(),
            defaulted,
            "registry finalized"
        );
    }

    /// Resolve a role to its bound concrete type.
    ///
    /// After a successful `finalize`, returns `Some` for every role that has
    /// either a substitution or a library default.
    pub fn resolve(&self, role: &str) -> Option<&ModelDef> {
        self.bindings.get(role)
    }

    /// Declared roles that currently have no binding, in declaration order.
    pub fn unbound_roles(&self) -> Vec<String> {
        self.library
            .iter()
            .filter(|c| !self.bindings.contains_key(&c.role))
            .map(|c| c.role.clone())
            .collect()
    }

    /// Resolved (role, model) pairs in declaration order.
    pub fn resolved(&self) -> impl Iterator<Item = (&str, &ModelDef)> {
        self.library
            .iter()
            .filter_map(|c| self.bindings.get(&c.role).map(|m| (c.role.as_str(), m)))
    }
}
