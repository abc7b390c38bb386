//! Role registry for swappable schema entities.
//!
//! Binds concrete [`schemaswap_core::model::ModelDef`]s to roles, validating
//! every binding against the role's base contract, and freezes at the end of
//! the startup phase so resolution is lock-free afterwards.

pub mod registry;

pub use registry::{RegistryError, RoleRegistry, SubstitutionIssue};
