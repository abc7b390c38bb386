//! Concrete entity models: the types that fill roles.
//!
//! A [`ModelDef`] is a complete, self-describing schema entity — either a
//! library default or an application substitute. Models are plain data and
//! compare structurally; two bindings conflict only if they differ.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage-level kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Variable-length text, optionally bounded.
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    BigInt,
    Boolean,
    /// UTC timestamp.
    Timestamp,
    Uuid,
    /// IPv4/IPv6 address.
    IpAddr,
    /// Raw bytes.
    Binary,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text { max_length: Some(n) } => write!(f, "text({n})"),
            Self::Text { max_length: None } => write!(f, "text"),
            Self::Integer => write!(f, "integer"),
            Self::BigInt => write!(f, "bigint"),
            Self::Boolean => write!(f, "boolean"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Uuid => write!(f, "uuid"),
            Self::IpAddr => write!(f, "ipaddr"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Cardinality of a relation edge, seen from the declaring (source) side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Many source rows reference one target row (a plain foreign key).
    #[default]
    ManyToOne,
    /// At most one source row per target row (unique foreign key).
    OneToOne,
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManyToOne => write!(f, "many-to-one"),
            Self::OneToOne => write!(f, "one-to-one"),
        }
    }
}

/// A column in a concrete entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
}

impl FieldDef {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            unique: false,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// An outgoing relation declared by a concrete model.
///
/// The target is a *role*, not a concrete entity — which table the foreign
/// key ultimately points at is only known after every role is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDecl {
    /// Name of the referencing field on the source entity.
    pub name: String,
    /// Role the relation points at.
    pub target_role: String,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub nullable: bool,
    /// Deferred relations have their constraint added only after both
    /// endpoints exist, and are excluded from creation ordering.
    #[serde(default)]
    pub deferred: bool,
}

impl RelationDecl {
    #[must_use]
    pub fn new(name: impl Into<String>, target_role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_role: target_role.into(),
            cardinality: Cardinality::ManyToOne,
            nullable: false,
            deferred: false,
        }
    }

    #[must_use]
    pub fn one_to_one(mut self) -> Self {
        self.cardinality = Cardinality::OneToOne;
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the relation's constraint as applied after both entities exist.
    #[must_use]
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }
}

/// A concrete schema entity bound (or bindable) to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDef {
    /// Fully-qualified type identifier used in configuration files,
    /// e.g. `"schemaswap::defaults::RadiusGroup"`.
    pub identifier: String,
    /// Physical entity (table) name.
    pub entity_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<RelationDecl>,
}

impl ModelDef {
    #[must_use]
    pub fn new(identifier: impl Into<String>, entity_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            entity_name: entity_name.into(),
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_relation(mut self, relation: RelationDecl) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDecl> {
        self.relations.iter().find(|r| r.name == name)
    }
}

/// All concrete types known to the process, keyed by identifier.
///
/// Configuration files name substitutes by identifier; anything not
/// registered here is unresolvable and must be rejected, never defaulted.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: BTreeMap<String, ModelDef>,
}

impl ModelCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model, replacing any previous entry with the same identifier.
    pub fn add(&mut self, model: ModelDef) {
        self.models.insert(model.identifier.clone(), model);
    }

    pub fn get(&self, identifier: &str) -> Option<&ModelDef> {
        self.models.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.models.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Iterate models in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelDef> {
        self.models.values()
    }
}
