//! The built-in contract library: RADIUS schema roles and default models.
//!
//! Declaration order here is load-bearing — it is the topological tie-break
//! for plan ordering, so reordering roles changes every regenerated plan.

use crate::contract::{ContractLibrary, RoleContract};
use crate::model::{FieldDef, FieldKind, ModelCatalog, ModelDef, RelationDecl};

pub const NAS: &str = "nas";
pub const RADIUS_GROUP: &str = "radius-group";
pub const RADIUS_USER_GROUP: &str = "radius-user-group";
pub const RADIUS_CHECK: &str = "radius-check";
pub const RADIUS_REPLY: &str = "radius-reply";
pub const RADIUS_ACCOUNTING: &str = "radius-accounting";
pub const RADIUS_POST_AUTH: &str = "radius-post-auth";

fn text(max_length: usize) -> FieldKind {
    FieldKind::Text {
        max_length: Some(max_length),
    }
}

fn nas_model() -> ModelDef {
    ModelDef::new("schemaswap::defaults::Nas", "nas")
        .with_field(FieldDef::new("name", text(128)).unique())
        .with_field(FieldDef::new("short_name", text(32)))
        .with_field(FieldDef::new("server", text(64)).nullable())
        .with_field(FieldDef::new("secret", text(60)))
        .with_field(FieldDef::new("ports", FieldKind::Integer).nullable())
        .with_field(FieldDef::new("nas_type", text(30)))
        .with_field(FieldDef::new("description", text(200)).nullable())
}

fn group_model() -> ModelDef {
    ModelDef::new("schemaswap::defaults::RadiusGroup", "radgroup")
        .with_field(FieldDef::new("name", text(64)).unique())
        .with_field(FieldDef::new("priority", FieldKind::Integer))
        .with_field(FieldDef::new("description", text(200)).nullable())
}

fn user_group_model() -> ModelDef {
    ModelDef::new("schemaswap::defaults::RadiusUserGroup", "radusergroup")
        .with_field(FieldDef::new("username", text(64)))
        .with_field(FieldDef::new("priority", FieldKind::Integer))
        .with_relation(RelationDecl::new("group", RADIUS_GROUP))
}

fn check_model() -> ModelDef {
    ModelDef::new("schemaswap::defaults::RadiusCheck", "radcheck")
        .with_field(FieldDef::new("username", text(64)))
        .with_field(FieldDef::new("attribute", text(64)))
        .with_field(FieldDef::new("op", text(2)))
        .with_field(FieldDef::new("value", text(253)))
        .with_relation(RelationDecl::new("group", RADIUS_GROUP).nullable())
}

fn reply_model() -> ModelDef {
    ModelDef::new("schemaswap::defaults::RadiusReply", "radreply")
        .with_field(FieldDef::new("username", text(64)))
        .with_field(FieldDef::new("attribute", text(64)))
        .with_field(FieldDef::new("op", text(2)))
        .with_field(FieldDef::new("value", text(253)))
        .with_relation(RelationDecl::new("group", RADIUS_GROUP).nullable())
}

fn accounting_model() -> ModelDef {
    // The NAS relation is deferred: accounting rows can be ingested before
    // the referenced NAS is provisioned, so the constraint lands last.
    ModelDef::new("schemaswap::defaults::RadiusAccounting", "radacct")
        .with_field(FieldDef::new("session_id", text(64)).unique())
        .with_field(FieldDef::new("username", text(64)))
        .with_field(FieldDef::new("start_time", FieldKind::Timestamp).nullable())
        .with_field(FieldDef::new("stop_time", FieldKind::Timestamp).nullable())
        .with_field(FieldDef::new("input_octets", FieldKind::BigInt))
        .with_field(FieldDef::new("output_octets", FieldKind::BigInt))
        .with_field(FieldDef::new("framed_ip_address", FieldKind::IpAddr).nullable())
        .with_relation(RelationDecl::new("nas", NAS).nullable().deferred())
}

fn post_auth_model() -> ModelDef {
    ModelDef::new("schemaswap::defaults::RadiusPostAuth", "radpostauth")
        .with_field(FieldDef::new("username", text(64)))
        .with_field(FieldDef::new("reply", text(32)))
        .with_field(FieldDef::new("auth_date", FieldKind::Timestamp))
}

/// Build the contract library shipped with schemaswap.
pub fn builtin_library() -> ContractLibrary {
    let mut library = ContractLibrary::new();

    library.declare(
        RoleContract::new(NAS)
            .describe("network access server a client authenticates against")
            .require_field("name", text(128))
            .require_field("secret", text(60))
            .with_default(nas_model()),
    );
    library.declare(
        RoleContract::new(RADIUS_GROUP)
            .describe("named group of users sharing check/reply attributes")
            .require_field("name", text(64))
            .require_field("priority", FieldKind::Integer)
            .with_default(group_model()),
    );
    library.declare(
        RoleContract::new(RADIUS_USER_GROUP)
            .describe("membership of a username in a group")
            .require_field("username", text(64))
            .require_field("priority", FieldKind::Integer)
            .require_relation("group", RADIUS_GROUP)
            .with_default(user_group_model()),
    );
    library.declare(
        RoleContract::new(RADIUS_CHECK)
            .describe("per-user authorization check attribute")
            .require_field("username", text(64))
            .require_field("attribute", text(64))
            .require_field("op", text(2))
            .require_field("value", text(253))
            .with_default(check_model()),
    );
    library.declare(
        RoleContract::new(RADIUS_REPLY)
            .describe("per-user reply attribute returned on accept")
            .require_field("username", text(64))
            .require_field("attribute", text(64))
            .require_field("op", text(2))
            .require_field("value", text(253))
            .with_default(reply_model()),
    );
    library.declare(
        RoleContract::new(RADIUS_ACCOUNTING)
            .describe("session accounting record")
            .require_field("session_id", text(64))
            .require_field("username", text(64))
            .require_relation("nas", NAS)
            .with_default(accounting_model()),
    );
    library.declare(
        RoleContract::new(RADIUS_POST_AUTH)
            .describe("post-authentication audit record")
            .require_field("username", text(64))
            .require_field("reply", text(32))
            .with_default(post_auth_model()),
    );

    library
}

/// Catalog of the built-in models, keyed by their identifiers.
///
/// Applications extend this with their own substitutes before applying
/// configuration.
pub fn builtin_catalog() -> ModelCatalog {
    let mut catalog = ModelCatalog::new();
    for model in [
        nas_model(),
        group_model(),
        user_group_model(),
        check_model(),
        reply_model(),
        accounting_model(),
        post_auth_model(),
    ] {
        catalog.add(model);
    }
    catalog
}
