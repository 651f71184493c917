//! Role-based visibility shared by every collection that hangs off an asset.
//!
//! - admin: everything
//! - editor: rows they own, plus every active row
//! - viewer: active rows only
//!
//! The editor clause is kept as written even though "active" already covers
//! every active row regardless of owner, so in practice editors see their own
//! inactive rows in addition to everything active.

use sea_orm::{
    sea_query::SelectStatement, ColumnTrait, Condition, EntityTrait, QueryFilter, QuerySelect,
    QueryTrait,
};

use crate::entities::{asset, user::Visibility};
use crate::middleware::auth::AuthUser;

/// Visibility condition for any table with an owner column and an active flag.
pub fn visible<O, A>(actor: &AuthUser, owner: O, active: A) -> Condition
where
    O: ColumnTrait,
    A: ColumnTrait,
{
    match actor.role.visibility() {
        Visibility::Unrestricted => Condition::all(),
        Visibility::OwnedOrActive => Condition::any()
            .add(owner.eq(actor.id))
            .add(active.eq(true)),
        Visibility::ActiveOnly => Condition::all().add(active.eq(true)),
    }
}

pub fn assets(actor: &AuthUser) -> Condition {
    visible(actor, asset::Column::OwnerId, asset::Column::IsActive)
}

/// Restrict rows of a child table (metadata, activity, comments) to those
/// whose asset the actor can see.
pub fn through_asset<C: ColumnTrait>(actor: &AuthUser, asset_fk: C) -> Condition {
    match actor.role.visibility() {
        Visibility::Unrestricted => Condition::all(),
        _ => Condition::all().add(asset_fk.in_subquery(visible_asset_ids(actor))),
    }
}

fn visible_asset_ids(actor: &AuthUser) -> SelectStatement {
    asset::Entity::find()
        .select_only()
        .column(asset::Column::Id)
        .filter(assets(actor))
        .into_query()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{metadata, user::Role};
    use sea_orm::DbBackend;

    fn actor(role: Role) -> AuthUser {
        AuthUser {
            id: 5,
            username: "someone".to_string(),
            role,
        }
    }

    fn asset_sql(role: Role) -> String {
        asset::Entity::find()
            .filter(assets(&actor(role)))
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn admin_is_unrestricted() {
        let sql = asset_sql(Role::Admin);
        assert!(!sql.contains("is_active"), "{sql}");
        assert!(!sql.contains("owner_id"), "{sql}");
    }

    #[test]
    fn editor_sees_owned_or_active() {
        let sql = asset_sql(Role::Editor);
        assert!(sql.contains(r#""assets"."owner_id" = 5 OR "assets"."is_active" = TRUE"#), "{sql}");
    }

    #[test]
    fn viewer_sees_active_only() {
        let sql = asset_sql(Role::Viewer);
        assert!(sql.contains(r#"WHERE "assets"."is_active" = TRUE"#), "{sql}");
        assert!(!sql.contains(r#""assets"."owner_id" = 5"#), "{sql}");
    }

    #[test]
    fn child_tables_filter_through_visible_assets() {
        let sql = metadata::Entity::find()
            .filter(through_asset(&actor(Role::Viewer), metadata::Column::AssetId))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(
            sql.contains(r#""metadata"."asset_id" IN (SELECT "assets"."id" FROM "assets" WHERE "assets"."is_active" = TRUE)"#),
            "{sql}"
        );

        let sql = metadata::Entity::find()
            .filter(through_asset(&actor(Role::Admin), metadata::Column::AssetId))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(!sql.contains("IN (SELECT"), "{sql}");
    }
}
