use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub profile_info: Option<String>,
    pub date_joined: DateTime,
    pub last_login: Option<DateTime>,
}

#[derive(
    EnumIter,
    DeriveActiveEnum,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Default,
    Deserialize,
    Serialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "editor")]
    Editor,
    #[sea_orm(string_value = "viewer")]
    #[default]
    Viewer,
}

/// Things a role may be allowed to do. Checked through [`Role::can`] so that
/// handlers never compare role strings directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Create, update and delete assets and their metadata.
    ManageAssets,
    /// List, edit and delete other user accounts.
    ManageUsers,
    /// Act on objects owned by someone else.
    BypassOwnership,
}

/// How much of a collection a role gets to see.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Unrestricted,
    OwnedOrActive,
    ActiveOnly,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Editor, Role::Viewer];

    pub fn can(self, capability: Capability) -> bool {
        match capability {
            Capability::ManageAssets => matches!(self, Role::Admin | Role::Editor),
            Capability::ManageUsers | Capability::BypassOwnership => self == Role::Admin,
        }
    }

    pub fn visibility(self) -> Visibility {
        match self {
            Role::Admin => Visibility::Unrestricted,
            Role::Editor => Visibility::OwnedOrActive,
            Role::Viewer => Visibility::ActiveOnly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::asset::Entity")]
    Asset,
    #[sea_orm(has_many = "super::refresh_token::Entity")]
    RefreshToken,
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asset.def()
    }
}

impl Related<super::refresh_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RefreshToken.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
