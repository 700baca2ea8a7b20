use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Site role. A closed enum rather than a free-form string: capability
/// checks go through [`Role::is_author`] instead of string comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "reader")]
    Reader,
    #[sea_orm(string_value = "author")]
    Author,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    /// Whether this role may create posts.
    pub fn is_author(self) -> bool {
        matches!(self, Role::Author | Role::Admin)
    }
}

/// Profile entity - one per user, created at signup.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub user_id: i32,

    pub role: Role,

    #[sea_orm(column_type = "Text")]
    pub bio: String,

    pub avatar: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Profile data returned alongside the user.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub role: Role,
    pub bio: String,
    pub avatar: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
}

impl From<Model> for ProfileResponse {
    fn from(p: Model) -> Self {
        ProfileResponse {
            role: p.role,
            bio: p.bio,
            avatar: p.avatar,
            website: p.website,
            twitter: p.twitter,
            linkedin: p.linkedin,
        }
    }
}
