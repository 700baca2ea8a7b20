use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Comment entity - belongs to one post and one user.
///
/// New comments land with `approved = false` and stay invisible on the
/// public detail page until a staff member approves them.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub post_id: i32,
    pub user_id: i32,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub approved: bool,

    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Comment as embedded in the post detail response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub post_id: i32,
    pub user_id: i32,
    pub username: Option<String>,
    pub content: String,
    pub approved: bool,
    pub created_at: NaiveDateTime,
}

impl CommentResponse {
    pub fn from_model(c: Model, username: Option<String>) -> Self {
        CommentResponse {
            id: c.id,
            post_id: c.post_id,
            user_id: c.user_id,
            username,
            content: c.content,
            approved: c.approved,
            created_at: c.created_at,
        }
    }
}
