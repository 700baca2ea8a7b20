use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Publication status of a post. Only `Published` posts appear on public
/// listings; drafts are visible to their author (and staff) alone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
}

/// Post entity - the central content record of the blog.
///
/// `slug` is globally unique and derived from the title; `author_id` is set
/// at creation and never changes; `views` is a monotone counter bumped by
/// the detail endpoint.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,

    #[sea_orm(unique)]
    pub slug: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub excerpt: String,

    pub featured_image: Option<String>,

    pub status: PostStatus,

    pub author_id: i32,
    pub category_id: Option<i32>,

    pub views: i64,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
    #[sea_orm(has_many = "super::post_tag::Entity")]
    PostTags,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::post_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::post_tag::Relation::Post.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ─── Response DTOs ─────────────────────────────────────────────

/// Compact post representation used on listing pages.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostSummary {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub author_id: i32,
    pub category_id: Option<i32>,
    pub views: i64,
    pub created_at: NaiveDateTime,
}

impl From<Model> for PostSummary {
    fn from(m: Model) -> Self {
        PostSummary {
            id: m.id,
            title: m.title,
            slug: m.slug,
            excerpt: m.excerpt,
            featured_image: m.featured_image,
            status: m.status,
            author_id: m.author_id,
            category_id: m.category_id,
            views: m.views,
            created_at: m.created_at,
        }
    }
}
