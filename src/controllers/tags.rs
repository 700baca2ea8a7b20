use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{BylineError, FieldError};
use crate::extractors::{AuthUser, Json, Page};
use crate::models::post::{self, Entity as Post, PostStatus, PostSummary};
use crate::models::tag::{self, Entity as Tag, TagResponse};
use crate::policy::Actor;
use crate::response::{ApiResponse, Paginated};
use crate::slug;

use super::{AppState, paginate};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTagRequest {
    pub name: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tags", get(list_tags).post(create_tag))
        .route("/api/tags/{slug}/posts", get(tag_posts))
}

/// All tags, alphabetical.
#[utoipa::path(
    get,
    path = "/api/tags",
    responses(
        (status = 200, description = "All tags", body = ApiResponse<Vec<TagResponse>>),
    ),
    tag = "tags"
)]
pub async fn list_tags(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<TagResponse>>, BylineError> {
    let tags = Tag::find()
        .order_by_asc(tag::Column::Name)
        .all(&state.db)
        .await?;

    Ok(ApiResponse::success(
        tags.into_iter().map(TagResponse::from).collect(),
    ))
}

/// Create a tag (staff only).
#[utoipa::path(
    post,
    path = "/api/tags",
    request_body = CreateTagRequest,
    responses(
        (status = 200, description = "Tag created", body = ApiResponse<TagResponse>),
        (status = 403, description = "Staff only"),
        (status = 409, description = "Name already taken")
    ),
    tag = "tags",
    security(("bearer_auth" = []))
)]
pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTagRequest>,
) -> Result<ApiResponse<TagResponse>, BylineError> {
    let actor = Actor::load(&state.db, user_id).await?;
    if !actor.is_staff {
        return Err(BylineError::Forbidden(
            "Only staff can manage tags".to_string(),
        ));
    }

    if payload.name.trim().is_empty() {
        return Err(BylineError::validation_fields(vec![FieldError::new(
            "name",
            "must not be empty",
        )]));
    }

    let exists = Tag::find()
        .filter(tag::Column::Name.eq(&payload.name))
        .one(&state.db)
        .await?;
    if exists.is_some() {
        return Err(BylineError::Conflict(format!(
            "Tag '{}' already exists",
            payload.name
        )));
    }

    let slug = slug::unique::<Tag, _>(
        &state.db,
        &payload.name,
        "tag",
        tag::Column::Slug,
        tag::Column::Id,
        None,
    )
    .await?;

    let model = tag::ActiveModel {
        name: Set(payload.name),
        slug: Set(slug),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(ApiResponse::success(TagResponse::from(model)))
}

/// Published posts carrying one tag, paginated newest first.
#[utoipa::path(
    get,
    path = "/api/tags/{slug}/posts",
    params(("slug" = String, Path, description = "Tag slug"), Page),
    responses(
        (status = 200, description = "One page of posts with the tag", body = ApiResponse<Paginated<PostSummary>>),
        (status = 404, description = "Tag not found")
    ),
    tag = "tags"
)]
pub async fn tag_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    page: Page,
) -> Result<ApiResponse<Paginated<PostSummary>>, BylineError> {
    let model = Tag::find()
        .filter(tag::Column::Slug.eq(&slug))
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound(format!("Tag '{}' not found", slug)))?;

    let select = model
        .find_related(Post)
        .filter(post::Column::Status.eq(PostStatus::Published))
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id);

    let page = paginate(&state.db, select, page.number(), state.config.page_size).await?;
    Ok(ApiResponse::success(page.map(PostSummary::from)))
}
