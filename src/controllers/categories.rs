use std::collections::HashMap;

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{BylineError, FieldError};
use crate::extractors::{AuthUser, Json, Page};
use crate::models::category::{self, CategoryResponse, Entity as Category};
use crate::models::post::{self, Entity as Post, PostStatus, PostSummary};
use crate::policy::Actor;
use crate::response::{ApiResponse, Deleted, Paginated};
use crate::slug;

use super::{AppState, paginate};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/{slug}", axum::routing::delete(delete_category))
        .route("/api/categories/{slug}/posts", get(category_posts))
}

/// All categories with their published post count, most-used first.
#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Categories ordered by published post count", body = ApiResponse<Vec<CategoryResponse>>),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<CategoryResponse>>, BylineError> {
    let categories = Category::find()
        .order_by_asc(category::Column::Name)
        .all(&state.db)
        .await?;

    // One grouped count query instead of a count per category.
    let counts: Vec<(Option<i32>, i64)> = Post::find()
        .select_only()
        .column(post::Column::CategoryId)
        .column_as(post::Column::Id.count(), "count")
        .filter(post::Column::Status.eq(PostStatus::Published))
        .filter(post::Column::CategoryId.is_not_null())
        .group_by(post::Column::CategoryId)
        .into_tuple()
        .all(&state.db)
        .await?;

    let by_category: HashMap<i32, u64> = counts
        .into_iter()
        .filter_map(|(id, n)| id.map(|id| (id, n.max(0) as u64)))
        .collect();

    let mut out: Vec<CategoryResponse> = categories
        .into_iter()
        .map(|c| CategoryResponse {
            post_count: by_category.get(&c.id).copied().unwrap_or(0),
            id: c.id,
            name: c.name,
            slug: c.slug,
            description: c.description,
        })
        .collect();

    // Name order from the fetch breaks ties deterministically.
    out.sort_by(|a, b| b.post_count.cmp(&a.post_count));

    Ok(ApiResponse::success(out))
}

/// Create a category (staff only). The slug is derived from the name.
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Category created", body = ApiResponse<CategoryResponse>),
        (status = 403, description = "Staff only"),
        (status = 409, description = "Name already taken")
    ),
    tag = "categories",
    security(("bearer_auth" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<ApiResponse<CategoryResponse>, BylineError> {
    let actor = Actor::load(&state.db, user_id).await?;
    if !actor.is_staff {
        return Err(BylineError::Forbidden(
            "Only staff can manage categories".to_string(),
        ));
    }

    if payload.name.trim().is_empty() {
        return Err(BylineError::validation_fields(vec![FieldError::new(
            "name",
            "must not be empty",
        )]));
    }

    let exists = Category::find()
        .filter(category::Column::Name.eq(&payload.name))
        .one(&state.db)
        .await?;
    if exists.is_some() {
        return Err(BylineError::Conflict(format!(
            "Category '{}' already exists",
            payload.name
        )));
    }

    let slug = slug::unique::<Category, _>(
        &state.db,
        &payload.name,
        "category",
        category::Column::Slug,
        category::Column::Id,
        None,
    )
    .await?;

    let model = category::ActiveModel {
        name: Set(payload.name),
        slug: Set(slug),
        description: Set(payload.description),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(ApiResponse::success(CategoryResponse {
        id: model.id,
        name: model.name,
        slug: model.slug,
        description: model.description,
        post_count: 0,
    }))
}

/// Delete a category (staff only). Posts in it are kept and merely lose
/// their category reference.
#[utoipa::path(
    delete,
    path = "/api/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category deleted", body = ApiResponse<Deleted>),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories",
    security(("bearer_auth" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
) -> Result<ApiResponse<Deleted>, BylineError> {
    let actor = Actor::load(&state.db, user_id).await?;
    if !actor.is_staff {
        return Err(BylineError::Forbidden(
            "Only staff can manage categories".to_string(),
        ));
    }

    let model = Category::find()
        .filter(category::Column::Slug.eq(&slug))
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound(format!("Category '{}' not found", slug)))?;

    let id = model.id;
    model.delete(&state.db).await?;

    Ok(ApiResponse::success(Deleted { id }))
}

/// Published posts in one category, paginated newest first.
#[utoipa::path(
    get,
    path = "/api/categories/{slug}/posts",
    params(("slug" = String, Path, description = "Category slug"), Page),
    responses(
        (status = 200, description = "One page of posts in the category", body = ApiResponse<Paginated<PostSummary>>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn category_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    page: Page,
) -> Result<ApiResponse<Paginated<PostSummary>>, BylineError> {
    let model = Category::find()
        .filter(category::Column::Slug.eq(&slug))
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound(format!("Category '{}' not found", slug)))?;

    let select = Post::find()
        .filter(post::Column::CategoryId.eq(model.id))
        .filter(post::Column::Status.eq(PostStatus::Published))
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id);

    let page = paginate(&state.db, select, page.number(), state.config.page_size).await?;
    Ok(ApiResponse::success(page.map(PostSummary::from)))
}
