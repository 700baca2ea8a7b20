use axum::{
    Router,
    extract::{Path, Query, State},
    routing,
    routing::get,
};
use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{BylineError, FieldError};
use crate::extractors::{AuthUser, Json, MaybeAuthUser, Page};
use crate::models::category::Entity as Category;
use crate::models::comment::{self, CommentResponse, Entity as Comment};
use crate::models::post::{self, Entity as Post, PostStatus, PostSummary};
use crate::models::post_tag::{self, Entity as PostTag};
use crate::models::tag::{self, Entity as Tag, TagResponse};
use crate::models::user::Entity as User;
use crate::policy::{self, Actor};
use crate::response::{ApiResponse, Deleted, Paginated};
use crate::slug;

use super::{AppState, paginate};

// ── Request / Response types ──

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchForm {
    /// Case-insensitive substring matched against title, content and excerpt.
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub category_id: Option<i32>,
    #[serde(default)]
    pub tags: Vec<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    /// `null` clears the image, omission leaves it unchanged.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub featured_image: Option<Option<String>>,
    pub status: Option<PostStatus>,
    /// `null` detaches the category, omission leaves it unchanged.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub category_id: Option<Option<i32>>,
    /// Replaces the full tag set when present.
    pub tags: Option<Vec<i32>>,
}

/// Distinguishes an absent field from an explicit `null` in PATCH-style
/// bodies: absence deserializes to `None` via `default`, `null` lands here
/// as `Some(None)`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}

/// Minimal author reference embedded in the post detail.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorRef {
    pub id: i32,
    pub username: String,
}

/// Minimal category reference embedded in the post detail.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryRef {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

/// Full post representation for the detail page and for mutation responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostDetail {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub views: i64,
    pub author: AuthorRef,
    pub category: Option<CategoryRef>,
    pub tags: Vec<TagResponse>,
    pub comments: Vec<CommentResponse>,
    pub related_posts: Vec<PostSummary>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/featured", get(featured_posts))
        .route(
            "/api/posts/{slug}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route(
            "/api/posts/{slug}/comments",
            routing::post(super::comments::create_comment),
        )
}

// ── Handlers ──

/// The home listing: published posts, newest first, with an optional
/// case-insensitive search over title, content and excerpt.
#[utoipa::path(
    get,
    path = "/api/posts",
    params(SearchForm, Page),
    responses(
        (status = 200, description = "One page of published posts", body = ApiResponse<Paginated<PostSummary>>),
    ),
    tag = "posts"
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(search): Query<SearchForm>,
    page: Page,
) -> Result<ApiResponse<Paginated<PostSummary>>, BylineError> {
    let mut select = Post::find().filter(post::Column::Status.eq(PostStatus::Published));

    if let Some(query) = search.query.as_deref().filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", query.to_lowercase());
        select = select.filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(post::Column::Title))).like(pattern.clone()))
                .add(
                    Expr::expr(Func::lower(Expr::col(post::Column::Content)))
                        .like(pattern.clone()),
                )
                .add(Expr::expr(Func::lower(Expr::col(post::Column::Excerpt))).like(pattern)),
        );
    }

    let select = select
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id);

    let page = paginate(&state.db, select, page.number(), state.config.page_size).await?;
    Ok(ApiResponse::success(page.map(PostSummary::from)))
}

/// The featured shelf: most-viewed published posts. Ties break on id so the
/// order is deterministic.
#[utoipa::path(
    get,
    path = "/api/posts/featured",
    responses(
        (status = 200, description = "Most viewed published posts", body = ApiResponse<Vec<PostSummary>>),
    ),
    tag = "posts"
)]
pub async fn featured_posts(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<PostSummary>>, BylineError> {
    let posts = Post::find()
        .filter(post::Column::Status.eq(PostStatus::Published))
        .order_by_desc(post::Column::Views)
        .order_by_asc(post::Column::Id)
        .limit(state.config.featured_count)
        .all(&state.db)
        .await?;

    Ok(ApiResponse::success(
        posts.into_iter().map(PostSummary::from).collect(),
    ))
}

/// Post detail. Published posts are public and each fetch bumps the view
/// counter by exactly one (a single relational `views = views + 1`).
/// Drafts are only visible to their author or staff and are never counted.
#[utoipa::path(
    get,
    path = "/api/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post found", body = ApiResponse<PostDetail>),
        (status = 404, description = "Post not found")
    ),
    tag = "posts"
)]
pub async fn get_post(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(slug): Path<String>,
) -> Result<ApiResponse<PostDetail>, BylineError> {
    let mut post_model = Post::find()
        .filter(post::Column::Slug.eq(&slug))
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound(format!("Post '{}' not found", slug)))?;

    if post_model.status != PostStatus::Published {
        // Drafts exist only for their author and staff; everyone else gets
        // the same not-found as a missing slug.
        let allowed = match viewer {
            Some(user_id) => {
                let actor = Actor::load(&state.db, user_id).await?;
                policy::can_modify_post(actor, post_model.author_id)
            }
            None => false,
        };
        if !allowed {
            return Err(BylineError::NotFound(format!("Post '{}' not found", slug)));
        }
    } else {
        Post::update_many()
            .col_expr(post::Column::Views, Expr::col(post::Column::Views).add(1))
            .filter(post::Column::Id.eq(post_model.id))
            .exec(&state.db)
            .await?;
        post_model.views += 1;
    }

    let detail = build_detail(&state.db, post_model).await?;
    Ok(ApiResponse::success(detail))
}

/// Create a new post. Requires the author capability; the slug is derived
/// from the title and disambiguated with a numeric suffix. The post row and
/// its tag links are written in one transaction.
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Post created", body = ApiResponse<PostDetail>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an author"),
        (status = 422, description = "Invalid input")
    ),
    tag = "posts",
    security(("bearer_auth" = []))
)]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<ApiResponse<PostDetail>, BylineError> {
    let actor = Actor::load(&state.db, user_id).await?;
    if !policy::can_create_post(actor) {
        return Err(BylineError::Forbidden(
            "You need to be an author to create posts".to_string(),
        ));
    }

    let mut field_errors = Vec::new();
    if payload.title.trim().is_empty() {
        field_errors.push(FieldError::new("title", "must not be empty"));
    }
    if payload.content.trim().is_empty() {
        field_errors.push(FieldError::new("content", "must not be empty"));
    }
    if !field_errors.is_empty() {
        return Err(BylineError::validation_fields(field_errors));
    }

    if let Some(category_id) = payload.category_id {
        ensure_category_exists(&state.db, category_id).await?;
    }
    let tag_ids = validate_tags(&state.db, &payload.tags).await?;

    let status = payload.status.unwrap_or(PostStatus::Draft);
    let now = Utc::now().naive_utc();

    let txn = state.db.begin().await?;

    let slug = slug::unique::<Post, _>(
        &txn,
        &payload.title,
        "post",
        post::Column::Slug,
        post::Column::Id,
        None,
    )
    .await?;

    let post_model = post::ActiveModel {
        title: Set(payload.title),
        slug: Set(slug),
        content: Set(payload.content),
        excerpt: Set(payload.excerpt),
        featured_image: Set(payload.featured_image),
        status: Set(status),
        author_id: Set(user_id),
        category_id: Set(payload.category_id),
        views: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    set_post_tags(&txn, post_model.id, &tag_ids).await?;

    txn.commit().await?;

    if post_model.status == PostStatus::Published {
        tracing::info!(post_id = post_model.id, title = %post_model.title, "post published");
    }

    let detail = build_detail(&state.db, post_model).await?;
    Ok(ApiResponse::success(detail))
}

/// Edit a post. Only its author or staff may do so; the author reference
/// itself never changes. A changed title re-derives the slug (an unchanged
/// title leaves it alone).
#[utoipa::path(
    put,
    path = "/api/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post updated", body = ApiResponse<PostDetail>),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    ),
    tag = "posts",
    security(("bearer_auth" = []))
)]
pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug_param): Path<String>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<ApiResponse<PostDetail>, BylineError> {
    let post_model = Post::find()
        .filter(post::Column::Slug.eq(&slug_param))
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound(format!("Post '{}' not found", slug_param)))?;

    let actor = Actor::load(&state.db, user_id).await?;
    if !policy::can_modify_post(actor, post_model.author_id) {
        return Err(BylineError::Forbidden(
            "You can only edit your own posts".to_string(),
        ));
    }

    if let Some(Some(category_id)) = payload.category_id {
        ensure_category_exists(&state.db, category_id).await?;
    }
    let tag_ids = match &payload.tags {
        Some(ids) => Some(validate_tags(&state.db, ids).await?),
        None => None,
    };

    let was_published = post_model.status == PostStatus::Published;
    let post_id = post_model.id;
    let old_title = post_model.title.clone();

    let now = Utc::now().naive_utc();
    let txn = state.db.begin().await?;

    let mut active: post::ActiveModel = post_model.into();

    if let Some(title) = payload.title {
        if title.trim().is_empty() {
            return Err(BylineError::validation_fields(vec![FieldError::new(
                "title",
                "must not be empty",
            )]));
        }
        if title != old_title {
            let slug = slug::unique::<Post, _>(
                &txn,
                &title,
                "post",
                post::Column::Slug,
                post::Column::Id,
                Some(post_id),
            )
            .await?;
            active.slug = Set(slug);
        }
        active.title = Set(title);
    }
    if let Some(content) = payload.content {
        if content.trim().is_empty() {
            return Err(BylineError::validation_fields(vec![FieldError::new(
                "content",
                "must not be empty",
            )]));
        }
        active.content = Set(content);
    }
    if let Some(excerpt) = payload.excerpt {
        active.excerpt = Set(excerpt);
    }
    if let Some(featured_image) = payload.featured_image {
        active.featured_image = Set(featured_image);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    active.updated_at = Set(now);

    let post_model = active.update(&txn).await?;

    if let Some(tag_ids) = tag_ids {
        PostTag::delete_many()
            .filter(post_tag::Column::PostId.eq(post_model.id))
            .exec(&txn)
            .await?;
        set_post_tags(&txn, post_model.id, &tag_ids).await?;
    }

    txn.commit().await?;

    if !was_published && post_model.status == PostStatus::Published {
        tracing::info!(post_id = post_model.id, title = %post_model.title, "post published");
    }

    let detail = build_detail(&state.db, post_model).await?;
    Ok(ApiResponse::success(detail))
}

/// Delete a post (author or staff). Its comments and tag links go with it.
#[utoipa::path(
    delete,
    path = "/api/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post deleted", body = ApiResponse<Deleted>),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    ),
    tag = "posts",
    security(("bearer_auth" = []))
)]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug_param): Path<String>,
) -> Result<ApiResponse<Deleted>, BylineError> {
    let post_model = Post::find()
        .filter(post::Column::Slug.eq(&slug_param))
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound(format!("Post '{}' not found", slug_param)))?;

    let actor = Actor::load(&state.db, user_id).await?;
    if !policy::can_modify_post(actor, post_model.author_id) {
        return Err(BylineError::Forbidden(
            "You can only delete your own posts".to_string(),
        ));
    }

    let id = post_model.id;
    post_model.delete(&state.db).await?;

    Ok(ApiResponse::success(Deleted { id }))
}

// ── Helpers ──

async fn ensure_category_exists<C: ConnectionTrait>(
    db: &C,
    category_id: i32,
) -> Result<(), BylineError> {
    Category::find_by_id(category_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| {
            BylineError::validation_fields(vec![FieldError::new(
                "category_id",
                format!("category {} does not exist", category_id),
            )])
        })
}

/// Check that every requested tag id exists, returning the deduplicated set.
async fn validate_tags<C: ConnectionTrait>(
    db: &C,
    tag_ids: &[i32],
) -> Result<Vec<i32>, BylineError> {
    let mut ids = tag_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    if ids.is_empty() {
        return Ok(ids);
    }

    let found = Tag::find()
        .filter(tag::Column::Id.is_in(ids.clone()))
        .all(db)
        .await?;

    if found.len() != ids.len() {
        return Err(BylineError::validation_fields(vec![FieldError::new(
            "tags",
            "one or more tags do not exist",
        )]));
    }

    Ok(ids)
}

async fn set_post_tags<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
    tag_ids: &[i32],
) -> Result<(), BylineError> {
    for &tag_id in tag_ids {
        post_tag::ActiveModel {
            post_id: Set(post_id),
            tag_id: Set(tag_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Assemble the full detail view: author, category, tags, approved comments
/// (oldest first) and up to three related published posts from the same
/// category.
pub(super) async fn build_detail(
    db: &sea_orm::DatabaseConnection,
    post_model: post::Model,
) -> Result<PostDetail, BylineError> {
    let author = User::find_by_id(post_model.author_id)
        .one(db)
        .await?
        .map(|u| AuthorRef {
            id: u.id,
            username: u.username,
        })
        .ok_or_else(|| {
            BylineError::Internal(format!("Post {} has no author row", post_model.id))
        })?;

    let category_ref = match post_model.category_id {
        Some(category_id) => Category::find_by_id(category_id)
            .one(db)
            .await?
            .map(|c| CategoryRef {
                id: c.id,
                name: c.name,
                slug: c.slug,
            }),
        None => None,
    };

    let tags = post_model
        .find_related(Tag)
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(TagResponse::from)
        .collect();

    let comments = Comment::find()
        .filter(comment::Column::PostId.eq(post_model.id))
        .filter(comment::Column::Approved.eq(true))
        .order_by_asc(comment::Column::CreatedAt)
        .find_also_related(User)
        .all(db)
        .await?
        .into_iter()
        .map(|(c, u)| CommentResponse::from_model(c, u.map(|u| u.username)))
        .collect();

    let related_posts = match post_model.category_id {
        Some(category_id) => Post::find()
            .filter(post::Column::CategoryId.eq(category_id))
            .filter(post::Column::Status.eq(PostStatus::Published))
            .filter(post::Column::Id.ne(post_model.id))
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .limit(3)
            .all(db)
            .await?
            .into_iter()
            .map(PostSummary::from)
            .collect(),
        None => Vec::new(),
    };

    Ok(PostDetail {
        id: post_model.id,
        title: post_model.title,
        slug: post_model.slug,
        content: post_model.content,
        excerpt: post_model.excerpt,
        featured_image: post_model.featured_image,
        status: post_model.status,
        views: post_model.views,
        author,
        category: category_ref,
        tags,
        comments,
        related_posts,
        created_at: post_model.created_at,
        updated_at: post_model.updated_at,
    })
}
