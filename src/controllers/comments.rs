use axum::{
    Router,
    extract::{Path, State},
    routing,
    routing::delete,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{BylineError, FieldError};
use crate::extractors::{AuthUser, Json};
use crate::models::comment::{self, CommentResponse, Entity as Comment};
use crate::models::post::{self, Entity as Post, PostStatus};
use crate::models::user::Entity as User;
use crate::policy::{self, Actor};
use crate::response::{ApiResponse, Deleted};

use super::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    pub content: String,
}

pub fn routes() -> Router<AppState> {
    // The create route lives under /api/posts/{slug}/comments, mounted by
    // the posts router.
    Router::new()
        .route("/api/comments/{id}", delete(delete_comment))
        .route("/api/comments/{id}/approve", routing::post(approve_comment))
        .route("/api/comments/{id}/reject", routing::post(reject_comment))
}

/// Submit a comment on a published post. It enters the moderation queue
/// unapproved and stays off the public detail page until staff approves it.
#[utoipa::path(
    post,
    path = "/api/posts/{slug}/comments",
    params(("slug" = String, Path, description = "Post slug")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment submitted for moderation", body = ApiResponse<CommentResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Post not found")
    ),
    tag = "comments",
    security(("bearer_auth" = []))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<ApiResponse<CommentResponse>, BylineError> {
    if payload.content.trim().is_empty() {
        return Err(BylineError::validation_fields(vec![FieldError::new(
            "content",
            "must not be empty",
        )]));
    }

    // Comments attach to the public detail page, so drafts take none.
    let post_model = Post::find()
        .filter(post::Column::Slug.eq(&slug))
        .filter(post::Column::Status.eq(PostStatus::Published))
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound(format!("Post '{}' not found", slug)))?;

    let username = User::find_by_id(user_id)
        .one(&state.db)
        .await?
        .map(|u| u.username);

    let comment_model = comment::ActiveModel {
        post_id: Set(post_model.id),
        user_id: Set(user_id),
        content: Set(payload.content),
        approved: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(
        comment_id = comment_model.id,
        post_id = post_model.id,
        user_id,
        "comment awaiting moderation"
    );

    Ok(ApiResponse::success(CommentResponse::from_model(
        comment_model,
        username,
    )))
}

/// Delete a comment. Allowed for the comment's author, the author of the
/// post it sits on, and staff.
#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    params(("id" = i32, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment deleted", body = ApiResponse<Deleted>),
        (status = 403, description = "Not allowed to delete this comment"),
        (status = 404, description = "Comment not found")
    ),
    tag = "comments",
    security(("bearer_auth" = []))
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<Deleted>, BylineError> {
    let comment_model = Comment::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound(format!("Comment {} not found", id)))?;

    let post_model = Post::find_by_id(comment_model.post_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            BylineError::Internal(format!("Comment {} has no post row", comment_model.id))
        })?;

    let actor = Actor::load(&state.db, user_id).await?;
    if !policy::can_delete_comment(actor, comment_model.user_id, post_model.author_id) {
        return Err(BylineError::Forbidden(
            "You cannot delete this comment".to_string(),
        ));
    }

    let id = comment_model.id;
    comment_model.delete(&state.db).await?;

    Ok(ApiResponse::success(Deleted { id }))
}

/// Approve a comment (staff only), making it visible on the post detail.
#[utoipa::path(
    post,
    path = "/api/comments/{id}/approve",
    params(("id" = i32, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment approved", body = ApiResponse<CommentResponse>),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Comment not found")
    ),
    tag = "comments",
    security(("bearer_auth" = []))
)]
pub async fn approve_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<CommentResponse>, BylineError> {
    moderate(&state, user_id, id, true).await
}

/// Send a comment back to the moderation queue (staff only).
#[utoipa::path(
    post,
    path = "/api/comments/{id}/reject",
    params(("id" = i32, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment hidden", body = ApiResponse<CommentResponse>),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Comment not found")
    ),
    tag = "comments",
    security(("bearer_auth" = []))
)]
pub async fn reject_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<CommentResponse>, BylineError> {
    moderate(&state, user_id, id, false).await
}

async fn moderate(
    state: &AppState,
    user_id: i32,
    comment_id: i32,
    approved: bool,
) -> Result<ApiResponse<CommentResponse>, BylineError> {
    let actor = Actor::load(&state.db, user_id).await?;
    if !actor.is_staff {
        return Err(BylineError::Forbidden(
            "Only staff can moderate comments".to_string(),
        ));
    }

    let (comment_model, commenter) = Comment::find_by_id(comment_id)
        .find_also_related(User)
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound(format!("Comment {} not found", comment_id)))?;

    let mut active: comment::ActiveModel = comment_model.into();
    active.approved = Set(approved);
    let comment_model = active.update(&state.db).await?;

    tracing::info!(comment_id = comment_model.id, approved, "comment moderated");

    Ok(ApiResponse::success(CommentResponse::from_model(
        comment_model,
        commenter.map(|u| u.username),
    )))
}
