use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{BylineError, FieldError};
use crate::extractors::{AuthUser, Json, Page};
use crate::models::message::{self, Entity as Message};
use crate::policy::Actor;
use crate::response::{ApiResponse, Deleted, Paginated};

use super::{AppState, paginate};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMessageRequest {
    pub text: String,
}

/// Message as listed on the board, with the truncated preview alongside the
/// full text.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: i32,
    pub text: String,
    pub preview: String,
    pub created_at: NaiveDateTime,
}

impl From<message::Model> for MessageResponse {
    fn from(m: message::Model) -> Self {
        MessageResponse {
            preview: m.preview(),
            id: m.id,
            text: m.text,
            created_at: m.created_at,
        }
    }
}

/// Posting volume counters for the board.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageStats {
    pub total: u64,
    pub today: u64,
    pub last_week: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/messages", get(list_messages).post(create_message))
        .route("/api/messages/stats", get(message_stats))
        .route("/api/messages/{id}", axum::routing::delete(delete_message))
}

/// The guestbook, newest first.
#[utoipa::path(
    get,
    path = "/api/messages",
    params(Page),
    responses(
        (status = 200, description = "One page of messages", body = ApiResponse<Paginated<MessageResponse>>),
    ),
    tag = "messages"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    page: Page,
) -> Result<ApiResponse<Paginated<MessageResponse>>, BylineError> {
    let select = Message::find()
        .order_by_desc(message::Column::CreatedAt)
        .order_by_desc(message::Column::Id);

    let page = paginate(&state.db, select, page.number(), state.config.page_size).await?;
    Ok(ApiResponse::success(page.map(MessageResponse::from)))
}

/// Leave a message. No account needed; the text just has to say something.
#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = CreateMessageRequest,
    responses(
        (status = 200, description = "Message posted", body = ApiResponse<MessageResponse>),
        (status = 422, description = "Blank text")
    ),
    tag = "messages"
)]
pub async fn create_message(
    State(state): State<AppState>,
    Json(payload): Json<CreateMessageRequest>,
) -> Result<ApiResponse<MessageResponse>, BylineError> {
    if payload.text.trim().is_empty() {
        return Err(BylineError::validation_fields(vec![FieldError::new(
            "text",
            "must not be empty",
        )]));
    }

    let model = message::ActiveModel {
        text: Set(payload.text),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(ApiResponse::success(MessageResponse::from(model)))
}

/// Remove a message from the board (staff only).
#[utoipa::path(
    delete,
    path = "/api/messages/{id}",
    params(("id" = i32, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message deleted", body = ApiResponse<Deleted>),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Message not found")
    ),
    tag = "messages",
    security(("bearer_auth" = []))
)]
pub async fn delete_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<Deleted>, BylineError> {
    let actor = Actor::load(&state.db, user_id).await?;
    if !actor.is_staff {
        return Err(BylineError::Forbidden(
            "Only staff can delete messages".to_string(),
        ));
    }

    let model = Message::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound(format!("Message {} not found", id)))?;

    let id = model.id;
    model.delete(&state.db).await?;

    Ok(ApiResponse::success(Deleted { id }))
}

/// Posting volume: all-time, since UTC midnight, and the trailing seven
/// days.
#[utoipa::path(
    get,
    path = "/api/messages/stats",
    responses(
        (status = 200, description = "Message counters", body = ApiResponse<MessageStats>),
    ),
    tag = "messages"
)]
pub async fn message_stats(
    State(state): State<AppState>,
) -> Result<ApiResponse<MessageStats>, BylineError> {
    let now = Utc::now().naive_utc();
    let midnight = now.date().and_hms_opt(0, 0, 0).unwrap_or(now);
    let week_ago = now - Duration::days(7);

    let total = Message::find().count(&state.db).await?;
    let today = Message::find()
        .filter(message::Column::CreatedAt.gte(midnight))
        .count(&state.db)
        .await?;
    let last_week = Message::find()
        .filter(message::Column::CreatedAt.gte(week_ago))
        .count(&state.db)
        .await?;

    Ok(ApiResponse::success(MessageStats {
        total,
        today,
        last_week,
    }))
}
