use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{create_token, hash_password, verify_password};
use crate::error::{BylineError, FieldError};
use crate::extractors::{AuthUser, Json};
use crate::models::post::{self, Entity as Post, PostStatus, PostSummary};
use crate::models::profile::{self, Entity as Profile, ProfileResponse, Role};
use crate::models::user::{self, Entity as User, UserResponse};
use crate::policy::Actor;
use crate::response::ApiResponse;

use super::AppState;

// ── Request / Response types ──

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
    pub profile: ProfileResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub total_posts: u64,
    pub published_posts: u64,
    pub draft_posts: u64,
    pub recent_posts: Vec<PostSummary>,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/profile", put(update_profile))
        .route("/api/dashboard", get(dashboard))
        .route("/api/users/{id}/role", put(set_role))
}

// ── Handlers ──

/// Sign up a new user.
///
/// The user and its profile (role `reader`) are created in one transaction,
/// so the "every user has exactly one profile" invariant holds from birth.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "User created", body = ApiResponse<AuthResponse>),
        (status = 409, description = "Username or email already taken"),
        (status = 422, description = "Invalid input")
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<ApiResponse<AuthResponse>, BylineError> {
    if payload.email.is_empty() || payload.username.is_empty() || payload.password.is_empty() {
        return Err(BylineError::Validation(
            "Email, username, and password are required".to_string(),
        ));
    }

    if payload.password.len() < state.config.min_password_length {
        return Err(BylineError::Validation(format!(
            "Password must be at least {} characters",
            state.config.min_password_length
        )));
    }

    let existing = User::find()
        .filter(
            user::Column::Email
                .eq(&payload.email)
                .or(user::Column::Username.eq(&payload.username)),
        )
        .one(&state.db)
        .await?;

    if existing.is_some() {
        return Err(BylineError::Conflict(
            "User with this email or username already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let now = Utc::now().naive_utc();

    let txn = state.db.begin().await?;

    let user_model = user::ActiveModel {
        username: Set(payload.username),
        email: Set(payload.email),
        password_hash: Set(password_hash),
        is_staff: Set(false),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    profile::ActiveModel {
        user_id: Set(user_model.id),
        role: Set(Role::Reader),
        bio: Set(String::new()),
        avatar: Set(None),
        website: Set(None),
        twitter: Set(None),
        linkedin: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(user_id = user_model.id, username = %user_model.username, "new account registered");

    let token = create_token(
        user_model.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    Ok(ApiResponse::success(AuthResponse {
        access_token: token,
        user: UserResponse::from(user_model),
    }))
}

/// Log in with existing credentials.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<AuthResponse>, BylineError> {
    let user_model = User::find()
        .filter(user::Column::Email.eq(&payload.email))
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::Unauthorized("Invalid email or password".to_string()))?;

    if !user_model.is_active {
        return Err(BylineError::Unauthorized("Account is disabled".to_string()));
    }

    if !verify_password(&payload.password, &user_model.password_hash)? {
        return Err(BylineError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = create_token(
        user_model.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    Ok(ApiResponse::success(AuthResponse {
        access_token: token,
        user: UserResponse::from(user_model),
    }))
}

/// The authenticated user's account and profile.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<MeResponse>),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<MeResponse>, BylineError> {
    let (user_model, profile_model) = User::find_by_id(user_id)
        .find_also_related(Profile)
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound("User not found".to_string()))?;

    let profile_model = profile_model
        .ok_or_else(|| BylineError::Internal(format!("User {} has no profile", user_id)))?;

    Ok(ApiResponse::success(MeResponse {
        user: UserResponse::from(user_model),
        profile: ProfileResponse::from(profile_model),
    }))
}

/// Update the caller's own profile (and email). The role is not
/// self-editable; see the role endpoint.
#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<MeResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 409, description = "Email already taken")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<ApiResponse<MeResponse>, BylineError> {
    let (user_model, profile_model) = User::find_by_id(user_id)
        .find_also_related(Profile)
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound("User not found".to_string()))?;

    let profile_model = profile_model
        .ok_or_else(|| BylineError::Internal(format!("User {} has no profile", user_id)))?;

    let now = Utc::now().naive_utc();
    let txn = state.db.begin().await?;

    let mut user_active: user::ActiveModel = user_model.into();
    if let Some(email) = payload.email {
        if email.is_empty() {
            return Err(BylineError::validation_fields(vec![FieldError::new(
                "email",
                "must not be empty",
            )]));
        }
        let taken = User::find()
            .filter(user::Column::Email.eq(&email))
            .filter(user::Column::Id.ne(user_id))
            .one(&txn)
            .await?;
        if taken.is_some() {
            return Err(BylineError::Conflict("Email already in use".to_string()));
        }
        user_active.email = Set(email);
    }
    user_active.updated_at = Set(now);
    let user_model = user_active.update(&txn).await?;

    let mut profile_active: profile::ActiveModel = profile_model.into();
    if let Some(bio) = payload.bio {
        profile_active.bio = Set(bio);
    }
    if let Some(avatar) = payload.avatar {
        profile_active.avatar = Set(Some(avatar));
    }
    if let Some(website) = payload.website {
        profile_active.website = Set(Some(website));
    }
    if let Some(twitter) = payload.twitter {
        profile_active.twitter = Set(Some(twitter));
    }
    if let Some(linkedin) = payload.linkedin {
        profile_active.linkedin = Set(Some(linkedin));
    }
    profile_active.updated_at = Set(now);
    let profile_model = profile_active.update(&txn).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(MeResponse {
        user: UserResponse::from(user_model),
        profile: ProfileResponse::from(profile_model),
    }))
}

/// Author dashboard: totals over the caller's posts plus the five most
/// recent ones. Requires the author capability.
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Dashboard stats", body = ApiResponse<DashboardResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an author")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<DashboardResponse>, BylineError> {
    let actor = Actor::load(&state.db, user_id).await?;
    if !actor.role.is_author() {
        return Err(BylineError::Forbidden(
            "You need to be an author to access the dashboard".to_string(),
        ));
    }

    let mine = Post::find().filter(post::Column::AuthorId.eq(user_id));

    let total_posts = mine.clone().count(&state.db).await?;
    let published_posts = mine
        .clone()
        .filter(post::Column::Status.eq(PostStatus::Published))
        .count(&state.db)
        .await?;
    let draft_posts = total_posts - published_posts;

    let recent_posts = mine
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id)
        .limit(5)
        .all(&state.db)
        .await?
        .into_iter()
        .map(PostSummary::from)
        .collect();

    Ok(ApiResponse::success(DashboardResponse {
        total_posts,
        published_posts,
        draft_posts,
        recent_posts,
    }))
}

/// Change a user's role (staff only). Granting `admin` also grants the
/// staff flag; revoking it revokes the flag.
#[utoipa::path(
    put,
    path = "/api/users/{id}/role",
    params(("id" = i32, Path, description = "User ID")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = ApiResponse<MeResponse>),
        (status = 403, description = "Staff only"),
        (status = 404, description = "User not found")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn set_role(
    State(state): State<AppState>,
    AuthUser(actor_id): AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<ApiResponse<MeResponse>, BylineError> {
    let actor = Actor::load(&state.db, actor_id).await?;
    if !actor.is_staff {
        return Err(BylineError::Forbidden(
            "Only staff can change roles".to_string(),
        ));
    }

    let (user_model, profile_model) = User::find_by_id(id)
        .find_also_related(Profile)
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound(format!("User with id {} not found", id)))?;

    let profile_model =
        profile_model.ok_or_else(|| BylineError::Internal(format!("User {} has no profile", id)))?;

    let now = Utc::now().naive_utc();
    let txn = state.db.begin().await?;

    let mut profile_active: profile::ActiveModel = profile_model.into();
    profile_active.role = Set(payload.role);
    profile_active.updated_at = Set(now);
    let profile_model = profile_active.update(&txn).await?;

    let mut user_active: user::ActiveModel = user_model.into();
    user_active.is_staff = Set(payload.role == Role::Admin);
    user_active.updated_at = Set(now);
    let user_model = user_active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(user_id = id, role = ?payload.role, "role changed");

    Ok(ApiResponse::success(MeResponse {
        user: UserResponse::from(user_model),
        profile: ProfileResponse::from(profile_model),
    }))
}
