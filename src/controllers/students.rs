use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{BylineError, FieldError};
use crate::extractors::{AuthUser, Json};
use crate::models::student::{self, Entity as Student};
use crate::policy::Actor;
use crate::response::{ApiResponse, Deleted};

use super::AppState;

const MIN_AGE: i32 = 1;
const MAX_AGE: i32 = 150;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StudentRequest {
    pub name: String,
    pub email: String,
    pub age: i32,
    pub course: String,
}

/// The full roster plus its size, as the index page shows it.
#[derive(Debug, Serialize, ToSchema)]
pub struct StudentList {
    pub students: Vec<student::Model>,
    pub total: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/students", get(list_students).post(create_student))
        .route(
            "/api/students/{id}",
            get(get_student).put(update_student).delete(delete_student),
        )
}

/// The roster, ordered by name.
#[utoipa::path(
    get,
    path = "/api/students",
    responses(
        (status = 200, description = "All students with the total count", body = ApiResponse<StudentList>),
    ),
    tag = "students"
)]
pub async fn list_students(
    State(state): State<AppState>,
) -> Result<ApiResponse<StudentList>, BylineError> {
    let students = Student::find()
        .order_by_asc(student::Column::Name)
        .order_by_asc(student::Column::Id)
        .all(&state.db)
        .await?;

    let total = students.len() as u64;
    Ok(ApiResponse::success(StudentList { students, total }))
}

/// Register a student (staff only).
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = StudentRequest,
    responses(
        (status = 200, description = "Student created", body = ApiResponse<student::Model>),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid input")
    ),
    tag = "students",
    security(("bearer_auth" = []))
)]
pub async fn create_student(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<StudentRequest>,
) -> Result<ApiResponse<student::Model>, BylineError> {
    require_staff(&state, user_id).await?;
    validate(&payload)?;
    ensure_email_free(&state, &payload.email, None).await?;

    let now = Utc::now().naive_utc();
    let model = student::ActiveModel {
        name: Set(payload.name),
        email: Set(payload.email),
        age: Set(payload.age),
        course: Set(payload.course),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(ApiResponse::success(model))
}

/// One student record.
#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = i32, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student found", body = ApiResponse<student::Model>),
        (status = 404, description = "Student not found")
    ),
    tag = "students"
)]
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<student::Model>, BylineError> {
    let model = find_student(&state, id).await?;
    Ok(ApiResponse::success(model))
}

/// Replace a student record (staff only). The same validation as creation
/// applies, and the new email must not belong to anyone else.
#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(("id" = i32, Path, description = "Student id")),
    request_body = StudentRequest,
    responses(
        (status = 200, description = "Student updated", body = ApiResponse<student::Model>),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid input")
    ),
    tag = "students",
    security(("bearer_auth" = []))
)]
pub async fn update_student(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<StudentRequest>,
) -> Result<ApiResponse<student::Model>, BylineError> {
    require_staff(&state, user_id).await?;
    validate(&payload)?;

    let model = find_student(&state, id).await?;
    ensure_email_free(&state, &payload.email, Some(model.id)).await?;

    let mut active: student::ActiveModel = model.into();
    active.name = Set(payload.name);
    active.email = Set(payload.email);
    active.age = Set(payload.age);
    active.course = Set(payload.course);
    active.updated_at = Set(Utc::now().naive_utc());

    let model = active.update(&state.db).await?;
    Ok(ApiResponse::success(model))
}

/// Remove a student record (staff only).
#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(("id" = i32, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student deleted", body = ApiResponse<Deleted>),
        (status = 404, description = "Student not found")
    ),
    tag = "students",
    security(("bearer_auth" = []))
)]
pub async fn delete_student(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<Deleted>, BylineError> {
    require_staff(&state, user_id).await?;

    let model = find_student(&state, id).await?;
    let id = model.id;
    model.delete(&state.db).await?;

    Ok(ApiResponse::success(Deleted { id }))
}

// ── Helpers ──

async fn require_staff(state: &AppState, user_id: i32) -> Result<(), BylineError> {
    let actor = Actor::load(&state.db, user_id).await?;
    if !actor.is_staff {
        return Err(BylineError::Forbidden(
            "Only staff can manage student records".to_string(),
        ));
    }
    Ok(())
}

async fn find_student(state: &AppState, id: i32) -> Result<student::Model, BylineError> {
    Student::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| BylineError::NotFound(format!("Student {} not found", id)))
}

fn validate(payload: &StudentRequest) -> Result<(), BylineError> {
    let mut errors = Vec::new();

    if payload.name.trim().is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    }
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        errors.push(FieldError::with_code(
            "email",
            "must be a valid email address",
            "invalid_format",
        ));
    }
    if !(MIN_AGE..=MAX_AGE).contains(&payload.age) {
        errors.push(FieldError::new(
            "age",
            format!("must be between {} and {}", MIN_AGE, MAX_AGE),
        ));
    }
    if payload.course.trim().is_empty() {
        errors.push(FieldError::new("course", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(BylineError::validation_fields(errors))
    }
}

async fn ensure_email_free(
    state: &AppState,
    email: &str,
    exclude_id: Option<i32>,
) -> Result<(), BylineError> {
    let mut select = Student::find().filter(student::Column::Email.eq(email));
    if let Some(id) = exclude_id {
        select = select.filter(student::Column::Id.ne(id));
    }
    if select.one(&state.db).await?.is_some() {
        return Err(BylineError::Conflict(format!(
            "A student with email '{}' already exists",
            email
        )));
    }
    Ok(())
}
