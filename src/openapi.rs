use utoipa::OpenApi;

use crate::controllers::auth::{
    AuthResponse, DashboardResponse, LoginRequest, MeResponse, SetRoleRequest, SignupRequest,
    UpdateProfileRequest,
};
use crate::controllers::categories::CreateCategoryRequest;
use crate::controllers::comments::CreateCommentRequest;
use crate::controllers::messages::{CreateMessageRequest, MessageResponse, MessageStats};
use crate::controllers::posts::{
    AuthorRef, CategoryRef, CreatePostRequest, PostDetail, UpdatePostRequest,
};
use crate::controllers::students::{StudentList, StudentRequest};
use crate::controllers::tags::CreateTagRequest;
use crate::models::category::CategoryResponse;
use crate::models::comment::CommentResponse;
use crate::models::post::{PostStatus, PostSummary};
use crate::models::profile::{ProfileResponse, Role};
use crate::models::tag::TagResponse;
use crate::models::user::UserResponse;

/// OpenAPI documentation for the Byline API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Byline API",
        version = "0.1.0",
        description = "Blog, guestbook and student records over one JSON API."
    ),
    paths(
        crate::controllers::auth::signup,
        crate::controllers::auth::login,
        crate::controllers::auth::me,
        crate::controllers::auth::update_profile,
        crate::controllers::auth::dashboard,
        crate::controllers::auth::set_role,
        crate::controllers::posts::list_posts,
        crate::controllers::posts::featured_posts,
        crate::controllers::posts::get_post,
        crate::controllers::posts::create_post,
        crate::controllers::posts::update_post,
        crate::controllers::posts::delete_post,
        crate::controllers::categories::list_categories,
        crate::controllers::categories::create_category,
        crate::controllers::categories::delete_category,
        crate::controllers::categories::category_posts,
        crate::controllers::tags::list_tags,
        crate::controllers::tags::create_tag,
        crate::controllers::tags::tag_posts,
        crate::controllers::comments::create_comment,
        crate::controllers::comments::delete_comment,
        crate::controllers::comments::approve_comment,
        crate::controllers::comments::reject_comment,
        crate::controllers::messages::list_messages,
        crate::controllers::messages::create_message,
        crate::controllers::messages::delete_message,
        crate::controllers::messages::message_stats,
        crate::controllers::students::list_students,
        crate::controllers::students::create_student,
        crate::controllers::students::get_student,
        crate::controllers::students::update_student,
        crate::controllers::students::delete_student,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            AuthResponse,
            MeResponse,
            UpdateProfileRequest,
            SetRoleRequest,
            DashboardResponse,
            UserResponse,
            ProfileResponse,
            Role,
            CreatePostRequest,
            UpdatePostRequest,
            PostDetail,
            PostSummary,
            PostStatus,
            AuthorRef,
            CategoryRef,
            CreateCategoryRequest,
            CategoryResponse,
            CreateTagRequest,
            TagResponse,
            CreateCommentRequest,
            CommentResponse,
            CreateMessageRequest,
            MessageResponse,
            MessageStats,
            StudentRequest,
            StudentList,
            crate::models::student::Model,
        )
    ),
    tags(
        (name = "auth", description = "Accounts, profiles and roles"),
        (name = "posts", description = "Blog posts"),
        (name = "categories", description = "Post categories"),
        (name = "tags", description = "Post tags"),
        (name = "comments", description = "Comments and moderation"),
        (name = "messages", description = "Guestbook message board"),
        (name = "students", description = "Student records")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add JWT Bearer security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}
