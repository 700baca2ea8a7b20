use std::sync::Arc;

use axum::Router;
use axum::response::IntoResponse;
use axum::routing::get;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::auth;
use crate::config::Config;
use crate::controllers::{self, AppState};
use crate::migrations::Migrator;
use crate::models::profile::{self, Role};
use crate::models::user;
use crate::openapi::ApiDoc;

/// The Byline application: config, database and the full route tree.
pub struct App {
    pub config: Config,
    pub db: DatabaseConnection,
}

impl App {
    /// Create an application from the environment.
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::from_env()?;
        Self::with_config(config).await
    }

    /// Create an application with a given config.
    pub async fn with_config(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let db = crate::db::connect(&config).await?;

        // One-shot CLI operations (--migrate, --rollback, --create-admin)
        // run and exit before the server comes up.
        Self::handle_cli_args(&db).await?;

        tracing::info!("Running pending database migrations...");
        Migrator::up(&db, None).await?;
        tracing::info!("Migrations complete.");

        Ok(App { config, db })
    }

    /// Handle one-shot operations passed as command-line arguments. If one
    /// is present the process performs it and exits.
    async fn handle_cli_args(db: &DatabaseConnection) -> Result<(), Box<dyn std::error::Error>> {
        let args: Vec<String> = std::env::args().collect();

        if args.contains(&"--migrate".to_string()) {
            tracing::info!("Running pending database migrations...");
            Migrator::up(db, None).await?;
            tracing::info!("Migrations complete.");
            std::process::exit(0);
        }

        if let Some(pos) = args.iter().position(|arg| arg == "--rollback") {
            let steps = args
                .get(pos + 1)
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(1);
            tracing::info!("Rolling back {} migration(s)...", steps);
            Migrator::down(db, Some(steps)).await?;
            tracing::info!("Rollback complete.");
            std::process::exit(0);
        }

        // --create-admin <username> <email> <password>
        if let Some(pos) = args.iter().position(|arg| arg == "--create-admin") {
            let (username, email, password) =
                match (args.get(pos + 1), args.get(pos + 2), args.get(pos + 3)) {
                    (Some(u), Some(e), Some(p)) => (u.clone(), e.clone(), p.clone()),
                    _ => {
                        eprintln!("Usage: --create-admin <username> <email> <password>");
                        std::process::exit(1);
                    }
                };

            Migrator::up(db, None).await?;
            Self::create_admin(db, &username, &email, &password).await?;
            tracing::info!(%username, "admin account created");
            std::process::exit(0);
        }

        Ok(())
    }

    /// Create a staff account with the admin role, for bootstrapping a fresh
    /// deployment.
    pub async fn create_admin(
        db: &DatabaseConnection,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let now = Utc::now().naive_utc();
        let password_hash = auth::hash_password(password)?;

        let txn = db.begin().await?;

        let user_model = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            is_staff: Set(true),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        profile::ActiveModel {
            user_id: Set(user_model.id),
            role: Set(Role::Admin),
            bio: Set(String::new()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Build the Axum router with all API routes, docs and middleware.
    pub fn router(&self) -> Router {
        let config = Arc::new(self.config.clone());
        let is_dev = self.config.is_dev();

        let state = AppState {
            db: self.db.clone(),
            config: self.config.clone(),
        };

        let openapi_spec = ApiDoc::openapi();
        let openapi_json = openapi_spec.clone();

        let mut router = Router::new()
            .route("/", get(welcome))
            .route("/health", get(health))
            .merge(
                Router::new()
                    .merge(controllers::auth::routes())
                    .merge(controllers::posts::routes())
                    .merge(controllers::categories::routes())
                    .merge(controllers::tags::routes())
                    .merge(controllers::comments::routes())
                    .merge(controllers::messages::routes())
                    .merge(controllers::students::routes())
                    .with_state(state),
            )
            .merge(Scalar::with_url("/api-docs", openapi_spec))
            .route(
                "/api-docs/openapi.json",
                get(move || {
                    let spec = openapi_json.clone();
                    async move { axum::Json(spec) }
                }),
            )
            .layer(axum::Extension(config))
            .layer(CorsLayer::permissive());

        // Request-id and trace middleware only in development.
        if is_dev {
            use tower_http::LatencyUnit;
            use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse};

            let x_request_id = axum::http::HeaderName::from_static("x-request-id");
            router = router
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                        .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                        .on_response(
                            DefaultOnResponse::new()
                                .level(tracing::Level::INFO)
                                .latency_unit(LatencyUnit::Millis),
                        ),
                );
        }

        router
    }

    /// Run the application server until CTRL+C.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.config.server_addr();
        let router = self.router();

        tracing::info!("Byline server running on http://{}", addr);
        tracing::info!("API docs at http://{}/api-docs", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("Failed to install CTRL+C signal handler");
        return;
    }
    tracing::info!("Shutting down Byline server...");
}

#[derive(Serialize)]
struct WelcomeMessage {
    message: &'static str,
    docs: &'static str,
    status: &'static str,
}

/// Welcome page at `/`.
async fn welcome() -> impl IntoResponse {
    axum::Json(WelcomeMessage {
        message: "Welcome to Byline!",
        docs: "/api-docs",
        status: "running",
    })
}

/// Liveness probe.
async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
