//! Byline: a Django-style publishing platform as one JSON API.
//!
//! Three small apps share the service: the blog (posts, categories, tags,
//! comments, role-based authoring), a guestbook message board, and a
//! student-records manager. See `README.md` for the endpoint map.

pub mod app;
pub mod auth;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod openapi;
pub mod policy;
pub mod response;
pub mod slug;
pub mod testing;

pub use app::App;
pub use config::Config;
pub use error::BylineError;
pub use logging::{init_logging, init_logging_json};
pub use response::{ApiResponse, Paginated};
pub use testing::{TestApp, TestClient, TestResponse};
