use std::net::SocketAddr;

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::models::profile::{self, Role};
use crate::models::user;

/// A test application builder for integration testing.
///
/// Spins up a Byline server with an in-memory SQLite database.
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_signup() {
///     let app = TestApp::new().await;
///     let res = app.client.post(&app.url("/api/auth/signup"), r#"{"email":"a@b.com","username":"bob","password":"secret123"}"#).await;
///     assert_eq!(res.status, 200);
/// }
/// ```
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: TestClient,
    pub db: DatabaseConnection,
    pub config: Config,
}

impl TestApp {
    /// Create a new test app with an in-memory SQLite database.
    pub async fn new() -> Self {
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret-key-for-testing".to_string(),
            jwt_expiry_hours: 24,
            server_host: "127.0.0.1".to_string(),
            server_port: 0, // OS assigns a random port
            environment: "test".to_string(),
            page_size: 9,
            featured_count: 3,
            min_password_length: 8,
        };

        Self::with_config(config).await
    }

    /// Create a new test app with a custom config.
    pub async fn with_config(config: Config) -> Self {
        let app = crate::App::with_config(config)
            .await
            .expect("Failed to create test app");

        let router = app.router();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        // Spawn the server in the background
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = TestClient::new(addr);

        TestApp {
            addr,
            client,
            db: app.db,
            config: app.config,
        }
    }

    /// Get the base URL for the test server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Create a user via the signup endpoint and return the auth token and
    /// the user JSON.
    pub async fn create_user(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> (String, serde_json::Value) {
        let body = serde_json::json!({
            "email": email,
            "username": username,
            "password": password,
        });

        let res = self
            .client
            .post(&self.url("/api/auth/signup"), &body.to_string())
            .await;

        assert_eq!(
            res.status, 200,
            "Signup failed with status {}: {}",
            res.status, res.body
        );

        let json: serde_json::Value = serde_json::from_str(&res.body).unwrap();
        let token = json["data"]["access_token"].as_str().unwrap().to_string();
        let user = json["data"]["user"].clone();
        (token, user)
    }

    /// Login and return the auth token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let body = serde_json::json!({
            "email": email,
            "password": password,
        });

        let res = self
            .client
            .post(&self.url("/api/auth/login"), &body.to_string())
            .await;

        assert_eq!(res.status, 200, "Login failed: {}", res.body);

        let json: serde_json::Value = serde_json::from_str(&res.body).unwrap();
        json["data"]["access_token"].as_str().unwrap().to_string()
    }

    /// Set a user's role directly in the database, bypassing the staff-only
    /// endpoint. Grants the staff flag for the admin role, matching the
    /// role endpoint's behavior.
    pub async fn set_role(&self, user_id: i32, role: Role) {
        let profile_model = profile::Entity::find()
            .filter(profile::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .expect("profile query failed")
            .expect("user has no profile");

        let mut active: profile::ActiveModel = profile_model.into();
        active.role = Set(role);
        active.update(&self.db).await.expect("role update failed");

        let user_model = user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .expect("user query failed")
            .expect("user not found");

        let mut active: user::ActiveModel = user_model.into();
        active.is_staff = Set(role == Role::Admin);
        active.update(&self.db).await.expect("staff update failed");
    }

    /// Convenience: signup + promote to author.
    pub async fn create_author(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> (String, i32) {
        let (token, user) = self.create_user(email, username, password).await;
        let id = user["id"].as_i64().unwrap() as i32;
        self.set_role(id, Role::Author).await;
        (token, id)
    }

    /// Convenience: signup + promote to admin (staff).
    pub async fn create_admin(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> (String, i32) {
        let (token, user) = self.create_user(email, username, password).await;
        let id = user["id"].as_i64().unwrap() as i32;
        self.set_role(id, Role::Admin).await;
        (token, id)
    }
}

/// A simple HTTP test client with helper methods.
#[derive(Clone)]
pub struct TestClient {
    inner: reqwest::Client,
    base_addr: SocketAddr,
}

impl TestClient {
    /// Create a new test client pointing at the given address.
    pub fn new(addr: SocketAddr) -> Self {
        TestClient {
            inner: reqwest::Client::new(),
            base_addr: addr,
        }
    }

    /// Send a GET request.
    pub async fn get(&self, url: &str) -> TestResponse {
        let res = self
            .inner
            .get(url)
            .send()
            .await
            .expect("GET request failed");
        TestResponse::from_response(res).await
    }

    /// Send a GET request with an auth token.
    pub async fn get_with_auth(&self, url: &str, token: &str) -> TestResponse {
        let res = self
            .inner
            .get(url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("GET request failed");
        TestResponse::from_response(res).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(&self, url: &str, body: &str) -> TestResponse {
        let res = self
            .inner
            .post(url)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("POST request failed");
        TestResponse::from_response(res).await
    }

    /// Send a POST request with auth token and JSON body.
    pub async fn post_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        let res = self
            .inner
            .post(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .body(body.to_string())
            .send()
            .await
            .expect("POST request failed");
        TestResponse::from_response(res).await
    }

    /// Send a PUT request with auth token and JSON body.
    pub async fn put_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        let res = self
            .inner
            .put(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .body(body.to_string())
            .send()
            .await
            .expect("PUT request failed");
        TestResponse::from_response(res).await
    }

    /// Send a DELETE request with auth token.
    pub async fn delete_with_auth(&self, url: &str, token: &str) -> TestResponse {
        let res = self
            .inner
            .delete(url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("DELETE request failed");
        TestResponse::from_response(res).await
    }

    /// Get the base URL.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.base_addr)
    }
}

/// A simplified HTTP response for test assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub body: String,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        TestResponse { status, body }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("Failed to parse response as JSON")
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        let json = self.json();
        json["success"].as_bool().unwrap_or(false)
    }

    /// Get the data field from the response.
    pub fn data(&self) -> serde_json::Value {
        self.json()["data"].clone()
    }

    /// Get the error field from the response.
    pub fn error(&self) -> serde_json::Value {
        self.json()["error"].clone()
    }
}
