use byline::TestApp;
use byline::models::profile::Role;

#[tokio::test]
async fn test_signup_success() {
    let app = TestApp::new().await;

    let body = serde_json::json!({
        "email": "test@example.com",
        "username": "testuser",
        "password": "password123"
    });

    let res = app
        .client
        .post(&app.url("/api/auth/signup"), &body.to_string())
        .await;

    assert_eq!(res.status, 200);
    assert!(res.is_success());

    let data = res.data();
    assert!(data["access_token"].is_string());
    assert_eq!(data["user"]["email"], "test@example.com");
    assert_eq!(data["user"]["username"], "testuser");
    // password_hash should NOT be in the response
    assert!(data["user"]["password_hash"].is_null());
}

#[tokio::test]
async fn test_signup_creates_reader_profile() {
    let app = TestApp::new().await;

    let (token, _) = app
        .create_user("reader@example.com", "reader", "password123")
        .await;

    let res = app
        .client
        .get_with_auth(&app.url("/api/auth/me"), &token)
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.data()["profile"]["role"], "reader");
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let app = TestApp::new().await;

    app.create_user("dup@example.com", "user1", "password123")
        .await;

    let body = serde_json::json!({
        "email": "dup@example.com",
        "username": "user2",
        "password": "password123"
    });

    let res = app
        .client
        .post(&app.url("/api/auth/signup"), &body.to_string())
        .await;

    assert_eq!(res.status, 409);
    assert!(!res.is_success());
}

#[tokio::test]
async fn test_signup_duplicate_username() {
    let app = TestApp::new().await;

    app.create_user("a@example.com", "sameuser", "password123")
        .await;

    let body = serde_json::json!({
        "email": "b@example.com",
        "username": "sameuser",
        "password": "password123"
    });

    let res = app
        .client
        .post(&app.url("/api/auth/signup"), &body.to_string())
        .await;

    assert_eq!(res.status, 409);
}

#[tokio::test]
async fn test_signup_missing_fields() {
    let app = TestApp::new().await;

    let body = serde_json::json!({
        "email": "",
        "username": "testuser",
        "password": "password123"
    });

    let res = app
        .client
        .post(&app.url("/api/auth/signup"), &body.to_string())
        .await;

    assert_eq!(res.status, 422);
}

#[tokio::test]
async fn test_signup_short_password() {
    let app = TestApp::new().await;

    let body = serde_json::json!({
        "email": "short@example.com",
        "username": "shortpw",
        "password": "123"
    });

    let res = app
        .client
        .post(&app.url("/api/auth/signup"), &body.to_string())
        .await;

    assert_eq!(res.status, 422);
}

#[tokio::test]
async fn test_login_success() {
    let app = TestApp::new().await;

    app.create_user("login@example.com", "loginuser", "password123")
        .await;

    let token = app.login("login@example.com", "password123").await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new().await;

    app.create_user("wrong@example.com", "wronguser", "password123")
        .await;

    let body = serde_json::json!({
        "email": "wrong@example.com",
        "password": "not-the-password"
    });

    let res = app
        .client
        .post(&app.url("/api/auth/login"), &body.to_string())
        .await;

    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn test_login_unknown_email() {
    let app = TestApp::new().await;

    let body = serde_json::json!({
        "email": "nobody@example.com",
        "password": "password123"
    });

    let res = app
        .client
        .post(&app.url("/api/auth/login"), &body.to_string())
        .await;

    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn test_me_requires_auth() {
    let app = TestApp::new().await;

    let res = app.client.get(&app.url("/api/auth/me")).await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn test_update_profile() {
    let app = TestApp::new().await;

    let (token, _) = app
        .create_user("profile@example.com", "profileuser", "password123")
        .await;

    let body = serde_json::json!({
        "bio": "I write about Rust.",
        "website": "https://example.com"
    });

    let res = app
        .client
        .put_with_auth(&app.url("/api/profile"), &token, &body.to_string())
        .await;

    assert_eq!(res.status, 200);
    let data = res.data();
    assert_eq!(data["profile"]["bio"], "I write about Rust.");
    assert_eq!(data["profile"]["website"], "https://example.com");
}

#[tokio::test]
async fn test_update_profile_email_conflict() {
    let app = TestApp::new().await;

    app.create_user("taken@example.com", "taken", "password123")
        .await;
    let (token, _) = app
        .create_user("mine@example.com", "mine", "password123")
        .await;

    let body = serde_json::json!({ "email": "taken@example.com" });
    let res = app
        .client
        .put_with_auth(&app.url("/api/profile"), &token, &body.to_string())
        .await;

    assert_eq!(res.status, 409);
}

#[tokio::test]
async fn test_set_role_staff_only() {
    let app = TestApp::new().await;

    let (_, target) = app
        .create_user("target@example.com", "target", "password123")
        .await;
    let target_id = target["id"].as_i64().unwrap();

    let (reader_token, _) = app
        .create_user("plain@example.com", "plain", "password123")
        .await;

    let body = serde_json::json!({ "role": "author" });
    let res = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/users/{}/role", target_id)),
            &reader_token,
            &body.to_string(),
        )
        .await;

    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn test_set_role_admin_grants_staff() {
    let app = TestApp::new().await;

    let (admin_token, _) = app
        .create_admin("boss@example.com", "boss", "password123")
        .await;
    let (_, target) = app
        .create_user("promote@example.com", "promote", "password123")
        .await;
    let target_id = target["id"].as_i64().unwrap();

    let body = serde_json::json!({ "role": "admin" });
    let res = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/users/{}/role", target_id)),
            &admin_token,
            &body.to_string(),
        )
        .await;

    assert_eq!(res.status, 200);
    let data = res.data();
    assert_eq!(data["profile"]["role"], "admin");
    assert_eq!(data["user"]["is_staff"], true);

    // Demoting back to author revokes the staff flag.
    let body = serde_json::json!({ "role": "author" });
    let res = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/users/{}/role", target_id)),
            &admin_token,
            &body.to_string(),
        )
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.data()["user"]["is_staff"], false);
}

#[tokio::test]
async fn test_dashboard_requires_author_role() {
    let app = TestApp::new().await;

    let (reader_token, _) = app
        .create_user("dash-reader@example.com", "dashreader", "password123")
        .await;

    let res = app
        .client
        .get_with_auth(&app.url("/api/dashboard"), &reader_token)
        .await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn test_dashboard_counts() {
    let app = TestApp::new().await;

    let (token, author_id) = app
        .create_author("dash@example.com", "dashauthor", "password123")
        .await;
    assert!(author_id > 0);

    for (title, status) in [
        ("Alpha", "published"),
        ("Beta", "published"),
        ("Gamma", "draft"),
    ] {
        let body = serde_json::json!({
            "title": title,
            "content": "body",
            "status": status
        });
        let res = app
            .client
            .post_with_auth(&app.url("/api/posts"), &token, &body.to_string())
            .await;
        assert_eq!(res.status, 200, "{}", res.body);
    }

    let res = app
        .client
        .get_with_auth(&app.url("/api/dashboard"), &token)
        .await;

    assert_eq!(res.status, 200);
    let data = res.data();
    assert_eq!(data["total_posts"], 3);
    assert_eq!(data["published_posts"], 2);
    assert_eq!(data["draft_posts"], 1);
    assert_eq!(data["recent_posts"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_role_helper_sets_role() {
    let app = TestApp::new().await;

    let (token, user) = app
        .create_user("helper@example.com", "helper", "password123")
        .await;
    let id = user["id"].as_i64().unwrap() as i32;

    app.set_role(id, Role::Author).await;

    let res = app
        .client
        .get_with_auth(&app.url("/api/auth/me"), &token)
        .await;
    assert_eq!(res.data()["profile"]["role"], "author");
}
