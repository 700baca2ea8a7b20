use byline::TestApp;

/// Posts a published article and returns its slug.
async fn publish_post(app: &TestApp, token: &str, title: &str) -> String {
    let body = serde_json::json!({
        "title": title,
        "content": "body",
        "status": "published"
    });
    let res = app
        .client
        .post_with_auth(&app.url("/api/posts"), token, &body.to_string())
        .await;
    assert_eq!(res.status, 200, "{}", res.body);
    res.data()["slug"].as_str().unwrap().to_string()
}

async fn submit_comment(app: &TestApp, token: &str, slug: &str, content: &str) -> i64 {
    let body = serde_json::json!({ "content": content });
    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/posts/{}/comments", slug)),
            token,
            &body.to_string(),
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.body);
    assert_eq!(res.data()["approved"], false);
    res.data()["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_comment_requires_auth() {
    let app = TestApp::new().await;
    let (author_token, _) = app
        .create_author("author@example.com", "author", "password123")
        .await;
    let slug = publish_post(&app, &author_token, "Open Thread").await;

    let body = serde_json::json!({ "content": "anonymous words" });
    let res = app
        .client
        .post(
            &app.url(&format!("/api/posts/{}/comments", slug)),
            &body.to_string(),
        )
        .await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn test_comment_moderation_flow() {
    let app = TestApp::new().await;
    let (author_token, _) = app
        .create_author("host@example.com", "host", "password123")
        .await;
    let (reader_token, _) = app
        .create_user("guest@example.com", "guest", "password123")
        .await;
    let (staff_token, _) = app
        .create_admin("mod@example.com", "moderator", "password123")
        .await;

    let slug = publish_post(&app, &author_token, "Moderated Thread").await;
    let comment_id = submit_comment(&app, &reader_token, &slug, "First!").await;

    // Unapproved comments stay off the public detail page.
    let res = app.client.get(&app.url(&format!("/api/posts/{}", slug))).await;
    assert_eq!(res.data()["comments"].as_array().unwrap().len(), 0);

    // Non-staff cannot approve.
    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/comments/{}/approve", comment_id)),
            &reader_token,
            "",
        )
        .await;
    assert_eq!(res.status, 403);

    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/comments/{}/approve", comment_id)),
            &staff_token,
            "",
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["approved"], true);

    let res = app.client.get(&app.url(&format!("/api/posts/{}", slug))).await;
    let comments = res.data()["comments"].as_array().unwrap().clone();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["content"], "First!");
    assert_eq!(comments[0]["username"], "guest");

    // Rejecting hides it again.
    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/comments/{}/reject", comment_id)),
            &staff_token,
            "",
        )
        .await;
    assert_eq!(res.status, 200);

    let res = app.client.get(&app.url(&format!("/api/posts/{}", slug))).await;
    assert_eq!(res.data()["comments"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_blank_comment_rejected() {
    let app = TestApp::new().await;
    let (author_token, _) = app
        .create_author("blank@example.com", "blankhost", "password123")
        .await;
    let slug = publish_post(&app, &author_token, "No Blanks").await;

    let body = serde_json::json!({ "content": "   " });
    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/posts/{}/comments", slug)),
            &author_token,
            &body.to_string(),
        )
        .await;
    assert_eq!(res.status, 422);
}

#[tokio::test]
async fn test_no_comments_on_drafts() {
    let app = TestApp::new().await;
    let (author_token, _) = app
        .create_author("draft@example.com", "drafthost", "password123")
        .await;

    let body = serde_json::json!({
        "title": "Unpublished",
        "content": "body",
        "status": "draft"
    });
    let res = app
        .client
        .post_with_auth(&app.url("/api/posts"), &author_token, &body.to_string())
        .await;
    assert_eq!(res.status, 200);

    let body = serde_json::json!({ "content": "too early" });
    let res = app
        .client
        .post_with_auth(
            &app.url("/api/posts/unpublished/comments"),
            &author_token,
            &body.to_string(),
        )
        .await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_comment_delete_policy() {
    let app = TestApp::new().await;
    let (post_author_token, _) = app
        .create_author("pauthor@example.com", "pauthor", "password123")
        .await;
    let (commenter_token, _) = app
        .create_user("cwriter@example.com", "cwriter", "password123")
        .await;
    let (stranger_token, _) = app
        .create_user("nosy@example.com", "nosy", "password123")
        .await;

    let slug = publish_post(&app, &post_author_token, "Delete Policy").await;

    // A stranger cannot delete someone else's comment.
    let id = submit_comment(&app, &commenter_token, &slug, "mine").await;
    let res = app
        .client
        .delete_with_auth(&app.url(&format!("/api/comments/{}", id)), &stranger_token)
        .await;
    assert_eq!(res.status, 403);

    // The commenter can.
    let res = app
        .client
        .delete_with_auth(&app.url(&format!("/api/comments/{}", id)), &commenter_token)
        .await;
    assert_eq!(res.status, 200);

    // The post's author can delete comments on their post.
    let id = submit_comment(&app, &commenter_token, &slug, "again").await;
    let res = app
        .client
        .delete_with_auth(
            &app.url(&format!("/api/comments/{}", id)),
            &post_author_token,
        )
        .await;
    assert_eq!(res.status, 200);

    let res = app
        .client
        .delete_with_auth(&app.url(&format!("/api/comments/{}", id)), &commenter_token)
        .await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_deleting_post_removes_comments() {
    let app = TestApp::new().await;
    let (author_token, _) = app
        .create_author("cascade@example.com", "cascade", "password123")
        .await;
    let (staff_token, _) = app
        .create_admin("sweeper@example.com", "sweeper", "password123")
        .await;

    let slug = publish_post(&app, &author_token, "Cascading").await;
    let comment_id = submit_comment(&app, &author_token, &slug, "going down with the ship").await;

    let res = app
        .client
        .delete_with_auth(&app.url(&format!("/api/posts/{}", slug)), &author_token)
        .await;
    assert_eq!(res.status, 200);

    // The comment went with the post.
    let res = app
        .client
        .delete_with_auth(
            &app.url(&format!("/api/comments/{}", comment_id)),
            &staff_token,
        )
        .await;
    assert_eq!(res.status, 404);
}
