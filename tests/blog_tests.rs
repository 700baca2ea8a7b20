use byline::TestApp;

async fn create_post(
    app: &TestApp,
    token: &str,
    title: &str,
    status: &str,
) -> serde_json::Value {
    let body = serde_json::json!({
        "title": title,
        "content": format!("Content of {}", title),
        "excerpt": format!("Excerpt of {}", title),
        "status": status
    });
    let res = app
        .client
        .post_with_auth(&app.url("/api/posts"), token, &body.to_string())
        .await;
    assert_eq!(res.status, 200, "create failed: {}", res.body);
    res.data()
}

#[tokio::test]
async fn test_create_post_requires_author_role() {
    let app = TestApp::new().await;

    let (reader_token, _) = app
        .create_user("reader@example.com", "reader", "password123")
        .await;

    let body = serde_json::json!({
        "title": "Nope",
        "content": "body"
    });
    let res = app
        .client
        .post_with_auth(&app.url("/api/posts"), &reader_token, &body.to_string())
        .await;

    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn test_create_post_requires_auth() {
    let app = TestApp::new().await;

    let body = serde_json::json!({ "title": "Anon", "content": "body" });
    let res = app
        .client
        .post(&app.url("/api/posts"), &body.to_string())
        .await;

    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn test_slug_derivation_and_dedup() {
    let app = TestApp::new().await;
    let (token, _) = app
        .create_author("author@example.com", "author", "password123")
        .await;

    let first = create_post(&app, &token, "My First Post!", "published").await;
    assert_eq!(first["slug"], "my-first-post");

    // Same title again: numeric suffixes, never a collision.
    let second = create_post(&app, &token, "My First Post!", "published").await;
    assert_eq!(second["slug"], "my-first-post-1");

    let third = create_post(&app, &token, "My First Post!", "published").await;
    assert_eq!(third["slug"], "my-first-post-2");
}

#[tokio::test]
async fn test_slug_stable_when_title_unchanged() {
    let app = TestApp::new().await;
    let (token, _) = app
        .create_author("stable@example.com", "stable", "password123")
        .await;

    let post = create_post(&app, &token, "Stable Title", "published").await;
    assert_eq!(post["slug"], "stable-title");

    // Re-saving with the same title must not produce stable-title-1.
    let body = serde_json::json!({ "title": "Stable Title", "content": "edited" });
    let res = app
        .client
        .put_with_auth(
            &app.url("/api/posts/stable-title"),
            &token,
            &body.to_string(),
        )
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.data()["slug"], "stable-title");
    assert_eq!(res.data()["content"], "edited");
}

#[tokio::test]
async fn test_slug_rederived_on_title_change() {
    let app = TestApp::new().await;
    let (token, _) = app
        .create_author("rename@example.com", "rename", "password123")
        .await;

    create_post(&app, &token, "Old Name", "published").await;

    let body = serde_json::json!({ "title": "New Name" });
    let res = app
        .client
        .put_with_auth(&app.url("/api/posts/old-name"), &token, &body.to_string())
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.data()["slug"], "new-name");
}

#[tokio::test]
async fn test_draft_hidden_from_public() {
    let app = TestApp::new().await;
    let (token, _) = app
        .create_author("draft@example.com", "draftauthor", "password123")
        .await;

    create_post(&app, &token, "Secret Draft", "draft").await;
    create_post(&app, &token, "Public Post", "published").await;

    // Listing shows only the published post.
    let res = app.client.get(&app.url("/api/posts")).await;
    assert_eq!(res.status, 200);
    let items = res.data()["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["slug"], "public-post");

    // Anonymous detail access reads as not-found.
    let res = app.client.get(&app.url("/api/posts/secret-draft")).await;
    assert_eq!(res.status, 404);

    // The author still sees it.
    let res = app
        .client
        .get_with_auth(&app.url("/api/posts/secret-draft"), &token)
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["status"], "draft");
}

#[tokio::test]
async fn test_draft_visible_to_staff() {
    let app = TestApp::new().await;
    let (author_token, _) = app
        .create_author("writer@example.com", "writer", "password123")
        .await;
    let (staff_token, _) = app
        .create_admin("staff@example.com", "staff", "password123")
        .await;

    create_post(&app, &author_token, "Hidden", "draft").await;

    let res = app
        .client
        .get_with_auth(&app.url("/api/posts/hidden"), &staff_token)
        .await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn test_view_counter_increments() {
    let app = TestApp::new().await;
    let (token, _) = app
        .create_author("views@example.com", "viewer", "password123")
        .await;

    create_post(&app, &token, "Counted", "published").await;

    for expected in 1..=3 {
        let res = app.client.get(&app.url("/api/posts/counted")).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["views"], expected);
    }
}

#[tokio::test]
async fn test_draft_views_not_counted() {
    let app = TestApp::new().await;
    let (token, _) = app
        .create_author("quiet@example.com", "quiet", "password123")
        .await;

    create_post(&app, &token, "Quiet Draft", "draft").await;

    for _ in 0..2 {
        let res = app
            .client
            .get_with_auth(&app.url("/api/posts/quiet-draft"), &token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["views"], 0);
    }
}

#[tokio::test]
async fn test_pagination() {
    let app = TestApp::new().await;
    let (token, _) = app
        .create_author("pages@example.com", "pager", "password123")
        .await;

    for i in 0..10 {
        create_post(&app, &token, &format!("Post number {}", i), "published").await;
    }

    let res = app.client.get(&app.url("/api/posts")).await;
    let data = res.data();
    assert_eq!(data["items"].as_array().unwrap().len(), 9);
    assert_eq!(data["page"], 1);
    assert_eq!(data["total_items"], 10);
    assert_eq!(data["total_pages"], 2);

    let res = app.client.get(&app.url("/api/posts?page=2")).await;
    assert_eq!(res.data()["items"].as_array().unwrap().len(), 1);

    // Out-of-range pages clamp to the last page instead of erroring.
    let res = app.client.get(&app.url("/api/posts?page=99")).await;
    let data = res.data();
    assert_eq!(data["page"], 2);
    assert_eq!(data["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_search() {
    let app = TestApp::new().await;
    let (token, _) = app
        .create_author("search@example.com", "searcher", "password123")
        .await;

    create_post(&app, &token, "Rust ownership explained", "published").await;
    create_post(&app, &token, "Gardening for beginners", "published").await;

    let res = app.client.get(&app.url("/api/posts?query=RUST")).await;
    let items = res.data()["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["slug"], "rust-ownership-explained");

    // Matches content as well as titles.
    let res = app.client.get(&app.url("/api/posts?query=content+of+gardening")).await;
    let items = res.data()["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["slug"], "gardening-for-beginners");

    let res = app.client.get(&app.url("/api/posts?query=zzzz")).await;
    assert_eq!(res.data()["items"].as_array().unwrap().len(), 0);
    assert_eq!(res.data()["total_pages"], 1);
}

#[tokio::test]
async fn test_featured_ordered_by_views() {
    let app = TestApp::new().await;
    let (token, _) = app
        .create_author("feat@example.com", "featured", "password123")
        .await;

    for title in ["Low", "Mid", "High", "Zero"] {
        create_post(&app, &token, title, "published").await;
    }

    // Drive the view counters apart.
    for _ in 0..3 {
        app.client.get(&app.url("/api/posts/high")).await;
    }
    for _ in 0..2 {
        app.client.get(&app.url("/api/posts/mid")).await;
    }
    app.client.get(&app.url("/api/posts/low")).await;

    let res = app.client.get(&app.url("/api/posts/featured")).await;
    assert_eq!(res.status, 200);
    let data = res.data();
    let slugs: Vec<&str> = data
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["high", "mid", "low"]);
}

#[tokio::test]
async fn test_update_post_only_by_owner_or_staff() {
    let app = TestApp::new().await;
    let (owner_token, _) = app
        .create_author("owner@example.com", "owner", "password123")
        .await;
    let (other_token, _) = app
        .create_author("other@example.com", "other", "password123")
        .await;
    let (staff_token, _) = app
        .create_admin("mod@example.com", "moderator", "password123")
        .await;

    create_post(&app, &owner_token, "Mine", "published").await;

    let body = serde_json::json!({ "content": "hijacked" });
    let res = app
        .client
        .put_with_auth(&app.url("/api/posts/mine"), &other_token, &body.to_string())
        .await;
    assert_eq!(res.status, 403);

    let body = serde_json::json!({ "content": "moderated" });
    let res = app
        .client
        .put_with_auth(&app.url("/api/posts/mine"), &staff_token, &body.to_string())
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["content"], "moderated");
    // The author reference never changes.
    assert_eq!(res.data()["author"]["username"], "owner");
}

#[tokio::test]
async fn test_delete_post() {
    let app = TestApp::new().await;
    let (token, _) = app
        .create_author("gone@example.com", "gone", "password123")
        .await;

    create_post(&app, &token, "Doomed", "published").await;

    let res = app
        .client
        .delete_with_auth(&app.url("/api/posts/doomed"), &token)
        .await;
    assert_eq!(res.status, 200);

    let res = app.client.get(&app.url("/api/posts/doomed")).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_category_lifecycle() {
    let app = TestApp::new().await;
    let (staff_token, _) = app
        .create_admin("catadmin@example.com", "catadmin", "password123")
        .await;
    let (author_token, _) = app
        .create_author("catauthor@example.com", "catauthor", "password123")
        .await;

    // Non-staff cannot create categories.
    let body = serde_json::json!({ "name": "Rust" });
    let res = app
        .client
        .post_with_auth(&app.url("/api/categories"), &author_token, &body.to_string())
        .await;
    assert_eq!(res.status, 403);

    let res = app
        .client
        .post_with_auth(&app.url("/api/categories"), &staff_token, &body.to_string())
        .await;
    assert_eq!(res.status, 200);
    let category = res.data();
    assert_eq!(category["slug"], "rust");
    let category_id = category["id"].as_i64().unwrap();

    // Duplicate name conflicts.
    let res = app
        .client
        .post_with_auth(&app.url("/api/categories"), &staff_token, &body.to_string())
        .await;
    assert_eq!(res.status, 409);

    // Attach a post, then check the listing counts it.
    let body = serde_json::json!({
        "title": "Categorised",
        "content": "body",
        "status": "published",
        "category_id": category_id
    });
    let res = app
        .client
        .post_with_auth(&app.url("/api/posts"), &author_token, &body.to_string())
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["category"]["slug"], "rust");

    let res = app.client.get(&app.url("/api/categories")).await;
    let cats = res.data();
    assert_eq!(cats[0]["slug"], "rust");
    assert_eq!(cats[0]["post_count"], 1);

    let res = app.client.get(&app.url("/api/categories/rust/posts")).await;
    assert_eq!(res.data()["items"].as_array().unwrap().len(), 1);

    // Deleting the category detaches the post rather than deleting it.
    let res = app
        .client
        .delete_with_auth(&app.url("/api/categories/rust"), &staff_token)
        .await;
    assert_eq!(res.status, 200);

    let res = app.client.get(&app.url("/api/posts/categorised")).await;
    assert_eq!(res.status, 200);
    assert!(res.data()["category"].is_null());
}

#[tokio::test]
async fn test_tags_attach_and_list() {
    let app = TestApp::new().await;
    let (staff_token, _) = app
        .create_admin("tagadmin@example.com", "tagadmin", "password123")
        .await;
    let (author_token, _) = app
        .create_author("tagauthor@example.com", "tagauthor", "password123")
        .await;

    let mut tag_ids = Vec::new();
    for name in ["web", "backend"] {
        let body = serde_json::json!({ "name": name });
        let res = app
            .client
            .post_with_auth(&app.url("/api/tags"), &staff_token, &body.to_string())
            .await;
        assert_eq!(res.status, 200);
        tag_ids.push(res.data()["id"].as_i64().unwrap());
    }

    let body = serde_json::json!({
        "title": "Tagged Post",
        "content": "body",
        "status": "published",
        "tags": tag_ids
    });
    let res = app
        .client
        .post_with_auth(&app.url("/api/posts"), &author_token, &body.to_string())
        .await;
    assert_eq!(res.status, 200);
    // Tags come back alphabetical.
    let data = res.data();
    let names: Vec<&str> = data["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["backend", "web"]);

    let res = app.client.get(&app.url("/api/tags/web/posts")).await;
    let items = res.data()["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["slug"], "tagged-post");

    // Replacing the tag set on update.
    let body = serde_json::json!({ "tags": [tag_ids[0]] });
    let res = app
        .client
        .put_with_auth(&app.url("/api/posts/tagged-post"), &author_token, &body.to_string())
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["tags"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_post_rejects_unknown_refs() {
    let app = TestApp::new().await;
    let (token, _) = app
        .create_author("refs@example.com", "refs", "password123")
        .await;

    let body = serde_json::json!({
        "title": "Bad Category",
        "content": "body",
        "category_id": 9999
    });
    let res = app
        .client
        .post_with_auth(&app.url("/api/posts"), &token, &body.to_string())
        .await;
    assert_eq!(res.status, 422);

    let body = serde_json::json!({
        "title": "Bad Tags",
        "content": "body",
        "tags": [12345]
    });
    let res = app
        .client
        .post_with_auth(&app.url("/api/posts"), &token, &body.to_string())
        .await;
    assert_eq!(res.status, 422);
}

#[tokio::test]
async fn test_related_posts_share_category() {
    let app = TestApp::new().await;
    let (staff_token, _) = app
        .create_admin("rel@example.com", "reladmin", "password123")
        .await;
    let (token, _) = app
        .create_author("relauthor@example.com", "relauthor", "password123")
        .await;

    let body = serde_json::json!({ "name": "Shared" });
    let res = app
        .client
        .post_with_auth(&app.url("/api/categories"), &staff_token, &body.to_string())
        .await;
    let category_id = res.data()["id"].as_i64().unwrap();

    for title in ["One", "Two", "Three"] {
        let body = serde_json::json!({
            "title": title,
            "content": "body",
            "status": "published",
            "category_id": category_id
        });
        let res = app
            .client
            .post_with_auth(&app.url("/api/posts"), &token, &body.to_string())
            .await;
        assert_eq!(res.status, 200);
    }

    let res = app.client.get(&app.url("/api/posts/one")).await;
    let related = res.data()["related_posts"].as_array().unwrap().clone();
    assert_eq!(related.len(), 2);
    assert!(related.iter().all(|p| p["slug"] != "one"));
}
