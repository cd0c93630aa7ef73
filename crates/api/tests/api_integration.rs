//! API integration tests.
//!
//! These drive the full router, middleware included, over in-memory stores.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use comment_api::{AppState, RateLimiterState, app};
use comment_core::{BadWordDetector, NotificationDispatcher};
use comment_db::test_utils::{
    MemoryCommentStore, MemoryReactionStore, MemoryReportStore, MemorySettingsStore,
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_app_with_limit(limit: u32) -> Router {
    let detector = BadWordDetector::new(&["spam".to_string()], true).unwrap();
    let state = AppState::new(
        Arc::new(MemoryCommentStore::new()),
        Arc::new(MemorySettingsStore::new()),
        Arc::new(MemoryReactionStore::new()),
        Arc::new(MemoryReportStore::new()),
        detector,
        NotificationDispatcher::disabled(),
    );
    app(state, RateLimiterState::per_minute(limit))
}

fn test_app() -> Router {
    test_app_with_limit(100)
}

/// Request builder with optional caller headers.
struct Call {
    method: &'static str,
    uri: String,
    user: Option<&'static str>,
    scopes: Option<&'static str>,
    tenant: Option<&'static str>,
    body: Option<Value>,
}

impl Call {
    fn new(method: &'static str, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            user: None,
            scopes: None,
            tenant: None,
            body: None,
        }
    }

    fn user(mut self, id: &'static str) -> Self {
        self.user = Some(id);
        self
    }

    fn admin(mut self) -> Self {
        self.user = Some("admin-1");
        self.scopes = Some("admin");
        self
    }

    fn tenant(mut self, tenant: &'static str) -> Self {
        self.tenant = Some(tenant);
        self
    }

    fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    async fn send(self, app: &Router) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(self.method).uri(&self.uri);
        if let Some(user) = self.user {
            builder = builder.header("x-user-id", user);
        }
        if let Some(scopes) = self.scopes {
            builder = builder.header("x-user-scopes", scopes);
        }
        if let Some(tenant) = self.tenant {
            builder = builder.header("x-tenant-id", tenant);
        }
        let request = match self.body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

/// Turn off approval for articles so new comments are visible immediately.
async fn open_articles(app: &Router) {
    let (status, _) = Call::new("PUT", "/api/v1/admin/settings/article")
        .admin()
        .json(json!({ "requireApproval": false }))
        .send(app)
        .await;
    assert_eq!(status, StatusCode::OK);
}

async fn post_comment(app: &Router, user: &'static str, content: &str) -> Value {
    let (status, body) = Call::new("POST", "/api/v1/comments")
        .user(user)
        .json(json!({
            "resourceType": "article",
            "resourceId": "a-1",
            "content": content,
        }))
        .send(app)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn test_health_probes() {
    let app = test_app();

    let (status, body) = Call::new("GET", "/health").send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["database"], "healthy");

    let (status, body) = Call::new("GET", "/ready").send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);

    let (status, _) = Call::new("GET", "/live").send(&app).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_requires_caller() {
    let app = test_app();

    let (status, body) = Call::new("POST", "/api/v1/comments")
        .json(json!({ "resourceType": "article", "resourceId": "a-1", "content": "hi" }))
        .send(&app)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_create_defaults_to_pending() {
    let app = test_app();

    let comment = post_comment(&app, "alice", "First!").await;
    assert_eq!(comment["status"], "pending");
    assert_eq!(comment["authorId"], "alice");
    assert_eq!(comment["tenantId"], "default");

    // Pending comments are hidden from public listings
    let (status, body) = Call::new("GET", "/api/v1/comments?resource_type=article&resource_id=a-1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);

    // and show up in the moderation queue
    let (status, body) = Call::new("GET", "/api/v1/admin/comments/pending")
        .admin()
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn test_moderation_flow() {
    let app = test_app();
    let comment = post_comment(&app, "alice", "Looks good").await;
    let id = comment["id"].as_str().unwrap();

    let (status, _) = Call::new("POST", format!("/api/v1/admin/comments/{id}/moderate"))
        .user("bob")
        .json(json!({ "status": "approved" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = Call::new("POST", format!("/api/v1/admin/comments/{id}/moderate"))
        .admin()
        .json(json!({ "status": "approved" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["moderatedBy"], "admin-1");

    let (_, body) = Call::new("GET", "/api/v1/comments?resource_type=article&resource_id=a-1")
        .send(&app)
        .await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["comments"][0]["id"], id);
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let app = test_app();
    open_articles(&app).await;
    post_comment(&app, "alice", "Default tenant").await;

    let (_, body) = Call::new("GET", "/api/v1/comments?resource_type=article&resource_id=a-1")
        .tenant("acme")
        .send(&app)
        .await;
    assert_eq!(body["data"]["total"], 0);

    let (_, body) = Call::new(
        "GET",
        "/api/v1/comments?resource_type=article&resource_id=a-1&tenant_id=default",
    )
    .send(&app)
    .await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn test_edit_and_delete_ownership() {
    let app = test_app();
    open_articles(&app).await;
    let comment = post_comment(&app, "alice", "Original").await;
    let id = comment["id"].as_str().unwrap();

    let (status, body) = Call::new("PUT", format!("/api/v1/comments/{id}"))
        .user("mallory")
        .json(json!({ "content": "Hijacked" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, body) = Call::new("PUT", format!("/api/v1/comments/{id}"))
        .user("alice")
        .json(json!({ "content": "Edited" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "Edited");
    assert_eq!(body["data"]["isEdited"], true);

    let (status, _) = Call::new("DELETE", format!("/api/v1/comments/{id}"))
        .user("alice")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = Call::new("GET", format!("/api/v1/comments/{id}"))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "COMMENT_NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_id_is_bad_request() {
    let app = test_app();

    let (status, body) = Call::new("GET", "/api/v1/comments/not-a-ulid")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_replies_and_stats() {
    let app = test_app();
    open_articles(&app).await;
    let root = post_comment(&app, "alice", "Root").await;
    let root_id = root["id"].as_str().unwrap();

    let (status, body) = Call::new("POST", "/api/v1/comments")
        .user("bob")
        .json(json!({
            "resourceType": "article",
            "resourceId": "a-1",
            "parentId": root_id,
            "content": "Reply",
        }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["depth"], 1);

    let (_, body) = Call::new("GET", format!("/api/v1/comments/{root_id}/replies"))
        .send(&app)
        .await;
    assert_eq!(body["data"]["total"], 1);

    let (_, body) = Call::new("GET", format!("/api/v1/comments/{root_id}"))
        .send(&app)
        .await;
    assert_eq!(body["data"]["replyCount"], 1);

    let (status, body) = Call::new("GET", "/api/v1/comments/stats?resource_type=article&resource_id=a-1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalComments"], 2);
    assert_eq!(body["data"]["approvedCount"], 2);

    let (status, _) = Call::new("GET", "/api/v1/comments/stats?resource_type=article")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_words_force_pending() {
    let app = test_app();
    open_articles(&app).await;

    let comment = post_comment(&app, "alice", "Buy SPAM now").await;
    assert_eq!(comment["status"], "pending");
    assert_eq!(comment["flaggedWords"], json!(["SPAM"]));
}

#[tokio::test]
async fn test_reactions() {
    let app = test_app();
    open_articles(&app).await;
    let comment = post_comment(&app, "alice", "React to me").await;
    let id = comment["id"].as_str().unwrap();

    let (status, body) = Call::new("POST", format!("/api/v1/comments/{id}/reactions"))
        .user("bob")
        .json(json!({ "type": "love" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = Call::new("POST", format!("/api/v1/comments/{id}/reactions"))
        .user("bob")
        .json(json!({ "type": "shrug" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, body) = Call::new("GET", format!("/api/v1/comments/{id}/reactions/me"))
        .user("bob")
        .send(&app)
        .await;
    assert_eq!(body["data"]["reaction"], "love");

    let (_, body) = Call::new("POST", "/api/v1/comments/reactions/me")
        .user("bob")
        .json(json!({ "commentIds": [id] }))
        .send(&app)
        .await;
    assert_eq!(body["data"][id], "love");

    let (status, _) = Call::new("DELETE", format!("/api/v1/comments/{id}/reactions"))
        .user("bob")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = Call::new("GET", format!("/api/v1/comments/{id}/reactions/me"))
        .user("bob")
        .send(&app)
        .await;
    assert_eq!(body["data"]["reaction"], Value::Null);
}

#[tokio::test]
async fn test_duplicate_report_conflicts() {
    let app = test_app();
    open_articles(&app).await;
    let comment = post_comment(&app, "alice", "Questionable").await;
    let id = comment["id"].as_str().unwrap();

    let report = json!({ "reason": "spam", "description": "Looks automated" });
    let (status, _) = Call::new("POST", format!("/api/v1/comments/{id}/report"))
        .user("bob")
        .json(report.clone())
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = Call::new("POST", format!("/api/v1/comments/{id}/report"))
        .user("bob")
        .json(report)
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_REPORTED");

    let (_, body) = Call::new("GET", "/api/v1/admin/reports/pending")
        .admin()
        .send(&app)
        .await;
    assert_eq!(body["data"]["total"], 1);
    let report_id = body["data"]["reports"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = Call::new("POST", format!("/api/v1/admin/reports/{report_id}/review"))
        .admin()
        .json(json!({ "status": "dismissed" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "dismissed");
}

#[tokio::test]
async fn test_policy_violation_is_forbidden() {
    let app = test_app();
    let (status, _) = Call::new("PUT", "/api/v1/admin/settings/article")
        .admin()
        .json(json!({ "commentsEnabled": false }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = Call::new("POST", "/api/v1/comments")
        .user("alice")
        .json(json!({ "resourceType": "article", "resourceId": "a-1", "content": "Hello" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "COMMENTS_DISABLED");
}

#[tokio::test]
async fn test_create_is_rate_limited() {
    let app = test_app_with_limit(2);

    for _ in 0..2 {
        post_comment(&app, "alice", "Hello").await;
    }

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/comments")
        .header("x-user-id", "alice")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "resourceType": "article", "resourceId": "a-1", "content": "Again" })
                .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // Other callers and read endpoints are unaffected
    post_comment(&app, "bob", "Hi").await;
    for _ in 0..3 {
        let (status, _) = Call::new("GET", "/api/v1/comments?resource_type=article&resource_id=a-1")
            .user("alice")
            .send(&app)
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_bulk_moderate_and_pin() {
    let app = test_app();
    let first = post_comment(&app, "alice", "One").await;
    let second = post_comment(&app, "bob", "Two").await;
    let first_id = first["id"].as_str().unwrap();

    let (status, body) = Call::new("POST", "/api/v1/admin/comments/bulk-moderate")
        .admin()
        .json(json!({
            "commentIds": [first_id, second["id"], "01J00000000000000000000000"],
            "status": "approved",
        }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["successCount"], 2);
    assert_eq!(body["data"]["failedCount"], 1);

    let (status, body) = Call::new("POST", format!("/api/v1/admin/comments/{first_id}/pin"))
        .admin()
        .json(json!({ "isPinned": true }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isPinned"], true);

    let (status, _) = Call::new("DELETE", format!("/api/v1/admin/comments/{first_id}"))
        .admin()
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = Call::new("GET", format!("/api/v1/comments/{first_id}"))
        .admin()
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_listing() {
    let app = test_app();
    open_articles(&app).await;

    let (status, body) = Call::new("GET", "/api/v1/admin/settings/article")
        .admin()
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["requireApproval"], false);

    let (_, body) = Call::new("GET", "/api/v1/admin/settings").admin().send(&app).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = Call::new("GET", "/api/v1/admin/settings")
        .admin()
        .tenant("acme")
        .send(&app)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}
