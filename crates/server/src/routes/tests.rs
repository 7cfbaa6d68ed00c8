use std::{net::IpAddr, sync::Arc};

use assistant::{LLMConfig, ProviderError, brain::testing::ScriptedProvider};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use db::DBService;
use deployment::AppConfig;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::app;
use crate::DeploymentImpl;

struct TestApp {
    router: Router,
    provider: Arc<ScriptedProvider>,
}

async fn test_app() -> TestApp {
    let db = DBService::new_in_memory().await.unwrap();
    let provider = Arc::new(ScriptedProvider::new());
    let config = AppConfig {
        host: IpAddr::from([127, 0, 0, 1]),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        session_ttl_days: 30,
        llm: LLMConfig::default(),
    };
    let deployment = DeploymentImpl::from_parts(config, db, provider.client());
    TestApp {
        router: app(deployment),
        provider,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/register",
                None,
                Some(json!({"name": "Sam", "email": email, "password": "correct horse"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;
    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = test_app().await;
    let (status, body) = app.send(Method::GET, "/api/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"success": false, "message": "Unauthenticated."}));

    let (status, _) = app
        .send(Method::GET, "/api/user", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_logout() {
    let app = test_app().await;
    let token = app.register("sam@example.com").await;

    let (status, body) = app.send(Method::GET, "/api/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "sam@example.com");
    assert!(body["data"].get("password_hash").is_none());

    let (status, _) = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({"name": "Dup", "email": "SAM@example.com", "password": "correct horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"email": "sam@example.com", "password": "wrong password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"email": "sam@example.com", "password": "correct horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = app.send(Method::POST, "/api/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, "/api/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.send(Method::GET, "/api/user", Some(&second), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn task_crud_is_owner_scoped() {
    let app = test_app().await;
    let owner = app.register("owner@example.com").await;
    let other = app.register("other@example.com").await;

    let (status, body) = app
        .send(Method::POST, "/api/tasks", Some(&owner), Some(json!({"description": "x"})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "The title field is required.");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/tasks",
            Some(&owner),
            Some(json!({"title": "Write report", "priority": "high", "estimated_hours": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["priority"], "high");

    let uri = format!("/api/tasks/{}", id);
    let (status, _) = app.send(Method::GET, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(Method::PATCH, &uri, Some(&owner), Some(json!({"is_completed": true})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_completed"], true);
    assert_eq!(body["data"]["title"], "Write report");

    let (_, body) = app
        .send(Method::GET, "/api/tasks?status=completed", Some(&owner), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = app
        .send(Method::GET, "/api/tasks?status=pending", Some(&owner), None)
        .await;
    assert!(body["data"].as_array().unwrap().is_empty());
    let (_, body) = app.send(Method::GET, "/api/tasks", Some(&other), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = app.send(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted successfully");
}

#[tokio::test]
async fn stats_count_pending_work() {
    let app = test_app().await;
    let token = app.register("sam@example.com").await;
    let yesterday = (Utc::now() - Duration::days(1)).to_rfc3339();

    for body in [
        json!({"title": "Late", "due_date": yesterday, "priority": "high", "estimated_hours": 2}),
        json!({"title": "Later", "estimated_hours": 5}),
    ] {
        let (status, _) = app
            .send(Method::POST, "/api/tasks", Some(&token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .send(Method::GET, "/api/tasks/stats", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["pending"], 2);
    assert_eq!(body["data"]["overdue"], 1);
    assert_eq!(body["data"]["high_priority"], 1);
    assert_eq!(body["data"]["total_hours_estimated"], 7);
}

#[tokio::test]
async fn categories_attach_to_owned_tasks_only() {
    let app = test_app().await;
    let owner = app.register("owner@example.com").await;
    let other = app.register("other@example.com").await;

    let (_, task) = app
        .send(Method::POST, "/api/tasks", Some(&owner), Some(json!({"title": "Gym"})))
        .await;
    let task_id = task["data"]["id"].as_i64().unwrap();

    let (status, body) = app
        .send(Method::POST, "/api/categories", Some(&owner), Some(json!({"name": "Health"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["color"], "#007bff");
    let mine = body["data"]["id"].as_i64().unwrap();

    let (_, body) = app
        .send(Method::POST, "/api/categories", Some(&other), Some(json!({"name": "Work"})))
        .await;
    let theirs = body["data"]["id"].as_i64().unwrap();

    let uri = format!("/api/tasks/{}/categories", task_id);
    let (status, _) = app
        .send(Method::POST, &uri, Some(&owner), Some(json!({"category_ids": [mine, theirs]})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .send(Method::POST, &uri, Some(&owner), Some(json!({"category_ids": [mine]})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Gym");
    assert_eq!(body["data"]["categories"][0]["name"], "Health");

    let (_, body) = app.send(Method::GET, "/api/categories", Some(&owner), None).await;
    assert_eq!(body["data"][0]["tasks_count"], 1);

    let (status, _) = app
        .send(Method::POST, &uri, Some(&other), Some(json!({"category_ids": [theirs]})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_passes_plain_text_through() {
    let app = test_app().await;
    let token = app.register("sam@example.com").await;
    app.provider.push_reply("Sure, I can help!");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/ai/chat",
            Some(&token),
            Some(json!({"message": "hello", "conversation_history": [{"role": "user", "content": "hi"}]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Sure, I can help!");
    assert_eq!(body["data"]["actions_taken"], json!([]));
}

#[tokio::test]
async fn chat_upstream_failure_is_a_500() {
    let app = test_app().await;
    let token = app.register("sam@example.com").await;
    app.provider.push_failure(ProviderError::ApiError {
        status: 500,
        message: "upstream exploded".to_string(),
    });

    let (status, body) = app
        .send(Method::POST, "/api/ai/chat", Some(&token), Some(json!({"message": "hello"})))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "AI request failed: API error (500): upstream exploded"
    );
}

#[tokio::test]
async fn analyze_task_falls_back_when_upstream_fails() {
    let app = test_app().await;
    let token = app.register("sam@example.com").await;
    app.provider.push_failure(ProviderError::RequestFailed("offline".to_string()));
    let tomorrow = (Utc::now() + Duration::days(1))
        .date_naive()
        .format("%Y-%m-%d")
        .to_string();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/ai/analyze-task",
            Some(&token),
            Some(json!({"title": "File taxes", "due_date": tomorrow, "description": "ignored"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["priority"], "high");
    assert_eq!(body["data"]["estimated_hours"], 1);
}

#[tokio::test]
async fn documents_create_tasks() {
    let app = test_app().await;
    let token = app.register("sam@example.com").await;
    app.provider.push_reply(
        r#"{"summary":"Notes","tasks":[{"title":"Email Dana","priority":"low"}]}"#,
    );

    let (status, body) = app
        .send(
            Method::POST,
            "/api/documents/analyze",
            Some(&token),
            Some(json!({"text": "Remember to email Dana."})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"], "Notes");
    assert_eq!(body["data"]["tasks"][0]["priority"], "low");

    let (_, body) = app.send(Method::GET, "/api/tasks", Some(&token), None).await;
    assert_eq!(body["data"][0]["title"], "Email Dana");
}

#[tokio::test]
async fn pipeline_without_final_tasks_creates_nothing() {
    let app = test_app().await;
    let token = app.register("sam@example.com").await;
    app.provider.push_reply(r#"{"analysis":"a"}"#);
    app.provider.push_reply(r#"{"execution_strategy":"b"}"#);
    app.provider.push_reply(r#"{"quality_score":6}"#);
    app.provider.push_reply(r#"{"executive_summary":"no list"}"#);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/multi-agent/process",
            Some(&token),
            Some(json!({"goal": "Learn Rust"})),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["message"],
        "Multi-agent processing failed: Coordinator did not return valid final_tasks array"
    );

    let (_, body) = app.send(Method::GET, "/api/tasks", Some(&token), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn pipeline_reports_created_tasks() {
    let app = test_app().await;
    let token = app.register("sam@example.com").await;
    app.provider.push_reply(r#"{"analysis":"a"}"#);
    app.provider.push_reply(r#"{"execution_strategy":"b"}"#);
    app.provider.push_reply(r#"{"quality_score":6}"#);
    app.provider.push_reply(
        r#"{"executive_summary":"go","final_tasks":[{"title":"Read the book","phase":"Phase 2"}]}"#,
    );

    let (status, body) = app
        .send(
            Method::POST,
            "/api/multi-agent/process",
            Some(&token),
            Some(json!({"goal": "Learn Rust", "context": "evenings only"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["goal"], "Learn Rust");
    assert_eq!(body["data"]["tasks_created"][0]["phase"], "Phase 2");
    assert_eq!(body["data"]["tasks_created"][0]["priority"], "medium");
    assert_eq!(body["data"]["agent_conversation"].as_array().unwrap().len(), 4);
}
