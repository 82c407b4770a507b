#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use marketplace_backend::config::AppConfig;
use marketplace_backend::entities::prelude::*;
use marketplace_backend::infrastructure::{database, seed};
use marketplace_backend::services::notify::{NotificationKind, Notifier};
use marketplace_backend::services::post_service::PostService;
use marketplace_backend::services::response_service::ResponseService;
use marketplace_backend::services::storage::StorageService;
use marketplace_backend::{AppState, create_app};
use sea_orm::{Database, DatabaseConnection, EntityTrait};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// In-memory stand-in for the S3 service; remembers every deleted key so
/// tests can assert on blob cleanup.
pub struct MockStorageService {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_store: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            deleted: Mutex::new(Vec::new()),
            fail_store: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn stored_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        let mut keys = self.deleted.lock().unwrap().clone();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn store(&self, key: &str, data: Vec<u8>) -> anyhow::Result<()> {
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("simulated store failure"));
        }
        self.files.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("simulated delete failure"));
        }
        self.files.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

/// Records every dispatched notification instead of sending email.
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(NotificationKind, String, String)>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn sent_to(&self) -> Vec<(NotificationKind, String)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(kind, recipient, _)| (*kind, recipient.clone()))
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        kind: NotificationKind,
        recipient: &str,
        subject: &str,
        _text: &str,
        _html: &str,
    ) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("simulated transport failure"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((kind, recipient.to_string(), subject.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub storage: Arc<MockStorageService>,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn setup() -> TestApp {
    let db: DatabaseConnection = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();
    seed::seed_initial_data(&db).await.unwrap();

    let storage = Arc::new(MockStorageService::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let post_service = Arc::new(PostService::new(db.clone(), storage.clone()));
    let response_service = Arc::new(ResponseService::new(db.clone(), notifier.clone()));

    let state = AppState {
        db,
        storage: storage.clone(),
        notifier: notifier.clone(),
        post_service,
        response_service,
        config: AppConfig::default(),
    };

    TestApp {
        app: create_app(state.clone()),
        state,
        storage,
        notifier,
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Registers a user through the API and returns (token, user_id).
pub async fn register_user(app: &Router, username: &str, email: Option<&str>) -> (String, String) {
    let req = Request::builder()
        .method("POST")
        .uri("/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "username": username,
                "password": "correct-horse-battery",
                "email": email,
            })
            .to_string(),
        ))
        .unwrap();

    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;

    (
        body["token"].as_str().unwrap().to_string(),
        body["user_id"].as_str().unwrap().to_string(),
    )
}

/// First seeded category id; enough for most tests.
pub async fn any_category_id(db: &DatabaseConnection) -> String {
    Categories::find()
        .one(db)
        .await
        .unwrap()
        .expect("seeded category")
        .id
}

const BOUNDARY: &str = "test-boundary-9f3c";

/// Minimal multipart/form-data body builder for post create/edit requests.
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(
        mut self,
        name: &str,
        filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Self {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        if let Some(ct) = content_type {
            self.body
                .extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        self.body.extend_from_slice(b"\r\n");
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn build(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (
            format!("multipart/form-data; boundary={BOUNDARY}"),
            self.body,
        )
    }
}

/// Convenience for the common "create a sell post" request.
pub async fn create_post_request(
    app: &Router,
    token: &str,
    category_id: &str,
    title: &str,
    price: i64,
    files: Vec<(&str, Option<&str>, Vec<u8>)>,
) -> Response<Body> {
    let mut builder = MultipartBuilder::new()
        .text("title", title)
        .text("content", "Fine goods, lightly used.")
        .text("price", &price.to_string())
        .text("post_type", "wts")
        .text("category_id", category_id);

    for (filename, content_type, data) in files {
        builder = builder.file("media", filename, content_type, &data);
    }

    let (content_type, body) = builder.build();

    let req = Request::builder()
        .method("POST")
        .uri("/posts")
        .header("Authorization", format!("Bearer {token}"))
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap();

    app.clone().oneshot(req).await.unwrap()
}

/// Bare JSON request with optional bearer token.
pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
