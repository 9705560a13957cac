#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use backoffice_api::{
    build_router,
    config::AppConfig,
    db,
    events::{self, EventSender},
    rate_limiter::RateLimitLayer,
    storage::{ImageStore, InMemoryImageStore},
    AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "root";
pub const ADMIN_PASSWORD: &str = "B00tstrap!pass";

/// The real router over a migrated SQLite file in a temporary directory.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub images: Arc<InMemoryImageStore>,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Fresh database; `tweak` adjusts the configuration before the router is built.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let mut cfg = AppConfig::new(
            url,
            "integration-test-signing-key-0123456789abcdef".to_string(),
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        tweak(&mut cfg);

        let pool = db::establish_connection(&cfg.database_url)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let images = Arc::new(InMemoryImageStore::new());
        let store: Arc<dyn ImageStore> = images.clone();
        let state = AppState::new(Arc::new(pool), cfg.clone(), event_sender, store);

        state
            .services
            .users
            .ensure_master_admin(ADMIN_USERNAME, "root@example.com", ADMIN_PASSWORD)
            .await
            .expect("bootstrap master admin");

        let router = build_router(state.clone(), RateLimitLayer::from_app_config(&cfg));
        let mut app = Self {
            router,
            state,
            images,
            token: String::new(),
            _event_task: event_task,
            _dir: dir,
        };
        app.token = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
        app
    }

    /// Bearer token of the bootstrap master admin.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub async fn login(&self, login: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/auth/login",
                Some(json!({ "login": login, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), 200, "login failed for {login}");
        let body = response_json(response).await;
        body["token"].as_str().expect("token in login response").to_string()
    }

    /// Creates an account with a builtin role and returns its token.
    pub async fn token_for_role(&self, username: &str, role: &str) -> String {
        let response = self
            .authed(
                Method::POST,
                "/api/users",
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": ADMIN_PASSWORD,
                    "role": role,
                })),
            )
            .await;
        assert_eq!(response.status(), 201, "creating {username}");
        self.login(username, ADMIN_PASSWORD).await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Request as the master admin.
    pub async fn authed(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// POSTs `body` and returns the created resource, asserting 201.
    pub async fn create(&self, uri: &str, body: Value) -> Value {
        let response = self.authed(Method::POST, uri, Some(body)).await;
        let status = response.status();
        let payload = response_json(response).await;
        assert_eq!(status, 201, "POST {uri} failed: {payload}");
        payload
    }

    /// Unit, top-level category and a 15% tax, enough to create items.
    pub async fn seed_catalog(&self) -> Catalog {
        let unit = self
            .create("/api/units", json!({ "name": "Kilogram", "symbol": "kg", "baseUnit": "kg" }))
            .await;
        let category = self
            .create("/api/categories", json!({ "nameEn": "Produce" }))
            .await;
        let tax = self
            .create("/api/taxes", json!({ "name": "VAT 15", "rate": "15" }))
            .await;
        Catalog {
            unit_id: id_of(&unit),
            category_id: id_of(&category),
            tax_id: id_of(&tax),
        }
    }

    pub async fn create_item(&self, catalog: &Catalog, name: &str) -> Value {
        self.create(
            "/api/items",
            json!({
                "nameEn": name,
                "baseUnit": "kg",
                "unitId": catalog.unit_id,
                "categoryId": catalog.category_id,
                "subCategoryId": catalog.category_id,
                "taxId": catalog.tax_id,
                "unitPrice": "10.00",
                "basePackaging": { "amount": "1", "unit": "kg" },
                "packPackaging": { "amount": "1", "unit": "kg", "packSize": "12", "packUnit": "box" }
            }),
        )
        .await
    }

    pub async fn create_supplier(&self, name: &str) -> Value {
        self.create("/api/suppliers", json!({ "name": name })).await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub struct Catalog {
    pub unit_id: String,
    pub category_id: String,
    pub tax_id: String,
}

pub fn id_of(value: &Value) -> String {
    value["_id"].as_str().expect("_id in payload").to_string()
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}
