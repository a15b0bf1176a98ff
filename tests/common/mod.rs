//! Mock dist-traceroute master
//!
//! Axum server bound to an ephemeral port that speaks the master's `/api`
//! surface and records every request it receives.

#![allow(dead_code)]

use axum::extract::{Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use disttrace_console::{Config, ConsoleStore, Credentials, HistoryNavigator};

pub const TOKEN: &str = "T1";

/// List requests with this limit are answered late
pub const SLOW_LIMIT: &str = "1";

#[derive(Default)]
struct MockState {
    hits: Mutex<Vec<String>>,
    collections: Mutex<HashMap<String, Vec<Value>>>,
    traces: Mutex<Value>,
    last_put: Mutex<Option<Value>>,
    fail_next: Mutex<Option<StatusCode>>,
    revoked: Mutex<bool>,
    next_id: AtomicI64,
}

pub struct MockMaster {
    addr: String,
    state: Arc<MockState>,
}

impl MockMaster {
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            next_id: AtomicI64::new(7),
            traces: Mutex::new(Value::Null),
            ..Default::default()
        });

        let app = Router::new()
            .route("/api/auth", get(auth))
            .route("/api/status", get(status))
            .route("/api/traces", get(traces))
            .route("/api/graph", get(graph))
            .route("/api/{collection}", get(list).post(create).put(update))
            .route("/api/{collection}/{id}", delete(remove))
            .layer(middleware::from_fn_with_state(state.clone(), gate))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: format!("http://{addr}"),
            state,
        }
    }

    pub fn api_url(&self) -> String {
        format!("{}/api", self.addr)
    }

    pub fn seed(&self, collection: &str, items: Vec<Value>) {
        self.state
            .collections
            .lock()
            .insert(collection.to_string(), items);
    }

    pub fn seed_traces(&self, traces: Value) {
        *self.state.traces.lock() = traces;
    }

    /// Next request is answered with `status` and nothing else
    pub fn fail_next(&self, status: StatusCode) {
        *self.state.fail_next.lock() = Some(status);
    }

    /// Stop accepting the issued token
    pub fn revoke_token(&self) {
        *self.state.revoked.lock() = true;
    }

    /// Requests received, as `METHOD /path?query`
    pub fn hits(&self) -> Vec<String> {
        self.state.hits.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.hits().iter().filter(|h| h.starts_with(prefix)).count()
    }

    pub fn last_put(&self) -> Option<Value> {
        self.state.last_put.lock().clone()
    }

    pub fn items(&self, collection: &str) -> Vec<Value> {
        self.state
            .collections
            .lock()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn config(&self) -> Config {
        Config::default().with_api_url(&self.api_url()).unwrap()
    }

    /// Store positioned on `path`, not logged in
    pub fn store_at(&self, path: &str, config: Config) -> (ConsoleStore, Arc<HistoryNavigator>) {
        let nav = Arc::new(HistoryNavigator::new(path));
        (ConsoleStore::new(config, nav.clone()), nav)
    }

    /// Store on `/dashboard` holding a valid session
    pub async fn logged_in(&self, config: Config) -> (ConsoleStore, Arc<HistoryNavigator>) {
        let (store, nav) = self.store_at("/dashboard", config);
        assert!(store.login(&Credentials::new("a", "b")).await);
        (store, nav)
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn gate(State(state): State<Arc<MockState>>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let hit = match req.uri().query() {
        Some(query) => format!("{} {}?{}", req.method(), path, query),
        None => format!("{} {}", req.method(), path),
    };
    state.hits.lock().push(hit);

    let failure = state.fail_next.lock().take();
    if let Some(status) = failure {
        return status.into_response();
    }

    if path != "/api/auth" {
        let expected = format!("Bearer {TOKEN}");
        let presented = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected);
        let revoked = *state.revoked.lock();
        if !presented || revoked {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    next.run(req).await
}

async fn auth(Query(params): Query<HashMap<String, String>>) -> Response {
    let user = params.get("user").map(String::as_str);
    let password = params.get("password").map(String::as_str);
    match (user, password) {
        (Some("a"), Some("b")) => TOKEN.into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "Uptime": "1h2m3s",
        "CurrentMasterConfig": { "DB": "/var/lib/disttrace/master.db" },
        "LastSlaveConfigTime": "2019-11-02 10:00:00",
        "LastSlaveConfig": { "Targets": 2 }
    }))
}

async fn traces(State(state): State<Arc<MockState>>) -> Json<Value> {
    Json(state.traces.lock().clone())
}

async fn graph(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    match params.get("dest").map(String::as_str) {
        Some("8.8.8.8") => Json(json!({
            "Start": "2019-11-02 10:00:00",
            "End": "2019-11-02 11:00:00",
            "Data": [["0", "10.0.0.1", 4, 1.5], ["10.0.0.1", "8.8.8.8", 4, 12.0]]
        })),
        _ => Json(json!({ "Start": "", "End": "", "Data": {} })),
    }
}

async fn list(
    State(state): State<Arc<MockState>>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let limit = params.get("limit").cloned().unwrap_or_default();
    if limit == SLOW_LIMIT {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    let items = state
        .collections
        .lock()
        .get(&collection)
        .cloned()
        .unwrap_or_default();
    if items.is_empty() {
        return Json(Value::Null);
    }

    let limit = limit.parse().unwrap_or(items.len());
    Json(Value::Array(items.into_iter().take(limit).collect()))
}

async fn create(
    State(state): State<Arc<MockState>>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let id = state.next_id.fetch_add(1, Ordering::SeqCst);
    let param = |key: &str| params.get(key).cloned().unwrap_or_default();
    let number = |key: &str| params.get(key).and_then(|v| v.parse::<i64>().ok()).unwrap_or(0);

    let entity = match collection.as_str() {
        "slaves" => json!({ "ID": id, "Name": param("name"), "Secret": param("secret") }),
        "targets" => json!({
            "ID": id,
            "Name": param("name"),
            "Address": param("address"),
            "Retries": number("retries"),
            "MaxHops": number("maxHops"),
            "Timeout": number("timeout")
        }),
        "users" => json!({
            "ID": id,
            "Name": param("name"),
            "Password": "",
            "Salt": 42,
            "PasswordNeedsChange": param("pwNeedsChange") == "true"
        }),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };

    state
        .collections
        .lock()
        .entry(collection)
        .or_default()
        .push(entity.clone());
    Json(entity).into_response()
}

async fn update(
    State(state): State<Arc<MockState>>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    *state.last_put.lock() = Some(body.clone());

    let mut stored = body.clone();
    if collection == "users" {
        stored["Password"] = json!("");
        stored["PasswordChanged"] = json!(false);
        stored["PasswordNeedsChange"] = json!(false);
    }

    let mut collections = state.collections.lock();
    let items = collections.entry(collection).or_default();
    match items.iter_mut().find(|item| item["ID"] == body["ID"]) {
        Some(item) => {
            *item = stored.clone();
            Json(stored).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn remove(
    State(state): State<Arc<MockState>>,
    Path((collection, id)): Path<(String, String)>,
) -> Json<Value> {
    let wire_id = match id.parse::<i64>() {
        Ok(n) => json!(n),
        Err(_) => json!(id),
    };

    if let Some(items) = state.collections.lock().get_mut(&collection) {
        items.retain(|item| item["ID"] != wire_id);
    }

    Json(json!({ "ID": wire_id }))
}
