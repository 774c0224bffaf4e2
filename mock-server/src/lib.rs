//! In-process stand-in for the remote todo API.
//!
//! Serves the todo and file routes the client core talks to. Todo routes
//! demand a bearer token (any non-empty value is accepted); file routes are
//! open because attachments are fetched lazily by URL.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub completed: bool,
    pub image_key: Option<String>,
}

#[derive(Deserialize)]
pub struct TodoCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub image_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadedFile {
    pub key: String,
}

#[derive(Default)]
pub struct Store {
    todos: BTreeMap<i64, Todo>,
    last_id: i64,
    files: HashMap<String, Bytes>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::default();

    let todos = Router::new()
        .route("/api/todos/", get(list_todos).post(create_todo))
        .route("/api/todos/{id}", get(get_todo))
        .route("/api/todos/{id}/complete", post(complete_todo))
        .route_layer(middleware::from_fn(require_bearer));

    let files = Router::new()
        .route("/api/files/", post(upload_file))
        .route("/api/files/{key}", get(download_file));

    Router::new()
        .merge(todos)
        .merge(files)
        .route("/health", get(health))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app().layer(TraceLayer::new_for_http())).await
}

/// Storage key for an uploaded file: UTC timestamp plus the sanitized name.
pub fn file_key(file_name: &str, now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y%m%d%H%M%S%6f");
    format!("{stamp}_{}", file_name.replace('/', "_"))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn require_bearer(request: Request, next: Next) -> Result<Response, StatusCode> {
    if bearer_token(request.headers()).is_none() {
        tracing::debug!(path = %request.uri().path(), "rejecting request without bearer token");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_todos(State(db): State<Db>) -> Json<Vec<Todo>> {
    let store = db.read().await;
    Json(store.todos.values().rev().cloned().collect())
}

async fn create_todo(
    State(db): State<Db>,
    Json(input): Json<TodoCreate>,
) -> Result<(StatusCode, Json<Todo>), StatusCode> {
    if input.title.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    let mut store = db.write().await;
    store.last_id += 1;
    let todo = Todo {
        id: store.last_id,
        title: input.title,
        description: input.description,
        due_date: input.due_date,
        completed: false,
        image_key: input.image_key,
    };
    store.todos.insert(todo.id, todo.clone());
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(State(db): State<Db>, Path(id): Path<i64>) -> Result<Json<Todo>, StatusCode> {
    let store = db.read().await;
    store.todos.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn complete_todo(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<Json<Todo>, StatusCode> {
    let mut store = db.write().await;
    let todo = store.todos.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    todo.completed = true;
    Ok(Json(todo.clone()))
}

async fn upload_file(
    State(db): State<Db>,
    mut multipart: Multipart,
) -> Result<Json<UploadedFile>, StatusCode> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        let key = file_key(&file_name, Utc::now());
        tracing::info!(%key, size = data.len(), "stored upload");
        db.write().await.files.insert(key.clone(), data);
        return Ok(Json(UploadedFile { key }));
    }
    Err(StatusCode::BAD_REQUEST)
}

async fn download_file(
    State(db): State<Db>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = db.read().await;
    let data = store.files.get(&key).cloned().ok_or(StatusCode::NOT_FOUND)?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn todo_serializes_nullable_fields_as_null() {
        let todo = Todo {
            id: 7,
            title: "Test".to_string(),
            description: None,
            due_date: None,
            completed: false,
            image_key: None,
        };
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["title"], "Test");
        assert!(json["description"].is_null());
        assert!(json["due_date"].is_null());
        assert!(json["image_key"].is_null());
        assert_eq!(json["completed"], false);
    }

    #[test]
    fn todo_create_optional_fields_default_to_none() {
        let input: TodoCreate = serde_json::from_str(r#"{"title":"Only title"}"#).unwrap();
        assert_eq!(input.title, "Only title");
        assert!(input.description.is_none());
        assert!(input.due_date.is_none());
        assert!(input.image_key.is_none());
    }

    #[test]
    fn todo_create_rejects_missing_title() {
        let result: Result<TodoCreate, _> = serde_json::from_str(r#"{"description":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn file_key_prefixes_timestamp_and_sanitizes_slashes() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap();
        assert_eq!(file_key("a/b.png", now), "20240501123045000000_a_b.png");
    }

    #[test]
    fn bearer_token_requires_non_empty_value() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
    }
}
