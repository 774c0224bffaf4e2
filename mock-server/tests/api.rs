use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Todo, UploadedFile};
use tower::ServiceExt;

const TOKEN: &str = "Bearer test-token";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn authed(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, TOKEN)
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, TOKEN)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn multipart_request(field: &str, file_name: &str, contents: &str) -> Request<String> {
    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {contents}\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/api/files/")
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(body)
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn todo_routes_require_bearer_token() {
    let resp = app()
        .oneshot(Request::builder().uri("/api/todos/").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let resp = app()
        .oneshot(Request::builder().uri("/health").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

// --- list ---

#[tokio::test]
async fn list_todos_empty() {
    let resp = app().oneshot(authed("GET", "/api/todos/")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let todos: Vec<Todo> = body_json(resp).await;
    assert!(todos.is_empty());
}

// --- create ---

#[tokio::test]
async fn create_todo_returns_201_with_defaults() {
    let resp = app()
        .oneshot(json_request("POST", "/api/todos/", r#"{"title":"Buy milk"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let todo: Todo = body_json(resp).await;
    assert_eq!(todo.id, 1);
    assert_eq!(todo.title, "Buy milk");
    assert!(!todo.completed);
    assert!(todo.description.is_none());
    assert!(todo.image_key.is_none());
}

#[tokio::test]
async fn create_todo_blank_title_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/api/todos/", r#"{"title":"   "}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn create_todo_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/api/todos/", r#"{"not_title":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- get ---

#[tokio::test]
async fn get_todo_not_found() {
    let resp = app().oneshot(authed("GET", "/api/todos/42")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_todo_bad_id_returns_400() {
    let resp = app().oneshot(authed("GET", "/api/todos/not-a-number")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- complete ---

#[tokio::test]
async fn complete_todo_not_found() {
    let resp = app()
        .oneshot(authed("POST", "/api/todos/42/complete"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- files ---

#[tokio::test]
async fn upload_without_file_field_returns_400() {
    let resp = app()
        .oneshot(multipart_request("other", "a.txt", "hello"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn download_unknown_key_returns_404() {
    let resp = app()
        .oneshot(Request::builder().uri("/api/files/missing.png").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_then_download_roundtrip() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(multipart_request("file", "photo.png", "pixels"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let uploaded: UploadedFile = body_json(resp).await;
    assert!(uploaded.key.ends_with("_photo.png"), "key was {}", uploaded.key);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .uri(format!("/api/files/{}", uploaded.key))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(body_bytes(resp).await.as_ref(), b"pixels");
}

// --- full lifecycle ---

#[tokio::test]
async fn create_list_get_complete_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create two
    for title in ["Buy milk", "Pay rent"] {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(json_request(
                "POST",
                "/api/todos/",
                &serde_json::json!({ "title": title, "due_date": "2024-06-01" }).to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    // list — newest first
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/api/todos/"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let todos: Vec<Todo> = body_json(resp).await;
    let ids: Vec<i64> = todos.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(todos[0].title, "Pay rent");
    assert_eq!(todos[0].due_date.as_deref(), Some("2024-06-01"));

    // complete — twice, second is a no-op
    for _ in 0..2 {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(authed("POST", "/api/todos/1/complete"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let todo: Todo = body_json(resp).await;
        assert!(todo.completed);
    }

    // get — other todo untouched
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/api/todos/2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Todo = body_json(resp).await;
    assert_eq!(fetched.title, "Pay rent");
    assert!(!fetched.completed);
}
