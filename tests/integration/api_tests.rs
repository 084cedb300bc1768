//! API integration tests

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use bookshelf_api::{api, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    api::router(AppState::new())
}

/// Send a request through the router and decode the JSON body
async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request"),
        None => builder.body(Body::empty()).expect("Failed to build request"),
    };

    let response = app.clone().oneshot(request).await.expect("Failed to send request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Failed to parse response")
    };
    (status, body)
}

fn book(name: &str, page_count: u32, read_page: u32, reading: bool) -> Value {
    json!({
        "name": name,
        "year": 2010,
        "author": "John Doe",
        "summary": "Lorem ipsum dolor sit amet",
        "publisher": "Dicoding Indonesia",
        "pageCount": page_count,
        "readPage": read_page,
        "reading": reading
    })
}

async fn create(app: &Router, payload: Value) -> String {
    let (status, body) = send(app, Method::POST, "/books", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["bookId"].as_str().expect("No book ID").to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["books"], 0);
}

#[tokio::test]
async fn test_create_book() {
    let app = app();
    let (status, body) = send(&app, Method::POST, "/books", Some(book("Buku A", 100, 25, false))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Buku berhasil ditambahkan");
    assert_eq!(body["data"]["bookId"].as_str().map(str::len), Some(16));
}

#[tokio::test]
async fn test_create_finished_book() {
    let app = app();
    let id = create(&app, book("Buku A", 100, 100, false)).await;

    let (status, body) = send(&app, Method::GET, &format!("/books/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let stored = &body["data"]["book"];
    assert_eq!(stored["id"], id.as_str());
    assert_eq!(stored["finished"], true);
    assert_eq!(stored["pageCount"], 100);
    assert_eq!(stored["readPage"], 100);
    assert_eq!(stored["insertedAt"], stored["updatedAt"]);
}

#[tokio::test]
async fn test_create_without_name() {
    let app = app();
    let mut payload = book("ignored", 100, 25, false);
    payload.as_object_mut().unwrap().remove("name");

    let (status, body) = send(&app, Method::POST, "/books", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Gagal menambahkan buku. Mohon isi nama buku");
}

#[tokio::test]
async fn test_create_read_page_over_page_count() {
    let app = app();
    let (status, body) = send(&app, Method::POST, "/books", Some(book("Buku A", 80, 90, false))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert_eq!(
        body["message"],
        "Gagal menambahkan buku. readPage tidak boleh lebih besar dari pageCount"
    );

    let (_, list) = send(&app, Method::GET, "/books", None).await;
    assert_eq!(list["data"]["books"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_create_malformed_body() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/books")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn test_list_projection() {
    let app = app();
    let id = create(&app, book("Buku A", 100, 25, false)).await;

    let (status, body) = send(&app, Method::GET, "/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let books = body["data"]["books"].as_array().expect("books is not an array");
    assert_eq!(books.len(), 1);
    assert_eq!(
        books[0],
        json!({ "id": id, "name": "Buku A", "publisher": "Dicoding Indonesia" })
    );
}

#[tokio::test]
async fn test_list_filters() {
    let app = app();
    create(&app, book("Kisah Dicoding", 100, 10, true)).await;
    create(&app, book("Belajar Rust", 100, 100, false)).await;
    create(&app, book("dicoding academy", 50, 5, false)).await;

    let names = |body: &Value| -> Vec<String> {
        body["data"]["books"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["name"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, body) = send(&app, Method::GET, "/books?reading=1", None).await;
    assert_eq!(names(&body), ["Kisah Dicoding"]);

    let (_, body) = send(&app, Method::GET, "/books?reading=0", None).await;
    assert_eq!(names(&body), ["Belajar Rust", "dicoding academy"]);

    let (_, body) = send(&app, Method::GET, "/books?finished=1", None).await;
    assert_eq!(names(&body), ["Belajar Rust"]);

    let (_, body) = send(&app, Method::GET, "/books?name=DICODING", None).await;
    assert_eq!(names(&body), ["Kisah Dicoding", "dicoding academy"]);

    let (_, body) = send(&app, Method::GET, "/books?name=dicoding&reading=0", None).await;
    assert_eq!(names(&body), ["dicoding academy"]);

    let (_, body) = send(&app, Method::GET, "/books?reading=maybe", None).await;
    assert_eq!(names(&body).len(), 3);
}

#[tokio::test]
async fn test_list_blank_name_filter_is_ignored() {
    let app = app();
    create(&app, book("Kisah Dicoding", 100, 10, true)).await;
    create(&app, book("Belajar Rust", 100, 100, false)).await;

    for uri in ["/books?name=", "/books?name=%20%20"] {
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body["data"]["books"].as_array().map(Vec::len), Some(2), "{}", uri);
    }
}

#[tokio::test]
async fn test_list_repeated_filter_uses_fail_envelope() {
    let app = app();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/books?reading=1&reading=0")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/json")
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "fail");
    assert!(body["message"].as_str().unwrap().starts_with("Invalid query string"));
}

#[tokio::test]
async fn test_get_missing_book() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/books/xxxxx", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Buku tidak ditemukan");
}

#[tokio::test]
async fn test_update_book() {
    let app = app();
    let id = create(&app, book("Buku A", 100, 25, true)).await;
    let (_, before) = send(&app, Method::GET, &format!("/books/{}", id), None).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/books/{}", id),
        Some(book("Buku A Revisi", 200, 200, false)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Buku berhasil diperbarui");

    let (_, after) = send(&app, Method::GET, &format!("/books/{}", id), None).await;
    let before = &before["data"]["book"];
    let after = &after["data"]["book"];
    assert_eq!(after["name"], "Buku A Revisi");
    assert_eq!(after["pageCount"], 200);
    assert_eq!(after["finished"], true);
    assert_eq!(after["reading"], false);
    assert_eq!(after["insertedAt"], before["insertedAt"]);
}

#[tokio::test]
async fn test_update_validation_and_missing() {
    let app = app();
    let id = create(&app, book("Buku A", 100, 25, false)).await;

    let mut nameless = book("ignored", 100, 25, false);
    nameless["name"] = Value::Null;
    let (status, body) = send(&app, Method::PUT, &format!("/books/{}", id), Some(nameless)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Gagal memperbarui buku. Mohon isi nama buku");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/books/{}", id),
        Some(book("Buku A", 10, 25, false)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Gagal memperbarui buku. readPage tidak boleh lebih besar dari pageCount"
    );

    let (status, body) = send(&app, Method::PUT, "/books/xxxxx", Some(book("Buku A", 100, 25, false))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Gagal memperbarui buku. Id tidak ditemukan");
}

#[tokio::test]
async fn test_delete_book() {
    let app = app();
    let first = create(&app, book("Buku A", 100, 25, false)).await;
    let second = create(&app, book("Buku B", 100, 25, false)).await;
    let third = create(&app, book("Buku C", 100, 25, false)).await;

    let (status, body) = send(&app, Method::DELETE, &format!("/books/{}", second), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Buku berhasil dihapus");

    let (_, body) = send(&app, Method::GET, "/books", None).await;
    let ids: Vec<_> = body["data"]["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, [first, third]);
}

#[tokio::test]
async fn test_delete_missing_book() {
    let app = app();
    let (status, body) = send(&app, Method::DELETE, "/books/xxxxx", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Buku gagal dihapus. Id tidak ditemukan");
}

#[tokio::test]
async fn test_over_tcp() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app()).await.expect("Server failed");
    });

    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/books", base_url))
        .json(&book("Buku TCP", 10, 10, false))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let id = body["data"]["bookId"].as_str().expect("No book ID").to_string();

    let response = client
        .get(format!("{}/books/{}", base_url, id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["book"]["finished"], true);

    let response = client
        .delete(format!("{}/books/{}", base_url, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_serve_stops_on_shutdown_signal() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(bookshelf_api::serve(listener, AppState::new(), async move {
        stopped.await.ok();
    }));

    let response = reqwest::get(format!("{}/health", base_url))
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    stop.send(()).expect("Server already stopped");
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), server)
        .await
        .expect("Server did not shut down")
        .expect("Server task panicked");
    assert!(result.is_ok());
}
