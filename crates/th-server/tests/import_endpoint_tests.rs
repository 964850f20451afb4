//! Integration tests for the import endpoint

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use th_common::RecordKind;
use th_import::config::ImportConfig;
use th_import::store::MemoryStore;
use th_server::{config::Config, create_router, serve_until, AppState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tower::ServiceExt;

const MEMBERS: &str = "INSERT INTO `members` VALUES \
(5,'Ann','Woman','1990-01-01','ann@x.com',NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,'yes','2019-01-01',NULL,5,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL),\
(6,'Bo','Man','1991-01-01','bo@x.com',NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,'no','2019-01-01',NULL,6,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL);";

/// Helper to create a test router over an in-memory store
fn create_test_router(store: Arc<MemoryStore>) -> Router {
    let state = AppState::new(store, ImportConfig::default());
    create_router(state, &Config::default())
}

async fn post_import(app: Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/functions/v1/import-data")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let app = create_test_router(Arc::new(MemoryStore::new()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_import_returns_tally() {
    let store = Arc::new(MemoryStore::new());
    let dump = format!("{MEMBERS}\nINSERT INTO `likes` VALUES (1,5,6,NULL),(2,6,999,NULL);");

    let (status, body) =
        post_import(create_test_router(store.clone()), json!({"sqlContent": dump})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Data import completed successfully!");
    assert_eq!(
        body["results"],
        json!({
            "members": {"imported": 2, "skipped": 0},
            "images": {"imported": 0, "skipped": 0},
            "likes": {"imported": 1, "skipped": 1},
            "messages": {"imported": 0, "skipped": 0}
        })
    );
    assert_eq!(store.rows(RecordKind::Likes).len(), 1);
}

#[tokio::test]
async fn test_import_options_are_applied() {
    let store = Arc::new(MemoryStore::new());
    let body = json!({
        "sqlContent": MEMBERS,
        "options": {"offsetMemberIds": true, "emailSuffix": ".imported", "sampleSize": 1}
    });

    let (status, body) = post_import(create_test_router(store.clone()), body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"]["members"], json!({"imported": 1, "skipped": 0}));

    let members = store.rows(RecordKind::Members);
    assert_eq!(members[0]["member_id"], 1_000_005);
    assert_eq!(members[0]["email"], "ann@x.com.imported");
}

#[tokio::test]
async fn test_missing_sql_content_is_bad_request() {
    let (status, body) =
        post_import(create_test_router(Arc::new(MemoryStore::new())), json!({"sql": "x"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("sqlContent"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = create_test_router(Arc::new(MemoryStore::new()));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/functions/v1/import-data")
                .header(header::ORIGIN, "https://app.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "apikey, content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_serve_until_stops_after_signal() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(serve_until(
        listener,
        create_test_router(Arc::new(MemoryStore::new())),
        async move {
            let _ = stop_rx.await;
        },
        Duration::from_secs(30),
    ));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("healthy"));

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop after the signal")
        .unwrap();
    assert!(result.is_ok());
}
