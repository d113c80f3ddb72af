//! HTTPハンドラの結合テスト
//!
//! ハンドラを直接呼び出し、ステータスとJSON本体を検証する

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{FromRequest, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use receipt_scan::batch::BatchScanController;
use receipt_scan::config::Config;
use receipt_scan::error::Result;
use receipt_scan::extractor::{ImagePayload, ModelClient, ReceiptExtractor};
use receipt_scan::server::request::ScanRequest;
use receipt_scan::server::{body_limit, build_router, routes, AppState};
use receipt_scan::GeminiModel;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// 画像の中身が "empty" なら空応答、それ以外は固定のレシートを返す
struct FixedClient {
    calls: AtomicUsize,
}

#[async_trait]
impl ModelClient for FixedClient {
    async fn generate(
        &self,
        _model: GeminiModel,
        image: &ImagePayload,
        _prompt: &str,
    ) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.bytes == b"empty" {
            return Ok(None);
        }
        Ok(Some(
            r#"{"storeName":"Corner Shop","items":[{"name":"Milk","quantity":"2","price":"3.40"}],"total":3.4,"category":"groceries"}"#
                .to_string(),
        ))
    }
}

fn state(max_uploads: usize) -> (Arc<AppState>, Arc<FixedClient>) {
    let client = Arc::new(FixedClient {
        calls: AtomicUsize::new(0),
    });
    let controller = BatchScanController::new(ReceiptExtractor::new(client.clone()), max_uploads);
    let state = Arc::new(AppState::new(controller, GeminiModel::default()));
    (state, client)
}

fn upload(content: &[u8]) -> Value {
    json!({ "image": STANDARD.encode(content), "mimeType": "image/jpeg" })
}

async fn call_scan(state: Arc<AppState>, body: Value) -> (StatusCode, Value) {
    let request: ScanRequest = serde_json::from_value(body).unwrap();
    let response: Response = routes::scan(State(state), Ok(Json(request)))
        .await
        .into_response();
    read_json(response).await
}

async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let Json(body) = routes::health().await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_models_lists_default() {
    let (state, _) = state(3);
    let Json(body) = routes::models(State(state)).await;
    assert_eq!(body["default"], "gemini-2.5-flash");
    assert_eq!(body["models"].as_array().unwrap().len(), GeminiModel::ALL.len());
}

#[tokio::test]
async fn test_scan_mixed_results() {
    let (state, client) = state(3);
    let (status, body) = call_scan(
        state,
        json!({ "images": [upload(b"receipt"), upload(b"empty")] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "gemini-2.5-flash");

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["success"], true);
    assert_eq!(results[0]["data"]["storeName"], "Corner Shop");
    assert_eq!(results[0]["data"]["items"][0]["quantity"], 2.0);
    assert_eq!(results[0]["data"]["category"], "groceries");
    assert_eq!(results[1]["success"], false);
    assert_eq!(results[1]["error"], "No response from model");
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_scan_too_many_images() {
    let (state, client) = state(2);
    let (status, body) = call_scan(
        state,
        json!({ "images": [upload(b"1"), upload(b"2"), upload(b"3")] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["dropped"], 1);
    assert_eq!(body["max"], 2);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scan_invalid_fields() {
    let (state, client) = state(3);
    let (status, body) = call_scan(
        state,
        json!({ "images": [{ "image": "%%%", "mimeType": "text/plain" }] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request data");
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scan_missing_images() {
    let (state, _) = state(3);
    let (status, body) = call_scan(state, json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"][0].as_str().unwrap().starts_with("images"));
}

#[tokio::test]
async fn test_scan_unsupported_model() {
    let (state, client) = state(3);
    let (status, body) = call_scan(
        state,
        json!({ "images": [upload(b"receipt")], "model": "gpt-4o" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["results"][0]["error"], "Unsupported model: gpt-4o");
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

/// 1枚ずつは上限内だが枚数超過のバッチも、本文を読み切って超過枚数を返す
#[tokio::test]
async fn test_router_reports_dropped_for_large_over_limit_batch() {
    let config = Config {
        max_uploads: 3,
        max_image_bytes: 300_000,
        ..Config::default()
    };
    let (state, client) = state(config.max_uploads);
    let app = build_router(state, body_limit(&config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let image = vec![0u8; 280_000];
    let images: Vec<Value> = (0..4).map(|_| upload(&image)).collect();
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/scan", addr))
        .json(&json!({ "images": images }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["max"], 3);
    assert_eq!(body["dropped"], 1);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

/// 本文が読み取り上限を超えた場合は 413 と受け付け枚数を返す
#[tokio::test]
async fn test_oversized_body_reports_upload_bound() {
    let (state, client) = state(3);

    // 上限未設定時の既定（2MB）を超える本文
    let body = json!({
        "images": [{ "image": "A".repeat(3 * 1024 * 1024), "mimeType": "image/jpeg" }]
    })
    .to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/api/scan")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let payload = Json::<ScanRequest>::from_request(request, &()).await;
    assert!(payload.is_err());

    let response = routes::scan(State(state), payload).await.into_response();
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["max"], 3);
    assert!(body["error"].as_str().unwrap().starts_with("Request body too large"));
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (state, _) = state(3);
    let request = Request::builder()
        .method("POST")
        .uri("/api/scan")
        .header("content-type", "application/json")
        .body(Body::from("{\"images\": ["))
        .unwrap();

    let payload = Json::<ScanRequest>::from_request(request, &()).await;
    let response = routes::scan(State(state), payload).await.into_response();
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request data");
}
