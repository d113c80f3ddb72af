//! HTTPハンドラ

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use receipt_scan_common::{GeminiModel, ScanOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use super::request::ScanRequest;
use super::AppState;
use crate::error::ReceiptScanError;

/// `POST /api/scan` の成功レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    pub model: String,
    pub results: Vec<ScanOutcome>,
}

/// エラーレスポンス
///
/// リクエスト不備は 400（本文のサイズ超過のみ 413）、それ以外は 500
#[derive(Debug)]
pub struct ApiError(ReceiptScanError);

impl From<ReceiptScanError> for ApiError {
    fn from(e: ReceiptScanError) -> Self {
        ApiError(e)
    }
}

/// 本文の読み取り・解析失敗
///
/// サイズ超過は受け付け可能な枚数を添えて返す
fn rejection_error(rejection: JsonRejection, max_uploads: usize) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError(ReceiptScanError::RequestTooLarge { max: max_uploads })
    } else {
        ApiError(ReceiptScanError::invalid_request(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if matches!(self.0, ReceiptScanError::RequestTooLarge { .. }) {
            StatusCode::PAYLOAD_TOO_LARGE
        } else if self.0.is_request_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self.0, "Scan request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let mut body = json!({ "error": self.0.to_string() });
        match &self.0 {
            ReceiptScanError::InvalidRequest { details } => {
                body["details"] = json!(details);
            }
            ReceiptScanError::TooManyImages { max, dropped } => {
                body["max"] = json!(max);
                body["dropped"] = json!(dropped);
            }
            ReceiptScanError::RequestTooLarge { max } => {
                body["max"] = json!(max);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

/// ヘルスチェック
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "receipt-scan",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// 選択可能なモデル一覧
pub async fn models(State(state): State<Arc<AppState>>) -> Json<Value> {
    let models: Vec<Value> = GeminiModel::ALL
        .iter()
        .map(|m| json!({ "id": m.id(), "label": m.label() }))
        .collect();

    Json(json!({
        "models": models,
        "default": state.default_model.id(),
    }))
}

/// レシート画像のスキャン
///
/// 枚数・項目の検証に失敗した場合は抽出を行わず 400。
/// 検証を通ったリクエストは画像ごとの失敗を含めて 200 で返す。
pub async fn scan(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| rejection_error(rejection, state.controller.max_uploads()))?;

    state.controller.check_count(request.image_count())?;

    let model = request.model_or(state.default_model.id()).to_string();
    let entries = request.into_entries()?;
    let batch = state.controller.admit(entries)?;

    info!(images = batch.len(), model = %model, "Scan request accepted");
    let results = state.controller.scan(batch, &model).await;

    Ok(Json(ScanResponse { model, results }))
}
