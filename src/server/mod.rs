//! HTTPサーバー
//!
//! - `GET  /api/health`
//! - `GET  /api/models`
//! - `POST /api/scan`
//!
//! クライアントが切断するとハンドラのFutureごと破棄され、
//! 実行中のモデル呼び出しも中断される。残りの画像は処理されない。

pub mod request;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use receipt_scan_common::GeminiModel;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::batch::BatchScanController;
use crate::config::Config;
use crate::extractor::ModelClient;

/// JSON本体のうち画像以外に見込む余裕
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// ルート間で共有する状態（起動時に一度だけ作る）
pub struct AppState {
    pub controller: BatchScanController,
    pub default_model: GeminiModel,
}

impl AppState {
    pub fn new(controller: BatchScanController, default_model: GeminiModel) -> Self {
        Self {
            controller,
            default_model,
        }
    }

    pub fn from_config(config: &Config, client: Arc<dyn ModelClient>) -> crate::error::Result<Self> {
        Ok(Self::new(
            BatchScanController::from_config(config, client),
            config.default_model()?,
        ))
    }
}

/// 上限の何倍の枚数まで本文を読み切るか
///
/// 枚数超過のリクエストも本文を解析できれば超過枚数を返せる
const BODY_UPLOAD_ALLOWANCE: usize = 2;

/// Base64化した画像が上限枚数の `BODY_UPLOAD_ALLOWANCE` 倍まで収まるリクエストサイズ
pub fn body_limit(config: &Config) -> usize {
    config
        .max_uploads
        .saturating_mul(BODY_UPLOAD_ALLOWANCE)
        .saturating_mul(config.max_image_bytes)
        .saturating_mul(4)
        / 3
        + BODY_OVERHEAD_BYTES
}

pub fn build_router(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/models", get(routes::models))
        .route("/api/scan", post(routes::scan))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: &Config, client: Arc<dyn ModelClient>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| {
            format!("invalid bind address {}:{}", config.bind_address, config.port)
        })?;

    let state = Arc::new(AppState::from_config(config, client)?);
    let app = build_router(state, body_limit(config));

    info!(
        %addr,
        model = %config.model,
        max_uploads = config.max_uploads,
        "Receipt scan server listening"
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
