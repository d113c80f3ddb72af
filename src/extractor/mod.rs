//! レシート抽出サービス
//!
//! 画像1枚 + 固定プロンプトでモデルを1回だけ呼び出し、
//! 返ってきたテキストをレシートデータに正規化する。
//! リトライ・ストリーミングは行わない。

mod gemini;

pub use gemini::GeminiClient;

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use receipt_scan_common::{build_receipt_prompt, parse_receipt_response, GeminiModel, ReceiptData};
use tracing::debug;

use crate::error::{ReceiptScanError, Result};

/// モデルに渡す画像
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// 外部モデルとの境界
///
/// 1回の呼び出しで画像1枚と指示文1つを送り、テキストを受け取る。
/// テキストが含まれないレスポンスは `None`。
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(
        &self,
        model: GeminiModel,
        image: &ImagePayload,
        prompt: &str,
    ) -> Result<Option<String>>;
}

/// レシート抽出サービス
///
/// クライアントとプロンプトは起動時に一度だけ作り、以後は共有する
#[derive(Clone)]
pub struct ReceiptExtractor {
    client: Arc<dyn ModelClient>,
    prompt: Arc<str>,
}

impl ReceiptExtractor {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            prompt: build_receipt_prompt().into(),
        }
    }

    /// 画像1枚からレシートデータを抽出
    ///
    /// モデルIDは呼び出し前に検証する。列挙外なら外部呼び出しは行わない。
    pub async fn extract(&self, image: &ImagePayload, model_id: &str) -> Result<ReceiptData> {
        let model: GeminiModel = model_id.parse()?;

        debug!(
            model = %model,
            mime_type = %image.mime_type,
            bytes = image.bytes.len(),
            "Sending receipt image to model"
        );

        let text = self
            .client
            .generate(model, image, &self.prompt)
            .await?
            .filter(|t| !t.trim().is_empty())
            .ok_or(ReceiptScanError::EmptyResponse)?;

        debug!(model = %model, chars = text.len(), "Model responded");

        Ok(parse_receipt_response(&text)?)
    }
}
