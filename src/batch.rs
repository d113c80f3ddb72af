//! バッチスキャン制御
//!
//! 複数画像を1枚ずつ順番に抽出サービスへ渡し、画像ごとの成功/失敗を
//! 入力順のまま返す。1枚の失敗で後続を止めることはない。
//!
//! 同時実行数は `MAX_IN_FLIGHT` で固定している。プロバイダのレート制限を
//! 守るための方針であり、並列化する場合はこの定数を変更して見直すこと。

use std::pin::pin;
use std::sync::Arc;

use chrono::NaiveDateTime;
use futures::stream::{self, StreamExt};
use receipt_scan_common::{GeminiModel, ReceiptData, ScanOutcome};
use tracing::{debug, info, warn};

use crate::compressor::ImageCompressor;
use crate::config::Config;
use crate::error::{ReceiptScanError, Result};
use crate::extractor::{ImagePayload, ModelClient, ReceiptExtractor};

/// 同時に抽出中にできる画像の数
pub const MAX_IN_FLIGHT: usize = 1;

/// アップロード画像1枚
#[derive(Debug, Clone)]
pub struct UploadEntry {
    /// 表示・ログ用の名前（ファイル名など）
    pub label: Option<String>,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// 撮影日時（撮影地のローカル時刻）
    pub captured_at: Option<NaiveDateTime>,
}

impl UploadEntry {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            label: None,
            bytes,
            mime_type: mime_type.into(),
            captured_at: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_captured_at(mut self, captured_at: NaiveDateTime) -> Self {
        self.captured_at = Some(captured_at);
        self
    }

    /// 撮影日（YYYY-MM-DD）
    pub fn capture_date(&self) -> Option<String> {
        self.captured_at
            .map(|t| t.date().format("%Y-%m-%d").to_string())
    }

    fn display_label(&self, index: usize) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("image #{}", index + 1))
    }
}

/// 上限チェック済みのアップロード
///
/// `BatchScanController::admit` を通してのみ作られる
#[derive(Debug)]
pub struct UploadBatch {
    entries: Vec<UploadEntry>,
}

impl UploadBatch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct BatchScanController {
    extractor: ReceiptExtractor,
    compressor: Option<ImageCompressor>,
    max_uploads: usize,
    max_image_bytes: Option<usize>,
}

impl BatchScanController {
    pub fn new(extractor: ReceiptExtractor, max_uploads: usize) -> Self {
        Self {
            extractor,
            compressor: None,
            max_uploads: max_uploads.max(1),
            max_image_bytes: None,
        }
    }

    /// 1枚あたりのバイト数上限（超えた画像はその画像だけ失敗にする）
    pub fn with_max_image_bytes(mut self, limit: usize) -> Self {
        self.max_image_bytes = Some(limit);
        self
    }

    /// 抽出前に各画像をJPEGへ再エンコードする
    pub fn with_compressor(mut self, compressor: ImageCompressor) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn from_config(config: &Config, client: Arc<dyn ModelClient>) -> Self {
        let controller = Self::new(ReceiptExtractor::new(client), config.max_uploads)
            .with_max_image_bytes(config.max_image_bytes);
        if config.recompress_uploads {
            controller.with_compressor(ImageCompressor::new(
                config.max_image_width,
                config.jpeg_quality,
            ))
        } else {
            controller
        }
    }

    pub fn max_uploads(&self) -> usize {
        self.max_uploads
    }

    /// 枚数チェック
    ///
    /// 空、または上限超過のアップロードは処理前に拒否する。
    /// 超過時は切り捨てず、何枚超えたかをエラーで返す。
    pub fn admit(&self, entries: Vec<UploadEntry>) -> Result<UploadBatch> {
        self.check_count(entries.len())?;
        Ok(UploadBatch { entries })
    }

    /// 画像のデコード前に枚数だけを検査する
    pub fn check_count(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(ReceiptScanError::invalid_request(
                "images: at least one image is required",
            ));
        }
        if count > self.max_uploads {
            return Err(ReceiptScanError::TooManyImages {
                max: self.max_uploads,
                dropped: count - self.max_uploads,
            });
        }
        Ok(())
    }

    pub async fn scan(&self, batch: UploadBatch, model_id: &str) -> Vec<ScanOutcome> {
        self.scan_with(batch, model_id, |_, _| {}).await
    }

    /// バッチを順番に処理し、結果が出るたびに `on_outcome` を呼ぶ
    pub async fn scan_with<F>(
        &self,
        batch: UploadBatch,
        model_id: &str,
        mut on_outcome: F,
    ) -> Vec<ScanOutcome>
    where
        F: FnMut(usize, &ScanOutcome),
    {
        let total = batch.len();
        let mut outcomes = Vec::with_capacity(total);

        // 列挙外のモデルは1件も呼び出さずに全件失敗とする
        let model = match model_id.parse::<GeminiModel>() {
            Ok(model) => model,
            Err(e) => {
                warn!(model = model_id, "Rejecting batch with unsupported model");
                let message = ReceiptScanError::from(e).to_string();
                for index in 0..total {
                    let outcome = ScanOutcome::Failure(message.clone());
                    on_outcome(index, &outcome);
                    outcomes.push(outcome);
                }
                return outcomes;
            }
        };

        info!(images = total, model = %model, "Starting batch scan");

        let mut results = pin!(stream::iter(batch.entries.into_iter().enumerate())
            .map(|(index, entry)| self.scan_outcome(index, total, entry, model))
            .buffered(MAX_IN_FLIGHT));

        while let Some(outcome) = results.next().await {
            on_outcome(outcomes.len(), &outcome);
            outcomes.push(outcome);
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!(images = total, succeeded, "Batch scan finished");
        outcomes
    }

    async fn scan_outcome(
        &self,
        index: usize,
        total: usize,
        entry: UploadEntry,
        model: GeminiModel,
    ) -> ScanOutcome {
        let label = entry.display_label(index);
        let capture_date = entry.capture_date();

        match self.scan_entry(entry, model).await {
            Ok(mut data) => {
                if let Some(date) = capture_date {
                    if data.fill_missing_date(date) {
                        debug!(image = %label, "Receipt date taken from capture time");
                    }
                }
                info!(index = index + 1, total, image = %label, "Receipt extracted");
                ScanOutcome::Success(data)
            }
            Err(e) => {
                warn!(index = index + 1, total, image = %label, error = %e, "Receipt extraction failed");
                ScanOutcome::Failure(e.to_string())
            }
        }
    }

    async fn scan_entry(&self, entry: UploadEntry, model: GeminiModel) -> Result<ReceiptData> {
        if let Some(limit) = self.max_image_bytes {
            if entry.bytes.len() > limit {
                return Err(ReceiptScanError::ImageTooLarge {
                    size: entry.bytes.len(),
                    limit,
                });
            }
        }

        let payload = match self.compressor {
            Some(compressor) => {
                let bytes = entry.bytes;
                let compressed = tokio::task::spawn_blocking(move || compressor.compress(&bytes))
                    .await
                    .map_err(|e| {
                        ReceiptScanError::ImageDecode(format!("compression task failed: {}", e))
                    })??;
                let mime_type = compressed.mime_type();
                ImagePayload::new(compressed.bytes, mime_type)
            }
            None => ImagePayload::new(entry.bytes, entry.mime_type),
        };

        self.extractor.extract(&payload, model.id()).await
    }
}
