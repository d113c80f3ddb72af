//! スキャンリクエストの検証
//!
//! 不正なリクエストは抽出を1件も行わずに 400 で拒否する。
//! 項目ごとの不備はまとめて `details` に載せる。

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::batch::UploadEntry;
use crate::error::{ReceiptScanError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[serde(default)]
    pub images: Option<Vec<ImageUpload>>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpload {
    /// Base64、または `data:image/...;base64,` 形式の Data URL
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub captured_at: Option<CapturedAt>,
}

/// 撮影日時（RFC 3339 文字列、またはエポックミリ秒）
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CapturedAt {
    Millis(i64),
    Text(String),
}

impl CapturedAt {
    /// 撮影地のローカル日時に変換
    ///
    /// オフセット付き文字列はその地域の時刻、エポックミリ秒はUTCとして扱う
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        match self {
            CapturedAt::Millis(ms) => DateTime::from_timestamp_millis(*ms).map(|t| t.naive_utc()),
            CapturedAt::Text(text) => {
                let text = text.trim();
                DateTime::parse_from_rfc3339(text)
                    .map(|t| t.naive_local())
                    .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
                    .ok()
                    .or_else(|| {
                        NaiveDate::parse_from_str(text, "%Y-%m-%d")
                            .ok()
                            .and_then(|d| d.and_hms_opt(0, 0, 0))
                    })
            }
        }
    }
}

impl ScanRequest {
    pub fn image_count(&self) -> usize {
        self.images.as_ref().map(Vec::len).unwrap_or(0)
    }

    /// 空白のみのモデル指定は未指定として扱う
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(default)
    }

    /// 各画像を検証してアップロード項目に変換
    pub fn into_entries(self) -> Result<Vec<UploadEntry>> {
        let images = self.images.ok_or_else(|| {
            ReceiptScanError::invalid_request("images: field is required")
        })?;

        let mut details = Vec::new();
        let mut entries = Vec::with_capacity(images.len());

        for (index, upload) in images.into_iter().enumerate() {
            match upload.into_entry(index) {
                Ok(entry) => entries.push(entry),
                Err(mut problems) => details.append(&mut problems),
            }
        }

        if details.is_empty() {
            Ok(entries)
        } else {
            Err(ReceiptScanError::InvalidRequest { details })
        }
    }
}

impl ImageUpload {
    fn into_entry(self, index: usize) -> std::result::Result<UploadEntry, Vec<String>> {
        let field = |name: &str| format!("images[{}].{}", index, name);
        let mut problems = Vec::new();

        let bytes = match self.image.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => {
                problems.push(format!("{} is required", field("image")));
                None
            }
            Some(image) => match decode_image_data(image) {
                Ok(bytes) if bytes.is_empty() => {
                    problems.push(format!("{} is empty", field("image")));
                    None
                }
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    problems.push(format!("{} is not valid base64: {}", field("image"), e));
                    None
                }
            },
        };

        let mime_type = match self.mime_type.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => {
                problems.push(format!("{} is required", field("mimeType")));
                None
            }
            Some(mime) if !mime.to_ascii_lowercase().starts_with("image/") => {
                problems.push(format!("{} must be an image type, got {}", field("mimeType"), mime));
                None
            }
            Some(mime) => Some(mime.to_string()),
        };

        let captured_at = match &self.captured_at {
            None => None,
            Some(raw) => match raw.to_naive() {
                Some(t) => Some(t),
                None => {
                    problems.push(format!("{} is not a valid timestamp", field("capturedAt")));
                    None
                }
            },
        };

        match (bytes, mime_type) {
            (Some(bytes), Some(mime_type)) if problems.is_empty() => {
                let mut entry = UploadEntry::new(bytes, mime_type);
                entry.captured_at = captured_at;
                Ok(entry)
            }
            _ => Err(problems),
        }
    }
}

/// Data URL 形式ならヘッダ部分を取り除いてデコード
fn decode_image_data(image: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let data = if image.starts_with("data:") {
        image.split_once(',').map(|(_, data)| data).unwrap_or("")
    } else {
        image
    };
    let data: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(data)
}
