//! モデルレスポンスパーサー
//!
//! モデルが返したテキストからコードフェンスを取り除き、
//! JSONとして読んだ上でレシート契約に通す

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::contract::validate_receipt;
use crate::error::{Error, Result};
use crate::types::ReceiptData;

lazy_static! {
    // 開きフェンス（```json / ```JSON / ``` の後の改行まで）
    static ref OPENING_FENCE: Regex = Regex::new(r"^```(?i:json)?[ \t]*\r?\n?").unwrap();
    // 閉じフェンス（直前の改行ごと）
    static ref CLOSING_FENCE: Regex = Regex::new(r"\r?\n?```$").unwrap();
}

/// 前後のコードフェンスを除去
///
/// 開き・閉じのどちらか一方だけでも、両方無くても扱える。
/// フェンスが無いテキストは前後の空白除去のみ。
///
/// # Examples
/// ```
/// use receipt_scan_common::strip_code_fences;
///
/// assert_eq!(strip_code_fences("```json\n{\"total\": 1}\n```"), "{\"total\": 1}");
/// assert_eq!(strip_code_fences("  {\"total\": 1}  "), "{\"total\": 1}");
/// ```
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = match OPENING_FENCE.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    };
    let text = match CLOSING_FENCE.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    };
    text.trim()
}

/// モデルのレスポンスをレシートデータに変換
///
/// 1. 前後空白とコードフェンスを除去
/// 2. JSONとしてパース（失敗は `Error::Parse`）
/// 3. レシート契約で検証（失敗は `Error::Schema`）
pub fn parse_receipt_response(response: &str) -> Result<ReceiptData> {
    let cleaned = strip_code_fences(response);

    let value: Value = serde_json::from_str(cleaned).map_err(|e| Error::Parse(e.to_string()))?;

    validate_receipt(value)
}
