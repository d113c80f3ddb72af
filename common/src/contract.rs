//! レシートデータ契約（検証と型変換）
//!
//! モデル出力のJSON値を `ReceiptData` に変換する。
//! - 数値項目は数値または数値文字列（"12.50"）を受け付ける
//! - `total` は必須。欠落・非数値は常にスキーマエラー
//! - `items` 欠落（または null）は空配列
//! - 任意項目の null は未設定扱い
//! - 1項目でも不正ならレシート全体を不合格にする

use std::fmt;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{ReceiptData, ReceiptItem};

/// 構造化済みの値をレシート契約で検証
///
/// # Examples
/// ```
/// use receipt_scan_common::validate_receipt;
///
/// let value = serde_json::json!({"total": "12.50"});
/// let receipt = validate_receipt(value).unwrap();
/// assert_eq!(receipt.total, 12.5);
/// assert!(receipt.items.is_empty());
/// ```
pub fn validate_receipt(value: Value) -> Result<ReceiptData> {
    if !value.is_object() {
        return Err(Error::Schema(format!(
            "expected a JSON object, got {}",
            describe(&value)
        )));
    }

    serde_json::from_value(value).map_err(|e| Error::Schema(e.to_string()))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// 数値文字列を数値に変換（前後空白は無視、NaN/無限大は不可）
pub fn coerce_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

pub(crate) fn default_quantity() -> f64 {
    1.0
}

struct NumberVisitor;

impl<'de> Visitor<'de> for NumberVisitor {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<f64, E> {
        if v.is_finite() {
            Ok(v)
        } else {
            Err(E::invalid_value(Unexpected::Float(v), &self))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<f64, E> {
        coerce_number(v).ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
    }
}

struct OptionalNumberVisitor;

impl<'de> Visitor<'de> for OptionalNumberVisitor {
    type Value = Option<f64>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number, a numeric string or null")
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Option<f64>, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Option<f64>, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<Option<f64>, D::Error> {
        number(d).map(Some)
    }
}

/// 必須の数値項目
pub(crate) fn number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    d.deserialize_any(NumberVisitor)
}

/// 任意の数値項目（null は未設定）
pub(crate) fn optional_number<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<f64>, D::Error> {
    d.deserialize_option(OptionalNumberVisitor)
}

/// 数量（null は既定値1）
pub(crate) fn quantity<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    Ok(optional_number(d)?.unwrap_or_else(default_quantity))
}

/// 明細配列（null は空配列）
pub(crate) fn items<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Vec<ReceiptItem>, D::Error> {
    Ok(Option::<Vec<ReceiptItem>>::deserialize(d)?.unwrap_or_default())
}
