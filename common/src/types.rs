//! レシート解析結果の型定義
//!
//! サーバーとCLIで共有される型:
//! - ReceiptItem: 明細1行
//! - ReceiptData: 1枚のレシートから抽出した構造化データ
//! - Category: 支出カテゴリ（閉じた集合）
//! - ScanOutcome: 画像1枚ごとの成功/失敗

use serde::de::{self, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::contract;

/// 明細1行
///
/// `price` は単価ではなくその行の合計金額。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub name: String,

    #[serde(default = "contract::default_quantity", deserialize_with = "contract::quantity")]
    pub quantity: f64,

    #[serde(deserialize_with = "contract::number")]
    pub price: f64,
}

/// レシート1枚分の抽出結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,

    /// `YYYY-MM-DD` 形式の文字列（日付型には変換しない）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// 集合外の値も保持する。表示側で `category_kind()` を使う
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, deserialize_with = "contract::items")]
    pub items: Vec<ReceiptItem>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "contract::optional_number"
    )]
    pub subtotal: Option<f64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "contract::optional_number"
    )]
    pub tax: Option<f64>,

    #[serde(deserialize_with = "contract::number")]
    pub total: f64,
}

impl ReceiptData {
    /// 合計のみのレシート
    pub fn with_total(total: f64) -> Self {
        Self {
            store_name: None,
            date: None,
            category: None,
            items: Vec::new(),
            subtotal: None,
            tax: None,
            total,
        }
    }

    /// カテゴリを閉じた集合に写像（未知の値・未設定は Other）
    pub fn category_kind(&self) -> Category {
        self.category
            .as_deref()
            .map(Category::from_label)
            .unwrap_or(Category::Other)
    }

    /// 日付が無い場合のみ撮影日で補完する
    ///
    /// 空文字の日付は未設定として扱う。補完した場合 true を返す。
    pub fn fill_missing_date(&mut self, date: impl Into<String>) -> bool {
        let missing = self
            .date
            .as_deref()
            .map(|d| d.trim().is_empty())
            .unwrap_or(true);

        if missing {
            self.date = Some(date.into());
        }
        missing
    }
}

/// 支出カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Health,
    Transport,
    Utilities,
    Bills,
    Shopping,
    Entertainment,
    Education,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Food,
        Category::Health,
        Category::Transport,
        Category::Utilities,
        Category::Bills,
        Category::Shopping,
        Category::Entertainment,
        Category::Education,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Health => "Health",
            Category::Transport => "Transport",
            Category::Utilities => "Utilities",
            Category::Bills => "Bills",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Education => "Education",
            Category::Other => "Other",
        }
    }

    /// ラベルから変換（大文字小文字・前後空白は無視、未知の値は Other）
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
            .unwrap_or(Category::Other)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 画像1枚ごとの解析結果
///
/// JSON上は `{"success": true, "data": {...}}` または
/// `{"success": false, "error": "..."}` の形になる。
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Success(ReceiptData),
    Failure(String),
}

impl ScanOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ScanOutcome::Success(_))
    }

    pub fn data(&self) -> Option<&ReceiptData> {
        match self {
            ScanOutcome::Success(data) => Some(data),
            ScanOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ScanOutcome::Success(_) => None,
            ScanOutcome::Failure(message) => Some(message),
        }
    }
}

impl Serialize for ScanOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ScanOutcome", 2)?;
        match self {
            ScanOutcome::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            ScanOutcome::Failure(message) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", message)?;
            }
        }
        state.end()
    }
}

#[derive(Deserialize)]
struct WireOutcome {
    success: bool,
    #[serde(default)]
    data: Option<ReceiptData>,
    #[serde(default)]
    error: Option<String>,
}

impl<'de> Deserialize<'de> for ScanOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireOutcome::deserialize(deserializer)?;
        match (wire.success, wire.data, wire.error) {
            (true, Some(data), _) => Ok(ScanOutcome::Success(data)),
            (true, None, _) => Err(de::Error::missing_field("data")),
            (false, _, Some(error)) => Ok(ScanOutcome::Failure(error)),
            (false, _, None) => Err(de::Error::missing_field("error")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_data_serialize_camel_case() {
        let data = ReceiptData {
            store_name: Some("Corner Cafe".to_string()),
            subtotal: Some(8.0),
            ..ReceiptData::with_total(9.5)
        };

        let json = serde_json::to_string(&data).expect("シリアライズ失敗");
        assert!(json.contains("\"storeName\":\"Corner Cafe\""));
        assert!(json.contains("\"subtotal\":8.0"));
        assert!(json.contains("\"total\":9.5"));
        assert!(json.contains("\"items\":[]"));
        // 未設定の任意項目は出力しない
        assert!(!json.contains("tax"));
        assert!(!json.contains("date"));
    }

    #[test]
    fn test_category_from_label() {
        assert_eq!(Category::from_label("Food"), Category::Food);
        assert_eq!(Category::from_label(" transport "), Category::Transport);
        assert_eq!(Category::from_label("Groceries"), Category::Other);
        assert_eq!(Category::from_label(""), Category::Other);
    }

    #[test]
    fn test_category_kind_unknown_is_other() {
        let mut data = ReceiptData::with_total(1.0);
        assert_eq!(data.category_kind(), Category::Other);

        data.category = Some("Health".to_string());
        assert_eq!(data.category_kind(), Category::Health);

        data.category = Some("Pets".to_string());
        assert_eq!(data.category_kind(), Category::Other);
        // 元の値は保持される
        assert_eq!(data.category.as_deref(), Some("Pets"));
    }

    #[test]
    fn test_fill_missing_date() {
        let mut data = ReceiptData::with_total(1.0);
        assert!(data.fill_missing_date("2025-03-01"));
        assert_eq!(data.date.as_deref(), Some("2025-03-01"));

        // 二度目は上書きしない
        assert!(!data.fill_missing_date("2025-04-01"));
        assert_eq!(data.date.as_deref(), Some("2025-03-01"));
    }

    #[test]
    fn test_fill_missing_date_blank_counts_as_missing() {
        let mut data = ReceiptData {
            date: Some("  ".to_string()),
            ..ReceiptData::with_total(1.0)
        };
        assert!(data.fill_missing_date("2025-03-01"));
        assert_eq!(data.date.as_deref(), Some("2025-03-01"));
    }

    #[test]
    fn test_scan_outcome_serialize() {
        let ok = ScanOutcome::Success(ReceiptData::with_total(9.5));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["total"], 9.5);

        let failed = ScanOutcome::Failure("No response from model".to_string());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No response from model");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_scan_outcome_deserialize() {
        let outcomes: Vec<ScanOutcome> = serde_json::from_str(
            r#"[
                {"success": true, "data": {"total": 3, "items": []}},
                {"success": false, "error": "boom"}
            ]"#,
        )
        .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].data().map(|d| d.total), Some(3.0));
        assert_eq!(outcomes[1].error(), Some("boom"));
    }

    #[test]
    fn test_scan_outcome_deserialize_missing_payload() {
        let result = serde_json::from_str::<ScanOutcome>(r#"{"success": true}"#);
        assert!(result.is_err());
    }
}
