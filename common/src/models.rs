//! 利用可能なGeminiモデル
//!
//! 列挙外のIDはAPI呼び出し前に `Error::UnsupportedModel` で拒否する

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GeminiModel {
    #[serde(rename = "gemini-3-flash-preview")]
    Gemini3FlashPreview,
    #[default]
    #[serde(rename = "gemini-2.5-flash")]
    Gemini25Flash,
    #[serde(rename = "gemini-2.0-flash")]
    Gemini20Flash,
    #[serde(rename = "gemini-1.5-flash")]
    Gemini15Flash,
    #[serde(rename = "gemini-1.5-flash-8b")]
    Gemini15Flash8b,
}

impl GeminiModel {
    pub const ALL: [GeminiModel; 5] = [
        GeminiModel::Gemini3FlashPreview,
        GeminiModel::Gemini25Flash,
        GeminiModel::Gemini20Flash,
        GeminiModel::Gemini15Flash,
        GeminiModel::Gemini15Flash8b,
    ];

    /// APIに渡すモデルID
    pub fn id(&self) -> &'static str {
        match self {
            GeminiModel::Gemini3FlashPreview => "gemini-3-flash-preview",
            GeminiModel::Gemini25Flash => "gemini-2.5-flash",
            GeminiModel::Gemini20Flash => "gemini-2.0-flash",
            GeminiModel::Gemini15Flash => "gemini-1.5-flash",
            GeminiModel::Gemini15Flash8b => "gemini-1.5-flash-8b",
        }
    }

    /// 表示名
    pub fn label(&self) -> &'static str {
        match self {
            GeminiModel::Gemini3FlashPreview => "Gemini 3 Flash (Preview)",
            GeminiModel::Gemini25Flash => "Gemini 2.5 Flash",
            GeminiModel::Gemini20Flash => "Gemini 2.0 Flash (Deprecated)",
            GeminiModel::Gemini15Flash => "Gemini 1.5 Flash",
            GeminiModel::Gemini15Flash8b => "Gemini 1.5 Flash 8B",
        }
    }
}

impl FromStr for GeminiModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.id() == s)
            .ok_or_else(|| Error::UnsupportedModel(s.to_string()))
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
