//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    /// フェンス除去後のテキストがJSONとして読めない
    #[error("Model returned malformed JSON: {0}")]
    Parse(String),

    /// JSONとしては読めたがレシートの契約を満たさない
    #[error("Receipt data failed validation: {0}")]
    Schema(String),

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
