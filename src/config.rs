use crate::error::{ReceiptScanError, Result};
use receipt_scan_common::GeminiModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base_url: String,
    /// リクエストでモデル未指定時に使うモデルID
    pub model: String,
    /// 1回のスキャンで受け付ける画像枚数の上限
    pub max_uploads: usize,
    pub max_image_width: u32,
    pub jpeg_quality: u8,
    /// 圧縮前の画像1枚あたりのバイト数上限
    pub max_image_bytes: usize,
    pub timeout_seconds: u64,
    /// サーバー側でもJPEGに再エンコードしてからモデルに送る
    pub recompress_uploads: bool,
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.into(),
            model: GeminiModel::default().id().into(),
            max_uploads: 3,
            max_image_width: 1024,
            jpeg_quality: 80,
            max_image_bytes: 10 * 1024 * 1024,
            timeout_seconds: 60,
            recompress_uploads: true,
            bind_address: "0.0.0.0".into(),
            port: 3000,
            log_level: "info".into(),
        }
    }
}

impl Config {
    /// 設定ファイル → 環境変数の順に読み込み、検証する
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// ファイルの内容だけを読む（環境変数は反映しない）
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str::<Config>(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ReceiptScanError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("receipt-scan").join("config.json"))
    }

    /// 環境変数で上書き
    ///
    /// テストから差し替えられるよう、変数の取得は引数で受け取る
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = var("GOOGLE_GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = var("RECEIPT_SCAN_MODEL") {
            self.model = model;
        }
        if let Some(max) = var("RECEIPT_SCAN_MAX_UPLOADS") {
            self.max_uploads = parse_env("RECEIPT_SCAN_MAX_UPLOADS", &max)?;
        }
        if let Some(bind) = var("RECEIPT_SCAN_BIND") {
            self.bind_address = bind;
        }
        if let Some(port) = var("RECEIPT_SCAN_PORT") {
            self.port = parse_env("RECEIPT_SCAN_PORT", &port)?;
        }
        if let Some(timeout) = var("RECEIPT_SCAN_TIMEOUT") {
            self.timeout_seconds = parse_env("RECEIPT_SCAN_TIMEOUT", &timeout)?;
        }
        if let Some(level) = var("RUST_LOG") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_uploads == 0 {
            return Err(ReceiptScanError::Config("max_uploads must be at least 1".into()));
        }
        if self.max_image_width == 0 {
            return Err(ReceiptScanError::Config("max_image_width must be at least 1".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ReceiptScanError::Config(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        self.default_model()?;
        Ok(())
    }

    pub fn default_model(&self) -> Result<GeminiModel> {
        Ok(self.model.parse::<GeminiModel>()?)
    }

    pub fn get_api_key(&self) -> Result<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ReceiptScanError::MissingApiKey)
    }

    /// 設定ファイルのAPIキーだけを書き換え、保存先を返す
    pub fn store_api_key(key: String) -> Result<PathBuf> {
        let path = Self::config_path()?;
        Self::store_api_key_at(&path, key)?;
        Ok(path)
    }

    pub fn store_api_key_at(path: &Path, key: String) -> Result<()> {
        let mut config = Self::load_from(path)?;
        config.api_key = Some(key);
        config.save_to(path)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ReceiptScanError::Config(format!("{} has an invalid value: {}", name, value)))
}
