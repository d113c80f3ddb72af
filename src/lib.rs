//! レシート画像スキャナ
//!
//! 画像をマルチモーダルモデルに送り、店舗名・日付・明細・合計を
//! 構造化データとして取り出す。CLIとHTTPサーバーの両方から使う。

pub mod batch;
pub mod cli;
pub mod compressor;
pub mod config;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod presenter;
pub mod scanner;
pub mod server;

pub use receipt_scan_common::{
    Category, GeminiModel, ReceiptData, ReceiptItem, ScanOutcome,
};
