//! Receipt Scan Common Library
//!
//! サーバーとCLIで共有される型・データ契約・レスポンスパーサー

pub mod types;
pub mod contract;
pub mod error;
pub mod parser;
pub mod prompts;
pub mod models;

pub use types::{Category, ReceiptData, ReceiptItem, ScanOutcome};
pub use contract::{coerce_number, validate_receipt};
pub use error::{Error, Result};
pub use parser::{parse_receipt_response, strip_code_fences};
pub use prompts::build_receipt_prompt;
pub use models::GeminiModel;
