use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReceiptScanError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Gemini API key is not set. Set GOOGLE_GEMINI_API_KEY or run `receipt-scan config --set-api-key YOUR_KEY`")]
    MissingApiKey,

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("No images found: {0}")]
    NoImagesFound(String),

    #[error("Could not decode image: {0}")]
    ImageDecode(String),

    #[error("Image is {size} bytes, larger than the {limit} byte limit")]
    ImageTooLarge { size: usize, limit: usize },

    #[error("No response from model")]
    EmptyResponse,

    #[error("Model API call failed: {0}")]
    ApiCall(String),

    #[error("Invalid request data")]
    InvalidRequest { details: Vec<String> },

    #[error("Too many images: at most {max} per scan, {dropped} over the limit")]
    TooManyImages { max: usize, dropped: usize },

    #[error("Request body too large: send at most {max} images per scan")]
    RequestTooLarge { max: usize },

    #[error(transparent)]
    Common(#[from] receipt_scan_common::Error),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReceiptScanError {
    /// 単一項目の不正リクエスト
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        ReceiptScanError::InvalidRequest {
            details: vec![detail.into()],
        }
    }

    /// 抽出前に拒否すべきリクエスト不備か
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            ReceiptScanError::InvalidRequest { .. }
                | ReceiptScanError::TooManyImages { .. }
                | ReceiptScanError::RequestTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReceiptScanError>;
