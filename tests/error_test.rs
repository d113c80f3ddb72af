//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use receipt_scan::error::ReceiptScanError;
use receipt_scan::scanner;
use receipt_scan_common::{parse_receipt_response, Error as CommonError};
use std::path::PathBuf;
use tempfile::tempdir;

/// 存在しないパスをスキャンした場合
#[test]
fn test_scan_nonexistent_path() {
    let result = scanner::scan_paths(&[PathBuf::from("/nonexistent/path/12345")], false);
    assert!(matches!(result, Err(ReceiptScanError::FileNotFound(_))));
}

/// 画像のないフォルダをスキャンした場合
#[test]
fn test_scan_folder_no_images() {
    let dir = tempdir().expect("Failed to create temp dir");

    // テキストファイルのみ作成
    std::fs::write(dir.path().join("test.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("data.json"), "{}").unwrap();

    let result = scanner::scan_paths(&[dir.path().to_path_buf()], false);
    assert!(matches!(result, Err(ReceiptScanError::NoImagesFound(_))));
}

/// ReceiptScanErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        ReceiptScanError::Config("テスト設定エラー".to_string()),
        ReceiptScanError::MissingApiKey,
        ReceiptScanError::FileNotFound("test.jpg".to_string()),
        ReceiptScanError::NoImagesFound("フォルダ".to_string()),
        ReceiptScanError::ImageDecode("truncated".to_string()),
        ReceiptScanError::ImageTooLarge { size: 20, limit: 10 },
        ReceiptScanError::EmptyResponse,
        ReceiptScanError::ApiCall("HTTP 500".to_string()),
        ReceiptScanError::invalid_request("images: field is required"),
        ReceiptScanError::TooManyImages { max: 3, dropped: 1 },
        ReceiptScanError::RequestTooLarge { max: 3 },
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "Error display should not be empty");
    }
}

#[test]
fn test_request_errors() {
    assert!(ReceiptScanError::invalid_request("x").is_request_error());
    assert!(ReceiptScanError::TooManyImages { max: 3, dropped: 2 }.is_request_error());
    assert!(ReceiptScanError::RequestTooLarge { max: 3 }.is_request_error());
    assert!(!ReceiptScanError::EmptyResponse.is_request_error());
    assert!(!ReceiptScanError::ApiCall("timeout".to_string()).is_request_error());
}

/// 解析エラーは共通クレートのメッセージをそのまま表示する
#[test]
fn test_common_errors_are_transparent() {
    let err: ReceiptScanError = parse_receipt_response("not json").unwrap_err().into();
    assert!(err.to_string().starts_with("Model returned malformed JSON"));

    let err: ReceiptScanError = parse_receipt_response(r#"{"items":[]}"#).unwrap_err().into();
    assert!(matches!(err, ReceiptScanError::Common(CommonError::Schema(_))));
    assert!(err.to_string().contains("total"));
}
