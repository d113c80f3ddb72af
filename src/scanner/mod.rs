//! CLIに渡されたパスからレシート画像を集める

mod exif;

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use walkdir::WalkDir;

use crate::error::{ReceiptScanError, Result};

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub captured_at: Option<NaiveDateTime>,
}

impl ImageInfo {
    fn from_path(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            file_name,
            captured_at: exif::extract_captured_at(path),
        }
    }

    /// 拡張子から推定したMIMEタイプ
    pub fn mime_type(&self) -> &'static str {
        mime_type_for(&self.path).unwrap_or("application/octet-stream")
    }
}

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
];

pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// ファイルはそのまま、フォルダは中の画像を列挙する
///
/// 引数の順序を保ち、フォルダ内はファイル名順。
/// 存在しないパスがあればエラー。
pub fn scan_paths(paths: &[PathBuf], recursive: bool) -> Result<Vec<ImageInfo>> {
    let mut images = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(ReceiptScanError::FileNotFound(path.display().to_string()));
        }

        if path.is_file() {
            images.push(ImageInfo::from_path(path));
        } else {
            images.extend(scan_folder(path, recursive));
        }
    }

    if images.is_empty() {
        let joined = paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ReceiptScanError::NoImagesFound(joined));
    }

    Ok(images)
}

fn scan_folder(folder: &Path, recursive: bool) -> Vec<ImageInfo> {
    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut images: Vec<ImageInfo> = WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && mime_type_for(e.path()).is_some())
        .map(|e| ImageInfo::from_path(e.path()))
        .collect();

    images.sort_by(|a, b| a.path.cmp(&b.path));
    images
}
