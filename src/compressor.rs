//! 画像圧縮モジュール
//!
//! 任意形式の画像をデコードし、最大幅まで縮小して
//! 固定品質のJPEGに再エンコードする。モデルには常にJPEGとして渡す。

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;

use crate::error::{ReceiptScanError, Result};

/// 出力形式のMIMEタイプ
pub const OUTPUT_MIME_TYPE: &str = "image/jpeg";

pub const DEFAULT_MAX_WIDTH: u32 = 1024;
pub const DEFAULT_QUALITY: u8 = 80;

#[derive(Debug, Clone, Copy)]
pub struct ImageCompressor {
    max_width: u32,
    quality: u8,
}

/// 圧縮済み画像
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CompressedImage {
    pub fn mime_type(&self) -> &'static str {
        OUTPUT_MIME_TYPE
    }

    fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// プレビュー表示用の Data URL
    pub fn preview_data_url(&self) -> String {
        format!("data:{};base64,{}", OUTPUT_MIME_TYPE, self.to_base64())
    }
}

impl Default for ImageCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WIDTH, DEFAULT_QUALITY)
    }
}

impl ImageCompressor {
    /// `quality` は 1..=100 に丸める
    pub fn new(max_width: u32, quality: u8) -> Self {
        Self {
            max_width: max_width.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// 出力サイズを計算（幅が上限を超える場合のみ縦横比を保って縮小）
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if width <= self.max_width {
            return (width, height);
        }

        let scaled = (height as f64 * self.max_width as f64 / width as f64).round() as u32;
        (self.max_width, scaled.max(1))
    }

    pub fn compress(&self, bytes: &[u8]) -> Result<CompressedImage> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| ReceiptScanError::ImageDecode(e.to_string()))?;

        let (width, height) = img.dimensions();
        let (target_w, target_h) = self.target_dimensions(width, height);

        let img = if (target_w, target_h) == (width, height) {
            img
        } else {
            img.resize_exact(target_w, target_h, FilterType::Triangle)
        };

        // JPEGはアルファ非対応のためRGBに落とす
        let rgb = img.to_rgb8();

        let mut cursor = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut cursor, self.quality)
            .encode_image(&rgb)
            .map_err(|e| ReceiptScanError::ImageDecode(format!("JPEG encoding failed: {}", e)))?;

        Ok(CompressedImage {
            bytes: cursor.into_inner(),
            width: target_w,
            height: target_h,
        })
    }
}
