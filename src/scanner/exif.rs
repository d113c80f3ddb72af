use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDateTime;

/// `display_value()` が返すEXIF日時の書式
const EXIF_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 撮影日時を取得（DateTimeOriginal → DateTime の順）
///
/// EXIFを持たないファイルや読めない日時は None
pub fn extract_captured_at(path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(path).ok()?;
    let mut bufreader = BufReader::new(file);
    let exif = exif::Reader::new()
        .read_from_container(&mut bufreader)
        .ok()?;

    [exif::Tag::DateTimeOriginal, exif::Tag::DateTime]
        .into_iter()
        .filter_map(|tag| exif.get_field(tag, exif::In::PRIMARY))
        .find_map(|field| parse_exif_datetime(&field.display_value().to_string()))
}

fn parse_exif_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, EXIF_DISPLAY_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y:%m:%d %H:%M:%S"))
        .ok()
}
