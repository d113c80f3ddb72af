//! スキャン結果のテキスト表示

use std::fmt::Write;

use receipt_scan_common::{ReceiptData, ScanOutcome};

const MISSING: &str = "-";

/// 1件分の結果を表示用の文字列にする
///
/// 失敗した画像はエラーメッセージを同じ位置に出す。
pub fn render_outcome(index: usize, label: &str, outcome: &ScanOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", index + 1, label);

    match outcome {
        ScanOutcome::Success(data) => render_receipt(&mut out, data),
        ScanOutcome::Failure(error) => {
            let _ = writeln!(out, "  ✘ {}", error);
        }
    }

    out
}

fn render_receipt(out: &mut String, data: &ReceiptData) {
    let _ = writeln!(out, "  店舗: {}", data.store_name.as_deref().unwrap_or(MISSING));
    let _ = writeln!(out, "  日付: {}", data.date.as_deref().unwrap_or(MISSING));
    let _ = writeln!(out, "  分類: {}", data.category_kind());

    if data.items.is_empty() {
        let _ = writeln!(out, "  (品目なし)");
    } else {
        let name_width = data
            .items
            .iter()
            .map(|item| item.name.chars().count())
            .max()
            .unwrap_or(0);

        for item in &data.items {
            let padding = name_width - item.name.chars().count();
            let _ = writeln!(
                out,
                "    {}{}  x{:<3} {:>10}",
                item.name,
                " ".repeat(padding),
                format_quantity(item.quantity),
                format_amount(item.price),
            );
        }
    }

    if let Some(subtotal) = data.subtotal {
        let _ = writeln!(out, "  小計: {}", format_amount(subtotal));
    }
    if let Some(tax) = data.tax {
        let _ = writeln!(out, "  税:   {}", format_amount(tax));
    }
    let _ = writeln!(out, "  合計: {}", format_amount(data.total));
}

pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// 成功・失敗件数の集計行
pub fn render_summary(outcomes: &[ScanOutcome]) -> String {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    format!(
        "{}件中 {}件成功 / {}件失敗",
        outcomes.len(),
        succeeded,
        outcomes.len() - succeeded
    )
}
