//! プロンプト生成モジュール
//!
//! レシート抽出用の固定プロンプト。出力形式・日付形式・カテゴリ・
//! 数値の書式をモデルに指示する

use crate::types::Category;

/// レシート抽出プロンプト生成
///
/// カテゴリ一覧は `Category::ALL` から組み立てるため、
/// 型とプロンプトの集合が食い違うことはない
pub fn build_receipt_prompt() -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Analyze this receipt image and extract the following information as JSON:
- storeName: the name of the store/restaurant (if visible)
- date: the purchase date in YYYY-MM-DD format (if visible, otherwise omit)
- items: array of line items, each with name (string), quantity (number), and price (number: the total price for that line item)
- subtotal: the subtotal amount before tax (if visible, otherwise omit)
- tax: the tax amount (if visible, otherwise omit)
- total: the total amount
- category: exactly one of {categories}

If the receipt has no itemized lines (for example a payment confirmation), return an empty items array.
Return ONLY valid JSON, no markdown or code blocks.
If you can't determine a quantity, default to 1.
Prices should be numbers without currency symbols."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_every_category() {
        let prompt = build_receipt_prompt();
        for category in Category::ALL {
            assert!(prompt.contains(category.as_str()), "missing {}", category);
        }
    }

    #[test]
    fn test_prompt_directives() {
        let prompt = build_receipt_prompt();
        assert!(prompt.contains("YYYY-MM-DD"));
        assert!(prompt.contains("storeName"));
        assert!(prompt.contains("subtotal"));
        assert!(prompt.contains("empty items array"));
        assert!(prompt.contains("no markdown"));
        assert!(prompt.contains("default to 1"));
        assert!(prompt.contains("without currency symbols"));
    }

    #[test]
    fn test_prompt_is_stable() {
        assert_eq!(build_receipt_prompt(), build_receipt_prompt());
    }
}
