//! AIレスポンスパーサー
//!
//! 抽出APIのテキスト応答を1行1住所として解釈し、
//! 並び順キー付きの Address に変換する

use crate::types::Address;

/// 住所が見つからなかった場合にAIが返す番兵値
pub const NO_ADDRESSES_FOUND: &str = "NO_ADDRESSES_FOUND";

/// 1画像あたりの並び順キーの幅
pub const ORDER_STRIDE: u32 = 100;

/// AIの応答テキストから住所行だけを取り出す
///
/// 除外する行:
/// - 空行
/// - 番兵値を含む行
/// - 1単語だけの行
/// - 数字で始まらない行（番地がない）
///
/// # Examples
/// ```
/// use route_ai_common::filter_valid_addresses;
///
/// let lines = filter_valid_addresses("10 Oak St\nNAMPA\n20 Pine Ave");
/// assert_eq!(lines, vec!["10 Oak St", "20 Pine Ave"]);
/// assert!(filter_valid_addresses("NO_ADDRESSES_FOUND").is_empty());
/// ```
pub fn filter_valid_addresses(text: &str) -> Vec<String> {
    if text.trim() == NO_ADDRESSES_FOUND {
        return Vec::new();
    }

    text.lines()
        .map(str::trim)
        .filter(|line| {
            if line.is_empty() || line.contains(NO_ADDRESSES_FOUND) {
                return false;
            }
            if line.split(' ').count() == 1 {
                return false;
            }
            line.starts_with(|c: char| c.is_ascii_digit())
        })
        .map(str::to_string)
        .collect()
}

/// 並び順キーを計算（画像番号 * 100 + 行番号）
///
/// 行番号が `ORDER_STRIDE` 以上、または u32 に収まらない場合は None
pub fn order_key(image_index: usize, line_index: usize) -> Option<u32> {
    let line = u32::try_from(line_index).ok().filter(|&line| line < ORDER_STRIDE)?;
    u32::try_from(image_index)
        .ok()?
        .checked_mul(ORDER_STRIDE)?
        .checked_add(line)
}

/// 1画像分の住所行を Address に変換
///
/// キーが次の画像と重ならないよう、先頭 `ORDER_STRIDE` 行までで打ち切る
pub fn addresses_from_lines(lines: &[String], image_index: usize) -> Vec<Address> {
    lines
        .iter()
        .enumerate()
        .map_while(|(line_index, text)| {
            order_key(image_index, line_index).map(|order| Address::new(text.clone(), order))
        })
        .collect()
}

/// 並び順キーでソート
pub fn sort_by_order(addresses: &mut [Address]) {
    addresses.sort_by_key(|a| a.order);
}
