//! 住所の形式チェック
//!
//! ジオコーディング（レート制限あり）に送る前の簡易チェック。
//! OCR/LLMのゴミ行を弾くためのもので、住所として正しいかは判定しない。

use crate::types::{Address, ValidationStatus};
use regex::Regex;

pub const ERROR_EMPTY: &str = "Address is empty";
pub const ERROR_TOO_SHORT: &str = "Address too short";
pub const ERROR_MISSING_HOUSE_NUMBER: &str = "Missing house number";
pub const ERROR_MISSING_STREET_NAME: &str = "Missing street name";

/// 最小文字数
const MIN_ADDRESS_LENGTH: usize = 5;

lazy_static::lazy_static! {
    static ref DIGIT_RE: Regex = Regex::new(r"[0-9]").unwrap();
    static ref ONLY_DIGITS_RE: Regex = Regex::new(r"^[0-9]+$").unwrap();
}

/// 住所文字列を形式チェックする
///
/// 空文字の場合のみ即座に返し、それ以外のルールはすべて評価する。
///
/// # Returns
/// エラーメッセージの配列（空なら合格）
///
/// # Examples
/// ```
/// use route_ai_common::validate_address_basic;
///
/// assert_eq!(validate_address_basic(""), vec!["Address is empty"]);
/// assert!(validate_address_basic("42 Main St").is_empty());
/// ```
pub fn validate_address_basic(text: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let trimmed = text.trim();

    if trimmed.is_empty() {
        errors.push(ERROR_EMPTY.to_string());
        return errors;
    }

    if trimmed.chars().count() < MIN_ADDRESS_LENGTH {
        errors.push(ERROR_TOO_SHORT.to_string());
    }

    // 番地（数字）が必要
    if !DIGIT_RE.is_match(trimmed) {
        errors.push(ERROR_MISSING_HOUSE_NUMBER.to_string());
    }

    // 数字だけでは通り名がない
    if ONLY_DIGITS_RE.is_match(trimmed) {
        errors.push(ERROR_MISSING_STREET_NAME.to_string());
    }

    errors
}

/// ジオコーディングで確認済みかどうか
pub fn is_address_valid(address: &Address) -> bool {
    address.status() == ValidationStatus::Valid
}
