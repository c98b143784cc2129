//! プロンプト生成モジュール
//!
//! 抽出プロバイダ（Anthropic/OpenAI）で共有される住所抽出プロンプト

use crate::parser::NO_ADDRESSES_FOUND;

/// 住所抽出プロンプト
///
/// 番地+通り名のみを1行1件で返させ、市名・郵便番号・配達メモは含めない。
pub fn build_extraction_prompt() -> String {
    format!(
        "Extract all delivery addresses from this image. \
Return ONLY the street addresses (number and street name), one per line, in the order they appear. \
Include apartment/unit numbers if present. \
DO NOT include city names, state names, zip codes, timestamps, delivery instructions, or any other information. \
Each line should contain ONLY the street address. \
For example: \"2802 East Comstock Avenue\" not \"2802 East Comstock Avenue, NAMPA\". \
If no addresses are found, return \"{NO_ADDRESSES_FOUND}\"."
    )
}
