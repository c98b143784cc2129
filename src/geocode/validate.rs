//! 住所リストの一括検証
//!
//! 1. 形式チェック（番地・通り名・長さ）で不合格なら invalid、ジオコーディングしない
//! 2. 合格した住所を validating にしてキューへ投入
//! 3. 結果が返った順に valid / error を反映

use super::queue::{Clock, RateLimitedValidator};
use super::{GeocodeOutcome, Geocoder};
use route_ai_common::address_list::apply_validation;
use route_ai_common::{validate_address_basic, Address, ValidationResult, ValidationStatus};
use tokio::task::JoinSet;

/// ジオコーディングで該当なしの場合のエラー文言
pub const ERROR_NOT_FOUND: &str = "Address not found";

/// 検証結果の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub valid: usize,
    pub invalid: usize,
    pub error: usize,
    pub pending: usize,
}

impl ValidationSummary {
    pub fn from_addresses(addresses: &[Address]) -> Self {
        let mut summary = Self::default();
        for address in addresses {
            match address.status() {
                ValidationStatus::Valid => summary.valid += 1,
                ValidationStatus::Invalid => summary.invalid += 1,
                ValidationStatus::Error => summary.error += 1,
                ValidationStatus::Pending | ValidationStatus::Validating => summary.pending += 1,
            }
        }
        summary
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// ジオコーディング結果を検証結果に変換
pub fn outcome_to_validation(outcome: &GeocodeOutcome) -> ValidationResult {
    let last_validated = Some(now_millis());

    if outcome.verified {
        return ValidationResult {
            status: ValidationStatus::Valid,
            errors: Vec::new(),
            nominatim_verified: Some(true),
            last_validated,
        };
    }

    match &outcome.error {
        Some(error) => ValidationResult {
            status: ValidationStatus::Error,
            errors: vec![error.clone()],
            nominatim_verified: None,
            last_validated,
        },
        None => ValidationResult {
            status: ValidationStatus::Error,
            errors: vec![ERROR_NOT_FOUND.to_string()],
            nominatim_verified: Some(false),
            last_validated,
        },
    }
}

/// 形式チェックのみ実施
///
/// 不合格の住所を invalid にし、合格した住所の並び順キーを返す。
/// 合格した住所の状態は変更しない。
pub fn apply_basic_validation(addresses: &mut [Address]) -> Vec<u32> {
    let mut passed = Vec::new();

    for address in addresses.iter_mut() {
        let errors = validate_address_basic(&address.text);
        if errors.is_empty() {
            passed.push(address.order);
        } else {
            let mut result = ValidationResult::invalid(errors);
            result.last_validated = Some(now_millis());
            address.validation = Some(result);
        }
    }

    passed
}

/// 住所リストを検証
///
/// `on_update` は住所1件の検証が確定するたびに呼ばれる。
pub async fn validate_addresses<G, C>(
    addresses: &mut [Address],
    validator: &RateLimitedValidator<G, C>,
    mut on_update: impl FnMut(&Address),
) -> ValidationSummary
where
    G: Geocoder + 'static,
    C: Clock + 'static,
{
    let passed = apply_basic_validation(addresses);

    for address in addresses.iter().filter(|a| a.status() == ValidationStatus::Invalid) {
        on_update(address);
    }

    let mut tasks = JoinSet::new();
    for address in addresses.iter_mut().filter(|a| passed.contains(&a.order)) {
        address.validation = Some(ValidationResult::validating());
        let order = address.order;
        let pending = validator.enqueue(address.text.clone());
        tasks.spawn(async move { (order, pending.outcome().await) });
    }

    while let Some(joined) = tasks.join_next().await {
        let (order, outcome) = match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("検証タスク異常終了: {}", e);
                continue;
            }
        };

        let validation = outcome_to_validation(&outcome);
        let coordinates = if outcome.verified { outcome.coordinates() } else { None };

        if let Err(e) = apply_validation(addresses, order, validation, coordinates) {
            tracing::warn!("検証結果の反映に失敗: {}", e);
            continue;
        }
        if let Some(address) = addresses.iter().find(|a| a.order == order) {
            on_update(address);
        }
    }

    ValidationSummary::from_addresses(addresses)
}
