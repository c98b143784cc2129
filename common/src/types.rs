//! 住所・検証結果・ルートの型定義
//!
//! CLIと将来のフロントエンドで共有される型:
//! - Address: 抽出された配達先住所
//! - ValidationResult: 住所の検証状態
//! - RouteChunk: 最大停車数で分割されたルート区間

use serde::{Deserialize, Serialize};

/// 住所の検証ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    /// 未検証
    #[default]
    Pending,
    /// ジオコーディング問い合わせ中
    Validating,
    /// ジオコーディングで確認済み
    Valid,
    /// 形式チェックで不合格（ジオコーディングには送らない）
    Invalid,
    /// ジオコーディング失敗・該当なし
    Error,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationStatus::Pending => write!(f, "pending"),
            ValidationStatus::Validating => write!(f, "validating"),
            ValidationStatus::Valid => write!(f, "valid"),
            ValidationStatus::Invalid => write!(f, "invalid"),
            ValidationStatus::Error => write!(f, "error"),
        }
    }
}

/// 住所の検証結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub status: ValidationStatus,

    #[serde(default)]
    pub errors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominatim_verified: Option<bool>,

    /// 最終検証時刻（epochミリ秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validated: Option<i64>,
}

impl ValidationResult {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn validating() -> Self {
        Self {
            status: ValidationStatus::Validating,
            ..Default::default()
        }
    }

    /// 形式チェック不合格
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            status: ValidationStatus::Invalid,
            errors,
            ..Default::default()
        }
    }
}

/// 抽出された住所
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub text: String,

    /// 並び順キー（画像番号 * 100 + 画像内の行番号）
    pub order: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// ルートURLで住所文字列ではなく座標を使う
    #[serde(default)]
    pub use_geocode: bool,
}

impl Address {
    /// 未検証状態の住所を作成
    pub fn new(text: impl Into<String>, order: u32) -> Self {
        Self {
            text: text.into(),
            order,
            validation: Some(ValidationResult::pending()),
            ..Default::default()
        }
    }

    pub fn status(&self) -> ValidationStatus {
        self.validation
            .as_ref()
            .map(|v| v.status)
            .unwrap_or_default()
    }

    /// 座標が両方そろっている場合のみ返す
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// ルート区間（最大停車数ごとに分割）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteChunk {
    /// 生成時の0始まりインデックス
    pub id: usize,
    pub url: String,
    pub addresses: Vec<Address>,
    /// 表示用の出発地ラベル
    pub starting_point: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_new_is_pending() {
        let address = Address::new("42 Main St", 3);
        assert_eq!(address.order, 3);
        assert_eq!(address.status(), ValidationStatus::Pending);
        assert!(!address.use_geocode);
        assert!(address.coordinates().is_none());
    }

    #[test]
    fn test_address_serialize_camel_case() {
        let address = Address {
            text: "10 Oak St".to_string(),
            order: 100,
            latitude: Some(43.5),
            longitude: Some(-116.5),
            use_geocode: true,
            ..Default::default()
        };

        let json = serde_json::to_string(&address).expect("シリアライズ失敗");
        assert!(json.contains("\"useGeocode\":true"));
        assert!(json.contains("\"order\":100"));
        assert!(json.contains("\"latitude\":43.5"));
        assert!(!json.contains("validation"));
    }

    #[test]
    fn test_address_deserialize_minimal() {
        let json = r#"{"text": "20 Pine Ave", "order": 101}"#;

        let address: Address = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(address.text, "20 Pine Ave");
        assert_eq!(address.order, 101);
        assert!(address.validation.is_none());
        assert_eq!(address.status(), ValidationStatus::Pending);
    }

    #[test]
    fn test_validation_status_lowercase() {
        let result = ValidationResult {
            status: ValidationStatus::Valid,
            errors: vec![],
            nominatim_verified: Some(true),
            last_validated: Some(1_700_000_000_000),
        };

        let json = serde_json::to_string(&result).expect("シリアライズ失敗");
        assert!(json.contains("\"status\":\"valid\""));
        assert!(json.contains("\"nominatimVerified\":true"));
        assert!(json.contains("\"lastValidated\":1700000000000"));
    }

    #[test]
    fn test_coordinates_requires_both() {
        let address = Address {
            latitude: Some(1.0),
            ..Default::default()
        };
        assert!(address.coordinates().is_none());
    }
}
