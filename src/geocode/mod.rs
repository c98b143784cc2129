//! ジオコーディングによる住所検証
//!
//! - nominatim: Nominatim検索APIクライアント
//! - queue: リクエスト間隔を保証する直列キュー
//! - validate: 形式チェック → ジオコーディング → 検証ステータス反映

pub mod nominatim;
pub mod queue;
pub mod validate;

pub use nominatim::NominatimClient;
pub use queue::{Clock, PendingValidation, RateLimitedValidator, TokioClock};
pub use validate::{validate_addresses, ValidationSummary};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// ジオコーディング検索結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeSearch {
    /// 1件以上ヒットしたか
    pub verified: bool,
    /// 先頭候補の座標
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// 検証キューが返す結果（エラーも結果として返す）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeOutcome {
    pub verified: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub error: Option<String>,
}

impl GeocodeOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            verified: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

impl From<GeocodeSearch> for GeocodeOutcome {
    fn from(search: GeocodeSearch) -> Self {
        Self {
            verified: search.verified,
            latitude: search.latitude,
            longitude: search.longitude,
            error: None,
        }
    }
}

/// ジオコーディングAPI
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn search(&self, address: &str) -> Result<GeocodeSearch>;
}

#[async_trait]
impl<T: Geocoder + ?Sized> Geocoder for Arc<T> {
    async fn search(&self, address: &str) -> Result<GeocodeSearch> {
        (**self).search(address).await
    }
}
