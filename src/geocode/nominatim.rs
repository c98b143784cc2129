//! Nominatim検索APIクライアント
//!
//! 利用規約により User-Agent が必須。リクエスト間隔は呼び出し側
//! （queue::RateLimitedValidator）で制御する。

use super::{GeocodeSearch, Geocoder};
use crate::error::{RouteAiError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// 検索結果1件（座標は文字列で返る）
#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    lat: Option<serde_json::Value>,
    #[serde(default)]
    lon: Option<serde_json::Value>,
}

/// 文字列・数値のどちらでも有限の数値なら座標として扱う
fn parse_coordinate(value: Option<&serde_json::Value>) -> Option<f64> {
    let parsed = match value? {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        serde_json::Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| RouteAiError::Config(format!("HTTPクライアント作成エラー: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn search(&self, address: &str) -> Result<GeocodeSearch> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", address),
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
            ])
            .send()
            .await
            .map_err(|e| RouteAiError::Geocode(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouteAiError::Geocode(format!(
                "Nominatim API error: {}",
                status.as_u16()
            )));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| RouteAiError::Geocode(format!("Nominatimレスポンス解析エラー: {}", e)))?;

        let first = places.first();
        Ok(GeocodeSearch {
            verified: !places.is_empty(),
            latitude: first.and_then(|p| parse_coordinate(p.lat.as_ref())),
            longitude: first.and_then(|p| parse_coordinate(p.lon.as_ref())),
        })
    }
}
