//! ルート分割とGoogle Maps URL生成
//!
//! Google Mapsの経路URLは経由地の数に上限があるため、住所リストを
//! 最大停車数ごとの区間に分割する。2区間目以降は前区間の最終住所から出発する。

use crate::types::{Address, RouteChunk};
use std::collections::HashSet;

/// 1区間あたりの最大停車数
pub const MAX_STOPS_PER_ROUTE: usize = 10;

/// Google Maps 経路URL（Maps URLs API）
pub const GOOGLE_MAPS_DIR_URL: &str = "https://www.google.com/maps/dir/?api=1";

/// 現在地が不明なときの出発地プレースホルダ
pub const CURRENT_LOCATION_ORIGIN: &str = "My+Location";

/// 現在地から出発する区間の表示ラベル
pub const CURRENT_LOCATION_LABEL: &str = "Your Current Location";

/// ルートURLのオプション
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// 高速道路を避ける
    pub avoid_highways: bool,
}

/// 座標を "lat,lng" 形式に変換
pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    format!("{},{}", latitude, longitude)
}

/// 住所1件をURLパラメータ用にエンコード
///
/// 座標優先フラグがあり座標がそろっていれば "lat,lng"、
/// それ以外は住所文字列をフォームエンコード（空白は `+`）する。
pub fn encode_address(address: &Address) -> String {
    if address.use_geocode {
        if let Some((lat, lng)) = address.coordinates() {
            return format_coordinates(lat, lng);
        }
    }
    url::form_urlencoded::byte_serialize(address.text.as_bytes()).collect()
}

/// 現在地の出発地パラメータ
pub fn current_location_origin(latitude: Option<f64>, longitude: Option<f64>) -> String {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => format_coordinates(lat, lng),
        _ => CURRENT_LOCATION_ORIGIN.to_string(),
    }
}

/// 経路URLを生成
///
/// 最後の住所が目的地、それ以外が経由地（`|` 区切り）になる。
/// 住所が空の場合は None。
pub fn build_maps_url(origin: &str, stops: &[Address], options: &RouteOptions) -> Option<String> {
    let (destination, waypoints) = stops.split_last()?;

    let mut url = format!(
        "{}&origin={}&destination={}",
        GOOGLE_MAPS_DIR_URL,
        origin,
        encode_address(destination)
    );

    if !waypoints.is_empty() {
        let joined = waypoints
            .iter()
            .map(encode_address)
            .collect::<Vec<_>>()
            .join("|");
        url.push_str("&waypoints=");
        url.push_str(&joined);
    }

    url.push_str("&travelmode=driving");

    if options.avoid_highways {
        url.push_str("&avoid=highways");
    }

    Some(url)
}

/// 住所リストをルート区間に分割
///
/// - 空リスト → 区間なし
/// - 最大停車数以下 → 現在地から出発する1区間
/// - 超過 → 最大停車数ごとに分割し、2区間目以降は前区間の最終住所から出発
///
/// 入力に対する純粋関数で、呼び出しのたびに全体を再構築する。
pub fn build_route_chunks(
    addresses: &[Address],
    latitude: Option<f64>,
    longitude: Option<f64>,
    options: &RouteOptions,
) -> Vec<RouteChunk> {
    let mut chunks = Vec::new();
    let mut previous_last: Option<&Address> = None;

    for (id, window) in addresses.chunks(MAX_STOPS_PER_ROUTE).enumerate() {
        let (origin, starting_point) = match previous_last {
            Some(prev) => (encode_address(prev), prev.text.clone()),
            None => (
                current_location_origin(latitude, longitude),
                CURRENT_LOCATION_LABEL.to_string(),
            ),
        };

        // chunks() は空スライスを返さないので URL は必ず生成される
        let Some(url) = build_maps_url(&origin, window, options) else {
            continue;
        };

        chunks.push(RouteChunk {
            id,
            url,
            addresses: window.to_vec(),
            starting_point,
        });

        previous_last = window.last();
    }

    chunks
}

/// 削除済みの区間を除外（IDは振り直さない）
pub fn visible_chunks<'a>(chunks: &'a [RouteChunk], excluded: &HashSet<usize>) -> Vec<&'a RouteChunk> {
    chunks
        .iter()
        .filter(|chunk| !excluded.contains(&chunk.id))
        .collect()
}
