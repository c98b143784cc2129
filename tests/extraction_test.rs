//! 住所抽出の統合テスト
//!
//! 抽出APIを差し替えて、順次処理・並び順キー・進捗・中断・キャッシュを検証

use async_trait::async_trait;
use route_ai_common::{ValidationStatus, ORDER_STRIDE};
use route_ai_rust::error::{Result, RouteAiError};
use route_ai_rust::extractor::{extract_addresses_from_images, AddressExtractor, CacheFile, ImagePayload};
use route_ai_rust::geocode::{validate_addresses, GeocodeSearch, Geocoder, RateLimitedValidator};
use route_ai_rust::scanner::{self, ImageInfo};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::tempdir;

/// ファイル名ごとに決まった応答を返す抽出クライアント
struct ScriptedExtractor {
    /// 応答テキスト、または失敗時のHTTPステータス
    responses: HashMap<String, std::result::Result<String, u16>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    fn new(responses: Vec<(&str, std::result::Result<String, u16>)>) -> Self {
        Self {
            responses: responses
                .into_iter()
                .map(|(name, response)| (name.to_string(), response))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AddressExtractor for ScriptedExtractor {
    async fn extract_text(&self, image: &ImagePayload) -> Result<String> {
        self.calls.lock().unwrap().push(image.file_name.clone());
        match self.responses.get(&image.file_name) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(status)) => Err(RouteAiError::from_api_status(*status, "scripted failure")),
            None => Ok(String::new()),
        }
    }
}

/// 常にヒットするジオコーダ
struct AlwaysFound;

#[async_trait]
impl Geocoder for AlwaysFound {
    async fn search(&self, _address: &str) -> Result<GeocodeSearch> {
        Ok(GeocodeSearch {
            verified: true,
            latitude: Some(43.6),
            longitude: Some(-116.2),
        })
    }
}

/// ダミー画像ファイルを作成（デコードできないので縮小されずにそのまま送られる）
fn make_images(dir: &Path, names: &[&str]) -> Vec<ImageInfo> {
    let paths: Vec<_> = names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, format!("fake image {}", name)).unwrap();
            path
        })
        .collect();
    scanner::scan_inputs(&paths, false).unwrap()
}

/// 2枚の画像: 並び順キーは画像番号*100+行番号
#[tokio::test]
async fn test_two_images_order_keys() {
    let dir = tempdir().unwrap();
    let images = make_images(dir.path(), &["a.png", "b.png"]);
    let extractor = ScriptedExtractor::new(vec![
        ("a.png", Ok("10 Oak St".to_string())),
        ("b.png", Ok("20 Pine Ave\n30 Elm Rd".to_string())),
    ]);

    let addresses = extract_addresses_from_images(&extractor, &images, 1568, None, |_| {})
        .await
        .unwrap();

    let summary: Vec<(u32, &str)> = addresses.iter().map(|a| (a.order, a.text.as_str())).collect();
    assert_eq!(
        summary,
        vec![
            (0, "10 Oak St"),
            (100, "20 Pine Ave"),
            (101, "30 Elm Rd"),
        ]
    );
    assert!(addresses.iter().all(|a| a.status() == ValidationStatus::Pending));
    assert_eq!(extractor.calls(), vec!["a.png", "b.png"]);
}

/// 1画像で100件を超えても次の画像とキーが重ならず、検証も全件終わる
#[tokio::test]
async fn test_oversized_image_keeps_orders_unique() {
    let dir = tempdir().unwrap();
    let images = make_images(dir.path(), &["a.png", "b.png"]);
    let many: Vec<String> = (1..=101).map(|i| format!("{} Main St", i)).collect();
    let extractor = ScriptedExtractor::new(vec![
        ("a.png", Ok(many.join("\n"))),
        ("b.png", Ok("9 Oak St".to_string())),
    ]);

    let mut addresses = extract_addresses_from_images(&extractor, &images, 1568, None, |_| {})
        .await
        .unwrap();

    assert_eq!(addresses.len(), ORDER_STRIDE as usize + 1);
    let orders: HashSet<u32> = addresses.iter().map(|a| a.order).collect();
    assert_eq!(orders.len(), addresses.len());

    let last = addresses.last().unwrap();
    assert_eq!((last.order, last.text.as_str()), (100, "9 Oak St"));
    assert!(addresses.iter().all(|a| a.text != "101 Main St"));

    let validator = RateLimitedValidator::new(AlwaysFound, Duration::ZERO);
    let summary = validate_addresses(&mut addresses, &validator, |_| {}).await;
    assert_eq!(summary.pending, 0);
    assert_eq!(summary.valid, addresses.len());
    assert!(addresses.iter().all(|a| a.status() == ValidationStatus::Valid));
}

/// 番兵値とゴミ行は除外される
#[tokio::test]
async fn test_sentinel_and_noise_filtered() {
    let dir = tempdir().unwrap();
    let images = make_images(dir.path(), &["empty.png", "noisy.png"]);
    let extractor = ScriptedExtractor::new(vec![
        ("empty.png", Ok("NO_ADDRESSES_FOUND".to_string())),
        ("noisy.png", Ok("Deliveries\n\n  12 Elm St  \nBOISE\nMain St 5".to_string())),
    ]);

    let addresses = extract_addresses_from_images(&extractor, &images, 1568, None, |_| {})
        .await
        .unwrap();

    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].text, "12 Elm St");
    // 行番号はフィルタ後の位置で採番
    assert_eq!(addresses[0].order, 100);
}

/// 進捗は 0.0 から始まり 完了枚数/総数 で通知される
#[tokio::test]
async fn test_progress_reporting() {
    let dir = tempdir().unwrap();
    let images = make_images(dir.path(), &["1.png", "2.png", "3.png", "4.png"]);
    let extractor = ScriptedExtractor::new(vec![]);

    let mut progress = Vec::new();
    extract_addresses_from_images(&extractor, &images, 1568, None, |p| progress.push(p))
        .await
        .unwrap();

    assert_eq!(progress, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
}

/// 1枚でも失敗したら中断し、後続の画像は送らない
#[tokio::test]
async fn test_failure_aborts_batch() {
    let dir = tempdir().unwrap();
    let images = make_images(dir.path(), &["ok.png", "bad.png", "never.png"]);
    let extractor = ScriptedExtractor::new(vec![
        ("ok.png", Ok("1 First St".to_string())),
        ("bad.png", Err(429)),
        ("never.png", Ok("3 Third St".to_string())),
    ]);

    let result = extract_addresses_from_images(&extractor, &images, 1568, None, |_| {}).await;

    assert!(matches!(result, Err(RouteAiError::RateLimited)));
    assert_eq!(extractor.calls(), vec!["ok.png", "bad.png"]);
}

/// 画像なしはエラー
#[tokio::test]
async fn test_no_images() {
    let extractor = ScriptedExtractor::new(vec![]);
    let result = extract_addresses_from_images(&extractor, &[], 1568, None, |_| {}).await;
    assert!(matches!(result, Err(RouteAiError::NoImagesFound(_))));
}

/// キャッシュ済みの画像は抽出APIを呼ばない
#[tokio::test]
async fn test_cache_skips_extraction() {
    let dir = tempdir().unwrap();
    let images = make_images(dir.path(), &["a.png", "b.png"]);
    let mut cache = CacheFile::default();

    let first = ScriptedExtractor::new(vec![
        ("a.png", Ok("1 First St".to_string())),
        ("b.png", Ok("2 Second St".to_string())),
    ]);
    extract_addresses_from_images(&first, &images, 1568, Some(&mut cache), |_| {})
        .await
        .unwrap();
    assert_eq!(first.calls().len(), 2);
    assert_eq!(cache.len(), 2);

    // 2回目は応答が変わっていてもキャッシュが使われる
    let second = ScriptedExtractor::new(vec![("a.png", Ok("9 Changed St".to_string()))]);
    let addresses = extract_addresses_from_images(&second, &images, 1568, Some(&mut cache), |_| {})
        .await
        .unwrap();

    assert!(second.calls().is_empty());
    assert_eq!(addresses[0].text, "1 First St");
    assert_eq!(addresses[1].text, "2 Second St");
}
