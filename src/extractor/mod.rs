//! スクリーンショットからの住所抽出
//!
//! 画像を1枚ずつ順番に抽出APIへ送り、並び順キー付きの住所リストを作る。
//! 1枚でも失敗したらバッチ全体を中断し、それまでの結果は破棄する。

pub mod anthropic;
pub mod cache;
pub mod openai;
pub mod payload;

pub use cache::CacheFile;
pub use payload::ImagePayload;

use crate::ai_provider::AiProvider;
use crate::config::Config;
use crate::error::{RouteAiError, Result};
use crate::scanner::ImageInfo;
use async_trait::async_trait;
use route_ai_common::{addresses_from_lines, filter_valid_addresses, sort_by_order, Address, ORDER_STRIDE};

/// 抽出APIクライアント
#[async_trait]
pub trait AddressExtractor: Send + Sync {
    /// 画像1枚を送り、AIの応答テキストをそのまま返す
    async fn extract_text(&self, image: &ImagePayload) -> Result<String>;

    /// 応答テキストを住所行に絞り込んで返す
    async fn extract_lines(&self, image: &ImagePayload) -> Result<Vec<String>> {
        let text = self.extract_text(image).await?;
        Ok(filter_valid_addresses(&text))
    }
}

/// 設定からプロバイダに応じた抽出クライアントを作成
pub fn build_extractor(config: &Config, provider: AiProvider) -> Result<Box<dyn AddressExtractor>> {
    let api_key = config.get_api_key(provider)?;
    let model = config.model_for(provider);

    let extractor: Box<dyn AddressExtractor> = match provider {
        AiProvider::Anthropic => Box::new(anthropic::AnthropicExtractor::new(
            api_key,
            model,
            config.timeout_seconds,
        )?),
        AiProvider::OpenAi => Box::new(openai::OpenAiExtractor::new(
            api_key,
            model,
            config.timeout_seconds,
        )?),
    };
    Ok(extractor)
}

/// 画像リストから住所を抽出
///
/// - 画像は入力順に1枚ずつ処理（並列送信しない）
/// - 並び順キーは `画像番号 * 100 + 行番号`（1画像100件まで、超過分は警告して破棄）
/// - 進捗は `完了枚数 / 総数`（0.0〜1.0）で通知
/// - キャッシュが渡された場合はハッシュ一致の画像でAPIを呼ばない
pub async fn extract_addresses_from_images<E>(
    extractor: &E,
    images: &[ImageInfo],
    max_image_size: u32,
    mut cache: Option<&mut CacheFile>,
    mut on_progress: impl FnMut(f64),
) -> Result<Vec<Address>>
where
    E: AddressExtractor + ?Sized,
{
    if images.is_empty() {
        return Err(RouteAiError::NoImagesFound("画像が指定されていません".into()));
    }

    let total = images.len();
    let mut all_addresses = Vec::new();
    on_progress(0.0);

    for (image_index, image) in images.iter().enumerate() {
        let lines = match cache.as_deref_mut() {
            Some(cache) => extract_cached(extractor, image, max_image_size, cache).await?,
            None => {
                let payload = payload::load_image_payload(image, max_image_size)?;
                extractor.extract_lines(&payload).await?
            }
        };

        tracing::debug!(file = %image.file_name, count = lines.len(), "住所を抽出");
        let addresses = addresses_from_lines(&lines, image_index);
        if addresses.len() < lines.len() {
            tracing::warn!(
                file = %image.file_name,
                dropped = lines.len() - addresses.len(),
                "1画像あたりの上限（{}件）を超えた住所を破棄",
                ORDER_STRIDE
            );
        }
        all_addresses.extend(addresses);
        on_progress((image_index + 1) as f64 / total as f64);
    }

    sort_by_order(&mut all_addresses);
    Ok(all_addresses)
}

async fn extract_cached<E>(
    extractor: &E,
    image: &ImageInfo,
    max_image_size: u32,
    cache: &mut CacheFile,
) -> Result<Vec<String>>
where
    E: AddressExtractor + ?Sized,
{
    let (hash, file_size) = cache::compute_file_hash(&image.path)?;

    if let Some(lines) = cache.get(&hash) {
        tracing::debug!(file = %image.file_name, "キャッシュヒット");
        return Ok(lines.to_vec());
    }

    let payload = payload::load_image_payload(image, max_image_size)?;
    let lines = extractor.extract_lines(&payload).await?;
    cache.insert(hash, image.file_name.clone(), file_size, lines.clone());
    Ok(lines)
}
