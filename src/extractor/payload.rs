//! 抽出APIに送る画像ペイロードの作成
//!
//! 最大辺が `max_image_size` を超えるスクリーンショットはPNGで縮小してから送る。
//! デコードできない画像は元のバイト列をそのまま送る。

use crate::error::Result;
use crate::scanner::ImageInfo;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::imageops::FilterType;
use image::ImageFormat;
use std::io::Cursor;

/// Base64エンコード済み画像
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub file_name: String,
    pub media_type: String,
    /// Base64データ（data URLのプレフィックスなし）
    pub data: String,
}

impl ImagePayload {
    pub fn from_bytes(file_name: impl Into<String>, media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// "data:image/png;base64,..." 形式
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// 画像ファイルを読み込み、必要なら縮小してペイロードを作成
pub fn load_image_payload(image: &ImageInfo, max_image_size: u32) -> Result<ImagePayload> {
    let bytes = std::fs::read(&image.path)?;

    match downscale(&bytes, max_image_size) {
        Some(png) => {
            tracing::debug!(file = %image.file_name, "縮小して送信 ({} → {} bytes)", bytes.len(), png.len());
            Ok(ImagePayload::from_bytes(&image.file_name, "image/png", &png))
        }
        None => Ok(ImagePayload::from_bytes(&image.file_name, image.media_type, &bytes)),
    }
}

/// 最大辺を超える場合のみ縮小したPNGを返す
fn downscale(bytes: &[u8], max_image_size: u32) -> Option<Vec<u8>> {
    if max_image_size == 0 {
        return None;
    }

    let img = image::load_from_memory(bytes).ok()?;
    if img.width().max(img.height()) <= max_image_size {
        return None;
    }

    // resize はアスペクト比を維持する
    let resized = img.resize(max_image_size, max_image_size, FilterType::Triangle);
    let mut buffer = Cursor::new(Vec::new());
    resized.write_to(&mut buffer, ImageFormat::Png).ok()?;
    Some(buffer.into_inner())
}
