use crate::error::{RouteAiError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub media_type: &'static str,
}

/// 抽出APIが受け付ける画像形式（拡張子 → MIMEタイプ）
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

/// 拡張子からMIMEタイプを判定（大文字小文字を区別しない）
pub fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, media_type)| *media_type)
}

fn image_info(path: &Path, media_type: &'static str) -> ImageInfo {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    ImageInfo {
        path: path.to_path_buf(),
        file_name,
        media_type,
    }
}

pub fn scan_folder(folder: &Path, recursive: bool) -> Result<Vec<ImageInfo>> {
    if !folder.exists() {
        return Err(RouteAiError::FolderNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut images = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if let Some(media_type) = media_type_for(path) {
            images.push(image_info(path, media_type));
        }
    }

    // ファイル名でソート（スクリーンショットは連番名が多い）
    images.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(images)
}

/// 引数のファイル/フォルダを画像リストに展開
///
/// ファイルは指定順、フォルダは中身をパス順に展開する。
pub fn scan_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<ImageInfo>> {
    let mut images = Vec::new();

    for input in inputs {
        if input.is_dir() {
            images.extend(scan_folder(input, recursive)?);
            continue;
        }

        if !input.exists() {
            return Err(RouteAiError::FileNotFound(input.display().to_string()));
        }

        let media_type = media_type_for(input).ok_or_else(|| {
            RouteAiError::ImageLoad(format!("未対応の画像形式: {}", input.display()))
        })?;
        images.push(image_info(input, media_type));
    }

    Ok(images)
}
