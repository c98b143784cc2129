//! ルート区間の出力
//!
//! 区間ごとのURLを表示し、必要ならJSONに書き出してブラウザで開く。

use crate::error::Result;
use route_ai_common::RouteChunk;
use serde::Serialize;
use std::path::Path;

/// 区間の見出し（1区間なら "Route"、複数なら "Route N of M"）
pub fn chunk_label(index: usize, total: usize) -> String {
    if total <= 1 {
        "Route".to_string()
    } else {
        format!("Route {} of {}", index + 1, total)
    }
}

/// 区間一覧を表示
pub fn print_route_chunks(chunks: &[&RouteChunk]) {
    let total = chunks.len();
    for (index, chunk) in chunks.iter().enumerate() {
        println!(
            "\n{} ({} stops) - from {}",
            chunk_label(index, total),
            chunk.addresses.len(),
            chunk.starting_point
        );
        for (i, address) in chunk.addresses.iter().enumerate() {
            println!("  {:>2}. {}", i + 1, address.text);
        }
        println!("  {}", chunk.url);
    }
}

/// JSON出力用の区間
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteReportEntry<'a> {
    id: usize,
    label: String,
    starting_point: &'a str,
    stops: usize,
    url: &'a str,
    addresses: Vec<&'a str>,
}

/// 区間一覧をJSONで保存
pub fn write_routes_json(path: &Path, chunks: &[&RouteChunk]) -> Result<()> {
    let total = chunks.len();
    let entries: Vec<RouteReportEntry> = chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| RouteReportEntry {
            id: chunk.id,
            label: chunk_label(index, total),
            starting_point: &chunk.starting_point,
            stops: chunk.addresses.len(),
            url: &chunk.url,
            addresses: chunk.addresses.iter().map(|a| a.text.as_str()).collect(),
        })
        .collect();

    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// 区間URLを既定のブラウザで開く（失敗しても続行）
pub fn open_routes(chunks: &[&RouteChunk]) {
    for chunk in chunks {
        if let Err(e) = open::that(&chunk.url) {
            tracing::warn!(id = chunk.id, "ブラウザで開けませんでした: {}", e);
            eprintln!("⚠ ブラウザで開けませんでした: {}", chunk.url);
        }
    }
}
