//! 住所リストJSONの読み書き

use crate::error::{RouteAiError, Result};
use route_ai_common::Address;
use std::path::Path;

/// extract/run の既定出力ファイル名
pub const DEFAULT_ADDRESSES_FILE: &str = "addresses.json";

pub fn load_addresses(path: &Path) -> Result<Vec<Address>> {
    if !path.exists() {
        return Err(RouteAiError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let addresses: Vec<Address> = serde_json::from_str(&content)?;
    Ok(addresses)
}

pub fn save_addresses(path: &Path, addresses: &[Address]) -> Result<()> {
    let json = serde_json::to_string_pretty(addresses)?;
    std::fs::write(path, json)?;
    Ok(())
}
