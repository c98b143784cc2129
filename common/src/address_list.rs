//! 住所リストの編集操作
//!
//! すべての操作は並び順キー（order）で住所を特定する。

use crate::error::{Error, Result};
use crate::types::{Address, ValidationResult};

fn position_of(addresses: &[Address], order: u32) -> Result<usize> {
    addresses
        .iter()
        .position(|a| a.order == order)
        .ok_or(Error::AddressNotFound(order))
}

/// 住所を取得
pub fn find_address(addresses: &[Address], order: u32) -> Option<&Address> {
    addresses.iter().find(|a| a.order == order)
}

/// 住所を削除
pub fn remove_address(addresses: &mut Vec<Address>, order: u32) -> Result<Address> {
    let index = position_of(addresses, order)?;
    Ok(addresses.remove(index))
}

/// 住所の文字列を編集
///
/// 文字列が変わると検証結果と座標は無効になるため、未検証状態に戻す。
pub fn edit_address(addresses: &mut [Address], order: u32, text: &str) -> Result<()> {
    let index = position_of(addresses, order)?;
    let address = &mut addresses[index];
    let text = text.trim();

    if address.text == text {
        return Ok(());
    }

    address.text = text.to_string();
    address.validation = Some(ValidationResult::pending());
    address.latitude = None;
    address.longitude = None;
    Ok(())
}

/// ルートURLで座標を使うかどうかを設定
pub fn set_use_geocode(addresses: &mut [Address], order: u32, use_geocode: bool) -> Result<()> {
    let index = position_of(addresses, order)?;
    addresses[index].use_geocode = use_geocode;
    Ok(())
}

/// 住所を指定位置（0始まり）へ移動
pub fn move_address(addresses: &mut Vec<Address>, order: u32, position: usize) -> Result<()> {
    let index = position_of(addresses, order)?;
    if position >= addresses.len() {
        return Err(Error::PositionOutOfRange {
            position,
            len: addresses.len(),
        });
    }

    let address = addresses.remove(index);
    addresses.insert(position, address);
    Ok(())
}

/// 検証結果を反映（座標があれば更新）
pub fn apply_validation(
    addresses: &mut [Address],
    order: u32,
    validation: ValidationResult,
    coordinates: Option<(f64, f64)>,
) -> Result<()> {
    let index = position_of(addresses, order)?;
    let address = &mut addresses[index];
    address.validation = Some(validation);
    if let Some((lat, lng)) = coordinates {
        address.latitude = Some(lat);
        address.longitude = Some(lng);
    }
    Ok(())
}
