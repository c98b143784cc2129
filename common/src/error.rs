//! エラー型定義

use thiserror::Error;

/// 共通エラー型（住所リスト操作）
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Address not found: order {0}")]
    AddressNotFound(u32),

    #[error("Position out of range: {position} (list has {len} addresses)")]
    PositionOutOfRange { position: usize, len: usize },
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_address_not_found() {
        let error = Error::AddressNotFound(101);
        assert_eq!(format!("{}", error), "Address not found: order 101");
    }

    #[test]
    fn test_error_display_position() {
        let error = Error::PositionOutOfRange { position: 7, len: 3 };
        let display = format!("{}", error);
        assert!(display.contains("7"));
        assert!(display.contains("3 addresses"));
    }
}
