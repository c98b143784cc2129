//! route-ai
//!
//! 配達アプリのスクリーンショットから住所を抽出し、検証して
//! Google Mapsのルートに分割するCLIのライブラリ部分。

pub mod ai_provider;
pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod geocode;
pub mod report;
pub mod review;
pub mod scanner;
pub mod store;
