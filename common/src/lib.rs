//! Route AI Common Library
//!
//! CLIと将来のフロントエンドで共有される型とロジック

pub mod types;
pub mod error;
pub mod parser;
pub mod prompts;
pub mod validation;
pub mod route;
pub mod address_list;

pub use types::{Address, RouteChunk, ValidationResult, ValidationStatus};
pub use error::{Error, Result};
pub use parser::{addresses_from_lines, filter_valid_addresses, sort_by_order, NO_ADDRESSES_FOUND, ORDER_STRIDE};
pub use prompts::build_extraction_prompt;
pub use validation::{is_address_valid, validate_address_basic};
pub use route::{build_maps_url, build_route_chunks, visible_chunks, RouteOptions, MAX_STOPS_PER_ROUTE};
