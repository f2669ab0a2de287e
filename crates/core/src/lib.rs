//! Core data types for the exchange rate alert bot.
//!
//! - `pair` - the three tracked currency pairs
//! - `rate` - fetched quotes and persisted observations
//! - `detector` - change detection between consecutive observations

pub mod detector;
pub mod pair;
pub mod rate;

pub use detector::*;
pub use pair::*;
pub use rate::*;
