//! Exchange rate sources.
//!
//! - `source` - the `RateSource` trait consumed by the rates worker
//! - `openexchangerates` - HTTP client for the Open Exchange Rates API
//! - `error` - source failure types

pub mod error;
pub mod openexchangerates;
pub mod source;

pub use error::*;
pub use openexchangerates::*;
pub use source::*;
