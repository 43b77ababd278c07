//! Domain types for cached market data.

pub mod price;

pub use price::{PriceCache, PriceRow, PriceSeries};
