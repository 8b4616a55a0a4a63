//! Derived publishers: band calculators (C7) and the BBO formatter.

pub mod bbo;
mod price_bands;
mod volume_bands;

pub use price_bands::{PriceBand, PriceBandsCalculator};
pub use volume_bands::{format_quote, VolumeBand, VolumeBandsCalculator};
