use crate::decimal::Decimal;
use crate::events::{AggregatedBookView, PriceLevel};

/// A single notional-threshold band: the price on each side at which
/// cumulative notional first reaches `threshold_notional` (zero if no level
/// on that side reaches it).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeBand {
    pub threshold_notional: Decimal,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
}

/// Computes notional-threshold bands by walking the aggregated depth on each
/// side, accumulating `price * quantity` until the threshold is reached.
pub struct VolumeBandsCalculator {
    thresholds: Vec<Decimal>,
}

impl VolumeBandsCalculator {
    pub fn new(thresholds: Vec<Decimal>) -> Self {
        VolumeBandsCalculator { thresholds }
    }

    /// The notional thresholds used by the original reference implementation.
    pub fn default_thresholds() -> Vec<Decimal> {
        vec![
            Decimal::from_integer(1_000_000),
            Decimal::from_integer(5_000_000),
            Decimal::from_integer(10_000_000),
            Decimal::from_integer(25_000_000),
            Decimal::from_integer(50_000_000),
        ]
    }

    pub fn compute(&self, view: &AggregatedBookView) -> Vec<VolumeBand> {
        let bid_side = Self::effective_levels(&view.bid_levels, view.best_bid);
        let ask_side = Self::effective_levels(&view.ask_levels, view.best_ask);

        self.thresholds
            .iter()
            .map(|&threshold| VolumeBand {
                threshold_notional: threshold,
                bid_price: walk(&bid_side, threshold),
                ask_price: walk(&ask_side, threshold),
            })
            .collect()
    }

    fn effective_levels(levels: &[PriceLevel], best: PriceLevel) -> Vec<PriceLevel> {
        if !levels.is_empty() {
            levels.to_vec()
        } else if best.quantity.is_positive() {
            vec![best]
        } else {
            Vec::new()
        }
    }
}

fn walk(levels: &[PriceLevel], threshold: Decimal) -> Decimal {
    let mut cumulative = Decimal::ZERO;
    for level in levels {
        cumulative = cumulative + level.price * level.quantity;
        if cumulative >= threshold {
            return level.price;
        }
    }
    Decimal::ZERO
}

/// Renders a volume band the way a display publisher would, e.g. for a log
/// line or a plain-text quote feed.
pub fn format_quote(band: &VolumeBand) -> String {
    format!(
        "THRESHOLD={} BID={} ASK={}",
        band.threshold_notional.to_string_with_precision(8),
        band.bid_price.to_string_with_precision(8),
        band.ask_price.to_string_with_precision(8),
    )
}
