use crate::decimal::Decimal;
use crate::events::{AggregatedBookView, PriceLevel};
use std::sync::Mutex;

/// A single price-offset band: `bid_price`/`ask_price` offset by `offset_bps`
/// basis points from the best bid/ask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    pub offset_bps: u32,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
}

fn bps_fraction(offset_bps: u32) -> Decimal {
    Decimal::from_integer(offset_bps as i64) / Decimal::from_integer(10_000)
}

/// Computes offset-indexed price bands from an aggregated view, with a
/// cached "last good" (bid, ask) fallback for when the view has no live
/// best bid/ask (e.g. one side of the aggregated book is momentarily empty).
pub struct PriceBandsCalculator {
    offsets_bps: Vec<u32>,
    last_good: Mutex<Option<(PriceLevel, PriceLevel)>>,
}

impl PriceBandsCalculator {
    pub fn new(offsets_bps: Vec<u32>) -> Self {
        PriceBandsCalculator {
            offsets_bps,
            last_good: Mutex::new(None),
        }
    }

    /// The offsets used by the original reference implementation.
    pub fn default_offsets() -> Vec<u32> {
        vec![50, 100, 200, 500, 1000]
    }

    /// Computes one band per configured offset. Returns an empty list if
    /// neither the view nor the cached fallback has a usable (bid, ask) pair.
    pub fn compute(&self, view: &AggregatedBookView) -> Vec<PriceBand> {
        let (bid, ask) = if view.best_bid.quantity.is_positive() && view.best_ask.quantity.is_positive() {
            let pair = (view.best_bid, view.best_ask);
            *self.last_good.lock().unwrap() = Some(pair);
            pair
        } else if let Some(pair) = *self.last_good.lock().unwrap() {
            pair
        } else {
            return Vec::new();
        };

        self.offsets_bps
            .iter()
            .map(|&offset_bps| {
                let fraction = bps_fraction(offset_bps);
                let bid_price = bid.price * (Decimal::ONE - fraction);
                let ask_price = ask.price * (Decimal::ONE + fraction);
                debug_assert!(ask_price > bid_price, "price band is crossed");
                PriceBand {
                    offset_bps,
                    bid_price,
                    ask_price,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(v: &str) -> Decimal {
        Decimal::from_string(v).unwrap()
    }

    #[test]
    fn bands_are_offset_symmetrically_and_never_crossed() {
        let calc = PriceBandsCalculator::new(vec![50, 500]);
        let view = AggregatedBookView {
            best_bid: PriceLevel::new(price("30045.49"), price("1")),
            best_ask: PriceLevel::new(price("30050.50"), price("1")),
            ..Default::default()
        };
        let bands = calc.compute(&view);
        assert_eq!(bands.len(), 2);
        assert!(bands.iter().all(|b| b.ask_price > b.bid_price));
        assert_eq!(bands[0].offset_bps, 50);
    }

    #[test]
    fn falls_back_to_last_good_pair_when_view_is_empty() {
        let calc = PriceBandsCalculator::new(vec![50]);
        let good_view = AggregatedBookView {
            best_bid: PriceLevel::new(price("100.00"), price("1")),
            best_ask: PriceLevel::new(price("101.00"), price("1")),
            ..Default::default()
        };
        calc.compute(&good_view);

        let empty_view = AggregatedBookView::default();
        let bands = calc.compute(&empty_view);
        assert_eq!(bands.len(), 1);
    }

    #[test]
    fn empty_without_any_prior_good_pair() {
        let calc = PriceBandsCalculator::new(vec![50]);
        assert!(calc.compute(&AggregatedBookView::default()).is_empty());
    }
}
