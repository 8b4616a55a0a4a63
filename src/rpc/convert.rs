use super::pb;
use crate::events::{AggregatedBookView, PriceLevel};
use std::time::UNIX_EPOCH;

fn price_level_to_pb(level: &PriceLevel) -> pb::PriceLevel {
    pb::PriceLevel {
        price: level.price.to_string_with_precision(8),
        quantity: level.quantity.to_string_with_precision(8),
    }
}

/// Converts a domain [`AggregatedBookView`] into the wire message, matching
/// the string-encoded-decimal contract: every price/quantity is serialized
/// with eight fractional digits.
pub fn view_to_pb(view: &AggregatedBookView) -> pb::AggregatedBook {
    pb::AggregatedBook {
        best_bid: Some(price_level_to_pb(&view.best_bid)),
        best_ask: Some(price_level_to_pb(&view.best_ask)),
        bid_levels: view.bid_levels.iter().map(price_level_to_pb).collect(),
        ask_levels: view.ask_levels.iter().map(price_level_to_pb).collect(),
        exchange_count: view.exchange_count as u32,
        timestamp_unix_millis: view
            .timestamp
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0),
        publish_timestamp_ns: view.publish_timestamp_ns,
        last_feed_timestamp_ns: view.last_feed_timestamp_ns,
        last_local_timestamp_ns: view.last_local_timestamp_ns,
        min_feed_timestamp_ns: view.min_feed_timestamp_ns,
        max_feed_timestamp_ns: view.max_feed_timestamp_ns,
        min_local_timestamp_ns: view.min_local_timestamp_ns,
        max_local_timestamp_ns: view.max_local_timestamp_ns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;

    #[test]
    fn converts_price_levels_as_eight_decimal_strings() {
        let view = AggregatedBookView {
            best_bid: PriceLevel::new(Decimal::from_string("100.5").unwrap(), Decimal::from_integer(2)),
            ..Default::default()
        };
        let pb_view = view_to_pb(&view);
        let best_bid = pb_view.best_bid.unwrap();
        assert_eq!(best_bid.price, "100.50000000");
        assert_eq!(best_bid.quantity, "2.00000000");
    }
}
