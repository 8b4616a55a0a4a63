use crate::events::AggregatedBookView;

/// Stateless best-bid/offer formatter, producing a plain-text quote line:
/// `BEST_BID=<price>@<qty> BEST_ASK=<price>@<qty> EXCHANGES=<n>`.
pub fn format(view: &AggregatedBookView) -> String {
    format!(
        "BEST_BID={}@{} BEST_ASK={}@{} EXCHANGES={}",
        view.best_bid.price.to_string_with_precision(8),
        view.best_bid.quantity.to_string_with_precision(8),
        view.best_ask.price.to_string_with_precision(8),
        view.best_ask.quantity.to_string_with_precision(8),
        view.exchange_count,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use crate::events::PriceLevel;

    #[test]
    fn formats_best_bid_and_ask_with_exchange_count() {
        let view = AggregatedBookView {
            best_bid: PriceLevel::new(Decimal::from_string("100.5").unwrap(), Decimal::from_integer(2)),
            best_ask: PriceLevel::new(Decimal::from_string("101.25").unwrap(), Decimal::from_integer(3)),
            exchange_count: 2,
            ..Default::default()
        };
        assert_eq!(
            format(&view),
            "BEST_BID=100.50000000@2.00000000 BEST_ASK=101.25000000@3.00000000 EXCHANGES=2"
        );
    }
}
