use std::time::Duration;
use venue_book_aggregator::aggregator::AggregationEngine;
use venue_book_aggregator::{BookEvent, BookEventKind, Decimal, Order, PriceLevel, Side};

fn price(v: &str) -> Decimal {
    Decimal::from_string(v).unwrap()
}

fn new_order(exchange: &str, id: u64, side: Side, px: &str, qty: &str, seq: u64) -> BookEvent {
    BookEvent::new(
        exchange,
        BookEventKind::NewOrder(Order {
            order_id: id,
            side,
            price: price(px),
            quantity: price(qty),
        }),
        seq,
    )
}

/// Scenario 2: aggregated depth sums across venues.
#[test]
fn aggregated_depth_sums_across_venues() {
    let engine = AggregationEngine::new();
    engine.start();

    engine.push(new_order("venueA", 1, Side::Bid, "100.00", "1", 1));
    engine.push(new_order("venueA", 2, Side::Bid, "101.00", "2", 2));
    engine.push(new_order("venueB", 3, Side::Bid, "100.00", "3", 1));
    engine.push(new_order("venueB", 4, Side::Ask, "105.00", "4", 2));
    engine.push(new_order("venueC", 5, Side::Ask, "106.00", "5", 1));

    std::thread::sleep(Duration::from_millis(100));
    let view = engine.latest();

    assert_eq!(
        view.bid_levels,
        vec![
            PriceLevel::new(price("101.00"), price("2")),
            PriceLevel::new(price("100.00"), price("4")),
        ]
    );
    assert_eq!(
        view.ask_levels,
        vec![
            PriceLevel::new(price("105.00"), price("4")),
            PriceLevel::new(price("106.00"), price("5")),
        ]
    );

    engine.stop();
}

/// Scenario 3 (end-to-end via the public engine API, not just consolidate()).
#[test]
fn readiness_gate_end_to_end() {
    let engine = AggregationEngine::new();
    engine.set_expected_exchanges(["A", "B"]);
    engine.start();

    engine.push(new_order("A", 1, Side::Bid, "100.00", "1", 1));
    engine.push(new_order("A", 2, Side::Bid, "100.00", "1", 2));
    std::thread::sleep(Duration::from_millis(50));

    engine.push(new_order("B", 3, Side::Ask, "101.00", "1", 1));
    std::thread::sleep(Duration::from_millis(50));

    let view = engine.latest();
    assert_eq!(view.exchange_count, 2);

    engine.stop();
}
