use crate::decimal::Decimal;
use crate::events::{AggregatedBookView, PriceLevel};
use crate::orderbook::LimitOrderBook;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Threshold beyond which the feed/local timestamp envelope is considered
/// stale enough to warn about.
const SPAN_WARNING_THRESHOLD_NS: i64 = 2_000_000_000;
/// Threshold beyond which publish delay relative to the freshest feed
/// timestamp is considered stale enough to warn about.
const PUBLISH_DELAY_WARNING_THRESHOLD_NS: i64 = 5_000_000_000;
/// Minimum spacing between consecutive staleness warnings.
const WARNING_RATE_LIMIT: Duration = Duration::from_secs(5);

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// Runs the consolidation algorithm over every currently-tracked venue book:
/// sum quantities at matching prices, virtually uncross the combined book,
/// apply the sticky last-best-ask fallback, and compute the timestamp
/// envelope. `last_best_ask` carries the sticky state across calls.
pub fn consolidate(
    books: &HashMap<String, LimitOrderBook>,
    last_best_ask: &mut Option<PriceLevel>,
) -> AggregatedBookView {
    let mut combined_bids: BTreeMap<Decimal, Decimal> = BTreeMap::new();
    let mut combined_asks: BTreeMap<Decimal, Decimal> = BTreeMap::new();

    let mut last_feed_values = Vec::new();
    let mut last_local_values = Vec::new();

    for book in books.values() {
        for level in book.bid_levels() {
            *combined_bids.entry(level.price).or_insert(Decimal::ZERO) += level.quantity;
        }
        for level in book.ask_levels() {
            *combined_asks.entry(level.price).or_insert(Decimal::ZERO) += level.quantity;
        }
        if book.last_feed_timestamp_ns() > 0 {
            last_feed_values.push(book.last_feed_timestamp_ns());
        }
        if book.last_local_timestamp_ns() > 0 {
            last_local_values.push(book.last_local_timestamp_ns());
        }
    }

    let mut bids: VecDeque<PriceLevel> = combined_bids
        .iter()
        .rev()
        .map(|(&price, &quantity)| PriceLevel::new(price, quantity))
        .collect();
    let mut asks: VecDeque<PriceLevel> = combined_asks
        .iter()
        .map(|(&price, &quantity)| PriceLevel::new(price, quantity))
        .collect();

    // Virtual uncross: consume overlapping quantity from the front of each
    // side until the combined book is no longer crossed.
    loop {
        let crossed = match (bids.front(), asks.front()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        };
        if !crossed {
            break;
        }
        let mut bid = bids.pop_front().unwrap();
        let mut ask = asks.pop_front().unwrap();
        let consumed = bid.quantity.min(ask.quantity);
        bid.quantity = bid.quantity - consumed;
        ask.quantity = ask.quantity - consumed;
        if bid.quantity.is_positive() {
            bids.push_front(bid);
        }
        if ask.quantity.is_positive() {
            asks.push_front(ask);
        }
    }

    let bid_levels: Vec<PriceLevel> = bids.into_iter().collect();
    let ask_levels: Vec<PriceLevel> = if !asks.is_empty() {
        let levels: Vec<PriceLevel> = asks.into_iter().collect();
        *last_best_ask = Some(levels[0]);
        levels
    } else if let Some(sticky) = *last_best_ask {
        vec![sticky]
    } else {
        Vec::new()
    };

    let best_bid = bid_levels.first().copied().unwrap_or(PriceLevel::ZERO);
    let best_ask = ask_levels.first().copied().unwrap_or(PriceLevel::ZERO);

    let (min_feed, max_feed) = envelope(&last_feed_values);
    let (min_local, max_local) = envelope(&last_local_values);

    let view = AggregatedBookView {
        bid_levels,
        ask_levels,
        best_bid,
        best_ask,
        exchange_count: books.len(),
        timestamp: Some(SystemTime::now()),
        publish_timestamp_ns: now_nanos(),
        last_feed_timestamp_ns: max_feed,
        last_local_timestamp_ns: max_local,
        min_feed_timestamp_ns: min_feed,
        max_feed_timestamp_ns: max_feed,
        min_local_timestamp_ns: min_local,
        max_local_timestamp_ns: max_local,
    };

    view.debug_assert_invariants();
    view
}

fn envelope(values: &[i64]) -> (i64, i64) {
    if values.is_empty() {
        return (0, 0);
    }
    let min = *values.iter().min().unwrap();
    let max = *values.iter().max().unwrap();
    (min, max)
}

/// Which staleness bound, if any, was exceeded by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessBreach {
    FeedSpan(i64),
    LocalSpan(i64),
    PublishDelay(i64),
}

/// Checks a view against the staleness thresholds, returning every breach
/// found (there may be more than one).
pub fn staleness_breaches(view: &AggregatedBookView) -> Vec<StalenessBreach> {
    let mut breaches = Vec::new();
    let feed_span = view.max_feed_timestamp_ns - view.min_feed_timestamp_ns;
    let local_span = view.max_local_timestamp_ns - view.min_local_timestamp_ns;
    let publish_delay = view.publish_timestamp_ns - view.max_feed_timestamp_ns;
    if view.max_feed_timestamp_ns > 0 && feed_span > SPAN_WARNING_THRESHOLD_NS {
        breaches.push(StalenessBreach::FeedSpan(feed_span));
    }
    if view.max_local_timestamp_ns > 0 && local_span > SPAN_WARNING_THRESHOLD_NS {
        breaches.push(StalenessBreach::LocalSpan(local_span));
    }
    if view.max_feed_timestamp_ns > 0 && publish_delay > PUBLISH_DELAY_WARNING_THRESHOLD_NS {
        breaches.push(StalenessBreach::PublishDelay(publish_delay));
    }
    breaches
}

/// Emits a rate-limited `tracing::warn!` for any staleness breach, naming
/// which bound was exceeded. `last_warning_at` tracks the last time a
/// warning was actually emitted so bursts collapse to at most one per
/// [`WARNING_RATE_LIMIT`].
pub fn maybe_warn_on_staleness(view: &AggregatedBookView, last_warning_at: &mut Option<Instant>) {
    let breaches = staleness_breaches(view);
    if breaches.is_empty() {
        return;
    }
    let now = Instant::now();
    if let Some(last) = *last_warning_at {
        if now.duration_since(last) < WARNING_RATE_LIMIT {
            return;
        }
    }
    *last_warning_at = Some(now);
    for breach in breaches {
        match breach {
            StalenessBreach::FeedSpan(ns) => {
                tracing::warn!(span_ns = ns, "feed timestamp envelope exceeded staleness threshold")
            }
            StalenessBreach::LocalSpan(ns) => {
                tracing::warn!(span_ns = ns, "local timestamp envelope exceeded staleness threshold")
            }
            StalenessBreach::PublishDelay(ns) => {
                tracing::warn!(delay_ns = ns, "publish delay exceeded staleness threshold")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BookEvent, BookEventKind, Order, Side};

    fn price(v: &str) -> Decimal {
        Decimal::from_string(v).unwrap()
    }

    fn book_with_order(exchange: &str, side: Side, px: &str, qty: &str) -> LimitOrderBook {
        let mut book = LimitOrderBook::new();
        book.apply(&BookEvent::new(
            exchange,
            BookEventKind::NewOrder(Order {
                order_id: 1,
                side,
                price: price(px),
                quantity: price(qty),
            }),
            1,
        ))
        .unwrap();
        book
    }

    #[test]
    fn sums_quantities_at_matching_prices_across_venues() {
        let mut books = HashMap::new();
        books.insert("A".to_string(), book_with_order("A", Side::Bid, "100.00", "1"));
        books.insert("B".to_string(), book_with_order("B", Side::Bid, "100.00", "3"));
        let mut sticky = None;
        let view = consolidate(&books, &mut sticky);
        assert_eq!(view.bid_levels, vec![PriceLevel::new(price("100.00"), price("4"))]);
    }

    #[test]
    fn virtual_uncross_consumes_overlapping_quantity() {
        let mut books = HashMap::new();
        books.insert("A".to_string(), book_with_order("A", Side::Bid, "100.00", "2"));
        books.insert("B".to_string(), book_with_order("B", Side::Ask, "99.00", "1"));
        let mut sticky = None;
        let view = consolidate(&books, &mut sticky);
        assert_eq!(view.bid_levels, vec![PriceLevel::new(price("100.00"), price("1"))]);
        assert!(view.ask_levels.is_empty());
    }

    #[test]
    fn sticky_last_best_ask_survives_an_empty_tick() {
        let mut books = HashMap::new();
        books.insert("A".to_string(), book_with_order("A", Side::Ask, "105.00", "2"));
        let mut sticky = None;
        let view = consolidate(&books, &mut sticky);
        assert_eq!(view.best_ask, PriceLevel::new(price("105.00"), price("2")));

        books.clear();
        let view2 = consolidate(&books, &mut sticky);
        assert_eq!(view2.best_ask, PriceLevel::new(price("105.00"), price("2")));
    }
}
