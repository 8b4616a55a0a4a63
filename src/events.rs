//! Canonical in-process event and view types (C2).

use crate::decimal::Decimal;
use std::time::SystemTime;

/// Which side of the book a price level or order belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

/// A `(price, aggregate quantity)` pair. `quantity` is positive whenever the
/// level is present in a book or view.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl PriceLevel {
    pub const fn new(price: Decimal, quantity: Decimal) -> Self {
        PriceLevel { price, quantity }
    }

    pub const ZERO: PriceLevel = PriceLevel {
        price: Decimal::ZERO,
        quantity: Decimal::ZERO,
    };
}

/// A single resting order, as tracked by a venue's per-order index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    pub order_id: u64,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// A snapshot of a venue's full book, price-aggregated (no per-order ids).
#[derive(Debug, Clone, Default)]
pub struct BookSnapshot {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

/// Which payload a [`BookEvent`] carries.
#[derive(Debug, Clone)]
pub enum BookEventKind {
    Snapshot(BookSnapshot),
    NewOrder(Order),
    CancelOrder { order_id: u64 },
}

/// A single canonical book event from one venue.
#[derive(Debug, Clone)]
pub struct BookEvent {
    pub exchange: String,
    pub kind: BookEventKind,
    /// Monotonic per venue; `0` means "unsequenced" and is always applied.
    pub sequence: u64,
    pub timestamp: SystemTime,
    /// Producer-observed time, `0` if absent.
    pub feed_timestamp_ns: i64,
    /// Receiver wall clock at ingest, `0` if absent (filled by the book).
    pub local_timestamp_ns: i64,
}

impl BookEvent {
    pub fn new(exchange: impl Into<String>, kind: BookEventKind, sequence: u64) -> Self {
        BookEvent {
            exchange: exchange.into(),
            kind,
            sequence,
            timestamp: SystemTime::now(),
            feed_timestamp_ns: 0,
            local_timestamp_ns: 0,
        }
    }
}

/// A consolidated, cross-venue view of the aggregated book at one instant.
#[derive(Debug, Clone, Default)]
pub struct AggregatedBookView {
    pub bid_levels: Vec<PriceLevel>,
    pub ask_levels: Vec<PriceLevel>,
    pub best_bid: PriceLevel,
    pub best_ask: PriceLevel,
    pub exchange_count: usize,
    pub timestamp: Option<SystemTime>,
    pub publish_timestamp_ns: i64,
    pub last_feed_timestamp_ns: i64,
    pub last_local_timestamp_ns: i64,
    pub min_feed_timestamp_ns: i64,
    pub max_feed_timestamp_ns: i64,
    pub min_local_timestamp_ns: i64,
    pub max_local_timestamp_ns: i64,
}

impl AggregatedBookView {
    /// Asserts the invariants from the data model: non-crossed, monotonic
    /// levels, positive quantities, first level matches best_bid/best_ask.
    /// Debug-only: a violation here is a logic bug, not a runtime failure.
    pub fn debug_assert_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        for w in self.bid_levels.windows(2) {
            debug_assert!(w[0].price > w[1].price, "bid levels not strictly descending");
        }
        for w in self.ask_levels.windows(2) {
            debug_assert!(w[0].price < w[1].price, "ask levels not strictly ascending");
        }
        for level in self.bid_levels.iter().chain(self.ask_levels.iter()) {
            debug_assert!(level.quantity.is_positive(), "non-positive level quantity");
        }
        if let (Some(bid), Some(ask)) = (self.bid_levels.first(), self.ask_levels.first()) {
            debug_assert!(ask.price > bid.price, "aggregated book is crossed");
        }
        if let Some(bid) = self.bid_levels.first() {
            debug_assert_eq!(*bid, self.best_bid, "best_bid does not match first bid level");
        }
        if let Some(ask) = self.ask_levels.first() {
            debug_assert_eq!(*ask, self.best_ask, "best_ask does not match first ask level");
        }
    }
}
