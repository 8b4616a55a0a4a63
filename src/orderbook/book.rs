use super::error::LobError;
use crate::decimal::Decimal;
use crate::events::{BookEvent, BookEventKind, Order, PriceLevel, Side};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

fn system_time_to_nanos(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// Outcome of applying an event, distinguishing a real mutation from a
/// silently-discarded stale retransmission (for caller-side counters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Stale,
}

/// Per-venue limit order book: applies ordered events, maintains sorted
/// bid/ask price maps and a per-order index, and enforces the data model's
/// structural invariants after every mutation.
#[derive(Debug, Default)]
pub struct LimitOrderBook {
    /// price -> aggregate quantity, naturally ascending; read in reverse for
    /// descending (best-first) iteration.
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
    orders: HashMap<u64, Order>,
    last_sequence: u64,
    exchange_name: Option<String>,
    last_feed_timestamp_ns: i64,
    last_local_timestamp_ns: i64,
}

impl LimitOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exchange_name(&self) -> Option<&str> {
        self.exchange_name.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn last_feed_timestamp_ns(&self) -> i64 {
        self.last_feed_timestamp_ns
    }

    pub fn last_local_timestamp_ns(&self) -> i64 {
        self.last_local_timestamp_ns
    }

    /// Applies a single event, enforcing exchange identity and per-venue
    /// sequence monotonicity. Stale retransmissions (non-zero sequence at or
    /// below `last_sequence`) are silently discarded, matching `StaleEvent`
    /// in the error contract (counted by the caller, not raised here).
    pub fn apply(&mut self, event: &BookEvent) -> Result<ApplyOutcome, LobError> {
        match &self.exchange_name {
            Some(name) if name != &event.exchange => {
                return Err(LobError::ExchangeMismatch {
                    book_exchange: name.clone(),
                    event_exchange: event.exchange.clone(),
                });
            }
            Some(_) => {}
            None => self.exchange_name = Some(event.exchange.clone()),
        }

        if event.sequence != 0 && event.sequence <= self.last_sequence {
            tracing::trace!(
                exchange = %event.exchange,
                sequence = event.sequence,
                last_sequence = self.last_sequence,
                "dropping stale event"
            );
            return Ok(ApplyOutcome::Stale);
        }
        if event.sequence != 0 {
            self.last_sequence = event.sequence;
        }

        if event.feed_timestamp_ns != 0 {
            self.last_feed_timestamp_ns = event.feed_timestamp_ns;
        } else {
            let from_wall = system_time_to_nanos(event.timestamp);
            if from_wall != 0 {
                self.last_feed_timestamp_ns = from_wall;
            }
        }

        if event.local_timestamp_ns != 0 {
            self.last_local_timestamp_ns = event.local_timestamp_ns;
        } else {
            self.last_local_timestamp_ns = now_nanos();
        }

        match &event.kind {
            BookEventKind::Snapshot(snapshot) => {
                self.bids.clear();
                self.asks.clear();
                self.orders.clear();
                for level in &snapshot.bids {
                    if level.quantity.is_positive() {
                        self.bids.insert(level.price, level.quantity);
                    }
                }
                for level in &snapshot.asks {
                    if level.quantity.is_positive() {
                        self.asks.insert(level.price, level.quantity);
                    }
                }
            }
            BookEventKind::NewOrder(order) => {
                if order.order_id != 0 {
                    self.remove_order(order.order_id);
                    self.add_level_quantity(order.side, order.price, order.quantity);
                    self.orders.insert(order.order_id, *order);
                }
            }
            BookEventKind::CancelOrder { order_id } => {
                self.remove_order(*order_id);
            }
        }

        self.debug_assert_invariants();
        Ok(ApplyOutcome::Applied)
    }

    fn remove_order(&mut self, order_id: u64) {
        if let Some(order) = self.orders.remove(&order_id) {
            self.add_level_quantity(order.side, order.price, -order.quantity);
        }
    }

    fn add_level_quantity(&mut self, side: Side, price: Decimal, delta: Decimal) {
        let map = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };
        let new_quantity = map.get(&price).copied().unwrap_or(Decimal::ZERO) + delta;
        if new_quantity.is_positive() {
            map.insert(price, new_quantity);
        } else {
            map.remove(&price);
        }
    }

    /// Best bid, or a zero level if the bid side is empty.
    pub fn best_bid(&self) -> PriceLevel {
        self.bids
            .iter()
            .next_back()
            .map(|(&price, &quantity)| PriceLevel::new(price, quantity))
            .unwrap_or(PriceLevel::ZERO)
    }

    /// Best ask, or a zero level if the ask side is empty.
    pub fn best_ask(&self) -> PriceLevel {
        self.asks
            .iter()
            .next()
            .map(|(&price, &quantity)| PriceLevel::new(price, quantity))
            .unwrap_or(PriceLevel::ZERO)
    }

    /// Bid levels, descending by price.
    pub fn bid_levels(&self) -> impl DoubleEndedIterator<Item = PriceLevel> + '_ {
        self.bids
            .iter()
            .rev()
            .map(|(&price, &quantity)| PriceLevel::new(price, quantity))
    }

    /// Ask levels, ascending by price.
    pub fn ask_levels(&self) -> impl DoubleEndedIterator<Item = PriceLevel> + '_ {
        self.asks
            .iter()
            .map(|(&price, &quantity)| PriceLevel::new(price, quantity))
    }

    /// All tracked per-order state (order of iteration is unspecified).
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    fn debug_assert_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        for (&price, &quantity) in self.bids.iter() {
            debug_assert!(quantity.is_positive(), "bid level at {price} has non-positive quantity");
        }
        for (&price, &quantity) in self.asks.iter() {
            debug_assert!(quantity.is_positive(), "ask level at {price} has non-positive quantity");
        }
        if let (Some((&best_bid, _)), Some((&best_ask, _))) =
            (self.bids.iter().next_back(), self.asks.iter().next())
        {
            debug_assert!(best_ask > best_bid, "book is crossed: best_ask {best_ask} <= best_bid {best_bid}");
        }

        let mut side_totals: HashMap<(Side, Decimal), Decimal> = HashMap::new();
        for order in self.orders.values() {
            *side_totals.entry((order.side, order.price)).or_insert(Decimal::ZERO) += order.quantity;
        }
        for ((side, price), total) in side_totals {
            let map = match side {
                Side::Bid => &self.bids,
                Side::Ask => &self.asks,
            };
            if let Some(&level_quantity) = map.get(&price) {
                debug_assert_eq!(
                    level_quantity, total,
                    "level at {price} does not equal the sum of its orders' contributions"
                );
            }
        }
    }
}
