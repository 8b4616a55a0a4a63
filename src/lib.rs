//! Real-time cross-venue order-book aggregator for a single trading symbol.
//!
//! Ingests per-venue order-book events from multiple upstream feeds,
//! maintains a per-venue limit order book, consolidates the books into a
//! single aggregated view (best bid/ask plus full depth, with cross-market
//! uncrossing), and fans the resulting snapshots out to subscribers. Derived
//! publishers (best-bid/offer formatter, price-band and volume-band
//! calculators) consume the aggregated stream and re-emit shaped quotes.
//!
//! The crate is market-data only: it does not persist state, perform trade
//! matching, synthesize liquidity, or translate between symbols. One
//! [`aggregator::AggregationEngine`] instance serves exactly one symbol.
//!
//! ## Layout
//!
//! - [`decimal`] — fixed-point `Decimal` with 256-bit-widened multiply/divide.
//! - [`events`] — canonical event and aggregated-view types.
//! - [`queue`] — the closable handoff queue shared by the engine and the RPC
//!   adapter.
//! - [`orderbook`] — per-venue `LimitOrderBook`.
//! - [`aggregator`] — the two-thread ingest/publish engine and subscriber
//!   registry.
//! - [`bands`] — price-band and volume-band calculators, plus the BBO
//!   formatter.
//! - [`rpc`] — the Tonic streaming adapter.
//! - [`config`] — JSON configuration shape consumed at construction.

pub mod aggregator;
pub mod bands;
pub mod config;
pub mod decimal;
pub mod events;
pub mod orderbook;
pub mod queue;
pub mod rpc;

pub use aggregator::AggregationEngine;
pub use decimal::Decimal;
pub use events::{AggregatedBookView, BookEvent, BookEventKind, BookSnapshot, Order, PriceLevel, Side};
pub use orderbook::LimitOrderBook;
