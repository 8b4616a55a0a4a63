use super::consolidate::{consolidate, maybe_warn_on_staleness};
use super::stats::{EngineStats, EngineStatsSnapshot};
use crate::events::{AggregatedBookView, BookEvent, PriceLevel};
use crate::orderbook::{ApplyOutcome, LimitOrderBook};
use crate::queue::HandoffQueue;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

type Callback = Arc<dyn Fn(&AggregatedBookView) + Send + Sync>;

struct EngineState {
    books: HashMap<String, LimitOrderBook>,
    latest: AggregatedBookView,
    subscribers: HashMap<u64, Callback>,
    next_subscriber_id: u64,
    expected_exchanges: HashSet<String>,
    ready_exchanges: HashSet<String>,
    last_best_ask: Option<PriceLevel>,
    last_warning_at: Option<Instant>,
}

impl Default for EngineState {
    fn default() -> Self {
        EngineState {
            books: HashMap::new(),
            latest: AggregatedBookView::default(),
            subscribers: HashMap::new(),
            next_subscriber_id: 1,
            expected_exchanges: HashSet::new(),
            ready_exchanges: HashSet::new(),
            last_best_ask: None,
            last_warning_at: None,
        }
    }
}

struct Threads {
    ingest: JoinHandle<()>,
    publisher: JoinHandle<()>,
}

struct Inner {
    state: Mutex<EngineState>,
    stats: EngineStats,
    ingest_queue: HandoffQueue<BookEvent>,
    publish_queue: HandoffQueue<AggregatedBookView>,
    threads: Mutex<Option<Threads>>,
}

/// Owns the per-venue order books, runs the ingest/consolidate/publish
/// pipeline on two dedicated OS threads, and fans out aggregated views to
/// subscribers.
///
/// Cheap to clone: each clone is a handle onto the same shared state, so the
/// ingest and publisher threads can hold their own handle independent of the
/// caller's.
#[derive(Clone)]
pub struct AggregationEngine {
    inner: Arc<Inner>,
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationEngine {
    pub fn new() -> Self {
        AggregationEngine {
            inner: Arc::new(Inner {
                state: Mutex::new(EngineState::default()),
                stats: EngineStats::default(),
                ingest_queue: HandoffQueue::new(),
                publish_queue: HandoffQueue::new(),
                threads: Mutex::new(None),
            }),
        }
    }

    /// Spawns the ingest and publisher threads. Idempotent: calling `start`
    /// on an already-running engine is a no-op.
    pub fn start(&self) {
        let mut threads = self.inner.threads.lock().unwrap();
        if threads.is_some() {
            return;
        }
        tracing::info!("starting aggregation engine");

        let ingest_inner = self.inner.clone();
        let ingest = std::thread::Builder::new()
            .name("aggregator-ingest".to_string())
            .spawn(move || ingest_loop(&ingest_inner))
            .expect("failed to spawn ingest thread");

        let publisher_inner = self.inner.clone();
        let publisher = std::thread::Builder::new()
            .name("aggregator-publisher".to_string())
            .spawn(move || publisher_loop(&publisher_inner))
            .expect("failed to spawn publisher thread");

        *threads = Some(Threads { ingest, publisher });
    }

    /// Closes both queues and joins both threads. Idempotent; a no-op on an
    /// engine that was never started.
    pub fn stop(&self) {
        let threads = self.inner.threads.lock().unwrap().take();
        let Some(threads) = threads else {
            return;
        };
        tracing::info!("stopping aggregation engine");
        self.inner.ingest_queue.close();
        let _ = threads.ingest.join();
        self.inner.publish_queue.close();
        let _ = threads.publisher.join();
    }

    /// Enqueues an event. Never blocks the caller on subscriber activity.
    pub fn push(&self, event: BookEvent) {
        self.inner.ingest_queue.push(event);
    }

    /// Registers a callback to receive every subsequently-published view.
    /// Safe to call from inside another callback.
    pub fn subscribe<F>(&self, callback: F) -> u64
    where
        F: Fn(&AggregatedBookView) + Send + Sync + 'static,
    {
        let mut state = self.inner.state.lock().unwrap();
        let id = state.next_subscriber_id;
        state.next_subscriber_id += 1;
        state.subscribers.insert(id, Arc::new(callback));
        id
    }

    /// Removes a subscriber. Safe to call from inside a callback (including
    /// the subscriber's own), concurrently with publishing.
    pub fn unsubscribe(&self, id: u64) {
        self.inner.state.lock().unwrap().subscribers.remove(&id);
    }

    /// Returns the most recently consolidated view. May be the default
    /// (empty) view if no events have been applied yet.
    pub fn latest(&self) -> AggregatedBookView {
        self.inner.state.lock().unwrap().latest.clone()
    }

    /// Configures the readiness gate: publishing is suppressed until every
    /// named venue has produced at least one event in the engine's current
    /// lifetime. Consolidation still runs on every event regardless.
    pub fn set_expected_exchanges<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.inner.state.lock().unwrap();
        state.expected_exchanges = names.into_iter().map(Into::into).collect();
    }

    /// Snapshot of ambient counters (events applied, stale events dropped,
    /// views published).
    pub fn stats(&self) -> EngineStatsSnapshot {
        self.inner.stats.snapshot()
    }
}

fn ingest_loop(inner: &Inner) {
    loop {
        let event = match inner.ingest_queue.wait_pop() {
            Some(event) => event,
            None => break,
        };

        let mut state = inner.state.lock().unwrap();
        let exchange = event.exchange.clone();
        let book = state.books.entry(exchange.clone()).or_insert_with(LimitOrderBook::new);

        match book.apply(&event) {
            Err(err) => {
                tracing::error!(error = %err, exchange = %exchange, "dropping misrouted event");
                continue;
            }
            Ok(ApplyOutcome::Stale) => {
                inner.stats.record_stale();
                continue;
            }
            Ok(ApplyOutcome::Applied) => {
                inner.stats.record_applied();
                if !state.expected_exchanges.is_empty() && state.expected_exchanges.contains(&exchange) {
                    state.ready_exchanges.insert(exchange);
                }
            }
        }

        let view = consolidate(&state.books, &mut state.last_best_ask);
        maybe_warn_on_staleness(&view, &mut state.last_warning_at);
        state.latest = view.clone();

        let can_publish = state.expected_exchanges.is_empty()
            || state
                .expected_exchanges
                .iter()
                .all(|expected| state.ready_exchanges.contains(expected));

        if can_publish {
            inner.publish_queue.push(view);
        }
    }
    tracing::info!("ingest thread exiting");
}

fn publisher_loop(inner: &Inner) {
    loop {
        let view = match inner.publish_queue.wait_pop() {
            Some(view) => view,
            None => break,
        };

        let callbacks: Vec<Callback> = {
            let state = inner.state.lock().unwrap();
            state.subscribers.values().cloned().collect()
        };

        for callback in callbacks {
            let view_ref = &view;
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(view_ref)));
            if result.is_err() {
                tracing::error!("subscriber callback panicked; continuing fan-out");
            }
        }
        inner.stats.record_published();
    }
    tracing::info!("publisher thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use crate::events::{BookEventKind, Order, Side};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn price(v: &str) -> Decimal {
        Decimal::from_string(v).unwrap()
    }

    fn new_order_event(exchange: &str, id: u64, side: Side, px: &str, qty: &str, seq: u64) -> BookEvent {
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

    #[test]
    fn bbo_across_two_venues() {
        let engine = AggregationEngine::new();
        engine.start();
        engine.push(new_order_event("venueA", 1, Side::Bid, "100.00", "1", 1));
        engine.push(new_order_event("venueB", 2, Side::Bid, "101.00", "2", 1));
        std::thread::sleep(Duration::from_millis(50));
        let view = engine.latest();
        assert_eq!(view.best_bid, PriceLevel::new(price("101.00"), price("2")));
        assert_eq!(view.exchange_count, 2);
        engine.stop();
    }

    #[test]
    fn readiness_gate_suppresses_publish_until_all_expected_report() {
        let engine = AggregationEngine::new();
        engine.set_expected_exchanges(["A", "B"]);
        let delivered = Arc::new(AtomicUsize::new(0));
        let delivered_clone = delivered.clone();
        engine.subscribe(move |_view| {
            delivered_clone.fetch_add(1, Ordering::SeqCst);
        });
        engine.start();

        engine.push(new_order_event("A", 1, Side::Bid, "100.00", "1", 1));
        engine.push(new_order_event("A", 2, Side::Bid, "101.00", "1", 2));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(delivered.load(Ordering::SeqCst), 0);

        engine.push(new_order_event("B", 3, Side::Bid, "99.00", "1", 1));
        std::thread::sleep(Duration::from_millis(50));
        assert!(delivered.load(Ordering::SeqCst) >= 1);
        assert_eq!(engine.latest().exchange_count, 2);
        engine.stop();
    }

    #[test]
    fn slow_subscriber_does_not_stall_latest() {
        let engine = AggregationEngine::new();
        engine.subscribe(|_view| {
            std::thread::sleep(Duration::from_millis(50));
        });
        engine.start();

        engine.push(new_order_event("A", 1, Side::Bid, "100.00", "1", 1));
        engine.push(new_order_event("A", 2, Side::Bid, "101.00", "1", 2));
        engine.push(new_order_event("A", 3, Side::Bid, "102.00", "1", 3));

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(engine.latest().best_bid, PriceLevel::new(price("102.00"), price("1")));
        engine.stop();
    }

    #[test]
    fn unsubscribe_from_inside_callback_does_not_deadlock() {
        let engine = AggregationEngine::new();
        let engine_clone = engine.clone();
        let id_holder: Arc<Mutex<Option<u64>>> = Arc::new(Mutex::new(None));
        let id_holder_clone = id_holder.clone();
        let id = engine.subscribe(move |_view| {
            if let Some(id) = *id_holder_clone.lock().unwrap() {
                engine_clone.unsubscribe(id);
            }
        });
        *id_holder.lock().unwrap() = Some(id);
        engine.start();
        engine.push(new_order_event("A", 1, Side::Bid, "100.00", "1", 1));
        std::thread::sleep(Duration::from_millis(50));
        engine.stop();
    }

    #[test]
    fn stop_terminates_promptly_with_active_subscriber() {
        let engine = AggregationEngine::new();
        engine.subscribe(|_view| {
            std::thread::sleep(Duration::from_millis(5));
        });
        engine.start();
        engine.push(new_order_event("A", 1, Side::Bid, "100.00", "1", 1));
        let start = Instant::now();
        engine.stop();
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let engine = AggregationEngine::new();
        engine.stop();
    }
}
