use super::convert::view_to_pb;
use super::pb::{self, aggregator_server::Aggregator};
use crate::aggregator::AggregationEngine;
use crate::events::AggregatedBookView;
use crate::queue::HandoffQueue;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

const POLL_TIMEOUT: Duration = Duration::from_millis(100);
const OUTBOUND_CHANNEL_CAPACITY: usize = 16;

/// Bridges the synchronous [`AggregationEngine`] to a Tonic streaming RPC:
/// one per-call [`HandoffQueue`] fed by a subscriber callback, drained by a
/// dedicated OS thread that forwards into the `tokio::sync::mpsc` channel
/// Tonic's streaming response expects.
pub struct AggregatorGrpcService {
    engine: AggregationEngine,
    symbol: String,
    auth_token: Option<String>,
}

impl AggregatorGrpcService {
    /// `auth_token`: empty disables authorization (every request accepted).
    pub fn new(engine: AggregationEngine, symbol: impl Into<String>, auth_token: impl Into<String>) -> Self {
        let token = auth_token.into();
        AggregatorGrpcService {
            engine,
            symbol: symbol.into(),
            auth_token: if token.is_empty() { None } else { Some(token) },
        }
    }

    fn authorize<T>(&self, request: &Request<T>) -> Result<(), Status> {
        let Some(expected) = &self.auth_token else {
            return Ok(());
        };
        let value = request
            .metadata()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Status::unauthenticated("missing authorization metadata"))?;
        let token = value.strip_prefix("Bearer ").unwrap_or(value);
        if token == expected {
            Ok(())
        } else {
            Err(Status::unauthenticated("invalid authorization token"))
        }
    }
}

/// Unsubscribes from the engine when the poll thread exits, however it exits.
struct SubscriptionGuard {
    engine: AggregationEngine,
    subscriber_id: u64,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.engine.unsubscribe(self.subscriber_id);
    }
}

type ResponseStream = Pin<Box<dyn tokio_stream::Stream<Item = Result<pb::AggregatedBook, Status>> + Send + 'static>>;

#[tonic::async_trait]
impl Aggregator for AggregatorGrpcService {
    type StreamBooksStream = ResponseStream;

    async fn stream_books(
        &self,
        request: Request<pb::SubscribeRequest>,
    ) -> Result<Response<Self::StreamBooksStream>, Status> {
        self.authorize(&request)?;

        let requested_symbol = request.into_inner().symbol;
        if !requested_symbol.is_empty() && requested_symbol != self.symbol {
            return Err(Status::invalid_argument("symbol does not match this stream's configured symbol"));
        }

        let queue = Arc::new(HandoffQueue::<AggregatedBookView>::new());
        let active = Arc::new(AtomicBool::new(true));

        let callback_queue = queue.clone();
        let callback_active = active.clone();
        let subscriber_id = self.engine.subscribe(move |view: &AggregatedBookView| {
            if callback_active.load(Ordering::Acquire) {
                callback_queue.push(view.clone());
            }
        });

        let (tx, rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let engine = self.engine.clone();

        std::thread::Builder::new()
            .name("aggregator-rpc-poll".to_string())
            .spawn(move || {
                let _guard = SubscriptionGuard { engine, subscriber_id };
                loop {
                    if tx.is_closed() {
                        break;
                    }
                    match queue.wait_pop_for(POLL_TIMEOUT) {
                        Some(view) => {
                            if tx.blocking_send(Ok(view_to_pb(&view))).is_err() {
                                break;
                            }
                        }
                        None => continue,
                    }
                }
                active.store(false, Ordering::Release);
                queue.close();
            })
            .expect("failed to spawn rpc poll thread");

        Ok(Response::new(Box::pin(ReceiverStream::new(rx)) as ResponseStream))
    }
}
