//! Streaming RPC adapter (C8): bridges engine subscriptions to a Tonic
//! streaming service with token auth and a symbol filter.

mod convert;
mod service;

pub mod pb {
    tonic::include_proto!("aggregator");
}

pub use service::AggregatorGrpcService;
