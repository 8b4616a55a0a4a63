use std::net::SocketAddr;
use std::path::PathBuf;
use tonic::transport::Server;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use venue_book_aggregator::aggregator::AggregationEngine;
use venue_book_aggregator::config::Config;
use venue_book_aggregator::rpc::pb::aggregator_server::AggregatorServer;
use venue_book_aggregator::rpc::AggregatorGrpcService;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();
}

fn load_config() -> Config {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"));
    Config::from_json_file(&path).unwrap_or_else(|err| {
        tracing::error!(error = %err, path = %path.display(), "failed to load config");
        std::process::exit(1);
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let config = load_config();

    tracing::info!(symbol = %config.symbol, expected_exchanges = ?config.expected_exchanges, "starting aggregator");

    let engine = AggregationEngine::new();
    engine.set_expected_exchanges(config.expected_exchanges.clone());
    engine.start();

    let addr: SocketAddr = format!("{}:{}", config.grpc.listen_address, config.grpc.port).parse()?;
    let service = AggregatorGrpcService::new(engine.clone(), config.symbol.clone(), config.grpc.auth_token.clone());

    tracing::info!(%addr, "gRPC server listening");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received shutdown signal");
    };

    Server::builder()
        .add_service(AggregatorServer::new(service))
        .serve_with_shutdown(addr, shutdown)
        .await?;

    engine.stop();
    Ok(())
}
