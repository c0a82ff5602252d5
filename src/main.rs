use actix_web::{web, App, HttpServer};
use bridgewatch::assets::AssetMappings;
use bridgewatch::blockchain::{
    ChainClient, EvmRpcClient, FilterSpec, MemberRegistry, RouterContract, RouterWatcher, TransferClassifier,
    WatcherOptions,
};
use bridgewatch::config::Config;
use bridgewatch::database::{schema::init_db, PgProgressStore, PgTransferStore, ProgressStore};
use bridgewatch::metrics::PrometheusMetrics;
use bridgewatch::queue::ChannelQueue;
use bridgewatch::rest::{get_transfer, metrics, AppState};
use bridgewatch::transfer::{TransferHandler, TransferRepository};
use bridgewatch::utils::watcher_identity;
use log::{info, warn};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::watch;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env when present, then initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    info!("Starting bridgewatch with {} network(s)", config.networks.len());

    // Connect to PostgreSQL and make sure the schema exists
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.db_url)
        .await?;
    init_db(&pool).await?;

    let progress: Arc<dyn ProgressStore> = Arc::new(PgProgressStore::new(pool.clone()));
    let repository = TransferRepository::new(Arc::new(PgTransferStore::new(pool.clone())));
    let registry = Arc::new(AssetMappings::from_file(&config.assets_path)?);
    let metrics_sink = Arc::new(PrometheusMetrics::new(config.monitoring_enabled));

    // Transfer consumers must subscribe before any watcher pushes
    let queue = Arc::new(ChannelQueue::new());
    let consumers = Arc::new(TransferHandler::new(repository.clone())).spawn(&queue);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut watchers = Vec::with_capacity(config.networks.len());

    for network in &config.networks {
        let client = Arc::new(EvmRpcClient::new(&network.rpc_url, network.confirmations)?);
        let chain_id = client.chain_id().await?;
        let identity = watcher_identity(chain_id, &network.router_address);

        let router = Arc::new(RouterContract::new(client.clone(), &network.router_address));
        if let Err(e) = router.reload_members().await {
            warn!("Watcher [{}] could not load router members: {}", identity, e);
        }

        let classifier = TransferClassifier::new(
            client.clone(),
            registry.clone(),
            router,
            metrics_sink.clone(),
            queue.clone(),
            config.validator,
            config.settlement_chain_id,
        );

        let watcher = RouterWatcher::new(
            &identity,
            client,
            progress.clone(),
            classifier,
            FilterSpec::new(&network.router_address, network.max_logs_blocks),
            WatcherOptions {
                start_block: network.start_block,
                polling_interval: network.polling_interval,
            },
        )
        .await?;

        info!("Watching [{}] router [{}] as [{}]", network.label, network.router_address, identity);
        watchers.push(watcher.spawn(shutdown_rx.clone()));
    }

    // Start HTTP server for metrics and transfer lookups
    let state = AppState::new(repository);
    info!("Serving HTTP on {}", config.bind_addr);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(get_transfer)
            .service(metrics)
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    // Stop watchers once the server is down, then the queue consumers
    info!("HTTP server stopped, shutting down watchers");
    shutdown_tx.send(true).ok();
    for watcher in watchers {
        if let Err(e) = watcher.await {
            warn!("Watcher task ended abnormally: {}", e);
        }
    }
    for consumer in consumers {
        consumer.abort();
    }

    Ok(())
}
