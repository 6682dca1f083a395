use anyhow::Result;
use cache::MemoryCache;
use common::AppConfig;
use ingest::{IngestPipeline, RetryPolicy};
use messaging::KafkaOrderStream;
use signal_hook::consts::signal::*;
use signal_hook_tokio::Signals;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use storage::{OrderStorage, PostgresOrderStore};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ingest_service=info,ingest=info,storage=info,cache=info,messaging=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting ingest service");

    let config = AppConfig::from_env();
    info!(
        brokers = %config.kafka.brokers,
        topic = %config.kafka.topic,
        group = %config.kafka.group_id,
        cache_ttl_s = config.cache.ttl_seconds,
        cache_sweep_s = config.cache.sweep_interval_seconds,
        "configuration loaded"
    );

    info!("connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url())
        .await?;
    info!("database connected");

    let store = Arc::new(PostgresOrderStore::new(pool));
    let order_cache = Arc::new(MemoryCache::new(
        config.cache.ttl(),
        config.cache.sweep_interval(),
    ));
    let storage = Arc::new(OrderStorage::new(order_cache, store));

    // A failed warm-up is not fatal: an empty cache is the safe fallback.
    if let Err(err) = storage.load_initial_data(config.cache.warm_up_count).await {
        error!(%err, "cache warm-up failed, starting cold");
    }

    let stream = Arc::new(KafkaOrderStream::new(
        &config.kafka.brokers,
        &config.kafka.group_id,
        &config.kafka.topic,
    )?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pipeline = IngestPipeline::new(
        stream,
        storage.clone(),
        RetryPolicy::default(),
        shutdown_rx,
    );
    let pipeline_task = tokio::spawn(pipeline.run());

    let mut signals = Signals::new([SIGTERM, SIGINT])?;
    let handle = signals.handle();
    {
        use futures_util::stream::StreamExt;
        if let Some(signal) = signals.next().await {
            info!(signal, "received shutdown signal");
        }
    }

    // Stop pulling new messages; the in-flight one finishes its cycle.
    let _ = shutdown_tx.send(true);
    if let Err(err) = pipeline_task.await {
        error!(%err, "pipeline task failed");
    }

    storage.shutdown().await;
    handle.close();
    info!("ingest service stopped");

    Ok(())
}
