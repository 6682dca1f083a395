//! Publishes generated test orders to the orders topic, for exercising the
//! ingestion pipeline locally. With POISON=1 it also emits a malformed
//! payload and an invalid order to exercise the poison path.

use anyhow::Result;
use common::AppConfig;
use domain::fixtures::test_order;
use messaging::OrderPublisher;
use rand::Rng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn random_uid() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..19)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_gen=info,messaging=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    let count: usize = std::env::var("ORDER_COUNT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let poison = std::env::var("POISON").map(|v| v == "1").unwrap_or(false);

    let publisher = OrderPublisher::new(&config.kafka.brokers, config.kafka.topic.clone())?;

    for _ in 0..count {
        let order = test_order(&random_uid());
        publisher.publish(&order).await?;
    }
    info!(count, "orders published");

    if poison {
        publisher.publish_raw("poison-not-json", b"not json").await?;

        let mut invalid = test_order(&random_uid());
        invalid.payment.amount = -5.0;
        publisher.publish(&invalid).await?;
        info!("poison messages published");
    }

    Ok(())
}
