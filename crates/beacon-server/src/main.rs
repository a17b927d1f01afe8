//! # beacon server
//!
//! WebRTC signaling relay: peers meet on named topics over WebSocket and
//! exchange session-negotiation payloads until they can talk directly.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings (Redis at 127.0.0.1:6379)
//! beacon
//!
//! # Run single-node without Redis
//! BEACON_STORE_BACKEND=memory beacon
//!
//! # Run with environment variables
//! BEACON_PORT=4444 BEACON_HOST=0.0.0.0 beacon
//! ```

mod config;
mod gateway;
mod handlers;
mod metrics;

use anyhow::Result;
use beacon_core::{Broadcaster, Registry, SignalRouter, Sweeper};
use beacon_store::{MemoryStore, RedisStore, SetStore};
use gateway::Gateway;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!("Starting beacon server on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Wire the registry over the configured store backend
    let store: Arc<dyn SetStore> = match config.store.backend {
        config::StoreBackend::Redis => {
            tracing::info!(url = %config.store.redis_url, "Using Redis registry store");
            Arc::new(RedisStore::new(
                &config.store.redis_url,
                config.store.key_prefix.clone(),
            )?)
        }
        config::StoreBackend::Memory => {
            tracing::warn!("Using in-memory registry store; state is local to this process");
            Arc::new(MemoryStore::new())
        }
    };

    let registry = Registry::new(store, config.registry_config());
    let gateway = Arc::new(Gateway::new(config.signal.outbound_queue));
    let broadcaster = Broadcaster::new(gateway.clone(), config.push_timeout());
    let sweeper = Sweeper::new(registry.clone());
    let router = SignalRouter::new(registry, broadcaster, sweeper.clone());

    // Periodic expiry sweep; lazy cleanup handles the rest.
    let sweep_interval = Duration::from_secs(config.store.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            match sweeper.sweep().await {
                Ok(evicted) => {
                    if evicted > 0 {
                        metrics::record_sweep_evictions(evicted);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "expiry sweep failed"),
            }
        }
    });

    // Start the server
    handlers::run_server(config, router, gateway).await?;

    Ok(())
}
