//! Placement driver server

use crate::common::{Config, Result};
use crate::coordinator::alloc::FileIdAllocator;
use crate::coordinator::cache::RegionCache;
use crate::coordinator::cluster::Cluster;
use crate::coordinator::dispatch::CacheDispatcher;
use crate::coordinator::event::{EventBus, OperatorEvent};
use crate::coordinator::history::HistoryLog;
use crate::coordinator::http::{create_router, CoordState};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct Coordinator {
    config: Config,
}

impl Coordinator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        let server = &self.config.server;
        tracing::info!("Starting placement driver: {}", server.name);
        tracing::info!("  HTTP API: {}", server.bind_addr);
        tracing::info!("  Data dir: {}", server.data_dir.display());
        tracing::info!("  Max replicas: {}", self.config.replication.max_replicas);

        let id_alloc = Arc::new(FileIdAllocator::open(&server.data_dir, server.id_batch_size).await?);
        let cache = Arc::new(RegionCache::new());
        let histories = Arc::new(HistoryLog::new(server.history_capacity));
        let events = EventBus::new();
        let dispatcher = Arc::new(CacheDispatcher::new(cache.clone()));

        let cluster = Cluster::new(
            id_alloc,
            cache.clone(),
            histories,
            Arc::new(events.clone()),
            dispatcher,
        )
        .with_timeouts(server.lookup_timeout(), server.alloc_timeout());

        tokio::spawn(log_operator_events(events.subscribe()));

        let bind_addr = server.bind_addr;
        let state = CoordState {
            cluster: Arc::new(cluster),
            cache,
            config: Arc::new(RwLock::new(self.config)),
        };
        let router = create_router(state);

        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!("Placement driver ready");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Placement driver stopped");
        Ok(())
    }
}

async fn log_operator_events(mut rx: broadcast::Receiver<OperatorEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => tracing::info!(
                "operator {} {} for region {}",
                event.operator.kind(),
                event.kind,
                event.region_id
            ),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("operator event observer lagged, {} events dropped", n)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
