pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod infrastructure;
pub mod qualification;
pub mod sync;

pub use db::DbPool;

use config::Config;
use infrastructure::InfrastructureProvider;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub infrastructure: Arc<dyn InfrastructureProvider>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: DbPool,
        infrastructure: Arc<dyn InfrastructureProvider>,
    ) -> Self {
        Self {
            config,
            db,
            infrastructure,
            metrics_handle: None,
        }
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
