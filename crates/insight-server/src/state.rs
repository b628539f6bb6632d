//! Shared application state.

use std::sync::Arc;

use insight_core::{AnalysisConfig, Analyzer};

use crate::config::Config;
use crate::store::FlightStore;

/// Handles shared by every request. The analyzer itself is stateless.
pub struct AppState {
    config: Config,
    analyzer: Arc<Analyzer>,
    store: FlightStore,
}

impl AppState {
    pub fn new(config: Config, analysis: AnalysisConfig) -> Self {
        let store = FlightStore::new(config.data_path.clone());
        Self {
            config,
            analyzer: Arc::new(Analyzer::new(analysis)),
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cloned handle for use inside blocking tasks.
    pub fn analyzer(&self) -> Arc<Analyzer> {
        Arc::clone(&self.analyzer)
    }

    pub fn store(&self) -> &FlightStore {
        &self.store
    }
}
