//! Wiring of the discovery, collection and launch components
//!
//! Every component receives its collaborators explicitly; `Engine` is just the
//! one place that builds them for a running application.

use crate::collection::CollectionService;
use crate::config;
use crate::discovery::{DiscoveryOptions, ProcessDiscovery};
use crate::icon::{platform_extractor, IconResolver};
use crate::launcher::LaunchOrchestrator;
use crate::process::{ProcessBackend, SystemProcessBackend};
use crate::storage::{JsonFileStorage, Storage};
use crate::types::{App, RunResult};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub struct Engine {
    collections: Arc<CollectionService>,
    discovery: ProcessDiscovery,
    orchestrator: LaunchOrchestrator,
}

impl Engine {
    pub fn new(
        storage: Arc<dyn Storage>,
        backend: Arc<dyn ProcessBackend>,
        icons: Option<Arc<IconResolver>>,
    ) -> Self {
        let collections = Arc::new(CollectionService::new(storage));
        let discovery = ProcessDiscovery::new(backend.clone(), collections.clone(), icons);
        let orchestrator = LaunchOrchestrator::new(collections.clone(), backend);

        Self {
            collections,
            discovery,
            orchestrator,
        }
    }

    /// Engine over the real OS, persisting in the application data directory
    pub fn open_default() -> Result<Self> {
        let data_file = config::get_data_file()?;
        let cache_dir = config::get_icon_cache_directory()?;
        tracing::info!("Using data file {}", data_file.display());

        Ok(Self::new(
            Arc::new(JsonFileStorage::new(data_file)),
            Arc::new(SystemProcessBackend::new()),
            Some(Arc::new(IconResolver::new(cache_dir, platform_extractor()))),
        ))
    }

    pub fn with_discovery_options(mut self, options: DiscoveryOptions) -> Self {
        self.discovery = self.discovery.with_options(options);
        self
    }

    pub fn scan_running_processes(&self) -> Vec<App> {
        self.discovery.scan()
    }

    pub fn run_collection(&self, id: &str) -> RunResult {
        self.orchestrator.run(id)
    }

    pub fn is_process_running(&self, path: &Path) -> bool {
        self.orchestrator.is_process_running(path)
    }

    pub fn collections(&self) -> &CollectionService {
        &self.collections
    }

    pub fn discovery(&self) -> &ProcessDiscovery {
        &self.discovery
    }

    pub fn orchestrator(&self) -> &LaunchOrchestrator {
        &self.orchestrator
    }
}
