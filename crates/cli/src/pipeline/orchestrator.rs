//! Wires configuration, storage, registry and dispatcher together.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use contracts::RevalidatorConfig;
use dispatcher::{
    build_client, Alerter, DiagnosticRunner, Dispatcher, DispatcherConfig, RetryWorker,
    RevalidationService,
};
use registry::FrontendRegistry;
use store::SqliteStore;

use crate::error::CliError;

/// Every component a command may need, built from one configuration
pub struct Pipeline {
    pub config: RevalidatorConfig,
    pub store: Arc<SqliteStore>,
    pub service: RevalidationService,
}

impl Pipeline {
    /// Load the configuration file and build the pipeline
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()).into());
        }
        let config = config_loader::ConfigLoader::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        Self::from_config(config)
    }

    pub fn from_config(config: RevalidatorConfig) -> Result<Self> {
        let store = Arc::new(
            SqliteStore::open(&config.storage.path)
                .with_context(|| format!("Failed to open store at {}", config.storage.path))?,
        );
        let client = build_client().context("Failed to build HTTP client")?;

        let alerter = Alerter::from_config(&config.alerts, client.clone(), config.timeouts.alert());
        debug!(
            threshold = alerter.threshold(),
            channels = alerter.channel_count(),
            "Alerter ready"
        );

        let dispatcher = Dispatcher::builder(store.clone(), store.clone())
            .config(DispatcherConfig::from_config(&config))
            .client(client)
            .notifier(Arc::new(alerter))
            .build()
            .context("Failed to build dispatcher")?;

        let registry =
            FrontendRegistry::from_config(&config).context("Failed to build frontend registry")?;
        info!(
            storage = %config.storage.path,
            secrets = registry.secret_store_name(),
            "Pipeline ready"
        );

        let service = RevalidationService::new(Arc::new(registry), Arc::new(dispatcher))
            .with_queue(store.clone());

        Ok(Self {
            config,
            store,
            service,
        })
    }

    pub fn worker(&self) -> RetryWorker {
        RetryWorker::new(
            self.service.dispatcher().clone(),
            self.store.clone(),
            self.config.queue.visibility_timeout(),
        )
    }

    pub fn diagnostics(&self) -> DiagnosticRunner {
        DiagnosticRunner::from_config(
            &self.config,
            self.service.dispatcher().client().clone(),
            self.store.clone(),
        )
    }
}
