//! FrontendRegistry - configured frontends and secret resolution

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use config_loader::ConfigLoader;
use contracts::{
    ContractError, FrontendSource, FrontendTarget, LegacySettings, RevalidatorConfig,
    SecretStore,
};
use tracing::{debug, info, instrument, warn};

use crate::secrets::{secret_store_from_config, NoopSecretStore};

/// Frontends declared inline in the main configuration
#[derive(Debug, Clone, Default)]
pub struct StaticFrontends {
    frontends: Vec<FrontendTarget>,
}

impl StaticFrontends {
    pub fn new(frontends: Vec<FrontendTarget>) -> Self {
        Self { frontends }
    }
}

impl FrontendSource for StaticFrontends {
    fn name(&self) -> &str {
        "static"
    }

    fn load(&self) -> Result<Vec<FrontendTarget>, ContractError> {
        Ok(self.frontends.clone())
    }
}

/// Frontends read from a separately administered file on every lookup
#[derive(Debug, Clone)]
pub struct FileFrontends {
    path: PathBuf,
}

impl FileFrontends {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl FrontendSource for FileFrontends {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self) -> Result<Vec<FrontendTarget>, ContractError> {
        ConfigLoader::load_frontends(&self.path)
            .map_err(|e| ContractError::frontend_source(self.name(), e.to_string()))
    }
}

/// Resolves frontend targets and their secrets
pub struct FrontendRegistry {
    source: Box<dyn FrontendSource>,
    legacy: LegacySettings,
    secrets: Arc<dyn SecretStore>,
}

impl FrontendRegistry {
    pub fn new(
        source: Box<dyn FrontendSource>,
        legacy: LegacySettings,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            source,
            legacy,
            secrets,
        }
    }

    /// Registry with inline frontends and no secret store
    pub fn with_frontends(frontends: Vec<FrontendTarget>, legacy: LegacySettings) -> Self {
        Self::new(
            Box::new(StaticFrontends::new(frontends)),
            legacy,
            Arc::new(NoopSecretStore),
        )
    }

    /// Build from configuration: the frontends file wins over inline frontends
    pub fn from_config(config: &RevalidatorConfig) -> Result<Self, ContractError> {
        let source: Box<dyn FrontendSource> = match &config.frontends_file {
            Some(path) => Box::new(FileFrontends::new(path)),
            None => Box::new(StaticFrontends::new(config.frontends.clone())),
        };
        let secrets = secret_store_from_config(&config.secrets)?;
        Ok(Self::new(source, config.legacy.clone(), secrets))
    }

    /// All frontends keyed by id, or the legacy `default` target when none are
    /// configured or the lookup fails
    #[instrument(name = "registry_list_frontends", skip(self), fields(source = self.source.name()))]
    pub fn list_frontends(&self) -> BTreeMap<String, FrontendTarget> {
        let loaded = match self.source.load() {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "Frontend lookup failed, using legacy default");
                Vec::new()
            }
        };

        let mut map: BTreeMap<String, FrontendTarget> = loaded
            .into_iter()
            .filter(|fe| !fe.id.trim().is_empty())
            .map(|fe| (fe.id.clone(), fe))
            .collect();

        if map.is_empty() {
            let fallback = self.legacy.default_frontend();
            map.insert(fallback.id.clone(), fallback);
        }
        debug!(count = map.len(), "Frontends listed");
        map
    }

    /// A single frontend by id
    pub fn frontend(&self, id: &str) -> Option<FrontendTarget> {
        self.list_frontends().remove(id)
    }

    /// Secret value for a reference: the stored secret of that name, else the
    /// reference itself as a literal
    pub fn resolve_secret(&self, reference: &str) -> String {
        if reference.is_empty() {
            return String::new();
        }
        match self.secrets.try_resolve(reference) {
            Ok(Some(value)) => value,
            Ok(None) => reference.to_string(),
            Err(e) => {
                info!(
                    store = self.secrets.name(),
                    error = %e,
                    "Secret lookup failed, treating reference as literal"
                );
                reference.to_string()
            }
        }
    }

    pub fn secret_store_name(&self) -> &str {
        self.secrets.name()
    }
}
