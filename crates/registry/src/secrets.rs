//! Secret-store backends
//!
//! A lookup answers "absent" for names the store does not know; errors are
//! reserved for stores that exist but cannot be read.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contracts::{ContractError, SecretBackend, SecretStore, SecretStoreConfig};
use tracing::debug;

/// Build the configured secret store
pub fn secret_store_from_config(
    config: &SecretStoreConfig,
) -> Result<Arc<dyn SecretStore>, ContractError> {
    let store: Arc<dyn SecretStore> = match config.backend {
        SecretBackend::None => Arc::new(NoopSecretStore),
        SecretBackend::Env => Arc::new(EnvSecretStore::new(&config.env_prefix)),
        SecretBackend::File => {
            let dir = config.dir.as_ref().ok_or_else(|| {
                ContractError::config_validation("secrets.dir", "required for the file backend")
            })?;
            Arc::new(FileSecretStore::new(dir))
        }
    };
    debug!(store = store.name(), "Secret store ready");
    Ok(store)
}

/// No vault: every reference is a literal secret
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSecretStore;

impl SecretStore for NoopSecretStore {
    fn name(&self) -> &str {
        "none"
    }

    fn try_resolve(&self, _name: &str) -> Result<Option<String>, ContractError> {
        Ok(None)
    }
}

/// Secrets held in environment variables named `{prefix}{NAME}`
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    prefix: String,
}

impl EnvSecretStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Variable name for a secret name
    pub fn var_name(&self, name: &str) -> String {
        let suffix: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn try_resolve(&self, name: &str) -> Result<Option<String>, ContractError> {
        match std::env::var(self.var_name(name)) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(ContractError::secret_lookup(
                self.name(),
                "variable is not valid unicode",
            )),
        }
    }
}

/// One file per secret under a directory (e.g. mounted container secrets)
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn is_plain_name(name: &str) -> bool {
        !name.is_empty()
            && !name.contains(['/', '\\', '\0'])
            && name != "."
            && !name.contains("..")
    }
}

impl SecretStore for FileSecretStore {
    fn name(&self) -> &str {
        "file"
    }

    fn try_resolve(&self, name: &str) -> Result<Option<String>, ContractError> {
        if !Self::is_plain_name(name) {
            return Ok(None);
        }
        match std::fs::read_to_string(self.dir.join(name)) {
            Ok(value) => Ok(Some(value.trim_end_matches(['\r', '\n']).to_string())),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                Ok(None)
            }
            // the io error text carries no path, so the name stays out of logs
            Err(e) => Err(ContractError::secret_lookup(self.name(), e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_store() {
        assert_eq!(NoopSecretStore.try_resolve("anything").unwrap(), None);
    }

    #[test]
    fn test_env_var_name() {
        let store = EnvSecretStore::new("REVALIDATOR_SECRET_");
        assert_eq!(
            store.var_name("marketing-site.key"),
            "REVALIDATOR_SECRET_MARKETING_SITE_KEY"
        );
    }

    #[test]
    fn test_env_store_lookup() {
        let store = EnvSecretStore::new("REGISTRY_TEST_SECRET_");
        std::env::set_var("REGISTRY_TEST_SECRET_PRESENT", "s3cr3t");
        assert_eq!(
            store.try_resolve("present").unwrap(),
            Some("s3cr3t".to_string())
        );
        assert_eq!(store.try_resolve("absent").unwrap(), None);
    }

    #[test]
    fn test_file_store_lookup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marketing"), "from-file\n").unwrap();
        let store = FileSecretStore::new(dir.path());

        assert_eq!(
            store.try_resolve("marketing").unwrap(),
            Some("from-file".to_string())
        );
        assert_eq!(store.try_resolve("missing").unwrap(), None);
        assert_eq!(store.try_resolve("../marketing").unwrap(), None);
        assert_eq!(store.try_resolve("a/b").unwrap(), None);
    }

    #[test]
    fn test_file_backend_requires_dir() {
        let config = SecretStoreConfig {
            backend: SecretBackend::File,
            ..Default::default()
        };
        assert!(secret_store_from_config(&config).is_err());
    }

    #[test]
    fn test_build_env_store() {
        let config = SecretStoreConfig {
            backend: SecretBackend::Env,
            ..Default::default()
        };
        assert_eq!(secret_store_from_config(&config).unwrap().name(), "env");
    }
}
