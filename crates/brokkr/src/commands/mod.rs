//! CLI command implementations

pub mod download;
pub mod ledger;
pub mod list;
pub mod policy;
pub mod verify;

use anyhow::{Context, Result};
use brokkr_core::{BrokkrConfig, SchemaValidator};
use brokkr_runtimes::{FsReader, LifecycleClient, NodeJsProvider, PolicyStore, ProviderRegistry};
use brokkr_verify::{ClamScanner, MalwareScanner};
use camino::Utf8Path;
use std::sync::Arc;

/// Load brokkr.yaml (explicit path or directory search), schema-validated
pub(crate) fn load_config(path: Option<&Utf8Path>) -> Result<BrokkrConfig> {
    let validator = SchemaValidator::new().context("Failed to load embedded schemas")?;
    BrokkrConfig::load_and_validate(path, &validator).context("Failed to load configuration")
}

/// Load the policy file named by the configuration.
///
/// There is no built-in fallback policy: without a policy file every
/// download is denied, so a missing setting is an error worth naming.
pub(crate) fn load_policy(config: &BrokkrConfig) -> Result<Arc<PolicyStore>> {
    let path = config
        .policy_file()
        .context("No policy file configured; set policy_file in brokkr.yaml")?;
    let validator = SchemaValidator::new().context("Failed to load embedded schemas")?;
    let store = PolicyStore::load(&path, &FsReader, &validator)
        .with_context(|| format!("Failed to load policy file {}", path))?;
    Ok(Arc::new(store))
}

/// Registry with every built-in runtime provider registered
pub(crate) fn build_registry(
    config: &BrokkrConfig,
    policy: Arc<PolicyStore>,
) -> Result<Arc<ProviderRegistry>> {
    let lifecycle = Arc::new(
        LifecycleClient::new(&config.inner().lifecycle, &config.inner().network)
            .context("Failed to build lifecycle client")?,
    );

    let registry = ProviderRegistry::new();
    registry
        .register(Arc::new(NodeJsProvider::new(
            lifecycle,
            policy,
            config.runtime_options("nodejs"),
        )))
        .context("Failed to register nodejs provider")?;

    Ok(Arc::new(registry))
}

/// Malware scanner when enabled in configuration.
///
/// An enabled but unusable engine is an error rather than a silent skip:
/// the operator asked for scanning, so verification must not quietly run
/// without it.
pub(crate) fn build_scanner(config: &BrokkrConfig) -> Result<Option<Arc<dyn MalwareScanner>>> {
    let scanner_config = &config.inner().scanner;
    if !scanner_config.enabled {
        return Ok(None);
    }

    let scanner = ClamScanner::new(scanner_config.clone());
    if !scanner.is_available() {
        let engine = if scanner_config.use_container {
            "docker".to_string()
        } else {
            scanner_config.command.clone()
        };
        anyhow::bail!(
            "Malware scanning is enabled but '{}' is not available; \
             install it or set scanner.enabled: false",
            engine
        );
    }

    Ok(Some(Arc::new(scanner)))
}
