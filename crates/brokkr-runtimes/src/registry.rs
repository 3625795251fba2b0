//! Thread-safe provider registry

use crate::provider::RuntimeProvider;
use brokkr_core::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Name → provider map guarded by a reader/writer lock
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn RuntimeProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a provider under its own name. Empty names and duplicate
    /// registrations are rejected; there is no silent overwrite.
    pub fn register(&self, provider: Arc<dyn RuntimeProvider>) -> Result<()> {
        let name = provider.name().trim().to_string();
        if name.is_empty() {
            return Err(Error::invalid_config("provider name cannot be empty"));
        }

        let mut providers = self.providers.write().unwrap();
        if providers.contains_key(&name) {
            return Err(Error::invalid_config(format!(
                "provider {} is already registered",
                name
            )));
        }
        providers.insert(name, provider);
        Ok(())
    }

    /// Look up a provider by runtime name
    pub fn get(&self, name: &str) -> Result<Arc<dyn RuntimeProvider>> {
        self.providers
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("runtime {}", name)))
    }

    /// Registered runtime names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}
