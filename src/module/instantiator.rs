//! Module instantiation
//!
//! Resolves module names to registered constructors. Hosts register a
//! factory per module name at startup; the loader asks the instantiator for
//! a concrete module when the name shows up in the configured module list.
//! No reflection, no discovery: an unregistered name simply does not exist.

use std::collections::HashMap;

use tracing::debug;

use crate::error::ModuleError;
use crate::module::dependency::parse_version;
use crate::module::registry::ModuleEntry;
use crate::module::traits::Module;

/// Constructor registered for a module name.
pub type ModuleFactory = Box<dyn Fn() -> Box<dyn Module>>;

/// Name-to-factory registry resolving module names to instances.
#[derive(Default)]
pub struct Instantiator {
    factories: HashMap<String, ModuleFactory>,
}

impl Instantiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for a module name. A later registration for
    /// the same name replaces the earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Module> + 'static,
    {
        let name = name.into();
        debug!(module = %name, "module factory registered");
        self.factories.insert(name, Box::new(factory));
    }

    pub fn has_factory(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Resolve `name` to a module instance and assign `name` as its
    /// identity.
    ///
    /// Fails with `ModuleNotFound` when no factory is registered and
    /// `InvalidModule` when the constructed module does not satisfy the
    /// contract (its declared version must parse as semver; a leading `v`
    /// is stripped first).
    pub fn instantiate(&self, name: &str) -> Result<ModuleEntry, ModuleError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ModuleError::ModuleNotFound(name.to_string()))?;

        let module = factory();
        let version_raw = module.version().to_string();
        if version_raw.is_empty() {
            return Err(ModuleError::InvalidModule {
                name: name.to_string(),
                reason: "declared version is empty".to_string(),
            });
        }
        let version = parse_version(&version_raw).map_err(|e| ModuleError::InvalidModule {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        debug!(module = name, version = %version_raw, "module instantiated");
        Ok(ModuleEntry::new(name.to_string(), version_raw, version, module))
    }
}
