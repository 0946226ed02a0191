//! Module registry
//!
//! Insertion-ordered mapping from module name to instantiated module,
//! exclusively owned by the loader. Registration order equals load order
//! equals the order names appear in the configured module list.

use std::collections::HashMap;

use semver::Version;
use tracing::debug;

use crate::error::ModuleError;
use crate::module::traits::Module;

/// An instantiated module together with the identity the loader assigned it.
pub struct ModuleEntry {
    name: String,
    version_raw: String,
    version: Version,
    module: Box<dyn Module>,
}

impl ModuleEntry {
    pub(crate) fn new(
        name: String,
        version_raw: String,
        version: Version,
        module: Box<dyn Module>,
    ) -> Self {
        Self {
            name,
            version_raw,
            version,
            module,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version string exactly as the module declared it.
    pub fn version_str(&self) -> &str {
        &self.version_raw
    }

    /// Parsed semantic version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn module(&self) -> &dyn Module {
        self.module.as_ref()
    }

    pub fn module_mut(&mut self) -> &mut dyn Module {
        self.module.as_mut()
    }
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("version", &self.version_raw)
            .finish()
    }
}

/// Insertion-ordered module registry.
#[derive(Default)]
pub struct ModuleRegistry {
    entries: Vec<ModuleEntry>,
    index: HashMap<String, usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a module under its assigned name. Duplicate names are an
    /// error; nothing is replaced.
    pub fn insert(&mut self, entry: ModuleEntry) -> Result<(), ModuleError> {
        if self.index.contains_key(entry.name()) {
            return Err(ModuleError::DuplicateModule(entry.name().to_string()));
        }
        debug!(module = entry.name(), version = entry.version_str(), "module registered");
        self.index.insert(entry.name().to_string(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ModuleEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Zero-based registration position of a module, if registered.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ModuleEntry> {
        self.entries.iter_mut()
    }

    /// Registered module names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }
}
