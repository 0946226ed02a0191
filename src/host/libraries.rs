//! Installed-library resolution
//!
//! The dependency checker validates declared library requirements against
//! whatever the host environment actually ships. The resolver answers one
//! question: which version of a named library, if any, is installed.

use std::collections::HashMap;

/// Source of truth for installed external libraries.
pub trait LibraryResolver {
    /// Installed version of `library`, or `None` when absent.
    fn installed_version(&self, library: &str) -> Option<String>;

    fn is_installed(&self, library: &str) -> bool {
        self.installed_version(library).is_some()
    }
}

/// Fixed map of installed libraries, populated by the host at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticLibraryResolver {
    versions: HashMap<String, String>,
}

impl StaticLibraryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(
        mut self,
        library: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.versions.insert(library.into(), version.into());
        self
    }

    pub fn insert(&mut self, library: impl Into<String>, version: impl Into<String>) {
        self.versions.insert(library.into(), version.into());
    }
}

impl LibraryResolver for StaticLibraryResolver {
    fn installed_version(&self, library: &str) -> Option<String> {
        self.versions.get(library).cloned()
    }
}
