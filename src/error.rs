//! Error taxonomy for the module loading pipeline
//!
//! Every variant is fatal to the load in progress: nothing is retried
//! automatically. The host corrects the underlying condition and re-invokes
//! the whole load. The single recovery path that exists (the cache-key
//! fallback in the loader) never surfaces here.

use thiserror::Error;

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    /// No factory is registered for the requested module name,
    /// or a name lookup on the registry missed.
    #[error("module {0} does not exist")]
    ModuleNotFound(String),

    /// The resolved value does not satisfy the module contract.
    #[error("{name} is not a valid module: {reason}")]
    InvalidModule { name: String, reason: String },

    /// A second module was registered under an already-taken name.
    #[error("module {0} is already registered")]
    DuplicateModule(String),

    /// A declared module dependency is not present in the registry
    /// at check time.
    #[error("{0} is required as dependency, but is not loaded")]
    DependencyMissing(String),

    /// A module dependency is present but its version does not satisfy
    /// the declared constraint.
    #[error("{name} is required in version constraint {constraint}, version {installed} is installed")]
    DependencyVersion {
        name: String,
        constraint: String,
        installed: String,
    },

    /// A declared library dependency is absent from the environment.
    #[error("library {0} is required, but is not installed")]
    LibraryNotInstalled(String),

    /// A library is installed but its version does not satisfy the
    /// declared constraint.
    #[error("library {name} is required in version constraint {constraint}, version {installed} is installed")]
    LibraryVersion {
        name: String,
        constraint: String,
        installed: String,
    },

    /// A version or constraint string could not be parsed as semver.
    #[error("invalid version or constraint '{value}': {reason}")]
    VersionParse { value: String, reason: String },

    /// A cache key violates the `[A-Za-z0-9_.]{{1,64}}` key pattern.
    #[error("invalid cache key {0}")]
    InvalidCacheKey(String),

    /// The host configuration is structurally unusable (non-string module
    /// list entries, malformed cache settings).
    #[error("invalid host configuration: {0}")]
    InvalidConfig(String),

    /// A module's init hook reported a failure of its own.
    #[error("module {name} failed to initialize: {reason}")]
    Init { name: String, reason: String },

    /// A lifecycle listener stopped an event with an attached error.
    /// The original error is carried unwrapped so callers can downcast it.
    #[error(transparent)]
    Aborted(#[from] anyhow::Error),
}
