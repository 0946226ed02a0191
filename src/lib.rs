//! Module host: configuration-driven module loading for a host application.
//!
//! A host lists module names in its configuration; the [`loader::Loader`]
//! instantiates each one through registered factories, validates module and
//! library dependencies with semver constraints, deep-merges every module's
//! configuration contribution into one tree, hands services, lifecycle
//! listeners and routes to the host, and runs each module's init hook.
//! The merged configuration is cached between loads so a warm start skips
//! the configuration pipeline entirely.
//!
//! Lifecycle events fire around every step. Listeners run in priority
//! order and may stop propagation; stopping with an attached error aborts
//! the load.
//!
//! ```no_run
//! use module_host::config::MapConfigSource;
//! use module_host::loader::Loader;
//! use serde_json::json;
//!
//! # fn demo(factory: fn() -> Box<dyn module_host::module::Module>) -> Result<(), module_host::error::ModuleError> {
//! let mut config = MapConfigSource::new();
//! config.insert("modules", json!(["auth"]));
//!
//! let mut loader = Loader::new();
//! loader.register_module("auth", factory);
//! loader.load(&config)?;
//! assert!(loader.has_module("auth"));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod host;
pub mod loader;
pub mod module;
pub mod pipeline;

pub use cache::{CacheStore, MemoryCache};
pub use config::{CacheSettings, ConfigSource, MapConfigSource};
pub use error::ModuleError;
pub use event::{EventDispatcher, EventKind, LifecycleEvent};
pub use host::{
    LibraryResolver, RouteDefinition, RouteTable, ServiceRegistry, StaticLibraryResolver,
};
pub use loader::{LoadState, Loader};
pub use module::{Capabilities, DependencyDecl, ListenerBinding, LoadContext, Module};
