//! Load orchestration
//!
//! The [`Loader`] owns the module registry and drives the whole load:
//! resolve the configured module list, instantiate every module, validate
//! every module's dependencies, consult the result cache, then run each
//! module through the configuration pipeline (or adopt the cached merged
//! configuration and skip the pipeline wholesale). Progress is a linear
//! state machine with no retries; any failure lands in `Failed` and
//! surfaces to the caller.
//!
//! Modules configured before a failure stay registered and initialized -
//! the load is at-least-partially-initialized, never rolled back. A
//! re-invoked `load` starts a fresh configuration pass: module-contributed
//! routes and listeners from the previous pass are dropped before modules
//! contribute them again, so retries do not accumulate duplicates.

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, MemoryCache};
use crate::config::{
    CacheSettings, ConfigSource, DEFAULT_CACHE_ADAPTER, DEFAULT_CACHE_KEY, MODULE_LIST_KEY,
};
use crate::error::ModuleError;
use crate::event::{EventDispatcher, EventKind, LifecycleEvent, ListenerFn};
use crate::host::{
    LibraryResolver, MapServiceRegistry, RouteTable, ServiceRegistry, StaticLibraryResolver,
    VecRouteTable,
};
use crate::module::instantiator::Instantiator;
use crate::module::registry::{ModuleEntry, ModuleRegistry};
use crate::module::{DependencyChecker, Module};
use crate::pipeline::Configurator;

const EMITTER: &str = "loader";

/// Linear load progress. `Failed` is absorbing and reachable from any
/// step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    ModuleListResolved,
    Instantiated,
    DependenciesChecked,
    CacheConsulted,
    Configured,
    Completed,
    Failed,
}

/// Module loading orchestrator.
pub struct Loader {
    dispatcher: EventDispatcher,
    instantiator: Instantiator,
    registry: ModuleRegistry,
    services: Box<dyn ServiceRegistry>,
    routes: Box<dyn RouteTable>,
    libraries: Box<dyn LibraryResolver>,
    cache_adapters: HashMap<String, Box<dyn CacheStore>>,
    merged_config: Value,
    state: LoadState,
}

impl Loader {
    /// Loader wired to map-backed host collaborators and the in-memory
    /// cache adapter.
    pub fn new() -> Self {
        let mut cache_adapters: HashMap<String, Box<dyn CacheStore>> = HashMap::new();
        cache_adapters.insert(
            DEFAULT_CACHE_ADAPTER.to_string(),
            Box::new(MemoryCache::new()),
        );
        Self {
            dispatcher: EventDispatcher::new(),
            instantiator: Instantiator::new(),
            registry: ModuleRegistry::new(),
            services: Box::new(MapServiceRegistry::new()),
            routes: Box::new(VecRouteTable::new()),
            libraries: Box::new(StaticLibraryResolver::new()),
            cache_adapters,
            merged_config: Value::Object(serde_json::Map::new()),
            state: LoadState::Idle,
        }
    }

    /// Replace the host service registry.
    pub fn with_services(mut self, services: Box<dyn ServiceRegistry>) -> Self {
        self.services = services;
        self
    }

    /// Replace the host route table.
    pub fn with_routes(mut self, routes: Box<dyn RouteTable>) -> Self {
        self.routes = routes;
        self
    }

    /// Replace the installed-library resolver.
    pub fn with_libraries(mut self, libraries: Box<dyn LibraryResolver>) -> Self {
        self.libraries = libraries;
        self
    }

    /// Register a module constructor for a name appearing in the module
    /// list.
    pub fn register_module<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Module> + 'static,
    {
        self.instantiator.register(name, factory);
    }

    /// Register a cache adapter selectable via the `adapter` cache
    /// setting. Registering under the default name replaces the built-in
    /// in-memory adapter.
    pub fn register_cache_adapter(
        &mut self,
        name: impl Into<String>,
        adapter: Box<dyn CacheStore>,
    ) {
        self.cache_adapters.insert(name.into(), adapter);
    }

    /// Register a lifecycle listener ahead of the next load.
    pub fn add_listener(&mut self, kind: EventKind, listener: ListenerFn, priority: i32) {
        self.dispatcher.add_listener(kind, listener, priority);
    }

    /// Run a full load from the host configuration.
    pub fn load(&mut self, config: &dyn ConfigSource) -> Result<(), ModuleError> {
        match self.run_load(config) {
            Ok(()) => Ok(()),
            Err(error) => {
                warn!(%error, "module load failed");
                self.state = LoadState::Failed;
                Err(error)
            }
        }
    }

    fn run_load(&mut self, config: &dyn ConfigSource) -> Result<(), ModuleError> {
        self.state = LoadState::Idle;
        self.registry = ModuleRegistry::new();
        self.merged_config = config.snapshot();

        if !config.has(MODULE_LIST_KEY) {
            info!("no module list configured, completing with zero modules");
            self.state = LoadState::Completed;
            return Ok(());
        }
        let names = Self::module_names_from(config)?;
        self.state = LoadState::ModuleListResolved;

        self.dispatcher.emit(
            LifecycleEvent::new(EventKind::BeforeLoad, EMITTER)
                .with_param("config", config.snapshot())
                .with_param("module_list", json!(names)),
        )?;

        for name in &names {
            let entry = self.instantiator.instantiate(name)?;
            self.registry.insert(entry)?;
        }
        self.state = LoadState::Instantiated;

        // Total validation pass over the full registry before any module
        // is configured.
        {
            let checker = DependencyChecker::new(&self.dispatcher, self.libraries.as_ref());
            for entry in self.registry.iter() {
                checker.check(entry, &self.registry)?;
            }
        }
        self.state = LoadState::DependenciesChecked;

        let settings = CacheSettings::from_source(config)?;
        let adapter_name = self.resolve_adapter_name(&settings);
        let (cached, effective_key) = self.cache_consult(&adapter_name, &settings.key)?;
        self.state = LoadState::CacheConsulted;

        match cached {
            Some(Value::Object(map)) => {
                info!(key = %effective_key, "merged configuration adopted from cache, pipeline skipped");
                self.merged_config = Value::Object(map);
            }
            _ => {
                // Modules are about to re-contribute routes and listeners;
                // drop what a previous configuration pass installed so a
                // re-invoked load does not accumulate duplicates.
                self.dispatcher.clear_module_listeners();
                self.routes.clear();

                let mut configurator = Configurator::new(
                    &mut self.dispatcher,
                    self.services.as_mut(),
                    self.routes.as_mut(),
                    &mut self.merged_config,
                );
                for entry in self.registry.iter_mut() {
                    configurator.configure(entry)?;
                }

                let snapshot = self.merged_config.clone();
                let adapter = self.adapter_mut(&adapter_name)?;
                adapter.set(&effective_key, snapshot, settings.ttl())?;
                debug!(key = %effective_key, ttl_secs = settings.ttl_secs, "merged configuration cached");
            }
        }
        self.state = LoadState::Configured;

        self.dispatcher.emit(
            LifecycleEvent::new(EventKind::AfterLoad, EMITTER)
                .with_param("modules", json!(self.registry.names())),
        )?;
        self.state = LoadState::Completed;
        info!(modules = self.registry.len(), "module load complete");
        Ok(())
    }

    fn module_names_from(config: &dyn ConfigSource) -> Result<Vec<String>, ModuleError> {
        let value = config.get(MODULE_LIST_KEY).unwrap_or(Value::Null);
        let Value::Array(items) = value else {
            return Err(ModuleError::InvalidConfig(format!(
                "{MODULE_LIST_KEY} must be an array of module names"
            )));
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(name),
                other => Err(ModuleError::InvalidConfig(format!(
                    "{MODULE_LIST_KEY} entries must be strings, got {other}"
                ))),
            })
            .collect()
    }

    fn resolve_adapter_name(&self, settings: &CacheSettings) -> String {
        if self.cache_adapters.contains_key(&settings.adapter) {
            settings.adapter.clone()
        } else {
            warn!(
                adapter = %settings.adapter,
                "unknown cache adapter, falling back to {DEFAULT_CACHE_ADAPTER}"
            );
            DEFAULT_CACHE_ADAPTER.to_string()
        }
    }

    fn adapter_mut(&mut self, name: &str) -> Result<&mut Box<dyn CacheStore>, ModuleError> {
        self.cache_adapters
            .get_mut(name)
            .ok_or_else(|| ModuleError::InvalidConfig(format!("cache adapter {name} not registered")))
    }

    /// Consult the cache, falling back exactly once to the default key
    /// when the configured key fails adapter-side validation. Returns the
    /// cached value (if any) and the key writes should use.
    fn cache_consult(
        &mut self,
        adapter_name: &str,
        key: &str,
    ) -> Result<(Option<Value>, String), ModuleError> {
        let adapter = self.adapter_mut(adapter_name)?;
        match adapter.get(key) {
            Ok(value) => Ok((value, key.to_string())),
            Err(ModuleError::InvalidCacheKey(bad)) if key != DEFAULT_CACHE_KEY => {
                warn!(key = %bad, "configured cache key invalid, retrying with default key");
                let value = adapter.get(DEFAULT_CACHE_KEY)?;
                Ok((value, DEFAULT_CACHE_KEY.to_string()))
            }
            Err(error) => Err(error),
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    /// Look up a loaded module by name.
    pub fn get_module(&self, name: &str) -> Result<&ModuleEntry, ModuleError> {
        self.registry
            .get(name)
            .ok_or_else(|| ModuleError::ModuleNotFound(name.to_string()))
    }

    /// Names of loaded modules in load order.
    pub fn module_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn merged_config(&self) -> &Value {
        &self.merged_config
    }

    pub fn services(&self) -> &dyn ServiceRegistry {
        self.services.as_ref()
    }

    pub fn routes(&self) -> &dyn RouteTable {
        self.routes.as_ref()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
