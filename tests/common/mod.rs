//! Shared fixtures for the integration suites: a configurable fixture
//! module, event recording, and config shorthands.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};

use module_host::config::MapConfigSource;
use module_host::error::ModuleError;
use module_host::event::{EventKind, ListenerFn};
use module_host::host::{RouteDefinition, ServiceDefinition};
use module_host::loader::Loader;
use module_host::module::{Capabilities, DependencyDecl, ListenerBinding, LoadContext, Module};

/// Forward load logs to the test writer when RUST_LOG is set. Safe to
/// call from every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One observed lifecycle event, reduced to the fields the suites assert
/// on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenEvent {
    pub kind: EventKind,
    pub module: Option<String>,
}

pub type EventLog = Rc<RefCell<Vec<SeenEvent>>>;

pub fn new_event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub const ALL_EVENT_KINDS: [EventKind; 8] = [
    EventKind::BeforeLoad,
    EventKind::LibraryDependencyChecked,
    EventKind::ModuleDependencyChecked,
    EventKind::ConfigMerged,
    EventKind::ServicesAdded,
    EventKind::ListenersAdded,
    EventKind::ModuleLoaded,
    EventKind::AfterLoad,
];

pub fn recording_listener(log: EventLog) -> ListenerFn {
    Box::new(move |event| {
        log.borrow_mut().push(SeenEvent {
            kind: event.kind(),
            module: event
                .param("module")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    })
}

/// Attach a recording listener to every event kind.
pub fn record_all_events(loader: &mut Loader, log: &EventLog) {
    for kind in ALL_EVENT_KINDS {
        loader.add_listener(kind, recording_listener(log.clone()), 0);
    }
}

pub fn kinds(log: &EventLog) -> Vec<EventKind> {
    log.borrow().iter().map(|seen| seen.kind).collect()
}

/// Host configuration with just a module list.
pub fn config_with_modules(names: &[&str]) -> MapConfigSource {
    let mut config = MapConfigSource::new();
    config.insert("modules", json!(names));
    config
}

type ListenerFactory = Rc<dyn Fn() -> Vec<ListenerBinding>>;

/// Configurable module for the integration suites. Capability tags are
/// derived from what the builder was given, matching how a real module
/// only declares what it provides.
pub struct FixtureModule {
    version: String,
    caps: Capabilities,
    config: Value,
    services: Vec<String>,
    routes: Vec<RouteDefinition>,
    module_deps: Vec<DependencyDecl>,
    library_deps: Vec<DependencyDecl>,
    listener_factory: Option<ListenerFactory>,
    init_log: Option<Rc<RefCell<Vec<String>>>>,
    fail_init: Option<String>,
}

impl FixtureModule {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            caps: Capabilities::empty(),
            config: json!({}),
            services: Vec::new(),
            routes: Vec::new(),
            module_deps: Vec::new(),
            library_deps: Vec::new(),
            listener_factory: None,
            init_log: None,
            fail_init: None,
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.caps |= Capabilities::CONFIG;
        self.config = config;
        self
    }

    pub fn with_service(mut self, name: &str) -> Self {
        self.caps |= Capabilities::SERVICES;
        self.services.push(name.to_string());
        self
    }

    pub fn with_route(mut self, name: &str, path: &str, method: &str) -> Self {
        self.caps |= Capabilities::ROUTES;
        self.routes.push(RouteDefinition::new(name, path, method));
        self
    }

    pub fn with_module_dep(mut self, name: &str, constraint: &str) -> Self {
        self.caps |= Capabilities::DEPENDENCIES;
        self.module_deps.push(DependencyDecl::new(name, constraint));
        self
    }

    pub fn with_library_dep(mut self, name: &str, constraint: &str) -> Self {
        self.caps |= Capabilities::DEPENDENCIES;
        self.library_deps.push(DependencyDecl::new(name, constraint));
        self
    }

    pub fn with_listeners<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Vec<ListenerBinding> + 'static,
    {
        self.caps |= Capabilities::LISTENERS;
        self.listener_factory = Some(Rc::new(factory));
        self
    }

    /// Record init invocations (by assigned module name) into `log`.
    pub fn with_init_log(mut self, log: Rc<RefCell<Vec<String>>>) -> Self {
        self.init_log = Some(log);
        self
    }

    pub fn failing_init(mut self, reason: &str) -> Self {
        self.fail_init = Some(reason.to_string());
        self
    }

    /// Register this fixture under `name`; the factory clones the fixture
    /// on every instantiation.
    pub fn register(self, loader: &mut Loader, name: &str) {
        loader.register_module(name, move || Box::new(self.clone()));
    }
}

impl Clone for FixtureModule {
    fn clone(&self) -> Self {
        Self {
            version: self.version.clone(),
            caps: self.caps,
            config: self.config.clone(),
            services: self.services.clone(),
            routes: self.routes.clone(),
            module_deps: self.module_deps.clone(),
            library_deps: self.library_deps.clone(),
            listener_factory: self.listener_factory.clone(),
            init_log: self.init_log.clone(),
            fail_init: self.fail_init.clone(),
        }
    }
}

impl Module for FixtureModule {
    fn version(&self) -> &str {
        &self.version
    }

    fn init(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), ModuleError> {
        if let Some(reason) = &self.fail_init {
            return Err(ModuleError::Init {
                name: ctx.module_name.to_string(),
                reason: reason.clone(),
            });
        }
        if let Some(log) = &self.init_log {
            log.borrow_mut().push(ctx.module_name.to_string());
        }
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn module_dependencies(&self) -> Vec<DependencyDecl> {
        self.module_deps.clone()
    }

    fn library_dependencies(&self) -> Vec<DependencyDecl> {
        self.library_deps.clone()
    }

    fn config(&self) -> Value {
        self.config.clone()
    }

    fn services(&self) -> Vec<(String, ServiceDefinition)> {
        self.services
            .iter()
            .map(|name| (name.clone(), Box::new(name.clone()) as ServiceDefinition))
            .collect()
    }

    fn listeners(&self) -> Vec<ListenerBinding> {
        match &self.listener_factory {
            Some(factory) => factory(),
            None => Vec::new(),
        }
    }

    fn routes(&self) -> Vec<RouteDefinition> {
        self.routes.clone()
    }
}
