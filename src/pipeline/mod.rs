//! Per-module configuration pipeline
//!
//! Runs one module through the ordered stages: config merge, service
//! registration, listener registration, route registration, then the
//! module's own init hook. Each stage is gated on the module's capability
//! tags and followed by a stage event - except routes, which are appended
//! silently. A listener stopping a stage event with an attached error aborts
//! the pipeline, and with it the rest of the load, immediately.
//!
//! Listeners a module registers here are live for every event emitted
//! afterwards, including the module's own `ModuleLoaded`.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::deep_merge;
use crate::error::ModuleError;
use crate::event::{EventDispatcher, EventKind, LifecycleEvent};
use crate::host::{RouteTable, ServiceRegistry};
use crate::module::registry::ModuleEntry;
use crate::module::traits::{Capabilities, LoadContext};

const EMITTER: &str = "configurator";

/// Drives the staged pipeline over loader-owned state.
pub struct Configurator<'a> {
    dispatcher: &'a mut EventDispatcher,
    services: &'a mut dyn ServiceRegistry,
    routes: &'a mut dyn RouteTable,
    merged_config: &'a mut Value,
}

impl<'a> Configurator<'a> {
    pub fn new(
        dispatcher: &'a mut EventDispatcher,
        services: &'a mut dyn ServiceRegistry,
        routes: &'a mut dyn RouteTable,
        merged_config: &'a mut Value,
    ) -> Self {
        Self {
            dispatcher,
            services,
            routes,
            merged_config,
        }
    }

    /// Run all stages for one module, in order, stopping at the first
    /// failure.
    pub fn configure(&mut self, entry: &mut ModuleEntry) -> Result<(), ModuleError> {
        let caps = entry.module().capabilities();

        self.merge_config(entry, caps)?;
        self.register_services(entry, caps)?;
        self.register_listeners(entry, caps)?;
        self.register_routes(entry, caps);
        self.init_module(entry)?;

        info!(module = entry.name(), "module configured");
        Ok(())
    }

    /// Stage 1: deep-merge the module's contribution into the running
    /// merged configuration.
    fn merge_config(
        &mut self,
        entry: &ModuleEntry,
        caps: Capabilities,
    ) -> Result<(), ModuleError> {
        if !caps.contains(Capabilities::CONFIG) {
            return Ok(());
        }
        let contribution = entry.module().config();
        if !contribution.is_object() {
            return Err(ModuleError::InvalidModule {
                name: entry.name().to_string(),
                reason: "config contribution must be a mapping".to_string(),
            });
        }
        deep_merge(self.merged_config, &contribution);
        debug!(module = entry.name(), "config merged");

        self.dispatcher.emit(
            LifecycleEvent::new(EventKind::ConfigMerged, EMITTER)
                .with_parent(EventKind::BeforeLoad)
                .with_param("module", json!(entry.name()))
                .with_param("config", contribution)
                .with_param("merged_config", self.merged_config.clone()),
        )
    }

    /// Stage 2: hand each service definition to the host registry.
    fn register_services(
        &mut self,
        entry: &ModuleEntry,
        caps: Capabilities,
    ) -> Result<(), ModuleError> {
        if !caps.contains(Capabilities::SERVICES) {
            return Ok(());
        }
        let mut registered = Vec::new();
        for (name, definition) in entry.module().services() {
            self.services.register(&name, definition)?;
            registered.push(name);
        }
        debug!(module = entry.name(), count = registered.len(), "services registered");

        self.dispatcher.emit(
            LifecycleEvent::new(EventKind::ServicesAdded, EMITTER)
                .with_parent(EventKind::BeforeLoad)
                .with_param("module", json!(entry.name()))
                .with_param("services", json!(registered)),
        )
    }

    /// Stage 3: register the module's lifecycle listeners with their
    /// declared priorities.
    fn register_listeners(
        &mut self,
        entry: &ModuleEntry,
        caps: Capabilities,
    ) -> Result<(), ModuleError> {
        if !caps.contains(Capabilities::LISTENERS) {
            return Ok(());
        }
        let bindings = entry.module().listeners();

        let mut by_event: BTreeMap<String, Vec<i32>> = BTreeMap::new();
        for binding in &bindings {
            by_event
                .entry(format!("{:?}", binding.event))
                .or_default()
                .push(binding.priority);
        }
        for binding in bindings {
            self.dispatcher
                .add_module_listener(binding.event, binding.listener, binding.priority);
        }
        debug!(module = entry.name(), "lifecycle listeners registered");

        self.dispatcher.emit(
            LifecycleEvent::new(EventKind::ListenersAdded, EMITTER)
                .with_parent(EventKind::BeforeLoad)
                .with_param("module", json!(entry.name()))
                .with_param("event_listeners", json!(by_event)),
        )
    }

    /// Stage 4: append routes in declaration order. No event for this
    /// stage.
    fn register_routes(&mut self, entry: &ModuleEntry, caps: Capabilities) {
        if !caps.contains(Capabilities::ROUTES) {
            return;
        }
        for route in entry.module().routes() {
            self.routes.add(route);
        }
        debug!(module = entry.name(), "routes registered");
    }

    /// Stage 5: the module's own init hook, then `ModuleLoaded`.
    fn init_module(&mut self, entry: &mut ModuleEntry) -> Result<(), ModuleError> {
        let name = entry.name().to_string();
        let version = entry.version_str().to_string();
        let mut ctx = LoadContext {
            module_name: &name,
            merged_config: self.merged_config,
        };
        entry.module_mut().init(&mut ctx)?;

        self.dispatcher.emit(
            LifecycleEvent::new(EventKind::ModuleLoaded, EMITTER)
                .with_parent(EventKind::BeforeLoad)
                .with_param("module", json!(name))
                .with_param("version", json!(version)),
        )
    }
}
