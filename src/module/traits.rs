//! Module contract
//!
//! Defines the trait every loadable module implements and the capability
//! tags the pipeline switches on. A module must expose a version and an init
//! hook; everything else is an optional capability, and the relevant pipeline
//! stage is a no-op for modules that do not declare it.

use bitflags::bitflags;
use serde_json::Value;

use crate::error::ModuleError;
use crate::event::{EventKind, ListenerFn};
use crate::host::{RouteDefinition, ServiceDefinition};

bitflags! {
    /// Capability tags a module declares at registration time.
    ///
    /// The pipeline only calls the accessor behind a tag when the tag is
    /// present, so a module reporting `CONFIG | ROUTES` never has its
    /// `services()` or `listeners()` consulted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        /// Contributes configuration to the merged total
        const CONFIG = 1 << 0;
        /// Registers services with the host service registry
        const SERVICES = 1 << 1;
        /// Registers lifecycle event listeners
        const LISTENERS = 1 << 2;
        /// Appends routes to the host route table
        const ROUTES = 1 << 3;
        /// Declares module and/or library dependencies
        const DEPENDENCIES = 1 << 4;
    }
}

/// A single version-constrained dependency declaration.
///
/// Declarations are kept in a `Vec` so they are checked in the order the
/// module declares them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDecl {
    /// Module name or library name, depending on which list this sits in
    pub name: String,
    /// Semver constraint expression, e.g. `^1.0.0`
    pub constraint: String,
}

impl DependencyDecl {
    pub fn new(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: constraint.into(),
        }
    }
}

/// An explicit lifecycle-listener declaration: event kind, callback and
/// priority. Priority defaults to 0. There is no loosely-shaped declaration
/// format; a malformed binding is unrepresentable.
pub struct ListenerBinding {
    pub event: EventKind,
    pub priority: i32,
    pub listener: ListenerFn,
}

impl ListenerBinding {
    pub fn new(event: EventKind, listener: ListenerFn) -> Self {
        Self {
            event,
            priority: 0,
            listener,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl std::fmt::Debug for ListenerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerBinding")
            .field("event", &self.event)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Context handed to a module's init hook: the identity the loader assigned
/// to it and a read-only view of the merged configuration at this point in
/// the load.
#[derive(Debug)]
pub struct LoadContext<'a> {
    pub module_name: &'a str,
    pub merged_config: &'a Value,
}

/// Contract every loadable module satisfies.
///
/// `version` and `init` are mandatory; the capability accessors default to
/// empty and are only consulted when the matching tag appears in
/// [`Module::capabilities`]. A module never chooses its own name - identity
/// is assigned by the loader at instantiation.
pub trait Module {
    /// Semantic version of this module. A leading `v` is tolerated.
    fn version(&self) -> &str;

    /// Initialization hook, invoked as the final pipeline stage.
    fn init(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), ModuleError>;

    /// Capability tags this module implements.
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Modules this one requires, in declaration order.
    /// Consulted only with the `DEPENDENCIES` tag.
    fn module_dependencies(&self) -> Vec<DependencyDecl> {
        Vec::new()
    }

    /// External libraries this module requires, in declaration order.
    /// Consulted only with the `DEPENDENCIES` tag.
    fn library_dependencies(&self) -> Vec<DependencyDecl> {
        Vec::new()
    }

    /// Configuration contribution, deep-merged into the running total.
    /// Consulted only with the `CONFIG` tag.
    fn config(&self) -> Value {
        Value::Object(serde_json::Map::new())
    }

    /// Services to register with the host, in declaration order.
    /// Consulted only with the `SERVICES` tag.
    fn services(&self) -> Vec<(String, ServiceDefinition)> {
        Vec::new()
    }

    /// Lifecycle listeners to register.
    /// Consulted only with the `LISTENERS` tag.
    fn listeners(&self) -> Vec<ListenerBinding> {
        Vec::new()
    }

    /// Routes to append to the host route table, in declaration order.
    /// Consulted only with the `ROUTES` tag.
    fn routes(&self) -> Vec<RouteDefinition> {
        Vec::new()
    }
}
