//! Lifecycle events for the loading pipeline
//!
//! Every pipeline stage emits a [`LifecycleEvent`] through the
//! [`EventDispatcher`]. Listeners observe the load as it happens and may stop
//! an event's propagation; stopping with an attached error aborts the whole
//! load with exactly that error.

pub mod dispatcher;

pub use dispatcher::{EventDispatcher, ListenerFn};

use std::collections::BTreeMap;

use serde_json::Value;

/// Event kinds emitted over the course of one load.
///
/// There is deliberately no event for the route-registration stage; routes
/// are appended silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// Module list resolved, nothing instantiated yet
    BeforeLoad,
    /// A module's library dependencies all passed validation
    LibraryDependencyChecked,
    /// A module's module dependencies all passed validation
    ModuleDependencyChecked,
    /// A module's configuration was merged into the running total
    ConfigMerged,
    /// A module's services were registered with the host
    ServicesAdded,
    /// A module's lifecycle listeners were registered
    ListenersAdded,
    /// A module finished its init hook
    ModuleLoaded,
    /// The full registry finished loading
    AfterLoad,
}

/// A stoppable, causally-linked notification emitted at a pipeline stage.
///
/// Immutable after construction except for the parameter bag and the stop
/// state, which listeners may update. Created per stage, consumed
/// synchronously, then discarded.
pub struct LifecycleEvent {
    kind: EventKind,
    emitter: &'static str,
    parent: Option<EventKind>,
    params: BTreeMap<String, Value>,
    stopped: bool,
    stop_reason: Option<String>,
    error: Option<anyhow::Error>,
}

impl LifecycleEvent {
    pub fn new(kind: EventKind, emitter: &'static str) -> Self {
        Self {
            kind,
            emitter,
            parent: None,
            params: BTreeMap::new(),
            stopped: false,
            stop_reason: None,
            error: None,
        }
    }

    /// Record the event this one was emitted in consequence of.
    pub fn with_parent(mut self, parent: EventKind) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Name of the component that emitted this event.
    pub fn emitter(&self) -> &'static str {
        self.emitter
    }

    pub fn parent(&self) -> Option<EventKind> {
        self.parent
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn set_param(&mut self, key: &str, value: Value) {
        self.params.insert(key.to_string(), value);
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// Stop propagation to any remaining listeners. The load itself
    /// continues unless an error is attached as well.
    pub fn stop_propagation(&mut self, reason: impl Into<String>) {
        self.stopped = true;
        self.stop_reason = Some(reason.into());
    }

    /// Stop propagation and attach an error, aborting the load. The
    /// dispatcher surfaces the error unwrapped to the emitting component.
    pub fn stop_with_error(&mut self, error: anyhow::Error) {
        self.stop_reason = Some(error.to_string());
        self.stopped = true;
        self.error = Some(error);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.as_deref()
    }

    pub(crate) fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }
}

impl std::fmt::Debug for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEvent")
            .field("kind", &self.kind)
            .field("emitter", &self.emitter)
            .field("parent", &self.parent)
            .field("stopped", &self.stopped)
            .field("stop_reason", &self.stop_reason)
            .finish()
    }
}
