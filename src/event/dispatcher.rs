//! Synchronous event dispatcher with listener priorities
//!
//! Listeners run in descending priority order; registration order breaks
//! ties. A stopped event reaches no further listeners. There is no queue and
//! no deferral: dispatch completes before the emitting component resumes.

use std::collections::HashMap;

use tracing::debug;

use crate::error::ModuleError;
use crate::event::{EventKind, LifecycleEvent};

/// Listener callback invoked with the event being dispatched.
pub type ListenerFn = Box<dyn Fn(&mut LifecycleEvent)>;

struct RegisteredListener {
    listener: ListenerFn,
    priority: i32,
    // True for listeners a module contributed during its pipeline run;
    // these are dropped before the pipeline runs again.
    module_owned: bool,
}

/// Publish/subscribe dispatcher for [`LifecycleEvent`]s.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: HashMap<EventKind, Vec<RegisteredListener>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for an event kind with an explicit priority.
    /// Higher priorities run first; equal priorities run in registration
    /// order.
    pub fn add_listener(&mut self, kind: EventKind, listener: ListenerFn, priority: i32) {
        self.insert_listener(kind, listener, priority, false);
    }

    /// Register a listener contributed by a module during its pipeline
    /// run. These are cleared before the pipeline runs again.
    pub(crate) fn add_module_listener(
        &mut self,
        kind: EventKind,
        listener: ListenerFn,
        priority: i32,
    ) {
        self.insert_listener(kind, listener, priority, true);
    }

    fn insert_listener(
        &mut self,
        kind: EventKind,
        listener: ListenerFn,
        priority: i32,
        module_owned: bool,
    ) {
        let entries = self.listeners.entry(kind).or_default();
        // Keep the vec ordered (priority desc, registration asc) at
        // insertion so dispatch is a plain scan.
        let pos = entries.partition_point(|e| e.priority >= priority);
        entries.insert(
            pos,
            RegisteredListener {
                listener,
                priority,
                module_owned,
            },
        );
        debug!(?kind, priority, module_owned, "lifecycle listener registered");
    }

    /// Drop every module-contributed listener, keeping host-registered
    /// ones.
    pub(crate) fn clear_module_listeners(&mut self) {
        for entries in self.listeners.values_mut() {
            entries.retain(|e| !e.module_owned);
        }
    }

    /// Number of listeners registered for an event kind.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Invoke every listener for the event's kind until one stops it.
    pub fn dispatch(&self, event: &mut LifecycleEvent) {
        let Some(entries) = self.listeners.get(&event.kind()) else {
            return;
        };
        for entry in entries {
            if event.is_stopped() {
                debug!(kind = ?event.kind(), reason = ?event.stop_reason(), "event propagation stopped");
                break;
            }
            (entry.listener)(event);
        }
    }

    /// Dispatch an event and translate a stop-with-error into the error
    /// branch, carrying the listener's error unwrapped.
    pub fn emit(&self, mut event: LifecycleEvent) -> Result<(), ModuleError> {
        debug!(kind = ?event.kind(), emitter = event.emitter(), "emitting lifecycle event");
        self.dispatch(&mut event);
        if event.is_stopped() {
            if let Some(error) = event.take_error() {
                return Err(ModuleError::Aborted(error));
            }
        }
        Ok(())
    }
}
