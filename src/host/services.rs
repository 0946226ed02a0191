//! Host service registry contract

use std::any::Any;
use std::collections::HashMap;

use crate::error::ModuleError;

/// Opaque service definition handed from a module to the host. The core
/// never inspects it; the host decides what a definition means.
pub type ServiceDefinition = Box<dyn Any>;

/// Key/value service registry owned by the host application.
pub trait ServiceRegistry {
    /// Register a service definition under a name. Later registrations
    /// under the same name replace earlier ones.
    fn register(&mut self, name: &str, definition: ServiceDefinition) -> Result<(), ModuleError>;

    fn contains(&self, name: &str) -> bool;

    /// Names of all registered services, in registration order.
    fn names(&self) -> Vec<String>;
}

/// Map-backed registry for hosts and tests without a real container.
#[derive(Default)]
pub struct MapServiceRegistry {
    services: HashMap<String, ServiceDefinition>,
    order: Vec<String>,
}

impl MapServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.get(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceRegistry for MapServiceRegistry {
    fn register(&mut self, name: &str, definition: ServiceDefinition) -> Result<(), ModuleError> {
        if !self.services.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.services.insert(name.to_string(), definition);
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    fn names(&self) -> Vec<String> {
        self.order.clone()
    }
}
