//! Module contract, instantiation, registry and dependency checking

pub mod dependency;
pub mod instantiator;
pub mod registry;
pub mod traits;

pub use dependency::DependencyChecker;
pub use instantiator::Instantiator;
pub use registry::{ModuleEntry, ModuleRegistry};
pub use traits::{Capabilities, DependencyDecl, ListenerBinding, LoadContext, Module};
