//! Host collaborator contracts
//!
//! The loader drives capabilities the hosting application owns: a key/value
//! service registry, an ordered HTTP route table and a resolver for installed
//! library versions. These traits describe only what the core needs from
//! them; trivial map-backed implementations are provided for hosts and tests
//! that have nothing fancier.

pub mod libraries;
pub mod routes;
pub mod services;

pub use libraries::{LibraryResolver, StaticLibraryResolver};
pub use routes::{RouteDefinition, RouteTable, VecRouteTable};
pub use services::{MapServiceRegistry, ServiceDefinition, ServiceRegistry};
