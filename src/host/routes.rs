//! Host route table contract

/// A single route a module contributes to the host's HTTP layer.
/// The core treats routes as opaque ordered entries; matching and handling
/// belong to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pub name: String,
    pub path: String,
    pub method: String,
}

impl RouteDefinition {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            method: method.into(),
        }
    }
}

/// Append-only route table owned by the host. Declaration order is
/// preserved both within and across modules.
pub trait RouteTable {
    fn add(&mut self, route: RouteDefinition);

    /// All routes in the order they were added.
    fn routes(&self) -> &[RouteDefinition];

    /// Drop every route. Invoked by the loader before modules
    /// re-contribute their routes on a fresh configuration pass.
    fn clear(&mut self);
}

/// Vec-backed route table for hosts and tests.
#[derive(Debug, Default)]
pub struct VecRouteTable {
    routes: Vec<RouteDefinition>,
}

impl VecRouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RouteTable for VecRouteTable {
    fn add(&mut self, route: RouteDefinition) {
        self.routes.push(route);
    }

    fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    fn clear(&mut self) {
        self.routes.clear();
    }
}
