//! Module dependency validation
//!
//! Two independent passes over a module's declarations, both in declaration
//! order: external libraries first, then module-on-module requirements. The
//! checker validates and never repairs - nothing is installed, reordered or
//! resolved transitively. A module may only depend on modules registered at
//! or before its own position in the load order.
//!
//! After each successful pass a lifecycle event is emitted carrying the
//! checked dependency map, giving observers a chance to abort the load.

use semver::{Version, VersionReq};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ModuleError;
use crate::event::{EventDispatcher, EventKind, LifecycleEvent};
use crate::host::LibraryResolver;
use crate::module::registry::{ModuleEntry, ModuleRegistry};
use crate::module::traits::{Capabilities, DependencyDecl};

const EMITTER: &str = "dependency-checker";

/// Parse a semver version string, tolerating a single leading `v`/`V`.
pub(crate) fn parse_version(raw: &str) -> Result<Version, ModuleError> {
    let trimmed = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
    Version::parse(trimmed).map_err(|e| ModuleError::VersionParse {
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_constraint(raw: &str) -> Result<VersionReq, ModuleError> {
    VersionReq::parse(raw).map_err(|e| ModuleError::VersionParse {
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn decls_to_value(decls: &[DependencyDecl]) -> Value {
    Value::Object(
        decls
            .iter()
            .map(|d| (d.name.clone(), Value::String(d.constraint.clone())))
            .collect(),
    )
}

/// Validates one module's declared dependencies against the environment and
/// the registry.
pub struct DependencyChecker<'a> {
    dispatcher: &'a EventDispatcher,
    libraries: &'a dyn LibraryResolver,
}

impl<'a> DependencyChecker<'a> {
    pub fn new(dispatcher: &'a EventDispatcher, libraries: &'a dyn LibraryResolver) -> Self {
        Self {
            dispatcher,
            libraries,
        }
    }

    /// Run both validation passes for `entry`. Modules without the
    /// `DEPENDENCIES` capability are skipped entirely and emit nothing.
    pub fn check(
        &self,
        entry: &ModuleEntry,
        registry: &ModuleRegistry,
    ) -> Result<(), ModuleError> {
        if !entry
            .module()
            .capabilities()
            .contains(Capabilities::DEPENDENCIES)
        {
            return Ok(());
        }

        let library_deps = entry.module().library_dependencies();
        self.check_libraries(entry, &library_deps)?;
        self.dispatcher.emit(
            LifecycleEvent::new(EventKind::LibraryDependencyChecked, EMITTER)
                .with_parent(EventKind::BeforeLoad)
                .with_param("module", json!(entry.name()))
                .with_param("library_dependencies", decls_to_value(&library_deps)),
        )?;

        let module_deps = entry.module().module_dependencies();
        self.check_modules(entry, &module_deps, registry)?;
        self.dispatcher.emit(
            LifecycleEvent::new(EventKind::ModuleDependencyChecked, EMITTER)
                .with_parent(EventKind::BeforeLoad)
                .with_param("module", json!(entry.name()))
                .with_param("dependencies", decls_to_value(&module_deps)),
        )?;

        Ok(())
    }

    /// Library pass: every declared library must be installed in a version
    /// satisfying its constraint.
    fn check_libraries(
        &self,
        entry: &ModuleEntry,
        decls: &[DependencyDecl],
    ) -> Result<(), ModuleError> {
        for decl in decls {
            let installed = self
                .libraries
                .installed_version(&decl.name)
                .ok_or_else(|| ModuleError::LibraryNotInstalled(decl.name.clone()))?;

            let constraint = parse_constraint(&decl.constraint)?;
            let installed_version = parse_version(&installed)?;
            if !constraint.matches(&installed_version) {
                return Err(ModuleError::LibraryVersion {
                    name: decl.name.clone(),
                    constraint: decl.constraint.clone(),
                    installed,
                });
            }
            debug!(
                module = entry.name(),
                library = %decl.name,
                constraint = %decl.constraint,
                "library dependency satisfied"
            );
        }
        Ok(())
    }

    /// Module pass: every declared module must sit at or before the
    /// dependent's own registry position and satisfy the constraint.
    fn check_modules(
        &self,
        entry: &ModuleEntry,
        decls: &[DependencyDecl],
        registry: &ModuleRegistry,
    ) -> Result<(), ModuleError> {
        let own_position = registry.position(entry.name());
        for decl in decls {
            let resolvable = match (registry.position(&decl.name), own_position) {
                (Some(dep_pos), Some(pos)) => dep_pos <= pos,
                _ => false,
            };
            if !resolvable {
                return Err(ModuleError::DependencyMissing(decl.name.clone()));
            }

            // Lookup cannot miss: position() just found it.
            let dependency = registry
                .get(&decl.name)
                .ok_or_else(|| ModuleError::DependencyMissing(decl.name.clone()))?;
            let constraint = parse_constraint(&decl.constraint)?;
            if !constraint.matches(dependency.version()) {
                return Err(ModuleError::DependencyVersion {
                    name: decl.name.clone(),
                    constraint: decl.constraint.clone(),
                    installed: dependency.version_str().to_string(),
                });
            }
            debug!(
                module = entry.name(),
                dependency = %decl.name,
                constraint = %decl.constraint,
                "module dependency satisfied"
            );
        }
        Ok(())
    }
}
