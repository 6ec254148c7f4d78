//! Namespace resolution
//!
//! When a lookup misses and the key's namespace maps to a known package, the
//! registry asks its [`NamespaceResolver`] to load that package's
//! registrations. The registry guarantees at most one attempt per namespace.

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use crate::error::{Error, Result};
use crate::loader::RegistrationLoader;
use crate::registry::Registry;

/// Loads the registrations of an external package into a registry
pub trait NamespaceResolver: Send {
    fn resolve(&mut self, namespace: &str, package: &str, registry: &mut Registry) -> Result<()>;

    /// Forget any per-package state. Called by [`Registry::clear`].
    fn reset(&mut self) {}
}

/// Resolves a package by loading the registration tree found at its
/// configured directory
pub struct DirectoryResolver {
    package_paths: BTreeMap<String, PathBuf>,
    loader: RegistrationLoader,
}

impl DirectoryResolver {
    pub fn new(package_paths: BTreeMap<String, PathBuf>, loader: RegistrationLoader) -> Self {
        Self {
            package_paths,
            loader,
        }
    }

    pub fn loader(&self) -> &RegistrationLoader {
        &self.loader
    }
}

impl NamespaceResolver for DirectoryResolver {
    fn resolve(&mut self, namespace: &str, package: &str, registry: &mut Registry) -> Result<()> {
        let path = self
            .package_paths
            .get(package)
            .ok_or_else(|| Error::Resolution {
                namespace: namespace.to_string(),
                reason: format!("no path configured for package {}", package),
            })?;
        if !path.is_dir() {
            return Err(Error::Resolution {
                namespace: namespace.to_string(),
                reason: format!("{} is not a directory", path.display()),
            });
        }
        info!("Loading package {} from {}", package, path.display());
        self.loader.load_registrations(path, registry)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.loader.reset();
    }
}
