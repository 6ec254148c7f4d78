//! Registration loading
//!
//! Applies the manifests of a registration tree to a [`Registry`].
//! Configuration and component classes named by manifests are looked up in
//! catalogs the host fills in beforehand, and entry points are host
//! functions registered by name.

pub mod discovery;
pub mod manifest;

pub use discovery::{ManifestDiscovery, CONFIGURATIONS_DIR};
pub use manifest::{ManifestEntry, RegistrationManifest, RegistrationMode};

use indexmap::IndexSet;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::component::ComponentClass;
use crate::configuration::ConfigClass;
use crate::error::{Error, Result};
use crate::registry::{ConfigurationInfo, Registry};

/// Host function that registers configurations
pub type EntryPoint = Arc<dyn Fn(&mut Registry) -> Result<()> + Send + Sync>;

/// Catalogs plus the log of applied manifests and invoked entry points
#[derive(Clone, Default)]
pub struct RegistrationLoader {
    config_classes: HashMap<String, ConfigClass>,
    component_classes: HashMap<String, ComponentClass>,
    entry_points: HashMap<String, EntryPoint>,
    loaded: IndexSet<PathBuf>,
    invoked: Vec<(PathBuf, String)>,
}

impl RegistrationLoader {
    /// Loader whose component catalog knows `GenericComponent`
    pub fn new() -> Self {
        Self::default().with_component_class("GenericComponent", ComponentClass::generic())
    }

    /// Add a configuration class under its own name
    pub fn with_config_class(mut self, class: ConfigClass) -> Self {
        self.config_classes.insert(class.name().to_string(), class);
        self
    }

    pub fn with_component_class(mut self, name: impl Into<String>, class: ComponentClass) -> Self {
        self.component_classes.insert(name.into(), class);
        self
    }

    pub fn with_entry_point<F>(mut self, name: impl Into<String>, entry_point: F) -> Self
    where
        F: Fn(&mut Registry) -> Result<()> + Send + Sync + 'static,
    {
        self.entry_points.insert(name.into(), Arc::new(entry_point));
        self
    }

    pub fn config_class(&self, name: &str) -> Result<&ConfigClass> {
        self.config_classes
            .get(name)
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }

    pub fn component_class(&self, name: &str) -> Result<&ComponentClass> {
        self.component_classes
            .get(name)
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }

    /// Entry points invoked so far, with the manifest that named them
    pub fn invoked(&self) -> &[(PathBuf, String)] {
        &self.invoked
    }

    /// Apply every manifest found under `root`. Manifests already applied
    /// are skipped. Returns the number of manifests applied.
    pub fn load_registrations<P: AsRef<Path>>(
        &mut self,
        root: P,
        registry: &mut Registry,
    ) -> Result<usize> {
        let manifests = ManifestDiscovery::new(root.as_ref()).discover()?;
        let mut applied = 0;
        for path in manifests {
            if self.loaded.contains(&path) {
                debug!("Manifest {:?} already loaded, skipping", path);
                continue;
            }
            let manifest = RegistrationManifest::from_file(&path)?;
            self.apply(&path, &manifest, registry)?;
            self.loaded.insert(path);
            applied += 1;
        }
        info!("Loaded {} manifests from {:?}", applied, root.as_ref());
        Ok(applied)
    }

    /// Invoke the manifest's entry points, then register its configurations
    pub fn apply(
        &mut self,
        path: &Path,
        manifest: &RegistrationManifest,
        registry: &mut Registry,
    ) -> Result<()> {
        for name in &manifest.entry_points {
            if self
                .invoked
                .iter()
                .any(|(invoked_path, invoked_name)| invoked_path == path && invoked_name == name)
            {
                continue;
            }
            let entry_point = self
                .entry_points
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnknownEntryPoint(name.clone()))?;
            debug!("Invoking entry point {} of {:?}", name, path);
            self.invoked.push((path.to_path_buf(), name.clone()));
            entry_point(registry)?;
        }

        for entry in &manifest.configurations {
            self.register_entry(entry, registry)?;
        }
        Ok(())
    }

    fn register_entry(&self, entry: &ManifestEntry, registry: &mut Registry) -> Result<()> {
        let key = entry.key();
        let info = ConfigurationInfo::new(self.config_class(&entry.config_class)?.clone())
            .with_kwargs(entry.kwargs()?);
        let component_class = match &entry.component_class {
            Some(name) => Some(self.component_class(name)?.clone()),
            None => None,
        };

        match (entry.mode, component_class) {
            (RegistrationMode::Add, _) => {
                registry.add_configuration(key, info)?;
            }
            (RegistrationMode::AddAndBind, Some(class)) => {
                registry.add_and_bind(key, info, class)?;
            }
            (RegistrationMode::AddAndBindVariants, Some(class)) => {
                registry.add_and_bind_variants(key, info, class)?;
            }
            (RegistrationMode::RegisterAndBind, Some(class)) => {
                registry.register_and_bind(key, info, class)?;
            }
            (mode, None) => {
                return Err(Error::Manifest(format!(
                    "configuration {} uses {:?} without a component_class",
                    entry.name, mode
                )))
            }
        }
        Ok(())
    }

    /// Forget applied manifests and invoked entry points; catalogs are kept
    pub fn reset(&mut self) {
        self.loaded.clear();
        self.invoked.clear();
    }
}

impl fmt::Debug for RegistrationLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationLoader")
            .field("config_classes", &self.config_classes.keys().collect::<Vec<_>>())
            .field("component_classes", &self.component_classes.keys().collect::<Vec<_>>())
            .field("entry_points", &self.entry_points.keys().collect::<Vec<_>>())
            .field("loaded", &self.loaded)
            .finish()
    }
}
