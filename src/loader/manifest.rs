//! Registration manifest parsing
//!
//! A manifest is a TOML file found in a `configurations/` folder. It names
//! host-provided entry points to invoke and declares configurations to
//! register:
//!
//! ```toml
//! entry_points = ["register_models"]
//!
//! [[configurations]]
//! name = "encoder"
//! namespace = "external"
//! tags = ["small"]
//! config_class = "EncoderConfig"
//! component_class = "GenericComponent"
//! mode = "add_and_bind_variants"
//!
//! [configurations.kwargs]
//! hidden = 64
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::configuration::{Kwargs, Value};
use crate::error::{Error, Result};
use crate::registry::key::{RegistrationKey, DEFAULT_NAMESPACE};

/// How a manifest entry is handed to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    /// Deferred registration without binding
    Add,
    /// Deferred registration and binding
    #[default]
    AddAndBind,
    /// Deferred variant expansion
    AddAndBindVariants,
    /// Immediate registration and binding
    RegisterAndBind,
}

impl RegistrationMode {
    pub fn binds(&self) -> bool {
        !matches!(self, RegistrationMode::Add)
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// One `[[configurations]]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Catalog name of the configuration class
    pub config_class: String,
    /// Catalog name of the component class; required by binding modes
    #[serde(default)]
    pub component_class: Option<String>,
    #[serde(default)]
    pub mode: RegistrationMode,
    /// Constructor arguments
    #[serde(default)]
    pub kwargs: BTreeMap<String, toml::Value>,
}

impl ManifestEntry {
    pub fn key(&self) -> RegistrationKey {
        RegistrationKey::new(self.name.clone(), self.namespace.clone())
            .with_tags(self.tags.iter().cloned())
    }

    /// Constructor arguments as engine values. Strings that parse as
    /// registration keys become keys.
    pub fn kwargs(&self) -> Result<Kwargs> {
        self.kwargs
            .iter()
            .map(|(name, value)| Ok((name.clone(), value_from_toml(name, value)?)))
            .collect()
    }
}

fn value_from_toml(name: &str, value: &toml::Value) -> Result<Value> {
    Ok(match value {
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(f) => Value::Float(*f),
        toml::Value::String(s) if s.starts_with("name:") => {
            Value::Key(RegistrationKey::from_string(s)?)
        }
        toml::Value::String(s) => Value::Str(s.clone()),
        toml::Value::Array(items) => Value::List(
            items
                .iter()
                .map(|item| value_from_toml(name, item))
                .collect::<Result<_>>()?,
        ),
        other => {
            return Err(Error::Manifest(format!(
                "unsupported value for argument {}: {}",
                name,
                other.type_str()
            )))
        }
    })
}

/// Parsed registration manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationManifest {
    /// Entry points to invoke, in order
    #[serde(default)]
    pub entry_points: Vec<String>,
    #[serde(default)]
    pub configurations: Vec<ManifestEntry>,
}

impl RegistrationManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_str(&contents).map_err(|e| match e {
            Error::Manifest(reason) => {
                Error::Manifest(format!("{}: {}", path.as_ref().display(), reason))
            }
            other => other,
        })
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self> {
        let manifest: RegistrationManifest = toml::from_str(contents)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        for entry in &self.configurations {
            if entry.name.is_empty() {
                return Err(Error::Manifest("configuration name cannot be empty".to_string()));
            }
            if entry.mode.binds() && entry.component_class.is_none() {
                return Err(Error::Manifest(format!(
                    "configuration {} needs a component_class to be bound",
                    entry.name
                )));
            }
        }
        if self.entry_points.iter().any(String::is_empty) {
            return Err(Error::Manifest("entry point name cannot be empty".to_string()));
        }
        Ok(())
    }
}
