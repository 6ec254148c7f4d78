//! Registry configuration
//!
//! Handles the namespace→package table used by lazy namespace resolution,
//! where each package's registration tree lives on disk, and logging.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "cinnamon_core::registry=debug").
    /// `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Short namespace identifier → external package name
    #[serde(default = "default_packages")]
    pub packages: BTreeMap<String, String>,

    /// Package name → root directory of its registration tree
    #[serde(default)]
    pub package_paths: BTreeMap<String, PathBuf>,

    /// Check the dependency graph before expanding a lazily resolved namespace
    #[serde(default = "default_true")]
    pub check_graph_on_resolve: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

fn default_true() -> bool {
    true
}

fn default_packages() -> BTreeMap<String, String> {
    [
        ("generic", "cinnamon_generic"),
        ("tf", "cinnamon_tf"),
        ("th", "cinnamon_th"),
    ]
    .into_iter()
    .map(|(namespace, package)| (namespace.to_string(), package.to_string()))
    .collect()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            packages: default_packages(),
            package_paths: BTreeMap::new(),
            check_graph_on_resolve: true,
            logging: None,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RegistryConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RegistryConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Package mapped to `namespace`, if any
    pub fn package_for(&self, namespace: &str) -> Option<&str> {
        self.packages.get(namespace).map(String::as_str)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (namespace, package) in &self.packages {
            if namespace.is_empty() || package.is_empty() {
                return Err(anyhow::anyhow!(
                    "namespace and package names must be non-empty (got {:?} -> {:?})",
                    namespace,
                    package
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_packages() {
        let config = RegistryConfig::default();
        assert_eq!(config.package_for("generic"), Some("cinnamon_generic"));
        assert_eq!(config.package_for("tf"), Some("cinnamon_tf"));
        assert_eq!(config.package_for("th"), Some("cinnamon_th"));
        assert_eq!(config.package_for("missing"), None);
        assert!(config.check_graph_on_resolve);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: RegistryConfig = toml::from_str("").unwrap();
        assert_eq!(config.packages.len(), 3);
        assert!(config.check_graph_on_resolve);
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_toml_overrides() {
        let config: RegistryConfig = toml::from_str(
            r#"
            check_graph_on_resolve = false

            [packages]
            lab = "lab_components"

            [package_paths]
            lab_components = "/opt/lab"

            [logging]
            filter = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.package_for("lab"), Some("lab_components"));
        assert_eq!(config.package_for("generic"), None);
        assert_eq!(
            config.package_paths.get("lab_components"),
            Some(&PathBuf::from("/opt/lab"))
        );
        assert!(!config.check_graph_on_resolve);
        assert_eq!(
            config.logging.and_then(|l| l.filter),
            Some("debug".to_string())
        );
    }

    #[test]
    fn test_validate_rejects_empty_names() {
        let mut config = RegistryConfig::default();
        config.packages.insert(String::new(), "pkg".to_string());
        assert!(config.validate().is_err());
    }
}
