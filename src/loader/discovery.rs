//! Manifest discovery
//!
//! Walks a registration tree and collects every `*.toml` file that lives
//! inside a `configurations` folder, at any depth.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Name of the folders holding registration manifests
pub const CONFIGURATIONS_DIR: &str = "configurations";

const MANIFEST_EXTENSION: &str = "toml";

/// Registration tree scanner
pub struct ManifestDiscovery {
    root: PathBuf,
}

impl ManifestDiscovery {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Manifest paths under the root, sorted
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        info!("Discovering registration manifests in {:?}", self.root);

        if !self.root.is_dir() {
            warn!("Registration root {:?} is not a directory", self.root);
            return Ok(Vec::new());
        }

        let mut manifests = Vec::new();
        let inside = self.root.file_name().is_some_and(|n| n == CONFIGURATIONS_DIR);
        Self::walk(&self.root, inside, &mut manifests)?;
        manifests.sort();

        info!("Discovered {} manifests", manifests.len());
        Ok(manifests)
    }

    fn walk(dir: &Path, inside_configurations: bool, manifests: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                let inside = inside_configurations
                    || path.file_name().is_some_and(|n| n == CONFIGURATIONS_DIR);
                Self::walk(&path, inside, manifests)?;
            } else if inside_configurations
                && path.extension().is_some_and(|ext| ext == MANIFEST_EXTENSION)
            {
                debug!("Found manifest {:?}", path);
                manifests.push(path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_discovers_nested_configuration_folders() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("configurations/b.toml"));
        touch(&root.join("configurations/a.toml"));
        touch(&root.join("pkg/sub/configurations/deep/c.toml"));
        touch(&root.join("pkg/ignored.toml"));
        touch(&root.join("configurations/notes.txt"));

        let found = ManifestDiscovery::new(root).discover().unwrap();
        assert_eq!(
            found,
            vec![
                root.join("configurations/a.toml"),
                root.join("configurations/b.toml"),
                root.join("pkg/sub/configurations/deep/c.toml"),
            ]
        );
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let found = ManifestDiscovery::new(dir.path().join("missing"))
            .discover()
            .unwrap();
        assert!(found.is_empty());
    }
}
