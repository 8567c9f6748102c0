//! Layer directories with persisted metadata
//!
//! A layer is `<layers_dir>/<name>/` plus `<layers_dir>/<name>.toml`, the file
//! the CNB lifecycle reads back on the next build:
//!
//! ```toml
//! [types]
//! build = true
//! launch = true
//! cache = true
//!
//! [metadata]
//! version = "3.12.1"
//! stack = "google.22"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LayerError;
use crate::fetch::archive::clear_dir;

/// Metadata key holding the installed version
pub const VERSION_KEY: &str = "version";
/// Metadata key holding the stack the layer was built for
pub const STACK_KEY: &str = "stack";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerTypes {
    pub build: bool,
    pub launch: bool,
    pub cache: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct LayerFile {
    types: LayerTypes,
    metadata: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct InstallLayer {
    name: String,
    path: PathBuf,
    metadata_path: PathBuf,
    pub types: LayerTypes,
    metadata: BTreeMap<String, String>,
}

impl InstallLayer {
    /// Open (creating if needed) the layer `name` under `layers_dir`.
    ///
    /// Metadata from a previous build is loaded when present. A metadata file
    /// that fails to parse is treated as empty so the layer gets rebuilt.
    pub fn open(layers_dir: &Path, name: &str, types: LayerTypes) -> Result<Self, LayerError> {
        let path = layers_dir.join(name);
        fs::create_dir_all(&path).map_err(|source| LayerError::Io {
            context: "creating layer directory",
            path: path.clone(),
            source,
        })?;

        let metadata_path = layers_dir.join(format!("{name}.toml"));
        let metadata = match fs::read_to_string(&metadata_path) {
            Ok(content) => match toml::from_str::<LayerFile>(&content) {
                Ok(file) => file.metadata,
                Err(e) => {
                    warn!(
                        "Ignoring invalid layer metadata {}: {}",
                        metadata_path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(LayerError::Io {
                    context: "reading layer metadata",
                    path: metadata_path,
                    source,
                });
            }
        };

        Ok(Self {
            name: name.to_string(),
            path,
            metadata_path,
            types,
            metadata,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Set a metadata value in memory; call [`InstallLayer::save`] to persist it
    pub fn set_metadata(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    /// Wipe the layer directory and its metadata, persisting the empty state
    pub fn clear(&mut self) -> Result<(), LayerError> {
        clear_dir(&self.path).map_err(|source| LayerError::Io {
            context: "clearing layer",
            path: self.path.clone(),
            source,
        })?;
        self.metadata.clear();
        self.save()
    }

    pub fn save(&self) -> Result<(), LayerError> {
        let file = LayerFile {
            types: self.types,
            metadata: self.metadata.clone(),
        };
        let content = toml::to_string(&file)?;
        fs::write(&self.metadata_path, content).map_err(|source| LayerError::Io {
            context: "writing layer metadata",
            path: self.metadata_path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CACHED: LayerTypes = LayerTypes {
        build: true,
        launch: true,
        cache: true,
    };

    #[test]
    fn metadata_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let mut layer = InstallLayer::open(temp.path(), "python", CACHED).unwrap();
        layer.set_metadata(VERSION_KEY, "3.12.1");
        layer.set_metadata(STACK_KEY, "google.22");
        layer.save().unwrap();

        let reopened = InstallLayer::open(temp.path(), "python", CACHED).unwrap();

        assert_eq!(reopened.metadata(VERSION_KEY), Some("3.12.1"));
        assert_eq!(reopened.metadata(STACK_KEY), Some("google.22"));
        assert!(temp.path().join("python").is_dir());
    }

    #[test]
    fn clear_removes_contents_and_persists_empty_metadata() {
        let temp = TempDir::new().unwrap();
        let mut layer = InstallLayer::open(temp.path(), "ruby", CACHED).unwrap();
        fs::create_dir_all(layer.path().join("bin")).unwrap();
        fs::write(layer.path().join("bin/ruby"), "#!/bin/sh").unwrap();
        layer.set_metadata(VERSION_KEY, "3.2.0");
        layer.save().unwrap();

        layer.clear().unwrap();

        assert!(layer.path().is_dir());
        assert_eq!(fs::read_dir(layer.path()).unwrap().count(), 0);
        let reopened = InstallLayer::open(temp.path(), "ruby", CACHED).unwrap();
        assert_eq!(reopened.metadata(VERSION_KEY), None);
    }

    #[test]
    fn invalid_metadata_file_starts_empty() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("nodejs.toml"), "not = [valid").unwrap();

        let layer = InstallLayer::open(temp.path(), "nodejs", CACHED).unwrap();

        assert_eq!(layer.metadata(VERSION_KEY), None);
    }

    #[test]
    fn saved_file_carries_layer_types() {
        let temp = TempDir::new().unwrap();
        let layer = InstallLayer::open(temp.path(), "pid1", CACHED).unwrap();

        layer.save().unwrap();

        let content = fs::read_to_string(temp.path().join("pid1.toml")).unwrap();
        assert!(content.contains("[types]"));
        assert!(content.contains("cache = true"));
    }
}
