//! Icon Registry - icon set configuration and source resolution
//!
//! Configuration maps a set name to `{size, names, useSDF}`. Every icon
//! resolves to the source `<set>/<name>`; an icon whose source is missing
//! fails the whole registry.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::validation::{Validator, ViolationSeverity};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Icon not found: {0}")]
    IconNotFound(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconSetConfig {
    pub size: u32,
    pub names: Vec<String>,
    #[serde(default, rename = "useSDF")]
    pub use_sdf: bool,
}

/// Set name -> icon set. Sets are visited in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconSetsConfig {
    pub sets: BTreeMap<String, IconSetConfig>,
}

impl IconSetsConfig {
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        serde_json::from_str(json).map_err(|e| RegistryError::Configuration(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
            .map_err(|e| RegistryError::Configuration(format!("{}: {}", path.display(), e)))
    }

    pub fn insert(&mut self, set: impl Into<String>, config: IconSetConfig) {
        self.sets.insert(set.into(), config);
    }

    pub fn icon_count(&self) -> usize {
        self.sets.values().map(|s| s.names.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconDescriptor {
    pub name: String,
    pub size: u32,
    pub source_id: String,
    #[serde(rename = "useSDF")]
    pub use_sdf: bool,
}

pub fn source_id(set: &str, name: &str) -> String {
    format!("{}/{}", set, name)
}

/// Where vector sources come from.
pub trait SourceStore {
    /// Load the source for `source_id`, failing with `IconNotFound` if absent.
    fn load(&self, source_id: &str) -> Result<String, RegistryError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySourceStore {
    sources: HashMap<String, String>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source_id: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(source_id.into(), source.into());
    }
}

impl SourceStore for MemorySourceStore {
    fn load(&self, source_id: &str) -> Result<String, RegistryError> {
        self.sources
            .get(source_id)
            .cloned()
            .ok_or_else(|| RegistryError::IconNotFound(source_id.to_string()))
    }
}

/// Reads `<root>/<set>/<name>.<extension>` from disk.
#[derive(Debug, Clone)]
pub struct DirSourceStore {
    root: PathBuf,
    extension: String,
}

impl DirSourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), extension: "svg".to_string() }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn path_for(&self, source_id: &str) -> PathBuf {
        self.root.join(format!("{}.{}", source_id, self.extension))
    }
}

impl SourceStore for DirSourceStore {
    fn load(&self, source_id: &str) -> Result<String, RegistryError> {
        let path = self.path_for(source_id);
        if !path.is_file() {
            return Err(RegistryError::IconNotFound(source_id.to_string()));
        }
        fs::read_to_string(&path).map_err(|source| RegistryError::Io { path, source })
    }
}

/// Resolved icons plus their vector sources.
#[derive(Debug, Clone, Default)]
pub struct IconRegistry {
    descriptors: Vec<IconDescriptor>,
    sources: HashMap<String, String>,
}

impl IconRegistry {
    /// Validate `config` and resolve every icon against `store`.
    ///
    /// Validation always runs first; error-level violations abort loading.
    pub fn load(config: &IconSetsConfig, store: &dyn SourceStore) -> Result<Self, RegistryError> {
        let validation = Validator::new().validate(config);
        for v in validation.violations.iter().filter(|v| v.severity == ViolationSeverity::Warning) {
            warn!("{}: {}", v.rule, v.message);
        }
        if !validation.valid {
            let messages: Vec<_> = validation
                .violations
                .iter()
                .filter(|v| v.severity == ViolationSeverity::Error)
                .map(|v| format!("{}: {}", v.rule, v.message))
                .collect();
            return Err(RegistryError::Configuration(messages.join("; ")));
        }

        let mut registry = Self::default();
        for (set, icons) in &config.sets {
            for name in &icons.names {
                let id = source_id(set, name);
                let source = store.load(&id)?;
                registry.sources.insert(id.clone(), source);
                registry.descriptors.push(IconDescriptor {
                    name: name.clone(),
                    size: icons.size,
                    source_id: id,
                    use_sdf: icons.use_sdf,
                });
            }
            debug!("Resolved icon set '{}' ({} icons at {}px)", set, icons.names.len(), icons.size);
        }
        Ok(registry)
    }

    /// Build a registry from already-resolved parts.
    pub fn from_parts(descriptors: Vec<IconDescriptor>, sources: HashMap<String, String>) -> Self {
        Self { descriptors, sources }
    }

    pub fn descriptors(&self) -> &[IconDescriptor] {
        &self.descriptors
    }

    pub fn source(&self, source_id: &str) -> Option<&str> {
        self.sources.get(source_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "poi": {"size": 15, "names": ["cafe", "bank"]},
        "arrows": {"size": 9, "names": ["oneway"], "useSDF": true}
    }"#;

    fn store() -> MemorySourceStore {
        let mut store = MemorySourceStore::new();
        store.insert("poi/cafe", "<svg id='cafe'/>");
        store.insert("poi/bank", "<svg id='bank'/>");
        store.insert("arrows/oneway", "<svg id='oneway'/>");
        store
    }

    #[test]
    fn test_parse_config() {
        let config = IconSetsConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.sets.len(), 2);
        assert!(config.sets["arrows"].use_sdf);
        assert!(!config.sets["poi"].use_sdf);
        assert_eq!(config.icon_count(), 3);
    }

    #[test]
    fn test_malformed_config() {
        let err = IconSetsConfig::from_json(r#"{"poi": {"names": ["x"]}}"#).unwrap_err();
        assert!(matches!(err, RegistryError::Configuration(_)));
    }

    #[test]
    fn test_load_orders_sets_by_name() {
        let config = IconSetsConfig::from_json(CONFIG).unwrap();
        let registry = IconRegistry::load(&config, &store()).unwrap();
        let names: Vec<_> = registry.descriptors().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["oneway", "cafe", "bank"]);

        let oneway = &registry.descriptors()[0];
        assert_eq!(oneway.source_id, "arrows/oneway");
        assert_eq!(oneway.size, 9);
        assert!(oneway.use_sdf);
        assert_eq!(registry.source("poi/bank"), Some("<svg id='bank'/>"));
    }

    #[test]
    fn test_missing_source() {
        let config = IconSetsConfig::from_json(CONFIG).unwrap();
        let mut partial = MemorySourceStore::new();
        partial.insert("arrows/oneway", "<svg/>");
        let err = IconRegistry::load(&config, &partial).unwrap_err();
        assert!(matches!(err, RegistryError::IconNotFound(id) if id == "poi/cafe"));
    }

    #[test]
    fn test_invalid_config_rejected_before_lookup() {
        let config = IconSetsConfig::from_json(r#"{"poi": {"size": 0, "names": ["cafe"]}}"#).unwrap();
        let err = IconRegistry::load(&config, &MemorySourceStore::new()).unwrap_err();
        assert!(matches!(err, RegistryError::Configuration(_)));
    }

    #[test]
    fn test_dir_store() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("poi")).unwrap();
        fs::write(dir.path().join("poi/cafe.svg"), "<svg/>").unwrap();

        let store = DirSourceStore::new(dir.path());
        assert_eq!(store.load("poi/cafe").unwrap(), "<svg/>");
        assert!(matches!(
            store.load("poi/bank"),
            Err(RegistryError::IconNotFound(_))
        ));
    }
}
