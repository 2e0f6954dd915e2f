//! Mapping options.

use crate::error::Result;
use crate::model::StorageClass;
use serde::Deserialize;
use std::path::Path;

/// Default maximum length of a class identifier.
pub const DEFAULT_MAX_CLASS_ID_LENGTH: usize = 100;

fn default_max_class_id_length() -> usize {
    DEFAULT_MAX_CLASS_ID_LENGTH
}

fn default_supported_storage_classes() -> Vec<StorageClass> {
    vec![StorageClass::Persistent, StorageClass::Transaction]
}

fn default_check_mixin_drift() -> bool {
    true
}

/// Options controlling how a mapping is built and validated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MappingOptions {
    /// Maximum length of a class identifier.
    #[serde(default = "default_max_class_id_length")]
    pub max_class_id_length: usize,

    /// Storage classes accepted by the property validation pass.
    #[serde(default = "default_supported_storage_classes")]
    pub supported_storage_classes: Vec<StorageClass>,

    /// Whether the build re-checks the active mixin configuration.
    #[serde(default = "default_check_mixin_drift")]
    pub check_mixin_drift: bool,
}

impl MappingOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self {
            max_class_id_length: DEFAULT_MAX_CLASS_ID_LENGTH,
            supported_storage_classes: default_supported_storage_classes(),
            check_mixin_drift: true,
        }
    }

    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Set the maximum class identifier length.
    pub fn with_max_class_id_length(mut self, length: usize) -> Self {
        self.max_class_id_length = length;
        self
    }

    /// Set the supported storage classes.
    pub fn with_supported_storage_classes(
        mut self,
        storage_classes: impl IntoIterator<Item = StorageClass>,
    ) -> Self {
        self.supported_storage_classes = storage_classes.into_iter().collect();
        self
    }

    /// Disable the mixin drift check during build.
    pub fn without_mixin_drift_check(mut self) -> Self {
        self.check_mixin_drift = false;
        self
    }

    /// Check if a storage class is supported.
    pub fn supports_storage_class(&self, storage_class: StorageClass) -> bool {
        self.supported_storage_classes.contains(&storage_class)
    }
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self::new()
    }
}
