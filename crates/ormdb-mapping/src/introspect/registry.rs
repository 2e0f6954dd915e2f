//! Registration-table type introspector.

use super::{MixinDefinition, TypeIntrospector, TypeMembers};
use crate::error::Result;
use crate::model::TypeName;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A [`TypeIntrospector`] backed by explicitly registered types and mixins.
///
/// Declarations without a declaring type are attributed to the type (or
/// mixin) they are registered with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticTypeRegistry {
    /// Registered types in registration order.
    #[serde(default)]
    types: Vec<TypeMembers>,
    /// Registered mixins.
    #[serde(default)]
    mixins: Vec<MixinDefinition>,
}

impl StaticTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a registry from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: StaticTypeRegistry = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for members in raw.types {
            registry.register_type(members);
        }
        for mixin in raw.mixins {
            registry.register_mixin(mixin);
        }
        Ok(registry)
    }

    /// Read and parse a registry from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Register a type, replacing an earlier registration of the same type.
    pub fn register_type(&mut self, mut members: TypeMembers) -> &mut Self {
        for property in &mut members.properties {
            if property.declaring_type.is_none() {
                property.declaring_type = Some(members.type_name.clone());
            }
        }

        match self
            .types
            .iter_mut()
            .find(|t| t.type_name == members.type_name)
        {
            Some(existing) => *existing = members,
            None => self.types.push(members),
        }
        self
    }

    /// Builder-style variant of [`register_type`](Self::register_type).
    pub fn with_type(mut self, members: TypeMembers) -> Self {
        self.register_type(members);
        self
    }

    /// Register a mixin, replacing an earlier registration of the same mixin.
    pub fn register_mixin(&mut self, mut mixin: MixinDefinition) -> &mut Self {
        for property in &mut mixin.properties {
            if property.declaring_type.is_none() {
                property.declaring_type = Some(mixin.mixin_type.clone());
            }
        }

        match self
            .mixins
            .iter_mut()
            .find(|m| m.mixin_type == mixin.mixin_type)
        {
            Some(existing) => *existing = mixin,
            None => self.mixins.push(mixin),
        }
        self
    }

    /// Builder-style variant of [`register_mixin`](Self::register_mixin).
    pub fn with_mixin(mut self, mixin: MixinDefinition) -> Self {
        self.register_mixin(mixin);
        self
    }

    /// Apply a mixin to a registered type. Returns `false` if the type is unknown.
    pub fn apply_mixin(&mut self, target: &TypeName, mixin: impl Into<TypeName>) -> bool {
        let mixin = mixin.into();
        match self.types.iter_mut().find(|t| &t.type_name == target) {
            Some(members) => {
                if !members.mixins.contains(&mixin) {
                    members.mixins.push(mixin);
                }
                true
            }
            None => false,
        }
    }

    /// Remove a directly applied mixin. Returns `false` if it was not applied.
    pub fn remove_mixin(&mut self, target: &TypeName, mixin: &TypeName) -> bool {
        match self.types.iter_mut().find(|t| &t.type_name == target) {
            Some(members) => {
                let before = members.mixins.len();
                members.mixins.retain(|m| m != mixin);
                members.mixins.len() != before
            }
            None => false,
        }
    }

    /// Suppress an inherited mixin on a registered type.
    pub fn suppress_mixin(&mut self, target: &TypeName, mixin: impl Into<TypeName>) -> bool {
        let mixin = mixin.into();
        match self.types.iter_mut().find(|t| &t.type_name == target) {
            Some(members) => {
                if !members.suppressed_mixins.contains(&mixin) {
                    members.suppressed_mixins.push(mixin);
                }
                true
            }
            None => false,
        }
    }

    /// All registered type names in registration order.
    pub fn type_names(&self) -> Vec<TypeName> {
        self.types.iter().map(|t| t.type_name.clone()).collect()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn find_type(&self, type_name: &TypeName) -> Option<&TypeMembers> {
        self.types.iter().find(|t| &t.type_name == type_name)
    }

    fn find_mixin(&self, mixin_type: &TypeName) -> MixinDefinition {
        self.mixins
            .iter()
            .find(|m| &m.mixin_type == mixin_type)
            .cloned()
            // Unregistered mixins carry behavior only.
            .unwrap_or_else(|| MixinDefinition::non_persistent(mixin_type.clone()))
    }

    // Ancestor chain of a type, root first.
    fn lineage(&self, type_name: &TypeName) -> Vec<&TypeMembers> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.find_type(type_name);

        while let Some(members) = current {
            if !seen.insert(&members.type_name) {
                break;
            }
            chain.push(members);
            current = members
                .base_type
                .as_ref()
                .and_then(|base| self.find_type(base));
        }

        chain.reverse();
        chain
    }
}

impl TypeIntrospector for StaticTypeRegistry {
    fn members(&self, type_name: &TypeName) -> Option<TypeMembers> {
        self.find_type(type_name).cloned()
    }

    fn active_mixins(&self, type_name: &TypeName) -> Vec<MixinDefinition> {
        let mut active: Vec<&TypeName> = Vec::new();

        for level in self.lineage(type_name) {
            active.retain(|m| !level.suppressed_mixins.contains(*m));
            for mixin in &level.mixins {
                if !active.contains(&mixin) {
                    active.push(mixin);
                }
            }
        }

        active.into_iter().map(|m| self.find_mixin(m)).collect()
    }
}
