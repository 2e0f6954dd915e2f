//! Type introspection contract.
//!
//! The mapping core never discovers members itself. A [`TypeIntrospector`]
//! reports, per domain type, its class identifier, mapped base type,
//! declared properties and the mixins applied to it. [`StaticTypeRegistry`]
//! is a registration-table implementation of the contract.

mod registry;

pub use registry::StaticTypeRegistry;

use crate::model::{PropertyType, StorageClass, TypeName};
use serde::{Deserialize, Serialize};

/// Source of member declarations for domain types.
pub trait TypeIntrospector {
    /// Declared members of a type, or `None` when the type is unknown.
    fn members(&self, type_name: &TypeName) -> Option<TypeMembers>;

    /// Mixins currently active for a type, including those inherited from
    /// its base types, in application order.
    fn active_mixins(&self, type_name: &TypeName) -> Vec<MixinDefinition>;
}

/// Members reported for a single domain type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMembers {
    /// The described type.
    #[serde(rename = "type")]
    pub type_name: TypeName,
    /// Explicit class identifier; defaults to the type's short name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    /// Nearest mapped base type. `None` for inheritance roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<TypeName>,
    /// Whether the type cannot be instantiated.
    #[serde(default)]
    pub is_abstract: bool,
    /// Whether the type is an open generic type.
    #[serde(default)]
    pub is_generic: bool,
    /// Explicitly declared storage group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_group: Option<String>,
    /// Declared properties, including those declared by unmapped ancestors.
    #[serde(default)]
    pub properties: Vec<PropertyDeclaration>,
    /// Mixins applied directly to this type.
    #[serde(default)]
    pub mixins: Vec<TypeName>,
    /// Mixins applied to a base type that this type suppresses.
    #[serde(default)]
    pub suppressed_mixins: Vec<TypeName>,
}

impl TypeMembers {
    /// Describe a new type with no members.
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            class_id: None,
            base_type: None,
            is_abstract: false,
            is_generic: false,
            storage_group: None,
            properties: Vec::new(),
            mixins: Vec::new(),
            suppressed_mixins: Vec::new(),
        }
    }

    /// Set an explicit class identifier.
    pub fn with_class_id(mut self, class_id: impl Into<String>) -> Self {
        self.class_id = Some(class_id.into());
        self
    }

    /// Set the mapped base type.
    pub fn with_base(mut self, base_type: impl Into<TypeName>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }

    /// Mark the type as abstract.
    pub fn with_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Mark the type as an open generic type.
    pub fn with_generic(mut self) -> Self {
        self.is_generic = true;
        self
    }

    /// Declare a storage group.
    pub fn with_storage_group(mut self, group: impl Into<String>) -> Self {
        self.storage_group = Some(group.into());
        self
    }

    /// Add a property declaration.
    pub fn with_property(mut self, property: PropertyDeclaration) -> Self {
        self.properties.push(property);
        self
    }

    /// Apply a mixin.
    pub fn with_mixin(mut self, mixin: impl Into<TypeName>) -> Self {
        self.mixins.push(mixin.into());
        self
    }

    /// Suppress a mixin inherited from a base type.
    pub fn with_suppressed_mixin(mut self, mixin: impl Into<TypeName>) -> Self {
        self.suppressed_mixins.push(mixin.into());
        self
    }

    /// The class identifier this type maps to.
    pub fn class_id(&self) -> &str {
        self.class_id
            .as_deref()
            .unwrap_or_else(|| self.type_name.short_name())
    }

    /// Find a property declaration by name.
    pub fn get_property(&self, name: &str) -> Option<&PropertyDeclaration> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// A single declared property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDeclaration {
    /// Property name.
    pub name: String,
    /// Type that declares the property, if different from the described type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaring_type: Option<TypeName>,
    /// Declared property type.
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// Explicit nullability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Maximum length for text and binary values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Storage classification.
    #[serde(default)]
    pub storage_class: StorageClass,
    /// Whether a relation property must always be set.
    #[serde(default)]
    pub mandatory: bool,
    /// Name of the opposite property on the related type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opposite: Option<String>,
    /// Marks the foreign-key side of a one-to-one relation.
    #[serde(default)]
    pub contains_foreign_key: bool,
    /// Sort ordering for collection properties (`"name asc, date desc"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_expression: Option<String>,
}

impl PropertyDeclaration {
    /// Declare a persistent property.
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            declaring_type: None,
            property_type,
            nullable: None,
            max_length: None,
            storage_class: StorageClass::Persistent,
            mandatory: false,
            opposite: None,
            contains_foreign_key: false,
            sort_expression: None,
        }
    }

    /// Set the declaring type.
    pub fn declared_by(mut self, declaring_type: impl Into<TypeName>) -> Self {
        self.declaring_type = Some(declaring_type.into());
        self
    }

    /// Set explicit nullability.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Set the maximum length.
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Set the storage class.
    pub fn with_storage_class(mut self, storage_class: StorageClass) -> Self {
        self.storage_class = storage_class;
        self
    }

    /// Mark a relation property as mandatory.
    pub fn with_mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Declare the opposite property of a bidirectional relation.
    pub fn with_opposite(mut self, opposite: impl Into<String>) -> Self {
        self.opposite = Some(opposite.into());
        self
    }

    /// Mark this side of a one-to-one relation as holding the foreign key.
    pub fn with_foreign_key(mut self) -> Self {
        self.contains_foreign_key = true;
        self
    }

    /// Set the sort expression of a collection.
    pub fn with_sort_expression(mut self, expression: impl Into<String>) -> Self {
        self.sort_expression = Some(expression.into());
        self
    }

    /// The declaring type, falling back to the type being described.
    pub fn declaring_type_or<'a>(&'a self, fallback: &'a TypeName) -> &'a TypeName {
        self.declaring_type.as_ref().unwrap_or(fallback)
    }
}

/// A mixin and the members it contributes to its targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixinDefinition {
    /// The mixin type.
    #[serde(rename = "type")]
    pub mixin_type: TypeName,
    /// Whether the mixin contributes persistent members.
    #[serde(default = "default_persistent")]
    pub persistent: bool,
    /// Properties contributed to every target.
    #[serde(default)]
    pub properties: Vec<PropertyDeclaration>,
}

fn default_persistent() -> bool {
    true
}

impl MixinDefinition {
    /// Define a persistent mixin.
    pub fn new(mixin_type: impl Into<TypeName>) -> Self {
        Self {
            mixin_type: mixin_type.into(),
            persistent: true,
            properties: Vec::new(),
        }
    }

    /// Define a mixin that contributes no persistent members.
    pub fn non_persistent(mixin_type: impl Into<TypeName>) -> Self {
        Self {
            mixin_type: mixin_type.into(),
            persistent: false,
            properties: Vec::new(),
        }
    }

    /// Add a contributed property.
    pub fn with_property(mut self, property: PropertyDeclaration) -> Self {
        self.properties.push(property);
        self
    }
}
