//! Property definitions.

use super::class::ClassDefinition;
use super::storage::StorageProperty;
use super::types::{PropertyType, StorageClass, TypeName};
use crate::error::{MappingError, Result};
use crate::introspect::PropertyDeclaration;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// A mapped property of exactly one class.
///
/// Properties are only created through [`ClassDefinition::add_property`],
/// which binds them to their owning class for their whole lifetime.
#[derive(Debug)]
pub struct PropertyDefinition {
    name: String,
    class_id: String,
    class_type: TypeName,
    class: Weak<ClassDefinition>,
    declaring_type: TypeName,
    property_type: PropertyType,
    nullable: Option<bool>,
    max_length: Option<u32>,
    storage_class: StorageClass,
    mandatory: bool,
    storage_property: RwLock<Option<StorageProperty>>,
    frozen: AtomicBool,
}

impl PropertyDefinition {
    pub(crate) fn new(
        class: &ClassDefinition,
        class_ref: Weak<ClassDefinition>,
        declaration: &PropertyDeclaration,
    ) -> Self {
        Self {
            name: declaration.name.clone(),
            class_id: class.id().to_string(),
            class_type: class.class_type().clone(),
            class: class_ref,
            declaring_type: declaration
                .declaring_type_or(class.class_type())
                .clone(),
            property_type: declaration.property_type.clone(),
            nullable: declaration.nullable,
            max_length: declaration.max_length,
            storage_class: declaration.storage_class,
            mandatory: declaration.mandatory,
            storage_property: RwLock::new(None),
            frozen: AtomicBool::new(false),
        }
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the owning class.
    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    /// Type of the owning class.
    pub fn class_type(&self) -> &TypeName {
        &self.class_type
    }

    /// The owning class, while the mapping that owns it is alive.
    pub fn class_definition(&self) -> Option<Arc<ClassDefinition>> {
        self.class.upgrade()
    }

    /// The type (class or mixin) that declared the property.
    pub fn declaring_type(&self) -> &TypeName {
        &self.declaring_type
    }

    /// Stable identifier: `{declaring_type}.{name}`.
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.declaring_type, self.name)
    }

    /// Declared property type.
    pub fn property_type(&self) -> &PropertyType {
        &self.property_type
    }

    /// Explicitly declared nullability.
    pub fn declared_nullable(&self) -> Option<bool> {
        self.nullable
    }

    /// Whether the stored value may be null.
    pub fn is_nullable(&self) -> bool {
        match &self.property_type {
            PropertyType::Value {
                value_type,
                optional,
            } => *optional || (value_type.is_reference_type() && self.nullable.unwrap_or(true)),
            PropertyType::Reference { .. } => !self.mandatory,
            PropertyType::Collection { .. } => false,
        }
    }

    /// Maximum length for text and binary values.
    pub fn max_length(&self) -> Option<u32> {
        self.max_length
    }

    /// Storage classification.
    pub fn storage_class(&self) -> StorageClass {
        self.storage_class
    }

    /// Check if the property is stored in the persistent store.
    pub fn is_persistent(&self) -> bool {
        self.storage_class == StorageClass::Persistent
    }

    /// Whether a relation property must always be set.
    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// Check if the property holds a foreign key.
    pub fn is_object_id(&self) -> bool {
        self.property_type.is_reference()
    }

    /// Column binding assigned by the persistence-model loader.
    pub fn storage_property(&self) -> Option<StorageProperty> {
        self.storage_property.read().clone()
    }

    /// Assign the column binding.
    pub fn set_storage_property(&self, storage_property: StorageProperty) -> Result<()> {
        if self.is_frozen() {
            return Err(MappingError::PropertyFrozen {
                property: self.identifier(),
                operation: "set storage property",
            });
        }
        *self.storage_property.write() = Some(storage_property);
        Ok(())
    }

    /// Check if the property is read-only.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub(crate) fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }
}
