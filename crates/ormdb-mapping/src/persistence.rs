//! Persistence-model loading.
//!
//! A [`PersistenceModelLoader`] assigns storage entities to classes and
//! columns to persistent properties, one inheritance hierarchy at a time.
//! [`NameBasedLoader`] derives both from class and property names.

use crate::error::Result;
use crate::model::{ClassDefinition, StorageEntity, StorageProperty};
use crate::validation::PersistenceMappingValidator;
use std::sync::Arc;
use tracing::debug;

/// Assigns storage to an inheritance hierarchy.
pub trait PersistenceModelLoader {
    /// Assign a storage entity to `root` and every descendant, and a storage
    /// property to each of their persistent properties.
    fn apply_to_hierarchy(&self, root: &Arc<ClassDefinition>) -> Result<()>;

    /// Create the validator for the hierarchy below `root`.
    fn create_validator(&self, root: &ClassDefinition) -> PersistenceMappingValidator;
}

/// Table-per-concrete-branch storage named after classes and properties.
///
/// The topmost concrete class of each branch owns a table named after its
/// class id. Classes below it are filtered views over that table. Abstract
/// classes above tables are unions of the tables below them, or have no
/// storage if there are none. Columns carry the property name, with an
/// `_id` suffix for foreign keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameBasedLoader;

impl NameBasedLoader {
    /// Create a loader.
    pub fn new() -> Self {
        Self
    }

    /// Column name of a property.
    pub fn column_name(property_name: &str, is_foreign_key: bool) -> String {
        if is_foreign_key {
            format!("{property_name}_id")
        } else {
            property_name.to_string()
        }
    }

    // Returns the tables owned by `class` or its descendants.
    fn assign_entities(&self, class: &Arc<ClassDefinition>) -> Result<Vec<String>> {
        if !class.is_abstract() {
            let table = class.id().to_string();
            class.set_storage_entity(StorageEntity::table(table.clone()))?;
            for descendant in class.descendants() {
                let mut class_ids = vec![descendant.id().to_string()];
                class_ids.extend(descendant.descendants().iter().map(|d| d.id().to_string()));
                descendant.set_storage_entity(StorageEntity::FilterView {
                    base_entity: table.clone(),
                    class_ids,
                })?;
            }
            return Ok(vec![table]);
        }

        let mut tables = Vec::new();
        for derived in class.derived_classes() {
            tables.extend(self.assign_entities(&derived)?);
        }
        let entity = if tables.is_empty() {
            StorageEntity::Null
        } else {
            StorageEntity::Union {
                entities: tables.clone(),
            }
        };
        class.set_storage_entity(entity)?;
        Ok(tables)
    }

    fn assign_columns(&self, class: &ClassDefinition) -> Result<()> {
        // Columns of classes stored in a view share the table with their
        // siblings and must accept nulls.
        let shared = matches!(
            class.storage_entity(),
            Some(StorageEntity::FilterView { .. })
        );
        for property in class.properties() {
            if !property.is_persistent() {
                continue;
            }
            let column = Self::column_name(property.name(), property.is_object_id());
            property.set_storage_property(StorageProperty::new(
                column,
                shared || property.is_nullable(),
            ))?;
        }
        Ok(())
    }
}

impl PersistenceModelLoader for NameBasedLoader {
    fn apply_to_hierarchy(&self, root: &Arc<ClassDefinition>) -> Result<()> {
        let tables = self.assign_entities(root)?;
        self.assign_columns(root)?;
        for descendant in root.descendants() {
            self.assign_columns(&descendant)?;
        }
        debug!(root = %root.id(), tables = tables.len(), "storage assigned to hierarchy");
        Ok(())
    }

    fn create_validator(&self, _root: &ClassDefinition) -> PersistenceMappingValidator {
        PersistenceMappingValidator::with_default_rules()
    }
}
