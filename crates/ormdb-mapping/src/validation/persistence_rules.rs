//! Persistence-level validation rules, run after storage assignment.

use super::{PersistenceValidationRule, ValidationViolation};
use crate::model::{ClassDefinition, PropertyDefinition, StorageEntity};
use std::collections::HashMap;
use std::sync::Arc;

/// Every concrete class needs a table or view to be stored in.
pub struct NonAbstractClassHasStorageEntityRule;

impl PersistenceValidationRule for NonAbstractClassHasStorageEntityRule {
    fn name(&self) -> &'static str {
        "NonAbstractClassHasStorageEntityRule"
    }

    fn validate(&self, hierarchy: &[Arc<ClassDefinition>]) -> Vec<ValidationViolation> {
        hierarchy
            .iter()
            .filter(|class| !class.is_abstract())
            .filter(|class| {
                matches!(class.storage_entity(), None | Some(StorageEntity::Null))
            })
            .map(|class| {
                ValidationViolation::class(
                    self.name(),
                    class.id(),
                    "class is not abstract but has no storage entity",
                )
            })
            .collect()
    }
}

/// A class stored as a union of its derived classes' tables must be abstract.
pub struct ClassAboveTableIsAbstractRule;

impl PersistenceValidationRule for ClassAboveTableIsAbstractRule {
    fn name(&self) -> &'static str {
        "ClassAboveTableIsAbstractRule"
    }

    fn validate(&self, hierarchy: &[Arc<ClassDefinition>]) -> Vec<ValidationViolation> {
        hierarchy
            .iter()
            .filter(|class| !class.is_abstract())
            .filter_map(|class| match class.storage_entity() {
                Some(StorageEntity::Union { entities }) => Some(ValidationViolation::class(
                    self.name(),
                    class.id(),
                    format!(
                        "class is stored above tables [{}] and must be abstract",
                        entities.join(", ")
                    ),
                )),
                _ => None,
            })
            .collect()
    }
}

/// Two different properties stored in the same table must not share a column.
pub struct ColumnNamesAreUniqueRule;

impl PersistenceValidationRule for ColumnNamesAreUniqueRule {
    fn name(&self) -> &'static str {
        "ColumnNamesAreUniqueRule"
    }

    fn validate(&self, hierarchy: &[Arc<ClassDefinition>]) -> Vec<ValidationViolation> {
        // (table, column) -> first property stored there
        let mut columns: HashMap<(String, String), Arc<PropertyDefinition>> = HashMap::new();
        let mut violations = Vec::new();

        for class in hierarchy {
            let Some(table) = class
                .storage_entity()
                .and_then(|entity| entity.table_name().map(str::to_string))
            else {
                continue;
            };

            for property in class.properties() {
                let Some(storage) = property.storage_property() else {
                    continue;
                };
                let key = (table.clone(), storage.column.clone());
                match columns.get(&key) {
                    Some(existing) if !Arc::ptr_eq(existing, &property) => {
                        violations.push(ValidationViolation::property(
                            self.name(),
                            class.id(),
                            property.name(),
                            format!(
                                "column '{}' of table '{table}' is already used by property '{}' of class '{}'",
                                storage.column,
                                existing.name(),
                                existing.class_id()
                            ),
                        ));
                    }
                    Some(_) => {}
                    None => {
                        columns.insert(key, property.clone());
                    }
                }
            }
        }

        violations
    }
}
