//! Storage assignments made by the persistence-model loader.

use serde::Serialize;
use std::fmt;

/// The storage entity a class is persisted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageEntity {
    /// A table owned by this class.
    Table {
        /// Table name.
        name: String,
    },
    /// A filtered view over a table owned by an ancestor.
    FilterView {
        /// Name of the underlying table.
        base_entity: String,
        /// Class identifiers selected by the filter.
        class_ids: Vec<String>,
    },
    /// A union over the tables of derived classes.
    Union {
        /// Names of the unioned tables.
        entities: Vec<String>,
    },
    /// No storage (abstract classes without concrete storage).
    Null,
}

impl StorageEntity {
    /// Create a table entity.
    pub fn table(name: impl Into<String>) -> Self {
        StorageEntity::Table { name: name.into() }
    }

    /// Check if this entity is a table.
    pub fn is_table(&self) -> bool {
        matches!(self, StorageEntity::Table { .. })
    }

    /// Check if this entity provides storage for instances.
    pub fn is_concrete(&self) -> bool {
        matches!(
            self,
            StorageEntity::Table { .. } | StorageEntity::FilterView { .. }
        )
    }

    /// The table name this entity resolves to, if any.
    pub fn table_name(&self) -> Option<&str> {
        match self {
            StorageEntity::Table { name } => Some(name),
            StorageEntity::FilterView { base_entity, .. } => Some(base_entity),
            StorageEntity::Union { .. } | StorageEntity::Null => None,
        }
    }
}

impl fmt::Display for StorageEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageEntity::Table { name } => write!(f, "table {name}"),
            StorageEntity::FilterView {
                base_entity,
                class_ids,
            } => write!(f, "view {base_entity} [{}]", class_ids.join(", ")),
            StorageEntity::Union { entities } => write!(f, "union [{}]", entities.join(", ")),
            StorageEntity::Null => write!(f, "none"),
        }
    }
}

/// The column a persistent property is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageProperty {
    /// Column name.
    pub column: String,
    /// Whether the column accepts nulls.
    pub nullable: bool,
}

impl StorageProperty {
    /// Create a column binding.
    pub fn new(column: impl Into<String>, nullable: bool) -> Self {
        Self {
            column: column.into(),
            nullable,
        }
    }
}
