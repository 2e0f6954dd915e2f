//! Mapping metadata entities.
//!
//! Classes, properties, relations and their end-points, plus the storage
//! assignments attached to them by the persistence-model loader.

mod class;
mod property;
mod relation;
mod storage;
mod types;

pub use class::{ClassAttributes, ClassDefinition, RelationMember};
pub use property::PropertyDefinition;
pub use relation::{
    end_point_identifier, relation_id, AnonymousEndPoint, RealEndPoint, RelationDefinition, RelationEndPoint,
    RelationKind, VirtualEndPoint,
};
pub use storage::{StorageEntity, StorageProperty};
pub use types::{Cardinality, PropertyType, StorageClass, TypeName, ValueType};
