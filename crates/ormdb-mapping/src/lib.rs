//! ORMDB Mapping - Mapping metadata for domain types.
//!
//! This crate builds, links and validates the metadata graph that describes
//! how domain types map to persistent storage: classes with their inheritance
//! links, properties, relations between classes, and the storage entities a
//! persistence-model loader assigns to them.
//!
//! ```no_run
//! use ormdb_mapping::{MappingConfiguration, MappingOptions, NameBasedLoader, StaticTypeRegistry};
//!
//! # fn main() -> ormdb_mapping::Result<()> {
//! let registry = StaticTypeRegistry::from_path("types.json")?;
//! let configuration = MappingConfiguration::build(
//!     &registry,
//!     &registry.type_names(),
//!     &NameBasedLoader::new(),
//!     MappingOptions::default(),
//! )?;
//! for class in configuration.classes() {
//!     println!("{} -> {:?}", class.id(), class.storage_entity());
//! }
//! # Ok(())
//! # }
//! ```

pub mod build;
pub mod config;
pub mod configuration;
pub mod error;
pub mod introspect;
pub mod model;
pub mod persistence;
pub mod validation;

pub use build::{ClassDefinitionBuilder, MixinContributionMerger, RelationResolver};
pub use config::MappingOptions;
pub use configuration::MappingConfiguration;
pub use error::{MappingError, Result};
pub use introspect::{
    MixinDefinition, PropertyDeclaration, StaticTypeRegistry, TypeIntrospector, TypeMembers,
};
pub use model::{
    Cardinality, ClassDefinition, PropertyDefinition, PropertyType, RelationDefinition,
    RelationEndPoint, RelationKind, StorageClass, StorageEntity, StorageProperty, TypeName,
    ValueType,
};
pub use persistence::{NameBasedLoader, PersistenceModelLoader};
pub use validation::{ValidationFailure, ValidationPass, ValidationViolation};
