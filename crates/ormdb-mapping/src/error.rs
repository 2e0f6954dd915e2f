//! Mapping error types.

use crate::validation::ValidationFailure;
use thiserror::Error;

/// Result alias used throughout the mapping crate.
pub type Result<T> = std::result::Result<T, MappingError>;

/// Errors raised while building, validating, freezing or querying a mapping.
#[derive(Debug, Error)]
pub enum MappingError {
    // --- structural / build errors ---
    /// The introspector has no members for a requested type.
    #[error("type '{type_name}' is not known to the type introspector")]
    UnknownType {
        /// The requested type.
        type_name: String,
    },

    /// Two different types resolved to the same class identifier.
    #[error(
        "class id '{class_id}' is used by type '{existing_type}' (module '{existing_module}') \
         and by type '{new_type}' (module '{new_module}')"
    )]
    DuplicateClassId {
        /// The shared class identifier.
        class_id: String,
        /// Type that claimed the identifier first.
        existing_type: String,
        /// Module containing the first type.
        existing_module: String,
        /// Type that tried to claim the identifier again.
        new_type: String,
        /// Module containing the second type.
        new_module: String,
    },

    /// The base-type chain of a type loops back onto itself.
    #[error("inheritance cycle detected at type '{type_name}'")]
    InheritanceCycle {
        /// Type at which the cycle was detected.
        type_name: String,
    },

    /// A property name is already defined by the class or one of its bases.
    #[error(
        "property '{property}' of class '{class_id}' is already defined by type '{defined_by}'"
    )]
    DuplicatePropertyName {
        /// Class receiving the property.
        class_id: String,
        /// The redefined property name.
        property: String,
        /// Type that defined the property first.
        defined_by: String,
    },

    /// A relation property points at a type that is not part of the mapping.
    #[error("relation property '{property}' refers to type '{target}', which is not mapped")]
    RelationTargetNotMapped {
        /// Identifier of the relation property.
        property: String,
        /// The unmapped target type.
        target: String,
    },

    /// A relation declaration is inconsistent with its opposite.
    #[error("malformed relation at property '{property}': {reason}")]
    MalformedRelation {
        /// Identifier of the relation property.
        property: String,
        /// Explanation.
        reason: String,
    },

    /// The declared opposite property does not exist on the opposite type.
    #[error(
        "opposite property '{opposite_property}' declared by '{property}' does not exist on type '{opposite_type}'"
    )]
    OppositePropertyNotFound {
        /// Identifier of the declaring property.
        property: String,
        /// Type expected to declare the opposite.
        opposite_type: String,
        /// Name of the missing opposite property.
        opposite_property: String,
    },

    /// The opposite property exists but points at an unrelated type.
    #[error(
        "opposite property '{opposite_property}' of '{property}' refers to type '{actual}', \
         expected '{expected}' or one of its base types"
    )]
    OppositeDeclaringTypeMismatch {
        /// Identifier of the declaring property.
        property: String,
        /// Identifier of the opposite property.
        opposite_property: String,
        /// The type the opposite should refer to.
        expected: String,
        /// The type the opposite refers to.
        actual: String,
    },

    // --- validation errors ---
    /// A validation pass reported one or more violations.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    // --- configuration drift ---
    /// The active mixin configuration differs from the one captured at build time.
    #[error(
        "mixin configuration of class '{class_id}' changed since the mapping was built: \
         built with [{}], now [{}]",
        captured.join(", "),
        current.join(", ")
    )]
    MixinConfigurationDrift {
        /// The affected class.
        class_id: String,
        /// Mixins captured at build time.
        captured: Vec<String>,
        /// Mixins active now.
        current: Vec<String>,
    },

    // --- internal consistency (persistence-model loader defects) ---
    /// The persistence-model loader left a class without a storage entity.
    #[error(
        "internal error: persistence model loader did not assign a storage entity to class '{class_id}'"
    )]
    MissingStorageEntity {
        /// The unassigned class.
        class_id: String,
    },

    /// The persistence-model loader left a persistent property without a column.
    #[error(
        "internal error: persistence model loader did not assign a storage property to \
         '{property}' of class '{class_id}'"
    )]
    MissingStorageProperty {
        /// The owning class.
        class_id: String,
        /// Identifier of the unassigned property.
        property: String,
    },

    // --- lifecycle errors ---
    /// A mutation was attempted on a frozen class.
    #[error("class '{class_id}' is frozen; cannot {operation}")]
    ClassFrozen {
        /// The frozen class.
        class_id: String,
        /// The attempted operation.
        operation: &'static str,
    },

    /// A mutation was attempted on a frozen property.
    #[error("property '{property}' is frozen; cannot {operation}")]
    PropertyFrozen {
        /// Identifier of the frozen property.
        property: String,
        /// The attempted operation.
        operation: &'static str,
    },

    /// The derived classes of a class were assigned twice.
    #[error("derived classes of class '{class_id}' have already been set")]
    DerivedClassesAlreadySet {
        /// The affected class.
        class_id: String,
    },

    /// A class was frozen before its derived classes were assigned.
    #[error("class '{class_id}' cannot be frozen before its derived classes are set")]
    DerivedClassesNotSet {
        /// The affected class.
        class_id: String,
    },

    // --- lookups ---
    /// No class with the given identifier exists.
    #[error("mapping does not contain class '{class_id}'")]
    ClassNotFound {
        /// The requested identifier.
        class_id: String,
    },

    /// No class is mapped for the given type.
    #[error("type '{type_name}' is not part of the mapping")]
    TypeNotMapped {
        /// The requested type.
        type_name: String,
    },

    /// No relation with the given identifier exists.
    #[error("mapping does not contain relation '{relation_id}'")]
    RelationNotFound {
        /// The requested identifier.
        relation_id: String,
    },

    /// The class has no property with the given name.
    #[error("class '{class_id}' does not define property '{property}'")]
    PropertyNotFound {
        /// The searched class.
        class_id: String,
        /// The requested property name.
        property: String,
    },

    // --- current configuration ---
    /// No current mapping configuration has been set.
    #[error("no current mapping configuration has been set")]
    CurrentNotSet,

    /// A current mapping configuration is already set.
    #[error("a current mapping configuration is already set; reset it first")]
    CurrentAlreadySet,

    // --- registry loading ---
    /// I/O error while reading a registration table.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON registration table or options file.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
