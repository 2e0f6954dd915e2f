//! Core type definitions shared by the mapping model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully qualified name of a domain type (`shop::domain::Order`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Create a type name from a `::`-separated path.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The full path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The containing module path, empty for a bare name.
    pub fn module(&self) -> &str {
        match self.0.rfind("::") {
            Some(pos) => &self.0[..pos],
            None => "",
        }
    }

    /// The last path segment.
    pub fn short_name(&self) -> &str {
        match self.0.rfind("::") {
            Some(pos) => &self.0[pos + 2..],
            None => &self.0,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Scalar value types a property can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Boolean value.
    Bool,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Double,
    /// Fixed-precision decimal.
    Decimal,
    /// Point in time.
    DateTime,
    /// 128-bit identifier.
    Uuid,
    /// UTF-8 text.
    String,
    /// Binary data.
    Bytes,
    /// A named enumeration.
    Enum(String),
}

impl ValueType {
    /// Reference-typed values can be null without an optional wrapper.
    pub fn is_reference_type(&self) -> bool {
        matches!(self, ValueType::String | ValueType::Bytes)
    }

    /// Sequence-like values that accept a maximum length.
    pub fn supports_max_length(&self) -> bool {
        matches!(self, ValueType::String | ValueType::Bytes)
    }
}

/// The declared type of a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyType {
    /// A scalar value, optionally wrapped (`Option<T>`).
    Value {
        /// The scalar type.
        value_type: ValueType,
        /// Whether the value is wrapped in an optional.
        #[serde(default)]
        optional: bool,
    },
    /// A single-valued reference to another domain type.
    Reference {
        /// The referenced type.
        target: TypeName,
    },
    /// A collection of another domain type.
    Collection {
        /// The element type.
        target: TypeName,
    },
}

impl PropertyType {
    /// Create a non-optional scalar type.
    pub fn value(value_type: ValueType) -> Self {
        PropertyType::Value {
            value_type,
            optional: false,
        }
    }

    /// Create an optional scalar type.
    pub fn optional(value_type: ValueType) -> Self {
        PropertyType::Value {
            value_type,
            optional: true,
        }
    }

    /// Create a reference type.
    pub fn reference(target: impl Into<TypeName>) -> Self {
        PropertyType::Reference {
            target: target.into(),
        }
    }

    /// Create a collection type.
    pub fn collection(target: impl Into<TypeName>) -> Self {
        PropertyType::Collection {
            target: target.into(),
        }
    }

    /// The related domain type for references and collections.
    pub fn relation_target(&self) -> Option<&TypeName> {
        match self {
            PropertyType::Reference { target } | PropertyType::Collection { target } => {
                Some(target)
            }
            PropertyType::Value { .. } => None,
        }
    }

    /// Check if this type declares a relation.
    pub fn is_relation(&self) -> bool {
        self.relation_target().is_some()
    }

    /// Check if this is a collection type.
    pub fn is_collection(&self) -> bool {
        matches!(self, PropertyType::Collection { .. })
    }

    /// Check if this is a single-valued reference.
    pub fn is_reference(&self) -> bool {
        matches!(self, PropertyType::Reference { .. })
    }

    /// Get the scalar type if this is a value type.
    pub fn value_type(&self) -> Option<&ValueType> {
        match self {
            PropertyType::Value { value_type, .. } => Some(value_type),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::Value {
                value_type,
                optional: false,
            } => write!(f, "{value_type:?}"),
            PropertyType::Value {
                value_type,
                optional: true,
            } => write!(f, "Option<{value_type:?}>"),
            PropertyType::Reference { target } => write!(f, "{target}"),
            PropertyType::Collection { target } => write!(f, "Vec<{target}>"),
        }
    }
}

/// How a property is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    /// Stored in the persistent store.
    #[default]
    Persistent,
    /// Kept for the lifetime of a transaction only.
    Transaction,
    /// Not part of the mapping.
    None,
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageClass::Persistent => write!(f, "persistent"),
            StorageClass::Transaction => write!(f, "transaction"),
            StorageClass::None => write!(f, "none"),
        }
    }
}

/// Cardinality of a virtual relation end-point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// A single related object.
    One,
    /// A collection of related objects.
    Many,
}
