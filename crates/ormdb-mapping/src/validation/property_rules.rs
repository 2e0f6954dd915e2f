//! Property-level validation rules.

use super::{PropertyValidationRule, ValidationViolation};
use crate::model::{PropertyDefinition, PropertyType, StorageClass, ValueType};

/// The storage class of a property must be one of the supported ones.
pub struct StorageClassIsSupportedRule {
    supported: Vec<StorageClass>,
}

impl StorageClassIsSupportedRule {
    /// Create the rule with the accepted storage classes.
    pub fn new(supported: Vec<StorageClass>) -> Self {
        Self { supported }
    }
}

impl PropertyValidationRule for StorageClassIsSupportedRule {
    fn name(&self) -> &'static str {
        "StorageClassIsSupportedRule"
    }

    fn validate(&self, property: &PropertyDefinition) -> Vec<ValidationViolation> {
        if self.supported.contains(&property.storage_class()) {
            return Vec::new();
        }
        vec![ValidationViolation::property(
            self.name(),
            property.class_id(),
            property.name(),
            format!(
                "storage class '{}' is not supported",
                property.storage_class()
            ),
        )]
    }
}

/// Nullability can only be declared on text and binary values.
///
/// Other scalars express nullability through an optional type, relations
/// through the mandatory flag.
pub struct NullabilityIsSupportedRule;

impl PropertyValidationRule for NullabilityIsSupportedRule {
    fn name(&self) -> &'static str {
        "NullabilityIsSupportedRule"
    }

    fn validate(&self, property: &PropertyDefinition) -> Vec<ValidationViolation> {
        if property.declared_nullable().is_none() {
            return Vec::new();
        }
        let message = match property.property_type() {
            PropertyType::Value { value_type, .. } if value_type.is_reference_type() => {
                return Vec::new();
            }
            PropertyType::Value { value_type, .. } => format!(
                "nullability cannot be declared for value type '{value_type:?}'; \
                 use an optional type"
            ),
            PropertyType::Reference { .. } | PropertyType::Collection { .. } => {
                "nullability cannot be declared for relation properties".to_string()
            }
        };
        vec![ValidationViolation::property(
            self.name(),
            property.class_id(),
            property.name(),
            message,
        )]
    }
}

/// A maximum length is only meaningful for text and binary values.
pub struct MaxLengthIsSupportedRule;

impl PropertyValidationRule for MaxLengthIsSupportedRule {
    fn name(&self) -> &'static str {
        "MaxLengthIsSupportedRule"
    }

    fn validate(&self, property: &PropertyDefinition) -> Vec<ValidationViolation> {
        let Some(max_length) = property.max_length() else {
            return Vec::new();
        };
        let supported = property
            .property_type()
            .value_type()
            .is_some_and(ValueType::supports_max_length);

        let message = if !supported {
            format!(
                "maximum length cannot be declared for type '{}'",
                property.property_type()
            )
        } else if max_length == 0 {
            "maximum length must be greater than zero".to_string()
        } else {
            return Vec::new();
        };
        vec![ValidationViolation::property(
            self.name(),
            property.class_id(),
            property.name(),
            message,
        )]
    }
}
