//! Class-level validation rules.

use super::{ClassValidationRule, ValidationViolation};
use crate::model::ClassDefinition;
use std::sync::Arc;

/// Class identifiers must be non-empty, free of whitespace and bounded in length.
pub struct ClassIdIsValidRule {
    max_length: usize,
}

impl ClassIdIsValidRule {
    /// Create the rule with a maximum identifier length.
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl ClassValidationRule for ClassIdIsValidRule {
    fn name(&self) -> &'static str {
        "ClassIdIsValidRule"
    }

    fn validate(&self, class: &ClassDefinition) -> Vec<ValidationViolation> {
        let id = class.id();
        let message = if id.is_empty() {
            "class id must not be empty".to_string()
        } else if id.chars().any(char::is_whitespace) {
            format!("class id '{id}' must not contain whitespace")
        } else if id.chars().count() > self.max_length {
            format!(
                "class id '{id}' is longer than {} characters",
                self.max_length
            )
        } else {
            return Vec::new();
        };
        vec![ValidationViolation::class(self.name(), id, message)]
    }
}

/// Open generic types cannot be mapped.
pub struct DomainObjectTypeIsNotGenericRule;

impl ClassValidationRule for DomainObjectTypeIsNotGenericRule {
    fn name(&self) -> &'static str {
        "DomainObjectTypeIsNotGenericRule"
    }

    fn validate(&self, class: &ClassDefinition) -> Vec<ValidationViolation> {
        if !class.is_generic() {
            return Vec::new();
        }
        vec![ValidationViolation::class(
            self.name(),
            class.id(),
            format!("generic type '{}' cannot be mapped", class.class_type()),
        )]
    }
}

/// At most one class per inheritance chain may declare a storage group.
pub struct StorageGroupIsOnlyDefinedOncePerHierarchyRule;

impl ClassValidationRule for StorageGroupIsOnlyDefinedOncePerHierarchyRule {
    fn name(&self) -> &'static str {
        "StorageGroupIsOnlyDefinedOncePerHierarchyRule"
    }

    fn validate(&self, class: &ClassDefinition) -> Vec<ValidationViolation> {
        if !class.has_declared_storage_group() {
            return Vec::new();
        }
        class
            .ancestors()
            .iter()
            .find(|ancestor| ancestor.has_declared_storage_group())
            .map(|ancestor| {
                ValidationViolation::class(
                    self.name(),
                    class.id(),
                    format!(
                        "storage group is already declared by base class '{}'",
                        ancestor.id()
                    ),
                )
            })
            .into_iter()
            .collect()
    }
}

/// Base and derived links must agree with each other.
pub struct InheritanceHierarchyFollowsClassHierarchyRule;

impl ClassValidationRule for InheritanceHierarchyFollowsClassHierarchyRule {
    fn name(&self) -> &'static str {
        "InheritanceHierarchyFollowsClassHierarchyRule"
    }

    fn validate(&self, class: &ClassDefinition) -> Vec<ValidationViolation> {
        let mut violations = Vec::new();

        if let Some(base) = class.base_class() {
            let listed = base
                .derived_classes()
                .iter()
                .any(|derived| std::ptr::eq(Arc::as_ptr(derived), class));
            if !listed {
                violations.push(ValidationViolation::class(
                    self.name(),
                    class.id(),
                    format!(
                        "class is not listed among the derived classes of its base class '{}'",
                        base.id()
                    ),
                ));
            }
        }

        for derived in class.derived_classes() {
            let points_back = derived
                .base_class()
                .is_some_and(|base| std::ptr::eq(Arc::as_ptr(&base), class));
            if !points_back {
                violations.push(ValidationViolation::class(
                    self.name(),
                    class.id(),
                    format!(
                        "derived class '{}' does not have this class as its base class",
                        derived.id()
                    ),
                ));
            }
        }

        violations
    }
}
