//! Validation pipeline.
//!
//! Validation runs in passes: class, property, relation and, once the
//! persistence-model loader has assigned storage, persistence. Each pass
//! runs every rule of its category and reports all violations together.
//! A pass only runs after the previous one reported none.

mod class_rules;
mod persistence_rules;
mod property_rules;
mod relation_rules;

pub use class_rules::{
    ClassIdIsValidRule, DomainObjectTypeIsNotGenericRule,
    InheritanceHierarchyFollowsClassHierarchyRule, StorageGroupIsOnlyDefinedOncePerHierarchyRule,
};
pub use persistence_rules::{
    ClassAboveTableIsAbstractRule, ColumnNamesAreUniqueRule, NonAbstractClassHasStorageEntityRule,
};
pub use property_rules::{
    MaxLengthIsSupportedRule, NullabilityIsSupportedRule, StorageClassIsSupportedRule,
};
pub use relation_rules::{
    EndPointCombinationIsSupportedRule, EndPointPropertyTypeMatchesDirectionRule,
    SortExpressionIsValidRule,
};

use crate::config::MappingOptions;
use crate::model::{ClassDefinition, PropertyDefinition, RelationDefinition};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationViolation {
    /// Name of the rule that reported the violation.
    pub rule: &'static str,
    /// The offending class.
    pub class_id: String,
    /// The offending property, if the violation concerns one.
    pub property: Option<String>,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationViolation {
    /// A violation concerning a whole class.
    pub fn class(
        rule: &'static str,
        class_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            class_id: class_id.into(),
            property: None,
            message: message.into(),
        }
    }

    /// A violation concerning one property of a class.
    pub fn property(
        rule: &'static str,
        class_id: impl Into<String>,
        property: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            class_id: class_id.into(),
            property: Some(property.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.property {
            Some(property) => write!(
                f,
                "{}: class '{}', property '{}': {}",
                self.rule, self.class_id, property, self.message
            ),
            None => write!(f, "{}: class '{}': {}", self.rule, self.class_id, self.message),
        }
    }
}

/// The validation passes, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPass {
    /// Class-level rules.
    Class,
    /// Property-level rules.
    Property,
    /// Relation-level rules.
    Relation,
    /// Rules over the storage assigned by the persistence-model loader.
    Persistence,
}

impl fmt::Display for ValidationPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationPass::Class => write!(f, "class"),
            ValidationPass::Property => write!(f, "property"),
            ValidationPass::Relation => write!(f, "relation"),
            ValidationPass::Persistence => write!(f, "persistence"),
        }
    }
}

fn list_violations(violations: &[ValidationViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("\n  - {v}"))
        .collect()
}

/// All violations reported by one validation pass.
#[derive(Debug, Clone, Error)]
#[error(
    "{pass} validation failed with {} violation(s):{}",
    .violations.len(),
    list_violations(.violations)
)]
pub struct ValidationFailure {
    /// The failing pass.
    pub pass: ValidationPass,
    /// Every violation of the pass, in rule order.
    pub violations: Vec<ValidationViolation>,
}

impl ValidationFailure {
    /// Succeed if `violations` is empty, otherwise fail with all of them.
    pub fn check(
        pass: ValidationPass,
        violations: Vec<ValidationViolation>,
    ) -> std::result::Result<(), ValidationFailure> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure { pass, violations })
        }
    }
}

/// A rule over a single class.
pub trait ClassValidationRule: Send + Sync {
    /// Rule name reported with violations.
    fn name(&self) -> &'static str;

    /// Check one class.
    fn validate(&self, class: &ClassDefinition) -> Vec<ValidationViolation>;
}

/// A rule over a single property.
pub trait PropertyValidationRule: Send + Sync {
    /// Rule name reported with violations.
    fn name(&self) -> &'static str;

    /// Check one property.
    fn validate(&self, property: &PropertyDefinition) -> Vec<ValidationViolation>;
}

/// A rule over a single relation.
pub trait RelationValidationRule: Send + Sync {
    /// Rule name reported with violations.
    fn name(&self) -> &'static str;

    /// Check one relation.
    fn validate(&self, relation: &RelationDefinition) -> Vec<ValidationViolation>;
}

/// A rule over one inheritance hierarchy after storage assignment.
pub trait PersistenceValidationRule: Send + Sync {
    /// Rule name reported with violations.
    fn name(&self) -> &'static str;

    /// Check a hierarchy, given as its root followed by all descendants.
    fn validate(&self, hierarchy: &[Arc<ClassDefinition>]) -> Vec<ValidationViolation>;
}

/// Runs the class rules.
pub struct ClassDefinitionValidator {
    rules: Vec<Box<dyn ClassValidationRule>>,
}

impl ClassDefinitionValidator {
    /// Create a validator with an explicit rule list.
    pub fn new(rules: Vec<Box<dyn ClassValidationRule>>) -> Self {
        Self { rules }
    }

    /// Create a validator with the standard class rules.
    pub fn with_default_rules(options: &MappingOptions) -> Self {
        Self::new(vec![
            Box::new(ClassIdIsValidRule::new(options.max_class_id_length)),
            Box::new(DomainObjectTypeIsNotGenericRule),
            Box::new(StorageGroupIsOnlyDefinedOncePerHierarchyRule),
            Box::new(InheritanceHierarchyFollowsClassHierarchyRule),
        ])
    }

    /// Names of the configured rules, in order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule over every class.
    pub fn validate(&self, classes: &[Arc<ClassDefinition>]) -> Vec<ValidationViolation> {
        classes
            .iter()
            .flat_map(|class| self.rules.iter().flat_map(move |rule| rule.validate(class)))
            .collect()
    }
}

/// Runs the property rules over the own properties of each class.
pub struct PropertyDefinitionValidator {
    rules: Vec<Box<dyn PropertyValidationRule>>,
}

impl PropertyDefinitionValidator {
    /// Create a validator with an explicit rule list.
    pub fn new(rules: Vec<Box<dyn PropertyValidationRule>>) -> Self {
        Self { rules }
    }

    /// Create a validator with the standard property rules.
    pub fn with_default_rules(options: &MappingOptions) -> Self {
        Self::new(vec![
            Box::new(StorageClassIsSupportedRule::new(
                options.supported_storage_classes.clone(),
            )),
            Box::new(NullabilityIsSupportedRule),
            Box::new(MaxLengthIsSupportedRule),
        ])
    }

    /// Names of the configured rules, in order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule over every own property of every class.
    pub fn validate(&self, classes: &[Arc<ClassDefinition>]) -> Vec<ValidationViolation> {
        let mut violations = Vec::new();
        for class in classes {
            for property in class.properties() {
                for rule in &self.rules {
                    violations.extend(rule.validate(&property));
                }
            }
        }
        violations
    }
}

/// Runs the relation rules.
pub struct RelationDefinitionValidator {
    rules: Vec<Box<dyn RelationValidationRule>>,
}

impl RelationDefinitionValidator {
    /// Create a validator with an explicit rule list.
    pub fn new(rules: Vec<Box<dyn RelationValidationRule>>) -> Self {
        Self { rules }
    }

    /// Create a validator with the standard relation rules.
    pub fn with_default_rules(_options: &MappingOptions) -> Self {
        Self::new(vec![
            Box::new(EndPointCombinationIsSupportedRule),
            Box::new(EndPointPropertyTypeMatchesDirectionRule),
            Box::new(SortExpressionIsValidRule),
        ])
    }

    /// Names of the configured rules, in order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule over every relation.
    pub fn validate(&self, relations: &[Arc<RelationDefinition>]) -> Vec<ValidationViolation> {
        relations
            .iter()
            .flat_map(|relation| {
                self.rules
                    .iter()
                    .flat_map(move |rule| rule.validate(relation))
            })
            .collect()
    }
}

/// Runs the persistence rules over one inheritance hierarchy.
pub struct PersistenceMappingValidator {
    rules: Vec<Box<dyn PersistenceValidationRule>>,
}

impl PersistenceMappingValidator {
    /// Create a validator with an explicit rule list.
    pub fn new(rules: Vec<Box<dyn PersistenceValidationRule>>) -> Self {
        Self { rules }
    }

    /// Create a validator with the standard persistence rules.
    pub fn with_default_rules() -> Self {
        Self::new(vec![
            Box::new(NonAbstractClassHasStorageEntityRule),
            Box::new(ClassAboveTableIsAbstractRule),
            Box::new(ColumnNamesAreUniqueRule),
        ])
    }

    /// Names of the configured rules, in order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule over `root` and its descendants.
    pub fn validate(&self, root: &Arc<ClassDefinition>) -> Vec<ValidationViolation> {
        let mut hierarchy = vec![root.clone()];
        hierarchy.extend(root.descendants());
        self.rules
            .iter()
            .flat_map(|rule| rule.validate(&hierarchy))
            .collect()
    }
}
