//! The mapping configuration.
//!
//! [`MappingConfiguration::build`] runs the whole pipeline: classes,
//! relations, validation, storage assignment, persistence validation and
//! freeze. The result is immutable and can be shared across threads.

use crate::build::{ClassDefinitionBuilder, MixinContributionMerger, RelationResolver};
use crate::config::MappingOptions;
use crate::error::{MappingError, Result};
use crate::introspect::TypeIntrospector;
use crate::model::{
    ClassDefinition, PropertyDefinition, RelationDefinition, RelationEndPoint, TypeName,
};
use crate::persistence::PersistenceModelLoader;
use crate::validation::{
    ClassDefinitionValidator, PropertyDefinitionValidator, RelationDefinitionValidator,
    ValidationFailure, ValidationPass, ValidationViolation,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

static CURRENT: RwLock<Option<Arc<MappingConfiguration>>> = parking_lot::const_rwlock(None);

/// A frozen, validated mapping metadata graph.
#[derive(Debug)]
pub struct MappingConfiguration {
    classes: Vec<Arc<ClassDefinition>>,
    classes_by_id: HashMap<String, Arc<ClassDefinition>>,
    classes_by_type: HashMap<TypeName, Arc<ClassDefinition>>,
    relations: Vec<Arc<RelationDefinition>>,
    relations_by_id: HashMap<String, Arc<RelationDefinition>>,
    options: MappingOptions,
}

impl MappingConfiguration {
    /// Build, validate and freeze the mapping for `types`.
    ///
    /// Base types reachable from `types` are mapped as well. Each validation
    /// pass runs only if the previous one reported no violations.
    pub fn build(
        introspector: &dyn TypeIntrospector,
        types: &[TypeName],
        loader: &dyn PersistenceModelLoader,
        options: MappingOptions,
    ) -> Result<Self> {
        info!(types = types.len(), "building mapping configuration");

        let classes = ClassDefinitionBuilder::new(introspector).build(types)?;
        let relations = RelationResolver::new(&classes).resolve()?;

        if options.check_mixin_drift {
            let merger = MixinContributionMerger::new(introspector);
            for class in &classes {
                merger.check_drift(class)?;
            }
        }

        run_pass(
            ValidationPass::Class,
            ClassDefinitionValidator::with_default_rules(&options).validate(&classes),
        )?;
        run_pass(
            ValidationPass::Property,
            PropertyDefinitionValidator::with_default_rules(&options).validate(&classes),
        )?;
        run_pass(
            ValidationPass::Relation,
            RelationDefinitionValidator::with_default_rules(&options).validate(&relations),
        )?;

        let roots: Vec<Arc<ClassDefinition>> = classes
            .iter()
            .filter(|class| !class.has_base_class())
            .cloned()
            .collect();
        for root in &roots {
            loader.apply_to_hierarchy(root)?;
            debug!(root = %root.id(), "persistence model applied");
        }

        verify_storage(&classes)?;

        for root in &roots {
            let validator = loader.create_validator(root);
            run_pass(ValidationPass::Persistence, validator.validate(root))?;
        }

        for class in &classes {
            class.freeze()?;
        }

        let configuration = Self::from_parts(classes, relations, options);
        info!(
            classes = configuration.classes.len(),
            relations = configuration.relations.len(),
            roots = roots.len(),
            "mapping configuration built"
        );
        Ok(configuration)
    }

    fn from_parts(
        classes: Vec<Arc<ClassDefinition>>,
        relations: Vec<Arc<RelationDefinition>>,
        options: MappingOptions,
    ) -> Self {
        let classes_by_id = classes
            .iter()
            .map(|class| (class.id().to_string(), class.clone()))
            .collect();
        let classes_by_type = classes
            .iter()
            .map(|class| (class.class_type().clone(), class.clone()))
            .collect();
        let relations_by_id = relations
            .iter()
            .map(|relation| (relation.id().to_string(), relation.clone()))
            .collect();
        Self {
            classes,
            classes_by_id,
            classes_by_type,
            relations,
            relations_by_id,
            options,
        }
    }

    /// The options the mapping was built with.
    pub fn options(&self) -> &MappingOptions {
        &self.options
    }

    /// All classes, bases before derived classes.
    pub fn classes(&self) -> &[Arc<ClassDefinition>] {
        &self.classes
    }

    /// All relations in discovery order.
    pub fn relations(&self) -> &[Arc<RelationDefinition>] {
        &self.relations
    }

    /// Classes without a mapped base class.
    pub fn inheritance_roots(&self) -> Vec<Arc<ClassDefinition>> {
        self.classes
            .iter()
            .filter(|class| !class.has_base_class())
            .cloned()
            .collect()
    }

    /// Find the class mapped for a type.
    pub fn get_class_by_type(&self, type_name: &TypeName) -> Option<Arc<ClassDefinition>> {
        self.classes_by_type.get(type_name).cloned()
    }

    /// Find the class mapped for a type, failing if there is none.
    pub fn get_mandatory_class_by_type(
        &self,
        type_name: &TypeName,
    ) -> Result<Arc<ClassDefinition>> {
        self.get_class_by_type(type_name)
            .ok_or_else(|| MappingError::TypeNotMapped {
                type_name: type_name.to_string(),
            })
    }

    /// Find a class by identifier.
    pub fn get_class(&self, class_id: &str) -> Option<Arc<ClassDefinition>> {
        self.classes_by_id.get(class_id).cloned()
    }

    /// Find a class by identifier, failing if there is none.
    pub fn get_mandatory_class(&self, class_id: &str) -> Result<Arc<ClassDefinition>> {
        self.get_class(class_id)
            .ok_or_else(|| MappingError::ClassNotFound {
                class_id: class_id.to_string(),
            })
    }

    /// Find a relation by identifier.
    pub fn get_relation(&self, relation_id: &str) -> Option<Arc<RelationDefinition>> {
        self.relations_by_id.get(relation_id).cloned()
    }

    /// Find a relation by identifier, failing if there is none.
    pub fn get_mandatory_relation(&self, relation_id: &str) -> Result<Arc<RelationDefinition>> {
        self.get_relation(relation_id)
            .ok_or_else(|| MappingError::RelationNotFound {
                relation_id: relation_id.to_string(),
            })
    }

    /// Find a property of a class, including inherited properties.
    pub fn get_property(&self, class_id: &str, name: &str) -> Option<Arc<PropertyDefinition>> {
        self.get_class(class_id)?.get_property(name)
    }

    /// Find a property of a class, failing if the class or property is missing.
    pub fn get_mandatory_property(
        &self,
        class_id: &str,
        name: &str,
    ) -> Result<Arc<PropertyDefinition>> {
        self.get_mandatory_class(class_id)?
            .get_mandatory_property(name)
    }

    /// Check if this exact class instance is part of the mapping.
    pub fn contains_class(&self, class: &ClassDefinition) -> bool {
        self.classes_by_id
            .get(class.id())
            .is_some_and(|mapped| std::ptr::eq(Arc::as_ptr(mapped), class))
    }

    /// Check if this exact property instance is part of the mapping.
    pub fn contains_property(&self, property: &PropertyDefinition) -> bool {
        self.get_class(property.class_id())
            .and_then(|class| class.get_own_property(property.name()))
            .is_some_and(|mapped| std::ptr::eq(Arc::as_ptr(&mapped), property))
    }

    /// Check if this exact relation instance is part of the mapping.
    pub fn contains_relation(&self, relation: &RelationDefinition) -> bool {
        self.relations_by_id
            .get(relation.id())
            .is_some_and(|mapped| std::ptr::eq(Arc::as_ptr(mapped), relation))
    }

    /// Check if this exact end-point instance is part of the mapping.
    pub fn contains_end_point(&self, end_point: &RelationEndPoint) -> bool {
        self.relations
            .iter()
            .any(|relation| relation.contains_end_point(end_point))
    }

    /// Re-check every class against the currently active mixins.
    pub fn validate_current_mixin_configuration(
        &self,
        introspector: &dyn TypeIntrospector,
    ) -> Result<()> {
        let merger = MixinContributionMerger::new(introspector);
        for class in &self.classes {
            merger.check_drift(class)?;
        }
        Ok(())
    }

    /// The process-wide current configuration.
    pub fn current() -> Result<Arc<MappingConfiguration>> {
        CURRENT.read().clone().ok_or(MappingError::CurrentNotSet)
    }

    /// Publish `configuration` as the current configuration.
    ///
    /// Fails if one is already set; call [`reset_current`](Self::reset_current)
    /// first to replace it.
    pub fn set_current(configuration: Arc<MappingConfiguration>) -> Result<()> {
        let mut current = CURRENT.write();
        if current.is_some() {
            return Err(MappingError::CurrentAlreadySet);
        }
        *current = Some(configuration);
        Ok(())
    }

    /// Clear the current configuration, returning the previous one.
    pub fn reset_current() -> Option<Arc<MappingConfiguration>> {
        CURRENT.write().take()
    }

    /// Check if a current configuration is set.
    pub fn has_current() -> bool {
        CURRENT.read().is_some()
    }
}

fn run_pass(pass: ValidationPass, violations: Vec<ValidationViolation>) -> Result<()> {
    if !violations.is_empty() {
        warn!(pass = %pass, violations = violations.len(), "validation failed");
    }
    ValidationFailure::check(pass, violations)?;
    Ok(())
}

// The loader must leave no class without storage and no persistent property
// without a column.
fn verify_storage(classes: &[Arc<ClassDefinition>]) -> Result<()> {
    for class in classes {
        if class.storage_entity().is_none() {
            return Err(MappingError::MissingStorageEntity {
                class_id: class.id().to_string(),
            });
        }
        for property in class.properties() {
            if property.is_persistent() && property.storage_property().is_none() {
                return Err(MappingError::MissingStorageProperty {
                    class_id: class.id().to_string(),
                    property: property.identifier(),
                });
            }
        }
    }
    Ok(())
}
