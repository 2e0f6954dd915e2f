//! Class definition builder.
//!
//! Turns a list of types into class definitions. Base types are built on
//! demand before their derivatives, so the input order does not matter.

use super::mixin::MixinContributionMerger;
use crate::error::{MappingError, Result};
use crate::introspect::{PropertyDeclaration, TypeIntrospector, TypeMembers};
use crate::model::{
    ClassAttributes, ClassDefinition, PropertyType, RelationMember, StorageClass, TypeName,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Builds class definitions with base and derived links.
pub struct ClassDefinitionBuilder<'a> {
    introspector: &'a dyn TypeIntrospector,
    by_type: HashMap<TypeName, Arc<ClassDefinition>>,
    by_id: HashMap<String, Arc<ClassDefinition>>,
    built: Vec<Arc<ClassDefinition>>,
}

impl<'a> ClassDefinitionBuilder<'a> {
    /// Create a builder over an introspector.
    pub fn new(introspector: &'a dyn TypeIntrospector) -> Self {
        Self {
            introspector,
            by_type: HashMap::new(),
            by_id: HashMap::new(),
            built: Vec::new(),
        }
    }

    /// Build a class for every type in `types` and for every base type they
    /// reach.
    ///
    /// Classes are returned in construction order: a base always precedes
    /// its derived classes. Every returned class has its derived classes set.
    pub fn build(mut self, types: &[TypeName]) -> Result<Vec<Arc<ClassDefinition>>> {
        for type_name in types {
            let mut pending = Vec::new();
            self.build_class(type_name, &mut pending)?;
        }
        self.assign_derived_classes()?;
        Ok(self.built)
    }

    fn build_class(
        &mut self,
        type_name: &TypeName,
        pending: &mut Vec<TypeName>,
    ) -> Result<Arc<ClassDefinition>> {
        if let Some(class) = self.by_type.get(type_name) {
            return Ok(class.clone());
        }
        if pending.contains(type_name) {
            return Err(MappingError::InheritanceCycle {
                type_name: type_name.to_string(),
            });
        }

        let members =
            self.introspector
                .members(type_name)
                .ok_or_else(|| MappingError::UnknownType {
                    type_name: type_name.to_string(),
                })?;

        pending.push(type_name.clone());
        let base_class = match &members.base_type {
            Some(base_type) => Some(self.build_class(base_type, pending)?),
            None => None,
        };
        pending.pop();

        let class_id = members.class_id().to_string();
        if let Some(existing) = self.by_id.get(&class_id) {
            return Err(MappingError::DuplicateClassId {
                class_id,
                existing_type: existing.class_type().to_string(),
                existing_module: existing.class_type().module().to_string(),
                new_type: type_name.to_string(),
                new_module: type_name.module().to_string(),
            });
        }

        let class = self.create_class(class_id, &members, base_class)?;
        debug!(
            class_id = %class.id(),
            class_type = %class.class_type(),
            properties = class.properties().len(),
            "class built"
        );

        self.by_id.insert(class.id().to_string(), class.clone());
        self.by_type.insert(type_name.clone(), class.clone());
        self.built.push(class.clone());
        Ok(class)
    }

    fn create_class(
        &self,
        class_id: String,
        members: &TypeMembers,
        base_class: Option<Arc<ClassDefinition>>,
    ) -> Result<Arc<ClassDefinition>> {
        let type_name = &members.type_name;
        let contribution =
            MixinContributionMerger::new(self.introspector).merge(type_name, base_class.as_deref());

        let mut declarations: Vec<PropertyDeclaration> = members.properties.clone();
        declarations.extend(contribution.properties());

        let mut attributes = ClassAttributes::new(class_id, type_name.clone())
            .with_abstract(members.is_abstract)
            .with_generic(members.is_generic)
            .with_mixins(contribution.captured, contribution.persistent);
        if let Some(group) = &members.storage_group {
            attributes = attributes.with_storage_group(group.clone());
        }
        if let Some(base) = &base_class {
            attributes = attributes.with_base(base.clone());
        }

        let mut stored = Vec::new();
        let mut virtual_names: HashSet<String> = HashSet::new();
        for declaration in declarations {
            if declaration.storage_class == StorageClass::None {
                continue;
            }
            let declaring_type = declaration.declaring_type_or(type_name).clone();

            if !declaration.property_type.is_relation() {
                stored.push(declaration);
                continue;
            }

            let is_virtual = self.is_virtual(&declaration);
            if is_virtual {
                let inherited = base_class
                    .as_ref()
                    .and_then(|base| base.member_defined_by(&declaration.name));
                if let Some(defined_by) = inherited {
                    return Err(MappingError::DuplicatePropertyName {
                        class_id: attributes.id.clone(),
                        property: declaration.name.clone(),
                        defined_by: defined_by.to_string(),
                    });
                }
                if !virtual_names.insert(declaration.name.clone()) {
                    return Err(MappingError::DuplicatePropertyName {
                        class_id: attributes.id.clone(),
                        property: declaration.name.clone(),
                        defined_by: declaring_type.to_string(),
                    });
                }
            } else {
                stored.push(declaration.clone());
            }

            if let Some(member) = RelationMember::new(declaration, declaring_type, is_virtual) {
                attributes = attributes.with_relation_member(member);
            }
        }

        let class = ClassDefinition::new(attributes);
        for declaration in &stored {
            class.add_property(declaration)?;
        }
        Ok(class)
    }

    // Collections never hold the foreign key. A reference is the virtual
    // side when its opposite is also a reference and it does not claim the
    // foreign key itself.
    fn is_virtual(&self, declaration: &PropertyDeclaration) -> bool {
        match &declaration.property_type {
            PropertyType::Collection { .. } => true,
            PropertyType::Reference { target } => {
                if declaration.contains_foreign_key {
                    return false;
                }
                let Some(opposite) = &declaration.opposite else {
                    return false;
                };
                self.find_declaration(target, opposite)
                    .is_some_and(|d| d.property_type.is_reference())
            }
            PropertyType::Value { .. } => false,
        }
    }

    // Look up a declaration on a type, its bases and its active mixins.
    fn find_declaration(&self, type_name: &TypeName, name: &str) -> Option<PropertyDeclaration> {
        let mut seen = HashSet::new();
        let mut current = Some(type_name.clone());
        while let Some(type_name) = current {
            if !seen.insert(type_name.clone()) {
                break;
            }
            let Some(members) = self.introspector.members(&type_name) else {
                break;
            };
            if let Some(declaration) = members.get_property(name) {
                return Some(declaration.clone());
            }
            current = members.base_type;
        }

        self.introspector
            .active_mixins(type_name)
            .into_iter()
            .flat_map(|mixin| mixin.properties)
            .find(|declaration| declaration.name == name)
    }

    fn assign_derived_classes(&self) -> Result<()> {
        for class in &self.built {
            let derived: Vec<Arc<ClassDefinition>> = self
                .built
                .iter()
                .filter(|candidate| {
                    candidate
                        .base_class()
                        .is_some_and(|base| Arc::ptr_eq(&base, class))
                })
                .cloned()
                .collect();
            class.set_derived_classes(derived)?;
        }
        Ok(())
    }
}
