//! Class definitions.
//!
//! A [`ClassDefinition`] starts out mutable: the builder adds properties,
//! the resolver attaches relations, the persistence-model loader assigns a
//! storage entity. [`ClassDefinition::freeze`] moves the contents into an
//! immutable snapshot; every later mutation fails.

use super::property::PropertyDefinition;
use super::relation::RelationDefinition;
use super::storage::StorageEntity;
use super::types::TypeName;
use crate::error::{MappingError, Result};
use crate::introspect::PropertyDeclaration;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock, Weak};
use tracing::debug;

/// A relation-bearing member captured at build time for the relation resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationMember {
    declaration: PropertyDeclaration,
    declaring_type: TypeName,
    target: TypeName,
    is_virtual: bool,
}

impl RelationMember {
    /// Capture a relation declaration. Returns `None` for scalar declarations.
    pub fn new(
        declaration: PropertyDeclaration,
        declaring_type: TypeName,
        is_virtual: bool,
    ) -> Option<Self> {
        let target = declaration.property_type.relation_target()?.clone();
        Some(Self {
            declaration,
            declaring_type,
            target,
            is_virtual,
        })
    }

    /// The captured declaration.
    pub fn declaration(&self) -> &PropertyDeclaration {
        &self.declaration
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    /// The type that declared the member.
    pub fn declaring_type(&self) -> &TypeName {
        &self.declaring_type
    }

    /// The related type.
    pub fn target(&self) -> &TypeName {
        &self.target
    }

    /// Name of the opposite property, if bidirectional.
    pub fn opposite(&self) -> Option<&str> {
        self.declaration.opposite.as_deref()
    }

    /// Whether the member is the virtual side of its relation.
    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    /// `{declaring_type}.{name}`.
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.declaring_type, self.name())
    }
}

/// Immutable attributes of a class, fixed at construction.
#[derive(Debug, Clone)]
pub struct ClassAttributes {
    /// Class identifier.
    pub id: String,
    /// The mapped type.
    pub class_type: TypeName,
    /// Whether the type cannot be instantiated.
    pub is_abstract: bool,
    /// Whether the type is an open generic type.
    pub is_generic: bool,
    /// The mapped base class.
    pub base_class: Option<Arc<ClassDefinition>>,
    /// Effective storage group.
    pub storage_group: Option<String>,
    /// Whether the storage group is declared on this class itself.
    pub storage_group_declared: bool,
    /// Every mixin active when the class was built.
    pub captured_mixins: Vec<TypeName>,
    /// Active mixins that contribute persistent members.
    pub persistent_mixins: Vec<TypeName>,
    /// Own relation-bearing members.
    pub relation_members: Vec<RelationMember>,
}

impl ClassAttributes {
    /// Attributes of a concrete root class with no members.
    pub fn new(id: impl Into<String>, class_type: impl Into<TypeName>) -> Self {
        Self {
            id: id.into(),
            class_type: class_type.into(),
            is_abstract: false,
            is_generic: false,
            base_class: None,
            storage_group: None,
            storage_group_declared: false,
            captured_mixins: Vec::new(),
            persistent_mixins: Vec::new(),
            relation_members: Vec::new(),
        }
    }

    /// Set the base class; the storage group is inherited unless declared.
    pub fn with_base(mut self, base_class: Arc<ClassDefinition>) -> Self {
        if !self.storage_group_declared {
            self.storage_group = base_class.storage_group().map(str::to_string);
        }
        self.base_class = Some(base_class);
        self
    }

    /// Mark the class abstract.
    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    /// Mark the class type generic.
    pub fn with_generic(mut self, is_generic: bool) -> Self {
        self.is_generic = is_generic;
        self
    }

    /// Declare a storage group on this class.
    pub fn with_storage_group(mut self, group: impl Into<String>) -> Self {
        self.storage_group = Some(group.into());
        self.storage_group_declared = true;
        self
    }

    /// Set the captured and persistent mixin sets.
    pub fn with_mixins(mut self, captured: Vec<TypeName>, persistent: Vec<TypeName>) -> Self {
        self.captured_mixins = captured;
        self.persistent_mixins = persistent;
        self
    }

    /// Add a relation member.
    pub fn with_relation_member(mut self, member: RelationMember) -> Self {
        self.relation_members.push(member);
        self
    }
}

#[derive(Debug, Default)]
struct ClassContents {
    properties: Vec<Arc<PropertyDefinition>>,
    relations: Vec<Arc<RelationDefinition>>,
    derived_classes: Option<Vec<Arc<ClassDefinition>>>,
    storage_entity: Option<StorageEntity>,
}

#[derive(Debug)]
struct FrozenClass {
    contents: ClassContents,
    all_properties: OnceLock<Vec<Arc<PropertyDefinition>>>,
}

/// Mapping metadata of one domain type.
#[derive(Debug)]
pub struct ClassDefinition {
    id: String,
    class_type: TypeName,
    is_abstract: bool,
    is_generic: bool,
    base_class: Option<Weak<ClassDefinition>>,
    storage_group: Option<String>,
    storage_group_declared: bool,
    captured_mixins: Vec<TypeName>,
    persistent_mixins: Vec<TypeName>,
    relation_members: Vec<RelationMember>,
    self_ref: Weak<ClassDefinition>,
    building: Mutex<ClassContents>,
    frozen: OnceLock<FrozenClass>,
}

impl ClassDefinition {
    /// Create a mutable class from its attributes.
    pub fn new(attributes: ClassAttributes) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            id: attributes.id,
            class_type: attributes.class_type,
            is_abstract: attributes.is_abstract,
            is_generic: attributes.is_generic,
            base_class: attributes.base_class.as_ref().map(Arc::downgrade),
            storage_group: attributes.storage_group,
            storage_group_declared: attributes.storage_group_declared,
            captured_mixins: attributes.captured_mixins,
            persistent_mixins: attributes.persistent_mixins,
            relation_members: attributes.relation_members,
            self_ref: self_ref.clone(),
            building: Mutex::new(ClassContents::default()),
            frozen: OnceLock::new(),
        })
    }

    // Read the frozen snapshot if present, otherwise the building contents.
    fn read<R>(&self, f: impl FnOnce(&ClassContents) -> R) -> R {
        if let Some(frozen) = self.frozen.get() {
            return f(&frozen.contents);
        }
        let guard = self.building.lock();
        match self.frozen.get() {
            Some(frozen) => f(&frozen.contents),
            None => f(&guard),
        }
    }

    // Mutate the building contents, failing once frozen.
    fn write<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut ClassContents) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self.building.lock();
        if self.frozen.get().is_some() {
            return Err(self.frozen_error(operation));
        }
        f(&mut guard)
    }

    /// Class identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The mapped type.
    pub fn class_type(&self) -> &TypeName {
        &self.class_type
    }

    /// Whether the class cannot be instantiated.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Whether the class type is an open generic type.
    pub fn is_generic(&self) -> bool {
        self.is_generic
    }

    /// The base class, if any.
    pub fn base_class(&self) -> Option<Arc<ClassDefinition>> {
        self.base_class.as_ref().and_then(Weak::upgrade)
    }

    /// Check if the class has a mapped base class.
    pub fn has_base_class(&self) -> bool {
        self.base_class.is_some()
    }

    /// Ancestors, nearest first.
    pub fn ancestors(&self) -> Vec<Arc<ClassDefinition>> {
        let mut ancestors = Vec::new();
        let mut current = self.base_class();
        while let Some(class) = current {
            current = class.base_class();
            ancestors.push(class);
        }
        ancestors
    }

    /// The root of this class's inheritance hierarchy.
    pub fn inheritance_root(self: &Arc<Self>) -> Arc<ClassDefinition> {
        self.ancestors().pop().unwrap_or_else(|| Arc::clone(self))
    }

    /// Check if `self` is `other` or one of its ancestors.
    pub fn is_same_or_base_class_of(&self, other: &ClassDefinition) -> bool {
        std::ptr::eq(self, other)
            || other
                .ancestors()
                .iter()
                .any(|ancestor| std::ptr::eq(self, Arc::as_ptr(ancestor)))
    }

    /// Effective storage group.
    pub fn storage_group(&self) -> Option<&str> {
        self.storage_group.as_deref()
    }

    /// Whether the storage group is declared on this class itself.
    pub fn has_declared_storage_group(&self) -> bool {
        self.storage_group_declared
    }

    /// Every mixin that was active when the class was built.
    pub fn captured_mixins(&self) -> &[TypeName] {
        &self.captured_mixins
    }

    /// Active mixins contributing persistent members.
    pub fn persistent_mixins(&self) -> &[TypeName] {
        &self.persistent_mixins
    }

    /// Own relation-bearing members.
    pub fn relation_members(&self) -> &[RelationMember] {
        &self.relation_members
    }

    /// Find a relation member by name on this class or its ancestors.
    pub fn find_relation_member(
        &self,
        name: &str,
    ) -> Option<(Arc<ClassDefinition>, RelationMember)> {
        let own = self.self_ref.upgrade().into_iter();
        own.chain(self.ancestors()).find_map(|class| {
            let member = class
                .relation_members
                .iter()
                .find(|m| m.name() == name)
                .cloned();
            member.map(|m| (class, m))
        })
    }

    /// Type that defines a property or virtual relation member named `name`,
    /// searching this class and its ancestors.
    pub fn member_defined_by(&self, name: &str) -> Option<TypeName> {
        let own = self.self_ref.upgrade().into_iter();
        own.chain(self.ancestors()).find_map(|class| {
            if let Some(property) = class.read(|c| {
                c.properties
                    .iter()
                    .find(|p| p.name() == name)
                    .map(|p| p.declaring_type().clone())
            }) {
                return Some(property);
            }
            class
                .relation_members
                .iter()
                .find(|m| m.is_virtual() && m.name() == name)
                .map(|m| m.declaring_type().clone())
        })
    }

    /// Create a property owned by this class.
    pub fn add_property(&self, declaration: &PropertyDeclaration) -> Result<Arc<PropertyDefinition>> {
        if self.is_frozen() {
            return Err(self.frozen_error("add property"));
        }
        if let Some(defined_by) = self.member_defined_by(&declaration.name) {
            return Err(MappingError::DuplicatePropertyName {
                class_id: self.id.clone(),
                property: declaration.name.clone(),
                defined_by: defined_by.to_string(),
            });
        }

        self.write("add property", |contents| {
            let property = Arc::new(PropertyDefinition::new(
                self,
                self.self_ref.clone(),
                declaration,
            ));
            contents.properties.push(property.clone());
            Ok(property)
        })
    }

    /// Own properties in declaration order.
    pub fn properties(&self) -> Vec<Arc<PropertyDefinition>> {
        self.read(|c| c.properties.clone())
    }

    /// Own properties followed by inherited ones, nearest ancestor first.
    ///
    /// Cached once this class and all of its ancestors are frozen.
    pub fn all_properties(&self) -> Vec<Arc<PropertyDefinition>> {
        if let Some(frozen) = self.frozen.get() {
            if let Some(cached) = frozen.all_properties.get() {
                return cached.clone();
            }
            let ancestors = self.ancestors();
            let all = self.collect_all_properties(&ancestors);
            if ancestors.iter().all(|a| a.is_frozen()) {
                let _ = frozen.all_properties.set(all.clone());
            }
            return all;
        }
        self.collect_all_properties(&self.ancestors())
    }

    fn collect_all_properties(
        &self,
        ancestors: &[Arc<ClassDefinition>],
    ) -> Vec<Arc<PropertyDefinition>> {
        let mut all = self.properties();
        for ancestor in ancestors {
            all.extend(ancestor.properties());
        }
        all
    }

    /// Find a property by name on this class or its ancestors.
    pub fn get_property(&self, name: &str) -> Option<Arc<PropertyDefinition>> {
        self.all_properties().into_iter().find(|p| p.name() == name)
    }

    /// Find a property by name, failing if it does not exist.
    pub fn get_mandatory_property(&self, name: &str) -> Result<Arc<PropertyDefinition>> {
        self.get_property(name)
            .ok_or_else(|| MappingError::PropertyNotFound {
                class_id: self.id.clone(),
                property: name.to_string(),
            })
    }

    /// Find a property defined on this class itself.
    pub fn get_own_property(&self, name: &str) -> Option<Arc<PropertyDefinition>> {
        self.read(|c| c.properties.iter().find(|p| p.name() == name).cloned())
    }

    /// Attach a relation this class participates in. Attaching the same
    /// relation twice is a no-op.
    pub fn add_relation(&self, relation: Arc<RelationDefinition>) -> Result<()> {
        self.write("add relation", |contents| {
            if !contents
                .relations
                .iter()
                .any(|r| Arc::ptr_eq(r, &relation))
            {
                contents.relations.push(relation);
            }
            Ok(())
        })
    }

    /// Relations with an end-point on this class.
    pub fn relations(&self) -> Vec<Arc<RelationDefinition>> {
        self.read(|c| c.relations.clone())
    }

    /// Relations of this class and its ancestors.
    pub fn all_relations(&self) -> Vec<Arc<RelationDefinition>> {
        let mut all = self.relations();
        for ancestor in self.ancestors() {
            all.extend(ancestor.relations());
        }
        all
    }

    /// Set the derived classes. Permitted exactly once.
    pub fn set_derived_classes(&self, derived: Vec<Arc<ClassDefinition>>) -> Result<()> {
        self.write("set derived classes", |contents| {
            if contents.derived_classes.is_some() {
                return Err(MappingError::DerivedClassesAlreadySet {
                    class_id: self.id.clone(),
                });
            }
            contents.derived_classes = Some(derived);
            Ok(())
        })
    }

    /// Direct derived classes; empty until set.
    pub fn derived_classes(&self) -> Vec<Arc<ClassDefinition>> {
        self.read(|c| c.derived_classes.clone().unwrap_or_default())
    }

    /// Whether the derived classes have been set.
    pub fn has_derived_classes_set(&self) -> bool {
        self.read(|c| c.derived_classes.is_some())
    }

    /// All transitive derived classes, depth first.
    pub fn descendants(&self) -> Vec<Arc<ClassDefinition>> {
        let mut result = Vec::new();
        for derived in self.derived_classes() {
            let nested = derived.descendants();
            result.push(derived);
            result.extend(nested);
        }
        result
    }

    /// Assign the storage entity.
    pub fn set_storage_entity(&self, entity: StorageEntity) -> Result<()> {
        self.write("set storage entity", |contents| {
            contents.storage_entity = Some(entity);
            Ok(())
        })
    }

    /// The assigned storage entity.
    pub fn storage_entity(&self) -> Option<StorageEntity> {
        self.read(|c| c.storage_entity.clone())
    }

    /// Check if the class is read-only.
    pub fn is_frozen(&self) -> bool {
        self.frozen.get().is_some()
    }

    /// Make the class and its owned properties permanently read-only.
    /// Freezing a frozen class is a no-op.
    pub fn freeze(&self) -> Result<()> {
        let mut guard = self.building.lock();
        if self.frozen.get().is_some() {
            return Ok(());
        }
        if guard.derived_classes.is_none() {
            return Err(MappingError::DerivedClassesNotSet {
                class_id: self.id.clone(),
            });
        }

        let contents = std::mem::take(&mut *guard);
        for property in &contents.properties {
            property.freeze();
        }
        let _ = self.frozen.set(FrozenClass {
            contents,
            all_properties: OnceLock::new(),
        });

        debug!(class_id = %self.id, "class frozen");
        Ok(())
    }

    fn frozen_error(&self, operation: &'static str) -> MappingError {
        MappingError::ClassFrozen {
            class_id: self.id.clone(),
            operation,
        }
    }
}
