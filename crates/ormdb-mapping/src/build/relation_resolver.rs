//! Relation resolution.
//!
//! Pairs the relation members captured by the builder into relation
//! definitions. A relation is usually discovered twice, once from each side;
//! both discoveries yield the same [`RelationDefinition`] instance.

use crate::error::{MappingError, Result};
use crate::model::{
    end_point_identifier, relation_id, ClassDefinition, RelationDefinition, RelationEndPoint,
    RelationMember, TypeName,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

// A relation member together with the class that owns it.
struct Side {
    class: Arc<ClassDefinition>,
    member: RelationMember,
}

impl Side {
    fn identifier(&self) -> String {
        end_point_identifier(
            self.class.class_type(),
            self.member.declaring_type(),
            self.member.name(),
        )
    }

    fn end_point(&self) -> Result<RelationEndPoint> {
        if self.member.is_virtual() {
            let declaration = self.member.declaration();
            return Ok(RelationEndPoint::virtual_end_point(
                &self.class,
                self.member.name(),
                self.member.declaring_type().clone(),
                declaration.property_type.clone(),
                declaration.sort_expression.clone(),
                declaration.mandatory,
            ));
        }
        let property = self
            .class
            .get_own_property(self.member.name())
            .ok_or_else(|| MappingError::PropertyNotFound {
                class_id: self.class.id().to_string(),
                property: self.member.name().to_string(),
            })?;
        Ok(RelationEndPoint::real(property))
    }

    fn sort_key(&self) -> (&str, &str) {
        (self.class.id(), self.member.name())
    }
}

/// Resolves relation members into de-duplicated relation definitions.
pub struct RelationResolver<'a> {
    classes: &'a [Arc<ClassDefinition>],
    by_type: HashMap<TypeName, Arc<ClassDefinition>>,
    by_id: HashMap<String, Arc<RelationDefinition>>,
    relations: Vec<Arc<RelationDefinition>>,
}

impl<'a> RelationResolver<'a> {
    /// Create a resolver over a complete set of classes.
    pub fn new(classes: &'a [Arc<ClassDefinition>]) -> Self {
        let by_type = classes
            .iter()
            .map(|class| (class.class_type().clone(), class.clone()))
            .collect();
        Self {
            classes,
            by_type,
            by_id: HashMap::new(),
            relations: Vec::new(),
        }
    }

    /// Resolve every relation member of every class.
    ///
    /// Relations are returned in discovery order and attached to the class
    /// of each named end-point.
    pub fn resolve(mut self) -> Result<Vec<Arc<RelationDefinition>>> {
        for class in self.classes {
            for member in class.relation_members() {
                let side = Side {
                    class: class.clone(),
                    member: member.clone(),
                };
                self.resolve_member(side)?;
            }
        }
        Ok(self.relations)
    }

    fn resolve_member(&mut self, side: Side) -> Result<Arc<RelationDefinition>> {
        let member = &side.member;
        let target_class = self.by_type.get(member.target()).cloned().ok_or_else(|| {
            MappingError::RelationTargetNotMapped {
                property: side.identifier(),
                target: member.target().to_string(),
            }
        })?;

        let Some(opposite_name) = member.opposite() else {
            return self.resolve_unidirectional(side, &target_class);
        };

        let (opposite_class, opposite_member) = target_class
            .find_relation_member(opposite_name)
            .ok_or_else(|| MappingError::OppositePropertyNotFound {
                property: side.identifier(),
                opposite_type: member.target().to_string(),
                opposite_property: opposite_name.to_string(),
            })?;
        let opposite = Side {
            class: opposite_class,
            member: opposite_member,
        };

        if opposite.member.opposite() != Some(member.name()) {
            return Err(MappingError::MalformedRelation {
                property: side.identifier(),
                reason: format!(
                    "opposite property '{}' does not point back to it",
                    opposite.identifier()
                ),
            });
        }

        let points_back = self
            .by_type
            .get(opposite.member.target())
            .is_some_and(|target| target.is_same_or_base_class_of(&side.class));
        if !points_back {
            return Err(MappingError::OppositeDeclaringTypeMismatch {
                property: side.identifier(),
                opposite_property: opposite.identifier(),
                expected: side.class.class_type().to_string(),
                actual: opposite.member.target().to_string(),
            });
        }

        let (first, second) = Self::order(side, opposite);
        let id = relation_id(&first.identifier(), Some(&second.identifier()));
        if let Some(existing) = self.by_id.get(&id) {
            debug!(relation_id = %id, "relation reused");
            return Ok(existing.clone());
        }

        let relation = Arc::new(RelationDefinition::new(
            first.end_point()?,
            second.end_point()?,
        ));
        first.class.add_relation(relation.clone())?;
        if !Arc::ptr_eq(&first.class, &second.class) {
            second.class.add_relation(relation.clone())?;
        }
        Ok(self.register(relation))
    }

    fn resolve_unidirectional(
        &mut self,
        side: Side,
        target_class: &Arc<ClassDefinition>,
    ) -> Result<Arc<RelationDefinition>> {
        if side.member.declaration().property_type.is_collection() {
            return Err(MappingError::MalformedRelation {
                property: side.identifier(),
                reason: "a collection must name its opposite property".to_string(),
            });
        }

        let id = relation_id(&side.identifier(), None);
        if let Some(existing) = self.by_id.get(&id) {
            return Ok(existing.clone());
        }

        let relation = Arc::new(RelationDefinition::new(
            side.end_point()?,
            RelationEndPoint::anonymous(target_class),
        ));
        side.class.add_relation(relation.clone())?;
        Ok(self.register(relation))
    }

    // The real side comes first. Two sides of the same variant are ordered
    // by class id, then property name.
    fn order(a: Side, b: Side) -> (Side, Side) {
        match (a.member.is_virtual(), b.member.is_virtual()) {
            (false, true) => (a, b),
            (true, false) => (b, a),
            _ if b.sort_key() < a.sort_key() => (b, a),
            _ => (a, b),
        }
    }

    fn register(&mut self, relation: Arc<RelationDefinition>) -> Arc<RelationDefinition> {
        debug!(relation_id = %relation.id(), kind = %relation.kind(), "relation created");
        self.by_id
            .insert(relation.id().to_string(), relation.clone());
        self.relations.push(relation.clone());
        relation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::ClassDefinitionBuilder;
    use crate::introspect::{MixinDefinition, PropertyDeclaration, StaticTypeRegistry, TypeMembers};
    use crate::model::{PropertyType, RelationKind};

    fn order_registry() -> StaticTypeRegistry {
        StaticTypeRegistry::new()
            .with_type(
                TypeMembers::new("sales::Order").with_property(
                    PropertyDeclaration::new("items", PropertyType::collection("sales::Item"))
                        .with_opposite("order"),
                ),
            )
            .with_type(
                TypeMembers::new("sales::Item").with_property(
                    PropertyDeclaration::new("order", PropertyType::reference("sales::Order"))
                        .with_opposite("items"),
                ),
            )
            .with_type(
                TypeMembers::new("sales::OrderTicket").with_property(
                    PropertyDeclaration::new("order", PropertyType::reference("sales::Order"))
                        .with_mandatory(),
                ),
            )
    }

    fn resolve(
        registry: &StaticTypeRegistry,
        types: &[&str],
    ) -> Result<(Vec<Arc<ClassDefinition>>, Vec<Arc<RelationDefinition>>)> {
        let types: Vec<TypeName> = types.iter().map(|t| TypeName::new(*t)).collect();
        let classes = ClassDefinitionBuilder::new(registry).build(&types)?;
        let relations = RelationResolver::new(&classes).resolve()?;
        Ok((classes, relations))
    }

    #[test]
    fn test_relation_found_from_both_sides_is_shared() {
        let registry = order_registry();
        let (classes, relations) = resolve(&registry, &["sales::Order", "sales::Item"]).unwrap();

        assert_eq!(relations.len(), 1);
        let relation = &relations[0];
        assert_eq!(relation.id(), "sales::Item.order->sales::Order.items");
        assert_eq!(relation.kind(), RelationKind::OneToMany);
        assert!(relation.end_points()[0].is_real());
        assert!(relation.end_points()[1].is_virtual());

        for class in &classes {
            assert_eq!(class.relations().len(), 1);
            assert!(Arc::ptr_eq(&class.relations()[0], relation));
        }
    }

    #[test]
    fn test_resolution_order_does_not_change_identity() {
        let registry = order_registry();
        let (_, from_order) = resolve(&registry, &["sales::Order", "sales::Item"]).unwrap();
        let (_, from_item) = resolve(&registry, &["sales::Item", "sales::Order"]).unwrap();

        assert_eq!(from_order[0].id(), from_item[0].id());
    }

    #[test]
    fn test_reference_without_opposite_is_unidirectional() {
        let registry = order_registry();
        let (classes, relations) =
            resolve(&registry, &["sales::Order", "sales::Item", "sales::OrderTicket"]).unwrap();

        let relation = relations
            .iter()
            .find(|r| r.kind() == RelationKind::Unidirectional)
            .unwrap();
        assert_eq!(relation.id(), "sales::OrderTicket.order");
        assert_eq!(relation.end_points()[0].class_id(), "OrderTicket");
        assert!(relation.end_points()[0].is_mandatory());
        assert!(relation.end_points()[1].is_anonymous());
        assert_eq!(relation.end_points()[1].class_id(), "Order");

        // The anonymous side is not attached to the target class.
        let order = classes.iter().find(|c| c.id() == "Order").unwrap();
        assert!(order.relations().iter().all(|r| !Arc::ptr_eq(r, relation)));
    }

    #[test]
    fn test_collection_without_opposite_is_malformed() {
        let registry = StaticTypeRegistry::new()
            .with_type(TypeMembers::new("sales::Order").with_property(PropertyDeclaration::new(
                "items",
                PropertyType::collection("sales::Item"),
            )))
            .with_type(TypeMembers::new("sales::Item"));

        let err = resolve(&registry, &["sales::Order", "sales::Item"]).unwrap_err();
        assert!(matches!(err, MappingError::MalformedRelation { .. }));
    }

    #[test]
    fn test_unmapped_target() {
        let registry = StaticTypeRegistry::new()
            .with_type(TypeMembers::new("sales::OrderTicket").with_property(
                PropertyDeclaration::new("order", PropertyType::reference("sales::Order")),
            ))
            .with_type(TypeMembers::new("sales::Order"));

        let err = resolve(&registry, &["sales::OrderTicket"]).unwrap_err();
        match err {
            MappingError::RelationTargetNotMapped { property, target } => {
                assert_eq!(property, "sales::OrderTicket.order");
                assert_eq!(target, "sales::Order");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_opposite_names_both_properties() {
        let registry = StaticTypeRegistry::new()
            .with_type(TypeMembers::new("sales::Order"))
            .with_type(TypeMembers::new("sales::Item").with_property(
                PropertyDeclaration::new("order", PropertyType::reference("sales::Order"))
                    .with_opposite("items"),
            ));

        let err = resolve(&registry, &["sales::Order", "sales::Item"]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("sales::Item.order"));
        assert!(message.contains("items"));
        assert!(matches!(err, MappingError::OppositePropertyNotFound { .. }));
    }

    #[test]
    fn test_opposite_not_pointing_back_is_malformed() {
        let registry = StaticTypeRegistry::new()
            .with_type(
                TypeMembers::new("sales::Order")
                    .with_property(
                        PropertyDeclaration::new("items", PropertyType::collection("sales::Item"))
                            .with_opposite("parent"),
                    ),
            )
            .with_type(
                TypeMembers::new("sales::Item")
                    .with_property(
                        PropertyDeclaration::new("order", PropertyType::reference("sales::Order"))
                            .with_opposite("items"),
                    )
                    .with_property(
                        PropertyDeclaration::new("parent", PropertyType::reference("sales::Order"))
                            .with_opposite("lines"),
                    ),
            );

        let err = resolve(&registry, &["sales::Order", "sales::Item"]).unwrap_err();
        assert!(matches!(err, MappingError::MalformedRelation { .. }));
    }

    #[test]
    fn test_opposite_targeting_another_type_is_rejected() {
        let registry = StaticTypeRegistry::new()
            .with_type(TypeMembers::new("sales::Order").with_property(
                PropertyDeclaration::new("items", PropertyType::collection("sales::Item"))
                    .with_opposite("order"),
            ))
            .with_type(TypeMembers::new("sales::Invoice"))
            .with_type(TypeMembers::new("sales::Item").with_property(
                PropertyDeclaration::new("order", PropertyType::reference("sales::Invoice"))
                    .with_opposite("items"),
            ));

        let err = resolve(&registry, &["sales::Order", "sales::Invoice", "sales::Item"])
            .unwrap_err();
        match err {
            MappingError::OppositeDeclaringTypeMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, "sales::Order");
                assert_eq!(actual, "sales::Invoice");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_opposite_expecting_derived_class_is_rejected() {
        let registry = StaticTypeRegistry::new()
            .with_type(TypeMembers::new("crm::Customer").with_property(
                PropertyDeclaration::new("orders", PropertyType::collection("sales::Order"))
                    .with_opposite("customer"),
            ))
            .with_type(TypeMembers::new("crm::SpecialCustomer").with_base("crm::Customer"))
            .with_type(
                TypeMembers::new("sales::Order").with_property(
                    PropertyDeclaration::new(
                        "customer",
                        PropertyType::reference("crm::SpecialCustomer"),
                    )
                    .with_opposite("orders"),
                ),
            );

        // Customer.orders is inherited by SpecialCustomer, but its opposite
        // only accepts the derived class.
        let err = resolve(&registry, &["crm::SpecialCustomer", "sales::Order"]).unwrap_err();
        match err {
            MappingError::OppositeDeclaringTypeMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, "crm::Customer");
                assert_eq!(actual, "crm::SpecialCustomer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mixin_relation_members_resolve() {
        let mut registry = StaticTypeRegistry::new()
            .with_type(TypeMembers::new("crm::User"))
            .with_type(TypeMembers::new("crm::Company"))
            .with_type(TypeMembers::new("sales::Product"))
            .with_mixin(MixinDefinition::new("audit::Audited").with_property(
                PropertyDeclaration::new("created_by", PropertyType::reference("crm::User")),
            ));
        registry.apply_mixin(&TypeName::new("crm::Company"), "audit::Audited");
        registry.apply_mixin(&TypeName::new("sales::Product"), "audit::Audited");

        let (_, relations) =
            resolve(&registry, &["crm::User", "crm::Company", "sales::Product"]).unwrap();

        let ids: Vec<&str> = relations.iter().map(|r| r.id()).collect();
        assert_eq!(
            ids,
            vec![
                "crm::Company:audit::Audited.created_by",
                "sales::Product:audit::Audited.created_by",
            ]
        );
    }
}
