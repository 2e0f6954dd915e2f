//! Integration tests for building and validating mapping configurations.

mod common;

use common::{build, build_sales, sales_registry, types};
use ormdb_mapping::{
    ClassDefinition, MappingConfiguration, MappingError, MappingOptions, MixinDefinition,
    NameBasedLoader, PersistenceModelLoader, PropertyDeclaration, PropertyType, RelationEndPoint,
    RelationKind, StaticTypeRegistry, StorageClass, StorageEntity, StorageProperty,
    TypeIntrospector, TypeMembers, TypeName, ValidationPass, ValueType,
};
use ormdb_mapping::validation::PersistenceMappingValidator;
use std::cell::Cell;
use std::sync::Arc;

#[test]
fn test_sales_domain_builds() {
    let configuration = build_sales();

    assert_eq!(configuration.classes().len(), 8);
    assert_eq!(configuration.relations().len(), 4);
    assert_eq!(configuration.inheritance_roots().len(), 6);
    assert!(configuration.classes().iter().all(|class| class.is_frozen()));

    let company = configuration.get_mandatory_class("Company").unwrap();
    assert_eq!(company.storage_entity(), Some(StorageEntity::table("Company")));
    let customer = configuration.get_mandatory_class("Customer").unwrap();
    assert_eq!(customer.storage_group(), Some("crm"));
    assert_eq!(
        customer.storage_entity(),
        Some(StorageEntity::FilterView {
            base_entity: "Company".into(),
            class_ids: vec!["Customer".into()],
        })
    );
}

#[test]
fn test_derived_classes_follow_discovery_order() {
    let registry = sales_registry();
    let configuration = build(
        &registry,
        &[
            "crm::Customer",
            "crm::Partner",
            "crm::Company",
            "sales::Order",
            "sales::Item",
        ],
    )
    .unwrap();

    let company = configuration.get_mandatory_class("Company").unwrap();
    let customer = configuration.get_mandatory_class("Customer").unwrap();
    let partner = configuration.get_mandatory_class("Partner").unwrap();

    let derived: Vec<_> = company
        .derived_classes()
        .iter()
        .map(|class| class.id().to_string())
        .collect();
    assert_eq!(derived, vec!["Customer", "Partner"]);
    assert!(Arc::ptr_eq(&customer.base_class().unwrap(), &company));
    assert!(Arc::ptr_eq(&partner.base_class().unwrap(), &company));
    assert!(customer.derived_classes().is_empty());
    assert!(customer.has_derived_classes_set());
}

#[test]
fn test_requesting_derived_type_maps_its_bases() {
    let registry = sales_registry();
    let configuration = build(&registry, &["crm::Partner"]).unwrap();

    assert_eq!(configuration.classes().len(), 2);
    assert!(configuration
        .get_class_by_type(&TypeName::new("crm::Company"))
        .is_some());
    assert!(matches!(
        configuration.get_mandatory_class_by_type(&TypeName::new("crm::Customer")),
        Err(MappingError::TypeNotMapped { .. })
    ));
}

#[test]
fn test_mixin_members_reach_derived_classes_through_base() {
    let configuration = build_sales();

    let company = configuration.get_mandatory_class("Company").unwrap();
    let created_by = company.get_own_property("created_by").unwrap();
    assert_eq!(created_by.declaring_type(), &TypeName::new("audit::Audited"));
    assert_eq!(created_by.identifier(), "audit::Audited.created_by");
    assert_eq!(company.persistent_mixins(), [TypeName::new("audit::Audited")]);

    let customer = configuration.get_mandatory_class("Customer").unwrap();
    assert!(customer.get_own_property("created_by").is_none());
    let inherited = customer.get_property("created_by").unwrap();
    assert!(Arc::ptr_eq(&inherited, &created_by));
    assert_eq!(customer.captured_mixins(), [TypeName::new("audit::Audited")]);
}

#[test]
fn test_reference_without_opposite_is_unidirectional() {
    let configuration = build_sales();

    let relation = configuration
        .get_mandatory_relation("sales::OrderTicket.order")
        .unwrap();
    assert_eq!(relation.kind(), RelationKind::Unidirectional);
    assert!(!relation.is_bidirectional());

    let [first, second] = relation.end_points();
    assert!(first.is_real());
    assert_eq!(first.class_id(), "OrderTicket");
    assert_eq!(first.property_name(), Some("order"));
    assert!(second.is_anonymous());
    assert_eq!(second.class_id(), "Order");
    assert!(second.property_name().is_none());

    let ticket = configuration.get_mandatory_class("OrderTicket").unwrap();
    assert!(ticket
        .relations()
        .iter()
        .any(|r| Arc::ptr_eq(r, &relation)));
    let order = configuration.get_mandatory_class("Order").unwrap();
    assert!(!order.relations().iter().any(|r| Arc::ptr_eq(r, &relation)));
}

#[test]
fn test_relation_is_shared_by_both_classes() {
    let configuration = build_sales();

    let order = configuration.get_mandatory_class("Order").unwrap();
    let item = configuration.get_mandatory_class("Item").unwrap();
    let from_order = order
        .relations()
        .into_iter()
        .find(|r| r.id() == "sales::Item.order->sales::Order.items")
        .unwrap();
    let from_item = item
        .relations()
        .into_iter()
        .find(|r| r.id() == "sales::Item.order->sales::Order.items")
        .unwrap();

    assert!(Arc::ptr_eq(&from_order, &from_item));
    assert_eq!(from_order.kind(), RelationKind::OneToMany);

    let [real, virtual_end_point] = from_order.end_points();
    assert_eq!(real.class_id(), "Item");
    assert!(virtual_end_point.is_virtual());
    assert_eq!(virtual_end_point.sort_expression(), Some("position"));
}

#[test]
fn test_relation_identity_does_not_depend_on_request_order() {
    let registry = sales_registry();
    let forward = build(&registry, &["sales::Order", "sales::Item", "crm::Customer"]).unwrap();
    let backward = build(&registry, &["crm::Customer", "sales::Item", "sales::Order"]).unwrap();

    let mut forward_ids: Vec<_> = forward.relations().iter().map(|r| r.id().to_string()).collect();
    let mut backward_ids: Vec<_> = backward.relations().iter().map(|r| r.id().to_string()).collect();
    forward_ids.sort();
    backward_ids.sort();
    assert_eq!(
        forward_ids,
        vec![
            "sales::Item.order->sales::Order.items",
            "sales::Order.customer->crm::Customer.orders",
        ]
    );
    assert_eq!(forward_ids, backward_ids);
}

#[test]
fn test_one_to_one_foreign_key_side_comes_first() {
    let configuration = build_sales();

    let relation = configuration
        .get_mandatory_relation("hr::Computer.employee->hr::Employee.computer")
        .unwrap();
    assert_eq!(relation.kind(), RelationKind::OneToOne);

    let [real, other] = relation.end_points();
    assert_eq!(real.class_id(), "Computer");
    assert!(other.is_virtual());

    let employee = configuration.get_mandatory_class("Employee").unwrap();
    assert!(employee.get_own_property("computer").is_none());
    let computer = configuration.get_mandatory_class("Computer").unwrap();
    let employee_ref = computer.get_own_property("employee").unwrap();
    assert_eq!(
        employee_ref.storage_property(),
        Some(StorageProperty::new("employee_id", true))
    );
}

#[test]
fn test_duplicate_class_id_names_both_types() {
    let registry = sales_registry().with_type(TypeMembers::new("legacy::Customer"));

    let err = build(&registry, &["crm::Customer", "legacy::Customer"]).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("'Customer'"));
    assert!(message.contains("crm::Customer"));
    assert!(message.contains("legacy::Customer"));
    assert!(matches!(err, MappingError::DuplicateClassId { .. }));
}

#[test]
fn test_unknown_requested_type() {
    let registry = sales_registry();
    assert!(matches!(
        build(&registry, &["sales::Invoice"]),
        Err(MappingError::UnknownType { .. })
    ));
}

#[test]
fn test_relation_to_unrequested_type_is_rejected() {
    let registry = sales_registry();
    let err = build(&registry, &["sales::OrderTicket"]).unwrap_err();
    assert!(matches!(err, MappingError::RelationTargetNotMapped { .. }));
}

#[test]
fn test_lookups_return_the_same_instances() {
    let configuration = build_sales();

    for class in configuration.classes() {
        let by_id = configuration.get_class(class.id()).unwrap();
        let by_type = configuration.get_class_by_type(class.class_type()).unwrap();
        assert!(Arc::ptr_eq(&by_id, class));
        assert!(Arc::ptr_eq(&by_type, class));
        assert!(configuration.contains_class(class));

        for property in class.properties() {
            let found = configuration
                .get_property(class.id(), property.name())
                .unwrap();
            assert!(Arc::ptr_eq(&found, &property));
            assert!(configuration.contains_property(&property));
        }
    }

    for relation in configuration.relations() {
        let found = configuration.get_relation(relation.id()).unwrap();
        assert!(Arc::ptr_eq(&found, relation));
        assert!(configuration.contains_relation(relation));
        for end_point in relation.end_points() {
            assert!(configuration.contains_end_point(end_point));
        }
    }

    assert!(matches!(
        configuration.get_mandatory_class("Invoice"),
        Err(MappingError::ClassNotFound { .. })
    ));
    assert!(matches!(
        configuration.get_mandatory_relation("sales::Invoice.order"),
        Err(MappingError::RelationNotFound { .. })
    ));
    assert!(matches!(
        configuration.get_mandatory_property("Order", "total"),
        Err(MappingError::PropertyNotFound { .. })
    ));
}

#[test]
fn test_lookalike_objects_are_not_contained() {
    let configuration = build_sales();
    let other = build_sales();

    let order = other.get_mandatory_class("Order").unwrap();
    let number = other.get_mandatory_property("Order", "number").unwrap();
    let relation = other
        .get_mandatory_relation("sales::Item.order->sales::Order.items")
        .unwrap();

    assert!(!configuration.contains_class(&order));
    assert!(!configuration.contains_property(&number));
    assert!(!configuration.contains_relation(&relation));
    assert!(!configuration.contains_end_point(&relation.end_points()[0]));

    let detached = ClassDefinition::new(ormdb_mapping::model::ClassAttributes::new(
        "Order",
        "sales::Order",
    ));
    assert!(!configuration.contains_class(&detached));
    let detached_end_point = RelationEndPoint::anonymous(&detached);
    assert!(!configuration.contains_end_point(&detached_end_point));
}

#[test]
fn test_built_classes_reject_mutation() {
    let configuration = build_sales();
    let order = configuration.get_mandatory_class("Order").unwrap();
    let ticket = configuration.get_mandatory_class("OrderTicket").unwrap();

    assert!(matches!(
        order.add_property(&PropertyDeclaration::new(
            "total",
            PropertyType::value(ValueType::Decimal),
        )),
        Err(MappingError::ClassFrozen { .. })
    ));
    let relation = ticket.relations()[0].clone();
    assert!(matches!(
        order.add_relation(relation),
        Err(MappingError::ClassFrozen { .. })
    ));
    assert!(matches!(
        order.set_derived_classes(vec![ticket.clone()]),
        Err(MappingError::ClassFrozen { .. })
    ));
    assert!(matches!(
        order.set_storage_entity(StorageEntity::Null),
        Err(MappingError::ClassFrozen { .. })
    ));

    let number = order.get_own_property("number").unwrap();
    assert!(number.is_frozen());
    assert!(matches!(
        number.set_storage_property(StorageProperty::new("nr", true)),
        Err(MappingError::PropertyFrozen { .. })
    ));

    // freezing again changes nothing
    order.freeze().unwrap();
    assert_eq!(order.storage_entity(), Some(StorageEntity::table("Order")));
    assert_eq!(
        number.storage_property(),
        Some(StorageProperty::new("number", false))
    );
}

#[test]
fn test_mixin_drift_after_build() {
    let mut registry = sales_registry();
    let configuration = build(&registry, &["crm::Partner"]).unwrap();
    configuration
        .validate_current_mixin_configuration(&registry)
        .unwrap();

    registry.apply_mixin(&TypeName::new("crm::Partner"), "diag::Tracing");
    let err = configuration
        .validate_current_mixin_configuration(&registry)
        .unwrap_err();
    match err {
        MappingError::MixinConfigurationDrift {
            class_id,
            captured,
            current,
        } => {
            assert_eq!(class_id, "Partner");
            assert_eq!(captured, vec!["audit::Audited"]);
            assert_eq!(current, vec!["audit::Audited", "diag::Tracing"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    registry.remove_mixin(&TypeName::new("crm::Partner"), &TypeName::new("diag::Tracing"));
    registry.remove_mixin(&TypeName::new("crm::Company"), &TypeName::new("audit::Audited"));
    assert!(matches!(
        configuration.validate_current_mixin_configuration(&registry),
        Err(MappingError::MixinConfigurationDrift { .. })
    ));
}

/// Reports one more mixin for a type on every call after the first.
struct DriftingIntrospector {
    registry: StaticTypeRegistry,
    drifting_type: TypeName,
    calls: Cell<usize>,
}

impl TypeIntrospector for DriftingIntrospector {
    fn members(&self, type_name: &TypeName) -> Option<TypeMembers> {
        self.registry.members(type_name)
    }

    fn active_mixins(&self, type_name: &TypeName) -> Vec<MixinDefinition> {
        let mut mixins = self.registry.active_mixins(type_name);
        if type_name == &self.drifting_type {
            let calls = self.calls.get();
            self.calls.set(calls + 1);
            if calls > 0 {
                mixins.push(MixinDefinition::non_persistent("diag::Tracing"));
            }
        }
        mixins
    }
}

#[test]
fn test_mixin_drift_during_build() {
    let introspector = DriftingIntrospector {
        registry: sales_registry(),
        drifting_type: TypeName::new("crm::Partner"),
        calls: Cell::new(0),
    };
    let requested = types(&["crm::Partner"]);

    let err = MappingConfiguration::build(
        &introspector,
        &requested,
        &NameBasedLoader::new(),
        MappingOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, MappingError::MixinConfigurationDrift { .. }));

    introspector.calls.set(0);
    MappingConfiguration::build(
        &introspector,
        &requested,
        &NameBasedLoader::new(),
        MappingOptions::default().without_mixin_drift_check(),
    )
    .unwrap();
}

/// A loader that forgets part of its job.
struct ForgetfulLoader {
    assign_columns: bool,
}

impl PersistenceModelLoader for ForgetfulLoader {
    fn apply_to_hierarchy(&self, root: &Arc<ClassDefinition>) -> ormdb_mapping::Result<()> {
        let mut hierarchy = vec![root.clone()];
        hierarchy.extend(root.descendants());
        for class in &hierarchy {
            class.set_storage_entity(StorageEntity::table(class.id()))?;
            if !self.assign_columns {
                continue;
            }
            for property in class.properties() {
                property.set_storage_property(StorageProperty::new(property.name(), true))?;
            }
        }
        Ok(())
    }

    fn create_validator(&self, _root: &ClassDefinition) -> PersistenceMappingValidator {
        PersistenceMappingValidator::with_default_rules()
    }
}

/// A loader that assigns nothing at all.
struct NoopLoader;

impl PersistenceModelLoader for NoopLoader {
    fn apply_to_hierarchy(&self, _root: &Arc<ClassDefinition>) -> ormdb_mapping::Result<()> {
        Ok(())
    }

    fn create_validator(&self, _root: &ClassDefinition) -> PersistenceMappingValidator {
        PersistenceMappingValidator::with_default_rules()
    }
}

#[test]
fn test_loader_defects_are_reported() {
    let registry = sales_registry();
    let requested = types(&["sales::Order", "sales::Item", "crm::Customer"]);

    let err = MappingConfiguration::build(
        &registry,
        &requested,
        &NoopLoader,
        MappingOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, MappingError::MissingStorageEntity { .. }));
    assert!(err.to_string().starts_with("internal error"));

    let err = MappingConfiguration::build(
        &registry,
        &requested,
        &ForgetfulLoader {
            assign_columns: false,
        },
        MappingOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, MappingError::MissingStorageProperty { .. }));

    // a table per class is a valid, if unusual, layout
    let configuration = MappingConfiguration::build(
        &registry,
        &requested,
        &ForgetfulLoader {
            assign_columns: true,
        },
        MappingOptions::default(),
    )
    .unwrap();
    let customer = configuration.get_mandatory_class("Customer").unwrap();
    assert_eq!(customer.storage_entity(), Some(StorageEntity::table("Customer")));
}

/// Stores every class nowhere.
struct NullLoader;

impl PersistenceModelLoader for NullLoader {
    fn apply_to_hierarchy(&self, root: &Arc<ClassDefinition>) -> ormdb_mapping::Result<()> {
        NameBasedLoader::new().apply_to_hierarchy(root)?;
        root.set_storage_entity(StorageEntity::Null)?;
        for class in root.descendants() {
            class.set_storage_entity(StorageEntity::Null)?;
        }
        Ok(())
    }

    fn create_validator(&self, _root: &ClassDefinition) -> PersistenceMappingValidator {
        PersistenceMappingValidator::with_default_rules()
    }
}

#[test]
fn test_persistence_pass_reports_every_class_of_a_hierarchy() {
    let registry = sales_registry();
    let err = MappingConfiguration::build(
        &registry,
        &types(&["crm::Customer", "crm::Partner", "sales::Order", "sales::Item"]),
        &NullLoader,
        MappingOptions::default(),
    )
    .unwrap_err();

    match err {
        MappingError::Validation(failure) => {
            assert_eq!(failure.pass, ValidationPass::Persistence);
            let classes: Vec<_> = failure
                .violations
                .iter()
                .map(|v| v.class_id.as_str())
                .collect();
            assert_eq!(classes, vec!["Company", "Customer", "Partner"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn invalid_registry() -> StaticTypeRegistry {
    StaticTypeRegistry::new()
        .with_type(
            TypeMembers::new("sales::Order")
                .with_property(
                    PropertyDeclaration::new("number", PropertyType::value(ValueType::Int32))
                        .with_max_length(10),
                )
                .with_property(
                    PropertyDeclaration::new("paid", PropertyType::value(ValueType::Bool))
                        .with_nullable(true),
                ),
        )
        .with_type(
            TypeMembers::new("sales::Draft")
                .with_property(
                    PropertyDeclaration::new("notes", PropertyType::value(ValueType::String))
                        .with_storage_class(StorageClass::Transaction),
                ),
        )
}

#[test]
fn test_property_pass_collects_all_violations() {
    let registry = invalid_registry();
    let err = build(&registry, &["sales::Order", "sales::Draft"]).unwrap_err();

    let MappingError::Validation(failure) = err else {
        panic!("expected a validation failure");
    };
    assert_eq!(failure.pass, ValidationPass::Property);
    let rules: Vec<_> = failure.violations.iter().map(|v| v.rule).collect();
    assert_eq!(rules.len(), 2);
    assert!(rules.contains(&"MaxLengthIsSupportedRule"));
    assert!(rules.contains(&"NullabilityIsSupportedRule"));

    let message = failure.to_string();
    assert!(message.contains("2 violation"));
    assert!(message.contains("property 'number'"));
    assert!(message.contains("property 'paid'"));
}

#[test]
fn test_supported_storage_classes_come_from_options() {
    let registry = invalid_registry();
    let options = MappingOptions::default()
        .with_supported_storage_classes(vec![StorageClass::Persistent]);

    let err = MappingConfiguration::build(
        &registry,
        &types(&["sales::Draft"]),
        &NameBasedLoader::new(),
        options,
    )
    .unwrap_err();
    let MappingError::Validation(failure) = err else {
        panic!("expected a validation failure");
    };
    assert_eq!(failure.violations.len(), 1);
    assert_eq!(failure.violations[0].rule, "StorageClassIsSupportedRule");

    // transaction properties are accepted by default and get no column
    let configuration = build(&registry, &["sales::Draft"]).unwrap();
    let notes = configuration.get_mandatory_property("Draft", "notes").unwrap();
    assert!(notes.storage_property().is_none());
}

#[test]
fn test_class_pass_failure_skips_later_passes() {
    let registry = invalid_registry().with_type(
        TypeMembers::new("core::Wrapper")
            .with_generic()
            .with_property(
                PropertyDeclaration::new("count", PropertyType::value(ValueType::Int64))
                    .with_nullable(true),
            ),
    );

    let err = build(&registry, &["sales::Order", "core::Wrapper"]).unwrap_err();
    let MappingError::Validation(failure) = err else {
        panic!("expected a validation failure");
    };
    assert_eq!(failure.pass, ValidationPass::Class);
    assert_eq!(failure.violations.len(), 1);
    assert_eq!(failure.violations[0].class_id, "Wrapper");
}

#[test]
fn test_many_to_many_is_rejected() {
    let registry = StaticTypeRegistry::new()
        .with_type(
            TypeMembers::new("school::Student").with_property(
                PropertyDeclaration::new("courses", PropertyType::collection("school::Course"))
                    .with_opposite("students"),
            ),
        )
        .with_type(
            TypeMembers::new("school::Course").with_property(
                PropertyDeclaration::new("students", PropertyType::collection("school::Student"))
                    .with_opposite("courses"),
            ),
        );

    let err = build(&registry, &["school::Student", "school::Course"]).unwrap_err();
    let MappingError::Validation(failure) = err else {
        panic!("expected a validation failure");
    };
    assert_eq!(failure.pass, ValidationPass::Relation);
    assert_eq!(failure.violations.len(), 1);
    assert!(failure.violations[0].message.contains("many-to-many"));
    assert!(failure.violations[0]
        .message
        .contains("school::Course.students->school::Student.courses"));
}

#[test]
fn test_invalid_sort_expression_is_rejected() {
    let registry = StaticTypeRegistry::new()
        .with_type(
            TypeMembers::new("sales::Order").with_property(
                PropertyDeclaration::new("items", PropertyType::collection("sales::Item"))
                    .with_opposite("order")
                    .with_sort_expression("weight asc"),
            ),
        )
        .with_type(
            TypeMembers::new("sales::Item").with_property(
                PropertyDeclaration::new("order", PropertyType::reference("sales::Order"))
                    .with_opposite("items"),
            ),
        );

    let err = build(&registry, &["sales::Order", "sales::Item"]).unwrap_err();
    let MappingError::Validation(failure) = err else {
        panic!("expected a validation failure");
    };
    assert_eq!(failure.pass, ValidationPass::Relation);
    assert_eq!(failure.violations.len(), 1);
    assert_eq!(failure.violations[0].rule, "SortExpressionIsValidRule");
    assert_eq!(failure.violations[0].property.as_deref(), Some("items"));
}
