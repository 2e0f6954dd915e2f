//! Shared fixtures for the mapping integration tests.

#![allow(dead_code)]

use ormdb_mapping::{
    MappingConfiguration, MappingOptions, MixinDefinition, NameBasedLoader, PropertyDeclaration,
    PropertyType, Result, StaticTypeRegistry, TypeMembers, TypeName, ValueType,
};

/// Type names as requested by a caller.
pub fn types(names: &[&str]) -> Vec<TypeName> {
    names.iter().map(|name| TypeName::new(*name)).collect()
}

/// A small CRM and sales domain.
///
/// - `crm::Company` (root, concrete) with `crm::Customer` and `crm::Partner`
///   below it, carrying the persistent `audit::Audited` mixin
/// - `sales::Order` <-> `sales::Item` (one-to-many, sorted)
/// - `sales::Order` -> `crm::Customer` (one-to-many)
/// - `sales::OrderTicket` -> `sales::Order` (unidirectional)
/// - `hr::Employee` <-> `hr::Computer` (one-to-one, key on the computer)
pub fn sales_registry() -> StaticTypeRegistry {
    StaticTypeRegistry::new()
        .with_mixin(MixinDefinition::new("audit::Audited").with_property(
            PropertyDeclaration::new("created_by", PropertyType::value(ValueType::String))
                .with_max_length(64),
        ))
        .with_type(
            TypeMembers::new("crm::Company")
                .with_storage_group("crm")
                .with_mixin("audit::Audited")
                .with_property(
                    PropertyDeclaration::new("name", PropertyType::value(ValueType::String))
                        .with_nullable(false)
                        .with_max_length(100),
                ),
        )
        .with_type(
            TypeMembers::new("crm::Customer")
                .with_base("crm::Company")
                .with_property(PropertyDeclaration::new(
                    "customer_since",
                    PropertyType::value(ValueType::DateTime),
                ))
                .with_property(
                    PropertyDeclaration::new("orders", PropertyType::collection("sales::Order"))
                        .with_opposite("customer")
                        .with_sort_expression("number desc"),
                ),
        )
        .with_type(
            TypeMembers::new("crm::Partner")
                .with_base("crm::Company")
                .with_property(PropertyDeclaration::new(
                    "contact",
                    PropertyType::value(ValueType::String),
                )),
        )
        .with_type(
            TypeMembers::new("sales::Order")
                .with_property(PropertyDeclaration::new(
                    "number",
                    PropertyType::value(ValueType::Int32),
                ))
                .with_property(
                    PropertyDeclaration::new("customer", PropertyType::reference("crm::Customer"))
                        .with_opposite("orders")
                        .with_mandatory(),
                )
                .with_property(
                    PropertyDeclaration::new("items", PropertyType::collection("sales::Item"))
                        .with_opposite("order")
                        .with_sort_expression("position"),
                ),
        )
        .with_type(
            TypeMembers::new("sales::Item")
                .with_property(PropertyDeclaration::new(
                    "position",
                    PropertyType::value(ValueType::Int32),
                ))
                .with_property(PropertyDeclaration::new(
                    "product",
                    PropertyType::value(ValueType::String),
                ))
                .with_property(
                    PropertyDeclaration::new("order", PropertyType::reference("sales::Order"))
                        .with_opposite("items")
                        .with_mandatory(),
                ),
        )
        .with_type(
            TypeMembers::new("sales::OrderTicket")
                .with_property(PropertyDeclaration::new(
                    "file_name",
                    PropertyType::value(ValueType::String),
                ))
                .with_property(
                    PropertyDeclaration::new("order", PropertyType::reference("sales::Order"))
                        .with_mandatory(),
                ),
        )
        .with_type(
            TypeMembers::new("hr::Employee")
                .with_property(PropertyDeclaration::new(
                    "name",
                    PropertyType::value(ValueType::String),
                ))
                .with_property(
                    PropertyDeclaration::new("computer", PropertyType::reference("hr::Computer"))
                        .with_opposite("employee"),
                ),
        )
        .with_type(
            TypeMembers::new("hr::Computer")
                .with_property(PropertyDeclaration::new(
                    "serial_number",
                    PropertyType::value(ValueType::String),
                ))
                .with_property(
                    PropertyDeclaration::new("employee", PropertyType::reference("hr::Employee"))
                        .with_opposite("computer")
                        .with_foreign_key(),
                ),
        )
}

/// Build `names` from `registry` with the default loader and options.
pub fn build(registry: &StaticTypeRegistry, names: &[&str]) -> Result<MappingConfiguration> {
    MappingConfiguration::build(
        registry,
        &types(names),
        &NameBasedLoader::new(),
        MappingOptions::default(),
    )
}

/// Build every registered type of the sales domain.
pub fn build_sales() -> MappingConfiguration {
    let registry = sales_registry();
    MappingConfiguration::build(
        &registry,
        &registry.type_names(),
        &NameBasedLoader::new(),
        MappingOptions::default(),
    )
    .unwrap()
}
