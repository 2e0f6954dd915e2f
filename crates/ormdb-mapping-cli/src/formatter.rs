//! Output formatters for mapping configurations.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use ormdb_mapping::{ClassDefinition, MappingConfiguration, RelationDefinition, RelationEndPoint};
use std::sync::Arc;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format the classes of a configuration.
    fn format_classes(&self, classes: &[Arc<ClassDefinition>]) -> String;

    /// Format the relations of a configuration.
    fn format_relations(&self, relations: &[Arc<RelationDefinition>]) -> String;

    /// Format a whole configuration.
    fn format_configuration(&self, configuration: &MappingConfiguration) -> String;

    /// Format an error message.
    fn format_error(&self, error: &str) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_classes(&self, classes: &[Arc<ClassDefinition>]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Class", "Type", "Base", "Storage", "Properties"]);

        for class in classes {
            let mut id = class.id().to_string();
            if class.is_abstract() {
                id.push_str(" (abstract)");
            }
            table.add_row(vec![
                Cell::new(id),
                Cell::new(class.class_type()),
                Cell::new(base_id(class)),
                Cell::new(storage_entity(class)),
                Cell::new(class.properties().len()),
            ]);
        }

        format!("{}\n{} class(es)", table, classes.len())
    }

    fn format_relations(&self, relations: &[Arc<RelationDefinition>]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Relation", "Kind", "Foreign key", "Other side"]);

        for relation in relations {
            let [first, second] = relation.end_points();
            table.add_row(vec![
                Cell::new(relation.id()),
                Cell::new(relation.kind()),
                Cell::new(describe_end_point(first)),
                Cell::new(describe_end_point(second)),
            ]);
        }

        format!("{}\n{} relation(s)", table, relations.len())
    }

    fn format_configuration(&self, configuration: &MappingConfiguration) -> String {
        format!(
            "{}\n\n{}",
            self.format_classes(configuration.classes()),
            self.format_relations(configuration.relations())
        )
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}", error)
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl JsonFormatter {
    fn classes_to_json(classes: &[Arc<ClassDefinition>]) -> serde_json::Value {
        classes.iter().map(|class| class_to_json(class)).collect()
    }

    fn relations_to_json(relations: &[Arc<RelationDefinition>]) -> serde_json::Value {
        relations
            .iter()
            .map(|relation| relation_to_json(relation))
            .collect()
    }
}

impl Formatter for JsonFormatter {
    fn format_classes(&self, classes: &[Arc<ClassDefinition>]) -> String {
        to_pretty(&Self::classes_to_json(classes))
    }

    fn format_relations(&self, relations: &[Arc<RelationDefinition>]) -> String {
        to_pretty(&Self::relations_to_json(relations))
    }

    fn format_configuration(&self, configuration: &MappingConfiguration) -> String {
        to_pretty(&serde_json::json!({
            "classes": Self::classes_to_json(configuration.classes()),
            "relations": Self::relations_to_json(configuration.relations()),
        }))
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({
            "error": error
        })
        .to_string()
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({
            "message": message
        })
        .to_string()
    }
}

fn to_pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

fn base_id(class: &ClassDefinition) -> String {
    class
        .base_class()
        .map(|base| base.id().to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn storage_entity(class: &ClassDefinition) -> String {
    class
        .storage_entity()
        .map(|entity| entity.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Describe an end-point as `Class.property`, or just the class if anonymous.
fn describe_end_point(end_point: &RelationEndPoint) -> String {
    match end_point.property_name() {
        Some(property) => format!("{}.{}", end_point.class_id(), property),
        None => end_point.class_id().to_string(),
    }
}

fn class_to_json(class: &ClassDefinition) -> serde_json::Value {
    let properties: Vec<serde_json::Value> = class
        .properties()
        .iter()
        .map(|property| {
            serde_json::json!({
                "name": property.name(),
                "declaring_type": property.declaring_type(),
                "type": property.property_type(),
                "storage_class": property.storage_class(),
                "nullable": property.is_nullable(),
                "storage": property.storage_property(),
            })
        })
        .collect();

    serde_json::json!({
        "id": class.id(),
        "type": class.class_type(),
        "abstract": class.is_abstract(),
        "base": class.base_class().map(|base| base.id().to_string()),
        "derived": class
            .derived_classes()
            .iter()
            .map(|derived| derived.id().to_string())
            .collect::<Vec<_>>(),
        "storage_group": class.storage_group(),
        "storage": class.storage_entity(),
        "mixins": class.captured_mixins(),
        "properties": properties,
    })
}

fn relation_to_json(relation: &RelationDefinition) -> serde_json::Value {
    let end_points: Vec<serde_json::Value> = relation
        .end_points()
        .iter()
        .map(|end_point| {
            let kind = if end_point.is_real() {
                "real"
            } else if end_point.is_virtual() {
                "virtual"
            } else {
                "anonymous"
            };
            serde_json::json!({
                "kind": kind,
                "class": end_point.class_id(),
                "property": end_point.property_name(),
                "mandatory": end_point.is_mandatory(),
                "sort_expression": end_point.sort_expression(),
            })
        })
        .collect();

    serde_json::json!({
        "id": relation.id(),
        "kind": relation.kind().to_string(),
        "end_points": end_points,
    })
}
