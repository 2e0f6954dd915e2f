//! Relation definitions and their end-points.

use super::class::ClassDefinition;
use super::property::PropertyDefinition;
use super::types::{Cardinality, PropertyType, TypeName};
use std::fmt;
use std::sync::{Arc, Weak};

/// Kind of a relation, derived from its end-points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// One side is anonymous; only the foreign-key side is navigable.
    Unidirectional,
    /// Both sides hold a single object.
    OneToOne,
    /// One side holds a collection.
    OneToMany,
    /// Both sides hold collections.
    ManyToMany,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::Unidirectional => write!(f, "unidirectional"),
            RelationKind::OneToOne => write!(f, "one-to-one"),
            RelationKind::OneToMany => write!(f, "one-to-many"),
            RelationKind::ManyToMany => write!(f, "many-to-many"),
        }
    }
}

/// The foreign-key side of a relation.
#[derive(Debug)]
pub struct RealEndPoint {
    property: Arc<PropertyDefinition>,
}

/// The navigable side of a relation without storage of its own.
#[derive(Debug)]
pub struct VirtualEndPoint {
    class_id: String,
    class_type: TypeName,
    class: Weak<ClassDefinition>,
    property_name: String,
    declaring_type: TypeName,
    property_type: PropertyType,
    cardinality: Cardinality,
    sort_expression: Option<String>,
    mandatory: bool,
}

/// The unnamed side of a unidirectional relation.
#[derive(Debug)]
pub struct AnonymousEndPoint {
    class_id: String,
    class: Weak<ClassDefinition>,
}

/// One of the two ends of a relation.
#[derive(Debug)]
pub enum RelationEndPoint {
    /// Holds the foreign-key property.
    Real(RealEndPoint),
    /// Declared on the opposite class.
    Virtual(VirtualEndPoint),
    /// Class reference only.
    Anonymous(AnonymousEndPoint),
}

impl RelationEndPoint {
    /// Create a real end-point over a foreign-key property.
    pub fn real(property: Arc<PropertyDefinition>) -> Self {
        RelationEndPoint::Real(RealEndPoint { property })
    }

    /// Create a virtual end-point.
    pub fn virtual_end_point(
        class: &Arc<ClassDefinition>,
        property_name: impl Into<String>,
        declaring_type: TypeName,
        property_type: PropertyType,
        sort_expression: Option<String>,
        mandatory: bool,
    ) -> Self {
        let cardinality = if property_type.is_collection() {
            Cardinality::Many
        } else {
            Cardinality::One
        };
        RelationEndPoint::Virtual(VirtualEndPoint {
            class_id: class.id().to_string(),
            class_type: class.class_type().clone(),
            class: Arc::downgrade(class),
            property_name: property_name.into(),
            declaring_type,
            property_type,
            cardinality,
            sort_expression,
            mandatory,
        })
    }

    /// Create an anonymous end-point.
    pub fn anonymous(class: &Arc<ClassDefinition>) -> Self {
        RelationEndPoint::Anonymous(AnonymousEndPoint {
            class_id: class.id().to_string(),
            class: Arc::downgrade(class),
        })
    }

    /// Identifier of the class the end-point belongs to.
    pub fn class_id(&self) -> &str {
        match self {
            RelationEndPoint::Real(ep) => ep.property.class_id(),
            RelationEndPoint::Virtual(ep) => &ep.class_id,
            RelationEndPoint::Anonymous(ep) => &ep.class_id,
        }
    }

    /// The class the end-point belongs to.
    pub fn class_definition(&self) -> Option<Arc<ClassDefinition>> {
        match self {
            RelationEndPoint::Real(ep) => ep.property.class_definition(),
            RelationEndPoint::Virtual(ep) => ep.class.upgrade(),
            RelationEndPoint::Anonymous(ep) => ep.class.upgrade(),
        }
    }

    /// Name of the navigating property; `None` for anonymous end-points.
    pub fn property_name(&self) -> Option<&str> {
        match self {
            RelationEndPoint::Real(ep) => Some(ep.property.name()),
            RelationEndPoint::Virtual(ep) => Some(&ep.property_name),
            RelationEndPoint::Anonymous(_) => None,
        }
    }

    /// Type that declared the navigating property.
    pub fn declaring_type(&self) -> Option<&TypeName> {
        match self {
            RelationEndPoint::Real(ep) => Some(ep.property.declaring_type()),
            RelationEndPoint::Virtual(ep) => Some(&ep.declaring_type),
            RelationEndPoint::Anonymous(_) => None,
        }
    }

    /// Declared type of the navigating property.
    pub fn property_type(&self) -> Option<&PropertyType> {
        match self {
            RelationEndPoint::Real(ep) => Some(ep.property.property_type()),
            RelationEndPoint::Virtual(ep) => Some(&ep.property_type),
            RelationEndPoint::Anonymous(_) => None,
        }
    }

    /// The foreign-key property of a real end-point.
    pub fn property_definition(&self) -> Option<&Arc<PropertyDefinition>> {
        match self {
            RelationEndPoint::Real(ep) => Some(&ep.property),
            _ => None,
        }
    }

    /// Identifier of the navigating property; `None` for anonymous
    /// end-points. See [`end_point_identifier`].
    pub fn identifier(&self) -> Option<String> {
        match self {
            RelationEndPoint::Real(ep) => Some(end_point_identifier(
                ep.property.class_type(),
                ep.property.declaring_type(),
                ep.property.name(),
            )),
            RelationEndPoint::Virtual(ep) => Some(end_point_identifier(
                &ep.class_type,
                &ep.declaring_type,
                &ep.property_name,
            )),
            RelationEndPoint::Anonymous(_) => None,
        }
    }

    /// Cardinality as seen from this end-point.
    pub fn cardinality(&self) -> Cardinality {
        match self {
            RelationEndPoint::Virtual(ep) => ep.cardinality,
            _ => Cardinality::One,
        }
    }

    /// Sort expression of a virtual collection end-point.
    pub fn sort_expression(&self) -> Option<&str> {
        match self {
            RelationEndPoint::Virtual(ep) => ep.sort_expression.as_deref(),
            _ => None,
        }
    }

    /// Whether the navigating property must always be set.
    pub fn is_mandatory(&self) -> bool {
        match self {
            RelationEndPoint::Real(ep) => ep.property.is_mandatory(),
            RelationEndPoint::Virtual(ep) => ep.mandatory,
            RelationEndPoint::Anonymous(_) => false,
        }
    }

    /// Check if this is a real end-point.
    pub fn is_real(&self) -> bool {
        matches!(self, RelationEndPoint::Real(_))
    }

    /// Check if this is a virtual end-point.
    pub fn is_virtual(&self) -> bool {
        matches!(self, RelationEndPoint::Virtual(_))
    }

    /// Check if this is an anonymous end-point.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, RelationEndPoint::Anonymous(_))
    }
}

/// Identifier of a relation property: `{declaring_type}.{property}`.
///
/// Members contributed by a mixin are prefixed with the class they were
/// merged into (`{class_type}:{mixin}.{property}`), since the same mixin may
/// be applied to several hierarchies.
pub fn end_point_identifier(
    class_type: &TypeName,
    declaring_type: &TypeName,
    property: &str,
) -> String {
    if class_type == declaring_type {
        format!("{declaring_type}.{property}")
    } else {
        format!("{class_type}:{declaring_type}.{property}")
    }
}

/// Build the canonical relation identifier from end-point identifiers.
pub fn relation_id(first: &str, second: Option<&str>) -> String {
    match second {
        Some(second) => format!("{first}->{second}"),
        None => first.to_string(),
    }
}

/// A relation between two classes.
#[derive(Debug)]
pub struct RelationDefinition {
    id: String,
    end_points: [RelationEndPoint; 2],
    kind: RelationKind,
}

impl RelationDefinition {
    /// Create a relation. End-point 0 is the real side.
    pub fn new(first: RelationEndPoint, second: RelationEndPoint) -> Self {
        let first_id = first
            .identifier()
            .unwrap_or_else(|| first.class_id().to_string());
        let id = relation_id(&first_id, second.identifier().as_deref());
        let kind = Self::kind_of(&first, &second);

        Self {
            id,
            end_points: [first, second],
            kind,
        }
    }

    fn kind_of(first: &RelationEndPoint, second: &RelationEndPoint) -> RelationKind {
        if first.is_anonymous() || second.is_anonymous() {
            return RelationKind::Unidirectional;
        }
        match (first.cardinality(), second.cardinality()) {
            (Cardinality::Many, Cardinality::Many) => RelationKind::ManyToMany,
            (Cardinality::One, Cardinality::One) => RelationKind::OneToOne,
            _ => RelationKind::OneToMany,
        }
    }

    /// Relation identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Both end-points, real side first.
    pub fn end_points(&self) -> &[RelationEndPoint; 2] {
        &self.end_points
    }

    /// Relation kind.
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Check if both sides are navigable.
    pub fn is_bidirectional(&self) -> bool {
        self.kind != RelationKind::Unidirectional
    }

    /// Find the end-point for a class and property name.
    pub fn get_end_point(&self, class_id: &str, property_name: &str) -> Option<&RelationEndPoint> {
        self.end_points
            .iter()
            .find(|ep| ep.class_id() == class_id && ep.property_name() == Some(property_name))
    }

    /// The end-point opposite to `end_point`, which must belong to this relation.
    pub fn opposite_end_point(&self, end_point: &RelationEndPoint) -> Option<&RelationEndPoint> {
        if std::ptr::eq(end_point, &self.end_points[0]) {
            Some(&self.end_points[1])
        } else if std::ptr::eq(end_point, &self.end_points[1]) {
            Some(&self.end_points[0])
        } else {
            None
        }
    }

    /// Identity check: whether `end_point` is one of this relation's end-points.
    pub fn contains_end_point(&self, end_point: &RelationEndPoint) -> bool {
        self.end_points.iter().any(|ep| std::ptr::eq(ep, end_point))
    }
}

impl fmt::Display for RelationDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.kind)
    }
}
