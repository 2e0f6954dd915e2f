//! Relation-level validation rules.

use super::{RelationValidationRule, ValidationViolation};
use crate::model::{Cardinality, RelationDefinition, RelationEndPoint, RelationKind};

fn violation(
    rule: &'static str,
    end_point: &RelationEndPoint,
    message: String,
) -> ValidationViolation {
    match end_point.property_name() {
        Some(property) => {
            ValidationViolation::property(rule, end_point.class_id(), property, message)
        }
        None => ValidationViolation::class(rule, end_point.class_id(), message),
    }
}

/// Exactly one end-point holds the foreign key; the other is virtual or
/// anonymous.
pub struct EndPointCombinationIsSupportedRule;

impl RelationValidationRule for EndPointCombinationIsSupportedRule {
    fn name(&self) -> &'static str {
        "EndPointCombinationIsSupportedRule"
    }

    fn validate(&self, relation: &RelationDefinition) -> Vec<ValidationViolation> {
        let [first, second] = relation.end_points();
        let message = match (first, second) {
            (RelationEndPoint::Real(_), RelationEndPoint::Virtual(_))
            | (RelationEndPoint::Real(_), RelationEndPoint::Anonymous(_)) => return Vec::new(),
            (RelationEndPoint::Real(_), RelationEndPoint::Real(_)) => format!(
                "relation '{}' has a foreign key on both sides",
                relation.id()
            ),
            (RelationEndPoint::Virtual(_), RelationEndPoint::Virtual(_))
                if relation.kind() == RelationKind::ManyToMany =>
            {
                format!(
                    "relation '{}' is many-to-many, which is not supported",
                    relation.id()
                )
            }
            (RelationEndPoint::Virtual(_), RelationEndPoint::Virtual(_)) => format!(
                "relation '{}' has no foreign key; one side must hold it",
                relation.id()
            ),
            _ => format!(
                "relation '{}' combines unsupported end-points",
                relation.id()
            ),
        };
        vec![violation(self.name(), first, message)]
    }
}

/// Property types must match the relation: the real side is a reference,
/// a virtual side is a collection exactly when its cardinality is many, and
/// every navigating property points at the class on the other side.
pub struct EndPointPropertyTypeMatchesDirectionRule;

impl EndPointPropertyTypeMatchesDirectionRule {
    fn check(
        &self,
        end_point: &RelationEndPoint,
        opposite: &RelationEndPoint,
    ) -> Option<ValidationViolation> {
        let property_type = end_point.property_type()?;

        let shape_matches = match end_point {
            RelationEndPoint::Real(_) => property_type.is_reference(),
            RelationEndPoint::Virtual(_) => match end_point.cardinality() {
                Cardinality::Many => property_type.is_collection(),
                Cardinality::One => property_type.is_reference(),
            },
            RelationEndPoint::Anonymous(_) => true,
        };
        if !shape_matches {
            return Some(violation(
                self.name(),
                end_point,
                format!(
                    "property type '{property_type}' does not match a {} end-point",
                    if end_point.is_real() { "foreign-key" } else { "virtual" }
                ),
            ));
        }

        let target = property_type.relation_target()?;
        let opposite_class = opposite.class_definition()?;
        let points_at_opposite = opposite_class.class_type() == target
            || opposite_class
                .ancestors()
                .iter()
                .any(|ancestor| ancestor.class_type() == target);
        if points_at_opposite {
            return None;
        }
        Some(violation(
            self.name(),
            end_point,
            format!(
                "property refers to type '{target}', but the opposite end-point belongs to '{}'",
                opposite_class.class_type()
            ),
        ))
    }
}

impl RelationValidationRule for EndPointPropertyTypeMatchesDirectionRule {
    fn name(&self) -> &'static str {
        "EndPointPropertyTypeMatchesDirectionRule"
    }

    fn validate(&self, relation: &RelationDefinition) -> Vec<ValidationViolation> {
        let [first, second] = relation.end_points();
        self.check(first, second)
            .into_iter()
            .chain(self.check(second, first))
            .collect()
    }
}

/// Sort expressions are only allowed on collections and must name
/// properties of the related class, each optionally followed by `asc` or
/// `desc`.
pub struct SortExpressionIsValidRule;

impl SortExpressionIsValidRule {
    fn check(
        &self,
        end_point: &RelationEndPoint,
        opposite: &RelationEndPoint,
    ) -> Vec<ValidationViolation> {
        let Some(expression) = end_point.sort_expression() else {
            return Vec::new();
        };
        if end_point.cardinality() != Cardinality::Many {
            return vec![violation(
                self.name(),
                end_point,
                "sort expressions are only supported on collections".to_string(),
            )];
        }

        let related = opposite.class_definition();
        let mut violations = Vec::new();
        for item in expression.split(',') {
            let parts: Vec<&str> = item.split_whitespace().collect();
            let (property, direction) = match parts.as_slice() {
                [property] => (*property, None),
                [property, direction] => (*property, Some(*direction)),
                _ => {
                    violations.push(violation(
                        self.name(),
                        end_point,
                        format!("sort expression item '{}' is malformed", item.trim()),
                    ));
                    continue;
                }
            };

            if let Some(direction) = direction {
                if !direction.eq_ignore_ascii_case("asc") && !direction.eq_ignore_ascii_case("desc")
                {
                    violations.push(violation(
                        self.name(),
                        end_point,
                        format!("sort direction '{direction}' must be 'asc' or 'desc'"),
                    ));
                }
            }

            if let Some(class) = &related {
                if class.get_property(property).is_none() {
                    violations.push(violation(
                        self.name(),
                        end_point,
                        format!(
                            "sort property '{property}' does not exist on class '{}'",
                            class.id()
                        ),
                    ));
                }
            }
        }
        violations
    }
}

impl RelationValidationRule for SortExpressionIsValidRule {
    fn name(&self) -> &'static str {
        "SortExpressionIsValidRule"
    }

    fn validate(&self, relation: &RelationDefinition) -> Vec<ValidationViolation> {
        let [first, second] = relation.end_points();
        let mut violations = self.check(first, second);
        violations.extend(self.check(second, first));
        violations
    }
}
