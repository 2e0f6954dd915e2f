//! Mixin contribution merging and drift detection.

use crate::error::{MappingError, Result};
use crate::introspect::{MixinDefinition, PropertyDeclaration, TypeIntrospector};
use crate::model::{ClassDefinition, TypeName};
use std::collections::BTreeSet;
use tracing::warn;

/// Mixins relevant to one class, as seen at build time.
#[derive(Debug, Clone, Default)]
pub struct MixinContribution {
    /// Every active mixin, in application order.
    pub captured: Vec<TypeName>,
    /// Active mixins that contribute persistent members.
    pub persistent: Vec<TypeName>,
    /// Mixins whose members are added to this class itself.
    pub contributing: Vec<MixinDefinition>,
}

impl MixinContribution {
    /// Properties contributed to the class, tagged with their mixin type.
    pub fn properties(&self) -> Vec<PropertyDeclaration> {
        self.contributing
            .iter()
            .flat_map(|mixin| {
                mixin.properties.iter().map(|property| {
                    let mut property = property.clone();
                    if property.declaring_type.is_none() {
                        property.declaring_type = Some(mixin.mixin_type.clone());
                    }
                    property
                })
            })
            .collect()
    }
}

/// Determines which mixins contribute persistent members to a class.
pub struct MixinContributionMerger<'a> {
    introspector: &'a dyn TypeIntrospector,
}

impl<'a> MixinContributionMerger<'a> {
    /// Create a merger over an introspector.
    pub fn new(introspector: &'a dyn TypeIntrospector) -> Self {
        Self { introspector }
    }

    /// Merge the active mixins of `type_name`.
    ///
    /// A mixin that is already persistent on the mapped base class is not
    /// contributed again: its members reach the derived class through the
    /// base chain. Roots take every active persistent mixin, including those
    /// applied to unmapped ancestors.
    pub fn merge(
        &self,
        type_name: &TypeName,
        base_class: Option<&ClassDefinition>,
    ) -> MixinContribution {
        let active = self.introspector.active_mixins(type_name);
        let captured = active.iter().map(|m| m.mixin_type.clone()).collect();
        let persistent: Vec<TypeName> = active
            .iter()
            .filter(|m| m.persistent)
            .map(|m| m.mixin_type.clone())
            .collect();

        let inherited: &[TypeName] = base_class.map_or(&[], |base| base.persistent_mixins());
        let contributing = active
            .into_iter()
            .filter(|m| m.persistent && !inherited.contains(&m.mixin_type))
            .collect();

        MixinContribution {
            captured,
            persistent,
            contributing,
        }
    }

    /// Compare the mixins captured for `class` with the currently active ones.
    ///
    /// Any difference in membership is drift, whether or not the changed
    /// mixins are persistent.
    pub fn check_drift(&self, class: &ClassDefinition) -> Result<()> {
        let current: Vec<TypeName> = self
            .introspector
            .active_mixins(class.class_type())
            .into_iter()
            .map(|m| m.mixin_type)
            .collect();

        let captured_set: BTreeSet<&TypeName> = class.captured_mixins().iter().collect();
        let current_set: BTreeSet<&TypeName> = current.iter().collect();
        if captured_set == current_set {
            return Ok(());
        }

        warn!(class_id = %class.id(), "mixin configuration drift detected");
        Err(MappingError::MixinConfigurationDrift {
            class_id: class.id().to_string(),
            captured: class
                .captured_mixins()
                .iter()
                .map(ToString::to_string)
                .collect(),
            current: current.iter().map(ToString::to_string).collect(),
        })
    }
}
