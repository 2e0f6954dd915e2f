//! Graph construction: classes, mixin contributions and relations.

mod class_builder;
mod mixin;
mod relation_resolver;

pub use class_builder::ClassDefinitionBuilder;
pub use mixin::{MixinContribution, MixinContributionMerger};
pub use relation_resolver::RelationResolver;
