//! Property nodes
//!
//! A property belongs to exactly one entity type. Its column name is a
//! facet of its own, so renaming the property never implies renaming the
//! column.

use crate::arena::EntityTypeId;
use keystone_core::{ClrType, Configurable, ConfigurationSource, Sourced};

// ============================================================================
// Property
// ============================================================================

/// A scalar attribute of an entity type
#[derive(Debug, Clone)]
pub struct Property {
    pub(crate) name: String,
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) source: ConfigurationSource,
    pub(crate) is_shadow: bool,

    pub(crate) clr_type: ClrType,
    pub(crate) clr_type_source: Option<ConfigurationSource>,

    pub(crate) is_nullable: Option<Sourced<bool>>,
    pub(crate) is_concurrency_token: Option<Sourced<bool>>,
    pub(crate) max_length: Option<Sourced<usize>>,
    pub(crate) requires_value_generator: Option<Sourced<bool>>,
    pub(crate) column_name: Option<Sourced<String>>,
}

impl Property {
    pub(crate) fn new(
        name: impl Into<String>,
        declaring_entity_type: EntityTypeId,
        clr_type: ClrType,
        is_shadow: bool,
        source: ConfigurationSource,
    ) -> Self {
        Self {
            name: name.into(),
            declaring_entity_type,
            source,
            is_shadow,
            clr_type,
            clr_type_source: None,
            is_nullable: None,
            is_concurrency_token: None,
            max_length: None,
            requires_value_generator: None,
            column_name: None,
        }
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    /// Whether no CLR member backs this property
    pub fn is_shadow(&self) -> bool {
        self.is_shadow
    }

    pub fn clr_type(&self) -> &ClrType {
        &self.clr_type
    }

    pub fn clr_type_configuration_source(&self) -> Option<ConfigurationSource> {
        self.clr_type_source
    }

    /// Whether the property accepts null.
    ///
    /// Defaults to the nullability of the CLR type.
    pub fn is_nullable(&self) -> bool {
        self.is_nullable
            .configured_value()
            .copied()
            .unwrap_or_else(|| self.clr_type.is_nullable_type())
    }

    pub fn is_nullable_configuration_source(&self) -> Option<ConfigurationSource> {
        self.is_nullable.configured_source()
    }

    pub fn is_concurrency_token(&self) -> bool {
        self.is_concurrency_token.configured_value().copied().unwrap_or(false)
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length.configured_value().copied()
    }

    pub fn requires_value_generator(&self) -> bool {
        self.requires_value_generator
            .configured_value()
            .copied()
            .unwrap_or(false)
    }

    /// Stored column name, defaulting to the property name
    pub fn column_name(&self) -> &str {
        self.column_name
            .configured_value()
            .map(String::as_str)
            .unwrap_or(&self.name)
    }

    /// Fold the configured facets of `other` into this property.
    ///
    /// For each facet the stronger source wins; on a tie the value already
    /// on `self` stays.
    pub(crate) fn merge_facets_from(&mut self, other: &Property) {
        fn pick<T: Clone>(into: &mut Option<Sourced<T>>, from: &Option<Sourced<T>>) {
            if let Some(candidate) = from {
                let stronger = into
                    .as_ref()
                    .is_none_or(|existing| candidate.source > existing.source);
                if stronger {
                    *into = Some(candidate.clone());
                }
            }
        }

        pick(&mut self.is_nullable, &other.is_nullable);
        pick(&mut self.is_concurrency_token, &other.is_concurrency_token);
        pick(&mut self.max_length, &other.max_length);
        pick(&mut self.requires_value_generator, &other.requires_value_generator);
        pick(&mut self.column_name, &other.column_name);
        self.source = self.source.merge(Some(other.source));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Arena, ArenaId};
    use ConfigurationSource::*;

    fn owner() -> EntityTypeId {
        let mut arena: Arena<EntityTypeId, ()> = Arena::new();
        arena.insert(())
    }

    #[test]
    fn test_defaults_follow_clr_type() {
        let id = owner();
        let name = Property::new("Name", id, ClrType::String, false, Convention);
        assert!(name.is_nullable());
        assert_eq!(name.column_name(), "Name");
        assert!(!name.is_concurrency_token());
        assert_eq!(name.max_length(), None);

        let count = Property::new("Count", id, ClrType::Int32, true, Convention);
        assert!(!count.is_nullable());
        assert!(count.is_shadow());
        assert_eq!(count.declaring_entity_type().index(), 0);
    }

    #[test]
    fn test_merge_facets_keeps_stronger_source() {
        let id = owner();
        let mut base = Property::new("Id", id, ClrType::Int32, false, Convention);
        base.max_length = Some(Sourced::new(2, Convention));

        let mut derived = Property::new("Id", id, ClrType::String, false, DataAnnotation);
        derived.max_length = Some(Sourced::new(1, DataAnnotation));
        derived.is_concurrency_token = Some(Sourced::new(true, Convention));

        base.merge_facets_from(&derived);
        assert_eq!(base.max_length(), Some(1));
        assert!(base.is_concurrency_token());
        assert_eq!(base.clr_type(), &ClrType::Int32);
        assert_eq!(base.configuration_source(), DataAnnotation);
    }
}
