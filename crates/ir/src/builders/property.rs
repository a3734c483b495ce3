//! Property builder

use super::ModelBuilder;
use crate::arena::PropertyId;
use crate::property::Property;
use keystone_core::{ClrType, Configurable, ConfigurationSource};
use tracing::{debug, trace};

/// Handle for configuring one property's facets
pub struct PropertyBuilder<'a> {
    mb: &'a mut ModelBuilder,
    id: PropertyId,
}

impl<'a> PropertyBuilder<'a> {
    pub(crate) fn new(mb: &'a mut ModelBuilder, id: PropertyId) -> Self {
        Self { mb, id }
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn metadata(&self) -> Option<&Property> {
        self.mb.model.property(self.id)
    }

    /// Change the CLR type. A configured `is_nullable(true)` that the new
    /// type cannot hold is dropped.
    pub fn clr_type(&mut self, clr_type: ClrType, source: ConfigurationSource) -> Option<&mut Self> {
        let id = self.id;
        self.mb.transaction(|mb| {
            let property = mb.model.property_mut(id)?;
            if property.clr_type == clr_type {
                property.clr_type_source = Some(source.merge(property.clr_type_source));
                return Some(());
            }
            if !source.overrides(property.clr_type_source) {
                trace!("CLR type of '{}' configured at a higher source", property.name);
                return None;
            }
            if !clr_type.is_nullable_type() && property.is_nullable.configured_value() == Some(&true) {
                property.is_nullable = None;
            }
            property.clr_type = clr_type;
            property.clr_type_source = Some(source);

            for fk in mb.model.foreign_keys_containing(id) {
                mb.reconcile_required(fk)?;
            }
            Some(())
        })?;
        Some(self)
    }

    pub fn is_concurrency_token(&mut self, concurrency_token: bool, source: ConfigurationSource) -> Option<&mut Self> {
        let property = self.mb.model.property_mut(self.id)?;
        property
            .is_concurrency_token
            .configure(concurrency_token, source)
            .then_some(self)
    }

    pub fn has_max_length(&mut self, max_length: usize, source: ConfigurationSource) -> Option<&mut Self> {
        let property = self.mb.model.property_mut(self.id)?;
        property.max_length.configure(max_length, source).then_some(self)
    }

    pub fn use_value_generator(&mut self, generate: bool, source: ConfigurationSource) -> Option<&mut Self> {
        let property = self.mb.model.property_mut(self.id)?;
        property
            .requires_value_generator
            .configure(generate, source)
            .then_some(self)
    }

    /// Configure nullability. Relationships using this property give up a
    /// conflicting required-ness configured at the same or a lower source.
    pub fn is_nullable(&mut self, nullable: bool, source: ConfigurationSource) -> Option<&mut Self> {
        let id = self.id;
        self.mb
            .transaction(|mb| mb.configure_nullability(id, nullable, source).then_some(()))?;
        Some(self)
    }

    /// Map the property to a column. The column name is tracked apart from
    /// the property name.
    pub fn has_column_name(&mut self, column: &str, source: ConfigurationSource) -> Option<&mut Self> {
        let property = self.mb.model.property_mut(self.id)?;
        if !property.column_name.configure(column.to_string(), source) {
            trace!("Column name of '{}' configured at a higher source", property.name);
            return None;
        }
        debug!("Mapped property '{}' to column '{}'", property.name, column);
        Some(self)
    }
}

impl ModelBuilder {
    /// Set the nullability of `property`, clearing required-ness on
    /// relationships it would contradict. Key members and non-nullable CLR
    /// types never become nullable.
    pub(super) fn configure_nullability(
        &mut self,
        property: PropertyId,
        nullable: bool,
        source: ConfigurationSource,
    ) -> bool {
        let Some(current) = self.model.property(property) else {
            return false;
        };
        if nullable
            && (!current.clr_type.is_nullable_type() || !self.model.keys_containing(property).is_empty())
        {
            trace!("'{}' cannot be made nullable", current.name);
            return false;
        }
        if !current.is_nullable.can_configure(&nullable, source) {
            return false;
        }

        for fk in self.model.foreign_keys_containing(property) {
            let Some(foreign_key) = self.model.foreign_key(fk) else {
                continue;
            };
            let Some(required) = foreign_key.is_required.clone() else {
                continue;
            };
            let other_nullable = foreign_key.properties.iter().any(|id| {
                *id != property && self.model.property(*id).is_some_and(|p| p.is_nullable())
            });
            let conflicts = if nullable {
                required.value
            } else {
                !required.value && !other_nullable
            };
            if !conflicts {
                continue;
            }
            if source < required.source {
                trace!("Relationship required-ness configured at a higher source");
                return false;
            }
            if let Some(foreign_key) = self.model.foreign_key_mut(fk) {
                foreign_key.is_required = None;
            }
        }

        self.model
            .property_mut(property)
            .is_some_and(|p| p.is_nullable.configure(nullable, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{model_builder, CUSTOMER, ORDER};
    use pretty_assertions::assert_eq;
    use ConfigurationSource::*;

    #[test]
    fn test_facets_are_source_gated() {
        let mut mb = model_builder();
        let mut customer = mb.entity(CUSTOMER, Explicit).unwrap();
        let mut name = customer.property("Name", None, Convention).unwrap().unwrap();

        assert!(name.has_max_length(50, DataAnnotation).is_some());
        assert!(name.has_max_length(100, Convention).is_none());
        assert!(name.is_concurrency_token(true, Explicit).is_some());
        assert!(name.is_concurrency_token(false, DataAnnotation).is_none());
        assert!(name.use_value_generator(true, Convention).is_some());

        let property = name.metadata().unwrap();
        assert_eq!(property.max_length(), Some(50));
        assert!(property.is_concurrency_token());
        assert!(property.requires_value_generator());
    }

    #[test]
    fn test_same_value_raises_source() {
        let mut mb = model_builder();
        let mut customer = mb.entity(CUSTOMER, Explicit).unwrap();
        let mut name = customer.property("Name", None, Convention).unwrap().unwrap();
        name.has_max_length(50, Convention).unwrap();
        name.has_max_length(50, Explicit).unwrap();

        assert!(name.has_max_length(10, DataAnnotation).is_none());
    }

    #[test]
    fn test_nullability_rules() {
        let mut mb = model_builder();
        let customer = mb.entity(CUSTOMER, Explicit).unwrap().id();
        let mut customer_builder = mb.entity_type_builder(customer).unwrap();
        customer_builder.primary_key(&["Id"], Explicit).unwrap();

        let mut id = customer_builder.property("Id", None, Convention).unwrap().unwrap();
        assert!(id.is_nullable(true, Explicit).is_none());

        let mut name = customer_builder.property("Name", None, Convention).unwrap().unwrap();
        assert!(name.is_nullable(false, DataAnnotation).is_some());
        assert!(!name.metadata().unwrap().is_nullable());
        assert!(name.is_nullable(true, Convention).is_none());
        assert!(name.is_nullable(true, Explicit).is_some());
        assert!(name.metadata().unwrap().is_nullable());
    }

    #[test]
    fn test_key_property_cannot_become_nullable() {
        let mut mb = model_builder();
        let mut customer = mb.entity(CUSTOMER, Explicit).unwrap();
        customer.primary_key(&["Name"], Explicit).unwrap();
        let mut name = customer.property("Name", None, Convention).unwrap().unwrap();

        assert!(name.is_nullable(true, Explicit).is_none());
        assert!(name.is_nullable(false, Explicit).is_some());
    }

    #[test]
    fn test_nullable_property_clears_lower_source_required() {
        let mut mb = model_builder();
        let customer = mb.entity(CUSTOMER, Explicit).unwrap().id();
        let order = mb.entity(ORDER, Explicit).unwrap().id();
        let fk = mb
            .entity_type_builder(order)
            .unwrap()
            .has_foreign_key(customer, &["CustomerUnique"], Explicit)
            .unwrap()
            .unwrap()
            .is_required(true, DataAnnotation)
            .unwrap()
            .id();
        let property = mb.model().foreign_key(fk).unwrap().properties()[0];

        assert!(mb
            .property_builder(property)
            .unwrap()
            .is_nullable(true, Convention)
            .is_none());
        assert!(mb.model().is_required(fk));

        assert!(mb
            .property_builder(property)
            .unwrap()
            .is_nullable(true, Explicit)
            .is_some());
        assert_eq!(mb.model().foreign_key(fk).unwrap().configured_is_required(), None);
        assert!(!mb.model().is_required(fk));
    }

    #[test]
    fn test_clr_type_change_drops_unsupported_nullability() {
        let mut mb = model_builder();
        let order = mb.entity(ORDER, Explicit).unwrap().id();
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut shadow = order_builder
            .property("Rank", Some(ClrType::String), DataAnnotation)
            .unwrap()
            .unwrap();
        shadow.is_nullable(true, Convention).unwrap();

        assert!(shadow.clr_type(ClrType::Int64, Convention).is_none());
        assert!(shadow.clr_type(ClrType::Int64, DataAnnotation).is_some());
        let property = shadow.metadata().unwrap();
        assert_eq!(property.clr_type(), &ClrType::Int64);
        assert!(!property.is_nullable());
    }

    #[test]
    fn test_column_name_is_independent_of_property_name() {
        let mut mb = model_builder();
        let zebra = mb.entity("Zebra", Explicit).unwrap().id();
        let mut zebra_builder = mb.entity_type_builder(zebra).unwrap();
        zebra_builder
            .property("Id", Some(ClrType::Int32), Explicit)
            .unwrap()
            .unwrap();
        zebra_builder.primary_key(&["Id"], Explicit).unwrap().unwrap();
        zebra_builder
            .property("ParentId", Some(ClrType::nullable(ClrType::Int32)), Explicit)
            .unwrap()
            .unwrap()
            .has_column_name("ParentId", Explicit)
            .unwrap();
        zebra_builder
            .has_foreign_key(zebra, &["ParentId"], Explicit)
            .unwrap()
            .unwrap();

        let renamed = zebra_builder
            .property("ParentKey", Some(ClrType::nullable(ClrType::Int32)), Explicit)
            .unwrap()
            .unwrap()
            .has_column_name("ParentId", Explicit)
            .unwrap()
            .id();

        let model = mb.model();
        let original = model.find_property(zebra, "ParentId").unwrap();
        assert_eq!(model.property(renamed).unwrap().column_name(), "ParentId");
        assert_eq!(model.property(original).unwrap().column_name(), "ParentId");
        assert_eq!(model.property(renamed).unwrap().name(), "ParentKey");
    }
}
