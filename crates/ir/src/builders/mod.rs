//! Source-aware builders over the metadata graph
//!
//! [`ModelBuilder`] owns the [`Model`] together with the injected
//! [`MemberResolver`] and the [`BuilderConfig`]. The per-node builders
//! (`EntityTypeBuilder`, `RelationshipBuilder`, ...) are short-lived handles
//! that borrow the model builder and remember one node id.
//!
//! Every mutation carries a [`ConfigurationSource`]. A request that loses to
//! existing configuration returns `None` and leaves the model untouched; a
//! request that can never succeed returns a [`MetadataError`]. Operations
//! that cascade run inside a transaction, so a failing cascade rolls the
//! whole request back.

mod entity_type;
mod key;
mod navigation;
mod property;
mod relationship;

pub use entity_type::EntityTypeBuilder;
pub use key::{IndexBuilder, KeyBuilder};
pub use navigation::{CollectionNavigationBuilder, ReferenceNavigationBuilder};
pub use property::PropertyBuilder;
pub use relationship::RelationshipBuilder;

use crate::arena::{EntityTypeId, ForeignKeyId, IndexId, KeyId, PropertyId};
use crate::model::Model;
use crate::relationship_helpers::uniquify;
use crate::snapshot::ModelSnapshot;
use crate::validation::Validator;
use keystone_core::{
    BuilderConfig, ConfigurationSource, MemberKind, MemberResolver, MetadataError, MetadataResult,
};

// ============================================================================
// Element references
// ============================================================================

/// Something that names a property of an entity type: a property id or a
/// member name
pub trait PropertyRef {
    /// Find or create the property on `entity`; `None` when the name is ignored
    fn resolve_property(
        &self,
        builder: &mut ModelBuilder,
        entity: EntityTypeId,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<PropertyId>>;
}

impl PropertyRef for PropertyId {
    fn resolve_property(
        &self,
        builder: &mut ModelBuilder,
        entity: EntityTypeId,
        _source: ConfigurationSource,
    ) -> MetadataResult<Option<PropertyId>> {
        let model = builder.model();
        match model.property(*self) {
            Some(property) if model.is_same_or_derived(entity, property.declaring_entity_type()) => {
                Ok(Some(*self))
            }
            _ => Err(MetadataError::property_not_found(
                model.entity_type_name(entity),
                self.to_string(),
            )),
        }
    }
}

impl PropertyRef for &str {
    fn resolve_property(
        &self,
        builder: &mut ModelBuilder,
        entity: EntityTypeId,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<PropertyId>> {
        builder.get_or_add_property(entity, self, None, source)
    }
}

impl PropertyRef for String {
    fn resolve_property(
        &self,
        builder: &mut ModelBuilder,
        entity: EntityTypeId,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<PropertyId>> {
        self.as_str().resolve_property(builder, entity, source)
    }
}

/// Something that names an entity type: an id or a type name
pub trait EntityTypeRef {
    /// Find the entity type, creating it by name if needed; `None` when the
    /// name is ignored
    fn resolve_entity_type(
        &self,
        builder: &mut ModelBuilder,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<EntityTypeId>>;
}

impl EntityTypeRef for EntityTypeId {
    fn resolve_entity_type(
        &self,
        builder: &mut ModelBuilder,
        _source: ConfigurationSource,
    ) -> MetadataResult<Option<EntityTypeId>> {
        if builder.model().entity_type(*self).is_some() {
            Ok(Some(*self))
        } else {
            Err(MetadataError::EntityTypeNotFound(self.to_string()))
        }
    }
}

impl EntityTypeRef for &str {
    fn resolve_entity_type(
        &self,
        builder: &mut ModelBuilder,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<EntityTypeId>> {
        Ok(builder.get_or_add_entity_type(self, source))
    }
}

impl EntityTypeRef for String {
    fn resolve_entity_type(
        &self,
        builder: &mut ModelBuilder,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<EntityTypeId>> {
        Ok(builder.get_or_add_entity_type(self, source))
    }
}

// ============================================================================
// ModelBuilder
// ============================================================================

/// Entry point for building a model
pub struct ModelBuilder {
    model: Model,
    resolver: Box<dyn MemberResolver>,
    config: BuilderConfig,
}

impl ModelBuilder {
    /// Create a builder over an empty model with the default configuration
    pub fn new(resolver: impl MemberResolver + 'static) -> Self {
        Self::with_config(resolver, BuilderConfig::default())
    }

    /// Create a builder over an empty model
    pub fn with_config(resolver: impl MemberResolver + 'static, config: BuilderConfig) -> Self {
        Self {
            model: Model::new(),
            resolver: Box::new(resolver),
            config,
        }
    }

    /// The model built so far
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Finish building and take the model
    pub fn into_model(self) -> Model {
        self.model
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn resolver(&self) -> &dyn MemberResolver {
        self.resolver.as_ref()
    }

    /// Get or create the entity type `name`.
    ///
    /// Returns `None` when the name was ignored at a source this request
    /// cannot override.
    pub fn entity(&mut self, name: &str, source: ConfigurationSource) -> Option<EntityTypeBuilder<'_>> {
        let id = self.get_or_add_entity_type(name, source)?;
        Some(EntityTypeBuilder::new(self, id))
    }

    /// Ignore the entity type `name`, removing it if it exists.
    ///
    /// Fails when the existing entity type, or the base type link of one of
    /// its derived types, was configured at a higher source.
    pub fn ignore(&mut self, name: &str, source: ConfigurationSource) -> bool {
        if let Some(id) = self.model.find_entity_type(name) {
            if !self.remove_entity_type(id, source) {
                tracing::trace!("Ignoring entity type '{}' at {} rejected", name, source);
                return false;
            }
        }

        let merged = source.merge(self.model.ignored_entity_type_source(name));
        self.model
            .ignored_entity_types
            .insert(name.to_string(), merged);
        tracing::debug!("Ignored entity type '{}' at {}", name, merged);
        true
    }

    // ------------------------------------------------------------------------
    // Handles
    // ------------------------------------------------------------------------

    pub fn entity_type_builder(&mut self, id: EntityTypeId) -> Option<EntityTypeBuilder<'_>> {
        self.model.entity_type(id)?;
        Some(EntityTypeBuilder::new(self, id))
    }

    pub fn relationship_builder(&mut self, id: ForeignKeyId) -> Option<RelationshipBuilder<'_>> {
        self.model.foreign_key(id)?;
        Some(RelationshipBuilder::new(self, id))
    }

    pub fn key_builder(&mut self, id: KeyId) -> Option<KeyBuilder<'_>> {
        self.model.key(id)?;
        Some(KeyBuilder::new(self, id))
    }

    pub fn index_builder(&mut self, id: IndexId) -> Option<IndexBuilder<'_>> {
        self.model.index(id)?;
        Some(IndexBuilder::new(self, id))
    }

    pub fn property_builder(&mut self, id: PropertyId) -> Option<PropertyBuilder<'_>> {
        self.model.property(id)?;
        Some(PropertyBuilder::new(self, id))
    }

    // ------------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------------

    /// Run `f`, restoring the model when it returns `None`
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let checkpoint = self.model.clone();
        let result = f(self);
        if result.is_none() {
            self.model = checkpoint;
        }
        result
    }

    /// Run `f`, restoring the model when it returns `Ok(None)` or an error
    pub fn try_transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> MetadataResult<Option<T>>,
    ) -> MetadataResult<Option<T>> {
        let checkpoint = self.model.clone();
        let result = f(self);
        if !matches!(result, Ok(Some(_))) {
            self.model = checkpoint;
        }
        result
    }

    // ------------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------------

    /// Resolve the model into its read-only view.
    ///
    /// Runs the default validation rules first unless
    /// `validate_snapshots` is off.
    pub fn snapshot(&self) -> MetadataResult<ModelSnapshot> {
        if self.config.validate_snapshots {
            Validator::with_default_rules()
                .validate(&self.model)
                .to_result()?;
        }
        Ok(ModelSnapshot::capture(&self.model))
    }

    // ------------------------------------------------------------------------
    // Entity types
    // ------------------------------------------------------------------------

    pub(crate) fn get_or_add_entity_type(
        &mut self,
        name: &str,
        source: ConfigurationSource,
    ) -> Option<EntityTypeId> {
        if let Some(ignored) = self.model.ignored_entity_type_source(name) {
            if !source.overrides_ignore(ignored) {
                tracing::trace!(
                    "Entity type '{}' ignored at {}, {} request rejected",
                    name,
                    ignored,
                    source
                );
                return None;
            }
            self.model.ignored_entity_types.remove(name);
        }

        if let Some(id) = self.model.find_entity_type(name) {
            if let Some(entity) = self.model.entity_type_mut(id) {
                entity.source = source.merge(Some(entity.source));
            }
            return Some(id);
        }

        let has_clr_type = self.resolver.is_known_type(name);
        let id = self.model.add_entity_type(name, has_clr_type, source);
        tracing::debug!(
            "Added {} entity type '{}' at {}",
            if has_clr_type { "CLR" } else { "shadow" },
            name,
            source
        );
        Some(id)
    }

    fn remove_entity_type(&mut self, id: EntityTypeId, source: ConfigurationSource) -> bool {
        self.transaction(|mb| {
            let entity = mb.model.entity_type(id)?;
            if !source.overrides(Some(entity.source)) {
                return None;
            }
            let name = entity.name.clone();

            for derived in mb.model.derived_types(id) {
                mb.set_base_type(derived, None, source).ok().flatten()?;
            }

            let mut foreign_keys = mb.model.entity_type(id)?.foreign_keys.clone();
            for fk in mb.model.foreign_keys_referencing(id) {
                if !foreign_keys.contains(&fk) {
                    foreign_keys.push(fk);
                }
            }
            for fk in foreign_keys {
                mb.remove_foreign_key(fk, source)?;
            }

            let entity = mb.model.entity_type(id)?;
            let indexes = entity.indexes.clone();
            let keys = entity.keys.clone();
            let navigations = entity.navigations.clone();
            let properties = entity.properties.clone();
            for index in indexes {
                mb.model.remove_index_node(index);
            }
            for key in keys {
                mb.model.remove_key_node(key);
            }
            for navigation in navigations {
                mb.model.remove_navigation_node(navigation);
            }
            for property in properties {
                mb.model.remove_property_node(property);
            }
            mb.model.remove_entity_type_node(id)?;
            tracing::debug!("Removed entity type '{}'", name);
            Some(())
        })
        .is_some()
    }

    // ------------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------------

    /// What the CLR type behind `entity` says about `member`
    pub(crate) fn member_kind(&self, entity: EntityTypeId, member: &str) -> MemberKind {
        match self.model.entity_type(entity) {
            Some(e) if e.has_clr_type => self.resolver.resolve_member(&e.name, member),
            _ => MemberKind::NotFound,
        }
    }

    /// Whether `name` is ignored on `entity` or a base type at a source that
    /// blocks a request at `source`
    pub(crate) fn is_ignored(
        &self,
        entity: EntityTypeId,
        name: &str,
        source: ConfigurationSource,
    ) -> bool {
        self.model
            .hierarchy(entity)
            .into_iter()
            .filter_map(|id| self.model.entity_type(id))
            .filter_map(|e| e.ignored_source(name))
            .any(|ignored| !source.overrides_ignore(ignored))
    }

    pub(crate) fn clear_ignored(&mut self, entity: EntityTypeId, name: &str) {
        for id in self.model.hierarchy(entity) {
            if let Some(e) = self.model.entity_type_mut(id) {
                e.ignored_members.remove(name);
            }
        }
    }

    /// Whether `name` is used by a member anywhere in the hierarchy of `entity`
    pub(crate) fn is_member_name_taken(&self, entity: EntityTypeId, name: &str) -> bool {
        self.model.find_property(entity, name).is_some()
            || !self.model.find_derived_properties(entity, name).is_empty()
            || self.model.find_navigation(entity, name).is_some()
            || !self.model.find_derived_navigations(entity, name).is_empty()
            || self.member_kind(entity, name).exists()
            || self
                .model
                .hierarchy(entity)
                .into_iter()
                .filter_map(|id| self.model.entity_type(id))
                .any(|e| e.ignored_source(name).is_some())
    }

    /// `base`, or `base` with the first free numeric suffix
    pub(crate) fn unique_member_name(&self, entity: EntityTypeId, base: &str) -> String {
        uniquify(base, |candidate| self.is_member_name_taken(entity, candidate))
    }

    /// Remove convention-created shadow properties nothing refers to any more
    pub(crate) fn prune_shadow_properties(&mut self, properties: &[PropertyId]) {
        if !self.config.prune_shadow_properties {
            return;
        }
        for &id in properties {
            let unused = self.model.property(id).is_some_and(|property| {
                property.is_shadow && property.source == ConfigurationSource::Convention
            }) && !self.model.is_property_in_use(id);
            if unused {
                if let Some(property) = self.model.remove_property_node(id) {
                    tracing::debug!(
                        "Pruned shadow property '{}.{}'",
                        self.model.entity_type_name(property.declaring_entity_type),
                        property.name
                    );
                }
            }
        }
    }

    /// Remove a key the builder created for a relationship once nothing
    /// references it
    pub(crate) fn prune_implicit_key(&mut self, key: KeyId) {
        let removable = self.model.key(key).is_some_and(|k| {
            k.implicit && k.source == ConfigurationSource::Convention
        }) && !self.model.is_primary_key(key)
            && self.model.referencing_foreign_keys(key).is_empty();
        if !removable {
            return;
        }
        if let Some(removed) = self.model.remove_key_node(key) {
            tracing::debug!(
                "Pruned implicit key {:?} on '{}'",
                self.model.property_names(&removed.properties),
                self.model.entity_type_name(removed.declaring_entity_type)
            );
            self.prune_shadow_properties(&removed.properties);
        }
    }

    /// Resolve a list of property references on `entity`, all or nothing
    pub(crate) fn resolve_properties<P: PropertyRef>(
        &mut self,
        entity: EntityTypeId,
        properties: &[P],
        source: ConfigurationSource,
        element: &str,
    ) -> MetadataResult<Option<Vec<PropertyId>>> {
        if properties.is_empty() {
            return Err(MetadataError::empty_property_list(
                self.model.entity_type_name(entity),
                element,
            ));
        }
        self.try_transaction(|mb| {
            let mut resolved = Vec::with_capacity(properties.len());
            for property in properties {
                match property.resolve_property(mb, entity, source)? {
                    Some(id) => resolved.push(id),
                    None => return Ok(None),
                }
            }
            Ok(Some(resolved))
        })
    }
}

impl std::fmt::Debug for ModelBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("model", &self.model)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{model_builder, CUSTOMER, ORDER, SPECIAL_ORDER};
    use pretty_assertions::assert_eq;
    use ConfigurationSource::*;

    #[test]
    fn test_entity_returns_same_entity_type() {
        let mut mb = model_builder();
        let first = mb.entity(ORDER, Convention).unwrap().id();
        let second = mb.entity(ORDER, Explicit).unwrap().id();

        assert_eq!(first, second);
        let order = mb.model().entity_type(first).unwrap();
        assert_eq!(order.configuration_source(), Explicit);
        assert!(order.has_clr_type());
    }

    #[test]
    fn test_unknown_name_creates_shadow_entity_type() {
        let mut mb = model_builder();
        let id = mb.entity("Zebra", Explicit).unwrap().id();
        assert!(mb.model().entity_type(id).unwrap().is_shadow());
    }

    #[test]
    fn test_can_only_ignore_lower_or_equal_source_entity_type() {
        let mut mb = model_builder();
        mb.entity(CUSTOMER, DataAnnotation).unwrap();

        assert!(!mb.ignore(CUSTOMER, Convention));
        assert!(mb.model().find_entity_type(CUSTOMER).is_some());

        assert!(mb.ignore(CUSTOMER, DataAnnotation));
        assert!(mb.model().find_entity_type(CUSTOMER).is_none());
        assert_eq!(mb.model().ignored_entity_type_source(CUSTOMER), Some(DataAnnotation));
    }

    #[test]
    fn test_ignored_entity_type_blocks_same_or_lower_source() {
        let mut mb = model_builder();
        assert!(mb.ignore(CUSTOMER, DataAnnotation));

        assert!(mb.entity(CUSTOMER, Convention).is_none());
        assert!(mb.entity(CUSTOMER, DataAnnotation).is_none());
        assert!(mb.entity(CUSTOMER, Explicit).is_some());
        assert_eq!(mb.model().ignored_entity_type_source(CUSTOMER), None);
    }

    #[test]
    fn test_ignoring_twice_keeps_higher_source() {
        let mut mb = model_builder();
        assert!(mb.ignore(CUSTOMER, Explicit));
        assert!(mb.ignore(CUSTOMER, Convention));
        assert_eq!(mb.model().ignored_entity_type_source(CUSTOMER), Some(Explicit));
    }

    #[test]
    fn test_can_ignore_lower_source_dependent_entity_type() {
        let mut mb = model_builder();
        let customer = mb.entity(CUSTOMER, Explicit).unwrap().id();
        mb.entity(ORDER, Explicit)
            .unwrap()
            .relationship(customer, None, None, Convention)
            .unwrap()
            .unwrap();

        assert!(mb.ignore(ORDER, Explicit));

        let names: Vec<&str> = mb.model().entity_types().map(|(_, e)| e.name()).collect();
        assert_eq!(names, vec![CUSTOMER]);
        assert!(mb.model().keys(customer).is_empty());
        assert!(mb.model().properties(customer).is_empty());
    }

    #[test]
    fn test_can_ignore_lower_source_principal_entity_type() {
        let mut mb = model_builder();
        let customer = mb.entity(CUSTOMER, Convention).unwrap().id();
        let order = mb.entity(ORDER, Explicit).unwrap().id();
        mb.entity_type_builder(order)
            .unwrap()
            .relationship(customer, None, None, Convention)
            .unwrap()
            .unwrap();

        assert!(mb.ignore(CUSTOMER, Explicit));

        let names: Vec<&str> = mb.model().entity_types().map(|(_, e)| e.name()).collect();
        assert_eq!(names, vec![ORDER]);
        assert!(mb.model().foreign_keys(order).is_empty());
        assert!(mb.model().properties(order).is_empty());
    }

    #[test]
    fn test_ignoring_base_type_detaches_derived_types() {
        let mut mb = model_builder();
        mb.entity(ORDER, Convention).unwrap();
        let special = mb.entity(SPECIAL_ORDER, Explicit).unwrap().id();
        mb.entity_type_builder(special)
            .unwrap()
            .has_base_type(Some(ORDER), Convention)
            .unwrap()
            .unwrap();

        assert!(mb.ignore(ORDER, Convention));
        assert_eq!(mb.model().entity_type(special).unwrap().base_type(), None);
    }

    #[test]
    fn test_cannot_ignore_base_type_of_higher_source_derived_link() {
        let mut mb = model_builder();
        mb.entity(ORDER, Convention).unwrap();
        let special = mb.entity(SPECIAL_ORDER, Explicit).unwrap().id();
        mb.entity_type_builder(special)
            .unwrap()
            .has_base_type(Some(ORDER), Explicit)
            .unwrap()
            .unwrap();

        assert!(!mb.ignore(ORDER, DataAnnotation));
        assert!(mb.model().find_entity_type(ORDER).is_some());
        assert!(mb.model().entity_type(special).unwrap().base_type().is_some());
    }

    #[test]
    fn test_transaction_rolls_back_on_rejection() {
        let mut mb = model_builder();
        let result: Option<()> = mb.transaction(|mb| {
            mb.entity(ORDER, Explicit)?;
            None
        });

        assert_eq!(result, None);
        assert_eq!(mb.model().entity_type_count(), 0);
    }

    #[test]
    fn test_try_transaction_rolls_back_on_error() {
        let mut mb = model_builder();
        let result: MetadataResult<Option<()>> = mb.try_transaction(|mb| {
            let order = mb.entity(ORDER, Explicit).unwrap().id();
            mb.entity_type_builder(order)
                .unwrap()
                .property("Missing", None, Explicit)?;
            Ok(Some(()))
        });

        assert!(matches!(result, Err(MetadataError::NoClrProperty { .. })));
        assert_eq!(mb.model().entity_type_count(), 0);
    }

    #[test]
    fn test_unique_member_name_skips_taken_names() {
        let mut mb = model_builder();
        let order = mb.entity(ORDER, Explicit).unwrap().id();
        mb.entity_type_builder(order)
            .unwrap()
            .property("Shadow", Some(keystone_core::ClrType::Int32), Explicit)
            .unwrap()
            .unwrap();

        assert_eq!(mb.unique_member_name(order, "Fresh"), "Fresh");
        assert_eq!(mb.unique_member_name(order, "Shadow"), "Shadow1");
        assert_eq!(mb.unique_member_name(order, "CustomerId"), "CustomerId1");
    }
}
