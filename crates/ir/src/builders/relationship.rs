//! Relationship builder
//!
//! A foreign key is identified by its dependent entity type and property
//! list. Changing either, or the principal key, swaps the node for a new one
//! that carries the other facets and the navigations forward; the builder
//! handle follows the replacement.

use super::{EntityTypeRef, ModelBuilder, PropertyRef};
use crate::arena::{EntityTypeId, ForeignKeyId, KeyId, PropertyId};
use crate::foreign_key::{ForeignKey, Navigation};
use crate::relationship_helpers::shadow_property_name;
use keystone_core::{
    ClrType, Configurable, ConfigurationSource, DeleteBehavior, MetadataError, MetadataResult,
    Sourced,
};
use tracing::{debug, trace};

// ============================================================================
// RelationshipBuilder
// ============================================================================

/// Handle for one foreign key
pub struct RelationshipBuilder<'a> {
    mb: &'a mut ModelBuilder,
    id: ForeignKeyId,
}

impl<'a> RelationshipBuilder<'a> {
    pub(crate) fn new(mb: &'a mut ModelBuilder, id: ForeignKeyId) -> Self {
        Self { mb, id }
    }

    /// Current foreign key; changes when the relationship is replaced
    pub fn id(&self) -> ForeignKeyId {
        self.id
    }

    pub fn metadata(&self) -> Option<&ForeignKey> {
        self.mb.model.foreign_key(self.id)
    }

    fn follow(&mut self, id: Option<ForeignKeyId>) -> Option<&mut Self> {
        self.id = id?;
        Some(self)
    }

    /// Use `properties` on the dependent as the foreign key properties
    pub fn has_foreign_key<P: PropertyRef>(
        &mut self,
        properties: &[P],
        source: ConfigurationSource,
    ) -> MetadataResult<Option<&mut Self>> {
        let fk = self.id;
        let Some(dependent) = self.metadata().map(|f| f.declaring_entity_type) else {
            return Ok(None);
        };
        let result = self.mb.try_transaction(|mb| {
            let Some(properties) =
                mb.resolve_properties(dependent, properties, source, "foreign key")?
            else {
                return Ok(None);
            };
            Ok(mb.set_foreign_key_properties(fk, properties, source))
        })?;
        Ok(self.follow(result))
    }

    /// Use the key made of `properties` on the principal as principal key
    pub fn has_principal_key<P: PropertyRef>(
        &mut self,
        properties: &[P],
        source: ConfigurationSource,
    ) -> MetadataResult<Option<&mut Self>> {
        let fk = self.id;
        let Some(principal) = self.metadata().map(|f| f.principal_entity_type) else {
            return Ok(None);
        };
        let result = self.mb.try_transaction(|mb| {
            let Some(properties) =
                mb.resolve_properties(principal, properties, source, "principal key")?
            else {
                return Ok(None);
            };
            mb.set_principal_key(fk, properties, source)
        })?;
        Ok(self.follow(result))
    }

    pub fn is_unique(&mut self, unique: bool, source: ConfigurationSource) -> Option<&mut Self> {
        let fk = self.id;
        self.mb.transaction(|mb| mb.set_unique(fk, unique, source))?;
        Some(self)
    }

    pub fn is_required(&mut self, required: bool, source: ConfigurationSource) -> Option<&mut Self> {
        let fk = self.id;
        let result = self.mb.set_required(fk, required, source);
        self.follow(result)
    }

    pub fn delete_behavior(
        &mut self,
        behavior: DeleteBehavior,
        source: ConfigurationSource,
    ) -> Option<&mut Self> {
        let fk = self.mb.model.foreign_key_mut(self.id)?;
        if !fk.delete_behavior.configure(behavior, source) {
            trace!("Delete behavior configured at a higher source, {} request rejected", source);
            return None;
        }
        Some(self)
    }

    /// Set or clear the navigation on the dependent pointing to the principal
    pub fn dependent_to_principal(
        &mut self,
        name: Option<&str>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<&mut Self>> {
        let result = self.mb.set_navigation(self.id, name, true, source)?;
        Ok(self.follow(result))
    }

    /// Set or clear the navigation on the principal pointing to the dependents
    pub fn principal_to_dependent(
        &mut self,
        name: Option<&str>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<&mut Self>> {
        let result = self.mb.set_navigation(self.id, name, false, source)?;
        Ok(self.follow(result))
    }

    /// Set both navigations, or neither
    pub fn navigations(
        &mut self,
        to_principal: Option<&str>,
        to_dependent: Option<&str>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<&mut Self>> {
        let fk = self.id;
        let result = self.mb.try_transaction(|mb| {
            let Some(fk) = mb.set_navigation(fk, to_principal, true, source)? else {
                return Ok(None);
            };
            mb.set_navigation(fk, to_dependent, false, source)
        })?;
        Ok(self.follow(result))
    }

    /// Make `entity` the dependent end, inverting the relationship if needed
    pub fn dependent_entity_type<E: EntityTypeRef>(
        &mut self,
        entity: E,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<&mut Self>> {
        self.set_end(entity, true, source)
    }

    /// Make `entity` the principal end, inverting the relationship if needed
    pub fn principal_entity_type<E: EntityTypeRef>(
        &mut self,
        entity: E,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<&mut Self>> {
        self.set_end(entity, false, source)
    }

    fn set_end<E: EntityTypeRef>(
        &mut self,
        entity: E,
        dependent: bool,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<&mut Self>> {
        let fk = self.id;
        let result = self.mb.try_transaction(|mb| {
            let Some(entity) = entity.resolve_entity_type(mb, source)? else {
                return Ok(None);
            };
            mb.set_principal_end(fk, entity, dependent, source)
        })?;
        Ok(self.follow(result))
    }
}

// ============================================================================
// ModelBuilder: foreign keys
// ============================================================================

/// Which ends and elements a new foreign key should use; `None` elements
/// are chosen by the builder
pub(super) struct ForeignKeyShape {
    pub(super) dependent: EntityTypeId,
    pub(super) principal: EntityTypeId,
    pub(super) properties: Option<Vec<PropertyId>>,
    pub(super) principal_key: Option<KeyId>,
}

impl ModelBuilder {
    /// Get the foreign key on `properties` or add one pointing at `principal`
    pub(crate) fn has_foreign_key(
        &mut self,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<ForeignKeyId>> {
        if let Some(existing) = self.model.find_foreign_key(dependent, &properties) {
            let Some(fk) = self.model.foreign_key(existing) else {
                return Ok(None);
            };
            if fk.principal_entity_type == principal {
                if let Some(fk) = self.model.foreign_key_mut(existing) {
                    fk.source = source.merge(Some(fk.source));
                    fk.properties_source = Some(source.merge(fk.properties_source));
                }
                return Ok(Some(existing));
            }
            if !source.overrides(Some(fk.source)) {
                trace!("Foreign key on the same properties configured at a higher source");
                return Ok(None);
            }
            if self.remove_foreign_key(existing, source).is_none() {
                return Ok(None);
            }
        }

        let Some(principal_key) = self.resolve_principal_key(principal, Some(&properties)) else {
            return Ok(None);
        };
        let shape = ForeignKeyShape {
            dependent,
            principal,
            properties: Some(properties),
            principal_key: Some(principal_key),
        };
        let Some(fk) = self.create_foreign_key(shape, Some(source), None, source, None) else {
            return Ok(None);
        };
        self.promote_derived_foreign_keys(fk, source);
        Ok(Some(fk))
    }

    /// Fold equivalent foreign keys declared on derived types into `fk`
    fn promote_derived_foreign_keys(&mut self, fk: ForeignKeyId, source: ConfigurationSource) {
        let Some(foreign_key) = self.model.foreign_key(fk).cloned() else {
            return;
        };
        let duplicates: Vec<ForeignKeyId> = self
            .model
            .all_derived_types(foreign_key.declaring_entity_type)
            .into_iter()
            .filter_map(|derived| self.model.entity_type(derived).map(|e| e.foreign_keys.clone()))
            .flatten()
            .filter(|other| {
                self.model.foreign_key(*other).is_some_and(|o| {
                    o.principal_entity_type == foreign_key.principal_entity_type
                        && o.properties == foreign_key.properties
                })
            })
            .collect();
        for duplicate in duplicates {
            if self.transaction(|mb| mb.merge_foreign_key(duplicate, fk, source)).is_none() {
                trace!("Derived foreign key kept, its navigations conflict with the base");
            }
        }
    }

    pub(super) fn create_foreign_key(
        &mut self,
        shape: ForeignKeyShape,
        properties_source: Option<ConfigurationSource>,
        principal_key_source: Option<ConfigurationSource>,
        source: ConfigurationSource,
        navigation_hint: Option<&str>,
    ) -> Option<ForeignKeyId> {
        let ForeignKeyShape {
            dependent,
            principal,
            properties,
            principal_key,
        } = shape;
        let principal_key = match principal_key {
            Some(key) => key,
            None => self.resolve_principal_key(principal, properties.as_deref())?,
        };
        let properties = match properties {
            Some(properties) => properties,
            None => self.create_shadow_foreign_key_properties(
                dependent,
                principal,
                principal_key,
                navigation_hint,
            )?,
        };

        let mut fk = ForeignKey::new(dependent, properties, principal, principal_key, source);
        fk.properties_source = properties_source;
        fk.principal_key_source = principal_key_source;
        let names = self.model.property_names(&fk.properties);
        let id = self.model.add_foreign_key(fk);
        debug!(
            "Added foreign key {:?} on '{}' referencing '{}' at {}",
            names,
            self.model.entity_type_name(dependent),
            self.model.entity_type_name(principal),
            source
        );
        Some(id)
    }

    /// The key on `principal` a relationship over `properties` should use,
    /// creating a shadow key when none fits
    fn resolve_principal_key(
        &mut self,
        principal: EntityTypeId,
        properties: Option<&[PropertyId]>,
    ) -> Option<KeyId> {
        let existing = match properties {
            None => self
                .model
                .primary_key(principal)
                .or_else(|| self.model.keys(principal).first().copied()),
            Some(properties) => {
                let compatible = |key: &KeyId| self.model.are_compatible(properties, *key);
                self.model
                    .primary_key(principal)
                    .filter(compatible)
                    .or_else(|| self.model.keys(principal).into_iter().find(compatible))
            }
        };
        if existing.is_some() {
            return existing;
        }

        let types = match properties {
            Some(properties) => self.model.property_types(properties),
            None => vec![ClrType::Int32],
        };
        self.create_shadow_key(principal, &types)
    }

    /// Add an implicit key of fresh shadow properties to the root of
    /// `principal`'s hierarchy
    pub(crate) fn create_shadow_key(
        &mut self,
        principal: EntityTypeId,
        types: &[ClrType],
    ) -> Option<KeyId> {
        let root = self.model.root_type(principal);
        self.model.entity_type(root)?;
        let base_name = self.config.shadow_key_name.clone();

        let mut properties = Vec::with_capacity(types.len());
        for clr_type in types {
            let name = self.unique_member_name(root, &base_name);
            let clr_type = clr_type.unwrap_nullable().clone();
            let reference_type = clr_type.is_nullable_type();
            let id = self
                .model
                .add_property(root, &name, clr_type, true, ConfigurationSource::Convention);
            if reference_type {
                if let Some(property) = self.model.property_mut(id) {
                    property.is_nullable =
                        Some(Sourced::new(false, ConfigurationSource::Convention));
                }
            }
            properties.push(id);
        }

        let names = self.model.property_names(&properties);
        let key = self
            .model
            .add_key(root, properties, ConfigurationSource::Convention);
        if let Some(k) = self.model.key_mut(key) {
            k.implicit = true;
        }
        debug!(
            "Added shadow key {:?} on '{}'",
            names,
            self.model.entity_type_name(root)
        );
        Some(key)
    }

    fn create_shadow_foreign_key_properties(
        &mut self,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        principal_key: KeyId,
        navigation_hint: Option<&str>,
    ) -> Option<Vec<PropertyId>> {
        let prefix = match navigation_hint {
            Some(navigation) => navigation.to_string(),
            None => self.model.entity_type(principal)?.display_name().to_string(),
        };
        let key_properties = self.model.key(principal_key)?.properties.clone();

        let mut properties = Vec::with_capacity(key_properties.len());
        for key_property in key_properties {
            let key_property = self.model.property(key_property)?;
            let base_name = shadow_property_name(&prefix, &key_property.name);
            let clr_type = key_property.clr_type.make_nullable();
            let name = self.unique_member_name(dependent, &base_name);
            properties.push(self.model.add_property(
                dependent,
                &name,
                clr_type,
                true,
                ConfigurationSource::Convention,
            ));
        }
        Some(properties)
    }

    /// Swap `old` for a foreign key of the given shape.
    ///
    /// The old node goes first, then its unused shadow properties; the new
    /// node takes over the facets and navigations. With `inverted` the two
    /// navigations trade direction.
    pub(super) fn replace_foreign_key(
        &mut self,
        old: ForeignKeyId,
        shape: ForeignKeyShape,
        properties_source: Option<ConfigurationSource>,
        principal_key_source: Option<ConfigurationSource>,
        source: ConfigurationSource,
        inverted: bool,
    ) -> Option<ForeignKeyId> {
        let previous = self.model.foreign_key(old)?.clone();
        let navigations: Vec<Navigation> = previous
            .navigation_ids()
            .into_iter()
            .filter_map(|id| self.model.navigation(id).cloned())
            .collect();
        let hint = navigations
            .iter()
            .find(|n| n.points_to_principal != inverted)
            .map(|n| n.name.clone());

        self.model.remove_foreign_key_node(old);
        let kept = shape.properties.clone().unwrap_or_default();
        let stale: Vec<PropertyId> = previous
            .properties
            .iter()
            .copied()
            .filter(|p| !kept.contains(p))
            .collect();
        self.prune_shadow_properties(&stale);

        let new = self.create_foreign_key(
            shape,
            properties_source,
            principal_key_source,
            source.merge(Some(previous.source)),
            hint.as_deref(),
        )?;
        let fk = self.model.foreign_key_mut(new)?;
        fk.is_unique = previous.is_unique.clone();
        fk.is_required = previous.is_required.clone();
        fk.delete_behavior = previous.delete_behavior.clone();
        fk.principal_end_source = previous.principal_end_source;
        let (dependent, principal, principal_key) =
            (fk.declaring_entity_type, fk.principal_entity_type, fk.principal_key);

        for navigation in navigations {
            let points_to_principal = navigation.points_to_principal != inverted;
            let owner = if points_to_principal { dependent } else { principal };
            self.model.add_navigation(
                owner,
                &navigation.name,
                new,
                points_to_principal,
                navigation.is_collection,
                navigation.source,
            );
        }

        if previous.principal_key != principal_key {
            self.prune_implicit_key(previous.principal_key);
        }
        self.reconcile_required(new)?;
        debug!(
            "Replaced foreign key {:?} on '{}' with {:?} on '{}'",
            self.model.property_names(&previous.properties),
            self.model.entity_type_name(previous.declaring_entity_type),
            self.model
                .foreign_key(new)
                .map(|f| self.model.property_names(&f.properties))
                .unwrap_or_default(),
            self.model.entity_type_name(dependent)
        );
        Some(new)
    }

    /// Remove `fk`, its navigations, its unused shadow properties and its
    /// implicit principal key
    pub(crate) fn remove_foreign_key(
        &mut self,
        fk: ForeignKeyId,
        source: ConfigurationSource,
    ) -> Option<ConfigurationSource> {
        let existing = self.model.foreign_key(fk)?.source;
        if !source.overrides(Some(existing)) {
            trace!("Foreign key configured at {}, {} removal rejected", existing, source);
            return None;
        }
        let removed = self.model.remove_foreign_key_node(fk)?;
        debug!(
            "Removed foreign key {:?} from '{}'",
            self.model.property_names(&removed.properties),
            self.model.entity_type_name(removed.declaring_entity_type)
        );
        self.prune_shadow_properties(&removed.properties);
        self.prune_implicit_key(removed.principal_key);
        Some(removed.source)
    }

    /// Fold `from` into `into`: navigations move into free slots, unset
    /// facets are filled in, and `from` is removed
    pub(super) fn merge_foreign_key(
        &mut self,
        from: ForeignKeyId,
        into: ForeignKeyId,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let merged = self.model.foreign_key(from)?.clone();
        let target = self.model.foreign_key(into)?.clone();
        let same_orientation = self
            .model
            .in_same_hierarchy(merged.declaring_entity_type, target.declaring_entity_type)
            && self
                .model
                .in_same_hierarchy(merged.principal_entity_type, target.principal_entity_type);
        let navigations: Vec<Navigation> = merged
            .navigation_ids()
            .into_iter()
            .filter_map(|id| self.model.navigation(id).cloned())
            .collect();

        self.model.remove_foreign_key_node(from);

        for navigation in navigations {
            let points_to_principal = navigation.points_to_principal == same_orientation;
            let slot = self.model.foreign_key(into).and_then(|f| {
                if points_to_principal {
                    f.dependent_to_principal
                } else {
                    f.principal_to_dependent
                }
            });
            let (owner, other_end) = if points_to_principal {
                (target.declaring_entity_type, target.principal_entity_type)
            } else {
                (target.principal_entity_type, target.declaring_entity_type)
            };
            if slot.is_none()
                && self.navigation_fits(owner, &navigation.name, other_end, points_to_principal)
            {
                self.model.add_navigation(
                    owner,
                    &navigation.name,
                    into,
                    points_to_principal,
                    navigation.is_collection,
                    navigation.source,
                );
            } else if !source.overrides(Some(navigation.source)) {
                return None;
            }
        }

        let fk = self.model.foreign_key_mut(into)?;
        fk.source = fk.source.merge(Some(merged.source));
        if same_orientation {
            if fk.is_unique.is_none() {
                fk.is_unique = merged.is_unique.clone();
            }
            if fk.is_required.is_none() {
                fk.is_required = merged.is_required.clone();
            }
            if fk.delete_behavior.is_none() {
                fk.delete_behavior = merged.delete_behavior.clone();
            }
        }

        self.prune_shadow_properties(&merged.properties);
        self.prune_implicit_key(merged.principal_key);
        debug!(
            "Merged foreign key {:?} on '{}' into an existing relationship",
            self.model.property_names(&merged.properties),
            self.model.entity_type_name(merged.declaring_entity_type)
        );
        self.reconcile_required(into)?;
        Some(into)
    }

    // ------------------------------------------------------------------------
    // Identity-changing setters
    // ------------------------------------------------------------------------

    pub(super) fn set_foreign_key_properties(
        &mut self,
        fk: ForeignKeyId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let foreign_key = self.model.foreign_key(fk)?;
        if foreign_key.properties == properties {
            let fk_mut = self.model.foreign_key_mut(fk)?;
            fk_mut.properties_source = Some(source.merge(fk_mut.properties_source));
            return Some(fk);
        }
        if !source.overrides(foreign_key.properties_source) {
            trace!(
                "Foreign key properties configured at {:?}, {} request rejected",
                foreign_key.properties_source,
                source
            );
            return None;
        }
        let dependent = foreign_key.declaring_entity_type;
        let principal = foreign_key.principal_entity_type;
        let principal_key = foreign_key.principal_key;
        let principal_key_source = foreign_key.principal_key_source;

        self.transaction(|mb| {
            let duplicate = mb
                .model
                .find_foreign_key(dependent, &properties)
                .filter(|other| *other != fk);
            if let Some(other) = duplicate {
                let other_fk = mb.model.foreign_key(other)?;
                if other_fk.principal_entity_type == principal {
                    let merged = mb.merge_foreign_key(fk, other, source)?;
                    let fk_mut = mb.model.foreign_key_mut(merged)?;
                    fk_mut.properties_source = Some(source.merge(fk_mut.properties_source));
                    return Some(merged);
                }
                if !source.overrides(Some(other_fk.source)) {
                    return None;
                }
                mb.remove_foreign_key(other, source)?;
            }

            let (principal_key, principal_key_source) =
                if mb.model.are_compatible(&properties, principal_key) {
                    (Some(principal_key), principal_key_source)
                } else if source.overrides(principal_key_source) {
                    (None, None)
                } else {
                    return None;
                };
            let shape = ForeignKeyShape {
                dependent,
                principal,
                properties: Some(properties),
                principal_key,
            };
            mb.replace_foreign_key(fk, shape, Some(source), principal_key_source, source, false)
        })
    }

    pub(super) fn set_principal_key(
        &mut self,
        fk: ForeignKeyId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<ForeignKeyId>> {
        let Some(foreign_key) = self.model.foreign_key(fk) else {
            return Ok(None);
        };
        let current_key = foreign_key.principal_key;
        let current_source = foreign_key.principal_key_source;
        let principal = foreign_key.principal_entity_type;

        if self.model.key(current_key).is_some_and(|k| k.properties == properties) {
            if let Some(fk_mut) = self.model.foreign_key_mut(fk) {
                fk_mut.principal_key_source = Some(source.merge(current_source));
            }
            if let Some(key) = self.model.key_mut(current_key) {
                key.implicit = false;
            }
            return Ok(Some(fk));
        }
        if !source.overrides(current_source) {
            trace!(
                "Principal key configured at {:?}, {} request rejected",
                current_source,
                source
            );
            return Ok(None);
        }

        self.try_transaction(|mb| {
            let Some(key) = mb.has_key_preserving(principal, properties, source, Some(current_key))?
            else {
                return Ok(None);
            };
            let Some(foreign_key) = mb.model.foreign_key(fk) else {
                return Ok(None);
            };
            let dependent = foreign_key.declaring_entity_type;
            let dependent_properties = foreign_key.properties.clone();
            let properties_source = foreign_key.properties_source;

            let (properties, properties_source) =
                if mb.model.are_compatible(&dependent_properties, key) {
                    (Some(dependent_properties), properties_source)
                } else if source.overrides(properties_source) {
                    (None, None)
                } else {
                    return Ok(None);
                };
            let shape = ForeignKeyShape {
                dependent,
                principal,
                properties,
                principal_key: Some(key),
            };
            Ok(mb.replace_foreign_key(fk, shape, properties_source, Some(source), source, false))
        })
    }

    /// Make `entity` the dependent (or principal) end of `fk`
    pub(super) fn set_principal_end(
        &mut self,
        fk: ForeignKeyId,
        entity: EntityTypeId,
        as_dependent: bool,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<ForeignKeyId>> {
        let Some(foreign_key) = self.model.foreign_key(fk) else {
            return Ok(None);
        };
        let (same_end, other_end) = if as_dependent {
            (foreign_key.declaring_entity_type, foreign_key.principal_entity_type)
        } else {
            (foreign_key.principal_entity_type, foreign_key.declaring_entity_type)
        };

        if entity == same_end {
            if let Some(fk_mut) = self.model.foreign_key_mut(fk) {
                fk_mut.principal_end_source = Some(source.merge(fk_mut.principal_end_source));
            }
            return Ok(Some(fk));
        }
        if entity != other_end {
            return Err(MetadataError::EntityTypeNotInRelationship {
                entity: self.model.entity_type_name(entity).to_string(),
                dependent: self
                    .model
                    .entity_type_name(foreign_key.declaring_entity_type)
                    .to_string(),
                principal: self
                    .model
                    .entity_type_name(foreign_key.principal_entity_type)
                    .to_string(),
            });
        }
        Ok(self.invert(fk, source))
    }

    /// Swap the dependent and principal ends of `fk`
    fn invert(&mut self, fk: ForeignKeyId, source: ConfigurationSource) -> Option<ForeignKeyId> {
        let foreign_key = self.model.foreign_key(fk)?.clone();
        let allowed = source.overrides(foreign_key.principal_end_source)
            && source.overrides(foreign_key.properties_source)
            && source.overrides(foreign_key.principal_key_source);
        if !allowed {
            trace!("Relationship ends configured at a higher source, {} inversion rejected", source);
            return None;
        }

        self.transaction(|mb| {
            if let Some(id) = foreign_key.principal_to_dependent {
                let navigation = mb.model.navigation(id)?;
                if navigation.is_collection {
                    if !source.overrides(Some(navigation.source)) {
                        return None;
                    }
                    mb.model.remove_navigation_node(id);
                }
            }
            // The old reference to the principal becomes a reference to a
            // single dependent.
            if let Some(id) = foreign_key.dependent_to_principal {
                let unique = mb.model.foreign_key_mut(fk)?.is_unique.configure(true, source);
                if !unique {
                    let navigation = mb.model.navigation(id)?;
                    if !source.overrides(Some(navigation.source)) {
                        return None;
                    }
                    mb.model.remove_navigation_node(id);
                }
            }

            let shape = ForeignKeyShape {
                dependent: foreign_key.principal_entity_type,
                principal: foreign_key.declaring_entity_type,
                properties: None,
                principal_key: None,
            };
            let new = mb.replace_foreign_key(fk, shape, None, None, source, true)?;
            mb.model.foreign_key_mut(new)?.principal_end_source = Some(source);
            debug!(
                "Inverted relationship, '{}' is now the dependent",
                mb.model.entity_type_name(foreign_key.principal_entity_type)
            );
            Some(new)
        })
    }

    // ------------------------------------------------------------------------
    // Facets
    // ------------------------------------------------------------------------

    /// Configure uniqueness, dropping a principal-to-dependent navigation
    /// whose multiplicity no longer fits
    pub(super) fn set_unique(
        &mut self,
        fk: ForeignKeyId,
        unique: bool,
        source: ConfigurationSource,
    ) -> Option<()> {
        let foreign_key = self.model.foreign_key(fk)?;
        if !foreign_key.is_unique.can_configure(&unique, source) {
            trace!("Uniqueness configured at a higher source, {} request rejected", source);
            return None;
        }
        if let Some(id) = foreign_key.principal_to_dependent {
            let navigation = self.model.navigation(id)?;
            if navigation.is_collection == unique {
                if !source.overrides(Some(navigation.source)) {
                    return None;
                }
                self.model.remove_navigation_node(id);
            }
        }
        self.model
            .foreign_key_mut(fk)?
            .is_unique
            .configure(unique, source)
            .then_some(())
    }

    /// Configure required-ness, adjusting dependent property nullability.
    ///
    /// When no dependent property can become nullable the relationship moves
    /// to fresh shadow properties.
    pub(super) fn set_required(
        &mut self,
        fk: ForeignKeyId,
        required: bool,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        self.transaction(|mb| {
            let foreign_key = mb.model.foreign_key(fk)?;
            if !foreign_key.is_required.can_configure(&required, source) {
                trace!("Required-ness configured at a higher source, {} request rejected", source);
                return None;
            }
            let properties = foreign_key.properties.clone();
            let properties_source = foreign_key.properties_source;
            let mut fk = fk;

            if required {
                for property in mb.nullable_properties(&properties) {
                    if !mb.configure_nullability(property, false, source) {
                        return None;
                    }
                }
            } else if mb.nullable_properties(&properties).is_empty() {
                let capable = mb.nullable_capable_properties(&properties);
                if !capable.is_empty() {
                    for property in capable {
                        if !mb.configure_nullability(property, true, source) {
                            return None;
                        }
                    }
                } else if source.overrides(properties_source) {
                    let foreign_key = mb.model.foreign_key_mut(fk)?;
                    foreign_key.is_required = None;
                    let shape = ForeignKeyShape {
                        dependent: foreign_key.declaring_entity_type,
                        principal: foreign_key.principal_entity_type,
                        properties: None,
                        principal_key: Some(foreign_key.principal_key),
                    };
                    let principal_key_source = foreign_key.principal_key_source;
                    fk = mb.replace_foreign_key(fk, shape, None, principal_key_source, source, false)?;
                } else {
                    return None;
                }
            }

            mb.model
                .foreign_key_mut(fk)?
                .is_required
                .configure(required, source)
                .then_some(fk)
        })
    }

    /// Bring a configured required-ness in line with the dependent
    /// properties. Whichever was configured at the higher source wins; on a
    /// tie the required-ness wins.
    pub(super) fn reconcile_required(&mut self, fk: ForeignKeyId) -> Option<()> {
        let foreign_key = self.model.foreign_key(fk)?;
        let Some(required) = foreign_key.is_required.clone() else {
            return Some(());
        };
        let properties_source = foreign_key
            .properties_source
            .unwrap_or(ConfigurationSource::Convention);
        let properties = foreign_key.properties.clone();
        let nullable = self.nullable_properties(&properties);

        if required.value {
            if nullable.is_empty() {
                return Some(());
            }
            if required.source >= properties_source {
                for property in nullable {
                    if !self.configure_nullability(property, false, required.source) {
                        return None;
                    }
                }
            } else {
                self.model.foreign_key_mut(fk)?.is_required = None;
            }
        } else {
            if !nullable.is_empty() {
                return Some(());
            }
            let capable = self.nullable_capable_properties(&properties);
            if !capable.is_empty() && required.source >= properties_source {
                for property in capable {
                    if !self.configure_nullability(property, true, required.source) {
                        return None;
                    }
                }
            } else if required.source > properties_source {
                return None;
            } else {
                self.model.foreign_key_mut(fk)?.is_required = None;
            }
        }
        Some(())
    }

    fn nullable_properties(&self, properties: &[PropertyId]) -> Vec<PropertyId> {
        properties
            .iter()
            .copied()
            .filter(|id| self.model.property(*id).is_some_and(|p| p.is_nullable()))
            .collect()
    }

    /// Non-nullable properties whose CLR type accepts null
    fn nullable_capable_properties(&self, properties: &[PropertyId]) -> Vec<PropertyId> {
        properties
            .iter()
            .copied()
            .filter(|id| {
                self.model
                    .property(*id)
                    .is_some_and(|p| p.clr_type.is_nullable_type() && !p.is_nullable())
                    && self.model.keys_containing(*id).is_empty()
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{model_builder, CUSTOMER, ORDER};
    use pretty_assertions::assert_eq;
    use ConfigurationSource::*;

    fn customer_and_order(mb: &mut ModelBuilder) -> (EntityTypeId, EntityTypeId) {
        let customer = mb.entity(CUSTOMER, Explicit).unwrap().id();
        let order = mb.entity(ORDER, Explicit).unwrap().id();
        (customer, order)
    }

    fn names(mb: &ModelBuilder, properties: &[PropertyId]) -> Vec<String> {
        mb.model().property_names(properties)
    }

    #[test]
    fn test_has_foreign_key_with_composite_principal_key() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let pk = mb
            .entity_type_builder(customer)
            .unwrap()
            .primary_key(&["Id", "Unique"], Convention)
            .unwrap()
            .unwrap()
            .id();
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        order_builder.property("CustomerId", None, Convention).unwrap();
        order_builder.property("CustomerUnique", None, Convention).unwrap();

        let fk = order_builder
            .has_foreign_key(CUSTOMER, &["CustomerId", "CustomerUnique"], Explicit)
            .unwrap()
            .unwrap()
            .id();

        let foreign_key = mb.model().foreign_key(fk).unwrap();
        assert_eq!(
            names(&mb, foreign_key.properties()),
            vec!["CustomerId".to_string(), "CustomerUnique".to_string()]
        );
        assert_eq!(foreign_key.principal_key(), pk);
        assert_eq!(foreign_key.principal_entity_type(), customer);
        assert_eq!(foreign_key.properties_configuration_source(), Some(Explicit));
    }

    #[test]
    fn test_has_foreign_key_returns_same_relationship() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let first = order_builder
            .has_foreign_key(customer, &["CustomerId"], Convention)
            .unwrap()
            .unwrap()
            .id();
        let second = order_builder
            .has_foreign_key(customer, &["CustomerId"], DataAnnotation)
            .unwrap()
            .unwrap()
            .id();

        assert_eq!(first, second);
        assert_eq!(
            mb.model().foreign_key(first).unwrap().configuration_source(),
            DataAnnotation
        );
    }

    #[test]
    fn test_principal_without_key_gets_shadow_key() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let fk = mb
            .entity_type_builder(order)
            .unwrap()
            .relationship(customer, Some("Customer"), None, Convention)
            .unwrap()
            .unwrap()
            .id();

        let foreign_key = mb.model().foreign_key(fk).unwrap();
        let key = mb.model().key(foreign_key.principal_key()).unwrap();
        assert!(key.is_implicit());
        assert_eq!(names(&mb, key.properties()), vec!["TempId".to_string()]);
        assert_eq!(names(&mb, foreign_key.properties()), vec!["CustomerTempId".to_string()]);

        let shadow = mb.model().property(foreign_key.properties()[0]).unwrap();
        assert!(shadow.is_shadow());
        assert_eq!(shadow.clr_type(), &ClrType::nullable(ClrType::Int32));
    }

    #[test]
    fn test_replacing_properties_carries_facets_and_navigations() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        mb.entity_type_builder(customer)
            .unwrap()
            .primary_key(&["Id"], Explicit)
            .unwrap();
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut relationship = order_builder
            .relationship(customer, Some("Customer"), Some("Orders"), Convention)
            .unwrap()
            .unwrap();
        let shadow = relationship.metadata().unwrap().properties().to_vec();
        relationship.delete_behavior(DeleteBehavior::Cascade, DataAnnotation).unwrap();

        let fk = relationship
            .has_foreign_key(&["CustomerId"], Convention)
            .unwrap()
            .unwrap()
            .id();

        let model = mb.model();
        assert_eq!(model.foreign_keys(order), vec![fk]);
        let foreign_key = model.foreign_key(fk).unwrap();
        assert_eq!(names(&mb, foreign_key.properties()), vec!["CustomerId".to_string()]);
        assert_eq!(foreign_key.delete_behavior(), DeleteBehavior::Cascade);
        assert_eq!(foreign_key.configured_is_unique(), Some(false));
        assert_eq!(model.navigation_name(foreign_key.dependent_to_principal()), Some("Customer"));
        assert_eq!(model.navigation_name(foreign_key.principal_to_dependent()), Some("Orders"));
        assert!(model.property(shadow[0]).is_none());
    }

    #[test]
    fn test_can_only_override_lower_source_foreign_key_properties() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut relationship = order_builder
            .has_foreign_key(customer, &["CustomerId"], DataAnnotation)
            .unwrap()
            .unwrap();

        assert!(relationship
            .has_foreign_key(&["CustomerUnique"], Convention)
            .unwrap()
            .is_none());
        let properties = relationship.metadata().unwrap().properties().to_vec();
        assert_eq!(names(&mb, &properties), vec!["CustomerId".to_string()]);
        assert!(mb.model().find_property(order, "CustomerUnique").is_none());
    }

    #[test]
    fn test_required_scenario_with_nullable_replacement() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        mb.entity_type_builder(customer)
            .unwrap()
            .primary_key(&["Id", "Unique"], Convention)
            .unwrap();
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        order_builder
            .property("NullableId", Some(ClrType::nullable(ClrType::Int32)), Explicit)
            .unwrap();
        order_builder
            .property("NullableUnique", Some(ClrType::nullable(ClrType::Guid)), Explicit)
            .unwrap();
        let mut relationship = order_builder
            .has_foreign_key(customer, &["CustomerId", "CustomerUnique"], Explicit)
            .unwrap()
            .unwrap();
        relationship.is_required(false, DataAnnotation).unwrap();

        assert!(relationship
            .has_foreign_key(&["NullableId", "NullableUnique"], Convention)
            .unwrap()
            .is_none());
        relationship
            .has_foreign_key(&["NullableId", "NullableUnique"], Explicit)
            .unwrap()
            .unwrap();
        let fk = relationship.id();
        assert!(!mb.model().is_required(fk));

        let fk = mb
            .relationship_builder(fk)
            .unwrap()
            .has_foreign_key(&["CustomerId", "CustomerUnique"], Explicit)
            .unwrap()
            .unwrap()
            .id();
        // CustomerUnique is nullable, so the relationship stays optional.
        assert!(!mb.model().is_required(fk));
        assert_eq!(
            mb.model().foreign_key(fk).unwrap().configured_is_required(),
            Some(false)
        );
    }

    #[test]
    fn test_required_follows_non_nullable_replacement() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        mb.entity_type_builder(customer)
            .unwrap()
            .primary_key(&["Id"], Convention)
            .unwrap();
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        order_builder
            .property("NullableId", Some(ClrType::nullable(ClrType::Int32)), Explicit)
            .unwrap();
        let mut relationship = order_builder
            .has_foreign_key(customer, &["NullableId"], DataAnnotation)
            .unwrap()
            .unwrap();
        relationship.is_required(false, DataAnnotation).unwrap();

        let fk = relationship
            .has_foreign_key(&["CustomerId"], Explicit)
            .unwrap()
            .unwrap()
            .id();

        assert!(mb.model().is_required(fk));
        assert_eq!(mb.model().foreign_key(fk).unwrap().configured_is_required(), None);
    }

    #[test]
    fn test_is_required_makes_properties_non_nullable() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let fk = mb
            .entity_type_builder(order)
            .unwrap()
            .has_foreign_key(customer, &["CustomerUnique"], Convention)
            .unwrap()
            .unwrap()
            .is_required(true, Convention)
            .unwrap()
            .id();

        let foreign_key = mb.model().foreign_key(fk).unwrap();
        let property = mb.model().property(foreign_key.properties()[0]).unwrap();
        assert!(!property.is_nullable());
        assert!(mb.model().is_required(fk));
    }

    #[test]
    fn test_optional_relationship_on_value_type_moves_to_shadow_properties() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        mb.entity_type_builder(customer)
            .unwrap()
            .primary_key(&["Id"], Explicit)
            .unwrap();
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut relationship = order_builder
            .has_foreign_key(customer, &["CustomerId"], Convention)
            .unwrap()
            .unwrap();
        relationship.is_required(false, Convention).unwrap();

        let foreign_key = relationship.metadata().unwrap();
        assert_eq!(foreign_key.configured_is_required(), Some(false));
        let properties = foreign_key.properties().to_vec();
        assert_eq!(names(&mb, &properties), vec!["CustomerId1".to_string()]);
        assert!(mb.model().property(properties[0]).unwrap().is_nullable());
    }

    #[test]
    fn test_optional_relationship_rejected_when_properties_are_fixed() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut relationship = order_builder
            .has_foreign_key(customer, &["CustomerId"], Explicit)
            .unwrap()
            .unwrap();

        assert!(relationship.is_required(false, DataAnnotation).is_none());
        assert_eq!(relationship.metadata().unwrap().configured_is_required(), None);
    }

    #[test]
    fn test_is_unique_false_removes_reference_navigation() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut relationship = order_builder
            .relationship(customer, None, Some("NotCollectionOrders"), Convention)
            .unwrap()
            .unwrap();
        assert_eq!(relationship.metadata().unwrap().configured_is_unique(), Some(true));

        assert!(relationship.is_unique(false, DataAnnotation).is_some());
        let foreign_key = relationship.metadata().unwrap();
        assert_eq!(foreign_key.principal_to_dependent(), None);
        assert!(!foreign_key.is_unique());
    }

    #[test]
    fn test_is_unique_rejected_by_higher_source_navigation() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut relationship = order_builder
            .relationship(customer, None, Some("Orders"), Explicit)
            .unwrap()
            .unwrap();

        assert!(relationship.is_unique(true, DataAnnotation).is_none());
        assert_eq!(relationship.metadata().unwrap().configured_is_unique(), Some(false));
    }

    #[test]
    fn test_has_principal_key_replaces_incompatible_dependent_properties() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut relationship = order_builder
            .relationship(customer, Some("Customer"), None, Convention)
            .unwrap()
            .unwrap();

        relationship.has_principal_key(&["Unique"], DataAnnotation).unwrap().unwrap();

        let foreign_key = relationship.metadata().unwrap();
        assert_eq!(foreign_key.principal_key_configuration_source(), Some(DataAnnotation));
        let properties = foreign_key.properties().to_vec();
        let key = foreign_key.principal_key();
        assert_eq!(names(&mb, &properties), vec!["CustomerUnique1".to_string()]);
        assert_eq!(
            mb.model().property(properties[0]).unwrap().clr_type(),
            &ClrType::nullable(ClrType::Guid)
        );
        // The shadow key made for the first shape is gone.
        assert_eq!(mb.model().keys(customer), vec![key]);
        assert!(mb.model().find_property(customer, "TempId").is_none());
    }

    #[test]
    fn test_has_principal_key_rejected_when_dependent_properties_are_fixed() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut relationship = order_builder
            .has_foreign_key(customer, &["CustomerId"], Explicit)
            .unwrap()
            .unwrap();

        assert!(relationship
            .has_principal_key(&["Unique"], DataAnnotation)
            .unwrap()
            .is_none());
        assert!(mb.model().find_property(customer, "Unique").is_none());
    }

    #[test]
    fn test_inverting_relationship() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut relationship = order_builder
            .relationship(customer, Some("Customer"), Some("Orders"), Convention)
            .unwrap()
            .unwrap();

        relationship.dependent_entity_type(customer, Convention).unwrap().unwrap();

        let foreign_key = relationship.metadata().unwrap();
        assert_eq!(foreign_key.declaring_entity_type(), customer);
        assert_eq!(foreign_key.principal_entity_type(), order);
        assert_eq!(foreign_key.dependent_to_principal(), None);
        assert_eq!(foreign_key.configured_is_unique(), Some(true));
        assert_eq!(foreign_key.principal_end_configuration_source(), Some(Convention));
        let navigation = foreign_key.principal_to_dependent().unwrap();
        let properties = foreign_key.properties().to_vec();

        let model = mb.model();
        let navigation = model.navigation(navigation).unwrap();
        assert_eq!(navigation.name(), "Customer");
        assert_eq!(navigation.declaring_entity_type(), order);
        assert!(model.find_navigation(customer, "Orders").is_none());
        assert!(model.foreign_keys(order).is_empty());
        assert_eq!(names(&mb, &properties), vec!["OrderTempId".to_string()]);
    }

    #[test]
    fn test_inversion_rejected_by_higher_source_end() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut relationship = order_builder
            .relationship(customer, None, None, Convention)
            .unwrap()
            .unwrap();
        relationship.principal_entity_type(customer, DataAnnotation).unwrap().unwrap();

        assert!(relationship.dependent_entity_type(customer, Convention).unwrap().is_none());
        assert!(relationship.dependent_entity_type(customer, DataAnnotation).unwrap().is_some());
        assert_eq!(relationship.metadata().unwrap().declaring_entity_type(), customer);
    }

    #[test]
    fn test_unrelated_entity_type_is_an_error() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let zebra = mb.entity("Zebra", Explicit).unwrap().id();
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut relationship = order_builder
            .relationship(customer, None, None, Convention)
            .unwrap()
            .unwrap();

        assert!(matches!(
            relationship.dependent_entity_type(zebra, Explicit).map(|r| r.is_some()),
            Err(MetadataError::EntityTypeNotInRelationship { .. })
        ));
    }

    #[test]
    fn test_removing_foreign_key_prunes_shadow_state() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let fk = mb
            .entity_type_builder(order)
            .unwrap()
            .relationship(customer, Some("Customer"), None, Convention)
            .unwrap()
            .unwrap()
            .id();

        let mut order_builder = mb.entity_type_builder(order).unwrap();
        assert_eq!(order_builder.remove_foreign_key(fk, Convention), Some(Convention));

        let model = mb.model();
        assert!(model.properties(order).is_empty());
        assert!(model.navigations(order).is_empty());
        assert!(model.keys(customer).is_empty());
        assert!(model.properties(customer).is_empty());
    }

    #[test]
    fn test_shadow_property_survives_while_referenced() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let fk = mb
            .entity_type_builder(order)
            .unwrap()
            .relationship(customer, None, None, Convention)
            .unwrap()
            .unwrap()
            .id();
        let shadow = mb.model().foreign_key(fk).unwrap().properties().to_vec();
        mb.entity_type_builder(order)
            .unwrap()
            .has_index(&shadow, Convention)
            .unwrap()
            .unwrap();

        mb.entity_type_builder(order).unwrap().remove_foreign_key(fk, Convention);
        assert!(mb.model().property(shadow[0]).is_some());
    }

    #[test]
    fn test_cannot_remove_higher_source_foreign_key() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let fk = mb
            .entity_type_builder(order)
            .unwrap()
            .has_foreign_key(customer, &["CustomerId"], Explicit)
            .unwrap()
            .unwrap()
            .id();

        let mut order_builder = mb.entity_type_builder(order).unwrap();
        assert_eq!(order_builder.remove_foreign_key(fk, DataAnnotation), None);
        assert!(mb.model().foreign_key(fk).is_some());
    }

    #[test]
    fn test_delete_behavior_source_gating() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let mut relationship = order_builder
            .has_foreign_key(customer, &["CustomerId"], Convention)
            .unwrap()
            .unwrap();

        assert!(relationship.delete_behavior(DeleteBehavior::Cascade, DataAnnotation).is_some());
        assert!(relationship.delete_behavior(DeleteBehavior::SetNull, Convention).is_none());
        assert_eq!(relationship.metadata().unwrap().delete_behavior(), DeleteBehavior::Cascade);
    }

    #[test]
    fn test_has_foreign_key_moves_properties_from_other_principal() {
        let mut mb = model_builder();
        let (customer, order) = customer_and_order(&mut mb);
        let zebra = mb.entity("Zebra", Explicit).unwrap().id();
        let mut order_builder = mb.entity_type_builder(order).unwrap();
        let old = order_builder
            .has_foreign_key(customer, &["CustomerId"], Convention)
            .unwrap()
            .unwrap()
            .id();
        let new = order_builder
            .has_foreign_key(zebra, &["CustomerId"], DataAnnotation)
            .unwrap()
            .unwrap()
            .id();

        assert_ne!(old, new);
        assert!(mb.model().foreign_key(old).is_none());
        assert_eq!(mb.model().foreign_key(new).unwrap().principal_entity_type(), zebra);
    }
}
