//! Entity type builder
//!
//! Besides the handle itself this file holds the [`ModelBuilder`] halves of
//! the entity-level operations: finding or adding properties, ignoring
//! members, and moving an entity type in or out of a hierarchy.

use super::{
    EntityTypeRef, IndexBuilder, KeyBuilder, ModelBuilder, PropertyBuilder, PropertyRef,
    RelationshipBuilder,
};
use crate::arena::{EntityTypeId, ForeignKeyId, IndexId, KeyId, NavigationId, PropertyId};
use crate::entity_type::EntityType;
use keystone_core::{ClrType, ConfigurationSource, MemberKind, MetadataError, MetadataResult};
use tracing::{debug, trace};

// ============================================================================
// EntityTypeBuilder
// ============================================================================

/// Handle for configuring one entity type
pub struct EntityTypeBuilder<'a> {
    pub(super) mb: &'a mut ModelBuilder,
    pub(super) id: EntityTypeId,
}

impl<'a> EntityTypeBuilder<'a> {
    pub(crate) fn new(mb: &'a mut ModelBuilder, id: EntityTypeId) -> Self {
        Self { mb, id }
    }

    pub fn id(&self) -> EntityTypeId {
        self.id
    }

    pub fn metadata(&self) -> Option<&EntityType> {
        self.mb.model.entity_type(self.id)
    }

    /// Get or add the property `name`.
    ///
    /// Without a type the CLR member decides it; a type that differs from
    /// the CLR member makes a shadow property.
    pub fn property(
        &mut self,
        name: &str,
        clr_type: Option<ClrType>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<PropertyBuilder<'_>>> {
        let id = self.mb.get_or_add_property(self.id, name, clr_type, source)?;
        Ok(id.map(|id| PropertyBuilder::new(&mut *self.mb, id)))
    }

    /// Ignore a property or navigation, removing it and whatever depends on it
    pub fn ignore(&mut self, member: &str, source: ConfigurationSource) -> bool {
        self.mb.ignore_member(self.id, member, source)
    }

    pub fn has_key<P: PropertyRef>(
        &mut self,
        properties: &[P],
        source: ConfigurationSource,
    ) -> MetadataResult<Option<KeyBuilder<'_>>> {
        let entity = self.id;
        let key = self.mb.try_transaction(|mb| {
            mb.ensure_not_derived(entity)?;
            let Some(properties) = mb.resolve_properties(entity, properties, source, "key")? else {
                return Ok(None);
            };
            mb.has_key(entity, properties, source)
        })?;
        Ok(key.map(|id| KeyBuilder::new(&mut *self.mb, id)))
    }

    pub fn primary_key<P: PropertyRef>(
        &mut self,
        properties: &[P],
        source: ConfigurationSource,
    ) -> MetadataResult<Option<KeyBuilder<'_>>> {
        let entity = self.id;
        let key = self.mb.try_transaction(|mb| {
            mb.ensure_not_derived(entity)?;
            let Some(properties) =
                mb.resolve_properties(entity, properties, source, "primary key")?
            else {
                return Ok(None);
            };
            mb.set_primary_key(entity, properties, source)
        })?;
        Ok(key.map(|id| KeyBuilder::new(&mut *self.mb, id)))
    }

    pub fn has_index<P: PropertyRef>(
        &mut self,
        properties: &[P],
        source: ConfigurationSource,
    ) -> MetadataResult<Option<IndexBuilder<'_>>> {
        let entity = self.id;
        let index = self.mb.try_transaction(|mb| {
            let Some(properties) = mb.resolve_properties(entity, properties, source, "index")? else {
                return Ok(None);
            };
            Ok(Some(mb.has_index(entity, properties, source)))
        })?;
        Ok(index.map(|id| IndexBuilder::new(&mut *self.mb, id)))
    }

    /// Get or add the foreign key made of `properties` pointing at `principal`
    pub fn has_foreign_key<E: EntityTypeRef, P: PropertyRef>(
        &mut self,
        principal: E,
        properties: &[P],
        source: ConfigurationSource,
    ) -> MetadataResult<Option<RelationshipBuilder<'_>>> {
        let entity = self.id;
        let fk = self.mb.try_transaction(|mb| {
            let Some(principal) = principal.resolve_entity_type(mb, source)? else {
                return Ok(None);
            };
            let Some(properties) =
                mb.resolve_properties(entity, properties, source, "foreign key")?
            else {
                return Ok(None);
            };
            mb.has_foreign_key(entity, principal, properties, source)
        })?;
        Ok(fk.map(|id| RelationshipBuilder::new(&mut *self.mb, id)))
    }

    /// Find the relationship to `principal` with exactly these navigations,
    /// or create one
    pub fn relationship<E: EntityTypeRef>(
        &mut self,
        principal: E,
        navigation_to_principal: Option<&str>,
        navigation_to_dependent: Option<&str>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<RelationshipBuilder<'_>>> {
        let entity = self.id;
        let fk = self.mb.try_transaction(|mb| {
            let Some(principal) = principal.resolve_entity_type(mb, source)? else {
                return Ok(None);
            };
            mb.relationship(
                entity,
                principal,
                navigation_to_principal,
                navigation_to_dependent,
                source,
            )
        })?;
        Ok(fk.map(|id| RelationshipBuilder::new(&mut *self.mb, id)))
    }

    /// Set or clear (`None`) the base type
    pub fn has_base_type<E: EntityTypeRef>(
        &mut self,
        base: Option<E>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<&mut Self>> {
        let entity = self.id;
        let result = self.mb.try_transaction(|mb| {
            let base = match base {
                Some(base) => match base.resolve_entity_type(mb, source)? {
                    Some(id) => Some(id),
                    None => return Ok(None),
                },
                None => None,
            };
            mb.set_base_type(entity, base, source)
        })?;
        Ok(result.map(|_| self))
    }

    /// Whether a navigation `name` could be added without replacing anything
    pub fn can_add_navigation(&self, name: &str, source: ConfigurationSource) -> bool {
        !self.mb.is_ignored(self.id, name, source)
            && self.mb.model.find_navigation(self.id, name).is_none()
    }

    /// Whether a navigation `name` could be added, replacing one configured
    /// at the same or a lower source
    pub fn can_add_or_replace_navigation(&self, name: &str, source: ConfigurationSource) -> bool {
        if self.mb.is_ignored(self.id, name, source) {
            return false;
        }
        match self.mb.model.find_navigation(self.id, name) {
            Some(existing) => self
                .mb
                .model
                .navigation(existing)
                .is_some_and(|navigation| source.overrides(Some(navigation.source))),
            None => true,
        }
    }

    pub fn remove_key(&mut self, key: KeyId, source: ConfigurationSource) -> Option<ConfigurationSource> {
        self.mb.remove_key(key, source)
    }

    pub fn remove_foreign_key(
        &mut self,
        fk: ForeignKeyId,
        source: ConfigurationSource,
    ) -> Option<ConfigurationSource> {
        self.mb.remove_foreign_key(fk, source)
    }

    pub fn remove_index(&mut self, index: IndexId, source: ConfigurationSource) -> Option<ConfigurationSource> {
        self.mb.remove_index(index, source)
    }
}

// ============================================================================
// ModelBuilder: properties and members
// ============================================================================

impl ModelBuilder {
    pub(crate) fn get_or_add_property(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        clr_type: Option<ClrType>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<PropertyId>> {
        if self.model.entity_type(entity).is_none() {
            return Err(MetadataError::EntityTypeNotFound(entity.to_string()));
        }
        if self.is_ignored(entity, name, source) {
            trace!(
                "Property '{}.{}' is ignored, {} request rejected",
                self.model.entity_type_name(entity),
                name,
                source
            );
            return Ok(None);
        }

        if let Some(existing) = self.model.find_property(entity, name) {
            let Some(property) = self.model.property_mut(existing) else {
                return Ok(None);
            };
            if let Some(clr_type) = clr_type {
                if property.clr_type != clr_type {
                    if !source.overrides(property.clr_type_source) {
                        trace!("CLR type of '{}' configured at a higher source", name);
                        return Ok(None);
                    }
                    property.clr_type = clr_type;
                    property.clr_type_source = Some(source);
                } else {
                    property.clr_type_source = Some(source.merge(property.clr_type_source));
                }
            }
            property.source = source.merge(Some(property.source));
            self.clear_ignored(entity, name);
            return Ok(Some(existing));
        }

        let entity_name = self.model.entity_type_name(entity).to_string();
        if self.model.find_navigation(entity, name).is_some() {
            return Err(MetadataError::MemberIsNavigation {
                entity: entity_name,
                member: name.to_string(),
            });
        }

        let explicit_type = clr_type.is_some();
        let (clr_type, is_shadow) = match (self.member_kind(entity, name), clr_type) {
            (MemberKind::Reference(_) | MemberKind::Collection(_), _) => {
                return Err(MetadataError::MemberIsNavigation {
                    entity: entity_name,
                    member: name.to_string(),
                });
            }
            (MemberKind::Scalar(member_type), Some(requested)) if requested != member_type => {
                (requested, true)
            }
            (MemberKind::Scalar(member_type), _) => (member_type, false),
            (MemberKind::NotFound, Some(requested)) => (requested, true),
            (MemberKind::NotFound, None) => {
                let has_clr_type = self
                    .model
                    .entity_type(entity)
                    .is_some_and(|e| e.has_clr_type);
                return Err(if has_clr_type {
                    MetadataError::no_clr_property(entity_name, name)
                } else {
                    MetadataError::property_not_found(entity_name, name)
                });
            }
        };

        let id = self.model.add_property(entity, name, clr_type, is_shadow, source);
        if explicit_type {
            if let Some(property) = self.model.property_mut(id) {
                property.clr_type_source = Some(source);
            }
        }
        self.clear_ignored(entity, name);
        debug!(
            "Added {}property '{}.{}' at {}",
            if is_shadow { "shadow " } else { "" },
            entity_name,
            name,
            source
        );

        for duplicate in self.model.find_derived_properties(entity, name) {
            self.merge_property_into(duplicate, id);
        }
        Ok(Some(id))
    }

    /// Fold `from` into `into` and repoint everything that used `from`
    pub(crate) fn merge_property_into(&mut self, from: PropertyId, into: PropertyId) {
        let Some(removed) = self.model.property(from).cloned() else {
            return;
        };
        if let Some(target) = self.model.property_mut(into) {
            target.merge_facets_from(&removed);
        }
        self.model.replace_property_references(from, into);
        self.model.remove_property_node(from);
        debug!(
            "Merged property '{}.{}' into '{}'",
            self.model.entity_type_name(removed.declaring_entity_type),
            removed.name,
            self.model
                .property(into)
                .map(|p| self.model.entity_type_name(p.declaring_entity_type))
                .unwrap_or_default()
        );
    }

    pub(crate) fn ensure_not_derived(&self, entity: EntityTypeId) -> MetadataResult<()> {
        match self.model.entity_type(entity) {
            Some(e) if e.base_type.is_some() => Err(MetadataError::DerivedEntityTypeKey {
                entity: e.name.clone(),
            }),
            Some(_) => Ok(()),
            None => Err(MetadataError::EntityTypeNotFound(entity.to_string())),
        }
    }

    pub(crate) fn ignore_member(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        source: ConfigurationSource,
    ) -> bool {
        let Some(existing) = self.model.entity_type(entity).map(|e| e.ignored_source(name)) else {
            return false;
        };
        if let Some(ignored) = existing {
            if let Some(e) = self.model.entity_type_mut(entity) {
                e.ignored_members
                    .insert(name.to_string(), source.merge(Some(ignored)));
            }
            return true;
        }

        let ignored = self.transaction(|mb| {
            let mut navigations: Vec<NavigationId> =
                mb.model.find_navigation(entity, name).into_iter().collect();
            navigations.extend(mb.model.find_derived_navigations(entity, name));
            for id in navigations {
                let Some(navigation) = mb.model.navigation(id) else {
                    continue;
                };
                if !source.overrides(Some(navigation.source)) {
                    return None;
                }
                let fk = navigation.foreign_key;
                let remove_fk = mb
                    .model
                    .foreign_key(fk)
                    .is_some_and(|f| source.overrides(Some(f.source)));
                if remove_fk {
                    mb.remove_foreign_key(fk, source)?;
                } else {
                    mb.model.remove_navigation_node(id);
                }
            }

            let mut properties: Vec<PropertyId> =
                mb.model.find_property(entity, name).into_iter().collect();
            properties.extend(mb.model.find_derived_properties(entity, name));
            for id in properties {
                mb.remove_property(id, source)?;
            }

            mb.model
                .entity_type_mut(entity)?
                .ignored_members
                .insert(name.to_string(), source);
            Some(())
        });

        match ignored {
            Some(()) => {
                debug!(
                    "Ignored member '{}.{}' at {}",
                    self.model.entity_type_name(entity),
                    name,
                    source
                );
                true
            }
            None => {
                trace!(
                    "Ignoring '{}.{}' at {} rejected",
                    self.model.entity_type_name(entity),
                    name,
                    source
                );
                false
            }
        }
    }

    /// Remove a property and rework every key, foreign key and index using it
    fn remove_property(&mut self, id: PropertyId, source: ConfigurationSource) -> Option<()> {
        let property = self.model.property(id)?;
        if !source.overrides(Some(property.source)) {
            return None;
        }

        for key in self.model.keys_containing(id) {
            let Some(key_source) = self.model.key(key).map(|k| k.source) else {
                continue;
            };
            if !source.overrides(Some(key_source)) {
                return None;
            }
            for fk in self.model.referencing_foreign_keys(key) {
                self.repoint_principal_key(fk, key, id, source)?;
            }
            if let Some(removed) = self.model.remove_key_node(key) {
                self.prune_shadow_properties(&removed.properties);
            }
        }

        for fk in self.model.foreign_keys_containing(id) {
            let foreign_key = self.model.foreign_key(fk)?;
            if !source.overrides(foreign_key.properties_source) {
                return None;
            }
            let shape = super::relationship::ForeignKeyShape {
                dependent: foreign_key.declaring_entity_type,
                principal: foreign_key.principal_entity_type,
                properties: None,
                principal_key: Some(foreign_key.principal_key),
            };
            let principal_key_source = foreign_key.principal_key_source;
            self.replace_foreign_key(fk, shape, None, principal_key_source, source, false)?;
        }

        for index in self.model.indexes_containing(id) {
            self.remove_index(index, source)?;
        }

        if let Some(removed) = self.model.remove_property_node(id) {
            debug!(
                "Removed property '{}.{}'",
                self.model.entity_type_name(removed.declaring_entity_type),
                removed.name
            );
        }
        Some(())
    }

    /// Move `fk` off `key`, which is about to lose `property`
    fn repoint_principal_key(
        &mut self,
        fk: ForeignKeyId,
        key: KeyId,
        property: PropertyId,
        source: ConfigurationSource,
    ) -> Option<()> {
        let foreign_key = self.model.foreign_key(fk)?;
        if !source.overrides(foreign_key.principal_key_source) {
            return None;
        }
        let principal = foreign_key.principal_entity_type;
        let dependent = foreign_key.declaring_entity_type;
        let dependent_properties = foreign_key.properties.clone();
        let properties_source = foreign_key.properties_source;

        let primary_key = self
            .model
            .primary_key(principal)
            .filter(|pk| *pk != key && !self.model.key(*pk).is_some_and(|k| k.contains(property)));
        let new_key = match primary_key {
            Some(pk) => pk,
            None => self.create_shadow_key(principal, &[ClrType::Int32])?,
        };

        let (properties, properties_source) =
            if self.model.are_compatible(&dependent_properties, new_key) {
                (Some(dependent_properties), properties_source)
            } else if source.overrides(properties_source) {
                (None, None)
            } else {
                return None;
            };

        let shape = super::relationship::ForeignKeyShape {
            dependent,
            principal,
            properties,
            principal_key: Some(new_key),
        };
        self.replace_foreign_key(fk, shape, properties_source, None, source, false)?;
        Some(())
    }

    // ------------------------------------------------------------------------
    // Base types
    // ------------------------------------------------------------------------

    pub(crate) fn set_base_type(
        &mut self,
        entity: EntityTypeId,
        base: Option<EntityTypeId>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<EntityTypeId>> {
        let current = self
            .model
            .entity_type(entity)
            .ok_or_else(|| MetadataError::EntityTypeNotFound(entity.to_string()))?;

        if current.base_type == base {
            let merged = source.merge(current.base_type_source);
            if let Some(e) = self.model.entity_type_mut(entity) {
                e.base_type_source = Some(merged);
            }
            return Ok(Some(entity));
        }
        if !source.overrides(current.base_type_source) {
            trace!(
                "Base type of '{}' configured at a higher source, {} request rejected",
                current.name,
                source
            );
            return Ok(None);
        }
        if let Some(base) = base {
            if self.model.entity_type(base).is_none() {
                return Err(MetadataError::EntityTypeNotFound(base.to_string()));
            }
            if self.model.is_same_or_derived(base, entity) {
                return Err(MetadataError::CircularInheritance {
                    entity: self.model.entity_type_name(entity).to_string(),
                    base: self.model.entity_type_name(base).to_string(),
                });
            }
        }

        self.try_transaction(|mb| {
            if mb.detach_from_ancestors(entity, base, source).is_none() {
                return Ok(None);
            }
            match base {
                Some(base) => {
                    if mb.attach_to_base(entity, base, source).is_none() {
                        return Ok(None);
                    }
                }
                None => {
                    if let Some(e) = mb.model.entity_type_mut(entity) {
                        e.base_type = None;
                        e.base_type_source = Some(source);
                    }
                }
            }
            debug!(
                "Set base type of '{}' to {:?} at {}",
                mb.model.entity_type_name(entity),
                base.map(|b| mb.model.entity_type_name(b)),
                source
            );
            Ok(Some(entity))
        })
    }

    /// Remove elements of `entity` and its derived types that use members of
    /// ancestors it is about to lose
    fn detach_from_ancestors(
        &mut self,
        entity: EntityTypeId,
        new_base: Option<EntityTypeId>,
        source: ConfigurationSource,
    ) -> Option<()> {
        let lost: Vec<EntityTypeId> = self
            .model
            .ancestors(entity)
            .into_iter()
            .filter(|ancestor| new_base.is_none_or(|b| !self.model.is_same_or_derived(b, *ancestor)))
            .collect();
        if lost.is_empty() {
            return Some(());
        }

        let mut lost_properties = Vec::new();
        let mut lost_keys = Vec::new();
        for ancestor in &lost {
            let declared = self.model.entity_type(*ancestor)?;
            lost_properties.extend(declared.properties.iter().copied());
            lost_keys.extend(declared.keys.iter().copied());
        }
        let uses_lost = |properties: &[PropertyId]| properties.iter().any(|p| lost_properties.contains(p));

        let subtree = self.subtree(entity);
        for &t in &subtree {
            let declared = self.model.entity_type(t)?.clone();
            for fk in declared.foreign_keys {
                if self.model.foreign_key(fk).is_some_and(|f| uses_lost(&f.properties)) {
                    self.remove_foreign_key(fk, source)?;
                }
            }
            for index in declared.indexes {
                if self.model.index(index).is_some_and(|i| uses_lost(&i.properties)) {
                    self.remove_index(index, source)?;
                }
            }
            for key in declared.keys {
                if self.model.key(key).is_some_and(|k| uses_lost(&k.properties)) {
                    self.remove_key(key, source)?;
                }
            }
        }

        let orphaned: Vec<ForeignKeyId> = self
            .model
            .foreign_keys
            .iter()
            .filter(|(_, fk)| {
                subtree.contains(&fk.principal_entity_type) && lost_keys.contains(&fk.principal_key)
            })
            .map(|(id, _)| id)
            .collect();
        for fk in orphaned {
            self.remove_foreign_key(fk, source)?;
        }
        Some(())
    }

    /// Link `entity` under `base` and fold duplicated declarations into the
    /// base
    fn attach_to_base(
        &mut self,
        entity: EntityTypeId,
        base: EntityTypeId,
        source: ConfigurationSource,
    ) -> Option<()> {
        let declared = self.model.entity_type(entity)?;
        if declared.primary_key.is_some() && !source.overrides(declared.primary_key_source) {
            return None;
        }
        let blocked_by_key = declared.keys.iter().any(|key| {
            self.model
                .key(*key)
                .is_some_and(|k| !source.overrides(Some(k.source)))
        });
        if blocked_by_key {
            return None;
        }

        let subtree = self.subtree(entity);

        // Navigations the base already has win over derived declarations.
        for &t in &subtree {
            for id in self.model.entity_type(t)?.navigations.clone() {
                let Some(navigation) = self.model.navigation(id) else {
                    continue;
                };
                if self.model.find_navigation(base, &navigation.name).is_none() {
                    continue;
                }
                if !source.overrides(Some(navigation.source)) {
                    return None;
                }
                let fk = navigation.foreign_key;
                if self.base_duplicate_of(fk, base).is_some() {
                    // The foreign key loop below folds it into the base one
                    self.model.remove_navigation_node(id);
                    continue;
                }
                let remove_fk = self
                    .model
                    .foreign_key(fk)
                    .is_some_and(|f| source.overrides(Some(f.source)));
                if remove_fk {
                    self.remove_foreign_key(fk, source)?;
                } else {
                    self.model.remove_navigation_node(id);
                }
            }
        }

        let e = self.model.entity_type_mut(entity)?;
        e.base_type = Some(base);
        e.base_type_source = Some(source);

        for &t in &subtree {
            for id in self.model.entity_type(t)?.properties.clone() {
                let Some(name) = self.model.property(id).map(|p| p.name.clone()) else {
                    continue;
                };
                if let Some(base_property) = self.model.find_property(base, &name) {
                    self.merge_property_into(id, base_property);
                }
            }
        }

        for key in self.model.entity_type(entity)?.keys.clone() {
            let Some(properties) = self.model.key(key).map(|k| k.properties.clone()) else {
                continue;
            };
            match self.model.find_key(base, &properties) {
                Some(existing) => self.merge_key_into(key, existing),
                None => {
                    self.remove_key(key, source)?;
                }
            }
        }

        for &t in &subtree {
            for index in self.model.entity_type(t)?.indexes.clone() {
                let Some(properties) = self.model.index(index).map(|i| i.properties.clone()) else {
                    continue;
                };
                if let Some(existing) = self.model.find_index(base, &properties) {
                    self.merge_index_into(index, existing);
                }
            }
        }

        for &t in &subtree {
            for fk in self.model.entity_type(t)?.foreign_keys.clone() {
                let Some(foreign_key) = self.model.foreign_key(fk) else {
                    continue;
                };
                let duplicate = self.model.foreign_keys(base).into_iter().find(|other| {
                    self.model
                        .foreign_key(*other)
                        .is_some_and(|o| o.properties == foreign_key.properties)
                });
                let Some(other) = duplicate else {
                    continue;
                };
                if !source.overrides(Some(foreign_key.source)) {
                    return None;
                }
                let same_principal = self
                    .model
                    .foreign_key(other)
                    .is_some_and(|o| o.principal_entity_type == foreign_key.principal_entity_type);
                if same_principal {
                    self.merge_foreign_key(fk, other, source)?;
                } else {
                    self.remove_foreign_key(fk, source)?;
                }
            }
        }
        Some(())
    }

    /// Repoint foreign keys from `from` to the equivalent base key `into`
    fn merge_key_into(&mut self, from: KeyId, into: KeyId) {
        for fk in self.model.referencing_foreign_keys(from) {
            if let Some(foreign_key) = self.model.foreign_key_mut(fk) {
                foreign_key.principal_key = into;
            }
        }
        if let Some(removed) = self.model.remove_key_node(from) {
            if let Some(target) = self.model.key_mut(into) {
                target.source = target.source.merge(Some(removed.source));
                target.implicit &= removed.implicit;
            }
        }
    }

    /// A foreign key visible on `base` with the same principal and the same
    /// property names as `fk`
    fn base_duplicate_of(&self, fk: ForeignKeyId, base: EntityTypeId) -> Option<ForeignKeyId> {
        let foreign_key = self.model.foreign_key(fk)?;
        let names = self.model.property_names(&foreign_key.properties);
        self.model.foreign_keys(base).into_iter().find(|other| {
            *other != fk
                && self.model.foreign_key(*other).is_some_and(|o| {
                    o.principal_entity_type == foreign_key.principal_entity_type
                        && self.model.property_names(&o.properties) == names
                })
        })
    }

    /// `entity` followed by all of its derived types
    fn subtree(&self, entity: EntityTypeId) -> Vec<EntityTypeId> {
        std::iter::once(entity)
            .chain(self.model.all_derived_types(entity))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
