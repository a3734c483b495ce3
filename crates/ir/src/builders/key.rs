//! Key and index builders

use super::ModelBuilder;
use crate::arena::{EntityTypeId, IndexId, KeyId, PropertyId};
use crate::key::{Index, Key};
use keystone_core::{Configurable, ConfigurationSource, MetadataResult};
use tracing::{debug, trace};

// ============================================================================
// KeyBuilder
// ============================================================================

/// Handle for one key
pub struct KeyBuilder<'a> {
    mb: &'a mut ModelBuilder,
    id: KeyId,
}

impl<'a> KeyBuilder<'a> {
    pub(crate) fn new(mb: &'a mut ModelBuilder, id: KeyId) -> Self {
        Self { mb, id }
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn metadata(&self) -> Option<&Key> {
        self.mb.model.key(self.id)
    }

    /// Whether this is the primary key of its entity type
    pub fn is_primary_key(&self) -> bool {
        self.mb.model.is_primary_key(self.id)
    }
}

// ============================================================================
// IndexBuilder
// ============================================================================

/// Handle for one index
pub struct IndexBuilder<'a> {
    mb: &'a mut ModelBuilder,
    id: IndexId,
}

impl<'a> IndexBuilder<'a> {
    pub(crate) fn new(mb: &'a mut ModelBuilder, id: IndexId) -> Self {
        Self { mb, id }
    }

    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn metadata(&self) -> Option<&Index> {
        self.mb.model.index(self.id)
    }

    pub fn is_unique(&mut self, unique: bool, source: ConfigurationSource) -> Option<&mut Self> {
        let index = self.mb.model.index_mut(self.id)?;
        if !index.is_unique.configure(unique, source) {
            trace!("Index uniqueness configured at a higher source, {} request rejected", source);
            return None;
        }
        Some(self)
    }
}

// ============================================================================
// ModelBuilder: keys and indexes
// ============================================================================

impl ModelBuilder {
    /// Get or add the key made of `properties` on `entity`.
    ///
    /// Declared alternate keys that overlap the new one and were configured
    /// at a strictly lower source are removed when their dependents allow it.
    pub(crate) fn has_key(
        &mut self,
        entity: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<KeyId>> {
        self.has_key_preserving(entity, properties, source, None)
    }

    /// [`has_key`](Self::has_key) that never removes `preserve`
    pub(crate) fn has_key_preserving(
        &mut self,
        entity: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
        preserve: Option<KeyId>,
    ) -> MetadataResult<Option<KeyId>> {
        self.ensure_not_derived(entity)?;

        if let Some(existing) = self.model.find_key(entity, &properties) {
            if let Some(key) = self.model.key_mut(existing) {
                key.source = source.merge(Some(key.source));
                key.implicit = false;
            }
            return Ok(Some(existing));
        }

        let declared = self
            .model
            .entity_type(entity)
            .map(|e| e.keys.clone())
            .unwrap_or_default();
        for key in declared {
            let overlapping = self.model.key(key).is_some_and(|k| {
                k.source < source && k.properties.iter().any(|p| properties.contains(p))
            });
            if overlapping && Some(key) != preserve && !self.model.is_primary_key(key) {
                if self.remove_key(key, source).is_none() {
                    trace!("Overlapping key kept, a dependent is configured at a higher source");
                }
            }
        }

        let names = self.model.property_names(&properties);
        let id = self.model.add_key(entity, properties, source);
        debug!(
            "Added key {:?} on '{}' at {}",
            names,
            self.model.entity_type_name(entity),
            source
        );
        Ok(Some(id))
    }

    /// Make the key on `properties` the primary key of `entity`.
    ///
    /// The previous primary key stays as an alternate key while foreign keys
    /// still reference it; those are never repointed.
    pub(crate) fn set_primary_key(
        &mut self,
        entity: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<KeyId>> {
        self.ensure_not_derived(entity)?;
        let Some(declared) = self.model.entity_type(entity) else {
            return Ok(None);
        };
        let current = declared.primary_key;
        let current_source = declared.primary_key_source;

        if let Some(pk) = current {
            if self.model.key(pk).is_some_and(|k| k.properties == properties) {
                if let Some(key) = self.model.key_mut(pk) {
                    key.source = source.merge(Some(key.source));
                    key.implicit = false;
                }
                if let Some(e) = self.model.entity_type_mut(entity) {
                    e.primary_key_source = Some(source.merge(current_source));
                }
                return Ok(Some(pk));
            }
        }
        if !source.overrides(current_source) {
            trace!(
                "Primary key of '{}' configured at a higher source, {} request rejected",
                self.model.entity_type_name(entity),
                source
            );
            return Ok(None);
        }

        self.try_transaction(|mb| {
            let Some(key) = mb.has_key(entity, properties, source)? else {
                return Ok(None);
            };
            if let Some(e) = mb.model.entity_type_mut(entity) {
                e.primary_key = Some(key);
                e.primary_key_source = Some(source);
            }

            if let Some(old) = current.filter(|old| *old != key) {
                let unreferenced = mb.model.referencing_foreign_keys(old).is_empty();
                let removable = mb
                    .model
                    .key(old)
                    .is_some_and(|k| source.overrides(Some(k.source)));
                if unreferenced && removable {
                    if let Some(removed) = mb.model.remove_key_node(old) {
                        mb.prune_shadow_properties(&removed.properties);
                    }
                }
            }
            debug!(
                "Set primary key of '{}' at {}",
                mb.model.entity_type_name(entity),
                source
            );
            Ok(Some(key))
        })
    }

    /// Remove `key` and every foreign key that uses it as principal key
    pub(crate) fn remove_key(&mut self, key: KeyId, source: ConfigurationSource) -> Option<ConfigurationSource> {
        self.transaction(|mb| {
            let removed_source = mb.model.key(key)?.source;
            if !source.overrides(Some(removed_source)) {
                trace!("Key configured at {}, {} removal rejected", removed_source, source);
                return None;
            }
            for fk in mb.model.referencing_foreign_keys(key) {
                let foreign_key = mb.model.foreign_key(fk)?;
                if !source.overrides(foreign_key.principal_key_source) {
                    return None;
                }
                mb.remove_foreign_key(fk, source)?;
            }
            // Removing the last referencing foreign key may already have
            // pruned an implicit key.
            if let Some(removed) = mb.model.remove_key_node(key) {
                debug!(
                    "Removed key {:?} from '{}'",
                    mb.model.property_names(&removed.properties),
                    mb.model.entity_type_name(removed.declaring_entity_type)
                );
                mb.prune_shadow_properties(&removed.properties);
            }
            Some(removed_source)
        })
    }

    pub(crate) fn has_index(
        &mut self,
        entity: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> IndexId {
        if let Some(existing) = self.model.find_index(entity, &properties) {
            if let Some(index) = self.model.index_mut(existing) {
                index.source = source.merge(Some(index.source));
            }
            return existing;
        }
        let names = self.model.property_names(&properties);
        let id = self.model.add_index(entity, properties.clone(), source);
        debug!(
            "Added index {:?} on '{}' at {}",
            names,
            self.model.entity_type_name(entity),
            source
        );

        for derived in self.model.all_derived_types(entity) {
            let duplicates: Vec<IndexId> = self
                .model
                .entity_type(derived)
                .map(|e| e.indexes.clone())
                .unwrap_or_default()
                .into_iter()
                .filter(|i| self.model.index(*i).is_some_and(|index| index.properties == properties))
                .collect();
            for duplicate in duplicates {
                self.merge_index_into(duplicate, id);
            }
        }
        id
    }

    /// Fold `from` into the equivalent index `into`, keeping the stronger
    /// uniqueness setting
    pub(crate) fn merge_index_into(&mut self, from: IndexId, into: IndexId) {
        let Some(removed) = self.model.remove_index_node(from) else {
            return;
        };
        let Some(target) = self.model.index_mut(into) else {
            return;
        };
        target.source = target.source.merge(Some(removed.source));
        let take_unique = match (&target.is_unique, &removed.is_unique) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(kept), Some(other)) => other.source.strictly_overrides(Some(kept.source)),
        };
        if take_unique {
            target.is_unique = removed.is_unique.clone();
        }
        let owner = target.declaring_entity_type;
        debug!(
            "Merged index {:?} of '{}' into '{}'",
            self.model.property_names(&removed.properties),
            self.model.entity_type_name(removed.declaring_entity_type),
            self.model.entity_type_name(owner)
        );
    }

    pub(crate) fn remove_index(&mut self, index: IndexId, source: ConfigurationSource) -> Option<ConfigurationSource> {
        let removed_source = self.model.index(index)?.source;
        if !source.overrides(Some(removed_source)) {
            trace!("Index configured at {}, {} removal rejected", removed_source, source);
            return None;
        }
        let removed = self.model.remove_index_node(index)?;
        self.prune_shadow_properties(&removed.properties);
        Some(removed_source)
    }
}

// ============================================================================
// Tests
// ============================================================================
