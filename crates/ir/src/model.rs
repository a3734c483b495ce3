//! The metadata graph
//!
//! `Model` owns one arena per node kind. Nodes point at each other through
//! ids, which keeps the entity ↔ property ↔ key ↔ foreign key ↔ navigation
//! cycles free of ownership problems.
//!
//! The public surface is read-only. All mutation goes through
//! [`ModelBuilder`](crate::builders::ModelBuilder), which uses the raw
//! `pub(crate)` helpers at the bottom of this file.

use crate::arena::{Arena, EntityTypeId, ForeignKeyId, IndexId, KeyId, NavigationId, PropertyId};
use crate::entity_type::EntityType;
use crate::foreign_key::{ForeignKey, Navigation};
use crate::key::{Index, Key};
use crate::property::Property;
use keystone_core::{ClrType, ConfigurationSource};
use std::collections::{BTreeMap, VecDeque};

// ============================================================================
// Model
// ============================================================================

/// Root container of entity types and everything they declare
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub(crate) entity_types: Arena<EntityTypeId, EntityType>,
    pub(crate) properties: Arena<PropertyId, Property>,
    pub(crate) keys: Arena<KeyId, Key>,
    pub(crate) foreign_keys: Arena<ForeignKeyId, ForeignKey>,
    pub(crate) indexes: Arena<IndexId, Index>,
    pub(crate) navigations: Arena<NavigationId, Navigation>,

    names: BTreeMap<String, EntityTypeId>,
    pub(crate) ignored_entity_types: BTreeMap<String, ConfigurationSource>,
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Node access
    // ------------------------------------------------------------------------

    pub fn entity_type(&self, id: EntityTypeId) -> Option<&EntityType> {
        self.entity_types.get(id)
    }

    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(id)
    }

    pub fn key(&self, id: KeyId) -> Option<&Key> {
        self.keys.get(id)
    }

    pub fn foreign_key(&self, id: ForeignKeyId) -> Option<&ForeignKey> {
        self.foreign_keys.get(id)
    }

    pub fn index(&self, id: IndexId) -> Option<&Index> {
        self.indexes.get(id)
    }

    pub fn navigation(&self, id: NavigationId) -> Option<&Navigation> {
        self.navigations.get(id)
    }

    /// Find an entity type by name
    pub fn find_entity_type(&self, name: &str) -> Option<EntityTypeId> {
        self.names.get(name).copied()
    }

    /// Entity types ordered by name
    pub fn entity_types(&self) -> impl Iterator<Item = (EntityTypeId, &EntityType)> {
        self.names
            .values()
            .filter_map(|id| self.entity_types.get(*id).map(|entity| (*id, entity)))
    }

    pub fn entity_type_count(&self) -> usize {
        self.names.len()
    }

    /// Source at which an entity type name was ignored
    pub fn ignored_entity_type_source(&self, name: &str) -> Option<ConfigurationSource> {
        self.ignored_entity_types.get(name).copied()
    }

    /// Name of an entity type, or an empty string for a stale id
    pub fn entity_type_name(&self, id: EntityTypeId) -> &str {
        self.entity_types.get(id).map(EntityType::name).unwrap_or("")
    }

    /// Names of the given properties, skipping stale ids
    pub fn property_names(&self, properties: &[PropertyId]) -> Vec<String> {
        properties
            .iter()
            .filter_map(|id| self.properties.get(*id))
            .map(|property| property.name.clone())
            .collect()
    }

    // ------------------------------------------------------------------------
    // Inheritance
    // ------------------------------------------------------------------------

    /// Base types of `entity`, nearest first
    pub fn ancestors(&self, entity: EntityTypeId) -> Vec<EntityTypeId> {
        let mut ancestors = Vec::new();
        let mut current = self.entity_types.get(entity).and_then(|e| e.base_type);
        while let Some(id) = current {
            if id == entity || ancestors.contains(&id) {
                break;
            }
            ancestors.push(id);
            current = self.entity_types.get(id).and_then(|e| e.base_type);
        }
        ancestors
    }

    /// Root of the hierarchy `entity` belongs to
    pub fn root_type(&self, entity: EntityTypeId) -> EntityTypeId {
        self.ancestors(entity).last().copied().unwrap_or(entity)
    }

    /// `entity` and its base types, root first
    pub fn hierarchy(&self, entity: EntityTypeId) -> Vec<EntityTypeId> {
        let mut chain = self.ancestors(entity);
        chain.reverse();
        chain.push(entity);
        chain
    }

    /// Direct derived types, ordered by name
    pub fn derived_types(&self, entity: EntityTypeId) -> Vec<EntityTypeId> {
        self.entity_types()
            .filter(|(_, e)| e.base_type == Some(entity))
            .map(|(id, _)| id)
            .collect()
    }

    /// All derived types, breadth first
    pub fn all_derived_types(&self, entity: EntityTypeId) -> Vec<EntityTypeId> {
        let mut result = Vec::new();
        let mut queue: VecDeque<EntityTypeId> = self.derived_types(entity).into();
        while let Some(next) = queue.pop_front() {
            if next == entity || result.contains(&next) {
                continue;
            }
            result.push(next);
            queue.extend(self.derived_types(next));
        }
        result
    }

    /// Whether `entity` is `other` or derives from it
    pub fn is_same_or_derived(&self, entity: EntityTypeId, other: EntityTypeId) -> bool {
        entity == other || self.ancestors(entity).contains(&other)
    }

    /// Whether the two types share an inheritance line
    pub fn in_same_hierarchy(&self, a: EntityTypeId, b: EntityTypeId) -> bool {
        self.is_same_or_derived(a, b) || self.is_same_or_derived(b, a)
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    /// All properties visible on `entity`, base properties first
    pub fn properties(&self, entity: EntityTypeId) -> Vec<PropertyId> {
        self.hierarchy(entity)
            .into_iter()
            .filter_map(|id| self.entity_types.get(id))
            .flat_map(|e| e.properties.iter().copied())
            .collect()
    }

    pub fn find_declared_property(&self, entity: EntityTypeId, name: &str) -> Option<PropertyId> {
        self.entity_types.get(entity)?.properties.iter().copied().find(|id| {
            self.properties
                .get(*id)
                .is_some_and(|property| property.name == name)
        })
    }

    /// Find a property declared on `entity` or inherited by it
    pub fn find_property(&self, entity: EntityTypeId, name: &str) -> Option<PropertyId> {
        std::iter::once(entity)
            .chain(self.ancestors(entity))
            .find_map(|id| self.find_declared_property(id, name))
    }

    /// Properties named `name` declared on types derived from `entity`
    pub fn find_derived_properties(&self, entity: EntityTypeId, name: &str) -> Vec<PropertyId> {
        self.all_derived_types(entity)
            .into_iter()
            .filter_map(|id| self.find_declared_property(id, name))
            .collect()
    }

    /// Whether any key, foreign key or index uses `property`
    pub fn is_property_in_use(&self, property: PropertyId) -> bool {
        self.keys.iter().any(|(_, key)| key.contains(property))
            || self
                .foreign_keys
                .iter()
                .any(|(_, fk)| fk.properties.contains(&property))
            || self.indexes.iter().any(|(_, index)| index.contains(property))
    }

    /// Whether the CLR types of `properties` pair up with the key's properties
    pub fn are_compatible(&self, properties: &[PropertyId], key: KeyId) -> bool {
        let Some(key) = self.keys.get(key) else {
            return false;
        };
        self.are_compatible_types(properties, &self.property_types(&key.properties))
    }

    pub(crate) fn are_compatible_types(&self, properties: &[PropertyId], types: &[ClrType]) -> bool {
        properties.len() == types.len()
            && properties.iter().zip(types).all(|(id, ty)| {
                self.properties
                    .get(*id)
                    .is_some_and(|property| property.clr_type.is_compatible_with(ty))
            })
    }

    pub(crate) fn property_types(&self, properties: &[PropertyId]) -> Vec<ClrType> {
        properties
            .iter()
            .filter_map(|id| self.properties.get(*id))
            .map(|property| property.clr_type.clone())
            .collect()
    }

    // ------------------------------------------------------------------------
    // Keys and indexes
    // ------------------------------------------------------------------------

    /// All keys visible on `entity`, base keys first
    pub fn keys(&self, entity: EntityTypeId) -> Vec<KeyId> {
        self.hierarchy(entity)
            .into_iter()
            .filter_map(|id| self.entity_types.get(id))
            .flat_map(|e| e.keys.iter().copied())
            .collect()
    }

    /// Primary key of `entity`, usually declared on the root type
    pub fn primary_key(&self, entity: EntityTypeId) -> Option<KeyId> {
        std::iter::once(entity)
            .chain(self.ancestors(entity))
            .find_map(|id| self.entity_types.get(id).and_then(|e| e.primary_key))
    }

    pub fn is_primary_key(&self, key: KeyId) -> bool {
        self.keys
            .get(key)
            .and_then(|k| self.entity_types.get(k.declaring_entity_type))
            .is_some_and(|e| e.primary_key == Some(key))
    }

    /// Find a key with exactly these properties on `entity` or its base types
    pub fn find_key(&self, entity: EntityTypeId, properties: &[PropertyId]) -> Option<KeyId> {
        self.keys(entity)
            .into_iter()
            .find(|id| self.keys.get(*id).is_some_and(|key| key.properties == properties))
    }

    pub fn indexes(&self, entity: EntityTypeId) -> Vec<IndexId> {
        self.hierarchy(entity)
            .into_iter()
            .filter_map(|id| self.entity_types.get(id))
            .flat_map(|e| e.indexes.iter().copied())
            .collect()
    }

    pub fn find_index(&self, entity: EntityTypeId, properties: &[PropertyId]) -> Option<IndexId> {
        self.indexes(entity).into_iter().find(|id| {
            self.indexes
                .get(*id)
                .is_some_and(|index| index.properties == properties)
        })
    }

    pub fn keys_containing(&self, property: PropertyId) -> Vec<KeyId> {
        self.keys
            .iter()
            .filter(|(_, key)| key.contains(property))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn indexes_containing(&self, property: PropertyId) -> Vec<IndexId> {
        self.indexes
            .iter()
            .filter(|(_, index)| index.contains(property))
            .map(|(id, _)| id)
            .collect()
    }

    // ------------------------------------------------------------------------
    // Foreign keys and navigations
    // ------------------------------------------------------------------------

    /// All foreign keys declared on `entity` or its base types
    pub fn foreign_keys(&self, entity: EntityTypeId) -> Vec<ForeignKeyId> {
        self.hierarchy(entity)
            .into_iter()
            .filter_map(|id| self.entity_types.get(id))
            .flat_map(|e| e.foreign_keys.iter().copied())
            .collect()
    }

    /// Find a foreign key with exactly these dependent properties
    pub fn find_foreign_key(
        &self,
        entity: EntityTypeId,
        properties: &[PropertyId],
    ) -> Option<ForeignKeyId> {
        self.foreign_keys(entity).into_iter().find(|id| {
            self.foreign_keys
                .get(*id)
                .is_some_and(|fk| fk.properties == properties)
        })
    }

    /// Foreign keys whose principal key is `key`
    pub fn referencing_foreign_keys(&self, key: KeyId) -> Vec<ForeignKeyId> {
        self.foreign_keys
            .iter()
            .filter(|(_, fk)| fk.principal_key == key)
            .map(|(id, _)| id)
            .collect()
    }

    /// Foreign keys whose principal entity type is `entity`
    pub fn foreign_keys_referencing(&self, entity: EntityTypeId) -> Vec<ForeignKeyId> {
        self.foreign_keys
            .iter()
            .filter(|(_, fk)| fk.principal_entity_type == entity)
            .map(|(id, _)| id)
            .collect()
    }

    /// Foreign keys that use `property` as a dependent property
    pub fn foreign_keys_containing(&self, property: PropertyId) -> Vec<ForeignKeyId> {
        self.foreign_keys
            .iter()
            .filter(|(_, fk)| fk.properties.contains(&property))
            .map(|(id, _)| id)
            .collect()
    }

    /// Resolved required-ness: the configured value, or whether every
    /// dependent property is non-nullable
    pub fn is_required(&self, fk: ForeignKeyId) -> bool {
        let Some(foreign_key) = self.foreign_keys.get(fk) else {
            return false;
        };
        foreign_key.configured_is_required().unwrap_or_else(|| {
            foreign_key
                .properties
                .iter()
                .filter_map(|id| self.properties.get(*id))
                .all(|property| !property.is_nullable())
        })
    }

    /// All navigations visible on `entity`, base navigations first
    pub fn navigations(&self, entity: EntityTypeId) -> Vec<NavigationId> {
        self.hierarchy(entity)
            .into_iter()
            .filter_map(|id| self.entity_types.get(id))
            .flat_map(|e| e.navigations.iter().copied())
            .collect()
    }

    pub fn find_declared_navigation(&self, entity: EntityTypeId, name: &str) -> Option<NavigationId> {
        self.entity_types.get(entity)?.navigations.iter().copied().find(|id| {
            self.navigations
                .get(*id)
                .is_some_and(|navigation| navigation.name == name)
        })
    }

    /// Find a navigation declared on `entity` or inherited by it
    pub fn find_navigation(&self, entity: EntityTypeId, name: &str) -> Option<NavigationId> {
        std::iter::once(entity)
            .chain(self.ancestors(entity))
            .find_map(|id| self.find_declared_navigation(id, name))
    }

    /// Navigations named `name` declared on types derived from `entity`
    pub fn find_derived_navigations(&self, entity: EntityTypeId, name: &str) -> Vec<NavigationId> {
        self.all_derived_types(entity)
            .into_iter()
            .filter_map(|id| self.find_declared_navigation(id, name))
            .collect()
    }

    /// Navigation name, or `None` for a stale id
    pub fn navigation_name(&self, id: Option<NavigationId>) -> Option<&str> {
        id.and_then(|id| self.navigations.get(id))
            .map(|navigation| navigation.name.as_str())
    }

    // ------------------------------------------------------------------------
    // Raw mutation
    // ------------------------------------------------------------------------

    pub(crate) fn entity_type_mut(&mut self, id: EntityTypeId) -> Option<&mut EntityType> {
        self.entity_types.get_mut(id)
    }

    pub(crate) fn property_mut(&mut self, id: PropertyId) -> Option<&mut Property> {
        self.properties.get_mut(id)
    }

    pub(crate) fn key_mut(&mut self, id: KeyId) -> Option<&mut Key> {
        self.keys.get_mut(id)
    }

    pub(crate) fn foreign_key_mut(&mut self, id: ForeignKeyId) -> Option<&mut ForeignKey> {
        self.foreign_keys.get_mut(id)
    }

    pub(crate) fn index_mut(&mut self, id: IndexId) -> Option<&mut Index> {
        self.indexes.get_mut(id)
    }

    pub(crate) fn navigation_mut(&mut self, id: NavigationId) -> Option<&mut Navigation> {
        self.navigations.get_mut(id)
    }

    pub(crate) fn add_entity_type(
        &mut self,
        name: &str,
        has_clr_type: bool,
        source: ConfigurationSource,
    ) -> EntityTypeId {
        let id = self
            .entity_types
            .insert(EntityType::new(name, has_clr_type, source));
        self.names.insert(name.to_string(), id);
        id
    }

    /// Drop an entity type node. Callers clear its contents first.
    pub(crate) fn remove_entity_type_node(&mut self, id: EntityTypeId) -> Option<EntityType> {
        let entity = self.entity_types.remove(id)?;
        self.names.remove(&entity.name);
        Some(entity)
    }

    pub(crate) fn add_property(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        clr_type: ClrType,
        is_shadow: bool,
        source: ConfigurationSource,
    ) -> PropertyId {
        let id = self
            .properties
            .insert(Property::new(name, entity, clr_type, is_shadow, source));
        if let Some(e) = self.entity_types.get_mut(entity) {
            e.properties.push(id);
        }
        id
    }

    pub(crate) fn remove_property_node(&mut self, id: PropertyId) -> Option<Property> {
        let property = self.properties.remove(id)?;
        if let Some(e) = self.entity_types.get_mut(property.declaring_entity_type) {
            e.properties.retain(|p| *p != id);
        }
        Some(property)
    }

    pub(crate) fn add_key(
        &mut self,
        entity: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> KeyId {
        let id = self.keys.insert(Key::new(entity, properties, source));
        if let Some(e) = self.entity_types.get_mut(entity) {
            e.keys.push(id);
        }
        id
    }

    pub(crate) fn remove_key_node(&mut self, id: KeyId) -> Option<Key> {
        let key = self.keys.remove(id)?;
        if let Some(e) = self.entity_types.get_mut(key.declaring_entity_type) {
            e.keys.retain(|k| *k != id);
            if e.primary_key == Some(id) {
                e.primary_key = None;
                e.primary_key_source = None;
            }
        }
        Some(key)
    }

    pub(crate) fn add_index(
        &mut self,
        entity: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> IndexId {
        let id = self.indexes.insert(Index::new(entity, properties, source));
        if let Some(e) = self.entity_types.get_mut(entity) {
            e.indexes.push(id);
        }
        id
    }

    pub(crate) fn remove_index_node(&mut self, id: IndexId) -> Option<Index> {
        let index = self.indexes.remove(id)?;
        if let Some(e) = self.entity_types.get_mut(index.declaring_entity_type) {
            e.indexes.retain(|i| *i != id);
        }
        Some(index)
    }

    pub(crate) fn add_foreign_key(&mut self, foreign_key: ForeignKey) -> ForeignKeyId {
        let entity = foreign_key.declaring_entity_type;
        let id = self.foreign_keys.insert(foreign_key);
        if let Some(e) = self.entity_types.get_mut(entity) {
            e.foreign_keys.push(id);
        }
        id
    }

    /// Drop a foreign key node together with its navigations
    pub(crate) fn remove_foreign_key_node(&mut self, id: ForeignKeyId) -> Option<ForeignKey> {
        let navigations = self.foreign_keys.get(id)?.navigation_ids();
        for navigation in navigations {
            self.remove_navigation_node(navigation);
        }
        let foreign_key = self.foreign_keys.remove(id)?;
        if let Some(e) = self.entity_types.get_mut(foreign_key.declaring_entity_type) {
            e.foreign_keys.retain(|f| *f != id);
        }
        Some(foreign_key)
    }

    pub(crate) fn add_navigation(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        foreign_key: ForeignKeyId,
        points_to_principal: bool,
        is_collection: bool,
        source: ConfigurationSource,
    ) -> NavigationId {
        let id = self.navigations.insert(Navigation {
            name: name.to_string(),
            declaring_entity_type: entity,
            foreign_key,
            points_to_principal,
            is_collection,
            source,
        });
        if let Some(e) = self.entity_types.get_mut(entity) {
            e.navigations.push(id);
        }
        if let Some(fk) = self.foreign_keys.get_mut(foreign_key) {
            if points_to_principal {
                fk.dependent_to_principal = Some(id);
            } else {
                fk.principal_to_dependent = Some(id);
            }
        }
        id
    }

    pub(crate) fn remove_navigation_node(&mut self, id: NavigationId) -> Option<Navigation> {
        let navigation = self.navigations.remove(id)?;
        if let Some(e) = self.entity_types.get_mut(navigation.declaring_entity_type) {
            e.navigations.retain(|n| *n != id);
        }
        if let Some(fk) = self.foreign_keys.get_mut(navigation.foreign_key) {
            if fk.dependent_to_principal == Some(id) {
                fk.dependent_to_principal = None;
            }
            if fk.principal_to_dependent == Some(id) {
                fk.principal_to_dependent = None;
            }
        }
        Some(navigation)
    }

    /// Point every key, foreign key and index at `to` instead of `from`
    pub(crate) fn replace_property_references(&mut self, from: PropertyId, to: PropertyId) {
        let swap = |list: &mut Vec<PropertyId>| {
            for id in list.iter_mut() {
                if *id == from {
                    *id = to;
                }
            }
        };
        let keys: Vec<KeyId> = self.keys.iter().map(|(id, _)| id).collect();
        for id in keys {
            if let Some(key) = self.keys.get_mut(id) {
                swap(&mut key.properties);
            }
        }
        let foreign_keys: Vec<ForeignKeyId> = self.foreign_keys.iter().map(|(id, _)| id).collect();
        for id in foreign_keys {
            if let Some(fk) = self.foreign_keys.get_mut(id) {
                swap(&mut fk.properties);
            }
        }
        let indexes: Vec<IndexId> = self.indexes.iter().map(|(id, _)| id).collect();
        for id in indexes {
            if let Some(index) = self.indexes.get_mut(id) {
                swap(&mut index.properties);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
