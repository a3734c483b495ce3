//! Key and index nodes
//!
//! Both are identified by their ordered property list on the declaring
//! entity type.

use crate::arena::{EntityTypeId, PropertyId};
use keystone_core::{Configurable, ConfigurationSource, Sourced};

// ============================================================================
// Key
// ============================================================================

/// A unique, ordered set of properties that identifies an entity
#[derive(Debug, Clone)]
pub struct Key {
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) source: ConfigurationSource,
    /// Created only to give a relationship a principal key
    pub(crate) implicit: bool,
}

impl Key {
    pub(crate) fn new(
        declaring_entity_type: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Self {
        Self {
            declaring_entity_type,
            properties,
            source,
            implicit: false,
        }
    }

    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    /// Whether the key exists only because a relationship needed one
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    pub fn contains(&self, property: PropertyId) -> bool {
        self.properties.contains(&property)
    }
}

// ============================================================================
// Index
// ============================================================================

/// An ordered set of properties to index, optionally unique
#[derive(Debug, Clone)]
pub struct Index {
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) source: ConfigurationSource,
    pub(crate) is_unique: Option<Sourced<bool>>,
}

impl Index {
    pub(crate) fn new(
        declaring_entity_type: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Self {
        Self {
            declaring_entity_type,
            properties,
            source,
            is_unique: None,
        }
    }

    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn is_unique(&self) -> bool {
        self.is_unique.configured_value().copied().unwrap_or(false)
    }

    pub fn is_unique_configuration_source(&self) -> Option<ConfigurationSource> {
        self.is_unique.configured_source()
    }

    pub fn contains(&self, property: PropertyId) -> bool {
        self.properties.contains(&property)
    }
}
