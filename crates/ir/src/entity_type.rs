//! Entity type nodes
//!
//! An `EntityType` stores only what it declares itself. Inherited views
//! (all properties, keys, navigations of the hierarchy) are computed by
//! [`Model`](crate::model::Model).

use crate::arena::{EntityTypeId, ForeignKeyId, IndexId, KeyId, NavigationId, PropertyId};
use keystone_core::ConfigurationSource;
use std::collections::BTreeMap;

// ============================================================================
// EntityType
// ============================================================================

/// A mapped concept, backed by a CLR type or purely shadow
#[derive(Debug, Clone)]
pub struct EntityType {
    pub(crate) name: String,
    pub(crate) has_clr_type: bool,
    pub(crate) source: ConfigurationSource,

    pub(crate) base_type: Option<EntityTypeId>,
    pub(crate) base_type_source: Option<ConfigurationSource>,

    pub(crate) properties: Vec<PropertyId>,
    pub(crate) keys: Vec<KeyId>,
    pub(crate) primary_key: Option<KeyId>,
    pub(crate) primary_key_source: Option<ConfigurationSource>,
    pub(crate) foreign_keys: Vec<ForeignKeyId>,
    pub(crate) indexes: Vec<IndexId>,
    pub(crate) navigations: Vec<NavigationId>,

    /// Member names ignored on this type and the source that ignored them
    pub(crate) ignored_members: BTreeMap<String, ConfigurationSource>,
}

impl EntityType {
    pub(crate) fn new(name: impl Into<String>, has_clr_type: bool, source: ConfigurationSource) -> Self {
        Self {
            name: name.into(),
            has_clr_type,
            source,
            base_type: None,
            base_type_source: None,
            properties: Vec::new(),
            keys: Vec::new(),
            primary_key: None,
            primary_key_source: None,
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            navigations: Vec::new(),
            ignored_members: BTreeMap::new(),
        }
    }

    /// Entity type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without any namespace prefix
    pub fn display_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Whether a CLR type backs this entity type
    pub fn has_clr_type(&self) -> bool {
        self.has_clr_type
    }

    /// Whether this entity type exists only in metadata
    pub fn is_shadow(&self) -> bool {
        !self.has_clr_type
    }

    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    /// Direct base type
    pub fn base_type(&self) -> Option<EntityTypeId> {
        self.base_type
    }

    pub fn base_type_configuration_source(&self) -> Option<ConfigurationSource> {
        self.base_type_source
    }

    /// Properties declared on this type, in declaration order
    pub fn declared_properties(&self) -> &[PropertyId] {
        &self.properties
    }

    /// Keys declared on this type
    pub fn declared_keys(&self) -> &[KeyId] {
        &self.keys
    }

    /// Primary key declared on this type
    pub fn declared_primary_key(&self) -> Option<KeyId> {
        self.primary_key
    }

    pub fn primary_key_configuration_source(&self) -> Option<ConfigurationSource> {
        self.primary_key_source
    }

    /// Foreign keys declared on this type (this type is the dependent)
    pub fn declared_foreign_keys(&self) -> &[ForeignKeyId] {
        &self.foreign_keys
    }

    pub fn declared_indexes(&self) -> &[IndexId] {
        &self.indexes
    }

    pub fn declared_navigations(&self) -> &[NavigationId] {
        &self.navigations
    }

    /// Source at which `member` was ignored on this type
    pub fn ignored_source(&self, member: &str) -> Option<ConfigurationSource> {
        self.ignored_members.get(member).copied()
    }

    /// Ignored member names
    pub fn ignored_members(&self) -> impl Iterator<Item = &str> {
        self.ignored_members.keys().map(String::as_str)
    }
}
