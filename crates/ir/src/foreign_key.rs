//! Foreign key and navigation nodes
//!
//! A foreign key lives on its dependent entity type. It points at a key on
//! the principal entity type and owns up to two navigations, one on each
//! end.

use crate::arena::{EntityTypeId, ForeignKeyId, KeyId, NavigationId, PropertyId};
use keystone_core::{Configurable, ConfigurationSource, DeleteBehavior, Sourced};

// ============================================================================
// ForeignKey
// ============================================================================

/// A relationship between a dependent and a principal entity type
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) principal_entity_type: EntityTypeId,
    pub(crate) principal_key: KeyId,

    pub(crate) source: ConfigurationSource,
    /// Source of the dependent property list; `None` while it is made of
    /// properties the builder chose on its own
    pub(crate) properties_source: Option<ConfigurationSource>,
    pub(crate) principal_key_source: Option<ConfigurationSource>,
    /// Source of the choice of which end is the principal
    pub(crate) principal_end_source: Option<ConfigurationSource>,

    pub(crate) is_unique: Option<Sourced<bool>>,
    pub(crate) is_required: Option<Sourced<bool>>,
    pub(crate) delete_behavior: Option<Sourced<DeleteBehavior>>,

    pub(crate) dependent_to_principal: Option<NavigationId>,
    pub(crate) principal_to_dependent: Option<NavigationId>,
}

impl ForeignKey {
    pub(crate) fn new(
        declaring_entity_type: EntityTypeId,
        properties: Vec<PropertyId>,
        principal_entity_type: EntityTypeId,
        principal_key: KeyId,
        source: ConfigurationSource,
    ) -> Self {
        Self {
            declaring_entity_type,
            properties,
            principal_entity_type,
            principal_key,
            source,
            properties_source: None,
            principal_key_source: None,
            principal_end_source: None,
            is_unique: None,
            is_required: None,
            delete_behavior: None,
            dependent_to_principal: None,
            principal_to_dependent: None,
        }
    }

    /// The dependent entity type
    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    /// Dependent properties, in principal key order
    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn principal_entity_type(&self) -> EntityTypeId {
        self.principal_entity_type
    }

    pub fn principal_key(&self) -> KeyId {
        self.principal_key
    }

    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn properties_configuration_source(&self) -> Option<ConfigurationSource> {
        self.properties_source
    }

    pub fn principal_key_configuration_source(&self) -> Option<ConfigurationSource> {
        self.principal_key_source
    }

    pub fn principal_end_configuration_source(&self) -> Option<ConfigurationSource> {
        self.principal_end_source
    }

    /// Whether each principal has at most one dependent
    pub fn is_unique(&self) -> bool {
        self.is_unique.configured_value().copied().unwrap_or(false)
    }

    /// Configured uniqueness, `None` while undetermined
    pub fn configured_is_unique(&self) -> Option<bool> {
        self.is_unique.configured_value().copied()
    }

    pub fn is_unique_configuration_source(&self) -> Option<ConfigurationSource> {
        self.is_unique.configured_source()
    }

    /// Configured required-ness, `None` while it follows the properties.
    ///
    /// The resolved value is [`Model::is_required`](crate::model::Model::is_required).
    pub fn configured_is_required(&self) -> Option<bool> {
        self.is_required.configured_value().copied()
    }

    pub fn is_required_configuration_source(&self) -> Option<ConfigurationSource> {
        self.is_required.configured_source()
    }

    pub fn delete_behavior(&self) -> DeleteBehavior {
        self.delete_behavior.configured_value().copied().unwrap_or_default()
    }

    pub fn delete_behavior_configuration_source(&self) -> Option<ConfigurationSource> {
        self.delete_behavior.configured_source()
    }

    pub fn dependent_to_principal(&self) -> Option<NavigationId> {
        self.dependent_to_principal
    }

    pub fn principal_to_dependent(&self) -> Option<NavigationId> {
        self.principal_to_dependent
    }

    pub fn is_self_referencing(&self) -> bool {
        self.declaring_entity_type == self.principal_entity_type
    }

    pub(crate) fn navigation_ids(&self) -> Vec<NavigationId> {
        self.dependent_to_principal
            .into_iter()
            .chain(self.principal_to_dependent)
            .collect()
    }
}

// ============================================================================
// Navigation
// ============================================================================

/// A named pointer from one end of a foreign key to the other
#[derive(Debug, Clone)]
pub struct Navigation {
    pub(crate) name: String,
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) foreign_key: ForeignKeyId,
    pub(crate) points_to_principal: bool,
    pub(crate) is_collection: bool,
    pub(crate) source: ConfigurationSource,
}

impl Navigation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    pub fn foreign_key(&self) -> ForeignKeyId {
        self.foreign_key
    }

    /// Whether this navigation sits on the dependent and points to the principal
    pub fn points_to_principal(&self) -> bool {
        self.points_to_principal
    }

    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }
}
