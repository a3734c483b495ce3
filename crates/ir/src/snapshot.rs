//! Read-only snapshot of a finished model
//!
//! Every facet is resolved to a concrete value and every reference is a
//! name, so a snapshot can be diffed, stored as JSON and loaded back
//! without the builder.

use crate::arena::{KeyId, PropertyId};
use crate::entity_type::EntityType;
use crate::model::Model;
use chrono::{DateTime, Utc};
use keystone_core::{ClrType, DeleteBehavior, MetadataError, MetadataResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

// ============================================================================
// Snapshot types
// ============================================================================

/// The resolved model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub id: Uuid,
    pub taken_at: DateTime<Utc>,
    /// Sorted by name
    pub entity_types: Vec<EntityTypeSnapshot>,
}

/// One entity type with its declared members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTypeSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    pub is_shadow: bool,
    pub properties: Vec<PropertySnapshot>,
    /// Declared on the root of the hierarchy only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<String>>,
    #[serde(default)]
    pub keys: Vec<Vec<String>>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySnapshot>,
    #[serde(default)]
    pub indexes: Vec<IndexSnapshot>,
    #[serde(default)]
    pub navigations: Vec<NavigationSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub name: String,
    pub column_name: String,
    pub clr_type: ClrType,
    pub is_nullable: bool,
    pub is_shadow: bool,
    pub is_concurrency_token: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    pub requires_value_generator: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeySnapshot {
    pub properties: Vec<String>,
    pub principal_entity_type: String,
    pub principal_key: Vec<String>,
    pub is_unique: bool,
    pub is_required: bool,
    pub delete_behavior: DeleteBehavior,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependent_to_principal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_to_dependent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub properties: Vec<String>,
    pub is_unique: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationSnapshot {
    pub name: String,
    pub target: String,
    pub is_collection: bool,
    pub points_to_principal: bool,
}

// ============================================================================
// Capture
// ============================================================================

impl ModelSnapshot {
    /// Resolve every entity type of `model`
    pub fn capture(model: &Model) -> Self {
        let mut entity_types: Vec<EntityTypeSnapshot> = model
            .entity_types()
            .map(|(_, entity)| capture_entity_type(model, entity))
            .collect();
        entity_types.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            id: Uuid::new_v4(),
            taken_at: Utc::now(),
            entity_types,
        }
    }

    pub fn entity_type(&self, name: &str) -> Option<&EntityTypeSnapshot> {
        self.entity_types.iter().find(|e| e.name == name)
    }

    pub fn to_json(&self) -> MetadataResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> MetadataResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the snapshot as JSON, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> MetadataResult<()> {
        let path = path.as_ref();
        let json = self.to_json()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| MetadataError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_json(&json).map_err(|e| match e {
            MetadataError::Json(je) => MetadataError::FileRead {
                path: path.to_path_buf(),
                message: format!("Invalid snapshot format: {}", je),
            },
            other => other,
        })
    }
}

fn capture_entity_type(model: &Model, entity: &EntityType) -> EntityTypeSnapshot {
    let properties = entity
        .declared_properties()
        .iter()
        .filter_map(|p| model.property(*p))
        .map(|p| PropertySnapshot {
            name: p.name().to_string(),
            column_name: p.column_name().to_string(),
            clr_type: p.clr_type().clone(),
            is_nullable: p.is_nullable(),
            is_shadow: p.is_shadow(),
            is_concurrency_token: p.is_concurrency_token(),
            max_length: p.max_length(),
            requires_value_generator: p.requires_value_generator(),
        })
        .collect();

    let foreign_keys = entity
        .declared_foreign_keys()
        .iter()
        .filter_map(|fk| model.foreign_key(*fk).map(|f| (*fk, f)))
        .map(|(id, fk)| ForeignKeySnapshot {
            properties: model.property_names(fk.properties()),
            principal_entity_type: model.entity_type_name(fk.principal_entity_type()).to_string(),
            principal_key: key_names(model, fk.principal_key()),
            is_unique: fk.is_unique(),
            is_required: model.is_required(id),
            delete_behavior: fk.delete_behavior(),
            dependent_to_principal: model
                .navigation_name(fk.dependent_to_principal())
                .map(str::to_string),
            principal_to_dependent: model
                .navigation_name(fk.principal_to_dependent())
                .map(str::to_string),
        })
        .collect();

    let indexes = entity
        .declared_indexes()
        .iter()
        .filter_map(|i| model.index(*i))
        .map(|index| IndexSnapshot {
            properties: names(model, index.properties()),
            is_unique: index.is_unique(),
        })
        .collect();

    let navigations = entity
        .declared_navigations()
        .iter()
        .filter_map(|n| model.navigation(*n))
        .map(|navigation| {
            let target = model
                .foreign_key(navigation.foreign_key())
                .map(|fk| {
                    if navigation.points_to_principal() {
                        fk.principal_entity_type()
                    } else {
                        fk.declaring_entity_type()
                    }
                })
                .map(|id| model.entity_type_name(id).to_string())
                .unwrap_or_default();
            NavigationSnapshot {
                name: navigation.name().to_string(),
                target,
                is_collection: navigation.is_collection(),
                points_to_principal: navigation.points_to_principal(),
            }
        })
        .collect();

    EntityTypeSnapshot {
        name: entity.name().to_string(),
        base_type: entity
            .base_type()
            .map(|base| model.entity_type_name(base).to_string()),
        is_shadow: entity.is_shadow(),
        properties,
        primary_key: entity.declared_primary_key().map(|pk| key_names(model, pk)),
        keys: entity
            .declared_keys()
            .iter()
            .map(|key| key_names(model, *key))
            .collect(),
        foreign_keys,
        indexes,
        navigations,
    }
}

fn key_names(model: &Model, key: KeyId) -> Vec<String> {
    model
        .key(key)
        .map(|k| names(model, k.properties()))
        .unwrap_or_default()
}

fn names(model: &Model, properties: &[PropertyId]) -> Vec<String> {
    model.property_names(properties)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{model_builder, CUSTOMER, ORDER, SPECIAL_ORDER};
    use keystone_core::ConfigurationSource::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> Model {
        let mut mb = model_builder();
        let customer = mb.entity(CUSTOMER, Explicit).unwrap().id();
        mb.entity_type_builder(customer)
            .unwrap()
            .primary_key(&["Id"], Explicit)
            .unwrap();
        let order = mb.entity(ORDER, Explicit).unwrap().id();
        mb.entity_type_builder(order)
            .unwrap()
            .primary_key(&["Id"], Explicit)
            .unwrap();
        mb.entity_type_builder(order)
            .unwrap()
            .has_one(customer, Some("Customer"))
            .unwrap()
            .unwrap()
            .with_many(Some("Orders"))
            .unwrap()
            .unwrap()
            .has_foreign_key(&["CustomerId"], Explicit)
            .unwrap()
            .unwrap();
        mb.entity(SPECIAL_ORDER, Explicit)
            .unwrap()
            .has_base_type(Some(ORDER), Explicit)
            .unwrap()
            .unwrap();
        mb.into_model()
    }

    #[test]
    fn test_capture_resolves_facets() {
        let snapshot = ModelSnapshot::capture(&sample());

        let names: Vec<&str> = snapshot.entity_types.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![CUSTOMER, ORDER, SPECIAL_ORDER]);

        let order = snapshot.entity_type(ORDER).unwrap();
        assert_eq!(order.primary_key, Some(vec!["Id".to_string()]));
        assert_eq!(order.foreign_keys.len(), 1);
        let fk = &order.foreign_keys[0];
        assert_eq!(fk.properties, vec!["CustomerId".to_string()]);
        assert_eq!(fk.principal_entity_type, CUSTOMER);
        assert_eq!(fk.principal_key, vec!["Id".to_string()]);
        assert!(!fk.is_unique);
        assert!(fk.is_required);
        assert_eq!(fk.delete_behavior, DeleteBehavior::Restrict);
        assert_eq!(fk.dependent_to_principal.as_deref(), Some("Customer"));
        assert_eq!(fk.principal_to_dependent.as_deref(), Some("Orders"));

        let customer = snapshot.entity_type(CUSTOMER).unwrap();
        assert_eq!(
            customer.navigations,
            vec![NavigationSnapshot {
                name: "Orders".to_string(),
                target: ORDER.to_string(),
                is_collection: true,
                points_to_principal: false,
            }]
        );

        let special = snapshot.entity_type(SPECIAL_ORDER).unwrap();
        assert_eq!(special.base_type.as_deref(), Some(ORDER));
        assert_eq!(special.primary_key, None);
        assert!(special.properties.is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let snapshot = ModelSnapshot::capture(&sample());
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"principal_to_dependent\": \"Orders\""));

        let loaded = ModelSnapshot::from_json(&json).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("snapshots").join("model.json");
        let snapshot = ModelSnapshot::capture(&sample());

        snapshot.save(&path).unwrap();
        assert!(path.exists());
        assert_eq!(ModelSnapshot::load(&path).unwrap().id, snapshot.id);
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            ModelSnapshot::load("/nonexistent/path/model.json"),
            Err(MetadataError::FileRead { .. })
        ));

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ModelSnapshot::load(&path),
            Err(MetadataError::FileRead { .. })
        ));
    }
}
