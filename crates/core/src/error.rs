//! Error types for Keystone
//!
//! Source conflicts are not errors: a builder call that loses to existing
//! configuration returns `None`. The variants here describe requests that
//! can never succeed, such as naming a member that does not exist or
//! declaring a primary key on a derived entity type.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Keystone
#[derive(Debug, Error)]
pub enum MetadataError {
    // ========================================================================
    // Entity Type Errors
    // ========================================================================
    /// Entity type not found
    #[error("Entity type not found: {0}")]
    EntityTypeNotFound(String),

    /// Base type assignment would create a cycle
    #[error("Setting base type '{base}' on '{entity}' would create a circular inheritance chain")]
    CircularInheritance { entity: String, base: String },

    /// Entity type is neither end of a relationship
    #[error("Entity type '{entity}' is not part of the relationship between '{dependent}' and '{principal}'")]
    EntityTypeNotInRelationship {
        entity: String,
        dependent: String,
        principal: String,
    },

    // ========================================================================
    // Member Errors
    // ========================================================================
    /// Shadow property not found
    #[error("Property '{property}' not found on entity type '{entity}'")]
    PropertyNotFound { entity: String, property: String },

    /// No CLR member backs the requested property
    #[error("The property '{property}' cannot be added to entity type '{entity}' because no CLR member with that name exists")]
    NoClrProperty { entity: String, property: String },

    /// A property was requested with the name of a navigation member
    #[error("'{member}' on entity type '{entity}' is a navigation, not a scalar property")]
    MemberIsNavigation { entity: String, member: String },

    /// No CLR member backs the requested navigation
    #[error("Navigation '{navigation}' not found on entity type '{entity}'")]
    NavigationNotFound { entity: String, navigation: String },

    /// A navigation was requested with the name of a property
    #[error("'{member}' on entity type '{entity}' is a property and cannot be used as a navigation")]
    NavigationIsProperty { entity: String, member: String },

    /// Navigation member points at the wrong type
    #[error("Navigation '{entity}.{navigation}' targets '{actual}', expected '{expected}'")]
    NavigationTargetMismatch {
        entity: String,
        navigation: String,
        expected: String,
        actual: String,
    },

    /// Collection navigation used as dependent-to-principal
    #[error("Navigation '{entity}.{navigation}' is a collection and cannot point to the principal end")]
    NavigationToPrincipalIsCollection { entity: String, navigation: String },

    /// Same navigation name used for both ends of a relationship
    #[error("The navigation '{navigation}' cannot be used for both ends of the relationship on '{entity}'")]
    DuplicateNavigation { entity: String, navigation: String },

    // ========================================================================
    // Key Errors
    // ========================================================================
    /// Primary key on a derived type
    #[error("A primary key cannot be set on '{entity}' because it is a derived type; keys are inherited from the root type")]
    DerivedEntityTypeKey { entity: String },

    /// Empty property list for a key, index or foreign key
    #[error("The property list for a {element} on '{entity}' cannot be empty")]
    EmptyPropertyList { entity: String, element: String },

    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// General validation error
    #[error("Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file read error
    #[error("Failed to read file '{path}': {message}")]
    FileRead { path: PathBuf, message: String },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MetadataError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        MetadataError::Validation(msg.into())
    }

    /// Create a property-not-found error
    pub fn property_not_found(entity: impl Into<String>, property: impl Into<String>) -> Self {
        MetadataError::PropertyNotFound {
            entity: entity.into(),
            property: property.into(),
        }
    }

    /// Create a no-CLR-property error
    pub fn no_clr_property(entity: impl Into<String>, property: impl Into<String>) -> Self {
        MetadataError::NoClrProperty {
            entity: entity.into(),
            property: property.into(),
        }
    }

    /// Create a navigation-not-found error
    pub fn navigation_not_found(entity: impl Into<String>, navigation: impl Into<String>) -> Self {
        MetadataError::NavigationNotFound {
            entity: entity.into(),
            navigation: navigation.into(),
        }
    }

    /// Create an empty-property-list error
    pub fn empty_property_list(entity: impl Into<String>, element: impl Into<String>) -> Self {
        MetadataError::EmptyPropertyList {
            entity: entity.into(),
            element: element.into(),
        }
    }
}

/// Result type alias using MetadataError
pub type MetadataResult<T> = Result<T, MetadataError>;

// ============================================================================
// Tests
// ============================================================================
