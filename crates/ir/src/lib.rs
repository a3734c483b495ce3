//! # Keystone IR
//!
//! The entity/relationship metadata graph and the source-aware builders
//! that configure it.
//!
//! ## Core Concepts
//!
//! - **Model**: the graph of entity types and everything declared on them
//! - **EntityType**: a mapped concept, backed by a CLR type or shadow only
//! - **Property / Key / Index**: scalar members and the sets built from them
//! - **ForeignKey**: a relationship from a dependent to a principal key,
//!   with up to two **Navigation**s
//! - **ModelBuilder**: every change goes through it, tagged with a
//!   `ConfigurationSource`. Lower sources never undo higher ones.
//! - **ModelSnapshot**: the resolved read-only view, serializable to JSON
//!
//! ## Example
//!
//! ```rust,ignore
//! use keystone_ir::prelude::*;
//!
//! let registry = TypeRegistry::new()
//!     .with_class(ClrClass::new("Customer").scalar("Id", ClrType::Int32))
//!     .with_class(
//!         ClrClass::new("Order")
//!             .scalar("Id", ClrType::Int32)
//!             .reference("Customer", "Customer"),
//!     );
//!
//! let mut mb = ModelBuilder::new(registry);
//! let customer = mb.entity("Customer", ConfigurationSource::Explicit).unwrap().id();
//! mb.entity_type_builder(customer).unwrap().primary_key(&["Id"], ConfigurationSource::Explicit)?;
//! ```

pub mod arena;
pub mod builders;
pub mod entity_type;
pub mod foreign_key;
pub mod key;
pub mod model;
pub mod property;
pub mod relationship_helpers;
pub mod snapshot;
pub mod validation;

#[cfg(test)]
mod fixtures;

// Re-export commonly used types at crate root
pub use arena::{EntityTypeId, ForeignKeyId, IndexId, KeyId, NavigationId, PropertyId};
pub use builders::{
    CollectionNavigationBuilder, EntityTypeBuilder, EntityTypeRef, IndexBuilder, KeyBuilder,
    ModelBuilder, PropertyBuilder, PropertyRef, ReferenceNavigationBuilder, RelationshipBuilder,
};
pub use entity_type::EntityType;
pub use foreign_key::{ForeignKey, Navigation};
pub use key::{Index, Key};
pub use model::Model;
pub use property::Property;
pub use snapshot::{
    EntityTypeSnapshot, ForeignKeySnapshot, IndexSnapshot, ModelSnapshot, NavigationSnapshot,
    PropertySnapshot,
};
pub use validation::{ValidationResult, ValidationRule, Validator};

// Re-export core types that are commonly used with the builders
pub use keystone_core::{
    BuilderConfig, ClrClass, ClrType, ConfigurationSource, DeleteBehavior, MemberKind,
    MemberResolver, MetadataError, MetadataResult, TypeRegistry,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient re-exports for common usage
pub mod prelude {
    pub use crate::{
        // Builders
        BuilderConfig,
        ClrClass,
        ClrType,
        ConfigurationSource,
        DeleteBehavior,
        EntityTypeBuilder,
        MetadataError,
        MetadataResult,
        // Graph
        Model,
        ModelBuilder,
        ModelSnapshot,
        RelationshipBuilder,
        TypeRegistry,
        Validator,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_prelude_builds_a_model() {
        use crate::prelude::*;

        let registry = TypeRegistry::new().with_class(ClrClass::new("Tag").scalar("Id", ClrType::Int32));
        let mut mb = ModelBuilder::new(registry);
        let tag = mb.entity("Tag", ConfigurationSource::Explicit).unwrap().id();
        mb.entity_type_builder(tag)
            .unwrap()
            .primary_key(&["Id"], ConfigurationSource::Explicit)
            .unwrap()
            .unwrap();

        let snapshot = mb.snapshot().unwrap();
        assert_eq!(snapshot.entity_types.len(), 1);
        assert_eq!(snapshot.entity_types[0].primary_key, Some(vec!["Id".to_string()]));
    }
}
