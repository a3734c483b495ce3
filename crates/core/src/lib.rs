//! # Keystone Core
//!
//! Core types, traits, and error handling for Keystone.
//!
//! This crate provides the foundational building blocks used by the
//! metadata builders, including:
//!
//! - **Sources**: `ConfigurationSource` and source-gated facets
//! - **Types**: CLR types, delete behaviors, member kinds
//! - **Traits**: `MemberResolver` and `Validatable`
//! - **Registry**: an in-memory `MemberResolver`
//! - **Config**: `BuilderConfig`
//! - **Errors**: Unified error handling with `MetadataError` and `MetadataResult`
//!

pub mod config;
pub mod error;
pub mod registry;
pub mod source;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use config::BuilderConfig;
pub use error::{MetadataError, MetadataResult};
pub use registry::{ClrClass, TypeRegistry};
pub use source::{Configurable, ConfigurationSource, Sourced};
pub use traits::{MemberResolver, Validatable};
pub use types::{ClrType, DeleteBehavior, MemberKind};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
