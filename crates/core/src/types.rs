//! Core types used throughout Keystone
//!
//! CLR-side type descriptions for properties, the delete behaviors a
//! relationship can carry, and the answer a member resolver gives about a
//! named member of a type.

use serde::{Deserialize, Serialize};

// ============================================================================
// CLR Types
// ============================================================================

/// Runtime type of a property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params")]
pub enum ClrType {
    /// Boolean true/false
    Bool,
    /// 8-bit unsigned integer
    Byte,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit floating point
    Single,
    /// 64-bit floating point
    Double,
    /// Fixed-point decimal
    Decimal,
    /// Single UTF-16 character
    Char,
    /// UUID
    Guid,
    /// Date and time
    DateTime,
    /// Date and time with offset
    DateTimeOffset,
    /// Time interval
    TimeSpan,
    /// Reference-typed string
    String,
    /// Reference-typed byte array
    Bytes,
    /// Nullable wrapper over a value type
    Nullable(Box<ClrType>),
}

impl ClrType {
    /// Wrap a type in `Nullable`
    pub fn nullable(inner: ClrType) -> Self {
        inner.make_nullable()
    }

    /// Whether `null` is a legal value for this type
    pub fn is_nullable_type(&self) -> bool {
        matches!(
            self,
            ClrType::String | ClrType::Bytes | ClrType::Nullable(_)
        )
    }

    /// Whether this is a non-nullable value type
    pub fn is_value_type(&self) -> bool {
        !self.is_nullable_type()
    }

    /// The type with any nullable wrapper removed
    pub fn unwrap_nullable(&self) -> &ClrType {
        match self {
            ClrType::Nullable(inner) => inner.unwrap_nullable(),
            other => other,
        }
    }

    /// The nullable form of this type. Reference types are already nullable.
    pub fn make_nullable(&self) -> ClrType {
        if self.is_nullable_type() {
            self.clone()
        } else {
            ClrType::Nullable(Box::new(self.clone()))
        }
    }

    /// Whether two types match once nullable wrappers are removed
    pub fn is_compatible_with(&self, other: &ClrType) -> bool {
        self.unwrap_nullable() == other.unwrap_nullable()
    }

    /// Short C#-style name
    pub fn display_name(&self) -> String {
        match self {
            ClrType::Bool => "bool".to_string(),
            ClrType::Byte => "byte".to_string(),
            ClrType::Int16 => "short".to_string(),
            ClrType::Int32 => "int".to_string(),
            ClrType::Int64 => "long".to_string(),
            ClrType::Single => "float".to_string(),
            ClrType::Double => "double".to_string(),
            ClrType::Decimal => "decimal".to_string(),
            ClrType::Char => "char".to_string(),
            ClrType::Guid => "Guid".to_string(),
            ClrType::DateTime => "DateTime".to_string(),
            ClrType::DateTimeOffset => "DateTimeOffset".to_string(),
            ClrType::TimeSpan => "TimeSpan".to_string(),
            ClrType::String => "string".to_string(),
            ClrType::Bytes => "byte[]".to_string(),
            ClrType::Nullable(inner) => format!("{}?", inner.display_name()),
        }
    }
}

impl std::fmt::Display for ClrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Delete Behavior
// ============================================================================

/// What happens to dependents when their principal is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteBehavior {
    /// Prevent deletion while dependents exist
    #[default]
    Restrict,
    /// Set the foreign key to NULL
    SetNull,
    /// Delete the dependents as well
    Cascade,
}

impl DeleteBehavior {
    /// Get SQL keyword
    pub fn to_sql(&self) -> &'static str {
        match self {
            DeleteBehavior::Restrict => "RESTRICT",
            DeleteBehavior::SetNull => "SET NULL",
            DeleteBehavior::Cascade => "CASCADE",
        }
    }

    /// Get all delete behaviors
    pub fn all() -> &'static [DeleteBehavior] {
        &[
            DeleteBehavior::Restrict,
            DeleteBehavior::SetNull,
            DeleteBehavior::Cascade,
        ]
    }
}

impl std::fmt::Display for DeleteBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

// ============================================================================
// Member Kinds
// ============================================================================

/// What a named member of a CLR type turned out to be
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params")]
pub enum MemberKind {
    /// A scalar member of the given type
    Scalar(ClrType),
    /// A single reference to another type
    Reference(String),
    /// A collection of another type
    Collection(String),
    /// No member with that name
    NotFound,
}

impl MemberKind {
    /// Whether this member can back a navigation
    pub fn is_navigation(&self) -> bool {
        matches!(self, MemberKind::Reference(_) | MemberKind::Collection(_))
    }

    /// Whether this member is a collection
    pub fn is_collection(&self) -> bool {
        matches!(self, MemberKind::Collection(_))
    }

    /// Whether a member with this name exists
    pub fn exists(&self) -> bool {
        !matches!(self, MemberKind::NotFound)
    }

    /// Target type name of a navigation member
    pub fn target(&self) -> Option<&str> {
        match self {
            MemberKind::Reference(target) | MemberKind::Collection(target) => Some(target),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
