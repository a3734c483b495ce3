//! Core traits for Keystone
//!
//! This module defines the seams between the metadata builders and the
//! outside world: how CLR members are looked up, and how finished metadata
//! reports its consistency.

use crate::error::MetadataResult;
use crate::types::MemberKind;

// ============================================================================
// MemberResolver Trait
// ============================================================================

/// Answers questions about CLR types without reflection.
///
/// The builders never inspect types themselves. Whoever drives them supplies
/// a resolver, and every "is there a member called X" question goes through
/// it. Members of base types are expected to be visible on derived types.
///
/// # Example
///
/// ```rust,ignore
/// use keystone_core::{ClrType, MemberKind, MemberResolver, TypeRegistry, ClrClass};
///
/// let registry = TypeRegistry::new()
///     .with_class(ClrClass::new("Customer").scalar("Id", ClrType::Int32));
///
/// assert_eq!(
///     registry.resolve_member("Customer", "Id"),
///     MemberKind::Scalar(ClrType::Int32)
/// );
/// ```
pub trait MemberResolver {
    /// Whether a CLR type with this name exists
    fn is_known_type(&self, type_name: &str) -> bool;

    /// Classify the member `member` of `type_name`
    fn resolve_member(&self, type_name: &str, member: &str) -> MemberKind;

    /// All members of `type_name`, base members first, in declaration order
    fn members(&self, type_name: &str) -> Vec<(String, MemberKind)>;

    /// The CLR base type of `type_name`, if any
    fn base_type(&self, type_name: &str) -> Option<String>;

    /// Whether a value of `type_name` can be stored in a member typed `target`
    fn is_assignable_to(&self, type_name: &str, target: &str) -> bool {
        let mut current = Some(type_name.to_string());
        while let Some(name) = current {
            if name == target {
                return true;
            }
            current = self.base_type(&name);
        }
        false
    }
}

// ============================================================================
// Validatable Trait
// ============================================================================

/// Trait for types that can be validated
///
/// Types implementing this trait can check their internal consistency
/// and return validation errors if the state is invalid.
pub trait Validatable {
    /// Validate the current state of the object
    ///
    /// Returns `Ok(())` if valid, or a `MetadataError` describing the problem.
    fn validate(&self) -> MetadataResult<()>;

    /// Check if the object is valid without returning error details
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Get all validation errors (for types that can have multiple errors)
    fn validation_errors(&self) -> Vec<String> {
        match self.validate() {
            Ok(()) => vec![],
            Err(e) => vec![e.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetadataError;

    struct Chain;

    impl MemberResolver for Chain {
        fn is_known_type(&self, type_name: &str) -> bool {
            matches!(type_name, "A" | "B" | "C")
        }

        fn resolve_member(&self, _type_name: &str, _member: &str) -> MemberKind {
            MemberKind::NotFound
        }

        fn members(&self, _type_name: &str) -> Vec<(String, MemberKind)> {
            Vec::new()
        }

        fn base_type(&self, type_name: &str) -> Option<String> {
            match type_name {
                "C" => Some("B".to_string()),
                "B" => Some("A".to_string()),
                _ => None,
            }
        }
    }

    struct AlwaysInvalid;

    impl Validatable for AlwaysInvalid {
        fn validate(&self) -> MetadataResult<()> {
            Err(MetadataError::validation("broken"))
        }
    }

    #[test]
    fn test_default_assignability_walks_base_chain() {
        assert!(Chain.is_assignable_to("C", "A"));
        assert!(Chain.is_assignable_to("B", "B"));
        assert!(!Chain.is_assignable_to("A", "C"));
    }

    #[test]
    fn test_validatable_defaults() {
        assert!(!AlwaysInvalid.is_valid());
        assert_eq!(
            AlwaysInvalid.validation_errors(),
            vec!["Validation error: broken".to_string()]
        );
    }
}
