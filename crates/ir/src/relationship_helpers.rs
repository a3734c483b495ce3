//! Relationship Helper Functions
//!
//! Naming and discovery helpers used by the relationship builders.
//!
//! ## Shadow names
//!
//! When a relationship needs dependent properties the model does not have,
//! they are named after the navigation (or the principal type) followed by
//! the principal key property:
//!
//! - navigation `Customer`, key property `Id` -> `CustomerId`
//! - no navigation, principal `Customer`, key `TempId` -> `CustomerTempId`
//!
//! Names that are already taken get the first free numeric suffix
//! (`CustomerId1`, `CustomerId2`, ...).
//!
//! ## Navigation discovery
//!
//! CLR reference and collection members are navigation candidates. A
//! candidate pairs with an inverse member on the target type that points
//! back at exactly the declaring type.

use keystone_core::{MemberKind, MemberResolver};

// ============================================================================
// Name Generation
// ============================================================================

/// Name of a shadow dependent property for one principal key property
///
/// # Examples
///
/// - ("Customer", "Id") -> "CustomerId"
/// - ("Owner", "TempId") -> "OwnerTempId"
pub fn shadow_property_name(prefix: &str, key_property: &str) -> String {
    format!("{}{}", prefix, key_property)
}

/// `base` if it is free, otherwise `base` with the first free numeric suffix
///
/// # Examples
///
/// - "CustomerId" with nothing taken -> "CustomerId"
/// - "CustomerId" with "CustomerId" taken -> "CustomerId1"
pub fn uniquify(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1usize..)
        .map(|suffix| format!("{}{}", base, suffix))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

// ============================================================================
// Navigation Candidates
// ============================================================================

/// A CLR member that could back a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationCandidate {
    pub name: String,
    /// Type the member points at
    pub target: String,
    pub is_collection: bool,
}

/// All reference and collection members of `type_name`, base members first
pub fn navigation_candidates(resolver: &dyn MemberResolver, type_name: &str) -> Vec<NavigationCandidate> {
    resolver
        .members(type_name)
        .into_iter()
        .filter_map(|(name, kind)| match kind {
            MemberKind::Reference(target) => Some(NavigationCandidate {
                name,
                target,
                is_collection: false,
            }),
            MemberKind::Collection(target) => Some(NavigationCandidate {
                name,
                target,
                is_collection: true,
            }),
            _ => None,
        })
        .collect()
}

/// Members of `candidate.target` that point back at exactly `declaring_type`.
///
/// On a self-referencing type the candidate itself is excluded.
pub fn inverse_candidates(
    resolver: &dyn MemberResolver,
    declaring_type: &str,
    candidate: &NavigationCandidate,
) -> Vec<NavigationCandidate> {
    navigation_candidates(resolver, &candidate.target)
        .into_iter()
        .filter(|inverse| inverse.target == declaring_type)
        .filter(|inverse| !(candidate.target == declaring_type && inverse.name == candidate.name))
        .collect()
}

/// How a discovered navigation pair maps onto a relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredRelationship {
    pub dependent: String,
    pub principal: String,
    pub to_principal: Option<String>,
    pub to_dependent: Option<String>,
}

/// Orient a candidate and its optional inverse.
///
/// A reference on the declaring side makes the declaring type the
/// dependent; a collection makes it the principal. Two collections cannot
/// form a relationship and yield `None`.
pub fn orient(
    declaring_type: &str,
    candidate: &NavigationCandidate,
    inverse: Option<&NavigationCandidate>,
) -> Option<DiscoveredRelationship> {
    let inverse_is_collection = inverse.is_some_and(|i| i.is_collection);
    let inverse_name = inverse.map(|i| i.name.clone());

    match (candidate.is_collection, inverse_is_collection) {
        (true, true) => None,
        (true, false) => Some(DiscoveredRelationship {
            dependent: candidate.target.clone(),
            principal: declaring_type.to_string(),
            to_principal: inverse_name,
            to_dependent: Some(candidate.name.clone()),
        }),
        (false, _) => Some(DiscoveredRelationship {
            dependent: declaring_type.to_string(),
            principal: candidate.target.clone(),
            to_principal: Some(candidate.name.clone()),
            to_dependent: inverse_name,
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::{ClrClass, ClrType, TypeRegistry};
    use pretty_assertions::assert_eq;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_class(
                ClrClass::new("Blog")
                    .scalar("Id", ClrType::Int32)
                    .collection("Posts", "Post")
                    .reference("Featured", "Post"),
            )
            .with_class(
                ClrClass::new("Post")
                    .scalar("Id", ClrType::Int32)
                    .reference("Blog", "Blog"),
            )
            .with_class(
                ClrClass::new("Node")
                    .reference("Parent", "Node")
                    .collection("Children", "Node"),
            )
    }

    #[test]
    fn test_shadow_property_name() {
        assert_eq!(shadow_property_name("Customer", "Id"), "CustomerId");
        assert_eq!(shadow_property_name("Owner", "TempId"), "OwnerTempId");
    }

    #[test]
    fn test_uniquify() {
        assert_eq!(uniquify("CustomerId", |_| false), "CustomerId");
        assert_eq!(uniquify("CustomerId", |n| n == "CustomerId"), "CustomerId1");
        assert_eq!(
            uniquify("CustomerId", |n| n == "CustomerId" || n == "CustomerId1"),
            "CustomerId2"
        );
    }

    #[test]
    fn test_navigation_candidates_skip_scalars() {
        let names: Vec<String> = navigation_candidates(&registry(), "Blog")
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Posts".to_string(), "Featured".to_string()]);
    }

    #[test]
    fn test_inverse_candidates() {
        let registry = registry();
        let posts = &navigation_candidates(&registry, "Blog")[0];
        let inverses = inverse_candidates(&registry, "Blog", posts);
        assert_eq!(inverses.len(), 1);
        assert_eq!(inverses[0].name, "Blog");

        let parent = &navigation_candidates(&registry, "Node")[0];
        let inverses = inverse_candidates(&registry, "Node", parent);
        let names: Vec<&str> = inverses.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Children"]);
    }

    #[test]
    fn test_orient() {
        let registry = registry();
        let candidates = navigation_candidates(&registry, "Blog");
        let inverse = navigation_candidates(&registry, "Post").remove(0);

        let posts = orient("Blog", &candidates[0], Some(&inverse)).unwrap();
        assert_eq!(
            posts,
            DiscoveredRelationship {
                dependent: "Post".to_string(),
                principal: "Blog".to_string(),
                to_principal: Some("Blog".to_string()),
                to_dependent: Some("Posts".to_string()),
            }
        );

        let featured = orient("Blog", &candidates[1], None).unwrap();
        assert_eq!(featured.dependent, "Blog");
        assert_eq!(featured.to_principal.as_deref(), Some("Featured"));
        assert_eq!(featured.to_dependent, None);

        let collection = NavigationCandidate {
            name: "Tags".to_string(),
            target: "Tag".to_string(),
            is_collection: true,
        };
        assert!(orient("Blog", &collection, Some(&collection)).is_none());
    }
}
