//! Navigations
//!
//! Assigning navigations to a relationship, finding relationships by their
//! navigations, and the `has_one` / `has_many` fluent entry points.

use super::{EntityTypeBuilder, EntityTypeRef, ModelBuilder, RelationshipBuilder};
use crate::arena::{EntityTypeId, ForeignKeyId, NavigationId};
use crate::relationship_helpers::{inverse_candidates, navigation_candidates, orient};
use keystone_core::{ConfigurationSource, MemberKind, MetadataError, MetadataResult};
use tracing::{debug, trace};

// ============================================================================
// Fluent builders
// ============================================================================

/// Returned by [`EntityTypeBuilder::has_one`]; the declaring entity type
/// holds a reference to the related type
pub struct ReferenceNavigationBuilder<'a> {
    mb: &'a mut ModelBuilder,
    fk: ForeignKeyId,
}

impl<'a> ReferenceNavigationBuilder<'a> {
    pub fn foreign_key(&self) -> ForeignKeyId {
        self.fk
    }

    /// One-to-many: the related type holds a collection of the declaring type
    pub fn with_many(self, collection: Option<&str>) -> MetadataResult<Option<RelationshipBuilder<'a>>> {
        let fk = self.fk;
        let result = self.mb.try_transaction(|mb| {
            if mb.set_unique(fk, false, ConfigurationSource::Explicit).is_none() {
                return Ok(None);
            }
            mb.set_navigation(fk, collection, false, ConfigurationSource::Explicit)
        })?;
        Ok(result.map(|id| RelationshipBuilder::new(self.mb, id)))
    }

    /// One-to-one: the related type holds a single reference back
    pub fn with_one(self, reference: Option<&str>) -> MetadataResult<Option<RelationshipBuilder<'a>>> {
        let fk = self.fk;
        let result = self.mb.try_transaction(|mb| {
            if mb.set_unique(fk, true, ConfigurationSource::Explicit).is_none() {
                return Ok(None);
            }
            mb.set_navigation(fk, reference, false, ConfigurationSource::Explicit)
        })?;
        Ok(result.map(|id| RelationshipBuilder::new(self.mb, id)))
    }
}

/// Returned by [`EntityTypeBuilder::has_many`]; the declaring entity type
/// holds a collection of the related type
pub struct CollectionNavigationBuilder<'a> {
    mb: &'a mut ModelBuilder,
    fk: ForeignKeyId,
}

impl<'a> CollectionNavigationBuilder<'a> {
    pub fn foreign_key(&self) -> ForeignKeyId {
        self.fk
    }

    /// The related type holds a single reference back
    pub fn with_one(self, reference: Option<&str>) -> MetadataResult<Option<RelationshipBuilder<'a>>> {
        let result = self
            .mb
            .set_navigation(self.fk, reference, true, ConfigurationSource::Explicit)?;
        Ok(result.map(|id| RelationshipBuilder::new(self.mb, id)))
    }
}

impl<'a> EntityTypeBuilder<'a> {
    /// Start an explicit relationship in which this entity type is the
    /// dependent and `navigation` references `related`
    pub fn has_one<E: EntityTypeRef>(
        &mut self,
        related: E,
        navigation: Option<&str>,
    ) -> MetadataResult<Option<ReferenceNavigationBuilder<'_>>> {
        let source = ConfigurationSource::Explicit;
        let entity = self.id;
        let fk = self.mb.try_transaction(|mb| {
            let Some(related) = related.resolve_entity_type(mb, source)? else {
                return Ok(None);
            };
            mb.relationship(entity, related, navigation, None, source)
        })?;
        Ok(fk.map(|fk| ReferenceNavigationBuilder {
            mb: &mut *self.mb,
            fk,
        }))
    }

    /// Start an explicit relationship in which this entity type is the
    /// principal and `navigation` holds many `related`
    pub fn has_many<E: EntityTypeRef>(
        &mut self,
        related: E,
        navigation: Option<&str>,
    ) -> MetadataResult<Option<CollectionNavigationBuilder<'_>>> {
        let source = ConfigurationSource::Explicit;
        let entity = self.id;
        let fk = self.mb.try_transaction(|mb| {
            let Some(related) = related.resolve_entity_type(mb, source)? else {
                return Ok(None);
            };
            let Some(fk) = mb.relationship(related, entity, None, navigation, source)? else {
                return Ok(None);
            };
            Ok(mb.set_unique(fk, false, source).map(|_| fk))
        })?;
        Ok(fk.map(|fk| CollectionNavigationBuilder {
            mb: &mut *self.mb,
            fk,
        }))
    }
}

// ============================================================================
// ModelBuilder: navigations
// ============================================================================

impl ModelBuilder {
    /// Set or clear one navigation of `fk`.
    ///
    /// A navigation of the same name on another relationship is removed
    /// when its source allows it, along with that relationship if nothing
    /// else holds it.
    pub(crate) fn set_navigation(
        &mut self,
        fk: ForeignKeyId,
        name: Option<&str>,
        to_principal: bool,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<ForeignKeyId>> {
        let Some(foreign_key) = self.model.foreign_key(fk) else {
            return Ok(None);
        };
        let (owner, target, slot, other_slot) = if to_principal {
            (
                foreign_key.declaring_entity_type,
                foreign_key.principal_entity_type,
                foreign_key.dependent_to_principal,
                foreign_key.principal_to_dependent,
            )
        } else {
            (
                foreign_key.principal_entity_type,
                foreign_key.declaring_entity_type,
                foreign_key.principal_to_dependent,
                foreign_key.dependent_to_principal,
            )
        };
        let is_self_referencing = foreign_key.is_self_referencing();

        let Some(name) = name else {
            return Ok(self.clear_navigation(fk, slot, source));
        };

        if let Some(current) = slot.and_then(|id| self.model.navigation(id)) {
            if current.name == name {
                if let Some(navigation) = slot.and_then(|id| self.model.navigation_mut(id)) {
                    navigation.source = source.merge(Some(navigation.source));
                }
                return Ok(Some(fk));
            }
        }
        if is_self_referencing && self.model.navigation_name(other_slot) == Some(name) {
            return Err(MetadataError::DuplicateNavigation {
                entity: self.model.entity_type_name(owner).to_string(),
                navigation: name.to_string(),
            });
        }
        let is_collection = self.check_navigation_member(owner, name, target, to_principal, fk)?;

        if self.is_ignored(owner, name, source) {
            trace!(
                "Navigation '{}.{}' is ignored, {} request rejected",
                self.model.entity_type_name(owner),
                name,
                source
            );
            return Ok(None);
        }

        Ok(self.transaction(|mb| {
            if let Some(current) = slot {
                let existing = mb.model.navigation(current)?.source;
                if !source.overrides(Some(existing)) {
                    return None;
                }
                mb.model.remove_navigation_node(current);
            }
            mb.remove_conflicting_navigations(owner, name, fk, source)?;
            if mb.model.find_property(owner, name).is_some()
                || !mb.model.find_derived_properties(owner, name).is_empty()
            {
                trace!("'{}' is already a property", name);
                return None;
            }
            if !to_principal {
                mb.set_unique(fk, !is_collection, source)?;
            }

            mb.clear_ignored(owner, name);
            mb.model
                .add_navigation(owner, name, fk, to_principal, is_collection, source);
            debug!(
                "Added navigation '{}.{}' at {}",
                mb.model.entity_type_name(owner),
                name,
                source
            );
            Some(fk)
        }))
    }

    fn clear_navigation(
        &mut self,
        fk: ForeignKeyId,
        slot: Option<NavigationId>,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let Some(current) = slot else {
            return Some(fk);
        };
        let navigation = self.model.navigation(current)?;
        if !source.overrides(Some(navigation.source)) {
            trace!("Navigation '{}' configured at a higher source", navigation.name);
            return None;
        }
        self.model.remove_navigation_node(current);
        Some(fk)
    }

    /// Whether the CLR member `name` can be a navigation from `owner` to
    /// `target`; returns whether it is a collection
    fn check_navigation_member(
        &self,
        owner: EntityTypeId,
        name: &str,
        target: EntityTypeId,
        to_principal: bool,
        fk: ForeignKeyId,
    ) -> MetadataResult<bool> {
        let entity = self.model.entity_type_name(owner).to_string();
        let target_name = self.model.entity_type_name(target);
        let is_collection = match self.member_kind(owner, name) {
            MemberKind::Reference(expected) | MemberKind::Collection(expected)
                if !self.resolver.is_assignable_to(target_name, &expected) =>
            {
                return Err(MetadataError::NavigationTargetMismatch {
                    entity,
                    navigation: name.to_string(),
                    expected,
                    actual: target_name.to_string(),
                });
            }
            MemberKind::Reference(_) => false,
            MemberKind::Collection(_) => true,
            MemberKind::Scalar(_) => {
                return Err(MetadataError::NavigationIsProperty {
                    entity,
                    member: name.to_string(),
                });
            }
            MemberKind::NotFound if self.model.entity_type(owner).is_some_and(|e| e.has_clr_type) => {
                return Err(MetadataError::navigation_not_found(entity, name));
            }
            // Shadow navigations take their multiplicity from the relationship.
            MemberKind::NotFound => {
                !to_principal
                    && !self
                        .model
                        .foreign_key(fk)
                        .and_then(|f| f.configured_is_unique())
                        .unwrap_or(false)
            }
        };
        if is_collection && to_principal {
            return Err(MetadataError::NavigationToPrincipalIsCollection {
                entity,
                navigation: name.to_string(),
            });
        }
        Ok(is_collection)
    }

    /// Remove navigations named `name` in the hierarchy of `owner` that
    /// belong to relationships other than `fk`
    fn remove_conflicting_navigations(
        &mut self,
        owner: EntityTypeId,
        name: &str,
        fk: ForeignKeyId,
        source: ConfigurationSource,
    ) -> Option<()> {
        let mut conflicting: Vec<NavigationId> =
            self.model.find_navigation(owner, name).into_iter().collect();
        conflicting.extend(self.model.find_derived_navigations(owner, name));

        for id in conflicting {
            let navigation = self.model.navigation(id)?;
            let other = navigation.foreign_key;
            if other == fk {
                continue;
            }
            if !source.overrides(Some(navigation.source)) {
                trace!("Navigation '{}' belongs to a higher source relationship", name);
                return None;
            }
            self.model.remove_navigation_node(id);
            let unconfigured = self.model.foreign_key(other).is_some_and(|f| {
                f.navigation_ids().is_empty()
                    && f.properties_source.is_none()
                    && source.overrides(Some(f.source))
            });
            if unconfigured {
                self.remove_foreign_key(other, source)?;
            }
        }
        Some(())
    }

    /// Whether a navigation `name` from `owner` to `target` could be added
    /// without displacing anything
    pub(crate) fn navigation_fits(
        &self,
        owner: EntityTypeId,
        name: &str,
        target: EntityTypeId,
        to_principal: bool,
    ) -> bool {
        let member_fits = match self.member_kind(owner, name) {
            MemberKind::Reference(expected) => self
                .resolver
                .is_assignable_to(self.model.entity_type_name(target), &expected),
            MemberKind::Collection(expected) => {
                !to_principal
                    && self
                        .resolver
                        .is_assignable_to(self.model.entity_type_name(target), &expected)
            }
            MemberKind::Scalar(_) => false,
            MemberKind::NotFound => !self
                .model
                .entity_type(owner)
                .is_some_and(|e| e.has_clr_type),
        };
        member_fits
            && self.model.find_navigation(owner, name).is_none()
            && self.model.find_derived_navigations(owner, name).is_empty()
            && self.model.find_property(owner, name).is_none()
            && self.model.find_derived_properties(owner, name).is_empty()
    }

    /// Find the relationship between `dependent` and `principal` with these
    /// navigations, or create one with shadow dependent properties
    pub(crate) fn relationship(
        &mut self,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        to_principal: Option<&str>,
        to_dependent: Option<&str>,
        source: ConfigurationSource,
    ) -> MetadataResult<Option<ForeignKeyId>> {
        if let Some(existing) = self.find_relationship(dependent, principal, to_principal, to_dependent) {
            return self.try_transaction(|mb| {
                let Some(fk) = mb.model.foreign_key_mut(existing) else {
                    return Ok(None);
                };
                fk.source = source.merge(Some(fk.source));
                let (dependent_end, principal_end) =
                    if fk.declaring_entity_type == dependent && fk.principal_entity_type == principal {
                        (to_principal, to_dependent)
                    } else {
                        (to_dependent, to_principal)
                    };
                if dependent_end.is_some()
                    && mb.set_navigation(existing, dependent_end, true, source)?.is_none()
                {
                    return Ok(None);
                }
                if principal_end.is_some() {
                    return mb.set_navigation(existing, principal_end, false, source);
                }
                Ok(Some(existing))
            });
        }

        self.try_transaction(|mb| {
            let shape = super::relationship::ForeignKeyShape {
                dependent,
                principal,
                properties: None,
                principal_key: None,
            };
            let Some(fk) = mb.create_foreign_key(shape, None, None, source, to_principal) else {
                return Ok(None);
            };
            let Some(fk) = mb.set_navigation(fk, to_principal, true, source)? else {
                return Ok(None);
            };
            mb.set_navigation(fk, to_dependent, false, source)
        })
    }

    /// An existing relationship that holds one of the requested navigations
    /// and no conflicting one, in either orientation
    fn find_relationship(
        &self,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        to_principal: Option<&str>,
        to_dependent: Option<&str>,
    ) -> Option<ForeignKeyId> {
        let matches = |fk: ForeignKeyId, near: Option<&str>, far: Option<&str>| {
            let Some(foreign_key) = self.model.foreign_key(fk) else {
                return false;
            };
            let current_near = self.model.navigation_name(foreign_key.dependent_to_principal);
            let current_far = self.model.navigation_name(foreign_key.principal_to_dependent);
            let fits = |requested: Option<&str>, current: Option<&str>| {
                requested.is_none() || current.is_none() || requested == current
            };
            let shares_one = (near.is_some() && near == current_near) || (far.is_some() && far == current_far);
            let both_empty = near.is_none()
                && far.is_none()
                && current_near.is_none()
                && current_far.is_none();
            (shares_one && fits(near, current_near) && fits(far, current_far)) || both_empty
        };

        let same_orientation = self
            .model
            .foreign_keys(dependent)
            .into_iter()
            .filter(|fk| {
                self.model
                    .foreign_key(*fk)
                    .is_some_and(|f| f.principal_entity_type == principal)
            })
            .find(|fk| matches(*fk, to_principal, to_dependent));
        if same_orientation.is_some() || (to_principal.is_none() && to_dependent.is_none()) {
            return same_orientation;
        }

        self.model
            .foreign_keys(principal)
            .into_iter()
            .filter(|fk| {
                self.model
                    .foreign_key(*fk)
                    .is_some_and(|f| f.principal_entity_type == dependent)
            })
            .find(|fk| matches(*fk, to_dependent, to_principal))
    }

    /// Pair the CLR navigation members of `entity` with their inverses and
    /// create the relationships at `Convention`. Returns how many
    /// relationships were found or created.
    pub fn discover_relationships(&mut self, entity: EntityTypeId) -> MetadataResult<usize> {
        let source = ConfigurationSource::Convention;
        let Some(entity_type) = self.model.entity_type(entity) else {
            return Err(MetadataError::EntityTypeNotFound(entity.to_string()));
        };
        if !entity_type.has_clr_type {
            return Ok(0);
        }
        let type_name = entity_type.name.clone();

        let mut count = 0;
        for candidate in navigation_candidates(self.resolver.as_ref(), &type_name) {
            if self.model.find_navigation(entity, &candidate.name).is_some()
                || self.is_ignored(entity, &candidate.name, source)
            {
                continue;
            }
            let Some(target) = self.get_or_add_entity_type(&candidate.target, source) else {
                continue;
            };

            let inverses: Vec<_> = inverse_candidates(self.resolver.as_ref(), &type_name, &candidate)
                .into_iter()
                .filter(|inverse| {
                    self.model.find_navigation(target, &inverse.name).is_none()
                        && !self.is_ignored(target, &inverse.name, source)
                })
                .collect();
            let inverse = match inverses.as_slice() {
                [single] => Some(single),
                _ => None,
            };
            if inverses.len() > 1 {
                trace!(
                    "Navigation '{}.{}' has {} possible inverses, leaving it unpaired",
                    type_name,
                    candidate.name,
                    inverses.len()
                );
            }

            let Some(discovered) = orient(&type_name, &candidate, inverse) else {
                continue;
            };
            let (dependent, principal) = if discovered.dependent == type_name {
                (entity, target)
            } else {
                (target, entity)
            };
            let created = self.relationship(
                dependent,
                principal,
                discovered.to_principal.as_deref(),
                discovered.to_dependent.as_deref(),
                source,
            )?;
            if created.is_some() {
                count += 1;
            }
        }

        debug!("Discovered {} relationships from '{}'", count, type_name);
        Ok(count)
    }
}

// ============================================================================
// Tests
// ============================================================================
