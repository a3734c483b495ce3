//! In-memory CLR type registry
//!
//! `TypeRegistry` is the stock [`MemberResolver`]: callers describe their
//! classes up front (scalars, references, collections, base class) and hand
//! the registry to a model builder.

use crate::traits::MemberResolver;
use crate::types::{ClrType, MemberKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Description of one CLR class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClrClass {
    /// Type name
    pub name: String,
    /// Base class name, if any
    pub base: Option<String>,
    /// Declared members in declaration order
    pub members: Vec<(String, MemberKind)>,
}

impl ClrClass {
    /// Create a class with no members
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            members: Vec::new(),
        }
    }

    /// Set the base class (builder pattern)
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Add a scalar member (builder pattern)
    pub fn scalar(mut self, name: impl Into<String>, ty: ClrType) -> Self {
        self.members.push((name.into(), MemberKind::Scalar(ty)));
        self
    }

    /// Add a reference navigation member (builder pattern)
    pub fn reference(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.members
            .push((name.into(), MemberKind::Reference(target.into())));
        self
    }

    /// Add a collection navigation member (builder pattern)
    pub fn collection(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.members
            .push((name.into(), MemberKind::Collection(target.into())));
        self
    }

    fn declared(&self, member: &str) -> Option<&MemberKind> {
        self.members
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, kind)| kind)
    }
}

/// A set of CLR classes keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeRegistry {
    classes: BTreeMap<String, ClrClass>,
}

impl TypeRegistry {
    /// Create an empty registry; every entity type is then shadow-only
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class (builder pattern)
    pub fn with_class(mut self, class: ClrClass) -> Self {
        self.register(class);
        self
    }

    /// Register or replace a class
    pub fn register(&mut self, class: ClrClass) {
        self.classes.insert(class.name.clone(), class);
    }

    /// Look up a class
    pub fn class(&self, name: &str) -> Option<&ClrClass> {
        self.classes.get(name)
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Base chain of `name`, starting with `name` itself. Stops on cycles.
    fn chain(&self, name: &str) -> Vec<&ClrClass> {
        let mut chain: Vec<&ClrClass> = Vec::new();
        let mut current = self.classes.get(name);
        while let Some(class) = current {
            if chain.iter().any(|seen| seen.name == class.name) {
                break;
            }
            chain.push(class);
            current = class.base.as_deref().and_then(|base| self.classes.get(base));
        }
        chain
    }
}

impl MemberResolver for TypeRegistry {
    fn is_known_type(&self, type_name: &str) -> bool {
        self.classes.contains_key(type_name)
    }

    fn resolve_member(&self, type_name: &str, member: &str) -> MemberKind {
        self.chain(type_name)
            .into_iter()
            .find_map(|class| class.declared(member).cloned())
            .unwrap_or(MemberKind::NotFound)
    }

    fn members(&self, type_name: &str) -> Vec<(String, MemberKind)> {
        let mut members: Vec<(String, MemberKind)> = Vec::new();
        for class in self.chain(type_name).into_iter().rev() {
            for (name, kind) in &class.members {
                match members.iter_mut().find(|(existing, _)| existing == name) {
                    Some(slot) => slot.1 = kind.clone(),
                    None => members.push((name.clone(), kind.clone())),
                }
            }
        }
        members
    }

    fn base_type(&self, type_name: &str) -> Option<String> {
        self.classes.get(type_name).and_then(|class| class.base.clone())
    }

    fn is_assignable_to(&self, type_name: &str, target: &str) -> bool {
        type_name == target || self.chain(type_name).iter().any(|class| class.name == target)
    }
}
