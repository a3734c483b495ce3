//! Typed arenas for metadata nodes
//!
//! Nodes reference each other through small copyable ids instead of
//! pointers. Slots are never reused, so an id kept after its node was
//! removed simply resolves to nothing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Index type for an [`Arena`]
pub trait ArenaId: Copy + Eq + Ord + std::hash::Hash + fmt::Debug {
    /// Build an id from a slot index
    fn from_index(index: usize) -> Self;

    /// Slot index of this id
    fn index(self) -> usize;
}

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(usize);

        impl ArenaId for $name {
            fn from_index(index: usize) -> Self {
                $name(index)
            }

            fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $prefix, self.0)
            }
        }
    };
}

arena_id!(
    /// Handle to an entity type
    EntityTypeId,
    "entity"
);
arena_id!(
    /// Handle to a property
    PropertyId,
    "property"
);
arena_id!(
    /// Handle to a key
    KeyId,
    "key"
);
arena_id!(
    /// Handle to a foreign key
    ForeignKeyId,
    "fk"
);
arena_id!(
    /// Handle to an index
    IndexId,
    "index"
);
arena_id!(
    /// Handle to a navigation
    NavigationId,
    "navigation"
);

/// Append-only storage of `T` addressed by `I`
#[derive(Debug, Clone)]
pub struct Arena<I, T> {
    slots: Vec<Option<T>>,
    _id: PhantomData<I>,
}

impl<I, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            _id: PhantomData,
        }
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value and return its id
    pub fn insert(&mut self, value: T) -> I {
        self.slots.push(Some(value));
        I::from_index(self.slots.len() - 1)
    }

    /// Get a live value
    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Get a live value mutably
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Remove a value, leaving its slot empty for good
    pub fn remove(&mut self, id: I) -> Option<T> {
        self.slots.get_mut(id.index()).and_then(Option::take)
    }

    /// Whether `id` refers to a live value
    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Live values in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (I::from_index(index), value)))
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether there are no live values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
