//! # ComponentStore — Typed Columns Behind an Erased Interface
//!
//! Each archetype keeps one store per component type in its shape. A store
//! holds two index-aligned vectors — entity ids and component values — in
//! insertion order:
//!
//! ```text
//! ComponentStore<Position>
//!   entities: [e4, e9, e2]          ← parallel arrays; index i in both
//!   values:   [p4, p9, p2]            refers to the same entity
//! ```
//!
//! ## Why a typed `Vec<T>` behind a trait object?
//!
//! Archetypes are assembled dynamically, so they can't name `T` — they only
//! know a [`ComponentTypeId`](super::component::ComponentTypeId). Two
//! classic answers exist:
//!
//! 1. **Raw bytes** (hecs/bevy-style `BlobVec`): `Vec<u8>` with manual
//!    layout. Maximally compact, lots of `unsafe`.
//! 2. **One box per value** (`Vec<Box<dyn Any>>`): zero unsafe, but every
//!    value lives behind its own heap pointer, which kills the contiguity
//!    the batch path depends on.
//!
//! We take a third route: a fully typed `ComponentStore<T>` with a plain
//! `Vec<T>`, erased at the *store* boundary via the [`AnyStore`] trait. Zero
//! unsafe, and values stay contiguous so the four-lane iteration in
//! [`batch`](super::batch) can walk them as slices.
//!
//! Lookup is a linear scan over the entity column. Archetype populations are
//! the unit of iteration, not of search, and stay small enough in practice
//! that a scan beats the bookkeeping of a per-store index. Removal compacts
//! by `swap_remove`, so insertion order is only guaranteed until the first
//! removal.

use std::any::Any;

use super::entity::EntityId;

/// Type-erased surface of a [`ComponentStore`], so archetypes can hold
/// heterogeneous stores uniformly and migration can move values without
/// naming their types.
pub(crate) trait AnyStore: Send + Sync {
    /// Number of values stored.
    fn len(&self) -> usize;

    /// Remove `entity`'s value. Returns `false` if the entity was absent.
    fn remove(&mut self, entity: EntityId) -> bool;

    /// Remove `entity`'s value and return it boxed. Used when moving values
    /// between archetypes.
    fn take(&mut self, entity: EntityId) -> Option<Box<dyn Any + Send + Sync>>;

    /// Insert a boxed value for `entity`, overwriting any existing value.
    /// Used when moving values between archetypes.
    ///
    /// # Panics
    ///
    /// Panics if the boxed value is not of this store's component type,
    /// which indicates an engine bug.
    fn add_boxed(&mut self, entity: EntityId, value: Box<dyn Any + Send + Sync>);

    /// An empty store of the same component type. Used when lazily creating
    /// a destination archetype during migration.
    fn new_empty(&self) -> Box<dyn AnyStore>;

    /// Downcasting access to the concrete [`ComponentStore`].
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Parallel entity/value columns for one component type. See the module
/// docs for the layout.
pub(crate) struct ComponentStore<T> {
    entities: Vec<EntityId>,
    values: Vec<T>,
}

impl<T: 'static + Send + Sync> ComponentStore<T> {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            values: Vec::new(),
        }
    }

    fn index_of(&self, entity: EntityId) -> Option<usize> {
        self.entities.iter().position(|&e| e == entity)
    }

    /// Get a shared reference to `entity`'s value.
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.index_of(entity).map(|i| &self.values[i])
    }

    /// Get a mutable reference to `entity`'s value.
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        let i = self.index_of(entity)?;
        Some(&mut self.values[i])
    }

    /// Insert a value for `entity`.
    ///
    /// If the entity already has a value here it is overwritten in place.
    /// Appending a second slot for the same entity would silently break the
    /// store/entity-list correspondence, so this contract is load-bearing.
    pub fn add(&mut self, entity: EntityId, value: T) {
        if let Some(i) = self.index_of(entity) {
            self.values[i] = value;
        } else {
            self.entities.push(entity);
            self.values.push(value);
        }
    }

    /// Both columns as parallel slices, values mutable. The batch path
    /// iterates these directly.
    pub fn rows_mut(&mut self) -> (&[EntityId], &mut [T]) {
        (&self.entities, &mut self.values)
    }
}

impl<T: 'static + Send + Sync> AnyStore for ComponentStore<T> {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn remove(&mut self, entity: EntityId) -> bool {
        match self.index_of(entity) {
            Some(i) => {
                self.entities.swap_remove(i);
                self.values.swap_remove(i);
                true
            }
            None => false,
        }
    }

    fn take(&mut self, entity: EntityId) -> Option<Box<dyn Any + Send + Sync>> {
        let i = self.index_of(entity)?;
        self.entities.swap_remove(i);
        Some(Box::new(self.values.swap_remove(i)))
    }

    fn add_boxed(&mut self, entity: EntityId, value: Box<dyn Any + Send + Sync>) {
        let value = value.downcast::<T>().unwrap_or_else(|_| {
            panic!(
                "Component type mismatch: expected `{}` in store",
                std::any::type_name::<T>()
            )
        });
        self.add(entity, *value);
    }

    fn new_empty(&self) -> Box<dyn AnyStore> {
        Box::new(ComponentStore::<T>::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
