//! # Archetype — One Shape, One Bucket
//!
//! An archetype groups every entity that currently carries *exactly* the
//! same set of component types. That set is the archetype's **shape**, kept
//! sorted so two shapes compare equal regardless of the order components
//! were attached in.
//!
//! ```text
//! Archetype { shape: [Position, Velocity] }
//!   entities: [e1, e7, e3]
//!   stores:
//!     Position → ComponentStore<Position>  [p1, p7, p3]
//!     Velocity → ComponentStore<Velocity>  [v1, v7, v3]
//! ```
//!
//! Archetypes never store a partial row: when a component is added to or
//! removed from an entity, the whole row moves to the archetype whose shape
//! matches the new component set. The [`world`](super::world) module owns
//! that migration; this module is only the bucket.

use std::collections::HashMap;

use super::component::{ComponentTypeId, component_type_id, component_type_name, short_type_name};
use super::entity::EntityId;
use super::store::{AnyStore, ComponentStore};

/// A sorted, deduplicated list of component type ids. Used both as the
/// identity of an archetype and as the key for exact-shape lookup.
pub(crate) type Shape = Vec<ComponentTypeId>;

/// Normalize a list of component type ids into a [`Shape`].
pub(crate) fn shape_of(mut ids: Vec<ComponentTypeId>) -> Shape {
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// All entities sharing one exact component set, with one store per
/// component type in the shape.
pub(crate) struct Archetype {
    /// The sorted component set every resident entity carries.
    pub shape: Shape,
    /// One store per entry in `shape`, keyed by component type id.
    pub stores: HashMap<ComponentTypeId, Box<dyn AnyStore>>,
    /// Resident entities. Stores are kept membership-consistent with this
    /// list: every entity here has a value in every store, and no store
    /// holds a value for an entity outside it.
    pub entities: Vec<EntityId>,
}

impl Archetype {
    pub fn new(shape: Shape, stores: HashMap<ComponentTypeId, Box<dyn AnyStore>>) -> Self {
        debug_assert_eq!(shape.len(), stores.len());
        Self {
            shape,
            stores,
            entities: Vec::new(),
        }
    }

    /// Whether this archetype's shape includes `type_id`.
    pub fn contains_type(&self, type_id: ComponentTypeId) -> bool {
        // Shapes are sorted, but they are also tiny; a scan is simpler and
        // just as fast at these sizes.
        self.shape.contains(&type_id)
    }

    /// Remove `entity` and its values from every store. Returns `false` if
    /// the entity was not resident.
    pub fn remove_entity(&mut self, entity: EntityId) -> bool {
        let Some(i) = self.entities.iter().position(|&e| e == entity) else {
            return false;
        };
        self.entities.swap_remove(i);
        for store in self.stores.values_mut() {
            store.remove(entity);
        }
        true
    }

    /// The concrete store for `T`, if `T` is part of this shape.
    pub fn typed_store<T: 'static + Send + Sync>(&self) -> Option<&ComponentStore<T>> {
        self.stores
            .get(&component_type_id::<T>())?
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
    }

    /// Mutable access to the concrete store for `T`.
    pub fn typed_store_mut<T: 'static + Send + Sync>(&mut self) -> Option<&mut ComponentStore<T>> {
        self.stores
            .get_mut(&component_type_id::<T>())?
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
    }

    /// Short component names for this shape, in shape order. Used by the
    /// archetype-creation log and the stats snapshot.
    pub fn component_names(&self) -> Vec<String> {
        self.shape
            .iter()
            .map(|&id| short_type_name(component_type_name(id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position {
        x: f32,
    }
    struct Velocity {
        dx: f32,
    }

    fn two_component_archetype() -> Archetype {
        let pos = component_type_id::<Position>();
        let vel = component_type_id::<Velocity>();
        let mut stores: HashMap<ComponentTypeId, Box<dyn AnyStore>> = HashMap::new();
        stores.insert(pos, Box::new(ComponentStore::<Position>::new()));
        stores.insert(vel, Box::new(ComponentStore::<Velocity>::new()));
        Archetype::new(shape_of(vec![pos, vel]), stores)
    }

    #[test]
    fn shape_of_sorts_and_dedups() {
        let a = component_type_id::<Position>();
        let b = component_type_id::<Velocity>();
        let shape = shape_of(vec![b, a, b, a]);
        assert_eq!(shape.len(), 2);
        assert!(shape.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn shape_is_order_independent() {
        let a = component_type_id::<Position>();
        let b = component_type_id::<Velocity>();
        assert_eq!(shape_of(vec![a, b]), shape_of(vec![b, a]));
    }

    #[test]
    fn contains_type_matches_shape() {
        let arch = two_component_archetype();
        assert!(arch.contains_type(component_type_id::<Position>()));
        assert!(arch.contains_type(component_type_id::<Velocity>()));
        assert!(!arch.contains_type(component_type_id::<u8>()));
    }

    #[test]
    fn remove_entity_clears_all_stores() {
        let mut arch = two_component_archetype();
        let e = EntityId(1);
        arch.entities.push(e);
        arch.typed_store_mut::<Position>()
            .unwrap()
            .add(e, Position { x: 1.0 });
        arch.typed_store_mut::<Velocity>()
            .unwrap()
            .add(e, Velocity { dx: 2.0 });
        assert_eq!(
            arch.typed_store::<Velocity>().unwrap().get(e).map(|v| v.dx),
            Some(2.0)
        );

        assert!(arch.remove_entity(e));
        assert!(arch.entities.is_empty());
        assert!(arch.typed_store::<Position>().unwrap().get(e).is_none());
        assert!(arch.typed_store::<Velocity>().unwrap().get(e).is_none());
    }

    #[test]
    fn remove_unknown_entity_is_false() {
        let mut arch = two_component_archetype();
        assert!(!arch.remove_entity(EntityId(42)));
    }

    #[test]
    fn typed_store_returns_none_for_foreign_type() {
        let arch = two_component_archetype();
        assert!(arch.typed_store::<u64>().is_none());
    }

    #[test]
    fn stored_values_survive_round_trip() {
        let mut arch = two_component_archetype();
        let e = EntityId(3);
        arch.entities.push(e);
        arch.typed_store_mut::<Position>()
            .unwrap()
            .add(e, Position { x: 7.5 });

        let store = arch.typed_store::<Position>().unwrap();
        assert_eq!(store.get(e).map(|p| p.x), Some(7.5));
    }

    #[test]
    fn component_names_are_short_names() {
        let arch = two_component_archetype();
        let names = arch.component_names();
        // Module paths are stripped; shape order depends on id assignment.
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Position".to_string()));
        assert!(names.contains(&"Velocity".to_string()));
    }
}
