//! # ComponentSet — Naming a Shape in the Type System
//!
//! [`World::query`](super::world::World::query) takes its component set as a
//! type parameter:
//!
//! ```text
//! let movers = world.query::<(Position, Velocity)>();
//!
//! 1. Compute ids: [component_type_id::<Position>(), component_type_id::<Velocity>()]
//! 2. Normalize into a shape (sort + dedup)
//! 3. Look up the one archetype with exactly that shape
//! ```
//!
//! The [`ComponentSet`] trait is what turns the tuple type into that id
//! list. It is implemented for tuples up to eight component types, and for
//! `()` — the empty shape, where freshly created entities live.
//!
//! ## Exact match, not superset
//!
//! `query::<(Position,)>()` returns entities whose shape is *exactly*
//! `[Position]`. An entity with `Position` and `Velocity` lives in a
//! different archetype and is not returned. Engines like hecs or bevy_ecs
//! answer the superset question ("everything with at least these") by
//! joining across archetypes; here the exact bucket *is* the unit callers
//! reason about, and the superset walk exists only inside
//! [`for_each_batched`](super::world::World::for_each_batched).

use super::component::{ComponentTypeId, component_type_id};

/// A set of component types usable as a query shape.
///
/// Implemented for tuples of component types: `(A,)`, `(A, B)`, ... up to
/// eight entries, plus `()` for the empty shape. Order and duplicates do
/// not matter; the id list is normalized before lookup.
pub trait ComponentSet {
    /// The component type ids in this set, in tuple order, unnormalized.
    fn type_ids() -> Vec<ComponentTypeId>;
}

impl ComponentSet for () {
    fn type_ids() -> Vec<ComponentTypeId> {
        Vec::new()
    }
}

macro_rules! impl_component_set {
    ($($C:ident),+) => {
        impl<$($C: 'static + Send + Sync),+> ComponentSet for ($($C,)+) {
            fn type_ids() -> Vec<ComponentTypeId> {
                vec![$(component_type_id::<$C>()),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
