//! # Archetype-Based Storage Engine
//!
//! The storage and query core of an ECS runtime. Entities are grouped by
//! their exact component composition ("archetypes"), giving each component
//! type a contiguous column per group — the Structure-of-Arrays layout that
//! makes bulk iteration cache-friendly. The design follows the archetype
//! pattern used by [hecs](https://github.com/Ralith/hecs) and
//! [bevy_ecs](https://github.com/bevyengine/bevy), reduced to the storage
//! essentials and wrapped in a single reader/writer lock.
//!
//! ## Module Overview
//!
//! - [`entity`] — Monotonic, never-recycled entity ids
//! - [`component`] — Lazy integer id per component type
//! - [`store`] — Typed parallel columns behind an erased interface
//! - [`archetype`] — One exact component set, its stores, its entities
//! - [`query`] — Naming a shape in the type system
//! - [`batch`] — Fixed-width vector iteration
//! - [`world`] — The locked facade: lifecycle, migration, queries, health
//! - [`prefab`] — Named, versioned entity templates

pub(crate) mod archetype;
pub mod batch;
pub mod component;
pub mod entity;
pub mod prefab;
pub mod query;
pub(crate) mod store;
pub mod world;

pub use batch::{BatchTransform, SubtractConstant, VectorComponent};
pub use component::{ComponentTypeId, component_type_id, component_type_name};
pub use entity::EntityId;
pub use prefab::{PREFAB_VERSION, Prefab, PrefabRegistry};
pub use query::ComponentSet;
pub use world::{MAX_HEALTHY_ARCHETYPES, MAX_HEALTHY_ENTITIES, World};
