//! # Fafnir — Archetype Storage Engine
//!
//! The storage and query core of an ECS runtime: entity identity, component
//! data grouped by exact component composition, thread-safe
//! create/mutate/query operations behind one reader/writer lock, a
//! fixed-width batch path for numeric vector components, and prefab
//! snapshots built on the same storage primitives.
//!
//! Start with `use fafnir::prelude::*` and create a
//! [`World`](ecs::world::World).

pub mod diag;
pub mod ecs;
pub mod math;
pub mod prelude;
