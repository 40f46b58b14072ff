//! Convenience re-exports — `use fafnir::prelude::*` for the common items.

pub use crate::diag::{ArchetypeStats, WorldStats, init_logger};
pub use crate::ecs::batch::{BatchTransform, SubtractConstant, VectorComponent};
pub use crate::ecs::component::{ComponentTypeId, component_type_id};
pub use crate::ecs::entity::EntityId;
pub use crate::ecs::prefab::{Prefab, PrefabRegistry};
pub use crate::ecs::query::ComponentSet;
pub use crate::ecs::world::World;
pub use crate::math::{Vec3, Vec4};
