//! # Component Types — Small Stable Identifiers
//!
//! Components are plain data — a `Position`, a `Velocity`, a `Health`. The
//! engine needs to refer to component *types* at runtime: archetype shapes
//! are sets of types, stores are keyed by type, prefab envelopes map types to
//! serialized values. This module assigns every component type a
//! [`ComponentTypeId`] on first use.
//!
//! ## Why not `std::any::TypeId`?
//!
//! `TypeId` would work as a map key, but it is opaque: it cannot index a
//! dense table, its ordering is arbitrary across builds, and it is useless in
//! anything a human reads. A `u32` assigned from a counter gives us cheap
//! sortable shape keys, a side table of type names for logs and snapshots,
//! and a compact key for the prefab envelope. The registry maps `TypeId` to
//! `ComponentTypeId` exactly once per type and never unregisters.
//!
//! ## First-use ordering
//!
//! Ids depend on the order types are first touched, so they are stable within
//! one process but **not** across runs or builds. Anything persisted must be
//! keyed by type name instead — prefab files are (see
//! [`prefab`](super::prefab)).

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// Identifies a component type for the lifetime of the process.
///
/// Assigned lazily by [`component_type_id`]; the same type always maps to
/// the same id. Ids order by first use, not by any property of the type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    /// Returns the raw id. Useful for diagnostics, not for general use.
    pub fn raw(self) -> u32 {
        self.0
    }
}

struct TypeRegistry {
    ids: HashMap<TypeId, ComponentTypeId>,
    /// Full type names, indexed by id.
    names: Vec<&'static str>,
}

static TYPES: OnceLock<Mutex<TypeRegistry>> = OnceLock::new();

fn registry() -> &'static Mutex<TypeRegistry> {
    TYPES.get_or_init(|| {
        Mutex::new(TypeRegistry {
            ids: HashMap::new(),
            names: Vec::new(),
        })
    })
}

/// Returns the [`ComponentTypeId`] for a component type, assigning one on
/// the first call for that type.
///
/// Idempotent: calling this any number of times for the same type yields the
/// same id. There is no failure mode and no unregistration.
pub fn component_type_id<T: 'static>() -> ComponentTypeId {
    let mut reg = registry().lock().unwrap();
    if let Some(&id) = reg.ids.get(&TypeId::of::<T>()) {
        return id;
    }
    let id = ComponentTypeId(reg.names.len() as u32);
    reg.ids.insert(TypeId::of::<T>(), id);
    reg.names.push(std::any::type_name::<T>());
    id
}

/// Returns the full type name recorded for an id, or `"<unregistered>"` if
/// the id was never assigned.
pub fn component_type_name(id: ComponentTypeId) -> &'static str {
    registry()
        .lock()
        .unwrap()
        .names
        .get(id.0 as usize)
        .copied()
        .unwrap_or("<unregistered>")
}

/// Strip the module path from a fully-qualified type name, keeping only the
/// short name (e.g. `fafnir::math::Vec3` → `Vec3`).
pub(crate) fn short_type_name(full: &str) -> String {
    // Handle generic types like "alloc::vec::Vec<foo::Bar>" → "Vec<Bar>".
    if let Some(angle) = full.find('<') {
        let prefix = &full[..angle];
        let short_prefix = prefix.rsplit("::").next().unwrap_or(prefix);
        let inner = &full[angle + 1..full.len() - 1];
        let short_inner = short_type_name(inner);
        format!("{}<{}>", short_prefix, short_inner)
    } else {
        full.rsplit("::").next().unwrap_or(full).to_string()
    }
}
