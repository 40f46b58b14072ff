//! # Prefab — Named, Versioned Entity Templates
//!
//! A prefab is a snapshot of one entity's full component set, stored under
//! a name and replayable any number of times to stamp out copies. Saving
//! serializes every registered component the entity carries; loading
//! creates a fresh entity and re-adds each component through the ordinary
//! [`World::add_component`] path, so migration and archetype creation work
//! exactly as they do at runtime. Nothing is special-cased.
//!
//! ## Quick Start
//!
//! ```ignore
//! use fafnir::prelude::*;
//!
//! let mut prefabs = PrefabRegistry::new();
//! prefabs.register::<Position>();
//! prefabs.register::<Health>();
//!
//! prefabs.save_prefab(&world, "grunt", template_entity);
//! let copy = prefabs.load_prefab(&world, "grunt").unwrap();
//!
//! // Optional persistence, keyed by component type name.
//! prefabs.save_prefab_to_file("grunt", "grunt.json");
//! ```
//!
//! ## Registration
//!
//! The registry can't name component types at runtime, so each type is
//! registered up front with a pair of function pointers: extract (entity →
//! serialized blob) and insert (blob → `add_component` on a new entity).
//! Components that were never registered are skipped with a warning; the
//! rest of the entity still round-trips.
//!
//! In-memory blobs are keyed by [`ComponentTypeId`]. The file format is
//! keyed by component type *name* instead: numeric ids are assigned in
//! first-use order and are not stable across processes.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::component::{ComponentTypeId, component_type_id, component_type_name, short_type_name};
use super::entity::EntityId;
use super::world::{World, WorldInner};

/// Format version written into every prefab. Bump on any envelope change.
pub const PREFAB_VERSION: u32 = 1;

// ── PrefabRegistry ───────────────────────────────────────────────────────

type ExtractFn = fn(&WorldInner, EntityId) -> Option<Vec<u8>>;
type InsertFn = fn(&World, EntityId, &[u8]) -> bool;

struct ComponentCodec {
    extract: ExtractFn,
    insert: InsertFn,
    short_name: String,
}

/// Maps component types to extract/insert function pointers and stores the
/// saved prefabs.
pub struct PrefabRegistry {
    by_type_id: HashMap<ComponentTypeId, ComponentCodec>,
    by_name: HashMap<String, ComponentTypeId>,
    prefabs: HashMap<String, Prefab>,
}

impl PrefabRegistry {
    pub fn new() -> Self {
        Self {
            by_type_id: HashMap::new(),
            by_name: HashMap::new(),
            prefabs: HashMap::new(),
        }
    }

    /// Register a component type for prefab capture.
    pub fn register<T>(&mut self)
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static,
    {
        let tid = component_type_id::<T>();
        let short = short_type_name(std::any::type_name::<T>());

        let codec = ComponentCodec {
            extract: |inner, entity| {
                let value = inner.get::<T>(entity)?;
                serde_json::to_vec(value).ok()
            },
            insert: |world, entity, bytes| match serde_json::from_slice::<T>(bytes) {
                Ok(value) => world.add_component(entity, value),
                Err(_) => false,
            },
            short_name: short.clone(),
        };

        self.by_type_id.insert(tid, codec);
        self.by_name.insert(short, tid);
    }

    // ── Save / Load ──────────────────────────────────────────────────

    /// Snapshot `entity`'s registered components into a prefab stored under
    /// `name`, overwriting any existing prefab of that name. Returns `false`
    /// if the entity is not live.
    ///
    /// The whole snapshot happens under one shared lock acquisition, so a
    /// concurrent writer can never tear the saved component set.
    pub fn save_prefab(&mut self, world: &World, name: &str, entity: EntityId) -> bool {
        world.assert_outside_batch("save_prefab");
        let inner = world.inner_read();
        let Some(shape) = inner.component_types_of(entity) else {
            return false;
        };

        let mut components = HashMap::new();
        for &tid in shape {
            let Some(codec) = self.by_type_id.get(&tid) else {
                log::warn!(
                    "Prefab \"{name}\": component `{}` is not registered; skipping",
                    component_type_name(tid)
                );
                continue;
            };
            match (codec.extract)(&inner, entity) {
                Some(blob) => {
                    components.insert(tid, blob);
                }
                None => log::warn!(
                    "Prefab \"{name}\": failed to serialize `{}`; skipping",
                    codec.short_name
                ),
            }
        }
        drop(inner);

        self.prefabs.insert(
            name.to_string(),
            Prefab {
                name: name.to_string(),
                version: PREFAB_VERSION,
                components,
            },
        );
        true
    }

    /// Create a new entity from the prefab stored under `name`, replaying
    /// every captured component through `add_component`. Returns `None` if
    /// no such prefab exists.
    pub fn load_prefab(&self, world: &World, name: &str) -> Option<EntityId> {
        let prefab = self.prefabs.get(name)?;
        let entity = world.create_entity();

        // Replay in id order so archetype creation is deterministic.
        let mut entries: Vec<(&ComponentTypeId, &Vec<u8>)> = prefab.components.iter().collect();
        entries.sort_by_key(|&(&tid, _)| tid);

        for (&tid, blob) in entries {
            let Some(codec) = self.by_type_id.get(&tid) else {
                log::warn!(
                    "Prefab \"{name}\": component `{}` is no longer registered; skipping",
                    component_type_name(tid)
                );
                continue;
            };
            if !(codec.insert)(world, entity, blob) {
                log::warn!(
                    "Prefab \"{name}\": failed to deserialize `{}`; skipping",
                    codec.short_name
                );
            }
        }
        Some(entity)
    }

    // ── Stored Prefabs ───────────────────────────────────────────────

    /// Names of all stored prefabs, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.prefabs.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Whether a prefab is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.prefabs.contains_key(name)
    }

    /// The stored prefab under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Prefab> {
        self.prefabs.get(name)
    }

    /// Drop the prefab stored under `name`. Returns `false` if there was
    /// none.
    pub fn remove_prefab(&mut self, name: &str) -> bool {
        self.prefabs.remove(name).is_some()
    }

    // ── File Persistence ─────────────────────────────────────────────

    /// Write the prefab stored under `name` to a JSON file. Returns `false`
    /// if no such prefab exists.
    pub fn save_prefab_to_file(&self, name: &str, path: impl AsRef<Path>) -> bool {
        let Some(prefab) = self.prefabs.get(name) else {
            return false;
        };

        let mut components = HashMap::new();
        for (&tid, blob) in &prefab.components {
            let Some(codec) = self.by_type_id.get(&tid) else {
                continue;
            };
            let value: serde_json::Value =
                serde_json::from_slice(blob).expect("Prefab blob is not valid JSON");
            components.insert(codec.short_name.clone(), value);
        }

        let file = PrefabFile {
            name: prefab.name.clone(),
            version: prefab.version,
            components,
        };
        let json = serde_json::to_string_pretty(&file).expect("Failed to serialize prefab");
        std::fs::write(path, json).expect("Failed to write prefab file");
        true
    }

    /// Read a prefab from a JSON file into the registry, overwriting any
    /// stored prefab of the same name. Returns the prefab's name, or `None`
    /// if the file's format version is unsupported.
    pub fn load_prefab_from_file(&mut self, path: impl AsRef<Path>) -> Option<String> {
        let json = std::fs::read_to_string(path).expect("Failed to read prefab file");
        let file: PrefabFile =
            serde_json::from_str(&json).expect("Failed to deserialize prefab file");

        if file.version != PREFAB_VERSION {
            log::warn!(
                "Prefab \"{}\": unsupported format version {} (expected {PREFAB_VERSION})",
                file.name,
                file.version
            );
            return None;
        }

        let mut components = HashMap::new();
        for (short, value) in &file.components {
            let Some(&tid) = self.by_name.get(short) else {
                log::warn!(
                    "Prefab \"{}\": component `{short}` is not registered; skipping",
                    file.name
                );
                continue;
            };
            let blob = serde_json::to_vec(value).expect("Failed to serialize prefab blob");
            components.insert(tid, blob);
        }

        let name = file.name.clone();
        self.prefabs.insert(
            name.clone(),
            Prefab {
                name: file.name,
                version: file.version,
                components,
            },
        );
        Some(name)
    }
}

// ── Prefab ───────────────────────────────────────────────────────────────

/// One saved template: a name, a format version, and one opaque serialized
/// blob per component the source entity carried at save time.
pub struct Prefab {
    name: String,
    version: u32,
    components: HashMap<ComponentTypeId, Vec<u8>>,
}

impl Prefab {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of captured components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

/// On-disk form, keyed by component type name. See the module docs for why
/// the numeric ids stay out of the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PrefabFile {
    name: String,
    version: u32,
    components: HashMap<String, serde_json::Value>,
}
