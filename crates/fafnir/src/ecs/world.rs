//! # World — The Locked Facade
//!
//! The [`World`] owns all entities and their component data, and is the only
//! public path to them. Every operation goes through one reader/writer lock.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ World                                                   │
//! │                                                         │
//! │  query_count / query_time_ns   (atomics, outside lock)  │
//! │                                                         │
//! │  RwLock<WorldInner>                                     │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │ allocator    monotonic EntityId source            │  │
//! │  │ archetypes   Vec<Archetype>, append-only          │  │
//! │  │ by_shape     Shape → ArchetypeId (exact match)    │  │
//! │  │ locations    EntityId → ArchetypeId               │  │
//! │  └───────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking discipline
//!
//! A single `RwLock` guards the whole archetype table; there is no
//! finer-grained lock. Reads (`get_component`, `query`, introspection) take
//! the shared mode and run concurrently with each other. Structural writes
//! (`create_entity`, `destroy_entity`, `add_component`, `remove_component`)
//! take the exclusive mode. `for_each_batched` mutates component values in
//! place, so it takes the exclusive mode too, and its callback must not call
//! back into the world: a thread-local marker detects re-entry and panics
//! instead of letting the non-reentrant lock deadlock.
//!
//! ## Migration
//!
//! Changing an entity's component set moves its whole row to the archetype
//! of the new shape. The move is copy-then-commit: every retained value is
//! staged into the destination stores first, and only then are entity-list
//! membership and the location index updated, so a failure mid-copy can
//! never leave an entity in two archetypes or in none.
//!
//! ## Comparison
//!
//! - **hecs / bevy_ecs**: hand out `&mut World` and leave thread-safety to a
//!   scheduler. Here the lock *is* the API boundary, so any thread may hold
//!   a `&World`.
//! - **Query semantics**: engines usually match supersets. [`World::query`]
//!   matches the shape exactly; see [`query`](super::query) for the
//!   rationale.

use std::any::Any;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use crate::diag::{ArchetypeStats, WorldStats};

use super::archetype::{Archetype, Shape, shape_of};
use super::batch::{BatchTransform, VectorComponent, run_batched};
use super::component::{ComponentTypeId, component_type_id};
use super::entity::{EntityAllocator, EntityId};
use super::query::ComponentSet;
use super::store::{AnyStore, ComponentStore};

/// Soft ceiling on live entities before [`World::is_healthy`] reports
/// trouble.
pub const MAX_HEALTHY_ENTITIES: usize = 1_000_000;

/// Soft ceiling on the archetype count before [`World::is_healthy`] reports
/// trouble. Archetypes are never destroyed, so a count this high means
/// component sets are being generated, not designed.
pub const MAX_HEALTHY_ARCHETYPES: usize = 4_096;

/// Index into the archetype table. Archetypes are never destroyed, so an id
/// handed out once stays valid for the life of the world.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct ArchetypeId(u32);

impl ArchetypeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

thread_local! {
    /// Address of the `World` currently running `for_each_batched` on this
    /// thread, or 0 when none is.
    static ACTIVE_BATCH: Cell<usize> = const { Cell::new(0) };
}

/// Marks this thread as inside a batch on one world for its lifetime, then
/// restores whatever was marked before.
struct BatchGuard {
    prev: usize,
}

impl BatchGuard {
    fn enter(world: &World) -> Self {
        let addr = world as *const World as usize;
        let prev = ACTIVE_BATCH.with(|active| active.replace(addr));
        Self { prev }
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        ACTIVE_BATCH.with(|active| active.set(self.prev));
    }
}

/// Everything the world lock guards.
pub(crate) struct WorldInner {
    allocator: EntityAllocator,
    /// Every archetype ever created, in creation order. Never shrinks.
    archetypes: Vec<Archetype>,
    /// Exact-shape lookup. One archetype per shape, ever.
    by_shape: HashMap<Shape, ArchetypeId>,
    /// Entity → current archetype, maintained on every migration. The key
    /// set is the live entity set.
    locations: HashMap<EntityId, ArchetypeId>,
}

impl WorldInner {
    fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            archetypes: Vec::new(),
            by_shape: HashMap::new(),
            locations: HashMap::new(),
        }
    }

    fn create_archetype(
        &mut self,
        shape: Shape,
        stores: HashMap<ComponentTypeId, Box<dyn AnyStore>>,
    ) -> ArchetypeId {
        let id = ArchetypeId(
            u32::try_from(self.archetypes.len()).expect("archetype table overflowed u32"),
        );
        let arch = Archetype::new(shape.clone(), stores);
        log::debug!("New archetype #{}: [{}]", id.0, arch.component_names().join(", "));
        self.by_shape.insert(shape, id);
        self.archetypes.push(arch);
        id
    }

    /// Move `entity` from `src` to `dest`. All values already staged in the
    /// destination stores (the value being added, if any) stay; every value
    /// still in the source stores is staged across next, except the one for
    /// `dropped`, which goes out of scope. Entity-list membership and the
    /// location index are committed last.
    fn migrate(
        &mut self,
        entity: EntityId,
        src: ArchetypeId,
        dest: ArchetypeId,
        dropped: Option<ComponentTypeId>,
    ) {
        let mut staged: Vec<(ComponentTypeId, Box<dyn Any + Send + Sync>)> = Vec::new();
        for (&tid, store) in self.archetypes[src.index()].stores.iter_mut() {
            let Some(value) = store.take(entity) else {
                continue;
            };
            if Some(tid) == dropped {
                continue; // dropped here
            }
            staged.push((tid, value));
        }

        let dest_arch = &mut self.archetypes[dest.index()];
        for (tid, value) in staged {
            dest_arch.stores.get_mut(&tid).unwrap().add_boxed(entity, value);
        }

        // Commit: out of the old entity list, into the new one, reindex.
        let src_arch = &mut self.archetypes[src.index()];
        if let Some(i) = src_arch.entities.iter().position(|&e| e == entity) {
            src_arch.entities.swap_remove(i);
        }
        self.archetypes[dest.index()].entities.push(entity);
        self.locations.insert(entity, dest);
    }

    pub(crate) fn get<T: 'static + Send + Sync>(&self, entity: EntityId) -> Option<&T> {
        let &loc = self.locations.get(&entity)?;
        self.archetypes[loc.index()].typed_store::<T>()?.get(entity)
    }

    fn get_mut<T: 'static + Send + Sync>(&mut self, entity: EntityId) -> Option<&mut T> {
        let &loc = self.locations.get(&entity)?;
        self.archetypes[loc.index()]
            .typed_store_mut::<T>()?
            .get_mut(entity)
    }

    /// The component type ids `entity` currently carries, in shape order.
    pub(crate) fn component_types_of(&self, entity: EntityId) -> Option<&[ComponentTypeId]> {
        let &loc = self.locations.get(&entity)?;
        Some(&self.archetypes[loc.index()].shape)
    }

    /// Total component instances across all stores, counted from the stores
    /// themselves rather than derived as `residents × shape width`.
    fn component_total(&self) -> usize {
        self.archetypes
            .iter()
            .flat_map(|a| a.stores.values())
            .map(|s| s.len())
            .sum()
    }
}

/// The central, thread-safe container for all entity and component state.
pub struct World {
    inner: RwLock<WorldInner>,
    query_count: AtomicU64,
    query_time_ns: AtomicU64,
}

impl World {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(WorldInner::new()),
            query_count: AtomicU64::new(0),
            query_time_ns: AtomicU64::new(0),
        }
    }

    /// Panics when called from inside this world's own `for_each_batched`
    /// callback, where the exclusive lock is already held.
    pub(crate) fn assert_outside_batch(&self, op: &str) {
        let here = self as *const World as usize;
        if ACTIVE_BATCH.with(|active| active.get()) == here {
            panic!("Cannot call {op} from inside a for_each_batched callback");
        }
    }

    /// Shared access to the locked state, for modules in this crate that
    /// need a consistent multi-component snapshot under one guard.
    pub(crate) fn inner_read(&self) -> RwLockReadGuard<'_, WorldInner> {
        self.inner.read()
    }

    // ── Entity Lifecycle ─────────────────────────────────────────────

    /// Create a new entity with no components. It lands in the archetype of
    /// the empty shape, which is created on first use like any other.
    ///
    /// # Panics
    ///
    /// Panics if the entity id space is exhausted.
    pub fn create_entity(&self) -> EntityId {
        self.assert_outside_batch("create_entity");
        let mut inner = self.inner.write();
        let entity = inner.allocator.allocate();

        let empty = match inner.by_shape.get(&Shape::new()) {
            Some(&id) => id,
            None => inner.create_archetype(Shape::new(), HashMap::new()),
        };
        inner.archetypes[empty.index()].entities.push(entity);
        inner.locations.insert(entity, empty);
        entity
    }

    /// Destroy an entity, removing it from its archetype and every store.
    /// Returns `false` if the id is unknown or already destroyed.
    pub fn destroy_entity(&self, entity: EntityId) -> bool {
        self.assert_outside_batch("destroy_entity");
        let mut inner = self.inner.write();
        let Some(&loc) = inner.locations.get(&entity) else {
            return false;
        };
        inner.archetypes[loc.index()].remove_entity(entity);
        inner.locations.remove(&entity);
        true
    }

    /// Destroy every live entity. Archetypes persist, emptied.
    pub fn destroy_all(&self) {
        self.assert_outside_batch("destroy_all");
        let mut inner = self.inner.write();
        let all: Vec<EntityId> = inner.locations.keys().copied().collect();
        for entity in all {
            if let Some(loc) = inner.locations.remove(&entity) {
                inner.archetypes[loc.index()].remove_entity(entity);
            }
        }
    }

    /// Whether `entity` is currently live.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.assert_outside_batch("is_alive");
        self.inner.read().locations.contains_key(&entity)
    }

    // ── Component Access ─────────────────────────────────────────────

    /// Add a component to an entity, overwriting any existing value of the
    /// same type in place; otherwise the entity migrates to the archetype
    /// of its widened shape. Returns `false` if the entity is not live.
    pub fn add_component<T: 'static + Send + Sync>(&self, entity: EntityId, value: T) -> bool {
        self.assert_outside_batch("add_component");
        let mut inner = self.inner.write();
        let Some(&src) = inner.locations.get(&entity) else {
            return false;
        };
        let tid = component_type_id::<T>();

        // Shape unchanged: overwrite in place, no migration.
        if inner.archetypes[src.index()].contains_type(tid) {
            inner.archetypes[src.index()]
                .typed_store_mut::<T>()
                .unwrap()
                .add(entity, value);
            return true;
        }

        let mut widened = inner.archetypes[src.index()].shape.clone();
        widened.push(tid);
        let dest_shape = shape_of(widened);

        let dest = match inner.by_shape.get(&dest_shape) {
            Some(&id) => id,
            None => {
                let mut stores: HashMap<ComponentTypeId, Box<dyn AnyStore>> = HashMap::new();
                for (&t, store) in &inner.archetypes[src.index()].stores {
                    stores.insert(t, store.new_empty());
                }
                stores.insert(tid, Box::new(ComponentStore::<T>::new()));
                inner.create_archetype(dest_shape, stores)
            }
        };

        // Stage the new value first, then move the retained ones and commit.
        inner.archetypes[dest.index()]
            .typed_store_mut::<T>()
            .unwrap()
            .add(entity, value);
        inner.migrate(entity, src, dest, None);
        true
    }

    /// Remove a component from an entity, migrating it to the archetype of
    /// its narrowed shape. Returns `false` if the entity is not live or
    /// does not carry the component.
    pub fn remove_component<T: 'static + Send + Sync>(&self, entity: EntityId) -> bool {
        self.assert_outside_batch("remove_component");
        let mut inner = self.inner.write();
        let Some(&src) = inner.locations.get(&entity) else {
            return false;
        };
        let tid = component_type_id::<T>();
        if !inner.archetypes[src.index()].contains_type(tid) {
            return false;
        }

        let dest_shape: Shape = inner.archetypes[src.index()]
            .shape
            .iter()
            .copied()
            .filter(|&t| t != tid)
            .collect();

        let dest = match inner.by_shape.get(&dest_shape) {
            Some(&id) => id,
            None => {
                let mut stores: HashMap<ComponentTypeId, Box<dyn AnyStore>> = HashMap::new();
                for (&t, store) in &inner.archetypes[src.index()].stores {
                    if t != tid {
                        stores.insert(t, store.new_empty());
                    }
                }
                inner.create_archetype(dest_shape, stores)
            }
        };

        inner.migrate(entity, src, dest, Some(tid));
        true
    }

    /// Get a shared, lock-guarded reference to a component. Returns `None`
    /// if the entity is dead or doesn't carry the component.
    ///
    /// The shared lock is held for the guard's lifetime, so structural
    /// operations on any thread wait until it is dropped.
    pub fn get_component<T: 'static + Send + Sync>(
        &self,
        entity: EntityId,
    ) -> Option<MappedRwLockReadGuard<'_, T>> {
        self.assert_outside_batch("get_component");
        RwLockReadGuard::try_map(self.inner.read(), |inner| inner.get::<T>(entity)).ok()
    }

    /// Get an exclusive, lock-guarded reference to a component. Returns
    /// `None` if the entity is dead or doesn't carry the component.
    pub fn get_component_mut<T: 'static + Send + Sync>(
        &self,
        entity: EntityId,
    ) -> Option<MappedRwLockWriteGuard<'_, T>> {
        self.assert_outside_batch("get_component_mut");
        RwLockWriteGuard::try_map(self.inner.write(), |inner| inner.get_mut::<T>(entity)).ok()
    }

    /// Whether `entity` is live and carries a `T`.
    pub fn has_component<T: 'static + Send + Sync>(&self, entity: EntityId) -> bool {
        self.assert_outside_batch("has_component");
        let inner = self.inner.read();
        match inner.locations.get(&entity) {
            Some(&loc) => inner.archetypes[loc.index()].contains_type(component_type_id::<T>()),
            None => false,
        }
    }

    /// The component type ids `entity` currently carries, or `None` if it
    /// is not live.
    pub fn component_types(&self, entity: EntityId) -> Option<Vec<ComponentTypeId>> {
        self.assert_outside_batch("component_types");
        let inner = self.inner.read();
        inner.component_types_of(entity).map(|shape| shape.to_vec())
    }

    // ── Query ────────────────────────────────────────────────────────

    /// All entities whose component set is **exactly** `S`, in store order.
    ///
    /// An entity carrying a superset is in a different archetype and is not
    /// returned. At most one archetype can match, so the result is a single
    /// bucket's entity list.
    pub fn query<S: ComponentSet>(&self) -> Vec<EntityId> {
        self.assert_outside_batch("query");
        let inner = self.inner.read();
        let started = Instant::now();

        let shape = shape_of(S::type_ids());
        let entities = match inner.by_shape.get(&shape) {
            Some(&id) => inner.archetypes[id.index()].entities.clone(),
            None => Vec::new(),
        };

        // Latency covers the time the shared lock is held, count recording
        // included, so the metric reflects what writers actually wait on.
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.query_time_ns
            .fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
        drop(inner);
        entities
    }

    // ── Bulk Iteration ───────────────────────────────────────────────

    /// Run `transform` over every store of vector component `T`, four
    /// entities at a time, then hand each transformed value mutably to
    /// `callback` with its owner, for scalar per-entity refinement. Every
    /// archetype whose shape includes `T` is visited.
    ///
    /// Values mutate in place, so this takes the exclusive lock for the
    /// whole walk.
    ///
    /// # Panics
    ///
    /// The callback must not call back into this world (no structural
    /// mutation, no reads): the lock is already held, and any [`World`]
    /// method panics if invoked from inside the callback.
    pub fn for_each_batched<T, B>(&self, transform: &B, mut callback: impl FnMut(EntityId, &mut T))
    where
        T: VectorComponent,
        B: BatchTransform,
    {
        self.assert_outside_batch("for_each_batched");
        let mut inner = self.inner.write();
        let _guard = BatchGuard::enter(self);

        let tid = component_type_id::<T>();
        for arch in inner.archetypes.iter_mut() {
            if !arch.contains_type(tid) {
                continue;
            }
            // Typed accessor: a store that doesn't actually hold `T` is
            // skipped rather than cast blindly.
            let Some(store) = arch.typed_store_mut::<T>() else {
                continue;
            };
            let (entities, values) = store.rows_mut();
            run_batched(entities, values, transform, &mut callback);
        }
    }

    // ── Metrics & Health ─────────────────────────────────────────────

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.assert_outside_batch("entity_count");
        self.inner.read().locations.len()
    }

    /// Number of archetypes ever created (emptied ones included).
    pub fn archetype_count(&self) -> usize {
        self.assert_outside_batch("archetype_count");
        self.inner.read().archetypes.len()
    }

    /// Total component instances across all live entities.
    pub fn component_count(&self) -> usize {
        self.assert_outside_batch("component_count");
        self.inner.read().component_total()
    }

    /// Soft health check: entity and archetype counts under their ceilings,
    /// and archetype populations summing to the live entity count. Logs
    /// what it finds and returns a verdict; never panics. A `false` here
    /// means the caller should start worrying, not that the world stopped
    /// working.
    pub fn is_healthy(&self) -> bool {
        self.assert_outside_batch("is_healthy");
        let inner = self.inner.read();
        let live = inner.locations.len();
        let mut healthy = true;

        if live > MAX_HEALTHY_ENTITIES {
            log::warn!("Entity count {live} exceeds soft ceiling {MAX_HEALTHY_ENTITIES}");
            healthy = false;
        }
        if inner.archetypes.len() > MAX_HEALTHY_ARCHETYPES {
            log::warn!(
                "Archetype count {} exceeds soft ceiling {MAX_HEALTHY_ARCHETYPES}",
                inner.archetypes.len()
            );
            healthy = false;
        }

        let resident: usize = inner.archetypes.iter().map(|a| a.entities.len()).sum();
        if resident != live {
            log::warn!("Archetype populations sum to {resident} but {live} entities are live");
            healthy = false;
        }
        healthy
    }

    /// A serializable snapshot of the world's counters, with a
    /// per-archetype breakdown sorted largest-first. Empty archetypes are
    /// omitted from the breakdown (the `archetype_count` field still counts
    /// them).
    pub fn stats(&self) -> WorldStats {
        self.assert_outside_batch("stats");
        let inner = self.inner.read();

        let mut archetypes: Vec<ArchetypeStats> = inner
            .archetypes
            .iter()
            .filter(|a| !a.entities.is_empty())
            .map(|a| ArchetypeStats {
                entity_count: a.entities.len(),
                component_names: a.component_names(),
            })
            .collect();
        archetypes.sort_by(|a, b| {
            b.entity_count
                .cmp(&a.entity_count)
                .then_with(|| a.component_names.cmp(&b.component_names))
        });

        let queries = self.query_count.load(Ordering::Relaxed);
        let total_ns = self.query_time_ns.load(Ordering::Relaxed);
        WorldStats {
            entity_count: inner.locations.len(),
            archetype_count: inner.archetypes.len(),
            component_count: inner.component_total(),
            query_count: queries,
            avg_query_us: if queries == 0 {
                0.0
            } else {
                total_ns as f64 / queries as f64 / 1_000.0
            },
            archetypes,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::batch::SubtractConstant;
    use crate::math::Vec3;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
        z: f32,
    }
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
        dz: f32,
    }
    struct Health(u32);
    struct Marker;
    struct Shield;

    fn pos(x: f32, y: f32, z: f32) -> Position {
        Position { x, y, z }
    }

    fn vel(dx: f32, dy: f32, dz: f32) -> Velocity {
        Velocity { dx, dy, dz }
    }

    #[test]
    fn fresh_world_is_empty() {
        let world = World::new();
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.archetype_count(), 0);
        assert_eq!(world.component_count(), 0);
        assert!(world.is_healthy());
    }

    #[test]
    fn created_entity_is_live_in_the_empty_shape() {
        let world = World::new();
        let e = world.create_entity();

        assert!(world.is_alive(e));
        assert_eq!(world.component_types(e), Some(vec![]));
        assert_eq!(world.entity_count(), 1);
        // The empty-shape archetype came into existence on first use.
        assert_eq!(world.archetype_count(), 1);
        assert_eq!(world.query::<()>(), vec![e]);
    }

    #[test]
    fn add_then_get_roundtrip() {
        let world = World::new();
        let e = world.create_entity();

        assert!(world.add_component(e, pos(1.5, -2.0, 0.25)));
        let p = world.get_component::<Position>(e).unwrap();
        assert_eq!(*p, pos(1.5, -2.0, 0.25));
        drop(p);

        assert!(world.get_component::<Velocity>(e).is_none());
    }

    #[test]
    fn add_component_overwrites_existing_value() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, Health(50));
        world.add_component(e, Health(100));

        assert_eq!(world.get_component::<Health>(e).unwrap().0, 100);
        assert_eq!(world.component_count(), 1);
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn add_component_on_dead_entity_returns_false() {
        let world = World::new();
        let e = world.create_entity();
        world.destroy_entity(e);
        assert!(!world.add_component(e, Marker));
        assert_eq!(world.component_count(), 0);
    }

    #[test]
    fn remove_component_never_added_is_a_no_op() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, pos(0.0, 0.0, 0.0));

        assert!(!world.remove_component::<Shield>(e));
        // Membership for everything else is untouched.
        assert!(world.has_component::<Position>(e));
        assert_eq!(world.component_types(e).unwrap().len(), 1);
    }

    #[test]
    fn remove_component_narrows_the_shape() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, pos(1.0, 2.0, 3.0));
        world.add_component(e, vel(0.0, 1.0, 0.0));

        assert!(world.remove_component::<Velocity>(e));
        assert!(world.has_component::<Position>(e));
        assert!(!world.has_component::<Velocity>(e));
        assert_eq!(world.query::<(Position,)>(), vec![e]);
        // The stored value survived the migration.
        assert_eq!(*world.get_component::<Position>(e).unwrap(), pos(1.0, 2.0, 3.0));
    }

    #[test]
    fn migration_preserves_unrelated_components() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, pos(9.0, 8.0, 7.0));
        world.add_component(e, Health(3));
        world.add_component(e, vel(1.0, 1.0, 1.0));

        assert_eq!(*world.get_component::<Position>(e).unwrap(), pos(9.0, 8.0, 7.0));
        assert_eq!(world.get_component::<Health>(e).unwrap().0, 3);
        assert_eq!(*world.get_component::<Velocity>(e).unwrap(), vel(1.0, 1.0, 1.0));
    }

    #[test]
    fn archetypes_accumulate_and_never_die() {
        let world = World::new();
        let e = world.create_entity(); // []
        world.add_component(e, pos(0.0, 0.0, 0.0)); // [Position]
        world.add_component(e, vel(0.0, 0.0, 0.0)); // [Position, Velocity]
        world.remove_component::<Position>(e); // [Velocity]

        assert_eq!(world.archetype_count(), 4);
        assert_eq!(world.entity_count(), 1);

        world.destroy_entity(e);
        // Emptied, not destroyed.
        assert_eq!(world.archetype_count(), 4);
        assert!(world.is_healthy());
    }

    #[test]
    fn same_shape_reuses_the_archetype() {
        let world = World::new();
        let e1 = world.create_entity();
        world.add_component(e1, pos(0.0, 0.0, 0.0));
        world.add_component(e1, vel(0.0, 0.0, 0.0));

        // Reverse attachment order lands in the same bucket.
        let e2 = world.create_entity();
        world.add_component(e2, vel(0.0, 0.0, 0.0));
        world.add_component(e2, pos(0.0, 0.0, 0.0));

        let both = world.query::<(Position, Velocity)>();
        assert_eq!(both.len(), 2);
        assert!(both.contains(&e1) && both.contains(&e2));
        // [], [Position], [Velocity], [Position, Velocity]
        assert_eq!(world.archetype_count(), 4);
    }

    #[test]
    fn destroy_entity_twice_returns_false_the_second_time() {
        let world = World::new();
        let e = world.create_entity();
        assert!(world.destroy_entity(e));
        assert!(!world.destroy_entity(e));
        assert!(!world.is_alive(e));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn destroy_unknown_id_changes_nothing() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, Health(1));
        let before = world.stats();

        assert!(!world.destroy_entity(EntityId(9_999)));

        let after = world.stats();
        assert_eq!(after.entity_count, before.entity_count);
        assert_eq!(after.archetype_count, before.archetype_count);
        assert_eq!(after.component_count, before.component_count);
        assert_eq!(after.query_count, before.query_count);
    }

    #[test]
    fn destroy_all_empties_but_keeps_archetypes() {
        let world = World::new();
        for i in 0..10 {
            let e = world.create_entity();
            world.add_component(e, Health(i));
            if i % 2 == 0 {
                world.add_component(e, Marker);
            }
        }
        assert_eq!(world.entity_count(), 10);
        let archetypes = world.archetype_count();

        world.destroy_all();
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.component_count(), 0);
        assert_eq!(world.archetype_count(), archetypes);
        assert!(world.is_healthy());
    }

    #[test]
    fn exact_match_query_semantics() {
        let world = World::new();
        let e1 = world.create_entity();
        world.add_component(e1, pos(1.0, 2.0, 3.0));
        world.add_component(e1, vel(0.0, 1.0, 0.0));

        // e1's shape is {Position, Velocity}, not {Position}.
        assert!(world.query::<(Position,)>().is_empty());
        assert_eq!(world.query::<(Position, Velocity)>(), vec![e1]);
        assert_eq!(world.query::<(Velocity, Position)>(), vec![e1]);
    }

    #[test]
    fn query_for_a_shape_never_seen_is_empty() {
        let world = World::new();
        world.create_entity();
        assert!(world.query::<(Shield, Health)>().is_empty());
    }

    #[test]
    fn get_component_mut_writes_through() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, Health(10));

        world.get_component_mut::<Health>(e).unwrap().0 = 77;
        assert_eq!(world.get_component::<Health>(e).unwrap().0, 77);
    }

    #[test]
    fn component_count_tracks_instances() {
        let world = World::new();
        let e1 = world.create_entity();
        world.add_component(e1, pos(0.0, 0.0, 0.0));
        world.add_component(e1, vel(0.0, 0.0, 0.0));
        let e2 = world.create_entity();
        world.add_component(e2, pos(0.0, 0.0, 0.0));

        assert_eq!(world.component_count(), 3);
        world.destroy_entity(e1);
        assert_eq!(world.component_count(), 1);
    }

    #[test]
    fn batch_transform_applies_exactly_once_across_boundaries() {
        for n in [3usize, 4, 5, 8, 9] {
            let world = World::new();
            let mut ids = Vec::new();
            for i in 0..n {
                let e = world.create_entity();
                world.add_component(e, Vec3::new(i as f32, 10.0, 100.0));
                ids.push(e);
            }

            // 9.75 subtracts exactly from 10.0 in f32; a second application
            // would leave -9.5, so strict equality pins "exactly once".
            let gravity = SubtractConstant(Vec3::new(0.0, 9.75, 0.0));
            let mut visited = 0;
            world.for_each_batched::<Vec3, _>(&gravity, |_, _| {
                visited += 1;
            });

            assert_eq!(visited, n, "population {n}");
            for (i, &e) in ids.iter().enumerate() {
                let v = world.get_component::<Vec3>(e).unwrap();
                assert_eq!(*v, Vec3::new(i as f32, 0.25, 100.0), "population {n}");
            }
        }
    }

    #[test]
    fn batch_visits_every_archetype_holding_the_store() {
        let world = World::new();
        let plain = world.create_entity();
        world.add_component(plain, Vec3::splat(5.0));
        let marked = world.create_entity();
        world.add_component(marked, Vec3::splat(5.0));
        world.add_component(marked, Marker);
        let unrelated = world.create_entity();
        world.add_component(unrelated, Health(1));

        let mut seen = Vec::new();
        world.for_each_batched::<Vec3, _>(&SubtractConstant(Vec3::ONE), |e, v| {
            seen.push((e, *v));
        });

        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&(plain, Vec3::splat(4.0))));
        assert!(seen.contains(&(marked, Vec3::splat(4.0))));
        assert!(world.get_component::<Vec3>(unrelated).is_none());
    }

    #[test]
    fn batch_callback_sees_the_transformed_value() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, Vec3::new(3.0, 3.0, 3.0));

        world.for_each_batched::<Vec3, _>(&SubtractConstant(Vec3::ONE), |_, v| {
            assert_eq!(*v, Vec3::new(2.0, 2.0, 2.0));
        });
    }

    #[test]
    fn batch_callback_can_refine_values_in_place() {
        let world = World::new();
        let high = world.create_entity();
        world.add_component(high, Vec3::new(0.0, 5.0, 0.0));
        let low = world.create_entity();
        world.add_component(low, Vec3::new(0.0, 1.0, 0.0));

        // Gravity via the transform, then a floor clamp per entity.
        world.for_each_batched::<Vec3, _>(&SubtractConstant(Vec3::new(0.0, 2.0, 0.0)), |_, v| {
            v.y = v.y.max(0.0);
        });

        assert_eq!(world.get_component::<Vec3>(high).unwrap().y, 3.0);
        assert_eq!(world.get_component::<Vec3>(low).unwrap().y, 0.0);
    }

    #[test]
    #[should_panic(expected = "inside a for_each_batched")]
    fn structural_mutation_from_batch_callback_panics() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, Vec3::ZERO);

        world.for_each_batched::<Vec3, _>(&SubtractConstant(Vec3::ZERO), |_, _| {
            world.create_entity();
        });
    }

    #[test]
    #[should_panic(expected = "inside a for_each_batched")]
    fn reads_from_batch_callback_panic_too() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, Vec3::ZERO);

        world.for_each_batched::<Vec3, _>(&SubtractConstant(Vec3::ZERO), |id, _| {
            let _ = world.get_component::<Vec3>(id);
        });
    }

    #[test]
    fn world_is_usable_again_after_a_batch() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, Vec3::ONE);

        world.for_each_batched::<Vec3, _>(&SubtractConstant(Vec3::ZERO), |_, _| {});

        // The re-entrancy marker was cleared on exit.
        let e2 = world.create_entity();
        assert!(world.is_alive(e2));
        assert_eq!(world.query::<(Vec3,)>(), vec![e]);
    }

    #[test]
    fn population_invariant_holds_under_random_interleaving() {
        // Deterministic xorshift so a failure reproduces.
        fn next(state: &mut u64) -> u64 {
            let mut x = *state;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            *state = x;
            x
        }

        let world = World::new();
        let mut known: Vec<EntityId> = Vec::new();
        let mut rng = 0x9E37_79B9_7F4A_7C15u64;

        for step in 0..500 {
            let roll = next(&mut rng) % 8;
            match roll {
                0 | 1 => {
                    if known.len() < 64 {
                        known.push(world.create_entity());
                    }
                }
                2 => {
                    if !known.is_empty() {
                        let i = (next(&mut rng) as usize) % known.len();
                        world.destroy_entity(known.swap_remove(i));
                    }
                }
                3 | 4 => {
                    if !known.is_empty() {
                        let i = (next(&mut rng) as usize) % known.len();
                        world.add_component(known[i], pos(step as f32, 0.0, 0.0));
                    }
                }
                5 => {
                    if !known.is_empty() {
                        let i = (next(&mut rng) as usize) % known.len();
                        world.add_component(known[i], Health(step));
                    }
                }
                6 => {
                    if !known.is_empty() {
                        let i = (next(&mut rng) as usize) % known.len();
                        world.remove_component::<Position>(known[i]);
                    }
                }
                _ => {
                    if !known.is_empty() {
                        let i = (next(&mut rng) as usize) % known.len();
                        world.remove_component::<Health>(known[i]);
                    }
                }
            }

            assert_eq!(world.entity_count(), known.len(), "step {step}");
            assert!(world.is_healthy(), "step {step}");
        }
    }

    #[test]
    fn concurrent_readers_and_writers_smoke() {
        let world = World::new();
        for _ in 0..32 {
            let e = world.create_entity();
            world.add_component(e, Health(1));
        }

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..100u32 {
                    let e = world.create_entity();
                    world.add_component(e, Health(i));
                    if i % 3 == 0 {
                        world.destroy_entity(e);
                    }
                }
            });
            for _ in 0..2 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let _ = world.query::<(Health,)>();
                        let _ = world.entity_count();
                    }
                });
            }
        });

        assert!(world.is_healthy());
    }

    #[test]
    fn stats_snapshot_reflects_the_world() {
        let world = World::new();
        for _ in 0..3 {
            let e = world.create_entity();
            world.add_component(e, pos(0.0, 0.0, 0.0));
        }
        let lone = world.create_entity();
        world.add_component(lone, Health(9));

        let _ = world.query::<(Position,)>();
        let _ = world.query::<(Health,)>();

        let stats = world.stats();
        assert_eq!(stats.entity_count, 4);
        assert_eq!(stats.component_count, 4);
        assert_eq!(stats.query_count, 2);
        assert!(stats.avg_query_us >= 0.0);

        // Largest bucket first; the emptied [] archetype is omitted.
        assert_eq!(stats.archetypes.len(), 2);
        assert_eq!(stats.archetypes[0].entity_count, 3);
        assert_eq!(
            stats.archetypes[0].component_names,
            vec!["Position".to_string()]
        );
        assert_eq!(stats.archetypes[1].entity_count, 1);
    }

    #[test]
    fn non_query_operations_do_not_bump_query_metrics() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, Health(1));
        let _ = world.get_component::<Health>(e);
        let _ = world.entity_count();

        assert_eq!(world.stats().query_count, 0);
    }
}
