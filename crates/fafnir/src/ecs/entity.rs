//! # EntityId — Lightweight Handles for Stored Objects
//!
//! An [`EntityId`] is just a number — it doesn't "contain" anything. The
//! [`World`](super::world::World) maps ids to component data. This separation
//! of identity from data is the core insight of the ECS pattern.
//!
//! ## Design: Monotonic Allocation, No Recycling
//!
//! Many ECS implementations recycle destroyed ids and pair each slot with a
//! generation counter so stale handles can be detected:
//!
//! ```text
//! Entity { index: 5, generation: 0 }  ← original
//! Entity { index: 5, generation: 1 }  ← after recycle
//! ```
//!
//! We deliberately do neither. Ids come from a plain `u64` counter and a
//! destroyed id is never reissued, so a stale handle can never alias a newer
//! entity — every lookup on it simply degrades to `None`/`false`. That makes
//! the generation machinery dead weight: there is nothing to detect.
//!
//! The cost is id-space consumption. At one million allocations per second a
//! `u64` lasts about 584,000 years, which we accept.
//!
//! ## Comparison
//!
//! - **hecs / bevy_ecs**: generational indices (index + generation packed
//!   into a `u64`), because both recycle slots.
//! - **EnTT (C++)**: same packed-integer recycling scheme.
//! - **here**: one `u64`, never reused. Simpler handles, simpler invariants.

use std::fmt;

/// A lightweight handle to an entity in the [`World`](super::world::World).
///
/// Ids are unique for the lifetime of the `World` that issued them and are
/// never recycled. An `EntityId` from one `World` is meaningless in another.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct EntityId(pub(crate) u64);

impl EntityId {
    /// Returns the raw id. Useful for diagnostics, not for general use.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues entity ids from a monotonic counter.
///
/// Ids start at 1 so that 0 never names a real entity, which keeps zeroed
/// memory from accidentally looking like a valid handle in a debugger.
pub(crate) struct EntityAllocator {
    next: u64,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Issue a fresh [`EntityId`].
    ///
    /// # Panics
    ///
    /// Panics if the id space is exhausted. This is fatal: identity
    /// uniqueness cannot be preserved past this point.
    pub fn allocate(&mut self) -> EntityId {
        let id = self.next;
        self.next = self
            .next
            .checked_add(1)
            .expect("entity id space exhausted");
        EntityId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_sequential() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        let e1 = alloc.allocate();
        let e2 = alloc.allocate();
        assert_eq!(e0.raw(), 1);
        assert_eq!(e1.raw(), 2);
        assert_eq!(e2.raw(), 3);
    }

    #[test]
    fn zero_is_never_issued() {
        let mut alloc = EntityAllocator::new();
        for _ in 0..100 {
            assert_ne!(alloc.allocate().raw(), 0);
        }
    }

    #[test]
    fn display_is_the_raw_id() {
        assert_eq!(EntityId(42).to_string(), "42");
    }
}
