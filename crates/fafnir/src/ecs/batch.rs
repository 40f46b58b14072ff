//! # Batch — Fixed-Width Vector Iteration
//!
//! The bulk path for numeric components. Stores keep their values in a
//! contiguous `Vec<T>`, so a store of three-float vectors can be walked
//! four entities at a time with the axes repacked into four-lane registers:
//!
//! ```text
//! values:  [v0 v1 v2 v3 | v4 v5 v6 v7 | v8 v9]      (WIDTH = 4)
//!           └── batch ──┘ └── batch ──┘ └ tail ┘
//!
//! batch:   x = [v0.x v1.x v2.x v3.x]  ┐
//!          y = [v0.y v1.y v2.y v3.y]  ├─ transform.apply_wide(x, y, z)
//!          z = [v0.z v1.z v2.z v3.z]  ┘  then scatter lanes back
//! tail:    transform.apply(v) per value
//! ```
//!
//! The tail covers the final partial batch and any store smaller than the
//! width. Either way every value passes through the transform exactly once;
//! the per-element callback then receives the transformed value mutably,
//! together with its owning entity id, for scalar per-entity refinement.
//!
//! ## Comparison
//!
//! - **hecs / bevy_ecs**: iterate scalar rows and leave vectorization to the
//!   autovectorizer. Here the width is explicit: a [`BatchTransform`] can
//!   override [`apply_wide`](BatchTransform::apply_wide) with a genuinely
//!   lane-parallel implementation, as [`SubtractConstant`] does.

use crate::math::{Vec3, Vec4};

use super::entity::EntityId;

/// Entities per wide batch. An implementation choice, not part of the
/// public contract; the tail path makes any store size correct.
pub(crate) const WIDTH: usize = 4;

/// A component whose payload is a three-float vector, eligible for the
/// [`World::for_each_batched`](super::world::World::for_each_batched) path.
pub trait VectorComponent: 'static + Send + Sync {
    fn vec(&self) -> Vec3;
    fn set_vec(&mut self, v: Vec3);
}

/// Bare `Vec3` works as a vector component directly.
impl VectorComponent for Vec3 {
    fn vec(&self) -> Vec3 {
        *self
    }

    fn set_vec(&mut self, v: Vec3) {
        *self = v;
    }
}

/// A numeric transform applied to every value during batch iteration.
///
/// Implementors define the scalar [`apply`](Self::apply); the wide form
/// defaults to applying it per lane, so overriding it is purely a
/// performance decision and can never change results.
pub trait BatchTransform {
    /// Transform one value.
    fn apply(&self, v: Vec3) -> Vec3;

    /// Transform four values at once, one register per axis.
    fn apply_wide(&self, x: Vec4, y: Vec4, z: Vec4) -> (Vec4, Vec4, Vec4) {
        let mut out = [Vec3::ZERO; WIDTH];
        for (lane, slot) in out.iter_mut().enumerate() {
            *slot = self.apply(Vec3::new(x[lane], y[lane], z[lane]));
        }
        (
            Vec4::new(out[0].x, out[1].x, out[2].x, out[3].x),
            Vec4::new(out[0].y, out[1].y, out[2].y, out[3].y),
            Vec4::new(out[0].z, out[1].z, out[2].z, out[3].z),
        )
    }
}

/// Subtracts a constant term from every value. The canonical batched
/// transform (gravity-style offsets); its wide form is a single lane-wise
/// subtraction per axis.
pub struct SubtractConstant(pub Vec3);

impl BatchTransform for SubtractConstant {
    fn apply(&self, v: Vec3) -> Vec3 {
        v - self.0
    }

    fn apply_wide(&self, x: Vec4, y: Vec4, z: Vec4) -> (Vec4, Vec4, Vec4) {
        (
            x - Vec4::splat(self.0.x),
            y - Vec4::splat(self.0.y),
            z - Vec4::splat(self.0.z),
        )
    }
}

/// Walk one store's parallel columns: wide batches first, scalar tail after.
/// Callbacks run after their whole batch is scattered back, so a callback
/// never observes a half-transformed batch.
pub(crate) fn run_batched<T, B, F>(
    entities: &[EntityId],
    values: &mut [T],
    transform: &B,
    callback: &mut F,
) where
    T: VectorComponent,
    B: BatchTransform,
    F: FnMut(EntityId, &mut T),
{
    debug_assert_eq!(entities.len(), values.len());

    let mut value_chunks = values.chunks_exact_mut(WIDTH);
    let mut entity_chunks = entities.chunks_exact(WIDTH);

    for (vals, ents) in (&mut value_chunks).zip(&mut entity_chunks) {
        let (v0, v1, v2, v3) = (vals[0].vec(), vals[1].vec(), vals[2].vec(), vals[3].vec());
        let x = Vec4::new(v0.x, v1.x, v2.x, v3.x);
        let y = Vec4::new(v0.y, v1.y, v2.y, v3.y);
        let z = Vec4::new(v0.z, v1.z, v2.z, v3.z);

        let (x, y, z) = transform.apply_wide(x, y, z);

        for lane in 0..WIDTH {
            vals[lane].set_vec(Vec3::new(x[lane], y[lane], z[lane]));
        }
        for lane in 0..WIDTH {
            callback(ents[lane], &mut vals[lane]);
        }
    }

    for (val, &entity) in value_chunks
        .into_remainder()
        .iter_mut()
        .zip(entity_chunks.remainder())
    {
        val.set_vec(transform.apply(val.vec()));
        callback(entity, val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(n: u64) -> (Vec<EntityId>, Vec<Vec3>) {
        let entities: Vec<EntityId> = (1..=n).map(EntityId).collect();
        let values: Vec<Vec3> = (1..=n).map(|i| Vec3::new(i as f32, 10.0, -5.0)).collect();
        (entities, values)
    }

    #[test]
    fn subtract_constant_scalar_and_wide_agree() {
        let t = SubtractConstant(Vec3::new(0.5, 1.0, 2.0));
        let vs = [
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-4.0, 0.0, 9.5),
            Vec3::new(7.0, 7.0, 7.0),
            Vec3::new(0.0, -1.0, 0.25),
        ];
        let x = Vec4::new(vs[0].x, vs[1].x, vs[2].x, vs[3].x);
        let y = Vec4::new(vs[0].y, vs[1].y, vs[2].y, vs[3].y);
        let z = Vec4::new(vs[0].z, vs[1].z, vs[2].z, vs[3].z);

        let (wx, wy, wz) = t.apply_wide(x, y, z);
        for lane in 0..WIDTH {
            let wide = Vec3::new(wx[lane], wy[lane], wz[lane]);
            assert_eq!(wide, t.apply(vs[lane]));
        }
    }

    #[test]
    fn default_wide_impl_matches_scalar() {
        struct Doubler;
        impl BatchTransform for Doubler {
            fn apply(&self, v: Vec3) -> Vec3 {
                v * 2.0
            }
        }

        let (entities, mut values) = store_of(4);
        run_batched(&entities, &mut values, &Doubler, &mut |_, _| {});
        for (i, v) in values.iter().enumerate() {
            assert_eq!(*v, Vec3::new((i + 1) as f32, 10.0, -5.0) * 2.0);
        }
    }

    #[test]
    fn every_population_transforms_each_value_exactly_once() {
        for n in [0u64, 1, 3, 4, 5, 8, 9, 17] {
            let (entities, mut values) = store_of(n);
            // 9.75 subtracts exactly from 10.0 in f32, so equality below can
            // be strict on both the wide and the scalar path.
            let t = SubtractConstant(Vec3::new(0.0, 9.75, 0.0));

            let mut seen = Vec::new();
            run_batched(&entities, &mut values, &t, &mut |e, v| {
                seen.push((e, *v));
            });

            assert_eq!(seen.len(), n as usize, "population {n}");
            for (i, v) in values.iter().enumerate() {
                assert_eq!(*v, Vec3::new((i + 1) as f32, 0.25, -5.0), "population {n}");
            }
            // Callback saw the transformed value, paired with its owner.
            for (i, (e, v)) in seen.iter().enumerate() {
                assert_eq!(*e, entities[i]);
                assert_eq!(*v, values[i]);
            }
        }
    }

    #[test]
    fn wrapper_components_only_expose_their_vector() {
        struct Particle {
            pos: Vec3,
            generation: u32,
        }
        impl VectorComponent for Particle {
            fn vec(&self) -> Vec3 {
                self.pos
            }
            fn set_vec(&mut self, v: Vec3) {
                self.pos = v;
            }
        }

        let entities: Vec<EntityId> = (1..=5).map(EntityId).collect();
        let mut values: Vec<Particle> = (1..=5)
            .map(|i| Particle {
                pos: Vec3::splat(i as f32),
                generation: i,
            })
            .collect();

        let t = SubtractConstant(Vec3::ONE);
        run_batched(&entities, &mut values, &t, &mut |_, _| {});

        for (i, p) in values.iter().enumerate() {
            assert_eq!(p.pos, Vec3::splat(i as f32));
            // Non-vector fields pass through untouched.
            assert_eq!(p.generation, (i + 1) as u32);
        }
    }
}
