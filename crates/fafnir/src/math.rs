//! Math types and glam re-exports.
//!
//! We re-export the [glam](https://docs.rs/glam) types the storage engine is
//! built on, so users don't need to depend on glam directly. [`Vec3`] is the
//! payload of a vector component; [`Vec4`] is the four-lane register the
//! batch transforms operate on.

pub use glam::{Vec3, Vec4};
