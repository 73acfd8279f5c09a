//! Physics module: the body and collider collaborators of the grab pipeline
//!
//! Provides the [`RigidBody`] seam the application stage writes through and
//! the collider volumes the attach solver snaps onto.

pub mod body;
pub mod collider;

pub use body::{Interpolation, RigidBody, SimulatedBody};
pub use collider::{
    BoundingSphere,
    Capsule,
    ClosestPointQuery,
    ColliderShape,
    ColliderVolume,
    OrientedBox,
    WorldSpaceShape,
};
