//! Collision volumes and closest-point queries
//!
//! Shapes are stored in the body's MODEL SPACE and transformed to world space
//! on demand, using the body pose and local scale at query time. The dynamic
//! attach solver uses [`ClosestPointQuery`] to snap a grab point onto the
//! surface or interior of the grabbed object.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Pose, Quat, Vec3};

/// Closest point on a body's collision volume
pub trait ClosestPointQuery {
    /// Closest world-space point on the volume to `point`.
    ///
    /// Points inside the volume are returned unchanged. `None` means the body
    /// has no colliders.
    fn closest_point(&self, body_pose: &Pose, body_scale: &Vec3, point: Vec3) -> Option<Vec3>;
}

/// A bounding sphere in world space
#[derive(Debug, Clone, Copy)]
pub struct BoundingSphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Whether the point lies inside or on the sphere
    pub fn contains(&self, point: &Vec3) -> bool {
        (point - self.center).magnitude_squared() <= self.radius * self.radius
    }

    /// Closest point on or inside the sphere
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let offset = point - self.center;
        let distance = offset.magnitude();
        if distance <= self.radius {
            point
        } else {
            self.center + offset * (self.radius / distance)
        }
    }
}

/// An oriented box in world space
#[derive(Debug, Clone, Copy)]
pub struct OrientedBox {
    /// Box center
    pub center: Vec3,
    /// Half size along each local axis
    pub half_extents: Vec3,
    /// Box orientation
    pub rotation: Quat,
}

impl OrientedBox {
    /// Closest point on or inside the box
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let local = self.rotation.inverse() * (point - self.center);
        let clamped = Vec3::new(
            local.x.clamp(-self.half_extents.x, self.half_extents.x),
            local.y.clamp(-self.half_extents.y, self.half_extents.y),
            local.z.clamp(-self.half_extents.z, self.half_extents.z),
        );
        self.center + self.rotation * clamped
    }
}

/// A capsule (swept sphere) in world space
#[derive(Debug, Clone, Copy)]
pub struct Capsule {
    /// First segment end
    pub start: Vec3,
    /// Second segment end
    pub end: Vec3,
    /// Sweep radius
    pub radius: f32,
}

impl Capsule {
    /// Closest point on or inside the capsule
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let segment = self.end - self.start;
        let length_squared = segment.magnitude_squared();
        let t = if length_squared > f32::EPSILON {
            ((point - self.start).dot(&segment) / length_squared).clamp(0.0, 1.0)
        } else {
            0.0
        };
        BoundingSphere::new(self.start + segment * t, self.radius).closest_point(point)
    }
}

/// Collider shape types (stored in MODEL SPACE)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Sphere around a local center
    Sphere {
        /// Local center
        center: Vec3,
        /// Radius in model units
        radius: f32,
    },
    /// Box around a local center
    Box {
        /// Local center
        center: Vec3,
        /// Half size in model units
        half_extents: Vec3,
        /// Local orientation
        rotation: Quat,
    },
    /// Capsule between two local points
    Capsule {
        /// First local segment end
        start: Vec3,
        /// Second local segment end
        end: Vec3,
        /// Radius in model units
        radius: f32,
    },
}

impl ColliderShape {
    /// Sphere centered on the body origin
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere {
            center: Vec3::zeros(),
            radius,
        }
    }

    /// Axis-aligned (in model space) box centered on the body origin
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Box {
            center: Vec3::zeros(),
            half_extents,
            rotation: Quat::identity(),
        }
    }

    /// Transform this shape to world space using the body pose and scale
    pub fn to_world_space(&self, pose: &Pose, scale: &Vec3) -> WorldSpaceShape {
        let max_scale = scale.x.abs().max(scale.y.abs()).max(scale.z.abs());
        match self {
            Self::Sphere { center, radius } => WorldSpaceShape::Sphere(BoundingSphere::new(
                pose.transform_point_scaled(*center, scale),
                radius * max_scale,
            )),
            Self::Box {
                center,
                half_extents,
                rotation,
            } => WorldSpaceShape::Box(OrientedBox {
                center: pose.transform_point_scaled(*center, scale),
                half_extents: half_extents.component_mul(&scale.abs()),
                rotation: pose.rotation * rotation,
            }),
            Self::Capsule { start, end, radius } => WorldSpaceShape::Capsule(Capsule {
                start: pose.transform_point_scaled(*start, scale),
                end: pose.transform_point_scaled(*end, scale),
                radius: radius * max_scale,
            }),
        }
    }
}

/// World-space shape produced by [`ColliderShape::to_world_space`]
#[derive(Debug, Clone, Copy)]
pub enum WorldSpaceShape {
    /// World-space sphere
    Sphere(BoundingSphere),
    /// World-space oriented box
    Box(OrientedBox),
    /// World-space capsule
    Capsule(Capsule),
}

impl WorldSpaceShape {
    /// Closest point on or inside the shape
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        match self {
            Self::Sphere(sphere) => sphere.closest_point(point),
            Self::Box(cuboid) => cuboid.closest_point(point),
            Self::Capsule(capsule) => capsule.closest_point(point),
        }
    }
}

/// All colliders of one body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColliderVolume {
    /// Shapes in model space
    pub shapes: Vec<ColliderShape>,
}

impl ColliderVolume {
    /// Create a volume from shapes
    pub fn new(shapes: Vec<ColliderShape>) -> Self {
        Self { shapes }
    }

    /// Add a shape (builder pattern)
    pub fn with_shape(mut self, shape: ColliderShape) -> Self {
        self.shapes.push(shape);
        self
    }
}

impl ClosestPointQuery for ColliderVolume {
    fn closest_point(&self, body_pose: &Pose, body_scale: &Vec3, point: Vec3) -> Option<Vec3> {
        self.shapes
            .iter()
            .map(|shape| shape.to_world_space(body_pose, body_scale).closest_point(point))
            .min_by(|a, b| {
                (a - point)
                    .magnitude_squared()
                    .total_cmp(&(b - point).magnitude_squared())
            })
    }
}
