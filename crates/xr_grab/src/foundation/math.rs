//! Math utilities and types
//!
//! Provides the vector, quaternion and pose types used by every grab stage,
//! plus the clamped blend helpers the smoothing and velocity stages share.

use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};

pub use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Unit quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Rigid pose: world or local position plus orientation.
///
/// The rotation is kept normalized by every operation in this module;
/// blends re-normalize their result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Create a pose from position and rotation
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Identity pose at the origin
    pub fn identity() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }

    /// Create a pose with only a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::identity(),
        }
    }

    /// Compose two poses: `self` is the parent, `local` is expressed in it.
    pub fn multiply(&self, local: &Pose) -> Pose {
        Pose {
            position: self.position + self.rotation * local.position,
            rotation: self.rotation * local.rotation,
        }
    }

    /// Get the inverse pose
    pub fn inverse(&self) -> Pose {
        let inv_rotation = self.rotation.inverse();
        Pose {
            position: inv_rotation * -self.position,
            rotation: inv_rotation,
        }
    }

    /// Transform a local point into the space this pose lives in
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    /// Transform a point back into this pose's local space
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.position)
    }

    /// Transform a local point through this pose with a non-uniform local scale,
    /// the way a scaled parent transform places its children.
    pub fn transform_point_scaled(&self, point: Vec3, scale: &Vec3) -> Vec3 {
        self.position + self.rotation * scale.component_mul(&point)
    }

    /// Inverse of [`Pose::transform_point_scaled`]. Zero scale axes map to zero.
    pub fn inverse_transform_point_scaled(&self, point: Vec3, scale: &Vec3) -> Vec3 {
        let unscaled = self.inverse_transform_point(point);
        Vec3::new(
            safe_div(unscaled.x, scale.x),
            safe_div(unscaled.y, scale.y),
            safe_div(unscaled.z, scale.z),
        )
    }

    /// Blend toward `target`: linear for position, spherical for rotation.
    pub fn interpolate(&self, target: &Pose, t: f32) -> Pose {
        Pose {
            position: lerp_vec3(&self.position, &target.position, t),
            rotation: slerp_quat(&self.rotation, &target.rotation, t),
        }
    }
}

impl AbsDiffEq for Pose {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.position.abs_diff_eq(&other.position, epsilon)
            && self.rotation.abs_diff_eq(&other.rotation, epsilon)
    }
}

impl RelativeEq for Pose {
    fn default_max_relative() -> f32 {
        f32::EPSILON
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.position.relative_eq(&other.position, epsilon, max_relative)
            && self.rotation.relative_eq(&other.rotation, epsilon, max_relative)
    }
}

fn safe_div(value: f32, divisor: f32) -> f32 {
    if divisor.abs() > f32::EPSILON {
        value / divisor
    } else {
        0.0
    }
}

/// Math constants
pub mod constants {
    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / std::f32::consts::PI;
}

/// Linear interpolation between two vectors with `t` clamped to `[0, 1]`.
pub fn lerp_vec3(from: &Vec3, to: &Vec3, t: f32) -> Vec3 {
    let t = t.clamp(0.0, 1.0);
    if t >= 1.0 {
        return *to;
    }
    from + (to - from) * t
}

/// Spherical interpolation with `t` clamped to `[0, 1]`.
///
/// Falls back to a normalized lerp along the shortest arc when the two
/// rotations are too close for slerp to be well defined.
pub fn slerp_quat(from: &Quat, to: &Quat, t: f32) -> Quat {
    let t = t.clamp(0.0, 1.0);
    if t <= 0.0 {
        return *from;
    }
    if t >= 1.0 {
        return *to;
    }

    from.try_slerp(to, t, 1.0e-6).unwrap_or_else(|| {
        let target = if from.coords.dot(&to.coords) < 0.0 {
            Quat::new_unchecked(-to.into_inner())
        } else {
            *to
        };
        Quat::new_normalize(from.nlerp(&target, t).into_inner())
    })
}

/// Move `current` toward `target` by at most `max_delta`.
pub fn move_towards(current: &Vec3, target: &Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.norm();
    if distance <= max_delta || distance < f32::EPSILON {
        *target
    } else {
        current + delta / distance * max_delta
    }
}

/// Clamp the magnitude of a vector.
pub fn clamp_magnitude(vector: &Vec3, max_length: f32) -> Vec3 {
    let length = vector.norm();
    if length > max_length && length > f32::EPSILON {
        vector * (max_length / length)
    } else {
        *vector
    }
}

/// Wrap an angle in degrees into `(-180, 180]`.
pub fn wrap_angle_degrees(angle: f32) -> f32 {
    let mut wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped -= 360.0;
    } else if wrapped <= -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Decompose a rotation into an angle in degrees `[0, 360)` and a unit axis.
///
/// Near-identity rotations report a zero angle around +X.
pub fn to_angle_axis(rotation: &Quat) -> (f32, Vec3) {
    let imag = rotation.imag();
    let sin_half = imag.norm();
    if sin_half < 1.0e-7 {
        return (0.0, Vec3::x());
    }
    let angle = 2.0 * sin_half.atan2(rotation.w) * constants::RAD_TO_DEG;
    (angle, imag / sin_half)
}
