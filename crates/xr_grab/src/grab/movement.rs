//! Movement application
//!
//! Commits a target pose to the [`RigidBody`] in one of three ways and
//! prepares or restores the body's physics flags around a grab.
//!
//! | Movement type      | Phase    | Body state during grab | Write                 |
//! |--------------------|----------|------------------------|-----------------------|
//! | `Instantaneous`    | Dynamic  | kinematic              | pose set directly     |
//! | `Kinematic`        | Fixed    | kinematic              | move position/rotation|
//! | `VelocityTracking` | Fixed    | dynamic                | linear/angular velocity|

use serde::{Deserialize, Serialize};

use crate::core::config::{TrackedAxes, VelocityTrackingConfig};
use crate::foundation::math::{move_towards, to_angle_axis, wrap_angle_degrees, constants, Pose, Vec3};
use crate::foundation::time::DELTA_TIME_THRESHOLD;
use crate::physics::{Interpolation, RigidBody};

/// Rotations smaller than this (degrees) produce no tracking angular velocity
const ANGLE_EPSILON_DEGREES: f32 = 1.0e-4;

/// How a grabbed body follows its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum MovementType {
    /// Pose written directly every frame
    #[default]
    Instantaneous,
    /// Kinematic moves resolved by the physics step
    Kinematic,
    /// Velocities that close the gap to the target, keeping collisions
    VelocityTracking,
}

impl MovementType {
    /// Whether the body is kinematic while grabbed with this type
    pub fn is_kinematic_while_grabbed(self) -> bool {
        self != Self::VelocityTracking
    }
}

/// Physics flags captured when a grab starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot {
    /// Kinematic flag before the grab
    pub was_kinematic: bool,
    /// Gravity flag before the grab
    pub used_gravity: bool,
    /// Interpolation before the grab
    pub interpolation: Interpolation,
    /// Linear damping before the grab
    pub linear_damping: f32,
    /// Angular damping before the grab
    pub angular_damping: f32,
}

impl BodySnapshot {
    /// Capture the current flags of a body
    pub fn capture(body: &dyn RigidBody) -> Self {
        Self {
            was_kinematic: body.is_kinematic(),
            used_gravity: body.use_gravity(),
            interpolation: body.interpolation(),
            linear_damping: body.linear_damping(),
            angular_damping: body.angular_damping(),
        }
    }
}

/// Prepare a body for being carried and return the flags to restore later.
pub fn setup_grab(body: &mut dyn RigidBody, movement_type: MovementType) -> BodySnapshot {
    let snapshot = BodySnapshot::capture(body);

    body.set_kinematic(movement_type.is_kinematic_while_grabbed());
    body.set_use_gravity(false);
    body.set_linear_damping(0.0);
    body.set_angular_damping(0.0);
    if movement_type == MovementType::Instantaneous {
        body.set_interpolation(Interpolation::None);
    }

    log::trace!("Grab setup for {:?}: {:?}", movement_type, snapshot);
    snapshot
}

/// Restore the flags captured by [`setup_grab`].
pub fn setup_drop(body: &mut dyn RigidBody, snapshot: &BodySnapshot, force_gravity: bool) {
    body.set_kinematic(snapshot.was_kinematic);
    body.set_use_gravity(snapshot.used_gravity || force_gravity);
    body.set_interpolation(snapshot.interpolation);
    body.set_linear_damping(snapshot.linear_damping);
    body.set_angular_damping(snapshot.angular_damping);
}

/// Write the target straight to the body.
pub fn perform_instantaneous_update(
    body: &mut dyn RigidBody,
    target_pose: &Pose,
    target_scale: &Vec3,
    axes: TrackedAxes,
) {
    let mut pose = body.pose();
    if axes.contains(TrackedAxes::POSITION) {
        pose.position = target_pose.position;
    }
    if axes.contains(TrackedAxes::ROTATION) {
        pose.rotation = target_pose.rotation;
    }
    body.set_pose(pose);
    apply_target_scale(body, target_scale, axes);
}

/// Queue kinematic moves toward the target.
pub fn perform_kinematic_update(body: &mut dyn RigidBody, target_pose: &Pose, axes: TrackedAxes) {
    if axes.contains(TrackedAxes::POSITION) {
        body.move_position(target_pose.position);
    }
    if axes.contains(TrackedAxes::ROTATION) {
        body.move_rotation(target_pose.rotation);
    }
}

/// Set body velocities that reach the target over `delta_time`.
///
/// Ticks shorter than [`DELTA_TIME_THRESHOLD`] are skipped entirely.
pub fn perform_velocity_tracking_update(
    body: &mut dyn RigidBody,
    target_pose: &Pose,
    delta_time: f32,
    axes: TrackedAxes,
    config: &VelocityTrackingConfig,
) {
    if delta_time < DELTA_TIME_THRESHOLD {
        return;
    }

    let pose = body.pose();

    if axes.contains(TrackedAxes::POSITION) {
        let velocity = compute_tracking_velocity(
            &body.linear_velocity(),
            &(target_pose.position - pose.position),
            delta_time,
            config,
        );
        if velocity.iter().all(|component| component.is_finite()) {
            body.set_linear_velocity(velocity);
        }
    }

    if axes.contains(TrackedAxes::ROTATION) {
        let angular_velocity = compute_tracking_angular_velocity(
            &body.angular_velocity(),
            &pose,
            target_pose,
            delta_time,
            config,
        );
        if angular_velocity.iter().all(|component| component.is_finite()) {
            body.set_angular_velocity(angular_velocity);
        }
    }
}

/// Linear velocity that closes `position_delta` in one tick.
pub fn compute_tracking_velocity(
    current: &Vec3,
    position_delta: &Vec3,
    delta_time: f32,
    config: &VelocityTrackingConfig,
) -> Vec3 {
    let damped = current * (1.0 - config.velocity_damping);
    let desired = damped + position_delta / delta_time * config.velocity_scale;
    if config.limit_linear_velocity {
        move_towards(current, &desired, config.max_linear_velocity_delta)
    } else {
        desired
    }
}

/// Angular velocity that closes the rotation gap in one tick.
pub fn compute_tracking_angular_velocity(
    current: &Vec3,
    pose: &Pose,
    target_pose: &Pose,
    delta_time: f32,
    config: &VelocityTrackingConfig,
) -> Vec3 {
    let damped = current * (1.0 - config.angular_velocity_damping);

    let rotation_delta = target_pose.rotation * pose.rotation.inverse();
    let (angle, axis) = to_angle_axis(&rotation_delta);
    let angle = wrap_angle_degrees(angle);
    if angle.abs() <= ANGLE_EPSILON_DEGREES {
        return damped;
    }

    let angular_target = axis * (angle * constants::DEG_TO_RAD / delta_time) * config.angular_velocity_scale;
    let desired = damped + angular_target;
    if config.limit_angular_velocity {
        move_towards(current, &desired, config.max_angular_velocity_delta)
    } else {
        desired
    }
}

/// Write the tracked scale channel.
pub fn apply_target_scale(body: &mut dyn RigidBody, target_scale: &Vec3, axes: TrackedAxes) {
    if axes.contains(TrackedAxes::SCALE) && body.local_scale() != *target_scale {
        body.set_local_scale(*target_scale);
    }
}
