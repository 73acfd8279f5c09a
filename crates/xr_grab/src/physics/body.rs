//! Rigid body representation consumed by the grab pipeline
//!
//! The pipeline never simulates physics. It reads and writes a body through
//! the [`RigidBody`] trait, which the host implements on top of whatever
//! physics engine it runs. [`SimulatedBody`] is a small self-contained
//! implementation used by tests and the demo.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Pose, Quat, Vec3};

/// Render interpolation mode of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolation {
    /// No render interpolation
    #[default]
    None,
    /// Interpolate between the last two physics steps
    Interpolate,
    /// Extrapolate from the current velocity
    Extrapolate,
}

/// Body the grab pipeline drives
pub trait RigidBody {
    /// World pose
    fn pose(&self) -> Pose;

    /// Teleport to a world pose
    fn set_pose(&mut self, pose: Pose);

    /// Local scale
    fn local_scale(&self) -> Vec3;

    /// Set local scale
    fn set_local_scale(&mut self, scale: Vec3);

    /// Kinematic-safe move toward a position, resolved by the next physics step
    fn move_position(&mut self, position: Vec3);

    /// Kinematic-safe move toward a rotation, resolved by the next physics step
    fn move_rotation(&mut self, rotation: Quat);

    /// Linear velocity (m/s)
    fn linear_velocity(&self) -> Vec3;

    /// Set linear velocity. Only meaningful on non-kinematic bodies.
    fn set_linear_velocity(&mut self, velocity: Vec3);

    /// Angular velocity (rad/s, axis scaled by speed)
    fn angular_velocity(&self) -> Vec3;

    /// Set angular velocity. Only meaningful on non-kinematic bodies.
    fn set_angular_velocity(&mut self, velocity: Vec3);

    /// Whether the body ignores forces and velocities
    fn is_kinematic(&self) -> bool;

    /// Set the kinematic flag
    fn set_kinematic(&mut self, kinematic: bool);

    /// Whether gravity applies
    fn use_gravity(&self) -> bool;

    /// Set the gravity flag
    fn set_use_gravity(&mut self, use_gravity: bool);

    /// Render interpolation mode
    fn interpolation(&self) -> Interpolation;

    /// Set render interpolation mode
    fn set_interpolation(&mut self, interpolation: Interpolation);

    /// Linear damping coefficient
    fn linear_damping(&self) -> f32;

    /// Set linear damping coefficient
    fn set_linear_damping(&mut self, damping: f32);

    /// Angular damping coefficient
    fn angular_damping(&self) -> f32;

    /// Set angular damping coefficient
    fn set_angular_damping(&mut self, damping: f32);
}

/// Minimal explicit-Euler body
#[derive(Debug, Clone)]
pub struct SimulatedBody {
    /// World pose
    pub pose: Pose,

    /// Local scale
    pub scale: Vec3,

    /// Linear velocity in units per second
    pub velocity: Vec3,

    /// Angular velocity in radians per second
    pub angular_velocity: Vec3,

    /// Gravity acceleration applied when `use_gravity` is set
    pub gravity: Vec3,

    kinematic: bool,
    use_gravity: bool,
    interpolation: Interpolation,
    linear_damping: f32,
    angular_damping: f32,
    pending_position: Option<Vec3>,
    pending_rotation: Option<Quat>,
}

impl SimulatedBody {
    /// Create a dynamic body at the given pose
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            scale: Vec3::new(1.0, 1.0, 1.0),
            velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            gravity: Vec3::new(0.0, -9.81, 0.0),
            kinematic: false,
            use_gravity: true,
            interpolation: Interpolation::Interpolate,
            linear_damping: 0.0,
            angular_damping: 0.05,
            pending_position: None,
            pending_rotation: None,
        }
    }

    /// Create a kinematic body at the given pose
    pub fn new_kinematic(pose: Pose) -> Self {
        let mut body = Self::new(pose);
        body.kinematic = true;
        body.use_gravity = false;
        body
    }

    /// Whether a kinematic move is waiting for the next step
    pub fn has_pending_move(&self) -> bool {
        self.pending_position.is_some() || self.pending_rotation.is_some()
    }

    /// Advance the body by one physics step
    pub fn step(&mut self, delta_time: f32) {
        if self.kinematic {
            if let Some(position) = self.pending_position.take() {
                self.pose.position = position;
            }
            if let Some(rotation) = self.pending_rotation.take() {
                self.pose.rotation = rotation;
            }
            return;
        }

        // Integrate linear motion
        if self.use_gravity {
            self.velocity += self.gravity * delta_time;
        }
        if self.linear_damping > 0.0 {
            self.velocity *= (1.0 - self.linear_damping * delta_time).max(0.0);
        }
        self.pose.position += self.velocity * delta_time;

        // Integrate angular motion
        if self.angular_damping > 0.0 {
            self.angular_velocity *= (1.0 - self.angular_damping * delta_time).max(0.0);
        }
        let spin = Quat::from_scaled_axis(self.angular_velocity * delta_time);
        self.pose.rotation = Quat::new_normalize((spin * self.pose.rotation).into_inner());
    }
}

impl Default for SimulatedBody {
    fn default() -> Self {
        Self::new(Pose::identity())
    }
}

impl RigidBody for SimulatedBody {
    fn pose(&self) -> Pose {
        self.pose
    }

    fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
        self.pending_position = None;
        self.pending_rotation = None;
    }

    fn local_scale(&self) -> Vec3 {
        self.scale
    }

    fn set_local_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    fn move_position(&mut self, position: Vec3) {
        if self.kinematic {
            self.pending_position = Some(position);
        } else {
            self.pose.position = position;
        }
    }

    fn move_rotation(&mut self, rotation: Quat) {
        if self.kinematic {
            self.pending_rotation = Some(rotation);
        } else {
            self.pose.rotation = rotation;
        }
    }

    fn linear_velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        if self.kinematic {
            log::warn!("Ignoring linear velocity set on a kinematic body");
            return;
        }
        self.velocity = velocity;
    }

    fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        if self.kinematic {
            log::warn!("Ignoring angular velocity set on a kinematic body");
            return;
        }
        self.angular_velocity = velocity;
    }

    fn is_kinematic(&self) -> bool {
        self.kinematic
    }

    fn set_kinematic(&mut self, kinematic: bool) {
        if kinematic && !self.kinematic {
            self.velocity = Vec3::zeros();
            self.angular_velocity = Vec3::zeros();
        }
        self.kinematic = kinematic;
    }

    fn use_gravity(&self) -> bool {
        self.use_gravity
    }

    fn set_use_gravity(&mut self, use_gravity: bool) {
        self.use_gravity = use_gravity;
    }

    fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    fn set_linear_damping(&mut self, damping: f32) {
        self.linear_damping = damping.max(0.0);
    }

    fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    fn set_angular_damping(&mut self, damping: f32) {
        self.angular_damping = damping.max(0.0);
    }
}
