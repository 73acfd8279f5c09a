//! # Grab Configuration
//!
//! All tunables of a grab interactable in one serializable tree. The values
//! are pure configuration: nothing here has a lifecycle, and a session reads
//! them every tick so they can be changed between ticks.
//!
//! ## Configuration Categories
//!
//! - **Movement**: how the target pose is committed to the body
//! - **Smoothing**: ease-in and per-axis steady-state smoothing
//! - **Velocity Tracking**: damping, scale and per-tick delta limits
//! - **Throw**: release velocity estimation
//! - **Attach**: static and dynamic attach point behavior

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::foundation::math::Pose;
use crate::grab::movement::MovementType;
use crate::grab::throw::WeightCurve;

/// Default attach ease-in duration in seconds
pub const DEFAULT_ATTACH_EASE_IN_TIME: f32 = 0.15;
/// Default steady-state smoothing rate
pub const DEFAULT_SMOOTHING_AMOUNT: f32 = 8.0;
/// Default tighten fraction applied after the smoothing blend
pub const DEFAULT_TIGHTENING_AMOUNT: f32 = 0.1;
/// Default window of motion history used for throws, in seconds
pub const DEFAULT_THROW_SMOOTHING_DURATION: f32 = 0.25;
/// Default multiplier applied to the linear throw velocity
pub const DEFAULT_THROW_VELOCITY_SCALE: f32 = 1.5;
/// Default multiplier applied to the angular throw velocity
pub const DEFAULT_THROW_ANGULAR_VELOCITY_SCALE: f32 = 1.0;

bitflags! {
    /// Which pose channels the grab drives
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TrackedAxes: u8 {
        /// Follow the target position
        const POSITION = 0b001;
        /// Follow the target rotation
        const ROTATION = 0b010;
        /// Follow the target local scale
        const SCALE = 0b100;
    }
}

impl Default for TrackedAxes {
    fn default() -> Self {
        Self::all()
    }
}

/// Steady-state smoothing of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisSmoothing {
    /// Blend toward the raw target instead of snapping to it
    pub enabled: bool,
    /// Exponential blend rate per second
    pub rate: f32,
    /// Extra blend fraction applied after the rate blend to bound lag
    pub tighten: f32,
}

impl Default for AxisSmoothing {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: DEFAULT_SMOOTHING_AMOUNT,
            tighten: DEFAULT_TIGHTENING_AMOUNT,
        }
    }
}

impl AxisSmoothing {
    /// Enabled smoothing with the given rate and tighten fraction
    pub fn smoothed(rate: f32, tighten: f32) -> Self {
        Self {
            enabled: true,
            rate,
            tighten,
        }
    }

    fn validate(&self, axis: &str) -> Result<(), ConfigError> {
        if self.rate < 0.0 {
            return Err(ConfigError::Invalid(format!("{axis} smoothing rate must not be negative")));
        }
        if !(0.0..=1.0).contains(&self.tighten) {
            return Err(ConfigError::Invalid(format!("{axis} tighten must be within [0, 1]")));
        }
        Ok(())
    }
}

/// Per-channel smoothing parameters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParameters {
    /// Position channel
    pub position: AxisSmoothing,
    /// Rotation channel
    pub rotation: AxisSmoothing,
    /// Scale channel
    pub scale: AxisSmoothing,
}

impl SmoothingParameters {
    /// Same smoothing on every channel
    pub fn uniform(axis: AxisSmoothing) -> Self {
        Self {
            position: axis,
            rotation: axis,
            scale: axis,
        }
    }

    /// Whether any channel blends instead of snapping
    pub fn any_enabled(&self) -> bool {
        self.position.enabled || self.rotation.enabled || self.scale.enabled
    }
}

/// Velocity-tracking movement tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityTrackingConfig {
    /// Fraction of the current linear velocity removed each tick
    pub velocity_damping: f32,
    /// Multiplier on the velocity that closes the position gap
    pub velocity_scale: f32,
    /// Fraction of the current angular velocity removed each tick
    pub angular_velocity_damping: f32,
    /// Multiplier on the angular velocity that closes the rotation gap
    pub angular_velocity_scale: f32,
    /// Clamp how much the linear velocity may change per tick
    pub limit_linear_velocity: bool,
    /// Maximum linear velocity change per tick (m/s)
    pub max_linear_velocity_delta: f32,
    /// Clamp how much the angular velocity may change per tick
    pub limit_angular_velocity: bool,
    /// Maximum angular velocity change per tick (rad/s)
    pub max_angular_velocity_delta: f32,
}

impl Default for VelocityTrackingConfig {
    fn default() -> Self {
        Self {
            velocity_damping: 1.0,
            velocity_scale: 1.0,
            angular_velocity_damping: 1.0,
            angular_velocity_scale: 1.0,
            limit_linear_velocity: false,
            max_linear_velocity_delta: 10.0,
            limit_angular_velocity: false,
            max_angular_velocity_delta: 20.0,
        }
    }
}

/// Release velocity estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowConfig {
    /// Apply the estimated velocity to the body on release
    pub throw_on_detach: bool,
    /// History window in seconds
    pub smoothing_duration: f32,
    /// Weight of a sample as a function of its freshness in `[0, 1]`
    pub weight_curve: WeightCurve,
    /// Multiplier on the linear estimate
    pub velocity_scale: f32,
    /// Multiplier on the angular estimate
    pub angular_velocity_scale: f32,
    /// Maximum release speed (m/s), unlimited when absent
    pub max_linear_speed: Option<f32>,
    /// Maximum release angular speed (rad/s), unlimited when absent
    pub max_angular_speed: Option<f32>,
}

impl Default for ThrowConfig {
    fn default() -> Self {
        Self {
            throw_on_detach: true,
            smoothing_duration: DEFAULT_THROW_SMOOTHING_DURATION,
            weight_curve: WeightCurve::default(),
            velocity_scale: DEFAULT_THROW_VELOCITY_SCALE,
            angular_velocity_scale: DEFAULT_THROW_ANGULAR_VELOCITY_SCALE,
            max_linear_speed: None,
            max_angular_speed: None,
        }
    }
}

/// Attach point behavior
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachConfig {
    /// Static attach point, local to the body
    pub static_attach_pose: Pose,
    /// Compute a per-interactor attach point when a selection starts
    pub use_dynamic_attach: bool,
    /// Dynamic attach copies the interactor's attach position
    pub match_position: bool,
    /// Dynamic attach copies the interactor's attach rotation
    pub match_rotation: bool,
    /// Clamp a matched position onto the body's collision volume
    pub snap_to_collider_volume: bool,
    /// Re-run the solver when going from several grabbers back to one
    pub reinitialize_every_single_grab: bool,
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            static_attach_pose: Pose::identity(),
            use_dynamic_attach: false,
            match_position: true,
            match_rotation: true,
            snap_to_collider_volume: true,
            reinitialize_every_single_grab: true,
        }
    }
}

/// # Complete Grab Configuration
///
/// Top-level configuration for one grab interactable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    /// Default movement type when no interactor overrides it
    pub movement_type: MovementType,
    /// Channels the grab drives
    pub tracked_axes: TrackedAxes,
    /// Duration of the initial blend toward the grab target (0 disables)
    pub attach_ease_in_time: f32,
    /// Steady-state smoothing
    pub smoothing: SmoothingParameters,
    /// Velocity tracking tuning
    pub velocity_tracking: VelocityTrackingConfig,
    /// Throw estimation
    pub throw: ThrowConfig,
    /// Attach points
    pub attach: AttachConfig,
    /// Turn gravity on at release even if the body had it off
    pub force_gravity_on_detach: bool,
    /// Register the built-in free transformers when a grab starts with empty lists
    pub add_default_grab_transformers: bool,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            movement_type: MovementType::Instantaneous,
            tracked_axes: TrackedAxes::all(),
            attach_ease_in_time: DEFAULT_ATTACH_EASE_IN_TIME,
            smoothing: SmoothingParameters::default(),
            velocity_tracking: VelocityTrackingConfig::default(),
            throw: ThrowConfig::default(),
            attach: AttachConfig::default(),
            force_gravity_on_detach: false,
            add_default_grab_transformers: true,
        }
    }
}

impl GrabConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default movement type
    pub fn with_movement_type(mut self, movement_type: MovementType) -> Self {
        self.movement_type = movement_type;
        self
    }

    /// Set the tracked channels
    pub fn with_tracked_axes(mut self, axes: TrackedAxes) -> Self {
        self.tracked_axes = axes;
        self
    }

    /// Set the attach ease-in duration
    pub fn with_attach_ease_in_time(mut self, seconds: f32) -> Self {
        self.attach_ease_in_time = seconds;
        self
    }

    /// Set smoothing parameters
    pub fn with_smoothing(mut self, smoothing: SmoothingParameters) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Set velocity tracking tuning
    pub fn with_velocity_tracking(mut self, velocity_tracking: VelocityTrackingConfig) -> Self {
        self.velocity_tracking = velocity_tracking;
        self
    }

    /// Set throw configuration
    pub fn with_throw(mut self, throw: ThrowConfig) -> Self {
        self.throw = throw;
        self
    }

    /// Set attach configuration
    pub fn with_attach(mut self, attach: AttachConfig) -> Self {
        self.attach = attach;
        self
    }

    /// Enable or disable dynamic attach
    pub fn with_dynamic_attach(mut self, enabled: bool) -> Self {
        self.attach.use_dynamic_attach = enabled;
        self
    }

    /// Force gravity on release
    pub fn with_force_gravity_on_detach(mut self, enabled: bool) -> Self {
        self.force_gravity_on_detach = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attach_ease_in_time < 0.0 {
            return Err(ConfigError::Invalid("attach ease-in time must not be negative".to_string()));
        }

        self.smoothing.position.validate("position")?;
        self.smoothing.rotation.validate("rotation")?;
        self.smoothing.scale.validate("scale")?;

        let tracking = &self.velocity_tracking;
        for (name, value) in [
            ("velocity damping", tracking.velocity_damping),
            ("angular velocity damping", tracking.angular_velocity_damping),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{name} must be within [0, 1]")));
            }
        }
        if tracking.max_linear_velocity_delta < 0.0 || tracking.max_angular_velocity_delta < 0.0 {
            return Err(ConfigError::Invalid("velocity delta limits must not be negative".to_string()));
        }

        if self.throw.smoothing_duration <= 0.0 {
            return Err(ConfigError::Invalid("throw smoothing duration must be positive".to_string()));
        }
        if self.throw.max_linear_speed.is_some_and(|speed| speed < 0.0)
            || self.throw.max_angular_speed.is_some_and(|speed| speed < 0.0)
        {
            return Err(ConfigError::Invalid("throw speed limits must not be negative".to_string()));
        }
        self.throw.weight_curve.validate()?;

        Ok(())
    }
}

impl Config for GrabConfig {}
