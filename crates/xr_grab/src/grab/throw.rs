//! Throw velocity estimation
//!
//! While an object is held, every Dynamic tick records the linear and
//! angular velocity implied by the raw (pre-smoothing) target pose delta
//! into a fixed ring of [`THROW_SMOOTHING_FRAME_COUNT`] samples. At release
//! the samples inside the smoothing window are averaged, weighted by how
//! fresh they are, to produce the detach velocity.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::core::config::ThrowConfig;
use crate::foundation::math::{clamp_magnitude, constants, to_angle_axis, wrap_angle_degrees, Pose, Vec3};
use crate::foundation::time::DELTA_TIME_THRESHOLD;

/// Number of motion samples kept for throw estimation
pub const THROW_SMOOTHING_FRAME_COUNT: usize = 20;

/// Weight of a sample as a function of its freshness.
///
/// Freshness is `1 - age / window`, so `1.0` is the newest sample and `0.0`
/// one exactly at the edge of the window.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum WeightCurve {
    /// Every sample counts the same
    Constant,
    /// Weight equals freshness
    #[default]
    Linear,
    /// Quadratic ramp favoring the newest samples
    EaseIn,
    /// Quadratic ramp that flattens near the newest samples
    EaseOut,
    /// Hermite smoothstep
    SmoothStep,
    /// Piecewise-linear curve through `[freshness, weight]` keys sorted by freshness
    Keyframes(Vec<[f32; 2]>),
}

impl WeightCurve {
    /// Evaluate the curve at `t`, clamped to `[0, 1]`
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Constant => 1.0,
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => t * (2.0 - t),
            Self::SmoothStep => t * t * (3.0 - 2.0 * t),
            Self::Keyframes(keys) => evaluate_keyframes(keys, t),
        }
    }

    /// Reject curves that cannot be evaluated meaningfully
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Self::Keyframes(keys) = self {
            if keys.is_empty() {
                return Err(ConfigError::Invalid("weight curve needs at least one key".to_string()));
            }
            if keys.windows(2).any(|pair| pair[1][0] < pair[0][0]) {
                return Err(ConfigError::Invalid("weight curve keys must be sorted by time".to_string()));
            }
            if keys.iter().any(|key| key[1] < 0.0 || !key[1].is_finite()) {
                return Err(ConfigError::Invalid("weight curve values must be finite and non-negative".to_string()));
            }
        }
        Ok(())
    }
}

fn evaluate_keyframes(keys: &[[f32; 2]], t: f32) -> f32 {
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return 0.0;
    };
    if t <= first[0] {
        return first[1];
    }
    if t >= last[0] {
        return last[1];
    }
    for pair in keys.windows(2) {
        let ([t0, v0], [t1, v1]) = (pair[0], pair[1]);
        if t <= t1 {
            let span = t1 - t0;
            if span <= f32::EPSILON {
                return v1;
            }
            return v0 + (v1 - v0) * ((t - t0) / span);
        }
    }
    last[1]
}

/// One recorded motion sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowSample {
    /// Tick time the sample was recorded at
    pub time: f32,
    /// Linear velocity (m/s)
    pub linear: Vec3,
    /// Angular velocity (rad/s)
    pub angular: Vec3,
}

/// Ring buffer of motion samples and the weighted average over them
#[derive(Debug, Clone)]
pub struct ThrowVelocityEstimator {
    samples: [Option<ThrowSample>; THROW_SMOOTHING_FRAME_COUNT],
    next: usize,
    last_reference: Option<Pose>,
}

impl Default for ThrowVelocityEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl ThrowVelocityEstimator {
    /// Empty estimator
    pub fn new() -> Self {
        Self {
            samples: [None; THROW_SMOOTHING_FRAME_COUNT],
            next: 0,
            last_reference: None,
        }
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.samples = [None; THROW_SMOOTHING_FRAME_COUNT];
        self.next = 0;
        self.last_reference = None;
    }

    /// Record the raw target pose of one tick.
    ///
    /// The first call after a reset only stores the reference pose. Ticks
    /// shorter than [`DELTA_TIME_THRESHOLD`] move the reference without
    /// producing a sample.
    pub fn record(&mut self, raw_pose: &Pose, time: f32, delta_time: f32) {
        if let Some(reference) = self.last_reference {
            if delta_time >= DELTA_TIME_THRESHOLD {
                let linear = (raw_pose.position - reference.position) / delta_time;

                let rotation_delta = raw_pose.rotation * reference.rotation.inverse();
                let (angle, axis) = to_angle_axis(&rotation_delta);
                let angle = wrap_angle_degrees(angle);
                let angular = axis * (angle * constants::DEG_TO_RAD / delta_time);

                self.push(ThrowSample { time, linear, angular });
            }
        }
        self.last_reference = Some(*raw_pose);
    }

    fn push(&mut self, sample: ThrowSample) {
        self.samples[self.next] = Some(sample);
        self.next = (self.next + 1) % THROW_SMOOTHING_FRAME_COUNT;
    }

    /// Samples from newest to oldest
    pub fn samples(&self) -> impl Iterator<Item = &ThrowSample> + '_ {
        (0..THROW_SMOOTHING_FRAME_COUNT).map_while(move |offset| {
            let index = (self.next + THROW_SMOOTHING_FRAME_COUNT - 1 - offset) % THROW_SMOOTHING_FRAME_COUNT;
            self.samples[index].as_ref()
        })
    }

    /// Number of recorded samples
    pub fn sample_count(&self) -> usize {
        self.samples().count()
    }

    /// Reference pose the next sample is measured from
    pub fn last_reference(&self) -> Option<&Pose> {
        self.last_reference.as_ref()
    }

    /// Freshness-weighted average of the samples inside `window` seconds.
    ///
    /// Walks from newest to oldest and stops after the first sample older
    /// than the window. Returns zero vectors when no weight accumulates.
    pub fn smoothed_velocity(&self, now: f32, window: f32, curve: &WeightCurve) -> (Vec3, Vec3) {
        let mut linear = Vec3::zeros();
        let mut angular = Vec3::zeros();
        let mut total_weight = 0.0;

        for sample in self.samples() {
            let age = now - sample.time;
            let freshness = if window > 0.0 { 1.0 - age / window } else { 0.0 };
            let weight = curve.evaluate(freshness.clamp(0.0, 1.0));

            linear += sample.linear * weight;
            angular += sample.angular * weight;
            total_weight += weight;

            if age > window {
                break;
            }
        }

        if total_weight > 0.0 {
            (linear / total_weight, angular / total_weight)
        } else {
            (Vec3::zeros(), Vec3::zeros())
        }
    }

    /// Re-express the history after the reference frame jumped by `delta`.
    pub fn reframe(&mut self, delta: &Pose) {
        for sample in self.samples.iter_mut().flatten() {
            sample.linear = delta.rotation * sample.linear;
            sample.angular = delta.rotation * sample.angular;
        }
        if let Some(reference) = self.last_reference.as_mut() {
            *reference = delta.multiply(reference);
        }
    }
}

/// Redirects a release velocity toward a target
pub trait AimAssist {
    /// Adjusted velocity for a throw leaving `source` with `velocity`
    fn assisted_velocity(&self, source: &Vec3, velocity: &Vec3) -> Vec3;
}

/// Solves a ballistic arc through a target point, keeping the throw speed.
///
/// Throws aimed further than `max_angle_degrees` away from the target, or
/// too slow to reach it, are returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryAimAssist {
    /// World-space point to hit
    pub target: Vec3,
    /// Largest deviation between the throw and the target direction that still gets assisted
    pub max_angle_degrees: f32,
    /// Downward gravity magnitude (m/s²)
    pub gravity: f32,
}

impl TrajectoryAimAssist {
    /// Assist toward `target` with earth gravity and a 30 degree cone
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            max_angle_degrees: 30.0,
            gravity: 9.81,
        }
    }
}

impl AimAssist for TrajectoryAimAssist {
    fn assisted_velocity(&self, source: &Vec3, velocity: &Vec3) -> Vec3 {
        let to_target = self.target - source;
        let speed = velocity.norm();
        if speed < f32::EPSILON || to_target.norm() < f32::EPSILON {
            return *velocity;
        }

        let angle = velocity.angle(&to_target) * constants::RAD_TO_DEG;
        if angle > self.max_angle_degrees {
            return *velocity;
        }

        let horizontal = Vec3::new(to_target.x, 0.0, to_target.z);
        let distance = horizontal.norm();
        if self.gravity.abs() < f32::EPSILON || distance < f32::EPSILON {
            return to_target.normalize() * speed;
        }

        // Low solution of the projectile launch angle through (distance, height)
        let height = to_target.y;
        let gravity = self.gravity.abs();
        let speed_squared = speed * speed;
        let discriminant =
            speed_squared * speed_squared - gravity * (gravity * distance * distance + 2.0 * height * speed_squared);
        if discriminant < 0.0 {
            log::debug!("Throw too slow to reach aim assist target, keeping original velocity");
            return *velocity;
        }

        let launch_angle = ((speed_squared - discriminant.sqrt()) / (gravity * distance)).atan();
        horizontal / distance * (speed * launch_angle.cos()) + Vec3::y() * (speed * launch_angle.sin())
    }
}

/// Release velocities produced by [`compute_detach_velocity`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetachVelocity {
    /// Linear velocity (m/s)
    pub linear: Vec3,
    /// Angular velocity (rad/s)
    pub angular: Vec3,
}

/// Scale, assist and clamp the smoothed history into the release velocity.
pub fn compute_detach_velocity(
    estimator: &ThrowVelocityEstimator,
    now: f32,
    config: &ThrowConfig,
    aim_assist: Option<(&dyn AimAssist, Vec3)>,
) -> DetachVelocity {
    let (linear, angular) = estimator.smoothed_velocity(now, config.smoothing_duration, &config.weight_curve);
    let mut linear = linear * config.velocity_scale;
    let mut angular = angular * config.angular_velocity_scale;

    match aim_assist {
        Some((assist, source)) => linear = assist.assisted_velocity(&source, &linear),
        None => {
            if let Some(max_speed) = config.max_linear_speed {
                linear = clamp_magnitude(&linear, max_speed);
            }
        }
    }
    if let Some(max_speed) = config.max_angular_speed {
        angular = clamp_magnitude(&angular, max_speed);
    }

    DetachVelocity { linear, angular }
}
