//! Target smoothing
//!
//! Blends the smoothed target toward the raw transformer output. For the
//! first `ease_in_time` seconds of a grab a single ease-in blend is used;
//! after that each channel either snaps or follows a rate blend plus a
//! tighten blend.

use crate::core::config::{AxisSmoothing, SmoothingParameters};
use crate::foundation::math::{lerp_vec3, slerp_quat, Pose, Vec3};

/// Which smoothing rule a tick used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothingMode {
    /// Ease-in blend at the start of a grab
    EaseIn,
    /// Per-axis steady-state smoothing
    Steady,
}

/// Mode the next [`smooth_target`] call will use
pub fn smoothing_mode(ease_elapsed: f32, ease_in_time: f32) -> SmoothingMode {
    if ease_in_time > 0.0 && ease_elapsed <= ease_in_time {
        SmoothingMode::EaseIn
    } else {
        SmoothingMode::Steady
    }
}

/// Whether [`smooth_target`] would simply copy the raw target
pub fn is_pass_through(ease_elapsed: f32, ease_in_time: f32, parameters: &SmoothingParameters) -> bool {
    smoothing_mode(ease_elapsed, ease_in_time) == SmoothingMode::Steady && !parameters.any_enabled()
}

/// Blend `target` toward `raw` for one tick.
///
/// `ease_elapsed` is advanced by `delta_time` while the ease-in lasts.
#[allow(clippy::too_many_arguments)]
pub fn smooth_target(
    target_pose: &mut Pose,
    target_scale: &mut Vec3,
    raw_pose: &Pose,
    raw_scale: &Vec3,
    delta_time: f32,
    ease_in_time: f32,
    ease_elapsed: &mut f32,
    parameters: &SmoothingParameters,
) -> SmoothingMode {
    let mode = smoothing_mode(*ease_elapsed, ease_in_time);
    match mode {
        SmoothingMode::EaseIn => {
            let t = *ease_elapsed / ease_in_time;
            *target_pose = target_pose.interpolate(raw_pose, t);
            *target_scale = lerp_vec3(target_scale, raw_scale, t);
            *ease_elapsed += delta_time;
        }
        SmoothingMode::Steady => {
            target_pose.position = smooth_vec3(&target_pose.position, &raw_pose.position, delta_time, &parameters.position);
            target_pose.rotation = if parameters.rotation.enabled {
                let eased = slerp_quat(&target_pose.rotation, &raw_pose.rotation, parameters.rotation.rate * delta_time);
                slerp_quat(&eased, &raw_pose.rotation, parameters.rotation.tighten)
            } else {
                raw_pose.rotation
            };
            *target_scale = smooth_vec3(target_scale, raw_scale, delta_time, &parameters.scale);
        }
    }
    mode
}

fn smooth_vec3(current: &Vec3, raw: &Vec3, delta_time: f32, axis: &AxisSmoothing) -> Vec3 {
    if !axis.enabled {
        return *raw;
    }
    let eased = lerp_vec3(current, raw, axis.rate * delta_time);
    lerp_vec3(&eased, raw, axis.tighten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_disabled_axes_snap_to_raw() {
        let mut pose = Pose::identity();
        let mut scale = Vec3::new(1.0, 1.0, 1.0);
        let raw = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_euler_angles(0.1, 0.2, 0.3));
        let raw_scale = Vec3::new(2.0, 2.0, 2.0);
        let mut elapsed = 0.0;

        let mode = smooth_target(
            &mut pose,
            &mut scale,
            &raw,
            &raw_scale,
            0.02,
            0.0,
            &mut elapsed,
            &SmoothingParameters::default(),
        );
        assert_eq!(mode, SmoothingMode::Steady);
        assert_eq!(pose, raw);
        assert_eq!(scale, raw_scale);
    }

    #[test]
    fn test_ease_in_starts_at_previous_target() {
        let mut pose = Pose::identity();
        let mut scale = Vec3::new(1.0, 1.0, 1.0);
        let raw = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));
        let raw_scale = scale;
        let mut elapsed = 0.0;
        let parameters = SmoothingParameters::default();

        smooth_target(&mut pose, &mut scale, &raw, &raw_scale, 0.05, 0.2, &mut elapsed, &parameters);
        assert_eq!(pose.position, Vec3::zeros());
        assert_relative_eq!(elapsed, 0.05);

        smooth_target(&mut pose, &mut scale, &raw, &raw_scale, 0.05, 0.2, &mut elapsed, &parameters);
        assert_relative_eq!(pose.position.x, 0.25, epsilon = EPSILON);
    }

    #[test]
    fn test_ease_in_lands_on_raw_at_duration() {
        let mut pose = Pose::new(Vec3::new(0.3, 0.1, 0.0), Quat::from_euler_angles(0.2, 0.0, 0.0));
        let mut scale = Vec3::new(1.0, 1.0, 1.0);
        let raw = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_euler_angles(0.0, 0.5, 0.1));
        let raw_scale = Vec3::new(2.0, 0.5, 1.5);
        let mut elapsed = 0.2;

        let mode = smooth_target(
            &mut pose,
            &mut scale,
            &raw,
            &raw_scale,
            0.02,
            0.2,
            &mut elapsed,
            &SmoothingParameters::uniform(AxisSmoothing::smoothed(8.0, 0.1)),
        );
        assert_eq!(mode, SmoothingMode::EaseIn);
        assert_eq!(pose, raw);
        assert_eq!(scale, raw_scale);
    }

    #[test]
    fn test_ease_in_ends_after_duration() {
        let mut elapsed = 0.2;
        assert_eq!(smoothing_mode(elapsed, 0.2), SmoothingMode::EaseIn);
        elapsed += 0.01;
        assert_eq!(smoothing_mode(elapsed, 0.2), SmoothingMode::Steady);
        assert_eq!(smoothing_mode(0.0, 0.0), SmoothingMode::Steady);
    }

    #[test]
    fn test_steady_smoothing_lags_then_converges() {
        let parameters = SmoothingParameters {
            position: AxisSmoothing::smoothed(8.0, 0.1),
            ..SmoothingParameters::default()
        };
        let mut pose = Pose::identity();
        let mut scale = Vec3::new(1.0, 1.0, 1.0);
        let raw = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));
        let raw_scale = scale;
        let mut elapsed = 1.0;

        smooth_target(&mut pose, &mut scale, &raw, &raw_scale, 0.02, 0.0, &mut elapsed, &parameters);
        // Rate blend 0.16, then tighten 0.1 of the rest
        assert_relative_eq!(pose.position.x, 0.16 + 0.84 * 0.1, epsilon = EPSILON);

        for _ in 0..200 {
            smooth_target(&mut pose, &mut scale, &raw, &raw_scale, 0.02, 0.0, &mut elapsed, &parameters);
        }
        assert_relative_eq!(pose.position.x, 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_ten_coarse_ticks_reach_target() {
        let parameters = SmoothingParameters {
            position: AxisSmoothing::smoothed(8.0, 0.1),
            ..SmoothingParameters::default()
        };
        let mut pose = Pose::identity();
        let mut scale = Vec3::new(1.0, 1.0, 1.0);
        let raw = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));
        let raw_scale = scale;
        let mut elapsed = 1.0;

        for _ in 0..10 {
            smooth_target(&mut pose, &mut scale, &raw, &raw_scale, 0.1, 0.0, &mut elapsed, &parameters);
        }
        assert_relative_eq!(pose.position, raw.position, epsilon = 0.01);
    }

    #[test]
    fn test_large_rate_saturates() {
        let parameters = SmoothingParameters::uniform(AxisSmoothing::smoothed(1000.0, 0.0));
        let mut pose = Pose::identity();
        let mut scale = Vec3::new(1.0, 1.0, 1.0);
        let raw = Pose::new(Vec3::new(0.0, 5.0, 0.0), Quat::from_euler_angles(0.0, 1.0, 0.0));
        let mut elapsed = 0.0;

        smooth_target(&mut pose, &mut scale, &raw, &Vec3::new(3.0, 3.0, 3.0), 0.1, 0.0, &mut elapsed, &parameters);
        assert_eq!(pose, raw);
        assert_eq!(scale, Vec3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_pass_through_detection() {
        let smoothed = SmoothingParameters::uniform(AxisSmoothing::smoothed(8.0, 0.1));
        assert!(is_pass_through(1.0, 0.5, &SmoothingParameters::default()));
        assert!(!is_pass_through(0.1, 0.5, &SmoothingParameters::default()));
        assert!(!is_pass_through(1.0, 0.5, &smoothed));
    }
}
