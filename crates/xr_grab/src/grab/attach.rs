//! Dynamic attach points
//!
//! With dynamic attach enabled, each selecting interactor gets its own
//! attach point computed at selection time so the object keeps its current
//! relative pose to the hand instead of snapping to the static attach point.
//!
//! Attach points live in an [`AttachPointArena`] and are referenced through
//! generation-checked [`AttachKey`]s. A key whose record was destroyed by
//! the host simply stops resolving.

use crate::core::config::AttachConfig;
use crate::foundation::collections::{new_key_type, SlotMap};
use crate::foundation::math::{Pose, Vec3};
use crate::grab::interactor::{InteractorDescriptor, InteractorId, InteractorKind};
use crate::physics::ClosestPointQuery;

new_key_type! {
    /// Handle to a dynamic attach record
    pub struct AttachKey;
}

/// One dynamic attach point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachRecord {
    /// Attach pose local to the body
    pub local_pose: Pose,
    /// Interactor the record was checked out for
    pub owner: InteractorId,
}

/// Storage for dynamic attach points.
///
/// Slots freed by [`AttachPointArena::check_in`] are reused by later
/// check-outs; stale keys to reused slots fail the generation check.
#[derive(Debug, Clone, Default)]
pub struct AttachPointArena {
    records: SlotMap<AttachKey, AttachRecord>,
}

impl AttachPointArena {
    /// Empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Arena with preallocated slots
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: SlotMap::with_capacity_and_key(capacity),
        }
    }

    /// Create a record for `owner`
    pub fn check_out(&mut self, owner: InteractorId, local_pose: Pose) -> AttachKey {
        self.records.insert(AttachRecord { local_pose, owner })
    }

    /// Return a record to the pool
    pub fn check_in(&mut self, key: AttachKey) -> Option<AttachRecord> {
        self.records.remove(key)
    }

    /// Host-side destruction of a record still referenced by a grab
    pub fn destroy(&mut self, key: AttachKey) -> bool {
        let destroyed = self.records.remove(key).is_some();
        if destroyed {
            log::debug!("Dynamic attach point {:?} destroyed", key);
        }
        destroyed
    }

    /// Resolve a key
    pub fn get(&self, key: AttachKey) -> Option<&AttachRecord> {
        self.records.get(key)
    }

    /// Resolve a key mutably
    pub fn get_mut(&mut self, key: AttachKey) -> Option<&mut AttachRecord> {
        self.records.get_mut(key)
    }

    /// Whether the key still resolves
    pub fn contains(&self, key: AttachKey) -> bool {
        self.records.contains_key(key)
    }

    /// Live record count
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are live
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Whether the dynamic attach point copies the interactor's position
pub fn should_match_attach_position(config: &AttachConfig, interactor: &InteractorDescriptor) -> bool {
    let enabled = interactor.match_position_override.unwrap_or(config.match_position);
    if !enabled {
        return false;
    }
    // Sockets and force grab pull the object to their own attach point
    !matches!(
        interactor.kind,
        InteractorKind::Socket | InteractorKind::Ray { force_grab: true }
    )
}

/// Whether the dynamic attach point copies the interactor's rotation
pub fn should_match_attach_rotation(config: &AttachConfig, interactor: &InteractorDescriptor) -> bool {
    interactor.match_rotation_override.unwrap_or(config.match_rotation)
}

/// Whether a matched position is clamped onto the collision volume
pub fn should_snap_to_collider_volume(config: &AttachConfig, interactor: &InteractorDescriptor) -> bool {
    interactor
        .snap_to_collider_override
        .unwrap_or(config.snap_to_collider_volume)
}

/// Compute the body-local attach pose for an interactor selecting now.
///
/// Starts from the static attach pose and replaces the matched channels
/// with the interactor's current attach pose expressed in body space.
pub fn solve_dynamic_attach(
    config: &AttachConfig,
    interactor: &InteractorDescriptor,
    interactor_attach: &Pose,
    body_pose: &Pose,
    body_scale: &Vec3,
    volume: Option<&dyn ClosestPointQuery>,
) -> Pose {
    let mut local = config.static_attach_pose;

    if should_match_attach_position(config, interactor) {
        let mut world_position = interactor_attach.position;
        if should_snap_to_collider_volume(config, interactor) {
            if let Some(snapped) = volume.and_then(|v| v.closest_point(body_pose, body_scale, world_position)) {
                world_position = snapped;
            }
        }
        local.position = body_pose.inverse_transform_point_scaled(world_position, body_scale);
    }

    if should_match_attach_rotation(config, interactor) {
        local.rotation = body_pose.rotation.inverse() * interactor_attach.rotation;
    }

    local
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use crate::physics::{ColliderShape, ColliderVolume};
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn unit_scale() -> Vec3 {
        Vec3::new(1.0, 1.0, 1.0)
    }

    #[test]
    fn test_stale_key_fails_after_slot_reuse() {
        let mut arena = AttachPointArena::with_capacity(4);
        let first = arena.check_out(InteractorId(1), Pose::identity());
        assert!(arena.destroy(first));
        let second = arena.check_out(InteractorId(2), Pose::identity());

        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second).unwrap().owner, InteractorId(2));
        assert!(!arena.destroy(first));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_match_position_and_rotation_keeps_relative_pose() {
        let config = AttachConfig {
            snap_to_collider_volume: false,
            ..AttachConfig::default()
        };
        let body = Pose::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_axis_angle(&Vec3::y_axis(), 0.5));
        let hand = Pose::new(Vec3::new(1.2, 0.3, 0.1), Quat::from_axis_angle(&Vec3::x_axis(), 0.3));

        let local = solve_dynamic_attach(&config, &InteractorDescriptor::direct(1), &hand, &body, &unit_scale(), None);
        let attach_world = body.multiply(&local);
        assert_relative_eq!(attach_world, hand, epsilon = EPSILON);
    }

    #[test]
    fn test_socket_keeps_static_position_but_may_match_rotation() {
        let config = AttachConfig {
            static_attach_pose: Pose::from_position(Vec3::new(0.0, 0.2, 0.0)),
            ..AttachConfig::default()
        };
        let hand = Pose::new(Vec3::new(5.0, 5.0, 5.0), Quat::from_axis_angle(&Vec3::z_axis(), 1.0));

        let local = solve_dynamic_attach(
            &config,
            &InteractorDescriptor::socket(3),
            &hand,
            &Pose::identity(),
            &unit_scale(),
            None,
        );
        assert_eq!(local.position, Vec3::new(0.0, 0.2, 0.0));
        assert_relative_eq!(local.rotation, hand.rotation, epsilon = EPSILON);
    }

    #[test]
    fn test_force_grab_ray_does_not_match_position() {
        let config = AttachConfig::default();
        let hand = Pose::from_position(Vec3::new(0.0, 0.0, 4.0));
        let local = solve_dynamic_attach(
            &config,
            &InteractorDescriptor::ray(4, true),
            &hand,
            &Pose::identity(),
            &unit_scale(),
            None,
        );
        assert_eq!(local.position, Vec3::zeros());
    }

    #[test]
    fn test_snap_to_collider_volume() {
        let config = AttachConfig::default();
        let volume = ColliderVolume::default().with_shape(ColliderShape::sphere(0.5));
        let hand = Pose::from_position(Vec3::new(2.0, 0.0, 0.0));

        let local = solve_dynamic_attach(
            &config,
            &InteractorDescriptor::direct(1),
            &hand,
            &Pose::identity(),
            &unit_scale(),
            Some(&volume),
        );
        assert_relative_eq!(local.position, Vec3::new(0.5, 0.0, 0.0), epsilon = EPSILON);

        let no_snap = InteractorDescriptor::direct(1).with_snap_to_collider(false);
        let local = solve_dynamic_attach(&config, &no_snap, &hand, &Pose::identity(), &unit_scale(), Some(&volume));
        assert_relative_eq!(local.position, Vec3::new(2.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_no_matching_returns_static_pose() {
        let config = AttachConfig {
            static_attach_pose: Pose::from_position(Vec3::new(0.1, 0.0, 0.0)),
            match_position: false,
            match_rotation: false,
            ..AttachConfig::default()
        };
        let hand = Pose::from_position(Vec3::new(3.0, 3.0, 3.0));
        let local = solve_dynamic_attach(
            &config,
            &InteractorDescriptor::direct(1),
            &hand,
            &Pose::identity(),
            &unit_scale(),
            None,
        );
        assert_eq!(local, config.static_attach_pose);
    }
}
