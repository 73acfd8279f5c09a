//! Selection lifecycle: following, ease-in, default transformers, errors

use super::Rig;
use crate::core::config::GrabConfig;
use crate::error::GrabError;
use crate::foundation::math::{Pose, Quat, Vec3};
use crate::grab::interactable::GrabInteractable;
use crate::grab::interactor::{InteractorDescriptor, InteractorId};
use crate::grab::movement::MovementType;
use crate::grab::transformer::TransformerList;
use crate::physics::{Interpolation, RigidBody, SimulatedBody};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn snappy() -> GrabConfig {
        GrabConfig::default().with_attach_ease_in_time(0.0)
    }

    #[test]
    fn test_instantaneous_grab_follows_hand() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(snappy()).unwrap();
        let hand = Pose::new(Vec3::new(0.0, 1.0, 0.0), Quat::from_axis_angle(&Vec3::y_axis(), 0.4));
        rig.set_hand(1, hand);

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        assert!(interactable.is_selected());
        assert!(rig.body.is_kinematic());
        assert!(!rig.body.use_gravity());
        assert_eq!(rig.body.interpolation(), Interpolation::None);

        rig.frame(&mut interactable);
        assert_relative_eq!(rig.body.pose(), hand, epsilon = EPSILON);

        let moved = Pose::from_position(Vec3::new(0.5, 1.5, -0.5));
        rig.set_hand(1, moved);
        rig.frame(&mut interactable);
        assert_relative_eq!(rig.body.pose(), moved, epsilon = EPSILON);
    }

    #[test]
    fn test_release_restores_body_flags() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(snappy()).unwrap();
        rig.set_hand(1, Pose::identity());

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.frame(&mut interactable);
        rig.release(&mut interactable, 1).unwrap();

        assert!(!interactable.is_selected());
        assert!(interactable.state().is_none());
        assert!(!rig.body.is_kinematic());
        assert!(rig.body.use_gravity());
        assert_eq!(rig.body.interpolation(), Interpolation::Interpolate);
        assert_relative_eq!(rig.body.angular_damping(), 0.05);
    }

    #[test]
    fn test_force_gravity_on_detach() {
        let mut body = SimulatedBody::default();
        body.set_use_gravity(false);
        let mut rig = Rig::new(body);
        let mut interactable = GrabInteractable::new(snappy().with_force_gravity_on_detach(true)).unwrap();
        rig.set_hand(1, Pose::identity());

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.release(&mut interactable, 1).unwrap();
        assert!(rig.body.use_gravity());
    }

    #[test]
    fn test_ease_in_blends_toward_hand() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(GrabConfig::default().with_attach_ease_in_time(0.15)).unwrap();
        let hand = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));
        rig.set_hand(1, hand);

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.frame(&mut interactable);
        // First ease-in tick blends with t = 0
        assert_relative_eq!(rig.body.pose().position, Vec3::zeros(), epsilon = EPSILON);

        rig.frames(&mut interactable, 3);
        let x = rig.body.pose().position.x;
        assert!(x > 0.0 && x < 1.0, "expected a partial blend, got {x}");

        rig.frames(&mut interactable, 6);
        assert_relative_eq!(rig.body.pose(), hand, epsilon = EPSILON);
    }

    #[test]
    fn test_default_transformers_added_on_first_grab() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(snappy()).unwrap();
        rig.set_hand(1, Pose::identity());

        assert_eq!(interactable.registry().count(TransformerList::Single), 0);
        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        assert_eq!(interactable.registry().count(TransformerList::Single), 1);
        assert_eq!(interactable.registry().count(TransformerList::Multiple), 1);

        // A second grab does not add more
        rig.release(&mut interactable, 1).unwrap();
        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        assert_eq!(interactable.registry().count(TransformerList::Single), 1);
    }

    #[test]
    fn test_without_transformers_body_stays_put() {
        let config = GrabConfig {
            add_default_grab_transformers: false,
            ..snappy()
        };
        let mut rig = Rig::new(SimulatedBody::new(Pose::from_position(Vec3::new(0.0, 0.0, 2.0))));
        let mut interactable = GrabInteractable::new(config).unwrap();
        rig.set_hand(1, Pose::identity());

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.frames(&mut interactable, 3);
        assert_eq!(interactable.registry().count(TransformerList::Single), 0);
        assert_relative_eq!(rig.body.pose().position, Vec3::new(0.0, 0.0, 2.0), epsilon = EPSILON);
    }

    #[test]
    fn test_selection_errors() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(snappy()).unwrap();
        rig.set_hand(1, Pose::identity());

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        let duplicate = rig.select(&mut interactable, InteractorDescriptor::direct(1));
        assert!(matches!(duplicate, Err(GrabError::AlreadySelecting(InteractorId(1)))));
        assert_eq!(interactable.selecting().len(), 1);

        let unknown = rig.release(&mut interactable, 7);
        assert!(matches!(unknown, Err(GrabError::UnknownInteractor(InteractorId(7)))));
        assert!(interactable.is_selected());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = GrabInteractable::new(GrabConfig::default().with_attach_ease_in_time(-1.0));
        assert!(matches!(result, Err(GrabError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_pose_keeps_last_target() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(snappy()).unwrap();
        let hand = Pose::from_position(Vec3::new(0.0, 0.5, 0.0));
        rig.set_hand(1, hand);

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.frame(&mut interactable);
        rig.poses.clear();
        rig.frame(&mut interactable);

        assert!(interactable.is_selected());
        assert_relative_eq!(rig.body.pose(), hand, epsilon = EPSILON);
    }

    #[test]
    fn test_set_movement_type_applies_next_dynamic_tick() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(snappy()).unwrap();
        rig.set_hand(1, Pose::identity());

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        interactable.set_movement_type(MovementType::VelocityTracking);
        assert_eq!(interactable.movement_type(), MovementType::Instantaneous);

        rig.frame(&mut interactable);
        assert_eq!(interactable.movement_type(), MovementType::VelocityTracking);
        assert!(!rig.body.is_kinematic());
    }
}
