//! Built-in transformers that follow the grabbing hands freely

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Pose, Quat, Vec3};
use crate::foundation::time::UpdatePhase;
use crate::grab::interactor::GrabbingInteractor;
use crate::grab::transformer::{
    target_pose_for_attach,
    target_pose_with_rotation,
    GrabTransformer,
    GrabView,
    TransformerCommands,
};

/// Follows the first grabbing interactor with the object's attach point.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleGrabFreeTransformer;

impl SingleGrabFreeTransformer {
    /// Create the transformer
    pub fn new() -> Self {
        Self
    }
}

impl GrabTransformer for SingleGrabFreeTransformer {
    fn process(
        &mut self,
        grab: &GrabView<'_>,
        _phase: UpdatePhase,
        target_pose: &mut Pose,
        local_scale: &mut Vec3,
        _commands: &mut TransformerCommands,
    ) {
        if let Some(interactor) = grab.primary() {
            *target_pose = target_pose_for_attach(&interactor.attach_pose, &interactor.attach_local, local_scale);
        }
    }
}

/// Rotation source of a two-handed grab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TwoHandRotationMode {
    /// Rotation follows the first hand
    #[default]
    FirstHand,
    /// Rotation follows the second hand
    SecondHand,
    /// Forward points from the first hand toward the second, up follows the first hand
    FirstHandDirectedTowardsSecondHand,
}

/// Position from the first interactor, rotation chosen by [`TwoHandRotationMode`].
///
/// With a single interactor it behaves like [`SingleGrabFreeTransformer`].
#[derive(Debug, Clone, Copy)]
pub struct DualGrabFreeTransformer {
    /// How the two hands combine into a rotation
    pub rotation_mode: TwoHandRotationMode,
    directed_offset: Quat,
}

impl Default for DualGrabFreeTransformer {
    fn default() -> Self {
        Self::new(TwoHandRotationMode::default())
    }
}

impl DualGrabFreeTransformer {
    /// Create the transformer
    pub fn new(rotation_mode: TwoHandRotationMode) -> Self {
        Self {
            rotation_mode,
            directed_offset: Quat::identity(),
        }
    }

    fn directed_rotation(first: &GrabbingInteractor, second: &GrabbingInteractor) -> Option<Quat> {
        let direction = second.attach_pose.position - first.attach_pose.position;
        if direction.norm_squared() < 1.0e-8 {
            return None;
        }
        let mut up = first.attach_pose.rotation * Vec3::y();
        if direction.normalize().cross(&up).norm_squared() < 1.0e-8 {
            up = first.attach_pose.rotation * Vec3::z();
        }
        Some(Quat::face_towards(&direction, &up))
    }
}

impl GrabTransformer for DualGrabFreeTransformer {
    fn on_grab_count_changed(&mut self, grab: &GrabView<'_>, target_pose: &Pose, _local_scale: &Vec3) {
        // Keep the object where it is when the second hand joins
        self.directed_offset = match (grab.primary(), grab.secondary()) {
            (Some(first), Some(second)) => Self::directed_rotation(first, second)
                .map(|look| look.inverse() * target_pose.rotation)
                .unwrap_or_else(Quat::identity),
            _ => Quat::identity(),
        };
    }

    fn process(
        &mut self,
        grab: &GrabView<'_>,
        _phase: UpdatePhase,
        target_pose: &mut Pose,
        local_scale: &mut Vec3,
        _commands: &mut TransformerCommands,
    ) {
        let Some(first) = grab.primary() else {
            return;
        };
        let Some(second) = grab.secondary() else {
            *target_pose = target_pose_for_attach(&first.attach_pose, &first.attach_local, local_scale);
            return;
        };

        let first_hand_rotation = first.attach_pose.rotation * first.attach_local.rotation.inverse();
        let rotation = match self.rotation_mode {
            TwoHandRotationMode::FirstHand => first_hand_rotation,
            TwoHandRotationMode::SecondHand => second.attach_pose.rotation * second.attach_local.rotation.inverse(),
            TwoHandRotationMode::FirstHandDirectedTowardsSecondHand => Self::directed_rotation(first, second)
                .map(|look| look * self.directed_offset)
                .unwrap_or(first_hand_rotation),
        };

        *target_pose = target_pose_with_rotation(&first.attach_pose, &first.attach_local, local_scale, rotation);
    }
}
