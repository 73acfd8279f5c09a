//! Grab transformer seam
//!
//! A grab transformer turns the poses of the interactors currently holding
//! an object into a raw target pose and scale for it. Transformers are
//! stored in a [`TransformerRegistry`](crate::grab::registry::TransformerRegistry)
//! and addressed by generation-checked [`TransformerKey`]s.
//!
//! Callbacks must not touch the registry directly. They receive a
//! [`TransformerCommands`] queue instead; the registry applies it as soon as
//! the callback returns.

use crate::foundation::collections::new_key_type;
use crate::foundation::math::{Pose, Quat, Vec3};
use crate::foundation::time::UpdatePhase;
use crate::grab::interactor::{GrabbingInteractor, InteractorDescriptor};

new_key_type! {
    /// Handle to a transformer stored in a registry
    pub struct TransformerKey;
}

/// Which registration list a transformer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformerList {
    /// Preferred while exactly one interactor grabs
    Single,
    /// Preferred while several interactors grab
    Multiple,
}

/// Read-only view of a grab handed to transformer callbacks
#[derive(Debug, Clone, Copy)]
pub struct GrabView<'a> {
    /// Selecting interactors in selection order, resolved for this tick
    pub interactors: &'a [GrabbingInteractor],
    /// Current body pose
    pub body_pose: Pose,
    /// Current body local scale
    pub body_scale: Vec3,
}

impl<'a> GrabView<'a> {
    /// Number of interactors grabbing
    pub fn grab_count(&self) -> usize {
        self.interactors.len()
    }

    /// First interactor that selected the object
    pub fn primary(&self) -> Option<&'a GrabbingInteractor> {
        self.interactors.first()
    }

    /// Second interactor that selected the object
    pub fn secondary(&self) -> Option<&'a GrabbingInteractor> {
        self.interactors.get(1)
    }
}

/// Details of a full release delivered to drop-capable transformers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropEventArgs {
    /// Interactor whose exit ended the grab
    pub interactor: InteractorDescriptor,
    /// Body pose at release
    pub body_pose: Pose,
}

/// Deferred registry edit requested from inside a callback
pub enum TransformerCommand {
    /// Store a new transformer and register it in a list
    Add(Box<dyn GrabTransformer>, TransformerList),
    /// Register an already stored transformer in a list
    Register(TransformerKey, TransformerList),
    /// Unregister a transformer from a list
    Remove(TransformerKey, TransformerList),
}

impl std::fmt::Debug for TransformerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add(_, list) => f.debug_tuple("Add").field(list).finish(),
            Self::Register(key, list) => f.debug_tuple("Register").field(key).field(list).finish(),
            Self::Remove(key, list) => f.debug_tuple("Remove").field(key).field(list).finish(),
        }
    }
}

/// Queue of registry edits collected during one callback
#[derive(Debug)]
pub struct TransformerCommands {
    this: TransformerKey,
    queue: Vec<TransformerCommand>,
}

impl TransformerCommands {
    pub(crate) fn new(this: TransformerKey) -> Self {
        Self { this, queue: Vec::new() }
    }

    /// Key of the transformer the callback runs on
    pub fn this(&self) -> TransformerKey {
        self.this
    }

    /// Add a new transformer. It is processed starting next cycle.
    pub fn add(&mut self, transformer: Box<dyn GrabTransformer>, list: TransformerList) {
        self.queue.push(TransformerCommand::Add(transformer, list));
    }

    /// Register a stored transformer. It is processed starting next cycle.
    pub fn register(&mut self, key: TransformerKey, list: TransformerList) {
        self.queue.push(TransformerCommand::Register(key, list));
    }

    /// Unregister a transformer. Later transformers of the current cycle skip it.
    pub fn remove(&mut self, key: TransformerKey, list: TransformerList) {
        self.queue.push(TransformerCommand::Remove(key, list));
    }

    /// Unregister the running transformer
    pub fn remove_self(&mut self, list: TransformerList) {
        self.remove(self.this, list);
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, TransformerCommand> {
        self.queue.drain(..)
    }

    /// Whether nothing was requested
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Computes a raw target pose from the grabbing interactors.
pub trait GrabTransformer {
    /// Whether `process` should run this cycle
    fn can_process(&self) -> bool {
        true
    }

    /// Registered in a list of an interactable
    fn on_link(&mut self) {}

    /// The object was grabbed, or this transformer joined an ongoing grab
    fn on_grab(&mut self, _grab: &GrabView<'_>) {}

    /// The number of grabbing interactors changed since the last cycle.
    ///
    /// `target_pose` and `local_scale` are the smoothed target before this
    /// cycle's processing.
    fn on_grab_count_changed(&mut self, _grab: &GrabView<'_>, _target_pose: &Pose, _local_scale: &Vec3) {}

    /// Overwrite `target_pose` and `local_scale` with this transformer's output
    fn process(
        &mut self,
        grab: &GrabView<'_>,
        phase: UpdatePhase,
        target_pose: &mut Pose,
        local_scale: &mut Vec3,
        commands: &mut TransformerCommands,
    );

    /// Unregistered from a list of an interactable
    fn on_unlink(&mut self) {}

    /// Drop capability, if this transformer keeps working after release
    fn as_drop_transformer(&mut self) -> Option<&mut dyn DropTransformer> {
        None
    }
}

/// Transformer that also processes while the object is not held
pub trait DropTransformer {
    /// Whether `process` should run while nothing grabs the object
    fn can_process_on_drop(&self) -> bool;

    /// The last interactor released the object
    fn on_drop(&mut self, args: &DropEventArgs);
}

/// Target pose that puts `attach_local` (scaled by `scale`) onto `interactor_attach`.
pub fn target_pose_for_attach(interactor_attach: &Pose, attach_local: &Pose, scale: &Vec3) -> Pose {
    let rotation = interactor_attach.rotation * attach_local.rotation.inverse();
    target_pose_with_rotation(interactor_attach, attach_local, scale, rotation)
}

/// Target pose with a given rotation that keeps `attach_local` on `interactor_attach`.
pub fn target_pose_with_rotation(
    interactor_attach: &Pose,
    attach_local: &Pose,
    scale: &Vec3,
    rotation: Quat,
) -> Pose {
    let offset = rotation * scale.component_mul(&attach_local.position);
    Pose::new(interactor_attach.position - offset, rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_target_pose_puts_attach_on_interactor() {
        let attach_local = Pose::new(
            Vec3::new(0.0, 0.1, -0.2),
            Quat::from_axis_angle(&Vec3::x_axis(), 0.4),
        );
        let hand = Pose::new(Vec3::new(1.0, 1.5, 0.0), Quat::from_axis_angle(&Vec3::y_axis(), 1.0));
        let scale = Vec3::new(2.0, 2.0, 2.0);

        let target = target_pose_for_attach(&hand, &attach_local, &scale);
        let attach_world = Pose::new(
            target.transform_point_scaled(attach_local.position, &scale),
            target.rotation * attach_local.rotation,
        );
        assert_relative_eq!(attach_world, hand, epsilon = 1e-5);
    }

    #[test]
    fn test_commands_queue() {
        let mut slots = slotmap::SlotMap::<TransformerKey, ()>::with_key();
        let key = slots.insert(());
        let mut commands = TransformerCommands::new(key);
        assert!(commands.is_empty());
        commands.remove_self(TransformerList::Single);
        let drained: Vec<_> = commands.drain().collect();
        assert!(matches!(drained[0], TransformerCommand::Remove(k, TransformerList::Single) if k == key));
    }
}
