//! Multi-interactor grabs, custom transformers, late joiners and drop processing

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::Rig;
use crate::core::config::GrabConfig;
use crate::foundation::math::{Pose, Vec3};
use crate::foundation::time::UpdatePhase;
use crate::grab::free_transformers::{DualGrabFreeTransformer, SingleGrabFreeTransformer, TwoHandRotationMode};
use crate::grab::interactable::GrabInteractable;
use crate::grab::interactor::InteractorDescriptor;
use crate::grab::transformer::{
    DropEventArgs,
    DropTransformer,
    GrabTransformer,
    GrabView,
    TransformerCommands,
    TransformerList,
};
use crate::physics::{RigidBody, SimulatedBody};

/// Writes a fixed position
struct Pin {
    position: Vec3,
    enabled: bool,
}

impl GrabTransformer for Pin {
    fn can_process(&self) -> bool {
        self.enabled
    }

    fn process(
        &mut self,
        _grab: &GrabView<'_>,
        _phase: UpdatePhase,
        target_pose: &mut Pose,
        _local_scale: &mut Vec3,
        _commands: &mut TransformerCommands,
    ) {
        target_pose.position = self.position;
    }
}

/// Counts the notifications it receives
#[derive(Default)]
struct Counter {
    grabs: Rc<Cell<u32>>,
    count_changes: Rc<Cell<u32>>,
}

impl GrabTransformer for Counter {
    fn on_grab(&mut self, _grab: &GrabView<'_>) {
        self.grabs.set(self.grabs.get() + 1);
    }

    fn on_grab_count_changed(&mut self, _grab: &GrabView<'_>, _target_pose: &Pose, _local_scale: &Vec3) {
        self.count_changes.set(self.count_changes.get() + 1);
    }

    fn process(
        &mut self,
        _grab: &GrabView<'_>,
        _phase: UpdatePhase,
        _target_pose: &mut Pose,
        _local_scale: &mut Vec3,
        _commands: &mut TransformerCommands,
    ) {
    }
}

/// Follows the first hand while held and keeps drifting after release
struct Drift {
    velocity: Vec3,
    dropped: Rc<Cell<bool>>,
}

impl GrabTransformer for Drift {
    fn process(
        &mut self,
        grab: &GrabView<'_>,
        phase: UpdatePhase,
        target_pose: &mut Pose,
        _local_scale: &mut Vec3,
        _commands: &mut TransformerCommands,
    ) {
        match grab.primary() {
            Some(hand) => *target_pose = hand.attach_pose,
            None if phase == UpdatePhase::Dynamic => target_pose.position += self.velocity,
            None => {}
        }
    }

    fn as_drop_transformer(&mut self) -> Option<&mut dyn DropTransformer> {
        Some(self)
    }
}

impl DropTransformer for Drift {
    fn can_process_on_drop(&self) -> bool {
        true
    }

    fn on_drop(&mut self, _args: &DropEventArgs) {
        self.dropped.set(true);
    }
}

type Journal = Rc<RefCell<Vec<String>>>;

/// Writes down every callback with the phase and grab count it saw
struct Recorder {
    journal: Journal,
}

impl GrabTransformer for Recorder {
    fn on_grab(&mut self, _grab: &GrabView<'_>) {
        self.journal.borrow_mut().push("grab".to_string());
    }

    fn on_grab_count_changed(&mut self, grab: &GrabView<'_>, _target_pose: &Pose, _local_scale: &Vec3) {
        self.journal.borrow_mut().push(format!("count:{}", grab.grab_count()));
    }

    fn process(
        &mut self,
        grab: &GrabView<'_>,
        phase: UpdatePhase,
        _target_pose: &mut Pose,
        _local_scale: &mut Vec3,
        _commands: &mut TransformerCommands,
    ) {
        self.journal
            .borrow_mut()
            .push(format!("process:{:?}:{}", phase, grab.grab_count()));
    }
}

/// Registers a [`Recorder`] the first time it processes
struct Spawner {
    journal: Journal,
    spawned: bool,
}

impl GrabTransformer for Spawner {
    fn process(
        &mut self,
        _grab: &GrabView<'_>,
        _phase: UpdatePhase,
        _target_pose: &mut Pose,
        _local_scale: &mut Vec3,
        commands: &mut TransformerCommands,
    ) {
        if !self.spawned {
            self.spawned = true;
            let recorder = Recorder {
                journal: Rc::clone(&self.journal),
            };
            commands.add(Box::new(recorder), TransformerList::Single);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    fn bare_config() -> GrabConfig {
        GrabConfig {
            add_default_grab_transformers: false,
            ..GrabConfig::default().with_attach_ease_in_time(0.0)
        }
    }

    fn pin(x: f32, y: f32, z: f32) -> Box<Pin> {
        Box::new(Pin {
            position: Vec3::new(x, y, z),
            enabled: true,
        })
    }

    #[test]
    fn test_multiple_list_preempts_single_with_two_hands() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(bare_config()).unwrap();
        interactable.insert_grab_transformer(pin(1.0, 0.0, 0.0), TransformerList::Single);
        interactable.insert_grab_transformer(pin(0.0, 2.0, 0.0), TransformerList::Multiple);
        rig.set_hand(1, Pose::identity());
        rig.set_hand(2, Pose::identity());

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.frame(&mut interactable);
        assert_relative_eq!(rig.body.pose().position, Vec3::new(1.0, 0.0, 0.0), epsilon = EPSILON);

        rig.select(&mut interactable, InteractorDescriptor::direct(2)).unwrap();
        rig.frame(&mut interactable);
        assert_relative_eq!(rig.body.pose().position, Vec3::new(0.0, 2.0, 0.0), epsilon = EPSILON);

        rig.release(&mut interactable, 2).unwrap();
        rig.frame(&mut interactable);
        assert_relative_eq!(rig.body.pose().position, Vec3::new(1.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_multiple_list_covers_idle_single_list() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(bare_config()).unwrap();
        interactable.insert_grab_transformer(
            Box::new(Pin {
                position: Vec3::new(1.0, 0.0, 0.0),
                enabled: false,
            }),
            TransformerList::Single,
        );
        interactable.insert_grab_transformer(pin(0.0, 0.0, 3.0), TransformerList::Multiple);
        rig.set_hand(1, Pose::identity());

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.frame(&mut interactable);
        assert_relative_eq!(rig.body.pose().position, Vec3::new(0.0, 0.0, 3.0), epsilon = EPSILON);
    }

    #[test]
    fn test_reordering_changes_which_output_wins() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(bare_config()).unwrap();
        let first = interactable.insert_grab_transformer(pin(1.0, 0.0, 0.0), TransformerList::Single);
        interactable.insert_grab_transformer(pin(2.0, 0.0, 0.0), TransformerList::Single);
        rig.set_hand(1, Pose::identity());

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.frame(&mut interactable);
        assert_relative_eq!(rig.body.pose().position.x, 2.0, epsilon = EPSILON);

        interactable
            .move_grab_transformer_to(first, 1, TransformerList::Single)
            .unwrap();
        rig.frame(&mut interactable);
        assert_relative_eq!(rig.body.pose().position.x, 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_two_hand_directed_rotation() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(bare_config()).unwrap();
        interactable.insert_grab_transformer(Box::new(SingleGrabFreeTransformer::new()), TransformerList::Single);
        interactable.insert_grab_transformer(
            Box::new(DualGrabFreeTransformer::new(
                TwoHandRotationMode::FirstHandDirectedTowardsSecondHand,
            )),
            TransformerList::Multiple,
        );
        rig.set_hand(1, Pose::identity());
        rig.set_hand(2, Pose::from_position(Vec3::new(0.0, 0.0, 1.0)));

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.select(&mut interactable, InteractorDescriptor::direct(2)).unwrap();
        rig.frame(&mut interactable);
        assert_relative_eq!(rig.body.pose().rotation * Vec3::z(), Vec3::z(), epsilon = EPSILON);

        rig.set_hand(2, Pose::from_position(Vec3::new(1.0, 0.0, 0.0)));
        rig.frame(&mut interactable);
        let rotation = rig.body.pose().rotation;
        assert_relative_eq!(rotation * Vec3::z(), Vec3::x(), epsilon = EPSILON);
        assert_relative_eq!(rotation * Vec3::y(), Vec3::y(), epsilon = EPSILON);
        assert_relative_eq!(rig.body.pose().position, Vec3::zeros(), epsilon = EPSILON);
    }

    #[test]
    fn test_late_joiner_receives_grab_and_count_change() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(GrabConfig::default()).unwrap();
        rig.set_hand(1, Pose::identity());

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.frame(&mut interactable);

        let counter = Counter::default();
        let grabs = Rc::clone(&counter.grabs);
        let count_changes = Rc::clone(&counter.count_changes);
        interactable.insert_grab_transformer(Box::new(counter), TransformerList::Single);
        assert_eq!(grabs.get(), 0);

        rig.frame(&mut interactable);
        assert_eq!(grabs.get(), 1);
        assert_eq!(count_changes.get(), 1);

        rig.frame(&mut interactable);
        assert_eq!(grabs.get(), 1);
        assert_eq!(count_changes.get(), 1);
    }

    #[test]
    fn test_transformer_added_mid_frame_is_notified_before_render_pass() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(bare_config()).unwrap();
        let journal = Journal::default();
        interactable.insert_grab_transformer(
            Box::new(Spawner {
                journal: Rc::clone(&journal),
                spawned: false,
            }),
            TransformerList::Single,
        );
        rig.set_hand(1, Pose::identity());

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.frame(&mut interactable);

        assert_eq!(
            *journal.borrow(),
            vec!["grab", "count:1", "process:OnBeforeRender:1"]
        );
    }

    #[test]
    fn test_selection_after_dynamic_notifies_count_before_render_pass() {
        let mut rig = Rig::new(SimulatedBody::default());
        let mut interactable = GrabInteractable::new(bare_config()).unwrap();
        let journal = Journal::default();
        interactable.insert_grab_transformer(
            Box::new(Recorder {
                journal: Rc::clone(&journal),
            }),
            TransformerList::Multiple,
        );
        rig.set_hand(1, Pose::identity());
        rig.set_hand(2, Pose::from_position(Vec3::new(0.0, 0.0, 1.0)));

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.frame(&mut interactable);
        journal.borrow_mut().clear();

        rig.frame_with(&mut interactable, UpdatePhase::Late, |rig, interactable| {
            rig.select(interactable, InteractorDescriptor::direct(2)).unwrap();
        });

        assert_eq!(
            *journal.borrow(),
            vec!["process:Dynamic:1", "count:2", "process:OnBeforeRender:2"]
        );
    }

    #[test]
    fn test_drop_transformer_keeps_processing_after_release() {
        let mut body = SimulatedBody::default();
        body.set_use_gravity(false);
        let mut rig = Rig::new(body);
        let mut interactable = GrabInteractable::new(bare_config()).unwrap();
        let dropped = Rc::new(Cell::new(false));
        interactable.insert_grab_transformer(
            Box::new(Drift {
                velocity: Vec3::new(0.0, 0.1, 0.0),
                dropped: Rc::clone(&dropped),
            }),
            TransformerList::Single,
        );
        let hand = Pose::from_position(Vec3::new(0.0, 1.0, 0.0));
        rig.set_hand(1, hand);

        rig.select(&mut interactable, InteractorDescriptor::direct(1)).unwrap();
        rig.frame(&mut interactable);
        assert_relative_eq!(rig.body.pose(), hand, epsilon = EPSILON);

        rig.release(&mut interactable, 1).unwrap();
        assert!(dropped.get());

        rig.frame(&mut interactable);
        assert_relative_eq!(rig.body.pose().position, Vec3::new(0.0, 1.1, 0.0), epsilon = EPSILON);
        rig.frame(&mut interactable);
        assert_relative_eq!(rig.body.pose().position, Vec3::new(0.0, 1.2, 0.0), epsilon = EPSILON);
    }
}
