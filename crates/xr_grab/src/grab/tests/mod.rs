//! Scenario tests that drive a whole interactable through scheduled frames
//!
//! Each scenario owns a [`Rig`]: a simulated body, the interactor poses the
//! host would report, and a frame clock. Fixed ticks are followed by a
//! physics step, the way an engine runs its fixed update before simulating.

use std::collections::HashMap;

use crate::error::GrabResult;
use crate::foundation::math::Pose;
use crate::foundation::time::{FrameClock, UpdatePhase};
use crate::grab::interactable::{GrabHost, GrabInteractable};
use crate::grab::interactor::{InteractorDescriptor, InteractorId};
use crate::physics::{ColliderVolume, SimulatedBody};

mod lifecycle;
mod multi_grab;

/// Frame and physics step length used by every scenario
const FRAME: f32 = 0.02;

struct Rig {
    body: SimulatedBody,
    poses: HashMap<InteractorId, Pose>,
    volume: Option<ColliderVolume>,
    clock: FrameClock,
}

impl Rig {
    fn new(body: SimulatedBody) -> Self {
        Self {
            body,
            poses: HashMap::new(),
            volume: None,
            clock: FrameClock::new(FRAME),
        }
    }

    fn with_volume(mut self, volume: ColliderVolume) -> Self {
        self.volume = Some(volume);
        self
    }

    fn set_hand(&mut self, id: u32, pose: Pose) {
        self.poses.insert(InteractorId(id), pose);
    }

    fn host(&mut self) -> GrabHost<'_> {
        let host = GrabHost::new(&mut self.body, &self.poses);
        match &self.volume {
            Some(volume) => host.with_colliders(volume),
            None => host,
        }
    }

    fn select(&mut self, interactable: &mut GrabInteractable, interactor: InteractorDescriptor) -> GrabResult<()> {
        let mut host = self.host();
        interactable.select_entering(interactor, &mut host)
    }

    fn release(&mut self, interactable: &mut GrabInteractable, id: u32) -> GrabResult<()> {
        let mut host = self.host();
        interactable.select_exiting(InteractorId(id), &mut host)
    }

    fn frame(&mut self, interactable: &mut GrabInteractable) {
        for tick in self.clock.advance(FRAME) {
            let mut host = self.host();
            interactable.process(&tick, &mut host);
            if tick.phase == UpdatePhase::Fixed {
                self.body.step(tick.delta_time);
            }
        }
    }

    /// Run one frame, calling `action` right after the `after` phase
    fn frame_with(
        &mut self,
        interactable: &mut GrabInteractable,
        after: UpdatePhase,
        mut action: impl FnMut(&mut Self, &mut GrabInteractable),
    ) {
        for tick in self.clock.advance(FRAME) {
            let mut host = self.host();
            interactable.process(&tick, &mut host);
            if tick.phase == UpdatePhase::Fixed {
                self.body.step(tick.delta_time);
            }
            if tick.phase == after {
                action(self, interactable);
            }
        }
    }

    fn frames(&mut self, interactable: &mut GrabInteractable, count: usize) {
        for _ in 0..count {
            self.frame(interactable);
        }
    }
}
