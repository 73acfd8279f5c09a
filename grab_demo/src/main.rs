//! Grab demo application
//!
//! Drives one grab interactable through a scripted session without a
//! headset: a hand hovers a ball, picks it up, a second hand joins, the
//! player teleports, swings and lets go. Body state is logged every few
//! frames so the throw can be followed in the output.
//!
//! Usage: `grab_demo [config.toml|config.ron]`

use std::collections::HashMap;
use std::f32::consts::TAU;

use xr_grab::core::config::{Config, ConfigError, GrabConfig};
use xr_grab::events::{InteractionEvent, InteractionEventQueue};
use xr_grab::foundation::logging;
use xr_grab::foundation::math::{Pose, Quat, Vec3};
use xr_grab::foundation::time::{FrameClock, UpdatePhase};
use xr_grab::grab::{GrabHost, GrabInteractable, InteractorDescriptor, InteractorId, ReferenceFrameJump};
use xr_grab::physics::{ColliderShape, ColliderVolume, RigidBody, SimulatedBody};
use xr_grab::GrabError;

const FRAME_TIME: f32 = 1.0 / 90.0;
const PHYSICS_STEP: f32 = 1.0 / 50.0;
const LEFT_HAND: u32 = 1;
const RIGHT_HAND: u32 = 2;

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Grab error: {0}")]
    Grab(#[from] GrabError),
}

/// Scripted player and the ball it plays with
struct GrabDemo {
    interactable: GrabInteractable,
    ball: SimulatedBody,
    volume: ColliderVolume,
    hands: HashMap<InteractorId, Pose>,
    events: InteractionEventQueue,
    clock: FrameClock,
    rig: Pose,
}

impl GrabDemo {
    fn new(config: GrabConfig) -> Result<Self, DemoError> {
        log::info!("Creating grab demo with movement type {:?}", config.movement_type);
        let mut hands = HashMap::new();
        hands.insert(InteractorId(LEFT_HAND), Pose::from_position(Vec3::new(-0.3, 1.0, 0.3)));
        hands.insert(InteractorId(RIGHT_HAND), Pose::from_position(Vec3::new(0.3, 1.0, 0.3)));

        Ok(Self {
            interactable: GrabInteractable::new(config)?,
            ball: SimulatedBody::new(Pose::from_position(Vec3::new(0.0, 1.0, 0.5))),
            volume: ColliderVolume::default().with_shape(ColliderShape::sphere(0.12)),
            hands,
            events: InteractionEventQueue::new(),
            clock: FrameClock::new(PHYSICS_STEP),
            rig: Pose::identity(),
        })
    }

    fn hand_mut(&mut self, hand: u32) -> Option<&mut Pose> {
        self.hands.get_mut(&InteractorId(hand))
    }

    /// Queue an event and deliver everything pending
    fn send(&mut self, event: InteractionEvent) {
        self.events.send(event);
        let mut host = GrabHost::new(&mut self.ball, &self.hands).with_colliders(&self.volume);
        self.events.dispatch(&mut self.interactable, &mut host);
    }

    fn frame(&mut self) {
        for tick in self.clock.advance(FRAME_TIME) {
            let mut host = GrabHost::new(&mut self.ball, &self.hands).with_colliders(&self.volume);
            self.interactable.process(&tick, &mut host);
            if tick.phase == UpdatePhase::Fixed {
                self.ball.step(tick.delta_time);
            }
        }
        self.events.update_time(self.clock.time());

        if self.clock.frame_count() % 15 == 0 {
            let pose = self.ball.pose();
            log::info!(
                "t={:.2}s ball at ({:.2}, {:.2}, {:.2}) velocity {:.2} m/s{}",
                self.clock.time(),
                pose.position.x,
                pose.position.y,
                pose.position.z,
                self.ball.linear_velocity().norm(),
                if self.interactable.is_selected() { " [held]" } else { "" }
            );
        }
    }

    fn frames(&mut self, count: usize, mut script: impl FnMut(&mut Self, f32)) {
        for index in 0..count {
            script(self, index as f32 / count as f32);
            self.frame();
        }
    }

    /// Move the whole tracking space, carrying the hands with it
    fn teleport(&mut self, to: Pose) {
        let jump = ReferenceFrameJump::between(self.rig, to);
        for hand in self.hands.values_mut() {
            *hand = jump.delta.multiply(hand);
        }
        let carried = jump.delta.multiply(&self.ball.pose());
        self.ball.set_pose(carried);
        self.interactable.on_reference_frame_jump(&jump);
        self.rig = to;
        log::info!("Teleported to ({:.1}, {:.1}, {:.1})", to.position.x, to.position.y, to.position.z);
    }

    fn run(&mut self) {
        let left = InteractorDescriptor::direct(LEFT_HAND);
        let right = InteractorDescriptor::direct(RIGHT_HAND);

        log::info!("Reaching for the ball");
        self.frames(30, |demo, t| {
            if let Some(hand) = demo.hand_mut(LEFT_HAND) {
                hand.position = Vec3::new(-0.3 + 0.3 * t, 1.0, 0.3 + 0.15 * t);
            }
        });
        self.send(InteractionEvent::HoverEntering(left));
        self.send(InteractionEvent::SelectEntering(left));

        log::info!("Lifting");
        self.frames(45, |demo, t| {
            if let Some(hand) = demo.hand_mut(LEFT_HAND) {
                hand.position.y = 1.0 + 0.4 * t;
            }
        });

        log::info!("Second hand joins");
        self.send(InteractionEvent::SelectEntering(right));
        self.frames(30, |demo, t| {
            if let Some(hand) = demo.hand_mut(RIGHT_HAND) {
                hand.position.y = 1.0 + 0.4 * t;
            }
        });
        self.send(InteractionEvent::SelectExiting(right));

        self.teleport(Pose::new(Vec3::new(2.0, 0.0, 0.0), Quat::from_axis_angle(&Vec3::y_axis(), 0.5)));

        log::info!("Winding up and throwing");
        let shoulder = self.rig.transform_point(Vec3::new(0.0, 1.4, 0.0));
        let facing = self.rig.rotation;
        self.frames(20, |demo, t| {
            let angle = -0.25 * TAU + 0.3 * TAU * t;
            let offset = facing * Vec3::new(0.0, angle.sin() * 0.6, angle.cos() * 0.6);
            if let Some(hand) = demo.hand_mut(LEFT_HAND) {
                hand.position = shoulder + offset;
            }
        });
        self.send(InteractionEvent::SelectExiting(left));
        self.send(InteractionEvent::HoverExiting(left));
        let release = self.interactable.detach_velocity();
        log::info!(
            "Released with {:.2} m/s linear, {:.2} rad/s angular",
            release.linear.norm(),
            release.angular.norm()
        );

        log::info!("Ball in flight");
        self.frames(90, |_, _| {});
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_level("info");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading grab config from {}", path);
            GrabConfig::load_from_file(&path).map_err(DemoError::from)?
        }
        None => GrabConfig::default(),
    };

    let mut demo = GrabDemo::new(config)?;
    demo.run();
    log::info!("Grab demo finished");
    Ok(())
}
