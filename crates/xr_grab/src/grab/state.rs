//! Per-grab state

use std::collections::HashMap;

use crate::foundation::math::{Pose, Vec3};
use crate::grab::attach::AttachKey;
use crate::grab::interactor::InteractorId;
use crate::grab::movement::MovementType;

/// State that exists from the first selection until the last release
#[derive(Debug, Clone, PartialEq)]
pub struct GrabState {
    /// Smoothed target pose the movement stage drives the body toward
    pub target_pose: Pose,
    /// Smoothed target local scale
    pub target_scale: Vec3,
    /// Seconds of attach ease-in elapsed
    pub ease_elapsed: f32,
    /// Movement type in effect
    pub movement_type: MovementType,
    /// Dynamic attach record of each selecting interactor
    pub dynamic_attach: HashMap<InteractorId, AttachKey>,
}

impl GrabState {
    /// Start a grab at the body's current pose
    pub fn new(body_pose: Pose, body_scale: Vec3, movement_type: MovementType) -> Self {
        Self {
            target_pose: body_pose,
            target_scale: body_scale,
            ease_elapsed: 0.0,
            movement_type,
            dynamic_attach: HashMap::new(),
        }
    }
}
