//! Interactor descriptors
//!
//! An interactor is the agent (hand, controller ray, socket) that selects an
//! interactable. The grab pipeline only needs its identity, its kind and a
//! few per-interactor overrides; its world attach pose arrives every tick
//! through [`PoseSource`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::foundation::math::Pose;
use crate::grab::movement::MovementType;

/// Stable interactor identity assigned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InteractorId(pub u32);

/// What kind of agent is selecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractorKind {
    /// Hand or controller touching the object
    Direct,
    /// Ray caster, optionally pulling the object into the hand
    Ray {
        /// The ray snaps the object to its own attach point
        force_grab: bool,
    },
    /// Fixed-pose holder the object snaps into
    Socket,
}

/// Identity and per-interactor overrides of a selecting interactor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractorDescriptor {
    /// Interactor identity
    pub id: InteractorId,
    /// Interactor kind
    pub kind: InteractorKind,
    /// Forces a movement type while this interactor selects
    pub movement_type_override: Option<MovementType>,
    /// Overrides the interactable's dynamic attach position matching
    pub match_position_override: Option<bool>,
    /// Overrides the interactable's dynamic attach rotation matching
    pub match_rotation_override: Option<bool>,
    /// Overrides the interactable's collider snapping
    pub snap_to_collider_override: Option<bool>,
}

impl InteractorDescriptor {
    /// Descriptor with no overrides
    pub fn new(id: InteractorId, kind: InteractorKind) -> Self {
        Self {
            id,
            kind,
            movement_type_override: None,
            match_position_override: None,
            match_rotation_override: None,
            snap_to_collider_override: None,
        }
    }

    /// Direct (hand) interactor
    pub fn direct(id: u32) -> Self {
        Self::new(InteractorId(id), InteractorKind::Direct)
    }

    /// Ray interactor
    pub fn ray(id: u32, force_grab: bool) -> Self {
        Self::new(InteractorId(id), InteractorKind::Ray { force_grab })
    }

    /// Socket interactor
    pub fn socket(id: u32) -> Self {
        Self::new(InteractorId(id), InteractorKind::Socket)
    }

    /// Force a movement type while selecting
    pub fn with_movement_type_override(mut self, movement_type: MovementType) -> Self {
        self.movement_type_override = Some(movement_type);
        self
    }

    /// Override position matching
    pub fn with_match_position(mut self, enabled: bool) -> Self {
        self.match_position_override = Some(enabled);
        self
    }

    /// Override rotation matching
    pub fn with_match_rotation(mut self, enabled: bool) -> Self {
        self.match_rotation_override = Some(enabled);
        self
    }

    /// Override collider snapping
    pub fn with_snap_to_collider(mut self, enabled: bool) -> Self {
        self.snap_to_collider_override = Some(enabled);
        self
    }
}

/// Selecting interactor resolved for the current tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabbingInteractor {
    /// Interactor identity and overrides
    pub descriptor: InteractorDescriptor,
    /// Interactor attach pose in world space
    pub attach_pose: Pose,
    /// Interactable attach point for this interactor, local to the body
    pub attach_local: Pose,
}

impl GrabbingInteractor {
    /// Interactor identity
    pub fn id(&self) -> InteractorId {
        self.descriptor.id
    }
}

/// World attach poses of interactors, supplied by the host every tick
pub trait PoseSource {
    /// Current world pose of the interactor's attach point
    fn interactor_attach_pose(&self, interactor: InteractorId) -> Option<Pose>;
}

impl PoseSource for HashMap<InteractorId, Pose> {
    fn interactor_attach_pose(&self, interactor: InteractorId) -> Option<Pose> {
        self.get(&interactor).copied()
    }
}

impl<F> PoseSource for F
where
    F: Fn(InteractorId) -> Option<Pose>,
{
    fn interactor_attach_pose(&self, interactor: InteractorId) -> Option<Pose> {
        self(interactor)
    }
}
