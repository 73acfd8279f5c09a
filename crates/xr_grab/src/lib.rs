//! # XR Grab
//!
//! Grab-transform composition and throw-velocity estimation for objects
//! picked up by XR interactors.
//!
//! ## Features
//!
//! - **Transformer Registry**: ordered single and multiple transformer lists
//!   with safe mutation while a cycle is running
//! - **Smoothing**: attach ease-in and per-axis steady-state blending
//! - **Movement Types**: instantaneous, kinematic and velocity tracking
//! - **Throw Estimation**: weighted motion history with optional aim assist
//! - **Dynamic Attach**: per-interactor attach points snapped to colliders
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use xr_grab::prelude::*;
//!
//! fn main() -> Result<(), GrabError> {
//!     let mut interactable = GrabInteractable::new(GrabConfig::default())?;
//!     let mut body = SimulatedBody::default();
//!     let mut poses = HashMap::new();
//!     poses.insert(InteractorId(1), Pose::identity());
//!
//!     let mut clock = FrameClock::default();
//!     {
//!         let mut host = GrabHost::new(&mut body, &poses);
//!         interactable.select_entering(InteractorDescriptor::direct(1), &mut host)?;
//!         for tick in clock.advance(1.0 / 90.0) {
//!             interactable.process(&tick, &mut host);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod foundation;
pub mod grab;
pub mod physics;

pub use error::{GrabError, GrabResult};

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        core::config::{AttachConfig, Config, GrabConfig, SmoothingParameters, ThrowConfig, TrackedAxes},
        error::{GrabError, GrabResult},
        events::{InteractionEvent, InteractionEventQueue, InteractionHandler},
        foundation::{
            math::{Pose, Quat, Vec3},
            time::{FrameClock, FrameTick, UpdatePhase},
        },
        grab::{
            DropTransformer,
            GrabHost,
            GrabInteractable,
            GrabTransformer,
            GrabView,
            InteractorDescriptor,
            InteractorId,
            MovementType,
            ReferenceFrameJump,
            TransformerCommands,
            TransformerList,
        },
        physics::{ColliderShape, ColliderVolume, RigidBody, SimulatedBody},
    };
}
