//! Grab pipeline
//!
//! Interactor poses flow through the transformer registry into a raw target,
//! get smoothed, and are committed to the body by the movement stage. The
//! throw estimator watches the raw targets so a release can hand the body a
//! plausible velocity.

pub mod attach;
pub mod free_transformers;
pub mod interactable;
pub mod interactor;
pub mod movement;
pub mod registry;
pub mod smoothing;
pub mod state;
pub mod throw;
pub mod transformer;

#[cfg(test)]
mod tests;

pub use attach::{AttachKey, AttachPointArena, AttachRecord};
pub use free_transformers::{DualGrabFreeTransformer, SingleGrabFreeTransformer, TwoHandRotationMode};
pub use interactable::{GrabHost, GrabInteractable, ReferenceFrameJump};
pub use interactor::{GrabbingInteractor, InteractorDescriptor, InteractorId, InteractorKind, PoseSource};
pub use movement::MovementType;
pub use registry::TransformerRegistry;
pub use state::GrabState;
pub use throw::{AimAssist, DetachVelocity, ThrowVelocityEstimator, TrajectoryAimAssist, WeightCurve};
pub use transformer::{
    DropEventArgs,
    DropTransformer,
    GrabTransformer,
    GrabView,
    TransformerCommands,
    TransformerKey,
    TransformerList,
};
