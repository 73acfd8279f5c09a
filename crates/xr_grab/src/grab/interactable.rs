//! Grab interactable
//!
//! [`GrabInteractable`] ties the pipeline stages together for one object:
//!
//! 1. selection events start and end a grab and prepare the body
//! 2. each Dynamic tick runs the transformers, records the throw history
//!    and smooths the result into the target pose
//! 3. the movement stage commits the target in the phase its movement type
//!    requires
//! 4. after the last release the throw velocity is applied in the Late phase
//!
//! The host owns the body and the interactors; it lends them through a
//! [`GrabHost`] on every call.

use crate::core::config::GrabConfig;
use crate::error::{GrabError, GrabResult};
use crate::foundation::math::Pose;
use crate::foundation::time::{FrameTick, UpdatePhase};
use crate::grab::attach::{solve_dynamic_attach, AttachPointArena};
use crate::grab::free_transformers::{DualGrabFreeTransformer, SingleGrabFreeTransformer};
use crate::grab::interactor::{GrabbingInteractor, InteractorDescriptor, InteractorId, PoseSource};
use crate::grab::movement::{
    perform_instantaneous_update,
    perform_kinematic_update,
    perform_velocity_tracking_update,
    apply_target_scale,
    setup_drop,
    setup_grab,
    BodySnapshot,
    MovementType,
};
use crate::grab::registry::TransformerRegistry;
use crate::grab::smoothing::{is_pass_through, smooth_target};
use crate::grab::state::GrabState;
use crate::grab::throw::{compute_detach_velocity, AimAssist, DetachVelocity, ThrowVelocityEstimator};
use crate::grab::transformer::{DropEventArgs, GrabTransformer, GrabView, TransformerKey, TransformerList};
use crate::physics::{ClosestPointQuery, RigidBody};

/// Host collaborators lent to the interactable for one call
pub struct GrabHost<'a> {
    /// Body being carried
    pub body: &'a mut dyn RigidBody,
    /// World attach poses of the interactors
    pub poses: &'a dyn PoseSource,
    /// Collision volume used to snap dynamic attach points
    pub colliders: Option<&'a dyn ClosestPointQuery>,
}

impl<'a> GrabHost<'a> {
    /// Host without a collision volume
    pub fn new(body: &'a mut dyn RigidBody, poses: &'a dyn PoseSource) -> Self {
        Self {
            body,
            poses,
            colliders: None,
        }
    }

    /// Attach a collision volume
    pub fn with_colliders(mut self, colliders: &'a dyn ClosestPointQuery) -> Self {
        self.colliders = Some(colliders);
        self
    }
}

/// A teleport or other discontinuous move of the tracking space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrameJump {
    /// Rig pose before the jump
    pub before: Pose,
    /// Rig pose after the jump
    pub after: Pose,
    /// Transform taking world poses from before the jump to after it
    pub delta: Pose,
}

impl ReferenceFrameJump {
    /// Jump between two rig poses
    pub fn between(before: Pose, after: Pose) -> Self {
        Self {
            before,
            after,
            delta: after.multiply(&before.inverse()),
        }
    }
}

/// An object that can be picked up, carried, and thrown
pub struct GrabInteractable {
    config: GrabConfig,
    registry: TransformerRegistry,
    attach_points: AttachPointArena,
    throw: ThrowVelocityEstimator,
    aim_assist: Option<Box<dyn AimAssist>>,
    state: Option<GrabState>,
    body_snapshot: Option<BodySnapshot>,
    selecting: Vec<InteractorDescriptor>,
    hovering: Vec<InteractorDescriptor>,
    grabbing: Vec<GrabbingInteractor>,
    grab_count_changed: bool,
    movement_type_dirty: bool,
    detach_in_late: bool,
    detach_velocity: DetachVelocity,
    last_time: f32,
}

impl std::fmt::Debug for GrabInteractable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrabInteractable")
            .field("selecting", &self.selecting)
            .field("state", &self.state)
            .field("registry", &self.registry)
            .field("detach_in_late", &self.detach_in_late)
            .finish_non_exhaustive()
    }
}

impl GrabInteractable {
    /// Create an interactable with its own attach point arena
    pub fn new(config: GrabConfig) -> GrabResult<Self> {
        Self::with_attach_points(config, AttachPointArena::new())
    }

    /// Create an interactable that checks dynamic attach points out of `attach_points`
    pub fn with_attach_points(config: GrabConfig, attach_points: AttachPointArena) -> GrabResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: TransformerRegistry::new(),
            attach_points,
            throw: ThrowVelocityEstimator::new(),
            aim_assist: None,
            state: None,
            body_snapshot: None,
            selecting: Vec::new(),
            hovering: Vec::new(),
            grabbing: Vec::new(),
            grab_count_changed: false,
            movement_type_dirty: false,
            detach_in_late: false,
            detach_velocity: DetachVelocity::default(),
            last_time: 0.0,
        })
    }

    /// Redirect throws through an aim assist
    pub fn with_aim_assist(mut self, aim_assist: Box<dyn AimAssist>) -> Self {
        self.aim_assist = Some(aim_assist);
        self
    }

    /// Replace or remove the aim assist
    pub fn set_aim_assist(&mut self, aim_assist: Option<Box<dyn AimAssist>>) {
        self.aim_assist = aim_assist;
    }

    /// Current configuration
    pub fn config(&self) -> &GrabConfig {
        &self.config
    }

    /// Change the default movement type. Takes effect on the next Dynamic tick.
    pub fn set_movement_type(&mut self, movement_type: MovementType) {
        if self.config.movement_type != movement_type {
            self.config.movement_type = movement_type;
            self.movement_type_dirty = true;
        }
    }

    /// Whether any interactor selects the object
    pub fn is_selected(&self) -> bool {
        !self.selecting.is_empty()
    }

    /// Whether any interactor hovers the object
    pub fn is_hovered(&self) -> bool {
        !self.hovering.is_empty()
    }

    /// Selecting interactors, oldest first
    pub fn selecting(&self) -> &[InteractorDescriptor] {
        &self.selecting
    }

    /// Hovering interactors, oldest first
    pub fn hovering(&self) -> &[InteractorDescriptor] {
        &self.hovering
    }

    /// State of the ongoing grab
    pub fn state(&self) -> Option<&GrabState> {
        self.state.as_ref()
    }

    /// Smoothed target pose of the ongoing grab
    pub fn target_pose(&self) -> Option<Pose> {
        self.state.as_ref().map(|state| state.target_pose)
    }

    /// Movement type in effect, or the configured default when not grabbed
    pub fn movement_type(&self) -> MovementType {
        self.state
            .as_ref()
            .map_or(self.config.movement_type, |state| state.movement_type)
    }

    /// Velocity computed at the last release
    pub fn detach_velocity(&self) -> DetachVelocity {
        self.detach_velocity
    }

    /// Motion history of the ongoing grab
    pub fn throw_estimator(&self) -> &ThrowVelocityEstimator {
        &self.throw
    }

    /// Transformer registry
    pub fn registry(&self) -> &TransformerRegistry {
        &self.registry
    }

    /// Dynamic attach point storage
    pub fn attach_points(&self) -> &AttachPointArena {
        &self.attach_points
    }

    /// Mutable dynamic attach point storage
    pub fn attach_points_mut(&mut self) -> &mut AttachPointArena {
        &mut self.attach_points
    }

    /// Store a transformer and register it at the end of `list`
    pub fn insert_grab_transformer(&mut self, transformer: Box<dyn GrabTransformer>, list: TransformerList) -> TransformerKey {
        self.registry.insert(transformer, list)
    }

    /// Register a stored transformer at the end of `list`
    pub fn add_grab_transformer(&mut self, key: TransformerKey, list: TransformerList) -> GrabResult<bool> {
        self.registry.add(key, list)
    }

    /// Unregister a transformer from `list`
    pub fn remove_grab_transformer(&mut self, key: TransformerKey, list: TransformerList) -> bool {
        self.registry.remove(key, list)
    }

    /// Move a transformer to `index` in `list`
    pub fn move_grab_transformer_to(&mut self, key: TransformerKey, index: usize, list: TransformerList) -> GrabResult<()> {
        self.registry.move_to(key, index, list)
    }

    /// Borrow a stored transformer
    pub fn grab_transformer(&self, key: TransformerKey) -> Option<&dyn GrabTransformer> {
        self.registry.get(key)
    }

    /// An interactor starts hovering
    pub fn hover_entering(&mut self, interactor: InteractorDescriptor) {
        if !self.hovering.iter().any(|hovering| hovering.id == interactor.id) {
            log::trace!("Hover entering: {:?}", interactor.id);
            self.hovering.push(interactor);
        }
    }

    /// An interactor stops hovering
    pub fn hover_exiting(&mut self, interactor: InteractorId) -> GrabResult<()> {
        let index = self
            .hovering
            .iter()
            .position(|hovering| hovering.id == interactor)
            .ok_or(GrabError::UnknownInteractor(interactor))?;
        self.hovering.remove(index);
        log::trace!("Hover exiting: {:?}", interactor);
        Ok(())
    }

    /// An interactor starts selecting
    pub fn select_entering(&mut self, interactor: InteractorDescriptor, host: &mut GrabHost<'_>) -> GrabResult<()> {
        if self.selecting.iter().any(|selecting| selecting.id == interactor.id) {
            return Err(GrabError::AlreadySelecting(interactor.id));
        }

        let first = self.selecting.is_empty();
        self.selecting.push(interactor);
        log::debug!("Select entering: {:?} ({} selecting)", interactor.id, self.selecting.len());

        if first {
            let movement_type = self.resolve_movement_type();
            self.state = Some(GrabState::new(host.body.pose(), host.body.local_scale(), movement_type));
            self.movement_type_dirty = false;
        }
        if self.config.attach.use_dynamic_attach {
            self.initialize_dynamic_attach(&interactor, host);
        }

        if first {
            self.start_grab(host);
        } else {
            self.update_movement_type(host.body);
        }
        self.grab_count_changed = true;
        Ok(())
    }

    /// An interactor stops selecting
    pub fn select_exiting(&mut self, interactor: InteractorId, host: &mut GrabHost<'_>) -> GrabResult<()> {
        let index = self
            .selecting
            .iter()
            .position(|selecting| selecting.id == interactor)
            .ok_or(GrabError::UnknownInteractor(interactor))?;
        let released = self.selecting.remove(index);
        log::debug!("Select exiting: {:?} ({} selecting)", interactor, self.selecting.len());

        if let Some(key) = self
            .state
            .as_mut()
            .and_then(|state| state.dynamic_attach.remove(&interactor))
        {
            self.attach_points.check_in(key);
        }

        if self.selecting.is_empty() {
            self.end_grab(released, host);
            return Ok(());
        }

        self.grab_count_changed = true;
        self.update_movement_type(host.body);

        let attach = &self.config.attach;
        if attach.use_dynamic_attach && attach.reinitialize_every_single_grab && self.selecting.len() == 1 {
            let remaining = self.selecting[0];
            self.initialize_dynamic_attach(&remaining, host);
        }
        Ok(())
    }

    /// Run the pipeline for one scheduled phase
    pub fn process(&mut self, tick: &FrameTick, host: &mut GrabHost<'_>) {
        match tick.phase {
            UpdatePhase::Fixed => self.process_fixed(tick, host),
            UpdatePhase::Dynamic => {
                self.last_time = tick.time;
                if self.is_selected() {
                    if self.movement_type_dirty {
                        self.movement_type_dirty = false;
                        self.update_movement_type(host.body);
                    }
                    self.refresh_grabbing(host);
                    self.update_target(tick, host);
                    self.apply_dynamic(host);
                } else {
                    self.process_drop_transformers(tick, host);
                }
            }
            UpdatePhase::Late => {
                if self.detach_in_late {
                    self.detach_in_late = false;
                    if !self.is_selected() {
                        self.detach(host.body);
                    }
                }
            }
            UpdatePhase::OnBeforeRender => {
                if self.is_selected() {
                    self.refresh_grabbing(host);
                    self.update_target(tick, host);
                    if self.movement_type() == MovementType::Instantaneous {
                        self.apply_dynamic(host);
                    }
                }
            }
        }
    }

    /// Re-express the throw history after the tracking space jumped
    pub fn on_reference_frame_jump(&mut self, jump: &ReferenceFrameJump) {
        if !self.is_selected() {
            return;
        }
        log::debug!("Reframing throw history by {:?}", jump.delta);
        self.throw.reframe(&jump.delta);
    }

    fn start_grab(&mut self, host: &mut GrabHost<'_>) {
        let movement_type = self.movement_type();
        self.body_snapshot = Some(setup_grab(host.body, movement_type));
        self.throw.reset();
        self.detach_in_late = false;

        if self.config.add_default_grab_transformers {
            self.add_default_grab_transformers();
        }

        self.registry.set_grabbed(true);
        self.refresh_grabbing(host);
        let view = GrabView {
            interactors: &self.grabbing,
            body_pose: host.body.pose(),
            body_scale: host.body.local_scale(),
        };
        self.registry.notify_grab(&view);
        log::debug!("Grab started with movement type {:?}", movement_type);
    }

    fn add_default_grab_transformers(&mut self) {
        if self.registry.count(TransformerList::Single) == 0 {
            self.registry
                .insert(Box::new(SingleGrabFreeTransformer::new()), TransformerList::Single);
        }
        if self.registry.count(TransformerList::Multiple) == 0 {
            self.registry
                .insert(Box::new(DualGrabFreeTransformer::default()), TransformerList::Multiple);
        }
    }

    fn end_grab(&mut self, released: InteractorDescriptor, host: &mut GrabHost<'_>) {
        if let Some(snapshot) = self.body_snapshot.take() {
            setup_drop(host.body, &snapshot, self.config.force_gravity_on_detach);
        }

        self.detach_velocity = if self.config.throw.throw_on_detach {
            let aim_assist = self
                .aim_assist
                .as_deref()
                .map(|assist| (assist, host.body.pose().position));
            compute_detach_velocity(&self.throw, self.last_time, &self.config.throw, aim_assist)
        } else {
            DetachVelocity::default()
        };
        self.detach_in_late = true;

        if let Some(state) = self.state.take() {
            for key in state.dynamic_attach.into_values() {
                self.attach_points.check_in(key);
            }
        }
        self.throw.reset();
        self.grabbing.clear();
        self.grab_count_changed = false;
        self.movement_type_dirty = false;

        self.registry.set_grabbed(false);
        self.registry.notify_drop(&DropEventArgs {
            interactor: released,
            body_pose: host.body.pose(),
        });
        log::debug!("Grab ended, detach velocity {:?}", self.detach_velocity);
    }

    fn detach(&mut self, body: &mut dyn RigidBody) {
        if !self.config.throw.throw_on_detach {
            return;
        }
        if body.is_kinematic() {
            log::warn!("Cannot throw a kinematic body; release velocity discarded");
            return;
        }
        body.set_linear_velocity(self.detach_velocity.linear);
        body.set_angular_velocity(self.detach_velocity.angular);
    }

    fn resolve_movement_type(&self) -> MovementType {
        let mut resolved = None;
        for interactor in self.selecting.iter().rev() {
            let Some(candidate) = interactor.movement_type_override else {
                continue;
            };
            match resolved {
                None => resolved = Some(candidate),
                Some(existing) => {
                    if existing != candidate {
                        log::warn!(
                            "Interactors selecting this object override the movement type differently; using {:?} from the most recent selection",
                            existing
                        );
                    }
                    break;
                }
            }
        }
        resolved.unwrap_or(self.config.movement_type)
    }

    fn update_movement_type(&mut self, body: &mut dyn RigidBody) {
        let movement_type = self.resolve_movement_type();
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.movement_type == movement_type {
            return;
        }

        log::debug!("Movement type changed from {:?} to {:?}", state.movement_type, movement_type);
        if let Some(snapshot) = self.body_snapshot.take() {
            setup_drop(body, &snapshot, false);
        }
        self.body_snapshot = Some(setup_grab(body, movement_type));
        state.movement_type = movement_type;
    }

    fn initialize_dynamic_attach(&mut self, interactor: &InteractorDescriptor, host: &GrabHost<'_>) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        let local_pose = match host.poses.interactor_attach_pose(interactor.id) {
            Some(interactor_attach) => solve_dynamic_attach(
                &self.config.attach,
                interactor,
                &interactor_attach,
                &host.body.pose(),
                &host.body.local_scale(),
                host.colliders,
            ),
            None => {
                log::warn!("No attach pose for interactor {:?}; using the static attach point", interactor.id);
                self.config.attach.static_attach_pose
            }
        };

        let existing = state
            .dynamic_attach
            .get(&interactor.id)
            .copied()
            .filter(|&key| self.attach_points.contains(key));
        match existing {
            Some(key) => {
                if let Some(record) = self.attach_points.get_mut(key) {
                    record.local_pose = local_pose;
                }
            }
            None => {
                let key = self.attach_points.check_out(interactor.id, local_pose);
                state.dynamic_attach.insert(interactor.id, key);
            }
        }
    }

    fn attach_local_for(&self, interactor: InteractorId) -> Pose {
        let static_pose = self.config.attach.static_attach_pose;
        if !self.config.attach.use_dynamic_attach {
            return static_pose;
        }
        let Some(key) = self
            .state
            .as_ref()
            .and_then(|state| state.dynamic_attach.get(&interactor).copied())
        else {
            return static_pose;
        };
        match self.attach_points.get(key) {
            Some(record) => record.local_pose,
            None => {
                log::warn!(
                    "Dynamic attach point of interactor {:?} was destroyed; using the static attach point",
                    interactor
                );
                static_pose
            }
        }
    }

    fn refresh_grabbing(&mut self, host: &GrabHost<'_>) {
        let mut grabbing = std::mem::take(&mut self.grabbing);
        grabbing.clear();
        for interactor in &self.selecting {
            let Some(attach_pose) = host.poses.interactor_attach_pose(interactor.id) else {
                log::debug!("Interactor {:?} has no attach pose this tick", interactor.id);
                continue;
            };
            grabbing.push(GrabbingInteractor {
                descriptor: *interactor,
                attach_pose,
                attach_local: self.attach_local_for(interactor.id),
            });
        }
        self.grabbing = grabbing;
    }

    fn deliver_grab_notifications(&mut self, host: &GrabHost<'_>) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let view = GrabView {
            interactors: &self.grabbing,
            body_pose: host.body.pose(),
            body_scale: host.body.local_scale(),
        };

        self.registry.notify_late_joiners(&view);
        if self.grab_count_changed {
            self.grab_count_changed = false;
            self.registry
                .notify_grab_count_changed(&view, &state.target_pose, &state.target_scale);
        } else {
            self.registry
                .notify_added_grab_count_changed(&view, &state.target_pose, &state.target_scale);
        }
    }

    fn update_target(&mut self, tick: &FrameTick, host: &GrabHost<'_>) {
        // Late joiners and count changes are seen before any transformer runs
        self.deliver_grab_notifications(host);
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let view = GrabView {
            interactors: &self.grabbing,
            body_pose: host.body.pose(),
            body_scale: host.body.local_scale(),
        };

        let mut raw_pose = state.target_pose;
        let mut raw_scale = state.target_scale;
        if !self
            .registry
            .process_grab(&view, tick.phase, &mut raw_pose, &mut raw_scale)
        {
            log::trace!("No grab transformer processed in {:?}", tick.phase);
        }

        if tick.phase == UpdatePhase::OnBeforeRender {
            // Late pose refresh without advancing smoothing or the throw history
            if is_pass_through(state.ease_elapsed, self.config.attach_ease_in_time, &self.config.smoothing) {
                state.target_pose = raw_pose;
                state.target_scale = raw_scale;
            }
            return;
        }

        self.throw.record(&raw_pose, tick.time, tick.delta_time);
        smooth_target(
            &mut state.target_pose,
            &mut state.target_scale,
            &raw_pose,
            &raw_scale,
            tick.delta_time,
            self.config.attach_ease_in_time,
            &mut state.ease_elapsed,
            &self.config.smoothing,
        );
    }

    fn apply_dynamic(&self, host: &mut GrabHost<'_>) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        if state.movement_type == MovementType::Instantaneous {
            perform_instantaneous_update(host.body, &state.target_pose, &state.target_scale, self.config.tracked_axes);
        } else {
            apply_target_scale(host.body, &state.target_scale, self.config.tracked_axes);
        }
    }

    fn process_fixed(&self, tick: &FrameTick, host: &mut GrabHost<'_>) {
        if !self.is_selected() {
            return;
        }
        let Some(state) = self.state.as_ref() else {
            return;
        };
        match state.movement_type {
            MovementType::Instantaneous => {}
            MovementType::Kinematic => {
                perform_kinematic_update(host.body, &state.target_pose, self.config.tracked_axes);
            }
            MovementType::VelocityTracking => perform_velocity_tracking_update(
                host.body,
                &state.target_pose,
                tick.delta_time,
                self.config.tracked_axes,
                &self.config.velocity_tracking,
            ),
        }
    }

    fn process_drop_transformers(&mut self, tick: &FrameTick, host: &mut GrabHost<'_>) {
        let body_pose = host.body.pose();
        let body_scale = host.body.local_scale();
        let mut pose = body_pose;
        let mut scale = body_scale;
        let view = GrabView {
            interactors: &[],
            body_pose,
            body_scale,
        };
        if self.registry.process_drop(&view, tick.phase, &mut pose, &mut scale) {
            perform_instantaneous_update(host.body, &pose, &scale, self.config.tracked_axes);
        }
    }
}
