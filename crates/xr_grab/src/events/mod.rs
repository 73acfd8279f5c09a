//! Interaction events
//!
//! Hover and selection lifecycle events are plain tagged values carrying the
//! interactor they concern. Any interactable implements
//! [`InteractionHandler`] and receives them through [`dispatch`], either
//! directly or via an [`InteractionEventQueue`] that supports immediate and
//! deferred delivery.

use serde::{Deserialize, Serialize};

use crate::error::GrabResult;
use crate::grab::interactable::{GrabHost, GrabInteractable};
use crate::grab::interactor::InteractorDescriptor;

/// Hover or select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    /// Interactor is near or pointing at the object
    Hover,
    /// Interactor holds the object
    Select,
}

/// Where in the lifecycle an event fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionStage {
    /// Before the interaction is recorded
    Entering,
    /// After the interaction is recorded
    Entered,
    /// Before the interaction is removed
    Exiting,
    /// After the interaction is removed
    Exited,
}

/// Interaction lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InteractionEvent {
    /// Hover starts
    HoverEntering(InteractorDescriptor),
    /// Hover started
    HoverEntered(InteractorDescriptor),
    /// Hover ends
    HoverExiting(InteractorDescriptor),
    /// Hover ended
    HoverExited(InteractorDescriptor),
    /// Selection starts
    SelectEntering(InteractorDescriptor),
    /// Selection started
    SelectEntered(InteractorDescriptor),
    /// Selection ends
    SelectExiting(InteractorDescriptor),
    /// Selection ended
    SelectExited(InteractorDescriptor),
}

impl InteractionEvent {
    /// Interactor the event concerns
    pub fn interactor(&self) -> &InteractorDescriptor {
        match self {
            Self::HoverEntering(interactor)
            | Self::HoverEntered(interactor)
            | Self::HoverExiting(interactor)
            | Self::HoverExited(interactor)
            | Self::SelectEntering(interactor)
            | Self::SelectEntered(interactor)
            | Self::SelectExiting(interactor)
            | Self::SelectExited(interactor) => interactor,
        }
    }

    /// Hover or select
    pub fn kind(&self) -> InteractionKind {
        match self {
            Self::HoverEntering(_) | Self::HoverEntered(_) | Self::HoverExiting(_) | Self::HoverExited(_) => {
                InteractionKind::Hover
            }
            _ => InteractionKind::Select,
        }
    }

    /// Lifecycle stage
    pub fn stage(&self) -> InteractionStage {
        match self {
            Self::HoverEntering(_) | Self::SelectEntering(_) => InteractionStage::Entering,
            Self::HoverEntered(_) | Self::SelectEntered(_) => InteractionStage::Entered,
            Self::HoverExiting(_) | Self::SelectExiting(_) => InteractionStage::Exiting,
            Self::HoverExited(_) | Self::SelectExited(_) => InteractionStage::Exited,
        }
    }

    /// Whether the event starts an interaction
    pub fn is_enter(&self) -> bool {
        matches!(self.stage(), InteractionStage::Entering | InteractionStage::Entered)
    }
}

/// Receiver of interaction events
pub trait InteractionHandler {
    /// Entering or entered event
    fn on_enter(&mut self, event: &InteractionEvent, host: &mut GrabHost<'_>) -> GrabResult<()>;

    /// Exiting or exited event
    fn on_exit(&mut self, event: &InteractionEvent, host: &mut GrabHost<'_>) -> GrabResult<()>;
}

/// Route an event to the enter or exit callback of `handler`
pub fn dispatch<H>(handler: &mut H, event: &InteractionEvent, host: &mut GrabHost<'_>) -> GrabResult<()>
where
    H: InteractionHandler + ?Sized,
{
    if event.is_enter() {
        handler.on_enter(event, host)
    } else {
        handler.on_exit(event, host)
    }
}

impl InteractionHandler for GrabInteractable {
    fn on_enter(&mut self, event: &InteractionEvent, host: &mut GrabHost<'_>) -> GrabResult<()> {
        match *event {
            InteractionEvent::HoverEntering(interactor) => {
                self.hover_entering(interactor);
                Ok(())
            }
            InteractionEvent::SelectEntering(interactor) => self.select_entering(interactor, host),
            _ => Ok(()),
        }
    }

    fn on_exit(&mut self, event: &InteractionEvent, host: &mut GrabHost<'_>) -> GrabResult<()> {
        match *event {
            InteractionEvent::HoverExiting(interactor) => self.hover_exiting(interactor.id),
            InteractionEvent::SelectExiting(interactor) => self.select_exiting(interactor.id, host),
            _ => Ok(()),
        }
    }
}

/// Queue with immediate and deferred delivery
#[derive(Debug, Clone, Default)]
pub struct InteractionEventQueue {
    immediate: Vec<InteractionEvent>,
    deferred: Vec<(f32, InteractionEvent)>,
    current_time: f32,
}

impl InteractionEventQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Update current time (seconds since start)
    pub fn update_time(&mut self, time: f32) {
        self.current_time = time;
    }

    /// Queue an event for the next dispatch
    pub fn send(&mut self, event: InteractionEvent) {
        self.immediate.push(event);
    }

    /// Queue an event for the first dispatch at or after `delivery_time`
    pub fn post(&mut self, delivery_time: f32, event: InteractionEvent) {
        self.deferred.push((delivery_time, event));
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.immediate.len() + self.deferred.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.immediate.is_empty() && self.deferred.is_empty()
    }

    /// Deliver immediate events, then due deferred events, in order.
    ///
    /// A failing event is logged and does not stop the rest. Returns the
    /// number of events delivered successfully.
    pub fn dispatch<H>(&mut self, handler: &mut H, host: &mut GrabHost<'_>) -> usize
    where
        H: InteractionHandler + ?Sized,
    {
        let mut due = std::mem::take(&mut self.immediate);
        let current_time = self.current_time;
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred)
            .into_iter()
            .partition(|(time, _)| *time <= current_time);
        self.deferred = waiting;
        due.extend(ready.into_iter().map(|(_, event)| event));

        let mut delivered = 0;
        for event in &due {
            match dispatch(handler, event, host) {
                Ok(()) => delivered += 1,
                Err(error) => log::warn!("Interaction event {:?} rejected: {}", event, error),
            }
        }
        delivered
    }

    /// Drop all queued events
    pub fn clear(&mut self) {
        self.immediate.clear();
        self.deferred.clear();
    }
}
