//! Update phases and frame timing
//!
//! The grab pipeline does not own a loop. A host scheduler calls
//! [`crate::grab::GrabInteractable::process`] once per phase, in the order
//! produced by [`FrameClock::advance`].

use serde::{Deserialize, Serialize};

/// Minimum timestep for velocity-dependent math, in seconds.
///
/// Below this the pipeline skips velocity computation for the tick.
pub const DELTA_TIME_THRESHOLD: f32 = 0.001;

/// Per-frame update phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpdatePhase {
    /// Physics-rate update, may run zero or more times per frame
    Fixed,
    /// Render-rate update after physics
    Dynamic,
    /// End of frame
    Late,
    /// Just before rendering, for late pose prediction
    OnBeforeRender,
}

/// One scheduled invocation of the pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Phase being executed
    pub phase: UpdatePhase,
    /// Step length for this phase in seconds (fixed step for [`UpdatePhase::Fixed`])
    pub delta_time: f32,
    /// Simulation time at this tick in seconds
    pub time: f32,
}

impl FrameTick {
    /// Create a tick
    pub fn new(phase: UpdatePhase, delta_time: f32, time: f32) -> Self {
        Self { phase, delta_time, time }
    }
}

/// Fixed-step accumulator that expands a variable frame delta into phases
#[derive(Debug, Clone)]
pub struct FrameClock {
    fixed_delta_time: f32,
    max_fixed_steps: u32,
    accumulator: f32,
    time: f32,
    fixed_time: f32,
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(1.0 / 50.0)
    }
}

impl FrameClock {
    /// Create a clock with the given physics step
    pub fn new(fixed_delta_time: f32) -> Self {
        Self {
            fixed_delta_time: fixed_delta_time.max(DELTA_TIME_THRESHOLD),
            max_fixed_steps: 8,
            accumulator: 0.0,
            time: 0.0,
            fixed_time: 0.0,
            frame_count: 0,
        }
    }

    /// Limit the number of fixed steps run in a single frame
    pub fn with_max_fixed_steps(mut self, steps: u32) -> Self {
        self.max_fixed_steps = steps.max(1);
        self
    }

    /// Advance by one rendered frame and return the ticks to execute, in order.
    pub fn advance(&mut self, frame_delta: f32) -> Vec<FrameTick> {
        let frame_delta = frame_delta.max(0.0);
        let mut ticks = Vec::with_capacity(4);

        self.accumulator += frame_delta;
        let mut steps = 0;
        while self.accumulator >= self.fixed_delta_time && steps < self.max_fixed_steps {
            self.accumulator -= self.fixed_delta_time;
            self.fixed_time += self.fixed_delta_time;
            ticks.push(FrameTick::new(UpdatePhase::Fixed, self.fixed_delta_time, self.fixed_time));
            steps += 1;
        }
        if steps == self.max_fixed_steps && self.accumulator >= self.fixed_delta_time {
            log::debug!(
                "Dropping {:.4}s of physics time after {} fixed steps",
                self.accumulator,
                steps
            );
            self.accumulator %= self.fixed_delta_time;
        }

        self.time += frame_delta;
        self.frame_count += 1;
        ticks.push(FrameTick::new(UpdatePhase::Dynamic, frame_delta, self.time));
        ticks.push(FrameTick::new(UpdatePhase::Late, frame_delta, self.time));
        ticks.push(FrameTick::new(UpdatePhase::OnBeforeRender, frame_delta, self.time));
        ticks
    }

    /// Physics step length in seconds
    pub fn fixed_delta_time(&self) -> f32 {
        self.fixed_delta_time
    }

    /// Total elapsed frame time in seconds
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Number of frames advanced so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_within_frame() {
        let mut clock = FrameClock::new(0.02);
        let ticks = clock.advance(0.05);
        let phases: Vec<_> = ticks.iter().map(|t| t.phase).collect();
        assert_eq!(
            phases,
            vec![
                UpdatePhase::Fixed,
                UpdatePhase::Fixed,
                UpdatePhase::Dynamic,
                UpdatePhase::Late,
                UpdatePhase::OnBeforeRender,
            ]
        );
    }

    #[test]
    fn test_accumulator_carries_remainder() {
        let mut clock = FrameClock::new(0.02);
        let first = clock.advance(0.015);
        assert!(first.iter().all(|t| t.phase != UpdatePhase::Fixed));
        let second = clock.advance(0.015);
        assert_eq!(second.iter().filter(|t| t.phase == UpdatePhase::Fixed).count(), 1);
        assert_eq!(clock.frame_count(), 2);
    }

    #[test]
    fn test_fixed_steps_are_capped() {
        let mut clock = FrameClock::new(0.01).with_max_fixed_steps(3);
        let ticks = clock.advance(1.0);
        assert_eq!(ticks.iter().filter(|t| t.phase == UpdatePhase::Fixed).count(), 3);
    }
}
