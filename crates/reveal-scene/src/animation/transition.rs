//! Runtime state for one step's transition.
//!
//! An `ActiveTransition` plays an attribute set through a list of keyframes,
//! optionally repeating. It never goes away while its sequencer lives: at rest
//! it is `Finished` at some value, and playing or reversing simply retargets
//! it from wherever it currently is.

use super::easing::EasingFunction;
use super::keyframes::{Keyframes, Repeat, RepeatType};
use super::types::{AnimationState, AttributeSet};

/// An in-progress (or resting) transition for a single step.
#[derive(Debug, Clone)]
pub struct ActiveTransition {
    /// Id of the step this transition renders.
    pub step_id: String,
    /// Stops of the current leg.
    pub frames: Keyframes,
    /// Duration of one iteration in milliseconds.
    pub duration_ms: f64,
    /// Offset before the leg starts moving, in milliseconds.
    pub delay_ms: f64,
    /// Time since the leg was (re)targeted, in milliseconds.
    pub elapsed_ms: f64,
    pub easing: EasingFunction,
    pub repeat: Repeat,
    pub state: AnimationState,
}

impl ActiveTransition {
    /// A transition resting at `value`.
    pub fn at_rest(step_id: impl Into<String>, value: AttributeSet) -> Self {
        Self {
            step_id: step_id.into(),
            frames: Keyframes::between(value.clone(), value),
            duration_ms: 0.0,
            delay_ms: 0.0,
            elapsed_ms: 0.0,
            easing: EasingFunction::Linear,
            repeat: Repeat::none(),
            state: AnimationState::Finished,
        }
    }

    /// Create a transition that starts moving after `delay_ms`.
    pub fn new(
        step_id: impl Into<String>,
        from_value: AttributeSet,
        to_value: AttributeSet,
        duration_ms: f64,
        delay_ms: f64,
        easing: EasingFunction,
    ) -> Self {
        let mut transition = Self::at_rest(step_id, from_value.clone());
        transition.play(
            Keyframes::between(from_value, to_value),
            duration_ms,
            delay_ms,
            easing,
            Repeat::none(),
        );
        transition
    }

    /// Get the current interpolated value.
    pub fn current_value(&self) -> AttributeSet {
        match self.state {
            AnimationState::Pending => self.frames.first().clone(),
            AnimationState::Finished => self.final_value(),
            // Cancelling collapses the frames onto the frozen value.
            AnimationState::Cancelled => self.frames.first().clone(),
            AnimationState::Running => {
                let active = (self.elapsed_ms - self.delay_ms).max(0.0);
                let (iteration, local) = self.repeat.locate(self.duration_ms, active);
                let progress = if self.duration_ms > 0.0 {
                    local / self.duration_ms
                } else {
                    1.0
                };
                self.sample_iteration(iteration, progress)
            }
        }
    }

    /// Value the leg settles on after its last iteration.
    pub fn final_value(&self) -> AttributeSet {
        self.sample_iteration(self.repeat.last_iteration(), 1.0)
    }

    /// Advance time.
    ///
    /// Returns `true` while the transition is pending or running, `false`
    /// once it has finished or was cancelled. Endless loops never finish.
    pub fn update(&mut self, delta_ms: f64) -> bool {
        match self.state {
            AnimationState::Finished | AnimationState::Cancelled => false,
            AnimationState::Pending | AnimationState::Running => {
                self.elapsed_ms += delta_ms;
                if self.state == AnimationState::Pending && self.elapsed_ms >= self.delay_ms {
                    self.state = AnimationState::Running;
                }
                if self.state != AnimationState::Running {
                    return true;
                }
                let active = self.elapsed_ms - self.delay_ms;
                if active >= self.repeat.run_ms(self.duration_ms) {
                    self.state = AnimationState::Finished;
                    return false;
                }
                if self.repeat.is_infinite() {
                    // Fold whole pairs of iterations away; parity picks the direction.
                    let cycle = 2.0 * (self.duration_ms + self.repeat.delay_ms);
                    if active >= cycle {
                        self.elapsed_ms = self.delay_ms + active % cycle;
                    }
                }
                true
            }
        }
    }

    /// Play `frames` from their first stop, repeating as `repeat` says.
    pub fn play(
        &mut self,
        frames: Keyframes,
        duration_ms: f64,
        delay_ms: f64,
        easing: EasingFunction,
        repeat: Repeat,
    ) {
        self.frames = frames;
        self.duration_ms = duration_ms;
        self.delay_ms = delay_ms;
        self.elapsed_ms = 0.0;
        self.easing = easing;
        self.repeat = repeat;
        self.state = if delay_ms > 0.0 {
            AnimationState::Pending
        } else if repeat.run_ms(duration_ms) <= 0.0 {
            AnimationState::Finished
        } else {
            AnimationState::Running
        };
    }

    /// Head for a new destination once, continuing from the current value.
    pub fn retarget(
        &mut self,
        new_to_value: AttributeSet,
        duration_ms: f64,
        delay_ms: f64,
        easing: EasingFunction,
    ) {
        let frames = Keyframes::between(self.current_value(), new_to_value);
        self.play(frames, duration_ms, delay_ms, easing, Repeat::none());
    }

    /// Stop immediately and hold the current value.
    pub fn cancel(&mut self) {
        if self.state != AnimationState::Cancelled {
            let value = self.current_value();
            self.frames = Keyframes::between(value.clone(), value);
            self.repeat = Repeat::none();
            self.state = AnimationState::Cancelled;
        }
    }

    /// Check if this transition is still moving or waiting to move.
    pub fn is_active(&self) -> bool {
        matches!(self.state, AnimationState::Pending | AnimationState::Running)
    }

    /// Moving with no end in sight.
    pub fn is_looping(&self) -> bool {
        self.state == AnimationState::Running
            && self.repeat.run_ms(self.duration_ms).is_infinite()
    }

    /// Active and bound to come to rest (or to start an endless loop).
    pub fn is_settling(&self) -> bool {
        self.is_active() && !self.is_looping()
    }

    pub fn is_finished(&self) -> bool {
        self.state == AnimationState::Finished
    }

    /// Linear time progress of the current iteration (0.0 to 1.0).
    pub fn progress(&self) -> f64 {
        let active = (self.elapsed_ms - self.delay_ms).max(0.0);
        let (_, local) = self.repeat.locate(self.duration_ms, active);
        if self.duration_ms > 0.0 {
            (local / self.duration_ms).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    fn sample_iteration(&self, iteration: u32, progress: f64) -> AttributeSet {
        let reversed = self.repeat.kind.is_reversed(iteration);
        match self.repeat.kind {
            RepeatType::Reverse if reversed => {
                self.frames.sample(1.0 - progress, &self.easing, self.duration_ms)
            }
            RepeatType::Mirror if reversed => {
                self.frames.reversed().sample(progress, &self.easing, self.duration_ms)
            }
            _ => self.frames.sample(progress, &self.easing, self.duration_ms),
        }
    }
}
