//! Visibility-driven playback of a `SequencePlan`.
//!
//! The `AnimationSequencer` owns one `ActiveTransition` per step. While the
//! region is not visible every step rests at its `from` state. When the
//! region becomes visible each step is retargeted to its `to` state with the
//! start offset computed by the plan's schedule. Losing visibility (only
//! possible for reversible regions) retargets every step back to `from`,
//! continuing from whatever value it currently shows.
//!
//! Steps that repeat forever do not hold the sequence back: it counts as
//! `Shown` once every other step has settled and the loops have started, and
//! the loops keep running for as long as the region stays visible.
//!
//! # Usage
//!
//! ```ignore
//! let mut sequencer = AnimationSequencer::new("cards", plan);
//! sequencer.set_visibility(VisibilityState::Visible);
//!
//! // Each frame:
//! sequencer.update(16.0);
//! for (step, attributes) in sequencer.values() {
//!     // apply attributes to the node bound to `step`
//! }
//! ```

use serde::Serialize;
use tracing::debug;

use super::events::{EventQueue, SequenceEvent};
use super::plan::{ScheduledStep, SequencePlan};
use super::transition::ActiveTransition;
use super::types::{AnimationState, AttributeSet};
use crate::observer::VisibilityState;

/// Where a sequencer is in its reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencePhase {
    /// Resting at the hidden variant.
    #[default]
    Hidden,
    /// Moving towards the visible variant.
    Playing,
    /// Resting at the visible variant.
    Shown,
    /// Moving back towards the hidden variant.
    Reversing,
    /// Torn down.
    Cancelled,
}

/// Plays one plan when its region becomes visible.
#[derive(Debug)]
pub struct AnimationSequencer {
    name: String,
    plan: SequencePlan,
    schedule: Vec<ScheduledStep>,
    /// Parallel to `schedule` and `plan.steps()`.
    transitions: Vec<ActiveTransition>,
    visibility: VisibilityState,
    phase: SequencePhase,
    /// Time since the last visibility change.
    clock_ms: f64,
    events: EventQueue<SequenceEvent>,
}

impl AnimationSequencer {
    pub fn new(name: impl Into<String>, plan: SequencePlan) -> Self {
        let schedule = plan.schedule();
        let transitions = plan
            .steps()
            .map(|step| ActiveTransition::at_rest(step.id.clone(), step.from.clone()))
            .collect();
        Self {
            name: name.into(),
            plan,
            schedule,
            transitions,
            visibility: VisibilityState::NotVisible,
            phase: SequencePhase::Hidden,
            clock_ms: 0.0,
            events: EventQueue::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plan(&self) -> &SequencePlan {
        &self.plan
    }

    /// Start offsets of every step relative to the trigger.
    pub fn schedule(&self) -> &[ScheduledStep] {
        &self.schedule
    }

    pub fn visibility(&self) -> VisibilityState {
        self.visibility
    }

    pub fn phase(&self) -> SequencePhase {
        self.phase
    }

    /// Milliseconds since the last visibility change.
    pub fn elapsed_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Feed the next visibility state. Repeated states are ignored.
    pub fn set_visibility(&mut self, state: VisibilityState) {
        if self.phase == SequencePhase::Cancelled || state == self.visibility {
            return;
        }
        self.visibility = state;
        match state {
            VisibilityState::Visible => self.play(),
            VisibilityState::NotVisible => self.reverse(),
        }
    }

    /// Advance every step by `delta_ms`.
    ///
    /// Returns `true` while the sequence is still heading for a resting
    /// phase. Endless loops keep advancing but do not count.
    pub fn update(&mut self, delta_ms: f64) -> bool {
        if !self.is_animating() && !self.is_looping() {
            return false;
        }
        self.clock_ms += delta_ms;
        let playing = self.phase == SequencePhase::Playing;

        for transition in &mut self.transitions {
            let before = transition.state;
            transition.update(delta_ms);
            if !playing {
                continue;
            }
            let after = transition.state;
            if before == AnimationState::Pending && after != AnimationState::Pending {
                self.events.push(SequenceEvent::StepStarted {
                    step: transition.step_id.clone(),
                });
            }
            if before != AnimationState::Finished && after == AnimationState::Finished {
                self.events.push(SequenceEvent::StepEnded {
                    step: transition.step_id.clone(),
                });
            }
        }

        self.settle_if_idle();
        self.is_animating()
    }

    /// Stop all scheduling immediately and freeze every value.
    ///
    /// A sequence resting at either variant has nothing in flight and is
    /// left as it is.
    pub fn cancel(&mut self) {
        if !self.is_animating() && !self.is_looping() {
            return;
        }
        for transition in &mut self.transitions {
            transition.cancel();
        }
        self.phase = SequencePhase::Cancelled;
        self.events.push(SequenceEvent::Cancelled);
        debug!(track = %self.name, at_ms = self.clock_ms, "sequence cancelled");
    }

    /// Current attributes of one step.
    pub fn current_value(&self, step_id: &str) -> Option<AttributeSet> {
        self.transitions
            .iter()
            .find(|t| t.step_id == step_id)
            .map(ActiveTransition::current_value)
    }

    /// Current attributes of every step, in schedule order.
    pub fn values(&self) -> impl Iterator<Item = (&str, AttributeSet)> + '_ {
        self.transitions
            .iter()
            .map(|t| (t.step_id.as_str(), t.current_value()))
    }

    /// State of one step's transition.
    pub fn step_state(&self, step_id: &str) -> Option<AnimationState> {
        self.transitions
            .iter()
            .find(|t| t.step_id == step_id)
            .map(|t| t.state)
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.phase, SequencePhase::Playing | SequencePhase::Reversing)
    }

    /// Whether any step is repeating without end.
    pub fn is_looping(&self) -> bool {
        self.phase != SequencePhase::Cancelled
            && self.transitions.iter().any(ActiveTransition::is_looping)
    }

    /// Whether every step rests at its visible variant.
    pub fn is_complete(&self) -> bool {
        self.phase == SequencePhase::Shown
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = SequenceEvent> + '_ {
        self.events.drain()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    fn play(&mut self) {
        self.clock_ms = 0.0;
        self.phase = SequencePhase::Playing;
        debug!(track = %self.name, steps = self.transitions.len(), "sequence playing");

        for ((transition, scheduled), step) in self
            .transitions
            .iter_mut()
            .zip(&self.schedule)
            .zip(self.plan.steps())
        {
            let frames = step.play_frames(transition.current_value());
            transition.play(
                frames,
                step.duration_ms,
                scheduled.start_ms,
                step.easing,
                step.repeat,
            );
            if transition.state != AnimationState::Pending {
                self.events.push(SequenceEvent::StepStarted {
                    step: step.id.clone(),
                });
            }
            if transition.state == AnimationState::Finished {
                self.events.push(SequenceEvent::StepEnded {
                    step: step.id.clone(),
                });
            }
        }

        self.settle_if_idle();
    }

    fn reverse(&mut self) {
        if self.phase == SequencePhase::Hidden {
            return;
        }
        self.clock_ms = 0.0;
        self.phase = SequencePhase::Reversing;
        self.events.push(SequenceEvent::Reversed);
        debug!(track = %self.name, "sequence reversing");

        for (transition, step) in self.transitions.iter_mut().zip(self.plan.steps()) {
            transition.retarget(step.from.clone(), step.duration_ms, 0.0, step.easing);
        }

        self.settle_if_idle();
    }

    fn settle_if_idle(&mut self) {
        if self.transitions.iter().any(ActiveTransition::is_settling) {
            return;
        }
        match self.phase {
            SequencePhase::Playing => {
                self.phase = SequencePhase::Shown;
                self.events.push(SequenceEvent::Completed);
                debug!(track = %self.name, at_ms = self.clock_ms, "sequence complete");
            }
            SequencePhase::Reversing => {
                self.phase = SequencePhase::Hidden;
                self.events.push(SequenceEvent::Rewound);
            }
            _ => {}
        }
    }
}

static_assertions::assert_impl_all!(AnimationSequencer: Send);
