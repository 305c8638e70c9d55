//! Declarative sequence plans and their schedules.
//!
//! A `SequencePlan` is a list of tiers. Each tier has an optional parent step
//! and any number of child steps; children are staggered relative to the
//! tier's start offset:
//!
//! ```text
//! tier offset ─┬─ parent  (offset + parent.delay)
//!              └─ child i (offset + delay_children [+ parent run] + child.delay + i·stagger)
//! ```
//!
//! Every step is validated on construction: endpoint keys must match, values
//! must be blendable, and timings must be finite and non-negative. A step that
//! repeats forever has no end; the schedule reports an infinite run for it and
//! leaves it out of `total_duration_ms`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::easing::EasingFunction;
use super::keyframes::{Keyframes, Repeat};
use super::types::AttributeSet;
use crate::error::{Result, RevealError};

/// Timing of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepTiming {
    /// Nominal duration. Spring easings replace it with their settle time.
    pub duration_ms: f64,
    pub delay_ms: f64,
    pub easing: EasingFunction,
    #[serde(default)]
    pub repeat: Repeat,
}

impl Default for StepTiming {
    fn default() -> Self {
        Self {
            duration_ms: 300.0,
            delay_ms: 0.0,
            easing: EasingFunction::EaseOut,
            repeat: Repeat::none(),
        }
    }
}

impl StepTiming {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }
}

/// One validated transition between two attribute sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationStep {
    pub id: String,
    /// Resting value while hidden.
    pub from: AttributeSet,
    /// Final stop of the visible motion.
    pub to: AttributeSet,
    /// Explicit stops played on reveal. `None` tweens from the current value
    /// straight to `to`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyframes: Option<Keyframes>,
    /// Actual run time of one iteration (spring settle time for springs).
    pub duration_ms: f64,
    pub delay_ms: f64,
    pub easing: EasingFunction,
    pub repeat: Repeat,
}

impl AnimationStep {
    /// Validate and build a step.
    pub fn new(
        id: impl Into<String>,
        from: AttributeSet,
        to: AttributeSet,
        timing: StepTiming,
    ) -> Result<Self> {
        let id = id.into();
        check_endpoints(&id, &from, &to)?;
        Self::build(id, from, to, None, timing)
    }

    /// Validate and build a step that plays `keyframes` on reveal and rests
    /// at `from` while hidden.
    pub fn with_keyframes(
        id: impl Into<String>,
        from: AttributeSet,
        keyframes: Keyframes,
        timing: StepTiming,
    ) -> Result<Self> {
        let id = id.into();
        for frame in keyframes.frames() {
            check_endpoints(&id, &from, &frame.value)?;
        }
        let to = keyframes.last().clone();
        Self::build(id, from, to, Some(keyframes), timing)
    }

    fn build(
        id: String,
        from: AttributeSet,
        to: AttributeSet,
        keyframes: Option<Keyframes>,
        timing: StepTiming,
    ) -> Result<Self> {
        check_timing("duration", timing.duration_ms)?;
        check_timing("delay", timing.delay_ms)?;
        check_timing("repeat delay", timing.repeat.delay_ms)?;
        if let EasingFunction::Spring(spring) = &timing.easing {
            spring.validate()?;
        }

        Ok(Self {
            id,
            from,
            to,
            keyframes,
            duration_ms: timing.easing.effective_duration_ms(timing.duration_ms),
            delay_ms: timing.delay_ms,
            easing: timing.easing,
            repeat: timing.repeat,
        })
    }

    /// Time from start until the last iteration ends; infinite for endless loops.
    pub fn run_ms(&self) -> f64 {
        self.repeat.run_ms(self.duration_ms)
    }

    /// Whether the step keeps moving for as long as it is shown.
    pub fn loops_forever(&self) -> bool {
        self.run_ms().is_infinite()
    }

    /// Stops to play on reveal, starting from `current` for plain steps.
    pub fn play_frames(&self, current: AttributeSet) -> Keyframes {
        match &self.keyframes {
            Some(frames) => frames.clone(),
            None => Keyframes::between(current, self.to.clone()),
        }
    }
}

fn check_endpoints(step: &str, from: &AttributeSet, to: &AttributeSet) -> Result<()> {
    let only_from = from.keys_missing_from(to);
    let only_to = to.keys_missing_from(from);
    if !only_from.is_empty() || !only_to.is_empty() {
        return Err(RevealError::MismatchedKeys {
            step: step.to_string(),
            only_from,
            only_to,
        });
    }

    for (key, start) in from.iter() {
        if let Some(end) = to.get(key) {
            if !start.compatible_with(end) {
                return Err(RevealError::IncompatibleValues {
                    step: step.to_string(),
                    key,
                    from: start.to_string(),
                    to: end.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// How a tier's parent and children are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orchestration {
    /// Children start relative to the tier offset, alongside the parent.
    #[default]
    Together,
    /// Children wait until the parent has finished.
    #[serde(alias = "beforeChildren")]
    BeforeChildren,
}

/// A parent step and its staggered children.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Tier {
    pub parent: Option<AnimationStep>,
    pub children: Vec<AnimationStep>,
    /// Start offset of the whole tier after the trigger.
    pub delay_ms: f64,
    /// Extra wait before the first child.
    pub delay_children_ms: f64,
    /// Gap between successive children.
    pub stagger_ms: f64,
    pub when: Orchestration,
}

impl Tier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(mut self, parent: AnimationStep) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_child(mut self, child: AnimationStep) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = AnimationStep>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_delay_children(mut self, delay_ms: f64) -> Self {
        self.delay_children_ms = delay_ms;
        self
    }

    pub fn with_stagger(mut self, stagger_ms: f64) -> Self {
        self.stagger_ms = stagger_ms;
        self
    }

    pub fn with_when(mut self, when: Orchestration) -> Self {
        self.when = when;
        self
    }

    /// Number of steps in the tier, parent included.
    pub fn len(&self) -> usize {
        self.children.len() + usize::from(self.parent.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset at which child 0 starts before its own delay.
    ///
    /// An endlessly repeating parent holds children back for one iteration.
    pub fn children_base_ms(&self) -> f64 {
        let mut base = self.delay_ms + self.delay_children_ms;
        if self.when == Orchestration::BeforeChildren {
            if let Some(parent) = &self.parent {
                let run = if parent.loops_forever() {
                    parent.duration_ms
                } else {
                    parent.run_ms()
                };
                base += parent.delay_ms + run;
            }
        }
        base
    }
}

/// Position of a scheduled step within its tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
    Parent,
    Child(usize),
}

/// When a step starts relative to the visibility trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledStep {
    pub tier: usize,
    pub role: StepRole,
    pub step_id: String,
    pub start_ms: f64,
    /// One iteration.
    pub duration_ms: f64,
    /// All iterations; infinite for endless loops.
    pub run_ms: f64,
}

impl ScheduledStep {
    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.run_ms
    }
}

/// Ordered tiers of steps played once a region becomes visible.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SequencePlan {
    tiers: Vec<Tier>,
}

impl SequencePlan {
    /// Validate tier timings and step id uniqueness.
    pub fn new(tiers: Vec<Tier>) -> Result<Self> {
        let mut seen = HashSet::new();
        for tier in &tiers {
            check_timing("tier delay", tier.delay_ms)?;
            check_timing("delay children", tier.delay_children_ms)?;
            check_timing("stagger", tier.stagger_ms)?;
            for step in tier.parent.iter().chain(tier.children.iter()) {
                if !seen.insert(step.id.as_str()) {
                    return Err(RevealError::DuplicateStep(step.id.clone()));
                }
            }
        }
        Ok(Self { tiers })
    }

    /// A plan with no steps.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Single-tier plan: `children` staggered under an optional parent.
    pub fn staggered(
        parent: Option<AnimationStep>,
        children: Vec<AnimationStep>,
        stagger_ms: f64,
        delay_children_ms: f64,
    ) -> Result<Self> {
        let mut tier = Tier::new()
            .with_children(children)
            .with_stagger(stagger_ms)
            .with_delay_children(delay_children_ms);
        tier.parent = parent;
        Self::new(vec![tier])
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Total number of steps across all tiers.
    pub fn step_count(&self) -> usize {
        self.tiers.iter().map(Tier::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.step_count() == 0
    }

    /// Steps in schedule order: per tier, parent first, then children.
    pub fn steps(&self) -> impl Iterator<Item = &AnimationStep> {
        self.tiers
            .iter()
            .flat_map(|tier| tier.parent.iter().chain(tier.children.iter()))
    }

    pub fn step(&self, id: &str) -> Option<&AnimationStep> {
        self.steps().find(|step| step.id == id)
    }

    /// Compute start offsets for every step, in `steps()` order.
    pub fn schedule(&self) -> Vec<ScheduledStep> {
        let mut scheduled = Vec::with_capacity(self.step_count());
        for (tier_index, tier) in self.tiers.iter().enumerate() {
            if let Some(parent) = &tier.parent {
                scheduled.push(ScheduledStep {
                    tier: tier_index,
                    role: StepRole::Parent,
                    step_id: parent.id.clone(),
                    start_ms: tier.delay_ms + parent.delay_ms,
                    duration_ms: parent.duration_ms,
                    run_ms: parent.run_ms(),
                });
            }
            let base = tier.children_base_ms();
            for (index, child) in tier.children.iter().enumerate() {
                scheduled.push(ScheduledStep {
                    tier: tier_index,
                    role: StepRole::Child(index),
                    step_id: child.id.clone(),
                    start_ms: base + child.delay_ms + index as f64 * tier.stagger_ms,
                    duration_ms: child.duration_ms,
                    run_ms: child.run_ms(),
                });
            }
        }
        scheduled
    }

    /// Time from trigger until the last finite step settles.
    pub fn total_duration_ms(&self) -> f64 {
        self.schedule()
            .iter()
            .map(ScheduledStep::end_ms)
            .filter(|end| end.is_finite())
            .fold(0.0, f64::max)
    }
}

fn check_timing(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(RevealError::InvalidTiming { field, value })
    }
}
