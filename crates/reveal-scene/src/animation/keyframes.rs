//! Multi-stop keyframes and repetition.
//!
//! This module provides:
//! - `Keyframes`: ordered attribute sets at offsets from 0.0 to 1.0
//! - `Repeat`: how many extra iterations a step plays, and in which direction
//!
//! A plain step is the two-stop case `[from, to]`. Variants written as lists,
//! e.g. `opacity: [0, 0.2, 0]`, become one stop per list entry, evenly spaced
//! unless explicit `times` are given. Easing applies to each segment between
//! two stops.

use serde::{Deserialize, Serialize};

use super::easing::EasingFunction;
use super::interpolate::Interpolate;
use super::types::AttributeSet;
use crate::error::{Result, RevealError};

/// How many times a step repeats after its first iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatCount {
    /// Repeat a fixed number of times; `Times(0)` plays once.
    Times(u32),
    /// Repeat until torn down or reversed.
    Infinite,
}

impl Default for RepeatCount {
    fn default() -> Self {
        Self::Times(0)
    }
}

impl RepeatCount {
    /// Check if another iteration follows `iteration` (zero-based).
    pub fn should_continue(&self, iteration: u32) -> bool {
        match self {
            Self::Infinite => true,
            Self::Times(count) => iteration < *count,
        }
    }
}

/// Direction of repeated iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatType {
    /// Restart from the first stop every iteration.
    #[default]
    Loop,
    /// Play odd iterations backwards in time, easing included.
    Reverse,
    /// Play odd iterations with the stops swapped, easing unchanged.
    Mirror,
}

impl RepeatType {
    /// Whether a specific iteration runs against the stop order.
    pub fn is_reversed(self, iteration: u32) -> bool {
        match self {
            Self::Loop => false,
            Self::Reverse | Self::Mirror => iteration % 2 == 1,
        }
    }
}

/// Repetition of a step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Repeat {
    pub count: RepeatCount,
    pub kind: RepeatType,
    /// Pause between iterations, holding the end value.
    pub delay_ms: f64,
}

impl Repeat {
    /// Play once.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn times(count: u32) -> Self {
        Self {
            count: RepeatCount::Times(count),
            ..Self::default()
        }
    }

    pub fn infinite() -> Self {
        Self {
            count: RepeatCount::Infinite,
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: RepeatType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn is_none(&self) -> bool {
        self.count == RepeatCount::Times(0)
    }

    pub fn is_infinite(&self) -> bool {
        self.count == RepeatCount::Infinite
    }

    /// Time from the first start to the end of the last iteration.
    ///
    /// Endless repetition of a non-empty iteration never ends.
    pub fn run_ms(&self, duration_ms: f64) -> f64 {
        match self.count {
            RepeatCount::Infinite if duration_ms > 0.0 => f64::INFINITY,
            RepeatCount::Infinite => 0.0,
            RepeatCount::Times(count) => {
                let count = f64::from(count);
                duration_ms * (count + 1.0) + self.delay_ms * count
            }
        }
    }

    /// Index of the final iteration.
    pub fn last_iteration(&self) -> u32 {
        match self.count {
            RepeatCount::Times(count) => count,
            RepeatCount::Infinite => 0,
        }
    }

    /// Iteration index and time inside it, `active_ms` after the first start.
    ///
    /// Time spent in a repeat delay reports the end of the iteration before it.
    pub fn locate(&self, duration_ms: f64, active_ms: f64) -> (u32, f64) {
        let period = duration_ms + self.delay_ms;
        if period <= 0.0 || active_ms <= 0.0 {
            return (0, active_ms.max(0.0).min(duration_ms));
        }
        let mut iteration = (active_ms / period).floor();
        if let RepeatCount::Times(count) = self.count {
            iteration = iteration.min(f64::from(count));
        }
        let local = (active_ms - iteration * period).min(duration_ms);
        (iteration as u32, local)
    }
}

/// One stop of a keyframe list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyframe {
    /// Position in the iteration (0.0 to 1.0).
    pub offset: f64,
    pub value: AttributeSet,
}

/// Ordered stops, always at least two, starting at 0.0 and ending at 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Keyframes {
    frames: Vec<Keyframe>,
}

impl Keyframes {
    /// The two-stop list of a plain transition.
    pub fn between(from: AttributeSet, to: AttributeSet) -> Self {
        Self {
            frames: vec![
                Keyframe {
                    offset: 0.0,
                    value: from,
                },
                Keyframe {
                    offset: 1.0,
                    value: to,
                },
            ],
        }
    }

    /// Build stops from `values`, evenly spaced unless `times` are given.
    ///
    /// `times` must match `values` in length, start at 0, end at 1 and never
    /// decrease.
    pub fn new(values: Vec<AttributeSet>, times: Option<&[f64]>) -> Result<Self> {
        if values.len() < 2 {
            return Err(RevealError::InvalidKeyframes(format!(
                "need at least two keyframes, got {}",
                values.len()
            )));
        }
        let last = (values.len() - 1) as f64;
        let offsets: Vec<f64> = match times {
            None => (0..values.len()).map(|i| i as f64 / last).collect(),
            Some(times) => {
                check_times(times, values.len())?;
                times.to_vec()
            }
        };
        let frames = offsets
            .into_iter()
            .zip(values)
            .map(|(offset, value)| Keyframe { offset, value })
            .collect();
        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[Keyframe] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first(&self) -> &AttributeSet {
        &self.frames[0].value
    }

    pub fn last(&self) -> &AttributeSet {
        &self.frames[self.frames.len() - 1].value
    }

    /// The same stops played from the end.
    pub fn reversed(&self) -> Self {
        Self {
            frames: self
                .frames
                .iter()
                .rev()
                .map(|frame| Keyframe {
                    offset: 1.0 - frame.offset,
                    value: frame.value.clone(),
                })
                .collect(),
        }
    }

    /// Value at linear time fraction `progress` of an iteration lasting
    /// `duration_ms`.
    ///
    /// Two stops sample the easing by elapsed time, so springs keep their
    /// physical timing. Longer lists ease each segment separately.
    pub fn sample(
        &self,
        progress: f64,
        easing: &EasingFunction,
        duration_ms: f64,
    ) -> AttributeSet {
        if progress <= 0.0 {
            return self.first().clone();
        }
        if progress >= 1.0 {
            return self.last().clone();
        }
        if self.frames.len() == 2 {
            let eased = easing.sample(progress * duration_ms, duration_ms);
            return blend(self.first(), self.last(), eased);
        }

        let segment = self
            .frames
            .windows(2)
            .position(|pair| progress < pair[1].offset)
            .unwrap_or(self.frames.len() - 2);
        let (start, end) = (&self.frames[segment], &self.frames[segment + 1]);
        let span = end.offset - start.offset;
        let local = if span > 0.0 {
            (progress - start.offset) / span
        } else {
            1.0
        };
        blend(&start.value, &end.value, easing.evaluate(local))
    }
}

fn blend(from: &AttributeSet, to: &AttributeSet, t: f64) -> AttributeSet {
    if t == 1.0 {
        to.clone()
    } else {
        from.interpolate(to, t)
    }
}

fn check_times(times: &[f64], count: usize) -> Result<()> {
    let invalid = |reason: &str| {
        Err(RevealError::InvalidKeyframes(format!(
            "times {times:?}: {reason}"
        )))
    };
    if times.len() != count {
        return invalid("length differs from the keyframe count");
    }
    if times.iter().any(|t| !(0.0..=1.0).contains(t)) {
        return invalid("offsets must lie within [0, 1]");
    }
    if times.first() != Some(&0.0) || times.last() != Some(&1.0) {
        return invalid("must start at 0 and end at 1");
    }
    if times.windows(2).any(|pair| pair[1] < pair[0]) {
        return invalid("offsets must not decrease");
    }
    Ok(())
}
