//! Animation core for scroll-triggered reveals.
//!
//! This module provides:
//! - **Attribute values**: opacity, offsets, scale, rotation, blur and size
//! - **Easing functions**: CSS timing curves and analytic springs
//! - **Sequence plans**: tiers of parent and staggered child steps
//! - **Sequencer**: visibility-driven playback of a plan
//!
//! # Architecture
//!
//! ```text
//! AnimationSequencer
//!   ├── SequencePlan (tiers → schedule of start offsets)
//!   └── ActiveTransition per step (keyframes, eased, repeated)
//! ```

pub mod easing;
pub mod events;
pub mod interpolate;
pub mod keyframes;
pub mod plan;
pub mod sequencer;
pub mod spring;
pub mod transition;
pub mod types;

pub use easing::EasingFunction;
pub use events::{EventQueue, RevealEvent, SequenceEvent};
pub use interpolate::Interpolate;
pub use keyframes::{Keyframe, Keyframes, Repeat, RepeatCount, RepeatType};
pub use plan::{
    AnimationStep, Orchestration, ScheduledStep, SequencePlan, StepRole, StepTiming, Tier,
};
pub use sequencer::{AnimationSequencer, SequencePhase};
pub use spring::SpringConfig;
pub use transition::ActiveTransition;
pub use types::{AnimationState, AttributeKey, AttributeSet, AttributeValue, Dimension, RawValue};
