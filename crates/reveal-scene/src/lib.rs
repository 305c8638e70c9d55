//! Scroll-triggered reveal sequencing.
//!
//! Sections observe their own visibility and, once they cross a threshold,
//! play declarative animation plans: a parent step, staggered children,
//! tween or spring easing, keyframes that may loop, and per-word text
//! reveals. The host drives everything from its frame
//! callback through [`Page::frame`] and applies styles via [`StyleTarget`].

pub mod animation;
pub mod error;
pub mod observer;
pub mod options;
pub mod page;
pub mod section;
pub mod text;

pub use animation::{
    AnimationSequencer, AnimationStep, AttributeKey, AttributeSet, AttributeValue, EasingFunction,
    Keyframes, Orchestration, Repeat, RepeatType, RevealEvent, SequenceEvent, SequencePhase,
    SequencePlan, SpringConfig, StepTiming, Tier,
};
pub use error::{Result, RevealError};
pub use observer::{Rect, RootMargin, ViewportRegion, VisibilityObserver, VisibilityState};
pub use options::{PageDescription, RevealOptions, SectionDescription, TrackOptions};
pub use page::{Page, PageSnapshot};
pub use section::{ContentNode, MountMode, RenderedSection, SectionRenderer, StyleTarget};
pub use text::{Segmentation, TextEffect, TextPreset};
