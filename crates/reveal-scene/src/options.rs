//! Declarative reveal options and page descriptions.
//!
//! The shapes here follow variant objects as a page author writes them:
//!
//! ```json
//! {
//!   "threshold": 0.2,
//!   "once": true,
//!   "variants": {
//!     "hidden":  { "opacity": 0, "y": 20, "filter": "blur(5px)" },
//!     "visible": { "opacity": 1, "y": 0, "filter": "blur(0px)",
//!                  "transition": { "type": "spring", "bounce": 0.4, "duration": 0.8 } }
//!   },
//!   "items": ["card-1", "card-2", "card-3"],
//!   "stagger": 0.15,
//!   "delay": 0.3
//! }
//! ```
//!
//! Times are in seconds on this surface and converted to milliseconds when
//! building a `SequencePlan`.
//!
//! A visible attribute may also be a list of keyframes. Lists play one stop
//! per entry, evenly spaced unless the transition gives `times`, and
//! `repeat: "Infinity"` keeps them cycling while the section is shown:
//!
//! ```json
//! "visible": { "opacity": [0, 0.2, 0], "scale": [1, 1.1, 1],
//!              "transition": { "duration": 8, "repeat": "Infinity", "ease": "easeInOut" } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::animation::easing::EasingFunction;
use crate::animation::interpolate::Interpolate;
use crate::animation::keyframes::{Keyframes, Repeat, RepeatCount, RepeatType};
use crate::animation::plan::{AnimationStep, Orchestration, SequencePlan, StepTiming, Tier};
use crate::animation::sequencer::AnimationSequencer;
use crate::animation::spring::SpringConfig;
use crate::animation::types::{AttributeKey, AttributeSet, AttributeValue, RawValue};
use crate::error::{Result, RevealError};
use crate::observer::{RootMargin, ViewportRegion};
use crate::page::Page;
use crate::section::{ContentNode, MountMode, SectionRenderer};

/// Tween duration when a transition names none.
pub const DEFAULT_TWEEN_SECONDS: f64 = 0.3;
/// Spring duration when only `bounce` is given.
pub const DEFAULT_SPRING_SECONDS: f64 = 0.8;
/// Spring bounce when only `duration` is given.
pub const DEFAULT_BOUNCE: f64 = 0.25;

/// Kind of motion a transition describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Spring,
    Tween,
}

/// `ease` as a named curve or four bezier control values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EaseSpec {
    Named(String),
    Bezier([f64; 4]),
}

/// `repeat` as a whole count or `"Infinity"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepeatSpec {
    Count(f64),
    Named(String),
}

impl RepeatSpec {
    pub fn count(&self) -> Result<RepeatCount> {
        match self {
            Self::Count(n) if n.is_infinite() && *n > 0.0 => Ok(RepeatCount::Infinite),
            Self::Count(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX) => {
                Ok(RepeatCount::Times(*n as u32))
            }
            Self::Count(n) => Err(RevealError::InvalidRepeat(n.to_string())),
            Self::Named(name) => match name.to_ascii_lowercase().as_str() {
                "infinity" | "infinite" | "inf" => Ok(RepeatCount::Infinite),
                _ => Err(RevealError::InvalidRepeat(name.clone())),
            },
        }
    }
}

/// Transition block attached to a variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransitionOptions {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransitionKind>,
    pub duration: Option<f64>,
    pub delay: Option<f64>,
    pub ease: Option<EaseSpec>,
    pub bounce: Option<f64>,
    pub stiffness: Option<f64>,
    pub damping: Option<f64>,
    pub mass: Option<f64>,
    pub stagger_children: Option<f64>,
    pub delay_children: Option<f64>,
    pub when: Option<Orchestration>,
    pub repeat: Option<RepeatSpec>,
    pub repeat_type: Option<RepeatType>,
    pub repeat_delay: Option<f64>,
    /// Keyframe offsets from 0 to 1, one per keyframe.
    pub times: Option<Vec<f64>>,
}

impl TransitionOptions {
    /// Resolve into a validated step timing.
    ///
    /// Physical spring parameters win over `duration`/`bounce`. Without a
    /// `type`, any spring parameter selects a spring.
    pub fn timing(&self) -> Result<StepTiming> {
        let delay_ms = seconds("delay", self.delay.unwrap_or(0.0))?;
        let repeat = self.repeat()?;
        let physical = self.stiffness.is_some() || self.damping.is_some() || self.mass.is_some();
        let spring = match self.kind {
            Some(TransitionKind::Spring) => true,
            Some(TransitionKind::Tween) => false,
            None => physical || self.bounce.is_some(),
        };

        if spring {
            let config = if physical {
                let base = SpringConfig::default();
                SpringConfig::new(
                    self.stiffness.unwrap_or(base.stiffness),
                    self.damping.unwrap_or(base.damping),
                    self.mass.unwrap_or(base.mass),
                )?
            } else if self.duration.is_some() || self.bounce.is_some() {
                SpringConfig::from_duration_bounce(
                    seconds("duration", self.duration.unwrap_or(DEFAULT_SPRING_SECONDS))?,
                    self.bounce.unwrap_or(DEFAULT_BOUNCE),
                )?
            } else {
                SpringConfig::default()
            };
            return Ok(StepTiming::new(config.settle_duration_ms())
                .with_delay(delay_ms)
                .with_easing(EasingFunction::Spring(config))
                .with_repeat(repeat));
        }

        let easing = match &self.ease {
            None => EasingFunction::default(),
            Some(EaseSpec::Named(name)) => name.parse()?,
            Some(EaseSpec::Bezier([x1, y1, x2, y2])) => {
                EasingFunction::cubic_bezier(*x1, *y1, *x2, *y2)?
            }
        };
        let duration_ms = seconds("duration", self.duration.unwrap_or(DEFAULT_TWEEN_SECONDS))?;
        Ok(StepTiming::new(duration_ms)
            .with_delay(delay_ms)
            .with_easing(easing)
            .with_repeat(repeat))
    }

    fn repeat(&self) -> Result<Repeat> {
        let count = match &self.repeat {
            Some(spec) => spec.count()?,
            None => RepeatCount::default(),
        };
        Ok(Repeat {
            count,
            kind: self.repeat_type.unwrap_or_default(),
            delay_ms: seconds("repeatDelay", self.repeat_delay.unwrap_or(0.0))?,
        })
    }
}

/// Wire form of a variant attribute: one value, or one value per keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAttribute {
    Single(RawValue),
    Frames(Vec<RawValue>),
}

impl From<RawValue> for RawAttribute {
    fn from(value: RawValue) -> Self {
        Self::Single(value)
    }
}

/// A named attribute set, optionally carrying the transition into it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariantSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionOptions>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, RawAttribute>,
}

impl VariantSpec {
    /// Parse every attribute; unknown names and bad values are errors, and so
    /// are keyframe lists.
    pub fn attribute_set(&self) -> Result<AttributeSet> {
        self.attributes
            .iter()
            .map(|(name, raw)| {
                let key: AttributeKey = name.parse()?;
                match raw {
                    RawAttribute::Single(raw) => Ok((key, parse_value(name, key, raw)?)),
                    RawAttribute::Frames(_) => Err(RevealError::InvalidKeyframes(format!(
                        "`{name}` lists keyframes where a single value is expected"
                    ))),
                }
            })
            .collect()
    }

    /// Whether any attribute is a keyframe list.
    pub fn has_keyframes(&self) -> bool {
        self.attributes
            .values()
            .any(|raw| matches!(raw, RawAttribute::Frames(_)))
    }

    /// Expand the attributes into keyframes.
    ///
    /// Lists must share one length. A single value next to them ramps
    /// linearly from its `hidden` value, so it arrives on the last stop.
    pub fn keyframes(&self, hidden: &AttributeSet) -> Result<Keyframes> {
        let mut count = None;
        for (name, raw) in &self.attributes {
            if let RawAttribute::Frames(list) = raw {
                match count {
                    None => count = Some(list.len()),
                    Some(expected) if expected != list.len() => {
                        return Err(RevealError::InvalidKeyframes(format!(
                            "`{name}` has {} keyframes, expected {expected}",
                            list.len()
                        )));
                    }
                    Some(_) => {}
                }
            }
        }
        let count = count.unwrap_or(0);
        if count < 2 {
            return Err(RevealError::InvalidKeyframes(format!(
                "need at least two keyframes, got {count}"
            )));
        }

        let times = self.transition.as_ref().and_then(|t| t.times.as_deref());
        let offsets: Vec<f64> = match times {
            Some(times) => times.to_vec(),
            None => (0..count).map(|i| i as f64 / (count - 1) as f64).collect(),
        };

        let mut frames = vec![AttributeSet::new(); count];
        for (name, raw) in &self.attributes {
            let key: AttributeKey = name.parse()?;
            match raw {
                RawAttribute::Frames(list) => {
                    for (frame, raw) in frames.iter_mut().zip(list) {
                        frame.insert(key, parse_value(name, key, raw)?);
                    }
                }
                RawAttribute::Single(raw) => {
                    let target = parse_value(name, key, raw)?;
                    let start = hidden.get(key).unwrap_or(&target).clone();
                    for (index, frame) in frames.iter_mut().enumerate() {
                        let offset = offsets.get(index).copied().unwrap_or(1.0);
                        frame.insert(key, start.interpolate(&target, offset));
                    }
                }
            }
        }
        Keyframes::new(frames, times)
    }

    pub fn timing(&self) -> Result<StepTiming> {
        self.transition.clone().unwrap_or_default().timing()
    }
}

/// The `hidden` and `visible` endpoints of a reveal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantsSpec {
    pub hidden: VariantSpec,
    pub visible: VariantSpec,
}

impl VariantsSpec {
    /// Build the step that moves `id` from hidden to visible.
    ///
    /// With keyframes, hidden attributes the author left out rest at the
    /// first stop.
    pub fn step(&self, id: &str) -> Result<AnimationStep> {
        let mut hidden = self.hidden.attribute_set()?;
        let timing = self.visible.timing()?;
        if !self.visible.has_keyframes() {
            return AnimationStep::new(id, hidden, self.visible.attribute_set()?, timing);
        }

        let frames = self.visible.keyframes(&hidden)?;
        for (key, value) in frames.first().iter() {
            if !hidden.contains(key) {
                hidden.insert(key, value.clone());
            }
        }
        AnimationStep::with_keyframes(id, hidden, frames, timing)
    }
}

/// What one track animates and how its children are staggered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionOptions {
    /// Variants applied to the track itself, or to each item.
    pub variants: VariantsSpec,
    /// Variants of the wrapper when `items` are staggered under it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<VariantsSpec>,
    /// Step ids of staggered children.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    /// Seconds between children; falls back to the container's `staggerChildren`.
    pub stagger: Option<f64>,
    /// Seconds before the track starts.
    pub delay: f64,
}

impl MotionOptions {
    /// Build the plan for a track called `name`.
    ///
    /// Without items the track is a single step named after the track.
    /// With items, each item becomes a child step and the container (if any)
    /// becomes the parent step named after the track.
    pub fn plan(&self, name: &str) -> Result<SequencePlan> {
        let delay_ms = seconds("delay", self.delay)?;
        if self.items.is_empty() {
            let tier = Tier::new()
                .with_parent(self.variants.step(name)?)
                .with_delay(delay_ms);
            return SequencePlan::new(vec![tier]);
        }

        let container_transition = self
            .container
            .as_ref()
            .and_then(|c| c.visible.transition.clone())
            .unwrap_or_default();
        let stagger = self
            .stagger
            .or(container_transition.stagger_children)
            .unwrap_or(0.0);
        let delay_children = container_transition.delay_children.unwrap_or(0.0);

        let children = self
            .items
            .iter()
            .map(|id| self.variants.step(id))
            .collect::<Result<Vec<_>>>()?;

        let mut tier = Tier::new()
            .with_children(children)
            .with_delay(delay_ms)
            .with_stagger(seconds("stagger", stagger)?)
            .with_delay_children(seconds("delayChildren", delay_children)?)
            .with_when(container_transition.when.unwrap_or_default());
        if let Some(container) = &self.container {
            tier = tier.with_parent(container.step(name)?);
        }
        SequencePlan::new(vec![tier])
    }

    pub fn sequencer(&self, name: &str) -> Result<AnimationSequencer> {
        Ok(AnimationSequencer::new(name, self.plan(name)?))
    }
}

/// Region settings; omitted fields fall back to caller defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub once: Option<bool>,
    /// CSS margin shorthand, e.g. `"0px 0px -100px 0px"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
}

impl RegionOptions {
    pub fn resolve(&self, defaults: &ViewportRegion) -> Result<ViewportRegion> {
        let margin = match &self.margin {
            Some(text) => text.parse::<RootMargin>()?,
            None => defaults.margin,
        };
        Ok(ViewportRegion::new(
            self.threshold.unwrap_or(defaults.threshold),
            self.once.unwrap_or(defaults.once),
        )?
        .with_margin(margin))
    }
}

/// Options for a single-track reveal: `{ threshold, once, variants, stagger, delay }`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealOptions {
    #[serde(flatten)]
    pub region: RegionOptions,
    #[serde(flatten)]
    pub motion: MotionOptions,
}

impl RevealOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a section whose single track is named after the section.
    pub fn build_section(
        &self,
        id: &str,
        content: Vec<ContentNode>,
        mount_mode: MountMode,
    ) -> Result<SectionRenderer> {
        SectionRenderer::new(
            id,
            self.region.resolve(&ViewportRegion::default())?,
            vec![self.motion.sequencer(id)?],
            content,
            mount_mode,
        )
    }
}

/// A named track inside a section description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackOptions {
    pub name: String,
    #[serde(flatten)]
    pub motion: MotionOptions,
}

fn default_section_height() -> f64 {
    600.0
}

/// One section of a page description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDescription {
    pub id: String,
    #[serde(default = "default_section_height")]
    pub height: f64,
    #[serde(flatten)]
    pub region: RegionOptions,
    #[serde(default)]
    pub mount: MountMode,
    #[serde(default)]
    pub tracks: Vec<TrackOptions>,
    #[serde(default)]
    pub content: Vec<ContentNode>,
}

impl SectionDescription {
    pub fn build(&self, defaults: &ViewportRegion) -> Result<SectionRenderer> {
        let tracks = self
            .tracks
            .iter()
            .map(|track| track.motion.sequencer(&track.name))
            .collect::<Result<Vec<_>>>()?;
        SectionRenderer::new(
            self.id.clone(),
            self.region.resolve(defaults)?,
            tracks,
            self.content.clone(),
            self.mount,
        )
    }
}

/// A whole page: sections stacked top to bottom.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageDescription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub sections: Vec<SectionDescription>,
}

impl PageDescription {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build every section and stack them on a page of the given viewport.
    pub fn build(
        &self,
        viewport_width: f64,
        viewport_height: f64,
        defaults: &ViewportRegion,
    ) -> Result<Page> {
        let mut page = Page::new(viewport_width, viewport_height);
        for description in &self.sections {
            if !description.height.is_finite() || description.height < 0.0 {
                return Err(RevealError::InvalidTiming {
                    field: "height",
                    value: description.height,
                });
            }
            page.push_section(description.build(defaults)?, description.height);
        }
        Ok(page)
    }
}

fn parse_value(name: &str, key: AttributeKey, raw: &RawValue) -> Result<AttributeValue> {
    match raw {
        RawValue::Number(v) if v.is_finite() => Ok(AttributeValue::Number(*v)),
        RawValue::Number(v) => Err(RevealError::UnparseableValue {
            key: name.to_string(),
            value: v.to_string(),
        }),
        RawValue::Text(text) => AttributeValue::parse(key.name(), text),
    }
}

fn seconds(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value * 1000.0)
    } else {
        Err(RevealError::InvalidTiming { field, value })
    }
}
