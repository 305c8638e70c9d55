//! Per-segment text reveals.
//!
//! A content node carrying a [`TextEffect`] has its text split into words,
//! characters or lines. Each segment becomes a child node bound to its own
//! step, and all steps share one staggered tier on a generated track named
//! `<node id>-text` unless the effect names one.
//!
//! ```json
//! { "id": "cta-title", "role": "heading", "text": "Start Building",
//!   "effect": { "preset": "fade-in-blur", "speedSegment": 0.25 } }
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::animation::plan::{AnimationStep, SequencePlan, StepTiming, Tier};
use crate::animation::sequencer::AnimationSequencer;
use crate::animation::types::{AttributeKey, AttributeSet, Dimension};
use crate::error::{Result, RevealError};
use crate::section::ContentNode;

/// Seconds one segment takes at `speedSegment: 1`.
pub const SEGMENT_SECONDS: f64 = 0.3;

/// How text is cut into segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segmentation {
    #[default]
    Word,
    /// Grapheme clusters, so combined characters move as one.
    Char,
    Line,
}

impl Segmentation {
    /// Seconds between segments at `speedReveal: 1`.
    pub fn default_stagger(self) -> f64 {
        match self {
            Self::Word => 0.05,
            Self::Char => 0.03,
            Self::Line => 0.1,
        }
    }

    /// Visible pieces of `text`; whitespace is never a segment.
    pub fn split(self, text: &str) -> Vec<&str> {
        match self {
            Self::Word => text.split_whitespace().collect(),
            Self::Char => text
                .graphemes(true)
                .filter(|g| !g.trim().is_empty())
                .collect(),
            Self::Line => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect(),
        }
    }
}

/// Named hidden/visible pair for each segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextPreset {
    #[default]
    Fade,
    Blur,
    FadeInBlur,
    Scale,
    Slide,
}

impl TextPreset {
    /// The `(hidden, visible)` attribute sets.
    pub fn variants(self) -> (AttributeSet, AttributeSet) {
        let blur = |px: f64| Dimension::new(px, "px").with_function("blur");
        let hidden = AttributeSet::new().with(AttributeKey::Opacity, 0.0);
        let visible = AttributeSet::new().with(AttributeKey::Opacity, 1.0);
        match self {
            Self::Fade => (hidden, visible),
            Self::Blur => (
                hidden.with(AttributeKey::Filter, blur(12.0)),
                visible.with(AttributeKey::Filter, blur(0.0)),
            ),
            Self::FadeInBlur => (
                hidden
                    .with(AttributeKey::Y, 20.0)
                    .with(AttributeKey::Filter, blur(12.0)),
                visible
                    .with(AttributeKey::Y, 0.0)
                    .with(AttributeKey::Filter, blur(0.0)),
            ),
            Self::Scale => (
                hidden.with(AttributeKey::Scale, 0.0),
                visible.with(AttributeKey::Scale, 1.0),
            ),
            Self::Slide => (
                hidden.with(AttributeKey::Y, 20.0),
                visible.with(AttributeKey::Y, 0.0),
            ),
        }
    }
}

/// Segment-by-segment reveal of a node's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextEffect {
    pub preset: TextPreset,
    pub per: Segmentation,
    /// Divides the gap between segments.
    pub speed_reveal: f64,
    /// Divides each segment's duration.
    pub speed_segment: f64,
    /// Seconds before the first segment.
    pub delay: f64,
    /// Track to generate; defaults to `<node id>-text`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
}

impl Default for TextEffect {
    fn default() -> Self {
        Self {
            preset: TextPreset::default(),
            per: Segmentation::default(),
            speed_reveal: 1.0,
            speed_segment: 1.0,
            delay: 0.0,
            track: None,
        }
    }
}

/// One generated piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub id: String,
    pub text: String,
}

impl TextEffect {
    pub fn track_name(&self, node_id: &str) -> String {
        self.track
            .clone()
            .unwrap_or_else(|| format!("{node_id}-text"))
    }

    pub fn stagger_ms(&self) -> Result<f64> {
        let speed = speed("speedReveal", self.speed_reveal)?;
        Ok(self.per.default_stagger() / speed * 1000.0)
    }

    pub fn segment_ms(&self) -> Result<f64> {
        let speed = speed("speedSegment", self.speed_segment)?;
        Ok(SEGMENT_SECONDS / speed * 1000.0)
    }

    /// Cut `text` into segments with ids `<node id>-<index>`.
    pub fn segments(&self, node_id: &str, text: &str) -> Vec<TextSegment> {
        self.per
            .split(text)
            .into_iter()
            .enumerate()
            .map(|(index, piece)| TextSegment {
                id: format!("{node_id}-{index}"),
                text: piece.to_string(),
            })
            .collect()
    }

    /// One tier with a staggered child step per segment.
    pub fn plan(&self, segments: &[TextSegment]) -> Result<SequencePlan> {
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(RevealError::InvalidTiming {
                field: "delay",
                value: self.delay,
            });
        }
        let (hidden, visible) = self.preset.variants();
        let timing = StepTiming::new(self.segment_ms()?);
        let children = segments
            .iter()
            .map(|segment| AnimationStep::new(&segment.id, hidden.clone(), visible.clone(), timing))
            .collect::<Result<Vec<_>>>()?;
        let tier = Tier::new()
            .with_children(children)
            .with_stagger(self.stagger_ms()?)
            .with_delay(self.delay * 1000.0);
        SequencePlan::new(vec![tier])
    }
}

fn speed(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(RevealError::InvalidTiming { field, value })
    }
}

/// Replace every text effect in `nodes` with bound segment children and
/// return the tracks that drive them.
pub fn expand_text_effects(nodes: &mut [ContentNode]) -> Result<Vec<AnimationSequencer>> {
    let mut tracks = Vec::new();
    for node in nodes.iter_mut() {
        tracks.extend(expand_text_effects(&mut node.children)?);
        let Some(effect) = node.effect.take() else {
            continue;
        };

        // The node keeps its full text; segments carry the pieces.
        let text = node.text.clone().unwrap_or_default();
        let track = effect.track_name(&node.id);
        let segments = effect.segments(&node.id, &text);
        let plan = effect.plan(&segments)?;
        debug!(node = %node.id, %track, segments = segments.len(), "text effect expanded");

        for segment in segments {
            let child = ContentNode::new(segment.id.clone(), "segment")
                .with_text(segment.text)
                .bound_to(track.clone(), segment.id);
            node.children.push(child);
        }
        tracks.push(AnimationSequencer::new(track, plan));
    }
    Ok(tracks)
}
