//! Scroll-triggered sections.
//!
//! A `SectionRenderer` owns one visibility observer and any number of named
//! animation tracks. Content nodes bind to a `(track, step)` pair; every frame
//! the section pushes the bound step's current attributes to a `StyleTarget`.
//! Nodes with a text effect are expanded into per-segment children and a
//! generated track when the section is built.
//!
//! ```text
//! intersection sample ─▶ VisibilityObserver ─▶ tracks[*].set_visibility
//! frame tick          ─▶ tracks[*].update   ─▶ StyleTarget::apply
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::animation::events::{EventQueue, RevealEvent};
use crate::animation::sequencer::{AnimationSequencer, SequencePhase};
use crate::animation::types::AttributeSet;
use crate::error::{Result, RevealError};
use crate::observer::{ViewportRegion, VisibilityObserver, VisibilityState};
use crate::text::{TextEffect, expand_text_effects};

/// Receives style updates for bound content nodes.
pub trait StyleTarget {
    fn apply(&mut self, section: &str, node: &str, attributes: &AttributeSet);
}

impl<F> StyleTarget for F
where
    F: FnMut(&str, &str, &AttributeSet),
{
    fn apply(&mut self, section: &str, node: &str, attributes: &AttributeSet) {
        self(section, node, attributes)
    }
}

/// When the section's content enters the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountMode {
    /// Content is present from the start, styled with the hidden variant.
    #[default]
    Always,
    /// Content is mounted the first time the section becomes visible.
    WhenVisible,
}

/// Link from a content node to the step that animates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub track: String,
    pub step: String,
}

/// Static content supplied by the page author.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentNode {
    pub id: String,
    /// Free-form role such as `heading`, `card` or `button`.
    pub role: String,
    pub text: Option<String>,
    pub animate: Option<Binding>,
    /// Reveal the text segment by segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<TextEffect>,
    pub children: Vec<ContentNode>,
}

impl ContentNode {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn bound_to(mut self, track: impl Into<String>, step: impl Into<String>) -> Self {
        self.animate = Some(Binding {
            track: track.into(),
            step: step.into(),
        });
        self
    }

    pub fn with_effect(mut self, effect: TextEffect) -> Self {
        self.effect = Some(effect);
        self
    }

    pub fn with_child(mut self, child: ContentNode) -> Self {
        self.children.push(child);
        self
    }
}

/// A content node with its current style.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedNode {
    pub id: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<AttributeSet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderedNode>,
}

/// Snapshot of a section for the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedSection {
    pub id: String,
    pub visibility: VisibilityState,
    pub mounted: bool,
    pub tracks: Vec<(String, SequencePhase)>,
    pub nodes: Vec<RenderedNode>,
}

impl RenderedSection {
    /// Find a rendered node anywhere in the tree.
    pub fn node(&self, id: &str) -> Option<&RenderedNode> {
        fn find<'a>(nodes: &'a [RenderedNode], id: &str) -> Option<&'a RenderedNode> {
            nodes.iter().find_map(|node| {
                if node.id == id {
                    Some(node)
                } else {
                    find(&node.children, id)
                }
            })
        }
        find(&self.nodes, id)
    }
}

/// A page region that reveals its content when scrolled into view.
#[derive(Debug)]
pub struct SectionRenderer {
    id: String,
    observer: VisibilityObserver,
    tracks: Vec<AnimationSequencer>,
    content: Vec<ContentNode>,
    mount_mode: MountMode,
    children_mounted: bool,
    mounted: bool,
    /// Styles must be pushed on the next frame even if nothing moves.
    dirty: bool,
    events: EventQueue<RevealEvent>,
}

impl SectionRenderer {
    /// Build a section, expanding text effects and checking every content
    /// binding.
    pub fn new(
        id: impl Into<String>,
        region: ViewportRegion,
        mut tracks: Vec<AnimationSequencer>,
        mut content: Vec<ContentNode>,
        mount_mode: MountMode,
    ) -> Result<Self> {
        let id = id.into();
        tracks.extend(expand_text_effects(&mut content)?);
        let mut names = std::collections::HashSet::new();
        for track in &tracks {
            if !names.insert(track.name()) {
                return Err(RevealError::DuplicateTrack(track.name().to_string()));
            }
        }
        check_bindings(&content, &tracks)?;
        debug!(section = %id, tracks = tracks.len(), ?mount_mode, "section created");

        Ok(Self {
            id,
            observer: VisibilityObserver::new(region),
            tracks,
            content,
            mount_mode,
            children_mounted: mount_mode == MountMode::Always,
            mounted: true,
            dirty: true,
            events: EventQueue::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn region(&self) -> &ViewportRegion {
        self.observer.region()
    }

    pub fn visibility(&self) -> VisibilityState {
        self.observer.state()
    }

    pub fn mount_mode(&self) -> MountMode {
        self.mount_mode
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn children_mounted(&self) -> bool {
        self.mounted && self.children_mounted
    }

    pub fn track(&self, name: &str) -> Option<&AnimationSequencer> {
        self.tracks.iter().find(|t| t.name() == name)
    }

    pub fn tracks(&self) -> &[AnimationSequencer] {
        &self.tracks
    }

    pub fn content(&self) -> &[ContentNode] {
        &self.content
    }

    pub fn is_animating(&self) -> bool {
        self.mounted && self.tracks.iter().any(AnimationSequencer::is_animating)
    }

    /// Whether any track keeps an endless loop running.
    pub fn is_looping(&self) -> bool {
        self.mounted && self.tracks.iter().any(AnimationSequencer::is_looping)
    }

    /// Feed an intersection sample for the section's region.
    ///
    /// Returns the new visibility when it changed.
    pub fn on_intersection(&mut self, sample: Option<f64>) -> Option<VisibilityState> {
        if !self.mounted {
            return None;
        }
        let state = self.observer.evaluate(sample)?;
        info!(section = %self.id, ?state, "visibility changed");
        self.events.push(RevealEvent::Visibility {
            section: self.id.clone(),
            state,
        });

        if state.is_visible() && !self.children_mounted {
            self.children_mounted = true;
            self.events.push(RevealEvent::ChildrenMounted {
                section: self.id.clone(),
            });
        }
        for track in &mut self.tracks {
            track.set_visibility(state);
        }
        self.collect_track_events();
        self.dirty = true;
        Some(state)
    }

    /// Advance every track and push current styles to `target`.
    ///
    /// Returns `true` while any track is still heading for rest. Loops keep
    /// pushing styles but do not count.
    pub fn on_frame(&mut self, delta_ms: f64, target: &mut impl StyleTarget) -> bool {
        if !self.mounted {
            return false;
        }
        let was_animating = self
            .tracks
            .iter()
            .any(|track| track.is_animating() || track.is_looping());
        for track in &mut self.tracks {
            track.update(delta_ms);
        }
        self.collect_track_events();

        if self.children_mounted && (self.dirty || was_animating) {
            apply_styles(&self.id, &self.content, &self.tracks, target);
            self.dirty = false;
        }
        self.is_animating()
    }

    /// Current view of the section's content.
    pub fn render(&self) -> RenderedSection {
        let nodes = if self.children_mounted() {
            render_nodes(&self.content, &self.tracks)
        } else {
            Vec::new()
        };
        RenderedSection {
            id: self.id.clone(),
            visibility: self.visibility(),
            mounted: self.children_mounted(),
            tracks: self
                .tracks
                .iter()
                .map(|t| (t.name().to_string(), t.phase()))
                .collect(),
            nodes,
        }
    }

    /// Tear down: stop observing and cancel every track.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.observer.disconnect();
        for track in &mut self.tracks {
            track.cancel();
        }
        self.collect_track_events();
        self.mounted = false;
        self.events.push(RevealEvent::Unmounted {
            section: self.id.clone(),
        });
        debug!(section = %self.id, "section unmounted");
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = RevealEvent> + '_ {
        self.events.drain()
    }

    fn collect_track_events(&mut self) {
        for track in &mut self.tracks {
            if !track.has_pending_events() {
                continue;
            }
            let name = track.name().to_string();
            for event in track.drain_events() {
                self.events.push(RevealEvent::Sequence {
                    section: self.id.clone(),
                    track: name.clone(),
                    event,
                });
            }
        }
    }
}

fn check_bindings(nodes: &[ContentNode], tracks: &[AnimationSequencer]) -> Result<()> {
    for node in nodes {
        if let Some(binding) = &node.animate {
            let track = tracks
                .iter()
                .find(|t| t.name() == binding.track)
                .ok_or_else(|| RevealError::UnknownBinding {
                    node: node.id.clone(),
                    what: "track",
                    name: binding.track.clone(),
                })?;
            if track.plan().step(&binding.step).is_none() {
                return Err(RevealError::UnknownBinding {
                    node: node.id.clone(),
                    what: "step",
                    name: binding.step.clone(),
                });
            }
        }
        check_bindings(&node.children, tracks)?;
    }
    Ok(())
}

fn bound_style(binding: Option<&Binding>, tracks: &[AnimationSequencer]) -> Option<AttributeSet> {
    let binding = binding?;
    tracks
        .iter()
        .find(|t| t.name() == binding.track)?
        .current_value(&binding.step)
}

fn apply_styles(
    section: &str,
    nodes: &[ContentNode],
    tracks: &[AnimationSequencer],
    target: &mut impl StyleTarget,
) {
    for node in nodes {
        if let Some(style) = bound_style(node.animate.as_ref(), tracks) {
            target.apply(section, &node.id, &style);
        }
        apply_styles(section, &node.children, tracks, target);
    }
}

fn render_nodes(nodes: &[ContentNode], tracks: &[AnimationSequencer]) -> Vec<RenderedNode> {
    nodes
        .iter()
        .map(|node| RenderedNode {
            id: node.id.clone(),
            role: node.role.clone(),
            text: node.text.clone(),
            style: bound_style(node.animate.as_ref(), tracks),
            children: render_nodes(&node.children, tracks),
        })
        .collect()
}

static_assertions::assert_impl_all!(SectionRenderer: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::easing::EasingFunction;
    use crate::animation::events::SequenceEvent;
    use crate::animation::keyframes::{Keyframes, Repeat};
    use crate::animation::plan::{AnimationStep, SequencePlan, StepTiming, Tier};
    use crate::animation::types::AttributeKey;
    use crate::text::TextPreset;

    fn fade_track(name: &str, duration_ms: f64) -> AnimationSequencer {
        let step = AnimationStep::new(
            name,
            AttributeSet::new().with(AttributeKey::Opacity, 0.0),
            AttributeSet::new().with(AttributeKey::Opacity, 1.0),
            StepTiming::new(duration_ms).with_easing(EasingFunction::Linear),
        )
        .unwrap();
        let plan = SequencePlan::new(vec![Tier::new().with_parent(step)]).unwrap();
        AnimationSequencer::new(name, plan)
    }

    fn section(mount_mode: MountMode) -> SectionRenderer {
        SectionRenderer::new(
            "hero",
            ViewportRegion::new(0.2, true).unwrap(),
            vec![fade_track("title", 100.0)],
            vec![ContentNode::new("h1", "heading")
                .with_text("Hello")
                .bound_to("title", "title")],
            mount_mode,
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_binding_is_rejected() {
        let err = SectionRenderer::new(
            "s",
            ViewportRegion::default(),
            vec![fade_track("title", 100.0)],
            vec![ContentNode::new("n", "text").bound_to("title", "missing")],
            MountMode::Always,
        )
        .unwrap_err();
        assert!(matches!(err, RevealError::UnknownBinding { what: "step", .. }));

        let err = SectionRenderer::new(
            "s",
            ViewportRegion::default(),
            vec![],
            vec![ContentNode::new("n", "text").with_child(
                ContentNode::new("inner", "text").bound_to("nope", "x"),
            )],
            MountMode::Always,
        )
        .unwrap_err();
        assert!(matches!(err, RevealError::UnknownBinding { what: "track", .. }));
    }

    #[test]
    fn test_hidden_variant_pushed_before_visible() {
        let mut section = section(MountMode::Always);
        let mut pushed = Vec::new();
        let mut target = |_: &str, node: &str, attrs: &AttributeSet| {
            pushed.push((node.to_string(), attrs.get_f64(AttributeKey::Opacity)));
        };
        section.on_frame(16.0, &mut target);
        section.on_frame(16.0, &mut target);
        assert_eq!(pushed, vec![("h1".to_string(), Some(0.0))]);
    }

    #[test]
    fn test_reveal_then_complete() {
        let mut section = section(MountMode::Always);
        let mut ignore = |_: &str, _: &str, _: &AttributeSet| {};
        let opacity = |section: &SectionRenderer| {
            section.render().node("h1")?.style.as_ref()?.get_f64(AttributeKey::Opacity)
        };

        assert_eq!(section.on_intersection(Some(0.5)), Some(VisibilityState::Visible));
        section.on_frame(50.0, &mut ignore);
        assert!((opacity(&section).unwrap() - 0.5).abs() < 1e-9);
        assert!(!section.on_frame(50.0, &mut ignore));
        assert_eq!(opacity(&section), Some(1.0));

        let events: Vec<_> = section.drain_events().collect();
        assert!(events.iter().any(RevealEvent::is_completed));
    }

    #[test]
    fn test_deferred_mount() {
        let mut section = section(MountMode::WhenVisible);
        assert!(section.render().nodes.is_empty());

        section.on_intersection(Some(1.0));
        let rendered = section.render();
        assert!(rendered.mounted);
        assert_eq!(rendered.node("h1").unwrap().text.as_deref(), Some("Hello"));

        let events: Vec<_> = section.drain_events().collect();
        assert!(events.contains(&RevealEvent::ChildrenMounted {
            section: "hero".to_string()
        }));
    }

    #[test]
    fn test_unmount_stops_updates() {
        let mut section = section(MountMode::Always);
        section.on_intersection(Some(1.0));
        section.on_frame(30.0, &mut |_: &str, _: &str, _: &AttributeSet| {});
        section.unmount();

        let mut calls = 0;
        section.on_frame(30.0, &mut |_: &str, _: &str, _: &AttributeSet| calls += 1);
        assert_eq!(calls, 0);
        assert_eq!(section.on_intersection(Some(1.0)), None);

        let events: Vec<_> = section.drain_events().collect();
        assert!(events.contains(&RevealEvent::Sequence {
            section: "hero".to_string(),
            track: "title".to_string(),
            event: SequenceEvent::Cancelled,
        }));
        assert_eq!(
            events.last(),
            Some(&RevealEvent::Unmounted {
                section: "hero".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_track_names() {
        let err = SectionRenderer::new(
            "s",
            ViewportRegion::default(),
            vec![fade_track("title", 100.0), fade_track("title", 200.0)],
            vec![],
            MountMode::Always,
        )
        .unwrap_err();
        assert_eq!(err, RevealError::DuplicateTrack("title".to_string()));

        // A generated text track clashes with an authored one of the same name.
        let err = SectionRenderer::new(
            "s",
            ViewportRegion::default(),
            vec![fade_track("h1-text", 100.0)],
            vec![ContentNode::new("h1", "heading")
                .with_text("Hi")
                .with_effect(TextEffect::default())],
            MountMode::Always,
        )
        .unwrap_err();
        assert_eq!(err, RevealError::DuplicateTrack("h1-text".to_string()));
    }

    #[test]
    fn test_text_effect_reveals_words_in_turn() {
        let effect = TextEffect {
            preset: TextPreset::FadeInBlur,
            ..Default::default()
        };
        let mut section = SectionRenderer::new(
            "cta",
            ViewportRegion::default(),
            vec![],
            vec![ContentNode::new("cta-title", "heading")
                .with_text("Start Building")
                .with_effect(effect)],
            MountMode::Always,
        )
        .unwrap();
        let track = section.track("cta-title-text").unwrap();
        assert_eq!(track.schedule()[1].start_ms, 50.0);

        let mut ignore = |_: &str, _: &str, _: &AttributeSet| {};
        section.on_intersection(Some(1.0));
        section.on_frame(40.0, &mut ignore);
        let rendered = section.render();
        let first = rendered.node("cta-title-0").unwrap().style.clone().unwrap();
        let second = rendered.node("cta-title-1").unwrap().style.clone().unwrap();
        assert!(first.get_f64(AttributeKey::Opacity).unwrap() > 0.0);
        assert_eq!(second.get_f64(AttributeKey::Opacity), Some(0.0));

        while section.on_frame(16.0, &mut ignore) {}
        let second = section.render().node("cta-title-1").unwrap().style.clone().unwrap();
        assert_eq!(second.get_f64(AttributeKey::Y), Some(0.0));
    }

    #[test]
    fn test_loops_push_styles_after_settling() {
        let frames = Keyframes::new(
            vec![
                AttributeSet::new().with(AttributeKey::Opacity, 0.0),
                AttributeSet::new().with(AttributeKey::Opacity, 0.3),
                AttributeSet::new().with(AttributeKey::Opacity, 0.0),
            ],
            None,
        )
        .unwrap();
        let pulse = AnimationStep::with_keyframes(
            "pulse",
            AttributeSet::new().with(AttributeKey::Opacity, 0.0),
            frames,
            StepTiming::new(2000.0).with_repeat(Repeat::infinite()),
        )
        .unwrap();
        let plan = SequencePlan::new(vec![Tier::new().with_parent(pulse)]).unwrap();
        let mut section = SectionRenderer::new(
            "cta",
            ViewportRegion::default(),
            vec![AnimationSequencer::new("pulse", plan)],
            vec![ContentNode::new("glow", "decoration").bound_to("pulse", "pulse")],
            MountMode::Always,
        )
        .unwrap();

        section.on_intersection(Some(1.0));
        let mut pushes = 0;
        assert!(!section.on_frame(16.0, &mut |_: &str, _: &str, _: &AttributeSet| pushes += 1));
        assert!(!section.on_frame(16.0, &mut |_: &str, _: &str, _: &AttributeSet| pushes += 1));
        assert_eq!(pushes, 2);
        assert!(section.is_looping());
        assert!(!section.is_animating());

        section.unmount();
        let events: Vec<_> = section.drain_events().collect();
        assert!(events.contains(&RevealEvent::Sequence {
            section: "cta".to_string(),
            track: "pulse".to_string(),
            event: SequenceEvent::Cancelled,
        }));
    }
}
