use anyhow::Result;
use reveal_scene::{
    AnimationSequencer, AnimationStep, AttributeKey, AttributeSet, ContentNode, EasingFunction,
    Keyframes, MountMode, Repeat, SectionRenderer, SequencePlan, SpringConfig, StepTiming, Tier,
    ViewportRegion, VisibilityObserver, VisibilityState,
};

fn opacity_step(id: &str, duration_ms: f64, easing: EasingFunction) -> Result<AnimationStep> {
    Ok(AnimationStep::new(
        id,
        AttributeSet::new().with(AttributeKey::Opacity, 0.0),
        AttributeSet::new().with(AttributeKey::Opacity, 1.0),
        StepTiming::new(duration_ms).with_easing(easing),
    )?)
}

fn fade_section(duration_ms: f64, threshold: f64) -> Result<SectionRenderer> {
    let plan = SequencePlan::new(vec![
        Tier::new().with_parent(opacity_step("fade", duration_ms, EasingFunction::Linear)?),
    ])?;
    Ok(SectionRenderer::new(
        "section",
        ViewportRegion::new(threshold, true)?,
        vec![AnimationSequencer::new("fade", plan)],
        vec![ContentNode::new("body", "text").bound_to("fade", "fade")],
        MountMode::Always,
    )?)
}

/// Collects every style push as `(node, opacity)`.
#[derive(Default)]
struct Recorder {
    pushes: Vec<(String, f64)>,
}

impl reveal_scene::StyleTarget for Recorder {
    fn apply(&mut self, _section: &str, node: &str, attributes: &AttributeSet) {
        let opacity = attributes.get_f64(AttributeKey::Opacity).unwrap_or(f64::NAN);
        self.pushes.push((node.to_string(), opacity));
    }
}

#[test]
fn once_region_fires_exactly_once_at_first_qualifying_sample() -> Result<()> {
    for threshold in [0.0, 0.1, 0.25, 0.5, 0.75, 1.0] {
        let mut observer = VisibilityObserver::new(ViewportRegion::new(threshold, true)?);
        let mut fired_at = Vec::new();

        for step in 0..=20 {
            let fraction = step as f64 / 20.0;
            if observer.evaluate(Some(fraction)) == Some(VisibilityState::Visible) {
                fired_at.push(fraction);
            }
        }

        assert_eq!(fired_at.len(), 1, "threshold {threshold}");
        let first = fired_at[0];
        assert!(first >= threshold);
        assert!(first - 0.05 < threshold, "fired late for threshold {threshold}");
    }
    Ok(())
}

#[test]
fn visible_once_region_never_refires() -> Result<()> {
    let mut observer = VisibilityObserver::new(ViewportRegion::new(0.3, true)?);
    assert_eq!(observer.evaluate(Some(0.4)), Some(VisibilityState::Visible));

    for sample in [Some(0.0), None, Some(1.0), Some(0.31), None] {
        assert_eq!(observer.evaluate(sample), None);
        assert_eq!(observer.state(), VisibilityState::Visible);
    }
    Ok(())
}

#[test]
fn children_start_exactly_one_stagger_apart() -> Result<()> {
    let stagger = 37.5;
    let children = (0..12)
        .map(|i| opacity_step(&format!("child-{i}"), 200.0, EasingFunction::EaseOut))
        .collect::<Result<Vec<_>>>()?;
    let plan = SequencePlan::new(vec![
        Tier::new()
            .with_parent(opacity_step("parent", 400.0, EasingFunction::Linear)?)
            .with_children(children)
            .with_delay(125.0)
            .with_delay_children(250.0)
            .with_stagger(stagger),
    ])?;

    let schedule = plan.schedule();
    let first_child = schedule[1].start_ms;
    assert_eq!(first_child, 375.0);
    for (i, scheduled) in schedule.iter().skip(1).enumerate() {
        assert_eq!(scheduled.start_ms - first_child, i as f64 * stagger);
        assert!(scheduled.start_ms >= 125.0);
    }
    Ok(())
}

#[test]
fn zero_duration_renders_target_on_trigger_cycle() -> Result<()> {
    let mut section = fade_section(0.0, 0.2)?;
    let mut recorder = Recorder::default();

    section.on_intersection(Some(0.5));
    section.on_frame(0.0, &mut recorder);

    assert_eq!(recorder.pushes, vec![("body".to_string(), 1.0)]);
    Ok(())
}

#[test]
fn region_below_threshold_keeps_hidden_state() -> Result<()> {
    let mut section = fade_section(500.0, 0.6)?;
    let mut recorder = Recorder::default();

    for frame in 0..100 {
        let fraction = (frame % 10) as f64 / 20.0;
        section.on_intersection(Some(fraction));
        section.on_frame(16.0, &mut recorder);
    }

    assert_eq!(section.visibility(), VisibilityState::NotVisible);
    assert!(recorder.pushes.iter().all(|(_, opacity)| *opacity == 0.0));
    let rendered = section.render();
    let style = rendered.node("body").and_then(|n| n.style.clone());
    assert_eq!(style.and_then(|s| s.get_f64(AttributeKey::Opacity)), Some(0.0));
    Ok(())
}

#[test]
fn linear_fade_over_one_second() -> Result<()> {
    let mut section = fade_section(1000.0, 0.0)?;
    let mut recorder = Recorder::default();

    section.on_intersection(Some(0.0));
    section.on_frame(0.0, &mut recorder);
    for _ in 0..5 {
        section.on_frame(100.0, &mut recorder);
    }
    let (_, halfway) = recorder.pushes.last().cloned().unwrap_or_default();
    assert!((halfway - 0.5).abs() < 1e-9);

    for _ in 0..6 {
        section.on_frame(100.0, &mut recorder);
    }
    let (_, settled) = recorder.pushes.last().cloned().unwrap_or_default();
    assert_eq!(settled, 1.0);
    Ok(())
}

#[test]
fn teardown_mid_transition_stops_updates() -> Result<()> {
    let mut section = fade_section(1000.0, 0.0)?;
    let mut recorder = Recorder::default();

    section.on_intersection(Some(1.0));
    section.on_frame(300.0, &mut recorder);
    let before = recorder.pushes.len();

    section.unmount();
    for _ in 0..10 {
        assert!(!section.on_frame(100.0, &mut recorder));
        assert_eq!(section.on_intersection(Some(1.0)), None);
    }
    assert_eq!(recorder.pushes.len(), before);
    section.unmount();
    Ok(())
}

#[test]
fn spring_overshoots_offsets_but_clamps_opacity() -> Result<()> {
    let spring = SpringConfig::from_duration_bounce(800.0, 0.4)?;
    let step = AnimationStep::new(
        "card",
        AttributeSet::new()
            .with(AttributeKey::Opacity, 0.0)
            .with(AttributeKey::Y, 20.0),
        AttributeSet::new()
            .with(AttributeKey::Opacity, 1.0)
            .with(AttributeKey::Y, 0.0),
        StepTiming::default().with_easing(EasingFunction::Spring(spring)),
    )?;
    let mut sequencer = AnimationSequencer::new(
        "cards",
        SequencePlan::new(vec![Tier::new().with_parent(step)])?,
    );
    sequencer.set_visibility(VisibilityState::Visible);

    let mut min_y = f64::INFINITY;
    let mut max_opacity: f64 = 0.0;
    while sequencer.update(4.0) {
        let value = sequencer.current_value("card").unwrap_or_default();
        min_y = min_y.min(value.get_f64(AttributeKey::Y).unwrap_or(0.0));
        max_opacity = max_opacity.max(value.get_f64(AttributeKey::Opacity).unwrap_or(0.0));
    }

    assert!(min_y < 0.0, "spring should carry y past its target");
    assert!(max_opacity <= 1.0);
    let settled = sequencer.current_value("card").unwrap_or_default();
    assert_eq!(settled.get_f64(AttributeKey::Y), Some(0.0));
    Ok(())
}

#[test]
fn reversible_region_reverses_from_current_value() -> Result<()> {
    let plan = SequencePlan::new(vec![
        Tier::new().with_parent(opacity_step("fade", 1000.0, EasingFunction::Linear)?),
    ])?;
    let mut section = SectionRenderer::new(
        "toggle",
        ViewportRegion::new(0.5, false)?,
        vec![AnimationSequencer::new("fade", plan)],
        vec![ContentNode::new("body", "text").bound_to("fade", "fade")],
        MountMode::Always,
    )?;
    let mut recorder = Recorder::default();

    section.on_intersection(Some(0.8));
    section.on_frame(400.0, &mut recorder);
    section.on_intersection(Some(0.1));
    section.on_frame(0.0, &mut recorder);
    section.on_frame(200.0, &mut recorder);

    let values: Vec<f64> = recorder.pushes.iter().map(|(_, o)| *o).collect();
    let last = values.len() - 1;
    assert!((values[last - 1] - 0.4).abs() < 1e-9);
    assert!((values[last] - 0.32).abs() < 1e-9);
    Ok(())
}

#[test]
fn endless_keyframes_stay_in_range_and_repeat_each_period() -> Result<()> {
    let opacity = |v: f64| AttributeSet::new().with(AttributeKey::Opacity, v);
    let frames = Keyframes::new(vec![opacity(0.0), opacity(0.2), opacity(0.0)], None)?;
    let step = AnimationStep::with_keyframes(
        "glow",
        opacity(0.0),
        frames,
        StepTiming::new(800.0)
            .with_easing(EasingFunction::EaseInOut)
            .with_repeat(Repeat::infinite()),
    )?;
    let mut sequencer =
        AnimationSequencer::new("glow", SequencePlan::new(vec![Tier::new().with_parent(step)])?);
    sequencer.set_visibility(VisibilityState::Visible);

    let read = |s: &AnimationSequencer| -> Option<f64> {
        s.current_value("glow")?.get_f64(AttributeKey::Opacity)
    };
    let mut first_period = Vec::new();
    for frame in 0..500 {
        sequencer.update(16.0);
        let value = read(&sequencer).unwrap_or(f64::NAN);
        assert!((0.0..=0.2).contains(&value), "frame {frame}: {value}");
        if frame < 50 {
            first_period.push(value);
        } else {
            // 50 frames of 16 ms make one 800 ms iteration.
            assert!((value - first_period[frame % 50]).abs() < 1e-6, "frame {frame}");
        }
    }
    assert!(sequencer.is_complete());
    Ok(())
}
