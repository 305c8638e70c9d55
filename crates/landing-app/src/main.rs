use anyhow::{Context, Result};
use reveal_config::{OutputFormat, RevealConfig};
use reveal_scene::section::RenderedNode;
use reveal_scene::{
    AttributeSet, Page, PageDescription, PageSnapshot, RevealEvent, StyleTarget, ViewportRegion,
};
use tracing::{debug, info};

const BUNDLED_PAGE: &str = include_str!("../assets/landing.json");

/// Counts style pushes; the headless driver has no real nodes to style.
#[derive(Default)]
struct StyleCounter {
    pushes: u64,
}

impl StyleTarget for StyleCounter {
    fn apply(&mut self, section: &str, node: &str, attributes: &AttributeSet) {
        self.pushes += 1;
        debug!(section, node, %attributes, "style");
    }
}

fn main() -> Result<()> {
    // Load configuration (reveal.toml + env overrides)
    let config = RevealConfig::load().context("failed to load reveal configuration")?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.level.parse().unwrap_or_default()),
        )
        .init();

    let description = load_description(&config)?;
    let defaults = ViewportRegion::new(config.reveal.threshold, config.reveal.once)
        .context("invalid reveal defaults")?;
    let mut page = description
        .build(config.viewport.width, config.viewport.height, &defaults)
        .context("failed to build page")?;

    info!(
        sections = page.sections().len(),
        height = page.content_height(),
        viewport = %format!("{}x{}", config.viewport.width, config.viewport.height),
        "page ready"
    );

    let mut target = StyleCounter::default();
    run(&mut page, &config, &mut target)?;

    page.unmount_all();
    log_events(&mut page);
    info!(frames = page.frame_count(), style_pushes = target.pushes, "done");
    Ok(())
}

fn load_description(config: &RevealConfig) -> Result<PageDescription> {
    match &config.output.page {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read page description {}", path.display()))?;
            PageDescription::from_json(&json)
                .with_context(|| format!("invalid page description {}", path.display()))
        }
        None => {
            PageDescription::from_json(BUNDLED_PAGE).context("invalid bundled page description")
        }
    }
}

/// Scroll to the bottom, then keep ticking until everything settles.
fn run(page: &mut Page, config: &RevealConfig, target: &mut StyleCounter) -> Result<()> {
    let frame_ms = config.playback.frame_ms;
    let every = config.output.snapshot_every;
    let mut settle_left = config.playback.settle_frames;

    loop {
        let scrolling = !page.at_bottom();
        if scrolling {
            page.scroll_by(config.playback.scroll_px_per_frame);
        }
        let animating = page.frame(frame_ms, target);
        log_events(page);

        if every > 0 && page.frame_count() % u64::from(every) == 0 {
            print_snapshot(&page.snapshot(), config.output.format)?;
        }

        if !scrolling {
            if settle_left == 0 || !animating {
                break;
            }
            settle_left -= 1;
        }
    }

    print_snapshot(&page.snapshot(), config.output.format)
}

fn log_events(page: &mut Page) {
    for event in page.drain_events() {
        match &event {
            RevealEvent::Visibility { section, state } => {
                info!(section = %section, ?state, "visibility");
            }
            RevealEvent::ChildrenMounted { section } => {
                info!(section = %section, "children mounted")
            }
            RevealEvent::Sequence {
                section,
                track,
                event,
            } => debug!(section = %section, track = %track, ?event, "sequence"),
            RevealEvent::Unmounted { section } => debug!(section = %section, "unmounted"),
        }
    }
}

fn print_snapshot(snapshot: &PageSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(snapshot)?);
        }
        OutputFormat::Text => {
            println!("frame {} scroll {:.0}", snapshot.frame, snapshot.scroll_y);
            for section in &snapshot.sections {
                let phases: Vec<String> = section
                    .tracks
                    .iter()
                    .map(|(name, phase)| format!("{name}:{phase:?}"))
                    .collect();
                println!(
                    "  {:<18} {:<10} {}",
                    section.id,
                    format!("{:?}", section.visibility),
                    phases.join(" ")
                );
                print_nodes(&section.nodes, 2);
            }
        }
    }
    Ok(())
}

fn print_nodes(nodes: &[RenderedNode], depth: usize) {
    for node in nodes {
        if let Some(style) = &node.style {
            println!("{:indent$}{} {}", "", node.id, style, indent = depth * 2);
        }
        print_nodes(&node.children, depth + 1);
    }
}
