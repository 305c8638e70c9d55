//! A scrollable page of stacked sections.
//!
//! The page lays sections out top to bottom, tracks the scroll offset and,
//! once per frame, samples each section's intersection with the viewport
//! before advancing its tracks.

use serde::Serialize;
use tracing::{debug, trace};

use crate::animation::events::{EventQueue, RevealEvent};
use crate::observer::{Rect, visible_fraction};
use crate::section::{RenderedSection, SectionRenderer, StyleTarget};

/// A section and the slot it occupies on the page.
#[derive(Debug)]
pub struct PlacedSection {
    pub section: SectionRenderer,
    pub top: f64,
    pub height: f64,
}

impl PlacedSection {
    pub fn bounds(&self, width: f64) -> Rect {
        Rect::new(0.0, self.top, width, self.height)
    }
}

/// Point-in-time view of the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSnapshot {
    pub frame: u64,
    pub scroll_y: f64,
    pub sections: Vec<RenderedSection>,
}

#[derive(Debug)]
pub struct Page {
    sections: Vec<PlacedSection>,
    viewport_width: f64,
    viewport_height: f64,
    scroll_y: f64,
    content_height: f64,
    frame: u64,
    events: EventQueue<RevealEvent>,
}

impl Page {
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            sections: Vec::new(),
            viewport_width,
            viewport_height,
            scroll_y: 0.0,
            content_height: 0.0,
            frame: 0,
            events: EventQueue::new(),
        }
    }

    /// Append a section below the existing ones.
    pub fn push_section(&mut self, section: SectionRenderer, height: f64) {
        let height = height.max(0.0);
        debug!(section = section.id(), top = self.content_height, height, "section placed");
        self.sections.push(PlacedSection {
            section,
            top: self.content_height,
            height,
        });
        self.content_height += height;
    }

    pub fn sections(&self) -> &[PlacedSection] {
        &self.sections
    }

    pub fn section(&self, id: &str) -> Option<&SectionRenderer> {
        self.sections
            .iter()
            .map(|placed| &placed.section)
            .find(|section| section.id() == id)
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    pub fn content_height(&self) -> f64 {
        self.content_height
    }

    pub fn max_scroll(&self) -> f64 {
        (self.content_height - self.viewport_height).max(0.0)
    }

    pub fn viewport(&self) -> Rect {
        Rect::new(0.0, self.scroll_y, self.viewport_width, self.viewport_height)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Scroll to an absolute offset, clamped to the page.
    pub fn scroll_to(&mut self, y: f64) {
        self.scroll_y = y.clamp(0.0, self.max_scroll());
    }

    pub fn scroll_by(&mut self, dy: f64) {
        self.scroll_to(self.scroll_y + dy);
    }

    /// Whether the viewport has reached the bottom of the page.
    pub fn at_bottom(&self) -> bool {
        self.scroll_y >= self.max_scroll()
    }

    /// Sample intersections, then advance every section by `delta_ms`.
    ///
    /// Returns `true` while any section is still animating.
    pub fn frame(&mut self, delta_ms: f64, target: &mut impl StyleTarget) -> bool {
        self.frame += 1;
        let viewport = self.viewport();
        let mut animating = false;

        for placed in &mut self.sections {
            let bounds = placed.bounds(self.viewport_width);
            let sample = visible_fraction(&bounds, &viewport, &placed.section.region().margin);
            trace!(section = placed.section.id(), ?sample, "intersection");
            placed.section.on_intersection(sample);
            animating |= placed.section.on_frame(delta_ms, target);
            for event in placed.section.drain_events() {
                self.events.push(event);
            }
        }
        animating
    }

    pub fn is_animating(&self) -> bool {
        self.sections.iter().any(|placed| placed.section.is_animating())
    }

    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            frame: self.frame,
            scroll_y: self.scroll_y,
            sections: self
                .sections
                .iter()
                .map(|placed| placed.section.render())
                .collect(),
        }
    }

    /// Tear down every section.
    pub fn unmount_all(&mut self) {
        for placed in &mut self.sections {
            placed.section.unmount();
            for event in placed.section.drain_events() {
                self.events.push(event);
            }
        }
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = RevealEvent> + '_ {
        self.events.drain()
    }
}
