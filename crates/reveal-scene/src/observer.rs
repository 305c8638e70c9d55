//! Viewport intersection tracking.
//!
//! A `VisibilityObserver` turns intersection samples (the fraction of a
//! target's area inside the viewport) into a stream of `VisibilityState`
//! changes. One-shot observers report `Visible` once and then stop listening;
//! reversible observers toggle on every threshold crossing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

use crate::error::{Result, RevealError};

/// Whether a region currently meets its visibility threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityState {
    #[default]
    NotVisible,
    Visible,
}

impl VisibilityState {
    pub fn is_visible(self) -> bool {
        self == Self::Visible
    }
}

/// Axis-aligned rectangle in page coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> f64 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Overlap with `other`, or `None` when the two do not touch.
    ///
    /// Rectangles sharing only an edge intersect with zero area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < x || bottom < y {
            return None;
        }
        Some(Rect::new(x, y, right - x, bottom - y))
    }

    /// Grow each edge outward by the margin (negative values shrink).
    pub fn expand(&self, margin: &RootMargin) -> Rect {
        Rect::new(
            self.x - margin.left,
            self.y - margin.top,
            (self.w + margin.left + margin.right).max(0.0),
            (self.h + margin.top + margin.bottom).max(0.0),
        )
    }
}

/// Offsets applied to the viewport before intersecting, in pixels.
///
/// Parses CSS margin shorthand of one to four `px` or bare values, e.g.
/// `"0px 0px -100px 0px"`. Percentages are rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootMargin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl RootMargin {
    pub fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

impl FromStr for RootMargin {
    type Err = RevealError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RevealError::UnparseableValue {
            key: "margin".to_string(),
            value: s.to_string(),
        };
        let values = s
            .split_whitespace()
            .map(|part| {
                part.strip_suffix("px")
                    .unwrap_or(part)
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(invalid)
            })
            .collect::<Result<Vec<_>>>()?;

        let (top, right, bottom, left) = match values.as_slice() {
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            _ => return Err(invalid()),
        };
        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}px {}px {}px {}px",
            self.top, self.right, self.bottom, self.left
        )
    }
}

/// Fraction of `target` inside the viewport grown by `margin`.
///
/// `None` when the target does not touch the viewport at all. A zero-area
/// target that touches it counts as fully visible.
pub fn visible_fraction(target: &Rect, viewport: &Rect, margin: &RootMargin) -> Option<f64> {
    let root = viewport.expand(margin);
    let overlap = target.intersection(&root)?;
    let area = target.area();
    if area <= 0.0 {
        return Some(1.0);
    }
    Some((overlap.area() / area).clamp(0.0, 1.0))
}

/// Threshold and trigger mode of an observed region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportRegion {
    /// Fraction of the region's area that must be inside the viewport.
    pub threshold: f64,
    /// Trigger at most once.
    pub once: bool,
    pub margin: RootMargin,
}

impl Default for ViewportRegion {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            once: true,
            margin: RootMargin::default(),
        }
    }
}

impl ViewportRegion {
    pub fn new(threshold: f64, once: bool) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(RevealError::InvalidThreshold(threshold));
        }
        Ok(Self {
            threshold,
            once,
            margin: RootMargin::default(),
        })
    }

    pub fn with_margin(mut self, margin: RootMargin) -> Self {
        self.margin = margin;
        self
    }

    /// Whether an intersection sample satisfies the threshold.
    ///
    /// `None` (no overlap, or no target) never does.
    pub fn is_met(&self, sample: Option<f64>) -> bool {
        sample.is_some_and(|fraction| fraction >= self.threshold)
    }
}

/// Tracks one region's visibility across intersection samples.
#[derive(Debug, Clone)]
pub struct VisibilityObserver {
    region: ViewportRegion,
    state: VisibilityState,
    subscribed: bool,
}

impl VisibilityObserver {
    pub fn new(region: ViewportRegion) -> Self {
        Self {
            region,
            state: VisibilityState::NotVisible,
            subscribed: true,
        }
    }

    pub fn region(&self) -> &ViewportRegion {
        &self.region
    }

    pub fn state(&self) -> VisibilityState {
        self.state
    }

    /// Whether further samples can still change the state.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Feed one intersection sample.
    ///
    /// Returns the new state when it changed. A missing sample reads as
    /// `NotVisible`.
    pub fn evaluate(&mut self, sample: Option<f64>) -> Option<VisibilityState> {
        if !self.subscribed {
            return None;
        }
        let next = if self.region.is_met(sample) {
            VisibilityState::Visible
        } else {
            VisibilityState::NotVisible
        };
        trace!(?sample, threshold = self.region.threshold, ?next, "intersection sample");

        if next == self.state {
            return None;
        }
        if next == VisibilityState::NotVisible && self.region.once {
            return None;
        }
        self.state = next;
        if self.region.once {
            // One-shot regions stop listening after their first trigger.
            self.subscribed = false;
            debug!("one-shot region triggered, unsubscribing");
        }
        Some(next)
    }

    /// Intersect `target` with `viewport` and feed the result.
    pub fn observe(&mut self, target: Option<&Rect>, viewport: &Rect) -> Option<VisibilityState> {
        let sample = target.and_then(|t| visible_fraction(t, viewport, &self.region.margin));
        self.evaluate(sample)
    }

    /// Stop listening. Later samples are ignored.
    pub fn disconnect(&mut self) {
        self.subscribed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 1000.0, 800.0)
    }

    #[test]
    fn test_visible_fraction() {
        let target = Rect::new(0.0, 700.0, 1000.0, 200.0);
        let fraction = visible_fraction(&target, &viewport(), &RootMargin::default()).unwrap();
        assert!((fraction - 0.5).abs() < 1e-9);

        let below = Rect::new(0.0, 900.0, 1000.0, 200.0);
        assert_eq!(visible_fraction(&below, &viewport(), &RootMargin::default()), None);
    }

    #[test]
    fn test_zero_area_target_touching_viewport() {
        let line = Rect::new(0.0, 800.0, 1000.0, 0.0);
        assert_eq!(visible_fraction(&line, &viewport(), &RootMargin::default()), Some(1.0));
    }

    #[test]
    fn test_margin_shrinks_viewport() {
        let target = Rect::new(0.0, 700.0, 1000.0, 100.0);
        let margin: RootMargin = "0px 0px -100px 0px".parse().unwrap();
        assert_eq!(margin.bottom, -100.0);
        assert_eq!(visible_fraction(&target, &viewport(), &margin), Some(0.0));
    }

    #[test]
    fn test_margin_shorthand() {
        let margin: RootMargin = "10 20".parse().unwrap();
        assert_eq!(margin.top, 10.0);
        assert_eq!(margin.left, 20.0);
        assert!("1px 2px 3px 4px 5px".parse::<RootMargin>().is_err());
        assert!("wide".parse::<RootMargin>().is_err());
    }

    #[test]
    fn test_threshold_validation() {
        assert!(ViewportRegion::new(0.0, true).is_ok());
        assert!(ViewportRegion::new(1.0, false).is_ok());
        assert_eq!(
            ViewportRegion::new(1.5, true),
            Err(RevealError::InvalidThreshold(1.5))
        );
        assert!(ViewportRegion::new(f64::NAN, true).is_err());
    }

    #[test]
    fn test_once_fires_a_single_time() {
        let mut observer = VisibilityObserver::new(ViewportRegion::new(0.2, true).unwrap());

        assert_eq!(observer.evaluate(Some(0.1)), None);
        assert_eq!(observer.evaluate(Some(0.2)), Some(VisibilityState::Visible));
        assert!(!observer.is_subscribed());

        assert_eq!(observer.evaluate(None), None);
        assert_eq!(observer.evaluate(Some(0.9)), None);
        assert_eq!(observer.state(), VisibilityState::Visible);
    }

    #[test]
    fn test_reversible_toggles() {
        let mut observer = VisibilityObserver::new(ViewportRegion::new(0.5, false).unwrap());

        assert_eq!(observer.evaluate(Some(0.6)), Some(VisibilityState::Visible));
        assert_eq!(observer.evaluate(Some(0.7)), None);
        assert_eq!(observer.evaluate(Some(0.4)), Some(VisibilityState::NotVisible));
        assert_eq!(observer.evaluate(Some(0.5)), Some(VisibilityState::Visible));
        assert!(observer.is_subscribed());
    }

    #[test]
    fn test_zero_threshold_needs_overlap() {
        let mut observer = VisibilityObserver::new(ViewportRegion::new(0.0, true).unwrap());
        assert_eq!(observer.evaluate(None), None);
        assert_eq!(observer.evaluate(Some(0.0)), Some(VisibilityState::Visible));
    }

    #[test]
    fn test_missing_target_stays_hidden() {
        let mut observer = VisibilityObserver::new(ViewportRegion::default());
        assert_eq!(observer.observe(None, &viewport()), None);
        assert_eq!(observer.state(), VisibilityState::NotVisible);
    }

    #[test]
    fn test_disconnect_ignores_samples() {
        let mut observer = VisibilityObserver::new(ViewportRegion::default());
        observer.disconnect();
        assert_eq!(observer.evaluate(Some(1.0)), None);
    }
}
