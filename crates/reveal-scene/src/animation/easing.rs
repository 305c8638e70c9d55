//! Easing functions for animation timing.
//!
//! Curve easings map linear progress (0.0 to 1.0) to eased progress:
//! - Linear
//! - Ease, EaseIn, EaseOut, EaseInOut (standard CSS curves)
//! - CubicBezier (custom bezier curves)
//!
//! `Spring` is time-based instead: its progress depends on elapsed
//! milliseconds, and its natural settle time becomes the step duration.
//!
//! # Usage
//!
//! ```
//! use reveal_scene::animation::easing::EasingFunction;
//!
//! let ease = EasingFunction::EaseOut;
//! let progress = ease.evaluate(0.5);
//! assert!(progress > 0.5);
//!
//! let custom = EasingFunction::cubic_bezier(0.4, 0.0, 0.2, 1.0).unwrap();
//! let progress = custom.evaluate(0.5);
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::spring::SpringConfig;
use crate::error::{Result, RevealError};

/// Easing function for animation timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EasingFunction {
    /// Linear interpolation (no easing).
    Linear,

    /// CSS `ease`, equivalent to `cubic-bezier(0.25, 0.1, 0.25, 1.0)`.
    Ease,

    /// CSS `ease-in`, equivalent to `cubic-bezier(0.42, 0, 1, 1)`.
    EaseIn,

    /// CSS `ease-out`, equivalent to `cubic-bezier(0, 0, 0.58, 1)`.
    EaseOut,

    /// CSS `ease-in-out`, equivalent to `cubic-bezier(0.42, 0, 0.58, 1)`.
    EaseInOut,

    /// Custom cubic bezier curve. x values must be in [0, 1].
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },

    /// Damped spring; overshoots when underdamped.
    Spring(SpringConfig),
}

impl Default for EasingFunction {
    fn default() -> Self {
        Self::EaseOut
    }
}

impl EasingFunction {
    /// Evaluate a curve easing at the given linear progress.
    ///
    /// Input is clamped to [0, 1]. For `Spring` the input is read as a
    /// fraction of the spring's own settle time.
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Self::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, t),
            Self::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, t),
            Self::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
            Self::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(*x1, *y1, *x2, *y2, t),
            Self::Spring(spring) => {
                if t >= 1.0 {
                    1.0
                } else {
                    spring.position(t * spring.settle_duration_ms())
                }
            }
        }
    }

    /// Eased progress after `elapsed_ms` of a step lasting `duration_ms`.
    ///
    /// Always returns exactly 1.0 once the step is over, and never divides by
    /// a zero duration.
    pub fn sample(&self, elapsed_ms: f64, duration_ms: f64) -> f64 {
        if duration_ms <= 0.0 || elapsed_ms >= duration_ms {
            return 1.0;
        }
        match self {
            Self::Spring(spring) => spring.position(elapsed_ms),
            curve => curve.evaluate(elapsed_ms / duration_ms),
        }
    }

    /// Create a custom cubic bezier easing function.
    pub fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&x1)
            || !(0.0..=1.0).contains(&x2)
            || !y1.is_finite()
            || !y2.is_finite()
        {
            return Err(RevealError::UnknownEasing(format!(
                "cubic-bezier({x1}, {y1}, {x2}, {y2})"
            )));
        }
        Ok(Self::CubicBezier { x1, y1, x2, y2 })
    }

    /// Duration a step with this easing should run for.
    ///
    /// Springs ignore the nominal duration and run until they settle.
    pub fn effective_duration_ms(&self, nominal_ms: f64) -> f64 {
        match self {
            Self::Spring(spring) => spring.settle_duration_ms(),
            _ => nominal_ms,
        }
    }

    /// Whether eased output is monotonic non-decreasing in time.
    pub fn is_monotonic(&self) -> bool {
        match self {
            Self::Spring(spring) => !spring.is_underdamped(),
            Self::CubicBezier { y1, y2, .. } => {
                (0.0..=1.0).contains(y1) && (0.0..=1.0).contains(y2)
            }
            _ => true,
        }
    }
}

impl FromStr for EasingFunction {
    type Err = RevealError;

    /// Parse a named curve in camelCase, kebab-case or snake_case.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "linear" => Ok(Self::Linear),
            "ease" => Ok(Self::Ease),
            "easein" => Ok(Self::EaseIn),
            "easeout" => Ok(Self::EaseOut),
            "easeinout" => Ok(Self::EaseInOut),
            "spring" => Ok(Self::Spring(SpringConfig::default())),
            _ => Err(RevealError::UnknownEasing(s.to_string())),
        }
    }
}

/// Evaluate a cubic bezier curve at progress `progress`.
///
/// Uses Newton-Raphson iteration to find the curve parameter whose x matches
/// the progress, then evaluates y there.
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, progress: f64) -> f64 {
    if progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }

    let t = solve_bezier_x(x1, x2, progress);
    bezier_axis(y1, y2, t)
}

fn solve_bezier_x(x1: f64, x2: f64, target_x: f64) -> f64 {
    let mut t = target_x;

    for _ in 0..8 {
        let x = bezier_axis(x1, x2, t) - target_x;
        if x.abs() < 1e-7 {
            break;
        }

        let dx = bezier_x_derivative(x1, x2, t);
        if dx.abs() < 1e-7 {
            break;
        }

        t -= x / dx;
        t = t.clamp(0.0, 1.0);
    }

    t
}

/// One coordinate on the curve: `3(1-t)²t·p1 + 3(1-t)t²·p2 + t³`.
#[inline]
fn bezier_axis(p1: f64, p2: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;

    3.0 * mt2 * t * p1 + 3.0 * mt * t2 * p2 + t3
}

/// dx/dt = 3(1-t)²·x1 + 6(1-t)t·(x2-x1) + 3t²·(1-x2)
#[inline]
fn bezier_x_derivative(x1: f64, x2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * x1 + 6.0 * mt * t * (x2 - x1) + 3.0 * t * t * (1.0 - x2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 0.001;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_linear() {
        let ease = EasingFunction::Linear;
        assert!(approx_eq(ease.evaluate(0.0), 0.0));
        assert!(approx_eq(ease.evaluate(0.25), 0.25));
        assert!(approx_eq(ease.evaluate(0.5), 0.5));
        assert!(approx_eq(ease.evaluate(1.0), 1.0));
    }

    #[test]
    fn test_ease_out() {
        let ease = EasingFunction::EaseOut;
        assert!(approx_eq(ease.evaluate(0.0), 0.0));
        assert!(approx_eq(ease.evaluate(1.0), 1.0));

        // Fast start, slow end
        assert!(ease.evaluate(0.25) > 0.25);
        assert!(ease.evaluate(0.5) > 0.5);
    }

    #[test]
    fn test_ease_out_is_monotonic() {
        let ease = EasingFunction::EaseOut;
        let mut last = 0.0;
        for i in 0..=100 {
            let v = ease.evaluate(i as f64 / 100.0);
            assert!(v + 1e-9 >= last, "dropped at {i}: {v} < {last}");
            last = v;
        }
    }

    #[test]
    fn test_ease_in_out_symmetry() {
        let ease = EasingFunction::EaseInOut;
        assert!(approx_eq(ease.evaluate(0.5), 0.5));
        assert!(approx_eq(ease.evaluate(0.25) + ease.evaluate(0.75), 1.0));
    }

    #[test]
    fn test_clamping() {
        let ease = EasingFunction::Ease;
        assert!(approx_eq(ease.evaluate(-0.5), 0.0));
        assert!(approx_eq(ease.evaluate(1.5), 1.0));
    }

    #[test]
    fn test_sample_zero_duration() {
        for ease in [
            EasingFunction::Linear,
            EasingFunction::EaseOut,
            EasingFunction::Spring(SpringConfig::default()),
        ] {
            assert_eq!(ease.sample(0.0, 0.0), 1.0);
            assert!(ease.sample(0.0, 0.0).is_finite());
        }
    }

    #[test]
    fn test_sample_linear_midpoint() {
        let ease = EasingFunction::Linear;
        assert!(approx_eq(ease.sample(500.0, 1000.0), 0.5));
        assert_eq!(ease.sample(1000.0, 1000.0), 1.0);
        assert_eq!(ease.sample(2500.0, 1000.0), 1.0);
    }

    #[test]
    fn test_spring_sample_uses_elapsed_time() {
        let spring = SpringConfig::default();
        let ease = EasingFunction::Spring(spring);
        let duration = ease.effective_duration_ms(300.0);
        assert_eq!(duration, spring.settle_duration_ms());
        assert!(approx_eq(ease.sample(200.0, duration), spring.position(200.0)));
        assert!(!ease.is_monotonic());
    }

    #[test]
    fn test_from_str_spellings() {
        assert_eq!("easeOut".parse::<EasingFunction>().unwrap(), EasingFunction::EaseOut);
        assert_eq!("ease-out".parse::<EasingFunction>().unwrap(), EasingFunction::EaseOut);
        assert_eq!("easeInOut".parse::<EasingFunction>().unwrap(), EasingFunction::EaseInOut);
        assert_eq!("linear".parse::<EasingFunction>().unwrap(), EasingFunction::Linear);
        assert!(matches!(
            "anticipate".parse::<EasingFunction>(),
            Err(RevealError::UnknownEasing(_))
        ));
    }

    #[test]
    fn test_custom_bezier() {
        let ease = EasingFunction::cubic_bezier(0.4, 0.0, 0.2, 1.0).unwrap();
        assert!(approx_eq(ease.evaluate(0.0), 0.0));
        assert!(approx_eq(ease.evaluate(1.0), 1.0));

        let linear_bezier = EasingFunction::cubic_bezier(0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(approx_eq(linear_bezier.evaluate(0.5), 0.5));

        assert!(EasingFunction::cubic_bezier(-0.1, 0.0, 0.5, 1.0).is_err());
        assert!(EasingFunction::cubic_bezier(0.5, 0.0, 1.5, 1.0).is_err());
    }

    #[test]
    fn test_default() {
        assert_eq!(EasingFunction::default(), EasingFunction::EaseOut);
    }
}
