//! Interpolation for attribute values.
//!
//! This module provides the `Interpolate` trait and implementations for the
//! attribute types a reveal step drives. The factor `t` is eased progress and
//! may leave [0, 1] while a spring overshoots; values extrapolate linearly and
//! the attribute set clamps each key to its legal range afterwards.

use super::types::{AttributeKey, AttributeSet, AttributeValue, Dimension};

/// Trait for types that can be interpolated between two values.
pub trait Interpolate: Sized {
    /// Interpolate between self and another value.
    ///
    /// When t = 0.0, returns self.
    /// When t = 1.0, returns to.
    fn interpolate(&self, to: &Self, t: f64) -> Self;
}

#[inline]
fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

impl Interpolate for f64 {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        lerp(*self, *to, t)
    }
}

impl Interpolate for Dimension {
    /// Blend the numeric part and keep the unit and function of `self`.
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        Self {
            value: lerp(self.value, to.value, t),
            unit: self.unit.clone(),
            function: self.function.clone(),
        }
    }
}

impl Interpolate for AttributeValue {
    /// Interpolate between two attribute values.
    ///
    /// A bare number paired with a dimension adopts the dimension's unit, so
    /// `0` → `"100%"` passes through `"50%"`.
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        match (self, to) {
            (Self::Number(a), Self::Number(b)) => Self::Number(lerp(*a, *b, t)),
            (Self::Dimension(a), Self::Dimension(b)) => Self::Dimension(a.interpolate(b, t)),
            (Self::Number(a), Self::Dimension(b)) => Self::Dimension(Dimension {
                value: lerp(*a, b.value, t),
                unit: b.unit.clone(),
                function: b.function.clone(),
            }),
            (Self::Dimension(a), Self::Number(b)) => Self::Dimension(Dimension {
                value: lerp(a.value, *b, t),
                unit: a.unit.clone(),
                function: a.function.clone(),
            }),
        }
    }
}

impl Interpolate for AttributeSet {
    /// Interpolate every key of `self`; keys absent from `to` hold still.
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        self.iter()
            .map(|(key, from)| {
                let value = match to.get(key) {
                    Some(target) => clamp_to_range(key, from.interpolate(target, t)),
                    None => from.clone(),
                };
                (key, value)
            })
            .collect()
    }
}

/// Keep overshooting values inside what the attribute can express.
fn clamp_to_range(key: AttributeKey, value: AttributeValue) -> AttributeValue {
    let (min, max) = match key {
        AttributeKey::Opacity => (0.0, 1.0),
        AttributeKey::Filter | AttributeKey::Width | AttributeKey::Height => (0.0, f64::INFINITY),
        AttributeKey::Scale | AttributeKey::ScaleX | AttributeKey::ScaleY => (0.0, f64::INFINITY),
        AttributeKey::X | AttributeKey::Y | AttributeKey::Rotate => return value,
    };
    match value {
        AttributeValue::Number(v) => AttributeValue::Number(v.clamp(min, max)),
        AttributeValue::Dimension(mut d) => {
            d.value = d.value.clamp(min, max);
            AttributeValue::Dimension(d)
        }
    }
}
