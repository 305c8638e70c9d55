//! Core animation types and data structures.
//!
//! This module defines the fundamental types for the reveal system:
//! - `AttributeKey`: The presentational attributes a step may drive
//! - `AttributeValue`: A numeric or unit-bearing attribute value
//! - `AttributeSet`: One endpoint (variant) of a transition
//! - `AnimationState`: Current state of a single step

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RevealError};

/// Current state of an animation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationState {
    /// Scheduled but waiting for its start offset.
    #[default]
    Pending,
    /// Actively interpolating.
    Running,
    /// Reached its destination.
    Finished,
    /// Stopped by teardown; the value is frozen.
    Cancelled,
}

/// Attributes a reveal step can animate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKey {
    Opacity,
    /// Horizontal offset.
    X,
    /// Vertical offset.
    Y,
    Scale,
    #[serde(alias = "scaleX")]
    ScaleX,
    #[serde(alias = "scaleY")]
    ScaleY,
    /// Rotation in degrees.
    Rotate,
    /// Filter function, e.g. `blur(8px)`.
    Filter,
    Width,
    Height,
}

impl AttributeKey {
    pub const ALL: [AttributeKey; 10] = [
        Self::Opacity,
        Self::X,
        Self::Y,
        Self::Scale,
        Self::ScaleX,
        Self::ScaleY,
        Self::Rotate,
        Self::Filter,
        Self::Width,
        Self::Height,
    ];

    /// Name used by the declarative surface.
    pub fn name(self) -> &'static str {
        match self {
            Self::Opacity => "opacity",
            Self::X => "x",
            Self::Y => "y",
            Self::Scale => "scale",
            Self::ScaleX => "scale_x",
            Self::ScaleY => "scale_y",
            Self::Rotate => "rotate",
            Self::Filter => "filter",
            Self::Width => "width",
            Self::Height => "height",
        }
    }

    /// Whether animating this attribute changes layout rather than only
    /// presentation.
    pub fn affects_layout(self) -> bool {
        matches!(self, Self::Width | Self::Height)
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttributeKey {
    type Err = RevealError;

    fn from_str(s: &str) -> Result<Self> {
        // camelCase spellings come straight from variant objects.
        let key = match s {
            "opacity" => Self::Opacity,
            "x" => Self::X,
            "y" => Self::Y,
            "scale" => Self::Scale,
            "scale_x" | "scaleX" => Self::ScaleX,
            "scale_y" | "scaleY" => Self::ScaleY,
            "rotate" => Self::Rotate,
            "filter" => Self::Filter,
            "width" => Self::Width,
            "height" => Self::Height,
            other => return Err(RevealError::UnknownAttribute(other.to_string())),
        };
        Ok(key)
    }
}

/// Numeric part of a string attribute together with its unit and optional
/// wrapping function (`blur(8px)` → function `blur`, value 8, unit `px`).
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub value: f64,
    pub unit: String,
    pub function: Option<String>,
}

impl Dimension {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
            function: None,
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Same unit and function, so the numeric parts can be blended.
    pub fn compatible_with(&self, other: &Dimension) -> bool {
        self.unit == other.unit && self.function == other.function
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(func) => write!(f, "{}({}{})", func, self.value, self.unit),
            None => write!(f, "{}{}", self.value, self.unit),
        }
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValue", into = "RawValue")]
pub enum AttributeValue {
    /// Plain number (opacity, scale, pixel offsets).
    Number(f64),
    /// Number carrying a unit and optionally a function wrapper.
    Dimension(Dimension),
}

impl AttributeValue {
    /// Parse a declarative string such as `"blur(8px)"`, `"100%"` or `"-20"`.
    pub fn parse(key: &str, input: &str) -> Result<Self> {
        let unparseable = || RevealError::UnparseableValue {
            key: key.to_string(),
            value: input.to_string(),
        };

        let trimmed = input.trim();
        let (function, inner) = match trimmed.find('(') {
            Some(open) => {
                let name = trimmed[..open].trim();
                let rest = trimmed[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(unparseable)?;
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
                    return Err(unparseable());
                }
                (Some(name.to_string()), rest.trim())
            }
            None => (None, trimmed),
        };

        let split = numeric_prefix_len(inner);
        if split == 0 {
            return Err(unparseable());
        }
        let value: f64 = inner[..split].parse().map_err(|_| unparseable())?;
        if !value.is_finite() {
            return Err(unparseable());
        }
        let unit = inner[split..].trim();
        if !unit.chars().all(|c| c.is_ascii_alphabetic() || c == '%') {
            return Err(unparseable());
        }

        if function.is_none() && unit.is_empty() {
            return Ok(Self::Number(value));
        }
        Ok(Self::Dimension(Dimension {
            value,
            unit: unit.to_string(),
            function,
        }))
    }

    /// Numeric component regardless of unit.
    pub fn numeric(&self) -> f64 {
        match self {
            Self::Number(v) => *v,
            Self::Dimension(d) => d.value,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Dimension(_) => None,
        }
    }

    pub fn as_dimension(&self) -> Option<&Dimension> {
        match self {
            Self::Dimension(d) => Some(d),
            Self::Number(_) => None,
        }
    }

    /// Whether the two endpoints can be blended.
    ///
    /// A bare number pairs with anything: it adopts the unit of the other side.
    pub fn compatible_with(&self, other: &AttributeValue) -> bool {
        match (self, other) {
            (Self::Dimension(a), Self::Dimension(b)) => a.compatible_with(b),
            _ => true,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", v),
            Self::Dimension(d) => d.fmt(f),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<Dimension> for AttributeValue {
    fn from(d: Dimension) -> Self {
        Self::Dimension(d)
    }
}

/// Length of the leading decimal number in `s` (sign, digits, fraction and an
/// exponent only when digits follow it, so `1em` keeps its unit).
fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    let mantissa = &s[digits_start..i];
    if !mantissa.bytes().any(|b| b.is_ascii_digit()) {
        return 0;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

/// Wire form of an attribute value: a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl TryFrom<RawValue> for AttributeValue {
    type Error = RevealError;

    fn try_from(raw: RawValue) -> Result<Self> {
        match raw {
            RawValue::Number(v) if v.is_finite() => Ok(Self::Number(v)),
            RawValue::Number(v) => Err(RevealError::UnparseableValue {
                key: String::new(),
                value: v.to_string(),
            }),
            RawValue::Text(s) => Self::parse("", &s),
        }
    }
}

impl From<AttributeValue> for RawValue {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Number(v) => RawValue::Number(v),
            dim @ AttributeValue::Dimension(_) => RawValue::Text(dim.to_string()),
        }
    }
}

/// One endpoint of a transition: the attributes of a variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet {
    values: BTreeMap<AttributeKey, AttributeValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: AttributeKey, value: impl Into<AttributeValue>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn insert(&mut self, key: AttributeKey, value: impl Into<AttributeValue>) {
        self.values.insert(key, value.into());
    }

    pub fn get(&self, key: AttributeKey) -> Option<&AttributeValue> {
        self.values.get(&key)
    }

    /// Numeric component of an attribute, if present.
    pub fn get_f64(&self, key: AttributeKey) -> Option<f64> {
        self.values.get(&key).map(AttributeValue::numeric)
    }

    pub fn contains(&self, key: AttributeKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = AttributeKey> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeKey, &AttributeValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys present in `self` but not in `other`.
    pub fn keys_missing_from(&self, other: &AttributeSet) -> Vec<AttributeKey> {
        self.keys().filter(|k| !other.contains(*k)).collect()
    }
}

impl FromIterator<(AttributeKey, AttributeValue)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (AttributeKey, AttributeValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_number_string() {
        assert_eq!(AttributeValue::parse("y", "-20").unwrap(), AttributeValue::Number(-20.0));
        assert_eq!(AttributeValue::parse("opacity", " 0.5 ").unwrap(), AttributeValue::Number(0.5));
    }

    #[test]
    fn test_parse_filter_function() {
        let v = AttributeValue::parse("filter", "blur(8px)").unwrap();
        let d = v.as_dimension().unwrap();
        assert_eq!(d.value, 8.0);
        assert_eq!(d.unit, "px");
        assert_eq!(d.function.as_deref(), Some("blur"));
        assert_eq!(v.to_string(), "blur(8px)");
    }

    #[test]
    fn test_parse_percent_and_em() {
        let pct = AttributeValue::parse("height", "100%").unwrap();
        assert_eq!(pct.to_string(), "100%");

        let em = AttributeValue::parse("x", "1.5em").unwrap();
        let d = em.as_dimension().unwrap();
        assert_eq!(d.value, 1.5);
        assert_eq!(d.unit, "em");
    }

    #[test]
    fn test_parse_exponent() {
        let v = AttributeValue::parse("x", "1e2px").unwrap();
        assert_eq!(v.numeric(), 100.0);
        assert_eq!(v.as_dimension().unwrap().unit, "px");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "px", "blur(px)", "blur(8px", "8 p-x", "(8px)", "1..2"] {
            assert!(
                matches!(
                    AttributeValue::parse("filter", bad),
                    Err(RevealError::UnparseableValue { .. })
                ),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_key_from_str() {
        assert_eq!("scaleY".parse::<AttributeKey>().unwrap(), AttributeKey::ScaleY);
        assert_eq!("opacity".parse::<AttributeKey>().unwrap(), AttributeKey::Opacity);
        assert_eq!(
            "boxShadow".parse::<AttributeKey>(),
            Err(RevealError::UnknownAttribute("boxShadow".to_string()))
        );
    }

    #[test]
    fn test_compatibility() {
        let px = AttributeValue::parse("filter", "blur(0px)").unwrap();
        let px2 = AttributeValue::parse("filter", "blur(12px)").unwrap();
        let pct = AttributeValue::parse("height", "100%").unwrap();
        assert!(px.compatible_with(&px2));
        assert!(!px.compatible_with(&pct));
        assert!(AttributeValue::Number(0.0).compatible_with(&pct));
    }

    #[test]
    fn test_attribute_set_serde() {
        let set: AttributeSet =
            serde_json::from_str(r#"{"opacity": 0, "y": 20, "filter": "blur(4px)"}"#).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get_f64(AttributeKey::Filter), Some(4.0));

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["filter"], "blur(4px)");
        assert_eq!(json["opacity"], 0.0);
    }

    #[test]
    fn test_keys_missing_from() {
        let a = AttributeSet::new()
            .with(AttributeKey::Opacity, 0.0)
            .with(AttributeKey::Y, 20.0);
        let b = AttributeSet::new().with(AttributeKey::Opacity, 1.0);
        assert_eq!(a.keys_missing_from(&b), vec![AttributeKey::Y]);
        assert!(b.keys_missing_from(&a).is_empty());
    }
}
