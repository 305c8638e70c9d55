//! Error types for reveal configuration.

use thiserror::Error;

use crate::animation::types::AttributeKey;

/// Result type for reveal operations.
pub type Result<T> = std::result::Result<T, RevealError>;

/// Configuration errors surfaced to the section author at construction time.
///
/// None of these are retried; they describe a plan or region that can never
/// render correctly.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RevealError {
    /// `from` and `to` attribute sets describe different attributes.
    #[error(
        "step `{step}`: attribute keys differ between from and to \
         (only in from: {only_from:?}, only in to: {only_to:?})"
    )]
    MismatchedKeys {
        step: String,
        only_from: Vec<AttributeKey>,
        only_to: Vec<AttributeKey>,
    },

    /// An attribute string could not be parsed into number, unit and function.
    #[error("unparseable value for `{key}`: {value:?}")]
    UnparseableValue { key: String, value: String },

    /// Both endpoints carry units, but they cannot be blended.
    #[error("step `{step}`: cannot interpolate `{key}` from {from:?} to {to:?}")]
    IncompatibleValues {
        step: String,
        key: AttributeKey,
        from: String,
        to: String,
    },

    /// Attribute name not in the animatable set.
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),

    /// Visibility threshold outside `[0, 1]`.
    #[error("threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    /// Duration, delay or stagger that is negative or not finite.
    #[error("invalid timing for {field}: {value}")]
    InvalidTiming { field: &'static str, value: f64 },

    /// Spring parameter that would not produce a settling motion.
    #[error("invalid spring parameter {field}: {value}")]
    InvalidSpring { field: &'static str, value: f64 },

    /// Easing name not recognised by the declarative surface.
    #[error("unknown easing `{0}`")]
    UnknownEasing(String),

    /// A content node binds to a track or step that does not exist.
    #[error("node `{node}` binds to missing {what} `{name}`")]
    UnknownBinding {
        node: String,
        what: &'static str,
        name: String,
    },

    /// Two steps in one plan share an id.
    #[error("duplicate step id `{0}`")]
    DuplicateStep(String),

    /// Two tracks in one section share a name.
    #[error("duplicate track name `{0}`")]
    DuplicateTrack(String),

    /// Keyframe list that cannot be played: too short, or bad `times`.
    #[error("invalid keyframes: {0}")]
    InvalidKeyframes(String),

    /// `repeat` that is neither a whole count nor `Infinity`.
    #[error("invalid repeat `{0}`")]
    InvalidRepeat(String),

    /// Page description could not be decoded.
    #[error("invalid page description: {0}")]
    Description(String),
}

impl From<serde_json::Error> for RevealError {
    fn from(err: serde_json::Error) -> Self {
        Self::Description(err.to_string())
    }
}
