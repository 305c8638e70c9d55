//! Damped spring model used by `EasingFunction::Spring`.
//!
//! The spring is solved analytically for a unit step (0 → 1, starting at
//! rest), so the eased progress is a pure function of elapsed time. That keeps
//! frames deterministic regardless of frame rate and lets a reversal pick up
//! from any sampled value.
//!
//! ```text
//! ω0 = sqrt(k / m)          natural frequency
//! ζ  = c / (2·sqrt(k·m))    damping ratio
//!
//! ζ < 1   x(t) = 1 - e^(-ζω0t)·(cos ωd·t + (ζω0/ωd)·sin ωd·t)
//! ζ = 1   x(t) = 1 - e^(-ω0t)·(1 + ω0t)
//! ζ > 1   x(t) = 1 - (r2·e^(r1·t) - r1·e^(r2·t)) / (r2 - r1)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, RevealError};

/// Distance from the target below which the spring counts as settled.
pub const REST_DELTA: f64 = 0.001;

/// Upper bound on how long any spring may run.
pub const MAX_SETTLE_MS: f64 = 10_000.0;

/// Lowest damping ratio reachable through `bounce`.
const MIN_DAMPING_RATIO: f64 = 0.05;

const CRITICAL_EPSILON: f64 = 1e-6;

/// Physical spring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringConfig {
    /// Spring constant. Higher values move faster.
    pub stiffness: f64,
    /// Opposing force. Zero would oscillate forever and is rejected.
    pub damping: f64,
    pub mass: f64,
}

impl Default for SpringConfig {
    /// A lively default with visible overshoot (ζ = 0.5).
    fn default() -> Self {
        Self {
            stiffness: 100.0,
            damping: 10.0,
            mass: 1.0,
        }
    }
}

impl SpringConfig {
    /// Create a validated spring from physical parameters.
    pub fn new(stiffness: f64, damping: f64, mass: f64) -> Result<Self> {
        let spring = Self {
            stiffness,
            damping,
            mass,
        };
        spring.validate()?;
        Ok(spring)
    }

    /// Derive a spring that settles after `duration_ms` with the given
    /// `bounce` (0 = no overshoot, towards 1 = very springy).
    pub fn from_duration_bounce(duration_ms: f64, bounce: f64) -> Result<Self> {
        if !duration_ms.is_finite() || duration_ms <= 0.0 {
            return Err(RevealError::InvalidSpring {
                field: "duration",
                value: duration_ms,
            });
        }
        if !bounce.is_finite() || !(0.0..1.0).contains(&bounce) {
            return Err(RevealError::InvalidSpring {
                field: "bounce",
                value: bounce,
            });
        }

        let zeta = (1.0 - bounce).clamp(MIN_DAMPING_RATIO, 1.0);
        let seconds = duration_ms / 1000.0;
        let omega0 = if zeta < 1.0 {
            underdamped_settle_factor(zeta) / (zeta * seconds)
        } else {
            critical_settle_factor() / seconds
        };

        Ok(Self {
            stiffness: omega0 * omega0,
            damping: 2.0 * zeta * omega0,
            mass: 1.0,
        })
    }

    /// Check that the parameters describe a spring that comes to rest.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("stiffness", self.stiffness),
            ("damping", self.damping),
            ("mass", self.mass),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(RevealError::InvalidSpring { field, value });
            }
        }
        Ok(())
    }

    /// Natural angular frequency in rad/s.
    pub fn natural_frequency(&self) -> f64 {
        (self.stiffness / self.mass).sqrt()
    }

    pub fn damping_ratio(&self) -> f64 {
        self.damping / (2.0 * (self.stiffness * self.mass).sqrt())
    }

    /// Whether the motion overshoots the target before settling.
    pub fn is_underdamped(&self) -> bool {
        self.damping_ratio() < 1.0 - CRITICAL_EPSILON
    }

    /// Progress of a unit step at `elapsed_ms`. May exceed 1.0 while an
    /// underdamped spring overshoots.
    pub fn position(&self, elapsed_ms: f64) -> f64 {
        if elapsed_ms <= 0.0 {
            return 0.0;
        }
        let t = elapsed_ms / 1000.0;
        let omega0 = self.natural_frequency();
        let zeta = self.damping_ratio();

        if (zeta - 1.0).abs() < CRITICAL_EPSILON {
            1.0 - (-omega0 * t).exp() * (1.0 + omega0 * t)
        } else if zeta < 1.0 {
            let omega_d = omega0 * (1.0 - zeta * zeta).sqrt();
            let envelope = (-zeta * omega0 * t).exp();
            1.0 - envelope * ((omega_d * t).cos() + (zeta * omega0 / omega_d) * (omega_d * t).sin())
        } else {
            let root = (zeta * zeta - 1.0).sqrt();
            let r1 = -omega0 * (zeta - root);
            let r2 = -omega0 * (zeta + root);
            1.0 - (r2 * (r1 * t).exp() - r1 * (r2 * t).exp()) / (r2 - r1)
        }
    }

    /// Time after which the spring stays within `REST_DELTA` of the target.
    pub fn settle_duration_ms(&self) -> f64 {
        let omega0 = self.natural_frequency();
        let zeta = self.damping_ratio();

        let seconds = if zeta < 1.0 - CRITICAL_EPSILON {
            underdamped_settle_factor(zeta) / (zeta * omega0)
        } else {
            // Critically and over-damped motion approaches monotonically.
            let mut t_ms = 0.0;
            while t_ms < MAX_SETTLE_MS && 1.0 - self.position(t_ms) > REST_DELTA {
                t_ms += 1.0;
            }
            t_ms / 1000.0
        };
        (seconds * 1000.0).min(MAX_SETTLE_MS)
    }
}

/// `ln(1 / (ε·sqrt(1 - ζ²)))`: how many time constants the envelope of an
/// underdamped spring needs to shrink below `REST_DELTA`.
fn underdamped_settle_factor(zeta: f64) -> f64 {
    (1.0 / (REST_DELTA * (1.0 - zeta * zeta).sqrt())).ln()
}

/// Solve `(1 + u)·e^(-u) = ε` for `u = ω0·t` by bisection.
fn critical_settle_factor() -> f64 {
    let (mut lo, mut hi) = (1.0_f64, 50.0_f64);
    for _ in 0..60 {
        let mid = 0.5 * (lo + hi);
        if (1.0 + mid) * (-mid).exp() > REST_DELTA {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}
