//! Easing curves for the drawer slide.

use serde::{Deserialize, Serialize};

/// Easing functions mapping linear progress to eased progress
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EasingFunction {
    /// No easing (constant speed)
    Linear,

    /// Quadratic ease out
    EaseOutQuad,

    /// Cubic ease out, `1 - (1 - t)^3`
    #[default]
    EaseOutCubic,

    /// Cubic ease in and out
    EaseInOutCubic,
}

impl EasingFunction {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    ///
    /// Input outside the unit interval is clamped first, so `apply(0.0)` is
    /// exactly `0.0` and `apply(1.0)` exactly `1.0` for every curve.
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }

    /// Parse a config name (`"ease_out_cubic"`, `"linear"`, ...)
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "linear" => Some(Self::Linear),
            "ease_out_quad" => Some(Self::EaseOutQuad),
            "ease_out_cubic" => Some(Self::EaseOutCubic),
            "ease_in_out_cubic" => Some(Self::EaseInOutCubic),
            _ => None,
        }
    }
}
