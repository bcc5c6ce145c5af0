//! Display Metrics
//!
//! Work-area geometry, screen bounds and refresh rate for the drawer.
//!
//! The drawer code only sees [`DisplayMetricsProvider`], a pure query
//! interface where every geometry query may come back `None` (the display
//! server went away, a monitor was unplugged mid-query). [`ScreenMetrics`] is
//! the stock implementation over a raw [`DisplaySource`] enumeration.
//!
//! # Refresh rate resolution
//!
//! ```text
//! primary display frequency ──(missing)──► first internal display frequency
//!          │                                          │
//!       (error)                                   (missing)
//!          ▼                                          ▼
//!   minimum rate (60)                        preferred rate (120)
//! ```
//!
//! The preferred fallback is deliberately optimistic for modern panels. On a
//! 60 Hz display whose rate cannot be detected the drawer steps twice per
//! vsync, which is harmless but wasteful.

use std::time::Duration;

use crate::error::HostError;
use crate::geometry::{DrawerPosition, Rect, Size};

/// Refresh rate used when no display reports one
pub const PREFERRED_REFRESH_RATE: f64 = 120.0;

/// Refresh rate used when display metrics are unavailable altogether
pub const MIN_REFRESH_RATE: f64 = 60.0;

/// One physical display as reported by the windowing system
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayInfo {
    /// Toolkit-specific display id
    pub id: u64,
    /// Full screen bounds
    pub bounds: Rect,
    /// Usable region excluding taskbars and docks
    pub work_area: Rect,
    /// Device pixel ratio
    pub scale_factor: f64,
    /// Reported refresh rate in Hz, when the platform exposes it
    pub refresh_rate: Option<f64>,
    /// Whether this is a built-in panel (laptop screen)
    pub internal: bool,
}

/// Raw display enumeration provided by the windowing toolkit
pub trait DisplaySource: Send + Sync {
    /// The display hosting the taskbar / menu bar
    fn primary_display(&self) -> Result<DisplayInfo, HostError>;

    /// Every connected display
    fn all_displays(&self) -> Result<Vec<DisplayInfo>, HostError>;
}

/// Query interface the drawer and attachment code depend on
///
/// Implementations must never panic; unavailable metrics are `None`.
pub trait DisplayMetricsProvider: Send + Sync {
    /// Usable area of the primary display
    fn work_area(&self) -> Option<Rect>;

    /// Full bounds of the primary display
    fn screen_bounds(&self) -> Option<Rect>;

    /// Refresh rate in Hz, after fallbacks
    fn refresh_rate(&self) -> f64;

    /// Target time between animation frames
    fn frame_interval(&self) -> Duration {
        let rate = self.refresh_rate();
        let rate = if rate.is_finite() && rate > 0.0 {
            rate
        } else {
            MIN_REFRESH_RATE
        };
        Duration::from_secs_f64(1.0 / rate)
    }

    /// Resting and starting positions for a right-edge drawer of `width`
    fn drawer_position(&self, width: u32) -> Option<DrawerPosition>;
}

/// Fallback rates used by [`ScreenMetrics`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefreshRatePolicy {
    /// Used when displays are readable but report no frequency
    pub preferred: f64,
    /// Used when displays cannot be read at all
    pub minimum: f64,
}

impl Default for RefreshRatePolicy {
    fn default() -> Self {
        Self {
            preferred: PREFERRED_REFRESH_RATE,
            minimum: MIN_REFRESH_RATE,
        }
    }
}

/// [`DisplayMetricsProvider`] over a toolkit [`DisplaySource`]
pub struct ScreenMetrics<S> {
    source: S,
    policy: RefreshRatePolicy,
}

impl<S: DisplaySource> ScreenMetrics<S> {
    /// Wrap a display source with the default fallback rates
    pub fn new(source: S) -> Self {
        Self {
            source,
            policy: RefreshRatePolicy::default(),
        }
    }

    /// Override the fallback rates
    #[must_use]
    pub fn with_policy(mut self, policy: RefreshRatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    fn primary(&self) -> Option<DisplayInfo> {
        match self.source.primary_display() {
            Ok(display) => Some(display),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read primary display");
                None
            }
        }
    }

    /// Height of the strip the work area excludes (taskbar, dock)
    #[must_use]
    pub fn taskbar_height(&self) -> u32 {
        match (self.screen_bounds(), self.work_area()) {
            (Some(screen), Some(work)) => screen.height.saturating_sub(work.height),
            _ => 0,
        }
    }

    /// Drawer size that fits the work area: full height, at most 400 wide
    /// with 100px of breathing room
    #[must_use]
    pub fn optimal_drawer_size(&self, preferred_width: u32) -> Size {
        match self.work_area() {
            Some(work) => Size {
                width: preferred_width.min(work.width.saturating_sub(100)),
                height: work.height,
            },
            None => Size {
                width: preferred_width,
                height: 600,
            },
        }
    }

    /// X coordinate just past the right edge of the primary screen
    #[must_use]
    pub fn off_screen_x(&self) -> Option<i32> {
        self.screen_bounds().map(|screen| screen.right())
    }

    /// Whether the resolved refresh rate is above 60 Hz
    #[must_use]
    pub fn supports_high_refresh_rate(&self) -> bool {
        self.refresh_rate() > 60.0
    }

    /// Dump every display at debug level
    pub fn log_display_info(&self) {
        let primary_id = self.primary().map(|d| d.id);
        match self.source.all_displays() {
            Ok(displays) => {
                for (index, info) in displays.iter().enumerate() {
                    tracing::debug!(
                        index = index + 1,
                        id = info.id,
                        bounds = %info.bounds,
                        work_area = %info.work_area,
                        scale_factor = info.scale_factor,
                        refresh_rate = ?info.refresh_rate,
                        primary = primary_id == Some(info.id),
                        internal = info.internal,
                        "Display"
                    );
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to enumerate displays"),
        }
    }
}

impl<S: DisplaySource> DisplayMetricsProvider for ScreenMetrics<S> {
    fn work_area(&self) -> Option<Rect> {
        self.primary().map(|d| d.work_area)
    }

    fn screen_bounds(&self) -> Option<Rect> {
        self.primary().map(|d| d.bounds)
    }

    fn refresh_rate(&self) -> f64 {
        let primary = match self.source.primary_display() {
            Ok(display) => display,
            Err(e) => {
                tracing::warn!(error = %e, rate = self.policy.minimum, "Refresh rate unavailable");
                return self.policy.minimum;
            }
        };

        if let Some(rate) = primary.refresh_rate.filter(|r| *r > 0.0) {
            tracing::debug!(rate, "Primary display refresh rate");
            return rate;
        }

        let internal = self
            .source
            .all_displays()
            .unwrap_or_default()
            .into_iter()
            .find_map(|d| d.refresh_rate.filter(|r| d.internal && *r > 0.0));
        if let Some(rate) = internal {
            tracing::debug!(rate, "Internal display refresh rate");
            return rate;
        }

        tracing::debug!(
            rate = self.policy.preferred,
            "Refresh rate not reported, using preferred fallback"
        );
        self.policy.preferred
    }

    fn drawer_position(&self, width: u32) -> Option<DrawerPosition> {
        let display = self.primary()?;
        Some(drawer_position_for(display.bounds, display.work_area, width))
    }
}

/// Right-edge drawer placement for a screen and its work area
///
/// The drawer rests flush with the right edge (never left of x = 0), top
/// aligned with the work area, and starts just past the screen edge.
#[must_use]
pub fn drawer_position_for(screen: Rect, work_area: Rect, width: u32) -> DrawerPosition {
    DrawerPosition {
        final_x: (screen.right() - i32::try_from(width).unwrap_or(i32::MAX)).max(0),
        final_y: work_area.y,
        start_x: screen.right(),
    }
}
