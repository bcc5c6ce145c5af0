//! Settle Delays
//!
//! Fixed waits inserted after operations that affect the host compositor.
//! Native toolkits give no "attachment acknowledged" or "layout committed"
//! signal, so these delays stand in for one. The values were tuned on real
//! hardware; shortening them brings back flicker and half-sized content.
//!
//! They are deliberately not configurable.

use std::time::Duration;

/// Wait after adding or removing the surface from a container
pub const SETTLE_DELAY: Duration = Duration::from_millis(10);

/// Wait after a successful attach before recomputing surface bounds
pub const BOUNDS_REFRESH_DELAY: Duration = Duration::from_millis(50);

/// Wait before the synthetic resize notification sent after a bounds change
pub const RESIZE_NOTIFY_DELAY: Duration = Duration::from_millis(20);

/// Wait before the second invalidate sent after a bounds change
pub const REINVALIDATE_DELAY: Duration = Duration::from_millis(50);

/// Wait between attaching to the drawer and the interim bounds refresh
pub const INTERIM_REFRESH_DELAY: Duration = Duration::from_millis(100);

/// Wait between the interim bounds refresh and the start of the slide-in
pub const SLIDE_START_DELAY: Duration = Duration::from_millis(150);

/// Wait between finishing an animation and invoking its completion callback
pub const COMPLETION_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// How long a blur-initiated hide suppresses the next toggle
pub const BLUR_SUPPRESS_WINDOW: Duration = Duration::from_millis(500);
