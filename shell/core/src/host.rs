//! Host Abstractions
//!
//! The core never talks to a windowing toolkit directly. Native windows and
//! the embedded content view are reached through the traits in this module,
//! which the embedding application implements (and which [`crate::headless`]
//! implements in memory for tests and the simulator).
//!
//! All methods are synchronous and cheap; anything slow on the native side is
//! expected to be queued by the implementation. Fallible calls return
//! [`HostError`] so a destroyed window can be reported instead of panicking.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::geometry::Rect;

/// Identity of one of the two long-lived host containers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerId {
    /// The full application window
    Primary,
    /// The slide-in drawer
    Auxiliary,
}

impl ContainerId {
    /// Both containers, primary first
    pub const ALL: [ContainerId; 2] = [ContainerId::Primary, ContainerId::Auxiliary];

    /// Short lowercase name used in logs
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Auxiliary => "auxiliary",
        }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stacking level requested when raising a container above others
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TopMostLevel {
    /// Ordinary always-on-top
    #[default]
    Floating,
    /// Above panels and the taskbar, used for the drawer
    PopUpMenu,
}

/// A window-like presentation target that can hold the shared surface
pub trait HostContainer: Send + Sync {
    /// Make the container visible
    fn show(&self) -> Result<(), HostError>;

    /// Hide the container without destroying it
    fn hide(&self) -> Result<(), HostError>;

    /// Whether the container is currently visible
    fn is_visible(&self) -> bool;

    /// Whether the native window has been destroyed
    fn is_destroyed(&self) -> bool;

    /// Whether the container fills the screen in fullscreen mode
    fn is_fullscreen(&self) -> bool {
        false
    }

    /// Move and resize the container
    fn set_bounds(&self, bounds: Rect) -> Result<(), HostError>;

    /// Move the container without resizing it
    fn set_position(&self, x: i32, y: i32) -> Result<(), HostError>;

    /// Current outer bounds in screen coordinates
    fn bounds(&self) -> Result<Rect, HostError>;

    /// Give the container input focus
    fn focus(&self) -> Result<(), HostError>;

    /// Raise (or lower) the container above other windows
    fn set_top_most(&self, top_most: bool, level: TopMostLevel) -> Result<(), HostError>;

    /// Whether the shared surface is currently one of this container's children
    fn has_child_surface(&self) -> bool;

    /// Add the shared surface as a child view
    ///
    /// Only the attachment controller calls this.
    fn add_child_surface(&self) -> Result<(), HostError>;

    /// Remove the shared surface from this container's children
    ///
    /// Only the attachment controller calls this.
    fn remove_child_surface(&self) -> Result<(), HostError>;
}

/// The single embedded content view that moves between containers
pub trait SharedContentSurface: Send + Sync {
    /// Position the surface inside its current container (container-local)
    fn set_bounds(&self, bounds: Rect) -> Result<(), HostError>;

    /// Request an immediate repaint
    fn invalidate(&self);

    /// Ask the hosted content to re-run its layout as if the window resized
    fn force_content_resize_notification(&self);
}
