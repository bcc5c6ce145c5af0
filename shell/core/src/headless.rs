//! Headless Host
//!
//! In-memory implementations of the host traits, used by the test suites and
//! the `sideshell-sim` binary. Every call is recorded so tests can assert on
//! what the core asked the windowing system to do.
//!
//! # Usage
//!
//! ```ignore
//! let surface = HeadlessSurface::new();
//! let drawer = HeadlessContainer::new(ContainerId::Auxiliary, surface.clone(), Rect::new(1920, 0, 400, 1040));
//!
//! // Destroy the drawer window after three animation frames
//! drawer.destroy_after_positions(3);
//! ```
//!
//! The surface tracks every container that claims it as a child, so
//! [`HeadlessSurface::max_simultaneous_parents`] exposes any moment where two
//! containers held it at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::display::{drawer_position_for, DisplayInfo, DisplayMetricsProvider, DisplaySource};
use crate::drawer::ShellHooks;
use crate::error::HostError;
use crate::geometry::{DrawerPosition, Rect};
use crate::host::{ContainerId, HostContainer, SharedContentSurface, TopMostLevel};

// ============================================================================
// Shared Surface
// ============================================================================

/// Calls recorded on a [`HeadlessSurface`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// `set_bounds`
    SetBounds(Rect),
    /// `invalidate`
    Invalidate,
    /// `force_content_resize_notification`
    ResizeNotification,
}

#[derive(Default)]
struct SurfaceState {
    parents: Vec<ContainerId>,
    max_parents: usize,
    events: Vec<SurfaceEvent>,
}

/// Recording [`SharedContentSurface`]
#[derive(Default)]
pub struct HeadlessSurface {
    state: Mutex<SurfaceState>,
}

impl HeadlessSurface {
    /// Create a surface with no parent
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// First container holding the surface
    #[must_use]
    pub fn parent(&self) -> Option<ContainerId> {
        self.state.lock().parents.first().copied()
    }

    /// Every container currently holding the surface
    #[must_use]
    pub fn parents(&self) -> Vec<ContainerId> {
        self.state.lock().parents.clone()
    }

    /// Highest number of simultaneous parents ever observed
    #[must_use]
    pub fn max_simultaneous_parents(&self) -> usize {
        self.state.lock().max_parents
    }

    /// All recorded calls, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.state.lock().events.clone()
    }

    /// Bounds passed to `set_bounds`, oldest first
    #[must_use]
    pub fn bounds_history(&self) -> Vec<Rect> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::SetBounds(bounds) => Some(*bounds),
                _ => None,
            })
            .collect()
    }

    /// How many times `event` was recorded
    #[must_use]
    pub fn count(&self, event: &SurfaceEvent) -> usize {
        self.state.lock().events.iter().filter(|e| *e == event).count()
    }

    /// Forget recorded calls (parents are kept)
    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    fn adopt(&self, parent: ContainerId) {
        let mut state = self.state.lock();
        if !state.parents.contains(&parent) {
            state.parents.push(parent);
        }
        state.max_parents = state.max_parents.max(state.parents.len());
    }

    fn orphan(&self, parent: ContainerId) {
        self.state.lock().parents.retain(|p| *p != parent);
    }
}

impl SharedContentSurface for HeadlessSurface {
    fn set_bounds(&self, bounds: Rect) -> Result<(), HostError> {
        self.state.lock().events.push(SurfaceEvent::SetBounds(bounds));
        Ok(())
    }

    fn invalidate(&self) {
        self.state.lock().events.push(SurfaceEvent::Invalidate);
    }

    fn force_content_resize_notification(&self) {
        self.state.lock().events.push(SurfaceEvent::ResizeNotification);
    }
}

// ============================================================================
// Containers
// ============================================================================

/// Calls recorded on a [`HeadlessContainer`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerEvent {
    /// `show`
    Show,
    /// `hide`
    Hide,
    /// `focus`
    Focus,
    /// `set_bounds`
    SetBounds(Rect),
    /// `set_position`
    SetPosition {
        /// New left edge
        x: i32,
        /// New top edge
        y: i32,
    },
    /// `set_top_most`
    TopMost(bool, TopMostLevel),
    /// Successful `add_child_surface`
    AddSurface,
    /// Successful `remove_child_surface`
    RemoveSurface,
}

struct ContainerState {
    bounds: Rect,
    visible: bool,
    destroyed: bool,
    fullscreen: bool,
    has_child: bool,
    fail_add: Option<String>,
    fail_remove: Option<String>,
    destroy_after_positions: Option<u32>,
    events: Vec<ContainerEvent>,
}

/// Recording [`HostContainer`] with failure injection
pub struct HeadlessContainer {
    id: ContainerId,
    surface: Arc<HeadlessSurface>,
    state: Mutex<ContainerState>,
}

impl HeadlessContainer {
    /// Create a hidden container with the given outer bounds
    #[must_use]
    pub fn new(id: ContainerId, surface: Arc<HeadlessSurface>, bounds: Rect) -> Arc<Self> {
        Arc::new(Self {
            id,
            surface,
            state: Mutex::new(ContainerState {
                bounds,
                visible: false,
                destroyed: false,
                fullscreen: false,
                has_child: false,
                fail_add: None,
                fail_remove: None,
                destroy_after_positions: None,
                events: Vec::new(),
            }),
        })
    }

    /// Which container this stands in for
    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Simulate the native window closing; children go with it
    pub fn destroy(&self) {
        let mut state = self.state.lock();
        state.destroyed = true;
        state.visible = false;
        if std::mem::take(&mut state.has_child) {
            self.surface.orphan(self.id);
        }
    }

    /// Destroy the container once `n` more positions have been applied
    pub fn destroy_after_positions(&self, n: u32) {
        if n == 0 {
            self.destroy();
        } else {
            self.state.lock().destroy_after_positions = Some(n);
        }
    }

    /// Toggle fullscreen mode
    pub fn set_fullscreen(&self, fullscreen: bool) {
        self.state.lock().fullscreen = fullscreen;
    }

    /// Change visibility without recording a call (user action, OS focus change)
    pub fn set_visible(&self, visible: bool) {
        self.state.lock().visible = visible;
    }

    /// Resize the outer bounds without recording a call
    pub fn resize_to(&self, bounds: Rect) {
        self.state.lock().bounds = bounds;
    }

    /// Make the next `add_child_surface` fail
    pub fn fail_next_add(&self, reason: &str) {
        self.state.lock().fail_add = Some(reason.to_string());
    }

    /// Make the next `remove_child_surface` fail
    pub fn fail_next_remove(&self, reason: &str) {
        self.state.lock().fail_remove = Some(reason.to_string());
    }

    /// Current outer bounds, even if destroyed
    #[must_use]
    pub fn current_bounds(&self) -> Rect {
        self.state.lock().bounds
    }

    /// All recorded calls, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<ContainerEvent> {
        self.state.lock().events.clone()
    }

    /// Forget recorded calls
    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// How many times `event` was recorded
    #[must_use]
    pub fn count(&self, event: &ContainerEvent) -> usize {
        self.state.lock().events.iter().filter(|e| *e == event).count()
    }

    /// X coordinates passed to `set_position`, oldest first
    #[must_use]
    pub fn x_positions(&self) -> Vec<i32> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                ContainerEvent::SetPosition { x, .. } => Some(*x),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ContainerEvent) -> Result<(), HostError> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(HostError::Destroyed);
        }
        state.events.push(event);
        Ok(())
    }
}

impl HostContainer for HeadlessContainer {
    fn show(&self) -> Result<(), HostError> {
        self.record(ContainerEvent::Show)?;
        self.state.lock().visible = true;
        Ok(())
    }

    fn hide(&self) -> Result<(), HostError> {
        self.record(ContainerEvent::Hide)?;
        self.state.lock().visible = false;
        Ok(())
    }

    fn is_visible(&self) -> bool {
        let state = self.state.lock();
        state.visible && !state.destroyed
    }

    fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    fn is_fullscreen(&self) -> bool {
        self.state.lock().fullscreen
    }

    fn set_bounds(&self, bounds: Rect) -> Result<(), HostError> {
        self.record(ContainerEvent::SetBounds(bounds))?;
        self.state.lock().bounds = bounds;
        Ok(())
    }

    fn set_position(&self, x: i32, y: i32) -> Result<(), HostError> {
        self.record(ContainerEvent::SetPosition { x, y })?;

        let destroy_now = {
            let mut state = self.state.lock();
            state.bounds = state.bounds.at(x, y);
            match state.destroy_after_positions {
                Some(remaining) if remaining <= 1 => {
                    state.destroy_after_positions = None;
                    true
                }
                Some(remaining) => {
                    state.destroy_after_positions = Some(remaining - 1);
                    false
                }
                None => false,
            }
        };
        if destroy_now {
            self.destroy();
        }
        Ok(())
    }

    fn bounds(&self) -> Result<Rect, HostError> {
        let state = self.state.lock();
        if state.destroyed {
            return Err(HostError::Destroyed);
        }
        Ok(state.bounds)
    }

    fn focus(&self) -> Result<(), HostError> {
        self.record(ContainerEvent::Focus)
    }

    fn set_top_most(&self, top_most: bool, level: TopMostLevel) -> Result<(), HostError> {
        self.record(ContainerEvent::TopMost(top_most, level))
    }

    fn has_child_surface(&self) -> bool {
        self.state.lock().has_child
    }

    fn add_child_surface(&self) -> Result<(), HostError> {
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return Err(HostError::Destroyed);
            }
            if let Some(reason) = state.fail_add.take() {
                return Err(HostError::Operation(reason));
            }
            state.has_child = true;
            state.events.push(ContainerEvent::AddSurface);
        }
        self.surface.adopt(self.id);
        Ok(())
    }

    fn remove_child_surface(&self) -> Result<(), HostError> {
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return Err(HostError::Destroyed);
            }
            if let Some(reason) = state.fail_remove.take() {
                return Err(HostError::Operation(reason));
            }
            state.has_child = false;
            state.events.push(ContainerEvent::RemoveSurface);
        }
        self.surface.orphan(self.id);
        Ok(())
    }
}

// ============================================================================
// Displays
// ============================================================================

/// Fixed [`DisplaySource`]; can be switched to unavailable at runtime
pub struct StaticDisplays {
    displays: Mutex<Option<(DisplayInfo, Vec<DisplayInfo>)>>,
}

impl StaticDisplays {
    /// One display that is both primary and the only entry
    #[must_use]
    pub fn single(display: DisplayInfo) -> Self {
        Self::new(display.clone(), vec![display])
    }

    /// A primary display plus the full enumeration
    #[must_use]
    pub fn new(primary: DisplayInfo, all: Vec<DisplayInfo>) -> Self {
        Self {
            displays: Mutex::new(Some((primary, all))),
        }
    }

    /// A source whose every query fails
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            displays: Mutex::new(None),
        }
    }

    /// Make every subsequent query fail
    pub fn disconnect(&self) {
        *self.displays.lock() = None;
    }
}

impl DisplaySource for StaticDisplays {
    fn primary_display(&self) -> Result<DisplayInfo, HostError> {
        self.displays
            .lock()
            .as_ref()
            .map(|(primary, _)| primary.clone())
            .ok_or_else(|| HostError::Operation("display server unavailable".to_string()))
    }

    fn all_displays(&self) -> Result<Vec<DisplayInfo>, HostError> {
        self.displays
            .lock()
            .as_ref()
            .map(|(_, all)| all.clone())
            .ok_or_else(|| HostError::Operation("display server unavailable".to_string()))
    }
}

struct MetricsState {
    screen: Option<Rect>,
    work_area: Option<Rect>,
    refresh_rate: f64,
}

/// [`DisplayMetricsProvider`] whose answers are set directly
///
/// Unlike [`StaticDisplays`], the screen bounds and work area can go missing
/// independently.
pub struct StaticMetrics {
    state: Mutex<MetricsState>,
}

impl StaticMetrics {
    /// Metrics for one screen
    #[must_use]
    pub fn new(screen: Rect, work_area: Rect, refresh_rate: f64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MetricsState {
                screen: Some(screen),
                work_area: Some(work_area),
                refresh_rate,
            }),
        })
    }

    /// Override the screen bounds answer
    pub fn set_screen_bounds(&self, screen: Option<Rect>) {
        self.state.lock().screen = screen;
    }

    /// Override the work area answer
    pub fn set_work_area(&self, work_area: Option<Rect>) {
        self.state.lock().work_area = work_area;
    }

    /// Override the refresh rate
    pub fn set_refresh_rate(&self, refresh_rate: f64) {
        self.state.lock().refresh_rate = refresh_rate;
    }
}

impl DisplayMetricsProvider for StaticMetrics {
    fn work_area(&self) -> Option<Rect> {
        self.state.lock().work_area
    }

    fn screen_bounds(&self) -> Option<Rect> {
        self.state.lock().screen
    }

    fn refresh_rate(&self) -> f64 {
        self.state.lock().refresh_rate
    }

    fn drawer_position(&self, width: u32) -> Option<DrawerPosition> {
        let state = self.state.lock();
        Some(drawer_position_for(state.screen?, state.work_area?, width))
    }
}

// ============================================================================
// Hooks
// ============================================================================

/// Calls recorded on [`RecordingHooks`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookEvent {
    /// `stop_interaction`
    StopInteraction,
    /// `refresh_menu`
    RefreshMenu,
    /// `animating_changed`
    AnimatingChanged(bool),
}

/// Recording [`ShellHooks`]
#[derive(Default)]
pub struct RecordingHooks {
    interaction_active: AtomicBool,
    events: Mutex<Vec<HookEvent>>,
}

impl RecordingHooks {
    /// Hooks with no interactive session running
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pretend an interactive session is (or is not) running
    pub fn set_interaction_active(&self, active: bool) {
        self.interaction_active.store(active, Ordering::SeqCst);
    }

    /// All recorded calls, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().clone()
    }

    /// How many times `event` was recorded
    #[must_use]
    pub fn count(&self, event: &HookEvent) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }
}

impl ShellHooks for RecordingHooks {
    fn is_interaction_active(&self) -> bool {
        self.interaction_active.load(Ordering::SeqCst)
    }

    fn stop_interaction(&self) {
        self.interaction_active.store(false, Ordering::SeqCst);
        self.events.lock().push(HookEvent::StopInteraction);
    }

    fn refresh_menu(&self) {
        self.events.lock().push(HookEvent::RefreshMenu);
    }

    fn animating_changed(&self, animating: bool) {
        self.events.lock().push(HookEvent::AnimatingChanged(animating));
    }
}
