//! Drawer Animator
//!
//! Shows and hides the auxiliary container with a horizontal slide from the
//! right screen edge, coordinating with [`ViewAttachmentController`] so the
//! shared surface is inside the drawer before it becomes visible.
//!
//! ```text
//! show:  focus ─► place off-screen ─► show + raise ─► attach(auxiliary)
//!          ─► 100ms ─► refresh bounds ─► 150ms ─► slide in ─► refresh bounds
//!
//! hide:  stop interaction ─► slide out ─► hide ─► 50ms ─► callback
//! ```
//!
//! At most one show or hide runs at a time. A request that arrives while one
//! is running is rejected, not queued; hide callbacks still fire in that case
//! so callers waiting on them never hang.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::animation::{self, AnimationSession, SlideDirection, SlideOutcome, SlideSpec};
use crate::attachment::ViewAttachmentController;
use crate::config::AnimationConfig;
use crate::display::DisplayMetricsProvider;
use crate::error::ShellError;
use crate::geometry::Rect;
use crate::host::{ContainerId, HostContainer, TopMostLevel};
use crate::timing::{COMPLETION_SETTLE_DELAY, INTERIM_REFRESH_DELAY, SLIDE_START_DELAY};

/// Invoked once when a hide has finished (or been abandoned)
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Application callbacks the drawer notifies
///
/// Every method has a no-op default.
pub trait ShellHooks: Send + Sync {
    /// Whether an interactive session (voice, capture) is running
    fn is_interaction_active(&self) -> bool {
        false
    }

    /// Stop the interactive session before the drawer closes
    fn stop_interaction(&self) {}

    /// Rebuild tray / menu state after visibility changed
    fn refresh_menu(&self) {}

    /// The drawer started or stopped animating
    fn animating_changed(&self, _animating: bool) {}
}

/// [`ShellHooks`] that ignores everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl ShellHooks for NoopHooks {}

/// Result of a show request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShowOutcome {
    /// The drawer slid in and holds the surface
    Shown,
    /// Another show or hide was running
    AlreadyAnimating,
    /// No live auxiliary container is installed
    ContainerMissing,
    /// Work area or screen bounds could not be read
    DisplayUnavailable,
    /// The surface could not be moved into the drawer
    AttachFailed,
    /// The drawer was destroyed before the slide finished
    TargetLost,
}

/// Result of a hide request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HideOutcome {
    /// The drawer slid out and is hidden
    Hidden,
    /// The drawer was missing or already hidden
    NotVisible,
    /// Another show or hide was running
    AlreadyAnimating,
    /// Screen bounds could not be read
    DisplayUnavailable,
    /// The drawer was destroyed before the slide finished
    TargetLost,
}

/// Clears the animating flag when dropped
struct AnimatingGuard<'a> {
    animator: &'a DrawerAnimator,
}

impl Drop for AnimatingGuard<'_> {
    fn drop(&mut self) {
        self.animator.set_animating(false);
    }
}

struct DrawerInner {
    attachment: ViewAttachmentController,
    metrics: Arc<dyn DisplayMetricsProvider>,
    hooks: Arc<dyn ShellHooks>,
    animation: AnimationConfig,
    width: u32,
    animating: AtomicBool,
}

/// Slide-in drawer controller
///
/// Cloning is cheap; clones share the animating flag.
#[derive(Clone)]
pub struct DrawerAnimator {
    inner: Arc<DrawerInner>,
}

impl DrawerAnimator {
    /// Create an idle animator for a drawer of `width` pixels
    pub fn new(
        attachment: ViewAttachmentController,
        metrics: Arc<dyn DisplayMetricsProvider>,
        hooks: Arc<dyn ShellHooks>,
        animation: AnimationConfig,
        width: u32,
    ) -> Self {
        Self {
            inner: Arc::new(DrawerInner {
                attachment,
                metrics,
                hooks,
                animation,
                width,
                animating: AtomicBool::new(false),
            }),
        }
    }

    /// Whether a show or hide is in progress
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.inner.animating.load(Ordering::SeqCst)
    }

    /// Forget an in-progress animation (the drawer window closed)
    pub fn clear_animating(&self) {
        self.set_animating(false);
    }

    fn set_animating(&self, animating: bool) {
        if self.inner.animating.swap(animating, Ordering::SeqCst) != animating {
            self.inner.hooks.animating_changed(animating);
        }
    }

    fn try_begin(&self) -> Option<AnimatingGuard<'_>> {
        self.inner
            .animating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        self.inner.hooks.animating_changed(true);
        Some(AnimatingGuard { animator: self })
    }

    /// Slide the drawer in from the right edge and move the surface into it
    ///
    /// Resolves when the slide has finished or the request was rejected.
    pub async fn show(&self) -> ShowOutcome {
        let attachment = &self.inner.attachment;
        let Some(container) = attachment.containers().live(ContainerId::Auxiliary) else {
            tracing::warn!("Cannot show drawer: container missing");
            return ShowOutcome::ContainerMissing;
        };
        let Some(guard) = self.try_begin() else {
            tracing::debug!("Drawer already animating, ignoring show");
            return ShowOutcome::AlreadyAnimating;
        };

        if let Err(e) = container.focus() {
            tracing::warn!(error = %e, "Failed to focus drawer");
        }

        let metrics = &self.inner.metrics;
        let (Some(work_area), Some(position)) =
            (metrics.work_area(), metrics.drawer_position(self.inner.width))
        else {
            tracing::error!(error = %ShellError::DisplayUnavailable, "Cannot show drawer");
            return ShowOutcome::DisplayUnavailable;
        };

        // Start fully off-screen at full work-area height
        let start = Rect::new(
            position.start_x,
            position.final_y,
            self.inner.width,
            work_area.height,
        );
        if let Err(e) = container.set_bounds(start) {
            tracing::warn!(error = %e, "Failed to place drawer off-screen");
            return ShowOutcome::TargetLost;
        }
        if let Err(e) = container.show() {
            tracing::warn!(error = %e, "Failed to show drawer");
        }
        if let Err(e) = container.set_top_most(true, TopMostLevel::PopUpMenu) {
            tracing::warn!(error = %e, "Failed to raise drawer");
        }

        if let Err(e) = attachment.attach(ContainerId::Auxiliary).await {
            tracing::error!(error = %e, "Failed to attach surface to drawer");
            return ShowOutcome::AttachFailed;
        }

        tokio::time::sleep(INTERIM_REFRESH_DELAY).await;
        if attachment.current_owner() == Some(ContainerId::Auxiliary) {
            attachment.refresh_bounds(ContainerId::Auxiliary);
        }
        tokio::time::sleep(SLIDE_START_DELAY).await;

        let spec = SlideSpec {
            start_x: position.start_x,
            end_x: position.final_x,
            y: position.final_y,
            direction: SlideDirection::Show,
        };
        match self.slide(container, spec, guard, None).await {
            SlideOutcome::Completed { .. } => ShowOutcome::Shown,
            SlideOutcome::TargetLost { .. } => ShowOutcome::TargetLost,
        }
    }

    /// Slide the drawer out past the right edge and hide it
    ///
    /// `on_complete` runs exactly once: after the hide settles, or right away
    /// if the request is rejected or the drawer is lost mid-slide.
    pub async fn hide(&self, on_complete: Option<CompletionCallback>) -> HideOutcome {
        let finish = |outcome: HideOutcome, callback: Option<CompletionCallback>| {
            if let Some(callback) = callback {
                callback();
            }
            outcome
        };

        let container = match self.inner.attachment.containers().live(ContainerId::Auxiliary) {
            Some(container) if container.is_visible() => container,
            _ => {
                tracing::debug!("Drawer not visible, nothing to hide");
                return finish(HideOutcome::NotVisible, on_complete);
            }
        };
        if self.is_animating() {
            tracing::debug!("Drawer already animating, ignoring hide");
            return finish(HideOutcome::AlreadyAnimating, on_complete);
        }

        let hooks = &self.inner.hooks;
        if hooks.is_interaction_active() {
            tracing::info!("Drawer closing, stopping interaction");
            hooks.stop_interaction();
        }

        let Some(guard) = self.try_begin() else {
            return finish(HideOutcome::AlreadyAnimating, on_complete);
        };

        let Some(screen) = self.inner.metrics.screen_bounds() else {
            tracing::error!(error = %ShellError::DisplayUnavailable, "Cannot hide drawer");
            drop(guard);
            return finish(HideOutcome::DisplayUnavailable, on_complete);
        };
        let current = match container.bounds() {
            Ok(bounds) => bounds,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read drawer bounds");
                drop(guard);
                return finish(HideOutcome::TargetLost, on_complete);
            }
        };

        let spec = SlideSpec {
            start_x: current.x,
            end_x: screen.right(),
            y: current.y,
            direction: SlideDirection::Hide,
        };
        match self.slide(container, spec, guard, on_complete).await {
            SlideOutcome::Completed { .. } => HideOutcome::Hidden,
            SlideOutcome::TargetLost { .. } => HideOutcome::TargetLost,
        }
    }

    /// Run one slide and its completion steps
    ///
    /// The animating flag is cleared before the callback's settle delay, so
    /// the callback may start another show.
    async fn slide(
        &self,
        container: Arc<dyn HostContainer>,
        spec: SlideSpec,
        guard: AnimatingGuard<'_>,
        on_complete: Option<CompletionCallback>,
    ) -> SlideOutcome {
        let frame_interval = self.inner.metrics.frame_interval();
        let animation = self.inner.animation;
        tracing::info!(
            direction = ?spec.direction,
            start_x = spec.start_x,
            end_x = spec.end_x,
            frame_interval_ms = frame_interval.as_secs_f64() * 1000.0,
            "Starting drawer slide"
        );

        let session = AnimationSession::new(
            spec,
            animation.duration,
            frame_interval,
            animation.easing,
            tokio::time::Instant::now(),
        );
        let outcome = animation::drive(session, container.as_ref()).await;

        match outcome {
            SlideOutcome::TargetLost { frames } => {
                tracing::warn!(
                    error = %ShellError::AnimationTargetLost(ContainerId::Auxiliary),
                    frames,
                    "Drawer slide aborted"
                );
                drop(guard);
                if let Some(callback) = on_complete {
                    callback();
                }
            }
            SlideOutcome::Completed { frames } => {
                tracing::debug!(frames, direction = ?spec.direction, "Drawer slide finished");
                self.finish_slide(container.as_ref(), spec.direction);
                drop(guard);
                if let Some(callback) = on_complete {
                    tokio::time::sleep(COMPLETION_SETTLE_DELAY).await;
                    callback();
                }
            }
        }
        outcome
    }

    fn finish_slide(&self, container: &dyn HostContainer, direction: SlideDirection) {
        match direction {
            SlideDirection::Show => {
                let attachment = &self.inner.attachment;
                if attachment.current_owner() == Some(ContainerId::Auxiliary) {
                    attachment.refresh_bounds(ContainerId::Auxiliary);
                }
            }
            SlideDirection::Hide => {
                if let Err(e) = container.hide() {
                    tracing::warn!(error = %e, "Failed to hide drawer");
                }
            }
        }
        self.inner.hooks.refresh_menu();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use crate::attachment::ContainerRegistry;
    use crate::config::LayoutConfig;
    use crate::headless::{
        ContainerEvent, HeadlessContainer, HeadlessSurface, HookEvent, RecordingHooks,
        StaticMetrics,
    };

    struct Fixture {
        surface: Arc<HeadlessSurface>,
        drawer_window: Arc<HeadlessContainer>,
        metrics: Arc<StaticMetrics>,
        hooks: Arc<RecordingHooks>,
        attachment: ViewAttachmentController,
        drawer: DrawerAnimator,
    }

    fn fixture() -> Fixture {
        let surface = HeadlessSurface::new();
        let drawer_window = HeadlessContainer::new(
            ContainerId::Auxiliary,
            surface.clone(),
            Rect::new(1520, 0, 400, 860),
        );
        let containers = ContainerRegistry::new();
        containers.install(ContainerId::Auxiliary, drawer_window.clone());
        let attachment =
            ViewAttachmentController::new(surface.clone(), containers, LayoutConfig::default());
        let metrics = StaticMetrics::new(
            Rect::new(0, 0, 1520, 900),
            Rect::new(0, 0, 1520, 860),
            120.0,
        );
        let hooks = RecordingHooks::new();
        let drawer = DrawerAnimator::new(
            attachment.clone(),
            metrics.clone(),
            hooks.clone(),
            AnimationConfig::default(),
            400,
        );
        Fixture {
            surface,
            drawer_window,
            metrics,
            hooks,
            attachment,
            drawer,
        }
    }

    fn counting_callback() -> (Arc<AtomicUsize>, CompletionCallback) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let callback: CompletionCallback = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (calls, callback)
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_slides_in_and_attaches() {
        let f = fixture();

        assert_eq!(f.drawer.show().await, ShowOutcome::Shown);

        let xs = f.drawer_window.x_positions();
        assert_eq!(xs.first().copied(), Some(1520));
        assert_eq!(xs.last().copied(), Some(1120));
        assert!(xs.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(f.attachment.current_owner(), Some(ContainerId::Auxiliary));
        assert!(!f.drawer.is_animating());
        assert!(f
            .drawer_window
            .events()
            .contains(&ContainerEvent::TopMost(true, TopMostLevel::PopUpMenu)));
        assert_eq!(f.hooks.count(&HookEvent::RefreshMenu), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_rejected_while_animating() {
        let f = fixture();
        let first = tokio::spawn({
            let drawer = f.drawer.clone();
            async move { drawer.show().await }
        });
        tokio::task::yield_now().await;
        assert!(f.drawer.is_animating());

        let bounds_before = f.drawer_window.current_bounds();
        assert_eq!(f.drawer.show().await, ShowOutcome::AlreadyAnimating);
        assert_eq!(f.drawer_window.current_bounds(), bounds_before);

        assert_eq!(first.await.unwrap(), ShowOutcome::Shown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_without_work_area() {
        let f = fixture();
        f.metrics.set_work_area(None);

        assert_eq!(f.drawer.show().await, ShowOutcome::DisplayUnavailable);
        assert!(!f.drawer.is_animating());
        assert!(f.drawer_window.x_positions().is_empty());
        assert!(!f.drawer_window.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hide_slides_out_then_calls_back() {
        let f = fixture();
        f.drawer.show().await;
        f.drawer_window.clear_events();
        let (calls, callback) = counting_callback();

        assert_eq!(f.drawer.hide(Some(callback)).await, HideOutcome::Hidden);

        let xs = f.drawer_window.x_positions();
        assert_eq!(xs.first().copied(), Some(1120));
        assert_eq!(xs.last().copied(), Some(1520));
        assert!(!f.drawer_window.is_visible());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!f.drawer.is_animating());
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_refreshes_bounds_before_and_after_slide() {
        let f = fixture();
        let inner = Rect::new(0, 8, 388, 844);

        let show = tokio::spawn({
            let drawer = f.drawer.clone();
            async move { drawer.show().await }
        });

        // Deferred refresh from the attach (settle + 50ms)
        tokio::time::sleep(INTERIM_REFRESH_DELAY - Duration::from_millis(5)).await;
        assert_eq!(f.surface.bounds_history(), vec![inner]);

        // Interim refresh once the drawer has held the surface for 100ms
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(f.surface.bounds_history(), vec![inner, inner]);
        assert!(f.drawer_window.x_positions().is_empty());

        // Final refresh after the last frame
        assert_eq!(show.await.unwrap(), ShowOutcome::Shown);
        assert_eq!(f.surface.bounds_history(), vec![inner, inner, inner]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hide_callback_waits_for_settle_delay() {
        let f = fixture();
        f.drawer.show().await;
        let (calls, callback) = counting_callback();

        let hide = tokio::spawn({
            let drawer = f.drawer.clone();
            async move { drawer.hide(Some(callback)).await }
        });
        tokio::task::yield_now().await;
        assert!(f.drawer.is_animating());

        // The flag drops right after the last frame, before the settle delay
        while f.drawer.is_animating() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(!f.drawer_window.is_visible());
        assert_eq!(f.drawer_window.x_positions().last().copied(), Some(1520));

        tokio::time::sleep(COMPLETION_SETTLE_DELAY - Duration::from_millis(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(3)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(hide.await.unwrap(), HideOutcome::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hide_when_not_visible_still_calls_back() {
        let f = fixture();
        let (calls, callback) = counting_callback();

        assert_eq!(f.drawer.hide(Some(callback)).await, HideOutcome::NotVisible);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(f.drawer_window.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hide_stops_interaction_first() {
        let f = fixture();
        f.drawer.show().await;
        f.hooks.set_interaction_active(true);

        f.drawer.hide(None).await;

        let events = f.hooks.events();
        let stop = events
            .iter()
            .rposition(|e| *e == HookEvent::StopInteraction)
            .unwrap();
        let started = events
            .iter()
            .rposition(|e| *e == HookEvent::AnimatingChanged(true))
            .unwrap();
        assert!(stop < started);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroyed_mid_hide_aborts_once() {
        let f = fixture();
        f.drawer.show().await;
        f.drawer_window.destroy_after_positions(3);
        let (calls, callback) = counting_callback();

        assert_eq!(f.drawer.hide(Some(callback)).await, HideOutcome::TargetLost);
        assert!(!f.drawer.is_animating());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Nothing further runs against the dead window
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
