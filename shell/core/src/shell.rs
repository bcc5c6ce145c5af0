//! Desktop Shell
//!
//! The assembled core: one shared surface, a registry of host containers,
//! the attachment controller and the drawer animator, wired together at
//! construction. This is the surface the embedding application drives from
//! its window and tray events.
//!
//! # Usage
//!
//! ```ignore
//! let shell = DesktopShell::new(surface, metrics, hooks, &load_config()?);
//! shell.install_container(ContainerId::Primary, main_window);
//! shell.install_container(ContainerId::Auxiliary, drawer_window);
//!
//! shell.request_attach(ContainerId::Primary).await?;
//! shell.on_state_change(|old, new| tracing::info!(?old, ?new, "ownership"));
//!
//! // Tray click
//! shell.toggle_auxiliary().await;
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::attachment::{ContainerRegistry, ViewAttachmentController};
use crate::config::ShellConfig;
use crate::display::DisplayMetricsProvider;
use crate::drawer::{CompletionCallback, DrawerAnimator, HideOutcome, ShellHooks, ShowOutcome};
use crate::error::ShellError;
use crate::host::{ContainerId, HostContainer, SharedContentSurface};
use crate::timing::BLUR_SUPPRESS_WINDOW;
use crate::transition::{AttachmentState, ListenerId};

/// Why a toggle did nothing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleIgnored {
    /// A show or hide was already running
    Animating,
    /// The drawer was just hidden by losing focus (the click that caused the
    /// blur is the same click that toggled)
    RecentBlurHide,
}

/// What a toggle did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleAction {
    /// Nothing happened
    Ignored(ToggleIgnored),
    /// The drawer was visible and got hidden
    Hid(HideOutcome),
    /// The drawer was shown
    Showed(ShowOutcome),
}

struct ShellInner {
    attachment: ViewAttachmentController,
    drawer: DrawerAnimator,
    hooks: Arc<dyn ShellHooks>,
    last_blur_hide: Mutex<Option<Instant>>,
}

/// The desktop shell core
///
/// Cloning is cheap; clones drive the same shell.
#[derive(Clone)]
pub struct DesktopShell {
    inner: Arc<ShellInner>,
}

impl DesktopShell {
    /// Wire up a shell with no containers installed and the surface detached
    pub fn new(
        surface: Arc<dyn SharedContentSurface>,
        metrics: Arc<dyn DisplayMetricsProvider>,
        hooks: Arc<dyn ShellHooks>,
        config: &ShellConfig,
    ) -> Self {
        let attachment =
            ViewAttachmentController::new(surface, ContainerRegistry::new(), config.layout);
        let drawer = DrawerAnimator::new(
            attachment.clone(),
            metrics,
            Arc::clone(&hooks),
            config.animation,
            config.drawer_width,
        );
        tracing::info!(
            drawer_width = config.drawer_width,
            duration = ?config.animation.duration,
            easing = ?config.animation.easing,
            source = ?config.source(),
            "Desktop shell initialized"
        );

        Self {
            inner: Arc::new(ShellInner {
                attachment,
                drawer,
                hooks,
                last_blur_hide: Mutex::new(None),
            }),
        }
    }

    // ========================================================================
    // Ownership
    // ========================================================================

    /// Move the surface into `container`
    ///
    /// # Errors
    ///
    /// See [`ViewAttachmentController::attach`].
    pub async fn request_attach(&self, container: ContainerId) -> Result<bool, ShellError> {
        self.inner.attachment.attach(container).await
    }

    /// Container that currently holds the surface
    #[must_use]
    pub fn current_owner(&self) -> Option<ContainerId> {
        self.inner.attachment.current_owner()
    }

    /// Current state of the ownership machine
    #[must_use]
    pub fn attachment_state(&self) -> AttachmentState {
        self.inner.attachment.state_machine().current_state()
    }

    /// Observe ownership changes as `(old, new)`
    pub fn on_state_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(AttachmentState, AttachmentState) + Send + Sync + 'static,
    {
        self.inner.attachment.state_machine().add_listener(listener)
    }

    /// Stop observing ownership changes
    pub fn remove_state_listener(&self, id: ListenerId) -> bool {
        self.inner.attachment.state_machine().remove_listener(id)
    }

    // ========================================================================
    // Drawer
    // ========================================================================

    /// Whether the drawer is mid show or hide
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.inner.drawer.is_animating()
    }

    /// Slide the drawer in; resolves when the slide is over
    pub async fn show_auxiliary(&self) -> ShowOutcome {
        self.inner.drawer.show().await
    }

    /// Start hiding the drawer in the background
    ///
    /// The returned handle may be dropped; the hide runs to completion and
    /// `on_complete` still fires.
    pub fn hide_auxiliary(&self, on_complete: Option<CompletionCallback>) -> JoinHandle<HideOutcome> {
        let drawer = self.inner.drawer.clone();
        tokio::spawn(async move { drawer.hide(on_complete).await })
    }

    /// Hide the drawer and wait for the slide to finish
    pub async fn hide_auxiliary_and_wait(&self, on_complete: Option<CompletionCallback>) -> HideOutcome {
        self.inner.drawer.hide(on_complete).await
    }

    /// Tray click: hide the drawer if shown, otherwise show it
    pub async fn toggle_auxiliary(&self) -> ToggleAction {
        if self.is_animating() {
            tracing::debug!("Toggle ignored: drawer animating");
            return ToggleAction::Ignored(ToggleIgnored::Animating);
        }
        let recently_blurred = self
            .inner
            .last_blur_hide
            .lock()
            .is_some_and(|at| at.elapsed() < BLUR_SUPPRESS_WINDOW);
        if recently_blurred {
            tracing::debug!("Toggle ignored: drawer just hidden by blur");
            return ToggleAction::Ignored(ToggleIgnored::RecentBlurHide);
        }

        let containers = self.inner.attachment.containers();
        if containers.is_visible(ContainerId::Auxiliary) {
            return ToggleAction::Hid(self.hide_auxiliary_and_wait(None).await);
        }

        if let Some(primary) = containers.live(ContainerId::Primary).filter(|c| c.is_visible()) {
            if let Err(e) = primary.hide() {
                tracing::warn!(error = %e, "Failed to hide primary window");
            }
        }
        ToggleAction::Showed(self.show_auxiliary().await)
    }

    /// The drawer lost focus: hide it unless it is animating or hidden
    pub fn handle_auxiliary_blur(&self) -> Option<JoinHandle<HideOutcome>> {
        if self.is_animating() || !self.inner.attachment.containers().is_visible(ContainerId::Auxiliary) {
            return None;
        }
        tracing::debug!("Drawer lost focus, hiding");
        *self.inner.last_blur_hide.lock() = Some(Instant::now());
        Some(self.hide_auxiliary(None))
    }

    // ========================================================================
    // Primary Window
    // ========================================================================

    /// Bring up the primary window with the surface in it
    ///
    /// A visible drawer is hidden in the background.
    ///
    /// # Errors
    ///
    /// Whatever [`request_attach`](Self::request_attach) returned; the
    /// window is still shown.
    pub async fn show_primary(&self) -> Result<bool, ShellError> {
        let containers = self.inner.attachment.containers();
        if containers.is_visible(ContainerId::Auxiliary) {
            drop(self.hide_auxiliary(None));
        }

        let attached = self.request_attach(ContainerId::Primary).await;
        if let Err(ref e) = attached {
            tracing::error!(error = %e, "Failed to attach surface to primary window");
        }

        if let Some(primary) = containers.live(ContainerId::Primary) {
            if !primary.is_visible() {
                if let Err(e) = primary.show() {
                    tracing::warn!(error = %e, "Failed to show primary window");
                }
            }
            if let Err(e) = primary.focus() {
                tracing::warn!(error = %e, "Failed to focus primary window");
            }
        }
        self.inner.hooks.refresh_menu();
        attached
    }

    /// The primary window was resized
    pub fn handle_primary_resized(&self) {
        self.inner.attachment.refresh_bounds(ContainerId::Primary);
    }

    /// The primary window entered or left fullscreen
    pub fn handle_primary_fullscreen_changed(&self, fullscreen: bool) {
        tracing::debug!(fullscreen, "Primary fullscreen changed");
        self.inner.attachment.refresh_bounds(ContainerId::Primary);
    }

    // ========================================================================
    // Container Lifecycle
    // ========================================================================

    /// Register the native window backing `id`
    ///
    /// Replacing the window that holds the surface detaches the bookkeeping,
    /// so the next attach moves the surface into the new window.
    pub fn install_container(&self, id: ContainerId, container: Arc<dyn HostContainer>) {
        let attachment = &self.inner.attachment;
        if attachment.containers().install(id, container).is_some()
            && attachment
                .state_machine()
                .reset_from(AttachmentState::attached_to(id))
        {
            tracing::info!(container = %id, "Owner replaced, attachment reset");
        }
    }

    /// The native window backing `id` closed
    ///
    /// A move in flight is left to finish; it fails on its own if the closed
    /// window was its target.
    pub fn handle_container_closed(&self, id: ContainerId) {
        let attachment = &self.inner.attachment;
        attachment.containers().remove(id);

        if id == ContainerId::Auxiliary {
            self.inner.drawer.clear_animating();
        }
        if attachment
            .state_machine()
            .reset_from(AttachmentState::attached_to(id))
        {
            tracing::info!(container = %id, "Owner closed, attachment reset");
        }
        self.inner.hooks.refresh_menu();
    }

    /// Detach the surface from every container
    pub fn shutdown(&self) {
        tracing::info!("Desktop shell shutting down");
        self.inner.attachment.release();
    }
}
