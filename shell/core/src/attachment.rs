//! View Attachment
//!
//! The only code path allowed to re-parent the shared content surface.
//!
//! [`ViewAttachmentController::attach`] funnels every move through the
//! [`TransitionStateMachine`], so removal from the old container and addition
//! to the new one are never interleaved with another move. Both steps are
//! idempotent (they ask the container whether the surface is a child first)
//! and each is followed by [`SETTLE_DELAY`].
//!
//! After a successful addition the surface bounds are recomputed once the
//! compositor has caught up ([`BOUNDS_REFRESH_DELAY`]), then nudged three
//! times: an immediate invalidate, a deferred synthetic resize notification
//! and a second deferred invalidate. A single nudge was not enough to stop
//! the hosted content from painting at its old size.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::LayoutConfig;
use crate::error::{HostError, ShellError};
use crate::geometry::Rect;
use crate::host::{ContainerId, HostContainer, SharedContentSurface};
use crate::timing::{BOUNDS_REFRESH_DELAY, REINVALIDATE_DELAY, RESIZE_NOTIFY_DELAY, SETTLE_DELAY};
use crate::transition::{AttachmentState, TransitionStateMachine};

/// Registry of installed host containers
///
/// Containers are created and destroyed by window-lifecycle code outside the
/// core; it installs them here and removes them when their window closes.
#[derive(Clone, Default)]
pub struct ContainerRegistry {
    inner: Arc<RwLock<HashMap<ContainerId, Arc<dyn HostContainer>>>>,
}

impl ContainerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) the container for `id`
    pub fn install(
        &self,
        id: ContainerId,
        container: Arc<dyn HostContainer>,
    ) -> Option<Arc<dyn HostContainer>> {
        let previous = self.inner.write().insert(id, container);
        tracing::info!(container = %id, replaced = previous.is_some(), "Container installed");
        previous
    }

    /// Remove the container for `id`
    pub fn remove(&self, id: ContainerId) -> Option<Arc<dyn HostContainer>> {
        let removed = self.inner.write().remove(&id);
        if removed.is_some() {
            tracing::info!(container = %id, "Container removed");
        }
        removed
    }

    /// The installed container, destroyed or not
    #[must_use]
    pub fn get(&self, id: ContainerId) -> Option<Arc<dyn HostContainer>> {
        self.inner.read().get(&id).cloned()
    }

    /// The installed container, only if it is still alive
    #[must_use]
    pub fn live(&self, id: ContainerId) -> Option<Arc<dyn HostContainer>> {
        self.get(id).filter(|c| !c.is_destroyed())
    }

    /// Whether a live container is installed for `id`
    #[must_use]
    pub fn is_live(&self, id: ContainerId) -> bool {
        self.live(id).is_some()
    }

    /// Whether the container for `id` is alive and visible
    #[must_use]
    pub fn is_visible(&self, id: ContainerId) -> bool {
        self.live(id).is_some_and(|c| c.is_visible())
    }
}

/// Where the surface sits inside a container of the given outer bounds
///
/// The primary window keeps a toolbar strip at the top unless fullscreen;
/// the drawer keeps padding on the right, top and bottom.
#[must_use]
pub fn surface_bounds(
    layout: &LayoutConfig,
    container: ContainerId,
    outer: Rect,
    fullscreen: bool,
) -> Rect {
    match container {
        ContainerId::Primary => {
            let toolbar = if fullscreen { 0 } else { layout.toolbar_height };
            Rect::new(
                0,
                i32::try_from(toolbar).unwrap_or(i32::MAX),
                outer.width,
                outer.height.saturating_sub(toolbar),
            )
        }
        ContainerId::Auxiliary => {
            let padding = layout.drawer_padding;
            Rect::new(
                0,
                i32::try_from(padding.top).unwrap_or(i32::MAX),
                outer.width.saturating_sub(padding.right),
                outer
                    .height
                    .saturating_sub(padding.top)
                    .saturating_sub(padding.bottom),
            )
        }
    }
}

/// Moves the shared surface between containers
///
/// Cloning is cheap; clones share the surface, registry and state machine.
#[derive(Clone)]
pub struct ViewAttachmentController {
    surface: Arc<dyn SharedContentSurface>,
    containers: ContainerRegistry,
    machine: TransitionStateMachine,
    owner: Arc<Mutex<Option<ContainerId>>>,
    layout: LayoutConfig,
}

impl ViewAttachmentController {
    /// Create a controller with the surface detached
    pub fn new(
        surface: Arc<dyn SharedContentSurface>,
        containers: ContainerRegistry,
        layout: LayoutConfig,
    ) -> Self {
        let machine = TransitionStateMachine::new();
        let owner = Arc::new(Mutex::new(None));

        // Ownership bookkeeping follows settled states only; while a move is in
        // flight the previous owner is still reported.
        let bookkeeping = Arc::clone(&owner);
        machine.add_listener(move |_, new| match new {
            AttachmentState::AttachedPrimary | AttachmentState::AttachedAuxiliary => {
                *bookkeeping.lock() = new.container();
            }
            AttachmentState::Detached => *bookkeeping.lock() = None,
            AttachmentState::Transitioning => {}
        });

        Self {
            surface,
            containers,
            machine,
            owner,
            layout,
        }
    }

    /// The serializing state machine
    #[must_use]
    pub fn state_machine(&self) -> &TransitionStateMachine {
        &self.machine
    }

    /// The container registry
    #[must_use]
    pub fn containers(&self) -> &ContainerRegistry {
        &self.containers
    }

    /// Container that currently holds the surface
    #[must_use]
    pub fn current_owner(&self) -> Option<ContainerId> {
        *self.owner.lock()
    }

    /// Move the surface into `target`
    ///
    /// Always `Ok(true)` on success. Resolves immediately, with no host
    /// calls, if `target` already owns the surface.
    ///
    /// # Errors
    ///
    /// [`ShellError::ContainerDestroyed`] if `target` is missing or destroyed.
    /// [`ShellError::AttachmentFailure`] if the container rejects the surface,
    /// or the previous holder could not release it. Either way the state
    /// machine ends `Detached`.
    pub async fn attach(&self, target: ContainerId) -> Result<bool, ShellError> {
        let this = self.clone();
        self.machine
            .request_transition(AttachmentState::attached_to(target), move || async move {
                this.move_surface(target).await
            })
            .await
    }

    async fn move_surface(&self, target: ContainerId) -> Result<(), ShellError> {
        tracing::debug!(container = %target, "Executing surface transition");

        let Some(container) = self.containers.live(target) else {
            return Err(ShellError::ContainerDestroyed(target));
        };

        // The recorded owner is normally the only holder, but after a reset the
        // surface may still be parented somewhere; detach it wherever it is.
        for other in ContainerId::ALL.into_iter().filter(|id| *id != target) {
            if let Some(holder) = self.containers.get(other) {
                if self.current_owner() == Some(other) || holder.has_child_surface() {
                    self.safe_remove(other, holder.as_ref()).await;
                }
                // Adding now would leave the surface in two containers
                if holder.has_child_surface() {
                    return Err(ShellError::AttachmentFailure {
                        container: target,
                        reason: format!("surface still held by {other}"),
                    });
                }
            }
        }

        if let Err(e) = self.safe_add(target, container.as_ref()).await {
            if container.is_destroyed() || e == HostError::Destroyed {
                return Err(ShellError::ContainerDestroyed(target));
            }
            return Err(ShellError::AttachmentFailure {
                container: target,
                reason: e.to_string(),
            });
        }

        // The window may have closed while the addition settled
        if !self.containers.is_live(target) {
            return Err(ShellError::ContainerDestroyed(target));
        }

        tracing::info!(container = %target, "Surface attached");
        self.schedule_bounds_refresh(target);
        Ok(())
    }

    /// Remove the surface from `container` if it is a child
    ///
    /// Errors are logged; callers check `has_child_surface` afterwards.
    async fn safe_remove(&self, id: ContainerId, container: &dyn HostContainer) {
        if container.has_child_surface() {
            match container.remove_child_surface() {
                Ok(()) => tracing::debug!(container = %id, "Surface removed"),
                Err(e) => tracing::warn!(container = %id, error = %e, "Failed to remove surface"),
            }
        }
        tokio::time::sleep(SETTLE_DELAY).await;
    }

    /// Add the surface to `container` unless it is already a child
    async fn safe_add(&self, id: ContainerId, container: &dyn HostContainer) -> Result<(), HostError> {
        let result = if container.has_child_surface() {
            Ok(())
        } else {
            container.add_child_surface()
        };
        if let Err(ref e) = result {
            tracing::error!(container = %id, error = %e, "Failed to add surface");
        }
        tokio::time::sleep(SETTLE_DELAY).await;
        result
    }

    fn schedule_bounds_refresh(&self, target: ContainerId) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(BOUNDS_REFRESH_DELAY).await;
            this.refresh_bounds(target);
        });
    }

    /// Recompute the surface bounds for `container` and nudge the content
    ///
    /// Does nothing unless `container` currently owns the surface. Returns
    /// whether new bounds were applied.
    pub fn refresh_bounds(&self, container: ContainerId) -> bool {
        if self.current_owner() != Some(container) {
            return false;
        }
        let Some(host) = self.containers.live(container) else {
            return false;
        };

        let outer = match host.bounds() {
            Ok(bounds) => bounds,
            Err(e) => {
                tracing::warn!(container = %container, error = %e, "Failed to read container bounds");
                return false;
            }
        };
        let bounds = surface_bounds(&self.layout, container, outer, host.is_fullscreen());
        if let Err(e) = self.surface.set_bounds(bounds) {
            tracing::warn!(container = %container, error = %e, "Failed to set surface bounds");
            return false;
        }
        tracing::debug!(container = %container, bounds = %bounds, "Surface bounds updated");

        self.nudge_surface();
        true
    }

    fn nudge_surface(&self) {
        self.surface.invalidate();

        let surface = Arc::clone(&self.surface);
        tokio::spawn(async move {
            tokio::time::sleep(RESIZE_NOTIFY_DELAY).await;
            surface.force_content_resize_notification();
            tokio::time::sleep(REINVALIDATE_DELAY.saturating_sub(RESIZE_NOTIFY_DELAY)).await;
            surface.invalidate();
        });
    }

    /// Detach the surface from every container and reset the state machine
    ///
    /// Shutdown and error-recovery path. Removal errors are logged.
    pub fn release(&self) {
        tracing::info!(owner = ?self.current_owner(), "Releasing shared surface");
        self.machine.force_reset();

        for id in ContainerId::ALL {
            if let Some(container) = self.containers.get(id) {
                if container.has_child_surface() {
                    if let Err(e) = container.remove_child_surface() {
                        tracing::warn!(container = %id, error = %e, "Failed to remove surface during release");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use crate::headless::{ContainerEvent, HeadlessContainer, HeadlessSurface, SurfaceEvent};

    struct Fixture {
        surface: Arc<HeadlessSurface>,
        primary: Arc<HeadlessContainer>,
        auxiliary: Arc<HeadlessContainer>,
        controller: ViewAttachmentController,
    }

    fn fixture() -> Fixture {
        let surface = HeadlessSurface::new();
        let primary = HeadlessContainer::new(
            ContainerId::Primary,
            Arc::clone(&surface),
            Rect::new(100, 100, 1200, 800),
        );
        let auxiliary = HeadlessContainer::new(
            ContainerId::Auxiliary,
            Arc::clone(&surface),
            Rect::new(1920, 0, 400, 1040),
        );
        let containers = ContainerRegistry::new();
        containers.install(ContainerId::Primary, primary.clone());
        containers.install(ContainerId::Auxiliary, auxiliary.clone());
        let controller = ViewAttachmentController::new(
            surface.clone(),
            containers,
            LayoutConfig::default(),
        );
        Fixture {
            surface,
            primary,
            auxiliary,
            controller,
        }
    }

    #[test]
    fn test_surface_bounds_layout() {
        let layout = LayoutConfig::default();
        let outer = Rect::new(100, 100, 1200, 800);

        assert_eq!(
            surface_bounds(&layout, ContainerId::Primary, outer, false),
            Rect::new(0, 41, 1200, 759)
        );
        assert_eq!(
            surface_bounds(&layout, ContainerId::Primary, outer, true),
            Rect::new(0, 0, 1200, 800)
        );
        assert_eq!(
            surface_bounds(
                &layout,
                ContainerId::Auxiliary,
                Rect::new(1520, 0, 400, 1040),
                false
            ),
            Rect::new(0, 8, 388, 1024)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_moves_surface() {
        let f = fixture();

        assert_eq!(f.controller.attach(ContainerId::Primary).await, Ok(true));
        assert_eq!(f.surface.parent(), Some(ContainerId::Primary));
        assert_eq!(f.controller.current_owner(), Some(ContainerId::Primary));

        assert_eq!(f.controller.attach(ContainerId::Auxiliary).await, Ok(true));
        assert_eq!(f.surface.parent(), Some(ContainerId::Auxiliary));
        assert!(!f.primary.has_child_surface());
        assert_eq!(f.surface.max_simultaneous_parents(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_same_target_has_no_side_effects() {
        let f = fixture();
        f.controller.attach(ContainerId::Auxiliary).await.unwrap();
        f.primary.clear_events();
        f.auxiliary.clear_events();

        assert_eq!(f.controller.attach(ContainerId::Auxiliary).await, Ok(true));
        assert!(f.primary.events().is_empty());
        assert!(f.auxiliary.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_destroyed_target_fails_fast() {
        let f = fixture();
        f.controller.attach(ContainerId::Primary).await.unwrap();
        f.auxiliary.destroy();

        let result = f.controller.attach(ContainerId::Auxiliary).await;

        assert_eq!(result, Err(ShellError::ContainerDestroyed(ContainerId::Auxiliary)));
        assert_eq!(
            f.controller.state_machine().current_state(),
            AttachmentState::Detached
        );
        assert_eq!(f.controller.current_owner(), None);
        // Nothing was touched on the primary side either
        assert!(f.primary.has_child_surface());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_failure_is_attachment_failure() {
        let f = fixture();
        f.auxiliary.fail_next_add("compositor busy");

        let result = f.controller.attach(ContainerId::Auxiliary).await;

        assert!(matches!(
            result,
            Err(ShellError::AttachmentFailure {
                container: ContainerId::Auxiliary,
                ..
            })
        ));
        assert_eq!(
            f.controller.state_machine().current_state(),
            AttachmentState::Detached
        );
        assert_eq!(f.surface.parent(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removal_error_never_doubles_parents() {
        let f = fixture();
        f.controller.attach(ContainerId::Primary).await.unwrap();
        f.primary.fail_next_remove("stale view");

        let result = f.controller.attach(ContainerId::Auxiliary).await;

        assert!(matches!(
            result,
            Err(ShellError::AttachmentFailure {
                container: ContainerId::Auxiliary,
                ..
            })
        ));
        assert_eq!(f.surface.parents(), vec![ContainerId::Primary]);
        assert_eq!(f.surface.max_simultaneous_parents(), 1);
        assert!(!f.auxiliary.events().contains(&ContainerEvent::AddSurface));

        // The next request goes through once removal works again
        assert_eq!(f.controller.attach(ContainerId::Auxiliary).await, Ok(true));
        assert_eq!(f.surface.parents(), vec![ContainerId::Auxiliary]);
        assert_eq!(f.surface.max_simultaneous_parents(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroyed_holder_does_not_block_attach() {
        let f = fixture();
        f.controller.attach(ContainerId::Primary).await.unwrap();
        f.primary.destroy();

        assert_eq!(f.controller.attach(ContainerId::Auxiliary).await, Ok(true));
        assert_eq!(f.surface.parents(), vec![ContainerId::Auxiliary]);
        assert_eq!(f.surface.max_simultaneous_parents(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_bounds_refresh_and_nudges() {
        let f = fixture();
        f.controller.attach(ContainerId::Auxiliary).await.unwrap();
        assert!(f.surface.bounds_history().is_empty());

        tokio::time::sleep(BOUNDS_REFRESH_DELAY + Duration::from_millis(1)).await;
        assert_eq!(f.surface.bounds_history(), vec![Rect::new(0, 8, 388, 1024)]);
        assert_eq!(f.surface.count(&SurfaceEvent::Invalidate), 1);

        tokio::time::sleep(REINVALIDATE_DELAY).await;
        assert_eq!(f.surface.count(&SurfaceEvent::ResizeNotification), 1);
        assert_eq!(f.surface.count(&SurfaceEvent::Invalidate), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_bounds_requires_ownership() {
        let f = fixture();
        f.controller.attach(ContainerId::Primary).await.unwrap();

        assert!(!f.controller.refresh_bounds(ContainerId::Auxiliary));
        f.primary.set_fullscreen(true);
        assert!(f.controller.refresh_bounds(ContainerId::Primary));
        assert_eq!(
            f.surface.bounds_history().last().copied(),
            Some(Rect::new(0, 0, 1200, 800))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_detaches_everything() {
        let f = fixture();
        f.controller.attach(ContainerId::Auxiliary).await.unwrap();

        f.controller.release();

        assert_eq!(f.surface.parent(), None);
        assert_eq!(f.controller.current_owner(), None);
        assert!(f
            .auxiliary
            .events()
            .contains(&ContainerEvent::RemoveSurface));
    }
}
