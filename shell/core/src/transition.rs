//! Attachment State Machine
//!
//! Serializes every change of surface ownership. A transition request names
//! the state it wants and supplies the async operation that gets there; the
//! machine guarantees at most one such operation runs at a time.
//!
//! ```text
//!             request(AttachedPrimary)          request(AttachedAuxiliary)
//!                       │                                  │
//!   Detached ──► Transitioning ──► AttachedPrimary         │ (waits)
//!                                        │                 ▼
//!                                        └──► Transitioning ──► AttachedAuxiliary
//!
//!   any operation error ──► Detached
//! ```
//!
//! # Queuing
//!
//! A request that arrives while another is in flight waits for it to finish
//! and then re-checks: if the finished transition already reached the
//! requested state it returns `true` without doing anything, otherwise it
//! claims the machine for itself. Claiming is an atomic check-and-set on the
//! state, so two waiters woken together cannot both start.
//!
//! # Observers
//!
//! Listeners are called synchronously with `(old, new)` on every change. A
//! panicking listener is logged and skipped; the machine keeps going. Async
//! code can instead [`subscribe`](TransitionStateMachine::subscribe) to a
//! watch channel of the current state.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::ShellError;
use crate::host::ContainerId;

/// Who currently holds the shared surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AttachmentState {
    /// No container holds the surface
    #[default]
    Detached,
    /// The primary window holds the surface
    AttachedPrimary,
    /// The drawer holds the surface
    AttachedAuxiliary,
    /// An attachment operation is in flight
    Transitioning,
}

impl AttachmentState {
    /// The settled state for a container owning the surface
    #[must_use]
    pub fn attached_to(container: ContainerId) -> Self {
        match container {
            ContainerId::Primary => Self::AttachedPrimary,
            ContainerId::Auxiliary => Self::AttachedAuxiliary,
        }
    }

    /// Owning container, if this is an attached state
    #[must_use]
    pub fn container(&self) -> Option<ContainerId> {
        match self {
            Self::AttachedPrimary => Some(ContainerId::Primary),
            Self::AttachedAuxiliary => Some(ContainerId::Auxiliary),
            Self::Detached | Self::Transitioning => None,
        }
    }

    /// Whether an operation is in flight
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Transitioning)
    }
}

/// Handle returned when registering a listener, used to remove it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Callback invoked with `(old, new)` on every state change
pub type StateListener = Arc<dyn Fn(AttachmentState, AttachmentState) + Send + Sync>;

struct Inner {
    state: watch::Sender<AttachmentState>,
    pending_target: Mutex<Option<AttachmentState>>,
    listeners: RwLock<Vec<(ListenerId, StateListener)>>,
}

/// Serializing state machine for surface ownership
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct TransitionStateMachine {
    inner: Arc<Inner>,
}

impl Default for TransitionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of trying to claim the machine for a new transition
enum Claim {
    AlreadyThere,
    Busy,
    Claimed(AttachmentState),
}

impl TransitionStateMachine {
    /// Create a machine in the `Detached` state
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(AttachmentState::Detached);
        Self {
            inner: Arc::new(Inner {
                state,
                pending_target: Mutex::new(None),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Current state
    #[must_use]
    pub fn current_state(&self) -> AttachmentState {
        *self.inner.state.borrow()
    }

    /// Whether an operation is in flight
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.current_state().is_transitioning()
    }

    /// Target of the in-flight operation, if any
    #[must_use]
    pub fn pending_target(&self) -> Option<AttachmentState> {
        *self.inner.pending_target.lock()
    }

    /// Watch the state from async code
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AttachmentState> {
        self.inner.state.subscribe()
    }

    /// Register a synchronous `(old, new)` listener
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(AttachmentState, AttachmentState) + Send + Sync + 'static,
    {
        let id = ListenerId::next();
        self.inner.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Move to `target` by running `operation`, queued behind any in-flight transition
    ///
    /// Returns `Ok(true)` once the machine is in `target`, whether this call
    /// did the work or found it already done.
    ///
    /// # Errors
    ///
    /// Returns the operation's error after resetting the machine to
    /// `Detached`.
    pub async fn request_transition<F, Fut>(
        &self,
        target: AttachmentState,
        operation: F,
    ) -> Result<bool, ShellError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ShellError>>,
    {
        debug_assert!(!target.is_transitioning(), "cannot request Transitioning");

        let mut rx = self.subscribe();
        let previous = loop {
            match self.try_claim(target) {
                Claim::AlreadyThere => {
                    tracing::debug!(target = ?target, "Already in target state");
                    return Ok(true);
                }
                Claim::Claimed(previous) => break previous,
                Claim::Busy => {
                    tracing::debug!(
                        target = ?target,
                        "Waiting for current transition to complete"
                    );
                    // The sender lives in `self`, so the channel cannot close here.
                    let _ = rx.wait_for(|state| !state.is_transitioning()).await;
                }
            }
        };

        *self.inner.pending_target.lock() = Some(target);
        self.log_and_notify(previous, AttachmentState::Transitioning);

        let mut in_flight = InFlight {
            machine: self,
            finished: false,
        };
        let result = operation().await;
        in_flight.finished = true;
        *self.inner.pending_target.lock() = None;

        match result {
            Ok(()) => {
                self.set_state(target);
                Ok(true)
            }
            Err(e) => {
                tracing::error!(target = ?target, error = %e, "Transition failed");
                self.set_state(AttachmentState::Detached);
                Err(e)
            }
        }
    }

    /// Force the machine to `Detached`, for error recovery and shutdown only
    ///
    /// Waiters are woken and listeners see the change. An operation still in
    /// flight is not cancelled; when it finishes it will overwrite the state.
    pub fn force_reset(&self) {
        *self.inner.pending_target.lock() = None;
        tracing::info!("Attachment state forcefully reset to detached");
        self.set_state(AttachmentState::Detached);
    }

    /// Move to `Detached` only if the machine is settled in `expected`
    ///
    /// Unlike [`force_reset`](Self::force_reset) this never touches an
    /// in-flight transition, so queued waiters stay queued. Returns whether
    /// the machine was reset.
    pub fn reset_from(&self, expected: AttachmentState) -> bool {
        if expected.is_transitioning() {
            return false;
        }
        let reset = self.inner.state.send_if_modified(|state| {
            if *state == expected && expected != AttachmentState::Detached {
                *state = AttachmentState::Detached;
                true
            } else {
                false
            }
        });
        if reset {
            self.log_and_notify(expected, AttachmentState::Detached);
        }
        reset
    }

    fn try_claim(&self, target: AttachmentState) -> Claim {
        let mut claim = Claim::Busy;
        self.inner.state.send_if_modified(|state| {
            if *state == target {
                claim = Claim::AlreadyThere;
                false
            } else if state.is_transitioning() {
                claim = Claim::Busy;
                false
            } else {
                claim = Claim::Claimed(*state);
                *state = AttachmentState::Transitioning;
                true
            }
        });
        claim
    }

    fn set_state(&self, new: AttachmentState) {
        let old = self.inner.state.send_replace(new);
        if old != new {
            self.log_and_notify(old, new);
        }
    }

    fn log_and_notify(&self, old: AttachmentState, new: AttachmentState) {
        tracing::info!(from = ?old, to = ?new, "Attachment state changed");

        // Snapshot so listeners may add or remove listeners.
        let listeners: Vec<StateListener> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(old, new))).is_err() {
                tracing::error!(from = ?old, to = ?new, "State change listener panicked");
            }
        }
    }
}

/// Resets the machine if a transition future is dropped mid-operation
struct InFlight<'a> {
    machine: &'a TransitionStateMachine,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("Transition abandoned mid-operation, resetting to detached");
            *self.machine.inner.pending_target.lock() = None;
            self.machine.set_state(AttachmentState::Detached);
        }
    }
}
