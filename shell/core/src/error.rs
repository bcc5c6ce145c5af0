//! Error types for surface ownership and drawer operations.

use thiserror::Error;

use crate::host::ContainerId;

/// Failure reported by a host container or the content surface
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// The native window behind the container is gone
    #[error("container has been destroyed")]
    Destroyed,

    /// The native toolkit rejected the call
    #[error("host operation failed: {0}")]
    Operation(String),
}

/// Errors surfaced by the ownership core
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShellError {
    /// Display metrics could not be read
    #[error("display metrics unavailable")]
    DisplayUnavailable,

    /// The surface could not be added to (or moved into) a container
    #[error("failed to attach surface to {container}: {reason}")]
    AttachmentFailure {
        /// Container the surface was headed for
        container: ContainerId,
        /// What went wrong
        reason: String,
    },

    /// The target container was destroyed or never installed
    #[error("container {0} is destroyed")]
    ContainerDestroyed(ContainerId),

    /// The animated container vanished mid-slide
    #[error("animation target {0} was lost")]
    AnimationTargetLost(ContainerId),
}

impl ShellError {
    /// Whether this error came out of an attachment attempt
    ///
    /// A destroyed target counts: the state machine treats both the same way.
    #[must_use]
    pub fn is_attachment_failure(&self) -> bool {
        matches!(
            self,
            Self::AttachmentFailure { .. } | Self::ContainerDestroyed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShellError::AttachmentFailure {
            container: ContainerId::Auxiliary,
            reason: "add rejected".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to attach surface to auxiliary: add rejected"
        );
        assert_eq!(
            ShellError::ContainerDestroyed(ContainerId::Primary).to_string(),
            "container primary is destroyed"
        );
    }

    #[test]
    fn test_destroyed_counts_as_attachment_failure() {
        assert!(ShellError::ContainerDestroyed(ContainerId::Primary).is_attachment_failure());
        assert!(!ShellError::DisplayUnavailable.is_attachment_failure());
        assert!(!ShellError::AnimationTargetLost(ContainerId::Auxiliary).is_attachment_failure());
    }
}
