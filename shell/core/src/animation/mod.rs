//! Slide Animation
//!
//! Frame-paced horizontal motion for the drawer container.
//!
//! An [`AnimationSession`] is a plain value: given "now" it answers where the
//! container should be and how long to wait before the next frame. The
//! [`drive`] ticker owns the clock and the container, applying one sample per
//! tick until the session reports it is finished or the container is lost.
//!
//! ```text
//!   drive()                         AnimationSession
//!     │  sample(now) ─────────────────►  progress = clamp(elapsed / duration)
//!     │  ◄──────────── Frame { x, .. }    x = start + (end - start) * ease(progress)
//!     │  container.set_position(x, y)
//!     │  wait_before_next(now) ───────►  max(0, interval - (now - last_frame))
//!     │  sleep; mark_frame(now)
//!     └─ repeat until Frame::finished
//! ```
//!
//! The frame interval is fixed when the session is created; a refresh rate
//! change mid-slide is picked up by the next slide.

mod easing;

pub use easing::EasingFunction;

use std::time::Duration;

use tokio::time::Instant;

use crate::host::HostContainer;

/// Which way the drawer is moving
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlideDirection {
    /// Sliding in from off-screen
    Show,
    /// Sliding out to off-screen
    Hide,
}

/// Endpoints of a single slide
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlideSpec {
    /// X at progress 0
    pub start_x: i32,
    /// X at progress 1
    pub end_x: i32,
    /// Y held for the whole slide
    pub y: i32,
    /// Show or hide
    pub direction: SlideDirection,
}

/// One sampled frame of a session
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    /// Rounded X to apply
    pub x: i32,
    /// Y to apply
    pub y: i32,
    /// Linear progress (0.0 to 1.0)
    pub progress: f64,
    /// Whether this is the last frame
    pub finished: bool,
}

/// A running slide, advanced explicitly by a ticker
#[derive(Clone, Debug)]
pub struct AnimationSession {
    spec: SlideSpec,
    duration: Duration,
    frame_interval: Duration,
    easing: EasingFunction,
    started_at: Instant,
    last_frame_at: Instant,
}

impl AnimationSession {
    /// Start a session at `now`
    #[must_use]
    pub fn new(
        spec: SlideSpec,
        duration: Duration,
        frame_interval: Duration,
        easing: EasingFunction,
        now: Instant,
    ) -> Self {
        Self {
            spec,
            duration,
            frame_interval,
            easing,
            started_at: now,
            last_frame_at: now,
        }
    }

    /// Slide endpoints
    #[must_use]
    pub fn spec(&self) -> SlideSpec {
        self.spec
    }

    /// Target time between frames
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Linear progress at `now`, clamped to the unit interval
    #[must_use]
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Where the container belongs at `now`
    #[must_use]
    pub fn sample(&self, now: Instant) -> Frame {
        let progress = self.progress(now);
        let eased = self.easing.apply(progress);
        let start = f64::from(self.spec.start_x);
        let end = f64::from(self.spec.end_x);
        // The eased value never leaves [start, end], so the cast is lossless.
        #[allow(clippy::cast_possible_truncation)]
        let x = (start + (end - start) * eased).round() as i32;

        Frame {
            x,
            y: self.spec.y,
            progress,
            finished: progress >= 1.0,
        }
    }

    /// How long to wait before sampling again
    #[must_use]
    pub fn wait_before_next(&self, now: Instant) -> Duration {
        self.frame_interval
            .saturating_sub(now.saturating_duration_since(self.last_frame_at))
    }

    /// Record that a new frame tick started at `now`
    pub fn mark_frame(&mut self, now: Instant) {
        self.last_frame_at = now;
    }
}

/// How a driven session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlideOutcome {
    /// Reached the end position
    Completed {
        /// Frames applied, including the final one
        frames: u32,
    },
    /// The container was destroyed or rejected a position update
    TargetLost {
        /// Frames applied before the loss
        frames: u32,
    },
}

/// Run `session` against `container` until it finishes or the container is lost
///
/// The final frame always lands exactly on `end_x`.
pub async fn drive(mut session: AnimationSession, container: &dyn HostContainer) -> SlideOutcome {
    let mut frames = 0;

    loop {
        if container.is_destroyed() {
            tracing::debug!(frames, "Animation target destroyed");
            return SlideOutcome::TargetLost { frames };
        }

        let frame = session.sample(Instant::now());
        if let Err(e) = container.set_position(frame.x, frame.y) {
            tracing::warn!(error = %e, frames, "Failed to set position during animation");
            return SlideOutcome::TargetLost { frames };
        }
        frames += 1;

        if frame.finished {
            return SlideOutcome::Completed { frames };
        }

        tokio::time::sleep(session.wait_before_next(Instant::now())).await;
        session.mark_frame(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(now: Instant) -> AnimationSession {
        AnimationSession::new(
            SlideSpec {
                start_x: 1520,
                end_x: 1120,
                y: 40,
                direction: SlideDirection::Show,
            },
            Duration::from_millis(200),
            Duration::from_secs_f64(1.0 / 120.0),
            EasingFunction::EaseOutCubic,
            now,
        )
    }

    #[test]
    fn test_sample_endpoints() {
        let start = Instant::now();
        let session = session(start);

        let first = session.sample(start);
        assert_eq!(first.x, 1520);
        assert!(!first.finished);

        let last = session.sample(start + Duration::from_millis(200));
        assert_eq!(last.x, 1120);
        assert!(last.finished);

        // Past the end stays pinned
        let late = session.sample(start + Duration::from_secs(5));
        assert_eq!(late.x, 1120);
        assert!((late.progress - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_monotonic() {
        let start = Instant::now();
        let session = session(start);
        let mut previous = 0.0;
        for ms in 0..=250 {
            let progress = session.progress(start + Duration::from_millis(ms));
            assert!(progress >= previous);
            previous = progress;
        }
        assert!((previous - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wait_before_next() {
        let start = Instant::now();
        let mut session = session(start);
        let interval = session.frame_interval();

        assert_eq!(session.wait_before_next(start), interval);
        assert_eq!(
            session.wait_before_next(start + Duration::from_millis(3)),
            interval - Duration::from_millis(3)
        );
        // A slow frame never produces a negative wait
        assert_eq!(
            session.wait_before_next(start + Duration::from_millis(30)),
            Duration::ZERO
        );

        session.mark_frame(start + Duration::from_millis(30));
        assert_eq!(
            session.wait_before_next(start + Duration::from_millis(30)),
            interval
        );
    }

    #[test]
    fn test_zero_duration_finishes_immediately() {
        let start = Instant::now();
        let session = AnimationSession::new(
            SlideSpec {
                start_x: 0,
                end_x: 100,
                y: 0,
                direction: SlideDirection::Hide,
            },
            Duration::ZERO,
            Duration::from_millis(16),
            EasingFunction::Linear,
            start,
        );
        let frame = session.sample(start);
        assert_eq!(frame.x, 100);
        assert!(frame.finished);
    }
}
