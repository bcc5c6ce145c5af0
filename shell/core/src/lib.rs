//! Sideshell Core - Surface Ownership for a Two-Window Desktop Shell
//!
//! A desktop application with one embedded content surface (a web view, a
//! renderer) and two places to show it: the full primary window and a
//! slide-in drawer docked to the right screen edge. The surface can only
//! live in one of them at a time, and moving it is slow and asynchronous on
//! every real windowing toolkit.
//!
//! This crate owns that problem, independent of any toolkit:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Embedding application                      │
//! │   window events, tray clicks, focus changes, shutdown             │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┼──────────────────────────────────┐
//! │                         DesktopShell                              │
//! │  ┌───────────────────────┐        ┌────────────────────────────┐ │
//! │  │ ViewAttachmentController│◄──────│      DrawerAnimator        │ │
//! │  │  TransitionStateMachine │       │  AnimationSession + drive  │ │
//! │  └───────────┬─────────────┘       └─────────────┬──────────────┘ │
//! └──────────────┼───────────────────────────────────┼────────────────┘
//!                │                                   │
//!     HostContainer / SharedContentSurface   DisplayMetricsProvider
//!        (native windows, or headless)       (ScreenMetrics, or static)
//! ```
//!
//! # Key Types
//!
//! - [`DesktopShell`]: The assembled core the application drives
//! - [`ViewAttachmentController`]: The only code that re-parents the surface
//! - [`TransitionStateMachine`]: Serializes ownership changes
//! - [`DrawerAnimator`]: Slide-in / slide-out of the drawer
//! - [`ShellConfig`]: Animation, drawer and layout settings
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use sideshell_core::{load_config, ContainerId, DesktopShell, NoopHooks, ScreenMetrics};
//!
//! let config = load_config()?;
//! let metrics = Arc::new(ScreenMetrics::new(my_display_source).with_policy(config.animation.refresh));
//! let shell = DesktopShell::new(my_surface, metrics, Arc::new(NoopHooks), &config);
//!
//! shell.install_container(ContainerId::Primary, my_main_window);
//! shell.install_container(ContainerId::Auxiliary, my_drawer_window);
//! shell.request_attach(ContainerId::Primary).await?;
//! ```
//!
//! # Module Overview
//!
//! - [`host`]: Traits the embedding toolkit implements
//! - [`display`]: Display metrics and refresh-rate fallbacks
//! - [`transition`]: Ownership state machine
//! - [`attachment`]: Surface re-parenting and bounds layout
//! - [`animation`]: Easing and frame-paced slide sessions
//! - [`drawer`]: Drawer show / hide orchestration
//! - [`shell`]: The assembled facade plus tray, focus and lifecycle handling
//! - [`config`]: Configuration loading (env > TOML > defaults)
//! - [`timing`]: Settle delays
//! - [`headless`]: In-memory host for tests and simulation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animation;
pub mod attachment;
pub mod config;
pub mod display;
pub mod drawer;
pub mod error;
pub mod geometry;
pub mod headless;
pub mod host;
pub mod shell;
pub mod timing;
pub mod transition;

pub use animation::{AnimationSession, EasingFunction, SlideDirection, SlideOutcome, SlideSpec};
pub use attachment::{ContainerRegistry, ViewAttachmentController};
pub use display::{
    DisplayInfo, DisplayMetricsProvider, DisplaySource, RefreshRatePolicy, ScreenMetrics,
};
pub use drawer::{
    CompletionCallback, DrawerAnimator, HideOutcome, NoopHooks, ShellHooks, ShowOutcome,
};
pub use error::{HostError, ShellError};
pub use geometry::{DrawerPosition, Rect, Size};
pub use host::{ContainerId, HostContainer, SharedContentSurface, TopMostLevel};
pub use shell::{DesktopShell, ToggleAction, ToggleIgnored};
pub use transition::{AttachmentState, ListenerId, StateListener, TransitionStateMachine};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, AnimationConfig, ConfigError,
    ConfigSource, LayoutConfig, ShellConfig,
};
