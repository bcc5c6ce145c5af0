//! Sideshell Simulator - Headless Drive of the Shell Core
//!
//! Runs scripted scenarios against the in-memory host so the ownership and
//! drawer behavior can be watched in the logs without a windowing toolkit.
//!
//! # Usage
//!
//! ```bash
//! # Every scenario with defaults
//! sideshell-sim
//!
//! # One scenario on a 60 Hz, 2560px wide screen
//! sideshell-sim --scenario toggle --refresh-rate 60 --screen-width 2560
//!
//! # With a config file
//! sideshell-sim --config ~/.config/sideshell/shell.toml
//!
//! # Frame-level logging
//! RUST_LOG=sideshell_core=debug sideshell-sim
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use sideshell_core::headless::{HeadlessContainer, HeadlessSurface, RecordingHooks, StaticDisplays};
use sideshell_core::{
    load_config, load_config_from_path, ContainerId, DesktopShell, DisplayInfo,
    DisplayMetricsProvider, HideOutcome, HostContainer, Rect, ScreenMetrics, ShowOutcome,
};

/// Scripted scenario to run
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Show the drawer, then hide it
    ShowHide,
    /// Tray toggles, including one swallowed by a blur hide
    Toggle,
    /// Concurrent attach requests for both containers
    Race,
    /// Destroy the drawer window halfway through a hide
    Destroy,
    /// Run every scenario in order
    All,
}

/// Sideshell Simulator - drive the shell core against an in-memory host
#[derive(Parser, Debug)]
#[command(name = "sideshell-sim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario to run
    #[arg(short = 's', long, value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,

    /// Configuration file path (defaults to the XDG location)
    #[arg(short = 'c', long, env = "SIDESHELL_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Refresh rate the simulated display reports (0 = not reported)
    #[arg(short = 'r', long, default_value_t = 120.0)]
    refresh_rate: f64,

    /// Width of the simulated screen
    #[arg(long, default_value_t = 1920)]
    screen_width: u32,

    /// Height of the simulated screen
    #[arg(long, default_value_t = 1080)]
    screen_height: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "SIDESHELL_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("sideshell_sim={level},sideshell_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// The simulated desktop: one screen, two windows, one shared surface
struct Desktop {
    shell: DesktopShell,
    surface: Arc<HeadlessSurface>,
    primary: Arc<HeadlessContainer>,
    drawer: Arc<HeadlessContainer>,
}

fn build_desktop(args: &Args) -> Result<Desktop> {
    let config = match args.config {
        Some(ref path) => load_config_from_path(Some(path.clone()))
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => load_config().context("Failed to load config")?,
    };
    info!(source = ?config.source(), path = ?config.config_file_path, "Configuration loaded");

    let taskbar = 40;
    let display = DisplayInfo {
        id: 1,
        bounds: Rect::new(0, 0, args.screen_width, args.screen_height),
        work_area: Rect::new(0, 0, args.screen_width, args.screen_height.saturating_sub(taskbar)),
        scale_factor: 1.0,
        refresh_rate: Some(args.refresh_rate).filter(|r| *r > 0.0),
        internal: true,
    };
    let metrics =
        ScreenMetrics::new(StaticDisplays::single(display.clone())).with_policy(config.animation.refresh);
    metrics.log_display_info();
    info!(
        refresh_rate = metrics.refresh_rate(),
        high_refresh = metrics.supports_high_refresh_rate(),
        "Display ready"
    );

    let surface = HeadlessSurface::new();
    let shell = DesktopShell::new(
        surface.clone(),
        Arc::new(metrics),
        RecordingHooks::new(),
        &config,
    );
    let primary = HeadlessContainer::new(
        ContainerId::Primary,
        surface.clone(),
        Rect::new(100, 100, 1200, 800),
    );
    let screen_right = display.bounds.right();
    let drawer = HeadlessContainer::new(
        ContainerId::Auxiliary,
        surface.clone(),
        Rect::new(screen_right, 0, config.drawer_width, display.work_area.height),
    );
    shell.install_container(ContainerId::Primary, primary.clone());
    shell.install_container(ContainerId::Auxiliary, drawer.clone());
    shell.on_state_change(|old, new| info!(?old, ?new, "Attachment state changed"));

    Ok(Desktop {
        shell,
        surface,
        primary,
        drawer,
    })
}

async fn run_show_hide(desktop: &Desktop) -> Result<()> {
    info!("=== Scenario: show / hide ===");
    desktop
        .shell
        .show_primary()
        .await
        .context("Failed to attach surface to primary window")?;

    let shown = desktop.shell.show_auxiliary().await;
    let frames = desktop.drawer.x_positions();
    info!(outcome = ?shown, frames = frames.len(), final_x = ?frames.last(), "Drawer show finished");
    if shown != ShowOutcome::Shown {
        anyhow::bail!("Drawer show failed: {shown:?}");
    }

    desktop.drawer.clear_events();
    let hidden = desktop.shell.hide_auxiliary_and_wait(None).await;
    let frames = desktop.drawer.x_positions();
    info!(outcome = ?hidden, frames = frames.len(), final_x = ?frames.last(), "Drawer hide finished");
    Ok(())
}

async fn run_toggle(desktop: &Desktop) -> Result<()> {
    info!("=== Scenario: tray toggle ===");
    let first = desktop.shell.toggle_auxiliary().await;
    info!(action = ?first, primary_visible = desktop.primary.is_visible(), "First toggle");

    if let Some(hide) = desktop.shell.handle_auxiliary_blur() {
        let outcome = hide.await.context("Blur hide task failed")?;
        info!(?outcome, "Drawer hidden by blur");
    }
    let swallowed = desktop.shell.toggle_auxiliary().await;
    info!(action = ?swallowed, "Toggle right after blur");

    tokio::time::sleep(sideshell_core::timing::BLUR_SUPPRESS_WINDOW).await;
    let again = desktop.shell.toggle_auxiliary().await;
    info!(action = ?again, "Toggle after suppression window");

    desktop.shell.hide_auxiliary_and_wait(None).await;
    Ok(())
}

async fn run_race(desktop: &Desktop) -> Result<()> {
    info!("=== Scenario: attach race ===");
    let mut handles = Vec::new();
    for i in 0..6 {
        let shell = desktop.shell.clone();
        let target = if i % 2 == 0 {
            ContainerId::Auxiliary
        } else {
            ContainerId::Primary
        };
        handles.push(tokio::spawn(async move { (target, shell.request_attach(target).await) }));
    }
    for handle in handles {
        let (target, result) = handle.await.context("Attach task panicked")?;
        info!(container = %target, ?result, "Attach request resolved");
    }

    info!(
        owner = ?desktop.shell.current_owner(),
        parents = ?desktop.surface.parents(),
        max_simultaneous_parents = desktop.surface.max_simultaneous_parents(),
        "Race settled"
    );
    if desktop.surface.max_simultaneous_parents() > 1 {
        anyhow::bail!("Surface was held by more than one container");
    }
    Ok(())
}

async fn run_destroy(desktop: &Desktop) -> Result<()> {
    info!("=== Scenario: drawer destroyed mid-hide ===");
    if desktop.shell.show_auxiliary().await != ShowOutcome::Shown {
        warn!("Drawer did not show; skipping");
        return Ok(());
    }

    desktop.drawer.destroy_after_positions(5);
    let callbacks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&callbacks);
    let outcome = desktop
        .shell
        .hide_auxiliary_and_wait(Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })))
        .await;
    desktop.shell.handle_container_closed(ContainerId::Auxiliary);

    info!(
        ?outcome,
        callbacks = callbacks.load(Ordering::SeqCst),
        animating = desktop.shell.is_animating(),
        state = ?desktop.shell.attachment_state(),
        "Destroyed drawer handled"
    );
    if outcome != HideOutcome::TargetLost {
        warn!(?outcome, "Expected the hide to lose its target");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("Sideshell simulator starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let scenarios: Vec<Scenario> = match args.scenario {
        Scenario::All => vec![
            Scenario::ShowHide,
            Scenario::Toggle,
            Scenario::Race,
            Scenario::Destroy,
        ],
        one => vec![one],
    };

    for scenario in scenarios {
        // Fresh desktop per scenario; the destroy scenario kills the drawer
        let desktop = build_desktop(&args)?;
        match scenario {
            Scenario::ShowHide => run_show_hide(&desktop).await?,
            Scenario::Toggle => run_toggle(&desktop).await?,
            Scenario::Race => run_race(&desktop).await?,
            Scenario::Destroy => run_destroy(&desktop).await?,
            Scenario::All => {}
        }
        desktop.shell.shutdown();
    }

    info!("Sideshell simulator finished");
    Ok(())
}
