//! TOML Configuration File Support
//!
//! Centralized configuration loading for the shell core, from a TOML file at
//! `~/.config/sideshell/shell.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [animation]
//! duration_ms = 200
//! easing = "ease_out_cubic"
//! preferred_refresh_rate = 120
//! min_refresh_rate = 60
//!
//! [drawer]
//! width = 400
//!
//! [layout]
//! toolbar_height = 41
//! padding_right = 12
//! padding_top = 8
//! padding_bottom = 8
//! ```
//!
//! Settle delays are not configurable; see [`crate::timing`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animation::EasingFunction;
use crate::display::RefreshRatePolicy;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Animation section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationToml {
    /// Slide duration in milliseconds
    pub duration_ms: Option<u64>,

    /// Easing curve name
    pub easing: Option<EasingFunction>,

    /// Refresh rate assumed when displays report none
    pub preferred_refresh_rate: Option<f64>,

    /// Refresh rate assumed when displays cannot be read
    pub min_refresh_rate: Option<f64>,
}

/// Drawer section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawerToml {
    /// Drawer width in pixels
    pub width: Option<u32>,
}

/// Layout section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutToml {
    /// Height of the primary window's toolbar strip
    pub toolbar_height: Option<u32>,

    /// Drawer padding to the right of the surface
    pub padding_right: Option<u32>,

    /// Drawer padding above the surface
    pub padding_top: Option<u32>,

    /// Drawer padding below the surface
    pub padding_bottom: Option<u32>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellToml {
    /// Animation configuration section
    pub animation: AnimationToml,

    /// Drawer configuration section
    pub drawer: DrawerToml,

    /// Layout configuration section
    pub layout: LayoutToml,
}

// =============================================================================
// Main Configuration Structs
// =============================================================================

/// Slide animation parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationConfig {
    /// Total slide duration
    pub duration: Duration,
    /// Easing curve
    pub easing: EasingFunction,
    /// Refresh rate fallbacks
    pub refresh: RefreshRatePolicy,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(200),
            easing: EasingFunction::EaseOutCubic,
            refresh: RefreshRatePolicy::default(),
        }
    }
}

/// Padding kept between the drawer's edges and the surface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawerPadding {
    /// Right padding
    pub right: u32,
    /// Top padding
    pub top: u32,
    /// Bottom padding
    pub bottom: u32,
}

/// How the surface is laid out inside each container
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Toolbar strip reserved at the top of the primary window (not in fullscreen)
    pub toolbar_height: u32,
    /// Padding inside the drawer
    pub drawer_padding: DrawerPadding,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            toolbar_height: 41,
            drawer_padding: DrawerPadding {
                right: 12,
                top: 8,
                bottom: 8,
            },
        }
    }
}

/// Centralized configuration for the shell core
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct ShellConfig {
    /// Slide animation
    pub animation: AnimationConfig,

    /// Drawer width in pixels
    pub drawer_width: u32,

    /// Surface layout inside containers
    pub layout: LayoutConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            animation: AnimationConfig::default(),
            drawer_width: 400,
            layout: LayoutConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ShellConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values the core cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.animation.duration.is_zero() {
            return Err(ConfigError::ValidationError(
                "animation.duration_ms must be greater than 0".to_string(),
            ));
        }
        if self.drawer_width == 0 {
            return Err(ConfigError::ValidationError(
                "drawer.width must be greater than 0".to_string(),
            ));
        }
        let refresh = self.animation.refresh;
        if !(refresh.preferred > 0.0 && refresh.minimum > 0.0) {
            return Err(ConfigError::ValidationError(
                "refresh rates must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/sideshell/shell.toml` or
/// `~/.config/sideshell/shell.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sideshell").join("shell.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// merged values fail validation. A missing config file is not an error.
pub fn load_config() -> Result<ShellConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed, or
/// if the merged values fail validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ShellConfig, ConfigError> {
    let mut config = ShellConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ShellToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ShellConfig, toml: &ShellToml) {
    if let Some(ms) = toml.animation.duration_ms {
        config.animation.duration = Duration::from_millis(ms);
    }
    if let Some(easing) = toml.animation.easing {
        config.animation.easing = easing;
    }
    if let Some(rate) = toml.animation.preferred_refresh_rate {
        config.animation.refresh.preferred = rate;
    }
    if let Some(rate) = toml.animation.min_refresh_rate {
        config.animation.refresh.minimum = rate;
    }

    if let Some(width) = toml.drawer.width {
        config.drawer_width = width;
    }

    if let Some(height) = toml.layout.toolbar_height {
        config.layout.toolbar_height = height;
    }
    if let Some(right) = toml.layout.padding_right {
        config.layout.drawer_padding.right = right;
    }
    if let Some(top) = toml.layout.padding_top {
        config.layout.drawer_padding.top = top;
    }
    if let Some(bottom) = toml.layout.padding_bottom {
        config.layout.drawer_padding.bottom = bottom;
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut ShellConfig) {
    if let Ok(duration) = std::env::var("SIDESHELL_ANIMATION_DURATION_MS") {
        if let Ok(ms) = duration.parse::<u64>() {
            config.animation.duration = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(name) = std::env::var("SIDESHELL_EASING") {
        if let Some(easing) = EasingFunction::parse(&name) {
            config.animation.easing = easing;
            config.source = ConfigSource::Env;
        } else {
            tracing::warn!(easing = %name, "Unknown easing in SIDESHELL_EASING, ignoring");
        }
    }
    if let Ok(width) = std::env::var("SIDESHELL_DRAWER_WIDTH") {
        if let Ok(w) = width.parse::<u32>() {
            config.drawer_width = w;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(height) = std::env::var("SIDESHELL_TOOLBAR_HEIGHT") {
        if let Ok(h) = height.parse::<u32>() {
            config.layout.toolbar_height = h;
            config.source = ConfigSource::Env;
        }
    }
}
