//! Construction-time editor configuration.
//!
//! [`EditorConfig`] carries the plain-data inputs of an editor: its rendered
//! size, clip shape, background, target platform and the gesture policies.
//! It round-trips through camelCase JSON so hosts can keep it next to their
//! other settings.
//!
//! ```json
//! {
//!   "width": 320.0,
//!   "height": 320.0,
//!   "clip": { "shape": "circle" },
//!   "background": "#f0f0f0",
//!   "platform": "android",
//!   "cancelPolicy": "discard",
//!   "scaleBounds": { "min": 0.25, "max": 8.0 }
//! }
//! ```

use std::path::PathBuf;

use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gesture::CancelPolicy;
use crate::transform::ScaleBounds;

/// Default edge length of the editor, in layout points.
pub const DEFAULT_SIZE: f64 = 300.0;

/// Share of the editor covered by the avatar box before any transform.
pub const DEFAULT_AVATAR_FRACTION: f64 = 0.9;

pub const DEFAULT_BACKGROUND: &str = "#f0f0f0";

/// Largest editor edge accepted, in layout points. Captures render at one
/// pixel per point, so this also caps the artifact size.
pub const MAX_SIZE: f64 = 8192.0;

// ============================================================================
// ClipStyle
// ============================================================================

/// Shape the avatar layer is clipped to. The frame is never clipped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum ClipStyle {
    /// Clip to the editor bounds only.
    #[default]
    None,
    /// Largest circle centred in the editor.
    Circle,
    /// Editor bounds with rounded corners.
    RoundedRect { radius: f64 },
}

// ============================================================================
// Platform
// ============================================================================

/// Target platform, used to decide whether saving needs a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    #[default]
    Other,
}

impl Platform {
    /// Only Android asks for write access before touching the gallery.
    pub fn requires_write_permission(self) -> bool {
        matches!(self, Platform::Android)
    }
}

// ============================================================================
// EditorConfig
// ============================================================================

/// Plain-data settings for one editor instance.
///
/// Missing JSON keys take their [`Default`] values, so `{}` is a valid
/// configuration. Builders do not validate; call [`validate`](Self::validate)
/// or go through [`from_json`](Self::from_json).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Editor width in layout points.
    pub width: f64,
    /// Editor height in layout points.
    pub height: f64,
    /// Share of each editor edge the untransformed avatar box covers.
    pub avatar_fraction: f64,
    pub clip: ClipStyle,
    /// Hex colour painted behind the avatar.
    pub background: String,
    pub platform: Platform,
    pub cancel_policy: CancelPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_bounds: Option<ScaleBounds>,
    /// Where temporary capture artifacts go. Defaults to the OS temp dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            avatar_fraction: DEFAULT_AVATAR_FRACTION,
            clip: ClipStyle::None,
            background: DEFAULT_BACKGROUND.to_string(),
            platform: Platform::Other,
            cancel_policy: CancelPolicy::Commit,
            scale_bounds: None,
            artifact_dir: None,
        }
    }
}

impl EditorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the editor size. Both edges must end up in `(0, MAX_SIZE]`.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the shape the avatar layer is clipped to.
    pub fn with_clip(mut self, clip: ClipStyle) -> Self {
        self.clip = clip;
        self
    }

    /// Sets the background colour, as hex or `transparent`.
    pub fn with_background(mut self, hex: impl Into<String>) -> Self {
        self.background = hex.into();
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Chooses what a cancelled or failed gesture does with its delta.
    pub fn with_cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.cancel_policy = policy;
        self
    }

    /// Clamps the committed scale to `bounds`.
    pub fn with_scale_bounds(mut self, bounds: ScaleBounds) -> Self {
        self.scale_bounds = Some(bounds);
        self
    }

    /// Overrides where the built-in compositor writes tmpfile artifacts.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Checks every field, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let size_ok = |v: f64| v.is_finite() && v > 0.0 && v <= MAX_SIZE;
        if !size_ok(self.width) || !size_ok(self.height) {
            return Err(ConfigError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.avatar_fraction > 0.0 && self.avatar_fraction <= 1.0) {
            return Err(ConfigError::InvalidAvatarFraction(self.avatar_fraction));
        }
        if let Some(bounds) = self.scale_bounds {
            if !bounds.is_valid() {
                return Err(ConfigError::InvalidScaleBounds {
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        self.background_rgba()?;
        Ok(())
    }

    /// Parses [`background`](Self::background) into RGBA.
    ///
    /// Accepts `#rgb`, `#rrggbb` (with or without `#`) and `transparent`.
    pub fn background_rgba(&self) -> Result<[u8; 4], ConfigError> {
        let raw = self.background.trim();
        if raw.eq_ignore_ascii_case("transparent") {
            return Ok([0, 0, 0, 0]);
        }
        let rgb: Srgb<u8> = raw
            .parse()
            .map_err(|_| ConfigError::InvalidColor(self.background.clone()))?;
        Ok([rgb.red, rgb.green, rgb.blue, 255])
    }

    /// Directory for temporary artifacts.
    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses and validates a configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
