//! Option objects for picking and capturing.
//!
//! Both option types are partial: every key is optional, and unspecified
//! keys fall back to per-operation defaults. Merging is shallow and key by
//! key; a caller-supplied value always wins.
//!
//! # Example
//!
//! ```
//! use avatar_editor::{PickerMode, PickerOptions};
//!
//! let custom = PickerOptions {
//!     quality: Some(80),
//!     is_crop: Some(true),
//!     ..PickerOptions::default()
//! };
//!
//! let merged = PickerMode::Gallery.resolve(&custom);
//! assert_eq!(merged.quality, Some(80));
//! assert_eq!(merged.is_camera, Some(false));
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// PickerOptions
// ============================================================================

/// Options understood by the host image picker.
///
/// Key names match the picker's own JSON keys, including the upper-case
/// `CropW` / `CropH`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerOptions {
    /// Maximum number of images to pick. The editor only uses the first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_record_selected: Option<bool>,
    /// Whether the picker offers an in-picker camera.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_camera: Option<bool>,
    /// Cropping only applies when `image_count` is 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_crop: Option<bool>,
    #[serde(rename = "CropW", skip_serializing_if = "Option::is_none")]
    pub crop_w: Option<u32>,
    #[serde(rename = "CropH", skip_serializing_if = "Option::is_none")]
    pub crop_h: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_gif: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_crop_circle: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circle_crop_radius: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_crop_frame: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_crop_grid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress_focus_alpha: Option<bool>,
    /// Compression quality, 0-100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// Images below this many kilobytes are left uncompressed (Android).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_compress_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_base64: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_style_crop_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_selected_index: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_picking_original_photo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_picking_multiple_video: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_take_photo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_picking_photo: Option<bool>,
}

impl PickerOptions {
    /// Creates an empty option set (everything defaulted).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `self` with any unset key taken from `defaults`.
    pub fn merged_over(self, defaults: &PickerOptions) -> PickerOptions {
        let d = defaults;
        PickerOptions {
            image_count: self.image_count.or(d.image_count),
            is_record_selected: self.is_record_selected.or(d.is_record_selected),
            is_camera: self.is_camera.or(d.is_camera),
            is_crop: self.is_crop.or(d.is_crop),
            crop_w: self.crop_w.or(d.crop_w),
            crop_h: self.crop_h.or(d.crop_h),
            is_gif: self.is_gif.or(d.is_gif),
            show_crop_circle: self.show_crop_circle.or(d.show_crop_circle),
            circle_crop_radius: self.circle_crop_radius.or(d.circle_crop_radius),
            show_crop_frame: self.show_crop_frame.or(d.show_crop_frame),
            show_crop_grid: self.show_crop_grid.or(d.show_crop_grid),
            compress: self.compress.or(d.compress),
            compress_focus_alpha: self.compress_focus_alpha.or(d.compress_focus_alpha),
            quality: self.quality.or(d.quality),
            minimum_compress_size: self.minimum_compress_size.or(d.minimum_compress_size),
            enable_base64: self.enable_base64.or(d.enable_base64),
            free_style_crop_enabled: self.free_style_crop_enabled.or(d.free_style_crop_enabled),
            rotate_enabled: self.rotate_enabled.or(d.rotate_enabled),
            scale_enabled: self.scale_enabled.or(d.scale_enabled),
            show_selected_index: self.show_selected_index.or(d.show_selected_index),
            allow_picking_original_photo: self
                .allow_picking_original_photo
                .or(d.allow_picking_original_photo),
            allow_picking_multiple_video: self
                .allow_picking_multiple_video
                .or(d.allow_picking_multiple_video),
            allow_take_photo: self.allow_take_photo.or(d.allow_take_photo),
            allow_picking_photo: self.allow_picking_photo.or(d.allow_picking_photo),
        }
    }

    /// Serializes the options to the picker's JSON form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// PickerMode
// ============================================================================

/// Which picking entry point an editor operation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PickerMode {
    /// Camera capture or gallery choice.
    Any,
    /// Gallery only.
    Gallery,
    /// Camera only.
    Camera,
}

impl PickerMode {
    /// The default option set for this mode.
    pub fn defaults(self) -> PickerOptions {
        let common = PickerOptions {
            image_count: Some(1),
            is_crop: Some(false),
            crop_w: Some(300),
            crop_h: Some(300),
            show_crop_circle: Some(false),
            show_crop_frame: Some(true),
            show_crop_grid: Some(false),
            quality: Some(90),
            enable_base64: Some(false),
            allow_picking_original_photo: Some(true),
            allow_picking_multiple_video: Some(false),
            show_selected_index: Some(false),
            ..PickerOptions::default()
        };

        match self {
            PickerMode::Any => PickerOptions {
                is_camera: Some(true),
                allow_take_photo: Some(true),
                allow_picking_photo: Some(true),
                ..common
            },
            PickerMode::Gallery => PickerOptions {
                is_camera: Some(false),
                ..common
            },
            PickerMode::Camera => PickerOptions {
                is_camera: Some(true),
                allow_take_photo: Some(true),
                allow_picking_photo: Some(false),
                ..common
            },
        }
    }

    /// Merges caller options over this mode's defaults.
    pub fn resolve(self, custom: &PickerOptions) -> PickerOptions {
        custom.clone().merged_over(&self.defaults())
    }
}

// ============================================================================
// CaptureOptions
// ============================================================================

/// Encoded format of a captured artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    #[default]
    Png,
    #[serde(alias = "jpeg")]
    Jpg,
    Webp,
}

impl CaptureFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CaptureFormat::Png => "png",
            CaptureFormat::Jpg => "jpg",
            CaptureFormat::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            CaptureFormat::Png => "image/png",
            CaptureFormat::Jpg => "image/jpeg",
            CaptureFormat::Webp => "image/webp",
        }
    }

    /// Looks a format up from a file extension or MIME subtype.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(CaptureFormat::Png),
            "jpg" | "jpeg" => Some(CaptureFormat::Jpg),
            "webp" => Some(CaptureFormat::Webp),
            _ => None,
        }
    }
}

/// How a captured artifact is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureResult {
    /// Path of a temporary file.
    #[default]
    Tmpfile,
    /// Bare base64 of the encoded bytes.
    Base64,
    /// `data:<mime>;base64,...`
    DataUri,
}

/// Caller-supplied capture options. Unset keys use [`CaptureConfig::default`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    /// Encoding quality, 0.0-1.0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<CaptureFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CaptureResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_content_container: Option<bool>,
}

impl CaptureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_format(mut self, format: CaptureFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_result(mut self, result: CaptureResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Merges these options over the capture defaults.
    pub fn resolve(&self) -> CaptureConfig {
        let d = CaptureConfig::default();
        CaptureConfig {
            quality: self.quality.unwrap_or(d.quality).clamp(0.0, 1.0),
            format: self.format.unwrap_or(d.format),
            result: self.result.unwrap_or(d.result),
            snapshot_content_container: self
                .snapshot_content_container
                .unwrap_or(d.snapshot_content_container),
        }
    }
}

/// Fully resolved capture options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    pub quality: f32,
    pub format: CaptureFormat,
    pub result: CaptureResult,
    pub snapshot_content_container: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            quality: 1.0,
            format: CaptureFormat::Png,
            result: CaptureResult::Tmpfile,
            snapshot_content_container: false,
        }
    }
}

impl CaptureConfig {
    /// JPEG quality on the 1-100 scale the encoder expects.
    pub fn jpeg_quality(&self) -> u8 {
        ((self.quality * 100.0).round() as u8).clamp(1, 100)
    }
}

// ============================================================================
// Tests
// ============================================================================
