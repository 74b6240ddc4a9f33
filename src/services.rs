//! Boundary contracts between the editor and the host platform.
//!
//! The editor never talks to a picker, renderer, media store or permission
//! system directly. Each is reached through one of the traits below, so a
//! host plugs in its native implementations and tests plug in fakes.
//!
//! The crate ships two ready-made implementations: [`GalleryDirectory`], a
//! media store backed by a plain directory, and [`AlwaysGranted`]. The
//! built-in rasterizer is [`Compositor`](crate::Compositor).

// The editor is driven from a single UI thread; collaborators need not be Send.
#![allow(async_fn_in_trait)]

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CaptureError, PermissionError, PickerError, SaveError};
use crate::layer::Scene;
use crate::options::{CaptureConfig, CaptureFormat, PickerOptions};
use crate::source::{LocalUri, file_uri, parse_uri};

// ============================================================================
// Picker
// ============================================================================

/// One image returned by the picker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickedImage {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Present when the picker was asked for base64 output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

impl PickedImage {
    /// A picked image known only by its URI.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }
}

/// User-facing image picker.
pub trait ImagePicker {
    /// Shows the picker with fully merged options.
    async fn show(&self, options: &PickerOptions) -> Result<Vec<PickedImage>, PickerError>;

    /// Opens the camera directly. Pickers without a separate camera entry
    /// point fall back to [`show`](Self::show).
    async fn open_camera(&self, options: &PickerOptions) -> Result<Vec<PickedImage>, PickerError> {
        self.show(options).await
    }
}

// ============================================================================
// Rasterizer
// ============================================================================

/// Flattens the editor's layer stack into an artifact reference.
pub trait Rasterizer {
    async fn capture(&self, scene: &Scene<'_>, options: &CaptureConfig) -> Result<String, CaptureError>;
}

// ============================================================================
// Media store
// ============================================================================

/// Where a saved artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReceipt {
    pub uri: String,
}

/// Persists captured artifacts to the device's media library.
pub trait MediaStore {
    async fn save(&self, artifact: &str) -> Result<SaveReceipt, SaveError>;
}

/// Media store that files artifacts into a directory.
///
/// Accepts every artifact form the built-in rasterizer produces: a file
/// path, a `file://` URI, a `data:` URI or bare base64.
#[derive(Debug, Clone)]
pub struct GalleryDirectory {
    root: PathBuf,
}

impl GalleryDirectory {
    /// The directory is created on the first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write(&self, bytes: &[u8], ext: &str) -> Result<SaveReceipt, SaveError> {
        std::fs::create_dir_all(&self.root).map_err(|source| SaveError::Write {
            path: self.root.clone(),
            source,
        })?;

        let path = self.root.join(format!("{}.{ext}", Uuid::new_v4()));
        std::fs::write(&path, bytes).map_err(|source| SaveError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(SaveReceipt {
            uri: file_uri(&path),
        })
    }
}

impl MediaStore for GalleryDirectory {
    async fn save(&self, artifact: &str) -> Result<SaveReceipt, SaveError> {
        let artifact = artifact.trim();
        if artifact.is_empty() {
            return Err(SaveError::invalid_artifact("empty artifact reference"));
        }

        if let Some(bytes) = bare_base64(artifact) {
            let ext = sniff_extension(&bytes)?;
            return self.write(&bytes, ext);
        }

        match parse_uri(artifact).map_err(SaveError::InvalidArtifact)? {
            LocalUri::File(path) => {
                let bytes = std::fs::read(&path).map_err(|source| SaveError::Write {
                    path: path.clone(),
                    source,
                })?;
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(CaptureFormat::from_extension)
                    .map(CaptureFormat::extension);
                let ext = match ext {
                    Some(ext) => ext,
                    None => sniff_extension(&bytes)?,
                };
                self.write(&bytes, ext)
            }
            LocalUri::Data { mime, bytes } => {
                let ext = mime
                    .strip_prefix("image/")
                    .and_then(CaptureFormat::from_extension)
                    .map(CaptureFormat::extension);
                let ext = match ext {
                    Some(ext) => ext,
                    None => sniff_extension(&bytes)?,
                };
                self.write(&bytes, ext)
            }
        }
    }
}

/// Decodes `artifact` if it looks like bare base64 rather than a path.
fn bare_base64(artifact: &str) -> Option<Vec<u8>> {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;

    if artifact.contains('/') && artifact.contains('.') {
        return None;
    }
    let bytes = STANDARD.decode(artifact).ok()?;
    image::guess_format(&bytes).ok()?;
    Some(bytes)
}

fn sniff_extension(bytes: &[u8]) -> Result<&'static str, SaveError> {
    let format = image::guess_format(bytes)
        .map_err(|e| SaveError::invalid_artifact(format!("not an image: {e}")))?;
    format
        .extensions_str()
        .first()
        .copied()
        .ok_or_else(|| SaveError::invalid_artifact("unknown image format"))
}

// ============================================================================
// Permissions
// ============================================================================

/// Platform write-permission prompt, consulted before saving on platforms
/// that need one.
pub trait PermissionGate {
    /// Resolves to whether the user granted write access.
    async fn request_write_permission(&self) -> Result<bool, PermissionError>;
}

/// Permission gate for platforms without a prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl PermissionGate for AlwaysGranted {
    async fn request_write_permission(&self) -> Result<bool, PermissionError> {
        Ok(true)
    }
}

// ============================================================================
// Tests
// ============================================================================
