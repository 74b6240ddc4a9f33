//! Error types surfaced by the editor and its collaborators.

use std::path::PathBuf;

/// Failure reported by the image picker.
///
/// The editor logs these and leaves its state untouched; they never reach
/// the caller of a select operation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PickerError {
    #[error("image picking was cancelled")]
    Cancelled,

    #[error("image picker unavailable: {0}")]
    Unavailable(String),

    #[error("image picker failed: {0}")]
    Backend(String),
}

/// Failure while flattening the editor into an artifact.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("render surface is not ready")]
    SurfaceNotReady,

    #[error("cannot resolve image source: {0}")]
    Source(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("cannot write artifact to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CaptureError {
    pub fn source_error(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

/// The permission prompt itself failed. The editor treats this as a denial.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("permission request failed: {0}")]
pub struct PermissionError(pub String);

/// Failure while persisting an artifact to the media store.
#[derive(thiserror::Error, Debug)]
pub enum SaveError {
    #[error("permission to write to the photo library was denied")]
    PermissionDenied,

    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("cannot write to media store at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("media store failed: {0}")]
    Backend(String),
}

impl SaveError {
    pub fn invalid_artifact(msg: impl Into<String>) -> Self {
        Self::InvalidArtifact(msg.into())
    }
}

/// Invalid editor configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("editor size must be finite and in (0, 8192], got {width}x{height}")]
    InvalidSize { width: f64, height: f64 },

    #[error("avatar fraction must be in (0, 1], got {0}")]
    InvalidAvatarFraction(f64),

    #[error("invalid background color {0:?}")]
    InvalidColor(String),

    #[error("scale bounds must satisfy 0 < min <= max, got [{min}, {max}]")]
    InvalidScaleBounds { min: f64, max: f64 },

    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(
            CaptureError::SurfaceNotReady.to_string(),
            "render surface is not ready"
        );
        assert!(SaveError::PermissionDenied.to_string().contains("denied"));
        assert!(
            PickerError::Backend("boom".into())
                .to_string()
                .contains("boom")
        );
        assert!(
            ConfigError::InvalidScaleBounds { min: 2.0, max: 1.0 }
                .to_string()
                .contains("[2, 1]")
        );
    }

    #[test]
    fn io_errors_keep_their_source() {
        use std::error::Error;

        let err = SaveError::Write {
            path: PathBuf::from("/nowhere"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/nowhere"));
    }
}
