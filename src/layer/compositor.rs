//! Built-in rasterizer: flattens the layer stack and encodes the artifact.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use uuid::Uuid;

use super::{Scene, flatten};
use crate::error::CaptureError;
use crate::options::{CaptureConfig, CaptureFormat, CaptureResult};
use crate::services::Rasterizer;

/// CPU rasterizer that renders the editor with `tiny_skia` and encodes it
/// with `image`.
///
/// Temporary-file artifacts are written to `artifact_dir` with a random
/// name; nothing cleans them up.
#[derive(Debug, Clone)]
pub struct Compositor {
    artifact_dir: PathBuf,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl Compositor {
    /// Writes tmpfile artifacts under `artifact_dir`, created on demand.
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
        }
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Flattens, encodes and delivers a scene synchronously.
    pub fn render(&self, scene: &Scene<'_>, config: &CaptureConfig) -> Result<String, CaptureError> {
        let image = flatten(scene)?;
        let bytes = encode(&image, config)?;
        self.deliver(bytes, config)
    }

    fn deliver(&self, bytes: Vec<u8>, config: &CaptureConfig) -> Result<String, CaptureError> {
        match config.result {
            CaptureResult::Tmpfile => {
                let io_err = |source| CaptureError::Io {
                    path: self.artifact_dir.clone(),
                    source,
                };
                std::fs::create_dir_all(&self.artifact_dir).map_err(io_err)?;

                let name = format!("avatar-{}.{}", Uuid::new_v4(), config.format.extension());
                let path = self.artifact_dir.join(name);
                std::fs::write(&path, &bytes).map_err(|source| CaptureError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(path.to_string_lossy().into_owned())
            }
            CaptureResult::Base64 => Ok(STANDARD.encode(&bytes)),
            CaptureResult::DataUri => Ok(format!(
                "data:{};base64,{}",
                config.format.mime_type(),
                STANDARD.encode(&bytes)
            )),
        }
    }
}

impl Rasterizer for Compositor {
    async fn capture(&self, scene: &Scene<'_>, options: &CaptureConfig) -> Result<String, CaptureError> {
        self.render(scene, options)
    }
}

/// Encodes a flattened image in the requested format.
///
/// JPEG drops the alpha channel and honours `quality`; PNG and WebP are
/// lossless.
pub fn encode(image: &RgbaImage, config: &CaptureConfig) -> Result<Vec<u8>, CaptureError> {
    let mut buf = Cursor::new(Vec::new());
    match config.format {
        CaptureFormat::Png => image.write_to(&mut buf, ImageFormat::Png)?,
        CaptureFormat::Webp => image.write_to(&mut buf, ImageFormat::WebP)?,
        CaptureFormat::Jpg => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, config.jpeg_quality());
            encoder.encode_image(&rgb)?;
        }
    }
    Ok(buf.into_inner())
}

// ============================================================================
// Tests
// ============================================================================
