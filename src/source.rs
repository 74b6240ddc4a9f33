//! Image sources for the avatar and frame layers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::error::CaptureError;
use crate::layer::raster::render_svg;

// ============================================================================
// ImageSource
// ============================================================================

/// Where an editor layer gets its pixels from.
///
/// - [`Uri`](Self::Uri): a plain file path, a `file://` URI or a `data:` URI
///   (what pickers and capture hand back).
/// - [`Bytes`](Self::Bytes): an encoded image bundled with the application.
/// - [`Svg`](Self::Svg): SVG markup, rasterized at the size it is drawn at.
///
/// # Example
///
/// ```
/// use avatar_editor::ImageSource;
///
/// let picked = ImageSource::from_uri("file:///tmp/photo.jpg");
/// assert_eq!(picked.uri(), Some("file:///tmp/photo.jpg"));
///
/// let frame = ImageSource::from_svg("<svg>...</svg>");
/// assert!(frame.is_svg());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Uri(String),
    Bytes(Arc<[u8]>),
    Svg(String),
}

impl ImageSource {
    /// A `file://` URI, `data:` URI or plain path. Resolution is deferred
    /// to capture time.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self::Uri(uri.into())
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Inline SVG markup, rasterized at whatever size the layer needs.
    pub fn from_svg(svg: impl Into<String>) -> Self {
        Self::Svg(svg.into())
    }

    /// The URI, if this source is one.
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::Uri(uri) => Some(uri),
            _ => None,
        }
    }

    pub fn is_svg(&self) -> bool {
        matches!(self, Self::Svg(_))
    }

    /// Decodes this source into RGBA pixels.
    ///
    /// `size` is only consulted for SVG sources, which are rendered so that
    /// their larger side is `size` pixels.
    pub fn decode(&self, size: u32) -> Result<RgbaImage, CaptureError> {
        match self {
            Self::Uri(uri) => decode_uri(uri),
            Self::Bytes(bytes) => Ok(image::load_from_memory(bytes)?.to_rgba8()),
            Self::Svg(svg) => render_svg(svg, size)
                .ok_or_else(|| CaptureError::source_error("SVG could not be parsed or rendered")),
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri(uri) if uri.starts_with("data:") => write!(f, "data URI ({} bytes)", uri.len()),
            Self::Uri(uri) => f.write_str(uri),
            Self::Bytes(bytes) => write!(f, "embedded image ({} bytes)", bytes.len()),
            Self::Svg(svg) => write!(f, "inline SVG ({} bytes)", svg.len()),
        }
    }
}

impl From<&str> for ImageSource {
    fn from(uri: &str) -> Self {
        Self::from_uri(uri)
    }
}

impl From<String> for ImageSource {
    fn from(uri: String) -> Self {
        Self::Uri(uri)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Uri(path.to_string_lossy().into_owned())
    }
}

// ============================================================================
// URI handling
// ============================================================================

/// Characters escaped in the path of a `file://` URI.
const PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A URI the editor can read bytes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LocalUri<'a> {
    File(PathBuf),
    Data { mime: &'a str, bytes: Vec<u8> },
}

/// Formats an absolute path as a percent-encoded `file://` URI.
pub(crate) fn file_uri(path: &Path) -> String {
    let path = path.to_string_lossy();
    format!("file://{}", utf8_percent_encode(&path, PATH_ESCAPES))
}

/// Classifies a URI, rejecting schemes that need a platform resolver.
pub(crate) fn parse_uri(uri: &str) -> Result<LocalUri<'_>, String> {
    if let Some(rest) = uri.strip_prefix("data:") {
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| "data URI has no payload".to_string())?;
        let mime = header.strip_suffix(";base64").ok_or_else(|| {
            "only base64 data URIs are supported".to_string()
        })?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| format!("bad base64 payload: {e}"))?;
        return Ok(LocalUri::Data { mime, bytes });
    }

    if let Some(rest) = uri.strip_prefix("file://") {
        let path = rest.strip_prefix("localhost").unwrap_or(rest);
        if !path.starts_with('/') {
            return Err(format!("file URI names a remote host: {uri}"));
        }
        let path = percent_decode_str(path)
            .decode_utf8()
            .map_err(|e| format!("file URI path is not UTF-8: {e}"))?;
        return Ok(LocalUri::File(PathBuf::from(path.into_owned())));
    }

    match uri.split_once("://") {
        Some((scheme, _)) => Err(format!("unsupported URI scheme {scheme:?}")),
        None => Ok(LocalUri::File(PathBuf::from(uri))),
    }
}

fn decode_uri(uri: &str) -> Result<RgbaImage, CaptureError> {
    match parse_uri(uri).map_err(CaptureError::Source)? {
        LocalUri::File(path) => {
            let bytes = std::fs::read(&path).map_err(|source| CaptureError::Io { path, source })?;
            Ok(image::load_from_memory(&bytes)?.to_rgba8())
        }
        LocalUri::Data { bytes, .. } => Ok(image::load_from_memory(&bytes)?.to_rgba8()),
    }
}

// ============================================================================
// Tests
// ============================================================================
