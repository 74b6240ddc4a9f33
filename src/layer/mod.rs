//! Layer stack used to flatten the editor into a single image.
//!
//! The stack mirrors what the editor shows on screen:
//!
//! ```text
//! ┌──────────────┐
//! │    Frame     │ ◄── fixed overlay, fitted to the editor, never clipped
//! ├──────────────┤
//! │    Avatar    │ ◄── composed transform applied, clipped to the clip style
//! ├──────────────┤
//! │  Background  │ ◄── solid colour
//! └──────────────┘
//! ```
//!
//! Each layer implements [`LayerEffect`] and draws into a shared
//! [`RenderContext`]. [`Compositor`] drives the stack and encodes the result.

pub mod avatar;
pub mod compositor;
pub mod frame;
pub mod raster;

pub use avatar::AvatarLayer;
pub use compositor::Compositor;
pub use frame::FrameLayer;

use image::{Rgba, RgbaImage};

use crate::config::{ClipStyle, MAX_SIZE};
use crate::error::CaptureError;
use crate::source::ImageSource;
use crate::transform::ComposedTransform;

// ============================================================================
// Scene
// ============================================================================

/// Everything needed to rasterize the editor at one instant.
#[derive(Debug, Clone)]
pub struct Scene<'a> {
    pub avatar: &'a ImageSource,
    pub frame: Option<&'a ImageSource>,
    pub transform: ComposedTransform,
    /// Editor size in layout points; rendered at one pixel per point.
    pub width: f64,
    pub height: f64,
    /// Avatar box size relative to the editor.
    pub avatar_fraction: f64,
    pub clip: ClipStyle,
    pub background: [u8; 4],
}

impl Scene<'_> {
    /// Output size in whole pixels.
    ///
    /// Non-finite or negative sizes map to zero.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.round().max(0.0) as u32,
            self.height.round().max(0.0) as u32,
        )
    }
}

// ============================================================================
// Render Context
// ============================================================================

/// Canvas passed through the layer stack.
pub struct RenderContext {
    /// The image being built up, bottom layer first.
    pub image: RgbaImage,
}

impl RenderContext {
    /// Creates a canvas filled with `background`.
    pub fn new(width: u32, height: u32, background: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba(background)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

// ============================================================================
// Layer Trait
// ============================================================================

/// A layer that knows how to draw itself into the context.
pub trait LayerEffect {
    fn draw(&self, ctx: &mut RenderContext) -> Result<(), CaptureError>;
}

/// Flattens a scene into one RGBA image.
pub fn flatten(scene: &Scene<'_>) -> Result<RgbaImage, CaptureError> {
    let (width, height) = scene.pixel_size();
    if width == 0 || height == 0 {
        return Err(CaptureError::render(format!(
            "editor has no area ({}x{})",
            scene.width, scene.height
        )));
    }
    if width as f64 > MAX_SIZE || height as f64 > MAX_SIZE {
        return Err(CaptureError::render(format!(
            "editor is too large to capture ({width}x{height}, limit {MAX_SIZE})"
        )));
    }

    let mut ctx = RenderContext::new(width, height, scene.background);

    AvatarLayer::new(scene.avatar, scene.transform)
        .with_fraction(scene.avatar_fraction)
        .with_clip(scene.clip)
        .draw(&mut ctx)?;

    if let Some(frame) = scene.frame {
        FrameLayer::new(frame).draw(&mut ctx)?;
    }

    Ok(ctx.image)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    pub(crate) fn solid_png(width: u32, height: u32, color: [u8; 4]) -> ImageSource {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        ImageSource::from_bytes(buf.into_inner())
    }

    /// Bilinear sampling may be off by a unit or two on solid fills.
    pub(crate) fn assert_close(actual: [u8; 4], expected: [u8; 4]) {
        let close = actual
            .iter()
            .zip(expected.iter())
            .all(|(a, e)| a.abs_diff(*e) <= 3);
        assert!(close, "expected ~{expected:?}, got {actual:?}");
    }

    /// 100x100 frame with an opaque blue band across the top 10 rows.
    pub(crate) const BAND_FRAME: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100"><rect width="100" height="10" fill="#0000ff"/></svg>"##;

    pub(crate) fn scene<'a>(avatar: &'a ImageSource, frame: Option<&'a ImageSource>) -> Scene<'a> {
        Scene {
            avatar,
            frame,
            transform: ComposedTransform::IDENTITY,
            width: 100.0,
            height: 100.0,
            avatar_fraction: 0.9,
            clip: ClipStyle::None,
            background: [240, 240, 240, 255],
        }
    }

    #[test]
    fn flatten_draws_avatar_over_background() {
        let avatar = solid_png(10, 10, [255, 0, 0, 255]);
        let img = flatten(&scene(&avatar, None)).unwrap();

        assert_eq!(img.dimensions(), (100, 100));
        assert_close(img.get_pixel(50, 50).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 1).0, [240, 240, 240, 255]);
    }

    #[test]
    fn frame_sits_on_top_of_avatar() {
        let avatar = solid_png(10, 10, [255, 0, 0, 255]);
        let frame = ImageSource::from_svg(BAND_FRAME);
        let img = flatten(&scene(&avatar, Some(&frame))).unwrap();

        // The band covers the avatar's top rows as well as the background.
        assert_eq!(img.get_pixel(50, 7).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(2, 2).0, [0, 0, 255, 255]);
        // Below the band the avatar shows through.
        assert_close(img.get_pixel(50, 50).0, [255, 0, 0, 255]);
    }

    #[test]
    fn zero_sized_scene_is_a_render_error() {
        let avatar = solid_png(1, 1, [0, 0, 0, 255]);
        let mut s = scene(&avatar, None);
        s.width = 0.0;
        assert!(matches!(flatten(&s), Err(CaptureError::Render(_))));
    }

    #[test]
    fn oversized_scene_is_a_render_error() {
        let avatar = solid_png(1, 1, [0, 0, 0, 255]);
        let mut s = scene(&avatar, None);
        s.width = 1e6;
        s.height = 1e6;
        assert!(matches!(flatten(&s), Err(CaptureError::Render(msg)) if msg.contains("too large")));
    }

    #[test]
    fn unreadable_avatar_fails_capture() {
        let avatar = ImageSource::from_bytes(vec![1u8, 2, 3]);
        assert!(matches!(
            flatten(&scene(&avatar, None)),
            Err(CaptureError::Image(_))
        ));
    }
}
