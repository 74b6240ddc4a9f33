//! Decorative frame overlay.

use kurbo::{Affine, Vec2};

use super::raster::{contain_scale, draw_transformed};
use super::{LayerEffect, RenderContext};
use crate::error::CaptureError;
use crate::source::ImageSource;

/// Fixed frame drawn on top of everything else.
///
/// The frame is contain-fitted to the full editor and centred. Gestures
/// never move it, and the avatar only shows through its transparent parts.
/// SVG frames are rasterized at the editor size, so they stay sharp.
#[derive(Debug, Clone)]
pub struct FrameLayer<'a> {
    pub source: &'a ImageSource,
}

impl<'a> FrameLayer<'a> {
    pub fn new(source: &'a ImageSource) -> Self {
        Self { source }
    }

    /// Maps frame pixel coordinates to canvas coordinates: scaled to fit,
    /// then centred on the axis with room to spare.
    pub fn placement(frame_size: (f64, f64), canvas_size: (f64, f64)) -> Affine {
        let fit = contain_scale(frame_size, canvas_size);
        let offset = Vec2::new(
            (canvas_size.0 - frame_size.0 * fit) / 2.0,
            (canvas_size.1 - frame_size.1 * fit) / 2.0,
        );
        Affine::translate(offset) * Affine::scale(fit)
    }
}

impl LayerEffect for FrameLayer<'_> {
    fn draw(&self, ctx: &mut RenderContext) -> Result<(), CaptureError> {
        let (width, height) = (ctx.width(), ctx.height());

        let frame = self.source.decode(width.max(height))?;
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(());
        }

        let transform = Self::placement(
            (frame.width() as f64, frame.height() as f64),
            (width as f64, height as f64),
        );
        draw_transformed(&mut ctx.image, &frame, transform, None)
            .ok_or_else(|| CaptureError::render("canvas is empty"))
    }
}

// ============================================================================
// Tests
// ============================================================================
