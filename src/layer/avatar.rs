//! The transformable avatar layer.

use kurbo::{Affine, Point, Vec2};
use resvg::tiny_skia::{FillRule, Mask, Path, PathBuilder, Rect, Transform};

use super::raster::{contain_scale, draw_transformed};
use super::{LayerEffect, RenderContext};
use crate::config::{ClipStyle, DEFAULT_AVATAR_FRACTION};
use crate::error::CaptureError;
use crate::source::ImageSource;
use crate::transform::ComposedTransform;

/// Avatar image, contain-fitted into a centred box and drawn with the
/// composed gesture transform.
#[derive(Debug, Clone)]
pub struct AvatarLayer<'a> {
    pub source: &'a ImageSource,
    pub transform: ComposedTransform,
    /// Box size relative to the canvas (0.0-1.0].
    pub fraction: f64,
    pub clip: ClipStyle,
}

impl<'a> AvatarLayer<'a> {
    pub fn new(source: &'a ImageSource, transform: ComposedTransform) -> Self {
        Self {
            source,
            transform,
            fraction: DEFAULT_AVATAR_FRACTION,
            clip: ClipStyle::None,
        }
    }

    pub fn with_fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    pub fn with_clip(mut self, clip: ClipStyle) -> Self {
        self.clip = clip;
        self
    }

    /// Maps avatar pixel coordinates to canvas coordinates.
    ///
    /// The image is first centred and fitted into the avatar box, then the
    /// composed transform is applied about the canvas centre.
    pub fn placement(&self, image_size: (f64, f64), canvas_size: (f64, f64)) -> Affine {
        let center = Point::new(canvas_size.0 / 2.0, canvas_size.1 / 2.0);
        let box_size = (canvas_size.0 * self.fraction, canvas_size.1 * self.fraction);
        let fit = contain_scale(image_size, box_size);

        let fitted = Affine::translate(center.to_vec2())
            * Affine::scale(fit)
            * Affine::translate(Vec2::new(-image_size.0 / 2.0, -image_size.1 / 2.0));

        self.transform.to_affine(center) * fitted
    }
}

impl LayerEffect for AvatarLayer<'_> {
    fn draw(&self, ctx: &mut RenderContext) -> Result<(), CaptureError> {
        let canvas_size = (ctx.width() as f64, ctx.height() as f64);
        let hint = (canvas_size.0.max(canvas_size.1) * self.fraction).ceil() as u32;

        let avatar = self.source.decode(hint.max(1))?;
        if avatar.width() == 0 || avatar.height() == 0 {
            return Err(CaptureError::source_error("avatar image is empty"));
        }

        let transform = self.placement(
            (avatar.width() as f64, avatar.height() as f64),
            canvas_size,
        );
        let mask = clip_mask(self.clip, ctx.width(), ctx.height())?;

        draw_transformed(&mut ctx.image, &avatar, transform, mask.as_ref())
            .ok_or_else(|| CaptureError::render("canvas is empty"))?;
        Ok(())
    }
}

// ============================================================================
// Clipping
// ============================================================================

/// Builds the mask for a clip style; `None` means canvas bounds only.
fn clip_mask(clip: ClipStyle, width: u32, height: u32) -> Result<Option<Mask>, CaptureError> {
    let path = match clip {
        ClipStyle::None => return Ok(None),
        ClipStyle::Circle => {
            let (w, h) = (width as f32, height as f32);
            PathBuilder::from_circle(w / 2.0, h / 2.0, w.min(h) / 2.0)
        }
        ClipStyle::RoundedRect { radius } => rounded_rect(width as f32, height as f32, radius as f32),
    };
    let path = path.ok_or_else(|| CaptureError::render("clip shape is degenerate"))?;

    let mut mask = Mask::new(width, height)
        .ok_or_else(|| CaptureError::render("cannot allocate clip mask"))?;
    mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
    Ok(Some(mask))
}

fn rounded_rect(w: f32, h: f32, radius: f32) -> Option<Path> {
    let r = radius.clamp(0.0, w.min(h) / 2.0);
    if r == 0.0 {
        return Some(PathBuilder::from_rect(Rect::from_xywh(0.0, 0.0, w, h)?));
    }

    let mut pb = PathBuilder::new();
    pb.move_to(r, 0.0);
    pb.line_to(w - r, 0.0);
    pb.quad_to(w, 0.0, w, r);
    pb.line_to(w, h - r);
    pb.quad_to(w, h, w - r, h);
    pb.line_to(r, h);
    pb.quad_to(0.0, h, 0.0, h - r);
    pb.line_to(0.0, r);
    pb.quad_to(0.0, 0.0, r, 0.0);
    pb.close();
    pb.finish()
}

// ============================================================================
// Tests
// ============================================================================
