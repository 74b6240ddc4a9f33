//! Pixel-level helpers shared by the editor layers.
//!
//! Conversions between `image` buffers and `tiny_skia` pixmaps, SVG
//! rasterization, contain-fitting and transformed drawing.

use image::{Rgba, RgbaImage};
use kurbo::Affine;
use resvg::tiny_skia::{ColorU8, FilterQuality, Mask, Pixmap, PixmapPaint, Transform};
use resvg::usvg::{Options, Tree};

// ============================================================================
// SVG Rendering
// ============================================================================

/// Renders an SVG string to an RGBA image at the specified size.
///
/// The SVG is scaled to fit within `size x size` pixels while preserving
/// aspect ratio (the larger dimension will be `size`).
///
/// Returns `None` if the SVG cannot be parsed or rendered.
pub fn render_svg(svg_data: &str, size: u32) -> Option<RgbaImage> {
    let opts = Options::default();
    let tree = Tree::from_str(svg_data, &opts).ok()?;

    let svg_size = tree.size();
    let scale = (size as f32) / svg_size.width().max(svg_size.height());
    let width = (svg_size.width() * scale).ceil() as u32;
    let height = (svg_size.height() * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(width, height)?;
    let transform = Transform::from_scale(scale, scale);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Some(pixmap_to_rgba_image(&pixmap))
}

// ============================================================================
// Pixmap <-> RgbaImage
// ============================================================================

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
pub fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let mut img = RgbaImage::new(width, pixmap.height());

    // tiny_skia stores premultiplied alpha
    for (i, pixel) in pixmap.pixels().iter().enumerate() {
        let c = pixel.demultiply();
        let x = i as u32 % width;
        let y = i as u32 / width;
        img.put_pixel(x, y, Rgba([c.red(), c.green(), c.blue(), c.alpha()]));
    }

    img
}

/// Converts an image::RgbaImage to a premultiplied tiny_skia Pixmap.
///
/// Returns `None` for zero-sized images.
pub fn rgba_image_to_pixmap(img: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(img.width(), img.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Converts a kurbo affine into the equivalent tiny_skia transform.
pub fn to_skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

// ============================================================================
// Fitting
// ============================================================================

/// Scale factor that fits `content` inside `container` without cropping.
pub fn contain_scale(content: (f64, f64), container: (f64, f64)) -> f64 {
    if content.0 <= 0.0 || content.1 <= 0.0 {
        return 0.0;
    }
    (container.0 / content.0).min(container.1 / content.1)
}

// ============================================================================
// Drawing
// ============================================================================

/// Draws `src` onto `dest` through `transform` with bilinear sampling,
/// source-over, optionally restricted to `mask`.
///
/// Returns `None` if either image is empty.
pub fn draw_transformed(
    dest: &mut RgbaImage,
    src: &RgbaImage,
    transform: Affine,
    mask: Option<&Mask>,
) -> Option<()> {
    let src = rgba_image_to_pixmap(src)?;
    let mut canvas = rgba_image_to_pixmap(dest)?;

    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    canvas.draw_pixmap(0, 0, src.as_ref(), &paint, to_skia_transform(transform), mask);

    *dest = pixmap_to_rgba_image(&canvas);
    Some(())
}

// ============================================================================
// Tests
// ============================================================================
