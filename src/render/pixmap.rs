//! Raster surface backed by a `tiny_skia::Pixmap`
//!
//! A full document surface can be tens of thousands of CSS pixels tall, so
//! the pixmap only allocates a window of it (by default the whole surface,
//! capped at [`MAX_BACKED_PIXELS`]). Draw calls are issued in CSS pixels and
//! mapped to the window with a single transform; tiny-skia clips whatever
//! falls outside it.
//!
//! Text is rasterized from glyph outlines when a font is attached with
//! [`PixmapSurface::with_font`]. Without one, each glyph is greeked into a
//! solid bar.

use std::io::Cursor;
use std::path::Path;

use ab_glyph::{Font as _, FontArc, OutlineCurve, PxScale, ScaleFont as _};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, Path as SkiaPath, PathBuilder, Pixmap, Stroke, Transform};

use crate::annotations::{Point, Rect};
use crate::error::{ReaderError, Result};
use crate::layout::GLYPH_WIDTH_FACTOR;

use super::surface::{Color, DrawSurface, Font};

pub const MAX_BACKED_PIXELS: u64 = 64 * 1024 * 1024;

/// Load a TrueType/OpenType font for [`PixmapSurface::with_font`]
pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .map_err(|e| ReaderError::Render(format!("reading font {}: {}", path.display(), e)))?;
    FontArc::try_from_vec(data).map_err(|e| ReaderError::Render(format!("font {}: {}", path.display(), e)))
}

pub struct PixmapSurface {
    /// `None` until the first resize, or when the window could not be allocated
    pixmap: Option<Pixmap>,
    font: Option<FontArc>,
    pixel_ratio: f64,
    css_width: u32,
    css_height: u32,
    /// Requested window `(top, height)` in CSS pixels
    window: Option<(f64, f64)>,
    /// CSS y coordinate of the first backed row
    origin_y: f64,
}

impl Default for PixmapSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PixmapSurface {
    pub fn new() -> Self {
        Self::with_pixel_ratio(1.0)
    }

    pub fn with_pixel_ratio(pixel_ratio: f64) -> Self {
        Self {
            pixmap: None,
            font: None,
            pixel_ratio: pixel_ratio.max(1.0),
            css_width: 0,
            css_height: 0,
            window: None,
            origin_y: 0.0,
        }
    }

    /// Back only `[top, top + height)` of the logical surface
    pub fn with_window(mut self, top: f64, height: f64) -> Self {
        self.window = Some((top.max(0.0), height.max(1.0)));
        self
    }

    /// Rasterize text with `font` instead of greeking it
    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Backing size in device pixels
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixmap.as_ref().map_or((0, 0), |p| (p.width(), p.height()))
    }

    /// Copy of the backed pixels with straight alpha
    pub fn to_image(&self) -> RgbaImage {
        let Some(pixmap) = &self.pixmap else {
            return RgbaImage::new(0, 0);
        };
        RgbaImage::from_fn(pixmap.width(), pixmap.height(), |x, y| {
            pixmap.pixel(x, y).map_or(Rgba([0, 0, 0, 0]), |p| {
                let c = p.demultiply();
                Rgba([c.red(), c.green(), c.blue(), c.alpha()])
            })
        })
    }

    /// Logical surface size in CSS pixels
    pub fn css_size(&self) -> (u32, u32) {
        (self.css_width, self.css_height)
    }

    /// CSS y range `(top, bottom)` currently backed by pixels
    pub fn backed_range(&self) -> (f64, f64) {
        let rows = f64::from(self.dimensions().1) / self.pixel_ratio;
        (self.origin_y, self.origin_y + rows)
    }

    /// Pixel at a CSS position, if that position is backed
    pub fn pixel_at(&self, x: f64, y: f64) -> Option<Rgba<u8>> {
        let pixmap = self.pixmap.as_ref()?;
        let dx = (x * self.pixel_ratio).floor();
        let dy = ((y - self.origin_y) * self.pixel_ratio).floor();
        if dx < 0.0 || dy < 0.0 {
            return None;
        }
        let c = pixmap.pixel(dx as u32, dy as u32)?.demultiply();
        Some(Rgba([c.red(), c.green(), c.blue(), c.alpha()]))
    }

    pub fn encode_png(&self) -> std::result::Result<Vec<u8>, image::ImageError> {
        let mut output = Vec::new();
        DynamicImage::ImageRgba8(self.to_image()).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
        Ok(output)
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> std::result::Result<(), image::ImageError> {
        self.to_image().save_with_format(path, ImageFormat::Png)
    }

    /// CSS pixels to window device pixels
    fn transform(&self) -> Transform {
        let ratio = self.pixel_ratio as f32;
        Transform::from_scale(ratio, ratio).pre_translate(0.0, -self.origin_y as f32)
    }

    fn fill_path(&mut self, path: &SkiaPath, color: Color) {
        let transform = self.transform();
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill_path(path, &paint(color), FillRule::Winding, transform, None);
        }
    }

    fn stroke(&mut self, path: &SkiaPath, width: f64, color: Color) {
        let transform = self.transform();
        let stroke = Stroke {
            width: width as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Default::default()
        };
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.stroke_path(path, &paint(color), &stroke, transform, None);
        }
    }

    fn greek_text(&mut self, text: &str, origin: Point, font: Font, color: Color) {
        let advance = font.size * GLYPH_WIDTH_FACTOR;
        let bar_width = advance * if font.weight >= 600 { 0.9 } else { 0.75 };
        let bar_top = origin.y + font.size * 0.3;
        let bar_height = font.size * 0.5;

        for (index, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let x = origin.x + index as f64 * advance;
            self.fill_rect(Rect::new(x, bar_top, bar_width, bar_height), color);
        }
    }
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

/// Outline of `text` in CSS pixels, one glyph per fixed-pitch cell so the
/// raster lines up with the text layer.
fn text_path(font: &FontArc, text: &str, origin: Point, size: f64) -> Option<SkiaPath> {
    let scaled = font.as_scaled(PxScale::from(size as f32));
    let factor = scaled.scale_factor();
    let cell = (size * GLYPH_WIDTH_FACTOR) as f32;
    let baseline = origin.y as f32 + scaled.ascent();

    let mut builder = PathBuilder::new();
    for (index, ch) in text.chars().enumerate() {
        let id = font.glyph_id(ch);
        let Some(outline) = font.outline(id) else {
            continue;
        };
        let pen_x = origin.x as f32 + index as f32 * cell + (cell - scaled.h_advance(id)).max(0.0) / 2.0;
        let map = |p: ab_glyph::Point| (pen_x + p.x * factor.horizontal, baseline - p.y * factor.vertical);

        let mut last = None;
        for curve in &outline.curves {
            let start = match curve {
                OutlineCurve::Line(p0, _) | OutlineCurve::Quad(p0, _, _) | OutlineCurve::Cubic(p0, _, _, _) => *p0,
            };
            if last != Some(start) {
                if last.is_some() {
                    builder.close();
                }
                let (x, y) = map(start);
                builder.move_to(x, y);
            }
            last = Some(match *curve {
                OutlineCurve::Line(_, p1) => {
                    let (x, y) = map(p1);
                    builder.line_to(x, y);
                    p1
                }
                OutlineCurve::Quad(_, c, p1) => {
                    let ((cx, cy), (x, y)) = (map(c), map(p1));
                    builder.quad_to(cx, cy, x, y);
                    p1
                }
                OutlineCurve::Cubic(_, c0, c1, p1) => {
                    let ((c0x, c0y), (c1x, c1y), (x, y)) = (map(c0), map(c1), map(p1));
                    builder.cubic_to(c0x, c0y, c1x, c1y, x, y);
                    p1
                }
            });
        }
        if last.is_some() {
            builder.close();
        }
    }
    builder.finish()
}

impl DrawSurface for PixmapSurface {
    fn device_pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn resize(&mut self, css_width: u32, css_height: u32, pixel_ratio: f64) {
        self.pixel_ratio = pixel_ratio.max(1.0);
        self.css_width = css_width;
        self.css_height = css_height;

        let full = f64::from(css_height.max(1));
        let (top, height) = match self.window {
            Some((top, height)) => {
                let top = top.min(full - 1.0).max(0.0);
                (top, height.min(full - top))
            }
            None => (0.0, full),
        };

        let width_px = ((f64::from(css_width) * self.pixel_ratio).ceil() as u32).max(1);
        let mut height_px = ((height * self.pixel_ratio).ceil() as u32).max(1);

        let max_rows = (MAX_BACKED_PIXELS / u64::from(width_px)).max(1) as u32;
        if height_px > max_rows {
            tracing::warn!(
                requested_rows = height_px,
                backed_rows = max_rows,
                "Pixmap window capped to pixel limit"
            );
            height_px = max_rows;
        }

        self.origin_y = top;
        self.pixmap = Pixmap::new(width_px, height_px);
        if self.pixmap.is_none() {
            tracing::warn!(width = width_px, height = height_px, "Pixmap allocation failed");
        }
    }

    fn clear(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(tiny_skia::Color::TRANSPARENT);
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let (x, w) = if rect.width < 0.0 { (rect.x + rect.width, -rect.width) } else { (rect.x, rect.width) };
        let (y, h) = if rect.height < 0.0 { (rect.y + rect.height, -rect.height) } else { (rect.y, rect.height) };
        let Some(rect) = tiny_skia::Rect::from_xywh(x as f32, y as f32, w as f32, h as f32) else {
            return;
        };

        let transform = self.transform();
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill_rect(rect, &paint(color), transform, None);
        }
    }

    fn stroke_path(&mut self, points: &[Point], width: f64, color: Color) {
        let [first, rest @ ..] = points else {
            return;
        };
        if rest.is_empty() {
            return;
        }

        let mut builder = PathBuilder::new();
        builder.move_to(first.x as f32, first.y as f32);
        for point in rest {
            builder.line_to(point.x as f32, point.y as f32);
        }
        if let Some(path) = builder.finish() {
            self.stroke(&path, width, color);
        }
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        if let Some(path) = PathBuilder::from_circle(center.x as f32, center.y as f32, radius as f32) {
            self.fill_path(&path, color);
        }
    }

    fn fill_text(&mut self, text: &str, origin: Point, font: Font, color: Color) {
        let Some(face) = self.font.clone() else {
            self.greek_text(text, origin, font, color);
            return;
        };
        let Some(path) = text_path(&face, text, origin, font.size) else {
            return;
        };
        self.fill_path(&path, color);
        if font.weight >= 600 {
            self.stroke(&path, font.size * 0.04, color);
        }
    }
}
