//! Drawing surface abstraction and CSS color parsing

use peniko::color::{parse_color, Srgb};
use serde::{Deserialize, Serialize};

use crate::annotations::{Point, Rect};

/// Straight (non-premultiplied) RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse any CSS color string: hex, `rgb()`/`rgba()`, `hsl()`,
    /// named colors and `transparent`.
    pub fn parse(css: &str) -> Option<Color> {
        let css = css.trim().to_ascii_lowercase();
        let parsed = parse_color(&css).ok()?;
        let rgba = parsed.to_alpha_color::<Srgb>().to_rgba8();
        Some(Color::rgba(rgba.r, rgba.g, rgba.b, rgba.a))
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

/// Font for a text draw call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Font {
    pub size: f64,
    pub weight: u16,
}

/// 2D drawing target in CSS pixels.
///
/// Implementations map CSS pixels to device pixels with the ratio given to
/// [`resize`](DrawSurface::resize). Text origins are the top-left of the
/// line box.
pub trait DrawSurface {
    /// Device pixels per CSS pixel the host would like
    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }

    /// Size the surface to `css_width × css_height` at `pixel_ratio`
    fn resize(&mut self, css_width: u32, css_height: u32, pixel_ratio: f64);

    /// Reset every pixel to transparent
    fn clear(&mut self);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Connected line segments through `points`, round caps and joins
    fn stroke_path(&mut self, points: &[Point], width: f64, color: Color);

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color);

    fn fill_text(&mut self, text: &str, origin: Point, font: Font, color: Color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_css_colors() {
        assert_eq!(Color::parse("#0f172a"), Some(Color::rgb(0x0f, 0x17, 0x2a)));
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("rgb(1, 2, 3)"), Some(Color::rgb(1, 2, 3)));
        assert_eq!(
            Color::parse("rgba(251,191,36,0.36)"),
            Some(Color::rgba(251, 191, 36, 92))
        );
        assert_eq!(Color::parse("Transparent"), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_parse_other_css_forms() {
        assert_eq!(Color::parse("hsl(0, 0%, 0%)"), Some(Color::BLACK));
        assert_eq!(Color::parse("RebeccaPurple"), Some(Color::rgb(102, 51, 153)));
        assert_eq!(Color::parse("  #FFFFFF  "), Some(Color::WHITE));
    }

    #[test]
    fn test_reject_malformed_colors() {
        assert_eq!(Color::parse(""), None);
        assert_eq!(Color::parse("#12"), None);
        assert_eq!(Color::parse("#gggggg"), None);
        assert_eq!(Color::parse("rgb(1,2)"), None);
        assert_eq!(Color::parse("not-a-color"), None);
    }

    #[test]
    fn test_skia_conversion_keeps_channels() {
        let skia = Color::rgba(251, 191, 36, 92).to_skia().to_color_u8();
        assert_eq!(
            (skia.red(), skia.green(), skia.blue(), skia.alpha()),
            (251, 191, 36, 92)
        );
    }
}
