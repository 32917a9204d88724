//! Command-recording surface
//!
//! Captures every draw call so a host can replay them onto its own canvas.

use serde::{Deserialize, Serialize};

use crate::annotations::{Point, Rect};

use super::surface::{Color, DrawSurface, Font};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawCommand {
    #[serde(rename_all = "camelCase")]
    Resize {
        css_width: u32,
        css_height: u32,
        pixel_ratio: f64,
    },
    Clear,
    FillRect { rect: Rect, color: Color },
    StrokePath { points: Vec<Point>, width: f64, color: Color },
    FillCircle { center: Point, radius: f64, color: Color },
    FillText { text: String, origin: Point, font: Font, color: Color },
}

#[derive(Debug, Clone)]
pub struct RecordingSurface {
    pixel_ratio: f64,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::with_pixel_ratio(1.0)
    }

    pub fn with_pixel_ratio(pixel_ratio: f64) -> Self {
        Self {
            pixel_ratio,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Text of every `FillText` command, in draw order
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawSurface for RecordingSurface {
    fn device_pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn resize(&mut self, css_width: u32, css_height: u32, pixel_ratio: f64) {
        self.commands.push(DrawCommand::Resize {
            css_width,
            css_height,
            pixel_ratio,
        });
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_path(&mut self, points: &[Point], width: f64, color: Color) {
        self.commands.push(DrawCommand::StrokePath {
            points: points.to_vec(),
            width,
            color,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        self.commands.push(DrawCommand::FillCircle { center, radius, color });
    }

    fn fill_text(&mut self, text: &str, origin: Point, font: Font, color: Color) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            origin,
            font,
            color,
        });
    }
}
