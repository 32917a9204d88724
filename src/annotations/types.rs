//! Annotation types
//!
//! Annotations serialize as one flat JSON object per record: the shared
//! fields plus the variant's fields, discriminated by `type`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document-space point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Scale every coordinate by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.width * factor, self.height * factor)
    }
}

/// Active pointer tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationTool {
    #[default]
    Highlight,
    Pen,
    Comment,
}

impl AnnotationTool {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationTool::Highlight => "highlight",
            AnnotationTool::Pen => "pen",
            AnnotationTool::Comment => "comment",
        }
    }
}

impl std::str::FromStr for AnnotationTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "highlight" => Ok(AnnotationTool::Highlight),
            "pen" => Ok(AnnotationTool::Pen),
            "comment" => Ok(AnnotationTool::Comment),
            other => Err(format!("unknown annotation tool: {}", other)),
        }
    }
}

/// A user annotation scoped to one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// `anno-<kind>-<uuid>`
    pub id: String,
    pub document_id: String,
    pub page_index: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(flatten)]
    pub body: AnnotationBody,
}

/// Variant-specific annotation content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnnotationBody {
    #[serde(rename_all = "camelCase")]
    Highlight {
        color: String,
        rects: Vec<Rect>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_ref_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Pen {
        color: String,
        stroke_width: f64,
        points: Vec<Point>,
    },
    #[serde(rename_all = "camelCase")]
    Comment {
        text: String,
        position: Point,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_ref_id: Option<String>,
    },
}

impl Annotation {
    pub fn tool(&self) -> AnnotationTool {
        match self.body {
            AnnotationBody::Highlight { .. } => AnnotationTool::Highlight,
            AnnotationBody::Pen { .. } => AnnotationTool::Pen,
            AnnotationBody::Comment { .. } => AnnotationTool::Comment,
        }
    }

    /// Replace the content, keeping identity and creation time
    pub fn update_body(&mut self, body: AnnotationBody) {
        self.body = body;
        self.updated_at = Utc::now();
    }
}
