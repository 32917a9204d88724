//! Configuration management for Universal Reader

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ReaderError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub parsing: ParsingConfig,
    pub storage: StorageConfig,
    pub render: RenderConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page_height: f64,
    pub min_page_width: f64,
    pub margin: f64,
    pub base_font_size: f64,
    pub line_height: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub height: f64,
    pub width: f64,
    pub overscan: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Read size for the streaming text parser
    pub chunk_size_bytes: usize,
    /// Files above this size still parse but carry a performance warning
    pub large_file_warning_bytes: u64,
    /// Line interval between progress reports and scheduler yields
    pub yield_every_lines: usize,
    /// Parse on the background worker thread when available
    pub use_worker: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for persisted annotations; in-memory when unset
    pub annotation_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub background_color: Option<String>,
    /// Font for raster text; text is greeked when unset
    pub font_path: Option<PathBuf>,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of layouts kept per session (keyed by document and width)
    pub max_layouts: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            layout: LayoutConfig::default(),
            viewport: ViewportConfig::default(),
            parsing: ParsingConfig::default(),
            storage: StorageConfig::default(),
            render: RenderConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            page_height: 1200.0,
            min_page_width: 900.0,
            margin: 48.0,
            base_font_size: 16.0,
            line_height: 1.6,
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        ViewportConfig {
            height: 800.0,
            width: 1200.0,
            overscan: 600.0,
        }
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        ParsingConfig {
            chunk_size_bytes: 256 * 1024,
            large_file_warning_bytes: 200 * 1024 * 1024,
            yield_every_lines: 1000,
            use_worker: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            background_color: Some("#ffffff".to_string()),
            font_path: None,
            min_zoom: 0.5,
            max_zoom: 3.0,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { max_layouts: 8 }
    }
}

impl ReaderConfig {
    /// Build a configuration from `UREADER_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ReaderError> {
        let defaults = ReaderConfig::default();

        let config = ReaderConfig {
            layout: LayoutConfig {
                page_height: env_or("UREADER_PAGE_HEIGHT", defaults.layout.page_height)?,
                min_page_width: env_or("UREADER_MIN_PAGE_WIDTH", defaults.layout.min_page_width)?,
                margin: env_or("UREADER_MARGIN", defaults.layout.margin)?,
                base_font_size: env_or("UREADER_BASE_FONT_SIZE", defaults.layout.base_font_size)?,
                line_height: env_or("UREADER_LINE_HEIGHT", defaults.layout.line_height)?,
            },
            viewport: ViewportConfig {
                height: env_or("UREADER_VIEWPORT_HEIGHT", defaults.viewport.height)?,
                width: env_or("UREADER_VIEWPORT_WIDTH", defaults.viewport.width)?,
                overscan: env_or("UREADER_OVERSCAN", defaults.viewport.overscan)?,
            },
            parsing: ParsingConfig {
                chunk_size_bytes: env_or("UREADER_CHUNK_SIZE", defaults.parsing.chunk_size_bytes)?,
                large_file_warning_bytes: env_or(
                    "UREADER_LARGE_FILE_BYTES",
                    defaults.parsing.large_file_warning_bytes,
                )?,
                yield_every_lines: env_or("UREADER_YIELD_LINES", defaults.parsing.yield_every_lines)?,
                use_worker: env_or("UREADER_USE_WORKER", defaults.parsing.use_worker)?,
            },
            storage: StorageConfig {
                annotation_dir: env::var("UREADER_ANNOTATION_DIR").ok().map(PathBuf::from),
            },
            render: RenderConfig {
                background_color: match env::var("UREADER_BACKGROUND") {
                    Ok(value) if value.eq_ignore_ascii_case("none") => None,
                    Ok(value) => Some(value),
                    Err(_) => defaults.render.background_color,
                },
                font_path: env::var("UREADER_FONT").ok().map(PathBuf::from),
                min_zoom: env_or("UREADER_MIN_ZOOM", defaults.render.min_zoom)?,
                max_zoom: env_or("UREADER_MAX_ZOOM", defaults.render.max_zoom)?,
            },
            cache: CacheConfig {
                max_layouts: env_or("UREADER_LAYOUT_CACHE", defaults.cache.max_layouts)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the layout and parsing code cannot work with.
    pub fn validate(&self) -> Result<(), ReaderError> {
        if self.layout.page_height <= 2.0 * self.layout.margin {
            return Err(ReaderError::Config(format!(
                "page height {} must exceed twice the margin {}",
                self.layout.page_height, self.layout.margin
            )));
        }
        if self.layout.base_font_size <= 0.0 || self.layout.line_height <= 0.0 {
            return Err(ReaderError::Config(
                "font size and line height must be positive".to_string(),
            ));
        }
        if self.parsing.chunk_size_bytes == 0 {
            return Err(ReaderError::Config("chunk size must be non-zero".to_string()));
        }
        if self.render.min_zoom <= 0.0 || self.render.min_zoom > self.render.max_zoom {
            return Err(ReaderError::Config(format!(
                "invalid zoom bounds {}..{}",
                self.render.min_zoom, self.render.max_zoom
            )));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ReaderError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ReaderError::Config(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}
