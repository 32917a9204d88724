//! Universal Reader CLI
//!
//! Opens one document, lays it out for a viewport, and reports what a
//! reader would show: format, structure counts, parse warnings, the visible
//! block slice and optional search hits. `--render` paints the viewport to a
//! PNG.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use universal_reader::ast::DocumentAst;
use universal_reader::render::pixmap::load_font;
use universal_reader::render::{PixmapSurface, ViewportPatch, VirtualSlice};
use universal_reader::search::SearchHit;
use universal_reader::{ReaderConfig, ReaderSession};

#[derive(Debug, Parser)]
#[command(name = "ureader", version, about = "Parse, lay out and render a document")]
struct Cli {
    /// Document to open
    file: PathBuf,

    /// Viewport width in CSS pixels
    #[arg(long)]
    width: Option<f64>,

    /// Viewport height in CSS pixels
    #[arg(long)]
    height: Option<f64>,

    /// Scroll offset in document pixels
    #[arg(long, default_value_t = 0.0)]
    scroll: f64,

    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    /// Case-insensitive query to search for
    #[arg(long)]
    search: Option<String>,

    /// Write the visible viewport to this PNG
    #[arg(long, value_name = "PNG")]
    render: Option<PathBuf>,

    /// TrueType/OpenType font used for `--render` text
    #[arg(long, value_name = "TTF")]
    font: Option<PathBuf>,

    /// Parse on the calling task instead of the background worker
    #[arg(long)]
    no_worker: bool,

    /// Print the report, including the full document tree, as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    file: String,
    format: String,
    sections: usize,
    words: u64,
    characters: u64,
    warnings: Vec<String>,
    pages: u32,
    blocks: usize,
    visible: VirtualSlice,
    zoom: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    hits: Option<Vec<SearchHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ast: Option<Arc<DocumentAst>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "universal_reader=info,ureader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = ReaderConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        ReaderConfig::default()
    });
    if cli.no_worker {
        config.parsing.use_worker = false;
    }
    if let Some(width) = cli.width {
        config.viewport.width = width;
    }
    if let Some(height) = cli.height {
        config.viewport.height = height;
    }
    config.validate()?;

    let background = config.render.background_color.clone();
    let font_path = cli.font.clone().or_else(|| config.render.font_path.clone());
    let session = ReaderSession::new(config);
    tracing::debug!(worker = session.has_worker(), "Session ready");

    let ast = session
        .open_path(&cli.file)
        .await
        .with_context(|| format!("opening {}", cli.file.display()))?;

    session.set_viewport(ViewportPatch::scroll_to(cli.scroll)).await;
    let zoom = session.set_zoom(cli.zoom);
    let hits = cli.search.as_deref().map(|query| session.search(query));

    let snapshot = session.snapshot();
    let layout = snapshot.layout.clone().context("document has no layout")?;
    let visible = session.visible_slice().unwrap_or(VirtualSlice {
        start_index: 0,
        end_index: 0,
    });

    if let Some(path) = &cli.render {
        let viewport = snapshot.viewport;
        let mut surface = PixmapSurface::new()
            .with_window(viewport.scroll_top * zoom, viewport.viewport_height * zoom);
        if let Some(font_path) = &font_path {
            surface = surface.with_font(load_font(font_path)?);
        }
        session.render(&mut surface, background.as_deref())?;
        surface
            .save_png(path)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "Viewport rendered");
    }

    let report = Report {
        file: ast.metadata.file_name.clone(),
        format: ast.metadata.format.to_string(),
        sections: ast.sections.len(),
        words: ast.metadata.word_count,
        characters: ast.metadata.character_count,
        warnings: snapshot.parse_warnings,
        pages: layout.page_count,
        blocks: layout.blocks.len(),
        visible,
        zoom,
        hits,
        ast: cli.json.then(|| ast.clone()),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} ({})", report.file, report.format);
    println!("  sections: {}", report.sections);
    println!("  words:    {}", report.words);
    println!("  chars:    {}", report.characters);
    println!("  pages:    {}", report.pages);
    println!(
        "  visible:  blocks {}..{} of {} at zoom {}",
        report.visible.start_index, report.visible.end_index, report.blocks, report.zoom
    );
    for warning in &report.warnings {
        println!("  warning:  {}", warning);
    }
    if let Some(hits) = &report.hits {
        println!("  hits:     {}", hits.len());
        for hit in hits {
            println!("    [page {}] {}", hit.page_index + 1, hit.excerpt);
        }
    }

    Ok(())
}
