//! Reader session
//!
//! A [`ReaderSession`] owns everything one open reader needs: the parse
//! worker, annotation storage, a layout cache and the reader state.
//!
//! # Consistency
//!
//! - `open_file` commits the AST, layout, annotations and warnings in one
//!   write, and only if it is still the newest open request. A failed or
//!   superseded open leaves the previous document untouched.
//! - Layout rebuilds take a generation ticket; only the newest rebuild for
//!   the current document is committed.
//! - State locks are never held across an await.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use uuid::Uuid;

use crate::annotations::{
    apply_pointer_tool, Annotation, AnnotationStorage, AnnotationTool, FileStore, GestureRecorder,
    MemoryStore, Point,
};
use crate::ast::{DocumentAst, DocumentFormat};
use crate::config::ReaderConfig;
use crate::delegate::{ensure_page, DelegateError, DelegatedDocument, ExternalRenderer};
use crate::error::{ReaderError, Result};
use crate::layout::{build_layout_incremental, LayoutBlock, LayoutDocument, LayoutGeneration, LayoutOptions};
use crate::parsers::{detect_format, route_for, ParseContext, ParseOptions, ParsePhase, Route, SourceFile};
use crate::pipeline::{parse_document, ParseWorker};
use crate::render::{
    build_text_layer, compute_virtual_slice, render_document, visible_blocks, DrawSurface, RenderOptions,
    RenderParams, TextLayerSpan, ViewportPatch, ViewportState, VirtualSlice,
};
use crate::search::{search_ast, search_layout_blocks, SearchHit};

const PREPARING_MESSAGE: &str = "Preparing parser...";
const DONE_MESSAGE: &str = "Done";
const FAILED_MESSAGE: &str = "Failed to parse document";

/// Observable reader state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderSnapshot {
    pub ast: Option<Arc<DocumentAst>>,
    pub layout: Option<Arc<LayoutDocument>>,
    pub format: Option<DocumentFormat>,
    /// Set when the open document is rendered externally
    pub delegated: Option<DelegatedDocument>,
    pub annotations: Vec<Annotation>,
    pub loading: bool,
    pub parse_progress: u8,
    pub parse_message: String,
    pub parse_warnings: Vec<String>,
    pub active_tool: AnnotationTool,
    pub zoom: f64,
    pub viewport: ViewportState,
    pub search_query: String,
    pub search_results: Vec<SearchHit>,
}

impl ReaderSnapshot {
    fn new(viewport: ViewportState) -> Self {
        Self {
            ast: None,
            layout: None,
            format: None,
            delegated: None,
            annotations: Vec::new(),
            loading: false,
            parse_progress: 0,
            parse_message: String::new(),
            parse_warnings: Vec::new(),
            active_tool: AnnotationTool::default(),
            zoom: 1.0,
            viewport,
            search_query: String::new(),
            search_results: Vec::new(),
        }
    }

    fn document_id(&self) -> Option<&str> {
        self.ast.as_ref().map(|ast| ast.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LayoutCacheKey {
    document_id: String,
    viewport_width: u64,
}

impl LayoutCacheKey {
    fn new(document_id: &str, viewport_width: f64) -> Self {
        Self {
            document_id: document_id.to_string(),
            viewport_width: viewport_width.to_bits(),
        }
    }
}

pub struct ReaderSession {
    config: ReaderConfig,
    worker: Option<ParseWorker>,
    storage: AnnotationStorage,
    state: Arc<RwLock<ReaderSnapshot>>,
    current_request: Arc<Mutex<Option<String>>>,
    layout_cache: Mutex<LruCache<LayoutCacheKey, Arc<LayoutDocument>>>,
    layout_generation: LayoutGeneration,
    open_counter: AtomicU64,
}

impl ReaderSession {
    /// Session with storage chosen by `config.storage`: a directory-backed
    /// store when `annotation_dir` is set, in-memory otherwise.
    pub fn new(config: ReaderConfig) -> Self {
        let storage = match &config.storage.annotation_dir {
            Some(dir) => AnnotationStorage::new(Arc::new(FileStore::new(dir.clone()))),
            None => AnnotationStorage::new(Arc::new(MemoryStore::new())),
        };
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: ReaderConfig, storage: AnnotationStorage) -> Self {
        let worker = if config.parsing.use_worker {
            match ParseWorker::spawn(ParseOptions::from(config.parsing.clone())) {
                Ok(worker) => Some(worker),
                Err(err) => {
                    tracing::warn!(error = %err, "Parse worker unavailable, parsing on calling task");
                    None
                }
            }
        } else {
            None
        };

        let capacity = NonZeroUsize::new(config.cache.max_layouts).unwrap_or(NonZeroUsize::MIN);
        let viewport = ViewportState::from_config(&config.viewport);

        Self {
            worker,
            storage,
            state: Arc::new(RwLock::new(ReaderSnapshot::new(viewport))),
            current_request: Arc::new(Mutex::new(None)),
            layout_cache: Mutex::new(LruCache::new(capacity)),
            layout_generation: LayoutGeneration::default(),
            open_counter: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn has_worker(&self) -> bool {
        self.worker.as_ref().is_some_and(ParseWorker::is_running)
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        self.state.read().clone()
    }

    pub fn document(&self) -> Option<Arc<DocumentAst>> {
        self.state.read().ast.clone()
    }

    pub fn layout(&self) -> Option<Arc<LayoutDocument>> {
        self.state.read().layout.clone()
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.state.read().annotations.clone()
    }

    fn next_request_id(&self) -> String {
        self.issue_request().1
    }

    fn issue_request(&self) -> (u64, String) {
        let sequence = self.open_counter.fetch_add(1, Ordering::SeqCst) + 1;
        (sequence, format!("parse-{}-{}", sequence, &Uuid::new_v4().simple().to_string()[..8]))
    }

    fn is_current(&self, request_id: &str) -> bool {
        self.current_request.lock().as_deref() == Some(request_id)
    }

    fn progress_context(&self, request_id: &str) -> ParseContext {
        let state = self.state.clone();
        let current = self.current_request.clone();
        let request_id = request_id.to_string();

        ParseContext::new(ParseOptions::from(self.config.parsing.clone())).with_progress(move |progress| {
            if current.lock().as_deref() != Some(request_id.as_str()) {
                return;
            }
            let mut state = state.write();
            state.parse_progress = progress.progress;
            state.parse_message = progress.message.unwrap_or_else(|| {
                match progress.phase {
                    ParsePhase::Parsing => "parsing",
                    ParsePhase::Normalizing => "normalizing",
                }
                .to_string()
            });
        })
    }

    fn layout_options(&self, viewport_width: f64) -> LayoutOptions {
        LayoutOptions::from_config(&self.config.layout, viewport_width)
    }

    async fn layout_for(&self, ast: &Arc<DocumentAst>, viewport_width: f64) -> Arc<LayoutDocument> {
        let key = LayoutCacheKey::new(&ast.id, viewport_width);
        if let Some(layout) = self.layout_cache.lock().get(&key).cloned() {
            tracing::trace!(document_id = %ast.id, viewport_width, "Layout cache hit");
            return layout;
        }

        let layout = Arc::new(build_layout_incremental(ast.clone(), self.layout_options(viewport_width)).await);
        self.layout_cache.lock().put(key, layout.clone());
        layout
    }

    /// Parse `file`, lay it out and load its annotations, then commit all
    /// of it at once.
    pub async fn open_file(&self, file: SourceFile) -> Result<Arc<DocumentAst>> {
        let request_id = self.next_request_id();
        *self.current_request.lock() = Some(request_id.clone());

        {
            let mut state = self.state.write();
            state.loading = true;
            state.parse_progress = 0;
            state.parse_message = PREPARING_MESSAGE.to_string();
            state.parse_warnings.clear();
        }

        tracing::info!(request_id = %request_id, file = %file.name, size = file.size, "Opening document");

        let context = self.progress_context(&request_id);
        let parsed = match parse_document(self.worker.as_ref(), &request_id, &file, &context).await {
            Ok(parsed) => parsed,
            Err(err) => {
                if !self.is_current(&request_id) {
                    return Err(ReaderError::Superseded(request_id));
                }
                tracing::warn!(request_id = %request_id, file = %file.name, error = %err, "Document failed to parse");
                let mut state = self.state.write();
                state.loading = false;
                state.parse_message = FAILED_MESSAGE.to_string();
                state.parse_warnings = vec![err.to_string()];
                return Err(err.into());
            }
        };

        if !self.is_current(&request_id) {
            tracing::debug!(request_id = %request_id, "Discarding superseded parse result");
            return Err(ReaderError::Superseded(request_id));
        }

        let ast = Arc::new(parsed.ast);
        let viewport_width = self.state.read().viewport.viewport_width;
        let layout = self.layout_for(&ast, viewport_width).await;
        let annotations = self.storage.load_annotations(&ast.id).await;

        let width_changed = {
            let mut state = self.state.write();
            if !self.is_current(&request_id) {
                return Err(ReaderError::Superseded(request_id));
            }
            self.layout_generation.next();

            state.format = Some(ast.metadata.format);
            state.ast = Some(ast.clone());
            state.layout = Some(layout);
            state.delegated = None;
            state.annotations = annotations;
            state.loading = false;
            state.parse_progress = 100;
            state.parse_message = DONE_MESSAGE.to_string();
            state.parse_warnings = parsed.warnings;
            state.search_results.clear();
            state.viewport.viewport_width != viewport_width
        };

        tracing::info!(
            request_id = %request_id,
            document_id = %ast.id,
            format = %ast.metadata.format,
            words = ast.metadata.word_count,
            "Document opened"
        );

        if width_changed {
            self.refresh_layout().await;
        }

        Ok(ast)
    }

    /// Read `path` from disk and open it
    pub async fn open_path(&self, path: impl AsRef<std::path::Path>) -> Result<Arc<DocumentAst>> {
        let file = SourceFile::from_path(path).await?;
        self.open_file(file).await
    }

    /// Open a document that an external renderer displays. The AST, layout
    /// and annotations are cleared; search and annotation are unavailable
    /// until a parsed document is opened.
    pub async fn open_delegated(
        &self,
        file: &SourceFile,
        renderer: &dyn ExternalRenderer,
    ) -> Result<DelegatedDocument> {
        let format = detect_format(file);
        if route_for(format) != Route::Delegated {
            return Err(DelegateError::Open(format!("{} documents are parsed, not delegated", format)).into());
        }

        // Claimed only at commit, so a failing renderer leaves the session alone
        let (sequence, request_id) = self.issue_request();

        let queried = async { Ok::<_, DelegateError>((renderer.page_count().await?, renderer.outline().await?)) };
        let (page_count, outline) = match queried.await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(request_id = %request_id, file = %file.name, error = %err, "Delegated renderer failed to open document");
                return Err(err.into());
            }
        };

        let document = DelegatedDocument {
            file_name: file.name.clone(),
            format,
            page_count,
            outline,
        };

        {
            let mut state = self.state.write();
            if self.open_counter.load(Ordering::SeqCst) != sequence {
                return Err(ReaderError::Superseded(request_id));
            }
            *self.current_request.lock() = Some(request_id.clone());
            self.layout_generation.next();

            state.ast = None;
            state.layout = None;
            state.format = Some(format);
            state.delegated = Some(document.clone());
            state.annotations.clear();
            state.loading = false;
            state.parse_progress = 100;
            state.parse_message = DONE_MESSAGE.to_string();
            state.parse_warnings.clear();
            state.search_results.clear();
        }

        tracing::info!(file = %file.name, format = %format, pages = page_count, "Delegated document opened");
        Ok(document)
    }

    /// Rasterize one page of the open delegated document
    pub async fn render_delegated_page(
        &self,
        renderer: &dyn ExternalRenderer,
        index: usize,
        scale: f32,
    ) -> Result<image::RgbaImage> {
        let page_count = self
            .state
            .read()
            .delegated
            .as_ref()
            .map(|document| document.page_count)
            .ok_or(ReaderError::NoDocument)?;
        ensure_page(index, page_count)?;
        Ok(renderer.render_page(index, scale).await?)
    }

    /// Merge a viewport patch; the layout is rebuilt only if the width changed
    pub async fn set_viewport(&self, patch: ViewportPatch) {
        let width_changed = self.state.write().viewport.apply(&patch);
        if width_changed {
            self.refresh_layout().await;
        }
    }

    async fn refresh_layout(&self) {
        let (ast, viewport_width) = {
            let state = self.state.read();
            match &state.ast {
                Some(ast) => (ast.clone(), state.viewport.viewport_width),
                None => return,
            }
        };

        let ticket = self.layout_generation.next();
        let layout = self.layout_for(&ast, viewport_width).await;

        let mut state = self.state.write();
        if !self.layout_generation.is_current(ticket) || state.document_id() != Some(ast.id.as_str()) {
            tracing::debug!(document_id = %ast.id, viewport_width, "Dropping stale layout rebuild");
            return;
        }

        if !state.search_query.trim().is_empty() {
            let results = search_layout_blocks(&layout.blocks, &state.search_query);
            state.search_results = results;
        }
        state.layout = Some(layout);
    }

    /// Clamp `zoom` to the configured bounds and apply it
    pub fn set_zoom(&self, zoom: f64) -> f64 {
        let mut state = self.state.write();
        if zoom.is_finite() {
            state.zoom = zoom.clamp(self.config.render.min_zoom, self.config.render.max_zoom);
        }
        state.zoom
    }

    pub fn set_tool(&self, tool: AnnotationTool) {
        self.state.write().active_tool = tool;
    }

    async fn persist(&self, document_id: &str, annotations: &[Annotation]) {
        self.storage.save_annotations(document_id, annotations).await;
    }

    /// Append `annotation` to the open document and persist the list
    pub async fn add_annotation(&self, annotation: Annotation) -> Result<()> {
        let (document_id, list) = {
            let mut state = self.state.write();
            let document_id = state.document_id().ok_or(ReaderError::NoDocument)?.to_string();
            state.annotations.push(annotation);
            (document_id, state.annotations.clone())
        };
        self.persist(&document_id, &list).await;
        Ok(())
    }

    /// Undo the most recent annotation
    pub async fn remove_last_annotation(&self) -> Result<Option<Annotation>> {
        let (document_id, removed, list) = {
            let mut state = self.state.write();
            let document_id = state.document_id().ok_or(ReaderError::NoDocument)?.to_string();
            let removed = state.annotations.pop();
            (document_id, removed, state.annotations.clone())
        };
        self.persist(&document_id, &list).await;
        Ok(removed)
    }

    pub async fn clear_annotations(&self) -> Result<()> {
        let document_id = {
            let mut state = self.state.write();
            let document_id = state.document_id().ok_or(ReaderError::NoDocument)?.to_string();
            state.annotations.clear();
            document_id
        };
        self.persist(&document_id, &[]).await;
        Ok(())
    }

    /// Replay a pointer path (surface coordinates) through the active tool.
    /// Returns the annotation when the gesture produced one.
    pub async fn pointer_gesture(&self, points: &[Point], comment_text: Option<&str>) -> Result<Option<Annotation>> {
        let (document_id, tool, zoom) = {
            let state = self.state.read();
            let document_id = state.document_id().ok_or(ReaderError::NoDocument)?.to_string();
            (document_id, state.active_tool, state.zoom)
        };

        let mut recorder = GestureRecorder::new(tool, zoom, self.config.layout.page_height);
        let Some((first, rest)) = points.split_first() else {
            return Ok(None);
        };
        recorder.pointer_down(*first);
        for point in rest {
            recorder.pointer_move(*point);
        }

        let Some(annotation) = recorder.pointer_up(&document_id, comment_text) else {
            return Ok(None);
        };
        self.add_annotation(annotation.clone()).await?;
        Ok(Some(annotation))
    }

    /// Create an annotation from document-space points without zoom or
    /// page derivation
    pub async fn apply_tool(
        &self,
        page_index: u32,
        points: &[Point],
        comment_text: Option<&str>,
    ) -> Result<Option<Annotation>> {
        let (document_id, tool) = {
            let state = self.state.read();
            let document_id = state.document_id().ok_or(ReaderError::NoDocument)?.to_string();
            (document_id, state.active_tool)
        };
        let Some(annotation) = apply_pointer_tool(tool, &document_id, page_index, points, comment_text) else {
            return Ok(None);
        };
        self.add_annotation(annotation.clone()).await?;
        Ok(Some(annotation))
    }

    /// Search the layout when present, the AST otherwise
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let mut state = self.state.write();
        state.search_query = query.to_string();

        let results = match (&state.layout, &state.ast) {
            (Some(layout), _) => search_layout_blocks(&layout.blocks, query),
            (None, Some(ast)) => search_ast(ast, query),
            (None, None) => Vec::new(),
        };

        state.search_results = results.clone();
        results
    }

    pub fn visible_slice(&self) -> Option<VirtualSlice> {
        let state = self.state.read();
        state
            .layout
            .as_ref()
            .map(|layout| compute_virtual_slice(layout, &state.viewport))
    }

    pub fn visible_blocks(&self) -> Vec<LayoutBlock> {
        let state = self.state.read();
        state
            .layout
            .as_ref()
            .map(|layout| visible_blocks(layout, &state.viewport).to_vec())
            .unwrap_or_default()
    }

    /// Paint the visible slice and all annotations onto `surface`
    pub fn render(&self, surface: &mut dyn DrawSurface, background: Option<&str>) -> Result<()> {
        let state = self.state.read();
        let layout = state.layout.as_ref().ok_or(ReaderError::NoDocument)?;

        render_document(
            surface,
            &RenderParams {
                visible_blocks: visible_blocks(layout, &state.viewport),
                annotations: &state.annotations,
                total_height: layout.total_height,
                width: state.viewport.viewport_width,
                options: RenderOptions {
                    zoom: state.zoom,
                    background_color: background.map(str::to_string),
                },
            },
        );
        Ok(())
    }

    pub fn text_layer(&self) -> Vec<TextLayerSpan> {
        let state = self.state.read();
        match &state.layout {
            Some(layout) => build_text_layer(visible_blocks(layout, &state.viewport), state.zoom),
            None => Vec::new(),
        }
    }
}
