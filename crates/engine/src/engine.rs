//! Annotation engine
//!
//! Owns the store, the raster surface and the interactive shape layer of one
//! open document and routes pointer input between them:
//!
//! - ink tools (pencil, eraser, highlight) drive the stroke rasterizer; on
//!   release the stroke is simplified, normalized and persisted
//! - every other tool drives the shape layer, whose changes are applied to
//!   the store
//!
//! Page switches and surface resizes re-render the ink from the store.

use crate::input::{PointerEvent, PointerPhase};
use image::RgbaImage;
use pdf_annotator_core::coords::normalize_point;
use pdf_annotator_core::geometry::simplify_path;
use pdf_annotator_core::persistence::load_snapshot;
use pdf_annotator_core::{
    AnnotationSink, AnnotationSnapshot, AnnotationStore, AnnotatorResult, DocumentKey, EditRequest,
    EditResult, EngineConfig, JsonSidecarSink, LayerResponse, ShapeChange, ShapeLayer, StampCatalog,
    StrokePath, StrokeTool, Tool, ToolContext, ToolSettings,
};
use pdf_annotator_render::{PageCompositor, RasterSurface, StrokeRasterizer, StrokeStyle};
use std::path::Path;

pub struct AnnotationEngine {
    config: EngineConfig,
    settings: ToolSettings,
    catalog: StampCatalog,
    store: AnnotationStore,
    rasterizer: StrokeRasterizer,
    layer: ShapeLayer,
    surface: RasterSurface,
    compositor: PageCompositor,
}

impl AnnotationEngine {
    /// Create an engine drawing onto a surface of the given size
    ///
    /// Fails only when the configuration is invalid or the surface cannot be
    /// allocated.
    pub fn new(config: EngineConfig, width: u32, height: u32) -> AnnotatorResult<Self> {
        config.validate()?;
        let surface = RasterSurface::new(width, height)?;
        let mut layer = ShapeLayer::new();
        layer.load_page(1, &[], surface.size());

        Ok(Self {
            store: AnnotationStore::with_history_cap(config.history_cap),
            rasterizer: StrokeRasterizer::new(&config),
            compositor: PageCompositor::new(&config),
            settings: ToolSettings::default(),
            catalog: StampCatalog::default(),
            layer,
            surface,
            config,
        })
    }

    pub fn with_catalog(mut self, catalog: StampCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &StampCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn layer(&self) -> &ShapeLayer {
        &self.layer
    }

    /// Raster surface holding the rendered ink of the current page
    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn current_page(&self) -> u32 {
        self.store.current_page()
    }

    pub fn is_drawing(&self) -> bool {
        self.rasterizer.is_drawing()
    }

    /// Replace the tool and style options
    ///
    /// A stroke in progress is finished with the style it started with, and
    /// switching to an ink tool drops the shape selection.
    pub fn set_settings(&mut self, settings: ToolSettings) {
        if settings.tool != self.settings.tool {
            self.finish_stroke();
            self.layer.cancel_interaction();
            if settings.tool.stroke_tool().is_some() {
                self.layer.deselect();
            }
        }
        self.settings = settings;
    }

    pub fn set_tool(&mut self, tool: Tool) {
        let settings = self.settings.clone().with_tool(tool);
        self.set_settings(settings);
    }

    /// Install the persistence hook
    pub fn set_sink(&mut self, sink: Box<dyn AnnotationSink>) {
        self.store.set_sink(sink);
    }

    /// Feed one pointer sample
    ///
    /// Returns an edit request when the host should open a text input.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<EditRequest> {
        let ink_tool = self.settings.tool.stroke_tool().is_some();
        if ink_tool || self.rasterizer.is_drawing() {
            self.handle_ink(event);
            return None;
        }

        let ctx = ToolContext {
            config: &self.config,
            settings: &self.settings,
            catalog: &self.catalog,
            page_number: self.store.current_page(),
            surface: self.surface.size(),
        };
        let response = match event.phase {
            PointerPhase::Down => self.layer.pointer_down(&ctx, event.x, event.y),
            PointerPhase::Move => {
                self.layer.pointer_move(&ctx, event.x, event.y);
                LayerResponse::default()
            }
            PointerPhase::Up => self.layer.pointer_up(&ctx, event.x, event.y),
            PointerPhase::Cancel => {
                self.layer.cancel_interaction();
                LayerResponse::default()
            }
            PointerPhase::DoubleClick => self.layer.double_click(&ctx, event.x, event.y),
        };
        self.apply_layer_response(response)
    }

    fn handle_ink(&mut self, event: PointerEvent) {
        match event.phase {
            PointerPhase::Down => {
                let Some(style) = StrokeStyle::from_settings(&self.settings) else {
                    return;
                };
                self.rasterizer.start_drawing(&mut self.surface, event.point(), style);
            }
            PointerPhase::Move => {
                self.rasterizer.continue_drawing(&mut self.surface, event.point());
            }
            PointerPhase::Up | PointerPhase::Cancel => {
                let point = event.point();
                let moved = self
                    .rasterizer
                    .current_points()
                    .last()
                    .is_some_and(|last| (last.x, last.y) != (point.x, point.y));
                if moved {
                    self.rasterizer.continue_drawing(&mut self.surface, point);
                }
                self.finish_stroke();
            }
            PointerPhase::DoubleClick => {}
        }
    }

    /// End the stroke in progress, if any, and persist it
    fn finish_stroke(&mut self) {
        let Some(style) = self.rasterizer.current_style() else {
            return;
        };
        let points = self.rasterizer.end_drawing(&mut self.surface);
        let page = self.store.current_page();

        if points.len() < StrokePath::MIN_POINTS {
            log::debug!("discarding {:?} stroke with {} point(s)", style.tool, points.len());
            self.render_current_page();
            return;
        }

        let size = self.surface.size();
        let simplified = simplify_path(&points, self.config.simplify_tolerance);

        match style.tool {
            StrokeTool::Eraser => {
                let eraser = StrokePath::new(StrokeTool::Eraser, style.color, style.line_width, page, simplified);
                let tolerance = style.line_width * self.config.eraser_width_factor / 2.0;
                if !self.store.erase(page, &eraser, tolerance, size) {
                    log::debug!("eraser on page {page} touched no ink");
                }
            }
            tool => {
                let normalized = simplified.into_iter().map(|point| normalize_point(point, size)).collect();
                let mut path = StrokePath::new(tool, style.color, style.line_width, page, normalized);
                if tool == StrokeTool::Highlight {
                    let opacity = style.opacity.unwrap_or(self.config.highlight_alpha);
                    path = path.with_highlight(style.color, opacity);
                }
                self.store.add_path(page, path);
            }
        }

        self.render_current_page();
    }

    fn apply_layer_response(&mut self, response: LayerResponse) -> Option<EditRequest> {
        for change in response.changes {
            match change {
                ShapeChange::Created(shape) => self.store.add_shape(shape.page_number, shape),
                ShapeChange::Updated(shape) => {
                    self.store.update_shape(shape.page_number, shape);
                }
                ShapeChange::Deleted { page_number, id } => {
                    self.store.delete_shape(page_number, id);
                }
            }
        }
        response.edit_request
    }

    /// Answer the open edit request
    pub fn finish_edit(&mut self, result: EditResult) {
        let response = self.layer.finish_edit(result);
        self.apply_layer_response(response);
    }

    pub fn delete_selected(&mut self) -> bool {
        let response = self.layer.delete_selected();
        let deleted = !response.changes.is_empty();
        self.apply_layer_response(response);
        deleted
    }

    /// Undo the last ink change; false when there is nothing to undo
    pub fn undo(&mut self) -> bool {
        self.finish_stroke();
        match self.store.undo() {
            Some(page) => {
                self.rerender_if_current(page);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.finish_stroke();
        match self.store.redo() {
            Some(page) => {
                self.rerender_if_current(page);
                true
            }
            None => false,
        }
    }

    /// Remove all ink from the current page (undoable)
    pub fn clear_page(&mut self) -> bool {
        self.finish_stroke();
        let cleared = self.store.clear_page_paths(self.store.current_page());
        if cleared {
            self.render_current_page();
        }
        cleared
    }

    /// Navigate to another page
    ///
    /// A stroke in progress is committed to the page it was drawn on and an
    /// open text edit is cancelled.
    pub fn set_page(&mut self, page: u32) {
        self.finish_stroke();
        self.close_interactions();
        self.store.set_current_page(page);
        self.reload_page();
    }

    /// Adopt a new surface size after a zoom or re-render
    pub fn resize_surface(&mut self, width: u32, height: u32) -> AnnotatorResult<()> {
        self.finish_stroke();
        self.surface.resize(width, height)?;
        self.layer.set_surface(self.surface.size());
        self.render_current_page();
        Ok(())
    }

    /// Replace all annotations, e.g. after loading a document
    pub fn restore(&mut self, snapshot: AnnotationSnapshot) {
        self.finish_stroke();
        self.close_interactions();
        self.store.restore(snapshot);
        self.store.set_current_page(1);
        self.reload_page();
    }

    /// Load a document's saved annotations from `dir` and persist further
    /// changes there
    ///
    /// Returns true when a saved snapshot was found.
    pub fn open_document(&mut self, dir: &Path, key: DocumentKey) -> AnnotatorResult<bool> {
        let snapshot = load_snapshot(dir, &key)?;
        let found = snapshot.is_some();
        log::info!("opening {} ({} saved annotations)", key.storage_key(), if found { "with" } else { "no" });

        self.store.clear_sink();
        self.restore(snapshot.unwrap_or_default());
        self.store.set_sink(Box::new(JsonSidecarSink::new(dir, key)));
        Ok(found)
    }

    /// Flatten a page over its rendered base image
    pub fn export_page(&self, page: u32, base: &RgbaImage) -> AnnotatorResult<RgbaImage> {
        self.compositor.compose_page(
            base,
            &self.store.paths_for_page(page),
            &self.store.shapes_for_page(page),
            &self.catalog,
        )
    }

    /// Paint the current page's shapes, including any shape being drawn,
    /// onto `target`
    pub fn paint_shapes(&self, target: &mut RasterSurface) {
        let painter = self.compositor.painter();
        for shape in self.layer.objects().iter().chain(self.layer.preview()) {
            painter.paint(target, shape, &self.catalog);
        }
    }

    fn close_interactions(&mut self) {
        if self.layer.is_editing() {
            self.finish_edit(EditResult::Cancel);
        }
        self.layer.cancel_interaction();
    }

    fn reload_page(&mut self) {
        let page = self.store.current_page();
        self.layer.load_page(page, &self.store.shapes_for_page(page), self.surface.size());
        self.render_current_page();
    }

    fn rerender_if_current(&mut self, page: u32) {
        if page == self.store.current_page() {
            self.render_current_page();
        }
    }

    fn render_current_page(&mut self) {
        let paths = self.store.current_page_paths();
        self.rasterizer.render_paths(&mut self.surface, &paths, None);
    }
}
