//! Page export compositor
//!
//! Flattens a rendered page image with its ink and shapes into one RGBA
//! image suitable for embedding into an output document.

use crate::rasterizer::StrokeRasterizer;
use crate::shapes::ShapePainter;
use crate::surface::RasterSurface;
use image::RgbaImage;
use pdf_annotator_core::{
    AnnotatorError, AnnotatorResult, EngineConfig, ShapeObject, StampCatalog, StrokePath,
};

/// Composes base page + stroke paths + shape objects
pub struct PageCompositor {
    rasterizer: StrokeRasterizer,
    painter: ShapePainter,
}

impl PageCompositor {
    pub fn new(config: &EngineConfig) -> Self {
        Self { rasterizer: StrokeRasterizer::new(config), painter: ShapePainter::from_config(config) }
    }

    pub fn painter(&self) -> &ShapePainter {
        &self.painter
    }

    /// Flatten one page
    ///
    /// Ink is drawn directly onto the base pixels so highlights multiply
    /// against the page content. Stored records are mapped through their
    /// relative coordinates, so the base image may be rendered at any scale.
    pub fn compose_page(
        &self,
        base: &RgbaImage,
        paths: &[StrokePath],
        shapes: &[ShapeObject],
        catalog: &StampCatalog,
    ) -> AnnotatorResult<RgbaImage> {
        if base.width() == 0 || base.height() == 0 {
            return Err(AnnotatorError::Export("base page image is empty".into()));
        }
        let mut surface = RasterSurface::from_image(base)?;
        self.rasterizer.draw_paths(&mut surface, paths, None);
        self.painter.paint_page(&mut surface, shapes, catalog);

        log::debug!(
            "composed {}x{} page with {} path(s) and {} shape(s)",
            surface.width(),
            surface.height(),
            paths.len(),
            shapes.len()
        );
        Ok(surface.to_image())
    }
}
