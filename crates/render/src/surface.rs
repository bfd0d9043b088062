//! Raster surface
//!
//! Owned RGBA pixel buffer the rasterizer and shape painter draw into.
//! Pixels are stored premultiplied, as tiny-skia expects; conversions to and
//! from `image::RgbaImage` handle the (de)multiplication.

use image::RgbaImage;
use pdf_annotator_core::{AnnotatorError, AnnotatorResult, SurfaceSize};
use resvg::tiny_skia::{self, ColorU8, IntSize, Pixmap};

#[derive(Debug, Clone, PartialEq)]
pub struct RasterSurface {
    pixmap: Pixmap,
}

impl RasterSurface {
    /// Allocate a transparent surface
    ///
    /// Zero-sized or oversized dimensions are the one failure the engine
    /// reports at initialization.
    pub fn new(width: u32, height: u32) -> AnnotatorResult<Self> {
        let pixmap = Pixmap::new(width, height)
            .ok_or(AnnotatorError::SurfaceUnavailable { width, height })?;
        Ok(Self { pixmap })
    }

    /// Surface initialized with the pixels of a rendered page
    pub fn from_image(image: &RgbaImage) -> AnnotatorResult<Self> {
        let (width, height) = image.dimensions();
        let size = IntSize::from_wh(width, height)
            .ok_or(AnnotatorError::SurfaceUnavailable { width, height })?;

        let mut data = Vec::with_capacity(image.as_raw().len());
        for pixel in image.pixels() {
            let [r, g, b, a] = pixel.0;
            let premultiplied = ColorU8::from_rgba(r, g, b, a).premultiply();
            data.extend_from_slice(&[
                premultiplied.red(),
                premultiplied.green(),
                premultiplied.blue(),
                premultiplied.alpha(),
            ]);
        }

        let pixmap = Pixmap::from_vec(data, size)
            .ok_or(AnnotatorError::SurfaceUnavailable { width, height })?;
        Ok(Self { pixmap })
    }

    /// Copy out as straight-alpha RGBA
    pub fn to_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width(), self.height());
        for (pixel, source) in image.pixels_mut().zip(self.pixmap.pixels()) {
            let color = source.demultiply();
            pixel.0 = [color.red(), color.green(), color.blue(), color.alpha()];
        }
        image
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width() as f32, self.height() as f32)
    }

    /// Make every pixel transparent
    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    pub fn fill(&mut self, r: u8, g: u8, b: u8, a: u8) {
        self.pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, a));
    }

    /// Reallocate at a new size; the contents are cleared
    pub fn resize(&mut self, width: u32, height: u32) -> AnnotatorResult<()> {
        if width == self.width() && height == self.height() {
            self.clear();
            return Ok(());
        }
        *self = Self::new(width, height)?;
        Ok(())
    }

    /// Straight-alpha RGBA of one pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let color = self.pixmap.pixel(x, y)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }

    /// True when no pixel has any coverage
    pub fn is_blank(&self) -> bool {
        self.pixmap.pixels().iter().all(|pixel| pixel.alpha() == 0)
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    pub(crate) fn replace_pixmap(&mut self, pixmap: &Pixmap) {
        if pixmap.width() == self.width() && pixmap.height() == self.height() {
            self.pixmap.data_mut().copy_from_slice(pixmap.data());
        } else {
            self.pixmap = pixmap.clone();
        }
    }
}
