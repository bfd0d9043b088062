//! PDF Annotator Render Library
//!
//! Raster surface, live stroke rasterization, shape painting and the page
//! export compositor. Pixels go through tiny-skia; SVG stamps and text go
//! through resvg.

pub mod compositor;
pub mod rasterizer;
pub mod shapes;
pub mod surface;

pub use compositor::PageCompositor;
pub use rasterizer::{StrokeRasterizer, StrokeStyle};
pub use shapes::ShapePainter;
pub use surface::RasterSurface;
