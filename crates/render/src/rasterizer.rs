//! Stroke rasterizer
//!
//! Turns pointer samples into pixels. While a stroke is in progress the
//! surface is restored from the pre-stroke pixels and the whole smoothed
//! stroke is painted again on every sample, so translucent highlight ink
//! never accumulates where segments overlap.

use crate::surface::RasterSurface;
use pdf_annotator_core::coords::path_capture_scale;
use pdf_annotator_core::{Color, EngineConfig, Point, StrokePath, StrokeTool, SurfaceSize, ToolSettings};
use resvg::tiny_skia::{BlendMode, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

/// Tool parameters a stroke is drawn with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub tool: StrokeTool,
    pub color: Color,
    /// Nominal width; eraser and highlight widths are scaled up from it
    pub line_width: f32,
    /// Highlight translucency, `None` for the configured default
    pub opacity: Option<f32>,
}

impl StrokeStyle {
    pub fn new(tool: StrokeTool, color: Color, line_width: f32) -> Self {
        Self { tool, color, line_width, opacity: None }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    /// Style for the active freehand tool, `None` for non-ink tools
    pub fn from_settings(settings: &ToolSettings) -> Option<Self> {
        let style = match settings.tool.stroke_tool()? {
            StrokeTool::Pencil => Self::new(StrokeTool::Pencil, settings.color, settings.line_width),
            StrokeTool::Eraser => Self::new(StrokeTool::Eraser, Color::BLACK, settings.eraser_size),
            StrokeTool::Highlight => {
                Self::new(StrokeTool::Highlight, settings.highlight_color, settings.line_width)
                    .with_opacity(settings.highlight_opacity)
            }
        };
        Some(style)
    }

    /// Style a stored path is rendered with
    pub fn from_path(path: &StrokePath) -> Self {
        Self {
            tool: path.tool,
            color: path.paint_color(),
            line_width: path.line_width,
            opacity: path.highlight_opacity,
        }
    }
}

/// Width multipliers and translucency applied per tool
#[derive(Debug, Clone, Copy, PartialEq)]
struct ToolFactors {
    highlight_width: f32,
    eraser_width: f32,
    highlight_alpha: f32,
}

#[derive(Debug, Default)]
enum RasterState {
    #[default]
    Idle,
    Drawing {
        style: StrokeStyle,
        points: Vec<Point>,
        /// Surface pixels from before the stroke started
        base: Pixmap,
    },
}

#[derive(Debug)]
pub struct StrokeRasterizer {
    factors: ToolFactors,
    state: RasterState,
}

impl StrokeRasterizer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            factors: ToolFactors {
                highlight_width: config.highlight_width_factor,
                eraser_width: config.eraser_width_factor,
                highlight_alpha: config.highlight_alpha,
            },
            state: RasterState::Idle,
        }
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, RasterState::Drawing { .. })
    }

    /// Points buffered for the stroke in progress
    pub fn current_points(&self) -> &[Point] {
        match &self.state {
            RasterState::Drawing { points, .. } => points,
            RasterState::Idle => &[],
        }
    }

    pub fn current_style(&self) -> Option<StrokeStyle> {
        match &self.state {
            RasterState::Drawing { style, .. } => Some(*style),
            RasterState::Idle => None,
        }
    }

    /// Begin a stroke at `point`
    ///
    /// A stroke still in progress is finished first; strokes never interleave.
    pub fn start_drawing(&mut self, surface: &mut RasterSurface, point: Point, style: StrokeStyle) {
        if self.is_drawing() {
            log::warn!("stroke started while another was in progress; finishing the previous one");
            self.end_drawing(surface);
        }
        self.state = RasterState::Drawing { style, points: vec![point], base: surface.pixmap().clone() };
    }

    /// Append a sample and repaint the live stroke
    ///
    /// Returns false when no stroke is in progress.
    pub fn continue_drawing(&mut self, surface: &mut RasterSurface, point: Point) -> bool {
        let RasterState::Drawing { style, points, base } = &mut self.state else {
            return false;
        };
        points.push(point);
        if points.len() < 3 {
            return true;
        }

        surface.replace_pixmap(base);
        if let Some(path) = smoothed_path(points, false) {
            paint_stroke(surface.pixmap_mut(), &path, style, self.factors);
        }
        true
    }

    /// Finish the stroke and hand back the raw samples
    ///
    /// The final segment to the last sample is drawn here. The returned points
    /// are exactly what was fed in; simplification is up to the caller. Ending
    /// while idle returns an empty sequence.
    pub fn end_drawing(&mut self, surface: &mut RasterSurface) -> Vec<Point> {
        let RasterState::Drawing { style, points, base } = std::mem::take(&mut self.state) else {
            return Vec::new();
        };

        surface.replace_pixmap(&base);
        if let Some(path) = smoothed_path(&points, true) {
            paint_stroke(surface.pixmap_mut(), &path, &style, self.factors);
        }
        points
    }

    /// Drop the stroke in progress and restore the pre-stroke pixels
    pub fn abort_drawing(&mut self, surface: &mut RasterSurface) {
        if let RasterState::Drawing { base, .. } = std::mem::take(&mut self.state) {
            surface.replace_pixmap(&base);
        }
    }

    /// Clear the surface and draw every stored ink path
    ///
    /// With `scale`, absolute coordinates are multiplied by it; otherwise
    /// relative coordinates are mapped onto the surface, falling back to the
    /// captured coordinates for points that were never normalized. Line
    /// widths follow the same factor, so ink keeps its thickness relative to
    /// the page.
    pub fn render_paths(&self, surface: &mut RasterSurface, paths: &[StrokePath], scale: Option<f32>) {
        surface.clear();
        self.draw_paths(surface, paths, scale);
    }

    /// Draw stored ink paths over the current surface contents
    ///
    /// Eraser recordings are skipped: erasing is applied to the data.
    pub fn draw_paths(&self, surface: &mut RasterSurface, paths: &[StrokePath], scale: Option<f32>) {
        let size = surface.size();
        for path in paths {
            if path.tool == StrokeTool::Eraser {
                continue;
            }
            if !path.is_renderable() {
                log::warn!(
                    "skipping {:?} path on page {} with {} point(s)",
                    path.tool,
                    path.page_number,
                    path.points.len()
                );
                continue;
            }

            let points: Vec<Point> = path.points.iter().map(|point| map_point(point, size, scale)).collect();
            let width_scale = scale.or_else(|| path_capture_scale(&path.points, size)).unwrap_or(1.0);
            let mut style = StrokeStyle::from_path(path);
            style.line_width *= width_scale;
            if let Some(shape) = smoothed_path(&points, true) {
                paint_stroke(surface.pixmap_mut(), &shape, &style, self.factors);
            }
        }
    }
}

fn map_point(point: &Point, size: SurfaceSize, scale: Option<f32>) -> Point {
    match (scale, point.relative()) {
        (Some(scale), _) => Point { x: point.x * scale, y: point.y * scale, ..*point },
        (None, Some((rx, ry))) => Point { x: rx * size.width, y: ry * size.height, ..*point },
        (None, None) => *point,
    }
}

/// Quadratic curves through the midpoints of consecutive samples
///
/// With `include_tail`, the final straight segment to the last sample is
/// added as well; the live preview leaves it off until the stroke ends.
fn smoothed_path(points: &[Point], include_tail: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    if rest.is_empty() {
        return None;
    }

    let mut builder = PathBuilder::new();
    builder.move_to(first.x, first.y);
    for pair in points[1..].windows(2) {
        let (control, next) = (&pair[0], &pair[1]);
        let mid_x = (control.x + next.x) / 2.0;
        let mid_y = (control.y + next.y) / 2.0;
        builder.quad_to(control.x, control.y, mid_x, mid_y);
    }
    if include_tail {
        let last = points[points.len() - 1];
        builder.line_to(last.x, last.y);
    }
    builder.finish()
}

fn paint_stroke(pixmap: &mut Pixmap, path: &Path, style: &StrokeStyle, factors: ToolFactors) {
    let mut paint = Paint::default();
    paint.anti_alias = true;

    let width = match style.tool {
        StrokeTool::Pencil => {
            let Color { r, g, b, a } = style.color;
            paint.set_color_rgba8(r, g, b, a);
            paint.blend_mode = BlendMode::SourceOver;
            style.line_width
        }
        StrokeTool::Eraser => {
            paint.set_color_rgba8(0, 0, 0, 255);
            paint.blend_mode = BlendMode::DestinationOut;
            style.line_width * factors.eraser_width
        }
        StrokeTool::Highlight => {
            let alpha = style.opacity.unwrap_or(factors.highlight_alpha);
            let Color { r, g, b, a } = style.color.with_opacity(alpha);
            paint.set_color_rgba8(r, g, b, a);
            paint.blend_mode = BlendMode::Multiply;
            style.line_width * factors.highlight_width
        }
    };

    let stroke = Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    pixmap.stroke_path(path, &paint, &stroke, Transform::identity(), None);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rasterizer() -> StrokeRasterizer {
        StrokeRasterizer::new(&EngineConfig::default())
    }

    fn pencil() -> StrokeStyle {
        StrokeStyle::new(StrokeTool::Pencil, Color::BLACK, 2.0)
    }

    fn line(rasterizer: &mut StrokeRasterizer, surface: &mut RasterSurface, style: StrokeStyle, y: f32) -> Vec<Point> {
        rasterizer.start_drawing(surface, Point::new(2.0, y), style);
        rasterizer.continue_drawing(surface, Point::new(10.0, y));
        rasterizer.continue_drawing(surface, Point::new(20.0, y));
        rasterizer.continue_drawing(surface, Point::new(30.0, y));
        rasterizer.end_drawing(surface)
    }

    #[test]
    fn test_basic_stroke_returns_raw_points() {
        let mut surface = RasterSurface::new(40, 20).unwrap();
        let mut rasterizer = rasterizer();

        rasterizer.start_drawing(&mut surface, Point::new(0.0, 0.0), pencil());
        assert!(rasterizer.is_drawing());
        rasterizer.continue_drawing(&mut surface, Point::new(10.0, 0.0));
        rasterizer.continue_drawing(&mut surface, Point::new(20.0, 0.0));
        let points = rasterizer.end_drawing(&mut surface);

        assert_eq!(points, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(20.0, 0.0)]);
        assert!(!rasterizer.is_drawing());
    }

    #[test]
    fn test_pencil_paints_opaque_ink() {
        let mut surface = RasterSurface::new(40, 20).unwrap();
        let mut rasterizer = rasterizer();
        line(&mut rasterizer, &mut surface, pencil(), 10.0);

        assert_eq!(surface.pixel(15, 10), Some([0, 0, 0, 255]));
        assert_eq!(surface.pixel(15, 2), Some([0, 0, 0, 0]));
        assert_eq!(surface.pixel(38, 10).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_live_preview_waits_for_three_points() {
        let mut surface = RasterSurface::new(40, 20).unwrap();
        let mut rasterizer = rasterizer();
        rasterizer.start_drawing(&mut surface, Point::new(2.0, 10.0), pencil());
        rasterizer.continue_drawing(&mut surface, Point::new(30.0, 10.0));
        assert!(surface.is_blank());

        rasterizer.continue_drawing(&mut surface, Point::new(30.0, 12.0));
        assert!(!surface.is_blank());
    }

    #[test]
    fn test_end_while_idle_is_empty() {
        let mut surface = RasterSurface::new(10, 10).unwrap();
        let mut rasterizer = rasterizer();
        assert!(rasterizer.end_drawing(&mut surface).is_empty());
        assert!(!rasterizer.continue_drawing(&mut surface, Point::new(1.0, 1.0)));
    }

    #[test]
    fn test_restart_finishes_previous_stroke() {
        let mut surface = RasterSurface::new(40, 20).unwrap();
        let mut rasterizer = rasterizer();
        rasterizer.start_drawing(&mut surface, Point::new(2.0, 5.0), pencil());
        rasterizer.continue_drawing(&mut surface, Point::new(30.0, 5.0));
        rasterizer.start_drawing(&mut surface, Point::new(2.0, 15.0), pencil());

        assert_eq!(rasterizer.current_points(), &[Point::new(2.0, 15.0)]);
        assert_eq!(surface.pixel(15, 5).map(|p| p[3]), Some(255));
    }

    #[test]
    fn test_eraser_clears_pixels() {
        let mut surface = RasterSurface::new(40, 20).unwrap();
        surface.fill(0, 0, 255, 255);
        let mut rasterizer = rasterizer();
        line(&mut rasterizer, &mut surface, StrokeStyle::new(StrokeTool::Eraser, Color::BLACK, 3.0), 10.0);

        assert_eq!(surface.pixel(15, 10).map(|p| p[3]), Some(0));
        assert_eq!(surface.pixel(15, 1), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_highlight_is_wide_and_translucent() {
        let mut surface = RasterSurface::new(40, 20).unwrap();
        let mut rasterizer = rasterizer();
        let style = StrokeStyle::new(StrokeTool::Highlight, Color::YELLOW, 2.0);
        line(&mut rasterizer, &mut surface, style, 10.0);

        let [_, _, _, alpha] = surface.pixel(15, 10).unwrap();
        assert!((95..=110).contains(&alpha), "alpha was {alpha}");
        // Three times the nominal width reaches two pixels beyond a pencil line
        assert!(surface.pixel(15, 12).unwrap()[3] > 0);
    }

    #[test]
    fn test_abort_restores_surface() {
        let mut surface = RasterSurface::new(40, 20).unwrap();
        let mut rasterizer = rasterizer();
        rasterizer.start_drawing(&mut surface, Point::new(2.0, 10.0), pencil());
        rasterizer.continue_drawing(&mut surface, Point::new(10.0, 10.0));
        rasterizer.continue_drawing(&mut surface, Point::new(30.0, 10.0));
        rasterizer.abort_drawing(&mut surface);
        assert!(surface.is_blank());
        assert!(!rasterizer.is_drawing());
    }

    #[test]
    fn test_render_paths_uses_relative_coordinates() {
        let mut surface = RasterSurface::new(200, 100).unwrap();
        surface.fill(255, 0, 0, 255);
        let points = vec![
            Point::new(10.0, 5.0).with_relative(0.1, 0.5),
            Point::new(40.0, 5.0).with_relative(0.9, 0.5),
        ];
        let path = StrokePath::new(StrokeTool::Pencil, Color::BLACK, 2.0, 1, points);

        rasterizer().render_paths(&mut surface, &[path], None);
        assert_eq!(surface.pixel(100, 50), Some([0, 0, 0, 255]));
        assert_eq!(surface.pixel(25, 5).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_render_paths_with_scale() {
        let mut surface = RasterSurface::new(100, 100).unwrap();
        let points = vec![Point::new(5.0, 10.0), Point::new(40.0, 10.0)];
        let path = StrokePath::new(StrokeTool::Pencil, Color::BLACK, 2.0, 1, points);

        rasterizer().render_paths(&mut surface, &[path], Some(2.0));
        assert_eq!(surface.pixel(50, 20).map(|p| p[3]), Some(255));
        assert_eq!(surface.pixel(50, 10).map(|p| p[3]), Some(0));
        // Width doubles with the coordinates
        assert_eq!(surface.pixel(50, 21).map(|p| p[3]), Some(255));
    }

    #[test]
    fn test_render_paths_scales_width_with_surface() {
        let captured = SurfaceSize::new(100.0, 100.0);
        let points = [Point::new(10.0, 50.0), Point::new(90.0, 50.0)]
            .into_iter()
            .map(|point| pdf_annotator_core::coords::normalize_point(point, captured))
            .collect();
        let path = StrokePath::new(StrokeTool::Pencil, Color::BLACK, 2.0, 1, points);

        let mut surface = RasterSurface::new(400, 400).unwrap();
        rasterizer().render_paths(&mut surface, &[path], None);
        // 8px wide at 4x: rows 196..204 are covered
        assert_eq!(surface.pixel(200, 203).map(|p| p[3]), Some(255));
        assert_eq!(surface.pixel(200, 206).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_render_paths_skips_erasers_and_short_paths() {
        let mut surface = RasterSurface::new(50, 50).unwrap();
        let eraser = StrokePath::new(
            StrokeTool::Eraser,
            Color::BLACK,
            4.0,
            1,
            vec![Point::new(0.0, 25.0), Point::new(50.0, 25.0)],
        );
        let dot = StrokePath::new(StrokeTool::Pencil, Color::BLACK, 4.0, 1, vec![Point::new(10.0, 10.0)]);

        rasterizer().render_paths(&mut surface, &[eraser, dot], None);
        assert!(surface.is_blank());
    }

    #[test]
    fn test_style_from_settings() {
        use pdf_annotator_core::Tool;

        let settings = ToolSettings::default().with_tool(Tool::Highlight);
        let style = StrokeStyle::from_settings(&settings).unwrap();
        assert_eq!(style.color, settings.highlight_color);
        assert_eq!(style.opacity, Some(0.4));

        let eraser = StrokeStyle::from_settings(&settings.clone().with_tool(Tool::Eraser)).unwrap();
        assert_eq!(eraser.line_width, 10.0);
        assert!(StrokeStyle::from_settings(&settings.with_tool(Tool::Text)).is_none());
    }
}
