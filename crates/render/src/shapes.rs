//! Shape painter
//!
//! Paints shape objects onto a raster surface: outlines and arrows through
//! tiny-skia, text and stamps through resvg. Used for export and by hosts
//! that have no vector layer of their own.

use crate::surface::RasterSurface;
use pdf_annotator_core::coords::{resolve_shape, shape_capture_scale};
use pdf_annotator_core::{Color, EngineConfig, ShapeKind, ShapeObject, StampCatalog};
use resvg::tiny_skia::{
    FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, StrokeDash, Transform,
};
use resvg::usvg;

/// Line height of multi-line text, relative to the font size
const LINE_HEIGHT: f32 = 1.2;
/// Inner padding of text boxes and notes
const TEXT_PADDING: f32 = 4.0;
const PLACEHOLDER_COLOR: Color = Color::rgb(128, 128, 128);

pub struct ShapePainter {
    options: usvg::Options<'static>,
}

impl ShapePainter {
    pub fn new(load_system_fonts: bool) -> Self {
        let mut options = usvg::Options::default();
        if load_system_fonts {
            options.fontdb_mut().load_system_fonts();
            log::debug!("loaded {} font faces", options.fontdb.len());
        }
        Self { options }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.load_system_fonts)
    }

    /// Paint stored shape records, mapping their relative geometry onto the surface
    ///
    /// Stroke widths and font sizes are scaled with the geometry.
    pub fn paint_page(&self, surface: &mut RasterSurface, shapes: &[ShapeObject], catalog: &StampCatalog) {
        let size = surface.size();
        for shape in shapes {
            let scale = shape_capture_scale(shape, size).unwrap_or(1.0);
            let mut resolved = shape.clone();
            resolve_shape(&mut resolved, size);
            resolved.style.stroke_width *= scale;
            resolved.style.font_size *= scale;
            self.paint(surface, &resolved, catalog);
        }
    }

    /// Paint one shape using its absolute geometry
    pub fn paint(&self, surface: &mut RasterSurface, shape: &ShapeObject, catalog: &StampCatalog) {
        let pixmap = surface.pixmap_mut();
        let (cx, cy) = shape.center();
        let rotation = Transform::from_rotate_at(shape.angle, cx, cy);

        match &shape.kind {
            ShapeKind::Rectangle => {
                if let Some(path) = rect_path(shape) {
                    fill_and_stroke(pixmap, &path, shape, rotation);
                }
            }
            ShapeKind::Circle => {
                let radius = shape.width.min(shape.height) / 2.0;
                if let Some(path) = PathBuilder::from_circle(cx, cy, radius) {
                    fill_and_stroke(pixmap, &path, shape, rotation);
                }
            }
            ShapeKind::Arrow { points, .. } => {
                if let Some(path) = arrow_path(*points, shape.style.stroke_width) {
                    let paint = solid(shape.style.color.with_opacity(shape.style.opacity));
                    let stroke = round_stroke(shape.style.stroke_width);
                    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                }
            }
            ShapeKind::Note { text, font_family, note_color } => {
                if let Some(path) = rect_path(shape) {
                    let fill = solid(note_color.with_opacity(shape.style.opacity));
                    pixmap.fill_path(&path, &fill, FillRule::Winding, rotation, None);
                    let border = solid(darken(*note_color).with_opacity(shape.style.opacity));
                    pixmap.stroke_path(&path, &border, &round_stroke(1.0), rotation, None);
                }
                self.paint_text(pixmap, shape, text, font_family, rotation);
            }
            ShapeKind::Text { text, font_family } => {
                if let Some(fill) = shape.style.fill {
                    if let Some(path) = rect_path(shape) {
                        pixmap.fill_path(&path, &solid(fill), FillRule::Winding, rotation, None);
                    }
                }
                self.paint_text(pixmap, shape, text, font_family, rotation);
            }
            ShapeKind::Stamp { stamp_id, stamp_svg } => {
                let svg = if stamp_svg.trim().is_empty() {
                    catalog.get(stamp_id).map(|stamp| stamp.svg.as_str())
                } else {
                    Some(stamp_svg.as_str())
                };
                let tree = svg.and_then(|svg| match usvg::Tree::from_str(svg, &self.options) {
                    Ok(tree) => Some(tree),
                    Err(err) => {
                        log::warn!("stamp `{stamp_id}` has invalid SVG: {err}");
                        None
                    }
                });

                match tree {
                    Some(tree) => render_tree(pixmap, &tree, shape, rotation),
                    None => {
                        if svg.is_none() {
                            log::warn!("unknown stamp `{stamp_id}`, drawing a placeholder");
                        }
                        paint_placeholder(pixmap, shape, rotation);
                    }
                }
            }
        }
    }

    fn paint_text(&self, pixmap: &mut Pixmap, shape: &ShapeObject, text: &str, font_family: &str, rotation: Transform) {
        if text.trim().is_empty() {
            return;
        }
        let svg = text_svg(shape, text, font_family);
        match usvg::Tree::from_str(&svg, &self.options) {
            Ok(tree) => {
                let transform = rotation.pre_translate(shape.x, shape.y);
                resvg::render(&tree, transform, &mut pixmap.as_mut());
            }
            Err(err) => log::warn!("failed to lay out text of shape {}: {err}", shape.id),
        }
    }
}

impl Default for ShapePainter {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Standalone SVG document holding the shape's text, one `tspan` per line
fn text_svg(shape: &ShapeObject, text: &str, font_family: &str) -> String {
    let style = &shape.style;
    let font_size = style.font_size.max(1.0);
    let width = shape.width.max(1.0);
    let height = shape.height.max(1.0);

    let mut lines = String::new();
    for (index, line) in text.lines().enumerate() {
        let dy = if index == 0 { 0.0 } else { font_size * LINE_HEIGHT };
        lines.push_str(&format!(
            r#"<tspan x="{TEXT_PADDING}" dy="{dy}">{}</tspan>"#,
            escape_xml(line)
        ));
    }

    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            r#"<text x="{pad}" y="{baseline}" font-family="{family}" font-size="{size}" fill="{fill}" fill-opacity="{opacity}">{lines}</text>"#,
            "</svg>"
        ),
        w = width,
        h = height,
        pad = TEXT_PADDING,
        baseline = TEXT_PADDING + font_size,
        family = escape_xml(font_family),
        size = font_size,
        fill = style.color.to_hex_rgb(),
        opacity = style.opacity * style.color.a as f32 / 255.0,
        lines = lines,
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Scale an SVG tree into the shape's box
fn render_tree(pixmap: &mut Pixmap, tree: &usvg::Tree, shape: &ShapeObject, rotation: Transform) {
    let size = tree.size();
    if size.width() <= 0.0 || size.height() <= 0.0 {
        paint_placeholder(pixmap, shape, rotation);
        return;
    }
    let transform = rotation
        .pre_translate(shape.x, shape.y)
        .pre_scale(shape.width / size.width(), shape.height / size.height());
    resvg::render(tree, transform, &mut pixmap.as_mut());
}

fn paint_placeholder(pixmap: &mut Pixmap, shape: &ShapeObject, rotation: Transform) {
    let Some(path) = rect_path(shape) else {
        return;
    };
    let mut stroke = round_stroke(1.5);
    stroke.dash = StrokeDash::new(vec![6.0, 4.0], 0.0);
    pixmap.stroke_path(&path, &solid(PLACEHOLDER_COLOR), &stroke, rotation, None);
}

fn rect_path(shape: &ShapeObject) -> Option<Path> {
    let rect = Rect::from_xywh(shape.x, shape.y, shape.width, shape.height)?;
    Some(PathBuilder::from_rect(rect))
}

fn fill_and_stroke(pixmap: &mut Pixmap, path: &Path, shape: &ShapeObject, transform: Transform) {
    let style = &shape.style;
    if let Some(fill) = style.fill {
        pixmap.fill_path(path, &solid(fill.with_opacity(style.opacity)), FillRule::Winding, transform, None);
    }
    if style.stroke_width > 0.0 {
        let paint = solid(style.color.with_opacity(style.opacity));
        pixmap.stroke_path(path, &paint, &round_stroke(style.stroke_width), transform, None);
    }
}

/// Shaft plus a two-stroke head at the end point
fn arrow_path(points: [f32; 4], stroke_width: f32) -> Option<Path> {
    let [x1, y1, x2, y2] = points;
    let (dx, dy) = (x2 - x1, y2 - y1);
    let length = (dx * dx + dy * dy).sqrt();
    if length <= f32::EPSILON {
        return None;
    }

    let head = (stroke_width * 4.0).max(10.0).min(length);
    let (ux, uy) = (dx / length, dy / length);
    let (sin, cos) = 30f32.to_radians().sin_cos();

    let mut builder = PathBuilder::new();
    builder.move_to(x1, y1);
    builder.line_to(x2, y2);
    for side in [1.0, -1.0] {
        let bx = -(ux * cos - side * uy * sin) * head;
        let by = -(uy * cos + side * ux * sin) * head;
        builder.move_to(x2, y2);
        builder.line_to(x2 + bx, y2 + by);
    }
    builder.finish()
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn round_stroke(width: f32) -> Stroke {
    Stroke { width, line_cap: LineCap::Round, line_join: LineJoin::Round, ..Stroke::default() }
}

fn darken(color: Color) -> Color {
    let scale = |channel: u8| (channel as f32 * 0.75) as u8;
    Color::new(scale(color.r), scale(color.g), scale(color.b), color.a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_annotator_core::coords::normalize_shape;
    use pdf_annotator_core::{ShapeStyle, StampDefinition};

    const RED_SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="#ff0000"/></svg>"##;

    fn painter() -> ShapePainter {
        ShapePainter::new(false)
    }

    fn style(stroke_width: f32) -> ShapeStyle {
        ShapeStyle { color: Color::BLUE, stroke_width, ..ShapeStyle::default() }
    }

    #[test]
    fn test_rectangle_outline() {
        let mut surface = RasterSurface::new(100, 100).unwrap();
        let rect = ShapeObject::new(1, ShapeKind::Rectangle, 20.0, 20.0, 40.0, 40.0, style(4.0));
        painter().paint(&mut surface, &rect, &StampCatalog::default());

        assert_eq!(surface.pixel(20, 40), Some([0, 0, 255, 255]));
        assert_eq!(surface.pixel(40, 40).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_filled_circle() {
        let mut surface = RasterSurface::new(100, 100).unwrap();
        let mut circle_style = style(1.0);
        circle_style.fill = Some(Color::RED);
        let circle = ShapeObject::new(1, ShapeKind::Circle, 10.0, 10.0, 60.0, 60.0, circle_style);
        painter().paint(&mut surface, &circle, &StampCatalog::default());

        assert_eq!(surface.pixel(40, 40), Some([255, 0, 0, 255]));
        // Box corner lies outside the inscribed circle
        assert_eq!(surface.pixel(12, 12).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_arrow_has_head() {
        let mut surface = RasterSurface::new(100, 100).unwrap();
        let arrow = ShapeObject::arrow(1, (10.0, 50.0), (90.0, 50.0), style(2.0));
        painter().paint(&mut surface, &arrow, &StampCatalog::default());

        assert_eq!(surface.pixel(50, 50).map(|p| p[3]), Some(255));
        // Head strokes leave the shaft line near the tip
        let above: u32 = (40..50).map(|y| surface.pixel(84, y).map_or(0, |p| p[3] as u32)).sum();
        assert!(above > 0);
    }

    #[test]
    fn test_note_background() {
        let mut surface = RasterSurface::new(200, 200).unwrap();
        let note = ShapeObject::new(
            1,
            ShapeKind::Note { text: "hi".into(), font_family: "Helvetica".into(), note_color: Color::NOTE_YELLOW },
            10.0,
            10.0,
            100.0,
            80.0,
            ShapeStyle::default(),
        );
        painter().paint(&mut surface, &note, &StampCatalog::default());
        assert_eq!(surface.pixel(100, 85), Some([255, 245, 157, 255]));
    }

    #[test]
    fn test_stamp_from_catalog() {
        let catalog = StampCatalog::from_definitions([StampDefinition::new("red", "Red", "", RED_SQUARE)]);
        let stamp = ShapeObject::new(
            1,
            ShapeKind::Stamp { stamp_id: "red".into(), stamp_svg: String::new() },
            10.0,
            10.0,
            40.0,
            20.0,
            ShapeStyle::default(),
        );
        let mut surface = RasterSurface::new(100, 100).unwrap();
        painter().paint(&mut surface, &stamp, &catalog);

        assert_eq!(surface.pixel(45, 25), Some([255, 0, 0, 255]));
        assert_eq!(surface.pixel(55, 25).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_unknown_stamp_draws_placeholder() {
        let stamp = ShapeObject::new(
            1,
            ShapeKind::Stamp { stamp_id: "gone".into(), stamp_svg: String::new() },
            10.0,
            10.0,
            40.0,
            40.0,
            ShapeStyle::default(),
        );
        let mut surface = RasterSurface::new(100, 100).unwrap();
        painter().paint(&mut surface, &stamp, &StampCatalog::default());

        assert!(!surface.is_blank());
        assert_eq!(surface.pixel(30, 30).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_paint_page_resolves_relative_geometry() {
        let mut rect = ShapeObject::new(1, ShapeKind::Rectangle, 10.0, 10.0, 20.0, 20.0, style(2.0));
        normalize_shape(&mut rect, pdf_annotator_core::SurfaceSize::new(100.0, 100.0));

        let mut surface = RasterSurface::new(200, 200).unwrap();
        painter().paint_page(&mut surface, &[rect], &StampCatalog::default());
        assert_eq!(surface.pixel(20, 40).map(|p| p[3]), Some(255));
        assert_eq!(surface.pixel(10, 20).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_text_svg_escapes_markup() {
        let shape = ShapeObject::new(
            1,
            ShapeKind::Text { text: "a < b\nc & d".into(), font_family: "Sans".into() },
            0.0,
            0.0,
            100.0,
            40.0,
            ShapeStyle::default(),
        );
        let svg = text_svg(&shape, "a < b\nc & d", "Sans");
        assert!(svg.contains("a &lt; b"));
        assert!(svg.contains("c &amp; d"));
        assert_eq!(svg.matches("<tspan").count(), 2);
        assert!(usvg::Tree::from_str(&svg, &usvg::Options::default()).is_ok());
    }
}
