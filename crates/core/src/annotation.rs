//! Annotation data model
//!
//! Stroke paths (freehand ink, highlight and eraser recordings) and shape
//! objects (text, notes, arrows, stamps and simple outlines). Both carry
//! device-pixel coordinates captured at input time plus page-relative
//! coordinates in [0, 1] which are the persisted source of truth.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a shape object
///
/// Stable for the lifetime of the object and persisted with it.
pub type ShapeId = uuid::Uuid;

/// RGBA color representation
///
/// Serialized as a CSS-style hex string (`#rrggbb` or `#rrggbbaa`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Convert to normalized RGBA values (0.0 to 1.0)
    pub fn to_normalized(&self) -> (f32, f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }

    /// Same color with its alpha multiplied by `opacity`
    pub fn with_opacity(self, opacity: f32) -> Self {
        let alpha = (self.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a: alpha, ..self }
    }

    /// `#rrggbb` form, dropping alpha
    pub fn to_hex_rgb(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const NOTE_YELLOW: Color = Color::rgb(255, 245, 157);
}

/// Error returned when a color string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color `{0}`")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() {
            return Err(err());
        }
        let channel = |range: &str| u8::from_str_radix(range, 16).map_err(|_| err());
        let short = |c: &str| channel(c).map(|v| v * 17);

        match hex.len() {
            3 => Ok(Color::rgb(short(&hex[0..1])?, short(&hex[1..2])?, short(&hex[2..3])?)),
            6 => Ok(Color::rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            8 => Ok(Color::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "{}", self.to_hex_rgb())
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// A captured input point
///
/// `x`/`y` are device pixels at capture time. `relative_x`/`relative_y` are the
/// scale-independent form once the point has been normalized against a surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_y: Option<f32>,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, ..Default::default() }
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure);
        self
    }

    pub fn with_relative(mut self, relative_x: f32, relative_y: f32) -> Self {
        self.relative_x = Some(relative_x);
        self.relative_y = Some(relative_y);
        self
    }

    /// Page-relative coordinates, when both are known
    pub fn relative(&self) -> Option<(f32, f32)> {
        Some((self.relative_x?, self.relative_y?))
    }

    /// Calculate distance to another point
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Freehand tool that produced a stroke path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeTool {
    Pencil,
    Eraser,
    Highlight,
}

/// A freehand ink, highlight or eraser recording
///
/// Created on pointer-up and immutable afterwards, except for being replaced
/// by split subpaths when erased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokePath {
    pub tool: StrokeTool,
    pub color: Color,
    pub line_width: f32,
    pub points: Vec<Point>,
    pub page_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_opacity: Option<f32>,
}

impl StrokePath {
    /// Minimum number of points a path needs to be persisted or rendered
    pub const MIN_POINTS: usize = 2;

    pub fn new(
        tool: StrokeTool,
        color: Color,
        line_width: f32,
        page_number: u32,
        points: Vec<Point>,
    ) -> Self {
        Self {
            tool,
            color,
            line_width,
            points,
            page_number,
            highlight_color: None,
            highlight_opacity: None,
        }
    }

    pub fn with_highlight(mut self, color: Color, opacity: f32) -> Self {
        self.highlight_color = Some(color);
        self.highlight_opacity = Some(opacity);
        self
    }

    /// Copy of this path with a different point sequence (all other
    /// attributes preserved)
    pub fn with_points(&self, points: Vec<Point>) -> Self {
        Self { points, ..self.clone() }
    }

    pub fn is_renderable(&self) -> bool {
        self.points.len() >= Self::MIN_POINTS
    }

    /// Color the stroke is painted with
    pub fn paint_color(&self) -> Color {
        match self.tool {
            StrokeTool::Highlight => self.highlight_color.unwrap_or(self.color),
            _ => self.color,
        }
    }
}

/// Visual styling for shape objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    /// Stroke color for outlines, arrows and text
    pub color: Color,

    /// Outline width in pixels
    pub stroke_width: f32,

    /// Fill color for closed shapes (None for no fill)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Color>,

    /// Font size in pixels for text-bearing shapes
    pub font_size: f32,

    /// Opacity (0.0 = transparent, 1.0 = opaque)
    pub opacity: f32,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self { color: Color::BLACK, stroke_width: 2.0, fill: None, font_size: 16.0, opacity: 1.0 }
    }
}

/// Variant-specific payload of a shape object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ShapeKind {
    /// Free text box
    Text { text: String, font_family: String },

    /// Sticky note with a colored background
    Note { text: String, font_family: String, note_color: Color },

    /// Arrow from `(points[0], points[1])` to `(points[2], points[3])`
    Arrow {
        points: [f32; 4],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relative_points: Option<[f32; 4]>,
    },

    /// Stamp rendered from a catalog entry
    Stamp { stamp_id: String, stamp_svg: String },

    /// Outlined rectangle
    Rectangle,

    /// Outlined circle inscribed in the object's box
    Circle,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Text { .. } => "text",
            ShapeKind::Note { .. } => "note",
            ShapeKind::Arrow { .. } => "arrow",
            ShapeKind::Stamp { .. } => "stamp",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
        }
    }

    /// Text content for text-bearing variants
    pub fn text(&self) -> Option<&str> {
        match self {
            ShapeKind::Text { text, .. } | ShapeKind::Note { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn is_text_bearing(&self) -> bool {
        self.text().is_some()
    }
}

/// A discrete vector annotation placed on a page
///
/// `x`/`y` is the top-left corner of the object's unrotated box in surface
/// pixels; `angle` rotates the box around its center (degrees, clockwise).
/// For arrows the box is kept in sync with the endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeObject {
    pub id: ShapeId,
    pub page_number: u32,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_y: Option<f32>,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_height: Option<f32>,
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub style: ShapeStyle,
    #[serde(flatten)]
    pub kind: ShapeKind,
}

impl ShapeObject {
    /// Create a box-shaped object with a generated ID
    pub fn new(
        page_number: u32,
        kind: ShapeKind,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        style: ShapeStyle,
    ) -> Self {
        Self {
            id: ShapeId::new_v4(),
            page_number,
            x,
            y,
            relative_x: None,
            relative_y: None,
            width,
            height,
            relative_width: None,
            relative_height: None,
            angle: 0.0,
            style,
            kind,
        }
    }

    /// Create an arrow between two points
    pub fn arrow(page_number: u32, start: (f32, f32), end: (f32, f32), style: ShapeStyle) -> Self {
        let mut shape = Self::new(
            page_number,
            ShapeKind::Arrow { points: [start.0, start.1, end.0, end.1], relative_points: None },
            0.0,
            0.0,
            0.0,
            0.0,
            style,
        );
        shape.sync_arrow_box();
        shape
    }

    /// Page-relative top-left corner, when the object has been normalized
    pub fn relative_position(&self) -> Option<(f32, f32)> {
        Some((self.relative_x?, self.relative_y?))
    }

    pub fn relative_size(&self) -> Option<(f32, f32)> {
        Some((self.relative_width?, self.relative_height?))
    }

    /// Center of the object's box
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Arrow endpoints, if this is an arrow
    pub fn arrow_points(&self) -> Option<[f32; 4]> {
        match &self.kind {
            ShapeKind::Arrow { points, .. } => Some(*points),
            _ => None,
        }
    }

    /// Replace arrow endpoints and refresh the box
    pub fn set_arrow_points(&mut self, new_points: [f32; 4]) {
        if let ShapeKind::Arrow { points, .. } = &mut self.kind {
            *points = new_points;
        }
        self.sync_arrow_box();
    }

    fn sync_arrow_box(&mut self) {
        if let Some([x1, y1, x2, y2]) = self.arrow_points() {
            self.x = x1.min(x2);
            self.y = y1.min(y2);
            self.width = (x2 - x1).abs();
            self.height = (y2 - y1).abs();
        }
    }

    /// Move the object by a delta in surface pixels
    pub fn translate(&mut self, dx: f32, dy: f32) {
        match self.arrow_points() {
            Some([x1, y1, x2, y2]) => self.set_arrow_points([x1 + dx, y1 + dy, x2 + dx, y2 + dy]),
            None => {
                self.x += dx;
                self.y += dy;
            }
        }
    }

    /// Replace the text of a text-bearing object; returns false for other variants
    pub fn set_text(&mut self, new_text: impl Into<String>) -> bool {
        match &mut self.kind {
            ShapeKind::Text { text, .. } | ShapeKind::Note { text, .. } => {
                *text = new_text.into();
                true
            }
            _ => false,
        }
    }

    /// Express a surface-space point in the object's unrotated frame
    pub fn to_local(&self, px: f32, py: f32) -> (f32, f32) {
        let (cx, cy) = self.center();
        rotate_about(px, py, cx, cy, -self.angle)
    }

    /// Express a point in the object's unrotated frame in surface space
    pub fn to_world(&self, lx: f32, ly: f32) -> (f32, f32) {
        let (cx, cy) = self.center();
        rotate_about(lx, ly, cx, cy, self.angle)
    }

    /// Check if a surface-space point hits this object
    pub fn hit_test(&self, px: f32, py: f32, tolerance: f32) -> bool {
        if let Some([x1, y1, x2, y2]) = self.arrow_points() {
            let start = Point::new(x1, y1);
            let end = Point::new(x2, y2);
            return crate::geometry::point_to_segment_distance(&Point::new(px, py), &start, &end)
                <= tolerance;
        }

        let (lx, ly) = self.to_local(px, py);
        match self.kind {
            ShapeKind::Circle => {
                let (cx, cy) = self.center();
                let radius = self.width.min(self.height) / 2.0;
                ((lx - cx).powi(2) + (ly - cy).powi(2)).sqrt() <= radius + tolerance
            }
            _ => {
                lx >= self.x - tolerance
                    && lx <= self.x + self.width + tolerance
                    && ly >= self.y - tolerance
                    && ly <= self.y + self.height + tolerance
            }
        }
    }
}

/// Rotate `(x, y)` around `(cx, cy)` by `degrees` (clockwise in y-down space)
pub fn rotate_about(x: f32, y: f32, cx: f32, cy: f32, degrees: f32) -> (f32, f32) {
    if degrees == 0.0 {
        return (x, y);
    }
    let (sin, cos) = degrees.to_radians().sin_cos();
    let dx = x - cx;
    let dy = y - cy;
    (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
}
