//! Engine configuration and tool settings
//!
//! [`EngineConfig`] holds tuning values that rarely change during a session;
//! [`ToolSettings`] is the host-selected tool and style. Both are passed
//! explicitly to every drawing and placement call through [`ToolContext`].

use crate::annotation::{Color, StrokeTool};
use crate::coords::SurfaceSize;
use crate::error::{AnnotatorError, AnnotatorResult};
use crate::history::DEFAULT_HISTORY_CAP;
use crate::stamp::StampCatalog;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunable engine behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of undo entries
    pub history_cap: usize,
    /// Drag-created rectangles and arrows below this size (px) are discarded
    pub min_shape_size: f32,
    /// Drag-created circles below this radius (px) are discarded
    pub min_shape_radius: f32,
    /// Douglas-Peucker tolerance applied before a stroke is stored
    pub simplify_tolerance: f32,
    pub highlight_width_factor: f32,
    pub eraser_width_factor: f32,
    /// Translucency of live and rendered highlight strokes
    pub highlight_alpha: f32,
    /// Extra distance (px) accepted when hit-testing shapes and handles
    pub hit_tolerance: f32,
    pub handle_size: f32,
    /// Distance of the rotation handle above a shape's box
    pub rotation_handle_offset: f32,
    pub text_box_size: (f32, f32),
    pub note_size: (f32, f32),
    pub stamp_size: (f32, f32),
    pub text_placeholder: String,
    pub note_placeholder: String,
    /// Load system fonts for text rendering
    pub load_system_fonts: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_cap: DEFAULT_HISTORY_CAP,
            min_shape_size: 5.0,
            min_shape_radius: 3.0,
            simplify_tolerance: 1.0,
            highlight_width_factor: 3.0,
            eraser_width_factor: 2.0,
            highlight_alpha: 0.4,
            hit_tolerance: 4.0,
            handle_size: 6.0,
            rotation_handle_offset: 24.0,
            text_box_size: (160.0, 32.0),
            note_size: (180.0, 120.0),
            stamp_size: (140.0, 56.0),
            text_placeholder: "Type here".to_string(),
            note_placeholder: "Note".to_string(),
            load_system_fonts: true,
        }
    }
}

impl EngineConfig {
    /// Load a configuration file; missing fields take their defaults
    pub fn load(path: &Path) -> AnnotatorResult<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnnotatorResult<()> {
        if self.history_cap == 0 {
            return Err(AnnotatorError::InvalidConfig("history_cap must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.highlight_alpha) {
            return Err(AnnotatorError::InvalidConfig(format!(
                "highlight_alpha {} is outside 0..=1",
                self.highlight_alpha
            )));
        }
        if self.simplify_tolerance < 0.0 || self.min_shape_size < 0.0 || self.min_shape_radius < 0.0 {
            return Err(AnnotatorError::InvalidConfig("tolerances must not be negative".into()));
        }
        Ok(())
    }

    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }

    pub fn with_min_shape_size(mut self, size: f32) -> Self {
        self.min_shape_size = size;
        self
    }

    pub fn with_simplify_tolerance(mut self, tolerance: f32) -> Self {
        self.simplify_tolerance = tolerance;
        self
    }

    pub fn with_system_fonts(mut self, load: bool) -> Self {
        self.load_system_fonts = load;
        self
    }
}

/// Every tool the engine knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Pencil,
    Eraser,
    Highlight,
    Select,
    Text,
    Arrow,
    Note,
    Stamp,
    Rectangle,
    Circle,
}

impl Tool {
    /// Freehand tools that pass pointer events to the stroke rasterizer
    pub fn stroke_tool(self) -> Option<StrokeTool> {
        match self {
            Tool::Pencil => Some(StrokeTool::Pencil),
            Tool::Eraser => Some(StrokeTool::Eraser),
            Tool::Highlight => Some(StrokeTool::Highlight),
            _ => None,
        }
    }

    /// Tools that create an object with a single click
    pub fn places_on_click(self) -> bool {
        matches!(self, Tool::Text | Tool::Note | Tool::Stamp)
    }

    /// Tools that create an object by press-drag-release
    pub fn places_on_drag(self) -> bool {
        matches!(self, Tool::Arrow | Tool::Rectangle | Tool::Circle)
    }
}

/// Host-selected tool and style options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolSettings {
    pub tool: Tool,
    pub color: Color,
    pub line_width: f32,
    pub eraser_size: f32,
    pub highlight_color: Color,
    pub highlight_opacity: f32,
    pub note_color: Color,
    /// ID of the stamp placed by the stamp tool
    pub active_stamp: Option<String>,
    pub font_family: String,
    pub font_size: f32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: Tool::Pencil,
            color: Color::BLACK,
            line_width: 2.0,
            eraser_size: 10.0,
            highlight_color: Color::YELLOW,
            highlight_opacity: 0.4,
            note_color: Color::NOTE_YELLOW,
            active_stamp: None,
            font_family: "Helvetica".to_string(),
            font_size: 16.0,
        }
    }
}

impl ToolSettings {
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }

    pub fn with_stamp(mut self, stamp_id: impl Into<String>) -> Self {
        self.active_stamp = Some(stamp_id.into());
        self
    }
}

/// Everything a placement or drawing call needs to know about its environment
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub config: &'a EngineConfig,
    pub settings: &'a ToolSettings,
    pub catalog: &'a StampCatalog,
    pub page_number: u32,
    pub surface: SurfaceSize,
}
