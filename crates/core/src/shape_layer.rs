//! Vector shape layer
//!
//! Interactive object graph above the raster surface: placement, selection,
//! move/resize/rotate and inline text editing of shape objects. The layer
//! works on copies of the current page's shapes and reports every
//! create/update/delete as a [`ShapeChange`] carrying a normalized record;
//! the annotation store stays the only owner of persisted state.

use crate::annotation::{ShapeId, ShapeKind, ShapeObject, ShapeStyle};
use crate::config::{Tool, ToolContext};
use crate::coords::{normalize_shape, rescale_shape, rescale_xy, resolve_shape, SurfaceSize};
use crate::manipulation::{apply_handle_drag, generate_handles, handle_at, HandleType, ManipulationHandle};
use crate::text_edit::{resolve_edit, EditOutcome, EditRequest, EditResult, EditSession};

/// A change the store has to apply
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeChange {
    Created(ShapeObject),
    Updated(ShapeObject),
    Deleted { page_number: u32, id: ShapeId },
}

/// Result of feeding one input event to the layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerResponse {
    pub changes: Vec<ShapeChange>,
    /// Set when the host should open an inline text input
    pub edit_request: Option<EditRequest>,
}

impl LayerResponse {
    fn change(change: ShapeChange) -> Self {
        Self { changes: vec![change], edit_request: None }
    }

    fn edit(request: EditRequest) -> Self {
        Self { changes: Vec::new(), edit_request: Some(request) }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.edit_request.is_none()
    }
}

#[derive(Debug, Clone, Default)]
enum Interaction {
    #[default]
    Idle,
    /// Press-drag-release creation of an arrow, rectangle or circle
    Drawing { origin: (f32, f32), preview: ShapeObject },
    Moving { original: ShapeObject, grab: (f32, f32) },
    Transforming { original: ShapeObject, handle: HandleType },
}

#[derive(Debug, Default)]
pub struct ShapeLayer {
    page_number: u32,
    surface: SurfaceSize,
    objects: Vec<ShapeObject>,
    selected: Option<ShapeId>,
    interaction: Interaction,
    editing: Option<EditSession>,
}

impl ShapeLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the interactive graph with a page's shapes
    ///
    /// Any selection, drag or edit session of the previous page is dropped.
    pub fn load_page(&mut self, page_number: u32, shapes: &[ShapeObject], surface: SurfaceSize) {
        self.page_number = page_number;
        self.surface = surface;
        self.objects = shapes
            .iter()
            .cloned()
            .map(|mut shape| {
                resolve_shape(&mut shape, surface);
                shape
            })
            .collect();
        self.selected = None;
        self.interaction = Interaction::Idle;
        self.editing = None;
    }

    /// Surface size changed (zoom or re-render): regenerate absolute geometry
    ///
    /// A drag in progress keeps going: its starting shape, grab point and
    /// preview are carried over to the new surface.
    pub fn set_surface(&mut self, surface: SurfaceSize) {
        let previous = std::mem::replace(&mut self.surface, surface);
        for shape in &mut self.objects {
            resolve_shape(shape, surface);
        }
        if let Some(session) = &mut self.editing {
            resolve_shape(&mut session.original, surface);
        }

        match &mut self.interaction {
            Interaction::Idle => {}
            Interaction::Drawing { origin, preview } => {
                *origin = rescale_xy(origin.0, origin.1, previous, surface);
                rescale_shape(preview, previous, surface);
            }
            Interaction::Moving { original, grab } => {
                *grab = rescale_xy(grab.0, grab.1, previous, surface);
                rescale_shape(original, previous, surface);
            }
            Interaction::Transforming { original, .. } => rescale_shape(original, previous, surface),
        }
        let dragged = match &self.interaction {
            Interaction::Moving { original, .. } | Interaction::Transforming { original, .. } => {
                Some(original.clone())
            }
            _ => None,
        };
        if let Some(original) = dragged {
            self.replace_object(original);
        }
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Objects in paint order (last is topmost)
    pub fn objects(&self) -> &[ShapeObject] {
        &self.objects
    }

    /// Shape being drawn by press-drag-release, if any
    pub fn preview(&self) -> Option<&ShapeObject> {
        match &self.interaction {
            Interaction::Drawing { preview, .. } => Some(preview),
            _ => None,
        }
    }

    pub fn selected(&self) -> Option<&ShapeObject> {
        let id = self.selected?;
        self.objects.iter().find(|shape| shape.id == id)
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn is_interacting(&self) -> bool {
        !matches!(self.interaction, Interaction::Idle)
    }

    /// Handles of the selected shape
    pub fn handles(&self, ctx: &ToolContext<'_>) -> Vec<ManipulationHandle> {
        self.selected()
            .map(|shape| generate_handles(shape, ctx.config.handle_size, ctx.config.rotation_handle_offset))
            .unwrap_or_default()
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    fn topmost_at(&self, x: f32, y: f32, tolerance: f32) -> Option<&ShapeObject> {
        self.objects.iter().rev().find(|shape| shape.hit_test(x, y, tolerance))
    }

    fn replace_object(&mut self, shape: ShapeObject) {
        match self.objects.iter_mut().find(|existing| existing.id == shape.id) {
            Some(existing) => *existing = shape,
            None => self.objects.push(shape),
        }
    }

    fn remove_object(&mut self, id: ShapeId) {
        self.objects.retain(|shape| shape.id != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
    }

    fn normalized(&self, mut shape: ShapeObject) -> ShapeObject {
        normalize_shape(&mut shape, self.surface);
        shape
    }

    pub fn pointer_down(&mut self, ctx: &ToolContext<'_>, x: f32, y: f32) -> LayerResponse {
        if self.editing.is_some() {
            log::debug!("pointer down ignored while a text edit is open");
            return LayerResponse::default();
        }
        let tolerance = ctx.config.hit_tolerance;

        if let Some(selected) = self.selected().cloned() {
            let handles = self.handles(ctx);
            if let Some(handle) = handle_at(&handles, x, y, tolerance) {
                self.interaction = Interaction::Transforming { original: selected, handle };
                return LayerResponse::default();
            }
        }

        if let Some(hit) = self.topmost_at(x, y, tolerance).cloned() {
            self.selected = Some(hit.id);
            self.interaction = Interaction::Moving { original: hit, grab: (x, y) };
            return LayerResponse::default();
        }

        self.selected = None;
        let tool = ctx.settings.tool;
        if tool.places_on_click() {
            self.place(ctx, tool, x, y)
        } else if tool.places_on_drag() {
            let preview = match tool {
                Tool::Arrow => ShapeObject::arrow(ctx.page_number, (x, y), (x, y), shape_style(ctx)),
                Tool::Circle => self.new_box(ctx, ShapeKind::Circle, x, y, 0.0, 0.0),
                _ => self.new_box(ctx, ShapeKind::Rectangle, x, y, 0.0, 0.0),
            };
            self.interaction = Interaction::Drawing { origin: (x, y), preview };
            LayerResponse::default()
        } else {
            LayerResponse::default()
        }
    }

    pub fn pointer_move(&mut self, ctx: &ToolContext<'_>, x: f32, y: f32) {
        let transformed = match &mut self.interaction {
            Interaction::Idle => None,
            Interaction::Drawing { origin, preview } => {
                update_preview(preview, *origin, x, y);
                None
            }
            Interaction::Moving { original, grab } => {
                let mut moved = original.clone();
                moved.translate(x - grab.0, y - grab.1);
                Some(moved)
            }
            Interaction::Transforming { original, handle } => {
                Some(apply_handle_drag(original, *handle, x, y, ctx.config.min_shape_size))
            }
        };
        if let Some(shape) = transformed {
            self.replace_object(shape);
        }
    }

    pub fn pointer_up(&mut self, ctx: &ToolContext<'_>, x: f32, y: f32) -> LayerResponse {
        self.pointer_move(ctx, x, y);

        match std::mem::take(&mut self.interaction) {
            Interaction::Idle => LayerResponse::default(),
            Interaction::Drawing { preview, .. } => {
                if is_too_small(&preview, ctx) {
                    log::debug!(
                        "discarding {} of {}x{} as an accidental click",
                        preview.kind.name(),
                        preview.width,
                        preview.height
                    );
                    return LayerResponse::default();
                }
                let shape = self.normalized(preview);
                self.objects.push(shape.clone());
                self.selected = Some(shape.id);
                LayerResponse::change(ShapeChange::Created(shape))
            }
            Interaction::Moving { original, .. } | Interaction::Transforming { original, .. } => {
                let Some(current) = self.objects.iter().find(|shape| shape.id == original.id).cloned()
                else {
                    return LayerResponse::default();
                };
                if current == original {
                    return LayerResponse::default();
                }
                let shape = self.normalized(current);
                self.replace_object(shape.clone());
                LayerResponse::change(ShapeChange::Updated(shape))
            }
        }
    }

    /// Abort a drag, restoring the shape it started from
    pub fn cancel_interaction(&mut self) {
        match std::mem::take(&mut self.interaction) {
            Interaction::Moving { original, .. } | Interaction::Transforming { original, .. } => {
                self.replace_object(original);
            }
            Interaction::Drawing { .. } | Interaction::Idle => {}
        }
    }

    /// Open an edit session on the topmost text-bearing shape under the point
    pub fn double_click(&mut self, ctx: &ToolContext<'_>, x: f32, y: f32) -> LayerResponse {
        if self.editing.is_some() {
            return LayerResponse::default();
        }
        self.cancel_interaction();

        let Some(shape) = self.topmost_at(x, y, ctx.config.hit_tolerance).cloned() else {
            return LayerResponse::default();
        };
        if !shape.kind.is_text_bearing() {
            return LayerResponse::default();
        }
        self.selected = Some(shape.id);
        self.begin_edit(shape, false)
    }

    fn begin_edit(&mut self, shape: ShapeObject, is_placeholder: bool) -> LayerResponse {
        let session = EditSession::new(shape, is_placeholder);
        let request = session.request();
        self.editing = Some(session);
        LayerResponse::edit(request)
    }

    /// Apply the host's answer to the open edit session
    pub fn finish_edit(&mut self, result: EditResult) -> LayerResponse {
        let Some(session) = self.editing.take() else {
            log::warn!("edit result received with no open edit session");
            return LayerResponse::default();
        };

        match resolve_edit(session, result) {
            EditOutcome::Create(shape) => {
                let shape = self.normalized(shape);
                self.replace_object(shape.clone());
                LayerResponse::change(ShapeChange::Created(shape))
            }
            EditOutcome::Update(shape) => {
                let shape = self.normalized(shape);
                self.replace_object(shape.clone());
                LayerResponse::change(ShapeChange::Updated(shape))
            }
            EditOutcome::Delete(id) => {
                self.remove_object(id);
                LayerResponse::change(ShapeChange::Deleted { page_number: self.page_number, id })
            }
            EditOutcome::Revert(shape) => {
                self.replace_object(shape);
                LayerResponse::default()
            }
            EditOutcome::Discard(id) => {
                self.remove_object(id);
                LayerResponse::default()
            }
        }
    }

    pub fn delete_selected(&mut self) -> LayerResponse {
        if self.editing.is_some() {
            return LayerResponse::default();
        }
        let Some(id) = self.selected else {
            return LayerResponse::default();
        };
        self.interaction = Interaction::Idle;
        self.remove_object(id);
        LayerResponse::change(ShapeChange::Deleted { page_number: self.page_number, id })
    }

    fn new_box(
        &self,
        ctx: &ToolContext<'_>,
        kind: ShapeKind,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> ShapeObject {
        ShapeObject::new(ctx.page_number, kind, x, y, width, height, shape_style(ctx))
    }

    fn place(&mut self, ctx: &ToolContext<'_>, tool: Tool, x: f32, y: f32) -> LayerResponse {
        let settings = ctx.settings;
        let config = ctx.config;

        match tool {
            Tool::Text => {
                let kind = ShapeKind::Text {
                    text: config.text_placeholder.clone(),
                    font_family: settings.font_family.clone(),
                };
                let (width, height) = config.text_box_size;
                let shape = self.normalized(self.new_box(ctx, kind, x, y, width, height));
                self.objects.push(shape.clone());
                self.selected = Some(shape.id);
                self.begin_edit(shape, true)
            }
            Tool::Note => {
                let kind = ShapeKind::Note {
                    text: config.note_placeholder.clone(),
                    font_family: settings.font_family.clone(),
                    note_color: settings.note_color,
                };
                let (width, height) = config.note_size;
                let mut shape = self.new_box(ctx, kind, x, y, width, height);
                shape.style.fill = Some(settings.note_color);
                let shape = self.normalized(shape);
                self.objects.push(shape.clone());
                self.selected = Some(shape.id);
                self.begin_edit(shape, true)
            }
            Tool::Stamp => {
                let Some(stamp) = settings.active_stamp.as_deref().and_then(|id| ctx.catalog.get(id))
                else {
                    log::warn!("stamp tool used without a known active stamp ({:?})", settings.active_stamp);
                    return LayerResponse::default();
                };
                let kind = ShapeKind::Stamp { stamp_id: stamp.id.clone(), stamp_svg: stamp.svg.clone() };
                let (width, height) = config.stamp_size;
                let shape = self.normalized(self.new_box(ctx, kind, x, y, width, height));
                self.objects.push(shape.clone());
                self.selected = Some(shape.id);
                LayerResponse::change(ShapeChange::Created(shape))
            }
            _ => LayerResponse::default(),
        }
    }
}

fn shape_style(ctx: &ToolContext<'_>) -> ShapeStyle {
    ShapeStyle {
        color: ctx.settings.color,
        stroke_width: ctx.settings.line_width,
        fill: None,
        font_size: ctx.settings.font_size,
        opacity: 1.0,
    }
}

fn update_preview(preview: &mut ShapeObject, origin: (f32, f32), x: f32, y: f32) {
    match preview.kind {
        ShapeKind::Arrow { .. } => preview.set_arrow_points([origin.0, origin.1, x, y]),
        ShapeKind::Circle => {
            let radius = ((x - origin.0).powi(2) + (y - origin.1).powi(2)).sqrt();
            preview.x = origin.0 - radius;
            preview.y = origin.1 - radius;
            preview.width = radius * 2.0;
            preview.height = radius * 2.0;
        }
        _ => {
            preview.x = origin.0.min(x);
            preview.y = origin.1.min(y);
            preview.width = (x - origin.0).abs();
            preview.height = (y - origin.1).abs();
        }
    }
}

/// Drag-created shapes below the configured size are accidental clicks
fn is_too_small(shape: &ShapeObject, ctx: &ToolContext<'_>) -> bool {
    let config = ctx.config;
    match shape.kind {
        ShapeKind::Arrow { points, .. } => {
            let length = ((points[2] - points[0]).powi(2) + (points[3] - points[1]).powi(2)).sqrt();
            length < config.min_shape_size
        }
        ShapeKind::Circle => shape.width / 2.0 < config.min_shape_radius,
        _ => shape.width < config.min_shape_size || shape.height < config.min_shape_size,
    }
}
