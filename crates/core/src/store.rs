//! Annotation store
//!
//! Authoritative per-page collections of stroke paths and shape objects.
//! Each page slot is replaced wholesale on mutation (copy-on-write), so any
//! snapshot handed out earlier, whether to a reader or to the history stacks,
//! keeps seeing the state it was taken from.

use crate::annotation::{ShapeId, ShapeObject, StrokePath, StrokeTool};
use crate::coords::{resolve_points, SurfaceSize};
use crate::geometry::split_stroke_by_eraser;
use crate::history::{HistoryEntry, HistoryManager, DEFAULT_HISTORY_CAP};
use crate::persistence::{AnnotationSink, AnnotationSnapshot};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Page-number keyed slots holding immutable sequences
///
/// A missing key and an empty sequence read identically.
#[derive(Debug)]
pub struct PageSlots<T> {
    slots: Arc<BTreeMap<u32, Arc<[T]>>>,
}

impl<T> Clone for PageSlots<T> {
    fn clone(&self) -> Self {
        Self { slots: Arc::clone(&self.slots) }
    }
}

impl<T> Default for PageSlots<T> {
    fn default() -> Self {
        Self { slots: Arc::new(BTreeMap::new()) }
    }
}

impl<T: Clone> PageSlots<T> {
    /// Shared handle to a page's sequence (empty when absent)
    pub fn get(&self, page: u32) -> Arc<[T]> {
        self.slots.get(&page).cloned().unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub fn len_of(&self, page: u32) -> usize {
        self.slots.get(&page).map_or(0, |items| items.len())
    }

    /// Replace a page's sequence; empty sequences are kept as entries
    pub fn replace(&mut self, page: u32, items: Arc<[T]>) {
        Arc::make_mut(&mut self.slots).insert(page, items);
    }

    /// Pages with a slot, including empty ones
    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.keys().copied()
    }

    pub fn total_len(&self) -> usize {
        self.slots.values().map(|items| items.len()).sum()
    }

    fn to_map(&self) -> BTreeMap<u32, Vec<T>> {
        self.slots.iter().map(|(page, items)| (*page, items.to_vec())).collect()
    }

    fn from_map(map: BTreeMap<u32, Vec<T>>) -> Self {
        Self { slots: Arc::new(map.into_iter().map(|(page, items)| (page, Arc::from(items))).collect()) }
    }
}

fn appended<T: Clone>(items: &[T], item: T) -> Arc<[T]> {
    let mut next = items.to_vec();
    next.push(item);
    Arc::from(next)
}

/// Owner of every stroke path and shape object of one open document
pub struct AnnotationStore {
    paths: PageSlots<StrokePath>,
    shapes: PageSlots<ShapeObject>,
    history: HistoryManager,
    current_page: u32,
    sink: Option<Box<dyn AnnotationSink>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::with_history_cap(DEFAULT_HISTORY_CAP)
    }

    pub fn with_history_cap(cap: usize) -> Self {
        Self {
            paths: PageSlots::default(),
            shapes: PageSlots::default(),
            history: HistoryManager::new(cap),
            current_page: 1,
            sink: None,
        }
    }

    /// Install the persistence hook called after every mutation
    pub fn set_sink(&mut self, sink: Box<dyn AnnotationSink>) {
        self.sink = Some(sink);
    }

    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Switch the page the derived views read from (pages are 1-based)
    pub fn set_current_page(&mut self, page: u32) {
        self.current_page = page.max(1);
    }

    pub fn paths_for_page(&self, page: u32) -> Arc<[StrokePath]> {
        self.paths.get(page)
    }

    pub fn shapes_for_page(&self, page: u32) -> Arc<[ShapeObject]> {
        self.shapes.get(page)
    }

    pub fn current_page_paths(&self) -> Arc<[StrokePath]> {
        self.paths_for_page(self.current_page)
    }

    pub fn current_page_shapes(&self) -> Arc<[ShapeObject]> {
        self.shapes_for_page(self.current_page)
    }

    pub fn find_shape(&self, page: u32, id: ShapeId) -> Option<ShapeObject> {
        self.shapes.get(page).iter().find(|shape| shape.id == id).cloned()
    }

    /// Consistent read-only view of every path collection
    pub fn path_slots(&self) -> PageSlots<StrokePath> {
        self.paths.clone()
    }

    pub fn shape_slots(&self) -> PageSlots<ShapeObject> {
        self.shapes.clone()
    }

    /// Append a stroke path to a page, recording the previous state for undo
    pub fn add_path(&mut self, page: u32, path: StrokePath) {
        let before = self.paths.get(page);
        self.history.record(HistoryEntry::new(page, Arc::clone(&before)));
        self.paths.replace(page, appended(&before, path));
        self.emit();
    }

    /// Split every ink path on `page` against an eraser stroke
    ///
    /// The eraser is in pixels of a surface of `size`; stored points are
    /// resolved against the same surface before testing. Returns true when
    /// anything was erased. Erasing goes through the same snapshot recording
    /// as [`Self::add_path`]; an eraser that touches nothing leaves history
    /// untouched.
    pub fn erase(&mut self, page: u32, eraser: &StrokePath, tolerance: f32, size: SurfaceSize) -> bool {
        let before = self.paths.get(page);
        let after: Vec<StrokePath> = before
            .iter()
            .flat_map(|path| {
                if path.tool == StrokeTool::Eraser {
                    return vec![path.clone()];
                }
                let resolved = path.with_points(resolve_points(&path.points, size));
                let parts = split_stroke_by_eraser(&resolved, eraser, tolerance);
                match parts.as_slice() {
                    [untouched] if untouched.points == resolved.points => vec![path.clone()],
                    _ => parts,
                }
            })
            .collect();

        if after.as_slice() == &before[..] {
            return false;
        }

        log::debug!("eraser on page {page}: {} paths -> {}", before.len(), after.len());
        self.history.record(HistoryEntry::new(page, before));
        self.paths.replace(page, Arc::from(after));
        self.emit();
        true
    }

    /// Remove all ink from a page (undoable)
    pub fn clear_page_paths(&mut self, page: u32) -> bool {
        let before = self.paths.get(page);
        if before.is_empty() {
            return false;
        }
        self.history.record(HistoryEntry::new(page, before));
        self.paths.replace(page, Arc::from(Vec::new()));
        self.emit();
        true
    }

    /// Restore the most recent snapshot; no-op returning `None` when empty
    ///
    /// Returns the page that changed.
    pub fn undo(&mut self) -> Option<u32> {
        let entry = self.history.pop_undo()?;
        let page = entry.page_number;
        self.history.push_redo(HistoryEntry::new(page, self.paths.get(page)));
        self.paths.replace(page, entry.paths);
        self.emit();
        Some(page)
    }

    /// Mirror of [`Self::undo`]
    pub fn redo(&mut self) -> Option<u32> {
        let entry = self.history.pop_redo()?;
        let page = entry.page_number;
        self.history.push_undo(HistoryEntry::new(page, self.paths.get(page)));
        self.paths.replace(page, entry.paths);
        self.emit();
        Some(page)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Add a shape object to a page (not recorded in history)
    pub fn add_shape(&mut self, page: u32, shape: ShapeObject) {
        let before = self.shapes.get(page);
        self.shapes.replace(page, appended(&before, shape));
        self.emit();
    }

    /// Replace the shape with the same ID; false when it is not on the page
    pub fn update_shape(&mut self, page: u32, shape: ShapeObject) -> bool {
        let before = self.shapes.get(page);
        let Some(index) = before.iter().position(|existing| existing.id == shape.id) else {
            log::warn!("update for unknown shape {} on page {page}", shape.id);
            return false;
        };
        let mut next = before.to_vec();
        next[index] = shape;
        self.shapes.replace(page, Arc::from(next));
        self.emit();
        true
    }

    /// Remove a shape object; false when it is not on the page
    pub fn delete_shape(&mut self, page: u32, id: ShapeId) -> bool {
        let before = self.shapes.get(page);
        if !before.iter().any(|shape| shape.id == id) {
            return false;
        }
        let next: Vec<ShapeObject> = before.iter().filter(|shape| shape.id != id).cloned().collect();
        self.shapes.replace(page, Arc::from(next));
        self.emit();
        true
    }

    /// Serializable copy of every collection
    pub fn snapshot(&self) -> AnnotationSnapshot {
        AnnotationSnapshot { paths: self.paths.to_map(), shapes: self.shapes.to_map() }
    }

    /// Replace all collections with a loaded snapshot and start a fresh history
    pub fn restore(&mut self, snapshot: AnnotationSnapshot) {
        log::info!(
            "restoring {} paths and {} shapes",
            snapshot.path_count(),
            snapshot.shape_count()
        );
        self.paths = PageSlots::from_map(snapshot.paths);
        self.shapes = PageSlots::from_map(snapshot.shapes);
        self.history.clear();
    }

    fn emit(&mut self) {
        if self.sink.is_none() {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(sink) = self.sink.as_mut() {
            sink.annotations_changed(&snapshot);
        }
    }
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Color, Point, ShapeKind, ShapeStyle};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn path(page: u32, x: f32) -> StrokePath {
        StrokePath::new(
            StrokeTool::Pencil,
            Color::BLACK,
            2.0,
            page,
            vec![Point::new(x, 0.0), Point::new(x, 10.0)],
        )
    }

    fn rect(page: u32) -> ShapeObject {
        ShapeObject::new(page, ShapeKind::Rectangle, 0.0, 0.0, 20.0, 20.0, ShapeStyle::default())
    }

    #[test]
    fn test_empty_page_reads_empty() {
        let store = AnnotationStore::new();
        assert!(store.current_page_paths().is_empty());
        assert!(store.current_page_shapes().is_empty());
        assert!(store.paths_for_page(99).is_empty());
    }

    #[test]
    fn test_add_path_and_current_page_view() {
        let mut store = AnnotationStore::new();
        store.add_path(1, path(1, 0.0));
        store.add_path(2, path(2, 5.0));

        assert_eq!(store.current_page_paths().len(), 1);
        store.set_current_page(2);
        assert_eq!(store.current_page_paths()[0].points[0].x, 5.0);
    }

    #[test]
    fn test_undo_redo_inverse() {
        let mut store = AnnotationStore::new();
        store.add_path(1, path(1, 0.0));
        store.add_path(1, path(1, 1.0));
        store.add_path(1, path(1, 2.0));

        let before = store.paths_for_page(1);
        assert_eq!(store.undo(), Some(1));
        assert_eq!(store.paths_for_page(1).len(), 2);
        assert_eq!(store.redo(), Some(1));
        assert_eq!(store.paths_for_page(1), before);
    }

    #[test]
    fn test_undo_to_empty_keeps_page_entry() {
        let mut store = AnnotationStore::new();
        store.add_path(3, path(3, 0.0));
        store.undo();

        assert!(store.paths_for_page(3).is_empty());
        assert!(store.path_slots().pages().any(|page| page == 3));

        store.redo();
        assert_eq!(store.paths_for_page(3).len(), 1);
        store.undo();
        assert!(store.paths_for_page(3).is_empty());
    }

    #[test]
    fn test_history_cap() {
        let mut store = AnnotationStore::new();
        for i in 0..60 {
            store.add_path(1, path(1, i as f32));
        }
        assert_eq!(store.history().undo_len(), 50);

        while store.undo().is_some() {}
        // The ten oldest snapshots were evicted
        assert_eq!(store.paths_for_page(1).len(), 10);
    }

    #[test]
    fn test_underflow_is_noop() {
        let mut store = AnnotationStore::new();
        assert_eq!(store.undo(), None);
        assert_eq!(store.redo(), None);
    }

    #[test]
    fn test_new_path_clears_redo() {
        let mut store = AnnotationStore::new();
        store.add_path(1, path(1, 0.0));
        store.undo();
        assert!(store.can_redo());
        store.add_path(1, path(1, 1.0));
        assert!(!store.can_redo());
    }

    #[test]
    fn test_readers_keep_old_snapshot() {
        let mut store = AnnotationStore::new();
        store.add_path(1, path(1, 0.0));
        let view = store.path_slots();
        store.add_path(1, path(1, 1.0));

        assert_eq!(view.len_of(1), 1);
        assert_eq!(store.paths_for_page(1).len(), 2);
    }

    #[test]
    fn test_erase_splits_and_is_undoable() {
        let mut store = AnnotationStore::new();
        let ink = StrokePath::new(
            StrokeTool::Pencil,
            Color::BLACK,
            2.0,
            1,
            (0..5).map(|i| Point::new(i as f32 * 10.0, 0.0)).collect(),
        );
        store.add_path(1, ink);
        let eraser = StrokePath::new(
            StrokeTool::Eraser,
            Color::BLACK,
            4.0,
            1,
            vec![Point::new(20.0, -5.0), Point::new(20.0, 5.0)],
        );

        assert!(store.erase(1, &eraser, 0.0, SurfaceSize::new(100.0, 100.0)));
        assert_eq!(store.paths_for_page(1).len(), 2);

        store.undo();
        assert_eq!(store.paths_for_page(1).len(), 1);
    }

    #[test]
    fn test_erase_miss_records_nothing() {
        let mut store = AnnotationStore::new();
        store.add_path(1, path(1, 0.0));
        let far = StrokePath::new(
            StrokeTool::Eraser,
            Color::BLACK,
            4.0,
            1,
            vec![Point::new(500.0, 500.0), Point::new(510.0, 500.0)],
        );
        assert!(!store.erase(1, &far, 2.0, SurfaceSize::new(100.0, 100.0)));
        assert_eq!(store.history().undo_len(), 1);
    }

    #[test]
    fn test_erase_resolves_relative_points() {
        let mut store = AnnotationStore::new();
        // Captured on a 100px surface, erased on a 200px one
        let ink = StrokePath::new(
            StrokeTool::Pencil,
            Color::BLACK,
            2.0,
            1,
            (0..5).map(|i| Point::new(i as f32 * 10.0, 10.0).with_relative(i as f32 * 0.1, 0.1)).collect(),
        );
        store.add_path(1, ink.clone());
        let eraser = StrokePath::new(
            StrokeTool::Eraser,
            Color::BLACK,
            4.0,
            1,
            vec![Point::new(40.0, 10.0), Point::new(40.0, 30.0)],
        );

        assert!(store.erase(1, &eraser, 0.0, SurfaceSize::new(200.0, 200.0)));
        let pieces = store.paths_for_page(1);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].points.len(), 2);
        assert_eq!(pieces[0].points[0].relative(), ink.points[0].relative());
    }

    #[test]
    fn test_shapes_outside_history() {
        let mut store = AnnotationStore::new();
        let mut shape = rect(1);
        store.add_shape(1, shape.clone());
        assert!(!store.can_undo());

        shape.x = 40.0;
        assert!(store.update_shape(1, shape.clone()));
        assert_eq!(store.find_shape(1, shape.id).unwrap().x, 40.0);

        assert!(!store.update_shape(2, shape.clone()));
        assert!(store.delete_shape(1, shape.id));
        assert!(!store.delete_shape(1, shape.id));
        assert!(store.shapes_for_page(1).is_empty());
        assert!(!store.can_undo());
    }

    #[test]
    fn test_sink_receives_every_mutation() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let recorder = Rc::clone(&seen);

        let mut store = AnnotationStore::new();
        store.set_sink(Box::new(move |snapshot: &AnnotationSnapshot| {
            recorder.borrow_mut().push((snapshot.path_count(), snapshot.shape_count()));
        }));

        store.add_path(1, path(1, 0.0));
        store.add_shape(1, rect(1));
        store.undo();

        assert_eq!(*seen.borrow(), vec![(1, 0), (1, 1), (0, 1)]);
    }

    #[test]
    fn test_restore_resets_history() {
        let mut store = AnnotationStore::new();
        store.add_path(1, path(1, 0.0));
        let snapshot = store.snapshot();

        let mut reloaded = AnnotationStore::new();
        reloaded.restore(snapshot.clone());
        assert_eq!(reloaded.snapshot(), snapshot);
        assert!(!reloaded.can_undo());
    }
}
