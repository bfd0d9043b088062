//! Undo/redo history for stroke paths
//!
//! Entries are page-scoped snapshots of a page's stroke sequence. Snapshots
//! share their storage with the store's page slots, so recording one is cheap.

use crate::annotation::StrokePath;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default maximum number of undo entries
pub const DEFAULT_HISTORY_CAP: usize = 50;

/// Snapshot of one page's stroke paths
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub page_number: u32,
    pub paths: Arc<[StrokePath]>,
}

impl HistoryEntry {
    pub fn new(page_number: u32, paths: Arc<[StrokePath]>) -> Self {
        Self { page_number, paths }
    }
}

/// Bounded undo and redo stacks
#[derive(Debug, Clone)]
pub struct HistoryManager {
    /// Most recent entry at the back
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    cap: usize,
}

impl HistoryManager {
    pub fn new(cap: usize) -> Self {
        Self { undo_stack: VecDeque::new(), redo_stack: VecDeque::new(), cap: cap.max(1) }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Record a pre-mutation snapshot: pushes onto undo and clears redo
    pub fn record(&mut self, entry: HistoryEntry) {
        self.redo_stack.clear();
        push_capped(&mut self.undo_stack, entry, self.cap);
    }

    pub fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.undo_stack.pop_back()
    }

    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo_stack.pop_back()
    }

    /// Push onto undo without touching redo (used by redo)
    pub fn push_undo(&mut self, entry: HistoryEntry) {
        push_capped(&mut self.undo_stack, entry, self.cap);
    }

    /// Push onto redo (used by undo)
    pub fn push_redo(&mut self, entry: HistoryEntry) {
        push_capped(&mut self.redo_stack, entry, self.cap);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

fn push_capped(stack: &mut VecDeque<HistoryEntry>, entry: HistoryEntry, cap: usize) {
    stack.push_back(entry);
    while stack.len() > cap {
        if let Some(evicted) = stack.pop_front() {
            log::debug!("history cap {cap} reached, evicting entry for page {}", evicted.page_number);
        }
    }
}
