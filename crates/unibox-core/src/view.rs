//! Windowed rendering and selection state
//!
//! Pure computation of the visible row window for unbounded lists, plus
//! single/multi selection with clamped keyboard navigation. No fetch
//! state leaks in here; callers react to the computed window.

use std::collections::HashSet;

/// Fixed row heights per density profile, in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowProfile {
    Compact,
    Comfortable,
}

impl RowProfile {
    pub fn row_height(&self) -> u32 {
        match self {
            RowProfile::Compact => 64,
            RowProfile::Comfortable => 84,
        }
    }
}

/// Inclusive index range of rows that must be materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    pub start: usize,
    pub stop: usize,
}

impl VisibleRange {
    /// Number of rows in the window; never zero, the empty case is
    /// `None` from `compute_visible_range`.
    pub fn rows(&self) -> usize {
        self.stop - self.start + 1
    }
}

/// Compute the `[start, stop]` row window for the given scroll offset
/// and viewport height. Returns `None` for an empty list.
pub fn compute_visible_range(
    scroll_offset: u32,
    viewport_height: u32,
    row_height: u32,
    item_count: usize,
) -> Option<VisibleRange> {
    if item_count == 0 || row_height == 0 {
        return None;
    }
    let start = (scroll_offset / row_height) as usize;
    let last_visible = ((scroll_offset + viewport_height).saturating_sub(1) / row_height) as usize;
    let start = start.min(item_count - 1);
    let stop = last_visible.min(item_count - 1);
    Some(VisibleRange { start, stop })
}

/// Selection over the currently rendered list. Entries always reference
/// rows of that list (message ids, or thread keys in thread view) and
/// are dropped when the referent leaves the filtered set.
#[derive(Debug, Default)]
pub struct Selection {
    /// Active row index for keyboard navigation
    active: Option<usize>,
    /// Single selection driving the detail view
    selected_id: Option<String>,
    /// Multi-selection driving bulk actions
    selected_ids: HashSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn selected_ids(&self) -> &HashSet<String> {
        &self.selected_ids
    }

    /// Select a single row for the detail view.
    pub fn select(&mut self, index: usize, id: impl Into<String>) {
        self.active = Some(index);
        self.selected_id = Some(id.into());
    }

    /// Toggle membership in the bulk-selection set.
    pub fn toggle(&mut self, id: &str) {
        if !self.selected_ids.remove(id) {
            self.selected_ids.insert(id.to_string());
        }
    }

    /// Move the active index by `delta`, clamped to `[0, len - 1]`.
    /// Returns the new index, or `None` when the list is empty.
    pub fn move_by(&mut self, delta: i64, len: usize) -> Option<usize> {
        if len == 0 {
            self.active = None;
            return None;
        }
        let current = self.active.map(|i| i as i64).unwrap_or(-1);
        let next = (current + delta).clamp(0, len as i64 - 1) as usize;
        self.active = Some(next);
        Some(next)
    }

    /// Drop any entry whose referent is no longer in the rendered list
    /// and clamp the active index to the rendered row count. Ids and
    /// rows are passed separately: a thread row covers several ids.
    pub fn prune(&mut self, rendered: &HashSet<String>, rows: usize) {
        self.selected_ids.retain(|id| rendered.contains(id));
        if let Some(id) = &self.selected_id {
            if !rendered.contains(id) {
                self.selected_id = None;
            }
        }
        if let Some(active) = self.active {
            if active >= rows {
                self.active = rows.checked_sub(1);
            }
        }
    }

    /// Clear everything; called after a bulk action completes.
    pub fn clear(&mut self) {
        self.active = None;
        self.selected_id = None;
        self.selected_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_range_basic_window() {
        // 64-unit rows, 640-unit viewport, scrolled to 128: rows 2..=11.
        let range = compute_visible_range(128, 640, RowProfile::Compact.row_height(), 100).unwrap();
        assert_eq!(range.start, 2);
        assert_eq!(range.stop, 11);
        assert_eq!(range.rows(), 10);
    }

    #[test]
    fn test_visible_range_clamps_to_item_count() {
        let range = compute_visible_range(0, 640, 64, 5).unwrap();
        assert_eq!(range.start, 0);
        assert_eq!(range.stop, 4);

        // Scrolled past the end: window pins to the last row.
        let range = compute_visible_range(10_000, 640, 64, 5).unwrap();
        assert_eq!(range.start, 4);
        assert_eq!(range.stop, 4);
    }

    #[test]
    fn test_visible_range_empty_list() {
        assert!(compute_visible_range(0, 640, 64, 0).is_none());
    }

    #[test]
    fn test_comfortable_profile_shows_fewer_rows() {
        let compact =
            compute_visible_range(0, 840, RowProfile::Compact.row_height(), 100).unwrap();
        let comfortable =
            compute_visible_range(0, 840, RowProfile::Comfortable.row_height(), 100).unwrap();
        assert!(comfortable.rows() < compact.rows());
        assert_eq!(comfortable.rows(), 10);
    }

    #[test]
    fn test_move_selection_clamps_at_both_ends() {
        let mut sel = Selection::new();
        assert_eq!(sel.move_by(1, 3), Some(0));
        assert_eq!(sel.move_by(1, 3), Some(1));
        assert_eq!(sel.move_by(1, 3), Some(2));
        // Moving next at the last index leaves the index unchanged.
        assert_eq!(sel.move_by(1, 3), Some(2));

        assert_eq!(sel.move_by(-1, 3), Some(1));
        assert_eq!(sel.move_by(-1, 3), Some(0));
        // Moving previous at index zero leaves the index unchanged.
        assert_eq!(sel.move_by(-1, 3), Some(0));
    }

    #[test]
    fn test_move_selection_on_empty_list() {
        let mut sel = Selection::new();
        assert_eq!(sel.move_by(1, 0), None);
        assert_eq!(sel.active_index(), None);
    }

    #[test]
    fn test_prune_drops_departed_referents() {
        let mut sel = Selection::new();
        sel.select(0, "a");
        sel.toggle("a");
        sel.toggle("b");
        sel.toggle("c");

        let rendered: HashSet<String> =
            ["a".to_string(), "c".to_string()].into_iter().collect();
        sel.prune(&rendered, 2);

        assert_eq!(sel.selected_id(), Some("a"));
        assert!(sel.selected_ids().contains("a"));
        assert!(!sel.selected_ids().contains("b"));
        assert!(sel.selected_ids().contains("c"));
    }

    #[test]
    fn test_prune_clamps_active_to_row_count() {
        let mut sel = Selection::new();
        sel.select(3, "a");

        // Five ids collapse into two thread rows; the active index
        // clamps against the row count, not the id count.
        let rendered: HashSet<String> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(String::from)
            .collect();
        sel.prune(&rendered, 2);

        assert_eq!(sel.active_index(), Some(1));
        assert_eq!(sel.selected_id(), Some("a"));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut sel = Selection::new();
        sel.select(2, "a");
        sel.toggle("b");
        sel.clear();
        assert_eq!(sel.active_index(), None);
        assert_eq!(sel.selected_id(), None);
        assert!(sel.selected_ids().is_empty());
    }
}
