//! Virtualization index: which rows must be materialized for display.
//!
//! Pure projection from (viewport height, fixed row height, scroll offset,
//! total row count) to a contiguous index range plus an overscan margin. It
//! never sorts or filters; it only decides how much of the already-ordered row
//! sequence the view needs to realize, independent of total buffer size.

/// Materialization range for one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualWindow {
    /// No data: render a placeholder, not an empty grid.
    Placeholder,
    /// Materialize rows `first..=last` (inclusive, overscan included).
    Rows { first: usize, last: usize },
}

/// Default number of extra rows realized above and below the viewport.
pub const DEFAULT_OVERSCAN: usize = 4;

impl VirtualWindow {
    pub fn compute(
        viewport_height: usize,
        row_height: usize,
        scroll_offset: usize,
        row_count: usize,
        overscan: usize,
    ) -> VirtualWindow {
        if row_count == 0 {
            return VirtualWindow::Placeholder;
        }
        let row_height = row_height.max(1);
        let visible = viewport_height.div_ceil(row_height).max(1);
        let top = scroll_offset.min(row_count - 1);
        let first = top.saturating_sub(overscan);
        let last = (top + visible - 1 + overscan).min(row_count - 1);
        VirtualWindow::Rows { first, last }
    }

    /// Number of rows this window materializes.
    pub fn len(&self) -> usize {
        match self {
            VirtualWindow::Placeholder => 0,
            VirtualWindow::Rows { first, last } => last - first + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_dataset_is_fully_covered_without_placeholder() {
        // Viewport fits 5 rows but only 3 exist.
        let window = VirtualWindow::compute(400, 80, 0, 3, 0);
        assert_eq!(window, VirtualWindow::Rows { first: 0, last: 2 });
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn zero_rows_renders_placeholder() {
        let window = VirtualWindow::compute(400, 80, 0, 0, DEFAULT_OVERSCAN);
        assert_eq!(window, VirtualWindow::Placeholder);
        assert_eq!(window.len(), 0);
    }

    #[test]
    fn range_tracks_scroll_offset_with_overscan() {
        let window = VirtualWindow::compute(400, 80, 100, 1000, 4);
        assert_eq!(window, VirtualWindow::Rows { first: 96, last: 108 });
    }

    #[test]
    fn range_is_independent_of_total_count_growth() {
        let small = VirtualWindow::compute(400, 80, 100, 1_000, 4);
        let large = VirtualWindow::compute(400, 80, 100, 1_000_000, 4);
        assert_eq!(small, large);
    }

    #[test]
    fn scroll_past_end_clamps() {
        let window = VirtualWindow::compute(400, 80, 999, 10, 2);
        let VirtualWindow::Rows { first, last } = window else {
            panic!("expected rows");
        };
        assert!(last <= 9);
        assert!(first <= last);
    }

    #[test]
    fn partial_last_row_is_materialized() {
        // 100px viewport over 30px rows shows 3 full rows and a sliver of a 4th.
        let window = VirtualWindow::compute(100, 30, 0, 100, 0);
        assert_eq!(window, VirtualWindow::Rows { first: 0, last: 3 });
    }

    #[test]
    fn recompute_on_viewport_change_only_moves_the_range() {
        let before = VirtualWindow::compute(400, 80, 10, 500, 4);
        let after = VirtualWindow::compute(800, 80, 10, 500, 4);
        assert!(after.len() > before.len());
    }
}
