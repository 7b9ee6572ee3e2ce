//! Viewport windowing for the media grid
//!
//! Only the rows intersecting the viewport, plus a few overscan rows on each
//! side, are materialised. Everything here is plain arithmetic on the
//! container size and scroll offset so it can be recomputed on every scroll
//! event.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Layout parameters for the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridMetrics {
    /// Narrowest an item may be laid out
    pub min_item_width: f32,

    /// Upper bound on the number of columns
    pub desired_columns: usize,

    /// Spacing between items and around the grid edge
    pub gap: f32,

    /// Height of one item, excluding the gap
    pub item_height: f32,

    /// Rows rendered beyond each edge of the viewport
    pub overscan: usize,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            min_item_width: 200.0,
            desired_columns: 6,
            gap: 16.0,
            item_height: 220.0,
            overscan: 2,
        }
    }
}

impl GridMetrics {
    /// Vertical distance between the tops of consecutive rows
    pub fn row_stride(&self) -> f32 {
        let stride = self.item_height + self.gap;
        if stride.is_finite() && stride > 0.0 {
            stride
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Half-open range of grid rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub const EMPTY: RowRange = RowRange { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn first(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.start)
    }

    pub fn last(&self) -> Option<usize> {
        (!self.is_empty()).then(|| self.end - 1)
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.start && row < self.end
    }
}

/// Result of windowing the grid for one container size and scroll offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub columns: usize,
    pub row_count: usize,
    pub record_count: usize,
    pub item_width: f32,
    pub row_stride: f32,
    /// Rows intersecting the viewport
    pub visible: RowRange,
    /// Visible rows plus overscan, clamped to the grid
    pub rendered: RowRange,
    /// Full scrollable height of the grid
    pub total_height: f32,
}

impl Window {
    /// Record indices covered by `rows`
    pub fn index_range(&self, rows: RowRange) -> Range<usize> {
        let start = rows.start.saturating_mul(self.columns).min(self.record_count);
        let end = rows.end.saturating_mul(self.columns).min(self.record_count);
        start..end.max(start)
    }

    pub fn rendered_indices(&self) -> Range<usize> {
        self.index_range(self.rendered)
    }

    pub fn visible_indices(&self) -> Range<usize> {
        self.index_range(self.visible)
    }
}

/// Number of columns that fit in `width`.
///
/// Always at least one, at most `desired_columns`. Non-finite or negative
/// widths yield a single column.
pub fn column_count(width: f32, metrics: &GridMetrics) -> usize {
    let desired = metrics.desired_columns.max(1);
    if !width.is_finite() || width <= 0.0 {
        return 1;
    }
    let slot = metrics.min_item_width + metrics.gap;
    if !slot.is_finite() || slot <= 0.0 {
        return desired;
    }
    let fit = ((width - metrics.gap) / slot).floor();
    if !fit.is_finite() || fit < 1.0 {
        return 1;
    }
    (fit as usize).clamp(1, desired)
}

/// Computes the visible and rendered rows for a container.
pub fn compute_window(
    container: Size,
    metrics: &GridMetrics,
    record_count: usize,
    scroll_offset: f32,
    overscan: usize,
) -> Window {
    let columns = column_count(container.width, metrics);
    window_with_columns(container, metrics, columns, record_count, scroll_offset, overscan)
}

fn window_with_columns(
    container: Size,
    metrics: &GridMetrics,
    columns: usize,
    record_count: usize,
    scroll_offset: f32,
    overscan: usize,
) -> Window {
    let columns = columns.max(1);
    let row_count = record_count.div_ceil(columns);
    let stride = metrics.row_stride();
    let item_width = item_width(container.width, metrics.gap, columns);

    let mut window = Window {
        columns,
        row_count,
        record_count,
        item_width,
        row_stride: stride,
        visible: RowRange::EMPTY,
        rendered: RowRange::EMPTY,
        total_height: row_count as f32 * stride,
    };
    if row_count == 0 {
        return window;
    }

    let scroll = non_negative(scroll_offset);
    let height = non_negative(container.height);
    let last_row = row_count - 1;

    let first = ((scroll / stride).floor() as usize).min(last_row);
    let last = (((scroll + height) / stride).ceil() as usize)
        .saturating_sub(1)
        .clamp(first, last_row);

    window.visible = RowRange::new(first, last + 1);
    window.rendered = RowRange::new(
        first.saturating_sub(overscan),
        (last + 1).saturating_add(overscan).min(row_count),
    );
    window
}

fn item_width(container_width: f32, gap: f32, columns: usize) -> f32 {
    let width = (non_negative(container_width) - gap) / columns as f32 - gap;
    if width.is_finite() {
        width.max(0.0)
    } else {
        0.0
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Grid windowing state for one viewport.
///
/// Caches the column count for the last container width so scroll-only
/// updates skip the layout computation.
#[derive(Debug, Clone)]
pub struct ViewportWindow {
    metrics: GridMetrics,
    last_width: Option<f32>,
    columns: usize,
}

impl ViewportWindow {
    pub fn new(metrics: GridMetrics) -> Self {
        Self {
            metrics,
            last_width: None,
            columns: 1,
        }
    }

    pub fn metrics(&self) -> &GridMetrics {
        &self.metrics
    }

    pub fn set_metrics(&mut self, metrics: GridMetrics) {
        self.metrics = metrics;
        self.last_width = None;
    }

    /// Column count from the most recent update
    pub fn columns(&self) -> usize {
        self.columns
    }

    fn columns_for(&mut self, width: f32) -> usize {
        if self.last_width != Some(width) {
            self.columns = column_count(width, &self.metrics);
            self.last_width = Some(width);
        }
        self.columns
    }

    pub fn update(&mut self, container: Size, scroll_offset: f32, record_count: usize) -> Window {
        let columns = self.columns_for(container.width);
        window_with_columns(
            container,
            &self.metrics,
            columns,
            record_count,
            scroll_offset,
            self.metrics.overscan,
        )
    }

    pub fn row_of(&self, index: usize) -> usize {
        index / self.columns.max(1)
    }

    /// Record indices covered by `rows`, clipped to `record_count`
    pub fn index_range(&self, rows: RowRange, record_count: usize) -> Range<usize> {
        let columns = self.columns.max(1);
        let start = rows.start.saturating_mul(columns).min(record_count);
        let end = rows.end.saturating_mul(columns).min(record_count);
        start..end.max(start)
    }

    /// Layout rectangle of the item at `index`, relative to the grid's top-left
    pub fn item_rect(&self, index: usize, container_width: f32) -> Rect {
        let columns = self.columns.max(1);
        let gap = self.metrics.gap;
        let width = item_width(container_width, gap, columns);
        let column = index % columns;
        let row = index / columns;
        Rect {
            x: gap + column as f32 * (width + gap),
            y: row as f32 * self.metrics.row_stride(),
            width,
            height: self.metrics.item_height,
        }
    }
}

impl Default for ViewportWindow {
    fn default() -> Self {
        Self::new(GridMetrics::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn metrics() -> GridMetrics {
        GridMetrics {
            min_item_width: 200.0,
            desired_columns: 6,
            gap: 16.0,
            item_height: 184.0,
            overscan: 2,
        }
    }

    #[test]
    fn test_column_count_examples() {
        let m = metrics();
        // (1000 - 16) / 216 = 4.55
        assert_eq!(column_count(1000.0, &m), 4);
        assert_eq!(column_count(5000.0, &m), 6);
        assert_eq!(column_count(100.0, &m), 1);
    }

    #[test]
    fn test_column_count_degenerate_widths() {
        let m = metrics();
        assert_eq!(column_count(0.0, &m), 1);
        assert_eq!(column_count(-50.0, &m), 1);
        assert_eq!(column_count(f32::NAN, &m), 1);
        assert_eq!(column_count(f32::INFINITY, &m), 1);
    }

    #[test]
    fn test_column_count_zero_slot_uses_desired() {
        let m = GridMetrics {
            min_item_width: 0.0,
            gap: 0.0,
            ..metrics()
        };
        assert_eq!(column_count(300.0, &m), 6);
    }

    #[test]
    fn test_window_at_top() {
        // stride 200, viewport 700 high: rows 0..=3 visible
        let w = compute_window(Size::new(1000.0, 700.0), &metrics(), 100, 0.0, 2);
        assert_eq!(w.columns, 4);
        assert_eq!(w.row_count, 25);
        assert_eq!(w.visible, RowRange::new(0, 4));
        assert_eq!(w.rendered, RowRange::new(0, 6));
        assert_eq!(w.total_height, 5000.0);
        assert_eq!(w.rendered_indices(), 0..24);
    }

    #[test]
    fn test_window_scrolled_to_middle() {
        let w = compute_window(Size::new(1000.0, 600.0), &metrics(), 100, 1000.0, 2);
        assert_eq!(w.visible, RowRange::new(5, 8));
        assert_eq!(w.rendered, RowRange::new(3, 10));
    }

    #[test]
    fn test_window_clamped_at_end() {
        let w = compute_window(Size::new(1000.0, 600.0), &metrics(), 10, 99_999.0, 2);
        assert_eq!(w.row_count, 3);
        assert_eq!(w.visible, RowRange::new(2, 3));
        assert_eq!(w.rendered, RowRange::new(0, 3));
        assert_eq!(w.rendered_indices(), 0..10);
    }

    #[test]
    fn test_window_empty_collection() {
        let w = compute_window(Size::new(1000.0, 600.0), &metrics(), 0, 0.0, 2);
        assert_eq!(w.row_count, 0);
        assert!(w.visible.is_empty());
        assert!(w.rendered.is_empty());
        assert_eq!(w.total_height, 0.0);
        assert!(w.rendered_indices().is_empty());
    }

    #[test]
    fn test_window_negative_scroll_treated_as_top() {
        let w = compute_window(Size::new(1000.0, 600.0), &metrics(), 100, -300.0, 0);
        assert_eq!(w.visible.first(), Some(0));
    }

    #[test]
    fn test_item_width_fills_container() {
        let w = compute_window(Size::new(1000.0, 600.0), &metrics(), 100, 0.0, 0);
        // 16 + 4 * (230 + 16) = 1000
        assert_eq!(w.item_width, 230.0);
    }

    #[test]
    fn test_viewport_recomputes_columns_on_resize() {
        let mut viewport = ViewportWindow::new(metrics());
        let w = viewport.update(Size::new(1000.0, 600.0), 0.0, 100);
        assert_eq!(w.columns, 4);
        assert_eq!(viewport.row_of(9), 2);

        let w = viewport.update(Size::new(450.0, 600.0), 0.0, 100);
        assert_eq!(w.columns, 2);
        assert_eq!(w.row_count, 50);
        assert_eq!(viewport.row_of(9), 4);
    }

    #[test]
    fn test_viewport_metrics_change_invalidates_columns() {
        let mut viewport = ViewportWindow::new(metrics());
        viewport.update(Size::new(1000.0, 600.0), 0.0, 100);
        viewport.set_metrics(GridMetrics {
            desired_columns: 2,
            ..metrics()
        });
        let w = viewport.update(Size::new(1000.0, 600.0), 0.0, 100);
        assert_eq!(w.columns, 2);
    }

    #[test]
    fn test_viewport_index_range_and_item_rect() {
        let mut viewport = ViewportWindow::new(metrics());
        viewport.update(Size::new(1000.0, 600.0), 0.0, 10);
        assert_eq!(viewport.index_range(RowRange::new(1, 5), 10), 4..10);

        let rect = viewport.item_rect(5, 1000.0);
        assert_eq!(rect.x, 16.0 + 230.0 + 16.0);
        assert_eq!(rect.y, 200.0);
        assert_eq!(rect.width, 230.0);
        assert_eq!(rect.height, 184.0);
    }

    #[test]
    fn test_row_range_accessors() {
        let range = RowRange::new(3, 7);
        assert_eq!(range.len(), 4);
        assert_eq!(range.first(), Some(3));
        assert_eq!(range.last(), Some(6));
        assert!(range.contains(6));
        assert!(!range.contains(7));
        assert_eq!(RowRange::new(5, 2), RowRange::new(5, 5));
        assert_eq!(RowRange::EMPTY.last(), None);
    }

    proptest! {
        #[test]
        fn prop_column_count_bounded(
            width in -1.0e6f32..1.0e6,
            min_item in 0.0f32..2000.0,
            gap in 0.0f32..100.0,
            desired in 0usize..20,
        ) {
            let m = GridMetrics {
                min_item_width: min_item,
                desired_columns: desired,
                gap,
                ..GridMetrics::default()
            };
            let columns = column_count(width, &m);
            prop_assert!(columns >= 1);
            prop_assert!(columns <= desired.max(1));
        }

        #[test]
        fn prop_column_count_never_exceeds_fit(
            width in -1.0e6f32..1.0e6,
            min_item in 1.0f32..2000.0,
            gap in 0.0f32..100.0,
            desired in 0usize..20,
        ) {
            let m = GridMetrics {
                min_item_width: min_item,
                desired_columns: desired,
                gap,
                ..GridMetrics::default()
            };
            let fit = ((width - gap) / (min_item + gap)).floor().max(1.0);
            prop_assert!(column_count(width, &m) as f32 <= fit);
        }

        #[test]
        fn prop_rendered_contains_visible(
            count in 0usize..5000,
            scroll in 0.0f32..2.0e5,
            height in 0.0f32..3000.0,
            overscan in 0usize..6,
        ) {
            let w = compute_window(Size::new(1000.0, height), &metrics(), count, scroll, overscan);
            prop_assert_eq!(w.row_count, count.div_ceil(w.columns));
            prop_assert!(w.rendered.end <= w.row_count);
            if count > 0 {
                prop_assert!(w.rendered.start <= w.visible.start);
                prop_assert!(w.rendered.end >= w.visible.end);
                prop_assert!(!w.visible.is_empty());
            }
        }
    }
}
