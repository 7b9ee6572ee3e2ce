//! Preload window policy
//!
//! Decides which records to warm given the rows currently on screen. The
//! window is biased forward: by default two rows above the visible range and
//! three rows below it, since scrolling down is the common direction.

use mediagrid_cache::{CacheConfig, PreviewKey};
use std::ops::Range;

/// Rows warmed around the visible range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadWindow {
    /// Rows warmed above the first visible row
    pub rows_behind: usize,

    /// Rows warmed below the last visible row
    pub rows_ahead: usize,
}

impl Default for PreloadWindow {
    fn default() -> Self {
        Self {
            rows_behind: 2,
            rows_ahead: 3,
        }
    }
}

impl PreloadWindow {
    pub fn new(rows_behind: usize, rows_ahead: usize) -> Self {
        Self {
            rows_behind,
            rows_ahead,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.preload_rows_behind, config.preload_rows_ahead)
    }

    /// Record indices covered by rows `[first_row - behind, last_row + ahead]`,
    /// clipped to `[0, record_count)`.
    pub fn index_range(
        &self,
        first_row: usize,
        last_row: usize,
        columns: usize,
        record_count: usize,
    ) -> Range<usize> {
        let columns = columns.max(1);
        let start_row = first_row.saturating_sub(self.rows_behind);
        let end_row = last_row.max(first_row).saturating_add(self.rows_ahead);

        let start = start_row.saturating_mul(columns).min(record_count);
        let end = end_row
            .saturating_add(1)
            .saturating_mul(columns)
            .min(record_count);
        start..end.max(start)
    }

    /// Preview keys for every record in the preload window.
    ///
    /// `key_for` maps a record index to its resolved preview key; records
    /// without a preview are skipped.
    pub fn keys<F>(
        &self,
        first_row: usize,
        last_row: usize,
        columns: usize,
        record_count: usize,
        key_for: F,
    ) -> Vec<PreviewKey>
    where
        F: FnMut(usize) -> Option<PreviewKey>,
    {
        self.index_range(first_row, last_row, columns, record_count)
            .filter_map(key_for)
            .collect()
    }
}
