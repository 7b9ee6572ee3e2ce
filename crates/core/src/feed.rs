//! Append-only paged record feed.
//!
//! The feed holds the records realized so far for the current [`Query`] and
//! decides when the next page is needed. At most one page request is
//! outstanding at a time, and every request carries the generation it was
//! issued under so responses for an abandoned query are discarded.

use crate::error::{FeedError, SourceError};
use crate::grid::Window;
use crate::record::{Record, RecordId, Tag};
use crate::selection::RealizedOrder;
use crate::source::{Page, PageRequest, Query};
use crate::tags::{self, TagChange};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Page sizing and the pagination trigger distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Records requested per page
    pub page_size: usize,
    /// Request the next page once the rendered rows come within this many
    /// rows of the last loaded row
    pub threshold_rows: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            threshold_rows: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordFeed {
    config: PagingConfig,
    query: Query,
    records: Vec<Record>,
    positions: HashMap<RecordId, usize>,
    /// Total reported by the source, unknown until the first page lands
    total: Option<usize>,
    generation: u64,
    in_flight: Option<PageRequest>,
    last_error: Option<SourceError>,
}

impl RecordFeed {
    pub fn new(config: PagingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &PagingConfig {
        &self.config
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total(&self) -> Option<usize> {
        self.total
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> Option<&PageRequest> {
        self.in_flight.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&SourceError> {
        self.last_error.as_ref()
    }

    /// Whether the source has records beyond those loaded
    pub fn has_more(&self) -> bool {
        self.total.map_or(true, |total| self.records.len() < total)
    }

    /// Drops every loaded record and requests the first page for `query`.
    pub fn reset(&mut self, query: Query) -> PageRequest {
        self.generation += 1;
        self.query = query;
        self.records.clear();
        self.positions.clear();
        self.total = None;
        self.last_error = None;
        self.in_flight = None;
        debug!(
            "Feed reset (generation {}, filter {:?})",
            self.generation, self.query.filter
        );
        self.issue()
    }

    /// Requests the next page when the rendered rows approach the end of
    /// the loaded records.
    ///
    /// Returns `None` while a request is outstanding, after a failure until
    /// [`RecordFeed::retry`] is called, or once everything is loaded.
    pub fn maybe_request(&mut self, window: &Window) -> Option<PageRequest> {
        if self.in_flight.is_some() || self.last_error.is_some() || !self.has_more() {
            return None;
        }
        let near_end = match window.rendered.last() {
            Some(last) => {
                last.saturating_add(self.config.threshold_rows) >= window.row_count.saturating_sub(1)
            }
            None => true,
        };
        near_end.then(|| self.issue())
    }

    /// Re-issues the page that failed last.
    pub fn retry(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        let err = self.last_error.take()?;
        debug!("Retrying page at offset {} after: {}", self.records.len(), err);
        Some(self.issue())
    }

    /// Applies the source's response to `request`.
    ///
    /// Returns the number of records appended. Failures leave the loaded
    /// records untouched.
    pub fn apply(
        &mut self,
        request: &PageRequest,
        result: Result<Page, SourceError>,
    ) -> Result<usize, FeedError> {
        if request.generation != self.generation {
            debug!(
                "Discarding stale page at offset {} (generation {} != {})",
                request.offset, request.generation, self.generation
            );
            return Err(FeedError::Stale {
                received: request.generation,
                current: self.generation,
            });
        }
        match &self.in_flight {
            Some(pending) if pending.offset == request.offset => {}
            _ => {
                return Err(FeedError::NotInFlight {
                    offset: request.offset,
                })
            }
        }
        self.in_flight = None;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                warn!("Page fetch at offset {} failed: {}", request.offset, err);
                self.last_error = Some(err.clone());
                return Err(err.into());
            }
        };
        self.last_error = None;

        let mut added = 0;
        for record in page.records {
            if self.positions.contains_key(&record.id) {
                debug!("Skipping duplicate record {}", record.id);
                continue;
            }
            self.positions.insert(record.id.clone(), self.records.len());
            self.records.push(record);
            added += 1;
        }

        // A page that adds nothing ends pagination even if the reported
        // total says otherwise.
        let total = if added == 0 {
            self.records.len()
        } else {
            page.total.max(self.records.len())
        };
        self.total = Some(total);
        debug!(
            "Applied page at offset {}: {} records, {}/{} loaded",
            request.offset,
            added,
            self.records.len(),
            total
        );
        Ok(added)
    }

    /// Optimistically sets a tag on a loaded record.
    pub fn set_tag(&mut self, id: &RecordId, tag: Tag, value: bool) -> Option<TagChange> {
        let index = self.position(id)?;
        tags::apply(&mut self.records[index], tag, value)
    }

    /// Rolls back a change whose persistence failed.
    pub fn revert(&mut self, change: &TagChange) -> bool {
        match self.position(&change.id) {
            Some(index) => tags::revert(&mut self.records[index], change),
            None => false,
        }
    }

    fn issue(&mut self) -> PageRequest {
        let request = PageRequest {
            offset: self.records.len(),
            limit: self.config.page_size.max(1),
            query: self.query.clone(),
            generation: self.generation,
        };
        self.in_flight = Some(request.clone());
        request
    }
}

impl RealizedOrder for RecordFeed {
    fn realized_len(&self) -> usize {
        self.records.len()
    }

    fn id_at(&self, index: usize) -> Option<&RecordId> {
        self.records.get(index).map(|record| &record.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{compute_window, GridMetrics, Size};

    fn records(range: std::ops::Range<usize>) -> Vec<Record> {
        range.map(|i| Record::new(format!("r{i}"))).collect()
    }

    fn page(range: std::ops::Range<usize>, total: usize) -> Result<Page, SourceError> {
        Ok(Page::new(records(range), total))
    }

    fn metrics() -> GridMetrics {
        GridMetrics {
            min_item_width: 200.0,
            desired_columns: 4,
            gap: 0.0,
            item_height: 100.0,
            overscan: 2,
        }
    }

    /// Window over `count` records in 4 columns, scrolled to `row`
    fn window_at(row: usize, count: usize) -> Window {
        compute_window(Size::new(800.0, 300.0), &metrics(), count, row as f32 * 100.0, 2)
    }

    fn loaded_feed(count: usize, total: usize) -> RecordFeed {
        let mut feed = RecordFeed::new(PagingConfig {
            page_size: count,
            threshold_rows: 5,
        });
        let request = feed.reset(Query::default());
        feed.apply(&request, page(0..count, total)).unwrap();
        feed
    }

    #[test]
    fn test_reset_requests_first_page() {
        let mut feed = RecordFeed::new(PagingConfig::default());
        let request = feed.reset(Query::new().with_filter("cats"));
        assert_eq!(request.offset, 0);
        assert_eq!(request.limit, 100);
        assert_eq!(request.generation, 1);
        assert_eq!(request.query.filter.as_deref(), Some("cats"));
        assert!(feed.is_loading());
    }

    #[test]
    fn test_apply_appends_records() {
        let feed = loaded_feed(100, 1000);
        assert_eq!(feed.len(), 100);
        assert_eq!(feed.total(), Some(1000));
        assert!(feed.has_more());
        assert!(!feed.is_loading());
        assert_eq!(feed.position(&RecordId::from("r42")), Some(42));
    }

    #[test]
    fn test_no_request_far_from_end() {
        // 100 records, 25 rows; last rendered row is 6
        let mut feed = loaded_feed(100, 1000);
        assert!(feed.maybe_request(&window_at(2, 100)).is_none());
    }

    #[test]
    fn test_request_within_threshold_fires_once() {
        let mut feed = loaded_feed(100, 1000);
        // One row short: last rendered row 18, 18 + 5 < 24
        let short = window_at(14, 100);
        assert_eq!(short.rendered.last(), Some(18));
        assert!(feed.maybe_request(&short).is_none());
        assert!(!feed.is_loading());

        // Last rendered row is 19; 19 + 5 >= 24
        let window = window_at(15, 100);
        let request = feed.maybe_request(&window).unwrap();
        assert_eq!(request.offset, 100);

        for _ in 0..5 {
            assert!(feed.maybe_request(&window).is_none());
        }
        assert_eq!(feed.apply(&request, page(100..200, 1000)), Ok(100));
        assert_eq!(feed.len(), 200);
    }

    #[test]
    fn test_no_request_when_everything_loaded() {
        let mut feed = loaded_feed(100, 100);
        assert!(!feed.has_more());
        assert!(feed.maybe_request(&window_at(24, 100)).is_none());
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut feed = loaded_feed(100, 1000);
        let old = feed.maybe_request(&window_at(24, 100)).unwrap();
        let fresh = feed.reset(Query::new().with_filter("dogs"));

        let err = feed.apply(&old, page(100..200, 1000)).unwrap_err();
        assert_eq!(err, FeedError::Stale { received: 1, current: 2 });
        assert!(feed.is_empty());
        assert_eq!(feed.in_flight(), Some(&fresh));

        assert_eq!(feed.apply(&fresh, page(0..10, 10)), Ok(10));
    }

    #[test]
    fn test_unrequested_response_rejected() {
        let mut feed = loaded_feed(100, 1000);
        let bogus = PageRequest {
            offset: 100,
            limit: 100,
            query: Query::default(),
            generation: feed.generation(),
        };
        assert_eq!(
            feed.apply(&bogus, page(100..200, 1000)),
            Err(FeedError::NotInFlight { offset: 100 })
        );
        assert_eq!(feed.len(), 100);
    }

    #[test]
    fn test_failure_keeps_records_and_blocks_until_retry() {
        let mut feed = loaded_feed(100, 1000);
        let window = window_at(24, 100);
        let request = feed.maybe_request(&window).unwrap();

        let err = feed
            .apply(&request, Err(SourceError::Unavailable("offline".into())))
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(feed.len(), 100);
        assert!(feed.last_error().is_some());
        assert!(feed.maybe_request(&window).is_none());

        let retry = feed.retry().unwrap();
        assert_eq!(retry.offset, 100);
        assert!(feed.retry().is_none());
        assert_eq!(feed.apply(&retry, page(100..150, 150)), Ok(50));
        assert!(feed.last_error().is_none());
        assert!(!feed.has_more());
    }

    #[test]
    fn test_retry_without_failure_is_none() {
        let mut feed = loaded_feed(10, 100);
        assert!(feed.retry().is_none());
    }

    #[test]
    fn test_duplicate_records_skipped() {
        let mut feed = loaded_feed(10, 100);
        let request = feed.maybe_request(&window_at(0, 10)).unwrap();
        assert_eq!(feed.apply(&request, page(5..15, 100)), Ok(5));
        assert_eq!(feed.len(), 15);
        assert_eq!(feed.position(&RecordId::from("r14")), Some(14));
    }

    #[test]
    fn test_empty_page_ends_pagination() {
        let mut feed = loaded_feed(10, 100);
        let request = feed.maybe_request(&window_at(0, 10)).unwrap();
        assert_eq!(feed.apply(&request, page(0..0, 100)), Ok(0));
        assert_eq!(feed.total(), Some(10));
        assert!(feed.maybe_request(&window_at(0, 10)).is_none());
    }

    #[test]
    fn test_set_tag_and_revert() {
        let mut feed = loaded_feed(10, 10);
        let id = RecordId::from("r3");
        let change = feed.set_tag(&id, Tag::Favorite, true).unwrap();
        assert!(feed.get(3).unwrap().tags.favorite);
        assert!(feed.set_tag(&id, Tag::Favorite, true).is_none());

        assert!(feed.revert(&change));
        assert!(!feed.get(3).unwrap().tags.favorite);
        assert!(feed.set_tag(&RecordId::from("missing"), Tag::Flagged, true).is_none());
    }
}
