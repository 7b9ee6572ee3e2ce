//! End-to-end browsing over an in-memory collection.

use futures::future::BoxFuture;
use futures::FutureExt;
use mediagrid_cache::{CacheConfig, LoadError, PreviewHandle, PreviewKey};
use mediagrid_core::{
    BrowserConfig, Collaborators, FileResolver, MediaBrowser, Page, PageRequest,
    PagedRecordSource, Record, Size, SourceError, Tag,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Collection {
    records: Vec<Record>,
    fetches: AtomicUsize,
}

impl PagedRecordSource for Collection {
    fn fetch(&self, request: &PageRequest) -> BoxFuture<'static, Result<Page, SourceError>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let records = self
            .records
            .iter()
            .skip(request.offset)
            .take(request.limit)
            .cloned()
            .collect();
        let total = self.records.len();
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(Page::new(records, total))
        }
        .boxed()
    }
}

fn session(count: usize, capacity: usize) -> (MediaBrowser, Arc<Collection>, Arc<AtomicUsize>) {
    let collection = Arc::new(Collection {
        records: (0..count)
            .map(|i| Record::new(format!("m{i}")).with_preview(format!("thumbs/{i}.webp")))
            .collect(),
        fetches: AtomicUsize::new(0),
    });
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let previews = move |key: &PreviewKey| {
        counter.fetch_add(1, Ordering::SeqCst);
        let broken = key.as_str().ends_with("/13.webp");
        async move {
            if broken {
                Err(LoadError::Corrupt("bad header".into()))
            } else {
                Ok(PreviewHandle::new(8, 8, vec![0u8; 64]))
            }
        }
        .boxed()
    };
    let sprite_metadata =
        |_key: &PreviewKey| async { Err::<String, _>(SourceError::Unavailable("none".into())) }.boxed();

    let mut config = BrowserConfig::default();
    config.cache = CacheConfig::default()
        .with_capacity(capacity)
        .with_batch_pause(Duration::from_millis(1));
    config.grid.desired_columns = 5;
    config.grid.min_item_width = 150.0;
    config.grid.gap = 10.0;
    config.grid.item_height = 150.0;
    config.paging.page_size = 60;

    let browser = MediaBrowser::new(
        config,
        Collaborators {
            source: collection.clone(),
            resolver: Arc::new(FileResolver),
            previews: Arc::new(previews),
            sprite_metadata: Arc::new(sprite_metadata),
        },
    );
    (browser, collection, loads)
}

#[tokio::test]
async fn scroll_to_the_end_loads_every_page_once() {
    let (mut browser, collection, _) = session(500, 500);
    let viewport = Size::new(900.0, 640.0);
    let request = browser.switch_library("/srv/media");
    browser.fetch_page(request).await.unwrap();

    let mut scroll = 0.0;
    while browser.feed().has_more() {
        let update = browser.on_viewport(viewport, scroll);
        if let Some(request) = update.page_request {
            assert!(browser.on_viewport(viewport, scroll).page_request.is_none());
            browser.fetch_page(request).await.unwrap();
        }
        scroll += 400.0;
    }

    assert_eq!(browser.feed().len(), 500);
    assert_eq!(browser.feed().total(), Some(500));
    // 500 / 60 rounded up
    assert_eq!(collection.fetches.load(Ordering::SeqCst), 9);
}

#[tokio::test]
async fn cache_stays_within_capacity_while_scrolling() {
    let (mut browser, _, loads) = session(300, 40);
    let viewport = Size::new(900.0, 480.0);
    let request = browser.switch_library("/srv/media");
    browser.fetch_page(request).await.unwrap();

    for step in 0..8 {
        let update = browser.on_viewport(viewport, step as f32 * 160.0);
        if let Some(request) = update.page_request {
            browser.fetch_page(request).await.unwrap();
        }
        browser.scheduler().wait_idle().await;
        assert!(browser.cache().len() <= 40);
    }

    let stats = browser.cache().stats();
    assert!(stats.evictions > 0);
    assert_eq!(stats.loads_started as usize, loads.load(Ordering::SeqCst));
}

#[tokio::test]
async fn failed_preview_is_terminal() {
    let (mut browser, _, loads) = session(30, 500);
    let request = browser.switch_library("/srv/media");
    browser.fetch_page(request).await.unwrap();

    browser.on_viewport(Size::new(900.0, 640.0), 0.0);
    browser.scheduler().wait_idle().await;
    let before = loads.load(Ordering::SeqCst);

    let entry = browser.preview(13).unwrap();
    assert!(entry.state.is_errored());
    assert!(browser.preview(12).unwrap().state.is_loaded());
    assert_eq!(loads.load(Ordering::SeqCst), before);
}

#[tokio::test]
async fn direct_render_and_prefetch_share_one_load() {
    let (mut browser, _, loads) = session(30, 500);
    let request = browser.switch_library("/srv/media");
    browser.fetch_page(request).await.unwrap();

    for index in 0..10 {
        assert!(browser.preview(index).unwrap().state.is_pending());
    }
    browser.on_viewport(Size::new(900.0, 640.0), 0.0);
    browser.scheduler().wait_idle().await;

    let distinct = browser.cache().len();
    assert_eq!(loads.load(Ordering::SeqCst), distinct);
}

#[tokio::test]
async fn tagging_a_range_selection() {
    let (mut browser, _, _) = session(30, 500);
    let request = browser.switch_library("/srv/media");
    browser.fetch_page(request).await.unwrap();

    browser.click(5, false);
    browser.click(9, true);
    let changes = browser.tag_selection(Tag::Flagged, true);
    assert_eq!(changes.len(), 5);
    assert!(changes.iter().all(|c| c.tag == Tag::Flagged && c.value));

    browser.click(2, true);
    assert_eq!(browser.selection().len(), 4);
}
