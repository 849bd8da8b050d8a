//! Query client behaviour against a scripted product source.
//!
//! Every test runs on a paused tokio clock, so stale and eviction windows are
//! crossed with `tokio::time::advance` and request latency is simulated with
//! `tokio::time::sleep` without slowing the suite down.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use catalog_lib::CacheStatus;
use catalog_lib::QueryClient;
use catalog_lib::api::ProductSource;
use catalog_lib::cache::CacheConfig;
use catalog_lib::cache::CacheKey;
use catalog_lib::error::ApiError;
use catalog_lib::error::Error;
use catalog_lib::model::Category;
use catalog_lib::model::Product;
use catalog_lib::model::ProductId;
use catalog_lib::model::ProductUpdate;
use catalog_lib::model::Rating;
use catalog_lib::query::CacheEvent;
use catalog_lib::query::CacheEventKind;
use catalog_lib::query::LifecycleEvent;
use futures::StreamExt;
use rust_decimal::Decimal;
use tokio::time::advance;
use tokio::time::sleep;

// =============================================================================
// Scripted source
// =============================================================================

#[derive(Default)]
struct State {
    products: Mutex<Vec<Product>>,
    latency: Mutex<Duration>,
    write_latency: Mutex<Duration>,
    read_failures: Mutex<VecDeque<ApiError>>,
    write_failure: Mutex<Option<ApiError>>,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    category_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

/// In-memory stand-in for the product service.
///
/// Cloning shares state, so a test keeps a handle to inspect call counts
/// after handing the source to the query client.
#[derive(Clone, Default)]
struct ScriptedSource {
    state: Arc<State>,
}

impl ScriptedSource {
    fn with_products(products: Vec<Product>) -> Self {
        let source = Self::default();
        *source.state.products.lock().unwrap() = products;
        source
    }

    fn set_latency(&self, latency: Duration) {
        *self.state.latency.lock().unwrap() = latency;
    }

    fn set_write_latency(&self, latency: Duration) {
        *self.state.write_latency.lock().unwrap() = latency;
    }

    fn fail_reads(&self, errors: impl IntoIterator<Item = ApiError>) {
        self.state.read_failures.lock().unwrap().extend(errors);
    }

    fn fail_next_write(&self, error: ApiError) {
        *self.state.write_failure.lock().unwrap() = Some(error);
    }

    fn rename(&self, id: u64, title: &str) {
        let mut products = self.state.products.lock().unwrap();
        if let Some(p) = products.iter_mut().find(|p| p.id == ProductId(id)) {
            p.title = title.to_string();
        }
    }

    fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    fn get_calls(&self) -> usize {
        self.state.get_calls.load(Ordering::SeqCst)
    }

    fn update_calls(&self) -> usize {
        self.state.update_calls.load(Ordering::SeqCst)
    }

    fn delete_calls(&self) -> usize {
        self.state.delete_calls.load(Ordering::SeqCst)
    }

    async fn read(&self, counter: &AtomicUsize) -> Result<(), ApiError> {
        counter.fetch_add(1, Ordering::SeqCst);
        let latency = *self.state.latency.lock().unwrap();
        sleep(latency).await;
        match self.state.read_failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn write(&self, counter: &AtomicUsize) -> Result<(), ApiError> {
        counter.fetch_add(1, Ordering::SeqCst);
        let latency = *self.state.write_latency.lock().unwrap();
        sleep(latency).await;
        match self.state.write_failure.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProductSource for ScriptedSource {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        self.read(&self.state.list_calls).await?;
        Ok(self.state.products.lock().unwrap().clone())
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.read(&self.state.get_calls).await?;
        self.state
            .products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("product {}", id)))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.read(&self.state.category_calls).await?;
        let mut categories: Vec<Category> = self
            .state
            .products
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product, ApiError> {
        self.write(&self.state.update_calls).await?;
        // Like the public service: echo the payload, without the rating.
        Ok(Product {
            id,
            title: update.title.clone(),
            price: update.price,
            description: update.description.clone(),
            category: update.category.clone(),
            image: update.image.clone(),
            rating: None,
        })
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        self.write(&self.state.delete_calls).await?;
        let mut products = self.state.products.lock().unwrap();
        let before = products.len();
        products.retain(|p| p.id != id);
        if products.len() == before {
            return Err(ApiError::not_found(format!("product {}", id)));
        }
        Ok(())
    }
}

fn product(id: u64, title: &str, category: &str) -> Product {
    Product {
        id: ProductId(id),
        title: title.to_string(),
        price: Decimal::new(1000 + id as i64, 2),
        description: format!("{} description", title),
        category: Category::new(category),
        image: format!("https://img.example/{}.png", id),
        rating: Some(Rating { rate: 4.0, count: 10 }),
    }
}

fn catalog() -> ScriptedSource {
    ScriptedSource::with_products(vec![
        product(1, "Shirt", "clothing"),
        product(2, "Shoe", "footwear"),
        product(3, "Lamp", "home"),
    ])
}

fn queries(source: &ScriptedSource) -> QueryClient {
    QueryClient::new(source.clone())
}

const STALE: Duration = Duration::from_secs(301);

// =============================================================================
// Reads
// =============================================================================

#[tokio::test(start_paused = true)]
async fn first_read_is_a_miss_then_fresh_hits_skip_the_network() {
    let source = catalog();
    let queries = queries(&source);

    let first = queries.products().await.unwrap();
    assert!(first.cache.is_miss());
    assert_eq!(first.data().len(), 3);

    advance(Duration::from_secs(60)).await;
    let second = queries.products().await.unwrap();
    assert!(second.cache.is_hit());
    assert_eq!(source.list_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_reads_share_one_request() {
    let source = catalog();
    source.set_latency(Duration::from_millis(100));
    let queries = queries(&source);

    let (a, b, c) = tokio::join!(queries.products(), queries.products(), queries.products());

    assert_eq!(source.list_calls(), 1);
    assert_eq!(a.unwrap().data(), b.unwrap().data());
    assert_eq!(c.unwrap().data().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn stale_reads_return_cached_data_and_revalidate_once() {
    let source = catalog();
    source.set_latency(Duration::from_millis(100));
    let queries = queries(&source);
    queries.products().await.unwrap();

    source.rename(1, "Linen Shirt");
    advance(STALE).await;

    let first = queries.products().await.unwrap();
    let second = queries.products().await.unwrap();
    assert!(matches!(first.cache, CacheStatus::Stale { revalidating: true, .. }));
    assert!(second.cache.is_stale());
    assert_eq!(first.data()[0].title, "Shirt");
    assert!(queries.is_fetching(&CacheKey::Products));

    sleep(Duration::from_millis(150)).await;

    assert_eq!(source.list_calls(), 2);
    let third = queries.products().await.unwrap();
    assert!(third.cache.is_hit());
    assert_eq!(third.data()[0].title, "Linen Shirt");
}

#[tokio::test(start_paused = true)]
async fn refetch_always_hits_the_network() {
    let source = catalog();
    let queries = queries(&source);
    queries.products().await.unwrap();

    let again = queries.refetch_products().await.unwrap();

    assert!(again.cache.is_miss());
    assert_eq!(source.list_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn abandoned_read_still_fills_the_cache() {
    let source = catalog();
    source.set_latency(Duration::from_millis(100));
    let queries = queries(&source);

    let handle = tokio::spawn({
        let queries = queries.clone();
        async move { queries.products().await }
    });
    sleep(Duration::from_millis(10)).await;
    handle.abort();

    sleep(Duration::from_millis(200)).await;

    assert_eq!(source.list_calls(), 1);
    assert!(queries.products().await.unwrap().cache.is_hit());
}

#[tokio::test(start_paused = true)]
async fn transient_read_failure_is_retried_once() {
    let source = catalog();
    source.fail_reads([ApiError::http(503, "unavailable")]);
    let queries = queries(&source);

    let products = queries.products().await.unwrap();

    assert_eq!(products.data().len(), 3);
    assert_eq!(source.list_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn persistent_read_failure_surfaces_after_one_retry() {
    let source = catalog();
    source.fail_reads([ApiError::http(500, "boom"), ApiError::http(500, "boom")]);
    let queries = queries(&source);

    let err = queries.products().await.unwrap_err();

    assert_eq!(err.as_api().and_then(ApiError::status_code), Some(500));
    assert_eq!(source.list_calls(), 2);
    let state = queries.query_state::<Arc<Vec<Product>>>(&CacheKey::Products);
    assert!(state.is_error());
}

#[tokio::test(start_paused = true)]
async fn not_found_is_not_retried() {
    let source = catalog();
    let queries = queries(&source);

    let err = queries.product(ProductId(42)).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(source.get_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_revalidation_keeps_stale_data() {
    let source = catalog();
    let queries = queries(&source);
    queries.products().await.unwrap();
    advance(STALE).await;

    source.fail_reads([ApiError::http(502, "bad gateway"), ApiError::http(502, "bad gateway")]);
    let stale = queries.products().await.unwrap();
    assert!(stale.cache.is_stale());

    sleep(Duration::from_secs(5)).await;

    let state = queries.query_state::<Arc<Vec<Product>>>(&CacheKey::Products);
    assert_eq!(state.data.as_ref().map(|d| d.len()), Some(3));
    assert!(state.error.is_some());
    assert!(!state.is_fetching);
    assert!(!state.is_error());

    let again = queries.products().await.unwrap();
    assert_eq!(again.data().len(), 3);
}

// =============================================================================
// Writes
// =============================================================================

fn retitled(product: &Product, title: &str) -> ProductUpdate {
    let mut update = ProductUpdate::from_product(product);
    update.title = title.to_string();
    update
}

#[tokio::test(start_paused = true)]
async fn update_patches_cache_without_refetching() {
    let source = catalog();
    let queries = queries(&source);
    let list = queries.products().await.unwrap().into_inner();

    let updated = queries
        .update_product(ProductId(1), &retitled(&list[0], "Blue Shirt"))
        .await
        .unwrap();
    assert_eq!(updated.title, "Blue Shirt");
    assert_eq!(updated.rating, list[0].rating);

    let single = queries.product(ProductId(1)).await.unwrap();
    assert_eq!(source.get_calls(), 0);
    assert_eq!(single.data().title, "Blue Shirt");
    assert!(single.cache.is_stale());

    let products = queries.products().await.unwrap();
    assert_eq!(source.list_calls(), 1);
    assert_eq!(products.data()[0].title, "Blue Shirt");
    assert_eq!(products.data()[0].rating, list[0].rating);
    assert_eq!(products.data()[1].title, "Shoe");
    assert!(products.cache.is_stale());
}

#[tokio::test(start_paused = true)]
async fn update_emits_change_events() {
    let source = catalog();
    let queries = queries(&source);
    let list = queries.products().await.unwrap().into_inner();
    let mut events = queries.subscribe();

    queries
        .update_product(ProductId(2), &retitled(&list[1], "Boot"))
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&CacheEvent {
        key: CacheKey::Product(ProductId(2)),
        kind: CacheEventKind::Updated,
    }));
    assert!(seen.contains(&CacheEvent {
        key: CacheKey::Products,
        kind: CacheEventKind::Updated,
    }));
}

#[tokio::test(start_paused = true)]
async fn failed_update_leaves_cache_untouched() {
    let source = catalog();
    let queries = queries(&source);
    let list = queries.products().await.unwrap().into_inner();
    queries.product(ProductId(1)).await.unwrap();

    let before_list = queries.cache().peek(&CacheKey::Products).unwrap();
    let before_one = queries.cache().peek(&CacheKey::Product(ProductId(1))).unwrap();
    let version = queries.cache().version(&CacheKey::Products);

    source.fail_next_write(ApiError::rejected(400, "invalid payload"));
    let err = queries
        .update_product(ProductId(1), &retitled(&list[0], "Blue Shirt"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api(ApiError::Validation { status: Some(400), .. })));
    assert_eq!(source.update_calls(), 1);

    let after_list = queries.cache().peek(&CacheKey::Products).unwrap();
    let after_one = queries.cache().peek(&CacheKey::Product(ProductId(1))).unwrap();
    assert_eq!(after_list.data, before_list.data);
    assert_eq!(after_list.cached_at, before_list.cached_at);
    assert!(!after_list.is_invalidated());
    assert_eq!(after_one.data, before_one.data);
    assert_eq!(queries.cache().version(&CacheKey::Products), version);
}

#[tokio::test(start_paused = true)]
async fn invalid_update_is_rejected_before_sending() {
    let source = catalog();
    let queries = queries(&source);
    let list = queries.products().await.unwrap().into_inner();

    let mut update = retitled(&list[0], "");
    update.price = Decimal::new(-1, 0);
    let err = queries.update_product(ProductId(1), &update).await.unwrap_err();

    match err {
        Error::Api(ApiError::Validation { status: None, fields, .. }) => {
            let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
            assert_eq!(names, vec!["title", "price"]);
        }
        other => panic!("expected local validation error, got {:?}", other),
    }
    assert_eq!(source.update_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn writes_are_never_retried() {
    let source = catalog();
    let queries = queries(&source);
    let list = queries.products().await.unwrap().into_inner();

    source.fail_next_write(ApiError::http(503, "unavailable"));
    let err = queries
        .update_product(ProductId(1), &retitled(&list[0], "Blue Shirt"))
        .await
        .unwrap_err();

    assert_eq!(err.as_api().and_then(ApiError::status_code), Some(503));
    assert_eq!(source.update_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn delete_drops_product_and_forces_fresh_fetch() {
    let source = catalog();
    let queries = queries(&source);
    queries.products().await.unwrap();
    queries.product(ProductId(2)).await.unwrap();
    assert_eq!(source.get_calls(), 1);

    queries.delete_product(ProductId(2)).await.unwrap();

    let products = queries.products().await.unwrap();
    assert!(products.data().iter().all(|p| p.id != ProductId(2)));
    assert_eq!(products.data().len(), 2);
    assert!(products.cache.is_stale());

    let err = queries.product(ProductId(2)).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(source.get_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_delete_leaves_cache_untouched() {
    let source = catalog();
    let queries = queries(&source);
    queries.products().await.unwrap();
    let before = queries.cache().peek(&CacheKey::Products).unwrap();

    source.fail_next_write(ApiError::http(500, "boom"));
    queries.delete_product(ProductId(2)).await.unwrap_err();

    let after = queries.cache().peek(&CacheKey::Products).unwrap();
    assert_eq!(after.data, before.data);
    assert!(!after.is_invalidated());
    assert_eq!(source.delete_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn response_started_before_a_write_is_discarded() {
    let source = catalog();
    let queries = queries(&source);
    let list = queries.products().await.unwrap().into_inner();

    source.set_latency(Duration::from_millis(500));
    source.set_write_latency(Duration::from_millis(10));

    let slow_read = tokio::spawn({
        let queries = queries.clone();
        async move { queries.product(ProductId(1)).await }
    });
    sleep(Duration::from_millis(1)).await;
    assert!(queries.is_fetching(&CacheKey::Product(ProductId(1))));

    queries
        .update_product(ProductId(1), &retitled(&list[0], "Blue Shirt"))
        .await
        .unwrap();

    let read = slow_read.await.unwrap().unwrap();
    assert_eq!(read.data().title, "Shirt");
    assert!(read.cache.is_none());

    let cached = queries
        .query_state::<Arc<Product>>(&CacheKey::Product(ProductId(1)))
        .data
        .unwrap();
    assert_eq!(cached.title, "Blue Shirt");
}

// =============================================================================
// Lifecycle, eviction and observation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn focus_revalidates_stale_entries() {
    let source = catalog();
    let queries = queries(&source);
    queries.products().await.unwrap();
    queries.categories().await.unwrap();

    assert_eq!(queries.handle_event(LifecycleEvent::FocusGained), 0);

    advance(STALE).await;
    assert_eq!(queries.handle_event(LifecycleEvent::FocusGained), 2);
    sleep(Duration::from_millis(10)).await;

    assert_eq!(source.list_calls(), 2);
    assert!(queries.products().await.unwrap().cache.is_hit());
}

#[tokio::test(start_paused = true)]
async fn disabled_reconnect_refetch_does_nothing() {
    let source = catalog();
    let queries = QueryClient::builder(source.clone())
        .cache_config(CacheConfig::default().with_refetch_on_reconnect(false))
        .build();
    queries.products().await.unwrap();
    advance(STALE).await;

    assert_eq!(queries.handle_event(LifecycleEvent::Reconnected), 0);
    assert_eq!(queries.handle_event(LifecycleEvent::FocusGained), 1);
}

#[tokio::test(start_paused = true)]
async fn invalidate_makes_next_read_revalidate() {
    let source = catalog();
    let queries = queries(&source);
    queries.products().await.unwrap();

    assert!(queries.invalidate(&CacheKey::Products));
    let read = queries.products().await.unwrap();

    assert!(read.cache.is_stale());
    sleep(Duration::from_millis(10)).await;
    assert_eq!(source.list_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn unused_entries_are_evicted() {
    let source = catalog();
    let queries = QueryClient::builder(source.clone())
        .cache_config(CacheConfig::default().with_gc_time(Duration::from_secs(60)))
        .build();
    queries.products().await.unwrap();
    queries.categories().await.unwrap();

    advance(Duration::from_secs(30)).await;
    queries.products().await.unwrap();
    advance(Duration::from_secs(45)).await;

    assert_eq!(queries.gc(), 1);
    assert!(queries.cache().peek(&CacheKey::Categories).is_none());
    assert!(queries.cache().peek(&CacheKey::Products).is_some());
}

#[tokio::test(start_paused = true)]
async fn background_gc_stops_on_cancel() {
    let source = catalog();
    let queries = QueryClient::builder(source.clone())
        .cache_config(CacheConfig::default().with_gc_time(Duration::from_secs(60)))
        .build();
    queries.products().await.unwrap();

    let cancel = tokio_util::sync::CancellationToken::new();
    let handle = queries.spawn_gc(Duration::from_secs(30), cancel.clone());

    sleep(Duration::from_secs(100)).await;
    assert!(queries.cache().is_empty());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn watch_yields_state_changes() {
    let source = catalog();
    source.set_latency(Duration::from_millis(50));
    let queries = queries(&source);

    let mut states = Box::pin(queries.watch::<Arc<Vec<Product>>>(CacheKey::Products));
    let initial = states.next().await.unwrap();
    assert!(initial.data.is_none());
    assert!(!initial.is_fetching);

    let reader = tokio::spawn({
        let queries = queries.clone();
        async move { queries.products().await }
    });

    let fetching = states.next().await.unwrap();
    assert!(fetching.is_loading());

    let loaded = states.next().await.unwrap();
    assert_eq!(loaded.data.map(|d| d.len()), Some(3));
    assert!(!loaded.is_stale);

    reader.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn remove_and_clear_drop_entries() {
    let source = catalog();
    let queries = queries(&source);
    queries.products().await.unwrap();
    queries.categories().await.unwrap();

    assert!(queries.remove(&CacheKey::Categories));
    assert!(!queries.remove(&CacheKey::Categories));
    queries.clear();

    assert!(queries.cache().is_empty());
    assert!(queries.products().await.unwrap().cache.is_miss());
    assert_eq!(source.list_calls(), 2);
}
