//! Orchestration of transport, cache and pagination cursor.
//!
//! # Design
//! `PokemonRepository` is the only owner of the detail cache and the listing
//! cursor. Each operation returns a cold `LifecycleStream`: nothing happens
//! until the stream is polled, the first item is always `Pending`, the second
//! is the terminal `Success` or `Failure`, and then the stream ends. Dropping
//! the stream drops the in-flight request future with it.
//!
//! The repository is cheap to clone; clones share state. Operations may run
//! concurrently. The cursor advance after a successful page is a
//! compare-and-set on the offset that was fetched, so a page that lands after
//! an interleaved refresh or cache clear does not move the reset cursor.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::{stream, FutureExt, StreamExt};
use tracing::{debug, info};

use crate::cache::DetailCache;
use crate::config::SdkConfig;
use crate::state::{LifecycleState, LifecycleStream};
use crate::transport::{HttpExecutor, Transport};
use crate::types::{AbilityDetail, DetailKey, ListingEntry, Pokemon, TypeDetail};

/// Listing offset plus the fixed page size it advances by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    offset: u32,
    page_size: u32,
}

impl PaginationCursor {
    pub fn new(page_size: u32) -> Self {
        Self {
            offset: 0,
            page_size,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Advance by one page if the cursor still sits at `fetched`.
    fn advance_from(&mut self, fetched: u32) -> bool {
        if self.offset != fetched {
            return false;
        }
        self.offset = fetched.saturating_add(self.page_size);
        true
    }
}

struct Inner<E> {
    transport: Transport<E>,
    cache: DetailCache,
    cursor: Mutex<PaginationCursor>,
    search_limit: u32,
}

impl<E> Inner<E> {
    fn cursor(&self) -> MutexGuard<'_, PaginationCursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct PokemonRepository<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for PokemonRepository<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: HttpExecutor> PokemonRepository<E> {
    pub fn new(config: &SdkConfig, executor: E) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport: Transport::new(config, executor),
                cache: DetailCache::new(),
                cursor: Mutex::new(PaginationCursor::new(config.page_size)),
                search_limit: config.search_limit,
            }),
        }
    }

    /// Next page of the listing, or the first page again when `refresh` is
    /// set. The reset happens before the fetch and sticks even if the fetch
    /// fails.
    pub fn list_page(&self, refresh: bool) -> LifecycleStream<Vec<ListingEntry>> {
        let inner = Arc::clone(&self.inner);
        lifecycle(async move {
            let (offset, page_size) = {
                let mut cursor = inner.cursor();
                if refresh {
                    cursor.reset();
                    info!("listing cursor reset");
                }
                (cursor.offset(), cursor.page_size())
            };

            let page = inner
                .transport
                .fetch_listing(page_size, offset)
                .await
                .map_err(|e| format!("failed to fetch pokemon list: {e}"))?;

            if !inner.cursor().advance_from(offset) {
                debug!(offset, "cursor moved while page was in flight; not advancing");
            }
            debug!(offset, entries = page.results.len(), "listing page loaded");
            Ok(page.results)
        })
    }

    /// Case-insensitive substring match over the first `search_limit` listing
    /// entries, in listing order.
    pub fn search(&self, query: &str) -> LifecycleStream<Vec<ListingEntry>> {
        let inner = Arc::clone(&self.inner);
        let needle = query.to_lowercase();
        lifecycle(async move {
            let page = inner
                .transport
                .fetch_listing(inner.search_limit, 0)
                .await
                .map_err(|e| format!("failed to search pokemon: {e}"))?;
            let matches: Vec<ListingEntry> = page
                .results
                .into_iter()
                .filter(|entry| entry.name.to_lowercase().contains(&needle))
                .collect();
            debug!(query = %needle, matches = matches.len(), "search complete");
            Ok(matches)
        })
    }

    /// Detail record by id or name. Served from the cache unless
    /// `force_refresh` is set; a fetched record replaces any cached one.
    pub fn get_detail(
        &self,
        key: impl Into<DetailKey>,
        force_refresh: bool,
    ) -> LifecycleStream<Arc<Pokemon>> {
        let inner = Arc::clone(&self.inner);
        let key = key.into();
        lifecycle(async move {
            if !force_refresh {
                if let Some(hit) = inner.cache.get(&key) {
                    debug!(%key, "detail cache hit");
                    return Ok(hit);
                }
            }
            debug!(%key, force_refresh, "fetching detail");

            let record = inner
                .transport
                .fetch_detail(&key)
                .await
                .map(Arc::new)
                .map_err(|e| format!("failed to fetch pokemon details: {e}"))?;
            inner.cache.put(Arc::clone(&record));
            Ok(record)
        })
    }

    pub fn get_ability_detail(&self, name: &str) -> LifecycleStream<AbilityDetail> {
        let inner = Arc::clone(&self.inner);
        let name = name.to_string();
        lifecycle(async move {
            inner
                .transport
                .fetch_ability_detail(&name)
                .await
                .map_err(|e| format!("failed to fetch ability details: {e}"))
        })
    }

    pub fn get_type_detail(&self, name: &str) -> LifecycleStream<TypeDetail> {
        let inner = Arc::clone(&self.inner);
        let name = name.to_string();
        lifecycle(async move {
            inner
                .transport
                .fetch_type_detail(&name)
                .await
                .map_err(|e| format!("failed to fetch type details: {e}"))
        })
    }

    /// Drop every cached record and rewind the listing cursor.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        self.inner.cursor().reset();
        info!("cache cleared");
    }

    pub fn cached_count(&self) -> usize {
        self.inner.cache.len()
    }

    pub fn current_offset(&self) -> u32 {
        self.inner.cursor().offset()
    }

    pub fn page_size(&self) -> u32 {
        self.inner.cursor().page_size()
    }

    /// Release the executor's connections.
    pub fn close(&self) {
        self.inner.transport.close();
    }
}

/// `Pending`, then the outcome of `work`.
fn lifecycle<T, F>(work: F) -> LifecycleStream<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T, String>> + Send + 'static,
{
    Box::pin(
        stream::iter([LifecycleState::Pending])
            .chain(stream::once(work.map(LifecycleState::from))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubExecutor, BASE_URL};

    fn repository(stub: &Arc<StubExecutor>) -> PokemonRepository<Arc<StubExecutor>> {
        let config = SdkConfig::default().with_base_url(BASE_URL);
        PokemonRepository::new(&config, Arc::clone(stub))
    }

    async fn run<T>(stream: LifecycleStream<T>) -> Vec<LifecycleState<T>> {
        stream.collect().await
    }

    fn names(entries: &[ListingEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[tokio::test]
    async fn list_page_emits_pending_then_success_and_advances() {
        let stub = Arc::new(StubExecutor::numbered(45));
        let repo = repository(&stub);

        let states = run(repo.list_page(false)).await;
        assert_eq!(states.len(), 2);
        assert!(states[0].is_pending());
        assert_eq!(states[1].data().unwrap().len(), 20);
        assert_eq!(repo.current_offset(), 20);

        let states = run(repo.list_page(false)).await;
        assert_eq!(states[1].data().unwrap()[0].name, "mon-21");
        assert_eq!(repo.current_offset(), 40);
        assert_eq!(
            stub.requests(),
            ["pokemon?limit=20&offset=0", "pokemon?limit=20&offset=20"]
        );
    }

    #[tokio::test]
    async fn short_last_page_still_advances_by_page_size() {
        let stub = Arc::new(StubExecutor::numbered(25));
        let repo = repository(&stub);

        run(repo.list_page(false)).await;
        let states = run(repo.list_page(false)).await;
        let entries = states[1].data().unwrap();
        assert_eq!(entries.len(), 5);
        assert!(crate::types::is_last_page(entries, repo.page_size()));
        assert_eq!(repo.current_offset(), 40);
    }

    #[tokio::test]
    async fn failed_page_leaves_cursor_unchanged() {
        let stub = Arc::new(StubExecutor::numbered(60));
        let repo = repository(&stub);
        run(repo.list_page(false)).await;

        stub.set_offline(true);
        let states = run(repo.list_page(false)).await;
        assert!(states[0].is_pending());
        let message = states[1].failure_message().unwrap();
        assert!(message.starts_with("failed to fetch pokemon list"), "{message}");
        assert_eq!(repo.current_offset(), 20);

        stub.set_offline(false);
        let states = run(repo.list_page(false)).await;
        assert_eq!(states[1].data().unwrap()[0].name, "mon-21");
    }

    #[tokio::test]
    async fn server_error_page_yields_a_short_failure_message() {
        let stub = Arc::new(StubExecutor::numbered(5));
        let repo = repository(&stub);
        let error_page = format!("<html><body>{}</body></html>", "x".repeat(10_000));
        stub.set_outage(Some((500, &error_page)));

        let states = run(repo.list_page(false)).await;
        assert_eq!(
            states[1].failure_message(),
            Some("failed to fetch pokemon list: unexpected HTTP status 500")
        );
        let states = run(repo.get_detail(3u32, false)).await;
        let message = states[1].failure_message().unwrap();
        assert!(message.len() < 80, "{message}");
        assert!(!message.contains("<html>"));
    }

    #[tokio::test]
    async fn refresh_resets_cursor_even_when_fetch_fails() {
        let stub = Arc::new(StubExecutor::numbered(60));
        let repo = repository(&stub);
        run(repo.list_page(false)).await;
        run(repo.list_page(false)).await;
        assert_eq!(repo.current_offset(), 40);

        stub.set_offline(true);
        let states = run(repo.list_page(true)).await;
        assert!(states[1].failure_message().is_some());
        assert_eq!(repo.current_offset(), 0);
        assert_eq!(stub.requests().last().unwrap(), "pokemon?limit=20&offset=0");

        stub.set_offline(false);
        let states = run(repo.list_page(true)).await;
        assert_eq!(states[1].data().unwrap()[0].name, "mon-1");
        assert_eq!(repo.current_offset(), 20);
    }

    #[tokio::test]
    async fn stale_page_does_not_advance_after_reset() {
        let stub = Arc::new(StubExecutor::numbered(60));
        let repo = repository(&stub);
        run(repo.list_page(false)).await;

        stub.pause();
        let mut in_flight = repo.list_page(false);
        assert!(in_flight.next().await.unwrap().is_pending());
        let terminal = tokio::spawn(async move { in_flight.next().await });
        while stub.request_count() < 2 {
            tokio::task::yield_now().await;
        }

        repo.clear_cache();
        stub.resume();
        let terminal = terminal.await.unwrap().unwrap();
        assert_eq!(terminal.data().unwrap()[0].name, "mon-21");
        assert_eq!(repo.current_offset(), 0);
    }

    #[tokio::test]
    async fn search_filters_case_insensitively_in_source_order() {
        let stub = Arc::new(StubExecutor::with_catalog(&[
            "charmander",
            "squirtle",
            "charizard",
        ]));
        let repo = repository(&stub);

        let states = run(repo.search("char")).await;
        assert_eq!(names(states[1].data().unwrap()), ["charmander", "charizard"]);

        let states = run(repo.search("CHAR")).await;
        assert_eq!(names(states[1].data().unwrap()), ["charmander", "charizard"]);

        assert_eq!(
            stub.requests(),
            ["pokemon?limit=1000&offset=0", "pokemon?limit=1000&offset=0"]
        );
        assert_eq!(repo.current_offset(), 0);
        assert_eq!(repo.cached_count(), 0);
    }

    #[tokio::test]
    async fn search_failure_is_a_failure_state() {
        let stub = Arc::new(StubExecutor::numbered(3));
        stub.set_offline(true);
        let repo = repository(&stub);
        let states = run(repo.search("mon")).await;
        assert!(states[1]
            .failure_message()
            .unwrap()
            .starts_with("failed to search pokemon"));
    }

    #[tokio::test]
    async fn cached_detail_issues_no_transport_call() {
        let stub = Arc::new(StubExecutor::with_catalog(&["bulbasaur", "ivysaur"]));
        let repo = repository(&stub);

        let states = run(repo.get_detail(1u32, false)).await;
        assert!(states[0].is_pending());
        assert_eq!(states[1].data().unwrap().id, 1);
        assert_eq!(repo.cached_count(), 1);
        assert_eq!(stub.request_count(), 1);

        let states = run(repo.get_detail(1u32, false)).await;
        assert_eq!(states.len(), 2);
        assert!(states[0].is_pending());
        assert_eq!(states[1].data().unwrap().name, "bulbasaur");
        assert_eq!(stub.request_count(), 1);

        let states = run(repo.get_detail("BULBASAUR", false)).await;
        assert_eq!(states[1].data().unwrap().id, 1);
        assert_eq!(stub.request_count(), 1);
    }

    #[tokio::test]
    async fn force_refresh_always_fetches_and_overwrites() {
        let stub = Arc::new(StubExecutor::with_catalog(&["bulbasaur"]));
        let repo = repository(&stub);

        let first = run(repo.get_detail(1u32, false)).await[1].clone().into_data().unwrap();
        let second = run(repo.get_detail(1u32, true)).await[1].clone().into_data().unwrap();
        assert_eq!(stub.request_count(), 2);
        assert_eq!(*first, *second);
        assert!(!Arc::ptr_eq(&first, &second));

        let cached = run(repo.get_detail(1u32, false)).await[1].clone().into_data().unwrap();
        assert!(Arc::ptr_eq(&cached, &second));
        assert_eq!(repo.cached_count(), 1);
    }

    #[tokio::test]
    async fn failed_detail_does_not_touch_cache() {
        let stub = Arc::new(StubExecutor::with_catalog(&["bulbasaur"]));
        let repo = repository(&stub);

        let states = run(repo.get_detail("missingno", false)).await;
        assert_eq!(
            states[1].failure_message(),
            Some("failed to fetch pokemon details: resource not found")
        );
        assert_eq!(repo.cached_count(), 0);

        run(repo.get_detail(1u32, false)).await;
        stub.set_offline(true);
        let states = run(repo.get_detail(1u32, true)).await;
        assert!(states[1].failure_message().is_some());
        assert_eq!(repo.cached_count(), 1);
    }

    #[tokio::test]
    async fn detail_by_name_is_lowercased_and_cached_by_id() {
        let stub = Arc::new(StubExecutor::with_catalog(&["bulbasaur", "ivysaur"]));
        let repo = repository(&stub);

        let states = run(repo.get_detail("IvySaur", false)).await;
        assert_eq!(states[1].data().unwrap().id, 2);
        assert_eq!(stub.requests(), ["pokemon/ivysaur"]);

        run(repo.get_detail(2u32, false)).await;
        assert_eq!(stub.request_count(), 1);
    }

    #[tokio::test]
    async fn auxiliary_lookups_pass_through_uncached() {
        let stub = Arc::new(StubExecutor::numbered(1));
        let repo = repository(&stub);

        let states = run(repo.get_ability_detail("Overgrow")).await;
        assert!(states[0].is_pending());
        assert_eq!(states[1].data().unwrap().english_effect(), Some("short"));

        let states = run(repo.get_type_detail("fire")).await;
        assert_eq!(states[1].data().unwrap().name, "fire");

        run(repo.get_type_detail("fire")).await;
        assert_eq!(stub.requests(), ["ability/overgrow", "type/fire", "type/fire"]);

        stub.set_offline(true);
        let states = run(repo.get_ability_detail("overgrow")).await;
        assert!(states[1]
            .failure_message()
            .unwrap()
            .starts_with("failed to fetch ability details"));
    }

    #[tokio::test]
    async fn clear_cache_empties_cache_and_rewinds_cursor() {
        let stub = Arc::new(StubExecutor::numbered(50));
        let repo = repository(&stub);
        run(repo.list_page(false)).await;
        run(repo.get_detail(3u32, false)).await;
        run(repo.get_detail(4u32, false)).await;
        assert_eq!(repo.cached_count(), 2);
        assert_eq!(repo.current_offset(), 20);

        repo.clear_cache();
        assert_eq!(repo.cached_count(), 0);
        assert_eq!(repo.current_offset(), 0);

        run(repo.get_detail(3u32, false)).await;
        assert_eq!(stub.requests().last().unwrap(), "pokemon/3");
    }

    #[tokio::test]
    async fn concurrent_detail_fetches_are_independent() {
        let stub = Arc::new(StubExecutor::with_catalog(&["bulbasaur", "ivysaur"]));
        let repo = repository(&stub);

        let (left, right) = futures::join!(run(repo.get_detail(1u32, false)), run(repo.get_detail(2u32, false)));
        assert_eq!(left[1].data().unwrap().name, "bulbasaur");
        assert_eq!(right[1].data().unwrap().name, "ivysaur");
        assert_eq!(repo.cached_count(), 2);
    }

    #[test]
    fn cursor_advance_is_conditional() {
        let mut cursor = PaginationCursor::new(20);
        assert!(cursor.advance_from(0));
        assert_eq!(cursor.offset(), 20);
        assert!(!cursor.advance_from(0));
        assert_eq!(cursor.offset(), 20);
        cursor.reset();
        assert_eq!(cursor.offset(), 0);
    }

    #[tokio::test]
    async fn streams_are_cold_until_polled() {
        let stub = Arc::new(StubExecutor::numbered(5));
        let repo = repository(&stub);
        let stream = repo.list_page(true);
        assert_eq!(stub.request_count(), 0);
        drop(stream);
        assert_eq!(stub.request_count(), 0);
    }
}
