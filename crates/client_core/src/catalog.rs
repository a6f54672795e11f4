//! Catalog query coordinator.
//!
//! Exactly one browsing mode is active at a time. Every transition bumps the
//! request epoch and resets or clamps the page; a response is applied only if
//! the epoch it was issued under is still current when it resolves.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::{
    future::{self, BoxFuture},
    FutureExt,
};
use shared::{
    domain::{Category, Product},
    protocol::ProductPage,
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{error::ClientResult, CatalogApi, DEFAULT_FEATURED_LIMIT};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BrowsingMode {
    #[default]
    All,
    Category(String),
    Search(String),
}

impl BrowsingMode {
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Category(name) => Some(name),
            _ => None,
        }
    }

    pub fn search_query(&self) -> Option<&str> {
        match self {
            Self::Search(query) => Some(query),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    page: u32,
    limit: u32,
    total: u64,
}

impl PaginationState {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            total: 0,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn total_pages(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.limit));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Nearest page in `[1, max(total_pages, 1)]`.
    pub fn clamp(&self, page: u32) -> u32 {
        page.clamp(1, self.total_pages().max(1))
    }
}

/// A fetch issued under a specific epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub epoch: u64,
    pub mode: BrowsingMode,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogResult {
    pub items: Vec<Product>,
    pub total: u64,
}

impl From<ProductPage> for CatalogResult {
    fn from(page: ProductPage) -> Self {
        Self {
            items: page.products,
            total: page.total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Applied { epoch: u64, total: u64 },
    Failed { epoch: u64 },
    Stale { epoch: u64, current: u64 },
    /// The accepted total put the current page out of range; the clamped page
    /// was issued as `query`.
    Reissued { epoch: u64, query: CatalogQuery },
    /// The operation did not issue a request.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSnapshot {
    pub mode: BrowsingMode,
    pub pagination: PaginationState,
    pub epoch: u64,
    pub is_loading: bool,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub featured: Vec<Product>,
}

#[derive(Debug, Clone)]
pub enum CatalogEvent {
    Loading(CatalogQuery),
    ResultsApplied(CatalogSnapshot),
    StaleDiscarded { epoch: u64, current: u64 },
    RequestFailed { epoch: u64, message: String },
    CategoriesLoaded(Vec<Category>),
    FeaturedLoaded(Vec<Product>),
}

/// The synchronous state machine behind [`CatalogCoordinator`].
#[derive(Debug, Clone)]
pub struct CatalogState {
    mode: BrowsingMode,
    pagination: PaginationState,
    epoch: u64,
    is_loading: bool,
    products: Vec<Product>,
    categories: Vec<Category>,
    featured: Vec<Product>,
}

impl CatalogState {
    pub fn new(limit: u32) -> Self {
        Self {
            mode: BrowsingMode::All,
            pagination: PaginationState::new(limit),
            epoch: 0,
            is_loading: false,
            products: Vec::new(),
            categories: Vec::new(),
            featured: Vec::new(),
        }
    }

    pub fn mode(&self) -> &BrowsingMode {
        &self.mode
    }

    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            mode: self.mode.clone(),
            pagination: self.pagination,
            epoch: self.epoch,
            is_loading: self.is_loading,
            products: self.products.clone(),
            categories: self.categories.clone(),
            featured: self.featured.clone(),
        }
    }

    /// Rejects a blank name without touching state.
    pub fn select_category(&mut self, name: &str) -> Option<CatalogQuery> {
        if name.trim().is_empty() {
            debug!("catalog: ignoring empty category selection");
            return None;
        }
        self.mode = BrowsingMode::Category(name.to_string());
        self.pagination.page = 1;
        Some(self.begin())
    }

    /// A blank query falls back to the unfiltered listing.
    pub fn search(&mut self, query: &str) -> CatalogQuery {
        let query = query.trim();
        self.mode = if query.is_empty() {
            BrowsingMode::All
        } else {
            BrowsingMode::Search(query.to_string())
        };
        self.pagination.page = 1;
        self.begin()
    }

    pub fn clear_filters(&mut self) -> CatalogQuery {
        self.mode = BrowsingMode::All;
        self.pagination.page = 1;
        self.begin()
    }

    /// No-op until a response has reported a non-zero total.
    pub fn go_to_page(&mut self, page: u32) -> Option<CatalogQuery> {
        if self.pagination.total_pages() == 0 {
            debug!(page, "catalog: nothing to page through");
            return None;
        }
        self.pagination.page = self.pagination.clamp(page);
        Some(self.begin())
    }

    pub fn next_page(&mut self) -> Option<CatalogQuery> {
        self.go_to_page(self.pagination.page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> Option<CatalogQuery> {
        self.go_to_page(self.pagination.page.saturating_sub(1))
    }

    /// Re-issues the current mode and page under a fresh epoch.
    pub fn refresh(&mut self) -> CatalogQuery {
        self.begin()
    }

    fn begin(&mut self) -> CatalogQuery {
        self.epoch += 1;
        self.is_loading = true;
        self.current_query()
    }

    fn current_query(&self) -> CatalogQuery {
        CatalogQuery {
            epoch: self.epoch,
            mode: self.mode.clone(),
            page: self.pagination.page,
            limit: self.pagination.limit,
        }
    }

    /// Reconciles the outcome of `query` with the current state.
    pub fn complete(
        &mut self,
        query: &CatalogQuery,
        outcome: ClientResult<CatalogResult>,
    ) -> Completion {
        if query.epoch != self.epoch {
            return Completion::Stale {
                epoch: query.epoch,
                current: self.epoch,
            };
        }

        match outcome {
            Ok(result) => {
                self.pagination.total = result.total;
                let clamped = self.pagination.clamp(self.pagination.page);
                if clamped != self.pagination.page {
                    self.pagination.page = clamped;
                    self.products.clear();
                    return Completion::Reissued {
                        epoch: query.epoch,
                        query: self.begin(),
                    };
                }
                self.products = result.items;
                self.is_loading = false;
                Completion::Applied {
                    epoch: query.epoch,
                    total: result.total,
                }
            }
            Err(err) => {
                warn!(
                    epoch = query.epoch,
                    mode = ?query.mode,
                    page = query.page,
                    "catalog: request failed: {err}"
                );
                self.products.clear();
                self.pagination.total = 0;
                self.is_loading = false;
                Completion::Failed { epoch: query.epoch }
            }
        }
    }

    pub fn set_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
    }

    pub fn set_featured(&mut self, featured: Vec<Product>) {
        self.featured = featured;
    }
}

/// Drives [`CatalogState`] against a [`CatalogApi`].
///
/// Each operation applies its transition before returning; the returned
/// future performs the fetch and may be awaited inline or spawned.
pub struct CatalogCoordinator {
    api: Arc<dyn CatalogApi>,
    state: Arc<Mutex<CatalogState>>,
    events: broadcast::Sender<CatalogEvent>,
    featured_limit: u32,
}

impl CatalogCoordinator {
    pub fn new(api: Arc<dyn CatalogApi>, limit: u32) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            api,
            state: Arc::new(Mutex::new(CatalogState::new(limit))),
            events,
            featured_limit: DEFAULT_FEATURED_LIMIT,
        }
    }

    pub fn with_featured_limit(mut self, featured_limit: u32) -> Self {
        self.featured_limit = featured_limit.max(1);
        self
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        lock(&self.state).snapshot()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    pub fn select_category(&self, name: &str) -> BoxFuture<'static, Completion> {
        let query = lock(&self.state).select_category(name);
        self.dispatch(query)
    }

    pub fn search(&self, query: &str) -> BoxFuture<'static, Completion> {
        let query = lock(&self.state).search(query);
        self.dispatch(Some(query))
    }

    pub fn clear_filters(&self) -> BoxFuture<'static, Completion> {
        let query = lock(&self.state).clear_filters();
        self.dispatch(Some(query))
    }

    pub fn go_to_page(&self, page: u32) -> BoxFuture<'static, Completion> {
        let query = lock(&self.state).go_to_page(page);
        self.dispatch(query)
    }

    pub fn next_page(&self) -> BoxFuture<'static, Completion> {
        let query = lock(&self.state).next_page();
        self.dispatch(query)
    }

    pub fn previous_page(&self) -> BoxFuture<'static, Completion> {
        let query = lock(&self.state).previous_page();
        self.dispatch(query)
    }

    pub fn refresh(&self) -> BoxFuture<'static, Completion> {
        let query = lock(&self.state).refresh();
        self.dispatch(Some(query))
    }

    /// Loads categories and featured products. Runs once per view and is not
    /// fenced by the epoch; a failure leaves the corresponding list empty.
    pub async fn load_bootstrap(&self) {
        let (categories, featured) = future::join(
            self.api.categories(),
            self.api.featured_products(self.featured_limit),
        )
        .await;

        let categories = categories.unwrap_or_else(|err| {
            warn!("catalog: failed to load categories: {err}");
            Vec::new()
        });
        let featured = featured.unwrap_or_else(|err| {
            warn!("catalog: failed to load featured products: {err}");
            Vec::new()
        });

        {
            let mut state = lock(&self.state);
            state.set_categories(categories.clone());
            state.set_featured(featured.clone());
        }
        let _ = self.events.send(CatalogEvent::CategoriesLoaded(categories));
        let _ = self.events.send(CatalogEvent::FeaturedLoaded(featured));
    }

    fn dispatch(&self, query: Option<CatalogQuery>) -> BoxFuture<'static, Completion> {
        let Some(query) = query else {
            return future::ready(Completion::Skipped).boxed();
        };
        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        run_query(api, state, events, query).boxed()
    }
}

async fn run_query(
    api: Arc<dyn CatalogApi>,
    state: Arc<Mutex<CatalogState>>,
    events: broadcast::Sender<CatalogEvent>,
    mut query: CatalogQuery,
) -> Completion {
    loop {
        debug!(epoch = query.epoch, mode = ?query.mode, page = query.page, "catalog: dispatch");
        let _ = events.send(CatalogEvent::Loading(query.clone()));

        let outcome = fetch(api.as_ref(), &query).await;
        let failure = outcome.as_ref().err().map(ToString::to_string);

        let (completion, snapshot) = {
            let mut guard = lock(&state);
            let completion = guard.complete(&query, outcome);
            (completion, guard.snapshot())
        };

        if let Completion::Reissued { query: next, .. } = completion {
            debug!(page = next.page, "catalog: page out of range, reissuing");
            query = next;
            continue;
        }

        match &completion {
            Completion::Applied { .. } => {
                let _ = events.send(CatalogEvent::ResultsApplied(snapshot));
            }
            Completion::Failed { epoch } => {
                let _ = events.send(CatalogEvent::RequestFailed {
                    epoch: *epoch,
                    message: failure.unwrap_or_default(),
                });
                let _ = events.send(CatalogEvent::ResultsApplied(snapshot));
            }
            Completion::Stale { epoch, current } => {
                debug!(epoch, current, "catalog: discarding stale response");
                let _ = events.send(CatalogEvent::StaleDiscarded {
                    epoch: *epoch,
                    current: *current,
                });
            }
            Completion::Reissued { .. } | Completion::Skipped => {}
        }
        return completion;
    }
}

async fn fetch(api: &dyn CatalogApi, query: &CatalogQuery) -> ClientResult<CatalogResult> {
    let page = match &query.mode {
        BrowsingMode::All => api.list_products(query.page, query.limit).await?,
        BrowsingMode::Category(name) => {
            api.products_by_category(name, query.page, query.limit)
                .await?
        }
        BrowsingMode::Search(text) => api.search_products(text, query.page, query.limit).await?,
    };
    Ok(page.into())
}

fn lock(state: &Mutex<CatalogState>) -> MutexGuard<'_, CatalogState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
