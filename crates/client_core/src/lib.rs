use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use shared::{
    domain::{Category, Product, ProductId},
    protocol::ProductPage,
};

pub mod api;
pub mod catalog;
pub mod error;
pub mod session;
pub mod validation;

pub use api::StorefrontClient;
pub use catalog::{
    BrowsingMode, CatalogCoordinator, CatalogEvent, CatalogQuery, CatalogResult, CatalogSnapshot,
    Completion, PaginationState,
};
pub use error::{ClientError, ClientResult};
pub use session::SessionClient;

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const DEFAULT_FEATURED_LIMIT: u32 = 8;

/// Read endpoints of the catalog. The coordinator only ever talks to this seam.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_products(&self, page: u32, limit: u32) -> ClientResult<ProductPage>;
    async fn products_by_category(
        &self,
        category: &str,
        page: u32,
        limit: u32,
    ) -> ClientResult<ProductPage>;
    async fn search_products(&self, query: &str, page: u32, limit: u32)
        -> ClientResult<ProductPage>;
    async fn featured_products(&self, limit: u32) -> ClientResult<Vec<Product>>;
    async fn categories(&self) -> ClientResult<Vec<Category>>;
    async fn product(&self, id: ProductId) -> ClientResult<Product>;
}

/// Source of the bearer token attached to authorized requests.
pub trait TokenProvider: Send + Sync {
    fn current_token(&self) -> Option<String>;
    fn store_token(&self, token: String);
    fn clear_token(&self);
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenProvider for MemoryTokenStore {
    fn current_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|t| !t.is_empty())
    }

    fn store_token(&self, token: String) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn clear_token(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
#[path = "tests/mock_backend.rs"]
mod mock_backend;
