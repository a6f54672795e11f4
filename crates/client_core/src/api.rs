use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Category, Product, ProductId},
    error::{ApiErrorBody, ApiException},
    protocol::{CategoryList, FeaturedProducts, ProductPage},
};
use tracing::debug;
use url::Url;

use crate::{
    error::{ClientError, ClientResult},
    CatalogApi, TokenProvider,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the storefront backend.
///
/// Paths are resolved against `base_url`, so a backend mounted under a prefix
/// (`https://shop.example/store/`) works the same as one at the root.
#[derive(Clone)]
pub struct StorefrontClient {
    http: Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl StorefrontClient {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenProvider>) -> ClientResult<Self> {
        Self::with_timeout(base_url, tokens, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        tokens: Arc<dyn TokenProvider>,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            tokens,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenProvider> {
        &self.tokens
    }

    /// Builds `<base>/<segments...>`; each segment is percent-escaped.
    pub fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.tokens.current_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> ClientResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let error_body = serde_json::from_slice::<ApiErrorBody>(&body).ok();
            return Err(ApiException::from_status(status.as_u16(), error_body).into());
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_page(&self, url: Url, query: &[(&str, String)]) -> ClientResult<ProductPage> {
        debug!(%url, ?query, "catalog: fetching page");
        self.send_json(self.request(Method::GET, url).query(query))
            .await
    }
}

#[async_trait]
impl CatalogApi for StorefrontClient {
    async fn list_products(&self, page: u32, limit: u32) -> ClientResult<ProductPage> {
        let url = self.endpoint(&["api", "products"])?;
        self.get_page(
            url,
            &[("page", page.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn products_by_category(
        &self,
        category: &str,
        page: u32,
        limit: u32,
    ) -> ClientResult<ProductPage> {
        let url = self.endpoint(&["api", "products", "category", category])?;
        self.get_page(
            url,
            &[("page", page.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn search_products(
        &self,
        query: &str,
        page: u32,
        limit: u32,
    ) -> ClientResult<ProductPage> {
        let url = self.endpoint(&["api", "products", "search"])?;
        self.get_page(
            url,
            &[
                ("q", query.to_string()),
                ("page", page.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn featured_products(&self, limit: u32) -> ClientResult<Vec<Product>> {
        let url = self.endpoint(&["api", "products", "featured"])?;
        let body: FeaturedProducts = self
            .send_json(
                self.request(Method::GET, url)
                    .query(&[("limit", limit.to_string())]),
            )
            .await?;
        Ok(body.products)
    }

    async fn categories(&self) -> ClientResult<Vec<Category>> {
        let url = self.endpoint(&["api", "categories"])?;
        let body: CategoryList = self.send_json(self.request(Method::GET, url)).await?;
        Ok(body.categories)
    }

    async fn product(&self, id: ProductId) -> ClientResult<Product> {
        let url = self.endpoint(&["api", "products", &id.to_string()])?;
        self.send_json(self.request(Method::GET, url)).await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
