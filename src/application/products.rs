//! Catalog use cases: paginated listing through the listing cache, detail
//! lookups and writes that invalidate cached listings.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::application::render::{
    RenderContext, RenderError, effective_version, render_listing, render_product,
};
use crate::application::repos::{
    CreateProductParams, ProductWindow, ProductsRepo, ProductsWriteRepo, RepoError,
    UpdateProductParams,
};
use crate::cache::{ListingCache, ListingKey, PRODUCTS_TAG};
use crate::domain::api_keys::Role;
use crate::domain::entities::ProductRecord;
use crate::domain::products::{ProductDraft, ValidationErrors};
use crate::domain::version::ApiVersion;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("product not found")]
    NotFound,
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("invalid pagination: {0}")]
    InvalidPagination(&'static str),
    #[error(transparent)]
    Repo(RepoError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl From<RepoError> for ProductError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}

/// Pagination bounds and cache lifetime applied to listings.
#[derive(Debug, Clone, Copy)]
pub struct ListingSettings {
    pub default_limit: NonZeroU32,
    pub max_limit: NonZeroU32,
    /// `None` keeps cached pages until invalidated or evicted.
    pub ttl: Option<Duration>,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            default_limit: NonZeroU32::new(3).unwrap_or(NonZeroU32::MIN),
            max_limit: NonZeroU32::new(100).unwrap_or(NonZeroU32::MIN),
            ttl: Some(Duration::from_secs(60)),
        }
    }
}

/// Raw pagination parameters as supplied by a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CreatedProduct {
    pub record: ProductRecord,
    pub body: Value,
}

#[derive(Clone)]
pub struct ProductService {
    reader: Arc<dyn ProductsRepo>,
    writer: Arc<dyn ProductsWriteRepo>,
    listing_cache: Option<Arc<ListingCache>>,
    settings: ListingSettings,
}

impl ProductService {
    pub fn new(
        reader: Arc<dyn ProductsRepo>,
        writer: Arc<dyn ProductsWriteRepo>,
        settings: ListingSettings,
    ) -> Self {
        Self {
            reader,
            writer,
            listing_cache: None,
            settings,
        }
    }

    pub fn with_listing_cache(mut self, cache: Arc<ListingCache>) -> Self {
        self.listing_cache = Some(cache);
        self
    }

    /// Set the listing cache for this service (optional).
    pub fn with_listing_cache_opt(mut self, cache: Option<Arc<ListingCache>>) -> Self {
        self.listing_cache = cache;
        self
    }

    pub fn listing_cache(&self) -> Option<&Arc<ListingCache>> {
        self.listing_cache.as_ref()
    }

    /// Resolve client pagination into a cache key and a store window.
    pub fn paginate(&self, query: ListingQuery) -> Result<(ListingKey, ProductWindow), ProductError> {
        let page = query.page.unwrap_or(1);
        if page == 0 {
            return Err(ProductError::InvalidPagination("page must be at least 1"));
        }

        let limit = query.limit.unwrap_or(self.settings.default_limit.get());
        if limit == 0 {
            return Err(ProductError::InvalidPagination("limit must be at least 1"));
        }
        let limit = limit.min(self.settings.max_limit.get());

        let offset = u64::from(page - 1)
            .checked_mul(u64::from(limit))
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or(ProductError::InvalidPagination("page is out of range"))?;

        Ok((ListingKey::new(page, limit), ProductWindow { offset, limit }))
    }

    /// Render one listing page as a JSON array, served from the listing cache when enabled.
    pub async fn list(
        &self,
        query: ListingQuery,
        version: ApiVersion,
    ) -> Result<String, ProductError> {
        let (key, window) = self.paginate(query)?;
        let version = effective_version(version);
        let ctx = RenderContext::listing(version);

        let Some(cache) = &self.listing_cache else {
            return self.render_page(window, &ctx).await;
        };

        cache
            .get_or_compute(
                &key.storage_key(version),
                &[PRODUCTS_TAG],
                self.settings.ttl,
                || self.render_page(window, &ctx),
            )
            .await
    }

    /// Render a single product. Never touches the listing cache.
    pub async fn detail(
        &self,
        id: i64,
        version: ApiVersion,
        viewer: Option<Role>,
    ) -> Result<Value, ProductError> {
        let product = self
            .reader
            .find_product(id)
            .await?
            .ok_or(ProductError::NotFound)?;
        Ok(render_product(
            &product,
            &RenderContext::detail(version, viewer),
        )?)
    }

    pub async fn create(
        &self,
        draft: ProductDraft,
        version: ApiVersion,
        viewer: Option<Role>,
    ) -> Result<CreatedProduct, ProductError> {
        let valid = draft.validate()?;
        let record = self
            .writer
            .create_product(CreateProductParams {
                name: valid.name,
                price: valid.price,
            })
            .await?;

        self.invalidate_listings("create", record.id);
        info!(
            target = "crema::application::products",
            product_id = record.id,
            "Created product"
        );

        let body = render_product(&record, &RenderContext::detail(version, viewer))?;
        Ok(CreatedProduct { record, body })
    }

    /// Merge `draft` onto the stored product, validate the result and persist it.
    pub async fn update(&self, id: i64, draft: ProductDraft) -> Result<ProductRecord, ProductError> {
        let current = self
            .reader
            .find_product(id)
            .await?
            .ok_or(ProductError::NotFound)?;

        let merged = ProductDraft {
            name: draft.name.or(Some(current.name)),
            price: draft.price.or(Some(current.price)),
        };
        let valid = merged.validate()?;

        let record = self
            .writer
            .update_product(UpdateProductParams {
                id,
                name: valid.name,
                price: valid.price,
            })
            .await?;

        self.invalidate_listings("update", id);
        info!(
            target = "crema::application::products",
            product_id = id,
            "Updated product"
        );
        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ProductError> {
        self.reader
            .find_product(id)
            .await?
            .ok_or(ProductError::NotFound)?;

        self.invalidate_listings("delete", id);
        self.writer.delete_product(id).await?;
        // pages rendered while the row was still stored carry the first generation
        self.invalidate_listings("delete", id);

        info!(
            target = "crema::application::products",
            product_id = id,
            "Deleted product"
        );
        Ok(())
    }

    async fn render_page(
        &self,
        window: ProductWindow,
        ctx: &RenderContext,
    ) -> Result<String, ProductError> {
        let products = self.reader.list_products_page(window).await?;
        debug!(
            target = "crema::application::products",
            offset = window.offset,
            limit = window.limit,
            returned = products.len(),
            "Fetched listing page from store"
        );
        Ok(render_listing(&products, ctx)?)
    }

    fn invalidate_listings(&self, cause: &'static str, product_id: i64) {
        if let Some(cache) = &self.listing_cache {
            cache.invalidate_tag(PRODUCTS_TAG);
            debug!(
                target = "crema::application::products",
                cause,
                product_id,
                tag = PRODUCTS_TAG,
                "Invalidated listing cache"
            );
        }
    }
}
