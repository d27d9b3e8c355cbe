//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::api_keys::{ApiKeyRecord, Role};
use crate::domain::entities::ProductRecord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// A window over the catalog ordered by ascending id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductWindow {
    pub offset: u64,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct CreateProductParams {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct UpdateProductParams {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

#[async_trait]
pub trait ProductsRepo: Send + Sync {
    async fn find_product(&self, id: i64) -> Result<Option<ProductRecord>, RepoError>;

    /// Return at most `window.limit` products starting at `window.offset`.
    async fn list_products_page(
        &self,
        window: ProductWindow,
    ) -> Result<Vec<ProductRecord>, RepoError>;

    async fn count_products(&self) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait ProductsWriteRepo: Send + Sync {
    async fn create_product(&self, params: CreateProductParams)
    -> Result<ProductRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when no product has `params.id`.
    async fn update_product(&self, params: UpdateProductParams)
    -> Result<ProductRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when no product has `id`.
    async fn delete_product(&self, id: i64) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateApiKeyParams {
    pub name: String,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub role: Role,
    pub expires_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait ApiKeysRepo: Send + Sync {
    async fn create_key(&self, params: CreateApiKeyParams) -> Result<ApiKeyRecord, RepoError>;

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<ApiKeyRecord>, RepoError>;

    async fn update_last_used(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError>;

    async fn revoke_key(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
