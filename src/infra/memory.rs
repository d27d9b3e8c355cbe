//! Volatile repositories used when no database is configured, and by tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::repos::{
    ApiKeysRepo, CreateApiKeyParams, CreateProductParams, ProductWindow, ProductsRepo,
    ProductsWriteRepo, RepoError, StoreHealth, UpdateProductParams,
};
use crate::domain::api_keys::ApiKeyRecord;
use crate::domain::entities::ProductRecord;

/// Keeps products ordered by id so pages match the Postgres ordering.
pub struct InMemoryRepositories {
    products: RwLock<BTreeMap<i64, ProductRecord>>,
    api_keys: RwLock<BTreeMap<String, ApiKeyRecord>>,
    next_product_id: AtomicI64,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self {
            products: RwLock::new(BTreeMap::new()),
            api_keys: RwLock::new(BTreeMap::new()),
            next_product_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryRepositories {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductsRepo for InMemoryRepositories {
    async fn find_product(&self, id: i64) -> Result<Option<ProductRecord>, RepoError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list_products_page(
        &self,
        window: ProductWindow,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        let skip = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let take = usize::try_from(window.limit).unwrap_or(usize::MAX);
        Ok(self
            .products
            .read()
            .await
            .values()
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn count_products(&self) -> Result<u64, RepoError> {
        Ok(self.products.read().await.len() as u64)
    }
}

#[async_trait]
impl ProductsWriteRepo for InMemoryRepositories {
    async fn create_product(
        &self,
        params: CreateProductParams,
    ) -> Result<ProductRecord, RepoError> {
        let id = self.next_product_id.fetch_add(1, Ordering::SeqCst);
        let record = ProductRecord {
            id,
            name: params.name,
            price: params.price,
        };
        self.products.write().await.insert(id, record.clone());
        Ok(record)
    }

    async fn update_product(
        &self,
        params: UpdateProductParams,
    ) -> Result<ProductRecord, RepoError> {
        let mut products = self.products.write().await;
        let record = products.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        record.name = params.name;
        record.price = params.price;
        Ok(record.clone())
    }

    async fn delete_product(&self, id: i64) -> Result<(), RepoError> {
        self.products
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl ApiKeysRepo for InMemoryRepositories {
    async fn create_key(&self, params: CreateApiKeyParams) -> Result<ApiKeyRecord, RepoError> {
        let mut keys = self.api_keys.write().await;
        if keys.contains_key(&params.prefix) {
            return Err(RepoError::Duplicate {
                constraint: "api_keys_prefix_key".to_string(),
            });
        }

        let record = ApiKeyRecord {
            id: Uuid::new_v4(),
            name: params.name,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            role: params.role,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
            revoked_at: None,
            last_used_at: None,
        };
        keys.insert(record.prefix.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<ApiKeyRecord>, RepoError> {
        Ok(self.api_keys.read().await.get(prefix).cloned())
    }

    async fn update_last_used(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError> {
        let mut keys = self.api_keys.write().await;
        if let Some(record) = keys.values_mut().find(|record| record.id == id) {
            record.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn revoke_key(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError> {
        let mut keys = self.api_keys.write().await;
        let record = keys
            .values_mut()
            .find(|record| record.id == id)
            .ok_or(RepoError::NotFound)?;
        record.revoked_at.get_or_insert(at);
        Ok(())
    }
}

#[async_trait]
impl StoreHealth for InMemoryRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(name: &str) -> CreateProductParams {
        CreateProductParams {
            name: name.to_string(),
            price: 1.0,
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_in_insertion_order() {
        let repos = InMemoryRepositories::new();
        let first = repos.create_product(params("a")).await.expect("create");
        let second = repos.create_product(params("b")).await.expect("create");
        assert_eq!((first.id, second.id), (1, 2));
    }

    #[tokio::test]
    async fn pages_follow_id_order_after_deletes() {
        let repos = InMemoryRepositories::new();
        for name in ["P1", "P2", "P3", "P4"] {
            repos.create_product(params(name)).await.expect("create");
        }
        repos.delete_product(2).await.expect("delete");

        let page = repos
            .list_products_page(ProductWindow { offset: 1, limit: 5 })
            .await
            .expect("page");
        let names: Vec<_> = page.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["P3", "P4"]);

        let created = repos.create_product(params("P5")).await.expect("create");
        assert_eq!(created.id, 5);
    }

    #[tokio::test]
    async fn missing_rows_report_not_found() {
        let repos = InMemoryRepositories::new();
        assert!(matches!(
            repos.delete_product(1).await,
            Err(RepoError::NotFound)
        ));
        assert!(matches!(
            repos
                .update_product(UpdateProductParams {
                    id: 1,
                    name: "x".into(),
                    price: 0.0,
                })
                .await,
            Err(RepoError::NotFound)
        ));
    }
}
