//! Demo catalog and credentials for local development.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::api_keys::{ApiKeyError, ApiKeyIssued, ApiKeyService, IssueApiKeyCommand};
use crate::application::repos::{CreateProductParams, ProductsRepo, ProductsWriteRepo, RepoError};
use crate::domain::api_keys::Role;

pub const FIXTURE_PRODUCT_COUNT: u32 = 16;

/// Accounts issued alongside the demo catalog.
pub const FIXTURE_KEYS: [(&str, Role); 2] = [
    ("user@starbucks.com", Role::User),
    ("admin@starbucks.com", Role::Admin),
];

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    ApiKey(#[from] ApiKeyError),
}

#[derive(Debug)]
pub struct SeedReport {
    pub products_created: u32,
    pub keys: Vec<ApiKeyIssued>,
}

/// Name and price of the `index`-th demo product, 1-based.
pub fn fixture_product(index: u32) -> CreateProductParams {
    let cents = 392 + 10 * index.saturating_sub(1);
    CreateProductParams {
        name: format!("Café Latte {index}"),
        price: f64::from(cents) / 100.0,
    }
}

/// Load demo products into an empty catalog and issue one key per fixture account.
pub async fn seed(
    reader: Arc<dyn ProductsRepo>,
    writer: Arc<dyn ProductsWriteRepo>,
    api_keys: &ApiKeyService,
) -> Result<SeedReport, FixtureError> {
    let mut products_created = 0;
    if reader.count_products().await? == 0 {
        for index in 1..=FIXTURE_PRODUCT_COUNT {
            writer.create_product(fixture_product(index)).await?;
            products_created += 1;
        }
    } else {
        info!(
            target = "crema::application::fixtures",
            "Catalog is not empty; skipping product fixtures"
        );
    }

    let mut keys = Vec::with_capacity(FIXTURE_KEYS.len());
    for (name, role) in FIXTURE_KEYS {
        let issued = api_keys
            .issue(IssueApiKeyCommand {
                name: name.to_string(),
                role,
                expires_at: None,
            })
            .await?;
        keys.push(issued);
    }

    info!(
        target = "crema::application::fixtures",
        products_created,
        keys_issued = keys.len(),
        "Loaded fixtures"
    );
    Ok(SeedReport {
        products_created,
        keys,
    })
}
