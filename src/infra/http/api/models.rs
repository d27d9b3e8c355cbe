use serde::Deserialize;

use crate::application::products::ListingQuery;
use crate::domain::products::ProductDraft;

/// Body of `POST` and `PUT` product requests. Absent fields stay `None`;
/// unknown fields such as `id` are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ProductPayload {
    pub name: Option<String>,
    pub price: Option<f64>,
}

impl From<ProductPayload> for ProductDraft {
    fn from(payload: ProductPayload) -> Self {
        ProductDraft {
            name: payload.name,
            price: payload.price,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<ProductListQuery> for ListingQuery {
    fn from(query: ProductListQuery) -> Self {
        ListingQuery {
            page: query.page,
            limit: query.limit,
        }
    }
}
