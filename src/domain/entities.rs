//! Domain entities mirrored from persistent storage.

use serde::Serialize;

/// A catalog product as persisted by the product store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub price: f64,
}
