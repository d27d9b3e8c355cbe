//! Cache key definitions.

use std::fmt::{Display, Formatter};

use crate::domain::version::ApiVersion;

/// Tag shared by every cached product listing.
pub const PRODUCTS_TAG: &str = "productsCache";

/// Operation name prefixed to listing keys.
pub const LISTING_OPERATION: &str = "getProducts";

/// Identifies one page of the product listing.
///
/// Displays as `getProducts-<page>-<limit>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListingKey {
    pub page: u32,
    pub limit: u32,
}

impl ListingKey {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Storage key for a page rendered at `version`.
    ///
    /// Renders differ per version, so the version is appended to the base key.
    /// Callers pass the version already snapped to a rendering boundary.
    pub fn storage_key(&self, version: ApiVersion) -> String {
        format!("{self}@{version}")
    }
}

impl Display for ListingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{LISTING_OPERATION}-{}-{}", self.page, self.limit)
    }
}
