//! Versioned JSON rendering of catalog entities.
//!
//! Every serializable field is listed once in [`PRODUCT_FIELDS`] with the
//! groups it belongs to and the API version that introduced it. A field is
//! emitted only when the render group matches and the requested version is at
//! least its `since` version.

use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::domain::api_keys::Role;
use crate::domain::entities::ProductRecord;
use crate::domain::version::ApiVersion;

/// Base path of the product resource, used to build relative links.
pub const PRODUCTS_PATH: &str = "/api/products";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    ProductList,
    ProductDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    Id,
    Name,
    Price,
    SelfLink,
    UpdateLink,
    DeleteLink,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: ProductField,
    pub groups: &'static [FieldGroup],
    pub since: ApiVersion,
    /// Role the viewer must hold for the field to appear.
    pub requires: Option<Role>,
}

const ALL_GROUPS: &[FieldGroup] = &[FieldGroup::ProductList, FieldGroup::ProductDetail];
const DETAIL_ONLY: &[FieldGroup] = &[FieldGroup::ProductDetail];

pub static PRODUCT_FIELDS: &[FieldRule] = &[
    FieldRule {
        field: ProductField::Id,
        groups: ALL_GROUPS,
        since: ApiVersion::V1_0,
        requires: None,
    },
    FieldRule {
        field: ProductField::Name,
        groups: ALL_GROUPS,
        since: ApiVersion::V1_0,
        requires: None,
    },
    FieldRule {
        field: ProductField::Price,
        groups: ALL_GROUPS,
        since: ApiVersion::V1_0,
        requires: None,
    },
    FieldRule {
        field: ProductField::SelfLink,
        groups: ALL_GROUPS,
        since: ApiVersion::V2_0,
        requires: None,
    },
    FieldRule {
        field: ProductField::UpdateLink,
        groups: DETAIL_ONLY,
        since: ApiVersion::V2_0,
        requires: Some(Role::Admin),
    },
    FieldRule {
        field: ProductField::DeleteLink,
        groups: DETAIL_ONLY,
        since: ApiVersion::V2_0,
        requires: Some(Role::Admin),
    },
];

/// Everything that decides which fields a render emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    pub group: FieldGroup,
    pub version: ApiVersion,
    pub viewer: Option<Role>,
}

impl RenderContext {
    /// Context for a cached listing page. Listings never depend on the viewer.
    pub fn listing(version: ApiVersion) -> Self {
        Self {
            group: FieldGroup::ProductList,
            version,
            viewer: None,
        }
    }

    pub fn detail(version: ApiVersion, viewer: Option<Role>) -> Self {
        Self {
            group: FieldGroup::ProductDetail,
            version,
            viewer,
        }
    }

    fn includes(&self, rule: &FieldRule) -> bool {
        rule.groups.contains(&self.group)
            && self.version >= rule.since
            && rule
                .requires
                .is_none_or(|needed| self.viewer.is_some_and(|role| role.grants(needed)))
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode rendered json: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("product price `{0}` is not representable in json")]
    NonFinitePrice(f64),
}

/// The highest `since` version in [`PRODUCT_FIELDS`] that does not exceed `requested`.
///
/// Every version between two such boundaries renders identically, so callers key
/// caches on this value rather than the raw client version.
pub fn effective_version(requested: ApiVersion) -> ApiVersion {
    PRODUCT_FIELDS
        .iter()
        .map(|rule| rule.since)
        .filter(|since| *since <= requested)
        .max()
        .unwrap_or(ApiVersion::new(0, 0, 0))
}

pub fn product_href(id: i64) -> String {
    format!("{PRODUCTS_PATH}/{id}")
}

/// Render one product as a JSON object for `ctx`.
pub fn render_product(product: &ProductRecord, ctx: &RenderContext) -> Result<Value, RenderError> {
    let mut object = Map::new();
    let mut links = Map::new();

    for rule in PRODUCT_FIELDS.iter().filter(|rule| ctx.includes(rule)) {
        match rule.field {
            ProductField::Id => {
                object.insert("id".into(), json!(product.id));
            }
            ProductField::Name => {
                object.insert("name".into(), json!(product.name));
            }
            ProductField::Price => {
                let price = serde_json::Number::from_f64(product.price)
                    .ok_or(RenderError::NonFinitePrice(product.price))?;
                object.insert("price".into(), Value::Number(price));
            }
            ProductField::SelfLink => {
                links.insert("self".into(), link(product.id));
            }
            ProductField::UpdateLink => {
                links.insert("update".into(), link(product.id));
            }
            ProductField::DeleteLink => {
                links.insert("delete".into(), link(product.id));
            }
        }
    }

    if !links.is_empty() {
        object.insert("_links".into(), Value::Object(links));
    }
    Ok(Value::Object(object))
}

/// Render a listing page as a bare JSON array.
pub fn render_listing(products: &[ProductRecord], ctx: &RenderContext) -> Result<String, RenderError> {
    let items = products
        .iter()
        .map(|product| render_product(product, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::to_string(&items)?)
}

fn link(id: i64) -> Value {
    json!({ "href": product_href(id) })
}
