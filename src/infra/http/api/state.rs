use std::sync::Arc;

use url::Url;

use crate::application::api_keys::ApiKeyService;
use crate::application::products::ProductService;
use crate::application::repos::StoreHealth;
use crate::application::version::VersionResolver;

#[derive(Clone)]
pub struct ApiState {
    pub products: Arc<ProductService>,
    pub api_keys: Arc<ApiKeyService>,
    pub versions: Arc<dyn VersionResolver>,
    pub health: Arc<dyn StoreHealth>,
    /// Base for absolute `Location` headers.
    pub public_url: Url,
}
