//! Application services: catalog use cases, authentication and rendering.

pub mod api_keys;
pub mod error;
pub mod fixtures;
pub mod products;
pub mod render;
pub mod repos;
pub mod version;
