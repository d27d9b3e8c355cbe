//! Domain layer types and invariants.

pub mod api_keys;
pub mod entities;
pub mod products;
pub mod version;
