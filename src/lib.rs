//! Crema: a product catalog REST service with a tag-invalidated listing cache
//! and versioned JSON output.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
