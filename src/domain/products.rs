//! Product invariants enforced before anything reaches the store.

use serde::Serialize;
use thiserror::Error;

pub const NAME_MAX_CHARS: usize = 255;

/// Unvalidated product fields, as supplied by a client or merged onto a stored product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub price: Option<f64>,
}

/// Product fields that satisfy every invariant and may be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidProduct {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("product validation failed on {} field(s)", .violations.len())]
pub struct ValidationErrors {
    pub violations: Vec<FieldViolation>,
}

impl ProductDraft {
    /// Check every field and collect all violations instead of stopping at the first.
    pub fn validate(self) -> Result<ValidProduct, ValidationErrors> {
        let mut violations = Vec::new();

        let name = match self.name.map(|value| value.trim().to_string()) {
            Some(name) if name.is_empty() => {
                violations.push(FieldViolation {
                    field: "name",
                    message: "name is required",
                });
                None
            }
            Some(name) if name.chars().count() > NAME_MAX_CHARS => {
                violations.push(FieldViolation {
                    field: "name",
                    message: "name must be at most 255 characters",
                });
                None
            }
            Some(name) => Some(name),
            None => {
                violations.push(FieldViolation {
                    field: "name",
                    message: "name is required",
                });
                None
            }
        };

        let price = match self.price {
            Some(price) if !price.is_finite() => {
                violations.push(FieldViolation {
                    field: "price",
                    message: "price must be a finite number",
                });
                None
            }
            Some(price) if price < 0.0 => {
                violations.push(FieldViolation {
                    field: "price",
                    message: "price must not be negative",
                });
                None
            }
            Some(price) => Some(price),
            None => {
                violations.push(FieldViolation {
                    field: "price",
                    message: "price is required",
                });
                None
            }
        };

        match (name, price) {
            (Some(name), Some(price)) => Ok(ValidProduct { name, price }),
            _ => Err(ValidationErrors { violations }),
        }
    }
}
