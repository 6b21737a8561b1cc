//! Product records and the field rules they must satisfy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Unique identifier for a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl ProductId {
    pub const FIRST: ProductId = ProductId(1);

    /// `None` once the id space is exhausted.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

/// A stored product record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub thumbnail: String,
    /// Unique among all products in a store
    pub code: String,
    pub stock: u32,
}

/// Fields supplied when creating a product; the id is assigned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub thumbnail: String,
    pub code: String,
    pub stock: u32,
}

impl NewProduct {
    /// Checks every field except code uniqueness, which needs the rest of the store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        check_price(self.price)?;
        require_text("thumbnail", &self.thumbnail)?;
        require_text("code", &self.code)?;
        Ok(())
    }

    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            title: self.title,
            description: self.description,
            price: self.price,
            thumbnail: self.thumbnail,
            code: self.code,
            stock: self.stock,
        }
    }
}

/// Partial update of a product.
///
/// Supplied fields overwrite the stored ones, omitted fields are kept. The id
/// is not part of a patch, so an update can never re-key a record; a JSON
/// patch carrying `id` (or any other unknown key) is rejected on parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.thumbnail.is_none()
            && self.code.is_none()
            && self.stock.is_none()
    }

    /// Applies the same field rules as [`NewProduct::validate`] to the supplied fields only.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(description) = &self.description {
            require_text("description", description)?;
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        if let Some(thumbnail) = &self.thumbnail {
            require_text("thumbnail", thumbnail)?;
        }
        if let Some(code) = &self.code {
            require_text("code", code)?;
        }
        Ok(())
    }

    /// Shallow merge over `product`.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(title) = &self.title {
            product.title = title.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(thumbnail) = &self.thumbnail {
            product.thumbnail = thumbnail.clone();
        }
        if let Some(code) = &self.code {
            product.code = code.clone();
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
    }
}

/// Validation failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("field `{0}` must not be empty")]
    MissingField(&'static str),

    #[error("price must be a finite, non-negative number (got {0})")]
    InvalidPrice(f64),

    #[error("a product with code `{0}` already exists")]
    DuplicateCode(String),
}

/// Rejects `code` if any product other than `except` already uses it.
pub fn ensure_unique_code(
    code: &str,
    products: &[Product],
    except: Option<ProductId>,
) -> Result<(), ValidationError> {
    let taken = products
        .iter()
        .filter(|p| Some(p.id) != except)
        .any(|p| p.code == code);
    if taken {
        return Err(ValidationError::DuplicateCode(code.to_string()));
    }
    Ok(())
}

/// Max existing id + 1, or [`ProductId::FIRST`] for an empty sequence.
///
/// Returns `None` when the max existing id is `u64::MAX`.
pub fn next_product_id(products: &[Product]) -> Option<ProductId> {
    match products.iter().map(|p| p.id).max() {
        Some(max) => max.next(),
        None => Some(ProductId::FIRST),
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

fn check_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ValidationError::InvalidPrice(price));
    }
    Ok(())
}
