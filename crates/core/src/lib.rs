// Catalog Core - data model
//!
//! Contains:
//! - Product: stored records, creation input and partial updates
//! - Validation: field rules, code uniqueness, id assignment
//! - Config: storage configuration (YAML + environment)

mod product;
mod config;

pub use product::*;
pub use config::*;
