//! Catalog Persistence - product store
//!
//! A single JSON file holds the whole product array:
//! - disk is authoritative, every call re-reads the file
//! - the in-memory sequence is a cache replaced after each call
//! - writes go through a temp file and a rename

pub mod store;
pub mod json;

pub use store::{ProductStore, SharedProductStore, StoreError, Result};
pub use json::{JsonProductStore, atomic_write, create_json_store};
