//! JSON file store
//!
//! The whole product array lives in one JSON document. Each call takes the
//! store lock, re-reads the file, and on mutation writes the full array back
//! before replacing the cache.

use crate::store::{ProductStore, Result, SharedProductStore, StoreError};
use async_trait::async_trait;
use catalog_core::{
    NewProduct, Product, ProductId, ProductPatch, StorageConfig, ValidationError,
    ensure_unique_code, next_product_id,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Atomic file write: writes to a temporary file then renames to the target path.
///
/// The temporary file is the target name with `.tmp` appended (`data.json.tmp`),
/// so siblings such as `data.tmp` are never touched.
pub async fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp = temp_path(path)?;
    fs::write(&tmp, content).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

fn temp_path(path: &Path) -> std::io::Result<PathBuf> {
    let mut name = path
        .file_name()
        .ok_or_else(|| {
            std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("not a file path: {}", path.display()),
            )
        })?
        .to_os_string();
    name.push(".tmp");
    Ok(path.with_file_name(name))
}

/// Product store backed by a single JSON file
#[derive(Debug)]
pub struct JsonProductStore {
    config: StorageConfig,

    /// Last state read from or written to disk. Held across each
    /// read-modify-write, so calls on one instance never interleave.
    cache: Mutex<Vec<Product>>,
}

impl JsonProductStore {
    /// Creates a store. No I/O happens until the first operation.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            cache: Mutex::new(Vec::new()),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(StorageConfig::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Snapshot of the cache as of the last completed operation.
    pub async fn cached(&self) -> Vec<Product> {
        self.cache.lock().await.clone()
    }

    /// Reads the backing file, creating it with an empty array if absent.
    async fn load(&self) -> Result<Vec<Product>> {
        let path = self.path();
        match fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                warn!("Malformed product file {}: {}", path.display(), e);
                StoreError::Serialize(e)
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.save(&[]).await?;
                info!("Created product file {}", path.display());
                Ok(Vec::new())
            }
            Err(e) => {
                warn!("Failed to read product file {}: {}", path.display(), e);
                Err(StoreError::Io(e))
            }
        }
    }

    /// Overwrites the backing file with `products`.
    async fn save(&self, products: &[Product]) -> Result<()> {
        let path = self.path();
        let content = if self.config.pretty {
            serde_json::to_string_pretty(products)?
        } else {
            serde_json::to_string(products)?
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        atomic_write(path, &content).await.map_err(|e| {
            warn!("Failed to write product file {}: {}", path.display(), e);
            StoreError::Io(e)
        })?;
        debug!("Wrote {} products to {}", products.len(), path.display());
        Ok(())
    }

    /// Replaces the cache with the file contents and returns a working copy.
    async fn refresh(&self, cache: &mut Vec<Product>) -> Result<Vec<Product>> {
        let products = self.load().await?;
        cache.clone_from(&products);
        Ok(products)
    }
}

fn rejected(err: ValidationError) -> StoreError {
    warn!("Rejected product: {}", err);
    StoreError::Validation(err)
}

fn not_found(id: ProductId) -> StoreError {
    warn!("Product {} not found", id);
    StoreError::NotFound(id)
}

#[async_trait]
impl ProductStore for JsonProductStore {
    async fn add(&self, product: NewProduct) -> Result<Product> {
        let mut cache = self.cache.lock().await;
        let mut products = self.refresh(&mut cache).await?;

        product.validate().map_err(rejected)?;
        ensure_unique_code(&product.code, &products, None).map_err(rejected)?;

        let id = next_product_id(&products).ok_or_else(|| {
            warn!("Product ids exhausted");
            StoreError::IdExhausted(ProductId(u64::MAX))
        })?;
        let product = product.into_product(id);
        products.push(product.clone());
        self.save(&products).await?;
        *cache = products;

        info!("Added product {} ({})", product.id, product.code);
        Ok(product)
    }

    async fn list(&self) -> Result<Vec<Product>> {
        let mut cache = self.cache.lock().await;
        let products = self.refresh(&mut cache).await?;
        debug!("Listed {} products", products.len());
        Ok(products)
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Product> {
        let mut cache = self.cache.lock().await;
        self.refresh(&mut cache).await?;
        cache
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Product> {
        let mut cache = self.cache.lock().await;
        let mut products = self.refresh(&mut cache).await?;

        let index = products
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;

        patch.validate().map_err(rejected)?;
        if let Some(code) = &patch.code {
            ensure_unique_code(code, &products, Some(id)).map_err(rejected)?;
        }

        if patch.is_empty() {
            debug!("Empty patch for product {}, nothing to write", id);
            return Ok(products[index].clone());
        }

        patch.apply_to(&mut products[index]);
        let updated = products[index].clone();
        self.save(&products).await?;
        *cache = products;

        info!("Updated product {}", id);
        Ok(updated)
    }

    async fn delete(&self, id: ProductId) -> Result<Product> {
        let mut cache = self.cache.lock().await;
        let mut products = self.refresh(&mut cache).await?;

        let index = products
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;

        let removed = products.remove(index);
        self.save(&products).await?;
        *cache = products;

        info!("Deleted product {}", id);
        Ok(removed)
    }
}

/// Convenience constructor for a shared JSON store.
pub fn create_json_store(config: StorageConfig) -> SharedProductStore {
    Arc::new(JsonProductStore::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_product(title: &str, code: &str) -> NewProduct {
        NewProduct {
            title: title.to_string(),
            description: "Este es un producto prueba".to_string(),
            price: 200.0,
            thumbnail: "Sin imagen".to_string(),
            code: code.to_string(),
            stock: 25,
        }
    }

    fn temp_store(temp: &TempDir) -> JsonProductStore {
        JsonProductStore::open(temp.path().join("data.json"))
    }

    fn read_raw(store: &JsonProductStore) -> String {
        std::fs::read_to_string(store.path()).unwrap()
    }

    #[tokio::test]
    async fn test_list_creates_missing_file() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        assert!(!store.path().exists());

        let products = store.list().await.unwrap();
        assert!(products.is_empty());
        assert_eq!(read_raw(&store).trim(), "[]");
    }

    #[tokio::test]
    async fn test_list_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let store = JsonProductStore::open(temp.path().join("nested").join("deep").join("data.json"));

        assert!(store.list().await.unwrap().is_empty());
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_construction_does_no_io() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        assert!(!store.path().exists());
        assert!(store.cached().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_assigns_sequential_ids() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);

        for (i, code) in ["a1", "b2", "c3", "d4"].iter().enumerate() {
            let product = store.add(new_product("p", code)).await.unwrap();
            assert_eq!(product.id, ProductId(i as u64 + 1));
        }
        assert_eq!(store.list().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_add_then_list_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);

        let input = new_product("producto prueba", "abc123");
        let added = store.add(input.clone()).await.unwrap();

        let reopened = temp_store(&temp);
        let products = reopened.list().await.unwrap();
        assert_eq!(products, vec![input.into_product(added.id)]);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);

        store.add(new_product("first", "abc123")).await.unwrap();
        let before = read_raw(&store);

        let err = store.add(new_product("second", "abc123")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::DuplicateCode(ref code)) if code == "abc123"
        ));
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(read_raw(&store), before);
    }

    #[tokio::test]
    async fn test_blank_field_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);

        let mut product = new_product("p", "abc123");
        product.description = "  ".to_string();
        let err = store.add(product).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::MissingField("description"))
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_field() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);

        let original = store.add(new_product("A", "c1")).await.unwrap();
        let patch = ProductPatch {
            title: Some("A-edit".to_string()),
            ..Default::default()
        };
        let updated = store.update(original.id, patch).await.unwrap();

        let expected = Product {
            title: "A-edit".to_string(),
            ..original
        };
        assert_eq!(updated, expected);
        assert_eq!(store.get_by_id(expected.id).await.unwrap(), expected);
        assert_eq!(temp_store(&temp).list().await.unwrap(), vec![expected]);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        store.add(new_product("A", "c1")).await.unwrap();
        let before = read_raw(&store);

        let patch = ProductPatch {
            stock: Some(1),
            ..Default::default()
        };
        let err = store.update(ProductId(42), patch).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ProductId(42))));
        assert_eq!(read_raw(&store), before);
    }

    #[tokio::test]
    async fn test_update_to_taken_code_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        store.add(new_product("A", "c1")).await.unwrap();
        let b = store.add(new_product("B", "c2")).await.unwrap();

        let patch = ProductPatch {
            code: Some("c1".to_string()),
            ..Default::default()
        };
        let err = store.update(b.id, patch).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::DuplicateCode(_))
        ));
        assert_eq!(store.get_by_id(b.id).await.unwrap().code, "c2");

        // Re-submitting a product's own code is not a conflict.
        let patch = ProductPatch {
            code: Some("c2".to_string()),
            price: Some(9.5),
            ..Default::default()
        };
        let updated = store.update(b.id, patch).await.unwrap();
        assert_eq!(updated.code, "c2");
        assert_eq!(updated.price, 9.5);
    }

    #[tokio::test]
    async fn test_update_with_invalid_price_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        let a = store.add(new_product("A", "c1")).await.unwrap();

        let patch = ProductPatch {
            price: Some(-5.0),
            ..Default::default()
        };
        let err = store.update(a.id, patch).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::InvalidPrice(_))
        ));
        assert_eq!(store.get_by_id(a.id).await.unwrap(), a);
    }

    #[tokio::test]
    async fn test_empty_patch_returns_record_unchanged() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        let a = store.add(new_product("A", "c1")).await.unwrap();
        store.add(new_product("B", "c2")).await.unwrap();

        let same = store.update(a.id, ProductPatch::default()).await.unwrap();
        assert_eq!(same, a);
        assert_eq!(store.cached().await.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        store.add(new_product("A", "c1")).await.unwrap();
        let b = store.add(new_product("B", "c2")).await.unwrap();
        store.add(new_product("C", "c3")).await.unwrap();

        let removed = store.delete(b.id).await.unwrap();
        assert_eq!(removed, b);

        let ids: Vec<_> = store.list().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ProductId(1), ProductId(3)]);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_leaves_store_unchanged() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        store.add(new_product("A", "c1")).await.unwrap();
        let before = store.list().await.unwrap();

        let err = store.delete(ProductId(7)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ProductId(7))));
        assert_eq!(store.list().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_get_by_id_unknown() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        let err = store.get_by_id(ProductId(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ProductId(1))));
    }

    #[tokio::test]
    async fn test_ids_follow_max_remaining_id() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        for code in ["c1", "c2", "c3"] {
            store.add(new_product("p", code)).await.unwrap();
        }

        store.delete(ProductId(3)).await.unwrap();
        assert_eq!(store.add(new_product("p", "c4")).await.unwrap().id, ProductId(3));

        store.delete(ProductId(2)).await.unwrap();
        assert_eq!(store.add(new_product("p", "c5")).await.unwrap().id, ProductId(4));
    }

    #[tokio::test]
    async fn test_disk_is_authoritative() {
        let temp = TempDir::new().unwrap();
        let first = temp_store(&temp);
        let second = temp_store(&temp);

        let a = first.add(new_product("A", "c1")).await.unwrap();
        assert!(second.cached().await.is_empty());

        // Writes through another instance are picked up on the next call.
        let patch = ProductPatch {
            title: Some("from second".to_string()),
            ..Default::default()
        };
        second.update(a.id, patch).await.unwrap();
        assert_eq!(first.get_by_id(a.id).await.unwrap().title, "from second");
        assert_eq!(first.cached().await[0].title, "from second");

        second.delete(a.id).await.unwrap();
        assert!(matches!(
            first.get_by_id(a.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(first.cached().await.is_empty());

        // Id assignment also reads the file, not the stale cache.
        second.add(new_product("B", "c2")).await.unwrap();
        let c = first.add(new_product("C", "c3")).await.unwrap();
        assert_eq!(c.id, ProductId(2));
    }

    #[tokio::test]
    async fn test_malformed_file_is_reported_and_untouched() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.list().await, Err(StoreError::Serialize(_))));
        assert!(matches!(
            store.add(new_product("A", "c1")).await,
            Err(StoreError::Serialize(_))
        ));
        assert_eq!(read_raw(&store), "{ not json");
    }

    #[tokio::test]
    async fn test_unreadable_path_is_io_error() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("data.json");
        std::fs::create_dir(&dir).unwrap();
        let store = JsonProductStore::open(dir);

        assert!(matches!(store.list().await, Err(StoreError::Io(_))));
    }

    #[tokio::test]
    async fn test_compact_output() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::new(temp.path().join("data.json")).compact();
        let store = JsonProductStore::new(config);

        store.add(new_product("A", "c1")).await.unwrap();
        let raw = read_raw(&store);
        assert!(!raw.contains('\n'));
        assert!(raw.starts_with("[{\"id\":1,"));
    }

    #[tokio::test]
    async fn test_pretty_output_by_default() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);

        store.add(new_product("A", "c1")).await.unwrap();
        assert!(read_raw(&store).contains("\n  {"));
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        store.add(new_product("A", "c1")).await.unwrap();

        assert!(!temp.path().join("data.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_sibling_tmp_file_is_left_alone() {
        let temp = TempDir::new().unwrap();
        let notes = temp.path().join("data.tmp");
        std::fs::write(&notes, "user notes").unwrap();

        let store = temp_store(&temp);
        store.add(new_product("A", "c1")).await.unwrap();
        store.delete(ProductId(1)).await.unwrap();

        assert_eq!(std::fs::read_to_string(&notes).unwrap(), "user notes");
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_atomic_write_rejects_non_file_path() {
        let err = atomic_write(Path::new("/"), "[]").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_add_after_max_id_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = temp_store(&temp);
        std::fs::write(
            store.path(),
            r#"[{"id":18446744073709551615,"title":"x","description":"y","price":1.0,"thumbnail":"z","code":"k","stock":1}]"#,
        )
        .unwrap();
        let before = read_raw(&store);

        let err = store.add(new_product("A", "k2")).await.unwrap_err();
        assert!(matches!(err, StoreError::IdExhausted(ProductId(u64::MAX))));
        assert_eq!(read_raw(&store), before);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_serialized() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(temp_store(&temp));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.add(new_product("p", &format!("code-{i}"))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut ids: Vec<u64> = store.list().await.unwrap().iter().map(|p| p.id.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=10u64).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_shared_store_via_trait_object() {
        let temp = TempDir::new().unwrap();
        let store = create_json_store(StorageConfig::new(temp.path().join("data.json")));

        let product = store.add(new_product("A", "c1")).await.unwrap();
        assert_eq!(store.get_by_id(product.id).await.unwrap(), product);
    }
}
