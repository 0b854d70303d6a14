//! Filesystem document store.
//!
//! Every collection is a JSONL file under `<data_dir>/collections/`.
//! The store is constructed once at startup and shared through the API
//! state. Reads take a shared lock, writes an exclusive one, so a
//! read-modify-write of a collection is never interleaved with another
//! write.

pub mod jsonl;

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use serde::{de::DeserializeOwned, Serialize};

use crate::models::{Cart, Coupon, EntityId, Item, Match, Player, Sale, Team, TeamMembership, User};

pub use jsonl::{collection_path, Collection, JsonlReader, JsonlWriter, Loaded};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate id {id} in {collection:?}")]
    Duplicate { collection: Collection, id: String },
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn collections_dir(&self) -> PathBuf {
        self.data_dir.join("collections")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// A record stored in a collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> &EntityId;
}

macro_rules! document {
    ($ty:ty, $collection:expr) => {
        impl Document for $ty {
            const COLLECTION: Collection = $collection;

            fn id(&self) -> &EntityId {
                &self.id
            }
        }
    };
}

document!(Player, Collection::Players);
document!(Team, Collection::Teams);
document!(TeamMembership, Collection::PlayerTeams);
document!(Match, Collection::Matches);
document!(Item, Collection::Items);
document!(Cart, Collection::Carts);
document!(Sale, Collection::Sales);
document!(Coupon, Collection::Coupons);
document!(User, Collection::Users);

/// JSONL-backed document store.
pub struct DocumentStore {
    config: StorageConfig,
    lock: RwLock<()>,
}

impl DocumentStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            lock: RwLock::new(()),
        }
    }

    /// Create the collections directory if needed and return the store.
    pub fn open(config: StorageConfig) -> Result<Self, StorageError> {
        std::fs::create_dir_all(config.collections_dir())?;
        info!("Opened document store at {:?}", config.collections_dir());
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn load<T: Document>(&self) -> Result<Vec<T>, StorageError> {
        JsonlReader::for_collection(&self.config, T::COLLECTION).read_all()
    }

    /// Load for a rewrite. Lines that no longer parse as `T` are kept in
    /// `unparsed` and must be handed back to `save`.
    fn load_for_write<T: Document>(&self) -> Result<Loaded<T>, StorageError> {
        JsonlReader::for_collection(&self.config, T::COLLECTION).read_loaded()
    }

    fn save<T: Document>(&self, loaded: &Loaded<T>) -> Result<(), StorageError> {
        if !loaded.unparsed.is_empty() {
            warn!(
                "Keeping {} unparsed lines in {:?}",
                loaded.unparsed.len(),
                T::COLLECTION
            );
        }
        JsonlWriter::for_collection(&self.config, T::COLLECTION)
            .write_with_raw(&loaded.docs, &loaded.unparsed)?;
        Ok(())
    }

    pub async fn find_all<T: Document>(&self) -> Result<Vec<T>, StorageError> {
        let _guard = self.lock.read().await;
        self.load()
    }

    pub async fn find_by_id<T: Document>(&self, id: &EntityId) -> Result<Option<T>, StorageError> {
        let _guard = self.lock.read().await;
        let found = self.load::<T>()?.into_iter().find(|d| d.id() == id);
        debug!("{:?} lookup {} found={}", T::COLLECTION, id, found.is_some());
        Ok(found)
    }

    pub async fn find_where<T, F>(&self, predicate: F) -> Result<Vec<T>, StorageError>
    where
        T: Document,
        F: Fn(&T) -> bool,
    {
        let _guard = self.lock.read().await;
        Ok(self.load::<T>()?.into_iter().filter(predicate).collect())
    }

    pub async fn find_one<T, F>(&self, predicate: F) -> Result<Option<T>, StorageError>
    where
        T: Document,
        F: Fn(&T) -> bool,
    {
        let _guard = self.lock.read().await;
        Ok(self.load::<T>()?.into_iter().find(predicate))
    }

    pub async fn exists<T: Document>(&self, id: &EntityId) -> Result<bool, StorageError> {
        Ok(self.find_by_id::<T>(id).await?.is_some())
    }

    /// Append a new document. Fails if the id is taken.
    pub async fn insert<T: Document>(&self, doc: &T) -> Result<(), StorageError> {
        let _guard = self.lock.write().await;
        if self.load::<T>()?.iter().any(|d| d.id() == doc.id()) {
            return Err(StorageError::Duplicate {
                collection: T::COLLECTION,
                id: doc.id().to_string(),
            });
        }
        JsonlWriter::for_collection(&self.config, T::COLLECTION).append(doc)?;
        info!("Inserted {} into {:?}", doc.id(), T::COLLECTION);
        Ok(())
    }

    /// Insert unless some stored document matches `conflict`.
    ///
    /// Returns false, without writing, on a conflict.
    pub async fn insert_unless<T, F>(&self, doc: &T, conflict: F) -> Result<bool, StorageError>
    where
        T: Document,
        F: Fn(&T) -> bool,
    {
        let _guard = self.lock.write().await;
        if self
            .load::<T>()?
            .iter()
            .any(|d| d.id() == doc.id() || conflict(d))
        {
            return Ok(false);
        }
        JsonlWriter::for_collection(&self.config, T::COLLECTION).append(doc)?;
        info!("Inserted {} into {:?}", doc.id(), T::COLLECTION);
        Ok(true)
    }

    /// Apply `f` to one document and persist it. Returns the updated
    /// document, or None if the id is unknown.
    pub async fn update<T, F>(&self, id: &EntityId, f: F) -> Result<Option<T>, StorageError>
    where
        T: Document,
        F: FnOnce(&mut T),
    {
        self.try_update_one(
            |d: &T| d.id() == id,
            |doc| -> Result<T, StorageError> {
                f(doc);
                Ok(doc.clone())
            },
        )
        .await
    }

    /// Read, change and write the first document matching `predicate`
    /// under one write lock.
    ///
    /// Returns None if nothing matches. When `f` fails the collection is
    /// left as it was and the error is returned.
    pub async fn try_update_one<T, P, F, R, E>(&self, predicate: P, f: F) -> Result<Option<R>, E>
    where
        T: Document,
        P: Fn(&T) -> bool,
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<StorageError>,
    {
        let _guard = self.lock.write().await;
        let mut loaded = self.load_for_write::<T>()?;
        let Some(doc) = loaded.docs.iter_mut().find(|d| predicate(&**d)) else {
            return Ok(None);
        };
        let out = f(doc)?;
        let id = doc.id().clone();
        self.save(&loaded)?;
        info!("Updated {} in {:?}", id, T::COLLECTION);
        Ok(Some(out))
    }

    /// Apply `f` to every document; `f` returns whether it changed the
    /// document. Returns the number of changed documents.
    pub async fn update_where<T, F>(&self, mut f: F) -> Result<usize, StorageError>
    where
        T: Document,
        F: FnMut(&mut T) -> bool,
    {
        let _guard = self.lock.write().await;
        let mut loaded = self.load_for_write::<T>()?;
        let changed = loaded.docs.iter_mut().map(&mut f).filter(|c| *c).count();
        if changed > 0 {
            self.save(&loaded)?;
            info!("Updated {} documents in {:?}", changed, T::COLLECTION);
        }
        Ok(changed)
    }

    pub async fn delete<T: Document>(&self, id: &EntityId) -> Result<bool, StorageError> {
        Ok(self.delete_where::<T, _>(|d| d.id() == id).await? > 0)
    }

    /// Remove every matching document. Returns how many were removed.
    pub async fn delete_where<T, F>(&self, predicate: F) -> Result<usize, StorageError>
    where
        T: Document,
        F: Fn(&T) -> bool,
    {
        let _guard = self.lock.write().await;
        let mut loaded = self.load_for_write::<T>()?;
        let before = loaded.docs.len();
        loaded.docs.retain(|d| !predicate(d));
        let removed = before - loaded.docs.len();
        if removed > 0 {
            self.save(&loaded)?;
            info!("Deleted {} documents from {:?}", removed, T::COLLECTION);
        }
        Ok(removed)
    }

    /// Number of documents in each collection.
    pub async fn counts(&self) -> Result<Vec<(Collection, usize)>, StorageError> {
        let _guard = self.lock.read().await;
        let mut out = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            let docs: Vec<serde_json::Value> =
                JsonlReader::for_collection(&self.config, collection).read_all()?;
            out.push((collection, docs.len()));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Test-only: lets tests use `String` as the `try_update_one` error type.
    impl From<StorageError> for String {
        fn from(e: StorageError) -> Self {
            e.to_string()
        }
    }

    fn store(temp_dir: &TempDir) -> DocumentStore {
        DocumentStore::open(StorageConfig::new(temp_dir.path().to_path_buf())).unwrap()
    }

    #[test]
    fn test_storage_config_paths() {
        let config = StorageConfig::new(PathBuf::from("/data"));
        assert_eq!(config.collections_dir(), PathBuf::from("/data/collections"));
        assert_eq!(StorageConfig::default().data_dir, PathBuf::from("./data"));
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let coupon = Coupon::new("SAQUE10".to_string(), 10.0, None);
        store.insert(&coupon).await.unwrap();

        let found: Option<Coupon> = store.find_by_id(&coupon.id).await.unwrap();
        assert_eq!(found.map(|c| c.name), Some("SAQUE10".to_string()));
        assert_eq!(store.find_all::<Coupon>().await.unwrap().len(), 1);
        assert!(store.exists::<Coupon>(&coupon.id).await.unwrap());
        assert!(!store.exists::<Coupon>(&EntityId::random()).await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_duplicate_id() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let coupon = Coupon::new("A".to_string(), 5.0, None);
        store.insert(&coupon).await.unwrap();
        let err = store.insert(&coupon).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_insert_unless_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let first = Coupon::new("BLOCK".to_string(), 5.0, None);
        let second = Coupon::new("BLOCK".to_string(), 7.0, None);
        assert!(store.insert_unless(&first, |c: &Coupon| c.name == first.name).await.unwrap());
        assert!(!store.insert_unless(&second, |c: &Coupon| c.name == second.name).await.unwrap());
        assert_eq!(store.find_all::<Coupon>().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let coupon = Coupon::new("A".to_string(), 5.0, None);
        store.insert(&coupon).await.unwrap();

        let updated = store
            .update::<Coupon, _>(&coupon.id, |c| c.discount = 15.0)
            .await
            .unwrap();
        assert_eq!(updated.map(|c| c.discount), Some(15.0));
        let stored: Coupon = store.find_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "A");
        assert_eq!(stored.discount, 15.0);

        let missing = store
            .update::<Coupon, _>(&EntityId::random(), |c| c.discount = 1.0)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_update_where_and_delete_where() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        for (name, discount) in [("A", 5.0), ("B", 50.0), ("C", 60.0)] {
            store
                .insert(&Coupon::new(name.to_string(), discount, None))
                .await
                .unwrap();
        }

        let changed = store
            .update_where::<Coupon, _>(|c| {
                if c.discount > 10.0 {
                    c.discount = 10.0;
                    true
                } else {
                    false
                }
            })
            .await
            .unwrap();
        assert_eq!(changed, 2);

        let removed = store
            .delete_where::<Coupon, _>(|c| c.name != "A")
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let remaining = store.find_all::<Coupon>().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(!store.delete::<Coupon>(&EntityId::random()).await.unwrap());
        assert!(store.delete::<Coupon>(&remaining[0].id).await.unwrap());
    }

    #[tokio::test]
    async fn test_try_update_one_failure_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let coupon = Coupon::new("A".to_string(), 5.0, None);
        store.insert(&coupon).await.unwrap();

        let result = store
            .try_update_one(
                |c: &Coupon| c.name == "A",
                |c| -> Result<(), String> {
                    c.discount = 99.0;
                    Err("rejected".to_string())
                },
            )
            .await;
        assert_eq!(result, Err("rejected".to_string()));
        let stored: Coupon = store.find_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(stored.discount, 5.0);

        let missing = store
            .try_update_one(|c: &Coupon| c.name == "Z", |_| -> Result<(), String> { Ok(()) })
            .await;
        assert_eq!(missing, Ok(None));
    }

    #[tokio::test]
    async fn test_rewrites_keep_unparsed_lines() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let path = collection_path(store.config(), Collection::Coupons);
        let legacy = r#"{"id":"legacy","name":"Old Record"}"#;
        std::fs::write(&path, format!("{}\n", legacy)).unwrap();

        let keep = Coupon::new("KEEP".to_string(), 5.0, None);
        let drop = Coupon::new("DROP".to_string(), 5.0, None);
        store.insert(&keep).await.unwrap();
        store.insert(&drop).await.unwrap();

        store
            .update::<Coupon, _>(&keep.id, |c| c.discount = 20.0)
            .await
            .unwrap();
        store
            .update_where::<Coupon, _>(|c| {
                c.discount += 1.0;
                true
            })
            .await
            .unwrap();
        assert!(store.delete::<Coupon>(&drop.id).await.unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.lines().any(|l| l == legacy), "{}", content);
        let coupons = store.find_all::<Coupon>().await.unwrap();
        assert_eq!(coupons.len(), 1);
        assert_eq!(coupons[0].discount, 21.0);
    }

    #[tokio::test]
    async fn test_counts() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .insert(&Coupon::new("A".to_string(), 5.0, None))
            .await
            .unwrap();

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.len(), Collection::ALL.len());
        assert!(counts.contains(&(Collection::Coupons, 1)));
        assert!(counts.contains(&(Collection::Players, 0)));
    }
}
