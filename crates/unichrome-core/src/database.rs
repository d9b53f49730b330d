//! Database facade: maps collection names to collection instances.
//!
//! Owns the storage directory root and an optional shared embedding
//! provider. Collection names are opaque identifiers that must be valid
//! file-name stems on the host OS.

use crate::collection::Collection;
use crate::embedding::TextEmbedder;
use crate::error::{Error, Result};
use crate::index::hnsw::HnswParams;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Database instance managing collections and their storage directory.
pub struct Database {
    directory: Option<PathBuf>,
    params: HnswParams,
    embedder: Option<Arc<dyn TextEmbedder>>,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Database {
    /// Opens or creates a database rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let directory = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory)?;

        Ok(Self {
            directory: Some(directory),
            params: HnswParams::default(),
            embedder: None,
            collections: RwLock::new(HashMap::new()),
        })
    }

    /// Creates a database with no backing directory; collections live only
    /// in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            directory: None,
            params: HnswParams::default(),
            embedder: None,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Opens a database described by a [`DatabaseConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the data directory cannot be created.
    pub fn from_config(config: &crate::config::DatabaseConfig) -> Result<Self> {
        let params = config.hnsw_params();
        if config.storage.in_memory {
            Ok(Self::in_memory().with_params(params))
        } else {
            Ok(Self::open(&config.storage.data_dir)?.with_params(params))
        }
    }

    /// Sets the index parameters used for newly created collections.
    #[must_use]
    pub fn with_params(mut self, params: HnswParams) -> Self {
        self.params = params;
        self
    }

    /// Attaches a shared embedding provider, enabling the text-based
    /// collection operations.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn TextEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Creates a new collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionExists`] if the name is already in use,
    /// [`Error::InvalidCollectionName`] if it is not a valid file-name
    /// stem, or [`Error::Io`] on file errors.
    pub fn create_collection(&self, name: &str) -> Result<Arc<Collection>> {
        validate_name(name)?;
        let mut collections = self.collections.write();

        if collections.contains_key(name) {
            return Err(Error::CollectionExists(name.to_string()));
        }

        let collection = match &self.directory {
            Some(directory) => {
                if directory.join(format!("{name}.db")).exists() {
                    return Err(Error::CollectionExists(name.to_string()));
                }
                Collection::create(
                    name.to_string(),
                    directory.clone(),
                    self.params,
                    self.embedder.clone(),
                )?
            }
            None => match &self.embedder {
                Some(embedder) => Collection::in_memory_with_embedder(
                    name.to_string(),
                    self.params,
                    Arc::clone(embedder),
                ),
                None => Collection::in_memory(name.to_string(), self.params),
            },
        };

        let collection = Arc::new(collection);
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }

    /// Fetches a collection, loading it from disk on first access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionNotFound`] if the name is unknown both
    /// in the cache and on disk.
    pub fn get_collection(&self, name: &str) -> Result<Arc<Collection>> {
        if let Some(collection) = self.collections.read().get(name) {
            return Ok(Arc::clone(collection));
        }

        let Some(directory) = &self.directory else {
            return Err(Error::CollectionNotFound(name.to_string()));
        };
        if !directory.join(format!("{name}.db")).exists() {
            return Err(Error::CollectionNotFound(name.to_string()));
        }

        let mut collections = self.collections.write();
        // Another thread may have loaded it while we waited for the lock.
        if let Some(collection) = collections.get(name) {
            return Ok(Arc::clone(collection));
        }

        let collection = Arc::new(Collection::open(
            name.to_string(),
            directory.clone(),
            self.params,
            self.embedder.clone(),
        )?);
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }

    /// Fetches a collection, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCollectionName`] or [`Error::Io`] from the
    /// create path.
    pub fn get_or_create_collection(&self, name: &str) -> Result<Arc<Collection>> {
        match self.get_collection(name) {
            Err(Error::CollectionNotFound(_)) => self.create_collection(name),
            other => other,
        }
    }

    /// Names of all cached collections.
    #[must_use]
    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Drops a collection and removes its backing files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionNotFound`] if the name is unknown, or
    /// [`Error::Io`] if the files cannot be removed.
    pub fn delete_collection(&self, name: &str) -> Result<()> {
        let removed = self.collections.write().remove(name);

        match removed {
            Some(collection) => collection.delete_persisted_storage(),
            None => {
                let Some(directory) = &self.directory else {
                    return Err(Error::CollectionNotFound(name.to_string()));
                };
                let db_file = directory.join(format!("{name}.db"));
                if !db_file.exists() {
                    return Err(Error::CollectionNotFound(name.to_string()));
                }
                std::fs::remove_file(db_file)?;
                let hnsw_file = directory.join(format!("{name}.hnsw"));
                if hnsw_file.exists() {
                    std::fs::remove_file(hnsw_file)?;
                }
                Ok(())
            }
        }
    }

    /// Persists every cached collection.
    ///
    /// # Errors
    ///
    /// Returns the first persistence failure encountered.
    pub fn persist(&self) -> Result<()> {
        let collections = self.collections.read();
        for collection in collections.values() {
            collection.persist()?;
        }
        Ok(())
    }
}

/// Collection names become file-name stems, so they are restricted to
/// non-empty ASCII alphanumerics plus `-` and `_`.
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidCollectionName(name.to_string()))
    }
}

#[cfg(test)]
mod database_tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_starts_with_no_collections() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path()).unwrap();
        assert!(db.list_collections().is_empty());
    }

    #[test]
    fn create_and_list_collections() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path()).unwrap();

        db.create_collection("notes").unwrap();
        db.create_collection("mail").unwrap();
        assert_eq!(db.list_collections(), vec!["mail", "notes"]);
    }

    #[test]
    fn duplicate_collection_is_rejected() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path()).unwrap();

        db.create_collection("notes").unwrap();
        let err = db.create_collection("notes").unwrap_err();
        assert_eq!(err.code(), "UNI-001");
    }

    #[test]
    fn duplicate_is_detected_across_instances() {
        let dir = tempdir().unwrap();
        {
            let db = Database::open(dir.path()).unwrap();
            db.create_collection("notes").unwrap();
            db.persist().unwrap();
        }

        let db = Database::open(dir.path()).unwrap();
        let err = db.create_collection("notes").unwrap_err();
        assert_eq!(err.code(), "UNI-001");
    }

    #[test]
    fn invalid_names_are_rejected() {
        let db = Database::in_memory();
        for name in ["", "a/b", "a.b", "white space", "emoji💾"] {
            let err = db.create_collection(name).unwrap_err();
            assert_eq!(err.code(), "UNI-004", "{name} should be invalid");
        }
        for name in ["notes", "my-notes", "my_notes", "v2"] {
            assert!(db.create_collection(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn missing_collection_is_not_found() {
        let db = Database::in_memory();
        let err = db.get_collection("ghost").unwrap_err();
        assert_eq!(err.code(), "UNI-002");
        let err = db.delete_collection("ghost").unwrap_err();
        assert_eq!(err.code(), "UNI-002");
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let db = Database::in_memory();
        let first = db.get_or_create_collection("notes").unwrap();
        first.add_document("hello", vec![1.0, 0.0], None).unwrap();

        let second = db.get_or_create_collection("notes").unwrap();
        assert_eq!(second.count(), 1);
    }

    #[test]
    fn delete_collection_removes_files() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path()).unwrap();

        let collection = db.create_collection("notes").unwrap();
        collection.add_document("hello", vec![1.0, 0.0], None).unwrap();
        collection.persist().unwrap();
        assert!(dir.path().join("notes.db").exists());

        db.delete_collection("notes").unwrap();
        assert!(!dir.path().join("notes.db").exists());
        assert!(!dir.path().join("notes.hnsw").exists());
        assert!(db.get_collection("notes").is_err());
    }

    #[test]
    fn collections_reload_from_disk() {
        let dir = tempdir().unwrap();
        {
            let db = Database::open(dir.path()).unwrap();
            let collection = db.create_collection("notes").unwrap();
            collection.add_document("hello", vec![1.0, 0.0], None).unwrap();
            db.persist().unwrap();
        }

        let db = Database::open(dir.path()).unwrap();
        let collection = db.get_collection("notes").unwrap();
        assert_eq!(collection.count(), 1);
        assert_eq!(collection.get_document(0).unwrap().text, "hello");
    }
}
