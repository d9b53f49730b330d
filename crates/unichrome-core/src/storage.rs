//! Document store: keyed ownership of documents and ID allocation.
//!
//! The store exclusively owns documents; the vector index holds only
//! integer IDs. IDs are monotonic over the collection's lifetime and never
//! reused. Persistence is a snapshot: a self-contained binary file holding
//! the allocator state and every document in insertion order.

use crate::document::{now_micros, Document};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// In-memory document store with snapshot persistence.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DocumentStore {
    next_id: i32,
    documents: IndexMap<i32, Document>,
}

impl DocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The ID the next added document will receive.
    #[must_use]
    pub const fn next_id(&self) -> i32 {
        self.next_id
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Allocates an ID and inserts a new document with both timestamps set
    /// to the current wall-clock time. Returns the assigned ID.
    pub fn add(
        &mut self,
        text: String,
        vector: Vec<f32>,
        metadata: HashMap<String, String>,
    ) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        self.documents
            .insert(id, Document::new(id, text, vector, metadata));
        id
    }

    /// Replaces a document's text, vector and metadata, refreshing only the
    /// modification timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentNotFound`] if the ID is absent.
    pub fn update(
        &mut self,
        id: i32,
        text: String,
        vector: Vec<f32>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let doc = self
            .documents
            .get_mut(&id)
            .ok_or(Error::DocumentNotFound(id))?;
        doc.text = text;
        doc.vector = vector;
        doc.metadata = metadata;
        doc.modified_at = now_micros();
        Ok(())
    }

    /// Removes a document, preserving the insertion order of the rest.
    ///
    /// Returns false if the ID is absent.
    pub fn delete(&mut self, id: i32) -> bool {
        self.documents.shift_remove(&id).is_some()
    }

    /// Looks up a document by ID.
    #[must_use]
    pub fn get(&self, id: i32) -> Option<&Document> {
        self.documents.get(&id)
    }

    /// Returns true if the ID is present.
    #[must_use]
    pub fn contains(&self, id: i32) -> bool {
        self.documents.contains_key(&id)
    }

    /// Iterates documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Vector dimensionality, implicit in the first stored document.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.documents.values().next().map(Document::dimension)
    }

    /// Writes a self-contained snapshot to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on file errors and [`Error::Serialization`] if
    /// encoding fails.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Loads a snapshot, replacing the current contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on file errors and [`Error::Serialization`] if
    /// decoding fails.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        bincode::deserialize_from(reader).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod storage_tests {
    use super::*;

    fn add_doc(store: &mut DocumentStore, text: &str) -> i32 {
        store.add(text.to_string(), vec![1.0, 0.0], HashMap::new())
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut store = DocumentStore::new();
        let a = add_doc(&mut store, "a");
        let b = add_doc(&mut store, "b");
        assert!(b > a);

        assert!(store.delete(b));
        let c = add_doc(&mut store, "c");
        assert!(c > b, "deleted IDs are never reused");
        assert!(store.next_id() > c);
    }

    #[test]
    fn add_stamps_both_timestamps_update_only_modified() {
        let mut store = DocumentStore::new();
        let id = add_doc(&mut store, "original");

        let created = store.get(id).unwrap().created_at;
        assert_eq!(created, store.get(id).unwrap().modified_at);

        std::thread::sleep(std::time::Duration::from_millis(2));
        store
            .update(id, "updated".into(), vec![0.0, 1.0], HashMap::new())
            .unwrap();

        let doc = store.get(id).unwrap();
        assert_eq!(doc.created_at, created);
        assert!(doc.modified_at > created);
        assert_eq!(doc.text, "updated");
    }

    #[test]
    fn delete_reports_absence() {
        let mut store = DocumentStore::new();
        let id = add_doc(&mut store, "a");
        assert!(store.delete(id));
        assert!(!store.delete(id));
        assert!(!store.delete(999));
    }

    #[test]
    fn update_of_missing_document_is_not_found() {
        let mut store = DocumentStore::new();
        let err = store
            .update(5, "x".into(), vec![1.0], HashMap::new())
            .unwrap_err();
        assert_eq!(err.code(), "UNI-003");
    }

    #[test]
    fn documents_iterate_in_insertion_order_across_deletes() {
        let mut store = DocumentStore::new();
        let ids: Vec<i32> = (0..5).map(|i| add_doc(&mut store, &format!("d{i}"))).collect();
        store.delete(ids[2]);

        let remaining: Vec<i32> = store.documents().map(|d| d.id).collect();
        assert_eq!(remaining, vec![ids[0], ids[1], ids[3], ids[4]]);
    }

    #[test]
    fn snapshot_round_trip_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.db");

        let mut store = DocumentStore::new();
        let mut meta = HashMap::new();
        meta.insert("source".to_string(), "notion".to_string());
        store.add("hello".into(), vec![0.25, -0.5, 1.0], meta);
        store.add("world".into(), vec![1.0, 0.0, 0.0], HashMap::new());
        let first_id = store.documents().next().unwrap().id;
        store.delete(first_id);

        store.persist(&path).unwrap();
        let reloaded = DocumentStore::load(&path).unwrap();

        assert_eq!(reloaded.next_id(), store.next_id());
        let before: Vec<&Document> = store.documents().collect();
        let after: Vec<&Document> = reloaded.documents().collect();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(*b, *a);
        }

        // Persisting the reload produces an identical file.
        let path2 = dir.path().join("docs2.db");
        reloaded.persist(&path2).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), std::fs::read(&path2).unwrap());
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let err = DocumentStore::load(Path::new("/nonexistent/store.db")).unwrap_err();
        assert_eq!(err.code(), "UNI-008");
    }
}
