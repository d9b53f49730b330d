//! Collection engine: a document store paired with an HNSW graph.
//!
//! All public operations are serialised by a per-collection single-writer /
//! multi-reader lock: mutations and persistence take the writer side,
//! lookups and searches the reader side. The graph indexes positions in
//! the store's insertion order; deletions and updates rebuild the graph
//! from scratch, trading write amplification for correctness since HNSW
//! does not natively support removal.

use crate::document::{Document, SearchResult};
use crate::embedding::TextEmbedder;
use crate::error::{Error, Result};
use crate::filter::SearchFilters;
use crate::index::hnsw::{load_graph, save_graph, Graph, GraphStats, HnswParams};
use crate::storage::DocumentStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// State guarded by the collection lock.
struct CollectionInner {
    store: DocumentStore,
    graph: Graph,
}

/// A named bundle of documents sharing one vector dimensionality and one
/// HNSW index.
///
/// Persistent collections keep two files under their directory:
/// `<name>.db` (the document store, including the ID allocator) and
/// `<name>.hnsw` (the graph topology, no items). In-memory collections
/// skip all persistence.
pub struct Collection {
    name: String,
    directory: Option<PathBuf>,
    params: HnswParams,
    embedder: Option<Arc<dyn TextEmbedder>>,
    inner: RwLock<CollectionInner>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("directory", &self.directory)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

fn db_path(directory: &Path, name: &str) -> PathBuf {
    directory.join(format!("{name}.db"))
}

fn hnsw_path(directory: &Path, name: &str) -> PathBuf {
    directory.join(format!("{name}.hnsw"))
}

impl Collection {
    /// Creates an in-memory collection with no backing files.
    #[must_use]
    pub fn in_memory(name: impl Into<String>, params: HnswParams) -> Self {
        Self {
            name: name.into(),
            directory: None,
            params,
            embedder: None,
            inner: RwLock::new(CollectionInner {
                store: DocumentStore::new(),
                graph: Graph::new(params),
            }),
        }
    }

    /// Creates an in-memory collection wired to an embedding provider, so
    /// the text-based operations are available.
    #[must_use]
    pub fn in_memory_with_embedder(
        name: impl Into<String>,
        params: HnswParams,
        embedder: Arc<dyn TextEmbedder>,
    ) -> Self {
        let mut collection = Self::in_memory(name, params);
        collection.embedder = Some(embedder);
        collection
    }

    /// Creates a new persistent collection and writes its initial files.
    pub(crate) fn create(
        name: String,
        directory: PathBuf,
        params: HnswParams,
        embedder: Option<Arc<dyn TextEmbedder>>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&directory)?;
        let collection = Self {
            name,
            directory: Some(directory),
            params,
            embedder,
            inner: RwLock::new(CollectionInner {
                store: DocumentStore::new(),
                graph: Graph::new(params),
            }),
        };
        collection.persist()?;
        tracing::info!(name = %collection.name, "created collection");
        Ok(collection)
    }

    /// Opens a persistent collection from its backing files.
    ///
    /// The document store is loaded first. If the graph file is missing,
    /// the graph is rebuilt from the stored documents and re-persisted.
    pub(crate) fn open(
        name: String,
        directory: PathBuf,
        params: HnswParams,
        embedder: Option<Arc<dyn TextEmbedder>>,
    ) -> Result<Self> {
        let store = DocumentStore::load(&db_path(&directory, &name))?;
        let graph_file = hnsw_path(&directory, &name);

        let graph = if graph_file.exists() {
            let items: Vec<Vec<f32>> = store.documents().map(|d| d.vector.clone()).collect();
            let file = File::open(&graph_file)?;
            load_graph(BufReader::new(file), items)?
        } else {
            tracing::warn!(name = %name, "graph file missing, rebuilding from document store");
            let mut graph = Graph::new(params);
            graph.add_items(store.documents().map(|d| d.vector.clone()).collect())?;
            let file = File::create(&graph_file)?;
            save_graph(&graph, BufWriter::new(file))?;
            graph
        };

        tracing::info!(name = %name, documents = store.len(), "opened collection");
        Ok(Self {
            name,
            directory: Some(directory),
            params,
            embedder,
            inner: RwLock::new(CollectionInner { store, graph }),
        })
    }

    /// The collection's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored documents.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.read().store.len()
    }

    /// Returns true if the collection holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().store.is_empty()
    }

    /// Vector dimensionality, implicit in the first inserted document.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().store.dimension()
    }

    /// Returns true if a document with `id` exists.
    #[must_use]
    pub fn contains(&self, id: i32) -> bool {
        self.inner.read().store.contains(id)
    }

    /// Looks up a document, returning `None` when absent.
    #[must_use]
    pub fn try_get_document(&self, id: i32) -> Option<Document> {
        self.inner.read().store.get(id).cloned()
    }

    /// Looks up a document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentNotFound`] when the ID is absent.
    pub fn get_document(&self, id: i32) -> Result<Document> {
        self.try_get_document(id)
            .ok_or(Error::DocumentNotFound(id))
    }

    /// Snapshot of all documents in insertion order.
    #[must_use]
    pub fn documents(&self) -> Vec<Document> {
        self.inner.read().store.documents().cloned().collect()
    }

    /// Index construction and traversal statistics.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        self.inner.read().graph.stats()
    }

    /// Adds a document with a caller-supplied vector. Returns the new ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the vector's length differs
    /// from the collection's dimensionality.
    pub fn add_document(
        &self,
        text: impl Into<String>,
        vector: Vec<f32>,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<i32> {
        let mut inner = self.inner.write();
        check_dimension(&inner.store, vector.len())?;

        let id = inner
            .store
            .add(text.into(), vector.clone(), metadata.unwrap_or_default());
        inner.graph.add_items(vec![vector])?;
        Ok(id)
    }

    /// Embeds a batch of texts and adds them as documents in one index
    /// pass. Returns the new IDs in input order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Embedding`] if no provider is configured or the
    /// provider fails, and [`Error::DimensionMismatch`] on an inconsistent
    /// vector length.
    pub async fn add_documents(
        &self,
        texts: &[String],
        metadatas: Option<Vec<HashMap<String, String>>>,
    ) -> Result<Vec<i32>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.embedder()?.embed_batch(texts).await?;

        // Documents beyond the supplied metadata get an empty map.
        let mut metadatas = metadatas.unwrap_or_default();
        metadatas.resize(texts.len(), HashMap::new());

        let mut inner = self.inner.write();
        let expected = inner.store.dimension().unwrap_or(vectors[0].len());
        for vector in &vectors {
            if vector.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let mut ids = Vec::with_capacity(texts.len());
        for (text, (vector, metadata)) in texts
            .iter()
            .zip(vectors.iter().zip(metadatas.drain(..)))
        {
            ids.push(inner.store.add(text.clone(), vector.clone(), metadata));
        }
        inner.graph.add_items(vectors)?;
        Ok(ids)
    }

    /// Deletes a document and rebuilds the graph without it.
    ///
    /// Returns false if the ID was absent.
    ///
    /// # Errors
    ///
    /// Surfaces rebuild failures; the store mutation itself cannot fail.
    pub fn delete_document(&self, id: i32) -> Result<bool> {
        let mut inner = self.inner.write();
        if !inner.store.delete(id) {
            return Ok(false);
        }
        self.rebuild_graph(&mut inner)?;
        Ok(true)
    }

    /// Replaces a document's text, vector and metadata, then rebuilds the
    /// graph. Only the modification timestamp is refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentNotFound`] when the ID is absent, or
    /// [`Error::DimensionMismatch`] for a vector of the wrong length.
    pub fn update_document_with_vector(
        &self,
        id: i32,
        text: impl Into<String>,
        vector: Vec<f32>,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let current = inner
            .store
            .get(id)
            .ok_or(Error::DocumentNotFound(id))?;

        if vector.len() != current.dimension() {
            return Err(Error::DimensionMismatch {
                expected: current.dimension(),
                actual: vector.len(),
            });
        }

        let metadata = metadata.unwrap_or_else(|| current.metadata.clone());
        inner.store.update(id, text.into(), vector, metadata)?;
        self.rebuild_graph(&mut inner)
    }

    /// Embeds the new text and updates the document.
    ///
    /// # Errors
    ///
    /// Same surface as [`Collection::update_document_with_vector`], plus
    /// [`Error::Embedding`].
    pub async fn update_document(
        &self,
        id: i32,
        text: impl Into<String> + Send,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<()> {
        let text = text.into();
        let vector = self.embedder()?.embed(&text).await?;
        self.update_document_with_vector(id, text, vector, metadata)
    }

    /// k-NN search by vector with optional post-filters.
    ///
    /// Results are sorted by ascending cosine distance; filtered-out
    /// matches are dropped, so fewer than `k` results may return.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] for a query of the wrong
    /// length, or [`Error::GraphChanged`] if the internal retry budget is
    /// exhausted.
    pub fn search(
        &self,
        vector: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>> {
        let inner = self.inner.read();
        let matches = inner.graph.k_nearest(vector, k)?;

        let docs: Vec<&Document> = inner.store.documents().collect();
        let mut results: Vec<SearchResult> = matches
            .into_iter()
            .filter_map(|m| {
                #[allow(clippy::cast_sign_loss)]
                let doc = docs[m.id as usize];
                filters
                    .matches(doc)
                    .then(|| SearchResult::new(doc.clone(), m.distance))
            })
            .collect();

        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(results)
    }

    /// Embeds the query text, then searches.
    ///
    /// # Errors
    ///
    /// Same surface as [`Collection::search`], plus [`Error::Embedding`].
    pub async fn search_text(
        &self,
        text: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>> {
        let vector = self.embedder()?.embed(text).await?;
        self.search(&vector, k, filters)
    }

    /// Writes both backing files. A no-op for in-memory collections.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Serialization`] on failure.
    pub fn persist(&self) -> Result<()> {
        let Some(directory) = &self.directory else {
            return Ok(());
        };
        let inner = self.inner.write();

        inner.store.persist(&db_path(directory, &self.name))?;
        let file = File::create(hnsw_path(directory, &self.name))?;
        save_graph(&inner.graph, BufWriter::new(file))?;
        tracing::debug!(name = %self.name, documents = inner.store.len(), "persisted collection");
        Ok(())
    }

    /// Removes the backing files. A no-op for in-memory collections.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a file cannot be removed.
    pub fn delete_persisted_storage(&self) -> Result<()> {
        let Some(directory) = &self.directory else {
            return Ok(());
        };
        let _inner = self.inner.write();

        for path in [
            db_path(directory, &self.name),
            hnsw_path(directory, &self.name),
        ] {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    /// Rebuilds the graph from the store's current contents, reusing the
    /// parameters (and in particular the distance kernel) the index was
    /// built with.
    fn rebuild_graph(&self, inner: &mut CollectionInner) -> Result<()> {
        let mut params = *inner.graph.params();
        params.initial_distance_cache_size = self.params.initial_distance_cache_size;

        let mut graph = Graph::new(params);
        graph.add_items(inner.store.documents().map(|d| d.vector.clone()).collect())?;
        tracing::debug!(name = %self.name, documents = inner.store.len(), "rebuilt graph");
        inner.graph = graph;
        Ok(())
    }

    fn embedder(&self) -> Result<&Arc<dyn TextEmbedder>> {
        self.embedder
            .as_ref()
            .ok_or_else(|| Error::Embedding("no embedding provider configured".into()))
    }

    /// Test hook: runs `f` against the live graph under the reader lock.
    #[cfg(test)]
    pub(crate) fn with_graph<R>(&self, f: impl FnOnce(&Graph) -> R) -> R {
        f(&self.inner.read().graph)
    }
}

fn check_dimension(store: &DocumentStore, actual: usize) -> Result<()> {
    match store.dimension() {
        Some(expected) if expected != actual => {
            Err(Error::DimensionMismatch { expected, actual })
        }
        _ => Ok(()),
    }
}
