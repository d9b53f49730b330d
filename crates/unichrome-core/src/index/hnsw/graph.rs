//! The hierarchical navigable small world graph.
//!
//! Implements insertion and k-NN search over the layered proximity graph
//! described by Malkov & Yashunin, with an optimistic version counter
//! guarding traversals against concurrent mutation.

use super::core::{GraphCore, QueryTarget};
use super::node::Node;
use super::params::HnswParams;
use super::search::{run_knn_at_layer, VersionWatch};
use super::select::select_neighbors;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of automatic retries after a traversal observes a concurrent
/// mutation, before [`Error::GraphChanged`] is surfaced.
const MAX_SEARCH_RETRIES: usize = 1024;

/// A k-NN match: a node ID and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Dense node ID, indexing into the owning item store.
    pub id: i32,
    /// Cosine distance to the query.
    pub distance: f32,
}

/// Construction and traversal statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphStats {
    /// Number of indexed items.
    pub items: usize,
    /// Total distance computations, cache hits included.
    pub distance_calculations: u64,
    /// Construction cache hit rate in `[0, 1]`.
    pub cache_hit_rate: f64,
    /// Current value of the mutation counter.
    pub version: u64,
}

/// An HNSW index over dense integer IDs.
///
/// Items and nodes are append-only; deletion is implemented by the owning
/// collection as a rebuild. Mutation requires `&mut self`; searches take
/// `&self` and detect re-entrant mutation through the version counter.
#[derive(Debug)]
pub struct Graph {
    core: GraphCore,
    entry_point: Option<i32>,
    params: HnswParams,
    version: AtomicU64,
}

impl Graph {
    /// Creates an empty graph with the given parameters.
    #[must_use]
    pub fn new(params: HnswParams) -> Self {
        Self {
            core: GraphCore::new(&params),
            entry_point: None,
            params,
            version: AtomicU64::new(0),
        }
    }

    /// Rebuilds a graph from a deserialised topology and its out-of-band
    /// items.
    pub(crate) fn from_parts(
        params: HnswParams,
        items: Vec<Vec<f32>>,
        nodes: Vec<Node>,
        entry_point: Option<i32>,
    ) -> Self {
        Self {
            core: GraphCore::from_parts(&params, items, nodes),
            entry_point,
            params,
            version: AtomicU64::new(0),
        }
    }

    /// The immutable construction parameters.
    #[must_use]
    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    /// The arena core holding items and nodes.
    #[must_use]
    pub fn core(&self) -> &GraphCore {
        &self.core
    }

    /// Current entry point, if any.
    #[must_use]
    pub fn entry_point(&self) -> Option<i32> {
        self.entry_point
    }

    /// Number of indexed items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.len()
    }

    /// Returns true if no item is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    /// Construction and traversal statistics.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            items: self.core.len(),
            distance_calculations: self.core.distance_calculations(),
            cache_hit_rate: self.core.cache_hit_rate(),
            version: self.version.load(Ordering::Acquire),
        }
    }

    /// Appends and connects a batch of items, returning their new IDs.
    ///
    /// An empty batch is a no-op. All items must share the graph's
    /// dimensionality, implicit in the first item ever inserted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if any item's length differs
    /// from the graph's dimensionality.
    pub fn add_items(&mut self, items: Vec<Vec<f32>>) -> Result<Vec<i32>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let expected = self
            .core
            .dimension()
            .unwrap_or_else(|| items[0].len());
        for item in &items {
            if item.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: item.len(),
                });
            }
        }

        // Advisory re-arm of the construction cache for this batch.
        if self.params.enable_distance_cache {
            self.core
                .resize_cache(self.params.initial_distance_cache_size, true);
        }

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let id = self.core.add_item(item, &self.params);
            self.insert_node(id)?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Searches for the `k` nearest items to `query`.
    ///
    /// Returns an empty result on an empty graph. A traversal invalidated
    /// by a concurrent mutation is retried up to 1024 times; only
    /// [`Error::GraphChanged`] is retried, every other error propagates
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] for a query of the wrong
    /// length, or [`Error::GraphChanged`] once the retry budget is
    /// exhausted.
    pub fn k_nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.k_nearest_with_ef(query, k, k)
    }

    /// Searches with an explicit layer-0 candidate pool of
    /// `max(k, ef_search)`.
    ///
    /// # Errors
    ///
    /// Same surface as [`Graph::k_nearest`].
    pub fn k_nearest_with_ef(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<Neighbor>> {
        if let Some(expected) = self.core.dimension() {
            if query.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let Some(entry) = self.entry_point else {
            return Ok(Vec::new());
        };

        for attempt in 0..MAX_SEARCH_RETRIES {
            match self.search_once(query, k, ef_search.max(k), entry) {
                Err(Error::GraphChanged) => {
                    tracing::debug!(attempt, "search invalidated by concurrent mutation");
                }
                other => return other,
            }
        }
        Err(Error::GraphChanged)
    }

    fn search_once(
        &self,
        query: &[f32],
        k: usize,
        ef: usize,
        entry: i32,
    ) -> Result<Vec<Neighbor>> {
        let watch = VersionWatch::new(&self.version);
        let target = QueryTarget::Vector(query);

        let mut best = entry;
        for layer in (1..=self.core.node(entry).max_layer()).rev() {
            let outcome = run_knn_at_layer(&self.core, &target, best, layer, 1, Some(&watch))?;
            if let Some(&(id, _)) = outcome.neighbors.first() {
                best = id;
            }
        }

        let outcome = run_knn_at_layer(&self.core, &target, best, 0, ef, Some(&watch))?;
        Ok(outcome
            .neighbors
            .into_iter()
            .take(k)
            .map(|(id, distance)| Neighbor { id, distance })
            .collect())
    }

    /// Connects a freshly appended node into the layered graph.
    fn insert_node(&mut self, q: i32) -> Result<()> {
        let Some(entry) = self.entry_point else {
            self.entry_point = Some(q);
            self.touch();
            return Ok(());
        };

        let q_level = self.core.node(q).max_layer();
        let entry_level = self.core.node(entry).max_layer();
        let target = QueryTarget::Node(q);

        // Greedy descent above the node's top layer.
        let mut best_peer = entry;
        for layer in (q_level + 1..=entry_level).rev() {
            let outcome = run_knn_at_layer(&self.core, &target, best_peer, layer, 1, None)?;
            if let Some(&(id, _)) = outcome.neighbors.first() {
                best_peer = id;
            }
        }

        // Connect on every shared layer, bottom-up candidate pools.
        for layer in (0..=q_level.min(entry_level)).rev() {
            let outcome = run_knn_at_layer(
                &self.core,
                &target,
                best_peer,
                layer,
                self.params.construction_pruning,
                None,
            )?;

            let m_conn = self.params.m_max(layer);
            let selected = select_neighbors(
                &self.core,
                &target,
                outcome.neighbors,
                layer,
                m_conn,
                &self.params,
            );

            let mut best_dist = self.core.cost(&target, best_peer);
            for n in selected {
                if n == q {
                    continue;
                }
                self.connect(q, n, layer);

                let d = self.core.cost(&target, n);
                if d < best_dist {
                    best_dist = d;
                    best_peer = n;
                }
            }
        }

        if q_level > entry_level {
            self.entry_point = Some(q);
            self.touch();
        }
        Ok(())
    }

    /// Adds the bidirectional edge `q <-> n` at `layer`, shrinking `n`'s
    /// adjacency list when the new edge pushes it past the degree bound.
    fn connect(&mut self, q: i32, n: i32, layer: usize) {
        self.touch();
        self.core.node_mut(q).add_neighbor(layer, n);
        self.touch();
        self.core.node_mut(n).add_neighbor(layer, q);

        let m_max = self.params.m_max(layer);
        if self.core.node(n).degree(layer) > m_max {
            self.shrink(n, layer, m_max);
        }
    }

    /// Reselects `n`'s neighbours at `layer` under the active heuristic.
    fn shrink(&mut self, n: i32, layer: usize, m_max: usize) {
        let target = QueryTarget::Node(n);
        let candidates: Vec<(i32, f32)> = self
            .core
            .node(n)
            .neighbors(layer)
            .iter()
            .map(|&nb| (nb, self.core.cost(&target, nb)))
            .collect();

        let keep = select_neighbors(&self.core, &target, candidates, layer, m_max, &self.params);
        self.touch();
        self.core.node_mut(n).set_neighbors(layer, keep);
    }

    #[inline]
    fn touch(&self) {
        self.version.fetch_add(1, Ordering::Release);
    }
}
