//! HNSW graph parameters.
//!
//! All tunables live in a single immutable [`HnswParams`] value that is
//! serialised together with the graph topology. There is no process-wide
//! state.

use crate::distance::DistanceKernel;
use serde::{Deserialize, Serialize};

/// Neighbour selection policy applied during graph construction.
///
/// Both policies take a candidate set with precomputed distances to the
/// insertion node and return a bounded list of selected neighbour IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborHeuristic {
    /// The closest candidates by distance, ties broken by smaller ID.
    #[default]
    Simple,
    /// The diversity heuristic from Malkov & Yashunin (Alg. 4): a candidate
    /// is accepted only if the insertion node is closer to it than every
    /// already-selected neighbour is.
    Heuristic,
}

/// Parameters governing graph construction and layout.
///
/// Fixed at construction and serialised with the graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Target out-degree on layers above 0. Layer 0 allows `2 * m`.
    pub m: usize,
    /// Decay for exponential layer sampling, `1 / ln(m)` by default.
    pub level_lambda: f64,
    /// Active neighbour selection policy.
    pub neighbor_heuristic: NeighborHeuristic,
    /// Candidate pool size during construction (`efConstruction`).
    pub construction_pruning: usize,
    /// Expand candidates with neighbours-of-neighbours before heuristic
    /// selection. Only consulted by [`NeighborHeuristic::Heuristic`].
    pub expand_best_selection: bool,
    /// Top up the selection from discarded candidates when the heuristic
    /// returns fewer than the requested count. Only consulted by
    /// [`NeighborHeuristic::Heuristic`].
    pub keep_pruned_connections: bool,
    /// Route construction-time distance lookups through the pair cache.
    pub enable_distance_cache: bool,
    /// Advisory capacity of the construction distance cache, in entries.
    /// Forced to 0 when a graph is loaded from disk so a pre-built graph
    /// does not eagerly allocate a cache.
    pub initial_distance_cache_size: usize,
    /// Initial capacity hint for the item and node arenas.
    pub initial_items_size: usize,
    /// Distance kernel used for every similarity computation, including
    /// rebuilds of the graph after a mutation.
    pub kernel: DistanceKernel,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self::with_m(10)
    }
}

impl HnswParams {
    /// Creates parameters with the given target out-degree and the matching
    /// `1 / ln(m)` layer decay.
    #[must_use]
    pub fn with_m(m: usize) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let level_lambda = 1.0 / (m as f64).ln();
        Self {
            m,
            level_lambda,
            neighbor_heuristic: NeighborHeuristic::Simple,
            construction_pruning: 200,
            expand_best_selection: false,
            keep_pruned_connections: false,
            enable_distance_cache: true,
            initial_distance_cache_size: 1 << 20,
            initial_items_size: 1024,
            kernel: DistanceKernel::default(),
        }
    }

    /// Returns the parameters with a different neighbour selection policy.
    #[must_use]
    pub const fn with_heuristic(mut self, heuristic: NeighborHeuristic) -> Self {
        self.neighbor_heuristic = heuristic;
        self
    }

    /// Returns the parameters with a different distance kernel.
    #[must_use]
    pub const fn with_kernel(mut self, kernel: DistanceKernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Maximum allowed out-degree at `layer`: `2 * m` at layer 0, `m` above.
    #[must_use]
    pub const fn m_max(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m * 2
        } else {
            self.m
        }
    }
}
