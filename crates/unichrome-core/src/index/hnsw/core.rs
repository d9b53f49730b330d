//! Arena core: parallel item and node storage plus distance routing.
//!
//! The graph is deeply cyclic, so it is modelled as an append-only arena of
//! nodes addressed by dense integer IDs. Items and nodes are parallel
//! (`items[i]` is the vector of node `i`) and are never freed individually.

use super::dist_cache::DistanceCache;
use super::node::Node;
use super::params::HnswParams;
use crate::distance::DistanceKernel;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Layer cap for sampled levels.
const MAX_LAYER: usize = 15;

/// What a traversal measures distances against: an in-graph node during
/// construction, or an external query vector during search.
#[derive(Debug, Clone, Copy)]
pub(crate) enum QueryTarget<'a> {
    /// A node already present in the arena (construction).
    Node(i32),
    /// An external vector, identified by the sentinel ID -1 (search).
    Vector(&'a [f32]),
}

/// Owns the item and node arenas and performs every distance computation.
///
/// Node-to-node lookups route through the pair cache when enabled; the
/// calculation counter advances on every call, hits included.
#[derive(Debug)]
pub struct GraphCore {
    items: Vec<Vec<f32>>,
    nodes: Vec<Node>,
    kernel: DistanceKernel,
    cache: Option<Mutex<DistanceCache>>,
    distance_calculations: AtomicU64,
    rng_state: AtomicU64,
}

impl GraphCore {
    pub(crate) fn new(params: &HnswParams) -> Self {
        let cache = params
            .enable_distance_cache
            .then(|| Mutex::new(DistanceCache::new(params.initial_distance_cache_size)));

        Self {
            items: Vec::with_capacity(params.initial_items_size),
            nodes: Vec::with_capacity(params.initial_items_size),
            kernel: params.kernel,
            cache,
            distance_calculations: AtomicU64::new(0),
            rng_state: AtomicU64::new(0x5DEE_CE66_D1A4_B5B5),
        }
    }

    /// Rebuilds a core from deserialised parts. Items are supplied
    /// out-of-band and must be parallel to the node sequence.
    pub(crate) fn from_parts(params: &HnswParams, items: Vec<Vec<f32>>, nodes: Vec<Node>) -> Self {
        let mut core = Self::new(params);
        core.items = items;
        core.nodes = nodes;
        core
    }

    /// Number of items (equals the number of nodes).
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Vector dimensionality, implicit in the first inserted item.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.items.first().map(Vec::len)
    }

    #[allow(clippy::cast_sign_loss)]
    pub(crate) fn node(&self, id: i32) -> &Node {
        &self.nodes[id as usize]
    }

    #[allow(clippy::cast_sign_loss)]
    pub(crate) fn node_mut(&mut self, id: i32) -> &mut Node {
        &mut self.nodes[id as usize]
    }

    /// The item stored for `id`.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn item(&self, id: i32) -> &[f32] {
        &self.items[id as usize]
    }

    /// All nodes in arena order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Appends an item, samples its top layer, and allocates its node.
    ///
    /// Returns the new dense ID.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub(crate) fn add_item(&mut self, item: Vec<f32>, params: &HnswParams) -> i32 {
        let id = self.items.len() as i32;
        let layer = self.sample_layer(params.level_lambda);
        self.items.push(item);
        self.nodes.push(Node::new(id, layer, params.m));
        id
    }

    /// Distance between two in-graph nodes, served from the cache when
    /// enabled.
    pub(crate) fn distance(&self, i: i32, j: i32) -> f32 {
        self.distance_calculations.fetch_add(1, Ordering::Relaxed);

        if let Some(cache) = &self.cache {
            cache
                .lock()
                .get_or_compute(i, j, || self.kernel.evaluate(self.item(i), self.item(j)))
        } else {
            self.kernel.evaluate(self.item(i), self.item(j))
        }
    }

    /// Distance from an external query vector to node `j`. Never cached.
    pub(crate) fn distance_to(&self, query: &[f32], j: i32) -> f32 {
        self.distance_calculations.fetch_add(1, Ordering::Relaxed);
        self.kernel.evaluate(query, self.item(j))
    }

    /// Distance from the traversal target to node `id`.
    pub(crate) fn cost(&self, target: &QueryTarget<'_>, id: i32) -> f32 {
        match target {
            QueryTarget::Node(q) => self.distance(*q, id),
            QueryTarget::Vector(v) => self.distance_to(v, id),
        }
    }

    /// Resizes the construction cache; advisory, entries are kept when
    /// `preserve` is set.
    pub(crate) fn resize_cache(&mut self, capacity: usize, preserve: bool) {
        if let Some(cache) = &self.cache {
            cache.lock().resize(capacity, preserve);
        }
    }

    /// Total number of distance computations requested, cache hits included.
    #[must_use]
    pub fn distance_calculations(&self) -> u64 {
        self.distance_calculations.load(Ordering::Relaxed)
    }

    /// Construction cache hit rate in `[0, 1]`; 0 when the cache is
    /// disabled.
    #[must_use]
    pub fn cache_hit_rate(&self) -> f64 {
        self.cache.as_ref().map_or(0.0, |c| c.lock().hit_rate())
    }

    /// Samples a node's top layer: `floor(-ln(u) * lambda)` with
    /// `u ~ Uniform(0, 1]`, capped at [`MAX_LAYER`].
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn sample_layer(&self, lambda: f64) -> usize {
        // xorshift64; a single atomic state keeps sampling allocation-free.
        let mut state = self.rng_state.load(Ordering::Relaxed);
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        self.rng_state.store(state, Ordering::Relaxed);

        // Map the top 53 bits to [0, 1), then flip to (0, 1] so ln is finite.
        let uniform = 1.0 - (state >> 11) as f64 / (1u64 << 53) as f64;
        let layer = (-uniform.ln() * lambda).floor() as usize;
        layer.min(MAX_LAYER)
    }
}
