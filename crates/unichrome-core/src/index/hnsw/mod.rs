//! Native HNSW index.
//!
//! A layered proximity graph over an append-only arena of vectors, built
//! and traversed with the algorithms from Malkov & Yashunin (2016),
//! arXiv:1603.09320. The graph topology persists independently of the
//! item payloads, which are reattached in insertion order at load time.

mod core;
mod dist_cache;
mod graph;
mod node;
mod params;
mod persistence;
mod search;
mod select;

pub use self::core::GraphCore;
pub use dist_cache::DistanceCache;
pub use graph::{Graph, GraphStats, Neighbor};
pub use node::Node;
pub use params::{HnswParams, NeighborHeuristic};
pub use persistence::{load_graph, save_graph};

#[cfg(test)]
mod dist_cache_tests;
