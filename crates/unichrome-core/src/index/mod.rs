//! Vector index implementations.

pub mod hnsw;

pub use hnsw::{Graph, GraphStats, HnswParams, Neighbor, NeighborHeuristic};
