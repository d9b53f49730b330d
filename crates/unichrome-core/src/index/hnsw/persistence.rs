//! Graph topology persistence.
//!
//! Serialises the parameters, the complete node sequence and the entry
//! point. Item payloads are excluded; the loader reattaches them in
//! insertion order, so the `i`-th supplied item must correspond to node
//! `i`. The codec round-trips itself exactly.

use super::graph::Graph;
use super::node::Node;
use super::params::HnswParams;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// On-disk image of a graph, minus the items.
#[derive(Serialize, Deserialize)]
struct GraphSnapshot {
    params: HnswParams,
    nodes: Vec<Node>,
    entry_point: Option<i32>,
}

/// Writes the graph topology to `writer`.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if encoding fails.
pub fn save_graph<W: Write>(graph: &Graph, writer: W) -> Result<()> {
    let snapshot = GraphSnapshot {
        params: *graph.params(),
        nodes: graph.core().nodes().to_vec(),
        entry_point: graph.entry_point(),
    };

    bincode::serialize_into(writer, &snapshot).map_err(|e| Error::Serialization(e.to_string()))
}

/// Reads a graph topology from `reader` and reattaches `items` in
/// insertion order.
///
/// The loaded parameters have their cache size forced to 0 so a pre-built
/// graph does not eagerly allocate a construction cache.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if decoding fails or if the item count
/// does not match the node count.
pub fn load_graph<R: Read>(reader: R, items: Vec<Vec<f32>>) -> Result<Graph> {
    let snapshot: GraphSnapshot =
        bincode::deserialize_from(reader).map_err(|e| Error::Serialization(e.to_string()))?;

    if items.len() != snapshot.nodes.len() {
        return Err(Error::Serialization(format!(
            "item count {} does not match node count {}",
            items.len(),
            snapshot.nodes.len()
        )));
    }

    let mut params = snapshot.params;
    params.initial_distance_cache_size = 0;

    Ok(Graph::from_parts(
        params,
        items,
        snapshot.nodes,
        snapshot.entry_point,
    ))
}
