//! Graph node: per-layer bounded adjacency lists.

use serde::{Deserialize, Serialize};

/// A node in the proximity graph.
///
/// Holds one adjacency list per layer the node is present on. Layer 0 is
/// the bottom (densest) layer; the layer stack is contiguous from 0 to
/// [`Node::max_layer`]. Edges are integer IDs into the owning arena, never
/// references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Arena index of this node.
    pub id: i32,
    /// Adjacency lists, one per layer, layer 0 first.
    pub connections: Vec<Vec<i32>>,
}

impl Node {
    /// Creates a node present on layers `0..=max_layer`.
    ///
    /// The layer-0 list is pre-sized to `2 * m`, upper lists to `m`.
    #[must_use]
    pub(crate) fn new(id: i32, max_layer: usize, m: usize) -> Self {
        let connections = (0..=max_layer)
            .map(|layer| Vec::with_capacity(if layer == 0 { m * 2 } else { m }))
            .collect();
        Self { id, connections }
    }

    /// Highest layer this node is present on.
    #[must_use]
    pub fn max_layer(&self) -> usize {
        self.connections.len().saturating_sub(1)
    }

    /// Neighbour IDs at `layer`; empty for layers above the node's stack.
    #[must_use]
    pub fn neighbors(&self, layer: usize) -> &[i32] {
        self.connections.get(layer).map_or(&[], Vec::as_slice)
    }

    /// Out-degree at `layer`.
    #[must_use]
    pub fn degree(&self, layer: usize) -> usize {
        self.neighbors(layer).len()
    }

    /// Adds an edge to `neighbor` at `layer`.
    ///
    /// Self-loops and duplicate edges are ignored.
    pub(crate) fn add_neighbor(&mut self, layer: usize, neighbor: i32) {
        if neighbor == self.id {
            return;
        }
        if let Some(list) = self.connections.get_mut(layer) {
            if !list.contains(&neighbor) {
                list.push(neighbor);
            }
        }
    }

    /// Replaces the adjacency list at `layer`.
    pub(crate) fn set_neighbors(&mut self, layer: usize, neighbors: Vec<i32>) {
        if let Some(list) = self.connections.get_mut(layer) {
            *list = neighbors;
        }
    }
}

#[cfg(test)]
mod node_tests {
    use super::*;

    #[test]
    fn layer_stack_is_contiguous() {
        let node = Node::new(3, 2, 10);
        assert_eq!(node.max_layer(), 2);
        assert_eq!(node.connections.len(), 3);
        assert_eq!(node.connections[0].capacity(), 20);
        assert!(node.connections[1].capacity() >= 10);
    }

    #[test]
    fn self_loops_and_duplicates_are_ignored() {
        let mut node = Node::new(3, 0, 10);
        node.add_neighbor(0, 3);
        assert_eq!(node.degree(0), 0);

        node.add_neighbor(0, 7);
        node.add_neighbor(0, 7);
        assert_eq!(node.neighbors(0), &[7]);
    }

    #[test]
    fn layers_above_stack_are_empty() {
        let node = Node::new(0, 1, 10);
        assert!(node.neighbors(5).is_empty());
    }
}
