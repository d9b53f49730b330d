//! Best-first k-NN search on a single graph layer.
//!
//! The searcher keeps a visited set, a min-heap of candidates and a
//! max-heap of the best `k` results, both keyed by distance to the query
//! with ties broken by smaller ID. Traversals running concurrently with a
//! mutation detect it through the graph's version counter and abort with
//! [`Error::GraphChanged`](crate::Error::GraphChanged).

use super::core::{GraphCore, QueryTarget};
use crate::error::{Error, Result};
use rustc_hash::FxHashSet;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the graph version taken when a traversal starts.
///
/// Mutating operations advance the counter around every edge change; any
/// advance observed mid-traversal invalidates the in-flight search.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VersionWatch<'a> {
    counter: &'a AtomicU64,
    seen: u64,
}

impl<'a> VersionWatch<'a> {
    pub(crate) fn new(counter: &'a AtomicU64) -> Self {
        Self {
            counter,
            seen: counter.load(Ordering::Acquire),
        }
    }

    fn check(&self) -> Result<()> {
        if self.counter.load(Ordering::Acquire) == self.seen {
            Ok(())
        } else {
            Err(Error::GraphChanged)
        }
    }
}

/// Frontier entry: a node and its distance to the query.
///
/// Ordered by distance with ties broken by smaller ID, using `total_cmp`
/// so the heaps keep a total order whatever the kernel returns.
#[derive(Debug, Clone, Copy)]
struct FrontierEntry {
    dist: f32,
    id: i32,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Result of a single-layer search.
#[derive(Debug)]
pub(crate) struct LayerOutcome {
    /// Up to `k` `(id, distance)` pairs in ascending distance order.
    pub neighbors: Vec<(i32, f32)>,
    /// Number of nodes visited during the traversal.
    pub visited: usize,
}

/// Runs best-first k-NN from `start` on `layer`.
///
/// `watch` is present for reader traversals and absent during construction,
/// where the inserting thread is itself the mutator.
pub(crate) fn run_knn_at_layer(
    core: &GraphCore,
    target: &QueryTarget<'_>,
    start: i32,
    layer: usize,
    k: usize,
    watch: Option<&VersionWatch<'_>>,
) -> Result<LayerOutcome> {
    let mut visited: FxHashSet<i32> = FxHashSet::default();
    let mut candidates: BinaryHeap<Reverse<FrontierEntry>> = BinaryHeap::new();
    let mut results: BinaryHeap<FrontierEntry> = BinaryHeap::new();

    let start_entry = FrontierEntry {
        dist: core.cost(target, start),
        id: start,
    };
    visited.insert(start);
    candidates.push(Reverse(start_entry));
    results.push(start_entry);

    // `results` holds the start entry from here on and is only ever
    // trimmed back to `k` elements, so the peeks below cannot fail.
    while let Some(Reverse(closest)) = candidates.pop() {
        let worst = results.peek().expect("results holds the start entry").dist;
        if closest.dist > worst && results.len() >= k {
            break;
        }

        for &neighbor in core.node(closest.id).neighbors(layer) {
            if visited.insert(neighbor) {
                let entry = FrontierEntry {
                    dist: core.cost(target, neighbor),
                    id: neighbor,
                };
                let worst = results.peek().expect("results holds the start entry").dist;

                if results.len() < k || entry.dist < worst {
                    candidates.push(Reverse(entry));
                    results.push(entry);
                    if results.len() > k {
                        results.pop();
                    }
                }
            }
        }

        if let Some(watch) = watch {
            watch.check()?;
        }
    }

    let mut neighbors: Vec<(i32, f32)> = results
        .into_iter()
        .map(|entry| (entry.id, entry.dist))
        .collect();
    neighbors.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    Ok(LayerOutcome {
        neighbors,
        visited: visited.len(),
    })
}

#[cfg(test)]
mod search_tests {
    use super::*;
    use crate::index::hnsw::graph::Graph;
    use crate::index::hnsw::params::HnswParams;

    #[test]
    fn layer_search_returns_ascending_distances() {
        let mut graph = Graph::new(HnswParams::default());
        graph
            .add_items(vec![
                vec![1.0, 0.0],
                vec![0.9, 0.1],
                vec![0.0, 1.0],
                vec![0.5, 0.5],
            ])
            .unwrap();

        let query = [1.0f32, 0.0];
        let target = QueryTarget::Vector(&query);
        let outcome = run_knn_at_layer(graph.core(), &target, 0, 0, 4, None).unwrap();

        assert!(outcome.visited >= outcome.neighbors.len());
        for pair in outcome.neighbors.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
        assert_eq!(outcome.neighbors[0].0, 0);
    }

    #[test]
    fn frontier_orders_by_distance_then_id() {
        let near = FrontierEntry { dist: 0.1, id: 9 };
        let far = FrontierEntry { dist: 0.9, id: 1 };
        assert!(near < far);

        let tie_low = FrontierEntry { dist: 0.5, id: 2 };
        let tie_high = FrontierEntry { dist: 0.5, id: 7 };
        assert!(tie_low < tie_high);
    }

    #[test]
    fn version_advance_aborts_traversal() {
        use std::sync::atomic::AtomicU64;

        let mut graph = Graph::new(HnswParams::default());
        graph.add_items(vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();

        let counter = AtomicU64::new(0);
        let watch = VersionWatch::new(&counter);
        counter.fetch_add(1, Ordering::Release);

        let query = [1.0f32, 0.0];
        let target = QueryTarget::Vector(&query);
        let err = run_knn_at_layer(graph.core(), &target, 0, 0, 2, Some(&watch)).unwrap_err();
        assert!(matches!(err, Error::GraphChanged));
    }
}
