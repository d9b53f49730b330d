//! Neighbour selection policies for graph construction.
//!
//! Given a candidate set with precomputed distances to the insertion node,
//! pick at most `m_max` neighbours. The policy is a tagged variant matched
//! here at the single call site rather than a polymorphic object.

use super::core::{GraphCore, QueryTarget};
use super::params::{HnswParams, NeighborHeuristic};
use rustc_hash::FxHashSet;

/// Selects up to `m_max` neighbour IDs from `candidates` for connecting the
/// traversal target at `layer`.
///
/// `candidates` carries `(id, distance-to-target)` pairs. The returned list
/// is ordered closest-first; ties break towards the smaller ID.
pub(crate) fn select_neighbors(
    core: &GraphCore,
    target: &QueryTarget<'_>,
    candidates: Vec<(i32, f32)>,
    layer: usize,
    m_max: usize,
    params: &HnswParams,
) -> Vec<i32> {
    match params.neighbor_heuristic {
        NeighborHeuristic::Simple => select_simple(candidates, m_max),
        NeighborHeuristic::Heuristic => {
            select_heuristic(core, target, candidates, layer, m_max, params)
        }
    }
}

/// Sorts `(id, distance)` pairs closest-first, ties towards the smaller ID.
fn sort_closest_first(pairs: &mut [(i32, f32)]) {
    pairs.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
}

/// The `m_max` closest candidates by distance, ties broken by smaller ID.
fn select_simple(mut candidates: Vec<(i32, f32)>, m_max: usize) -> Vec<i32> {
    sort_closest_first(&mut candidates);
    candidates.truncate(m_max);
    candidates.into_iter().map(|(id, _)| id).collect()
}

/// Diversity-aware selection (Malkov & Yashunin, Alg. 4).
///
/// A candidate `e` is accepted only if the target is closer to `e` than
/// every already-accepted neighbour is; rejected candidates go to a discard
/// pile that optionally tops the result back up to `m_max`.
fn select_heuristic(
    core: &GraphCore,
    target: &QueryTarget<'_>,
    candidates: Vec<(i32, f32)>,
    layer: usize,
    m_max: usize,
    params: &HnswParams,
) -> Vec<i32> {
    let mut working: Vec<(i32, f32)> = Vec::with_capacity(candidates.len());
    let mut seen: FxHashSet<i32> = FxHashSet::default();

    for &(id, d) in &candidates {
        if seen.insert(id) {
            working.push((id, d));
        }
    }

    if params.expand_best_selection {
        for &(id, _) in &candidates {
            for &nb in core.node(id).neighbors(layer) {
                if let QueryTarget::Node(q) = target {
                    if nb == *q {
                        continue;
                    }
                }
                if seen.insert(nb) {
                    working.push((nb, core.cost(target, nb)));
                }
            }
        }
    }

    // The working set is complete at this point; examining it closest-first
    // makes the discard pile inherit that order for the top-up below.
    sort_closest_first(&mut working);

    let mut selected: Vec<(i32, f32)> = Vec::with_capacity(m_max);
    let mut discarded: Vec<(i32, f32)> = Vec::new();

    for (id, d) in working {
        if selected.len() >= m_max {
            break;
        }

        // Accept iff the target is closer to this candidate than any
        // already-selected neighbour is.
        let diverse = selected.iter().all(|&(s, _)| core.distance(id, s) > d);

        if diverse {
            selected.push((id, d));
        } else {
            discarded.push((id, d));
        }
    }

    if params.keep_pruned_connections && selected.len() < m_max {
        for (id, d) in discarded {
            if selected.len() >= m_max {
                break;
            }
            selected.push((id, d));
        }
    }

    selected.into_iter().map(|(id, _)| id).collect()
}

#[cfg(test)]
mod select_tests {
    use super::*;
    use crate::index::hnsw::graph::Graph;

    fn seeded_graph(heuristic: NeighborHeuristic) -> Graph {
        let params = HnswParams::default().with_heuristic(heuristic);
        let mut graph = Graph::new(params);
        graph
            .add_items(vec![
                vec![1.0, 0.0, 0.0],
                vec![0.99, 0.01, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ])
            .unwrap();
        graph
    }

    #[test]
    fn simple_takes_closest_with_id_tiebreak() {
        let picked = select_simple(vec![(5, 0.3), (2, 0.1), (9, 0.1), (1, 0.7)], 2);
        assert_eq!(picked, vec![2, 9]);
    }

    #[test]
    fn simple_returns_everything_when_under_quota() {
        let picked = select_simple(vec![(5, 0.3), (2, 0.1)], 10);
        assert_eq!(picked, vec![2, 5]);
    }

    #[test]
    fn heuristic_prefers_diverse_neighbors() {
        let graph = seeded_graph(NeighborHeuristic::Heuristic);
        let core = graph.core();
        // Roughly equidistant from the {0, 1} cluster and from node 2.
        let target = QueryTarget::Vector(&[0.7, 0.7, 0.0]);

        // Nodes 0 and 1 are nearly collinear; node 2 is orthogonal to them.
        // With a quota of 2 the heuristic keeps the closest cluster member
        // and skips its near-duplicate in favour of the diverse node.
        let candidates: Vec<(i32, f32)> = [0, 1, 2, 3]
            .iter()
            .map(|&id| (id, core.cost(&target, id)))
            .collect();

        let picked = select_heuristic(
            core,
            &target,
            candidates,
            0,
            2,
            &HnswParams::default().with_heuristic(NeighborHeuristic::Heuristic),
        );

        assert_eq!(picked, vec![1, 2]);
    }

    #[test]
    fn keep_pruned_tops_up_from_discards() {
        let graph = seeded_graph(NeighborHeuristic::Heuristic);
        let core = graph.core();
        let target = QueryTarget::Vector(&[0.7, 0.7, 0.0]);

        let candidates: Vec<(i32, f32)> = [0, 1]
            .iter()
            .map(|&id| (id, core.cost(&target, id)))
            .collect();

        let mut params = HnswParams::default().with_heuristic(NeighborHeuristic::Heuristic);
        params.keep_pruned_connections = true;

        // Candidate 0 is discarded as a near-duplicate of 1, but the quota
        // of 2 pulls it back from the discard pile.
        let picked = select_heuristic(core, &target, candidates, 0, 2, &params);
        assert_eq!(picked, vec![1, 0]);
    }

    #[test]
    fn empty_candidates_select_nothing() {
        let graph = seeded_graph(NeighborHeuristic::Heuristic);
        let picked = select_neighbors(
            graph.core(),
            &QueryTarget::Vector(&[1.0, 0.0, 0.0]),
            Vec::new(),
            0,
            5,
            graph.params(),
        );
        assert!(picked.is_empty());
    }
}
