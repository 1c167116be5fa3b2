//! Generic best-first search.
//!
//! [`astar`] runs over anything implementing [`SearchGraph`], with the goal
//! given as a predicate and the heuristic as a function, so the same engine
//! serves tile-level and room-level queries. Dijkstra is A* with a zero
//! heuristic.
//!
//! The open set is a binary heap ordered by f-score with an insertion
//! sequence as tie-break, which makes results deterministic for a given
//! graph. Improved nodes are re-pushed and stale heap entries are skipped
//! when popped.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A directed, weighted graph the search can walk.
pub trait SearchGraph {
    type Node: Copy + Eq + Hash + Debug;

    fn contains(&self, node: Self::Node) -> bool;

    /// Call `visit(neighbor, edge_cost)` for each outgoing edge.
    fn for_each_edge(&self, node: Self::Node, visit: impl FnMut(Self::Node, f32));
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found,
    /// Open set exhausted. A normal result.
    NoPath,
    /// Every remaining candidate costs more than the budget.
    BudgetExceeded,
    /// The start node is not in the graph.
    InvalidEndpoint,
}

/// Result of a search. `path` starts at the start node and ends at the
/// accepted goal node; it is empty unless `outcome` is `Found`.
#[derive(Debug, Clone)]
pub struct SearchResult<N> {
    pub path: Vec<N>,
    pub cost: f32,
    pub outcome: SearchOutcome,
    pub elapsed: Duration,
    /// Nodes expanded, for diagnostics.
    pub expanded: usize,
}

impl<N> SearchResult<N> {
    fn failed(outcome: SearchOutcome, started: Instant, expanded: usize) -> Self {
        Self {
            path: Vec::new(),
            cost: f32::INFINITY,
            outcome,
            elapsed: started.elapsed(),
            expanded,
        }
    }

    pub fn is_found(&self) -> bool {
        self.outcome == SearchOutcome::Found
    }
}

struct OpenEntry<N> {
    f: f32,
    seq: u64,
    node: N,
}

impl<N> PartialEq for OpenEntry<N> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<N> Eq for OpenEntry<N> {}

impl<N> PartialOrd for OpenEntry<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<N> Ord for OpenEntry<N> {
    // Reversed: BinaryHeap is a max-heap, we want the lowest f first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A* from `start` until `is_goal` accepts a node.
///
/// With a `budget`, the search stops with [`SearchOutcome::BudgetExceeded`]
/// as soon as the cheapest open entry's f-score exceeds it. The heuristic
/// must not overestimate for the returned path to be optimal.
pub fn astar<G, F, H>(
    graph: &G,
    start: G::Node,
    mut is_goal: F,
    heuristic: H,
    budget: Option<f32>,
) -> SearchResult<G::Node>
where
    G: SearchGraph,
    F: FnMut(G::Node) -> bool,
    H: Fn(G::Node) -> f32,
{
    let started = Instant::now();
    if !graph.contains(start) {
        log::error!(target: "path", "search start {:?} is not in the graph", start);
        return SearchResult::failed(SearchOutcome::InvalidEndpoint, started, 0);
    }

    let mut open = BinaryHeap::new();
    let mut closed: HashSet<G::Node> = HashSet::new();
    let mut came_from: HashMap<G::Node, G::Node> = HashMap::new();
    let mut g_score: HashMap<G::Node, f32> = HashMap::new();
    let mut seq = 0u64;
    let mut expanded = 0usize;

    g_score.insert(start, 0.0);
    open.push(OpenEntry {
        f: heuristic(start),
        seq,
        node: start,
    });

    while let Some(OpenEntry { f, node: current, .. }) = open.pop() {
        if !closed.insert(current) {
            continue;
        }
        if let Some(limit) = budget {
            if f > limit {
                return SearchResult::failed(SearchOutcome::BudgetExceeded, started, expanded);
            }
        }
        let g = g_score.get(&current).copied().unwrap_or(f32::INFINITY);

        if is_goal(current) {
            let mut path = vec![current];
            let mut node = current;
            while let Some(prev) = came_from.get(&node) {
                node = *prev;
                path.push(node);
            }
            path.reverse();
            return SearchResult {
                path,
                cost: g,
                outcome: SearchOutcome::Found,
                elapsed: started.elapsed(),
                expanded,
            };
        }

        expanded += 1;
        graph.for_each_edge(current, |next, cost| {
            if closed.contains(&next) {
                return;
            }
            let tentative = g + cost;
            let known = g_score.get(&next).copied().unwrap_or(f32::INFINITY);
            if tentative < known {
                came_from.insert(next, current);
                g_score.insert(next, tentative);
                seq += 1;
                open.push(OpenEntry {
                    f: tentative + heuristic(next),
                    seq,
                    node: next,
                });
            }
        });
    }

    SearchResult::failed(SearchOutcome::NoPath, started, expanded)
}

/// Uniform-cost search: A* with a zero heuristic.
pub fn dijkstra<G, F>(
    graph: &G,
    start: G::Node,
    is_goal: F,
    budget: Option<f32>,
) -> SearchResult<G::Node>
where
    G: SearchGraph,
    F: FnMut(G::Node) -> bool,
{
    astar(graph, start, is_goal, |_| 0.0, budget)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tiny adjacency-list graph over u32 nodes.
    struct Adjacency(HashMap<u32, Vec<(u32, f32)>>);

    impl Adjacency {
        fn new(edges: &[(u32, u32, f32)]) -> Self {
            let mut map: HashMap<u32, Vec<(u32, f32)>> = HashMap::new();
            for &(a, b, c) in edges {
                map.entry(a).or_default().push((b, c));
                map.entry(b).or_default();
            }
            Self(map)
        }
    }

    impl SearchGraph for Adjacency {
        type Node = u32;

        fn contains(&self, node: u32) -> bool {
            self.0.contains_key(&node)
        }

        fn for_each_edge(&self, node: u32, mut visit: impl FnMut(u32, f32)) {
            for &(to, cost) in self.0.get(&node).into_iter().flatten() {
                visit(to, cost);
            }
        }
    }

    #[test]
    fn test_prefers_cheaper_longer_route() {
        // 1 -> 2 -> 4 costs 2, 1 -> 3 -> 4 costs 10.
        let g = Adjacency::new(&[(1, 2, 1.0), (2, 4, 1.0), (1, 3, 1.0), (3, 4, 9.0)]);
        let r = dijkstra(&g, 1, |n| n == 4, None);
        assert!(r.is_found());
        assert_eq!(r.path, vec![1, 2, 4]);
        assert_eq!(r.cost, 2.0);
    }

    #[test]
    fn test_start_is_goal() {
        let g = Adjacency::new(&[(1, 2, 1.0)]);
        let r = dijkstra(&g, 1, |n| n == 1, None);
        assert_eq!(r.path, vec![1]);
        assert_eq!(r.cost, 0.0);
    }

    #[test]
    fn test_no_path_is_normal() {
        let g = Adjacency::new(&[(1, 2, 1.0), (3, 4, 1.0)]);
        let r = dijkstra(&g, 1, |n| n == 4, None);
        assert_eq!(r.outcome, SearchOutcome::NoPath);
        assert!(r.path.is_empty());
    }

    #[test]
    fn test_missing_start_is_invalid() {
        let g = Adjacency::new(&[(1, 2, 1.0)]);
        let r = dijkstra(&g, 99, |n| n == 2, None);
        assert_eq!(r.outcome, SearchOutcome::InvalidEndpoint);
    }

    #[test]
    fn test_budget_cuts_search_short() {
        let g = Adjacency::new(&[(1, 2, 5.0), (2, 3, 5.0)]);
        let r = dijkstra(&g, 1, |n| n == 3, Some(7.0));
        assert_eq!(r.outcome, SearchOutcome::BudgetExceeded);
        let r = dijkstra(&g, 1, |n| n == 3, Some(10.0));
        assert!(r.is_found());
    }

    #[test]
    fn test_empty_graph_fails_gracefully() {
        let g = Adjacency::new(&[]);
        let r = astar(&g, 0, |_| true, |_| 0.0, None);
        assert_eq!(r.outcome, SearchOutcome::InvalidEndpoint);
        assert!(r.path.is_empty());
    }
}
