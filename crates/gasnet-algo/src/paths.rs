//! Residual-network machinery for the graph-algorithmic formulations.
//!
//! One mutable residual state serves all three fallbacks: depth-first
//! augmenting paths for throughput (Ford–Fulkerson semantics, reverse arcs
//! cancel), Dijkstra cheapest paths for cost, and bounded simple-path
//! enumeration for balancing. Arc order is derived from id-sorted segment
//! iteration, so runs are deterministic.

use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use gasnet_core::Network;

const EPS: f64 = 1e-9;

/// A traversable direction of a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub segment_id: String,
    /// Point this arc leaves
    pub tail: String,
    /// Point this arc leads to
    pub head: String,
    /// True when traversing from -> to
    pub forward: bool,
    /// True when the underlying segment allows physical reverse flow
    pub bidirectional: bool,
    /// Shipping tariff of the underlying segment ($/MMscf)
    pub cost: f64,
}

/// Mutable residual view over a network's operational segments.
pub struct ResidualNetwork {
    /// Signed flow per segment id
    flows: BTreeMap<String, f64>,
    /// (lower, upper) flow bounds per segment id
    bounds: BTreeMap<String, (f64, f64)>,
    /// (capacity) per segment id, for utilization queries
    capacities: BTreeMap<String, f64>,
    adjacency: BTreeMap<String, Vec<Arc>>,
}

impl ResidualNetwork {
    /// Build the zero-flow residual state over operational segments.
    pub fn new(network: &Network) -> Self {
        let mut flows = BTreeMap::new();
        let mut bounds = BTreeMap::new();
        let mut capacities = BTreeMap::new();
        let mut adjacency: BTreeMap<String, Vec<Arc>> = BTreeMap::new();
        for segment in network.operational_segments() {
            flows.insert(segment.id.clone(), 0.0);
            bounds.insert(
                segment.id.clone(),
                (
                    segment.lower_flow_bound().value(),
                    segment.capacity.value(),
                ),
            );
            capacities.insert(segment.id.clone(), segment.capacity.value());
            adjacency
                .entry(segment.from_point_id.clone())
                .or_default()
                .push(Arc {
                    segment_id: segment.id.clone(),
                    tail: segment.from_point_id.clone(),
                    head: segment.to_point_id.clone(),
                    forward: true,
                    bidirectional: segment.is_bidirectional,
                    cost: segment.transportation_cost,
                });
            adjacency
                .entry(segment.to_point_id.clone())
                .or_default()
                .push(Arc {
                    segment_id: segment.id.clone(),
                    tail: segment.to_point_id.clone(),
                    head: segment.from_point_id.clone(),
                    forward: false,
                    bidirectional: segment.is_bidirectional,
                    cost: segment.transportation_cost,
                });
        }
        Self {
            flows,
            bounds,
            capacities,
            adjacency,
        }
    }

    /// Remaining capacity of an arc in its traversal direction.
    pub fn residual(&self, arc: &Arc) -> f64 {
        let flow = self.flows[&arc.segment_id];
        let (lower, upper) = self.bounds[&arc.segment_id];
        if arc.forward {
            upper - flow
        } else {
            flow - lower
        }
    }

    /// Push `amount` along a path of arcs.
    pub fn augment(&mut self, path: &[Arc], amount: f64) {
        for arc in path {
            let flow = self.flows.get_mut(&arc.segment_id).expect("known segment");
            if arc.forward {
                *flow += amount;
            } else {
                *flow -= amount;
            }
        }
    }

    /// Smallest residual along a path.
    pub fn bottleneck(&self, path: &[Arc]) -> f64 {
        path.iter()
            .map(|arc| self.residual(arc))
            .fold(f64::INFINITY, f64::min)
    }

    /// Highest utilization fraction along a path (|flow| / capacity).
    pub fn max_utilization(&self, path: &[Arc]) -> f64 {
        path.iter()
            .map(|arc| {
                let capacity = self.capacities[&arc.segment_id];
                if capacity <= 0.0 {
                    1.0
                } else {
                    self.flows[&arc.segment_id].abs() / capacity
                }
            })
            .fold(0.0, f64::max)
    }

    /// Signed flow assignment accumulated so far.
    pub fn flows(&self) -> &BTreeMap<String, f64> {
        &self.flows
    }

    /// Any simple path with positive residual, found depth-first.
    ///
    /// Residual (Ford–Fulkerson) semantics: reverse arcs cancel previously
    /// assigned flow, so the search can reroute around saturated segments.
    pub fn find_augmenting_path(&self, source: &str, sink: &str) -> Option<Vec<Arc>> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut path: Vec<Arc> = Vec::new();
        if self.dfs(source, sink, &mut visited, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn dfs(
        &self,
        node: &str,
        sink: &str,
        visited: &mut HashSet<String>,
        path: &mut Vec<Arc>,
    ) -> bool {
        if node == sink {
            return true;
        }
        if !visited.insert(node.to_string()) {
            return false;
        }
        if let Some(arcs) = self.adjacency.get(node) {
            for arc in arcs {
                if self.residual(arc) > EPS && !visited.contains(arc.head.as_str()) {
                    path.push(arc.clone());
                    if self.dfs(&arc.head, sink, visited, path) {
                        return true;
                    }
                    path.pop();
                }
            }
        }
        false
    }

    /// Cheapest physical path from any of `sources` to `sink` by
    /// transportation cost (Dijkstra). Reverse traversal is only allowed on
    /// bidirectional segments; cancellation arcs are not used here.
    pub fn cheapest_path(&self, sources: &[&str], sink: &str) -> Option<(f64, Vec<Arc>)> {
        #[derive(Debug)]
        struct State {
            cost: f64,
            node: String,
        }
        impl PartialEq for State {
            fn eq(&self, other: &Self) -> bool {
                self.cost == other.cost && self.node == other.node
            }
        }
        impl Eq for State {}
        impl Ord for State {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                // Reversed for a min-heap; node id breaks ties for
                // deterministic expansion order
                other
                    .cost
                    .total_cmp(&self.cost)
                    .then_with(|| other.node.cmp(&self.node))
            }
        }
        impl PartialOrd for State {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        let mut dist: HashMap<String, f64> = HashMap::new();
        let mut prev: HashMap<String, Arc> = HashMap::new();
        let mut heap = BinaryHeap::new();
        for &source in sources {
            dist.insert(source.to_string(), 0.0);
            heap.push(State {
                cost: 0.0,
                node: source.to_string(),
            });
        }

        while let Some(State { cost, node }) = heap.pop() {
            if cost > dist.get(&node).copied().unwrap_or(f64::INFINITY) + EPS {
                continue;
            }
            if node == sink {
                let mut path = Vec::new();
                let mut cursor = sink.to_string();
                while let Some(arc) = prev.get(&cursor).cloned() {
                    cursor = arc.tail.clone();
                    path.push(arc);
                }
                path.reverse();
                return Some((cost, path));
            }
            if let Some(arcs) = self.adjacency.get(&node) {
                for arc in arcs {
                    if !arc.forward && !arc.bidirectional {
                        continue;
                    }
                    if self.residual(arc) <= EPS {
                        continue;
                    }
                    let next_cost = cost + arc.cost;
                    let best = dist
                        .get(&arc.head)
                        .copied()
                        .unwrap_or(f64::INFINITY);
                    if next_cost < best - EPS {
                        dist.insert(arc.head.clone(), next_cost);
                        prev.insert(arc.head.clone(), arc.clone());
                        heap.push(State {
                            cost: next_cost,
                            node: arc.head.clone(),
                        });
                    }
                }
            }
        }
        None
    }

    /// All simple physical paths from `source` to `sink`, bounded by depth
    /// and count. Enumeration order follows the deterministic arc order.
    pub fn enumerate_paths(
        &self,
        source: &str,
        sink: &str,
        max_depth: usize,
        max_paths: usize,
    ) -> Vec<Vec<Arc>> {
        let mut paths = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut current: Vec<Arc> = Vec::new();
        self.enumerate(
            source,
            sink,
            max_depth,
            max_paths,
            &mut visited,
            &mut current,
            &mut paths,
        );
        paths
    }

    #[allow(clippy::too_many_arguments)]
    fn enumerate(
        &self,
        node: &str,
        sink: &str,
        max_depth: usize,
        max_paths: usize,
        visited: &mut HashSet<String>,
        current: &mut Vec<Arc>,
        paths: &mut Vec<Vec<Arc>>,
    ) {
        if paths.len() >= max_paths {
            return;
        }
        if node == sink {
            if !current.is_empty() {
                paths.push(current.clone());
            }
            return;
        }
        if current.len() >= max_depth || !visited.insert(node.to_string()) {
            return;
        }
        if let Some(arcs) = self.adjacency.get(node) {
            for arc in arcs {
                if !arc.forward && !arc.bidirectional {
                    continue;
                }
                if visited.contains(arc.head.as_str()) {
                    continue;
                }
                current.push(arc.clone());
                self.enumerate(
                    &arc.head, sink, max_depth, max_paths, visited, current, paths,
                );
                current.pop();
            }
        }
        visited.remove(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasnet_core::{Mmscfd, Point, Psi, Segment};

    fn diamond() -> Network {
        let mut network = Network::new("diamond");
        network.add_point(Point::receipt("R1", "R1", Mmscfd(1000.0), 1.0));
        network.add_point(Point::compressor("A", "A", Psi(100.0), 0.01));
        network.add_point(Point::compressor("B", "B", Psi(100.0), 0.01));
        network.add_point(Point::delivery("D1", "D1", Mmscfd(800.0)));
        network.add_segment(
            Segment::new("S1", "R1-A", "R1", "A", Mmscfd(500.0)).with_transportation_cost(0.10),
        );
        network.add_segment(
            Segment::new("S2", "R1-B", "R1", "B", Mmscfd(500.0)).with_transportation_cost(0.20),
        );
        network.add_segment(
            Segment::new("S3", "A-D1", "A", "D1", Mmscfd(400.0)).with_transportation_cost(0.05),
        );
        network.add_segment(
            Segment::new("S4", "B-D1", "B", "D1", Mmscfd(600.0)).with_transportation_cost(0.05),
        );
        network.finalize();
        network
    }

    #[test]
    fn test_augmenting_paths_reach_max_flow() {
        let network = diamond();
        let mut residual = ResidualNetwork::new(&network);
        let mut total = 0.0;
        while let Some(path) = residual.find_augmenting_path("R1", "D1") {
            let amount = residual.bottleneck(&path);
            assert!(amount > 0.0);
            residual.augment(&path, amount);
            total += amount;
        }
        // Max flow: min(500+500, 400+600) honoring the crossing = 400 + 500
        assert!((total - 900.0).abs() < 1e-9);
        assert!((residual.flows()["S3"] - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_cheapest_path_prefers_low_tariff() {
        let network = diamond();
        let residual = ResidualNetwork::new(&network);
        let (cost, path) = residual.cheapest_path(&["R1"], "D1").unwrap();
        // R1 -> A -> D1 at 0.10 + 0.05
        assert!((cost - 0.15).abs() < 1e-12);
        let segment_ids: Vec<&str> = path.iter().map(|a| a.segment_id.as_str()).collect();
        assert_eq!(segment_ids, vec!["S1", "S3"]);
    }

    #[test]
    fn test_cheapest_path_respects_saturation() {
        let network = diamond();
        let mut residual = ResidualNetwork::new(&network);
        // Saturate the cheap leg
        let (_, cheap) = residual.cheapest_path(&["R1"], "D1").unwrap();
        let amount = residual.bottleneck(&cheap);
        residual.augment(&cheap, amount);
        // Next cheapest goes via B
        let (cost, path) = residual.cheapest_path(&["R1"], "D1").unwrap();
        assert!((cost - 0.25).abs() < 1e-12);
        assert_eq!(path[0].segment_id, "S2");
    }

    #[test]
    fn test_enumerate_paths_finds_both() {
        let network = diamond();
        let residual = ResidualNetwork::new(&network);
        let paths = residual.enumerate_paths("R1", "D1", 10, 64);
        assert_eq!(paths.len(), 2);
        // Deterministic order by segment id: S1 route first
        assert_eq!(paths[0][0].segment_id, "S1");
        assert_eq!(paths[1][0].segment_id, "S2");
    }

    #[test]
    fn test_enumerate_respects_caps() {
        let network = diamond();
        let residual = ResidualNetwork::new(&network);
        assert_eq!(residual.enumerate_paths("R1", "D1", 1, 64).len(), 0);
        assert_eq!(residual.enumerate_paths("R1", "D1", 10, 1).len(), 1);
    }

    #[test]
    fn test_reverse_arc_only_on_bidirectional() {
        let mut network = Network::new("line");
        network.add_point(Point::receipt("R1", "R1", Mmscfd(100.0), 1.0));
        network.add_point(Point::delivery("D1", "D1", Mmscfd(50.0)));
        network.add_segment(Segment::new("S1", "D1-R1", "D1", "R1", Mmscfd(100.0)));
        network.finalize();
        let residual = ResidualNetwork::new(&network);
        // Directed the wrong way: no physical path
        assert!(residual.cheapest_path(&["R1"], "D1").is_none());
        assert!(residual.enumerate_paths("R1", "D1", 10, 10).is_empty());

        let mut network = Network::new("line-bidi");
        network.add_point(Point::receipt("R1", "R1", Mmscfd(100.0), 1.0));
        network.add_point(Point::delivery("D1", "D1", Mmscfd(50.0)));
        network.add_segment(
            Segment::new("S1", "D1-R1", "D1", "R1", Mmscfd(100.0)).bidirectional(),
        );
        network.finalize();
        let mut residual = ResidualNetwork::new(&network);
        let (_, path) = residual.cheapest_path(&["R1"], "D1").unwrap();
        assert!(!path[0].forward);
        residual.augment(&path, 50.0);
        // Reverse traversal shows up as negative signed flow
        assert!((residual.flows()["S1"] + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_utilization() {
        let network = diamond();
        let mut residual = ResidualNetwork::new(&network);
        let path = residual.enumerate_paths("R1", "D1", 10, 64).remove(0);
        residual.augment(&path, 200.0);
        // S3 is the tighter segment: 200/400
        assert!((residual.max_utilization(&path) - 0.5).abs() < 1e-12);
    }
}
