use crate::Network;
use anyhow::{anyhow, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Summary statistics for `graph stats` (degree distribution, weak components).
#[derive(Debug)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub weakly_connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub density: f64,
}

/// Island summary used in island reporting.
#[derive(Debug)]
pub struct IslandSummary {
    pub island_id: usize,
    pub point_count: usize,
    pub point_ids: Vec<String>,
}

/// Directed petgraph view of the active network.
///
/// Node weights are point ids, edge weights segment ids. Built on demand;
/// the `Network` maps stay the owning representation.
pub struct NetworkGraph {
    pub graph: DiGraph<String, String>,
    pub node_of: HashMap<String, NodeIndex>,
}

/// Build the directed graph view over active points and segments.
pub fn build_graph(network: &Network) -> NetworkGraph {
    let mut graph = DiGraph::new();
    let mut node_of = HashMap::new();
    for point in network.active_points() {
        let idx = graph.add_node(point.id.clone());
        node_of.insert(point.id.clone(), idx);
    }
    for segment in network.active_segments() {
        let (Some(&from), Some(&to)) = (
            node_of.get(&segment.from_point_id),
            node_of.get(&segment.to_point_id),
        ) else {
            continue; // endpoint inactive or missing; validation reports it
        };
        graph.add_edge(from, to, segment.id.clone());
        if segment.is_bidirectional {
            graph.add_edge(to, from, segment.id.clone());
        }
    }
    NetworkGraph { graph, node_of }
}

/// Calculates graph-level statistics such as density, degree distribution,
/// and weak component counts.
pub fn graph_stats(network: &Network) -> GraphStats {
    let view = build_graph(network);
    let node_count = view.graph.node_count();
    let edge_count = view.graph.edge_count();
    let mut degrees = Vec::with_capacity(node_count);
    for node in view.graph.node_indices() {
        let degree = view.graph.neighbors_undirected(node).count();
        degrees.push(degree);
    }
    let min_degree = *degrees.iter().min().unwrap_or(&0);
    let max_degree = *degrees.iter().max().unwrap_or(&0);
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().copied().sum::<usize>() as f64 / node_count as f64
    };
    let density = if node_count < 2 {
        0.0
    } else {
        edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };
    GraphStats {
        node_count,
        edge_count,
        weakly_connected_components: petgraph::algo::connected_components(&view.graph),
        min_degree,
        avg_degree,
        max_degree,
        density,
    }
}

/// Labels weakly connected components (breadth-first search) so disconnected
/// sub-systems show up in validation reports.
pub fn find_islands(network: &Network) -> Vec<IslandSummary> {
    let view = build_graph(network);
    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    let mut island_id = 0;
    for start in view.graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(view.graph[node].clone());
            for neighbor in view.graph.neighbors_undirected(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        if members.is_empty() {
            continue;
        }
        members.sort();
        islands.push(IslandSummary {
            island_id,
            point_count: members.len(),
            point_ids: members,
        });
        island_id += 1;
    }
    islands
}

/// Ids of active deliveries that no active receipt can reach along directed
/// segments. These are guaranteed-infeasible demand under any objective that
/// mandates satisfaction.
pub fn unreachable_deliveries(network: &Network) -> Vec<String> {
    let view = build_graph(network);
    let mut reached: HashSet<NodeIndex> = HashSet::new();
    let mut queue: VecDeque<NodeIndex> = network
        .active_receipts()
        .filter_map(|p| view.node_of.get(&p.id).copied())
        .collect();
    for &start in &queue {
        reached.insert(start);
    }
    while let Some(node) = queue.pop_front() {
        for neighbor in view.graph.neighbors_directed(node, Direction::Outgoing) {
            if reached.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    network
        .active_deliveries()
        .filter(|p| {
            view.node_of
                .get(&p.id)
                .map(|idx| !reached.contains(idx))
                .unwrap_or(true)
        })
        .map(|p| p.id.clone())
        .collect()
}

/// Classify trunk segments: receipt-adjacent segments plus any segment whose
/// capacity reaches `capacity_ratio` of the largest active capacity.
///
/// Trunks are the roots used for upstream flow distribution and the first
/// candidates for debottlenecking studies.
pub fn trunk_segments(network: &Network, capacity_ratio: f64) -> Vec<String> {
    let max_capacity = network
        .active_segments()
        .map(|s| s.capacity.value())
        .fold(0.0_f64, f64::max);
    if max_capacity <= 0.0 {
        return Vec::new();
    }
    let threshold = max_capacity * capacity_ratio.clamp(0.0, 1.0);
    network
        .active_segments()
        .filter(|s| {
            let receipt_adjacent = network
                .point(&s.from_point_id)
                .map(|p| p.is_receipt())
                .unwrap_or(false);
            receipt_adjacent || s.capacity.value() >= threshold
        })
        .map(|s| s.id.clone())
        .collect()
}

/// Export the topology to a DOT string (Graphviz) so external tools can
/// visualize the layout.
pub fn export_graph(network: &Network, format: &str) -> Result<String> {
    match format.to_ascii_lowercase().as_str() {
        "graphviz" | "dot" => Ok(render_dot(network)),
        other => Err(anyhow!("unsupported graph export format '{other}'")),
    }
}

fn render_dot(network: &Network) -> String {
    let view = build_graph(network);
    let mut buffer = String::new();
    buffer.push_str("digraph gasnet {\n");
    for node in view.graph.node_indices() {
        let label = sanitize_label(&view.graph[node]);
        buffer.push_str(&format!("  n{} [label=\"{}\"];\n", node.index(), label));
    }
    for edge in view.graph.edge_references() {
        buffer.push_str(&format!(
            "  n{} -> n{} [label=\"{}\"];\n",
            edge.source().index(),
            edge.target().index(),
            sanitize_label(edge.weight()),
        ));
    }
    buffer.push('}');
    buffer
}

fn sanitize_label(label: &str) -> String {
    label.replace('"', "\\\"")
}
