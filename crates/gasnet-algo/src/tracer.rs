//! Upstream flow tracer.
//!
//! A fast pre-flight feasibility check independent of any optimizer: walk
//! backwards from every active delivery, accumulating the segment flow that
//! would be required to serve its demand. Where a point has several incoming
//! segments the requirement splits proportionally to their capacities.
//! Cycles are cut by a visited set scoped to the recursion path.

use std::collections::{BTreeMap, HashSet};

use gasnet_core::Network;
use serde::Serialize;

/// Tracer output: required flow per segment and a feasibility verdict.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceReport {
    /// Required flow per segment id (MMscfd)
    pub segment_required_flows: BTreeMap<String, f64>,
    /// One message per segment whose requirement exceeds its capacity
    pub capacity_violations: Vec<String>,
    /// True when no segment requirement exceeds capacity
    pub is_network_feasible: bool,
}

const CAPACITY_EPS: f64 = 1e-6;

/// Trace demand upstream from every active delivery.
pub fn trace_upstream(network: &Network) -> TraceReport {
    let mut required: BTreeMap<String, f64> = BTreeMap::new();

    for delivery in network.active_deliveries() {
        let demand = delivery
            .demand_requirement()
            .map(|d| d.value())
            .unwrap_or(0.0);
        if demand <= 0.0 {
            continue;
        }
        let mut on_path = HashSet::new();
        propagate(network, &delivery.id, demand, &mut required, &mut on_path);
    }

    let mut violations = Vec::new();
    for (segment_id, &flow) in &required {
        if let Some(segment) = network.segment(segment_id) {
            if flow > segment.capacity.value() + CAPACITY_EPS {
                violations.push(format!(
                    "segment {}: required {:.2} MMscfd exceeds capacity {:.2} MMscfd",
                    segment_id,
                    flow,
                    segment.capacity.value()
                ));
            }
        }
    }

    TraceReport {
        is_network_feasible: violations.is_empty(),
        capacity_violations: violations,
        segment_required_flows: required,
    }
}

fn propagate(
    network: &Network,
    point_id: &str,
    requirement: f64,
    required: &mut BTreeMap<String, f64>,
    on_path: &mut HashSet<String>,
) {
    if requirement <= 0.0 || !on_path.insert(point_id.to_string()) {
        return;
    }

    let incoming = network.incoming(point_id);
    let total_capacity: f64 = incoming.iter().map(|s| s.capacity.value()).sum();
    if total_capacity > 0.0 {
        for segment in incoming {
            let share = requirement * segment.capacity.value() / total_capacity;
            *required.entry(segment.id.clone()).or_insert(0.0) += share;
            // Receipts inject; everything else passes the requirement through
            let upstream_is_receipt = network
                .point(&segment.from_point_id)
                .map(|p| p.is_receipt())
                .unwrap_or(false);
            if !upstream_is_receipt {
                propagate(network, &segment.from_point_id, share, required, on_path);
            }
        }
    }

    on_path.remove(point_id);
}
