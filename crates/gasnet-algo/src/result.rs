//! Optimization result types and metric aggregation.
//!
//! Every algorithm, solver-backed or graph-backed, produces the same
//! [`OptimizationResult`]. The engine attaches post-solution validation
//! findings without overwriting the solver status; consumers must treat a
//! result with a non-empty `validation_errors` list as untrustworthy.

use std::collections::BTreeMap;

use gasnet_core::solver::SolveStatus;
use gasnet_core::{Mmscfd, Network};
use serde::{Deserialize, Serialize};

use crate::settings::OptimizationSettings;

/// Terminal status of an optimization run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    NotSolved,
    Optimal,
    Feasible,
    Infeasible,
    Unbounded,
    Error,
}

impl Status {
    /// True for statuses that carry a usable flow assignment
    pub fn has_solution(self) -> bool {
        matches!(self, Status::Optimal | Status::Feasible)
    }
}

impl From<SolveStatus> for Status {
    fn from(status: SolveStatus) -> Self {
        match status {
            SolveStatus::NotSolved => Status::NotSolved,
            SolveStatus::Optimal => Status::Optimal,
            SolveStatus::Feasible => Status::Feasible,
            SolveStatus::Infeasible => Status::Infeasible,
            SolveStatus::Unbounded => Status::Unbounded,
            SolveStatus::Error => Status::Error,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Status::NotSolved => "NotSolved",
            Status::Optimal => "Optimal",
            Status::Feasible => "Feasible",
            Status::Infeasible => "Infeasible",
            Status::Unbounded => "Unbounded",
            Status::Error => "Error",
        };
        f.write_str(label)
    }
}

/// Per-segment flow record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentFlowRecord {
    /// Assigned flow (MMscfd); negative on reversed bidirectional segments
    pub flow: f64,
    /// Segment capacity (MMscfd)
    pub capacity: f64,
    /// Shipping tariff ($/MMscf)
    pub transportation_cost: f64,
    /// `|flow| / capacity * 100`
    pub utilization_pct: f64,
}

/// Per-point pressure record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointPressureRecord {
    /// Pressure (psia), `sqrt` of the squared variable clamped at zero
    pub pressure: f64,
    /// The squared decision variable
    pub pressure_squared: f64,
    /// Whether the pressure lies within the point's window (± tolerance)
    pub within_constraints: bool,
    /// Compressor boost (psi); zero for non-compressors
    pub boost: f64,
    /// Compressor fuel burn (MMscf/d); zero for non-compressors
    pub fuel_consumption: f64,
}

/// Cost breakdown; `total` is the sum of the four components
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub transportation: f64,
    pub fuel: f64,
    pub compressor: f64,
    pub other: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.transportation + self.fuel + self.compressor + self.other
    }
}

/// Aggregate metrics over a flow assignment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMetrics {
    /// Sum of positive segment flows out of receipt points (MMscfd)
    pub total_throughput: f64,
    /// Net outflow over receipts (MMscfd)
    pub supply_used: f64,
    /// Net inflow over deliveries (MMscfd)
    pub demand_satisfied: f64,
    /// Total demand requirement (MMscfd)
    pub demand_required: f64,
    /// Mean utilization over populated segments (%)
    pub avg_utilization_pct: f64,
    /// Highest utilization over populated segments (%)
    pub peak_utilization_pct: f64,
    /// Population variance of utilization over populated segments
    pub utilization_variance: f64,
    /// Segments carrying flow above the reporting threshold
    pub active_segment_count: usize,
    /// Compressor stations with non-zero boost or fuel
    pub active_compressor_count: usize,
}

/// The uniform result object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub status: Status,
    pub objective_value: f64,
    /// Algorithm identifier ("maximize-throughput", ...)
    pub algorithm: String,
    /// Back-end identifier ("simplex", "clarabel", "graph")
    pub solver: String,
    pub elapsed_ms: u128,
    /// Per-segment flows keyed by segment id
    pub segment_flows: BTreeMap<String, SegmentFlowRecord>,
    /// Per-point pressures keyed by point id
    pub point_pressures: BTreeMap<String, PointPressureRecord>,
    pub costs: CostBreakdown,
    pub metrics: NetworkMetrics,
    /// Human-readable log of the run
    pub messages: Vec<String>,
    /// Post-solution violations; non-empty means the solution is untrustworthy
    pub validation_errors: Vec<String>,
}

impl OptimizationResult {
    /// A result shell for the given algorithm
    pub fn new(algorithm: &str, solver: &str) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            solver: solver.to_string(),
            ..Self::default()
        }
    }

    /// An `Error`-status result carrying one or more messages
    pub fn failure(algorithm: &str, messages: Vec<String>) -> Self {
        Self {
            status: Status::Error,
            algorithm: algorithm.to_string(),
            messages,
            ..Self::default()
        }
    }

    /// True when the status carries a solution and validation found nothing
    pub fn is_trustworthy(&self) -> bool {
        self.status.has_solution() && self.validation_errors.is_empty()
    }

    /// Append a log message
    pub fn log(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Signed flow on a segment, zero when absent
    pub fn flow(&self, segment_id: &str) -> f64 {
        self.segment_flows
            .get(segment_id)
            .map(|r| r.flow)
            .unwrap_or(0.0)
    }
}

/// Build segment records from raw flows, zeroing flows below the reporting
/// threshold.
pub fn build_segment_records(
    network: &Network,
    flows: &BTreeMap<String, f64>,
    settings: &OptimizationSettings,
) -> BTreeMap<String, SegmentFlowRecord> {
    let mut records = BTreeMap::new();
    for segment in network.operational_segments() {
        let raw = flows.get(&segment.id).copied().unwrap_or(0.0);
        let flow = if raw.abs() < settings.minimum_flow_threshold {
            0.0
        } else {
            raw
        };
        records.insert(
            segment.id.clone(),
            SegmentFlowRecord {
                flow,
                capacity: segment.capacity.value(),
                transportation_cost: segment.transportation_cost,
                utilization_pct: segment.utilization_pct(Mmscfd(flow)),
            },
        );
    }
    records
}

/// Aggregate metrics from segment records.
pub fn aggregate_metrics(
    network: &Network,
    records: &BTreeMap<String, SegmentFlowRecord>,
    pressures: &BTreeMap<String, PointPressureRecord>,
) -> NetworkMetrics {
    let mut metrics = NetworkMetrics {
        demand_required: network.total_demand().value(),
        ..NetworkMetrics::default()
    };

    let net_at = |point_id: &str, incoming: bool| -> f64 {
        let mut net = 0.0;
        for segment in network.operational_segments() {
            let flow = records.get(&segment.id).map(|r| r.flow).unwrap_or(0.0);
            if segment.to_point_id == point_id {
                net += flow;
            }
            if segment.from_point_id == point_id {
                net -= flow;
            }
        }
        if incoming {
            net
        } else {
            -net
        }
    };

    for receipt in network.active_receipts() {
        metrics.supply_used += net_at(&receipt.id, false);
        // Throughput counts positive flow leaving the receipt
        for segment in network.outgoing(&receipt.id) {
            let flow = records.get(&segment.id).map(|r| r.flow).unwrap_or(0.0);
            if flow > 0.0 {
                metrics.total_throughput += flow;
            }
        }
        // Reverse flow into a receipt along an incoming bidirectional segment
        // also counts as injection
        for segment in network.incoming(&receipt.id) {
            let flow = records.get(&segment.id).map(|r| r.flow).unwrap_or(0.0);
            if flow < 0.0 {
                metrics.total_throughput += -flow;
            }
        }
    }
    for delivery in network.active_deliveries() {
        metrics.demand_satisfied += net_at(&delivery.id, true);
    }

    let utilizations: Vec<f64> = records
        .values()
        .filter(|r| r.flow != 0.0)
        .map(|r| r.utilization_pct)
        .collect();
    metrics.active_segment_count = utilizations.len();
    if !utilizations.is_empty() {
        let n = utilizations.len() as f64;
        let mean = utilizations.iter().sum::<f64>() / n;
        metrics.avg_utilization_pct = mean;
        metrics.peak_utilization_pct = utilizations.iter().copied().fold(0.0, f64::max);
        metrics.utilization_variance =
            utilizations.iter().map(|u| (u - mean).powi(2)).sum::<f64>() / n;
    }

    metrics.active_compressor_count = pressures
        .iter()
        .filter(|(id, record)| {
            network
                .point(id)
                .map(|p| p.is_compressor())
                .unwrap_or(false)
                && (record.boost > 0.0 || record.fuel_consumption > 0.0)
        })
        .count();

    metrics
}

/// Transportation component of the cost breakdown from segment records.
pub fn transportation_cost(records: &BTreeMap<String, SegmentFlowRecord>) -> f64 {
    records
        .values()
        .map(|r| r.transportation_cost * r.flow.abs())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasnet_core::{Miles, Inches, Point, Psi, Psia, Segment};

    fn fork_network() -> Network {
        let mut network = Network::new("fork");
        network.add_point(
            Point::receipt("R1", "R1", Mmscfd(1000.0), 2.0)
                .with_pressure_window(Psia(800.0), Psia(1000.0)),
        );
        network.add_point(Point::compressor("C1", "C1", Psi(400.0), 0.02));
        network.add_point(Point::delivery("D1", "D1", Mmscfd(600.0)));
        network.add_point(Point::delivery("D2", "D2", Mmscfd(400.0)));
        network.add_segment(
            Segment::new("S1", "R1-C1", "R1", "C1", Mmscfd(1000.0))
                .with_profile(Miles(50.0), Inches(36.0), 0.015)
                .with_transportation_cost(0.10),
        );
        network.add_segment(
            Segment::new("S2", "C1-D1", "C1", "D1", Mmscfd(600.0))
                .with_transportation_cost(0.12),
        );
        network.add_segment(
            Segment::new("S3", "C1-D2", "C1", "D2", Mmscfd(500.0))
                .with_transportation_cost(0.15),
        );
        network.finalize();
        network
    }

    fn full_flows() -> BTreeMap<String, f64> {
        [
            ("S1".to_string(), 1000.0),
            ("S2".to_string(), 600.0),
            ("S3".to_string(), 400.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_segment_records_threshold() {
        let network = fork_network();
        let mut flows = full_flows();
        flows.insert("S3".to_string(), 0.004);
        let records =
            build_segment_records(&network, &flows, &OptimizationSettings::default());
        assert_eq!(records["S3"].flow, 0.0);
        assert_eq!(records["S1"].flow, 1000.0);
        assert!((records["S2"].utilization_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_metric_aggregation() {
        let network = fork_network();
        let records =
            build_segment_records(&network, &full_flows(), &OptimizationSettings::default());
        let metrics = aggregate_metrics(&network, &records, &BTreeMap::new());
        assert!((metrics.total_throughput - 1000.0).abs() < 1e-9);
        assert!((metrics.supply_used - 1000.0).abs() < 1e-9);
        assert!((metrics.demand_satisfied - 1000.0).abs() < 1e-9);
        assert!((metrics.demand_required - 1000.0).abs() < 1e-9);
        assert_eq!(metrics.active_segment_count, 3);
        // Utilizations: 100, 100, 80
        assert!((metrics.peak_utilization_pct - 100.0).abs() < 1e-9);
        assert!((metrics.avg_utilization_pct - 280.0 / 3.0).abs() < 1e-9);
        assert!(metrics.utilization_variance > 0.0);
    }

    #[test]
    fn test_transportation_cost() {
        let network = fork_network();
        let records =
            build_segment_records(&network, &full_flows(), &OptimizationSettings::default());
        let cost = transportation_cost(&records);
        assert!((cost - 232.0).abs() < 1e-9);
    }

    #[test]
    fn test_cost_breakdown_total() {
        let costs = CostBreakdown {
            transportation: 232.0,
            fuel: 30.0,
            compressor: 0.4,
            other: 0.0,
        };
        assert!((costs.total() - 262.4).abs() < 1e-12);
    }

    #[test]
    fn test_result_serialization_shape() {
        let mut result = OptimizationResult::new("maximize-throughput", "simplex");
        result.status = Status::Optimal;
        result.segment_flows.insert(
            "S1".to_string(),
            SegmentFlowRecord {
                flow: 10.0,
                capacity: 20.0,
                transportation_cost: 0.1,
                utilization_pct: 50.0,
            },
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "Optimal");
        assert_eq!(json["algorithm"], "maximize-throughput");
        assert_eq!(json["segmentFlows"]["S1"]["utilizationPct"], 50.0);
        assert!(json["validationErrors"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_result_deserializes_back() {
        let mut result = OptimizationResult::new("minimize-cost", "simplex");
        result.status = Status::Feasible;
        result.objective_value = 232.0;
        result.elapsed_ms = 12;
        result.segment_flows.insert(
            "S1".to_string(),
            SegmentFlowRecord {
                flow: 600.0,
                capacity: 800.0,
                transportation_cost: 0.1,
                utilization_pct: 75.0,
            },
        );
        let json = serde_json::to_string(&result).unwrap();
        let back: OptimizationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, Status::Feasible);
        assert_eq!(back.objective_value, 232.0);
        assert_eq!(back.elapsed_ms, 12);
        assert_eq!(back.segment_flows["S1"].flow, 600.0);
    }

    #[test]
    fn test_trustworthiness() {
        let mut result = OptimizationResult::new("minimize-cost", "simplex");
        result.status = Status::Optimal;
        assert!(result.is_trustworthy());
        result
            .validation_errors
            .push("segment S1 exceeds capacity".into());
        assert!(!result.is_trustworthy());
    }
}
