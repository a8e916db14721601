//! Post-solution validation.
//!
//! The solver (or graph heuristic) claims a flow assignment; this module
//! re-checks it against the physical constraints independently: conservation
//! at every active point, capacity on every operational segment, and the
//! pressure relations when they were part of the run. Violations do not
//! overwrite the solver status; they are attached to the result so
//! downstream consumers can refuse to trust it.

use gasnet_core::{Network, PointKind};

use crate::pressure;
use crate::result::OptimizationResult;
use crate::settings::OptimizationSettings;

/// Worst-case violation magnitudes found by a validation pass.
#[derive(Debug, Clone, Default)]
pub struct ViolationMetrics {
    /// Largest conservation imbalance over points (MMscfd)
    pub max_conservation_violation: f64,
    /// Largest capacity excess over segments (MMscfd)
    pub max_capacity_violation: f64,
    /// Largest pressure-window excursion over points (psia)
    pub max_pressure_violation: f64,
}

impl ViolationMetrics {
    /// True when every violation is within `eps`
    pub fn within_tolerance(&self, eps: f64) -> bool {
        self.max_conservation_violation <= eps
            && self.max_capacity_violation <= eps
            && self.max_pressure_violation <= eps
    }
}

/// Validate a result against the network it was computed for.
///
/// Returns the violation strings to attach to the result, plus the worst
/// magnitudes for reporting.
pub fn validate_solution(
    network: &Network,
    result: &OptimizationResult,
    settings: &OptimizationSettings,
) -> (Vec<String>, ViolationMetrics) {
    let mut violations = Vec::new();
    let mut metrics = ViolationMetrics::default();
    if !result.status.has_solution() {
        return (violations, metrics);
    }
    let eps = settings.feasibility_tolerance;
    // The reporting threshold zeroes small flows, so conservation can be off
    // by one threshold per incident segment
    let conservation_slack = eps + settings.minimum_flow_threshold * 4.0;

    for point in network.active_points() {
        let mut net = 0.0;
        for segment in network.incoming(&point.id) {
            net += result.flow(&segment.id);
        }
        for segment in network.outgoing(&point.id) {
            net -= result.flow(&segment.id);
        }
        let imbalance = match &point.kind {
            // net inflow must lie in [-supply, 0]
            PointKind::Receipt {
                supply_capacity, ..
            } => {
                let supply = supply_capacity.value();
                (net - 0.0).max(-supply - net).max(0.0)
            }
            // net inflow must lie in [0, demand]
            PointKind::Delivery { demand_requirement } => {
                let demand = demand_requirement.value();
                (-net).max(net - demand).max(0.0)
            }
            PointKind::Compressor { .. } => net.abs(),
        };
        if imbalance > conservation_slack {
            violations.push(format!(
                "point {}: flow conservation violated by {:.6} MMscfd",
                point.id, imbalance
            ));
        }
        metrics.max_conservation_violation = metrics.max_conservation_violation.max(imbalance);
    }

    for segment in network.operational_segments() {
        let flow = result.flow(&segment.id);
        let excess = (flow - segment.capacity.value())
            .max(segment.lower_flow_bound().value() - flow)
            .max(0.0);
        if excess > eps {
            violations.push(format!(
                "segment {}: flow {:.4} MMscfd outside [{:.4}, {:.4}]",
                segment.id,
                flow,
                segment.lower_flow_bound().value(),
                segment.capacity.value()
            ));
        }
        metrics.max_capacity_violation = metrics.max_capacity_violation.max(excess);
    }

    if settings.enable_pressure_constraints {
        let flows = result
            .segment_flows
            .iter()
            .map(|(id, record)| (id.clone(), record.flow))
            .collect();
        let pressure_violations =
            pressure::validate_pressures(network, &flows, &result.point_pressures, eps);
        for point in network.active_points() {
            if let Some(record) = result.point_pressures.get(&point.id) {
                let excursion = (point.min_pressure.value() - record.pressure)
                    .max(record.pressure - point.max_pressure.value())
                    .max(0.0);
                metrics.max_pressure_violation = metrics.max_pressure_violation.max(excursion);
            }
        }
        violations.extend(pressure_violations);
    }

    (violations, metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{SegmentFlowRecord, Status};
    use gasnet_core::{Mmscfd, Point, Segment};

    fn chain_network() -> Network {
        let mut network = Network::new("chain");
        network.add_point(Point::receipt("R1", "R1", Mmscfd(1000.0), 1.0));
        network.add_point(Point::delivery("D1", "D1", Mmscfd(600.0)));
        network.add_segment(Segment::new("S1", "R1-D1", "R1", "D1", Mmscfd(800.0)));
        network.finalize();
        network
    }

    fn result_with_flow(flow: f64) -> OptimizationResult {
        let mut result = OptimizationResult::new("test", "simplex");
        result.status = Status::Optimal;
        result.segment_flows.insert(
            "S1".to_string(),
            SegmentFlowRecord {
                flow,
                capacity: 800.0,
                transportation_cost: 0.0,
                utilization_pct: flow / 8.0,
            },
        );
        result
    }

    #[test]
    fn test_clean_solution_passes() {
        let (violations, metrics) = validate_solution(
            &chain_network(),
            &result_with_flow(600.0),
            &OptimizationSettings::default(),
        );
        assert!(violations.is_empty(), "{violations:?}");
        assert!(metrics.within_tolerance(1e-6));
    }

    #[test]
    fn test_capacity_violation_detected() {
        let (violations, metrics) = validate_solution(
            &chain_network(),
            &result_with_flow(900.0),
            &OptimizationSettings::default(),
        );
        assert!(violations.iter().any(|v| v.contains("segment S1")));
        assert!((metrics.max_capacity_violation - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_overdelivery_detected() {
        // 700 into a 600-demand delivery violates its conservation window
        let (violations, _) = validate_solution(
            &chain_network(),
            &result_with_flow(700.0),
            &OptimizationSettings::default(),
        );
        assert!(violations.iter().any(|v| v.contains("point D1")));
    }

    #[test]
    fn test_unsolved_results_skip_validation() {
        let mut result = result_with_flow(900.0);
        result.status = Status::Infeasible;
        let (violations, _) = validate_solution(
            &chain_network(),
            &result,
            &OptimizationSettings::default(),
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn test_compressor_imbalance_detected() {
        let mut network = chain_network();
        network.add_point(Point::compressor("C1", "C1", gasnet_core::Psi(100.0), 0.01));
        network.add_segment(Segment::new("S2", "D1-C1", "D1", "C1", Mmscfd(100.0)));
        network.finalize();

        let mut result = result_with_flow(600.0);
        result.segment_flows.insert(
            "S2".to_string(),
            SegmentFlowRecord {
                flow: 50.0,
                capacity: 100.0,
                transportation_cost: 0.0,
                utilization_pct: 50.0,
            },
        );
        // 50 MMscfd enters C1 and nothing leaves
        let (violations, metrics) = validate_solution(
            &network,
            &result,
            &OptimizationSettings::default(),
        );
        assert!(violations.iter().any(|v| v.contains("point C1")));
        assert!(metrics.max_conservation_violation >= 50.0);
    }
}
