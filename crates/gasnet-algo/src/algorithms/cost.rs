//! Minimize total operating cost at full demand satisfaction.
//!
//! Solver strategy: LP with explicit per-segment transportation cost
//! variables, per-compressor fuel and boost cost variables, and a linked
//! `total_cost` objective variable; delivery conservation rows are
//! equalities. Graph strategy: successive cheapest (Dijkstra) paths from the
//! receipt pool to each delivery in descending demand order.

use std::collections::BTreeMap;
use std::time::Instant;

use gasnet_core::Network;
use tracing::info;

use crate::algorithms::{
    assemble_result, collect_lp_parts, resolve_strategy, OptimizationAlgorithm, SolutionParts,
    Strategy,
};
use crate::model::{build_flow_model, DemandPolicy};
use crate::paths::ResidualNetwork;
use crate::result::{OptimizationResult, Status};
use crate::settings::OptimizationSettings;
use crate::EngineError;

const RESIDUAL_THRESHOLD: f64 = 0.01;

pub struct MinimizeCost;

impl OptimizationAlgorithm for MinimizeCost {
    fn name(&self) -> &'static str {
        "minimize-cost"
    }

    fn description(&self) -> &'static str {
        "Serve all demand at minimum transportation, fuel, and compression cost"
    }

    fn parameters(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("strategy", "'solver' or 'graph' (default: solver with fallback)"),
            ("cost.fuel_price", "price of fuel gas, $/MMscf (default 3.0)"),
            (
                "cost.compressor_per_psi",
                "cost per psi of boost, $ (default 0.001)",
            ),
        ])
    }

    fn can_handle(&self, network: &Network, _settings: &OptimizationSettings) -> bool {
        network.segments().any(|s| s.is_active)
            && network.active_deliveries().count() >= 1
            && network.segments().all(|s| s.transportation_cost >= 0.0)
    }

    fn optimize(
        &self,
        network: &Network,
        settings: &OptimizationSettings,
    ) -> Result<OptimizationResult, EngineError> {
        let started = Instant::now();
        let (strategy, note) = resolve_strategy(settings)?;
        match strategy {
            Strategy::Solver(kind) => {
                let mut backend = kind.build_backend();
                let model = build_flow_model(
                    backend.as_mut(),
                    network,
                    settings,
                    DemandPolicy::ExactDemand,
                )?;

                let fuel_price = settings.param_f64("cost.fuel_price", 3.0);
                let compressor_per_psi =
                    settings.param_f64("cost.compressor_per_psi", 0.001);

                // tc_e >= cost_e * |f_e|, settled downward by minimization
                let mut cost_vars = Vec::new();
                for segment in network.operational_segments() {
                    let flow_var = model.flow_vars[&segment.id];
                    let tariff = segment.transportation_cost;
                    let tc = backend.make_num_var(
                        0.0,
                        f64::INFINITY,
                        &format!("tc[{}]", segment.id),
                    );
                    let above = backend.make_constraint(
                        0.0,
                        f64::INFINITY,
                        &format!("tc_pos[{}]", segment.id),
                    );
                    backend.set_coefficient(above, tc, 1.0);
                    backend.set_coefficient(above, flow_var, -tariff);
                    let below = backend.make_constraint(
                        0.0,
                        f64::INFINITY,
                        &format!("tc_neg[{}]", segment.id),
                    );
                    backend.set_coefficient(below, tc, 1.0);
                    backend.set_coefficient(below, flow_var, tariff);
                    cost_vars.push(tc);
                }

                // fc_c = fuel_price * fuel, cc_c = price_per_psi * boost
                if let Some(compressors) = &model.compressors {
                    for (station_id, &fuel_var) in &compressors.fuel {
                        let fc = backend.make_num_var(
                            0.0,
                            f64::INFINITY,
                            &format!("fc[{station_id}]"),
                        );
                        let link =
                            backend.make_constraint(0.0, 0.0, &format!("fc_link[{station_id}]"));
                        backend.set_coefficient(link, fc, 1.0);
                        backend.set_coefficient(link, fuel_var, -fuel_price);
                        cost_vars.push(fc);
                    }
                    for (station_id, &boost_var) in &compressors.boost {
                        let cc = backend.make_num_var(
                            0.0,
                            f64::INFINITY,
                            &format!("cc[{station_id}]"),
                        );
                        let link =
                            backend.make_constraint(0.0, 0.0, &format!("cc_link[{station_id}]"));
                        backend.set_coefficient(link, cc, 1.0);
                        backend.set_coefficient(link, boost_var, -compressor_per_psi);
                        cost_vars.push(cc);
                    }
                }

                // total_cost = sum of the component cost variables
                let total_cost =
                    backend.make_num_var(0.0, f64::INFINITY, "total_cost");
                let total_link = backend.make_constraint(0.0, 0.0, "total_cost_link");
                backend.set_coefficient(total_link, total_cost, 1.0);
                for &component in &cost_vars {
                    backend.set_coefficient(total_link, component, -1.0);
                }
                backend.objective_set_coefficient(total_cost, 1.0);
                backend.objective_minimize();

                let status = backend.solve();
                info!(%status, "minimize-cost LP finished");
                let mut parts = collect_lp_parts(backend.as_ref(), &model, status);
                if let Some(note) = note {
                    parts.messages.push(note);
                }
                Ok(assemble_result(
                    self.name(),
                    backend.name(),
                    network,
                    settings,
                    parts,
                    started,
                ))
            }
            Strategy::Graph => Ok(solve_with_graph(self.name(), network, settings, note, started)),
        }
    }
}

/// Successive cheapest paths: deliveries in descending demand order, each
/// served by repeated Dijkstra runs from the pool of receipts with remaining
/// supply. Unservable residual demand means the instance is infeasible.
fn solve_with_graph(
    algorithm: &str,
    network: &Network,
    settings: &OptimizationSettings,
    note: Option<String>,
    started: Instant,
) -> OptimizationResult {
    let mut residual = ResidualNetwork::new(network);

    let mut supply: BTreeMap<String, f64> = network
        .active_receipts()
        .map(|p| {
            (
                p.id.clone(),
                p.supply_capacity().map(|s| s.value()).unwrap_or(0.0),
            )
        })
        .collect();

    let mut deliveries: Vec<(String, f64)> = network
        .active_deliveries()
        .map(|p| {
            (
                p.id.clone(),
                p.demand_requirement().map(|d| d.value()).unwrap_or(0.0),
            )
        })
        .collect();
    deliveries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut messages = Vec::new();
    if let Some(note) = note {
        messages.push(note);
    }
    if settings.enable_pressure_constraints || settings.enable_compressor_stations {
        messages.push(
            "graph strategy does not enforce pressure/compressor constraints".to_string(),
        );
    }

    let mut total_cost = 0.0;
    for (delivery_id, mut remaining) in deliveries {
        while remaining > RESIDUAL_THRESHOLD {
            let sources: Vec<&str> = supply
                .iter()
                .filter(|(_, &s)| s > RESIDUAL_THRESHOLD)
                .map(|(id, _)| id.as_str())
                .collect();
            if sources.is_empty() {
                return infeasible(algorithm, network, settings, messages, started, &delivery_id);
            }
            let Some((unit_cost, path)) = residual.cheapest_path(&sources, &delivery_id)
            else {
                return infeasible(algorithm, network, settings, messages, started, &delivery_id);
            };
            let source = path
                .first()
                .map(|arc| arc.tail.clone())
                .unwrap_or_default();
            let source_supply = supply.get(&source).copied().unwrap_or(0.0);
            let amount = remaining
                .min(source_supply)
                .min(residual.bottleneck(&path));
            if amount < RESIDUAL_THRESHOLD {
                return infeasible(algorithm, network, settings, messages, started, &delivery_id);
            }
            residual.augment(&path, amount);
            *supply.get_mut(&source).expect("known receipt") -= amount;
            remaining -= amount;
            total_cost += unit_cost * amount;
        }
    }
    messages.push(format!(
        "successive cheapest paths served all demand at ${total_cost:.2}"
    ));

    let parts = SolutionParts {
        status: Status::Optimal,
        objective_value: total_cost,
        flows: residual.flows().clone(),
        p2: None,
        boosts: BTreeMap::new(),
        fuels: BTreeMap::new(),
        messages,
    };
    assemble_result(algorithm, "graph", network, settings, parts, started)
}

fn infeasible(
    algorithm: &str,
    network: &Network,
    settings: &OptimizationSettings,
    mut messages: Vec<String>,
    started: Instant,
    delivery_id: &str,
) -> OptimizationResult {
    messages.push(format!(
        "no remaining path can serve delivery {delivery_id}; demand cannot be met"
    ));
    assemble_result(
        algorithm,
        "graph",
        network,
        settings,
        SolutionParts::unsolved(Status::Infeasible, messages),
        started,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasnet_core::{Mmscfd, Point, Psi, Psia, Segment};

    fn e1_network() -> Network {
        let mut network = Network::new("e1");
        network.add_point(
            Point::receipt("R1", "Receipt 1", Mmscfd(1000.0), 2.0)
                .with_pressure_window(Psia(800.0), Psia(1000.0)),
        );
        network.add_point(
            Point::delivery("D1", "Delivery 1", Mmscfd(600.0))
                .with_pressure_window(Psia(300.0), Psia(800.0)),
        );
        network.add_point(
            Point::delivery("D2", "Delivery 2", Mmscfd(400.0))
                .with_pressure_window(Psia(300.0), Psia(800.0)),
        );
        network.add_point(
            Point::compressor("C1", "Compressor 1", Psi(400.0), 0.02)
                .with_pressure_window(Psia(300.0), Psia(1200.0)),
        );
        network.add_segment(
            Segment::new("S1", "R1-C1", "R1", "C1", Mmscfd(1000.0)).with_transportation_cost(0.10),
        );
        network.add_segment(
            Segment::new("S2", "C1-D1", "C1", "D1", Mmscfd(600.0)).with_transportation_cost(0.12),
        );
        network.add_segment(
            Segment::new("S3", "C1-D2", "C1", "D2", Mmscfd(500.0)).with_transportation_cost(0.15),
        );
        network.finalize();
        network
    }

    #[test]
    fn test_lp_matches_reference_cost() {
        let result = MinimizeCost
            .optimize(&e1_network(), &OptimizationSettings::default())
            .unwrap();
        assert_eq!(result.status, Status::Optimal);
        assert!((result.flow("S1") - 1000.0).abs() < 1e-4);
        assert!((result.flow("S2") - 600.0).abs() < 1e-4);
        assert!((result.flow("S3") - 400.0).abs() < 1e-4);
        // 1000*0.10 + 600*0.12 + 400*0.15 = 232
        assert!((result.objective_value - 232.0).abs() < 1e-3);
        assert!((result.costs.transportation - 232.0).abs() < 1e-3);
    }

    #[test]
    fn test_graph_matches_reference_cost() {
        let settings = OptimizationSettings::default().with_param("strategy", "graph");
        let result = MinimizeCost.optimize(&e1_network(), &settings).unwrap();
        assert_eq!(result.status, Status::Optimal);
        assert!((result.objective_value - 232.0).abs() < 1e-9);
        assert!((result.costs.transportation - 232.0).abs() < 1e-9);
    }

    #[test]
    fn test_scaled_demand_infeasible() {
        // Demand x1.5: S2 would need 900 > its 600 capacity
        let mut network = e1_network();
        if let Some(point) = network.point_mut("D1") {
            point.kind = gasnet_core::PointKind::Delivery {
                demand_requirement: Mmscfd(900.0),
            };
        }
        if let Some(point) = network.point_mut("D2") {
            point.kind = gasnet_core::PointKind::Delivery {
                demand_requirement: Mmscfd(600.0),
            };
        }
        network.add_point(Point::receipt("R2", "Receipt 2", Mmscfd(1000.0), 2.0));
        network.add_segment(
            Segment::new("S4", "R2-C1", "R2", "C1", Mmscfd(1000.0)).with_transportation_cost(0.2),
        );
        network.finalize();

        for strategy in ["solver", "graph"] {
            let settings = OptimizationSettings::default().with_param("strategy", strategy);
            let result = MinimizeCost.optimize(&network, &settings).unwrap();
            assert_eq!(result.status, Status::Infeasible, "strategy {strategy}");
        }
    }

    #[test]
    fn test_prefers_cheap_route() {
        // Parallel routes with different tariffs: cheap one saturates first
        let mut network = Network::new("parallel");
        network.add_point(Point::receipt("R1", "R1", Mmscfd(1000.0), 1.0));
        network.add_point(Point::delivery("D1", "D1", Mmscfd(500.0)));
        network.add_segment(
            Segment::new("SA", "cheap", "R1", "D1", Mmscfd(300.0)).with_transportation_cost(0.05),
        );
        network.add_segment(
            Segment::new("SB", "dear", "R1", "D1", Mmscfd(400.0)).with_transportation_cost(0.50),
        );
        network.finalize();

        for strategy in ["solver", "graph"] {
            let settings = OptimizationSettings::default().with_param("strategy", strategy);
            let result = MinimizeCost.optimize(&network, &settings).unwrap();
            assert!(
                (result.flow("SA") - 300.0).abs() < 1e-4,
                "strategy {strategy}"
            );
            assert!(
                (result.flow("SB") - 200.0).abs() < 1e-4,
                "strategy {strategy}"
            );
            let expected = 300.0 * 0.05 + 200.0 * 0.50;
            assert!(
                (result.objective_value - expected).abs() < 1e-3,
                "strategy {strategy}"
            );
        }
    }

    #[test]
    fn test_can_handle_rejects_missing_deliveries() {
        let mut network = e1_network();
        network.point_mut("D1").unwrap().is_active = false;
        network.point_mut("D2").unwrap().is_active = false;
        assert!(!MinimizeCost.can_handle(&network, &OptimizationSettings::default()));
    }
}
