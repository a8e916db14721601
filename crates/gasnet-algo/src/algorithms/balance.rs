//! Balance segment utilization while serving all demand.
//!
//! Solver strategy: LP with per-segment utilization variables and absolute
//! deviations from their mean (or from an explicit target utilization),
//! maximizing `-w_b·Σ deviation + w_t·throughput - w_c·transport cost` under
//! exact-demand conservation. Graph strategy: enumerate simple
//! receipt→delivery paths (bounded) and push demand in equal shares across
//! the paths that still have headroom.

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
/// Paths at or above this utilization fraction stop receiving shares
const UTILIZATION_CEILING: f64 = 0.95;

pub struct BalanceDemand;

impl OptimizationAlgorithm for BalanceDemand {
    fn name(&self) -> &'static str {
        "balance-demand"
    }

    fn description(&self) -> &'static str {
        "Serve all demand while evening out segment utilization"
    }

    fn parameters(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("strategy", "'solver' or 'graph' (default: solver with fallback)"),
            (
                "balance.target_utilization",
                "anchor deviations at this % instead of the mean",
            ),
            (
                "balance.deviation_weight",
                "objective weight on total deviation (default 1.0)",
            ),
            (
                "balance.throughput_weight",
                "objective weight on receipt outflow (default 0.1)",
            ),
            (
                "balance.cost_weight",
                "objective weight on transportation cost (default 0.001)",
            ),
            (
                "balance.max_paths",
                "path enumeration cap per receipt-delivery pair (default 64)",
            ),
            (
                "balance.max_depth",
                "path length cap (default: number of points)",
            ),
        ])
    }

    fn can_handle(&self, network: &Network, _settings: &OptimizationSettings) -> bool {
        network.active_receipts().count() >= 1 && network.active_deliveries().count() >= 1
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

                let w_deviation = settings.param_f64("balance.deviation_weight", 1.0);
                let w_throughput = settings.param_f64("balance.throughput_weight", 0.1);
                let w_cost = settings.param_f64("balance.cost_weight", 0.001);
                let target = settings
                    .algorithm_parameters
                    .get("balance.target_utilization")
                    .and_then(|raw| raw.parse::<f64>().ok());

                // u_e = 100 * f_e / capacity (linearized for directed flows)
                let mut utilization_vars = Vec::new();
                for segment in network.operational_segments() {
                    let u = backend.make_num_var(
                        -100.0,
                        100.0,
                        &format!("util[{}]", segment.id),
                    );
                    let link = backend.make_constraint(
                        0.0,
                        0.0,
                        &format!("util_link[{}]", segment.id),
                    );
                    backend.set_coefficient(link, u, 1.0);
                    backend.set_coefficient(
                        link,
                        model.flow_vars[&segment.id],
                        -100.0 / segment.capacity.value(),
                    );
                    utilization_vars.push(u);
                }
                let n_segments = utilization_vars.len().max(1);

                // Anchor for deviations: the mean utilization variable, or
                // an explicit target percentage
                #[derive(Clone, Copy)]
                enum Anchor {
                    Mean(gasnet_core::VarId),
                    Target(f64),
                }
                let anchor = match target {
                    Some(value) => Anchor::Target(value),
                    None => {
                        let mean = backend.make_num_var(-100.0, 100.0, "util_mean");
                        let link = backend.make_constraint(0.0, 0.0, "util_mean_link");
                        backend.set_coefficient(link, mean, n_segments as f64);
                        for &u in &utilization_vars {
                            backend.set_coefficient(link, u, -1.0);
                        }
                        Anchor::Mean(mean)
                    }
                };

                // d_e >= u_e - anchor, d_e >= anchor - u_e
                let mut deviation_vars = Vec::new();
                for (i, &u) in utilization_vars.iter().enumerate() {
                    let d = backend.make_num_var(0.0, 200.0, &format!("util_dev[{i}]"));
                    match anchor {
                        Anchor::Mean(mean) => {
                            let above =
                                backend.make_constraint(0.0, f64::INFINITY, &format!("dev_a[{i}]"));
                            backend.set_coefficient(above, d, 1.0);
                            backend.set_coefficient(above, u, -1.0);
                            backend.set_coefficient(above, mean, 1.0);
                            let below =
                                backend.make_constraint(0.0, f64::INFINITY, &format!("dev_b[{i}]"));
                            backend.set_coefficient(below, d, 1.0);
                            backend.set_coefficient(below, u, 1.0);
                            backend.set_coefficient(below, mean, -1.0);
                        }
                        Anchor::Target(value) => {
                            let above = backend.make_constraint(
                                -value,
                                f64::INFINITY,
                                &format!("dev_a[{i}]"),
                            );
                            backend.set_coefficient(above, d, 1.0);
                            backend.set_coefficient(above, u, -1.0);
                            let below = backend.make_constraint(
                                value,
                                f64::INFINITY,
                                &format!("dev_b[{i}]"),
                            );
                            backend.set_coefficient(below, d, 1.0);
                            backend.set_coefficient(below, u, 1.0);
                        }
                    }
                    deviation_vars.push(d);
                }

                // Objective: maximize -w_b * sum(d) + w_t * throughput - w_c * cost
                for &d in &deviation_vars {
                    backend.objective_set_coefficient(d, -w_deviation);
                }
                let mut flow_coefficients: BTreeMap<String, f64> = BTreeMap::new();
                for receipt in network.active_receipts() {
                    for segment in network.outgoing(&receipt.id) {
                        *flow_coefficients.entry(segment.id.clone()).or_insert(0.0) +=
                            w_throughput;
                    }
                }
                for segment in network.operational_segments() {
                    *flow_coefficients.entry(segment.id.clone()).or_insert(0.0) -=
                        w_cost * segment.transportation_cost;
                }
                for (segment_id, coefficient) in &flow_coefficients {
                    backend
                        .objective_set_coefficient(model.flow_vars[segment_id], *coefficient);
                }
                backend.objective_maximize();

                let status = backend.solve();
                info!(%status, "balance-demand LP finished");
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

/// Equal-share multi-path distribution: for each delivery, spread residual
/// demand evenly over the enumerated paths that still have utilization
/// headroom, until demand is met or no eligible path remains.
fn solve_with_graph(
    algorithm: &str,
    network: &Network,
    settings: &OptimizationSettings,
    note: Option<String>,
    started: Instant,
) -> OptimizationResult {
    let max_paths = settings.param_usize("balance.max_paths", 64);
    let max_depth = settings.param_usize("balance.max_depth", network.points().count());

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

    for (delivery_id, mut remaining) in deliveries {
        // Paths from every receipt, in deterministic order
        let mut paths = Vec::new();
        for receipt_id in supply.keys() {
            paths.extend(residual.enumerate_paths(
                receipt_id,
                &delivery_id,
                max_depth,
                max_paths,
            ));
        }
        if paths.len() >= max_paths {
            messages.push(format!(
                "path enumeration for {delivery_id} capped at {max_paths}"
            ));
        }

        loop {
            if remaining < RESIDUAL_THRESHOLD {
                break;
            }
            let eligible: Vec<&Vec<crate::paths::Arc>> = paths
                .iter()
                .filter(|path| {
                    residual.max_utilization(path) < UTILIZATION_CEILING
                        && residual.bottleneck(path) > RESIDUAL_THRESHOLD
                        && path
                            .first()
                            .map(|arc| {
                                supply.get(&arc.tail).copied().unwrap_or(0.0)
                                    > RESIDUAL_THRESHOLD
                            })
                            .unwrap_or(false)
                })
                .collect();
            if eligible.is_empty() {
                break;
            }

            let share = remaining / eligible.len() as f64;
            let mut pushed_this_round = 0.0;
            let chosen: Vec<Vec<crate::paths::Arc>> =
                eligible.into_iter().cloned().collect();
            for path in &chosen {
                let source = path.first().map(|arc| arc.tail.clone()).unwrap_or_default();
                let source_supply = supply.get(&source).copied().unwrap_or(0.0);
                let amount = share
                    .min(remaining)
                    .min(source_supply)
                    .min(residual.bottleneck(path));
                if amount < RESIDUAL_THRESHOLD {
                    continue;
                }
                residual.augment(path, amount);
                *supply.get_mut(&source).expect("known receipt") -= amount;
                remaining -= amount;
                pushed_this_round += amount;
            }
            if pushed_this_round < RESIDUAL_THRESHOLD {
                break;
            }
        }

        if remaining > RESIDUAL_THRESHOLD {
            messages.push(format!(
                "delivery {delivery_id} left short by {remaining:.2} MMscfd"
            ));
            return assemble_result(
                algorithm,
                "graph",
                network,
                settings,
                SolutionParts::unsolved(Status::Infeasible, messages),
                started,
            );
        }
    }

    // Lower residual variance is better; report it as the objective
    let flows = residual.flows().clone();
    let utilizations: Vec<f64> = network
        .operational_segments()
        .filter_map(|segment| {
            let flow = flows.get(&segment.id).copied().unwrap_or(0.0);
            if flow.abs() < RESIDUAL_THRESHOLD {
                None
            } else {
                Some(flow.abs() / segment.capacity.value() * 100.0)
            }
        })
        .collect();
    let variance = if utilizations.is_empty() {
        0.0
    } else {
        let mean = utilizations.iter().sum::<f64>() / utilizations.len() as f64;
        utilizations.iter().map(|u| (u - mean).powi(2)).sum::<f64>()
            / utilizations.len() as f64
    };
    messages.push(format!(
        "equal-share distribution reached utilization variance {variance:.2}"
    ));

    let parts = SolutionParts {
        status: Status::Feasible,
        objective_value: variance,
        flows,
        p2: None,
        boosts: BTreeMap::new(),
        fuels: BTreeMap::new(),
        messages,
    };
    assemble_result(algorithm, "graph", network, settings, parts, started)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::MinimizeCost;
    use gasnet_core::{Mmscfd, Point, Segment};

    /// Two parallel corridors with uneven capacity and a demand large enough
    /// that minimum cost must saturate the cheap one: balancing should spread
    /// load more evenly instead.
    fn parallel_network() -> Network {
        let mut network = Network::new("parallel");
        network.add_point(Point::receipt("R1", "R1", Mmscfd(1000.0), 1.0));
        network.add_point(Point::delivery("D1", "D1", Mmscfd(1000.0)));
        network.add_segment(
            Segment::new("SA", "wide", "R1", "D1", Mmscfd(800.0)).with_transportation_cost(0.05),
        );
        network.add_segment(
            Segment::new("SB", "narrow", "R1", "D1", Mmscfd(400.0)).with_transportation_cost(0.50),
        );
        network.finalize();
        network
    }

    #[test]
    fn test_lp_serves_all_demand() {
        let result = BalanceDemand
            .optimize(&parallel_network(), &OptimizationSettings::default())
            .unwrap();
        assert_eq!(result.status, Status::Optimal);
        let total = result.flow("SA") + result.flow("SB");
        assert!((total - 1000.0).abs() < 1e-4);
    }

    #[test]
    fn test_lp_variance_beats_cost_on_parallel_routes() {
        // Min cost ships 800 on the wide corridor (100%) and 200 on the
        // narrow (50%); balancing evens the utilizations out
        let network = parallel_network();
        let settings =
            OptimizationSettings::default().with_param("balance.target_utilization", "70");
        let balanced = BalanceDemand.optimize(&network, &settings).unwrap();
        let cheapest = MinimizeCost
            .optimize(&network, &OptimizationSettings::default())
            .unwrap();
        assert!(balanced.status.has_solution());
        assert!(cheapest.status.has_solution());
        assert!(
            balanced.metrics.utilization_variance < cheapest.metrics.utilization_variance
        );
    }

    #[test]
    fn test_graph_spreads_load() {
        let settings = OptimizationSettings::default().with_param("strategy", "graph");
        let result = BalanceDemand.optimize(&parallel_network(), &settings).unwrap();
        assert_eq!(result.status, Status::Feasible);
        let total = result.flow("SA") + result.flow("SB");
        assert!((total - 1000.0).abs() < 1e-6);
        // Both corridors carry flow
        assert!(result.flow("SA") > 0.0);
        assert!(result.flow("SB") > 0.0);
    }

    #[test]
    fn test_graph_infeasible_when_demand_unreachable() {
        let mut network = parallel_network();
        if let Some(point) = network.point_mut("D1") {
            point.kind = gasnet_core::PointKind::Delivery {
                demand_requirement: Mmscfd(5000.0),
            };
        }
        network.finalize();
        let settings = OptimizationSettings::default().with_param("strategy", "graph");
        let result = BalanceDemand.optimize(&network, &settings).unwrap();
        assert_eq!(result.status, Status::Infeasible);
    }

    #[test]
    fn test_can_handle() {
        let settings = OptimizationSettings::default();
        assert!(BalanceDemand.can_handle(&parallel_network(), &settings));
        let mut no_receipt = parallel_network();
        no_receipt.point_mut("R1").unwrap().is_active = false;
        assert!(!BalanceDemand.can_handle(&no_receipt, &settings));
    }
}
