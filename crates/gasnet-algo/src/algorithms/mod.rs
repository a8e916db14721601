//! Optimization algorithms.
//!
//! Three objectives, each with a mathematical-programming formulation over
//! the solver abstraction and a pure graph-algorithmic fallback:
//!
//! | Algorithm | Solver strategy | Graph strategy |
//! |-----------|-----------------|----------------|
//! | [`MaximizeThroughput`] | LP over flow variables | greedy augmenting paths |
//! | [`MinimizeCost`] | LP with explicit cost variables | successive cheapest paths |
//! | [`BalanceDemand`] | LP with utilization deviations | equal-share multi-path |
//!
//! The strategy is picked per run: `AlgorithmParameters["strategy"]` forces
//! `"solver"` or `"graph"`; otherwise the solver strategy runs with the
//! preferred back-end, falling back to the graph strategy when that back-end
//! is not registered.

pub mod balance;
pub mod cost;
pub mod throughput;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use gasnet_core::{Network, Psia, SolverKind};
use tracing::debug;

use crate::pressure;
use crate::result::{
    aggregate_metrics, build_segment_records, transportation_cost, OptimizationResult,
    PointPressureRecord, Status,
};
use crate::settings::OptimizationSettings;
use crate::EngineError;

pub use balance::BalanceDemand;
pub use cost::MinimizeCost;
pub use throughput::MaximizeThroughput;

/// Contract shared by all optimization algorithms.
pub trait OptimizationAlgorithm: Send + Sync {
    /// Registry key ("maximize-throughput", ...)
    fn name(&self) -> &'static str;

    /// One-line human description
    fn description(&self) -> &'static str;

    /// Recognized `AlgorithmParameters` keys and what they do
    fn parameters(&self) -> BTreeMap<&'static str, &'static str>;

    /// Fast applicability check; the engine refuses dispatch when false
    fn can_handle(&self, network: &Network, settings: &OptimizationSettings) -> bool;

    /// Run the optimization
    fn optimize(
        &self,
        network: &Network,
        settings: &OptimizationSettings,
    ) -> Result<OptimizationResult, EngineError>;
}

/// Registry of algorithms keyed by name.
#[derive(Default, Clone)]
pub struct AlgorithmRegistry {
    algorithms: BTreeMap<String, Arc<dyn OptimizationAlgorithm>>,
}

impl AlgorithmRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the three built-in algorithms
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MaximizeThroughput));
        registry.register(Arc::new(MinimizeCost));
        registry.register(Arc::new(BalanceDemand));
        registry
    }

    /// Register an algorithm, replacing any with the same name
    pub fn register(&mut self, algorithm: Arc<dyn OptimizationAlgorithm>) {
        self.algorithms
            .insert(algorithm.name().to_string(), algorithm);
    }

    /// Look up by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn OptimizationAlgorithm>> {
        self.algorithms.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.algorithms.keys().map(|s| s.as_str()).collect()
    }
}

/// Which formulation a run should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Strategy {
    Solver(SolverKind),
    Graph,
}

/// Resolve the strategy for a run: an explicit `strategy` parameter wins;
/// otherwise prefer the configured back-end and fall back to the graph
/// formulation when it is not registered.
pub(crate) fn resolve_strategy(
    settings: &OptimizationSettings,
) -> Result<(Strategy, Option<String>), EngineError> {
    match settings.param_str("strategy") {
        Some("graph") => Ok((Strategy::Graph, None)),
        Some("solver") | None => match settings.preferred_solver.parse::<SolverKind>() {
            Ok(kind) => Ok((Strategy::Solver(kind), None)),
            Err(err) if settings.param_str("strategy").is_none() => {
                debug!("falling back to graph strategy: {err}");
                Ok((
                    Strategy::Graph,
                    Some(format!(
                        "back-end '{}' unavailable, using graph fallback",
                        settings.preferred_solver
                    )),
                ))
            }
            Err(err) => Err(EngineError::Solver(err.to_string())),
        },
        Some(other) => Err(EngineError::InvalidSettings(format!(
            "unknown strategy '{other}' (expected 'solver' or 'graph')"
        ))),
    }
}

/// Raw pieces of a solved run, before aggregation.
pub(crate) struct SolutionParts {
    pub status: Status,
    pub objective_value: f64,
    pub flows: BTreeMap<String, f64>,
    /// Solved squared pressures, when the pressure family was in the model
    pub p2: Option<BTreeMap<String, f64>>,
    pub boosts: BTreeMap<String, f64>,
    pub fuels: BTreeMap<String, f64>,
    pub messages: Vec<String>,
}

impl SolutionParts {
    pub fn unsolved(status: Status, messages: Vec<String>) -> Self {
        Self {
            status,
            objective_value: 0.0,
            flows: BTreeMap::new(),
            p2: None,
            boosts: BTreeMap::new(),
            fuels: BTreeMap::new(),
            messages,
        }
    }
}

/// Read the solved variable families back out of an LP back-end.
pub(crate) fn collect_lp_parts(
    backend: &dyn gasnet_core::LpBackend,
    model: &crate::model::FlowModel,
    status: gasnet_core::SolveStatus,
) -> SolutionParts {
    let status: Status = status.into();
    if !status.has_solution() {
        return SolutionParts::unsolved(status, Vec::new());
    }
    let flows = crate::model::extract_flows(backend, &model.flow_vars);
    let p2 = model.pressure.as_ref().map(|p| {
        p.p2
            .iter()
            .map(|(id, &var)| (id.clone(), backend.value(var)))
            .collect()
    });
    let (boosts, fuels) = match &model.compressors {
        Some(vars) => (
            vars.boost
                .iter()
                .map(|(id, &var)| (id.clone(), backend.value(var)))
                .collect(),
            vars.fuel
                .iter()
                .map(|(id, &var)| (id.clone(), backend.value(var)))
                .collect(),
        ),
        None => (BTreeMap::new(), BTreeMap::new()),
    };
    SolutionParts {
        status,
        objective_value: backend.objective_value(),
        flows,
        p2,
        boosts,
        fuels,
        messages: Vec::new(),
    }
}

/// Assemble the uniform result object from solved parts.
pub(crate) fn assemble_result(
    algorithm: &str,
    solver: &str,
    network: &Network,
    settings: &OptimizationSettings,
    parts: SolutionParts,
    started: Instant,
) -> OptimizationResult {
    let mut result = OptimizationResult::new(algorithm, solver);
    result.status = parts.status;
    result.objective_value = parts.objective_value;
    result.messages = parts.messages;

    if parts.status.has_solution() {
        result.segment_flows = build_segment_records(network, &parts.flows, settings);

        // Squared pressures from the model when it carried them; otherwise
        // the independent upstream estimate (diagnostic value only)
        let p2_map = parts.p2.unwrap_or_else(|| {
            pressure::estimate_pressures(network, &parts.flows)
                .into_iter()
                .map(|(id, p)| (id, Psia(p).squared()))
                .collect()
        });
        let tolerance = settings.feasibility_tolerance;
        for point in network.active_points() {
            let Some(&p2) = p2_map.get(&point.id) else {
                continue;
            };
            let pressure_value = Psia::from_squared(p2).value();
            result.point_pressures.insert(
                point.id.clone(),
                PointPressureRecord {
                    pressure: pressure_value,
                    pressure_squared: p2,
                    within_constraints: pressure_value
                        >= point.min_pressure.value() - tolerance
                        && pressure_value <= point.max_pressure.value() + tolerance,
                    boost: parts.boosts.get(&point.id).copied().unwrap_or(0.0),
                    fuel_consumption: parts.fuels.get(&point.id).copied().unwrap_or(0.0),
                },
            );
        }

        let fuel_price = settings.param_f64("cost.fuel_price", 3.0);
        let compressor_per_psi = settings.param_f64("cost.compressor_per_psi", 0.001);
        result.costs.transportation = transportation_cost(&result.segment_flows);
        result.costs.fuel = fuel_price * parts.fuels.values().sum::<f64>();
        result.costs.compressor = compressor_per_psi * parts.boosts.values().sum::<f64>();

        result.metrics =
            aggregate_metrics(network, &result.segment_flows, &result.point_pressures);
    }

    result.elapsed_ms = started.elapsed().as_millis();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_defaults() {
        let registry = AlgorithmRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec!["balance-demand", "maximize-throughput", "minimize-cost"]
        );
        assert!(registry.get("minimize-cost").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_resolve_strategy_explicit_graph() {
        let settings = OptimizationSettings::default().with_param("strategy", "graph");
        let (strategy, note) = resolve_strategy(&settings).unwrap();
        assert_eq!(strategy, Strategy::Graph);
        assert!(note.is_none());
    }

    #[test]
    fn test_resolve_strategy_default_solver() {
        let settings = OptimizationSettings::default();
        let (strategy, note) = resolve_strategy(&settings).unwrap();
        assert!(matches!(strategy, Strategy::Solver(_)));
        assert!(note.is_none());
    }

    #[test]
    fn test_resolve_strategy_falls_back_when_backend_missing() {
        let mut settings = OptimizationSettings::default();
        settings.preferred_solver = "does-not-exist".to_string();
        let (strategy, note) = resolve_strategy(&settings).unwrap();
        assert_eq!(strategy, Strategy::Graph);
        assert!(note.unwrap().contains("graph fallback"));
    }

    #[test]
    fn test_resolve_strategy_forced_solver_fails_hard() {
        let mut settings = OptimizationSettings::default().with_param("strategy", "solver");
        settings.preferred_solver = "does-not-exist".to_string();
        assert!(resolve_strategy(&settings).is_err());
    }

    #[test]
    fn test_resolve_strategy_rejects_unknown() {
        let settings = OptimizationSettings::default().with_param("strategy", "quantum");
        assert!(resolve_strategy(&settings).is_err());
    }
}
