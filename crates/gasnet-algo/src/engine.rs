//! Engine facade.
//!
//! Owns the algorithm registry and wraps every run in the same envelope:
//! settings and network validation up front, dispatch to the chosen
//! algorithm, post-solution validation after, with every failure converted
//! into an `Error`-status result at this boundary. Batch entry points
//! (comparison across algorithms, sensitivity across scenarios) isolate
//! per-run failures so one bad run never aborts the batch.

use std::sync::Arc;

use gasnet_core::{Diagnostics, Network};
use tracing::{info, warn};

use crate::algorithms::{AlgorithmRegistry, OptimizationAlgorithm};
use crate::backends::register_builtin_backends;
use crate::result::OptimizationResult;
use crate::settings::OptimizationSettings;
use crate::validation::validate_solution;

/// The optimization engine.
pub struct OptimizationEngine {
    registry: AlgorithmRegistry,
}

impl Default for OptimizationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OptimizationEngine {
    /// Engine with the three built-in algorithms and all back-ends
    /// registered.
    pub fn new() -> Self {
        register_builtin_backends();
        Self {
            registry: AlgorithmRegistry::with_defaults(),
        }
    }

    /// Engine over a caller-supplied registry.
    pub fn with_registry(registry: AlgorithmRegistry) -> Self {
        register_builtin_backends();
        Self { registry }
    }

    /// Register an additional algorithm.
    pub fn register(&mut self, algorithm: Arc<dyn OptimizationAlgorithm>) {
        self.registry.register(algorithm);
    }

    /// Names of the registered algorithms.
    pub fn available_algorithms(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Look up an algorithm for introspection (description, parameters).
    pub fn algorithm(&self, name: &str) -> Option<Arc<dyn OptimizationAlgorithm>> {
        self.registry.get(name)
    }

    /// Run one optimization. Never panics and never returns `Err`: every
    /// failure mode lands in the result's status and messages.
    pub fn optimize(
        &self,
        algorithm_name: &str,
        network: &Network,
        settings: &OptimizationSettings,
    ) -> OptimizationResult {
        if let Err(err) = settings.validate() {
            return OptimizationResult::failure(algorithm_name, vec![err.to_string()]);
        }

        if settings.validate_network_before_optimization {
            let mut diagnostics = Diagnostics::new();
            network.validate_into(&mut diagnostics);
            if diagnostics.has_errors() {
                warn!(
                    errors = diagnostics.error_count(),
                    "network failed pre-optimization validation"
                );
                return OptimizationResult::failure(
                    algorithm_name,
                    diagnostics.error_messages(),
                );
            }
        }

        let Some(algorithm) = self.registry.get(algorithm_name) else {
            return OptimizationResult::failure(
                algorithm_name,
                vec![format!(
                    "unknown algorithm '{}'; available: {}",
                    algorithm_name,
                    self.registry.names().join(", ")
                )],
            );
        };

        if !algorithm.can_handle(network, settings) {
            return OptimizationResult::failure(
                algorithm_name,
                vec![format!(
                    "algorithm '{}' cannot handle this network/settings combination",
                    algorithm_name
                )],
            );
        }

        let mut result = match algorithm.optimize(network, settings) {
            Ok(result) => result,
            // Internal failures become Error-status results; the message is
            // preserved and no partial result leaks out
            Err(err) => return OptimizationResult::failure(algorithm_name, vec![err.to_string()]),
        };

        let (violations, metrics) = validate_solution(network, &result, settings);
        if !violations.is_empty() {
            warn!(
                count = violations.len(),
                max_conservation = metrics.max_conservation_violation,
                max_capacity = metrics.max_capacity_violation,
                "post-solution validation failed"
            );
            result.log(format!(
                "post-solution validation found {} violation(s)",
                violations.len()
            ));
            result.validation_errors = violations;
        }

        info!(
            algorithm = algorithm_name,
            status = %result.status,
            elapsed_ms = result.elapsed_ms as u64,
            "optimization finished"
        );
        result
    }

    /// Run several algorithms on the same network for comparison. Failures
    /// are isolated per algorithm.
    pub fn compare(
        &self,
        algorithm_names: &[&str],
        network: &Network,
        settings: &OptimizationSettings,
    ) -> Vec<OptimizationResult> {
        algorithm_names
            .iter()
            .map(|name| self.optimize(name, network, settings))
            .collect()
    }

    /// Run one algorithm across named network scenarios for sensitivity
    /// analysis. Failures are isolated per scenario.
    pub fn run_scenarios(
        &self,
        algorithm_name: &str,
        scenarios: &[(String, Network)],
        settings: &OptimizationSettings,
    ) -> Vec<(String, OptimizationResult)> {
        scenarios
            .iter()
            .map(|(label, network)| {
                (label.clone(), self.optimize(algorithm_name, network, settings))
            })
            .collect()
    }

    /// Tab-separated comparison table; pipe through a column aligner for
    /// display.
    pub fn comparison_report(results: &[OptimizationResult]) -> String {
        let mut out = String::from(
            "algorithm\tstatus\tobjective\tthroughput\ttotal cost\tpeak util %\tms\n",
        );
        for result in results {
            out.push_str(&format!(
                "{}\t{}\t{:.2}\t{:.1}\t{:.2}\t{:.1}\t{}\n",
                result.algorithm,
                if result.validation_errors.is_empty() {
                    result.status.to_string()
                } else {
                    format!("{} (validation failed)", result.status)
                },
                result.objective_value,
                result.metrics.total_throughput,
                result.costs.total(),
                result.metrics.peak_utilization_pct,
                result.elapsed_ms,
            ));
        }
        out
    }
}
