//! Optimization run settings.
//!
//! One `OptimizationSettings` value parameterizes a single run: which
//! physical constraint families to include, solver selection and limits, and
//! a free-form parameter map forwarded to the algorithms.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::EngineError;

/// Settings recognized by the engine and the algorithms.
///
/// Serialized with camelCase names so embedders can carry them next to the
/// network configuration. All fields have defaults; an empty object is a
/// valid settings document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizationSettings {
    /// Include squared-pressure coupling constraints
    pub enable_pressure_constraints: bool,
    /// Include compressor activation/boost/fuel constraints
    pub enable_compressor_stations: bool,
    /// Solver wall-clock cap in seconds
    pub max_solution_time_seconds: u64,
    /// Solver-specific convergence tolerance
    pub optimality_tolerance: f64,
    /// Post-validation epsilon
    pub feasibility_tolerance: f64,
    /// Force the piecewise-linear pressure form even on a quadratic-capable
    /// back-end
    pub use_linear_pressure_approximation: bool,
    /// Number of secant intervals for the piecewise-linear form (1..=100)
    pub linear_approximation_segments: usize,
    /// Back-end identifier; must be registered in the solver registry
    pub preferred_solver: String,
    /// Flows below this magnitude are reported as zero (MMscfd)
    pub minimum_flow_threshold: f64,
    /// Run network validation inside the engine before dispatch
    pub validate_network_before_optimization: bool,
    /// Free-form parameters forwarded to algorithms (see each algorithm's
    /// `parameters()` for recognized keys)
    pub algorithm_parameters: BTreeMap<String, String>,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            enable_pressure_constraints: false,
            enable_compressor_stations: false,
            max_solution_time_seconds: 300,
            optimality_tolerance: 1e-6,
            feasibility_tolerance: 1e-6,
            use_linear_pressure_approximation: true,
            linear_approximation_segments: 10,
            preferred_solver: "simplex".to_string(),
            minimum_flow_threshold: 0.01,
            validate_network_before_optimization: true,
            algorithm_parameters: BTreeMap::new(),
        }
    }
}

impl OptimizationSettings {
    /// Check value ranges; returns the first offending field.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_solution_time_seconds == 0 {
            return Err(EngineError::InvalidSettings(
                "maxSolutionTimeSeconds must be positive".into(),
            ));
        }
        if !(1..=100).contains(&self.linear_approximation_segments) {
            return Err(EngineError::InvalidSettings(format!(
                "linearApproximationSegments must be in 1..=100, got {}",
                self.linear_approximation_segments
            )));
        }
        if self.feasibility_tolerance <= 0.0 || self.optimality_tolerance <= 0.0 {
            return Err(EngineError::InvalidSettings(
                "tolerances must be positive".into(),
            ));
        }
        if self.minimum_flow_threshold < 0.0 {
            return Err(EngineError::InvalidSettings(
                "minimumFlowThreshold must be >= 0".into(),
            ));
        }
        Ok(())
    }

    /// Wall-clock cap as a `Duration`
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.max_solution_time_seconds)
    }

    /// Typed read of a numeric algorithm parameter
    pub fn param_f64(&self, key: &str, default: f64) -> f64 {
        self.algorithm_parameters
            .get(key)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(default)
    }

    /// Typed read of an integer algorithm parameter
    pub fn param_usize(&self, key: &str, default: usize) -> usize {
        self.algorithm_parameters
            .get(key)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(default)
    }

    /// Raw read of a string algorithm parameter
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.algorithm_parameters.get(key).map(String::as_str)
    }

    /// Convenience: set a parameter, builder-style
    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.algorithm_parameters
            .insert(key.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = OptimizationSettings::default();
        assert!(!settings.enable_pressure_constraints);
        assert_eq!(settings.max_solution_time_seconds, 300);
        assert_eq!(settings.linear_approximation_segments, 10);
        assert_eq!(settings.minimum_flow_threshold, 0.01);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_segment_count_range() {
        let mut settings = OptimizationSettings::default();
        settings.linear_approximation_segments = 0;
        assert!(settings.validate().is_err());
        settings.linear_approximation_segments = 101;
        assert!(settings.validate().is_err());
        settings.linear_approximation_segments = 100;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_param_parsing() {
        let settings = OptimizationSettings::default()
            .with_param("cost.fuel_price", "4.5")
            .with_param("strategy", "graph")
            .with_param("balance.max_paths", "32");
        assert_eq!(settings.param_f64("cost.fuel_price", 3.0), 4.5);
        assert_eq!(settings.param_f64("missing", 3.0), 3.0);
        assert_eq!(settings.param_usize("balance.max_paths", 64), 32);
        assert_eq!(settings.param_str("strategy"), Some("graph"));
    }

    #[test]
    fn test_serde_camel_case_roundtrip() {
        let json = r#"{"enablePressureConstraints":true,"linearApproximationSegments":25}"#;
        let settings: OptimizationSettings = serde_json::from_str(json).unwrap();
        assert!(settings.enable_pressure_constraints);
        assert_eq!(settings.linear_approximation_segments, 25);
        // Unspecified fields keep their defaults
        assert_eq!(settings.max_solution_time_seconds, 300);

        let out = serde_json::to_string(&settings).unwrap();
        assert!(out.contains("enablePressureConstraints"));
    }
}
