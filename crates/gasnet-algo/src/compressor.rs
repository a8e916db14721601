//! Compressor station sub-model.
//!
//! Per station: a 0/1 activation, a bounded boost, and a fuel variable tied
//! to throughput and boost. Stations left inactive pass gas through like a
//! joint; activation buys boost at the price of base fuel burn, so the
//! optimizer only switches a station on when pressure feasibility or cost
//! demands it.

use std::collections::BTreeMap;

use gasnet_core::solver::LpBackend;
use gasnet_core::{Network, VarId};

use crate::settings::OptimizationSettings;

/// Tunable compressor coefficients, read from `AlgorithmParameters`.
#[derive(Debug, Clone)]
pub struct CompressorParams {
    /// Minimum throughput when active (MMscfd)
    pub min_flow: f64,
    /// Base fuel burn when active (MMscf/d)
    pub base_fuel: f64,
    /// Extra fuel per psi of boost (MMscf/d per psi)
    pub boost_fuel: f64,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            min_flow: 10.0,
            base_fuel: 0.1,
            boost_fuel: 0.0005,
        }
    }
}

impl CompressorParams {
    pub fn from_settings(settings: &OptimizationSettings) -> Self {
        let defaults = Self::default();
        Self {
            min_flow: settings.param_f64("compressor.min_flow", defaults.min_flow),
            base_fuel: settings.param_f64("compressor.base_fuel", defaults.base_fuel),
            boost_fuel: settings.param_f64("compressor.boost_fuel", defaults.boost_fuel),
        }
    }
}

/// Handles to the compressor variables, keyed by station point id.
pub struct CompressorVars {
    pub active: BTreeMap<String, VarId>,
    pub boost: BTreeMap<String, VarId>,
    pub fuel: BTreeMap<String, VarId>,
}

/// Emit activation/boost/fuel variables and their linking rows for every
/// active compressor station.
pub fn emit_compressor_constraints(
    backend: &mut dyn LpBackend,
    network: &Network,
    params: &CompressorParams,
    flow_vars: &BTreeMap<String, VarId>,
) -> CompressorVars {
    let mut active = BTreeMap::new();
    let mut boost = BTreeMap::new();
    let mut fuel = BTreeMap::new();

    for station in network.active_compressors() {
        let max_boost = station
            .max_pressure_boost()
            .map(|b| b.value())
            .unwrap_or(0.0);
        let fuel_rate = station.fuel_consumption_rate().unwrap_or(0.0);

        let active_var = backend.make_bool_var(&format!("comp_active[{}]", station.id));
        let boost_var =
            backend.make_num_var(0.0, max_boost, &format!("comp_boost[{}]", station.id));
        let fuel_var =
            backend.make_num_var(0.0, f64::INFINITY, &format!("comp_fuel[{}]", station.id));

        // boost <= max_boost * active
        let coupling = backend.make_constraint(
            f64::NEG_INFINITY,
            0.0,
            &format!("comp_boost_link[{}]", station.id),
        );
        backend.set_coefficient(coupling, boost_var, 1.0);
        backend.set_coefficient(coupling, active_var, -max_boost);

        // sum(incoming flow) >= min_flow * active
        let throughput = backend.make_constraint(
            0.0,
            f64::INFINITY,
            &format!("comp_min_flow[{}]", station.id),
        );
        for segment in network.incoming(&station.id) {
            backend.set_coefficient(throughput, flow_vars[&segment.id], 1.0);
        }
        backend.set_coefficient(throughput, active_var, -params.min_flow);

        // fuel >= base * active + rate * sum(incoming flow) + boost_fuel * boost
        let fuel_row = backend.make_constraint(
            0.0,
            f64::INFINITY,
            &format!("comp_fuel_link[{}]", station.id),
        );
        backend.set_coefficient(fuel_row, fuel_var, 1.0);
        backend.set_coefficient(fuel_row, active_var, -params.base_fuel);
        for segment in network.incoming(&station.id) {
            backend.set_coefficient(fuel_row, flow_vars[&segment.id], -fuel_rate);
        }
        backend.set_coefficient(fuel_row, boost_var, -params.boost_fuel);

        active.insert(station.id.clone(), active_var);
        boost.insert(station.id.clone(), boost_var);
        fuel.insert(station.id.clone(), fuel_var);
    }

    CompressorVars {
        active,
        boost,
        fuel,
    }
}

/// One stage of a multi-stage compression plan.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionStage {
    /// 1-based stage number
    pub stage: usize,
    /// Pressure ratio of this stage
    pub ratio: f64,
    /// Whether the discharge is intercooled before the next stage
    pub intercooled: bool,
}

/// Staging heuristic: split a total pressure ratio `R` into
/// `ceil(log R / log r_max)` equal-ratio stages with intermediate
/// intercooling.
///
/// A ratio at or below 1 needs no compression and returns an empty plan.
pub fn plan_stages(total_ratio: f64, max_stage_ratio: f64) -> Vec<CompressionStage> {
    if total_ratio <= 1.0 || max_stage_ratio <= 1.0 {
        return Vec::new();
    }
    let stages = (total_ratio.ln() / max_stage_ratio.ln()).ceil().max(1.0) as usize;
    let stage_ratio = total_ratio.powf(1.0 / stages as f64);
    (1..=stages)
        .map(|stage| CompressionStage {
            stage,
            ratio: stage_ratio,
            intercooled: stage < stages,
        })
        .collect()
}
