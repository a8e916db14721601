//! Shared LP formulation core.
//!
//! All three solver-backed objectives start from the same skeleton: one flow
//! variable per operational segment, flow conservation rows per active point,
//! then the optional pressure and compressor families. The objective differs
//! per algorithm and is set by the caller on top of the returned handles.
//!
//! Variables and constraints are created in id-sorted order, so two runs over
//! the same network build byte-identical models.

use std::collections::BTreeMap;

use gasnet_core::solver::LpBackend;
use gasnet_core::Network;
use tracing::debug;

use crate::compressor::{self, CompressorParams, CompressorVars};
use crate::pressure::{self, PressureVars};
use crate::settings::OptimizationSettings;
use crate::EngineError;

/// How delivery conservation rows treat demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandPolicy {
    /// Net inflow in `[0, demand]` (maximize-throughput convention)
    CapAtDemand,
    /// Net inflow equal to demand (minimize-cost / balance convention)
    ExactDemand,
}

/// Handles to the variables of a built flow model.
pub struct FlowModel {
    /// Flow variable per operational segment id
    pub flow_vars: BTreeMap<String, gasnet_core::VarId>,
    /// Pressure family, when enabled
    pub pressure: Option<PressureVars>,
    /// Compressor family, when enabled
    pub compressors: Option<CompressorVars>,
}

/// Build flow variables, conservation rows, and the enabled constraint
/// families against the back-end.
pub fn build_flow_model(
    backend: &mut dyn LpBackend,
    network: &Network,
    settings: &OptimizationSettings,
    demand_policy: DemandPolicy,
) -> Result<FlowModel, EngineError> {
    let mut flow_vars = BTreeMap::new();
    for segment in network.operational_segments() {
        let var = backend.make_num_var(
            segment.lower_flow_bound().value(),
            segment.capacity.value(),
            &format!("flow[{}]", segment.id),
        );
        flow_vars.insert(segment.id.clone(), var);
    }

    // Conservation per active point. The row expression is
    // (sum of incoming flows) - (sum of outgoing flows); its bounds encode
    // the point's role.
    for point in network.active_points() {
        let (lo, hi) = match (&point.kind, demand_policy) {
            // Receipts only inject: net inflow in [-supply, 0]
            (gasnet_core::PointKind::Receipt { supply_capacity, .. }, _) => {
                (-supply_capacity.value(), 0.0)
            }
            (gasnet_core::PointKind::Delivery { demand_requirement }, DemandPolicy::CapAtDemand) => {
                (0.0, demand_requirement.value())
            }
            (gasnet_core::PointKind::Delivery { demand_requirement }, DemandPolicy::ExactDemand) => {
                (demand_requirement.value(), demand_requirement.value())
            }
            // Compressors are pass-through
            (gasnet_core::PointKind::Compressor { .. }, _) => (0.0, 0.0),
        };
        let row = backend.make_constraint(lo, hi, &format!("balance[{}]", point.id));
        for segment in network.incoming(&point.id) {
            backend.set_coefficient(row, flow_vars[&segment.id], 1.0);
        }
        for segment in network.outgoing(&point.id) {
            backend.set_coefficient(row, flow_vars[&segment.id], -1.0);
        }
    }

    // Compressor family first so the pressure rows can reference boost
    let compressors = if settings.enable_compressor_stations {
        let params = CompressorParams::from_settings(settings);
        Some(compressor::emit_compressor_constraints(
            backend, network, &params, &flow_vars,
        ))
    } else {
        None
    };

    let pressure = if settings.enable_pressure_constraints {
        Some(pressure::emit_pressure_constraints(
            backend,
            network,
            settings,
            &flow_vars,
            compressors.as_ref().map(|c| &c.boost),
        ))
    } else {
        None
    };

    backend.set_time_limit(settings.time_limit());
    debug!(
        segments = flow_vars.len(),
        pressure = pressure.is_some(),
        compressors = compressors.is_some(),
        "flow model built"
    );

    Ok(FlowModel {
        flow_vars,
        pressure,
        compressors,
    })
}

/// Read the solved flows back out of the back-end.
pub fn extract_flows(
    backend: &dyn LpBackend,
    flow_vars: &BTreeMap<String, gasnet_core::VarId>,
) -> BTreeMap<String, f64> {
    flow_vars
        .iter()
        .map(|(id, &var)| (id.clone(), backend.value(var)))
        .collect()
}
