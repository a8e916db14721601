//! Squared-pressure sub-model.
//!
//! Each active point gets a decision variable for `P²`, bounded by its
//! pressure window squared. Each operational segment couples the endpoint
//! variables through the Weymouth-style drop `P²(u) − P²(v) ≥ k·f²`, with
//! `f²` bounded from below by secant chords so the whole family stays linear.
//!
//! Compressor boost enters the drop row of segments leaving a station as a
//! first-order lift: `(P + b)² ≈ P² + 2·P̄·b` with `P̄` the midpoint of the
//! station's window. The post-solve validation pass applies the same
//! allowance, so a solution is judged by the model it was solved under.
//!
//! Neither shipped back-end accepts quadratic rows, so the piecewise-linear
//! form is always used; `UseLinearPressureApproximation` forces it
//! explicitly on back-ends that might one day support the quadratic form.

use std::collections::{BTreeMap, HashMap, HashSet};

use gasnet_core::gas::{self, quadratic_secants};
use gasnet_core::solver::LpBackend;
use gasnet_core::{Mmscfd, Network, Psia, VarId};

use crate::result::PointPressureRecord;
use crate::settings::OptimizationSettings;

/// Handles to the pressure variables.
pub struct PressureVars {
    /// `P²` per active point id
    pub p2: BTreeMap<String, VarId>,
    /// `f²` auxiliary per operational segment id (absent when `k = 0`)
    pub flow_sq: BTreeMap<String, VarId>,
}

/// Midpoint of a pressure window, the linearization anchor for boost
fn window_midpoint(min: Psia, max: Psia) -> f64 {
    (min.value() + max.value()) / 2.0
}

/// Emit the squared-pressure family against the back-end.
pub fn emit_pressure_constraints(
    backend: &mut dyn LpBackend,
    network: &Network,
    settings: &OptimizationSettings,
    flow_vars: &BTreeMap<String, VarId>,
    boost_vars: Option<&BTreeMap<String, VarId>>,
) -> PressureVars {
    let mut p2 = BTreeMap::new();
    for point in network.active_points() {
        let var = backend.make_num_var(
            point.min_pressure.squared(),
            point.max_pressure.squared(),
            &format!("p2[{}]", point.id),
        );
        p2.insert(point.id.clone(), var);
    }

    let intervals = settings.linear_approximation_segments;
    let mut flow_sq = BTreeMap::new();
    for segment in network.operational_segments() {
        let k = segment.pressure_drop_constant;
        if k <= 0.0 {
            continue;
        }
        let capacity = segment.capacity.value();
        let flow_var = flow_vars[&segment.id];
        let fsq_var = backend.make_num_var(
            0.0,
            capacity * capacity,
            &format!("fsq[{}]", segment.id),
        );

        // fsq >= chord(f) over each interval of [0, capacity]; together the
        // chords bound f^2 from below
        for (i, secant) in quadratic_secants(1.0, capacity, intervals).iter().enumerate() {
            let row = backend.make_constraint(
                secant.intercept,
                f64::INFINITY,
                &format!("fsq_secant[{}][{}]", segment.id, i),
            );
            backend.set_coefficient(row, fsq_var, 1.0);
            backend.set_coefficient(row, flow_var, -secant.slope);
        }
        if segment.is_bidirectional {
            // Mirror chords so reverse flow is squared too
            for (i, secant) in
                quadratic_secants(1.0, capacity, intervals).iter().enumerate()
            {
                let row = backend.make_constraint(
                    secant.intercept,
                    f64::INFINITY,
                    &format!("fsq_secant_rev[{}][{}]", segment.id, i),
                );
                backend.set_coefficient(row, fsq_var, 1.0);
                backend.set_coefficient(row, flow_var, secant.slope);
            }
        }

        // P2(u) - P2(v) - k*fsq [+ 2*Pmid*boost(u)] >= 0
        let drop_row = backend.make_constraint(
            0.0,
            f64::INFINITY,
            &format!("pressure_drop[{}]", segment.id),
        );
        backend.set_coefficient(drop_row, p2[&segment.from_point_id], 1.0);
        backend.set_coefficient(drop_row, p2[&segment.to_point_id], -1.0);
        backend.set_coefficient(drop_row, fsq_var, -k);
        if let Some(boosts) = boost_vars {
            if let Some(&boost_var) = boosts.get(&segment.from_point_id) {
                let station = network
                    .point(&segment.from_point_id)
                    .expect("operational segment endpoint exists");
                let anchor = window_midpoint(station.min_pressure, station.max_pressure);
                backend.set_coefficient(drop_row, boost_var, 2.0 * anchor);
            }
        }

        flow_sq.insert(segment.id.clone(), fsq_var);
    }

    PressureVars { p2, flow_sq }
}

/// Post-solve check of the true (quadratic) pressure relations.
///
/// Returns one violation string per failed check; empty means the solution
/// respects the physics within `eps`.
pub fn validate_pressures(
    network: &Network,
    flows: &BTreeMap<String, f64>,
    pressures: &BTreeMap<String, PointPressureRecord>,
    eps: f64,
) -> Vec<String> {
    let mut violations = Vec::new();

    for point in network.active_points() {
        let Some(record) = pressures.get(&point.id) else {
            continue;
        };
        if record.pressure < point.min_pressure.value() - eps
            || record.pressure > point.max_pressure.value() + eps
        {
            violations.push(format!(
                "point {}: pressure {:.2} psia outside window [{:.2}, {:.2}]",
                point.id,
                record.pressure,
                point.min_pressure.value(),
                point.max_pressure.value()
            ));
        }
    }

    for segment in network.operational_segments() {
        let k = segment.pressure_drop_constant;
        if k <= 0.0 {
            continue;
        }
        let (Some(up), Some(down)) = (
            pressures.get(&segment.from_point_id),
            pressures.get(&segment.to_point_id),
        ) else {
            continue;
        };
        let flow = flows.get(&segment.id).copied().unwrap_or(0.0);
        let required_drop = k * flow * flow.abs();
        // Boost at the upstream station lifts the available head the same
        // way the model did
        let lift = if up.boost > 0.0 {
            let station = network.point(&segment.from_point_id);
            station
                .map(|p| 2.0 * window_midpoint(p.min_pressure, p.max_pressure) * up.boost)
                .unwrap_or(0.0)
        } else {
            0.0
        };
        let available = up.pressure_squared + lift - down.pressure_squared;
        if available < required_drop - eps {
            violations.push(format!(
                "segment {}: squared-pressure drop {:.2} below required {:.2} at flow {:.2} MMscfd",
                segment.id, available, required_drop, flow
            ));
        }
    }

    violations
}

/// Estimated pressures from source pressures and a flow assignment,
/// independent of any optimizer.
///
/// Receipt points anchor at their current pressure (falling back to the top
/// of their window); every other point is the flow-weighted mean over its
/// incoming carrying segments of `sqrt(max(0, P²(u) − k·f²))`, recursed
/// upstream. Cycles are cut by the recursion-path visited set.
pub fn estimate_pressures(
    network: &Network,
    flows: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let mut memo: HashMap<String, Option<f64>> = HashMap::new();
    let mut estimates = BTreeMap::new();
    for point in network.active_points() {
        let mut on_path = HashSet::new();
        if let Some(pressure) =
            estimate_at(network, flows, &point.id, &mut memo, &mut on_path)
        {
            estimates.insert(point.id.clone(), pressure);
        }
    }
    estimates
}

fn estimate_at(
    network: &Network,
    flows: &BTreeMap<String, f64>,
    point_id: &str,
    memo: &mut HashMap<String, Option<f64>>,
    on_path: &mut HashSet<String>,
) -> Option<f64> {
    if let Some(&cached) = memo.get(point_id) {
        return cached;
    }
    let point = network.point(point_id)?;
    if !on_path.insert(point_id.to_string()) {
        return None; // cycle
    }
    let result = if point.is_receipt() {
        let anchor = if point.current_pressure.value() > 0.0 {
            point.current_pressure
        } else {
            point.max_pressure
        };
        Some(anchor.value())
    } else {
        let mut weighted = 0.0;
        let mut weight = 0.0;
        for segment in network.incoming(point_id) {
            let flow = flows.get(&segment.id).copied().unwrap_or(0.0);
            if flow <= 0.0 {
                continue;
            }
            let Some(upstream) =
                estimate_at(network, flows, &segment.from_point_id, memo, on_path)
            else {
                continue;
            };
            let p2 = Psia(upstream).squared()
                - gas::squared_pressure_drop(segment.pressure_drop_constant, Mmscfd(flow));
            weighted += flow * Psia::from_squared(p2).value();
            weight += flow;
        }
        if weight > 0.0 {
            Some(weighted / weight)
        } else {
            None
        }
    };

    on_path.remove(point_id);
    memo.insert(point_id.to_string(), result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasnet_core::solver::{SimplexBackend, SolveStatus};
    use gasnet_core::{Inches, Miles, Point, Segment};

    fn pressured_chain(k_scale: f64) -> Network {
        let mut network = Network::new("pressured");
        network.add_point(
            Point::receipt("R1", "R1", Mmscfd(1000.0), 1.0)
                .with_pressure_window(Psia(800.0), Psia(1000.0))
                .with_current_pressure(Psia(900.0)),
        );
        network.add_point(
            Point::delivery("D1", "D1", Mmscfd(500.0))
                .with_pressure_window(Psia(300.0), Psia(800.0)),
        );
        // Narrow bore so the drop constant is material; friction scaled to
        // tune k without touching geometry
        network.add_segment(
            Segment::new("S1", "R1-D1", "R1", "D1", Mmscfd(800.0))
                .with_profile(Miles(50.0), Inches(0.5), 0.02 * k_scale),
        );
        network.finalize();
        network
    }

    fn build(
        network: &Network,
        settings: &OptimizationSettings,
        pinned_flow: f64,
    ) -> (SimplexBackend, PressureVars, BTreeMap<String, VarId>) {
        let mut backend = SimplexBackend::new();
        let mut flow_vars = BTreeMap::new();
        for segment in network.operational_segments() {
            let var = backend.make_num_var(
                segment.lower_flow_bound().value(),
                segment.capacity.value(),
                &segment.id,
            );
            flow_vars.insert(segment.id.clone(), var);
        }
        let pin = backend.make_constraint(pinned_flow, pinned_flow, "pin");
        backend.set_coefficient(pin, flow_vars["S1"], 1.0);
        let vars =
            emit_pressure_constraints(&mut backend, network, settings, &flow_vars, None);
        (backend, vars, flow_vars)
    }

    #[test]
    fn test_drop_constraint_feasible_at_moderate_flow() {
        let network = pressured_chain(1.0);
        let settings = OptimizationSettings::default();
        let (mut backend, vars, _) = build(&network, &settings, 400.0);
        backend.objective_minimize();
        assert_eq!(backend.solve(), SolveStatus::Optimal);

        let k = network.segment("S1").unwrap().pressure_drop_constant;
        let p2_up = backend.value(vars.p2["R1"]);
        let p2_down = backend.value(vars.p2["D1"]);
        let fsq = backend.value(vars.flow_sq["S1"]);
        // Secant family bounds f^2 from below
        assert!(fsq >= 400.0 * 400.0 - 1e-3);
        assert!(p2_up - p2_down >= k * fsq - 1e-6);
    }

    #[test]
    fn test_windows_make_high_flow_infeasible() {
        // k = 1.6: the drop at full flow (1.6 * 800^2 ≈ 1.02e6 psia^2)
        // exceeds the widest available head (1000^2 - 300^2 = 0.91e6)
        let network = pressured_chain(50.0);
        let settings = OptimizationSettings::default();
        let (mut backend, _, _) = build(&network, &settings, 800.0);
        backend.objective_minimize();
        assert_eq!(backend.solve(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_validate_pressures_flags_window_violation() {
        let network = pressured_chain(1.0);
        let flows: BTreeMap<String, f64> = [("S1".to_string(), 100.0)].into_iter().collect();
        let mut pressures = BTreeMap::new();
        pressures.insert(
            "R1".to_string(),
            PointPressureRecord {
                pressure: 700.0, // below Pmin = 800
                pressure_squared: 700.0 * 700.0,
                within_constraints: false,
                boost: 0.0,
                fuel_consumption: 0.0,
            },
        );
        pressures.insert(
            "D1".to_string(),
            PointPressureRecord {
                pressure: 500.0,
                pressure_squared: 500.0 * 500.0,
                within_constraints: true,
                boost: 0.0,
                fuel_consumption: 0.0,
            },
        );
        let violations = validate_pressures(&network, &flows, &pressures, 1e-6);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("outside window"));
    }

    #[test]
    fn test_validate_pressures_flags_impossible_drop() {
        let network = pressured_chain(1.0);
        let k = network.segment("S1").unwrap().pressure_drop_constant;
        let flow = 800.0;
        // Downstream pressure too high for the drop the flow demands
        let p2_up = 810.0_f64 * 810.0;
        let p2_down = p2_up - k * flow * flow / 2.0;
        let flows: BTreeMap<String, f64> = [("S1".to_string(), flow)].into_iter().collect();
        let mut pressures = BTreeMap::new();
        pressures.insert(
            "R1".to_string(),
            PointPressureRecord {
                pressure: 810.0,
                pressure_squared: p2_up,
                within_constraints: true,
                ..PointPressureRecord::default()
            },
        );
        pressures.insert(
            "D1".to_string(),
            PointPressureRecord {
                pressure: p2_down.sqrt(),
                pressure_squared: p2_down,
                within_constraints: true,
                ..PointPressureRecord::default()
            },
        );
        let violations = validate_pressures(&network, &flows, &pressures, 1e-6);
        assert!(violations
            .iter()
            .any(|v| v.contains("below required")));
    }

    #[test]
    fn test_estimate_pressures_chain() {
        let network = pressured_chain(1.0);
        let flows: BTreeMap<String, f64> = [("S1".to_string(), 400.0)].into_iter().collect();
        let estimates = estimate_pressures(&network, &flows);

        assert!((estimates["R1"] - 900.0).abs() < 1e-9);
        let k = network.segment("S1").unwrap().pressure_drop_constant;
        let expected = (900.0_f64 * 900.0 - k * 400.0 * 400.0).sqrt();
        assert!((estimates["D1"] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_pressures_weighted_merge() {
        // Two receipts feeding one delivery: weighted mean by flow
        let mut network = Network::new("merge");
        network.add_point(
            Point::receipt("R1", "R1", Mmscfd(500.0), 1.0)
                .with_current_pressure(Psia(900.0)),
        );
        network.add_point(
            Point::receipt("R2", "R2", Mmscfd(500.0), 1.0)
                .with_current_pressure(Psia(700.0)),
        );
        network.add_point(Point::delivery("D1", "D1", Mmscfd(600.0)));
        network.add_segment(
            Segment::new("S1", "R1-D1", "R1", "D1", Mmscfd(500.0))
                .with_profile(Miles(10.0), Inches(30.0), 0.015),
        );
        network.add_segment(
            Segment::new("S2", "R2-D1", "R2", "D1", Mmscfd(500.0))
                .with_profile(Miles(10.0), Inches(30.0), 0.015),
        );
        network.finalize();

        let flows: BTreeMap<String, f64> =
            [("S1".to_string(), 400.0), ("S2".to_string(), 200.0)]
                .into_iter()
                .collect();
        let estimates = estimate_pressures(&network, &flows);

        let k = network.segment("S1").unwrap().pressure_drop_constant;
        let from_r1 = (900.0_f64 * 900.0 - k * 400.0 * 400.0).sqrt();
        let from_r2 = (700.0_f64 * 700.0 - k * 200.0 * 200.0).sqrt();
        let expected = (400.0 * from_r1 + 200.0 * from_r2) / 600.0;
        assert!((estimates["D1"] - expected).abs() < 1e-9);
    }
}
