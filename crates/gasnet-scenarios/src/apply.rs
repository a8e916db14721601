use anyhow::{anyhow, Result};
use gasnet_core::{Mmscfd, Network, PointKind};

use crate::spec::{OutageSpec, ResolvedScenario};

#[derive(Debug, Clone)]
pub struct ScenarioApplyOptions {
    /// Unknown outage/override targets abort the apply instead of being
    /// skipped
    pub strict: bool,
}

impl Default for ScenarioApplyOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

/// Mutate a network copy according to a resolved scenario: outages
/// deactivate elements, capacity overrides rewrite segment limits, and the
/// scale factors multiply every demand and supply. The caller passes a
/// clone; the base network stays untouched.
pub fn apply_scenario_to_network(
    network: &mut Network,
    scenario: &ResolvedScenario,
    opts: &ScenarioApplyOptions,
) -> Result<()> {
    for outage in &scenario.outages {
        match outage {
            OutageSpec::Point { id } => match network.point_mut(id) {
                Some(point) => point.is_active = false,
                None if opts.strict => {
                    return Err(anyhow!(
                        "scenario '{}' deactivates unknown point '{}'",
                        scenario.scenario_id,
                        id
                    ))
                }
                None => {}
            },
            OutageSpec::Segment { id } => match network.segment_mut(id) {
                Some(segment) => segment.is_active = false,
                None if opts.strict => {
                    return Err(anyhow!(
                        "scenario '{}' deactivates unknown segment '{}'",
                        scenario.scenario_id,
                        id
                    ))
                }
                None => {}
            },
        }
    }

    for over in &scenario.capacity_overrides {
        match network.segment_mut(&over.segment_id) {
            Some(segment) => {
                if over.capacity <= 0.0 {
                    return Err(anyhow!(
                        "scenario '{}' sets non-positive capacity on segment '{}'",
                        scenario.scenario_id,
                        over.segment_id
                    ));
                }
                segment.capacity = Mmscfd(over.capacity);
            }
            None if opts.strict => {
                return Err(anyhow!(
                    "scenario '{}' overrides unknown segment '{}'",
                    scenario.scenario_id,
                    over.segment_id
                ))
            }
            None => {}
        }
    }

    let point_ids: Vec<String> = network.points().map(|p| p.id.clone()).collect();
    for id in point_ids {
        if let Some(point) = network.point_mut(&id) {
            match &mut point.kind {
                PointKind::Delivery { demand_requirement } => {
                    *demand_requirement = *demand_requirement * scenario.demand_scale;
                }
                PointKind::Receipt {
                    supply_capacity, ..
                } => {
                    *supply_capacity = *supply_capacity * scenario.supply_scale;
                }
                PointKind::Compressor { .. } => {}
            }
        }
    }

    // Capacity overrides invalidate derived segment state
    network.finalize();
    Ok(())
}
