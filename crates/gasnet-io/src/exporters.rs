//! JSON export for networks and optimization results.

use std::fs;
use std::path::Path;

use gasnet_core::{GasNetError, GasNetResult, Network, PointKind};

use crate::schema::{NetworkDocument, PointDocument, SegmentDocument};

/// Serialize a network back into the configuration document form.
pub fn network_to_document(network: &Network) -> NetworkDocument {
    let mut document = NetworkDocument {
        name: network.name.clone(),
        description: network.description.clone(),
        ..NetworkDocument::default()
    };
    for point in network.points() {
        let mut doc = PointDocument {
            id: point.id.clone(),
            name: point.name.clone(),
            x: point.x,
            y: point.y,
            is_active: point.is_active,
            min_pressure: point.min_pressure.value(),
            max_pressure: point.max_pressure.value(),
            current_pressure: point.current_pressure.value(),
            ..PointDocument::default()
        };
        match &point.kind {
            PointKind::Receipt {
                supply_capacity,
                unit_cost,
            } => {
                doc.kind = "Receipt".to_string();
                doc.supply_capacity = supply_capacity.value();
                doc.unit_cost = *unit_cost;
            }
            PointKind::Delivery { demand_requirement } => {
                doc.kind = "Delivery".to_string();
                doc.demand_requirement = demand_requirement.value();
            }
            PointKind::Compressor {
                max_pressure_boost,
                fuel_consumption_rate,
            } => {
                doc.kind = "Compressor".to_string();
                doc.max_pressure_boost = max_pressure_boost.value();
                doc.fuel_consumption_rate = *fuel_consumption_rate;
            }
        }
        document.points.insert(point.id.clone(), doc);
    }
    for segment in network.segments() {
        document.segments.insert(
            segment.id.clone(),
            SegmentDocument {
                id: segment.id.clone(),
                name: segment.name.clone(),
                from_point_id: segment.from_point_id.clone(),
                to_point_id: segment.to_point_id.clone(),
                capacity: segment.capacity.value(),
                length: segment.length.value(),
                diameter: segment.diameter.value(),
                friction_factor: segment.friction_factor,
                transportation_cost: segment.transportation_cost,
                current_flow: segment.current_flow.value(),
                is_active: segment.is_active,
                is_bidirectional: segment.is_bidirectional,
                min_flow: segment.min_flow.value(),
            },
        );
    }
    document
}

/// Network as a pretty-printed JSON string.
pub fn network_to_json(network: &Network) -> GasNetResult<String> {
    serde_json::to_string_pretty(&network_to_document(network))
        .map_err(|err| GasNetError::Serialize(err.to_string()))
}

/// Write a network configuration file.
pub fn save_network(network: &Network, path: &Path) -> GasNetResult<()> {
    let json = network_to_json(network)?;
    fs::write(path, json).map_err(|source| GasNetError::io(path.display().to_string(), source))
}

/// Write any serializable result object as pretty JSON.
pub fn write_result<T: serde::Serialize>(value: &T, path: &Path) -> GasNetResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| GasNetError::Serialize(err.to_string()))?;
    fs::write(path, json).map_err(|source| GasNetError::io(path.display().to_string(), source))
}
