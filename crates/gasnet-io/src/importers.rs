//! JSON configuration import.

use std::fs;
use std::path::Path;

use gasnet_core::{
    Diagnostics, GasNetError, GasNetResult, Inches, Miles, Mmscfd, Network, Point, PointKind,
    Psi, Psia, Segment,
};

use crate::schema::{NetworkDocument, PointDocument, SegmentDocument};

/// Load a network configuration file.
pub fn load_network(path: &Path) -> GasNetResult<Network> {
    let data = fs::read_to_string(path)
        .map_err(|source| GasNetError::io(path.display().to_string(), source))?;
    parse_network(&data)
}

/// Parse a network configuration from a JSON string.
///
/// Structural JSON problems surface as `MalformedDocument`; semantic
/// problems (unknown point types, id mismatches) are aggregated into one
/// `InvalidConfiguration` error listing everything found. Range checks
/// beyond that are `Network::validate_into`'s job.
pub fn parse_network(json: &str) -> GasNetResult<Network> {
    let document: NetworkDocument = serde_json::from_str(json)
        .map_err(|err| GasNetError::MalformedDocument(err.to_string()))?;
    let mut diagnostics = Diagnostics::new();
    let network = convert_document(&document, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(GasNetError::InvalidConfiguration {
            issues: diagnostics.error_messages(),
        });
    }
    Ok(network)
}

fn convert_document(document: &NetworkDocument, diagnostics: &mut Diagnostics) -> Network {
    let mut network = Network::new(&document.name);
    network.description = document.description.clone();

    for (key, doc) in &document.points {
        if !doc.id.is_empty() && doc.id != *key {
            diagnostics.add_error_with_entity(
                "reference",
                &format!("point key '{key}' does not match its id '{}'", doc.id),
                &format!("Point {key}"),
            );
            continue;
        }
        match convert_point(key, doc) {
            Some(point) => network.add_point(point),
            None => diagnostics.add_error_with_entity(
                "parse",
                &format!("unknown point type '{}'", doc.kind),
                &format!("Point {key}"),
            ),
        }
    }

    for (key, doc) in &document.segments {
        if !doc.id.is_empty() && doc.id != *key {
            diagnostics.add_error_with_entity(
                "reference",
                &format!("segment key '{key}' does not match its id '{}'", doc.id),
                &format!("Segment {key}"),
            );
            continue;
        }
        network.add_segment(convert_segment(key, doc));
    }

    // Derived quantities are always recomputed, never read from the file
    network.finalize();
    network
}

fn convert_point(key: &str, doc: &PointDocument) -> Option<Point> {
    let kind = match doc.kind.as_str() {
        "Receipt" => PointKind::Receipt {
            supply_capacity: Mmscfd(doc.supply_capacity),
            unit_cost: doc.unit_cost,
        },
        "Delivery" => PointKind::Delivery {
            demand_requirement: Mmscfd(doc.demand_requirement),
        },
        "Compressor" => PointKind::Compressor {
            max_pressure_boost: Psi(doc.max_pressure_boost),
            fuel_consumption_rate: doc.fuel_consumption_rate,
        },
        _ => return None,
    };
    Some(Point {
        id: key.to_string(),
        name: if doc.name.is_empty() {
            key.to_string()
        } else {
            doc.name.clone()
        },
        kind,
        x: doc.x,
        y: doc.y,
        is_active: doc.is_active,
        min_pressure: Psia(doc.min_pressure),
        max_pressure: Psia(doc.max_pressure),
        current_pressure: Psia(doc.current_pressure),
    })
}

fn convert_segment(key: &str, doc: &SegmentDocument) -> Segment {
    Segment {
        id: key.to_string(),
        name: if doc.name.is_empty() {
            key.to_string()
        } else {
            doc.name.clone()
        },
        from_point_id: doc.from_point_id.clone(),
        to_point_id: doc.to_point_id.clone(),
        capacity: Mmscfd(doc.capacity),
        min_flow: Mmscfd(doc.min_flow),
        is_bidirectional: doc.is_bidirectional,
        length: Miles(doc.length),
        diameter: Inches(doc.diameter),
        friction_factor: doc.friction_factor,
        transportation_cost: doc.transportation_cost,
        current_flow: Mmscfd(doc.current_flow),
        is_active: doc.is_active,
        pressure_drop_constant: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "sample",
        "description": "three point chain",
        "points": {
            "R1": {"type": "Receipt", "supplyCapacity": 1000.0, "unitCost": 2.0,
                   "minPressure": 800.0, "maxPressure": 1000.0},
            "C1": {"type": "Compressor", "maxPressureBoost": 400.0,
                   "fuelConsumptionRate": 0.02, "minPressure": 300.0, "maxPressure": 1200.0},
            "D1": {"type": "Delivery", "demandRequirement": 600.0,
                   "minPressure": 300.0, "maxPressure": 800.0}
        },
        "segments": {
            "S1": {"fromPointId": "R1", "toPointId": "C1", "capacity": 800.0,
                   "length": 50.0, "diameter": 36.0, "frictionFactor": 0.015,
                   "transportationCost": 0.10},
            "S2": {"fromPointId": "C1", "toPointId": "D1", "capacity": 600.0,
                   "length": 30.0, "diameter": 24.0, "frictionFactor": 0.018,
                   "transportationCost": 0.12}
        }
    }"#;

    #[test]
    fn test_parse_sample() {
        let network = parse_network(SAMPLE).unwrap();
        assert_eq!(network.name, "sample");
        assert_eq!(network.points().count(), 3);
        assert_eq!(network.segments().count(), 2);
        let r1 = network.point("R1").unwrap();
        assert_eq!(r1.supply_capacity().unwrap().value(), 1000.0);
        assert_eq!(r1.min_pressure.value(), 800.0);
        let c1 = network.point("C1").unwrap();
        assert_eq!(c1.max_pressure_boost().unwrap().value(), 400.0);
    }

    #[test]
    fn test_drop_constant_recomputed() {
        let network = parse_network(SAMPLE).unwrap();
        let s1 = network.segment("S1").unwrap();
        let expected = 0.015 * 50.0 / (36.0_f64.powi(5) * 1000.0);
        assert!((s1.pressure_drop_constant - expected).abs() < 1e-18);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = parse_network("{not json").unwrap_err();
        assert!(matches!(err, GasNetError::MalformedDocument(_)));
    }

    #[test]
    fn test_unknown_type_aggregates() {
        let json = r#"{
            "name": "bad",
            "points": {
                "X1": {"type": "Storage"},
                "X2": {"type": "Wormhole"}
            }
        }"#;
        let err = parse_network(json).unwrap_err();
        let message = err.to_string();
        // Both offending points are reported in one pass
        assert!(message.contains("Storage"));
        assert!(message.contains("Wormhole"));
    }

    #[test]
    fn test_key_id_mismatch_rejected() {
        let json = r#"{
            "name": "bad",
            "points": {
                "R1": {"id": "R2", "type": "Receipt", "supplyCapacity": 1.0}
            }
        }"#;
        let err = parse_network(json).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_missing_name_falls_back_to_id() {
        let network = parse_network(SAMPLE).unwrap();
        assert_eq!(network.point("R1").unwrap().name, "R1");
        assert_eq!(network.segment("S1").unwrap().name, "S1");
    }
}
