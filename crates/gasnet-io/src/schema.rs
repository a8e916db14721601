//! Serde document types for the JSON network configuration format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level network document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkDocument {
    pub name: String,
    pub description: String,
    pub points: BTreeMap<String, PointDocument>,
    pub segments: BTreeMap<String, SegmentDocument>,
}

/// A point entry. Kind-specific fields are optional in the document; the
/// importer checks that the ones matching `type` are present and sane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PointDocument {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub is_active: bool,
    pub min_pressure: f64,
    pub max_pressure: f64,
    pub current_pressure: f64,
    pub supply_capacity: f64,
    pub demand_requirement: f64,
    pub max_pressure_boost: f64,
    pub fuel_consumption_rate: f64,
    pub unit_cost: f64,
}

impl Default for PointDocument {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            kind: String::new(),
            x: 0.0,
            y: 0.0,
            is_active: true,
            min_pressure: 0.0,
            max_pressure: 1500.0,
            current_pressure: 0.0,
            supply_capacity: 0.0,
            demand_requirement: 0.0,
            max_pressure_boost: 0.0,
            fuel_consumption_rate: 0.0,
            unit_cost: 0.0,
        }
    }
}

/// A segment entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SegmentDocument {
    pub id: String,
    pub name: String,
    pub from_point_id: String,
    pub to_point_id: String,
    pub capacity: f64,
    pub length: f64,
    pub diameter: f64,
    pub friction_factor: f64,
    pub transportation_cost: f64,
    pub current_flow: f64,
    pub is_active: bool,
    pub is_bidirectional: bool,
    pub min_flow: f64,
}

impl Default for SegmentDocument {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            from_point_id: String::new(),
            to_point_id: String::new(),
            capacity: 0.0,
            length: 1.0,
            diameter: 24.0,
            friction_factor: 0.015,
            transportation_cost: 0.0,
            current_flow: 0.0,
            is_active: true,
            is_bidirectional: false,
            min_flow: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_defaults_apply() {
        let doc: PointDocument =
            serde_json::from_str(r#"{"id":"R1","name":"R1","type":"Receipt"}"#).unwrap();
        assert!(doc.is_active);
        assert_eq!(doc.max_pressure, 1500.0);
        assert_eq!(doc.kind, "Receipt");
    }

    #[test]
    fn test_camel_case_names() {
        let doc: SegmentDocument = serde_json::from_str(
            r#"{"id":"S1","fromPointId":"A","toPointId":"B","capacity":10.0,
                "frictionFactor":0.02,"isBidirectional":true,"minFlow":-10.0}"#,
        )
        .unwrap();
        assert_eq!(doc.from_point_id, "A");
        assert_eq!(doc.friction_factor, 0.02);
        assert!(doc.is_bidirectional);
        assert_eq!(doc.min_flow, -10.0);
    }
}
