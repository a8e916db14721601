//! # gasnet-core: Gas Pipeline Network Modeling Core
//!
//! Provides the fundamental data structures for capacity planning and flow
//! optimization of directed gas transmission networks.
//!
//! ## Design Philosophy
//!
//! Networks are modeled as **directed graphs** where:
//! - **Points**: Receipt points (supply), Delivery points (demand), and
//!   Compressor stations
//! - **Segments**: directed pipes with a physical profile (length, diameter,
//!   friction) and a commercial one (capacity, transportation cost)
//!
//! The network owns points and segments by id in sorted maps; everything else
//! in the system refers to them through non-owning id lookups. Iteration over
//! either collection is id-sorted, which makes variable and constraint
//! construction deterministic across runs.
//!
//! Point kind is a tagged enum ([`PointKind`]), not a class hierarchy; code
//! that needs a kind-specific attribute matches on the tag.
//!
//! ## Quick Start
//!
//! ```rust
//! use gasnet_core::*;
//!
//! let mut network = Network::new("two-point");
//! network.add_point(
//!     Point::receipt("R1", "Receipt 1", Mmscfd(1000.0), 2.5)
//!         .with_pressure_window(Psia(800.0), Psia(1000.0)),
//! );
//! network.add_point(
//!     Point::delivery("D1", "Delivery 1", Mmscfd(600.0))
//!         .with_pressure_window(Psia(300.0), Psia(800.0)),
//! );
//! network.add_segment(
//!     Segment::new("S1", "R1-D1", "R1", "D1", Mmscfd(800.0))
//!         .with_profile(Miles(50.0), Inches(36.0), 0.015)
//!         .with_transportation_cost(0.10),
//! );
//! network.finalize();
//!
//! let mut diag = Diagnostics::new();
//! network.validate_into(&mut diag);
//! assert!(!diag.has_errors());
//! ```
//!
//! ## Modules
//!
//! - [`diagnostics`] - Validation and diagnostic reporting
//! - [`gas`] - Steady-state gas flow relations and linearization helpers
//! - [`graph_utils`] - Topological analysis (connectivity, islands, trunks)
//! - [`solver`] - LP/MIP back-end abstraction and registry
//! - [`units`] - Unit-safe newtypes (MMscfd, psia, miles, inches)
//!
//! ## Integration with gasnet-io
//!
//! The gasnet-io crate loads the JSON network configuration format and
//! constructs [`Network`] values from it, recomputing each segment's
//! [`Segment::pressure_drop_constant`] after load.

use std::collections::BTreeMap;

pub mod diagnostics;
pub mod error;
pub mod gas;
pub mod graph_utils;
pub mod solver;
pub mod units;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GasNetError, GasNetResult};
pub use graph_utils::*;
pub use solver::{ConstraintId, LpBackend, SolveStatus, SolverKind, VarId};
pub use units::{Inches, Miles, Mmscfd, Psi, Psia};

/// Kind-specific attributes of a network point.
///
/// The variant tag is the single source of truth for what a point is;
/// branches on the tag select the relevant attribute subset.
#[derive(Debug, Clone, PartialEq)]
pub enum PointKind {
    /// Supply source injecting gas into the network
    Receipt {
        /// Maximum deliverable supply (MMscfd)
        supply_capacity: Mmscfd,
        /// Commodity cost of supplied gas ($/MMscf)
        unit_cost: f64,
    },
    /// Demand sink absorbing gas from the network
    Delivery {
        /// Contracted demand (MMscfd)
        demand_requirement: Mmscfd,
    },
    /// Station that may boost downstream pressure, burning fuel gas
    Compressor {
        /// Maximum discharge-minus-suction boost (psi)
        max_pressure_boost: Psi,
        /// Fuel burned per unit of throughput (MMscf per MMscfd)
        fuel_consumption_rate: f64,
    },
}

impl PointKind {
    /// Short label for reports ("receipt", "delivery", "compressor")
    pub fn label(&self) -> &'static str {
        match self {
            PointKind::Receipt { .. } => "receipt",
            PointKind::Delivery { .. } => "delivery",
            PointKind::Compressor { .. } => "compressor",
        }
    }
}

/// A node in the pipeline network.
#[derive(Debug, Clone)]
pub struct Point {
    /// Stable string id; the key in [`Network`]
    pub id: String,
    /// Display name
    pub name: String,
    /// Receipt / Delivery / Compressor attributes
    pub kind: PointKind,
    /// Map coordinate (informational)
    pub x: f64,
    /// Map coordinate (informational)
    pub y: f64,
    /// Inactive points are excluded from optimization
    pub is_active: bool,
    /// Lower bound of the operating pressure window
    pub min_pressure: Psia,
    /// Upper bound of the operating pressure window
    pub max_pressure: Psia,
    /// Observed or initial pressure
    pub current_pressure: Psia,
}

impl Point {
    fn base(id: &str, name: &str, kind: PointKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            x: 0.0,
            y: 0.0,
            is_active: true,
            min_pressure: Psia(0.0),
            max_pressure: Psia(1500.0),
            current_pressure: Psia(0.0),
        }
    }

    /// Create a receipt point with the given supply capacity and unit cost
    pub fn receipt(id: &str, name: &str, supply_capacity: Mmscfd, unit_cost: f64) -> Self {
        Self::base(
            id,
            name,
            PointKind::Receipt {
                supply_capacity,
                unit_cost,
            },
        )
    }

    /// Create a delivery point with the given demand requirement
    pub fn delivery(id: &str, name: &str, demand_requirement: Mmscfd) -> Self {
        Self::base(id, name, PointKind::Delivery { demand_requirement })
    }

    /// Create a compressor station with the given boost limit and fuel rate
    pub fn compressor(
        id: &str,
        name: &str,
        max_pressure_boost: Psi,
        fuel_consumption_rate: f64,
    ) -> Self {
        Self::base(
            id,
            name,
            PointKind::Compressor {
                max_pressure_boost,
                fuel_consumption_rate,
            },
        )
    }

    /// Set the operating pressure window
    pub fn with_pressure_window(mut self, min: Psia, max: Psia) -> Self {
        self.min_pressure = min;
        self.max_pressure = max;
        self
    }

    /// Set the observed/initial pressure
    pub fn with_current_pressure(mut self, pressure: Psia) -> Self {
        self.current_pressure = pressure;
        self
    }

    /// Set map coordinates
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Mark the point inactive
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Supply capacity if this is a receipt point
    pub fn supply_capacity(&self) -> Option<Mmscfd> {
        match self.kind {
            PointKind::Receipt {
                supply_capacity, ..
            } => Some(supply_capacity),
            _ => None,
        }
    }

    /// Demand requirement if this is a delivery point
    pub fn demand_requirement(&self) -> Option<Mmscfd> {
        match self.kind {
            PointKind::Delivery { demand_requirement } => Some(demand_requirement),
            _ => None,
        }
    }

    /// Maximum boost if this is a compressor station
    pub fn max_pressure_boost(&self) -> Option<Psi> {
        match self.kind {
            PointKind::Compressor {
                max_pressure_boost, ..
            } => Some(max_pressure_boost),
            _ => None,
        }
    }

    /// Fuel rate if this is a compressor station
    pub fn fuel_consumption_rate(&self) -> Option<f64> {
        match self.kind {
            PointKind::Compressor {
                fuel_consumption_rate,
                ..
            } => Some(fuel_consumption_rate),
            _ => None,
        }
    }

    /// Supply unit cost if this is a receipt point
    pub fn unit_cost(&self) -> Option<f64> {
        match self.kind {
            PointKind::Receipt { unit_cost, .. } => Some(unit_cost),
            _ => None,
        }
    }

    pub fn is_receipt(&self) -> bool {
        matches!(self.kind, PointKind::Receipt { .. })
    }

    pub fn is_delivery(&self) -> bool {
        matches!(self.kind, PointKind::Delivery { .. })
    }

    pub fn is_compressor(&self) -> bool {
        matches!(self.kind, PointKind::Compressor { .. })
    }
}

/// A directed pipe segment between two points.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Stable string id; the key in [`Network`]
    pub id: String,
    /// Display name
    pub name: String,
    /// Upstream endpoint id
    pub from_point_id: String,
    /// Downstream endpoint id
    pub to_point_id: String,
    /// Maximum flow (MMscfd)
    pub capacity: Mmscfd,
    /// Minimum flow; `-capacity` for bidirectional segments
    pub min_flow: Mmscfd,
    /// Whether reverse flow is allowed
    pub is_bidirectional: bool,
    /// Pipe length (miles)
    pub length: Miles,
    /// Internal diameter (inches)
    pub diameter: Inches,
    /// Darcy friction factor
    pub friction_factor: f64,
    /// Shipping tariff ($/MMscf)
    pub transportation_cost: f64,
    /// Observed flow (informational)
    pub current_flow: Mmscfd,
    /// Inactive segments are excluded from optimization
    pub is_active: bool,
    /// Derived: `k = friction · length / (diameter⁵ · 1000)`.
    /// Recomputed by [`Network::finalize`]; never an input of record.
    pub pressure_drop_constant: f64,
}

impl Segment {
    /// Create a segment with a default physical profile
    pub fn new(id: &str, name: &str, from: &str, to: &str, capacity: Mmscfd) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            from_point_id: from.to_string(),
            to_point_id: to.to_string(),
            capacity,
            min_flow: Mmscfd(0.0),
            is_bidirectional: false,
            length: Miles(1.0),
            diameter: Inches(24.0),
            friction_factor: 0.015,
            transportation_cost: 0.0,
            current_flow: Mmscfd(0.0),
            is_active: true,
            pressure_drop_constant: 0.0,
        }
    }

    /// Set the physical profile (length, diameter, friction factor)
    pub fn with_profile(mut self, length: Miles, diameter: Inches, friction_factor: f64) -> Self {
        self.length = length;
        self.diameter = diameter;
        self.friction_factor = friction_factor;
        self
    }

    /// Set the shipping tariff
    pub fn with_transportation_cost(mut self, cost: f64) -> Self {
        self.transportation_cost = cost;
        self
    }

    /// Set a minimum flow requirement
    pub fn with_min_flow(mut self, min_flow: Mmscfd) -> Self {
        self.min_flow = min_flow;
        self
    }

    /// Allow reverse flow; the lower flow bound becomes `-capacity`
    pub fn bidirectional(mut self) -> Self {
        self.is_bidirectional = true;
        self.min_flow = -self.capacity;
        self
    }

    /// Mark the segment inactive
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Lower flow bound honoring the bidirectional flag
    pub fn lower_flow_bound(&self) -> Mmscfd {
        if self.is_bidirectional {
            -self.capacity
        } else {
            self.min_flow
        }
    }

    /// Recompute the derived squared-pressure drop constant
    pub fn recompute_pressure_drop_constant(&mut self) {
        self.pressure_drop_constant =
            gas::pressure_drop_constant(self.friction_factor, self.length, self.diameter);
    }

    /// Utilization of this segment for a given flow, in percent
    pub fn utilization_pct(&self, flow: Mmscfd) -> f64 {
        if self.capacity.value() <= 0.0 {
            return 0.0;
        }
        flow.abs() / self.capacity * 100.0
    }
}

/// The pipeline network: points and segments owned by id.
///
/// Constructed once (from configuration or the builder methods), validated,
/// then treated as immutable during an optimization run. Scenario analysis
/// clones the network and mutates the copy.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub name: String,
    pub description: String,
    points: BTreeMap<String, Point>,
    segments: BTreeMap<String, Segment>,
}

impl Network {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            points: BTreeMap::new(),
            segments: BTreeMap::new(),
        }
    }

    /// Insert a point, replacing any existing point with the same id
    pub fn add_point(&mut self, point: Point) {
        self.points.insert(point.id.clone(), point);
    }

    /// Insert a segment, replacing any existing segment with the same id
    pub fn add_segment(&mut self, segment: Segment) {
        self.segments.insert(segment.id.clone(), segment);
    }

    /// Look up a point by id
    pub fn point(&self, id: &str) -> Option<&Point> {
        self.points.get(id)
    }

    /// Look up a segment by id
    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments.get(id)
    }

    /// Mutable point lookup (scenario application)
    pub fn point_mut(&mut self, id: &str) -> Option<&mut Point> {
        self.points.get_mut(id)
    }

    /// Mutable segment lookup (scenario application)
    pub fn segment_mut(&mut self, id: &str) -> Option<&mut Segment> {
        self.segments.get_mut(id)
    }

    /// All points in id order
    pub fn points(&self) -> impl Iterator<Item = &Point> {
        self.points.values()
    }

    /// All segments in id order
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    /// Active points in id order
    pub fn active_points(&self) -> impl Iterator<Item = &Point> {
        self.points.values().filter(|p| p.is_active)
    }

    /// Active segments in id order
    pub fn active_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values().filter(|s| s.is_active)
    }

    /// Active receipt points in id order
    pub fn active_receipts(&self) -> impl Iterator<Item = &Point> {
        self.active_points().filter(|p| p.is_receipt())
    }

    /// Active delivery points in id order
    pub fn active_deliveries(&self) -> impl Iterator<Item = &Point> {
        self.active_points().filter(|p| p.is_delivery())
    }

    /// Active compressor stations in id order
    pub fn active_compressors(&self) -> impl Iterator<Item = &Point> {
        self.active_points().filter(|p| p.is_compressor())
    }

    /// Active segments whose endpoints are both active points.
    ///
    /// Deactivating a point takes its incident segments out of service even
    /// when the segments' own flags are still set.
    pub fn operational_segments(&self) -> impl Iterator<Item = &Segment> {
        self.active_segments().filter(|s| {
            self.points
                .get(&s.from_point_id)
                .map(|p| p.is_active)
                .unwrap_or(false)
                && self
                    .points
                    .get(&s.to_point_id)
                    .map(|p| p.is_active)
                    .unwrap_or(false)
        })
    }

    /// Operational segments entering the given point
    pub fn incoming(&self, point_id: &str) -> Vec<&Segment> {
        self.operational_segments()
            .filter(|s| s.to_point_id == point_id)
            .collect()
    }

    /// Operational segments leaving the given point
    pub fn outgoing(&self, point_id: &str) -> Vec<&Segment> {
        self.operational_segments()
            .filter(|s| s.from_point_id == point_id)
            .collect()
    }

    /// Total supply capacity over active receipts
    pub fn total_supply_capacity(&self) -> Mmscfd {
        self.active_receipts()
            .filter_map(|p| p.supply_capacity())
            .sum()
    }

    /// Total demand requirement over active deliveries
    pub fn total_demand(&self) -> Mmscfd {
        self.active_deliveries()
            .filter_map(|p| p.demand_requirement())
            .sum()
    }

    /// Recompute derived segment quantities. Call after construction or any
    /// mutation of segment geometry.
    pub fn finalize(&mut self) {
        for segment in self.segments.values_mut() {
            segment.recompute_pressure_drop_constant();
            if segment.is_bidirectional {
                segment.min_flow = -segment.capacity;
            }
        }
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();
        for point in self.points.values() {
            match &point.kind {
                PointKind::Receipt {
                    supply_capacity, ..
                } => {
                    stats.num_receipts += 1;
                    if point.is_active {
                        stats.total_supply_capacity += *supply_capacity;
                    }
                }
                PointKind::Delivery { demand_requirement } => {
                    stats.num_deliveries += 1;
                    if point.is_active {
                        stats.total_demand += *demand_requirement;
                    }
                }
                PointKind::Compressor { .. } => stats.num_compressors += 1,
            }
        }
        stats.num_segments = self.segments.len();
        stats.num_active_segments = self.segments.values().filter(|s| s.is_active).count();
        stats.total_segment_capacity = self
            .segments
            .values()
            .filter(|s| s.is_active)
            .map(|s| s.capacity)
            .sum();
        stats
    }

    /// Supply margin: (supply - demand) / demand over active points
    pub fn supply_margin(&self) -> f64 {
        let demand = self.total_demand();
        if demand.value().abs() < 1e-9 {
            return f64::INFINITY;
        }
        (self.total_supply_capacity() - demand) / demand
    }

    /// Validate network data for issues that make optimization meaningless.
    ///
    /// Populates the provided `Diagnostics` with every problem found; the
    /// caller decides whether errors are fatal.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        if self.points.is_empty() {
            diag.add_error("structure", "Network has no points");
            return; // Can't check further
        }

        // Per-point range checks
        for point in self.points.values() {
            let entity = format!("Point {}", point.id);
            if point.min_pressure.value() < 0.0 {
                diag.add_error_with_entity("range", "minimum pressure must be >= 0", &entity);
            }
            if point.max_pressure <= point.min_pressure {
                diag.add_error_with_entity(
                    "range",
                    "pressure window is empty (max <= min)",
                    &entity,
                );
            }
            match &point.kind {
                PointKind::Receipt {
                    supply_capacity,
                    unit_cost,
                } => {
                    if supply_capacity.value() <= 0.0 {
                        diag.add_error_with_entity(
                            "range",
                            "supply capacity must be positive",
                            &entity,
                        );
                    }
                    if *unit_cost < 0.0 {
                        diag.add_error_with_entity("range", "unit cost must be >= 0", &entity);
                    }
                }
                PointKind::Delivery { demand_requirement } => {
                    if demand_requirement.value() <= 0.0 {
                        diag.add_error_with_entity(
                            "range",
                            "demand requirement must be positive",
                            &entity,
                        );
                    }
                }
                PointKind::Compressor {
                    max_pressure_boost,
                    fuel_consumption_rate,
                } => {
                    if max_pressure_boost.value() <= 0.0 {
                        diag.add_error_with_entity(
                            "range",
                            "maximum pressure boost must be positive",
                            &entity,
                        );
                    }
                    if *fuel_consumption_rate < 0.0 {
                        diag.add_error_with_entity(
                            "range",
                            "fuel consumption rate must be >= 0",
                            &entity,
                        );
                    }
                }
            }
        }

        // Per-segment checks: endpoint references and value ranges
        for segment in self.segments.values() {
            let entity = format!("Segment {}", segment.id);
            if !self.points.contains_key(&segment.from_point_id) {
                diag.add_error_with_entity(
                    "reference",
                    &format!("from-point '{}' does not exist", segment.from_point_id),
                    &entity,
                );
            }
            if !self.points.contains_key(&segment.to_point_id) {
                diag.add_error_with_entity(
                    "reference",
                    &format!("to-point '{}' does not exist", segment.to_point_id),
                    &entity,
                );
            }
            if segment.from_point_id == segment.to_point_id {
                diag.add_error_with_entity("reference", "segment endpoints must differ", &entity);
            }
            if segment.capacity.value() <= 0.0 {
                diag.add_error_with_entity("range", "capacity must be positive", &entity);
            }
            if segment.length.value() <= 0.0 {
                diag.add_error_with_entity("range", "length must be positive", &entity);
            }
            if segment.diameter.value() <= 0.0 {
                diag.add_error_with_entity("range", "diameter must be positive", &entity);
            }
            if segment.friction_factor <= 0.0 {
                diag.add_error_with_entity("range", "friction factor must be positive", &entity);
            }
            if segment.transportation_cost < 0.0 {
                diag.add_error_with_entity(
                    "range",
                    "transportation cost must be >= 0",
                    &entity,
                );
            }
            if !segment.is_bidirectional && segment.min_flow.value() < 0.0 {
                diag.add_error_with_entity(
                    "range",
                    "minimum flow must be >= 0 on a directed segment",
                    &entity,
                );
            }
        }

        // Structural checks over active elements
        let num_receipts = self.active_receipts().count();
        let num_deliveries = self.active_deliveries().count();
        if num_receipts == 0 {
            diag.add_error("structure", "Network has no active receipt points");
        }
        if num_deliveries == 0 {
            diag.add_error("structure", "Network has no active delivery points");
        }

        let supply = self.total_supply_capacity();
        let demand = self.total_demand();
        if supply < demand {
            diag.add_error(
                "capacity",
                &format!(
                    "Total supply capacity ({:.1} MMscfd) is less than total demand ({:.1} MMscfd)",
                    supply.value(),
                    demand.value()
                ),
            );
        }

        if self.segments.is_empty() && self.points.len() > 1 {
            diag.add_error("structure", "Network has multiple points but no segments");
        }

        // Reachability: a delivery no receipt can reach is a latent
        // infeasibility worth flagging early
        for delivery_id in graph_utils::unreachable_deliveries(self) {
            diag.add_warning_with_entity(
                "structure",
                "no active receipt can reach this delivery",
                &format!("Point {}", delivery_id),
            );
        }
    }
}

/// Statistics about a network's size and balance
#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub num_receipts: usize,
    pub num_deliveries: usize,
    pub num_compressors: usize,
    pub num_segments: usize,
    pub num_active_segments: usize,
    pub total_supply_capacity: Mmscfd,
    pub total_demand: Mmscfd,
    pub total_segment_capacity: Mmscfd,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} receipts ({:.0} MMscfd), {} deliveries ({:.0} MMscfd), {} compressors, {} segments",
            self.num_receipts,
            self.total_supply_capacity.value(),
            self.num_deliveries,
            self.total_demand.value(),
            self.num_compressors,
            self.num_segments,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_network() -> Network {
        let mut network = Network::new("sample");
        network.add_point(
            Point::receipt("R1", "Receipt 1", Mmscfd(1000.0), 2.5)
                .with_pressure_window(Psia(800.0), Psia(1000.0)),
        );
        network.add_point(
            Point::delivery("D1", "Delivery 1", Mmscfd(600.0))
                .with_pressure_window(Psia(300.0), Psia(800.0)),
        );
        network.add_point(
            Point::compressor("C1", "Compressor 1", Psi(400.0), 0.02)
                .with_pressure_window(Psia(300.0), Psia(1200.0)),
        );
        network.add_segment(
            Segment::new("S1", "R1-C1", "R1", "C1", Mmscfd(800.0))
                .with_profile(Miles(50.0), Inches(36.0), 0.015)
                .with_transportation_cost(0.10),
        );
        network.add_segment(
            Segment::new("S2", "C1-D1", "C1", "D1", Mmscfd(600.0))
                .with_profile(Miles(30.0), Inches(24.0), 0.018)
                .with_transportation_cost(0.12),
        );
        network.finalize();
        network
    }

    #[test]
    fn test_network_creation_and_lookup() {
        let network = sample_network();
        assert_eq!(network.points().count(), 3);
        assert_eq!(network.segments().count(), 2);
        assert!(network.point("R1").unwrap().is_receipt());
        assert!(network.point("C1").unwrap().is_compressor());
        assert_eq!(network.segment("S1").unwrap().to_point_id, "C1");
    }

    #[test]
    fn test_adjacency_queries() {
        let network = sample_network();
        let incoming = network.incoming("C1");
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].id, "S1");
        let outgoing = network.outgoing("C1");
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].id, "S2");
        assert!(network.incoming("R1").is_empty());
    }

    #[test]
    fn test_finalize_computes_drop_constant() {
        let network = sample_network();
        let s1 = network.segment("S1").unwrap();
        let expected = 0.015 * 50.0 / (36.0_f64.powi(5) * 1000.0);
        assert!((s1.pressure_drop_constant - expected).abs() < 1e-18);
    }

    #[test]
    fn test_bidirectional_min_flow() {
        let mut network = Network::new("bidi");
        network.add_segment(
            Segment::new("S1", "A-B", "A", "B", Mmscfd(500.0)).bidirectional(),
        );
        network.finalize();
        let s = network.segment("S1").unwrap();
        assert_eq!(s.lower_flow_bound().value(), -500.0);
    }

    #[test]
    fn test_totals_and_margin() {
        let network = sample_network();
        assert_eq!(network.total_supply_capacity().value(), 1000.0);
        assert_eq!(network.total_demand().value(), 600.0);
        let margin = network.supply_margin();
        assert!((margin - (1000.0 - 600.0) / 600.0).abs() < 1e-12);
    }

    #[test]
    fn test_validation_valid_network() {
        let network = sample_network();
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(!diag.has_errors(), "{diag}");
    }

    #[test]
    fn test_validation_dangling_endpoint() {
        let mut network = sample_network();
        network.add_segment(Segment::new("S9", "broken", "C1", "NOPE", Mmscfd(100.0)));
        network.finalize();
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(diag.has_errors());
        assert!(diag
            .errors()
            .any(|i| i.category == "reference" && i.message.contains("NOPE")));
    }

    #[test]
    fn test_validation_supply_deficit() {
        let mut network = sample_network();
        network.add_point(Point::delivery("D2", "Delivery 2", Mmscfd(900.0)));
        network.add_segment(Segment::new("S3", "C1-D2", "C1", "D2", Mmscfd(900.0)));
        network.finalize();
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(diag
            .errors()
            .any(|i| i.category == "capacity" && i.message.contains("less than total demand")));
    }

    #[test]
    fn test_validation_empty_pressure_window() {
        let mut network = sample_network();
        network.add_point(
            Point::delivery("D2", "Delivery 2", Mmscfd(1.0))
                .with_pressure_window(Psia(800.0), Psia(800.0)),
        );
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(diag
            .errors()
            .any(|i| i.message.contains("pressure window is empty")));
    }

    #[test]
    fn test_validation_missing_receipts() {
        let mut network = Network::new("empty-supply");
        network.add_point(Point::delivery("D1", "Delivery 1", Mmscfd(10.0)));
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(diag
            .errors()
            .any(|i| i.message.contains("no active receipt")));
    }

    #[test]
    fn test_deactivated_points_excluded_from_totals() {
        let mut network = sample_network();
        network.add_point(
            Point::receipt("R2", "Receipt 2", Mmscfd(500.0), 1.0).deactivated(),
        );
        assert_eq!(network.total_supply_capacity().value(), 1000.0);
        assert_eq!(network.active_receipts().count(), 1);
    }

    #[test]
    fn test_stats_display() {
        let stats = sample_network().stats();
        assert_eq!(stats.num_receipts, 1);
        assert_eq!(stats.num_deliveries, 1);
        assert_eq!(stats.num_compressors, 1);
        assert_eq!(stats.num_segments, 2);
        let rendered = stats.to_string();
        assert!(rendered.contains("1 receipts"));
        assert!(rendered.contains("compressors"));
    }

    #[test]
    fn test_utilization() {
        let network = sample_network();
        let s2 = network.segment("S2").unwrap();
        assert!((s2.utilization_pct(Mmscfd(300.0)) - 50.0).abs() < 1e-12);
        assert!((s2.utilization_pct(Mmscfd(-300.0)) - 50.0).abs() < 1e-12);
    }
}
