//! # gasnet-io: Network Configuration and Result I/O
//!
//! Loads the JSON network configuration format into `gasnet-core` networks
//! and writes networks and optimization results back out. The document
//! schema keeps camelCase field names; all numeric fields are double
//! precision. Each segment's pressure-drop constant is recomputed after
//! load, never trusted from the file.
//!
//! Configuration problems are aggregated: a malformed document reports every
//! dangling reference and out-of-range value it contains, not just the
//! first.

pub mod exporters;
pub mod importers;
pub mod schema;

pub use exporters::{network_to_json, save_network, write_result};
pub use importers::{load_network, parse_network};
pub use schema::{NetworkDocument, PointDocument, SegmentDocument};
