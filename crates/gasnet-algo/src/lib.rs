//! # gasnet-algo: Optimization Algorithms for Pipeline Capacity Planning
//!
//! This crate provides the optimization engine for gas pipeline networks:
//! three objectives, each with a mathematical-programming formulation over
//! the `gasnet-core` solver abstraction and a pure graph-algorithmic
//! fallback.
//!
//! | Algorithm | Solver strategy | Graph strategy |
//! |-----------|-----------------|----------------|
//! | `maximize-throughput` | LP over segment flows | greedy augmenting paths |
//! | `minimize-cost` | LP with explicit cost variables | successive cheapest paths |
//! | `balance-demand` | LP with utilization deviations | equal-share multi-path |
//!
//! ## Architecture
//!
//! - **[`OptimizationAlgorithm`]**: the uniform contract (name, description,
//!   parameters, `can_handle`, `optimize`)
//! - **[`AlgorithmRegistry`]**: lookup by name; extendable by embedders
//! - **[`OptimizationEngine`]**: the facade — input validation, dispatch,
//!   post-solution validation, comparison and scenario batches
//! - **[`pressure`]** / **[`compressor`]**: the squared-pressure and
//!   compressor constraint families shared by all solver formulations
//! - **[`tracer`]**: upstream demand propagation, a fast feasibility check
//!   independent of any optimizer
//!
//! Both strategies produce the same [`OptimizationResult`]; the engine
//! cross-validates either against the physical constraints before handing it
//! out.
//!
//! ## Example
//!
//! ```ignore
//! use gasnet_algo::{OptimizationEngine, OptimizationSettings};
//!
//! let engine = OptimizationEngine::new();
//! let result = engine.optimize("minimize-cost", &network, &OptimizationSettings::default());
//! println!("{}: ${:.2}", result.status, result.objective_value);
//! ```

pub mod algorithms;
pub mod backends;
pub mod compressor;
pub mod engine;
pub mod error;
pub mod model;
pub mod paths;
pub mod pressure;
pub mod result;
pub mod settings;
pub mod tracer;
pub mod validation;

pub use algorithms::{
    AlgorithmRegistry, BalanceDemand, MaximizeThroughput, MinimizeCost, OptimizationAlgorithm,
};
pub use backends::register_builtin_backends;
pub use compressor::{plan_stages, CompressionStage, CompressorParams};
pub use engine::OptimizationEngine;
pub use error::EngineError;
pub use result::{
    CostBreakdown, NetworkMetrics, OptimizationResult, PointPressureRecord, SegmentFlowRecord,
    Status,
};
pub use settings::OptimizationSettings;
pub use tracer::{trace_upstream, TraceReport};
pub use validation::{validate_solution, ViolationMetrics};
