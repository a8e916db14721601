//! Command-line argument definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gasnet",
    about = "Capacity planning and flow optimization for gas pipeline networks",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one optimization algorithm on a network configuration
    Optimize(OptimizeArgs),
    /// Validate a network configuration and report every issue found
    Validate {
        /// Network configuration file (JSON)
        config: PathBuf,
    },
    /// Trace demand upstream and report required segment flows
    Trace {
        /// Network configuration file (JSON)
        config: PathBuf,
        /// Write the trace report as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print network statistics and topology information
    Info {
        /// Network configuration file (JSON)
        config: PathBuf,
    },
    /// Export the network topology (graphviz)
    Graph {
        /// Network configuration file (JSON)
        config: PathBuf,
        /// Output format (dot)
        #[arg(long, default_value = "dot")]
        format: String,
    },
    /// Run several algorithms on one network and tabulate the results
    Compare(CompareArgs),
    /// Tabulate previously saved optimization results
    Report {
        /// Result files written by `optimize --output` or `scenarios`
        #[arg(required = true)]
        results: Vec<PathBuf>,
    },
    /// Materialize scenarios and run an algorithm across them in parallel
    Scenarios(ScenariosArgs),
    /// List registered algorithms and their parameters
    Algorithms,
}

#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Network configuration file (JSON)
    pub config: PathBuf,
    /// Algorithm to run
    #[arg(long, short, default_value = "maximize-throughput")]
    pub algorithm: String,
    /// LP back-end ("simplex", "clarabel")
    #[arg(long)]
    pub solver: Option<String>,
    /// Include pressure constraints
    #[arg(long)]
    pub pressure: bool,
    /// Include compressor station constraints
    #[arg(long)]
    pub compressors: bool,
    /// Solver wall-clock cap in seconds
    #[arg(long)]
    pub time_limit: Option<u64>,
    /// Piecewise-linear interval count (1..=100)
    #[arg(long)]
    pub segments: Option<usize>,
    /// Algorithm parameter, repeatable (key=value)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
    /// Write the full result JSON to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Network configuration file (JSON)
    pub config: PathBuf,
    /// Comma-separated algorithm names (default: all registered)
    #[arg(long)]
    pub algorithms: Option<String>,
    /// Include pressure constraints
    #[arg(long)]
    pub pressure: bool,
    /// Include compressor station constraints
    #[arg(long)]
    pub compressors: bool,
}

#[derive(Args, Debug)]
pub struct ScenariosArgs {
    /// Network configuration file (JSON)
    pub config: PathBuf,
    /// Scenario set file (YAML or JSON)
    pub spec: PathBuf,
    /// Algorithm to run on every scenario
    #[arg(long, short, default_value = "minimize-cost")]
    pub algorithm: String,
    /// Output directory for materialized networks and results
    #[arg(long, default_value = "scenario-runs")]
    pub out: PathBuf,
    /// Worker threads (0 = auto)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimize_parse() {
        let cli = Cli::parse_from([
            "gasnet",
            "optimize",
            "net.json",
            "--algorithm",
            "minimize-cost",
            "--pressure",
            "--param",
            "cost.fuel_price=4.0",
        ]);
        match cli.command {
            Commands::Optimize(args) => {
                assert_eq!(args.algorithm, "minimize-cost");
                assert!(args.pressure);
                assert!(!args.compressors);
                assert_eq!(args.params, vec!["cost.fuel_price=4.0"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_report_requires_at_least_one_file() {
        assert!(Cli::try_parse_from(["gasnet", "report"]).is_err());
        let cli = Cli::parse_from(["gasnet", "report", "a.json", "b.json"]);
        match cli.command {
            Commands::Report { results } => assert_eq!(results.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_scenarios_defaults() {
        let cli = Cli::parse_from(["gasnet", "scenarios", "net.json", "set.yaml"]);
        match cli.command {
            Commands::Scenarios(args) => {
                assert_eq!(args.algorithm, "minimize-cost");
                assert_eq!(args.threads, 0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
