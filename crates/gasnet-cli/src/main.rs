use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use gasnet_algo::{
    trace_upstream, OptimizationEngine, OptimizationResult, OptimizationSettings, Status,
};
use gasnet_batch::{run_batch, BatchJob, BatchRunnerConfig};
use gasnet_cli::cli::{Cli, Commands, CompareArgs, OptimizeArgs, ScenariosArgs};
use gasnet_core::{graph_utils, Diagnostics};
use gasnet_io::{load_network, write_result};
use gasnet_scenarios::{load_spec_from_path, materialize_scenarios, resolve_scenarios};
use tabwriter::TabWriter;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Optimize(args) => cmd_optimize(args),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Trace { config, output } => cmd_trace(&config, output.as_deref()),
        Commands::Info { config } => cmd_info(&config),
        Commands::Graph { config, format } => cmd_graph(&config, &format),
        Commands::Compare(args) => cmd_compare(args),
        Commands::Report { results } => cmd_report(&results),
        Commands::Scenarios(args) => cmd_scenarios(args),
        Commands::Algorithms => cmd_algorithms(),
    }
}

fn settings_from_flags(
    solver: Option<&str>,
    pressure: bool,
    compressors: bool,
    time_limit: Option<u64>,
    segments: Option<usize>,
    params: &[String],
) -> anyhow::Result<OptimizationSettings> {
    let mut settings = OptimizationSettings {
        enable_pressure_constraints: pressure,
        enable_compressor_stations: compressors,
        ..OptimizationSettings::default()
    };
    if let Some(solver) = solver {
        settings.preferred_solver = solver.to_string();
    }
    if let Some(seconds) = time_limit {
        settings.max_solution_time_seconds = seconds;
    }
    if let Some(segments) = segments {
        settings.linear_approximation_segments = segments;
    }
    for param in params {
        let (key, value) = param
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("parameter '{param}' is not KEY=VALUE"))?;
        settings
            .algorithm_parameters
            .insert(key.to_string(), value.to_string());
    }
    Ok(settings)
}

fn cmd_optimize(args: OptimizeArgs) -> anyhow::Result<ExitCode> {
    let network = load_network(&args.config)?;
    let settings = settings_from_flags(
        args.solver.as_deref(),
        args.pressure,
        args.compressors,
        args.time_limit,
        args.segments,
        &args.params,
    )?;

    let engine = OptimizationEngine::new();
    info!(algorithm = %args.algorithm, network = %network.name, "optimizing");
    let result = engine.optimize(&args.algorithm, &network, &settings);

    println!("network:    {}", network.name);
    println!("algorithm:  {}", result.algorithm);
    println!("solver:     {}", result.solver);
    println!("status:     {}", result.status);
    println!("objective:  {:.4}", result.objective_value);
    println!(
        "throughput: {:.2} MMscfd (demand {:.2}/{:.2})",
        result.metrics.total_throughput,
        result.metrics.demand_satisfied,
        result.metrics.demand_required
    );
    println!("total cost: ${:.2}", result.costs.total());
    if !result.segment_flows.is_empty() {
        let mut tw = TabWriter::new(vec![]);
        writeln!(tw, "segment\tflow\tcapacity\tutil %")?;
        for (id, record) in &result.segment_flows {
            writeln!(
                tw,
                "{id}\t{:.2}\t{:.2}\t{:.1}",
                record.flow, record.capacity, record.utilization_pct
            )?;
        }
        tw.flush()?;
        println!("{}", String::from_utf8(tw.into_inner()?)?);
    }
    for message in &result.messages {
        println!("note: {message}");
    }
    for violation in &result.validation_errors {
        eprintln!("validation: {violation}");
    }

    if let Some(output) = &args.output {
        write_result(&result, output)?;
        println!("result written to {}", output.display());
    }

    Ok(exit_code_for(result.status, &result.validation_errors))
}

fn cmd_validate(config: &Path) -> anyhow::Result<ExitCode> {
    let network = load_network(config)?;
    let mut diagnostics = Diagnostics::new();
    network.validate_into(&mut diagnostics);
    print!("{diagnostics}");
    if diagnostics.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        println!("network '{}' is valid ({})", network.name, network.stats());
        Ok(ExitCode::SUCCESS)
    }
}

fn cmd_trace(config: &Path, output: Option<&Path>) -> anyhow::Result<ExitCode> {
    let network = load_network(config)?;
    let report = trace_upstream(&network);

    let mut tw = TabWriter::new(vec![]);
    writeln!(tw, "segment\trequired flow\tcapacity")?;
    for (id, flow) in &report.segment_required_flows {
        let capacity = network
            .segment(id)
            .map(|s| s.capacity.value())
            .unwrap_or(0.0);
        writeln!(tw, "{id}\t{flow:.2}\t{capacity:.2}")?;
    }
    tw.flush()?;
    println!("{}", String::from_utf8(tw.into_inner()?)?);
    for violation in &report.capacity_violations {
        eprintln!("violation: {violation}");
    }
    println!(
        "network feasible: {}",
        if report.is_network_feasible { "yes" } else { "no" }
    );

    if let Some(output) = output {
        write_result(&report, output)?;
    }
    Ok(if report.is_network_feasible {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_info(config: &Path) -> anyhow::Result<ExitCode> {
    let network = load_network(config)?;
    println!("network:     {}", network.name);
    if !network.description.is_empty() {
        println!("description: {}", network.description);
    }
    println!("elements:    {}", network.stats());
    let stats = graph_utils::graph_stats(&network);
    println!(
        "topology:    {} nodes, {} arcs, {} component(s), max degree {}",
        stats.node_count, stats.edge_count, stats.weakly_connected_components, stats.max_degree
    );
    let trunks = graph_utils::trunk_segments(&network, 0.9);
    if !trunks.is_empty() {
        println!("trunks:      {}", trunks.join(", "));
    }
    let unreachable = graph_utils::unreachable_deliveries(&network);
    if !unreachable.is_empty() {
        println!("unreachable: {}", unreachable.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_graph(config: &Path, format: &str) -> anyhow::Result<ExitCode> {
    let network = load_network(config)?;
    print!("{}", graph_utils::export_graph(&network, format)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_compare(args: CompareArgs) -> anyhow::Result<ExitCode> {
    let network = load_network(&args.config)?;
    let settings = settings_from_flags(
        None,
        args.pressure,
        args.compressors,
        None,
        None,
        &[],
    )?;
    let engine = OptimizationEngine::new();
    let names: Vec<String> = match &args.algorithms {
        Some(spec) => spec.split(',').map(|s| s.trim().to_string()).collect(),
        None => engine
            .available_algorithms()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    };
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let results = engine.compare(&name_refs, &network, &settings);

    let mut tw = TabWriter::new(vec![]);
    write!(tw, "{}", OptimizationEngine::comparison_report(&results))?;
    tw.flush()?;
    println!("{}", String::from_utf8(tw.into_inner()?)?);

    let all_solved = results.iter().all(|r| r.status.has_solution());
    Ok(if all_solved {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_report(paths: &[PathBuf]) -> anyhow::Result<ExitCode> {
    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading result '{}'", path.display()))?;
        let result: OptimizationResult = serde_json::from_str(&raw)
            .with_context(|| format!("parsing result '{}'", path.display()))?;
        results.push(result);
    }

    let mut tw = TabWriter::new(vec![]);
    write!(tw, "{}", OptimizationEngine::comparison_report(&results))?;
    tw.flush()?;
    println!("{}", String::from_utf8(tw.into_inner()?)?);

    for result in &results {
        for violation in &result.validation_errors {
            eprintln!("validation ({}): {violation}", result.algorithm);
        }
    }
    let all_clean = results
        .iter()
        .all(|r| r.status.has_solution() && r.validation_errors.is_empty());
    Ok(if all_clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_scenarios(args: ScenariosArgs) -> anyhow::Result<ExitCode> {
    let network = load_network(&args.config)?;
    let set = load_spec_from_path(&args.spec)?;
    let scenarios = resolve_scenarios(&set)?;
    let manifest = materialize_scenarios(&network, &scenarios, &args.out)?;
    println!(
        "materialized {} scenario(s) under {}",
        manifest.artifacts.len(),
        args.out.display()
    );

    let jobs: Vec<BatchJob> = manifest
        .artifacts
        .iter()
        .map(|artifact| {
            BatchJob::new(
                &format!("{}-{}", artifact.scenario_id, args.algorithm),
                &artifact.scenario_id,
                &args.algorithm,
                artifact.network_file.clone(),
            )
        })
        .collect();
    let summary = run_batch(&BatchRunnerConfig {
        jobs,
        output_root: args.out.join("results"),
        settings: OptimizationSettings::default(),
        threads: args.threads,
    })?;

    let mut tw = TabWriter::new(vec![]);
    writeln!(tw, "scenario\tstatus\tresult")?;
    for job in &summary.jobs {
        writeln!(
            tw,
            "{}\t{}\t{}",
            job.scenario_id,
            job.result_status.as_deref().unwrap_or(job.status.as_str()),
            job.output
        )?;
    }
    tw.flush()?;
    println!("{}", String::from_utf8(tw.into_inner()?)?);
    println!(
        "batch finished: {} ok, {} failed (manifest: {})",
        summary.success,
        summary.failure,
        summary.manifest_path.display()
    );
    Ok(if summary.failure == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_algorithms() -> anyhow::Result<ExitCode> {
    let engine = OptimizationEngine::new();
    for name in engine.available_algorithms() {
        let algorithm = engine.algorithm(name).expect("listed algorithm exists");
        println!("{name}: {}", algorithm.description());
        for (key, help) in algorithm.parameters() {
            println!("    {key}: {help}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn exit_code_for(status: Status, validation_errors: &[String]) -> ExitCode {
    if status.has_solution() && validation_errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
