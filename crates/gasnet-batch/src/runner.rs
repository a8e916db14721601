use crate::job::BatchJob;
use crate::manifest::{write_batch_manifest, BatchJobRecord, BatchManifest};
use anyhow::{Context, Result};
use chrono::Utc;
use gasnet_algo::{OptimizationEngine, OptimizationSettings};
use gasnet_io::{load_network, write_result};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::PathBuf;

/// Runner settings for one batch invocation.
pub struct BatchRunnerConfig {
    pub jobs: Vec<BatchJob>,
    pub output_root: PathBuf,
    pub settings: OptimizationSettings,
    /// 0 = auto-detect CPU count
    pub threads: usize,
}

/// Summary returned after the run so clients can log success/failure counts
/// and the manifest location.
pub struct BatchSummary {
    pub success: usize,
    pub failure: usize,
    pub manifest_path: PathBuf,
    pub jobs: Vec<BatchJobRecord>,
}

pub fn run_batch(config: &BatchRunnerConfig) -> Result<BatchSummary> {
    fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "creating batch output root '{}'",
            config.output_root.display()
        )
    })?;

    let thread_count = if config.threads == 0 {
        num_cpus::get()
    } else {
        config.threads
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .context("building Rayon thread pool for batch runs")?;

    // Runs share no mutable state: each job gets its own network snapshot,
    // a settings clone, and a private result file
    let engine = OptimizationEngine::new();
    let job_records: Vec<BatchJobRecord> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| run_job(job, &engine, config))
            .collect()
    });

    let success = job_records
        .iter()
        .filter(|record| record.status == "ok")
        .count();
    let failure = job_records.len() - success;

    let manifest = BatchManifest {
        created_at: Utc::now(),
        num_jobs: job_records.len(),
        success,
        failure,
        jobs: job_records.clone(),
    };
    let manifest_path = config.output_root.join("batch_manifest.json");
    write_batch_manifest(&manifest_path, &manifest)?;
    Ok(BatchSummary {
        success,
        failure,
        manifest_path,
        jobs: job_records,
    })
}

/// Execute a single batch job: load the snapshot, optimize, write the
/// result JSON. Failures land in the record, never propagate.
fn run_job(
    job: &BatchJob,
    engine: &OptimizationEngine,
    config: &BatchRunnerConfig,
) -> BatchJobRecord {
    let output_file = config.output_root.join(&job.job_id).join("result.json");

    let runner = || -> Result<String> {
        let network = load_network(&job.network_file).with_context(|| {
            format!("loading network '{}'", job.network_file.display())
        })?;
        let result = engine.optimize(&job.algorithm, &network, &config.settings);
        fs::create_dir_all(output_file.parent().expect("job dir has parent"))?;
        write_result(&result, &output_file)
            .with_context(|| format!("writing '{}'", output_file.display()))?;
        Ok(result.status.to_string())
    };

    match runner() {
        Ok(result_status) => BatchJobRecord {
            job_id: job.job_id.clone(),
            scenario_id: job.scenario_id.clone(),
            algorithm: job.algorithm.clone(),
            status: "ok".to_string(),
            result_status: Some(result_status),
            error: None,
            output: output_file.display().to_string(),
        },
        Err(err) => {
            eprintln!("batch job {} failed: {err}", job.job_id);
            BatchJobRecord {
                job_id: job.job_id.clone(),
                scenario_id: job.scenario_id.clone(),
                algorithm: job.algorithm.clone(),
                status: "error".to_string(),
                result_status: None,
                error: Some(err.to_string()),
                output: output_file.display().to_string(),
            }
        }
    }
}
