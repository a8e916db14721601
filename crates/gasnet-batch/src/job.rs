use std::path::PathBuf;

/// One unit of batch work: a network snapshot and the algorithm to run on
/// it.
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Unique id within the batch; doubles as the output directory name
    pub job_id: String,
    /// Scenario the snapshot came from (informational)
    pub scenario_id: String,
    /// Algorithm registry key
    pub algorithm: String,
    /// Network configuration to load
    pub network_file: PathBuf,
}

impl BatchJob {
    pub fn new(
        job_id: &str,
        scenario_id: &str,
        algorithm: &str,
        network_file: PathBuf,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            scenario_id: scenario_id.to_string(),
            algorithm: algorithm.to_string(),
            network_file,
        }
    }
}
