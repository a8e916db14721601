use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Outcome of one batch job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJobRecord {
    pub job_id: String,
    pub scenario_id: String,
    pub algorithm: String,
    /// "ok" or "error"
    pub status: String,
    /// Optimization status string ("Optimal", "Infeasible", ...)
    pub result_status: Option<String>,
    pub error: Option<String>,
    pub output: String,
}

/// Index written after every batch run for downstream reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchManifest {
    pub created_at: DateTime<Utc>,
    pub num_jobs: usize,
    pub success: usize,
    pub failure: usize,
    pub jobs: Vec<BatchJobRecord>,
}

pub fn write_batch_manifest(path: &Path, manifest: &BatchManifest) -> Result<()> {
    let json =
        serde_json::to_string_pretty(manifest).context("serializing batch manifest")?;
    fs::write(path, json).with_context(|| format!("writing '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_roundtrip() {
        let manifest = BatchManifest {
            created_at: Utc::now(),
            num_jobs: 1,
            success: 1,
            failure: 0,
            jobs: vec![BatchJobRecord {
                job_id: "j1".to_string(),
                scenario_id: "base".to_string(),
                algorithm: "minimize-cost".to_string(),
                status: "ok".to_string(),
                result_status: Some("Optimal".to_string()),
                error: None,
                output: "out/j1/result.json".to_string(),
            }],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch_manifest.json");
        write_batch_manifest(&path, &manifest).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let back: BatchManifest = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.num_jobs, 1);
        assert_eq!(back.jobs[0].status, "ok");
    }
}
