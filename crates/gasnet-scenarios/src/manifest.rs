use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gasnet_core::Network;
use gasnet_io::save_network;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::apply::{apply_scenario_to_network, ScenarioApplyOptions};
use crate::spec::ResolvedScenario;

/// One materialized scenario network on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioArtifact {
    pub artifact_id: String,
    pub scenario_id: String,
    pub network_file: PathBuf,
}

/// Index of everything a materialize run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioManifest {
    pub created_at: DateTime<Utc>,
    pub base_network: String,
    pub artifacts: Vec<ScenarioArtifact>,
}

/// Apply each scenario to a clone of the base network and write the variant
/// configurations under `output_root`, one directory per scenario, plus a
/// `scenario_manifest.json` index.
pub fn materialize_scenarios(
    base: &Network,
    scenarios: &[ResolvedScenario],
    output_root: &Path,
) -> Result<ScenarioManifest> {
    fs::create_dir_all(output_root).with_context(|| {
        format!("creating scenario output root '{}'", output_root.display())
    })?;

    let opts = ScenarioApplyOptions::default();
    let mut artifacts = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let mut variant = base.clone();
        apply_scenario_to_network(&mut variant, scenario, &opts)?;

        let scenario_dir = output_root.join(&scenario.scenario_id);
        fs::create_dir_all(&scenario_dir).with_context(|| {
            format!("creating scenario directory '{}'", scenario_dir.display())
        })?;
        let network_file = scenario_dir.join("network.json");
        save_network(&variant, &network_file)
            .with_context(|| format!("writing scenario '{}'", scenario.scenario_id))?;

        artifacts.push(ScenarioArtifact {
            artifact_id: Uuid::new_v4().to_string(),
            scenario_id: scenario.scenario_id.clone(),
            network_file,
        });
    }

    let manifest = ScenarioManifest {
        created_at: Utc::now(),
        base_network: base.name.clone(),
        artifacts,
    };
    let manifest_path = output_root.join("scenario_manifest.json");
    let json = serde_json::to_string_pretty(&manifest)
        .context("serializing scenario manifest")?;
    fs::write(&manifest_path, json)
        .with_context(|| format!("writing '{}'", manifest_path.display()))?;
    Ok(manifest)
}
