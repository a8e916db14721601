use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub version: Option<u32>,
    pub network_file: Option<String>,
    #[serde(default)]
    pub defaults: ScenarioDefaults,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefaults {
    #[serde(default = "default_scale")]
    pub demand_scale: f64,
    #[serde(default = "default_scale")]
    pub supply_scale: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_scale() -> f64 {
    1.0
}

impl Default for ScenarioDefaults {
    fn default() -> Self {
        Self {
            demand_scale: default_scale(),
            supply_scale: default_scale(),
            tags: Vec::new(),
            metadata: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub scenario_id: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub outages: Vec<OutageSpec>,
    #[serde(default)]
    pub capacity_overrides: Vec<CapacityOverrideSpec>,
    pub demand_scale: Option<f64>,
    pub supply_scale: Option<f64>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutageSpec {
    Point { id: String },
    Segment { id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityOverrideSpec {
    pub segment_id: String,
    pub capacity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedScenario {
    pub scenario_id: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub outages: Vec<OutageSpec>,
    pub capacity_overrides: Vec<CapacityOverrideSpec>,
    pub demand_scale: f64,
    pub supply_scale: f64,
    pub metadata: HashMap<String, String>,
}

pub fn load_spec_from_path(path: &Path) -> Result<ScenarioSet> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading scenario spec '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing scenario spec yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing scenario spec json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing scenario spec"),
    }
}

pub fn resolve_scenarios(set: &ScenarioSet) -> Result<Vec<ResolvedScenario>> {
    if set.scenarios.is_empty() {
        return Err(anyhow!("scenario set contains no scenarios"));
    }
    let defaults = set.defaults.clone();
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(set.scenarios.len());
    for scenario in &set.scenarios {
        if scenario.scenario_id.trim().is_empty() {
            return Err(anyhow!("scenario_id cannot be empty"));
        }
        if !seen.insert(scenario.scenario_id.clone()) {
            return Err(anyhow!(
                "duplicate scenario_id '{}' in spec",
                scenario.scenario_id
            ));
        }
        let demand_scale = scenario.demand_scale.unwrap_or(defaults.demand_scale);
        let supply_scale = scenario.supply_scale.unwrap_or(defaults.supply_scale);
        if demand_scale < 0.0 || supply_scale < 0.0 {
            return Err(anyhow!(
                "scenario '{}' uses a negative scale factor",
                scenario.scenario_id
            ));
        }
        let tags = scenario
            .tags
            .as_ref()
            .cloned()
            .unwrap_or_else(|| defaults.tags.clone());
        let metadata = scenario
            .metadata
            .as_ref()
            .cloned()
            .unwrap_or_else(|| defaults.metadata.clone());
        resolved.push(ResolvedScenario {
            scenario_id: scenario.scenario_id.clone(),
            description: scenario.description.clone(),
            tags,
            outages: scenario.outages.clone(),
            capacity_overrides: scenario.capacity_overrides.clone(),
            demand_scale,
            supply_scale,
            metadata,
        });
    }
    Ok(resolved)
}

pub fn validate(set: &ScenarioSet) -> Result<()> {
    resolve_scenarios(set).map(|_| ())
}
