//! Run-level manifest recorded after every `run`/`project`/`crop` invocation,
//! mirroring `gat_cli::manifest` so the `runs` subcommand can list, describe
//! and resume past invocations the same way.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ManifestEntry {
    pub run_id: String,
    pub command: String,
    pub version: String,
    pub timestamp: String,
    pub outputs: Vec<String>,
    pub params: Vec<Param>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Param {
    pub name: String,
    pub value: String,
}

/// Write `run_<uuid>.json` under `dir`, describing one invocation: the
/// subcommand name, its resolved parameters, and the output paths it
/// produced. Mirrors `gat_cli::manifest::record_manifest`.
pub fn record_manifest(
    dir: &Path,
    command: &str,
    params: &[(&str, &str)],
    outputs: &[String],
) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating run directory '{}'", dir.display()))?;
    let run_id = Uuid::new_v4().to_string();
    let manifest = ManifestEntry {
        run_id: run_id.clone(),
        command: command.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        outputs: outputs.to_vec(),
        params: params
            .iter()
            .map(|(name, value)| Param {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&manifest).context("serializing run manifest")?;
    let path = dir.join(format!("run-{run_id}.json"));
    fs::write(&path, json).with_context(|| format!("writing run manifest '{}'", path.display()))?;
    println!("Recorded run manifest {}", path.display());
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<ManifestEntry> {
    let json = fs::read_to_string(path).with_context(|| format!("reading manifest '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing manifest '{}'", path.display()))
}
