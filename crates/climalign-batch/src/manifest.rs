//! JSON batch manifest persisted after each stage, mirroring the teacher's
//! `gat_batch::manifest` so resumption and reporting tooling see a familiar
//! shape.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::ClimJobRecord;

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchManifest {
    pub created_at: DateTime<Utc>,
    pub stage: String,
    pub num_jobs: usize,
    pub success: usize,
    pub failure: usize,
    pub jobs: Vec<ClimJobRecord>,
}

pub fn write_batch_manifest(path: &Path, manifest: &BatchManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest).context("serializing batch manifest to JSON")?;
    fs::write(path, json).with_context(|| format!("writing batch manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_batch_manifest(path: &Path) -> Result<BatchManifest> {
    let file = fs::File::open(path).with_context(|| format!("opening batch manifest '{}'", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("parsing batch manifest '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn manifest_writes_and_reads_back() {
        let record = ClimJobRecord {
            job_id: "project-cpm:tasmax:05".into(),
            operation: "project-cpm".into(),
            variable: "tasmax".into(),
            run: Some("05".into()),
            region: None,
            status: "ok".into(),
            error: None,
            output: "out/project-cpm/tasmax/05/x.nc".into(),
        };
        let manifest = BatchManifest {
            created_at: Utc::now(),
            stage: "project-cpm".into(),
            num_jobs: 1,
            success: 1,
            failure: 0,
            jobs: vec![record.clone()],
        };
        let tmp = NamedTempFile::new().unwrap();
        write_batch_manifest(tmp.path(), &manifest).unwrap();
        let parsed = load_batch_manifest(tmp.path()).unwrap();
        assert_eq!(parsed.stage, "project-cpm");
        assert_eq!(parsed.jobs.first().unwrap().job_id, record.job_id);
    }
}
