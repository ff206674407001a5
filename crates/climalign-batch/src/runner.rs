//! Executes one stage's jobs in parallel and, at the top, enforces the
//! `project-cpm -> project-hads -> crop-cpm -> crop-hads` stage barrier
//! across the whole (possibly sharded) run. Grounded on the teacher's
//! `gat_batch::runner`: a Rayon-sized thread pool, `par_iter().map(run_job)`,
//! and a closure per job that catches its own `Result` into a status row so
//! one bad file never aborts the pool.

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use climalign_calendar::{build_mapping, hydrological_year_window};
use climalign_core::{Operation, ReferenceGrid, RegionRegistry};
use climalign_io::{GeoTiffFormat, NetcdfFormat, RasterFormat};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{info, warn};

use crate::job::{ClimJob, ClimJobRecord};
use crate::manifest::{write_batch_manifest, BatchManifest};

/// Output format for written rasters. GeoTIFF only ever applies to
/// single-time-step crop outputs (`spec.md` §6); the orchestrator always
/// writes netCDF for `project-*` stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Netcdf,
    GeoTiff,
}

pub struct ClimRunnerConfig {
    pub reference_grid: ReferenceGrid,
    pub cpm_source_crs: String,
    pub hads_source_crs: String,
    pub region_registry: RegionRegistry,
    pub threads: usize,
    pub overwrite: bool,
    pub output_format: OutputFormat,
}

pub struct BatchSummary {
    pub success: usize,
    pub failure: usize,
    pub manifest_path: PathBuf,
    pub jobs: Vec<ClimJobRecord>,
}

/// Run every job in `jobs` concurrently under one Rayon pool, then write a
/// manifest named after `stage_label` under `manifest_dir`.
pub fn run_batch(
    jobs: &[ClimJob],
    config: &ClimRunnerConfig,
    manifest_dir: &std::path::Path,
    stage_label: &str,
) -> Result<BatchSummary> {
    fs::create_dir_all(manifest_dir)
        .with_context(|| format!("creating manifest directory '{}'", manifest_dir.display()))?;

    let thread_count = if config.threads == 0 {
        num_cpus::get()
    } else {
        config.threads
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .context("building Rayon thread pool for the batch run")?;

    let records: Vec<ClimJobRecord> = pool.install(|| {
        jobs.par_iter().map(|job| run_job(job, config)).collect()
    });

    let success = records.iter().filter(|r| r.status == "ok").count();
    let failure = records.len() - success;

    let manifest = BatchManifest {
        created_at: Utc::now(),
        stage: stage_label.to_string(),
        num_jobs: records.len(),
        success,
        failure,
        jobs: records.clone(),
    };
    let manifest_path = manifest_dir.join(format!("{stage_label}_manifest.json"));
    write_batch_manifest(&manifest_path, &manifest)?;

    info!(stage = stage_label, success, failure, "stage complete");

    Ok(BatchSummary {
        success,
        failure,
        manifest_path,
        jobs: records,
    })
}

/// Run the full staged pipeline: split `jobs` (already globally sorted and
/// sharded) by operation, and run each stage's Rayon pool to completion
/// before starting the next. Returns one `BatchSummary` per stage that had
/// at least one job.
pub fn run_staged_pipeline(
    jobs: Vec<ClimJob>,
    config: &ClimRunnerConfig,
    manifest_dir: &std::path::Path,
) -> Result<Vec<BatchSummary>> {
    let mut summaries = Vec::new();
    for stage in Operation::stage_order() {
        let stage_jobs: Vec<ClimJob> = jobs
            .iter()
            .filter(|j| j.task.operation == stage)
            .cloned()
            .collect();
        if stage_jobs.is_empty() {
            continue;
        }
        let summary = run_batch(&stage_jobs, config, manifest_dir, stage.as_str())?;
        summaries.push(summary);
    }
    Ok(summaries)
}

fn run_job(job: &ClimJob, config: &ClimRunnerConfig) -> ClimJobRecord {
    let task = &job.task;
    let outcome: Result<()> = (|| {
        let netcdf = NetcdfFormat;
        match task.operation {
            Operation::ProjectCpm => {
                let source = netcdf
                    .open(&task.input_paths[0])
                    .with_context(|| format!("opening CPM source '{}'", task.input_paths[0].display()))?;
                let window = hydrological_year_window(task.window.start)?;
                let mapping = build_mapping(window, task.interpolation)?;
                let civil = climalign_calendar::convert(&source, &mapping)?;
                let projected = climalign_grid::reproject(
                    &civil,
                    &config.cpm_source_crs,
                    &config.reference_grid,
                    task.resampling,
                )?;
                netcdf.write(&task.output_path, &projected, config.overwrite)?;
                Ok(())
            }
            Operation::ProjectHads => {
                let source = netcdf
                    .open(&task.input_paths[0])
                    .with_context(|| format!("opening HADS source '{}'", task.input_paths[0].display()))?;
                let projected = climalign_grid::reproject(
                    &source,
                    &config.hads_source_crs,
                    &config.reference_grid,
                    task.resampling,
                )?;
                netcdf.write(&task.output_path, &projected, config.overwrite)?;
                Ok(())
            }
            Operation::CropCpm | Operation::CropHads => {
                let region_name = task
                    .region
                    .as_ref()
                    .ok_or_else(|| anyhow!("crop task '{}' has no region", job.job_id))?;
                let region = config
                    .region_registry
                    .find(&region_name.0)
                    .ok_or_else(|| anyhow!("unknown region '{}'", region_name.0))?;
                let source = netcdf
                    .open(&task.input_paths[0])
                    .with_context(|| format!("opening projected source '{}'", task.input_paths[0].display()))?;
                let cropped = climalign_region::crop_to_region(&source, region)?;
                match config.output_format {
                    OutputFormat::Netcdf => netcdf.write(&task.output_path, &cropped, config.overwrite)?,
                    OutputFormat::GeoTiff => GeoTiffFormat.write(&task.output_path, &cropped, config.overwrite)?,
                }
                Ok(())
            }
        }
    })();

    let (status, error) = match outcome {
        Ok(()) => ("ok".to_string(), None),
        Err(err) => {
            warn!(job_id = %job.job_id, error = %err, "batch job failed");
            ("error".to_string(), Some(err.to_string()))
        }
    };

    ClimJobRecord {
        job_id: job.job_id.clone(),
        operation: task.operation.as_str().to_string(),
        variable: task.variable.as_str().to_string(),
        run: task.run.as_ref().map(|r| r.0.clone()),
        region: task.region.as_ref().map(|r| r.0.clone()),
        status,
        error,
        output: task.output_path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use climalign_core::{
        Affine, EnsembleRun, GridGeometry, InterpolationPolicy, Region, Task, TimeWindow, Variable,
    };
    use tempfile::tempdir;

    fn grid() -> GridGeometry {
        GridGeometry {
            crs: "EPSG:27700".into(),
            affine: Affine {
                origin_x: 0.0,
                origin_y: 0.0,
                pixel_width: 2_200.0,
                pixel_height: -2_200.0,
            },
            rows: 2,
            cols: 2,
        }
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            NaiveDate::from_ymd_opt(1981, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(1982, 12, 1).unwrap(),
        )
        .unwrap()
    }

    fn config() -> ClimRunnerConfig {
        ClimRunnerConfig {
            reference_grid: ReferenceGrid::new(grid()),
            cpm_source_crs: "EPSG:27700".into(),
            hads_source_crs: "EPSG:27700".into(),
            region_registry: RegionRegistry {
                regions: vec![Region {
                    name: "Glasgow".into(),
                    crs: "EPSG:27700".into(),
                    rings: vec![vec![(0.0, -4400.0), (4400.0, -4400.0), (4400.0, 0.0), (0.0, 0.0)]],
                }],
            },
            threads: 1,
            overwrite: true,
            output_format: OutputFormat::Netcdf,
        }
    }

    fn job(task: Task) -> ClimJob {
        ClimJob {
            job_id: "test-job".into(),
            task,
        }
    }

    #[test]
    fn missing_input_file_is_recorded_as_a_failed_job_not_a_panic() {
        let dir = tempdir().unwrap();
        let task = Task {
            operation: Operation::ProjectHads,
            variable: Variable::Tasmax,
            run: None,
            region: None,
            window: window(),
            input_paths: vec![dir.path().join("missing.nc")],
            output_path: dir.path().join("out.nc"),
            resampling: climalign_core::ResamplingMethod::Nearest,
            interpolation: InterpolationPolicy::Nearest,
            reference_grid_source: None,
        };
        let record = run_job(&job(task), &config());
        assert_eq!(record.status, "error");
        assert!(record.error.is_some());
    }

    #[test]
    fn unknown_region_is_recorded_as_a_failed_job() {
        let dir = tempdir().unwrap();
        let task = Task {
            operation: Operation::CropCpm,
            variable: Variable::Tasmax,
            run: Some(EnsembleRun("05".into())),
            region: Some(climalign_core::RegionName("Nowhere".into())),
            window: window(),
            input_paths: vec![dir.path().join("missing.nc")],
            output_path: dir.path().join("crop.nc"),
            resampling: climalign_core::ResamplingMethod::Nearest,
            interpolation: InterpolationPolicy::Nearest,
            reference_grid_source: None,
        };
        let record = run_job(&job(task), &config());
        assert_eq!(record.status, "error");
    }

    #[test]
    fn run_staged_pipeline_skips_stages_with_no_jobs() {
        let dir = tempdir().unwrap();
        let task = Task {
            operation: Operation::ProjectHads,
            variable: Variable::Tasmax,
            run: None,
            region: None,
            window: window(),
            input_paths: vec![dir.path().join("missing.nc")],
            output_path: dir.path().join("out.nc"),
            resampling: climalign_core::ResamplingMethod::Nearest,
            interpolation: InterpolationPolicy::Nearest,
            reference_grid_source: None,
        };
        let jobs = vec![job(task)];
        let summaries = run_staged_pipeline(jobs, &config(), dir.path()).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].failure, 1);
    }
}
