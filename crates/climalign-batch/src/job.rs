//! The task model realized as a batch job: builds the Cartesian product of
//! selectors over discovered input files into a globally ordered
//! `Vec<ClimJob>` (`spec.md` §4.E/§4.F), and the per-job result row
//! persisted to the run manifest.

use std::path::{Path, PathBuf};

use climalign_core::{
    resolve_variable, EnsembleRun, InterpolationPolicy, Operation, Product, RegionName,
    ResamplingMethod, Task, Variable, VariableAlias,
};
use climalign_discover::{derive_output_path, CpmFile, HadsFile};
use serde::{Deserialize, Serialize};

/// One unit of dispatch: a `Task` plus a human-readable identifier used in
/// logs, the manifest, and the `runs describe` CLI output.
#[derive(Debug, Clone)]
pub struct ClimJob {
    pub job_id: String,
    pub task: Task,
}

impl ClimJob {
    fn new(task: Task) -> Self {
        let mut parts = vec![task.operation.as_str().to_string(), task.variable.as_str().to_string()];
        if let Some(run) = &task.run {
            parts.push(run.0.clone());
        }
        if let Some(region) = &task.region {
            parts.push(region.0.clone());
        }
        let job_id = parts.join(":");
        Self { job_id, task }
    }
}

/// Per-task result row persisted to the batch manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimJobRecord {
    pub job_id: String,
    pub operation: String,
    pub variable: String,
    pub run: Option<String>,
    pub region: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub output: String,
}

/// The selectors a configured invocation resolves to before task
/// enumeration (`spec.md` §4.G).
pub struct JobSelectors {
    pub variables: Vec<Variable>,
    pub runs: Vec<EnsembleRun>,
    pub regions: Vec<RegionName>,
    pub operations: Vec<Operation>,
    pub resampling: ResamplingMethod,
    pub interpolation: InterpolationPolicy,
}

/// Build the full, globally ordered task list for one invocation from
/// discovery's output. Pure: no I/O beyond what discovery already did.
///
/// CPM run selection and region selection do not apply to HADS (`spec.md`
/// §4.F "HADS has no runs"); `crop-*` tasks are only emitted for regions in
/// `selectors.regions`, `project-*` tasks are emitted once per matching
/// source file regardless of region.
pub fn jobs_from_discovery(
    cpm_files: &[CpmFile],
    hads_files: &[HadsFile],
    run_dir: &Path,
    aliases: &[VariableAlias],
    selectors: &JobSelectors,
) -> Vec<ClimJob> {
    let mut tasks: Vec<Task> = Vec::new();

    if selectors.operations.contains(&Operation::ProjectCpm)
        || selectors.operations.contains(&Operation::CropCpm)
    {
        for file in cpm_files {
            let Some(variable) = resolve_variable(&file.variable_token, Product::Cpm, aliases) else {
                continue;
            };
            if !selectors.variables.contains(&variable) {
                continue;
            }
            if !selectors.runs.contains(&file.run) {
                continue;
            }

            let project_output = derive_output_path(
                run_dir,
                Operation::ProjectCpm,
                variable.as_str(),
                Some(&file.run),
                None,
                &file.path,
            );

            if selectors.operations.contains(&Operation::ProjectCpm) {
                tasks.push(Task {
                    operation: Operation::ProjectCpm,
                    variable,
                    run: Some(file.run.clone()),
                    region: None,
                    window: file.window,
                    input_paths: vec![file.path.clone()],
                    output_path: project_output.clone(),
                    resampling: selectors.resampling,
                    interpolation: selectors.interpolation,
                    reference_grid_source: None,
                });
            }

            if selectors.operations.contains(&Operation::CropCpm) {
                for region in &selectors.regions {
                    let crop_output = derive_output_path(
                        run_dir,
                        Operation::CropCpm,
                        variable.as_str(),
                        Some(&file.run),
                        Some(region),
                        &project_output,
                    );
                    tasks.push(Task {
                        operation: Operation::CropCpm,
                        variable,
                        run: Some(file.run.clone()),
                        region: Some(region.clone()),
                        window: file.window,
                        input_paths: vec![project_output.clone()],
                        output_path: crop_output,
                        resampling: selectors.resampling,
                        interpolation: selectors.interpolation,
                        reference_grid_source: None,
                    });
                }
            }
        }
    }

    if selectors.operations.contains(&Operation::ProjectHads)
        || selectors.operations.contains(&Operation::CropHads)
    {
        for file in hads_files {
            let Some(variable) = resolve_variable(&file.variable_token, Product::Hads, aliases)
            else {
                continue;
            };
            if !selectors.variables.contains(&variable) {
                continue;
            }

            let project_output = derive_output_path(
                run_dir,
                Operation::ProjectHads,
                variable.as_str(),
                None,
                None,
                &file.path,
            );

            if selectors.operations.contains(&Operation::ProjectHads) {
                tasks.push(Task {
                    operation: Operation::ProjectHads,
                    variable,
                    run: None,
                    region: None,
                    window: file.window,
                    input_paths: vec![file.path.clone()],
                    output_path: project_output.clone(),
                    resampling: selectors.resampling,
                    interpolation: selectors.interpolation,
                    reference_grid_source: None,
                });
            }

            if selectors.operations.contains(&Operation::CropHads) {
                for region in &selectors.regions {
                    let crop_output = derive_output_path(
                        run_dir,
                        Operation::CropHads,
                        variable.as_str(),
                        None,
                        Some(region),
                        &project_output,
                    );
                    tasks.push(Task {
                        operation: Operation::CropHads,
                        variable,
                        run: None,
                        region: Some(region.clone()),
                        window: file.window,
                        input_paths: vec![project_output.clone()],
                        output_path: crop_output,
                        resampling: selectors.resampling,
                        interpolation: selectors.interpolation,
                        reference_grid_source: None,
                    });
                }
            }
        }
    }

    // Global stable order by output path (`spec.md` §4.E/§4.F), which is
    // what makes `--start-index`/`--total-from-index` sharding well-defined.
    tasks.sort();
    tasks.into_iter().map(ClimJob::new).collect()
}

/// Apply `--start-index`/`--total-from-index` to the globally ordered job
/// list, before it is split by stage (`spec.md` §4.F: sharding applies to
/// the whole run, not to one stage).
pub fn shard(jobs: Vec<ClimJob>, start_index: usize, total_from_index: Option<usize>) -> Vec<ClimJob> {
    let end = match total_from_index {
        Some(total) => start_index.saturating_add(total).min(jobs.len()),
        None => jobs.len(),
    };
    if start_index >= jobs.len() {
        return Vec::new();
    }
    jobs.into_iter()
        .skip(start_index)
        .take(end - start_index)
        .collect()
}

pub fn output_paths(jobs: &[ClimJob]) -> Vec<PathBuf> {
    jobs.iter().map(|j| j.task.output_path.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use climalign_core::default_variable_aliases;

    fn window() -> climalign_core::TimeWindow {
        climalign_core::TimeWindow::new(
            NaiveDate::from_ymd_opt(1981, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(1982, 12, 1).unwrap(),
        )
        .unwrap()
    }

    fn selectors() -> JobSelectors {
        JobSelectors {
            variables: vec![Variable::Tasmax],
            runs: vec![EnsembleRun("05".into())],
            regions: vec![RegionName("Glasgow".into())],
            operations: vec![
                Operation::ProjectCpm,
                Operation::ProjectHads,
                Operation::CropCpm,
                Operation::CropHads,
            ],
            resampling: ResamplingMethod::Nearest,
            interpolation: InterpolationPolicy::Nearest,
        }
    }

    #[test]
    fn cpm_file_yields_project_and_crop_jobs() {
        let cpm = vec![CpmFile {
            variable_token: "tasmax".into(),
            run: EnsembleRun("05".into()),
            window: window(),
            path: PathBuf::from("tasmax/05/latest/tasmax_x_05_day_19811201-19821130.nc"),
        }];
        let jobs = jobs_from_discovery(
            &cpm,
            &[],
            Path::new("/out/run_x"),
            &default_variable_aliases(),
            &selectors(),
        );
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().any(|j| j.task.operation == Operation::ProjectCpm));
        assert!(jobs.iter().any(|j| j.task.operation == Operation::CropCpm));
    }

    #[test]
    fn crop_task_input_is_project_task_output() {
        let cpm = vec![CpmFile {
            variable_token: "tasmax".into(),
            run: EnsembleRun("05".into()),
            window: window(),
            path: PathBuf::from("tasmax/05/latest/tasmax_x_05_day_19811201-19821130.nc"),
        }];
        let jobs = jobs_from_discovery(
            &cpm,
            &[],
            Path::new("/out/run_x"),
            &default_variable_aliases(),
            &selectors(),
        );
        let project = jobs.iter().find(|j| j.task.operation == Operation::ProjectCpm).unwrap();
        let crop = jobs.iter().find(|j| j.task.operation == Operation::CropCpm).unwrap();
        assert_eq!(crop.task.input_paths, vec![project.task.output_path.clone()]);
    }

    #[test]
    fn non_matching_run_is_excluded() {
        let cpm = vec![CpmFile {
            variable_token: "tasmax".into(),
            run: EnsembleRun("06".into()),
            window: window(),
            path: PathBuf::from("tasmax/06/latest/tasmax_x_06_day_19811201-19821130.nc"),
        }];
        let jobs = jobs_from_discovery(
            &cpm,
            &[],
            Path::new("/out/run_x"),
            &default_variable_aliases(),
            &selectors(),
        );
        assert!(jobs.is_empty());
    }

    #[test]
    fn shard_splits_job_list_and_reunites_to_full_set() {
        let jobs: Vec<ClimJob> = (0..5)
            .map(|i| {
                ClimJob::new(Task {
                    operation: Operation::ProjectCpm,
                    variable: Variable::Tasmax,
                    run: None,
                    region: None,
                    window: window(),
                    input_paths: vec![],
                    output_path: PathBuf::from(format!("{i}.nc")),
                    resampling: ResamplingMethod::Nearest,
                    interpolation: InterpolationPolicy::Nearest,
                    reference_grid_source: None,
                })
            })
            .collect();
        let first = shard(jobs.clone(), 0, Some(2));
        let rest = shard(jobs.clone(), 2, None);
        assert_eq!(first.len(), 2);
        assert_eq!(rest.len(), 3);
        let mut combined: Vec<_> = first.iter().chain(rest.iter()).map(|j| j.job_id.clone()).collect();
        combined.sort();
        let mut expected: Vec<_> = jobs.iter().map(|j| j.job_id.clone()).collect();
        expected.sort();
        assert_eq!(combined, expected);
    }
}
