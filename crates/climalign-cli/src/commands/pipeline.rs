//! Handlers for `climalign run`/`climalign plan`: resolve configuration,
//! enumerate the task list, then either dispatch it under the stage barrier
//! or just print it (dry run).

use anyhow::{Context, Result};
use chrono::Utc;
use climalign_batch::{jobs_from_discovery, shard, run_staged_pipeline};

use crate::cli::PipelineArgs;
use crate::config::{method_combinations, Config};
use crate::manifest::record_manifest;

/// Dispatches the full pipeline. Loops once per `(resampling, interpolation)`
/// combination selected by `--all-methods`, each into its own run directory,
/// so that two methods never race to write the same output path.
pub fn run(args: &PipelineArgs) -> Result<()> {
    let base_label = run_label();
    for (resampling, interpolation, method_label) in method_combinations(args) {
        let mut scoped = args.clone();
        scoped.resampling = resampling_arg(resampling);
        scoped.interpolation = interpolation_arg(interpolation);
        let run_label = if args.all_methods {
            format!("{base_label}_{method_label}")
        } else {
            base_label.clone()
        };
        dispatch_one(&scoped, &run_label)?;
    }
    Ok(())
}

/// Enumerates the task list and prints it without dispatching (`spec.md`
/// §4.G's `execute=false`, §8 scenario S4).
pub fn plan(args: &PipelineArgs) -> Result<()> {
    let base_label = run_label();
    for (resampling, interpolation, method_label) in method_combinations(args) {
        let mut scoped = args.clone();
        scoped.resampling = resampling_arg(resampling);
        scoped.interpolation = interpolation_arg(interpolation);
        let run_label = if args.all_methods {
            format!("{base_label}_{method_label}")
        } else {
            base_label.clone()
        };
        plan_one(&scoped, &run_label)?;
    }
    Ok(())
}

fn dispatch_one(args: &PipelineArgs, run_label: &str) -> Result<()> {
    let config = Config::from_args(args, run_label)?;
    let jobs = jobs_from_discovery(
        &config.cpm_files,
        &config.hads_files,
        &config.run_dir,
        &config.aliases,
        &config.selectors,
    );
    let sharded = shard(jobs, args.start_index, args.total_from_index);
    let total = sharded.len();

    let runner_config = config.runner_config();
    let summaries = run_staged_pipeline(sharded, &runner_config, &config.run_dir)
        .context("running the staged pipeline")?;

    let success: usize = summaries.iter().map(|s| s.success).sum();
    let failure: usize = summaries.iter().map(|s| s.failure).sum();
    println!("{success} succeeded / {failure} failed (of {total} scheduled)");
    for stage in &summaries {
        println!(
            "  stage manifest: {} ({} ok, {} failed)",
            stage.manifest_path.display(),
            stage.success,
            stage.failure
        );
        for job in &stage.jobs {
            if job.status != "ok" {
                println!("    FAILED {} ({})", job.output, job.error.as_deref().unwrap_or("unknown error"));
            }
        }
    }

    let outputs: Vec<String> = summaries
        .iter()
        .flat_map(|s| s.jobs.iter().filter(|j| j.status == "ok").map(|j| j.output.clone()))
        .collect();
    record_manifest(
        &config.run_dir,
        "run",
        &[
            ("cpm-input-path", &args.cpm_input_path.display().to_string()),
            ("hads-input-path", &args.hads_input_path.display().to_string()),
            ("output-path", &args.output_path.display().to_string()),
        ],
        &outputs,
    )?;

    if failure > 0 {
        std::process::exit(failure.min(255) as i32);
    }
    Ok(())
}

fn plan_one(args: &PipelineArgs, run_label: &str) -> Result<()> {
    let config = Config::from_args(args, run_label)?;
    let jobs = jobs_from_discovery(
        &config.cpm_files,
        &config.hads_files,
        &config.run_dir,
        &config.aliases,
        &config.selectors,
    );
    let sharded = shard(jobs, args.start_index, args.total_from_index);

    println!("{} planned tasks (run directory would be {})", sharded.len(), config.run_dir.display());
    for job in &sharded {
        println!(
            "  {}  {}  -> {}",
            job.task.operation, job.job_id, job.task.output_path.display()
        );
    }
    Ok(())
}

fn run_label() -> String {
    format!("run_{}", Utc::now().format("%Y%m%dT%H%M%SZ"))
}

fn resampling_arg(method: climalign_core::ResamplingMethod) -> crate::cli::ResamplingArg {
    match method {
        climalign_core::ResamplingMethod::Nearest => crate::cli::ResamplingArg::Nearest,
        climalign_core::ResamplingMethod::Bilinear => crate::cli::ResamplingArg::Bilinear,
    }
}

fn interpolation_arg(policy: climalign_core::InterpolationPolicy) -> crate::cli::InterpolationArg {
    match policy {
        climalign_core::InterpolationPolicy::Nearest => crate::cli::InterpolationArg::Nearest,
        climalign_core::InterpolationPolicy::Linear => crate::cli::InterpolationArg::Linear,
    }
}
