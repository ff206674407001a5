//! Resolves a `PipelineArgs` invocation into the fully-materialized
//! `Config` the pipeline commands dispatch against: discovered inputs, a
//! reference grid, a region registry, and resolved selectors.
//!
//! No field here is ever read from an environment variable (`spec.md` §6
//! "the orchestrator must not consult the environment for paths") — only
//! `env!("CARGO_PKG_VERSION")` at compile time and `std::env::current_exe()`
//! for `runs resume` touch the environment anywhere in this crate.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use climalign_core::{
    default_variable_aliases, ClimalignError, EnsembleRun, InterpolationPolicy, Operation,
    RegionName, RegionRegistry, ResamplingMethod, Variable, VariableAlias,
};
use climalign_discover::{discover_cpm, discover_hads, CpmFile, HadsFile};
use climalign_grid::{derive_from_cpm_grid, BNG_EPSG, CPM_ROTATED_POLE_PROJ4};
use climalign_io::{load_region_registry, NetcdfFormat, RasterFormat};
use serde::Deserialize;

use crate::cli::PipelineArgs;

/// A small, representative subset of CPM ensemble members selected by
/// `--default-runs`, distinct from `--all-runs`'s "every run discovered on
/// disk". This is an operator-tunable placeholder, not a value mandated by
/// any upstream convention; see `DESIGN.md`.
pub const DEFAULT_RUN_SUBSET: &[&str] = &["01", "05", "06"];

#[derive(Debug, Deserialize, Default)]
struct AliasFile {
    #[serde(default)]
    aliases: Vec<AliasEntry>,
}

#[derive(Debug, Deserialize)]
struct AliasEntry {
    canonical: String,
    cpm_token: String,
    hads_token: String,
}

pub struct Config {
    pub run_dir: PathBuf,
    pub cpm_files: Vec<CpmFile>,
    pub hads_files: Vec<HadsFile>,
    pub aliases: Vec<VariableAlias>,
    pub region_registry: RegionRegistry,
    pub reference_grid: climalign_core::ReferenceGrid,
    pub cpm_source_crs: String,
    pub hads_source_crs: String,
    pub selectors: climalign_batch::JobSelectors,
    pub threads: usize,
    pub overwrite: bool,
    pub output_format: climalign_batch::OutputFormat,
}

impl Config {
    /// Resolve one invocation's full configuration, performing discovery
    /// and reference-grid derivation but no task dispatch. Returns
    /// `ClimalignError::ConfigError` for invalid flag combinations
    /// (`spec.md` §7, scenario S6), always before any task would run.
    pub fn from_args(args: &PipelineArgs, run_label: &str) -> Result<Self> {
        let cpm_files = discover_cpm(&args.cpm_input_path).context("discovering CPM inputs")?;
        let hads_files = discover_hads(&args.hads_input_path).context("discovering HADS inputs")?;

        let aliases = load_aliases(args.aliases_path.as_deref())?;

        let reference_grid = resolve_reference_grid(args, &cpm_files)?;

        let region_registry = if args.crop_cpm || args.crop_hads {
            let path = args.regions_path.as_ref().ok_or_else(|| {
                ClimalignError::ConfigError(
                    "a crop stage was requested but --regions-path was not given".into(),
                )
            })?;
            load_region_registry(path, &args.regions_crs)
                .with_context(|| format!("loading region registry '{}'", path.display()))?
        } else {
            RegionRegistry::default()
        };

        let variables = resolve_variables(args)?;
        let regions = resolve_regions(args, &region_registry)?;
        let runs = resolve_runs(args, &cpm_files)?;
        let operations = resolve_operations(args);

        let selectors = climalign_batch::JobSelectors {
            variables,
            runs,
            regions,
            operations,
            resampling: args.resampling.into(),
            interpolation: args.interpolation.into(),
        };

        let run_dir = args.output_path.join(run_label);

        let threads = if args.use_multiprocessing { args.cpus } else { 1 };

        Ok(Self {
            run_dir,
            cpm_files,
            hads_files,
            aliases,
            region_registry,
            reference_grid,
            cpm_source_crs: CPM_ROTATED_POLE_PROJ4.to_string(),
            hads_source_crs: BNG_EPSG.to_string(),
            selectors,
            threads,
            overwrite: args.overwrite,
            output_format: args.output_format.into(),
        })
    }

    pub fn runner_config(&self) -> climalign_batch::ClimRunnerConfig {
        climalign_batch::ClimRunnerConfig {
            reference_grid: self.reference_grid.clone(),
            cpm_source_crs: self.cpm_source_crs.clone(),
            hads_source_crs: self.hads_source_crs.clone(),
            region_registry: self.region_registry.clone(),
            threads: self.threads,
            overwrite: self.overwrite,
            output_format: self.output_format,
        }
    }
}

/// `--reference-grid-source`, when given, always wins; otherwise the grid is
/// derived from the first discovered CPM file, which requires `project-cpm`
/// to be part of this invocation. Requesting `project-hads`/`crop-hads`
/// without either is the `ConfigError` of scenario S6.
fn resolve_reference_grid(
    args: &PipelineArgs,
    cpm_files: &[CpmFile],
) -> Result<climalign_core::ReferenceGrid> {
    if let Some(source) = &args.reference_grid_source {
        return derive_reference_grid_from(source);
    }

    if args.project_cpm {
        let sample = cpm_files.first().ok_or_else(|| {
            ClimalignError::ConfigError(format!(
                "no CPM input files found under '{}' to derive the reference grid from",
                args.cpm_input_path.display()
            ))
        })?;
        return derive_reference_grid_from(&sample.path);
    }

    if args.project_hads || args.crop_hads || args.crop_cpm {
        return Err(anyhow!(ClimalignError::ConfigError(
            "project-hads/crop-* requested without project-cpm in this invocation and no \
             --reference-grid-source was given; the reference grid has nothing to derive from"
                .into(),
        )));
    }

    Err(anyhow!(ClimalignError::ConfigError(
        "no stage requested: project-cpm, project-hads, crop-cpm and crop-hads are all disabled"
            .into(),
    )))
}

fn derive_reference_grid_from(path: &Path) -> Result<climalign_core::ReferenceGrid> {
    let stack = NetcdfFormat
        .open(path)
        .with_context(|| format!("opening CPM sample '{}' to derive the reference grid", path.display()))?;
    derive_from_cpm_grid(&stack.grid).context("deriving reference grid")
}

fn load_aliases(path: Option<&Path>) -> Result<Vec<VariableAlias>> {
    let Some(path) = path else {
        return Ok(default_variable_aliases());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading alias file '{}'", path.display()))?;
    let parsed: AliasFile = toml::from_str(&text).with_context(|| format!("parsing alias file '{}'", path.display()))?;
    parsed
        .aliases
        .into_iter()
        .map(|entry| {
            let canonical = parse_variable(&entry.canonical)?;
            Ok(VariableAlias::new(
                canonical,
                Box::leak(entry.cpm_token.into_boxed_str()),
                Box::leak(entry.hads_token.into_boxed_str()),
            ))
        })
        .collect()
}

fn parse_variable(token: &str) -> Result<Variable> {
    match token {
        "tasmax" => Ok(Variable::Tasmax),
        "tasmin" => Ok(Variable::Tasmin),
        "pr" => Ok(Variable::Pr),
        other => Err(anyhow!(ClimalignError::ConfigError(format!(
            "unrecognized variable '{other}'"
        )))),
    }
}

fn resolve_variables(args: &PipelineArgs) -> Result<Vec<Variable>> {
    if args.all_variables {
        return Ok(vec![Variable::Tasmax, Variable::Tasmin, Variable::Pr]);
    }
    match &args.variable {
        Some(name) => Ok(vec![parse_variable(name)?]),
        None => Ok(vec![Variable::Tasmax]),
    }
}

fn resolve_regions(args: &PipelineArgs, registry: &RegionRegistry) -> Result<Vec<RegionName>> {
    if !(args.crop_cpm || args.crop_hads) {
        return Ok(vec![]);
    }
    if args.all_regions {
        return Ok(registry.names().into_iter().map(|n| RegionName(n.to_string())).collect());
    }
    if let Some(name) = &args.region {
        return Ok(vec![RegionName(name.clone())]);
    }
    registry
        .names()
        .first()
        .map(|n| vec![RegionName(n.to_string())])
        .ok_or_else(|| {
            anyhow!(ClimalignError::ConfigError(
                "a crop stage was requested but the region registry is empty".into()
            ))
        })
}

fn resolve_runs(args: &PipelineArgs, cpm_files: &[CpmFile]) -> Result<Vec<EnsembleRun>> {
    let mut discovered: Vec<EnsembleRun> = cpm_files.iter().map(|f| f.run.clone()).collect();
    discovered.sort();
    discovered.dedup();

    if args.all_runs {
        return Ok(discovered);
    }
    if args.default_runs {
        let selected: Vec<EnsembleRun> = DEFAULT_RUN_SUBSET
            .iter()
            .map(|r| EnsembleRun((*r).to_string()))
            .filter(|r| discovered.contains(r))
            .collect();
        return Ok(selected);
    }
    if let Some(run) = &args.run {
        return Ok(vec![EnsembleRun(run.clone())]);
    }
    Ok(discovered.into_iter().take(1).collect())
}

fn resolve_operations(args: &PipelineArgs) -> Vec<Operation> {
    let mut operations = Vec::new();
    if args.project_cpm {
        operations.push(Operation::ProjectCpm);
    }
    if args.project_hads {
        operations.push(Operation::ProjectHads);
    }
    if args.crop_cpm {
        operations.push(Operation::CropCpm);
    }
    if args.crop_hads {
        operations.push(Operation::CropHads);
    }
    operations
}

/// The (resampling, interpolation) combinations one invocation runs:
/// just the configured pair, or every combination under `--all-methods`.
pub fn method_combinations(args: &PipelineArgs) -> Vec<(ResamplingMethod, InterpolationPolicy, String)> {
    if !args.all_methods {
        return vec![(args.resampling.into(), args.interpolation.into(), "default".to_string())];
    }
    let resamplings = [ResamplingMethod::Nearest, ResamplingMethod::Bilinear];
    let interpolations = [InterpolationPolicy::Nearest, InterpolationPolicy::Linear];
    let mut combos = Vec::new();
    for resampling in resamplings {
        for interpolation in interpolations {
            let label = format!(
                "{}_{}",
                resampling_label(resampling),
                interpolation_label(interpolation)
            );
            combos.push((resampling, interpolation, label));
        }
    }
    combos
}

fn resampling_label(method: ResamplingMethod) -> &'static str {
    match method {
        ResamplingMethod::Nearest => "nearest",
        ResamplingMethod::Bilinear => "bilinear",
    }
}

fn interpolation_label(policy: InterpolationPolicy) -> &'static str {
    match policy {
        InterpolationPolicy::Nearest => "nearest",
        InterpolationPolicy::Linear => "linear",
    }
}
