//! The `climalign` command tree. Structured the way `gat-cli::cli` structures
//! its `Cli`/`Commands` derive tree: one top-level struct carrying global
//! flags, one `#[derive(Subcommand)]` enum per area of the tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(name = "climalign", author, version, about = "Aligns UK HADS and CPM gridded climate data onto a shared reference grid", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reproject a single input onto the reference grid
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Crop a single aligned input to a named region
    Crop {
        #[command(subcommand)]
        command: CropCommands,
    },
    /// Discover inputs, enumerate tasks and dispatch the full pipeline
    Run(PipelineArgs),
    /// Discover inputs and enumerate tasks without executing them (dry run)
    Plan(PipelineArgs),
    /// Inspect the region registry
    Regions {
        #[command(subcommand)]
        command: RegionsCommands,
    },
    /// List, describe or resume prior runs
    Runs {
        #[command(subcommand)]
        command: RunsCommands,
    },
    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Convert one CPM file's 360-day calendar to civil and reproject to BNG
    Cpm {
        /// Source CPM netCDF file
        #[arg(long)]
        input: PathBuf,
        /// Output netCDF path
        #[arg(long)]
        output: PathBuf,
        /// CPM file to derive the reference grid from; defaults to `input`
        #[arg(long)]
        reference_grid_source: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ResamplingArg::Nearest)]
        resampling: ResamplingArg,
        #[arg(long, value_enum, default_value_t = InterpolationArg::Nearest)]
        interpolation: InterpolationArg,
        #[arg(long)]
        overwrite: bool,
    },
    /// Regrid one HADS file from 1km BNG to the reference grid
    Hads {
        /// Source HADS netCDF file
        #[arg(long)]
        input: PathBuf,
        /// Output netCDF path
        #[arg(long)]
        output: PathBuf,
        /// CPM file the reference grid was (or will be) derived from
        #[arg(long)]
        reference_grid_source: PathBuf,
        #[arg(long, value_enum, default_value_t = ResamplingArg::Nearest)]
        resampling: ResamplingArg,
        #[arg(long)]
        overwrite: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CropCommands {
    /// Crop an aligned CPM file to a named region
    Cpm(CropArgs),
    /// Crop an aligned HADS file to a named region
    Hads(CropArgs),
}

#[derive(Args, Debug)]
pub struct CropArgs {
    /// Aligned (already-projected) source netCDF file
    #[arg(long)]
    pub input: PathBuf,
    /// Output path; `.tif`/`.tiff` extensions are written as GeoTIFF
    #[arg(long)]
    pub output: PathBuf,
    /// Region name to crop to
    #[arg(long)]
    pub region: String,
    /// Shapefile (or equivalent) of named region polygons
    #[arg(long)]
    pub regions_path: PathBuf,
    /// CRS the region polygons are stored in
    #[arg(long, default_value = climalign_grid::WGS84_EPSG)]
    pub regions_crs: String,
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Subcommand, Debug)]
pub enum RegionsCommands {
    /// List every region name in a registry
    List {
        #[arg(long)]
        regions_path: PathBuf,
        #[arg(long, default_value = climalign_grid::WGS84_EPSG)]
        regions_crs: String,
    },
    /// Print one region's envelope
    Describe {
        name: String,
        #[arg(long)]
        regions_path: PathBuf,
        #[arg(long, default_value = climalign_grid::WGS84_EPSG)]
        regions_crs: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum RunsCommands {
    /// List recorded runs
    List {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long, value_enum, default_value_t = RunFormat::Plain)]
        format: RunFormat,
    },
    /// Describe a recorded run
    Describe {
        /// Manifest path or run_id
        target: String,
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long, value_enum, default_value_t = RunFormat::Plain)]
        format: RunFormat,
    },
    /// Re-invoke the command recorded in a prior run's manifest
    Resume {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Manifest path or run_id
        manifest: String,
        /// Actually re-run the recorded command rather than just describing it
        #[arg(long)]
        execute: bool,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum RunFormat {
    Plain,
    Json,
}

/// The full selector/stage/sharding/parallelism surface shared by `run` and
/// `plan` (`spec.md` §4.G). `run` always dispatches; `plan` always prints the
/// planned task list instead of executing it.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Root of the raw CPM tree
    #[arg(long)]
    pub cpm_input_path: PathBuf,
    /// Root of the raw HADS tree
    #[arg(long)]
    pub hads_input_path: PathBuf,
    /// Root under which a timestamped run directory is created
    #[arg(long)]
    pub output_path: PathBuf,
    /// Shapefile (or equivalent) of named region polygons; required only if
    /// a crop stage is selected
    #[arg(long)]
    pub regions_path: Option<PathBuf>,
    #[arg(long, default_value = climalign_grid::WGS84_EPSG)]
    pub regions_crs: String,
    /// TOML file overriding the default variable alias table
    #[arg(long)]
    pub aliases_path: Option<PathBuf>,
    /// CPM file to derive the reference grid from, when `--no-project-cpm`
    /// is set for this invocation
    #[arg(long)]
    pub reference_grid_source: Option<PathBuf>,

    /// Single-value variable selector
    #[arg(long)]
    pub variable: Option<String>,
    /// Single-value region selector
    #[arg(long)]
    pub region: Option<String>,
    /// Single-value CPM run selector
    #[arg(long)]
    pub run: Option<String>,

    #[arg(long)]
    pub all_variables: bool,
    #[arg(long)]
    pub all_regions: bool,
    #[arg(long)]
    pub all_runs: bool,
    #[arg(long)]
    pub default_runs: bool,
    /// Run every (resampling, interpolation) method combination, each into
    /// its own `run_<timestamp>_<method>` directory, instead of just the
    /// combination given by `--resampling`/`--interpolation`
    #[arg(long)]
    pub all_methods: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub project_cpm: bool,
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub project_hads: bool,
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub crop_cpm: bool,
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub crop_hads: bool,

    /// Skip the first K tasks of the globally ordered task list
    #[arg(long, default_value_t = 0)]
    pub start_index: usize,
    /// Take at most M tasks after `--start-index`
    #[arg(long)]
    pub total_from_index: Option<usize>,

    /// Worker count; 0 means one per physical core
    #[arg(long, default_value_t = 0)]
    pub cpus: usize,
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub use_multiprocessing: bool,

    #[arg(long, value_enum, default_value_t = ResamplingArg::Nearest)]
    pub resampling: ResamplingArg,
    #[arg(long, value_enum, default_value_t = InterpolationArg::Nearest)]
    pub interpolation: InterpolationArg,
    #[arg(long, value_enum, default_value_t = OutputFormatArg::Netcdf)]
    pub output_format: OutputFormatArg,
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ResamplingArg {
    Nearest,
    Bilinear,
}

impl From<ResamplingArg> for climalign_core::ResamplingMethod {
    fn from(value: ResamplingArg) -> Self {
        match value {
            ResamplingArg::Nearest => climalign_core::ResamplingMethod::Nearest,
            ResamplingArg::Bilinear => climalign_core::ResamplingMethod::Bilinear,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum InterpolationArg {
    Nearest,
    Linear,
}

impl From<InterpolationArg> for climalign_core::InterpolationPolicy {
    fn from(value: InterpolationArg) -> Self {
        match value {
            InterpolationArg::Nearest => climalign_core::InterpolationPolicy::Nearest,
            InterpolationArg::Linear => climalign_core::InterpolationPolicy::Linear,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum OutputFormatArg {
    Netcdf,
    Geotiff,
}

impl From<OutputFormatArg> for climalign_batch::OutputFormat {
    fn from(value: OutputFormatArg) -> Self {
        match value {
            OutputFormatArg::Netcdf => climalign_batch::OutputFormat::Netcdf,
            OutputFormatArg::Geotiff => climalign_batch::OutputFormat::GeoTiff,
        }
    }
}

pub fn build_cli_command() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
