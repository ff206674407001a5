//! Entry point for the `climalign` binary. Follows the teacher's
//! `gat_cli::main` shape: parse args, install a `tracing` subscriber at the
//! requested level, dispatch on the top-level command, log success/failure.

use clap::Parser;
use climalign_core::ClimalignError;
use climalign_cli::cli::{Cli, Commands, CropCommands, ProjectCommands, RegionsCommands, RunsCommands};
use climalign_cli::commands::{completions, crop, pipeline, project, regions, runs};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: a global tracing subscriber was already set");
    }

    let outcome = dispatch(cli.command);
    match outcome {
        Ok(()) => {
            info!("command completed");
        }
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn dispatch(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Project { command } => match command {
            ProjectCommands::Cpm {
                input,
                output,
                reference_grid_source,
                resampling,
                interpolation,
                overwrite,
            } => project::project_cpm(
                &input,
                &output,
                reference_grid_source.as_deref(),
                resampling,
                interpolation,
                overwrite,
            ),
            ProjectCommands::Hads {
                input,
                output,
                reference_grid_source,
                resampling,
                overwrite,
            } => project::project_hads(&input, &output, &reference_grid_source, resampling, overwrite),
        },
        Commands::Crop { command } => match command {
            CropCommands::Cpm(args) => crop::run(&args, "crop-cpm"),
            CropCommands::Hads(args) => crop::run(&args, "crop-hads"),
        },
        Commands::Run(args) => pipeline::run(&args),
        Commands::Plan(args) => pipeline::plan(&args),
        Commands::Regions { command } => match command {
            RegionsCommands::List { regions_path, regions_crs } => regions::list(&regions_path, &regions_crs),
            RegionsCommands::Describe { name, regions_path, regions_crs } => {
                regions::describe(&name, &regions_path, &regions_crs)
            }
        },
        Commands::Runs { command } => match command {
            RunsCommands::List { root, format } => runs::list(&root, format),
            RunsCommands::Describe { target, root, format } => runs::describe(&target, &root, format),
            RunsCommands::Resume { root, manifest, execute } => runs::resume(&root, &manifest, execute),
        },
        Commands::Completions { shell, out } => completions::generate_completions(shell, out.as_deref()),
    }
}

/// A `ConfigError` always means no task ran at all (scenario S6); give it a
/// distinct exit code from the generic failure case.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ClimalignError>() {
        Some(ClimalignError::ConfigError(_)) => 2,
        _ => 1,
    }
}
