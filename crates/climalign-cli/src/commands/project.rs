//! Handlers for `climalign project cpm`/`climalign project hads`: the
//! single-file equivalent of the `project-*` batch stages, useful for
//! exercising one input directly (scenarios S1/S2).

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use climalign_calendar::{build_mapping, hydrological_year_window};
use climalign_core::TimeStep;
use climalign_grid::{derive_from_cpm_grid, reproject, BNG_EPSG, CPM_ROTATED_POLE_PROJ4};
use climalign_io::{NetcdfFormat, RasterFormat};
use tracing::info;

use crate::cli::{InterpolationArg, ResamplingArg};
use crate::manifest::record_manifest;

pub fn project_cpm(
    input: &std::path::Path,
    output: &std::path::Path,
    reference_grid_source: Option<&std::path::Path>,
    resampling: ResamplingArg,
    interpolation: InterpolationArg,
    overwrite: bool,
) -> Result<()> {
    let netcdf = NetcdfFormat;
    let source = netcdf.open(input).with_context(|| format!("opening CPM source '{}'", input.display()))?;

    let anchor = anchor_date(&source)?;
    let window = hydrological_year_window(anchor).context("deriving hydrological-year window")?;
    let mapping = build_mapping(window, interpolation.into()).context("building calendar mapping")?;
    let civil = climalign_calendar::convert(&source, &mapping).context("converting 360-day calendar to civil")?;

    let grid_source_path = reference_grid_source.unwrap_or(input);
    let other_grid_source;
    let grid_source: &climalign_core::RasterStack = if grid_source_path == input {
        &source
    } else {
        other_grid_source = netcdf
            .open(grid_source_path)
            .with_context(|| format!("opening reference grid source '{}'", grid_source_path.display()))?;
        &other_grid_source
    };
    let reference_grid = derive_from_cpm_grid(&grid_source.grid).context("deriving reference grid")?;

    let projected = reproject(&civil, CPM_ROTATED_POLE_PROJ4, &reference_grid, resampling.into())
        .context("reprojecting CPM stack to the reference grid")?;

    netcdf
        .write(output, &projected, overwrite)
        .with_context(|| format!("writing '{}'", output.display()))?;

    info!(input = %input.display(), output = %output.display(), "project-cpm complete");

    let dir = output.parent().unwrap_or_else(|| std::path::Path::new("."));
    record_manifest(
        dir,
        "project cpm",
        &[
            ("input", &input.display().to_string()),
            ("output", &output.display().to_string()),
        ],
        &[output.display().to_string()],
    )?;
    Ok(())
}

pub fn project_hads(
    input: &std::path::Path,
    output: &std::path::Path,
    reference_grid_source: &std::path::Path,
    resampling: ResamplingArg,
    overwrite: bool,
) -> Result<()> {
    let netcdf = NetcdfFormat;
    let source = netcdf.open(input).with_context(|| format!("opening HADS source '{}'", input.display()))?;
    let grid_source = netcdf
        .open(reference_grid_source)
        .with_context(|| format!("opening reference grid source '{}'", reference_grid_source.display()))?;
    let reference_grid = derive_from_cpm_grid(&grid_source.grid).context("deriving reference grid")?;

    let projected = reproject(&source, BNG_EPSG, &reference_grid, resampling.into())
        .context("reprojecting HADS stack to the reference grid")?;

    netcdf
        .write(output, &projected, overwrite)
        .with_context(|| format!("writing '{}'", output.display()))?;

    info!(input = %input.display(), output = %output.display(), "project-hads complete");

    let dir = output.parent().unwrap_or_else(|| std::path::Path::new("."));
    record_manifest(
        dir,
        "project hads",
        &[
            ("input", &input.display().to_string()),
            ("output", &output.display().to_string()),
        ],
        &[output.display().to_string()],
    )?;
    Ok(())
}

/// The file's hydrological-year anchor, taken from its first 360-day model
/// time step rather than a filename (`spec.md` §9 open question (b)).
fn anchor_date(stack: &climalign_core::RasterStack) -> Result<NaiveDate> {
    let first = stack
        .time
        .first()
        .ok_or_else(|| anyhow!("source stack has no time steps"))?;
    let TimeStep::Model360(date) = first else {
        return Err(anyhow!("source stack's time axis is not on the 360-day model calendar"));
    };
    NaiveDate::from_ymd_opt(date.year, date.month as u32, date.day as u32)
        .ok_or_else(|| anyhow!("first time step ({date:?}) is not a valid civil anchor date"))
}
