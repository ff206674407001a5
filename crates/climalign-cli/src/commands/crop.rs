//! Handler for `climalign crop cpm`/`climalign crop hads`: crops one
//! already-aligned file to a named region's bounding envelope (scenario S3).

use anyhow::{anyhow, Context, Result};
use climalign_io::{load_region_registry, GeoTiffFormat, NetcdfFormat, RasterFormat};
use climalign_region::crop_to_region;
use tracing::info;

use crate::cli::CropArgs;
use crate::manifest::record_manifest;

pub fn run(args: &CropArgs, command_name: &str) -> Result<()> {
    let netcdf = NetcdfFormat;
    let source = netcdf
        .open(&args.input)
        .with_context(|| format!("opening aligned source '{}'", args.input.display()))?;

    let registry = load_region_registry(&args.regions_path, &args.regions_crs)
        .with_context(|| format!("loading region registry '{}'", args.regions_path.display()))?;
    let region = registry
        .find(&args.region)
        .ok_or_else(|| anyhow!("unknown region '{}'", args.region))?;

    let cropped = crop_to_region(&source, region).context("cropping to region")?;

    let is_tiff = args
        .output
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false);

    if is_tiff {
        GeoTiffFormat
            .write(&args.output, &cropped, args.overwrite)
            .with_context(|| format!("writing '{}'", args.output.display()))?;
    } else {
        netcdf
            .write(&args.output, &cropped, args.overwrite)
            .with_context(|| format!("writing '{}'", args.output.display()))?;
    }

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        region = %args.region,
        "crop complete"
    );

    let dir = args.output.parent().unwrap_or_else(|| std::path::Path::new("."));
    record_manifest(
        dir,
        command_name,
        &[
            ("input", &args.input.display().to_string()),
            ("output", &args.output.display().to_string()),
            ("region", &args.region),
        ],
        &[args.output.display().to_string()],
    )?;
    Ok(())
}
