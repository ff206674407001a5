//! Raster file formats: a small `RasterFormat` trait with two
//! implementations, chosen the way `gat_io::importers::Format` enumerates
//! power-system file formats behind one interface.

use std::collections::HashMap;
use std::path::Path;

use climalign_core::{ClimalignError, ClimalignResult, RasterStack};
use tracing::warn;

use crate::atomic::atomic_write;

/// A raster file format this pipeline can read or write.
pub trait RasterFormat {
    fn open(&self, path: &Path) -> ClimalignResult<RasterStack>;
    fn write(&self, path: &Path, stack: &RasterStack, overwrite: bool) -> ClimalignResult<()>;
}

/// CF-convention netCDF, the native format for both CPM and HADS inputs and
/// the default output format.
pub struct NetcdfFormat;

impl RasterFormat for NetcdfFormat {
    fn open(&self, path: &Path) -> ClimalignResult<RasterStack> {
        crate::netcdf_backend::open(path)
    }

    fn write(&self, path: &Path, stack: &RasterStack, overwrite: bool) -> ClimalignResult<()> {
        atomic_write(path, overwrite, |tmp| crate::netcdf_backend::write(tmp, stack))
    }
}

/// GeoTIFF, an optional single-frame export format (§6). GeoTIFF has no
/// native time dimension, so only single-time-step stacks may be written;
/// multi-step stacks fail loudly with `FormatError` rather than silently
/// dropping frames.
pub struct GeoTiffFormat;

impl RasterFormat for GeoTiffFormat {
    fn open(&self, path: &Path) -> ClimalignResult<RasterStack> {
        crate::tiff_backend::open(path)
    }

    fn write(&self, path: &Path, stack: &RasterStack, overwrite: bool) -> ClimalignResult<()> {
        if stack.time_len() != 1 {
            return Err(ClimalignError::FormatError {
                path: path.to_path_buf(),
                reason: format!(
                    "GeoTIFF export supports exactly one time step, stack has {}",
                    stack.time_len()
                ),
            });
        }
        atomic_write(path, overwrite, |tmp| crate::tiff_backend::write(tmp, stack))
    }
}

/// Infer the variable token from a filename's leading `_`-delimited
/// component, e.g. `tasmax_rcp85_bham_05_day_18601201-19801130.nc` ->
/// `"tasmax"`.
pub fn infer_variable_token(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    stem.split('_').next().map(str::to_string)
}

/// Cross-check an inferred variable against a file's CF attributes
/// (`standard_name`/`units`), logging a warning rather than failing:
/// permissive parsing in the style of `gat-io`'s importers, which surface
/// warnings instead of hard errors for non-critical metadata mismatches.
pub fn warn_on_attribute_mismatch(
    path: &Path,
    inferred_token: &str,
    attributes: &HashMap<String, String>,
) {
    if let Some(standard_name) = attributes.get("standard_name") {
        if !standard_name.to_lowercase().contains(inferred_token) {
            warn!(
                path = %path.display(),
                inferred = inferred_token,
                standard_name,
                "filename-inferred variable does not appear in the file's standard_name attribute"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn infers_leading_token_as_variable() {
        let path = PathBuf::from("tasmax_rcp85_bham_05_day_18601201-19801130.nc");
        assert_eq!(infer_variable_token(&path).as_deref(), Some("tasmax"));
    }

    #[test]
    fn mismatched_standard_name_logs_without_failing() {
        let mut attrs = HashMap::new();
        attrs.insert("standard_name".to_string(), "precipitation_flux".to_string());
        // Does not panic or return a Result; purely a logging side effect.
        warn_on_attribute_mismatch(Path::new("tasmax_x.nc"), "tasmax", &attrs);
    }
}
