//! Derives an output path for a task from its input file's location,
//! mirroring the input's `variable/run/` (CPM) or `variable/` (HADS)
//! subtree under the run directory and operation subdirectory
//! (`spec.md` §4.H/§6).

use std::path::{Path, PathBuf};

use climalign_core::{EnsembleRun, Operation, RegionName};

/// Build the output path for one task.
///
/// Layout: `<run_dir>/<operation>[/<region>]/<variable>[/<run>]/<filename>`,
/// where `<filename>` is the original input filename with a suffix
/// indicating what changed (civil calendar + reference grid for
/// `project-*`, the region name for `crop-*`).
pub fn derive_output_path(
    run_dir: &Path,
    operation: Operation,
    variable: &str,
    run: Option<&EnsembleRun>,
    region: Option<&RegionName>,
    input_path: &Path,
) -> PathBuf {
    let mut out = run_dir.join(operation.as_str());
    if let Some(region) = region {
        out = out.join(&region.0);
    }
    out = out.join(variable);
    if let Some(run) = run {
        out = out.join(&run.0);
    }
    out.join(transformed_filename(operation, region, input_path))
}

/// Appends a suffix to the input filename's stem describing the
/// transform this task applied, keeping the original extension.
fn transformed_filename(operation: Operation, region: Option<&RegionName>, input_path: &Path) -> String {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let ext = input_path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("nc");
    let suffix = match operation {
        Operation::ProjectCpm => "civil_bng".to_string(),
        Operation::ProjectHads => "bng".to_string(),
        Operation::CropCpm | Operation::CropHads => region
            .map(|r| r.0.clone())
            .unwrap_or_else(|| "cropped".to_string()),
    };
    format!("{stem}_{suffix}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_cpm_path_mirrors_variable_and_run() {
        let out = derive_output_path(
            Path::new("/out/run_20260101T000000"),
            Operation::ProjectCpm,
            "tasmax",
            Some(&EnsembleRun("05".into())),
            None,
            Path::new("tasmax_rcp85_land-cpm_uk_2.2km_05_day_19811201-19821130.nc"),
        );
        assert_eq!(
            out,
            PathBuf::from(
                "/out/run_20260101T000000/project-cpm/tasmax/05/tasmax_rcp85_land-cpm_uk_2.2km_05_day_19811201-19821130_civil_bng.nc"
            )
        );
    }

    #[test]
    fn crop_cpm_path_nests_region_under_operation() {
        let out = derive_output_path(
            Path::new("/out/run_20260101T000000"),
            Operation::CropCpm,
            "tasmax",
            Some(&EnsembleRun("05".into())),
            Some(&RegionName("Glasgow".into())),
            Path::new("tasmax_civil_bng.nc"),
        );
        assert_eq!(
            out,
            PathBuf::from(
                "/out/run_20260101T000000/crop-cpm/Glasgow/tasmax/05/tasmax_civil_bng_Glasgow.nc"
            )
        );
    }

    #[test]
    fn project_hads_path_has_no_run_segment() {
        let out = derive_output_path(
            Path::new("/out/run_x"),
            Operation::ProjectHads,
            "tasmax",
            None,
            None,
            Path::new("tasmax_hadukgrid_uk_1km_day_19940101-19940131.nc"),
        );
        assert_eq!(
            out,
            PathBuf::from("/out/run_x/project-hads/tasmax/tasmax_hadukgrid_uk_1km_day_19940101-19940131_bng.nc")
        );
    }
}
