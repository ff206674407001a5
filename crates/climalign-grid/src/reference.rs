//! Derives the pipeline's singleton reference grid.
//!
//! The reference grid is BNG-gridded at the HADS/CPM-common 2.2km
//! resolution. It is computed once per run from whichever CPM sample grid
//! is supplied (CPM is projected first; HADS and subsequent crops are all
//! checked against the grid this produces), never recomputed per task.

use climalign_core::{ClimalignError, ClimalignResult, GridGeometry, ReferenceGrid};

use crate::crs::{CrsTransform, BNG_EPSG, CPM_ROTATED_POLE_PROJ4};

/// Resolution of the shared reference grid, in metres. Fixed by
/// `spec.md` to match both HADS's native resolution and the regridded CPM
/// product.
pub const REFERENCE_PIXEL_METRES: f64 = 2_200.0;

/// Derive the reference grid from a CPM source grid's rotated-pole extent.
///
/// Transforms the four corners of `cpm_grid` into BNG, takes their
/// bounding envelope, and snaps it outward to a whole number of
/// `REFERENCE_PIXEL_METRES` cells so every reprojected CPM/HADS cell lands
/// on an exact pixel boundary.
pub fn derive_from_cpm_grid(cpm_grid: &GridGeometry) -> ClimalignResult<ReferenceGrid> {
    let transform = CrsTransform::new(CPM_ROTATED_POLE_PROJ4, BNG_EPSG)
        .map_err(|e| ClimalignError::GridMismatch(format!("reference grid derivation: {e}")))?;

    let (min_x, min_y, max_x, max_y) = cpm_grid.bounds();
    let corners = [
        (min_x, min_y),
        (min_x, max_y),
        (max_x, min_y),
        (max_x, max_y),
    ];
    let mut bng_min_x = f64::INFINITY;
    let mut bng_min_y = f64::INFINITY;
    let mut bng_max_x = f64::NEG_INFINITY;
    let mut bng_max_y = f64::NEG_INFINITY;
    for (x, y) in corners {
        let (bx, by) = transform
            .transform(x, y)
            .map_err(|e| ClimalignError::GridMismatch(format!("reference grid derivation: {e}")))?;
        bng_min_x = bng_min_x.min(bx);
        bng_min_y = bng_min_y.min(by);
        bng_max_x = bng_max_x.max(bx);
        bng_max_y = bng_max_y.max(by);
    }

    let origin_x = (bng_min_x / REFERENCE_PIXEL_METRES).floor() * REFERENCE_PIXEL_METRES;
    let origin_y = (bng_max_y / REFERENCE_PIXEL_METRES).ceil() * REFERENCE_PIXEL_METRES;
    let cols = ((bng_max_x - origin_x) / REFERENCE_PIXEL_METRES).ceil() as usize;
    let rows = ((origin_y - bng_min_y) / REFERENCE_PIXEL_METRES).ceil() as usize;

    Ok(ReferenceGrid(GridGeometry {
        crs: BNG_EPSG.to_string(),
        affine: climalign_core::Affine {
            origin_x,
            origin_y,
            pixel_width: REFERENCE_PIXEL_METRES,
            pixel_height: -REFERENCE_PIXEL_METRES,
        },
        rows,
        cols,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use climalign_core::Affine;

    #[test]
    fn derived_grid_is_bng_and_snapped_to_resolution() {
        let cpm_grid = GridGeometry {
            crs: CPM_ROTATED_POLE_PROJ4.to_string(),
            affine: Affine {
                origin_x: -5.0,
                origin_y: 5.0,
                pixel_width: 0.1,
                pixel_height: -0.1,
            },
            rows: 50,
            cols: 50,
        };
        let reference = derive_from_cpm_grid(&cpm_grid).unwrap();
        assert_eq!(reference.geometry().crs, BNG_EPSG);
        let rem_x = reference.geometry().affine.origin_x % REFERENCE_PIXEL_METRES;
        assert!(rem_x.abs() < 1e-6);
    }
}
