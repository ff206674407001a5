//! Crops a `RasterStack` to a region's tightest whole-pixel bounding
//! envelope. Cropping never clips to the region's exact polygon shape —
//! only this rectangular envelope, snapped outward so every pixel that
//! even partially falls inside the region's bounds is kept (`spec.md`
//! §4.D).

use climalign_core::{Affine, ClimalignError, ClimalignResult, GridGeometry, RasterStack, Region};
use climalign_grid::CrsTransform;
use ndarray::Array3;
use tracing::debug;

/// Crop `stack` to `region`'s envelope. `region.crs` may differ from
/// `stack.grid.crs`; the envelope's corners are reprojected before being
/// converted to pixel indices.
pub fn crop_to_region(stack: &RasterStack, region: &Region) -> ClimalignResult<RasterStack> {
    let (min_x, min_y, max_x, max_y) = region_envelope_in_stack_crs(stack, region)?;

    let (r0, c0) = stack.grid.affine.inverse(min_x, max_y);
    let (r1, c1) = stack.grid.affine.inverse(max_x, min_y);

    let row_start = r0.floor().max(0.0) as usize;
    let col_start = c0.floor().max(0.0) as usize;
    let row_end = (r1.ceil() as isize).clamp(0, stack.grid.rows as isize) as usize;
    let col_end = (c1.ceil() as isize).clamp(0, stack.grid.cols as isize) as usize;

    if row_start >= row_end || col_start >= col_end || row_start >= stack.grid.rows || col_start >= stack.grid.cols {
        return Err(ClimalignError::RegionMismatch {
            region: region.name.clone(),
        });
    }
    let row_end = row_end.min(stack.grid.rows);
    let col_end = col_end.min(stack.grid.cols);

    let cropped = stack
        .data()
        .slice(ndarray::s![.., row_start..row_end, col_start..col_end])
        .to_owned();
    let (time_len, rows, cols) = cropped.dim();
    let mut owned = Array3::<f64>::zeros((time_len, rows, cols));
    owned.assign(&cropped);

    let (origin_x, _) = stack.grid.affine.pixel_center(0, col_start);
    let origin_x = origin_x - stack.grid.affine.pixel_width / 2.0;
    let (_, origin_y) = stack.grid.affine.pixel_center(row_start, 0);
    let origin_y = origin_y - stack.grid.affine.pixel_height / 2.0;

    let cropped_grid = GridGeometry {
        crs: stack.grid.crs.clone(),
        affine: Affine {
            origin_x,
            origin_y,
            pixel_width: stack.grid.affine.pixel_width,
            pixel_height: stack.grid.affine.pixel_height,
        },
        rows,
        cols,
    };

    debug!(
        region = %region.name,
        rows,
        cols,
        "cropped raster stack to region envelope"
    );

    RasterStack::new(
        stack.variable,
        cropped_grid,
        stack.time.clone(),
        stack.nodata,
        stack.attributes.clone(),
        owned,
    )
}

fn region_envelope_in_stack_crs(
    stack: &RasterStack,
    region: &Region,
) -> ClimalignResult<(f64, f64, f64, f64)> {
    let (rmin_x, rmin_y, rmax_x, rmax_y) = region.envelope();
    if region.crs == stack.grid.crs {
        return Ok((rmin_x, rmin_y, rmax_x, rmax_y));
    }
    let transform = CrsTransform::new(&region.crs, &stack.grid.crs)
        .map_err(|e| ClimalignError::RegionMismatch {
            region: format!("{}: {e}", region.name),
        })?;
    let corners = [
        (rmin_x, rmin_y),
        (rmin_x, rmax_y),
        (rmax_x, rmin_y),
        (rmax_x, rmax_y),
    ];
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for (x, y) in corners {
        let (tx, ty) = transform
            .transform(x, y)
            .map_err(|e| ClimalignError::RegionMismatch {
                region: format!("{}: {e}", region.name),
            })?;
        min_x = min_x.min(tx);
        min_y = min_y.min(ty);
        max_x = max_x.max(tx);
        max_y = max_y.max(ty);
    }
    Ok((min_x, min_y, max_x, max_y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use climalign_core::{Calendar360Date, TimeStep, Variable};

    fn grid() -> GridGeometry {
        GridGeometry {
            crs: "EPSG:27700".into(),
            affine: Affine {
                origin_x: 0.0,
                origin_y: 40.0,
                pixel_width: 10.0,
                pixel_height: -10.0,
            },
            rows: 4,
            cols: 4,
        }
    }

    fn stack() -> RasterStack {
        let mut data = Array3::<f64>::zeros((1, 4, 4));
        for r in 0..4 {
            for c in 0..4 {
                data[[0, r, c]] = (r * 4 + c) as f64;
            }
        }
        let time = vec![TimeStep::Model360(Calendar360Date::new(1981, 1, 1).unwrap())];
        RasterStack::new(Variable::Tasmax, grid(), time, -9999.0, Default::default(), data).unwrap()
    }

    #[test]
    fn crops_to_envelope_in_same_crs() {
        let region = Region {
            name: "middle".into(),
            crs: "EPSG:27700".into(),
            rings: vec![vec![(10.0, 10.0), (30.0, 10.0), (30.0, 30.0), (10.0, 30.0)]],
        };
        let cropped = crop_to_region(&stack(), &region).unwrap();
        assert_eq!(cropped.grid.rows, 2);
        assert_eq!(cropped.grid.cols, 2);
    }

    #[test]
    fn region_outside_stack_bounds_is_mismatch() {
        let region = Region {
            name: "elsewhere".into(),
            crs: "EPSG:27700".into(),
            rings: vec![vec![(1000.0, 1000.0), (1010.0, 1000.0), (1010.0, 1010.0), (1000.0, 1010.0)]],
        };
        assert!(crop_to_region(&stack(), &region).is_err());
    }
}
