//! Resampling kernels: given a fractional source `(row, col)` position,
//! return a value (or NODATA). Grounded on the two-point/four-point
//! neighborhood sampling style used for grid resampling elsewhere in the
//! geoscience Rust ecosystem (nearest for a single source cell, bilinear
//! for a 2x2 neighborhood), adapted to operate directly on an
//! `ndarray::ArrayView2` instead of a flat slice.

use climalign_core::ResamplingMethod;
use ndarray::ArrayView2;

/// Sample `source` at the fractional position `(row, col)` using `method`.
/// Returns `None` when the position falls outside `source`'s bounds or all
/// contributing cells are NODATA — the resampler must never invent a value
/// for an out-of-bounds or all-NODATA target pixel (`spec.md` §4.C).
pub fn sample(
    source: ArrayView2<'_, f64>,
    row: f64,
    col: f64,
    method: ResamplingMethod,
    is_nodata: impl Fn(f64) -> bool,
) -> Option<f64> {
    match method {
        ResamplingMethod::Nearest => sample_nearest(source, row, col, is_nodata),
        ResamplingMethod::Bilinear => sample_bilinear(source, row, col, is_nodata),
    }
}

fn sample_nearest(
    source: ArrayView2<'_, f64>,
    row: f64,
    col: f64,
    is_nodata: impl Fn(f64) -> bool,
) -> Option<f64> {
    let (rows, cols) = source.dim();
    let r = row.round();
    let c = col.round();
    if r < 0.0 || c < 0.0 || r as usize >= rows || c as usize >= cols {
        return None;
    }
    let value = source[[r as usize, c as usize]];
    if is_nodata(value) {
        None
    } else {
        Some(value)
    }
}

fn sample_bilinear(
    source: ArrayView2<'_, f64>,
    row: f64,
    col: f64,
    is_nodata: impl Fn(f64) -> bool,
) -> Option<f64> {
    let (rows, cols) = source.dim();
    if row < -0.5 || col < -0.5 || row > rows as f64 - 0.5 || col > cols as f64 - 0.5 {
        return None;
    }
    let r0 = row.floor().max(0.0) as usize;
    let c0 = col.floor().max(0.0) as usize;
    let r1 = (r0 + 1).min(rows - 1);
    let c1 = (c0 + 1).min(cols - 1);
    let dr = (row - r0 as f64).clamp(0.0, 1.0);
    let dc = (col - c0 as f64).clamp(0.0, 1.0);

    let corners = [
        source[[r0, c0]],
        source[[r0, c1]],
        source[[r1, c0]],
        source[[r1, c1]],
    ];
    // Any NODATA-touching support yields NODATA: the resampler never
    // invents ocean values from a mix of land and NODATA neighbors.
    if corners.iter().any(|&v| is_nodata(v)) {
        return None;
    }

    let top = corners[0] * (1.0 - dc) + corners[1] * dc;
    let bottom = corners[2] * (1.0 - dc) + corners[3] * dc;
    Some(top * (1.0 - dr) + bottom * dr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn is_nodata(v: f64) -> bool {
        v.is_nan()
    }

    #[test]
    fn nearest_rounds_to_closest_cell() {
        let grid = array![[1.0, 2.0], [3.0, 4.0]];
        let value = sample(grid.view(), 0.4, 0.6, ResamplingMethod::Nearest, is_nodata);
        assert_eq!(value, Some(2.0));
    }

    #[test]
    fn nearest_out_of_bounds_is_none() {
        let grid = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(
            sample(grid.view(), -1.0, 0.0, ResamplingMethod::Nearest, is_nodata),
            None
        );
    }

    #[test]
    fn bilinear_interpolates_between_four_cells() {
        let grid = array![[0.0, 10.0], [20.0, 30.0]];
        let value = sample(grid.view(), 0.5, 0.5, ResamplingMethod::Bilinear, is_nodata).unwrap();
        assert!((value - 15.0).abs() < 1e-9);
    }

    #[test]
    fn bilinear_any_nodata_neighbor_yields_none() {
        let grid = array![[0.0, f64::NAN], [20.0, 30.0]];
        assert_eq!(
            sample(grid.view(), 0.5, 0.5, ResamplingMethod::Bilinear, is_nodata),
            None
        );
    }
}
