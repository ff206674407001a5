//! The gridded raster stack: the one value type every component in this
//! pipeline reads or produces.

use std::collections::HashMap;

use ndarray::Array3;

use crate::calendar::TimeStep;
use crate::domain::Variable;
use crate::error::{ClimalignError, ClimalignResult};
use crate::grid::GridGeometry;

/// A `(time, y, x)`-indexed raster time series with its coordinate
/// reference system, affine transform, NODATA sentinel, and any CF
/// attributes inherited from the source file.
///
/// Invariants enforced at construction: time is strictly monotonic
/// non-decreasing, and the time axis length matches the array's first
/// dimension. The affine map's injectivity is a property of
/// `Affine::inverse`/`pixel_center` rather than something re-checked per
/// stack.
#[derive(Debug, Clone)]
pub struct RasterStack {
    pub variable: Variable,
    pub grid: GridGeometry,
    pub time: Vec<TimeStep>,
    pub nodata: f64,
    pub attributes: HashMap<String, String>,
    data: Array3<f64>,
}

impl RasterStack {
    pub fn new(
        variable: Variable,
        grid: GridGeometry,
        time: Vec<TimeStep>,
        nodata: f64,
        attributes: HashMap<String, String>,
        data: Array3<f64>,
    ) -> ClimalignResult<Self> {
        let (t, rows, cols) = data.dim();
        if t != time.len() {
            return Err(ClimalignError::FormatError {
                path: Default::default(),
                reason: format!(
                    "time axis has {} steps but data has {} time slices",
                    time.len(),
                    t
                ),
            });
        }
        if (rows, cols) != grid.shape() {
            return Err(ClimalignError::FormatError {
                path: Default::default(),
                reason: format!(
                    "data shape {:?} does not match grid shape {:?}",
                    (rows, cols),
                    grid.shape()
                ),
            });
        }
        ensure_monotonic(&time)?;
        Ok(Self {
            variable,
            grid,
            time,
            nodata,
            attributes,
            data,
        })
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array3<f64> {
        &mut self.data
    }

    pub fn into_data(self) -> Array3<f64> {
        self.data
    }

    pub fn time_len(&self) -> usize {
        self.time.len()
    }

    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || (value - self.nodata).abs() < f64::EPSILON
    }

    /// A single time slice `[y, x]` view, used by the region cropper so
    /// that cropping and then reading a slice is equivalent to reading then
    /// cropping (`spec.md` §8 property test).
    pub fn slice(&self, time_index: usize) -> ndarray::ArrayView2<'_, f64> {
        self.data.index_axis(ndarray::Axis(0), time_index)
    }
}

fn ensure_monotonic(time: &[TimeStep]) -> ClimalignResult<()> {
    for pair in time.windows(2) {
        let ordered = match (pair[0], pair[1]) {
            (TimeStep::Civil(a), TimeStep::Civil(b)) => a <= b,
            (TimeStep::Model360(a), TimeStep::Model360(b)) => a <= b,
            _ => {
                return Err(ClimalignError::CalendarMismatch(
                    "raster stack mixes model-360 and civil time steps".into(),
                ))
            }
        };
        if !ordered {
            return Err(ClimalignError::CalendarMismatch(
                "time axis is not monotonic non-decreasing".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar360Date;
    use crate::grid::{Affine, GridGeometry};
    use ndarray::Array3;

    fn grid(rows: usize, cols: usize) -> GridGeometry {
        GridGeometry {
            crs: "EPSG:27700".into(),
            affine: Affine {
                origin_x: 0.0,
                origin_y: 0.0,
                pixel_width: 2200.0,
                pixel_height: -2200.0,
            },
            rows,
            cols,
        }
    }

    #[test]
    fn rejects_mismatched_time_length() {
        let data = Array3::<f64>::zeros((2, 3, 3));
        let time = vec![TimeStep::Model360(Calendar360Date::new(1981, 12, 1).unwrap())];
        let result = RasterStack::new(Variable::Tasmax, grid(3, 3), time, -9999.0, Default::default(), data);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_monotonic_time() {
        let data = Array3::<f64>::zeros((2, 2, 2));
        let time = vec![
            TimeStep::Model360(Calendar360Date::new(1981, 12, 2).unwrap()),
            TimeStep::Model360(Calendar360Date::new(1981, 12, 1).unwrap()),
        ];
        let result = RasterStack::new(Variable::Tasmax, grid(2, 2), time, -9999.0, Default::default(), data);
        assert!(result.is_err());
    }

    #[test]
    fn accepts_well_formed_stack() {
        let data = Array3::<f64>::zeros((1, 2, 2));
        let time = vec![TimeStep::Model360(Calendar360Date::new(1981, 12, 1).unwrap())];
        let stack = RasterStack::new(Variable::Tasmax, grid(2, 2), time, -9999.0, Default::default(), data).unwrap();
        assert_eq!(stack.time_len(), 1);
        assert!(stack.is_nodata(-9999.0));
        assert!(!stack.is_nodata(12.3));
    }
}
