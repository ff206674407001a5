//! Applies a `CalendarMapping` to a 360-day `RasterStack`, producing a
//! civil-calendar stack with identical spatial fields.

use climalign_core::{ClimalignError, ClimalignResult, RasterStack, TimeStep};
use ndarray::Array3;
use tracing::debug;

use crate::mapping::{combine, CalendarMapping};

/// Convert a 360-day CPM stack onto the civil calendar described by
/// `mapping`. `stack.time` must consist entirely of `TimeStep::Model360`
/// values whose flat ordinal matches the mapping's slot indexing
/// (`month_offset * 30 + local_slot`, §`mapping` module docs).
pub fn convert(stack: &RasterStack, mapping: &CalendarMapping) -> ClimalignResult<RasterStack> {
    if !stack.time.iter().all(TimeStep::is_model360) {
        return Err(ClimalignError::CalendarMismatch(
            "calendar conversion requires a 360-day source stack".into(),
        ));
    }
    let expected_slots = stack.time_len() as u32;
    let (_, rows, cols) = stack.data().dim();

    let mut output = Array3::<f64>::zeros((mapping.entries.len(), rows, cols));
    let mut civil_time = Vec::with_capacity(mapping.entries.len());

    for (out_t, entry) in mapping.entries.iter().enumerate() {
        for &(slot, _) in &entry.sources {
            if slot >= expected_slots {
                return Err(ClimalignError::CalendarMismatch(format!(
                    "mapping references source slot {slot} but stack only has {expected_slots} slots"
                )));
            }
        }
        for row in 0..rows {
            for col in 0..cols {
                let value = combine(entry, |slot| stack.data()[[slot as usize, row, col]]);
                output[[out_t, row, col]] = if entry
                    .sources
                    .iter()
                    .any(|&(slot, _)| stack.is_nodata(stack.data()[[slot as usize, row, col]]))
                {
                    stack.nodata
                } else {
                    value
                };
            }
        }
        civil_time.push(TimeStep::Civil(entry.civil_date));
    }

    debug!(
        variable = %stack.variable,
        civil_days = civil_time.len(),
        exact = mapping.exact_count(),
        interpolated = mapping.interpolated_count(),
        "converted 360-day stack to civil calendar"
    );

    RasterStack::new(
        stack.variable,
        stack.grid.clone(),
        civil_time,
        stack.nodata,
        stack.attributes.clone(),
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{build_mapping, hydrological_year_window};
    use chrono::NaiveDate;
    use climalign_core::{Affine, Calendar360Date, GridGeometry, InterpolationPolicy, Variable};

    fn grid() -> GridGeometry {
        GridGeometry {
            crs: "EPSG:27700".into(),
            affine: Affine {
                origin_x: 0.0,
                origin_y: 0.0,
                pixel_width: 2200.0,
                pixel_height: -2200.0,
            },
            rows: 1,
            cols: 1,
        }
    }

    fn model_stack(nslots: usize) -> RasterStack {
        let mut data = Array3::<f64>::zeros((nslots, 1, 1));
        for t in 0..nslots {
            data[[t, 0, 0]] = t as f64;
        }
        let time: Vec<_> = (0..nslots)
            .map(|t| {
                let month = (t / 30) as u8 + 1;
                let day = (t % 30) as u8 + 1;
                TimeStep::Model360(Calendar360Date::new(1981, month, day).unwrap())
            })
            .collect();
        RasterStack::new(Variable::Tasmax, grid(), time, -9999.0, Default::default(), data).unwrap()
    }

    #[test]
    fn converted_stack_has_civil_time_axis_of_expected_length() {
        let window = hydrological_year_window(NaiveDate::from_ymd_opt(1981, 12, 1).unwrap()).unwrap();
        let mapping = build_mapping(window, InterpolationPolicy::Nearest).unwrap();
        let stack = model_stack(360);
        let converted = convert(&stack, &mapping).unwrap();
        assert_eq!(converted.time_len(), 365);
        assert!(converted.time.iter().all(TimeStep::is_civil));
    }

    #[test]
    fn exact_days_preserve_source_value() {
        let window = hydrological_year_window(NaiveDate::from_ymd_opt(1981, 12, 1).unwrap()).unwrap();
        let mapping = build_mapping(window, InterpolationPolicy::Nearest).unwrap();
        let stack = model_stack(360);
        let converted = convert(&stack, &mapping).unwrap();
        // Dec 1 is slot 0 exactly.
        assert_eq!(converted.data()[[0, 0, 0]], 0.0);
    }

    #[test]
    fn rejects_civil_source_stack() {
        let civil_time = vec![TimeStep::Civil(NaiveDate::from_ymd_opt(1981, 12, 1).unwrap())];
        let data = Array3::<f64>::zeros((1, 1, 1));
        let stack = RasterStack::new(Variable::Tasmax, grid(), civil_time, -9999.0, Default::default(), data).unwrap();
        let window = hydrological_year_window(NaiveDate::from_ymd_opt(1981, 12, 1).unwrap()).unwrap();
        let mapping = build_mapping(window, InterpolationPolicy::Nearest).unwrap();
        assert!(convert(&stack, &mapping).is_err());
    }
}
