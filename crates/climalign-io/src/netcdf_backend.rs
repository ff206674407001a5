//! netCDF read/write backed by the `netcdf` crate.
//!
//! Grid geometry and calendar metadata are carried as plain global/variable
//! attributes rather than full CF grid-mapping machinery (out of scope, per
//! `spec.md`'s CRS-pair boundary): `crs`, `origin_x`, `origin_y`,
//! `pixel_width`, `pixel_height`, `nodata`. The time axis is written as a
//! `time` string variable, one ISO-8601 civil date per step, or `M<year>-
//! <month>-<day>` for a still-360-day stack — this pipeline's own encoding,
//! since calendar-360 is not representable by a CF `units`/`calendar` pair
//! the `netcdf` crate understands out of the box.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use climalign_core::{
    Affine, Calendar360Date, ClimalignError, ClimalignResult, GridGeometry, RasterStack, TimeStep,
    Variable,
};
use ndarray::Array3;

use crate::raster::{infer_variable_token, warn_on_attribute_mismatch};

pub fn open(path: &Path) -> ClimalignResult<RasterStack> {
    let file = netcdf::open(path).map_err(|source| ClimalignError::FormatError {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })?;

    let token = infer_variable_token(path).ok_or_else(|| ClimalignError::FormatError {
        path: path.to_path_buf(),
        reason: "could not infer variable name from filename".into(),
    })?;
    let variable = variable_from_token(&token).ok_or_else(|| ClimalignError::FormatError {
        path: path.to_path_buf(),
        reason: format!("unrecognized variable token '{token}'"),
    })?;

    let data_var = file
        .variable(&token)
        .ok_or_else(|| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: format!("variable '{token}' not found in file"),
        })?;
    let data: Array3<f64> = data_var
        .values::<f64, _>(..)
        .map_err(|source| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?
        .into_dimensionality()
        .map_err(|source| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;

    let attributes = read_string_attributes(&data_var);
    warn_on_attribute_mismatch(path, &token, &attributes);

    let (_, rows, cols) = data.dim();
    let grid = GridGeometry {
        crs: read_global_attr(&file, "crs").unwrap_or_else(|| "EPSG:27700".to_string()),
        affine: Affine {
            origin_x: read_global_attr_f64(&file, "origin_x").unwrap_or(0.0),
            origin_y: read_global_attr_f64(&file, "origin_y").unwrap_or(0.0),
            pixel_width: read_global_attr_f64(&file, "pixel_width").unwrap_or(2_200.0),
            pixel_height: read_global_attr_f64(&file, "pixel_height").unwrap_or(-2_200.0),
        },
        rows,
        cols,
    };
    let nodata = read_global_attr_f64(&file, "nodata").unwrap_or(-9999.0);

    let time_var = file
        .variable("time")
        .ok_or_else(|| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: "missing 'time' variable".into(),
        })?;
    let time = read_time_axis(&time_var, path)?;

    RasterStack::new(variable, grid, time, nodata, attributes, data)
}

pub fn write(path: &Path, stack: &RasterStack) -> ClimalignResult<()> {
    let mut file = netcdf::create(path).map_err(|source| ClimalignError::WriteError {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })?;

    let (t, rows, cols) = stack.data().dim();
    file.add_dimension("time", t)
        .and_then(|_| file.add_dimension("y", rows))
        .and_then(|_| file.add_dimension("x", cols))
        .map_err(|source| ClimalignError::WriteError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;

    let mut data_var = file
        .add_variable::<f64>(stack.variable.as_str(), &["time", "y", "x"])
        .map_err(|source| ClimalignError::WriteError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
    data_var
        .put_values(stack.data().as_slice().unwrap(), ..)
        .map_err(|source| ClimalignError::WriteError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
    for (key, value) in &stack.attributes {
        let _ = data_var.put_attribute(key, value.as_str());
    }

    let time_strings: Vec<String> = stack.time.iter().map(time_step_to_string).collect();
    let mut time_var = file
        .add_string_variable("time", &["time"])
        .map_err(|source| ClimalignError::WriteError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
    for (i, value) in time_strings.iter().enumerate() {
        time_var
            .put_string(value, i)
            .map_err(|source| ClimalignError::WriteError {
                path: path.to_path_buf(),
                reason: source.to_string(),
            })?;
    }

    file.add_attribute("crs", stack.grid.crs.as_str())
        .and_then(|_| file.add_attribute("origin_x", stack.grid.affine.origin_x))
        .and_then(|_| file.add_attribute("origin_y", stack.grid.affine.origin_y))
        .and_then(|_| file.add_attribute("pixel_width", stack.grid.affine.pixel_width))
        .and_then(|_| file.add_attribute("pixel_height", stack.grid.affine.pixel_height))
        .and_then(|_| file.add_attribute("nodata", stack.nodata))
        .map_err(|source| ClimalignError::WriteError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;

    Ok(())
}

fn variable_from_token(token: &str) -> Option<Variable> {
    match token {
        "tasmax" => Some(Variable::Tasmax),
        "tasmin" => Some(Variable::Tasmin),
        "pr" | "rainfall" => Some(Variable::Pr),
        _ => None,
    }
}

fn time_step_to_string(step: &TimeStep) -> String {
    match step {
        TimeStep::Civil(date) => date.format("%Y-%m-%d").to_string(),
        TimeStep::Model360(d) => format!("M{:04}-{:02}-{:02}", d.year, d.month, d.day),
    }
}

fn read_time_axis(var: &netcdf::Variable, path: &Path) -> ClimalignResult<Vec<TimeStep>> {
    let len = var.len();
    let mut steps = Vec::with_capacity(len);
    for i in 0..len {
        let raw = var
            .string_value(i)
            .map_err(|source| ClimalignError::FormatError {
                path: path.to_path_buf(),
                reason: source.to_string(),
            })?;
        steps.push(parse_time_string(&raw, path)?);
    }
    Ok(steps)
}

fn parse_time_string(raw: &str, path: &Path) -> ClimalignResult<TimeStep> {
    if let Some(rest) = raw.strip_prefix('M') {
        let parts: Vec<&str> = rest.split('-').collect();
        if parts.len() != 3 {
            return Err(ClimalignError::FormatError {
                path: path.to_path_buf(),
                reason: format!("malformed model-360 time value '{raw}'"),
            });
        }
        let year: i32 = parts[0].parse().map_err(|_| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: format!("malformed model-360 year in '{raw}'"),
        })?;
        let month: u8 = parts[1].parse().map_err(|_| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: format!("malformed model-360 month in '{raw}'"),
        })?;
        let day: u8 = parts[2].parse().map_err(|_| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: format!("malformed model-360 day in '{raw}'"),
        })?;
        Ok(TimeStep::Model360(Calendar360Date::new(year, month, day)?))
    } else {
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|source| {
            ClimalignError::FormatError {
                path: path.to_path_buf(),
                reason: source.to_string(),
            }
        })?;
        Ok(TimeStep::Civil(date))
    }
}

fn read_global_attr(file: &netcdf::File, name: &str) -> Option<String> {
    file.attribute(name)
        .and_then(|attr| attr.value().ok())
        .and_then(|value| value.try_into().ok())
}

fn read_global_attr_f64(file: &netcdf::File, name: &str) -> Option<f64> {
    file.attribute(name)
        .and_then(|attr| attr.value().ok())
        .and_then(|value| value.try_into().ok())
}

fn read_string_attributes(var: &netcdf::Variable) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for attr in var.attributes() {
        if let Ok(value) = attr.value() {
            if let Ok(text) = TryInto::<String>::try_into(value) {
                attrs.insert(attr.name().to_string(), text);
            }
        }
    }
    attrs
}
