//! GeoTIFF read/write, backed by the `tiff` crate.
//!
//! GeoTIFF has no time dimension, so a stack written here must carry
//! exactly one time step (`raster::GeoTiffFormat::write` enforces this
//! before calling in). Geometry is carried with the standard
//! `ModelPixelScaleTag`/`ModelTiepointTag` pair; a full `GeoKeyDirectory`
//! CRS encoding is out of scope (this pipeline only ever needs BNG/EPSG
//! identifiers, not arbitrary GeoTIFF CRS discovery), so the CRS string,
//! the NODATA sentinel, the variable name, the time step and any CF
//! attributes are instead packed into a single private ASCII tag as
//! `key=value` lines, GDAL's own `GDAL_METADATA` tag convention.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use climalign_core::{
    Affine, Calendar360Date, ClimalignError, ClimalignResult, GridGeometry, RasterStack, TimeStep,
    Variable,
};
use ndarray::Array3;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE_TAG: Tag = Tag::Unknown(33_550);
const MODEL_TIEPOINT_TAG: Tag = Tag::Unknown(33_922);
/// GDAL's private metadata tag, reused here for the pipeline's own
/// `key=value` blob rather than GDAL's XML schema.
const CLIMALIGN_METADATA_TAG: Tag = Tag::Unknown(42_112);

pub fn open(path: &Path) -> ClimalignResult<RasterStack> {
    let file = File::open(path).map_err(|source| ClimalignError::FormatError {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })?;
    let mut decoder = Decoder::new(file).map_err(|source| ClimalignError::FormatError {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })?;

    let (cols, rows) = decoder
        .dimensions()
        .map_err(|source| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;

    let metadata_blob = decoder
        .get_tag_ascii_string(CLIMALIGN_METADATA_TAG)
        .map_err(|source| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: format!("missing climalign metadata tag: {source}"),
        })?;
    let metadata = parse_metadata_blob(&metadata_blob);

    let pixel_scale = decoder
        .get_tag_f64_vec(MODEL_PIXEL_SCALE_TAG)
        .map_err(|source| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
    let tiepoint = decoder
        .get_tag_f64_vec(MODEL_TIEPOINT_TAG)
        .map_err(|source| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
    if pixel_scale.len() < 2 || tiepoint.len() < 6 {
        return Err(ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: "malformed ModelPixelScale/ModelTiepoint tags".into(),
        });
    }
    let pixel_width = pixel_scale[0];
    let pixel_height = -pixel_scale[1];
    let origin_x = tiepoint[3];
    let origin_y = tiepoint[4];

    let crs = metadata
        .get("crs")
        .cloned()
        .unwrap_or_else(|| "EPSG:27700".to_string());
    let nodata: f64 = metadata
        .get("nodata")
        .and_then(|v| v.parse().ok())
        .unwrap_or(-9999.0);
    let variable = metadata
        .get("variable")
        .and_then(|v| variable_from_token(v))
        .or_else(|| infer_variable_token(path).and_then(|t| variable_from_token(&t)))
        .ok_or_else(|| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: "could not determine variable for GeoTIFF".into(),
        })?;
    let time_step = metadata
        .get("time")
        .ok_or_else(|| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: "missing 'time' entry in climalign metadata tag".into(),
        })
        .and_then(|raw| parse_time_token(raw, path))?;

    let attributes: HashMap<String, String> = metadata
        .iter()
        .filter(|(k, _)| k.starts_with("attr."))
        .map(|(k, v)| (k.trim_start_matches("attr.").to_string(), v.clone()))
        .collect();

    let image = decoder
        .read_image()
        .map_err(|source| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
    let values: Vec<f64> = match image {
        DecodingResult::F64(v) => v,
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        other => {
            return Err(ClimalignError::FormatError {
                path: path.to_path_buf(),
                reason: format!("unsupported GeoTIFF sample format {other:?}"),
            })
        }
    };
    let data = Array3::from_shape_vec((1, rows as usize, cols as usize), values).map_err(
        |source| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        },
    )?;

    let grid = GridGeometry {
        crs,
        affine: Affine {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        },
        rows: rows as usize,
        cols: cols as usize,
    };

    RasterStack::new(variable, grid, vec![time_step], nodata, attributes, data)
}

pub fn write(path: &Path, stack: &RasterStack) -> ClimalignResult<()> {
    let (_, rows, cols) = stack.data().dim();
    let file = File::create(path).map_err(|source| ClimalignError::WriteError {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })?;
    let mut encoder = TiffEncoder::new(file).map_err(|source| ClimalignError::WriteError {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })?;
    let mut image = encoder
        .new_image::<colortype::Gray64Float>(cols as u32, rows as u32)
        .map_err(|source| ClimalignError::WriteError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;

    image
        .encoder()
        .write_tag(
            MODEL_PIXEL_SCALE_TAG,
            &[
                stack.grid.affine.pixel_width,
                -stack.grid.affine.pixel_height,
                0.0,
            ][..],
        )
        .and_then(|_| {
            image.encoder().write_tag(
                MODEL_TIEPOINT_TAG,
                &[
                    0.0,
                    0.0,
                    0.0,
                    stack.grid.affine.origin_x,
                    stack.grid.affine.origin_y,
                    0.0,
                ][..],
            )
        })
        .and_then(|_| {
            image
                .encoder()
                .write_tag(CLIMALIGN_METADATA_TAG, metadata_blob(stack).as_str())
        })
        .map_err(|source| ClimalignError::WriteError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;

    let data: Vec<f64> = stack.data().iter().copied().collect();
    image
        .write_data(&data)
        .map_err(|source| ClimalignError::WriteError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })
}

fn metadata_blob(stack: &RasterStack) -> String {
    let mut lines = vec![
        format!("crs={}", stack.grid.crs),
        format!("nodata={}", stack.nodata),
        format!("variable={}", stack.variable.as_str()),
        format!(
            "time={}",
            time_step_token(stack.time.first().expect("single-step GeoTIFF stack"))
        ),
    ];
    for (key, value) in &stack.attributes {
        lines.push(format!("attr.{key}={value}"));
    }
    lines.join("\n")
}

fn parse_metadata_blob(blob: &str) -> HashMap<String, String> {
    blob.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn time_step_token(step: &TimeStep) -> String {
    match step {
        TimeStep::Civil(date) => date.format("%Y-%m-%d").to_string(),
        TimeStep::Model360(d) => format!("M{:04}-{:02}-{:02}", d.year, d.month, d.day),
    }
}

fn parse_time_token(raw: &str, path: &Path) -> ClimalignResult<TimeStep> {
    if let Some(rest) = raw.strip_prefix('M') {
        let parts: Vec<&str> = rest.split('-').collect();
        if parts.len() != 3 {
            return Err(ClimalignError::FormatError {
                path: path.to_path_buf(),
                reason: format!("malformed model-360 time token '{raw}'"),
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
        chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(TimeStep::Civil)
            .map_err(|source| ClimalignError::FormatError {
                path: path.to_path_buf(),
                reason: source.to_string(),
            })
    }
}

fn variable_from_token(token: &str) -> Option<Variable> {
    match token {
        "tasmax" => Some(Variable::Tasmax),
        "tasmin" => Some(Variable::Tasmin),
        "pr" | "rainfall" => Some(Variable::Pr),
        _ => None,
    }
}

fn infer_variable_token(path: &Path) -> Option<String> {
    crate::raster::infer_variable_token(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_blob_round_trips_through_parser() {
        let blob = "crs=EPSG:27700\nnodata=-9999\nvariable=tasmax\ntime=2020-01-01\nattr.units=K";
        let parsed = parse_metadata_blob(blob);
        assert_eq!(parsed.get("crs").map(String::as_str), Some("EPSG:27700"));
        assert_eq!(parsed.get("attr.units").map(String::as_str), Some("K"));
    }

    #[test]
    fn time_token_round_trips_for_civil_date() {
        let date = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let token = time_step_token(&TimeStep::Civil(date));
        let parsed = parse_time_token(&token, Path::new("x.tif")).unwrap();
        assert_eq!(parsed, TimeStep::Civil(date));
    }

    #[test]
    fn time_token_round_trips_for_model360_date() {
        let d = Calendar360Date::new(1981, 12, 1).unwrap();
        let token = time_step_token(&TimeStep::Model360(d));
        let parsed = parse_time_token(&token, Path::new("x.tif")).unwrap();
        assert_eq!(parsed, TimeStep::Model360(d));
    }
}
