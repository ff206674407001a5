//! Reads the region polygons used by `climalign-region`'s cropper from a
//! shapefile, the vector format the Rust geoscience ecosystem reaches for
//! (`spec.md` §6 "standard GIS format (shapefile or equivalent)").
//!
//! Only the attributes this pipeline needs are read: a name field (tried
//! as `name`, `NAME`, `region` in that order) and the polygon rings
//! themselves. Holes (interior rings) are folded into the same `Vec<Ring>`
//! as exterior rings, since cropping only needs the overall envelope
//! (`spec.md` §4.D) — interior/exterior distinction is irrelevant to a
//! bounding-box crop.

use std::path::Path;

use climalign_core::{ClimalignError, ClimalignResult, Region, RegionRegistry};
use dbase::FieldValue;
use shapefile::{Reader, Shape};

const NAME_FIELD_CANDIDATES: [&str; 3] = ["name", "NAME", "region"];

/// Load every polygon feature in `path` into a `RegionRegistry`, tagging
/// each with `crs` (the shapefile format carries no CRS of its own without
/// a `.prj` sidecar this pipeline does not parse, so the caller supplies
/// it — normally WGS84 for hand-digitized region boundaries).
pub fn load_region_registry(path: &Path, crs: &str) -> ClimalignResult<RegionRegistry> {
    let mut reader = Reader::from_path(path).map_err(|source| ClimalignError::FormatError {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })?;

    let mut regions = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.map_err(|source| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;

        let name = NAME_FIELD_CANDIDATES
            .iter()
            .find_map(|field| match record.get(*field) {
                Some(FieldValue::Character(Some(text))) => Some(text.trim().to_string()),
                _ => None,
            })
            .ok_or_else(|| ClimalignError::FormatError {
                path: path.to_path_buf(),
                reason: "polygon feature has no name/region attribute".into(),
            })?;

        let rings = match shape {
            Shape::Polygon(polygon) => polygon
                .rings()
                .iter()
                .map(|ring| ring.points().iter().map(|p| (p.x, p.y)).collect())
                .collect(),
            other => {
                return Err(ClimalignError::FormatError {
                    path: path.to_path_buf(),
                    reason: format!("expected polygon shape, found {other:?}"),
                })
            }
        };

        regions.push(Region {
            name,
            crs: crs.to_string(),
            rings,
        });
    }

    Ok(RegionRegistry { regions })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_format_error() {
        let result = load_region_registry(Path::new("/nonexistent/regions.shp"), "EPSG:4326");
        assert!(result.is_err());
    }
}
