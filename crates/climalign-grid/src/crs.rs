//! Coordinate transforms between the handful of CRSes this pipeline
//! actually needs: CPM's rotated-pole grid, HADS/the reference grid's
//! British National Grid (EPSG:27700), and WGS84 for region polygons read
//! from a GIS vector file. A general-purpose geodesy library is out of
//! scope; `proj` (binding libproj, the same way the pack's `erfa-sys`
//! binds a C library via `pkg-config`/`autotools`) is used for exactly
//! these pairs.

use proj::Proj;
use thiserror::Error;

/// The reference grid's CRS for this pipeline: British National Grid.
pub const BNG_EPSG: &str = "EPSG:27700";
/// WGS84 geographic, used for region polygons supplied in lat/lon.
pub const WGS84_EPSG: &str = "EPSG:4326";

/// Rotated-pole PROJ4 string for the CPM product's native grid. The pole
/// location matches the rotated pole used by the UKCP18 CPM product.
pub const CPM_ROTATED_POLE_PROJ4: &str =
    "+proj=ob_tran +o_proj=longlat +o_lon_p=0 +o_lat_p=37.5 +lon_0=357.5 +ellps=WGS84 +no_defs";

#[derive(Debug, Error)]
pub enum CrsError {
    #[error("failed to build coordinate transform from '{from}' to '{to}': {source}")]
    Build {
        from: String,
        to: String,
        #[source]
        source: proj::ProjCreateError,
    },
    #[error("coordinate transform failed: {0}")]
    Transform(#[from] proj::ProjError),
}

/// A reusable forward coordinate transform between two CRS definitions
/// (EPSG codes or PROJ4/WKT strings).
pub struct CrsTransform {
    proj: Proj,
}

impl CrsTransform {
    pub fn new(from: &str, to: &str) -> Result<Self, CrsError> {
        let proj = Proj::new_known_crs(from, to, None).map_err(|source| CrsError::Build {
            from: from.to_string(),
            to: to.to_string(),
            source,
        })?;
        Ok(Self { proj })
    }

    /// Transform a single `(x, y)` point from the source CRS to the target
    /// CRS.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), CrsError> {
        let (ox, oy) = self.proj.convert((x, y))?;
        Ok((ox, oy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_round_trips() {
        let transform = CrsTransform::new(BNG_EPSG, BNG_EPSG).unwrap();
        let (x, y) = transform.transform(400_000.0, 500_000.0).unwrap();
        assert!((x - 400_000.0).abs() < 1e-6);
        assert!((y - 500_000.0).abs() < 1e-6);
    }
}
