//! Named polygon regions used only for cropping (`spec.md` §4.D): the
//! cropper clips to the tightest whole-pixel envelope of a region's
//! polygon, never to the polygon's exact shape.

use serde::{Deserialize, Serialize};

/// A single polygon ring in the region's own CRS, without holes: cropping
/// only needs the envelope, so interior rings are not modeled.
pub type Ring = Vec<(f64, f64)>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub crs: String,
    pub rings: Vec<Ring>,
}

impl Region {
    /// Bounding envelope `(min_x, min_y, max_x, max_y)` across all rings, in
    /// the region's own CRS.
    pub fn envelope(&self) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for ring in &self.rings {
            for &(x, y) in ring {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
        (min_x, min_y, max_x, max_y)
    }
}

/// In-memory registry mapping region names to their polygons, as loaded
/// from a vector file by `climalign-io::vector`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionRegistry {
    pub regions: Vec<Region>,
}

impl RegionRegistry {
    pub fn find(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_covers_all_points() {
        let region = Region {
            name: "Glasgow".into(),
            crs: "EPSG:27700".into(),
            rings: vec![vec![(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)]],
        };
        assert_eq!(region.envelope(), (0.0, 0.0, 10.0, 5.0));
    }

    #[test]
    fn registry_finds_by_name() {
        let registry = RegionRegistry {
            regions: vec![Region {
                name: "London".into(),
                crs: "EPSG:27700".into(),
                rings: vec![],
            }],
        };
        assert!(registry.find("London").is_some());
        assert!(registry.find("Cardiff").is_none());
    }
}
