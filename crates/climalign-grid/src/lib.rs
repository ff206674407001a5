//! # climalign-grid
//!
//! Coordinate reprojection and regridding onto the pipeline's shared
//! reference grid. Owns CRS transforms, resampling kernels, and the
//! derivation of the reference grid itself; carries no knowledge of file
//! formats or the task/batch layer above it.

pub mod crs;
pub mod kernel;
pub mod reference;
pub mod reproject;

pub use crs::{CrsError, CrsTransform, BNG_EPSG, CPM_ROTATED_POLE_PROJ4, WGS84_EPSG};
pub use reference::{derive_from_cpm_grid, REFERENCE_PIXEL_METRES};
pub use reproject::reproject;
