//! # climalign-io
//!
//! Raster and vector file I/O for the alignment pipeline: netCDF and
//! GeoTIFF raster stacks, atomic writes, and shapefile-backed region
//! polygons. Nothing here resamples or crops; it only gets bytes on and
//! off disk in the shape `climalign-core` expects.

pub mod atomic;
pub mod netcdf_backend;
pub mod raster;
pub mod tiff_backend;
pub mod vector;

pub use atomic::atomic_write;
pub use raster::{infer_variable_token, GeoTiffFormat, NetcdfFormat, RasterFormat};
pub use vector::load_region_registry;
