//! # climalign-region
//!
//! Crops aligned raster stacks to named regions' rectangular bounding
//! envelopes. Reads no files itself; region polygons are supplied by
//! `climalign-io::vector` and passed in as `climalign_core::Region` values.

pub mod crop;

pub use crop::crop_to_region;
