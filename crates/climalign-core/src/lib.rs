//! # climalign-core: shared data model
//!
//! The value types every other crate in the workspace builds on: the
//! gridded raster stack (§3), the reference grid, the two calendar
//! flavors, the product/variable/region identifiers, and the task model
//! that ties a unit of work to the output file it produces.
//!
//! Nothing in this crate performs I/O, resampling, or scheduling; it exists
//! so that `climalign-io`, `climalign-calendar`, `climalign-grid`,
//! `climalign-region`, `climalign-discover` and `climalign-batch` all speak
//! the same vocabulary.

pub mod calendar;
pub mod domain;
pub mod error;
pub mod grid;
pub mod raster;
pub mod region;
pub mod task;

pub use calendar::{Calendar360Date, TimeStep, TimeWindow};
pub use domain::{
    default_variable_aliases, resolve_variable, EnsembleRun, Product, RegionName, Variable,
    VariableAlias,
};
pub use error::{ClimalignError, ClimalignResult};
pub use grid::{Affine, GridGeometry, ReferenceGrid};
pub use raster::RasterStack;
pub use region::{Region, RegionRegistry, Ring};
pub use task::{InterpolationPolicy, Operation, ResamplingMethod, Task};
