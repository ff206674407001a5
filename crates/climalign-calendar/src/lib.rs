//! # climalign-calendar
//!
//! Converts a CPM raster stack's 360-day model calendar onto a standard
//! civil calendar, per the hydrological-year convention documented in
//! [`mapping`].

pub mod converter;
pub mod mapping;

pub use converter::convert;
pub use mapping::{
    build_mapping, hydrological_year_window, CalendarMapping, MappingEntry, MODEL_YEAR_SLOTS,
};
