//! Unified error taxonomy for the climate alignment pipeline.
//!
//! Mirrors the error kinds named in the pipeline's design: each variant is a
//! distinct failure mode a task can hit, not a generic wrapper. Callers that
//! need an umbrella type (the batch runner, the CLI) convert these into
//! `anyhow::Error` at the boundary; within a single task, `ClimalignError` is
//! propagated with `?`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while discovering, reading, transforming or writing a
/// raster stack.
#[derive(Error, Debug)]
pub enum ClimalignError {
    /// An input path resolved by discovery has disappeared since planning.
    #[error("input not found: {0}")]
    InputNotFound(PathBuf),

    /// A source file could not be parsed, or lacks a recognizable variable
    /// or coordinate reference system.
    #[error("format error reading {path}: {reason}")]
    FormatError { path: PathBuf, reason: String },

    /// A 360-day conversion was requested on a stack whose time axis is
    /// already civil, or a civil-only operation was requested on a 360-day
    /// stack.
    #[error("calendar mismatch: {0}")]
    CalendarMismatch(String),

    /// The output of a reprojection does not bit-exactly match the
    /// reference grid's affine/shape. This indicates a configuration bug,
    /// not a transient failure, and is never silently retried.
    #[error("grid mismatch: {0}")]
    GridMismatch(String),

    /// A region's polygon does not intersect the stack's extent.
    #[error("region '{region}' does not intersect the stack extent")]
    RegionMismatch { region: String },

    /// Writing the output file failed; any temp file has been discarded.
    #[error("write error for {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    /// An invalid flag combination was requested (e.g. `project-hads`
    /// before any `project-cpm` output exists). Raised before dispatch.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O errors not otherwise classified above.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClimalignResult<T> = Result<T, ClimalignError>;

impl From<anyhow::Error> for ClimalignError {
    fn from(err: anyhow::Error) -> Self {
        ClimalignError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_region_name() {
        let err = ClimalignError::RegionMismatch {
            region: "Glasgow".into(),
        };
        assert!(err.to_string().contains("Glasgow"));
    }

    #[test]
    fn format_error_includes_path_and_reason() {
        let err = ClimalignError::FormatError {
            path: PathBuf::from("tasmax_05.nc"),
            reason: "truncated header".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("tasmax_05.nc"));
        assert!(msg.contains("truncated header"));
    }
}
