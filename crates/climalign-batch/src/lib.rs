//! # climalign-batch
//!
//! Turns discovered input files and selectors into the deterministic,
//! globally ordered task list (`spec.md` §4.E), then executes it under the
//! `project-cpm -> project-hads -> crop-cpm -> crop-hads` stage barrier with
//! a Rayon thread pool per stage (§4.F). One job's failure never aborts the
//! pool; it is caught and recorded in the stage's JSON manifest.

pub mod job;
pub mod manifest;
pub mod runner;

pub use job::{jobs_from_discovery, output_paths, shard, ClimJob, ClimJobRecord, JobSelectors};
pub use manifest::{load_batch_manifest, write_batch_manifest, BatchManifest};
pub use runner::{run_batch, run_staged_pipeline, BatchSummary, ClimRunnerConfig, OutputFormat};
