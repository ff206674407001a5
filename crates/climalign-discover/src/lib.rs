//! # climalign-discover
//!
//! Pure directory-scan discovery of the CPM/HADS input trees and
//! derivation of output paths from a task's inputs. No component here
//! reads a raster or touches the output tree; planning (dry run) and
//! execution both call through this crate so they see the same task
//! space (`spec.md` §9 "discovery is pure").

pub mod discovery;
pub mod naming;

pub use discovery::{discover_cpm, discover_hads, CpmFile, HadsFile};
pub use naming::derive_output_path;
