//! The task model: a value object carrying exactly what is needed to
//! deterministically produce one output file from inputs already on disk.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::calendar::TimeWindow;
use crate::domain::{EnsembleRun, Product, RegionName, Variable};

/// Which transform a task performs. `ProjectHads` requires a CPM output to
/// already exist as its reference-grid source, which is why the stage
/// barrier orders `project-cpm` before `project-hads`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Operation {
    ProjectCpm,
    ProjectHads,
    CropCpm,
    CropHads,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ProjectCpm => "project-cpm",
            Operation::ProjectHads => "project-hads",
            Operation::CropCpm => "crop-cpm",
            Operation::CropHads => "crop-hads",
        }
    }

    pub fn product(&self) -> Product {
        match self {
            Operation::ProjectCpm | Operation::CropCpm => Product::Cpm,
            Operation::ProjectHads | Operation::CropHads => Product::Hads,
        }
    }

    /// Tasks of this operation may not start until every task of this
    /// predecessor operation (if any) has completed, enforcing the stage
    /// barrier `project-cpm -> project-hads -> crop-* `.
    pub fn predecessor(&self) -> Option<Operation> {
        match self {
            Operation::ProjectCpm => None,
            Operation::ProjectHads => Some(Operation::ProjectCpm),
            Operation::CropCpm => Some(Operation::ProjectCpm),
            Operation::CropHads => Some(Operation::ProjectHads),
        }
    }

    /// The fixed stage order used both for barrier enforcement and for
    /// ordering a dry-run's planned task listing.
    pub fn stage_order() -> [Operation; 4] {
        [
            Operation::ProjectCpm,
            Operation::ProjectHads,
            Operation::CropCpm,
            Operation::CropHads,
        ]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resampling/interpolation parameters a task carries. Distinct from the
/// per-component enums in `climalign-grid`/`climalign-calendar` so that
/// `climalign-core` has no dependency on either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResamplingMethod {
    Nearest,
    Bilinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpolationPolicy {
    Nearest,
    Linear,
}

/// One unit of work: produce `output_path` from `input_paths` under
/// `operation`, with the given parameters. Tasks order lexicographically by
/// output path so that scheduling is deterministic and sharding by index is
/// well-defined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub operation: Operation,
    pub variable: Variable,
    pub run: Option<EnsembleRun>,
    pub region: Option<RegionName>,
    pub window: TimeWindow,
    pub input_paths: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub resampling: ResamplingMethod,
    pub interpolation: InterpolationPolicy,
    pub reference_grid_source: Option<PathBuf>,
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.output_path == other.output_path
    }
}
impl Eq for Task {}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task {
    fn cmp(&self, other: &Self) -> Ordering {
        self.output_path.cmp(&other.output_path)
    }
}

impl std::hash::Hash for Task {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.output_path.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn window() -> TimeWindow {
        TimeWindow::new(
            NaiveDate::from_ymd_opt(1981, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(1982, 12, 1).unwrap(),
        )
        .unwrap()
    }

    fn task(path: &str) -> Task {
        Task {
            operation: Operation::ProjectCpm,
            variable: Variable::Tasmax,
            run: Some(EnsembleRun("05".into())),
            region: None,
            window: window(),
            input_paths: vec![],
            output_path: PathBuf::from(path),
            resampling: ResamplingMethod::Nearest,
            interpolation: InterpolationPolicy::Nearest,
            reference_grid_source: None,
        }
    }

    #[test]
    fn tasks_order_by_output_path() {
        let mut tasks = vec![task("b.nc"), task("a.nc"), task("c.nc")];
        tasks.sort();
        let paths: Vec<_> = tasks.iter().map(|t| t.output_path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["a.nc", "b.nc", "c.nc"]);
    }

    #[test]
    fn project_hads_depends_on_project_cpm() {
        assert_eq!(Operation::ProjectHads.predecessor(), Some(Operation::ProjectCpm));
        assert_eq!(Operation::ProjectCpm.predecessor(), None);
        assert_eq!(Operation::CropHads.predecessor(), Some(Operation::ProjectHads));
    }
}
