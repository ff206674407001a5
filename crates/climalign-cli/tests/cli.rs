//! Integration tests for the `climalign` binary, covering the dry-run task
//! count (scenario S4) and the configuration-error abort when `project-hads`
//! is requested without `project-cpm` or an explicit reference grid source
//! (scenario S6).

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

fn seed_cpm_hads_tree(root: &Path) {
    touch(&root.join("cpm/tasmax/05/latest/tasmax_rcp85_land-cpm_uk_2.2km_05_day_19811201-19821130.nc"));
    touch(&root.join("cpm/tasmax/06/latest/tasmax_rcp85_land-cpm_uk_2.2km_06_day_19811201-19821130.nc"));
    touch(&root.join("hads/tasmax/day/tasmax_hadukgrid_uk_1km_day_19940101-19940131.nc"));
}

#[test]
fn plan_reports_the_discovered_task_count_without_writing_anything() {
    let root = tempdir().unwrap();
    seed_cpm_hads_tree(root.path());
    let out_dir = root.path().join("out");

    let mut cmd = Command::cargo_bin("climalign").unwrap();
    cmd.arg("plan")
        .arg("--cpm-input-path").arg(root.path().join("cpm"))
        .arg("--hads-input-path").arg(root.path().join("hads"))
        .arg("--output-path").arg(&out_dir)
        .arg("--run").arg("05")
        .arg("--crop-cpm=false")
        .arg("--crop-hads=false");

    cmd.assert().success().stdout(contains("planned tasks"));

    // A dry run enumerates tasks but never creates the run directory.
    assert!(!out_dir.exists());
}

#[test]
fn project_hads_without_project_cpm_or_explicit_reference_grid_aborts_before_dispatch() {
    let root = tempdir().unwrap();
    seed_cpm_hads_tree(root.path());
    let out_dir = root.path().join("out");

    let mut cmd = Command::cargo_bin("climalign").unwrap();
    cmd.arg("run")
        .arg("--cpm-input-path").arg(root.path().join("cpm"))
        .arg("--hads-input-path").arg(root.path().join("hads"))
        .arg("--output-path").arg(&out_dir)
        .arg("--project-cpm=false")
        .arg("--crop-cpm=false")
        .arg("--crop-hads=false");

    cmd.assert().failure().code(2).stderr(contains("configuration error"));

    // Nothing should have been written: the abort happens before any task runs.
    assert!(!out_dir.exists());
}

#[test]
fn regions_list_reports_an_unreadable_registry_as_a_failure_not_a_panic() {
    let root = tempdir().unwrap();
    let missing = root.path().join("no_such_regions.shp");

    let mut cmd = Command::cargo_bin("climalign").unwrap();
    cmd.arg("regions").arg("list").arg("--regions-path").arg(&missing);

    cmd.assert().failure().code(1);
}
