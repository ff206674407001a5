//! Pure directory-scan discovery of CPM/HADS input files.
//!
//! Discovery never touches any output tree, never holds state across
//! calls, and is a pure function of its root path: given the same tree, it
//! returns the same list in the same order every time, which is what makes
//! dry-run planning and `--start-index`/`--total-from-index` sharding
//! well-defined (`spec.md` §9 "discovery is pure").

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use climalign_core::{ClimalignError, ClimalignResult, EnsembleRun, TimeWindow};
use walkdir::{DirEntry, WalkDir};

/// One discovered CPM source file: `<root>/<variable>/<run>/latest/<file>.nc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpmFile {
    pub variable_token: String,
    pub run: EnsembleRun,
    pub window: TimeWindow,
    pub path: PathBuf,
}

/// One discovered HADS source file: `<root>/<variable>/day/<file>.nc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HadsFile {
    pub variable_token: String,
    pub window: TimeWindow,
    pub path: PathBuf,
}

/// Scan `root` for CPM `.nc` files and parse their embedded window and
/// run. Returns results sorted by path, so the caller's own ordering
/// (`spec.md` §4.F "stable order of output paths") does not depend on
/// filesystem iteration order.
pub fn discover_cpm(root: &Path) -> ClimalignResult<Vec<CpmFile>> {
    let mut files = Vec::new();
    for entry in walk(root) {
        let entry = entry?;
        if !is_nc_file(&entry) {
            continue;
        }
        let path = entry.path();
        let Some((variable_token, run)) = cpm_variable_and_run(root, path) else {
            continue;
        };
        let window = window_from_filename(path)?;
        files.push(CpmFile {
            variable_token,
            run: EnsembleRun(run),
            window,
            path: path.to_path_buf(),
        });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Scan `root` for HADS `.nc` files and parse their embedded window.
pub fn discover_hads(root: &Path) -> ClimalignResult<Vec<HadsFile>> {
    let mut files = Vec::new();
    for entry in walk(root) {
        let entry = entry?;
        if !is_nc_file(&entry) {
            continue;
        }
        let path = entry.path();
        let Some(variable_token) = hads_variable(root, path) else {
            continue;
        };
        let window = window_from_filename(path)?;
        files.push(HadsFile {
            variable_token,
            window,
            path: path.to_path_buf(),
        });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn walk(root: &Path) -> impl Iterator<Item = ClimalignResult<DirEntry>> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(should_enter)
        .map(|entry| {
            entry.map_err(|err| {
                ClimalignError::InputNotFound(err.path().unwrap_or(root).to_path_buf())
            })
        })
}

fn should_enter(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if entry.file_type().is_dir() {
        match entry.file_name().to_str() {
            Some(".git") | Some("target") => false,
            Some(name) if name.starts_with('.') => false,
            _ => true,
        }
    } else {
        true
    }
}

fn is_nc_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("nc"))
            .unwrap_or(false)
}

/// Expects `<root>/<variable>/<run>/latest/<file>.nc`; returns
/// `(variable_token, run)` from the path's own subtree rather than the
/// filename, since the directory layout is the authoritative source for
/// `run` (the filename also embeds it, but per `spec.md` §9 open question
/// (a) configuration/layout is preferred to pattern inference wherever
/// both are available).
fn cpm_variable_and_run(root: &Path, path: &Path) -> Option<(String, String)> {
    let relative = path.strip_prefix(root).ok()?;
    let components: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    // [<variable>, <run>, "latest", <file>.nc]
    if components.len() != 4 || components[2] != "latest" {
        return None;
    }
    Some((components[0].to_string(), components[1].to_string()))
}

/// Expects `<root>/<variable>/day/<file>.nc`.
fn hads_variable(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let components: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    // [<variable>, "day", <file>.nc]
    if components.len() != 3 || components[1] != "day" {
        return None;
    }
    Some(components[0].to_string())
}

/// Extracts the `YYYYMMDD-YYYYMMDD` window token, which is always the
/// final `_`-delimited component of the filename stem. A hand parser with
/// explicit digit slicing is used instead of `regex`, matching the shape
/// of this fixed-width token.
fn window_from_filename(path: &Path) -> ClimalignResult<TimeWindow> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ClimalignError::FormatError {
            path: path.to_path_buf(),
            reason: "filename is not valid UTF-8".into(),
        })?;
    let token = stem.rsplit('_').next().ok_or_else(|| ClimalignError::FormatError {
        path: path.to_path_buf(),
        reason: "filename has no '_'-delimited window token".into(),
    })?;
    parse_window_token(token).ok_or_else(|| ClimalignError::FormatError {
        path: path.to_path_buf(),
        reason: format!("malformed date window token '{token}'"),
    })
}

fn parse_window_token(token: &str) -> Option<TimeWindow> {
    let (start, end) = token.split_once('-')?;
    if start.len() != 8 || end.len() != 8 {
        return None;
    }
    let start = parse_yyyymmdd(start)?;
    let end = parse_yyyymmdd(end)?;
    // Filenames embed an inclusive end date; the data model's half-open
    // `TimeWindow` needs the day after.
    let end_exclusive = end.succ_opt()?;
    TimeWindow::new(start, end_exclusive).ok()
}

fn parse_yyyymmdd(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = raw[0..4].parse().ok()?;
    let month: u32 = raw[4..6].parse().ok()?;
    let day: u32 = raw[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn discovers_cpm_files_with_run_and_window() {
        let dir = tempdir().unwrap();
        let file = dir.path().join(
            "tasmax/05/latest/tasmax_rcp85_land-cpm_uk_2.2km_05_day_19811201-19821130.nc",
        );
        touch(&file);

        let found = discover_cpm(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].variable_token, "tasmax");
        assert_eq!(found[0].run, EnsembleRun("05".into()));
        assert_eq!(found[0].window.start, NaiveDate::from_ymd_opt(1981, 12, 1).unwrap());
        assert_eq!(found[0].window.end, NaiveDate::from_ymd_opt(1982, 12, 1).unwrap());
    }

    #[test]
    fn discovers_hads_files_with_window() {
        let dir = tempdir().unwrap();
        let file = dir
            .path()
            .join("tasmax/day/tasmax_hadukgrid_uk_1km_day_19940101-19940131.nc");
        touch(&file);

        let found = discover_hads(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].variable_token, "tasmax");
        assert_eq!(found[0].window.civil_days(), 31);
    }

    #[test]
    fn ignores_files_outside_expected_subtree_shape() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("tasmax/stray_file_19940101-19940131.nc"));
        assert!(discover_hads(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn discovery_is_sorted_and_deterministic() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("tasmin/day/tasmin_hadukgrid_uk_1km_day_19940201-19940228.nc"));
        touch(&dir.path().join("tasmax/day/tasmax_hadukgrid_uk_1km_day_19940101-19940131.nc"));
        let found = discover_hads(dir.path()).unwrap();
        assert_eq!(found[0].variable_token, "tasmax");
        assert_eq!(found[1].variable_token, "tasmin");
    }

    #[test]
    fn rejects_malformed_window_token() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("tasmax/day/tasmax_hadukgrid_uk_1km_day_badtoken.nc"));
        assert!(discover_hads(dir.path()).is_err());
    }
}
