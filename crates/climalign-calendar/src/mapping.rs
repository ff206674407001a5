//! Builds the `civil_day -> (source_slot, weight)` table described in the
//! pipeline's design notes, and applies it to combine source values.
//!
//! # Convention
//!
//! A CPM file's 360 time slots cover exactly 12 consecutive calendar months
//! starting at the file's hydrological-year anchor (nominally December 1st,
//! per the filename's `YYYYMMDD-YYYYMMDD` window), each month holding
//! exactly 30 slots regardless of how many days that calendar month
//! actually has. Within month `m`, `Calendar360Date { month: m, day }`'s
//! zero-based local slot is `day - 1`; the file's flat slot index is
//! `month_offset * 30 + (day - 1)` where `month_offset` counts months
//! elapsed since the file's first month.
//!
//! For each real civil day in the file's 365/366-day nominal span, its
//! position within its own calendar month is scaled onto the model month's
//! 30 slots by aligning both months' first and last days:
//! `model_slot = civil_day_index * (30 - 1) / (civil_month_length - 1)`.
//! This is an explicit, deterministic choice (not the only possible one,
//! see `spec.md` §9) that makes the two endpoints of every month agree
//! exactly, which is what gives the "value preservation" property at zero
//! temporal distance.

use chrono::{Datelike, Duration, NaiveDate};
use climalign_core::{ClimalignError, ClimalignResult, InterpolationPolicy, TimeWindow};

/// Total slots in a 360-day model month.
const MODEL_MONTH_LEN: u32 = 30;
/// Total months in a 360-day model year.
const MODEL_YEAR_MONTHS: u32 = 12;
pub const MODEL_YEAR_SLOTS: u32 = MODEL_MONTH_LEN * MODEL_YEAR_MONTHS;

/// One civil day's mapping back to the 360-day source.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    pub civil_date: NaiveDate,
    /// `(file_slot_index, weight)` pairs; weights sum to 1.0. `Nearest`
    /// always yields exactly one pair; `Linear` yields one when the civil
    /// day lands exactly on a model slot, otherwise two.
    pub sources: Vec<(u32, f64)>,
    /// True when the nearest source slot is at zero temporal distance
    /// (`spec.md` §8 invariant 3: value preservation at distance 0).
    pub exact: bool,
}

/// The full table for one CPM file's civil span.
#[derive(Debug, Clone)]
pub struct CalendarMapping {
    pub civil_window: TimeWindow,
    pub policy: InterpolationPolicy,
    pub entries: Vec<MappingEntry>,
}

impl CalendarMapping {
    pub fn exact_count(&self) -> usize {
        self.entries.iter().filter(|e| e.exact).count()
    }

    pub fn interpolated_count(&self) -> usize {
        self.entries.len() - self.exact_count()
    }

    /// Number of requested civil days that fall outside `civil_window` and
    /// were therefore omitted rather than filled with a sentinel.
    pub fn omitted_count(&self, requested: &TimeWindow) -> usize {
        let requested_days = requested.civil_days().max(0) as usize;
        requested_days.saturating_sub(
            self.entries
                .iter()
                .filter(|e| requested.contains(e.civil_date))
                .count(),
        )
    }

    /// Restrict the mapping to the days inside `requested`, dropping any
    /// day the source window does not cover. This is how a caller realizes
    /// "the union of a shard and its complement equals the full run": the
    /// mapping for a sub-window is exactly the full mapping's entries
    /// filtered to that sub-window, never rebuilt from scratch.
    pub fn restrict_to(&self, requested: &TimeWindow) -> CalendarMapping {
        CalendarMapping {
            civil_window: *requested,
            policy: self.policy,
            entries: self
                .entries
                .iter()
                .filter(|e| requested.contains(e.civil_date))
                .cloned()
                .collect(),
        }
    }
}

/// The file's nominal civil window given its hydrological-year anchor: one
/// calendar year forward from `start`, used instead of trusting a
/// filename's embedded end date (`spec.md` §9 open question (b)).
pub fn hydrological_year_window(start: NaiveDate) -> ClimalignResult<TimeWindow> {
    let end = start
        .with_year(start.year() + 1)
        .ok_or_else(|| ClimalignError::CalendarMismatch("year overflow".into()))?;
    TimeWindow::new(start, end)
}

/// Build the full civil-day mapping table for a CPM file covering
/// `civil_window` (normally one hydrological year) under `policy`.
pub fn build_mapping(
    civil_window: TimeWindow,
    policy: InterpolationPolicy,
) -> ClimalignResult<CalendarMapping> {
    let start_year = civil_window.start.year();
    let start_month = civil_window.start.month();

    let mut entries = Vec::with_capacity(civil_window.civil_days().max(0) as usize);
    let mut date = civil_window.start;
    while date < civil_window.end {
        let month_offset =
            (date.year() - start_year) as i64 * 12 + date.month() as i64 - start_month as i64;
        if !(0..MODEL_YEAR_MONTHS as i64).contains(&month_offset) {
            return Err(ClimalignError::CalendarMismatch(format!(
                "civil date {date} falls outside the 12-month model span starting {}",
                civil_window.start
            )));
        }
        let civil_month_len = days_in_month(date.year(), date.month());
        let civil_day_index = date.day() - 1;

        let entry = map_one_day(date, month_offset as u32, civil_day_index, civil_month_len, policy);
        entries.push(entry);
        date += Duration::days(1);
    }

    Ok(CalendarMapping {
        civil_window,
        policy,
        entries,
    })
}

fn map_one_day(
    civil_date: NaiveDate,
    month_offset: u32,
    civil_day_index: u32,
    civil_month_len: u32,
    policy: InterpolationPolicy,
) -> MappingEntry {
    let base = month_offset * MODEL_MONTH_LEN;

    if civil_month_len <= 1 {
        let slot = base;
        return MappingEntry {
            civil_date,
            sources: vec![(slot, 1.0)],
            exact: true,
        };
    }

    let position =
        civil_day_index as f64 * (MODEL_MONTH_LEN as f64 - 1.0) / (civil_month_len as f64 - 1.0);

    match policy {
        InterpolationPolicy::Nearest => {
            let lower = position.floor();
            let frac = position - lower;
            // Ties (frac == 0.5) break toward the earlier slot.
            let local_slot = if frac <= 0.5 { lower as u32 } else { lower as u32 + 1 };
            let local_slot = local_slot.min(MODEL_MONTH_LEN - 1);
            MappingEntry {
                civil_date,
                sources: vec![(base + local_slot, 1.0)],
                exact: frac == 0.0,
            }
        }
        InterpolationPolicy::Linear => {
            let lower = position.floor();
            let frac = position - lower;
            let lower_slot = (lower as u32).min(MODEL_MONTH_LEN - 1);
            if frac == 0.0 {
                MappingEntry {
                    civil_date,
                    sources: vec![(base + lower_slot, 1.0)],
                    exact: true,
                }
            } else {
                let upper_slot = (lower_slot + 1).min(MODEL_MONTH_LEN - 1);
                MappingEntry {
                    civil_date,
                    sources: vec![(base + lower_slot, 1.0 - frac), (base + upper_slot, frac)],
                    exact: false,
                }
            }
        }
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let this_month = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month");
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).expect("valid month")
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).expect("valid month")
    };
    (next_month - this_month).num_days() as u32
}

/// Combine a raw 360-slot source array's values at `entry.sources`, via
/// `get(slot)`, into the single output value for that civil day. NODATA
/// detection is the caller's responsibility (§4.B keeps this a pure numeric
/// combination; NODATA-awareness lives in `climalign-grid`/the task runner,
/// which know the stack's sentinel).
pub fn combine<F: Fn(u32) -> f64>(entry: &MappingEntry, get: F) -> f64 {
    entry
        .sources
        .iter()
        .map(|&(slot, weight)| get(slot) * weight)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn hydrological_window_spans_one_year() {
        let window = hydrological_year_window(ymd(1981, 12, 1)).unwrap();
        assert_eq!(window.end, ymd(1982, 12, 1));
        assert_eq!(window.civil_days(), 365);
    }

    #[test]
    fn full_year_has_365_days_in_non_leap_span() {
        let window = hydrological_year_window(ymd(1981, 12, 1)).unwrap();
        let mapping = build_mapping(window, InterpolationPolicy::Nearest).unwrap();
        assert_eq!(mapping.entries.len(), 365);
    }

    #[test]
    fn leap_span_has_366_days() {
        // Dec 1983 -> Nov 1984 contains Feb 29 1984.
        let window = hydrological_year_window(ymd(1983, 12, 1)).unwrap();
        let mapping = build_mapping(window, InterpolationPolicy::Nearest).unwrap();
        assert_eq!(mapping.entries.len(), 366);
    }

    #[test]
    fn feb_29_maps_to_model_day_59_of_the_model_year() {
        let window = hydrological_year_window(ymd(1983, 12, 1)).unwrap();
        let mapping = build_mapping(window, InterpolationPolicy::Nearest).unwrap();
        let entry = mapping
            .entries
            .iter()
            .find(|e| e.civil_date == ymd(1984, 2, 29))
            .unwrap();
        // month_offset for Feb is 2 (Dec=0, Jan=1, Feb=2); local slot 29 (last of Feb).
        assert_eq!(entry.sources, vec![(2 * 30 + 29, 1.0)]);
    }

    #[test]
    fn month_endpoints_are_exact_for_nearest_and_linear() {
        let window = hydrological_year_window(ymd(1981, 12, 1)).unwrap();
        for policy in [InterpolationPolicy::Nearest, InterpolationPolicy::Linear] {
            let mapping = build_mapping(window, policy).unwrap();
            let first_of_dec = mapping
                .entries
                .iter()
                .find(|e| e.civil_date == ymd(1981, 12, 1))
                .unwrap();
            assert!(first_of_dec.exact);
            assert_eq!(first_of_dec.sources, vec![(0, 1.0)]);

            let last_of_dec = mapping
                .entries
                .iter()
                .find(|e| e.civil_date == ymd(1981, 12, 31))
                .unwrap();
            assert!(last_of_dec.exact);
            assert_eq!(last_of_dec.sources, vec![(29, 1.0)]);
        }
    }

    #[test]
    fn nearest_policy_always_yields_a_single_slot() {
        let window = hydrological_year_window(ymd(1981, 12, 1)).unwrap();
        let mapping = build_mapping(window, InterpolationPolicy::Nearest).unwrap();
        assert!(mapping.entries.iter().all(|e| e.sources.len() == 1));
    }

    #[test]
    fn linear_policy_weights_sum_to_one() {
        let window = hydrological_year_window(ymd(1981, 12, 1)).unwrap();
        let mapping = build_mapping(window, InterpolationPolicy::Linear).unwrap();
        for entry in &mapping.entries {
            let total: f64 = entry.sources.iter().map(|(_, w)| w).sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn restrict_to_subset_matches_filtering_full_mapping() {
        let window = hydrological_year_window(ymd(1981, 12, 1)).unwrap();
        let mapping = build_mapping(window, InterpolationPolicy::Nearest).unwrap();
        let sub = TimeWindow::new(ymd(1982, 1, 1), ymd(1982, 2, 1)).unwrap();
        let restricted = mapping.restrict_to(&sub);
        assert_eq!(restricted.entries.len(), 31);
        assert!(restricted.entries.iter().all(|e| sub.contains(e.civil_date)));
    }

    #[test]
    fn combine_applies_weights() {
        let entry = MappingEntry {
            civil_date: ymd(1981, 12, 1),
            sources: vec![(0, 0.25), (1, 0.75)],
            exact: false,
        };
        let values = [10.0, 20.0];
        let combined = combine(&entry, |slot| values[slot as usize]);
        assert!((combined - 17.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_date_outside_twelve_month_span() {
        let window = TimeWindow::new(ymd(1981, 12, 1), ymd(1983, 1, 1)).unwrap();
        assert!(build_mapping(window, InterpolationPolicy::Nearest).is_err());
    }
}
