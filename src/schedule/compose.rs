//! Final schedule composition.
//!
//! Turns slot bindings into per-day period lists: parses out the
//! course code and room location, resolves display names through the
//! course table, sorts each day chronologically, and folds contiguous
//! lab periods of the same course into single extended blocks.

use chrono::NaiveTime;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::schedule::courses::CourseTable;
use crate::schedule::parse::{extract_course_code, extract_location};
use crate::schedule::slots::{SlotBinding, DAY_LABELS};

/// A resolved, time-bound course occurrence within a day.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PeriodInfo {
    /// Full window, `HH:MM-HH:MM`.
    pub time: String,
    /// Raw period-code text as read from the cell.
    pub course_code: String,
    /// Canonical course code extracted from the raw text, if any.
    pub actual_code: Option<String>,
    /// Display name from the course table, or the raw text when no
    /// mapping exists.
    pub course_name: String,
    /// Room location, or `"Unknown"`.
    pub location: String,
    pub start_time: String,
    pub end_time: String,
}

/// Weekly schedule: one period list per day, every day present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekSchedule {
    days: [Vec<PeriodInfo>; 7],
}

impl WeekSchedule {
    /// Periods for a day label (`MON`..`SUN`).
    pub fn day(&self, label: &str) -> Option<&[PeriodInfo]> {
        DAY_LABELS
            .iter()
            .position(|&l| l == label)
            .map(|i| self.days[i].as_slice())
    }

    /// Iterates days in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[PeriodInfo])> {
        DAY_LABELS
            .iter()
            .zip(self.days.iter())
            .map(|(&label, periods)| (label, periods.as_slice()))
    }

    /// Total periods across the week.
    pub fn period_count(&self) -> usize {
        self.days.iter().map(Vec::len).sum()
    }
}

// Serialized as a map keyed by day label, in calendar order, so
// downstream consumers never branch on a missing key.
impl Serialize for WeekSchedule {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(DAY_LABELS.len()))?;
        for (label, periods) in self.iter() {
            map.serialize_entry(label, periods)?;
        }
        map.end()
    }
}

/// Splits `HH:MM-HH:MM` into parsed start and end times.
pub fn parse_time_range(range: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (start, end) = range.split_once('-')?;
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
    Some((start, end))
}

/// Composes the final week schedule from slot bindings.
pub fn compose_week(bindings: &[SlotBinding], courses: &CourseTable) -> WeekSchedule {
    let mut schedule = WeekSchedule::default();

    for binding in bindings {
        if binding.day >= DAY_LABELS.len() {
            continue;
        }
        schedule.days[binding.day].push(build_period(binding, courses));
    }

    for (i, day) in schedule.days.iter_mut().enumerate() {
        day.sort_by_key(|p| parse_time_range(&p.time).map(|(start, _)| start));
        let merged = merge_lab_periods(std::mem::take(day));
        debug!(day = DAY_LABELS[i], periods = merged.len(), "composed day");
        *day = merged;
    }

    schedule
}

fn build_period(binding: &SlotBinding, courses: &CourseTable) -> PeriodInfo {
    let actual_code = extract_course_code(&binding.text);
    let course_name = actual_code
        .as_deref()
        .and_then(|code| courses.resolve_name(code))
        .unwrap_or(&binding.text)
        .to_string();

    let (start_time, end_time) = match binding.time_range.split_once('-') {
        Some((start, end)) => (start.to_string(), end.to_string()),
        None => (binding.time_range.clone(), String::new()),
    };

    PeriodInfo {
        time: binding.time_range.clone(),
        course_code: binding.text.clone(),
        actual_code,
        course_name,
        location: extract_location(&binding.text),
        start_time,
        end_time,
    }
}

/// Whether a canonical code marks a lab or elective session.
fn is_lab_code(actual_code: Option<&str>) -> bool {
    actual_code.is_some_and(|code| code.ends_with('P') || code.ends_with('E'))
}

/// Folds runs of contiguous same-course lab periods into single blocks.
///
/// A run extends while the next period shares the canonical code and
/// starts exactly when the accumulated block ends. Merged blocks get a
/// `" Lab"` name suffix unless already present. Applying the fold to
/// already-merged output changes nothing.
fn merge_lab_periods(periods: Vec<PeriodInfo>) -> Vec<PeriodInfo> {
    let mut merged = Vec::with_capacity(periods.len());
    let mut i = 0;

    while i < periods.len() {
        let current = &periods[i];

        if is_lab_code(current.actual_code.as_deref()) {
            let mut end_time = current.end_time.clone();
            let mut last = i;

            for (j, next) in periods.iter().enumerate().skip(i + 1) {
                if next.actual_code == current.actual_code && next.start_time == end_time {
                    end_time = next.end_time.clone();
                    last = j;
                } else {
                    break;
                }
            }

            if last > i {
                let mut block = current.clone();
                block.time = format!("{}-{}", current.start_time, end_time);
                block.end_time = end_time;
                if !block.course_name.ends_with("Lab") {
                    block.course_name.push_str(" Lab");
                }
                merged.push(block);
                i = last + 1;
                continue;
            }
        }

        merged.push(current.clone());
        i += 1;
    }

    merged
}
