use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use polars::prelude::*;

use crate::error::StatsError;
use crate::model::month_name;
use crate::schema::{derived, trip};

/// Separator used to form the start/end station pair. The exact string is
/// load-bearing: downstream consumers match on `"{start} to {end}"`.
const TRIP_SEPARATOR: &str = " to ";

/// Display configuration passed into the shell and pager explicitly instead
/// of living in process-global state.
#[derive(Debug, Clone, Copy)]
pub struct ReportConfig {
    /// Rows revealed per page of raw data.
    pub page_size: usize,
    /// Print elapsed wall time after each report.
    pub timing: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            timing: false,
        }
    }
}

// ── Mode / value counts ─────────────────────────────────────────────────────

/// Mode over an iterator of optional values; nulls are skipped. Ties are
/// broken by first occurrence in iteration order, so results are
/// deterministic for a given row order.
fn mode_of<T: Eq + Hash + Clone>(values: impl Iterator<Item = Option<T>>) -> Option<T> {
    let mut order: Vec<(T, usize)> = Vec::new();
    let mut index: HashMap<T, usize> = HashMap::new();

    for value in values.flatten() {
        match index.get(&value) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(value.clone(), order.len());
                order.push((value, 1));
            }
        }
    }

    let mut best: Option<usize> = None;
    for (i, (_, count)) in order.iter().enumerate() {
        if best.map_or(true, |b| *count > order[b].1) {
            best = Some(i);
        }
    }
    best.map(|i| order.swap_remove(i).0)
}

fn mode_str(df: &DataFrame, column: &str) -> Result<String, StatsError> {
    let ca = df.column(column)?.str()?;
    mode_of(ca.into_iter().map(|v| v.map(str::to_string)))
        .ok_or_else(|| StatsError::EmptyResult(column.to_string()))
}

fn mode_i32(df: &DataFrame, column: &str) -> Result<i32, StatsError> {
    let ca = df.column(column)?.i32()?;
    mode_of(ca.into_iter()).ok_or_else(|| StatsError::EmptyResult(column.to_string()))
}

/// Per-value counts ordered by descending count; ties keep first-occurrence
/// order. Nulls are skipped.
fn value_counts(df: &DataFrame, column: &str) -> Result<Vec<(String, usize)>, StatsError> {
    let ca = df.column(column)?.str()?;

    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for value in ca.into_iter().flatten() {
        match index.get(value) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(value.to_string(), order.len());
                order.push((value.to_string(), 1));
            }
        }
    }

    // Stable sort keeps first-occurrence order among equal counts.
    order.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(order)
}

fn ensure_rows(df: &DataFrame, what: &str) -> Result<(), StatsError> {
    if df.height() == 0 {
        Err(StatsError::EmptyResult(what.to_string()))
    } else {
        Ok(())
    }
}

// ── Travel time report ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TravelTimeStats {
    pub month: i32,
    pub weekday: String,
    pub hour: i32,
}

/// Most common month, weekday and start hour over the filtered table.
pub fn travel_time_stats(df: &DataFrame) -> Result<TravelTimeStats, StatsError> {
    ensure_rows(df, "travel times")?;
    Ok(TravelTimeStats {
        month: mode_i32(df, derived::MONTH)?,
        weekday: mode_str(df, derived::DAY_OF_WEEK)?,
        hour: mode_i32(df, derived::HOUR)?,
    })
}

impl fmt::Display for TravelTimeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match month_name(self.month) {
            Some(name) => writeln!(f, "Most common month: {name}")?,
            None => writeln!(f, "Most common month: {}", self.month)?,
        }
        writeln!(f, "Most common day of the week: {}", self.weekday)?;
        writeln!(f, "Most common start hour: {}", self.hour)
    }
}

// ── Station report ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationStats {
    pub start_station: String,
    pub end_station: String,
    pub trip: String,
}

/// Most common start station, end station and start/end pair.
pub fn station_stats(df: &DataFrame) -> Result<StationStats, StatsError> {
    ensure_rows(df, "stations")?;

    let starts = df.column(trip::START_STATION)?.str()?;
    let ends = df.column(trip::END_STATION)?.str()?;
    let pairs = starts.into_iter().zip(ends).map(|(s, e)| match (s, e) {
        (Some(s), Some(e)) => Some(format!("{s}{TRIP_SEPARATOR}{e}")),
        _ => None,
    });

    Ok(StationStats {
        start_station: mode_str(df, trip::START_STATION)?,
        end_station: mode_str(df, trip::END_STATION)?,
        trip: mode_of(pairs).ok_or_else(|| StatsError::EmptyResult("station pairs".to_string()))?,
    })
}

impl fmt::Display for StationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Most commonly used start station: {}", self.start_station)?;
        writeln!(f, "Most commonly used end station: {}", self.end_station)?;
        writeln!(f, "Most frequent trip: {}", self.trip)
    }
}

// ── Duration report ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct DurationStats {
    pub total_seconds: i64,
    pub mean_seconds: f64,
    pub trips: usize,
}

/// Sum and arithmetic mean of trip duration over the filtered table.
pub fn duration_stats(df: &DataFrame) -> Result<DurationStats, StatsError> {
    ensure_rows(df, "trip durations")?;

    let s = df.column(trip::TRIP_DURATION)?.as_materialized_series();
    let total = s.sum_reduce()?;
    let total = total.value().try_extract::<i64>().unwrap_or(0);
    let mean = s.mean_reduce();
    let mean = mean.value().try_extract::<f64>().unwrap_or(f64::NAN);

    Ok(DurationStats {
        total_seconds: total,
        mean_seconds: mean,
        trips: df.height(),
    })
}

impl fmt::Display for DurationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total travel time: {} seconds", self.total_seconds)?;
        writeln!(f, "Mean travel time: {:.2} seconds", self.mean_seconds)
    }
}

// ── User report ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthYearStats {
    pub earliest: i32,
    pub latest: i32,
    pub most_common: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserStats {
    pub user_types: Vec<(String, usize)>,
    /// None when the city has no gender column (or only empty cells).
    pub genders: Option<Vec<(String, usize)>>,
    /// None when the city has no birth-year column (or only empty cells).
    pub birth_years: Option<BirthYearStats>,
}

/// User-type counts plus gender and birth-year breakdowns where the city's
/// export carries those columns.
pub fn user_stats(df: &DataFrame) -> Result<UserStats, StatsError> {
    ensure_rows(df, "users")?;

    let user_types = value_counts(df, trip::USER_TYPE)?;

    let genders = if df.schema().contains(trip::GENDER) {
        let counts = value_counts(df, trip::GENDER)?;
        if counts.is_empty() {
            None
        } else {
            Some(counts)
        }
    } else {
        None
    };

    let birth_years = if df.schema().contains(trip::BIRTH_YEAR) {
        birth_year_stats(df)?
    } else {
        None
    };

    Ok(UserStats {
        user_types,
        genders,
        birth_years,
    })
}

fn birth_year_stats(df: &DataFrame) -> Result<Option<BirthYearStats>, StatsError> {
    let ca = df.column(trip::BIRTH_YEAR)?.f64()?;
    if ca.len() == ca.null_count() {
        return Ok(None);
    }

    let s = df.column(trip::BIRTH_YEAR)?.as_materialized_series();
    let earliest = s.min_reduce()?;
    let earliest = earliest.value().try_extract::<f64>().unwrap_or(f64::NAN);
    let latest = s.max_reduce()?;
    let latest = latest.value().try_extract::<f64>().unwrap_or(f64::NAN);

    let most_common = mode_of(ca.into_iter().map(|v| v.map(|y| y as i64)))
        .ok_or_else(|| StatsError::EmptyResult(trip::BIRTH_YEAR.to_string()))?;

    Ok(Some(BirthYearStats {
        earliest: earliest as i32,
        latest: latest as i32,
        most_common: most_common as i32,
    }))
}

impl fmt::Display for UserStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "User type counts:")?;
        for (value, count) in &self.user_types {
            writeln!(f, "  {value}: {count}")?;
        }

        match &self.genders {
            Some(counts) => {
                writeln!(f, "\nGender counts:")?;
                for (value, count) in counts {
                    writeln!(f, "  {value}: {count}")?;
                }
            }
            None => writeln!(f, "\nNo gender information for this city.")?,
        }

        match self.birth_years {
            Some(years) => {
                writeln!(f, "\nEarliest birth year: {}", years.earliest)?;
                writeln!(f, "Most recent birth year: {}", years.latest)?;
                writeln!(f, "Most common birth year: {}", years.most_common)
            }
            None => writeln!(f, "\nNo birth year information for this city."),
        }
    }
}

// ── Raw row pager ───────────────────────────────────────────────────────────

/// Incremental disclosure over the filtered table: each advance reveals the
/// next `page_size` rows until the table is exhausted.
pub struct RawDataPager<'a> {
    frame: &'a DataFrame,
    offset: usize,
    page_size: usize,
}

impl<'a> RawDataPager<'a> {
    pub fn new(frame: &'a DataFrame, page_size: usize) -> Self {
        Self {
            frame,
            offset: 0,
            page_size,
        }
    }

    /// The next slice of rows, possibly short at the end of the table, or
    /// None once the table is exhausted.
    pub fn next_page(&mut self) -> Option<DataFrame> {
        if self.page_size == 0 || self.offset >= self.frame.height() {
            return None;
        }
        let page = self.frame.slice(self.offset as i64, self.page_size);
        self.offset += self.page_size;
        Some(page)
    }

    pub fn exhausted(&self) -> bool {
        self.page_size == 0 || self.offset >= self.frame.height()
    }
}
