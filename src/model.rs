use std::fmt;
use std::path::Path;
use std::str::FromStr;

use polars::datatypes::TimeUnit;
use polars::prelude::StrptimeOptions;
use polars::prelude::*;

use chrono::{DateTime, Datelike, Timelike};

use crate::error::StatsError;
use crate::schema::{derived, source, trip};

// ── City registry ───────────────────────────────────────────────────────────

/// Fixed set of supported cities, each backed by one CSV export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum City {
    Chicago,
    NewYorkCity,
    Washington,
}

impl City {
    pub const ALL: [City; 3] = [City::Chicago, City::NewYorkCity, City::Washington];

    pub fn data_file(self) -> &'static str {
        match self {
            City::Chicago => source::CHICAGO_FILE,
            City::NewYorkCity => source::NEW_YORK_CITY_FILE,
            City::Washington => source::WASHINGTON_FILE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            City::Chicago => "Chicago",
            City::NewYorkCity => "New York City",
            City::Washington => "Washington",
        }
    }
}

impl FromStr for City {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chicago" => Ok(City::Chicago),
            "new york city" => Ok(City::NewYorkCity),
            "washington" => Ok(City::Washington),
            other => Err(StatsError::InvalidInput(format!("unknown city: {other}"))),
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Month / weekday domains ─────────────────────────────────────────────────

/// Months the datasets can be filtered by (the exports cover January-June).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
}

impl Month {
    pub fn number(self) -> i32 {
        match self {
            Month::January => 1,
            Month::February => 2,
            Month::March => 3,
            Month::April => 4,
            Month::May => 5,
            Month::June => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
        }
    }
}

impl FromStr for Month {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "january" => Ok(Month::January),
            "february" => Ok(Month::February),
            "march" => Ok(Month::March),
            "april" => Ok(Month::April),
            "may" => Ok(Month::May),
            "june" => Ok(Month::June),
            other => Err(StatsError::InvalidInput(format!("unknown month: {other}"))),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Full English month name for a derived `month` value (1-12).
pub fn month_name(number: i32) -> Option<&'static str> {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    if (1..=12).contains(&number) {
        Some(NAMES[(number - 1) as usize])
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Canonical capitalized name; the derived `day_of_week` column holds
    /// exactly these values.
    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(w: chrono::Weekday) -> Self {
        match w {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl FromStr for Weekday {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monday" => Ok(Weekday::Monday),
            "tuesday" => Ok(Weekday::Tuesday),
            "wednesday" => Ok(Weekday::Wednesday),
            "thursday" => Ok(Weekday::Thursday),
            "friday" => Ok(Weekday::Friday),
            "saturday" => Ok(Weekday::Saturday),
            "sunday" => Ok(Weekday::Sunday),
            other => Err(StatsError::InvalidInput(format!("unknown day: {other}"))),
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Filter criteria ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthFilter {
    All,
    Only(Month),
}

impl FromStr for MonthFilter {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(MonthFilter::All)
        } else {
            s.parse::<Month>().map(MonthFilter::Only)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayFilter {
    All,
    Only(Weekday),
}

impl FromStr for DayFilter {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(DayFilter::All)
        } else {
            s.parse::<Weekday>().map(DayFilter::Only)
        }
    }
}

/// One interaction cycle's worth of selection: which city to load and which
/// month/day slice to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterCriteria {
    pub city: City,
    pub month: MonthFilter,
    pub day: DayFilter,
}

// ── Loading ─────────────────────────────────────────────────────────────────

/// Load the full trip table for a city.
///
/// Reads every column as String (no schema inference), trims whitespace from
/// header names, checks the mandatory columns, then casts `Trip Duration` to
/// Int64 and, when present, `Birth Year` to Float64 (exports carry values
/// like "1985.0"). All other columns stay strings.
pub fn load_trips(data_dir: &Path, city: City) -> Result<DataFrame, StatsError> {
    let path = data_dir.join(city.data_file());
    if std::fs::metadata(&path).is_err() {
        return Err(StatsError::SourceNotFound {
            city: city.name().to_string(),
            path: path.display().to_string(),
        });
    }

    let raw = read_csv_as_strings(&path)?;
    require_columns(&raw, &trip::MANDATORY)?;

    let duration_nulls_before = raw.column(trip::TRIP_DURATION)?.null_count();
    let has_birth_year = raw.schema().contains(trip::BIRTH_YEAR);

    let mut lazy = raw.lazy().with_columns([col(trip::TRIP_DURATION)
        .str()
        .strip_chars(lit(" \t\r\n"))
        .cast(DataType::Int64)]);

    if has_birth_year {
        lazy = lazy.with_columns([col(trip::BIRTH_YEAR)
            .str()
            .strip_chars(lit(" \t\r\n"))
            .cast(DataType::Float64)]);
    }

    let df = lazy.collect()?;

    let duration_nulls_after = df.column(trip::TRIP_DURATION)?.null_count();
    if duration_nulls_after > duration_nulls_before {
        return Err(StatsError::InvalidData(format!(
            "Trip Duration has {} non-numeric values",
            duration_nulls_after - duration_nulls_before
        )));
    }

    tracing::debug!(city = %city, rows = df.height(), "loaded trip table");
    Ok(df)
}

/// Parse `Start Time` and derive `month`, `day_of_week` and `hour` columns.
///
/// Parsing is strict and all-or-nothing: any unparseable or missing start
/// timestamp fails the whole operation.
pub fn normalize_start_times(df: DataFrame) -> Result<DataFrame, StatsError> {
    let rows = df.height();

    let mut df = df
        .lazy()
        .with_columns([col(trip::START_TIME)
            .str()
            .strip_chars(lit(" \t\r\n"))
            .str()
            .to_datetime(
                Some(TimeUnit::Microseconds),
                None,
                StrptimeOptions {
                    format: Some(source::START_TIME_FORMAT.into()),
                    strict: true,
                    ..Default::default()
                },
                lit("raise"),
            )])
        .collect()
        .map_err(|e| StatsError::TimestampParse(e.to_string()))?;

    let start = df.column(trip::START_TIME)?;
    if start.null_count() > 0 {
        return Err(StatsError::TimestampParse(format!(
            "{} rows have no start timestamp",
            start.null_count()
        )));
    }

    // Physical representation is microseconds since epoch.
    let micros = start.as_materialized_series().cast(&DataType::Int64)?;
    let micros = micros.i64()?;

    let mut months: Vec<i32> = Vec::with_capacity(rows);
    let mut days: Vec<&'static str> = Vec::with_capacity(rows);
    let mut hours: Vec<i32> = Vec::with_capacity(rows);

    for value in micros {
        let us = value
            .ok_or_else(|| StatsError::TimestampParse("null start timestamp".to_string()))?;
        let dt = DateTime::from_timestamp_micros(us).ok_or_else(|| {
            StatsError::TimestampParse(format!("start timestamp out of range: {us}"))
        })?;
        months.push(dt.month() as i32);
        days.push(Weekday::from(dt.weekday()).name());
        hours.push(dt.hour() as i32);
    }

    df.with_column(Series::new(derived::MONTH.into(), months))?;
    df.with_column(Series::new(derived::DAY_OF_WEEK.into(), days))?;
    df.with_column(Series::new(derived::HOUR.into(), hours))?;

    Ok(df)
}

/// Keep only rows matching the criteria's month and day. Row order is
/// preserved; no match is an empty table, not an error.
pub fn apply_filters(df: DataFrame, criteria: &FilterCriteria) -> Result<DataFrame, StatsError> {
    let mut lazy = df.lazy();

    if let MonthFilter::Only(month) = criteria.month {
        lazy = lazy.filter(col(derived::MONTH).eq(lit(month.number())));
    }
    if let DayFilter::Only(day) = criteria.day {
        lazy = lazy.filter(col(derived::DAY_OF_WEEK).eq(lit(day.name())));
    }

    let out = lazy.collect()?;
    tracing::debug!(rows = out.height(), "applied month/day filters");
    Ok(out)
}

/// Load, normalize and filter in one step: the table a report cycle runs on.
pub fn load_filtered(data_dir: &Path, criteria: &FilterCriteria) -> Result<DataFrame, StatsError> {
    let df = load_trips(data_dir, criteria.city)?;
    let df = normalize_start_times(df)?;
    let df = apply_filters(df, criteria)?;
    tracing::info!(city = %criteria.city, rows = df.height(), "trip table ready");
    Ok(df)
}

// ── Private helpers ─────────────────────────────────────────────────────────

/// Read a CSV file with all columns as String dtype.
/// Trims whitespace from column names.
fn read_csv_as_strings(path: &Path) -> Result<DataFrame, StatsError> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    Ok(df)
}

fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), StatsError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(StatsError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "\
Start Time,End Time,Trip Duration,Start Station,End Station,User Type,Gender,Birth Year
2017-01-02 09:07:57,2017-01-02 09:20:53,776,Canal St,State St,Subscriber,Male,1985.0
2017-01-02 09:30:00,2017-01-02 09:41:10,670,Canal St,Clark St,Subscriber,Female,1990.0
2017-01-03 10:05:00,2017-01-03 10:35:00,1800,State St,Canal St,Customer,,
2017-03-01 12:00:00,2017-03-01 12:30:00,1800,Clark St,State St,Subscriber,Male,1985.0
";

    fn write_city_csv(dir: &Path, city: City, body: &str) {
        std::fs::write(dir.join(city.data_file()), body).unwrap();
    }

    fn all_criteria(city: City) -> FilterCriteria {
        FilterCriteria {
            city,
            month: MonthFilter::All,
            day: DayFilter::All,
        }
    }

    #[test]
    fn city_parsing_is_case_insensitive() {
        assert_eq!("Chicago".parse::<City>().unwrap(), City::Chicago);
        assert_eq!("NEW YORK CITY".parse::<City>().unwrap(), City::NewYorkCity);
        assert_eq!(" washington ".parse::<City>().unwrap(), City::Washington);
        assert!("boston".parse::<City>().is_err());
    }

    #[test]
    fn filter_parsing_accepts_all_and_names() {
        assert_eq!("all".parse::<MonthFilter>().unwrap(), MonthFilter::All);
        assert_eq!(
            "March".parse::<MonthFilter>().unwrap(),
            MonthFilter::Only(Month::March)
        );
        assert!("july".parse::<MonthFilter>().is_err());

        assert_eq!("ALL".parse::<DayFilter>().unwrap(), DayFilter::All);
        assert_eq!(
            "monday".parse::<DayFilter>().unwrap(),
            DayFilter::Only(Weekday::Monday)
        );
        assert!("someday".parse::<DayFilter>().is_err());
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_trips(tmp.path(), City::Chicago).unwrap_err();
        assert!(matches!(err, StatsError::SourceNotFound { .. }));
    }

    #[test]
    fn missing_mandatory_column_is_schema_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_city_csv(
            tmp.path(),
            City::Chicago,
            "Start Time,End Time,Start Station,End Station,User Type\n\
             2017-01-02 09:07:57,2017-01-02 09:20:53,Canal St,State St,Subscriber\n",
        );
        let err = load_trips(tmp.path(), City::Chicago).unwrap_err();
        match err {
            StatsError::MissingColumn(column) => assert_eq!(column, trip::TRIP_DURATION),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn load_casts_duration_and_birth_year() {
        let tmp = tempfile::tempdir().unwrap();
        write_city_csv(tmp.path(), City::Chicago, FIXTURE);

        let df = load_trips(tmp.path(), City::Chicago).unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(
            df.column(trip::TRIP_DURATION).unwrap().dtype(),
            &DataType::Int64
        );
        assert_eq!(
            df.column(trip::BIRTH_YEAR).unwrap().dtype(),
            &DataType::Float64
        );
        // The empty birth-year cell stays null rather than failing the load.
        assert_eq!(df.column(trip::BIRTH_YEAR).unwrap().null_count(), 1);
    }

    #[test]
    fn non_numeric_duration_is_invalid_data() {
        let tmp = tempfile::tempdir().unwrap();
        write_city_csv(
            tmp.path(),
            City::Chicago,
            "Start Time,End Time,Trip Duration,Start Station,End Station,User Type\n\
             2017-01-02 09:07:57,2017-01-02 09:20:53,abc,Canal St,State St,Subscriber\n",
        );
        let err = load_trips(tmp.path(), City::Chicago).unwrap_err();
        assert!(matches!(err, StatsError::InvalidData(_)));
    }

    #[test]
    fn normalization_derives_month_day_and_hour() {
        let tmp = tempfile::tempdir().unwrap();
        write_city_csv(tmp.path(), City::Chicago, FIXTURE);

        let df = load_trips(tmp.path(), City::Chicago).unwrap();
        let df = normalize_start_times(df).unwrap();

        let months: Vec<i32> = df
            .column(derived::MONTH)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .map(Option::unwrap)
            .collect();
        assert_eq!(months, vec![1, 1, 1, 3]);

        let days: Vec<String> = df
            .column(derived::DAY_OF_WEEK)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect();
        assert_eq!(days, vec!["Monday", "Monday", "Tuesday", "Wednesday"]);

        let hours: Vec<i32> = df
            .column(derived::HOUR)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .map(Option::unwrap)
            .collect();
        assert_eq!(hours, vec![9, 9, 10, 12]);
    }

    #[test]
    fn malformed_timestamp_fails_the_whole_load() {
        let tmp = tempfile::tempdir().unwrap();
        write_city_csv(
            tmp.path(),
            City::Chicago,
            "Start Time,End Time,Trip Duration,Start Station,End Station,User Type\n\
             2017-01-02 09:07:57,2017-01-02 09:20:53,776,Canal St,State St,Subscriber\n\
             not-a-timestamp,2017-01-02 09:41:10,670,Canal St,Clark St,Subscriber\n",
        );
        let df = load_trips(tmp.path(), City::Chicago).unwrap();
        let err = normalize_start_times(df).unwrap_err();
        assert!(matches!(err, StatsError::TimestampParse(_)));
    }

    #[test]
    fn all_all_filter_is_identity() {
        let tmp = tempfile::tempdir().unwrap();
        write_city_csv(tmp.path(), City::Chicago, FIXTURE);

        let df = normalize_start_times(load_trips(tmp.path(), City::Chicago).unwrap()).unwrap();
        let filtered = apply_filters(df.clone(), &all_criteria(City::Chicago)).unwrap();

        assert_eq!(filtered.height(), df.height());
        let before: Vec<Option<&str>> = df
            .column(trip::START_STATION)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        let after: Vec<Option<&str>> = filtered
            .column(trip::START_STATION)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn month_and_day_filters_keep_matching_rows_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_city_csv(tmp.path(), City::Chicago, FIXTURE);

        let df = normalize_start_times(load_trips(tmp.path(), City::Chicago).unwrap()).unwrap();

        let criteria = FilterCriteria {
            city: City::Chicago,
            month: MonthFilter::Only(Month::January),
            day: DayFilter::Only(Weekday::Monday),
        };
        let filtered = apply_filters(df, &criteria).unwrap();

        assert_eq!(filtered.height(), 2);
        let ends: Vec<&str> = filtered
            .column(trip::END_STATION)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(Option::unwrap)
            .collect();
        assert_eq!(ends, vec!["State St", "Clark St"]);

        for month in filtered
            .column(derived::MONTH)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
        {
            assert_eq!(month, Some(1));
        }
    }

    #[test]
    fn unmatched_filter_yields_empty_table_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_city_csv(tmp.path(), City::Chicago, FIXTURE);

        let criteria = FilterCriteria {
            city: City::Chicago,
            month: MonthFilter::Only(Month::June),
            day: DayFilter::All,
        };
        let df = load_filtered(tmp.path(), &criteria).unwrap();
        assert_eq!(df.height(), 0);
    }

    #[test]
    fn month_name_covers_full_year() {
        assert_eq!(month_name(1), Some("January"));
        assert_eq!(month_name(12), Some("December"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }
}
