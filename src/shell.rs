use std::fmt;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use polars::prelude::DataFrame;

use crate::error::StatsError;
use crate::model::{self, City, DayFilter, FilterCriteria, MonthFilter};
use crate::report::{self, RawDataPager, ReportConfig};

const RULE: &str = "----------------------------------------";

/// Outcome of a single prompt round.
enum PromptOutcome<T> {
    Valid(T),
    Invalid,
    Cancelled,
}

struct YesNo(bool);

impl FromStr for YesNo {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" => Ok(YesNo(true)),
            "no" => Ok(YesNo(false)),
            other => Err(StatsError::InvalidInput(format!(
                "expected yes or no, got: {other}"
            ))),
        }
    }
}

/// Interactive prompt loop: gather filter criteria, run the report sequence,
/// offer raw rows and a restart. Generic over reader/writer so the whole
/// dialogue can be driven from tests.
pub struct Shell<R, W> {
    input: R,
    output: W,
    data_dir: PathBuf,
    config: ReportConfig,
    attempt_limit: Option<usize>,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(input: R, output: W, data_dir: PathBuf, config: ReportConfig) -> Self {
        Self {
            input,
            output,
            data_dir,
            config,
            attempt_limit: None,
        }
    }

    /// Bound the number of invalid responses tolerated per prompt. Interactive
    /// use retries indefinitely; non-interactive callers set a limit and get
    /// `InvalidInput` back when it is exhausted.
    pub fn with_attempt_limit(mut self, attempts: usize) -> Self {
        self.attempt_limit = Some(attempts);
        self
    }

    pub fn run(&mut self) -> Result<(), StatsError> {
        writeln!(self.output, "\nHello! Let's explore some US bikeshare data!")?;

        loop {
            let criteria = match self.gather_criteria()? {
                Some(criteria) => criteria,
                None => return Ok(()), // cancelled at a prompt
            };

            match self.run_cycle(&criteria) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => writeln!(self.output, "\n{e}")?,
                Err(e) => return Err(e),
            }

            match self.prompt_parse::<YesNo>(
                "\nWould you like to restart? Enter yes or no.\n",
                "Invalid response. Please try again.",
            )? {
                Some(YesNo(true)) => continue,
                _ => return Ok(()),
            }
        }
    }

    // ── Criteria gathering ──────────────────────────────────────────────────

    fn gather_criteria(&mut self) -> Result<Option<FilterCriteria>, StatsError> {
        let city = match self.prompt_parse::<City>(
            "\nWhich city would you like to see data for? Chicago, New York City, or Washington: ",
            "\nThis is not a valid city. Please try again.",
        )? {
            Some(city) => city,
            None => return Ok(None),
        };

        let month = match self.prompt_parse::<MonthFilter>(
            "\nWhich month (January - June) would you like to see data for? Enter 'all' for no filter: ",
            "\nThis is not a valid month. Please try again.",
        )? {
            Some(month) => month,
            None => return Ok(None),
        };

        let day = match self.prompt_parse::<DayFilter>(
            "\nWhich day of the week would you like to see data for? Enter 'all' for no filter: ",
            "\nThis is not a valid day of the week. Please try again.",
        )? {
            Some(day) => day,
            None => return Ok(None),
        };

        writeln!(self.output, "{RULE}")?;
        Ok(Some(FilterCriteria { city, month, day }))
    }

    // ── Prompting ───────────────────────────────────────────────────────────

    fn prompt_once<T: FromStr>(&mut self, prompt: &str) -> Result<PromptOutcome<T>, StatsError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(PromptOutcome::Cancelled); // EOF
        }
        match line.trim().parse::<T>() {
            Ok(value) => Ok(PromptOutcome::Valid(value)),
            Err(_) => Ok(PromptOutcome::Invalid),
        }
    }

    /// Re-prompt until the response parses; None means the user cancelled.
    fn prompt_parse<T: FromStr>(
        &mut self,
        prompt: &str,
        retry_message: &str,
    ) -> Result<Option<T>, StatsError> {
        let mut attempts = 0usize;
        loop {
            match self.prompt_once::<T>(prompt)? {
                PromptOutcome::Valid(value) => return Ok(Some(value)),
                PromptOutcome::Cancelled => return Ok(None),
                PromptOutcome::Invalid => {
                    attempts += 1;
                    if let Some(limit) = self.attempt_limit {
                        if attempts >= limit {
                            return Err(StatsError::InvalidInput(format!(
                                "no valid response after {attempts} attempts"
                            )));
                        }
                    }
                    writeln!(self.output, "{retry_message}")?;
                }
            }
        }
    }

    // ── Report cycle ────────────────────────────────────────────────────────

    fn run_cycle(&mut self, criteria: &FilterCriteria) -> Result<(), StatsError> {
        let df = model::load_filtered(&self.data_dir, criteria)?;

        self.section(
            "Calculating The Most Frequent Times of Travel...",
            &df,
            report::travel_time_stats,
        )?;
        self.section(
            "Calculating The Most Popular Stations and Trip...",
            &df,
            report::station_stats,
        )?;
        self.section("Calculating Trip Duration...", &df, report::duration_stats)?;
        self.section("Calculating User Stats...", &df, report::user_stats)?;

        self.browse_raw_rows(&df)
    }

    fn section<T: fmt::Display>(
        &mut self,
        title: &str,
        df: &DataFrame,
        compute: fn(&DataFrame) -> Result<T, StatsError>,
    ) -> Result<(), StatsError> {
        writeln!(self.output, "\n{title}\n")?;
        let start = Instant::now();
        let result = compute(df)?;
        write!(self.output, "{result}")?;
        if self.config.timing {
            writeln!(
                self.output,
                "(elapsed_ms: {})",
                start.elapsed().as_millis()
            )?;
        }
        writeln!(self.output, "{RULE}")?;
        Ok(())
    }

    fn browse_raw_rows(&mut self, df: &DataFrame) -> Result<(), StatsError> {
        let first = format!(
            "\nWould you like to see {} lines of raw data? Enter yes or no.\n",
            self.config.page_size
        );
        let again = format!(
            "\nDo you want to see another {} lines of raw data? Enter yes or no.\n",
            self.config.page_size
        );

        let mut pager = RawDataPager::new(df, self.config.page_size);
        let mut prompt = first.as_str();

        loop {
            match self.prompt_parse::<YesNo>(prompt, "\nInvalid response. Please try again.")? {
                Some(YesNo(true)) => match pager.next_page() {
                    Some(page) => {
                        writeln!(self.output, "{page}")?;
                        if pager.exhausted() {
                            writeln!(self.output, "No more raw data to show.")?;
                            writeln!(self.output, "{RULE}")?;
                            return Ok(());
                        }
                    }
                    None => {
                        writeln!(self.output, "No more raw data to show.")?;
                        writeln!(self.output, "{RULE}")?;
                        return Ok(());
                    }
                },
                // "no" or cancelled
                _ => {
                    writeln!(self.output, "{RULE}")?;
                    return Ok(());
                }
            }
            prompt = again.as_str();
        }
    }
}
