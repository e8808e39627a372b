//! Interactive bikeshare trip statistics.
//!
//! Loads a city's trip log CSV into a DataFrame, derives month / weekday /
//! hour columns from the start timestamps, applies optional month and day
//! filters, and computes descriptive reports over the result. The prompt
//! loop lives in [`shell`]; everything below it is side-effect-free and
//! usable as a library.

pub mod error;
pub mod model;
pub mod report;
pub mod schema;
pub mod shell;

pub use error::StatsError;
pub use model::{City, DayFilter, FilterCriteria, Month, MonthFilter, Weekday};
pub use report::ReportConfig;
pub use shell::Shell;
