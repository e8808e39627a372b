use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bikeshare_statkit::report::ReportConfig;
use bikeshare_statkit::shell::Shell;

/// Explore US bikeshare trip data by city, month and day.
#[derive(Debug, Parser)]
#[command(name = "bikestats", about = "Interactive bikeshare trip statistics")]
struct Cli {
    /// Directory containing the per-city CSV files
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Rows revealed per page of raw data
    #[arg(long, default_value_t = 5)]
    page_size: usize,

    /// Print elapsed time for each report
    #[arg(long, default_value_t = false)]
    timing: bool,
}

fn main() {
    // Diagnostics go to stderr so report text on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ReportConfig {
        page_size: cli.page_size,
        timing: cli.timing,
    };

    let stdin = io::stdin().lock();
    let stdout = io::stdout();
    let mut shell = Shell::new(stdin, stdout, cli.data_dir, config);
    if let Err(e) = shell.run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
