use clap::{Parser, ValueEnum};
use ltsvq::logging::LogConfig;
use ltsvq::{Config, Delimiters, MissingColumnPolicy, Result};
use ltsvq_core::{limits::DEFAULT_MAX_COLUMNS, DEFAULT_TABLE_NAME};
use std::path::PathBuf;
use std::process::ExitCode;

/// Run one SQL query over LTSV records and print the result as LTSV
#[derive(Parser, Debug)]
#[command(name = "ltsvq", author, version, about, long_about = None)]
struct Args {
    /// SQL query to run, e.g. "SELECT host, status FROM ltsv WHERE status >= 500"
    #[arg(short = 'q', long = "query", required_unless_present = "query_file")]
    query: Option<String>,

    /// Read the query from a file instead
    #[arg(long = "query-file", conflicts_with = "query")]
    query_file: Option<PathBuf>,

    /// Input file (default: stdin)
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Output file, created or truncated (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Print diagnostics to stderr
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Write diagnostics to a daily-rolled log file instead of stderr
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Relation name used in FROM
    #[arg(long = "table", default_value = DEFAULT_TABLE_NAME)]
    table: String,

    /// Field separator
    #[arg(long = "field-sep", default_value_t = '\t', hide_default_value = true)]
    field_sep: char,

    /// Key/value separator
    #[arg(long = "kv-sep", default_value_t = ':')]
    kv_sep: char,

    /// What to do when a row lacks a column of the first row
    #[arg(long = "missing-columns", value_enum, default_value_t = MissingColumns::Error)]
    missing_columns: MissingColumns,

    /// Maximum number of columns the relation may grow to
    #[arg(long = "max-columns", default_value_t = DEFAULT_MAX_COLUMNS)]
    max_columns: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MissingColumns {
    /// Fail the run
    Error,
    /// Write the column with an empty value
    Blank,
}

impl From<MissingColumns> for MissingColumnPolicy {
    fn from(value: MissingColumns) -> Self {
        match value {
            MissingColumns::Error => MissingColumnPolicy::Error,
            MissingColumns::Blank => MissingColumnPolicy::Blank,
        }
    }
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let config = match (self.query, self.query_file) {
            (Some(query), _) => Config::new(query),
            (None, Some(path)) => Config::from_query_file(path)?,
            (None, None) => Config::default(),
        };

        let log = match (self.verbose, self.log_file) {
            (_, Some(path)) => LogConfig::debug().with_file(path),
            (true, None) => LogConfig::debug(),
            (false, None) => LogConfig::off(),
        };

        let mut config = config
            .with_table(self.table)
            .with_delimiters(Delimiters::new(self.field_sep, self.kv_sep)?)
            .with_missing_columns(self.missing_columns.into())
            .with_max_columns(self.max_columns)
            .with_log(log);
        config.input = self.input;
        config.output = self.output;

        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ltsvq: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Held until exit so the file writer drains
    let _guard = match config.log.clone().init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ltsvq: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match ltsvq::run(&config) {
        Ok(stats) => {
            tracing::debug!(
                lines = stats.ingest.lines,
                skipped = stats.ingest.skipped(),
                rows = stats.rows_written,
                "Run finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ltsvq: {}", e);
            ExitCode::FAILURE
        }
    }
}
