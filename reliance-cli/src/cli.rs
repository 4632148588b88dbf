//! Contains structures and functionality for the binary
use std::{path::PathBuf, time::Duration};

use reliance::reliance::RelianceStrategy;

/// Cli Arguments related to logging
#[derive(clap::Args, Debug)]
pub struct LoggingArgs {
    /// Increase log verbosity (multiple uses increase verbosity further)
    #[arg(short, long, action = clap::builder::ArgAction::Count, group = "verbosity")]
    verbose: u8,
    /// Reduce log verbosity to show only errors (equivalent to --log error)
    #[arg(short, long, group = "verbosity")]
    quiet: bool,
    /// Set log verbosity (default is "warn")
    #[arg(long = "log", value_parser=clap::builder::PossibleValuesParser::new(["error", "warn", "info", "debug", "trace"]), group = "verbosity")]
    log_level: Option<String>,
}

impl LoggingArgs {
    /// Initialising Logging
    ///
    /// Sets the logging verbosity to the given log-level in the following order:
    ///  * `Info`, `Debug`, `Trace`; depending on the count of `-v`
    ///  * `Error` when `-q` is used
    ///  * The `RELY_LOG` environment variable value
    ///  * `Warn` otherwise
    pub fn initialize_logging(&self) {
        let mut builder = env_logger::Builder::new();

        // Default log level
        builder.filter_level(log::LevelFilter::Warn);

        builder.parse_env("RELY_LOG");
        if let Some(ref level) = self.log_level {
            builder.parse_filters(level);
        } else if self.quiet {
            builder.filter_level(log::LevelFilter::Error);
        } else if self.verbose > 0 {
            builder.filter_level(match self.verbose {
                1 => log::LevelFilter::Info,
                2 => log::LevelFilter::Debug,
                3 => log::LevelFilter::Trace,
                _ => log::LevelFilter::Warn,
            });
        }
        builder.init();
    }
}

/// Cli arguments related to the reliance computation
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct RelianceArgs {
    /// Optimizations of the reliance search as a bit set:
    /// 1 early termination, 2 cut pairs, 4 pair hashing, 8 incremental search
    #[arg(
        short,
        long,
        global = true,
        env = "RELY_STRATEGY",
        default_value_t = RelianceStrategy::FULL,
        value_parser = clap::value_parser!(u32).range(0..16)
    )]
    strategy: u32,
    /// Time limit for computing a reliance graph in milliseconds; 0 disables the limit
    #[arg(short, long, global = true, env = "RELY_TIMEOUT", default_value_t = 0)]
    timeout: u64,
}

impl RelianceArgs {
    /// Return the selected [`RelianceStrategy`].
    pub fn strategy(&self) -> RelianceStrategy {
        RelianceStrategy::from_bits(self.strategy)
    }

    /// Return the selected time limit.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_millis(self.timeout))
    }
}

/// Analyses offered by the binary
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Compute the positive reliance graph
    Positive {
        /// Save the edges of the graph as CSV
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Compute the restraint graph
    Restraint {
        /// Save the edges of the graph as CSV
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Check whether the program is core stratified
    CoreStratified {
        /// Save the combined reliance graph labeled with rules as GraphML
        #[arg(long)]
        graphml: Option<PathBuf>,
    },
    /// Check whether the positive reliance graph is acyclic
    Grd,
    /// Print the program with every existential rule split into its pieces
    Pieces,
}

/// Reliance analysis of existential rules
#[derive(clap::Parser, Debug)]
#[command(author, version, about)]
pub struct CliApp {
    /// Rule file to analyse
    #[arg(value_parser)]
    pub rules: PathBuf,
    /// Analysis to run
    #[command(subcommand)]
    pub command: Command,
    /// Arguments related to the reliance computation
    #[command(flatten)]
    pub reliance: RelianceArgs,
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
    /// Arguments related to logging
    #[command(flatten)]
    pub logging: LoggingArgs,
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use clap::Parser;
    use test_log::test;

    use super::{CliApp, Command};

    #[test]
    fn arguments_after_command() {
        let cli = CliApp::try_parse_from([
            "rely",
            "rules.rls",
            "positive",
            "--strategy",
            "3",
            "--timeout",
            "20",
            "--json",
        ])
        .unwrap();

        assert!(matches!(cli.command, Command::Positive { export: None }));
        assert!(cli.json);
        assert_eq!(cli.reliance.strategy().bits(), 3);
        assert_eq!(cli.reliance.timeout(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn strategy_out_of_range() {
        assert!(CliApp::try_parse_from(["rely", "rules.rls", "grd", "--strategy", "16"]).is_err());
    }
}
