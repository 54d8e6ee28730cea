//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::aggregate::JoinStrategy;
use crate::error::BackendKind;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ProfileFan - concurrent customer profile aggregation
///
/// Seeds in-memory customer backends, then reads or updates a customer by
/// fanning calls out to every backend concurrently.
///
/// Examples:
///   profilefan list
///   profilefan show 7
///   profilefan show 7 --join barrier --format json
///   profilefan show 7 --join sequential
///   profilefan update 7 --request patch.json
///   echo '{"phone_number": "555-0100"}' | profilefan update 7 --request -
///   profilefan --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .profilefan.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format (text, json)
    #[arg(long, value_name = "FORMAT", global = true)]
    pub format: Option<OutputFormat>,

    /// Threads available to backend calls
    ///
    /// Defaults to the host's available parallelism.
    #[arg(long, value_name = "NUM", env = "PROFILEFAN_WORKERS", global = true)]
    pub workers: Option<usize>,

    /// Number of synthetic customers to seed
    #[arg(long, value_name = "COUNT", global = true)]
    pub customers: Option<u32>,

    /// Seed for reproducible synthetic data
    #[arg(long, value_name = "SEED", global = true)]
    pub rng_seed: Option<u64>,

    /// Use the same simulated latency for every backend
    #[arg(long, value_name = "MS", global = true)]
    pub latency_ms: Option<u64>,

    /// Make a backend fail every call (repeatable)
    #[arg(long, value_name = "BACKEND", global = true)]
    pub fail: Vec<BackendKind>,

    /// Generate a default .profilefan.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Operations on the seeded customer backends.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List every customer's identity record
    List,

    /// Show a customer's composite profile
    Show {
        /// Customer id
        id: u32,

        /// Join discipline (defaults to the configured one)
        #[arg(long, value_name = "STRATEGY")]
        join: Option<JoinStrategy>,
    },

    /// Read a profile with every strategy and compare results and timings
    Compare {
        /// Customer id
        id: u32,
    },

    /// Update only the fields present in the request
    Update {
        /// Customer id
        id: u32,

        /// JSON request file, or - for stdin
        #[arg(short, long, value_name = "FILE")]
        request: PathBuf,
    },

    /// Replace phone number, address and financial info from the request
    Replace {
        /// Customer id
        id: u32,

        /// JSON request file, or - for stdin
        #[arg(short, long, value_name = "FILE")]
        request: PathBuf,
    },
}

/// Output format.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(command) = &self.command else {
            return Err("A command is required (list, show, compare, update, replace)".to_string());
        };

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.workers == Some(0) {
            return Err("Workers must be at least 1".to_string());
        }

        if self.customers == Some(0) {
            return Err("Customers must be at least 1".to_string());
        }

        match command {
            Command::Update { request, .. } | Command::Replace { request, .. } => {
                if request.as_os_str() != "-" && !request.is_file() {
                    return Err(format!("Request file does not exist: {}", request.display()));
                }
            }
            Command::List | Command::Show { .. } | Command::Compare { .. } => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            command: Some(Command::Show { id: 7, join: None }),
            config: None,
            verbose: false,
            quiet: false,
            format: None,
            workers: None,
            customers: None,
            rng_seed: None,
            latency_ms: None,
            fail: Vec::new(),
            init_config: false,
        }
    }

    #[test]
    fn test_parse_show_with_join() {
        let args = Args::try_parse_from(["profilefan", "show", "7", "--join", "barrier"]).unwrap();
        assert_eq!(
            args.command,
            Some(Command::Show {
                id: 7,
                join: Some(JoinStrategy::Barrier)
            })
        );
    }

    #[test]
    fn test_parse_sequential_join() {
        let args =
            Args::try_parse_from(["profilefan", "show", "7", "--join", "sequential"]).unwrap();
        assert_eq!(
            args.command,
            Some(Command::Show {
                id: 7,
                join: Some(JoinStrategy::Sequential)
            })
        );
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["profilefan", "list", "--format", "json", "--workers", "3"])
                .unwrap();
        assert_eq!(args.command, Some(Command::List));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.workers, Some(3));
    }

    #[test]
    fn test_parse_repeated_fail() {
        let args = Args::try_parse_from([
            "profilefan", "show", "3", "--fail", "financial", "--fail", "loyalty",
        ])
        .unwrap();
        assert_eq!(args.fail, vec![BackendKind::Financial, BackendKind::Loyalty]);
    }

    #[test]
    fn test_validation_requires_command() {
        let mut args = make_args();
        args.command = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_workers() {
        let mut args = make_args();
        args.workers = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_request_file() {
        let mut args = make_args();
        args.command = Some(Command::Update {
            id: 1,
            request: PathBuf::from("/definitely/not/here.json"),
        });
        assert!(args.validate().is_err());

        args.command = Some(Command::Update {
            id: 1,
            request: PathBuf::from("-"),
        });
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
