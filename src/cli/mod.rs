pub mod init;
pub mod inspect;
pub mod rules;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::error::Result;
use crate::settings::{default_settings_path, load_settings, shellexpand_path, Settings};

#[derive(Parser)]
#[command(
    name = "reledger",
    version,
    about = "Reformats 1C ledger exports into normalized spreadsheet reports."
)]
pub struct Cli {
    /// Log verbosity (RUST_LOG overrides)
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,
    /// Settings file (default: ~/.config/reledger/settings.json)
    #[arg(long, global = true)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the default settings file and create the working directories.
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
    /// Convert every spreadsheet in the source directory.
    Run {
        /// Source directory (overrides settings)
        #[arg(long)]
        source: Option<String>,
        /// Result directory (overrides settings)
        #[arg(long)]
        result: Option<String>,
        /// Leave processed sources in place
        #[arg(long = "no-move")]
        no_move: bool,
        /// Wait for ENTER before exiting
        #[arg(long)]
        wait: bool,
    },
    /// Show how one file would be converted, without writing output.
    Inspect {
        /// Path to the ledger export
        file: String,
        /// Preview rows to print
        #[arg(long, default_value = "10")]
        rows: usize,
    },
    /// List the loaded category rules.
    Rules,
}

pub(crate) fn settings_path(config: Option<&str>) -> PathBuf {
    config.map(shellexpand_path).unwrap_or_else(default_settings_path)
}

pub(crate) fn settings_from(config: Option<&str>) -> Result<Settings> {
    load_settings(&settings_path(config))
}
