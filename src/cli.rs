// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build front-end assets (markup, styles, scripts, images, SVG sprites) with an optional live-reload dev server.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Sitepipe.toml` in the current working directory. When the
    /// default file does not exist, built-in defaults are used.
    #[arg(long, value_name = "PATH", default_value = "Sitepipe.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the plan, but don't touch any files.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// The subcommand to run; no subcommand means a full build.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Build)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Clean the output directory and run every task once, in order.
    Build,

    /// Full build, then serve the output directory and re-run tasks on change.
    Watch,

    /// Run a single task by name (no clean).
    Run {
        /// Task name, e.g. `render-styles`.
        #[arg(value_name = "TASK")]
        task: String,
    },

    /// Print tasks, build order and watch bindings.
    List,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
